use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::model::role::Role;

/// Registration form payload.
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_password_match", skip_on_field_errors = false))]
pub struct RegistrationForm {
    #[validate(email(message = "Enter a valid email address."))]
    #[schema(example = "jane@example.com", format = "email")]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    #[schema(example = "Jane")]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    #[schema(example = "Doe")]
    pub last_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    #[schema(example = "correct-horse-battery")]
    pub password: String,
    #[schema(example = "correct-horse-battery")]
    pub password_confirm: String,
    #[validate(custom(function = "validate_type_of_user"))]
    #[schema(example = "customer")]
    pub type_of_user: String,
}

fn validate_password_match(form: &RegistrationForm) -> Result<(), ValidationError> {
    if form.password != form.password_confirm {
        let mut error = ValidationError::new("password_mismatch");
        error.message = Some("The two password fields didn't match.".into());
        return Err(error);
    }
    Ok(())
}

fn validate_type_of_user(value: &str) -> Result<(), ValidationError> {
    if Role::from_slug(value).is_none() {
        let mut error = ValidationError::new("invalid_choice");
        error.message = Some("Select a valid choice.".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "correct-horse-battery")]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Profile edit payload. Only the field matching the user's role is read.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct ProfileUpdate {
    #[schema(example = "/media/resumes/7.pdf", nullable = true)]
    pub resume: Option<String>,
    #[schema(example = "/media/photos/42.jpg", nullable = true)]
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct GrantPermission {
    #[schema(example = "users.can_view")]
    pub codename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String, // email
    pub is_superuser: bool,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegistrationForm {
        RegistrationForm {
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            password: "correct-horse".to_string(),
            password_confirm: "correct-horse".to_string(),
            type_of_user: "customer".to_string(),
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn mismatched_passwords_are_a_form_error() {
        let mut f = form();
        f.password_confirm = "something-else".to_string();
        let errors = f.validate().unwrap_err();
        assert!(errors.errors().contains_key("__all__"));
    }

    #[test]
    fn unknown_type_of_user_is_rejected() {
        let mut f = form();
        f.type_of_user = "admin".to_string();
        let errors = f.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("type_of_user"));
    }

    #[test]
    fn bad_email_and_short_password_are_reported_together() {
        let mut f = form();
        f.email = "not-an-email".to_string();
        f.password = "short".to_string();
        f.password_confirm = "short".to_string();
        let errors = f.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
