use std::collections::BTreeMap;

use crate::{
    auth::{password::hash_password, tokens::encode_uid},
    config::Config,
    error::AppError,
    mail::templates,
    model::{role::Role, user::NewUser},
    models::RegistrationForm,
    state::AppState,
    store::StoreError,
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use strum::IntoEnumIterator;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

/// Shown after a successful registration: "confirm your email address".
pub const CONFIRM_MESSAGE: &str = "Email дарегиңизди тастыктаңыз";

/// Field name -> messages, the way the form is re-rendered on failure.
type FormErrors = BTreeMap<String, Vec<String>>;

#[derive(Serialize, ToSchema)]
pub struct RegistrationFormSpec {
    #[schema(example = json!(["email", "first_name", "last_name", "password", "password_confirm", "type_of_user"]))]
    pub fields: Vec<&'static str>,
    #[schema(example = json!(["employee", "customer"]))]
    pub type_of_user_choices: Vec<String>,
}

fn form_errors(errors: &ValidationErrors) -> FormErrors {
    let mut out = FormErrors::new();
    for (field, kind) in errors.errors() {
        let validator::ValidationErrorsKind::Field(list) = kind else {
            continue;
        };
        let messages = list
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", e.code))
            })
            .collect::<Vec<_>>();
        out.entry(field.to_string()).or_default().extend(messages);
    }
    out
}

fn rerender(errors: FormErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "message": "error",
        "errors": errors,
    }))
}

#[utoipa::path(
    get,
    path = "/users/register",
    responses((status = 200, description = "Registration form description", body = RegistrationFormSpec)),
    tag = "Registration"
)]
pub async fn registration_form() -> HttpResponse {
    HttpResponse::Ok().json(RegistrationFormSpec {
        fields: vec![
            "email",
            "first_name",
            "last_name",
            "password",
            "password_confirm",
            "type_of_user",
        ],
        type_of_user_choices: Role::iter().map(|r| r.to_string()).collect(),
    })
}

#[utoipa::path(
    post,
    path = "/users/register",
    request_body = RegistrationForm,
    responses(
        (status = 200, description = "Inactive account created, activation link emailed", body = Object, example = json!({
            "message": "Email дарегиңизди тастыктаңыз"
        })),
        (status = 400, description = "Form errors", body = Object, example = json!({
            "message": "error",
            "errors": { "email": ["Enter a valid email address."] }
        })),
        (status = 500, description = "Storage or mail failure")
    ),
    tag = "Registration"
)]
#[instrument(name = "register", skip_all, fields(email = %form.email))]
pub async fn register(
    form: web::Json<RegistrationForm>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let mut form = form.into_inner();
    form.email = form.email.trim().to_lowercase();

    let mut errors = match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(e) => form_errors(&e),
    };

    // the form validates only when the address is still free
    if !errors.contains_key("email")
        && !state.is_email_available(&form.email).await.map_err(|e| {
            error!(error = %e, "Email availability check failed");
            AppError::from(e)
        })?
    {
        errors
            .entry("email".to_string())
            .or_default()
            .push("User with this Email already exists.".to_string());
    }

    if !errors.is_empty() {
        info!(fields = ?errors.keys().collect::<Vec<_>>(), "Registration form invalid");
        return Ok(rerender(errors));
    }

    // validated above
    let role = Role::from_slug(&form.type_of_user)
        .ok_or_else(|| AppError::Internal("type_of_user passed validation".to_string()))?;

    let password_hash = hash_password(&form.password).map_err(|e| {
        error!(error = %e, "Password hash error");
        AppError::Internal(e.to_string())
    })?;

    let user = match state
        .store
        .create_user(NewUser {
            email: form.email.clone(),
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            password_hash,
        })
        .await
    {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => {
            // lost the race with a concurrent registration
            state.remember_email(&form.email).await;
            let mut errors = FormErrors::new();
            errors.insert(
                "email".to_string(),
                vec!["User with this Email already exists.".to_string()],
            );
            return Ok(rerender(errors));
        }
        Err(e) => return Err(e.into()),
    };
    state.remember_email(&user.email).await;

    let message = templates::activation_email(
        &user,
        &config.site_url(),
        &encode_uid(user.id),
        &state.tokens.make_token(&user),
        role,
    );
    state.mailer.send(&message).await.map_err(|e| {
        error!(error = %e, user_id = user.id, "Failed to send activation email");
        AppError::from(e)
    })?;

    info!(user_id = user.id, role = %role, "User registered, activation email sent");

    Ok(HttpResponse::Ok().json(json!({ "message": CONFIRM_MESSAGE })))
}
