use crate::model::{role::Role, user::User};

use super::EmailMessage;

pub const ACTIVATION_SUBJECT: &str = "Activate your account.";
pub const EMPLOYEE_REVIEW_SUBJECT: &str = "New employee needs activation.";

fn display_name(user: &User) -> String {
    let full = format!("{} {}", user.first_name, user.last_name);
    let full = full.trim();
    if full.is_empty() {
        user.email.clone()
    } else {
        full.to_string()
    }
}

/// Path of the activation endpoint for the given link parts.
pub fn activation_path(uidb64: &str, token: &str, role: Role) -> String {
    format!("/users/activate/{uidb64}/{token}/{role}")
}

/// Mail with the activation link, sent to the registering address.
pub fn activation_email(
    user: &User,
    site_url: &str,
    uidb64: &str,
    token: &str,
    role: Role,
) -> EmailMessage {
    let link = format!("{site_url}{}", activation_path(uidb64, token, role));
    let body = format!(
        "Hi {name},\n\n\
         Please click on the link to confirm your registration:\n\
         {link}\n\n\
         If you did not sign up at {site_url}, ignore this message.",
        name = display_name(user),
    );
    EmailMessage::new(ACTIVATION_SUBJECT, body, user.email.clone())
}

/// Notification asking the site admin to review a confirmed employee.
pub fn employee_activation(user: &User, site_url: &str, admin_email: &str) -> EmailMessage {
    let body = format!(
        "A new employee confirmed their email and is waiting for activation.\n\n\
         Name: {name}\n\
         Email: {email}\n\
         User id: {id}\n\n\
         Review the account at {site_url}.",
        name = display_name(user),
        email = user.email,
        id = user.id,
    );
    EmailMessage::new(EMPLOYEE_REVIEW_SUBJECT, body, admin_email)
}
