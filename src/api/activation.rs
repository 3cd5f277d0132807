use crate::{
    auth::{auth::AuthUser, handlers::start_session, tokens::decode_uid},
    config::Config,
    error::AppError,
    mail::templates,
    model::{employee::Employee, role::Role, user::User},
    state::AppState,
    store::StoreError,
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

pub const WRONG_LINK_MESSAGE: &str = "Activation url is wrong!";
pub const ADMIN_NOTIFIED_MESSAGE: &str = "Activation request sent to site admin";

#[derive(Serialize, ToSchema)]
pub struct ActivatedResponse {
    #[schema(example = "Account activated")]
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Where the client should go next (the site index).
    #[schema(example = "/")]
    pub redirect_to: String,
}

fn page(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": message }))
}

/// Resolve the link's uid to a user, treating every failure as "no user".
async fn resolve_user(state: &AppState, uidb64: &str) -> Option<User> {
    let id = decode_uid(uidb64)?;
    match state.store.find_user(id).await {
        Ok(user) => user,
        Err(e) => {
            error!(error = %e, user_id = id, "Failed to look up user for activation");
            None
        }
    }
}

#[utoipa::path(
    get,
    path = "/users/activate/{uidb64}/{token}/{type_of_user}",
    params(
        ("uidb64", Path, description = "URL-safe base64 of the user id"),
        ("token", Path, description = "Account activation token"),
        ("type_of_user", Path, description = "employee or customer")
    ),
    responses(
        (status = 200, description = "Customer activated and logged in; otherwise a page with only `message` (admin notified or link rejected)", body = ActivatedResponse)
    ),
    tag = "Registration"
)]
#[instrument(name = "activate", skip(state, config, path), fields(type_of_user = %path.2))]
pub async fn activate(
    path: web::Path<(String, String, String)>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let (uidb64, token, type_of_user) = path.into_inner();

    let Some(user) = resolve_user(&state, &uidb64).await else {
        info!("Activation link names no user");
        return Ok(page(WRONG_LINK_MESSAGE));
    };

    if !state.tokens.check_token(&user, &token) {
        info!(user_id = user.id, "Activation token rejected");
        return Ok(page(WRONG_LINK_MESSAGE));
    }

    match Role::from_slug(&type_of_user) {
        Some(Role::Employee) => {
            let message =
                templates::employee_activation(&user, &config.site_url(), &config.admin_email);
            state.mailer.send(&message).await.map_err(|e| {
                error!(error = %e, user_id = user.id, "Failed to notify admin");
                AppError::from(e)
            })?;

            info!(user_id = user.id, "Employee confirmed email, admin notified");
            Ok(page(ADMIN_NOTIFIED_MESSAGE))
        }
        Some(Role::Customer) => {
            state.store.activate_customer(user.id).await?;

            let user = User {
                is_active: true,
                ..user
            };
            let tokens = start_session(&state, &config, &user).await?;

            info!(user_id = user.id, "Customer activated and logged in");
            Ok(HttpResponse::Ok().json(ActivatedResponse {
                message: "Account activated".to_string(),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                redirect_to: "/".to_string(),
            }))
        }
        None => {
            warn!(user_id = user.id, type_of_user = %type_of_user, "Unknown type_of_user in activation link");
            Ok(page(WRONG_LINK_MESSAGE))
        }
    }
}

/// Manual review outcome for a confirmed employee.
#[utoipa::path(
    post,
    path = "/api/employees/{user_id}/approve",
    params(("user_id", Path, description = "Id of the user to approve as employee")),
    responses(
        (status = 200, description = "User activated with an employee profile", body = Employee),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User already has a profile")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn approve_employee(
    auth: AuthUser,
    path: web::Path<u64>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    let employee = match state.store.activate_employee(user.id).await {
        Ok(employee) => employee,
        Err(StoreError::Conflict(msg)) => return Err(AppError::Conflict(msg)),
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, approved_by = auth.user_id, "Employee approved");
    Ok(HttpResponse::Ok().json(employee))
}
