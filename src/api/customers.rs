use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::customer::CustomerListing,
    models::GrantPermission,
    state::AppState,
    store::{CAN_VIEW_CUSTOMERS, Page},
};

/// Shown instead of the list to callers without the view permission.
pub const NO_PERMISSION_TEXT: &str = "Сен бул жерде болбошуң керек :)";

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct CustomerQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct CustomerListResponse {
    pub no_permission: bool,
    #[schema(nullable = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_permission_text: Option<String>,
    pub data: Vec<CustomerListing>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/customers",
    params(CustomerQuery),
    responses(
        (status = 200, description = "Customer list, or an empty list flagged `no_permission`", body = CustomerListResponse),
        (status = 401, description = "Login required")
    ),
    tag = "Customer",
    security(("bearer_auth" = []))
)]
#[instrument(name = "list_customers", skip(state, query), fields(user_id = auth.user_id))]
pub async fn list_customers(
    auth: AuthUser,
    query: web::Query<CustomerQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let page = Page::new(query.page, query.per_page);

    if !state.store.has_permission(auth.user_id, CAN_VIEW_CUSTOMERS).await? {
        info!("Customer list refused: missing permission");
        return Ok(HttpResponse::Ok().json(CustomerListResponse {
            no_permission: true,
            no_permission_text: Some(NO_PERMISSION_TEXT.to_string()),
            data: Vec::new(),
            page: page.page,
            per_page: page.per_page,
            total: 0,
        }));
    }

    let (data, total) = state.store.list_customers(page).await?;

    Ok(HttpResponse::Ok().json(CustomerListResponse {
        no_permission: false,
        no_permission_text: None,
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    post,
    path = "/api/users/{user_id}/permissions",
    params(("user_id", Path, description = "Id of the user receiving the permission")),
    request_body = GrantPermission,
    responses(
        (status = 204, description = "Permission granted (idempotent)"),
        (status = 400, description = "Empty codename"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    tag = "Customer",
    security(("bearer_auth" = []))
)]
pub async fn grant_permission(
    auth: AuthUser,
    path: web::Path<u64>,
    payload: web::Json<GrantPermission>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    let codename = payload.codename.trim();
    if codename.is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "codename required"
        })));
    }

    state.store.grant_permission(user_id, codename).await?;

    info!(user_id, codename, granted_by = auth.user_id, "Permission granted");
    Ok(HttpResponse::NoContent().finish())
}
