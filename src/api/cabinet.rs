use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::{customer::Customer, employee::Employee, role::Role, user::User},
    models::ProfileUpdate,
    state::AppState,
};
use actix_web::{HttpResponse, http::header, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct CabinetResponse {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "Jane")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    pub is_active: bool,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub date_joined: DateTime<Utc>,
    #[schema(nullable = true)]
    pub role: Option<Role>,
    #[schema(nullable = true)]
    pub employee: Option<Employee>,
    #[schema(nullable = true)]
    pub customer: Option<Customer>,
}

/// The object the profile form edits, chosen by role.
enum Profile {
    Employee(Employee),
    Customer(Customer),
}

impl Profile {
    fn role(&self) -> Role {
        match self {
            Profile::Employee(_) => Role::Employee,
            Profile::Customer(_) => Role::Customer,
        }
    }

    fn form(&self) -> serde_json::Value {
        let role = self.role();
        let value = match self {
            Profile::Employee(e) => json!(e.resume),
            Profile::Customer(c) => json!(c.photo),
        };
        json!({
            "role": role,
            "fields": [role.editable_field()],
            "profile": { role.editable_field(): value },
        })
    }
}

async fn current_user(state: &AppState, auth: &AuthUser) -> Result<User, AppError> {
    state
        .store
        .find_user(auth.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AppError::Unauthorized("Account not found or inactive"))
}

/// Employee profile wins when, unexpectedly, both exist.
async fn load_profile(state: &AppState, user_id: u64) -> Result<Option<Profile>, AppError> {
    if let Some(employee) = state.store.find_employee(user_id).await? {
        return Ok(Some(Profile::Employee(employee)));
    }
    Ok(state
        .store
        .find_customer(user_id)
        .await?
        .map(Profile::Customer))
}

#[utoipa::path(
    get,
    path = "/api/cabinet",
    responses(
        (status = 200, description = "The caller's own profile", body = CabinetResponse),
        (status = 401, description = "Login required")
    ),
    tag = "Cabinet",
    security(("bearer_auth" = []))
)]
pub async fn cabinet(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let user = current_user(&state, &auth).await?;
    let employee = state.store.find_employee(user.id).await?;
    let customer = state.store.find_customer(user.id).await?;

    let role = match (&employee, &customer) {
        (Some(_), _) => Some(Role::Employee),
        (None, Some(_)) => Some(Role::Customer),
        (None, None) => None,
    };

    Ok(HttpResponse::Ok().json(CabinetResponse {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        is_active: user.is_active,
        date_joined: user.date_joined,
        role,
        employee,
        customer,
    }))
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Editable profile fields for the caller's role", body = Object, example = json!({
            "role": "employee",
            "fields": ["resume"],
            "profile": { "resume": "/media/resumes/7.pdf" }
        })),
        (status = 401, description = "Login required"),
        (status = 404, description = "No employee or customer profile")
    ),
    tag = "Cabinet",
    security(("bearer_auth" = []))
)]
pub async fn profile_form(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&state, &auth).await?;
    let profile = load_profile(&state, user.id)
        .await?
        .ok_or(AppError::NotFound("No profile to edit"))?;
    Ok(HttpResponse::Ok().json(profile.form()))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 303, description = "Saved, see the cabinet"),
        (status = 400, description = "Form errors"),
        (status = 401, description = "Login required"),
        (status = 404, description = "No employee or customer profile")
    ),
    tag = "Cabinet",
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    auth: AuthUser,
    payload: web::Json<ProfileUpdate>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&state, &auth).await?;
    let profile = load_profile(&state, user.id)
        .await?
        .ok_or(AppError::NotFound("No profile to edit"))?;

    let role = profile.role();
    let payload = payload.into_inner();
    // only the role's own field is bound, anything else is ignored
    let value = match role {
        Role::Employee => payload.resume,
        Role::Customer => payload.photo,
    };
    let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        debug!(user_id = user.id, role = %role, "Profile form missing its field");
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "error",
            "errors": { role.editable_field(): ["This field is required."] },
        })));
    };

    match profile {
        Profile::Employee(_) => {
            state.store.update_employee_resume(user.id, Some(value)).await?;
        }
        Profile::Customer(_) => {
            state.store.update_customer_photo(user.id, Some(value)).await?;
        }
    }

    info!(user_id = user.id, role = %role, "Profile updated");

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, format!("{}/cabinet", config.api_prefix)))
        .finish())
}

#[cfg(test)]
mod tests {
    use crate::store::UserStore;
    use crate::test_utils::{TestApp, bearer_header};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn cabinet_requires_login() {
        let ctx = TestApp::new();
        let app = test::init_service(ctx.app()).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/cabinet").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/cabinet")
                .insert_header(bearer_header("garbage"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn cabinet_shows_own_customer_profile() {
        let ctx = TestApp::new();
        let user = ctx.seed_active_customer("cust@example.com", "secret-pass").await;
        let token = ctx.access_token_for(&user);
        let app = test::init_service(ctx.app()).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/cabinet")
                .insert_header(bearer_header(&token))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["email"], "cust@example.com");
        assert_eq!(body["role"], "customer");
        assert!(body["employee"].is_null());
        assert_eq!(body["customer"]["user_id"], user.id);
        assert!(body.get("password").is_none());
    }

    #[actix_web::test]
    async fn employee_edits_resume_only() {
        let ctx = TestApp::new();
        let user = ctx.seed_active_employee("emp@example.com", "secret-pass").await;
        let token = ctx.access_token_for(&user);
        let app = test::init_service(ctx.app()).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/profile")
                .insert_header(bearer_header(&token))
                .to_request(),
        )
        .await;
        let form: Value = test::read_body_json(resp).await;
        assert_eq!(form["fields"], json!(["resume"]));

        let resp = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/api/profile")
                .insert_header(bearer_header(&token))
                .set_json(json!({"resume": "/media/resumes/cv.pdf", "photo": "/ignored.png"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get("location").unwrap(), "/api/cabinet");

        let employee = ctx.store.find_employee(user.id).await.unwrap().unwrap();
        assert_eq!(employee.resume.as_deref(), Some("/media/resumes/cv.pdf"));
    }

    #[actix_web::test]
    async fn customer_edits_photo_and_needs_the_field() {
        let ctx = TestApp::new();
        let user = ctx.seed_active_customer("cust@example.com", "secret-pass").await;
        let token = ctx.access_token_for(&user);
        let app = test::init_service(ctx.app()).await;

        // a resume is not a customer field
        let resp = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/api/profile")
                .insert_header(bearer_header(&token))
                .set_json(json!({"resume": "/media/resumes/cv.pdf"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["errors"]["photo"].is_array());

        let resp = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/api/profile")
                .insert_header(bearer_header(&token))
                .set_json(json!({"photo": "/media/photos/me.jpg"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let customer = ctx.store.find_customer(user.id).await.unwrap().unwrap();
        assert_eq!(customer.photo.as_deref(), Some("/media/photos/me.jpg"));
    }

    #[actix_web::test]
    async fn user_without_profile_gets_404() {
        let ctx = TestApp::new();
        let admin = ctx.seed_superuser("root@example.com", "secret-pass").await;
        let token = ctx.access_token_for(&admin);
        let app = test::init_service(ctx.app()).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/profile")
                .insert_header(bearer_header(&token))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
