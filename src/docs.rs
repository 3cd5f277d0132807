use crate::api::activation::ActivatedResponse;
use crate::api::cabinet::CabinetResponse;
use crate::api::customers::{CustomerListResponse, CustomerQuery};
use crate::api::registration::RegistrationFormSpec;
use crate::model::customer::{Customer, CustomerListing};
use crate::model::employee::Employee;
use crate::model::role::Role;
use crate::models::{GrantPermission, LoginReqDto, ProfileUpdate, RegistrationForm, TokenPair};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Portal Users API",
        version = "1.0.0",
        description = r#"
## Portal user accounts

Registration, email activation and profiles for two kinds of users.

### 🔹 Flow
- **Register** with `type_of_user` set to `employee` or `customer`
  - the account stays inactive and an activation link is emailed
- **Activate**
  - customers are activated and logged in by the link itself
  - employees are reviewed by the site admin, who approves them
- **Cabinet** shows the caller's own account and profile
- **Profile** edits the resume (employees) or the photo (customers)
- **Customers** lists customer accounts for users holding `users.can_view`

### 🔐 Security
Endpoints under `/api` require a **JWT Bearer** access token from `/auth/login`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::registration::registration_form,
        crate::api::registration::register,
        crate::api::activation::activate,
        crate::api::activation::approve_employee,

        crate::api::cabinet::cabinet,
        crate::api::cabinet::profile_form,
        crate::api::cabinet::update_profile,

        crate::api::customers::list_customers,
        crate::api::customers::grant_permission
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            RegistrationForm,
            RegistrationFormSpec,
            ActivatedResponse,
            CabinetResponse,
            ProfileUpdate,
            Role,
            Employee,
            Customer,
            CustomerListing,
            CustomerQuery,
            CustomerListResponse,
            GrantPermission
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Registration", description = "Sign-up and activation links"),
        (name = "Employee", description = "Employee review"),
        (name = "Cabinet", description = "The caller's own account and profile"),
        (name = "Customer", description = "Customer list and permissions"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
