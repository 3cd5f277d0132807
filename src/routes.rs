use crate::{
    api::{activation, cabinet, customers, registration},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{
    middleware::{Condition, from_fn},
    web,
};

type Limiter = Condition<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    // Helper to build per-route limiter
    let build_limiter = |requests_per_min: u32| -> Limiter {
        let requests_per_min = requests_per_min.max(1);
        let governor_cfg = GovernorConfigBuilder::default()
            .per_millisecond((60_000 / u64::from(requests_per_min)).max(1))
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Condition::new(config.rate_limit_enabled, Governor::new(&governor_cfg))
    };

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(build_limiter(config.rate_refresh_per_min))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    cfg.service(
        web::scope("/users")
            .service(
                web::resource("/register")
                    .wrap(build_limiter(config.rate_register_per_min))
                    .route(web::get().to(registration::registration_form))
                    .route(web::post().to(registration::register)),
            )
            .service(
                web::resource("/activate/{uidb64}/{token}/{type_of_user}")
                    .wrap(build_limiter(config.rate_activate_per_min))
                    .route(web::get().to(activation::activate)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(build_limiter(config.rate_protected_per_min)) // rate limiting
            .service(web::resource("/cabinet").route(web::get().to(cabinet::cabinet)))
            .service(
                web::resource("/profile")
                    .route(web::get().to(cabinet::profile_form))
                    .route(web::put().to(cabinet::update_profile)),
            )
            .service(web::resource("/customers").route(web::get().to(customers::list_customers)))
            .service(
                web::resource("/employees/{user_id}/approve")
                    .route(web::post().to(activation::approve_employee)),
            )
            .service(
                web::resource("/users/{user_id}/permissions")
                    .route(web::post().to(customers::grant_permission)),
            ),
    );
}

// LOGIN
//  ├─ access_token (ACCESS_TOKEN_TTL, 15 min)
//  └─ refresh_token (REFRESH_TOKEN_TTL, 7 days)

// REGISTER
//  └─ inactive user + mail with /users/activate/{uidb64}/{token}/{type_of_user}
//       ├─ customer: activated, logged in
//       └─ employee: admin mailed, POST {api_prefix}/employees/{id}/approve
