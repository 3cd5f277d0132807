//! Shared fixtures for handler tests: an app wired to in-memory adapters.

use std::sync::Arc;

use actix_web::{
    App, Error,
    body::BoxBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::header,
    web,
};

use crate::{
    auth::{jwt::generate_access_token, password::hash_password},
    config::Config,
    mail::memory::MemoryMailer,
    model::user::{NewUser, User},
    routes,
    state::AppState,
    store::{UserStore, memory::MemoryStore},
};

pub struct TestApp {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    pub state: web::Data<AppState>,
}

impl TestApp {
    pub fn new() -> Self {
        let config = Config::for_tests();
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::default());
        let state = web::Data::new(AppState::new(&config, store.clone(), mailer.clone()));
        Self {
            config,
            store,
            mailer,
            state,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<BoxBody>,
            Error = Error,
            InitError = (),
        > + use<>,
    > {
        let config = self.config.clone();
        App::new()
            .app_data(self.state.clone())
            .app_data(web::Data::new(self.config.clone()))
            .configure(move |cfg| routes::configure(cfg, &config))
    }

    /// Registered but never activated.
    pub async fn seed_inactive_user(&self, email: &str, password: &str) -> User {
        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                password_hash: hash_password(password).expect("hash password"),
            })
            .await
            .expect("create user");
        self.state.remember_email(&user.email).await;
        user
    }

    pub async fn seed_active_customer(&self, email: &str, password: &str) -> User {
        let user = self.seed_inactive_user(email, password).await;
        self.store
            .activate_customer(user.id)
            .await
            .expect("activate customer");
        self.reload(user.id).await
    }

    pub async fn seed_active_employee(&self, email: &str, password: &str) -> User {
        let user = self.seed_inactive_user(email, password).await;
        self.store
            .activate_employee(user.id)
            .await
            .expect("activate employee");
        self.reload(user.id).await
    }

    /// Active superuser without a role profile.
    pub async fn seed_superuser(&self, email: &str, password: &str) -> User {
        let user = self.seed_inactive_user(email, password).await;
        self.store.promote_superuser(user.id);
        self.reload(user.id).await
    }

    pub async fn user_by_email(&self, email: &str) -> Option<User> {
        self.store
            .find_user_by_email(email)
            .await
            .expect("store lookup")
    }

    pub fn access_token_for(&self, user: &User) -> String {
        generate_access_token(
            user.id,
            user.email.clone(),
            user.is_superuser,
            &self.config.jwt_secret,
            self.config.access_token_ttl,
        )
        .expect("sign access token")
    }

    async fn reload(&self, user_id: u64) -> User {
        self.store
            .find_user(user_id)
            .await
            .expect("store lookup")
            .expect("seeded user exists")
    }
}

pub fn bearer_header(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}
