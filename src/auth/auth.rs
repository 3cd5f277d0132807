use crate::config::Config;
use crate::error::AppError;
use crate::models::TokenType;
use crate::auth::jwt::verify_token;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

/// Authenticated caller, taken from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub is_superuser: bool,
}

impl AuthUser {
    fn from_bearer(req: &HttpRequest) -> Result<Self, actix_web::Error> {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| ErrorUnauthorized("Missing token"))?;

        let config = req
            .app_data::<Data<Config>>()
            .ok_or_else(|| actix_web::error::ErrorInternalServerError("Config missing"))?;

        let claims =
            verify_token(token, &config.jwt_secret).map_err(|_| ErrorUnauthorized("Invalid token"))?;

        if claims.token_type != TokenType::Access {
            return Err(ErrorUnauthorized("Invalid token"));
        }

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            is_superuser: claims.is_superuser,
        })
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_superuser {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only"))
        }
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // auth_middleware has already decoded the token on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        ready(Self::from_bearer(req))
    }
}
