use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::AppError,
    model::user::User,
    models::{LoginReqDto, TokenPair, TokenType},
    state::AppState,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::{debug, error, info, instrument};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issue an access/refresh pair for `user` and persist the refresh jti.
pub async fn start_session(
    state: &AppState,
    config: &Config,
    user: &User,
) -> Result<TokenPair, AppError> {
    let access_token = generate_access_token(
        user.id,
        user.email.clone(),
        user.is_superuser,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user.id,
        user.email.clone(),
        user.is_superuser,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");

    state
        .store
        .store_refresh_token(user.id, &refresh_claims.jti, refresh_claims.exp as i64)
        .await?;

    // last_login_at is informational, never fail the login over it
    if let Err(e) = state.store.touch_last_login(user.id).await {
        error!(error = %e, user_id = user.id, "Failed to update last_login_at");
    }

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, config, user), fields(email = %user.email))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    let email = user.email.trim().to_lowercase();
    if email.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Email and password required"
        })));
    }

    let Some(db_user) = state.store.find_user_by_email(&email).await? else {
        info!("Invalid credentials: user not found");
        return Err(AppError::Unauthorized("Invalid credentials"));
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials"));
    }

    // inactive accounts cannot log in until activation completes
    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account inactive");
        return Err(AppError::Unauthorized("Invalid credentials"));
    }

    let tokens = start_session(&state, &config, &db_user).await?;

    info!(user_id = db_user.id, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let token = bearer(&req).ok_or(AppError::Unauthorized("No token"))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required"));
    }

    match state.store.find_refresh_token(&claims.jti).await? {
        Some(record) if !record.revoked && record.user_id == claims.user_id => {}
        _ => return Err(AppError::Unauthorized("Refresh token revoked")),
    }

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.is_superuser,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let rotated = state
        .store
        .rotate_refresh_token(
            &claims.jti,
            claims.user_id,
            &new_claims.jti,
            new_claims.exp as i64,
        )
        .await?;
    if !rotated {
        // lost a race with another refresh or a logout
        return Err(AppError::Unauthorized("Refresh token revoked"));
    }

    let access_token = generate_access_token(
        claims.user_id,
        claims.sub,
        claims.is_superuser,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(TokenPair {
        access_token,
        refresh_token: new_refresh_token,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let Ok(claims) = verify_token(token, &config.jwt_secret) else {
        return HttpResponse::NoContent().finish();
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = state.store.revoke_refresh_token(&claims.jti).await {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}
