use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod mail;
mod model;
mod models;
mod routes;
mod state;
mod store;
mod utils;

#[cfg(test)]
mod test_utils;

use config::Config;
use db::init_db;
use state::AppState;
use store::mysql::MySqlStore;

use crate::docs::ApiDoc;
use tracing::{Level, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

/// Landing target after a customer's activation link logs them in.
#[get("/")]
async fn index(config: Data<Config>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "portal-users",
        "register": "/users/register",
        "cabinet": format!("{}/cabinet", config.api_prefix),
        "docs": "/swagger-ui/",
    }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level.parse::<Level>().unwrap_or(Level::DEBUG))
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;

    let state = Data::new(AppState::new(
        &config,
        Arc::new(MySqlStore::new(pool.clone())),
        mail::from_config(&config),
    ));

    let filter_state = state.clone();
    let filter_pool = pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = filter_state.email_filter.warmup(&filter_pool, 100).await {
            warn!(error = %e, "Failed to warmup email filter");
        }
    });

    let cache_state = state.clone();
    let cache_pool = pool.clone();
    actix_web::rt::spawn(async move {
        // Warm up last 30 days of recent logins in batches of 250
        if let Err(e) = cache_state.email_cache.warmup(&cache_pool, 30, 250).await {
            warn!(error = %e, "Failed to warmup email cache");
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .service(index)
            // Registration, auth and protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
