use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Key for activation-link tokens.
    pub secret_key: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,
    pub activation_token_ttl: u64,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_activate_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Site and mail
    pub site_domain: String,
    pub site_scheme: String,
    pub admin_email: String,
    pub mail_from: String,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,

    pub log_dir: String,
    pub log_level: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let jwt_secret = required("JWT_SECRET")?;

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            secret_key: optional("SECRET_KEY").unwrap_or_else(|| jwt_secret.clone()),
            jwt_secret,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days
            activation_token_ttl: parsed_or("ACTIVATION_TOKEN_TTL", 259_200)?, // 3 days

            rate_limit_enabled: parsed_or("RATE_LIMIT_ENABLED", true)?,
            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed_or("RATE_REGISTER_PER_MIN", 30)?,
            rate_activate_per_min: parsed_or("RATE_ACTIVATE_PER_MIN", 30)?,
            rate_refresh_per_min: parsed_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: optional("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            site_domain: optional("SITE_DOMAIN").unwrap_or_else(|| "localhost:8080".to_string()),
            site_scheme: optional("SITE_SCHEME").unwrap_or_else(|| "http".to_string()),
            admin_email: required("ADMIN_EMAIL")?,
            mail_from: optional("MAIL_FROM").unwrap_or_else(|| "noreply@localhost".to_string()),
            mail_api_url: optional("MAIL_API_URL"),
            mail_api_key: optional("MAIL_API_KEY"),

            log_dir: optional("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: optional("LOG_LEVEL").unwrap_or_else(|| "debug".to_string()),
        })
    }

    /// Base URL links in outgoing mail point at.
    pub fn site_url(&self) -> String {
        format!("{}://{}", self.site_scheme, self.site_domain)
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://unused".to_string(),
            jwt_secret: "test-jwt-secret".to_string(),
            secret_key: "test-secret-key".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            activation_token_ttl: 259_200,
            rate_limit_enabled: false,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_activate_per_min: 30,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            site_domain: "portal.test".to_string(),
            site_scheme: "https".to_string(),
            admin_email: "admin@portal.test".to_string(),
            mail_from: "noreply@portal.test".to_string(),
            mail_api_url: None,
            mail_api_key: None,
            log_dir: "logs".to_string(),
            log_level: "debug".to_string(),
        }
    }
}
