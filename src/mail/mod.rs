//! Outbound email: the [`Mailer`] seam, its adapters and the message bodies.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;

pub mod console;
pub mod http;
pub mod templates;

#[cfg(test)]
pub mod memory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
    pub to: Vec<String>,
}

impl EmailMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            to: vec![to.into()],
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail relay rejected message with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// HTTP relay when `MAIL_API_URL` is configured, console otherwise.
pub fn from_config(config: &Config) -> Arc<dyn Mailer> {
    match &config.mail_api_url {
        Some(url) => Arc::new(http::HttpMailer::new(
            url.clone(),
            config.mail_api_key.clone(),
            config.mail_from.clone(),
        )),
        None => Arc::new(console::ConsoleMailer::new(config.mail_from.clone())),
    }
}
