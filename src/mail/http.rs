use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info};

use super::{EmailMessage, MailError, Mailer};

/// Posts messages as JSON to a transactional mail relay.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>, from: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let mut request = self.client.post(&self.endpoint).json(&json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "text": message.body,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), to = ?message.to, "Mail relay rejected message");
            return Err(MailError::Rejected(status.as_u16()));
        }

        info!(to = ?message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}
