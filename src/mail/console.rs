use async_trait::async_trait;
use tracing::info;

use super::{EmailMessage, MailError, Mailer};

/// Writes outgoing mail to the log instead of delivering it.
pub struct ConsoleMailer {
    from: String,
}

impl ConsoleMailer {
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            from = %self.from,
            to = ?message.to,
            subject = %message.subject,
            body = %message.body,
            "Email (console delivery)"
        );
        Ok(())
    }
}
