use std::sync::Arc;

use crate::auth::tokens::ActivationTokens;
use crate::config::Config;
use crate::mail::Mailer;
use crate::store::{StoreError, UserStore};
use crate::utils::{email_cache::EmailCache, email_filter::EmailFilter};

/// Shared per-process services handed to every handler.
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub tokens: ActivationTokens,
    pub email_filter: EmailFilter,
    pub email_cache: EmailCache,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            tokens: ActivationTokens::new(config.secret_key.clone(), config.activation_token_ttl),
            email_filter: EmailFilter::new(),
            email_cache: EmailCache::new(),
        }
    }

    /// Ok(true)  => email AVAILABLE
    /// Ok(false) => email TAKEN
    pub async fn is_email_available(&self, email: &str) -> Result<bool, StoreError> {
        // 1. cuckoo filter: a miss means the address was never registered
        if !self.email_filter.might_exist(email) {
            return Ok(true);
        }

        // 2. moka cache: fast positive
        if self.email_cache.is_taken(email).await {
            return Ok(false);
        }

        // 3. database fallback
        let taken = self.store.email_exists(&email.to_lowercase()).await?;

        if taken {
            self.email_cache.mark_taken(email).await;
        }
        Ok(!taken)
    }

    /// Record a newly registered address in the filter and cache.
    pub async fn remember_email(&self, email: &str) {
        self.email_filter.insert(email);
        self.email_cache.mark_taken(email).await;
    }
}
