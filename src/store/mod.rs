//! Persistence seam for accounts, role profiles, permissions and refresh tokens.
//!
//! Handlers only see [`UserStore`]; the MySQL adapter lives in [`mysql`] and
//! tests run against the in-memory adapter.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    customer::{Customer, CustomerListing},
    employee::Employee,
    user::{NewUser, RefreshTokenRecord, User},
};

pub mod mysql;

#[cfg(test)]
pub mod memory;

/// Permission required to browse the customer list.
pub const CAN_VIEW_CUSTOMERS: &str = "users.can_view";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(20).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert an inactive user. Duplicate email yields [`StoreError::Conflict`].
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: u64) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    async fn touch_last_login(&self, user_id: u64) -> Result<(), StoreError>;

    /// Mark the user active and attach a customer profile, atomically.
    async fn activate_customer(&self, user_id: u64) -> Result<Customer, StoreError>;

    /// Mark the user active and attach an employee profile, atomically.
    async fn activate_employee(&self, user_id: u64) -> Result<Employee, StoreError>;

    async fn find_customer(&self, user_id: u64) -> Result<Option<Customer>, StoreError>;

    async fn find_employee(&self, user_id: u64) -> Result<Option<Employee>, StoreError>;

    async fn update_customer_photo(
        &self,
        user_id: u64,
        photo: Option<String>,
    ) -> Result<Customer, StoreError>;

    async fn update_employee_resume(
        &self,
        user_id: u64,
        resume: Option<String>,
    ) -> Result<Employee, StoreError>;

    /// One page of customers plus the total count.
    async fn list_customers(&self, page: Page) -> Result<(Vec<CustomerListing>, i64), StoreError>;

    /// Superusers hold every permission.
    async fn has_permission(&self, user_id: u64, codename: &str) -> Result<bool, StoreError>;

    async fn grant_permission(&self, user_id: u64, codename: &str) -> Result<(), StoreError>;

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> Result<(), StoreError>;

    async fn find_refresh_token(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Revoke `old_jti` and store `new_jti` in one step. Returns `false` when
    /// the old token was missing or already revoked.
    async fn rotate_refresh_token(
        &self,
        old_jti: &str,
        user_id: u64,
        new_jti: &str,
        expires_at: i64,
    ) -> Result<bool, StoreError>;

    /// Idempotent.
    async fn revoke_refresh_token(&self, jti: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(Page::new(None, None), Page { page: 1, per_page: 20 });
        assert_eq!(Page::new(Some(0), Some(1000)), Page { page: 1, per_page: 100 });
        assert_eq!(Page::new(Some(3), Some(10)).offset(), 20);
    }
}
