//! In-memory [`UserStore`] used by handler tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use super::{Page, StoreError, UserStore};
use crate::model::{
    customer::{Customer, CustomerListing},
    employee::Employee,
    user::{NewUser, RefreshTokenRecord, User},
};

#[derive(Default)]
struct Tables {
    next_id: u64,
    users: Vec<User>,
    customers: Vec<Customer>,
    employees: Vec<Employee>,
    permissions: HashSet<(u64, String)>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_mut(&mut self, id: u64) -> Result<&mut User, StoreError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make email lookups fail the way a lost database connection does.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Turn an existing account into an active superuser, the way the
    /// admin tooling creates one.
    pub fn promote_superuser(&self, user_id: u64) {
        if let Ok(user) = self.lock().user_mut(user_id) {
            user.is_superuser = true;
            user.is_active = true;
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        let user = User {
            id: tables.next_id(),
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            password: new_user.password_hash,
            is_active: false,
            is_superuser: false,
            date_joined: Utc::now(),
            last_login_at: None,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: u64) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.lock().users.iter().any(|u| u.email == email))
    }

    async fn touch_last_login(&self, user_id: u64) -> Result<(), StoreError> {
        self.lock().user_mut(user_id)?.last_login_at = Some(Utc::now());
        Ok(())
    }

    async fn activate_customer(&self, user_id: u64) -> Result<Customer, StoreError> {
        let mut tables = self.lock();
        tables.user_mut(user_id)?;
        if tables.customers.iter().any(|c| c.user_id == user_id) {
            return Err(StoreError::Conflict("Customer profile already exists".to_string()));
        }
        tables.user_mut(user_id)?.is_active = true;
        let customer = Customer {
            id: tables.next_id(),
            user_id,
            photo: None,
        };
        tables.customers.push(customer.clone());
        Ok(customer)
    }

    async fn activate_employee(&self, user_id: u64) -> Result<Employee, StoreError> {
        let mut tables = self.lock();
        tables.user_mut(user_id)?;
        if tables.customers.iter().any(|c| c.user_id == user_id) {
            return Err(StoreError::Conflict(
                "User already has a customer profile".to_string(),
            ));
        }
        if tables.employees.iter().any(|e| e.user_id == user_id) {
            return Err(StoreError::Conflict("Employee profile already exists".to_string()));
        }
        tables.user_mut(user_id)?.is_active = true;
        let employee = Employee {
            id: tables.next_id(),
            user_id,
            resume: None,
        };
        tables.employees.push(employee.clone());
        Ok(employee)
    }

    async fn find_customer(&self, user_id: u64) -> Result<Option<Customer>, StoreError> {
        Ok(self
            .lock()
            .customers
            .iter()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn find_employee(&self, user_id: u64) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .lock()
            .employees
            .iter()
            .find(|e| e.user_id == user_id)
            .cloned())
    }

    async fn update_customer_photo(
        &self,
        user_id: u64,
        photo: Option<String>,
    ) -> Result<Customer, StoreError> {
        let mut tables = self.lock();
        let customer = tables
            .customers
            .iter_mut()
            .find(|c| c.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        customer.photo = photo;
        Ok(customer.clone())
    }

    async fn update_employee_resume(
        &self,
        user_id: u64,
        resume: Option<String>,
    ) -> Result<Employee, StoreError> {
        let mut tables = self.lock();
        let employee = tables
            .employees
            .iter_mut()
            .find(|e| e.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        employee.resume = resume;
        Ok(employee.clone())
    }

    async fn list_customers(&self, page: Page) -> Result<(Vec<CustomerListing>, i64), StoreError> {
        let tables = self.lock();
        let mut rows: Vec<CustomerListing> = tables
            .customers
            .iter()
            .filter_map(|c| {
                tables.users.iter().find(|u| u.id == c.user_id).map(|u| CustomerListing {
                    id: c.id,
                    user_id: c.user_id,
                    email: u.email.clone(),
                    first_name: u.first_name.clone(),
                    last_name: u.last_name.clone(),
                    photo: c.photo.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));

        let total = rows.len() as i64;
        let data = rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .collect();
        Ok((data, total))
    }

    async fn has_permission(&self, user_id: u64, codename: &str) -> Result<bool, StoreError> {
        let tables = self.lock();
        let Some(user) = tables.users.iter().find(|u| u.id == user_id) else {
            return Ok(false);
        };
        if !user.is_active {
            return Ok(false);
        }
        Ok(user.is_superuser
            || tables
                .permissions
                .contains(&(user_id, codename.to_string())))
    }

    async fn grant_permission(&self, user_id: u64, codename: &str) -> Result<(), StoreError> {
        let mut tables = self.lock();
        tables.user_mut(user_id)?;
        tables.permissions.insert((user_id, codename.to_string()));
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        _expires_at: i64,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let id = tables.next_id();
        tables.refresh_tokens.insert(
            jti.to_string(),
            RefreshTokenRecord {
                id,
                user_id,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn find_refresh_token(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.lock().refresh_tokens.get(jti).cloned())
    }

    async fn rotate_refresh_token(
        &self,
        old_jti: &str,
        user_id: u64,
        new_jti: &str,
        _expires_at: i64,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.refresh_tokens.get_mut(old_jti) {
            Some(record) if !record.revoked => record.revoked = true,
            _ => return Ok(false),
        }
        let id = tables.next_id();
        tables.refresh_tokens.insert(
            new_jti.to_string(),
            RefreshTokenRecord {
                id,
                user_id,
                revoked: false,
            },
        );
        Ok(true)
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<(), StoreError> {
        if let Some(record) = self.lock().refresh_tokens.get_mut(jti) {
            record.revoked = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[actix_web::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let err = store.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[actix_web::test]
    async fn activate_customer_only_once() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("b@example.com")).await.unwrap();
        assert!(!user.is_active);

        store.activate_customer(user.id).await.unwrap();
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert!(user.is_active);

        let err = store.activate_customer(user.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[actix_web::test]
    async fn customer_cannot_become_employee() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("c@example.com")).await.unwrap();
        store.activate_customer(user.id).await.unwrap();

        let err = store.activate_employee(user.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.find_employee(user.id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn rotation_refuses_revoked_tokens() {
        let store = MemoryStore::new();
        store.store_refresh_token(1, "old", 0).await.unwrap();
        assert!(store.rotate_refresh_token("old", 1, "new", 0).await.unwrap());
        assert!(!store.rotate_refresh_token("old", 1, "newer", 0).await.unwrap());
        assert!(!store.find_refresh_token("new").await.unwrap().unwrap().revoked);
    }
}
