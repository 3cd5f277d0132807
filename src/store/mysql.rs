use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::debug;

use super::{Page, StoreError, UserStore};
use crate::model::{
    customer::{Customer, CustomerListing},
    employee::Employee,
    user::{NewUser, RefreshTokenRecord, User},
};

const USER_COLUMNS: &str = r#"
    id, email, first_name, last_name, password, is_active, is_superuser,
    date_joined, last_login_at
"#;

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

/// Maps MySQL duplicate-key errors (SQLSTATE 23000) to a conflict.
fn map_duplicate(e: sqlx::Error, message: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23000") {
            return StoreError::Conflict(message.to_string());
        }
    }
    StoreError::Database(e)
}

async fn lock_user(tx: &mut Transaction<'_, MySql>, user_id: u64) -> Result<(), StoreError> {
    let found = sqlx::query_scalar::<_, u64>("SELECT id FROM users WHERE id = ? FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound),
    }
}

/// Whether `user_id` already holds a row in the given profile table.
async fn has_profile(
    tx: &mut Transaction<'_, MySql>,
    table: &str,
    user_id: u64,
) -> Result<bool, StoreError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE user_id = ?)");
    let exists = sqlx::query_scalar::<_, i64>(&sql)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(exists != 0)
}

async fn mark_active(tx: &mut Transaction<'_, MySql>, user_id: u64) -> Result<(), StoreError> {
    sqlx::query("UPDATE users SET is_active = TRUE WHERE id = ?")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, first_name, last_name, password, is_active)
            VALUES (?, ?, ?, ?, FALSE)
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| map_duplicate(e, "Email already registered"))?;

        let id = result.last_insert_id();
        debug!(user_id = id, "User row inserted");

        self.find_user(id).await?.ok_or(StoreError::NotFound)
    }

    async fn find_user(&self, id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        // EXISTS comes back as a BIGINT on MySQL
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    async fn touch_last_login(&self, user_id: u64) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn activate_customer(&self, user_id: u64) -> Result<Customer, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;
        mark_active(&mut tx, user_id).await?;

        let result = sqlx::query("INSERT INTO customers (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_duplicate(e, "Customer profile already exists"))?;

        tx.commit().await?;

        Ok(Customer {
            id: result.last_insert_id(),
            user_id,
            photo: None,
        })
    }

    async fn activate_employee(&self, user_id: u64) -> Result<Employee, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;
        // the user row lock serialises this against customer activation
        if has_profile(&mut tx, "customers", user_id).await? {
            return Err(StoreError::Conflict(
                "User already has a customer profile".to_string(),
            ));
        }
        mark_active(&mut tx, user_id).await?;

        let result = sqlx::query("INSERT INTO employees (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_duplicate(e, "Employee profile already exists"))?;

        tx.commit().await?;

        Ok(Employee {
            id: result.last_insert_id(),
            user_id,
            resume: None,
        })
    }

    async fn find_customer(&self, user_id: u64) -> Result<Option<Customer>, StoreError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, user_id, photo FROM customers WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    async fn find_employee(&self, user_id: u64) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT id, user_id, resume FROM employees WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn update_customer_photo(
        &self,
        user_id: u64,
        photo: Option<String>,
    ) -> Result<Customer, StoreError> {
        sqlx::query("UPDATE customers SET photo = ? WHERE user_id = ?")
            .bind(&photo)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.find_customer(user_id).await?.ok_or(StoreError::NotFound)
    }

    async fn update_employee_resume(
        &self,
        user_id: u64,
        resume: Option<String>,
    ) -> Result<Employee, StoreError> {
        sqlx::query("UPDATE employees SET resume = ? WHERE user_id = ?")
            .bind(&resume)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.find_employee(user_id).await?.ok_or(StoreError::NotFound)
    }

    async fn list_customers(&self, page: Page) -> Result<(Vec<CustomerListing>, i64), StoreError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, CustomerListing>(
            r#"
            SELECT c.id, c.user_id, u.email, u.first_name, u.last_name, c.photo
            FROM customers c
            JOIN users u ON u.id = c.user_id
            ORDER BY c.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    async fn has_permission(&self, user_id: u64, codename: &str) -> Result<bool, StoreError> {
        let allowed = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users u
                WHERE u.id = ?
                  AND u.is_active
                  AND (u.is_superuser OR EXISTS(
                      SELECT 1 FROM user_permissions p
                      WHERE p.user_id = u.id AND p.codename = ?
                  ))
            )
            "#,
        )
        .bind(user_id)
        .bind(codename)
        .fetch_one(&self.pool)
        .await?;
        Ok(allowed != 0)
    }

    async fn grant_permission(&self, user_id: u64, codename: &str) -> Result<(), StoreError> {
        // INSERT IGNORE would also swallow the FK failure for a missing user
        let result = sqlx::query(
            r#"
            INSERT INTO user_permissions (user_id, codename)
            SELECT u.id, ? FROM users u WHERE u.id = ?
            ON DUPLICATE KEY UPDATE codename = codename
            "#,
        )
        .bind(codename)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.find_user(user_id).await?.is_none() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_refresh_token(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn rotate_refresh_token(
        &self,
        old_jti: &str,
        user_id: u64,
        new_jti: &str,
        expires_at: i64,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE",
        )
        .bind(old_jti)
        .execute(&mut *tx)
        .await?;

        if revoked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(user_id)
        .bind(new_jti)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
