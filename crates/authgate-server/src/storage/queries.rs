//! Identity store queries.

use authgate_core::config::LockoutConfig;
use authgate_core::db::{DatabaseError, unix_timestamp};

use super::db::IdentityDatabase;
use super::models::{Identity, NewIdentity};

impl IdentityDatabase {
    /// Insert a new identity. Duplicate usernames or emails (compared
    /// case-insensitively) yield [`DatabaseError::Conflict`].
    pub async fn create_identity(&self, new: &NewIdentity<'_>) -> Result<Identity, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO identities (id, username, email, password_hash, role, first_name, last_name, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new.id)
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.role)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_identity(new.id).await
    }

    /// Get an identity by ID.
    pub async fn get_identity(&self, id: &str) -> Result<Identity, DatabaseError> {
        sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Identity {id}")))
    }

    pub async fn find_identity_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Identity>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE username = ?")
                .bind(username)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    pub async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Identity>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE email = ?")
                .bind(email)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    /// Count a failed login. Once the count reaches the policy threshold the
    /// identity is locked for the configured duration and the count resets.
    ///
    /// Returns `true` if this failure started a lockout.
    pub async fn record_failed_login(
        &self,
        id: &str,
        policy: &LockoutConfig,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();
        let threshold = if policy.enabled {
            i64::from(policy.max_failed_attempts)
        } else {
            i64::MAX
        };
        let lockout_end = now.saturating_add(policy.duration_seconds);

        let row: Option<(Option<i64>,)> = sqlx::query_as(
            "UPDATE identities SET \
               access_failed_count = CASE WHEN access_failed_count + 1 >= ?1 THEN 0 ELSE access_failed_count + 1 END, \
               lockout_end = CASE WHEN access_failed_count + 1 >= ?1 THEN ?2 ELSE lockout_end END, \
               updated_at = ?3 \
             WHERE id = ?4 \
             RETURNING lockout_end",
        )
        .bind(threshold)
        .bind(lockout_end)
        .bind(now)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        let (new_end,) = row.ok_or_else(|| DatabaseError::NotFound(format!("Identity {id}")))?;
        Ok(new_end.is_some_and(|end| end > now))
    }

    /// Clear the failure count and any lockout.
    pub async fn reset_failed_logins(&self, id: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE identities SET access_failed_count = 0, lockout_end = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Identity {id}")));
        }
        Ok(())
    }

    /// Replace the identity's role list.
    pub async fn set_role(&self, id: &str, role: &str) -> Result<Identity, DatabaseError> {
        let result = sqlx::query("UPDATE identities SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role)
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Identity {id}")));
        }
        self.get_identity(id).await
    }
}
