//! User account queries — credential verification, role lookup, profile CRUD.
//!
//! Passwords are stored as salted SHA-256 digests (base64). The salt is a
//! random UUID generated per account at creation or password change.

use anyhow::Result;
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::Database;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_FOREMAN: &str = "foreman";
pub const ROLE_CLIENT: &str = "client";

/// Accepted account roles, in descending privilege order.
pub const ROLES: [&str; 3] = [ROLE_ADMIN, ROLE_FOREMAN, ROLE_CLIENT];

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: uuid::Uuid,
    pub email: String,
    pub role: String,
    pub display_name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: uuid::Uuid,
    password_hash: String,
    password_salt: String,
}

/// Salted password digest: base64(sha256(salt || password)).
pub(crate) fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

fn new_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl Database {
    /// Create an account. Fails if the email is already registered (unique
    /// constraint) or the role is not one of [`ROLES`].
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        role: &str,
        display_name: Option<&str>,
    ) -> Result<UserProfile> {
        if !ROLES.contains(&role) {
            anyhow::bail!("invalid role: {}", role);
        }
        let salt = new_salt();
        let hash = hash_password(&salt, password);
        let row = sqlx::query_as::<_, UserProfile>(
            "INSERT INTO user_profiles (id, email, password_hash, password_salt, role, display_name)
             VALUES ($1, LOWER($2), $3, $4, $5, $6)
             RETURNING id, email, role, display_name, created_at, updated_at",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(email)
        .bind(&hash)
        .bind(&salt)
        .bind(role)
        .bind(display_name)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    /// Verify an email/password pair. Returns the profile on success, `None`
    /// when the account is unknown or the password does not match.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserProfile>> {
        let cred = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, password_hash, password_salt
             FROM user_profiles WHERE email = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        let Some(cred) = cred else {
            return Ok(None);
        };
        if hash_password(&cred.password_salt, password) != cred.password_hash {
            return Ok(None);
        }
        self.get_user_profile(cred.id).await
    }

    /// Look up a profile by account id.
    pub async fn get_user_profile(&self, user_id: uuid::Uuid) -> Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserProfile>(
            "SELECT id, email, role, display_name, created_at, updated_at
             FROM user_profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Get the role for a user (defaults to "client" if no profile exists,
    /// so a stale token can never escalate).
    pub async fn get_user_role(&self, user_id: uuid::Uuid) -> Result<String> {
        let role =
            sqlx::query_scalar::<_, String>("SELECT role FROM user_profiles WHERE id = $1")
                .bind(user_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(role.unwrap_or_else(|| ROLE_CLIENT.to_string()))
    }

    /// List all accounts, newest first.
    pub async fn get_users(&self) -> Result<Vec<UserProfile>> {
        let rows = sqlx::query_as::<_, UserProfile>(
            "SELECT id, email, role, display_name, created_at, updated_at
             FROM user_profiles ORDER BY created_at DESC",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Change an account's role. Returns false when the account is unknown.
    pub async fn update_user_role(&self, user_id: uuid::Uuid, role: &str) -> Result<bool> {
        if !ROLES.contains(&role) {
            anyhow::bail!("invalid role: {}", role);
        }
        let result = sqlx::query(
            "UPDATE user_profiles SET role = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(role)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an account. Projects referencing it keep a NULL owner.
    pub async fn delete_user(&self, user_id: uuid::Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_per_salt() {
        assert_eq!(hash_password("s1", "hunter2"), hash_password("s1", "hunter2"));
        assert_ne!(hash_password("s1", "hunter2"), hash_password("s2", "hunter2"));
        assert_ne!(hash_password("s1", "hunter2"), hash_password("s1", "hunter3"));
    }

    #[test]
    fn hash_is_base64_of_sha256() {
        let h = hash_password("salt", "pw");
        let raw = base64::engine::general_purpose::STANDARD.decode(h).unwrap();
        assert_eq!(raw.len(), 32);
    }

    #[test]
    fn roles_are_distinct() {
        assert_eq!(ROLES.len(), 3);
        assert!(ROLES.contains(&ROLE_ADMIN));
        assert!(ROLES.contains(&ROLE_FOREMAN));
        assert!(ROLES.contains(&ROLE_CLIENT));
    }
}
