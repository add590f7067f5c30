//! # User Repository
//!
//! Accounts and their one-to-one profiles.
//!
//! ```text
//! create()         users row + profiles row, one transaction
//! ensure_profile() lazily adds a missing profile (login path)
//! principal()      user + profile → Principal, re-read on every request
//! ```
//!
//! Password hashing lives in the server; this layer only stores PHC strings.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use stockroom_core::{CoreError, Principal, Profile, Role, User, ValidationError};

const USER_COLUMNS: &str = "id, username, password_hash, is_superuser, is_active, date_joined";
const PROFILE_COLUMNS: &str = "id, user_id, role, created_at, updated_at";

/// A new account, with an already-hashed password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_superuser: bool,
    /// Profile role. `None` picks the default for `is_superuser`.
    pub role: Option<Role>,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        NewUser {
            username: username.into(),
            password_hash: password_hash.into(),
            is_superuser: false,
            role: None,
        }
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

/// Repository for user and profile operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account and its profile together.
    ///
    /// A taken username is reported as a validation error.
    pub async fn create(&self, new_user: &NewUser) -> DbResult<(User, Profile)> {
        let now = Utc::now();
        let role = new_user
            .role
            .unwrap_or(Role::default_for(new_user.is_superuser));

        debug!(username = %new_user.username, role = %role, "Creating user");

        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, is_superuser, is_active, date_joined)
            VALUES (?1, ?2, ?3, 1, ?4)
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(new_user.is_superuser)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => CoreError::from(ValidationError::Duplicate {
                field: "username".to_string(),
                value: new_user.username.clone(),
            })
            .into(),
            other => other,
        })?
        .last_insert_rowid();

        insert_profile(&mut *tx, user_id, role).await?;

        let user = fetch_user(&mut *tx, user_id)
            .await?
            .ok_or_else(|| DbError::not_found("User", user_id))?;
        let profile = fetch_profile(&mut *tx, user_id)
            .await?
            .ok_or_else(|| DbError::not_found("Profile", user_id))?;

        tx.commit().await?;

        info!(user_id, username = %user.username, role = %profile.role, "User created");
        Ok((user, profile))
    }

    /// Looks an account up by username (exact match).
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets an account by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        fetch_user(&mut *conn, id).await
    }

    /// True if the username is taken.
    pub async fn username_exists(&self, username: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Gets the profile of `user_id`, if it has one.
    pub async fn profile(&self, user_id: i64) -> DbResult<Option<Profile>> {
        let mut conn = self.pool.acquire().await?;
        fetch_profile(&mut *conn, user_id).await
    }

    /// Returns the user's profile, creating the default one if missing.
    pub async fn ensure_profile(&self, user: &User) -> DbResult<Profile> {
        let mut conn = self.pool.acquire().await?;

        if let Some(profile) = fetch_profile(&mut *conn, user.id).await? {
            return Ok(profile);
        }

        let role = Role::default_for(user.is_superuser);
        insert_profile(&mut *conn, user.id, role).await?;
        info!(user_id = user.id, role = %role, "Created missing profile");

        fetch_profile(&mut *conn, user.id)
            .await?
            .ok_or_else(|| DbError::not_found("Profile", user.id))
    }

    /// Changes a user's role.
    pub async fn set_role(&self, user_id: i64, role: Role) -> DbResult<()> {
        let result = sqlx::query("UPDATE profiles SET role = ?2, updated_at = ?3 WHERE user_id = ?1")
            .bind(user_id)
            .bind(role)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Profile", user_id));
        }

        info!(user_id, role = %role, "Role changed");
        Ok(())
    }

    /// Activates or deactivates an account. Inactive accounts cannot log in
    /// and their sessions stop resolving.
    pub async fn set_active(&self, user_id: i64, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = ?2 WHERE id = ?1")
            .bind(user_id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", user_id));
        }

        info!(user_id, active, "Account active flag changed");
        Ok(())
    }

    /// Resolves the acting principal for a session.
    ///
    /// `None` when the account is gone or deactivated. A missing profile is
    /// created on the way.
    pub async fn principal(&self, user_id: i64) -> DbResult<Option<Principal>> {
        let Some(user) = self.get_by_id(user_id).await? else {
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }

        let profile = self.ensure_profile(&user).await?;
        Ok(Some(Principal::new(&user, &profile)))
    }

    /// Number of accounts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

async fn fetch_user(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");

    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(user)
}

async fn fetch_profile(conn: &mut SqliteConnection, user_id: i64) -> DbResult<Option<Profile>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1");

    let profile = sqlx::query_as::<_, Profile>(&sql)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    Ok(profile)
}

/// Inserts a profile unless one exists already.
async fn insert_profile(conn: &mut SqliteConnection, user_id: i64, role: Role) -> DbResult<()> {
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, role, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        ON CONFLICT(user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(role)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn repo() -> (Database, UserRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        (db, users)
    }

    async fn profile_count(db: &Database, user_id: i64) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_account_gets_exactly_one_staff_profile() {
        let (db, users) = repo().await;

        let (user, profile) = users.create(&NewUser::new("sam", "hash")).await.unwrap();
        assert_eq!(profile.role, Role::Staff);
        assert_eq!(profile.user_id, user.id);
        assert!(user.is_active);
        assert!(!user.is_superuser);
        assert_eq!(profile_count(&db, user.id).await, 1);
    }

    #[tokio::test]
    async fn test_superuser_defaults_to_manager() {
        let (db, users) = repo().await;

        let (user, profile) = users
            .create(&NewUser::new("root", "hash").superuser())
            .await
            .unwrap();
        assert_eq!(profile.role, Role::Manager);
        assert_eq!(profile_count(&db, user.id).await, 1);

        let (_, explicit) = users
            .create(&NewUser::new("mgr", "hash").role(Role::Manager))
            .await
            .unwrap();
        assert_eq!(explicit.role, Role::Manager);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let (_db, users) = repo().await;
        users.create(&NewUser::new("sam", "hash")).await.unwrap();

        assert!(users.username_exists("sam").await.unwrap());
        assert!(!users.username_exists("kim").await.unwrap());

        let err = users.create(&NewUser::new("sam", "other")).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
        assert_eq!(users.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_missing_once() {
        let (db, users) = repo().await;
        let (user, _) = users
            .create(&NewUser::new("root", "hash").superuser())
            .await
            .unwrap();

        sqlx::query("DELETE FROM profiles WHERE user_id = ?1")
            .bind(user.id)
            .execute(db.pool())
            .await
            .unwrap();
        assert!(users.profile(user.id).await.unwrap().is_none());

        let profile = users.ensure_profile(&user).await.unwrap();
        assert_eq!(profile.role, Role::Manager);
        users.ensure_profile(&user).await.unwrap();
        assert_eq!(profile_count(&db, user.id).await, 1);
    }

    #[tokio::test]
    async fn test_principal_tracks_role_and_active_flag() {
        let (_db, users) = repo().await;
        let (user, _) = users.create(&NewUser::new("sam", "hash")).await.unwrap();

        let principal = users.principal(user.id).await.unwrap().unwrap();
        assert_eq!(principal.role, Role::Staff);
        assert_eq!(principal.username, "sam");

        users.set_role(user.id, Role::Manager).await.unwrap();
        assert!(users.principal(user.id).await.unwrap().unwrap().is_manager());

        users.set_active(user.id, false).await.unwrap();
        assert!(users.principal(user.id).await.unwrap().is_none());
        assert!(users.set_active(999, false).await.is_err());
        assert!(users.principal(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_username() {
        let (_db, users) = repo().await;
        let (user, _) = users.create(&NewUser::new("sam", "phc")).await.unwrap();

        let found = users.find_by_username("sam").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "phc");
        assert!(users.find_by_username("SAM").await.unwrap().is_none());
    }
}
