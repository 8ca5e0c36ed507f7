use chrono::NaiveDate;
use libsql::{params, Connection};

use super::{count, format_ts, parse_ts};
use crate::error::Result;
use crate::models::{Page, User, UserCredentials, UserSettings};

const USER_COLUMNS: &str = "id, email, username, password_hash, first_name, last_name, \
     date_of_birth, avatar, is_active, is_verified, is_superuser, date_joined, created_at, updated_at";

pub struct UserRepository;

impl UserRepository {
    pub async fn create(conn: &Connection, user: &User) -> Result<User> {
        conn.execute(
            r#"
            INSERT INTO users (
                email, username, password_hash, first_name, last_name, date_of_birth,
                avatar, is_active, is_verified, is_superuser, date_joined, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                user.email.clone(),
                user.username.clone(),
                user.password_hash.clone(),
                user.first_name.clone(),
                user.last_name.clone(),
                user.date_of_birth.map(|d| d.to_string()),
                user.avatar.clone(),
                user.is_active as i64,
                user.is_verified as i64,
                user.is_superuser as i64,
                format_ts(&user.date_joined),
                format_ts(&user.created_at),
                format_ts(&user.updated_at),
            ],
        )
        .await?;

        Ok(User {
            id: conn.last_insert_rowid(),
            ..user.clone()
        })
    }

    pub async fn get_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
        Self::find_one(conn, "id = ?1", params![id]).await
    }

    pub async fn get_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
        Self::find_one(conn, "lower(email) = lower(?1)", params![email]).await
    }

    pub async fn get_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
        Self::find_one(conn, "username = ?1", params![username]).await
    }

    pub async fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
        let total = count(
            conn,
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
        )
        .await?;
        Ok(total > 0)
    }

    /// List users visible to `scope`: a single user id, or everyone when `None`.
    pub async fn list(
        conn: &Connection,
        scope: Option<i64>,
        page: Page,
    ) -> Result<(Vec<User>, u64)> {
        let (total, mut rows) = match scope {
            Some(user_id) => {
                let total = count(
                    conn,
                    "SELECT COUNT(*) FROM users WHERE id = ?1",
                    params![user_id],
                )
                .await?;
                let rows = conn
                    .query(
                        &format!(
                            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"
                        ),
                        params![user_id, page.limit(), page.offset()],
                    )
                    .await?;
                (total, rows)
            }
            None => {
                let total = count(conn, "SELECT COUNT(*) FROM users", ()).await?;
                let rows = conn
                    .query(
                        &format!(
                            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT ?1 OFFSET ?2"
                        ),
                        params![page.limit(), page.offset()],
                    )
                    .await?;
                (total, rows)
            }
        };

        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(Self::row_to_user(&row)?);
        }
        Ok((users, total))
    }

    pub async fn update(conn: &Connection, user: &User) -> Result<()> {
        conn.execute(
            r#"
            UPDATE users SET
                email = ?2,
                username = ?3,
                password_hash = ?4,
                first_name = ?5,
                last_name = ?6,
                date_of_birth = ?7,
                avatar = ?8,
                is_active = ?9,
                is_verified = ?10,
                is_superuser = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
            params![
                user.id,
                user.email.clone(),
                user.username.clone(),
                user.password_hash.clone(),
                user.first_name.clone(),
                user.last_name.clone(),
                user.date_of_birth.map(|d| d.to_string()),
                user.avatar.clone(),
                user.is_active as i64,
                user.is_verified as i64,
                user.is_superuser as i64,
                format_ts(&user.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .await?;

        Ok(rows_affected > 0)
    }

    async fn find_one(
        conn: &Connection,
        predicate: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<User>> {
        let mut rows = conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate}"),
                params,
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_user(&row)?))
        } else {
            Ok(None)
        }
    }

    fn row_to_user(row: &libsql::Row) -> Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            password_hash: row.get(3)?,
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            date_of_birth: row
                .get::<Option<String>>(6)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            avatar: row.get(7)?,
            is_active: row.get::<i64>(8)? != 0,
            is_verified: row.get::<i64>(9)? != 0,
            is_superuser: row.get::<i64>(10)? != 0,
            date_joined: parse_ts(&row.get::<String>(11)?),
            created_at: parse_ts(&row.get::<String>(12)?),
            updated_at: parse_ts(&row.get::<String>(13)?),
        })
    }
}

const CREDENTIAL_COLUMNS: &str =
    "id, user_id, username, password_hash, salt, hash_algorithm, created_at, updated_at";

pub struct CredentialsRepository;

impl CredentialsRepository {
    pub async fn create(conn: &Connection, creds: &UserCredentials) -> Result<UserCredentials> {
        conn.execute(
            r#"
            INSERT INTO user_credentials (
                user_id, username, password_hash, salt, hash_algorithm, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                creds.user_id,
                creds.username.clone(),
                creds.password_hash.clone(),
                creds.salt.clone(),
                creds.hash_algorithm.clone(),
                format_ts(&creds.created_at),
                format_ts(&creds.updated_at),
            ],
        )
        .await?;

        Ok(UserCredentials {
            id: conn.last_insert_rowid(),
            ..creds.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, user_id: i64) -> Result<Option<UserCredentials>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {CREDENTIAL_COLUMNS} FROM user_credentials WHERE id = ?1 AND user_id = ?2"
                ),
                params![id, user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_credentials(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list(
        conn: &Connection,
        user_id: i64,
        page: Page,
    ) -> Result<(Vec<UserCredentials>, u64)> {
        let total = count(
            conn,
            "SELECT COUNT(*) FROM user_credentials WHERE user_id = ?1",
            params![user_id],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {CREDENTIAL_COLUMNS} FROM user_credentials WHERE user_id = ?1 \
                     ORDER BY id LIMIT ?2 OFFSET ?3"
                ),
                params![user_id, page.limit(), page.offset()],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_credentials(&row)?);
        }
        Ok((results, total))
    }

    pub async fn update(conn: &Connection, creds: &UserCredentials) -> Result<()> {
        conn.execute(
            r#"
            UPDATE user_credentials SET
                username = ?3,
                password_hash = ?4,
                salt = ?5,
                hash_algorithm = ?6,
                updated_at = ?7
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![
                creds.id,
                creds.user_id,
                creds.username.clone(),
                creds.password_hash.clone(),
                creds.salt.clone(),
                creds.hash_algorithm.clone(),
                format_ts(&creds.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "DELETE FROM user_credentials WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    fn row_to_credentials(row: &libsql::Row) -> Result<UserCredentials> {
        Ok(UserCredentials {
            id: row.get(0)?,
            user_id: row.get(1)?,
            username: row.get(2)?,
            password_hash: row.get(3)?,
            salt: row.get(4)?,
            hash_algorithm: row.get(5)?,
            created_at: parse_ts(&row.get::<String>(6)?),
            updated_at: parse_ts(&row.get::<String>(7)?),
        })
    }
}

const SETTINGS_COLUMNS: &str = "id, user_id, meta_analysis_after_days, meta_analysis_after_count, \
     created_at, updated_at";

pub struct SettingsRepository;

impl SettingsRepository {
    pub async fn create(conn: &Connection, settings: &UserSettings) -> Result<UserSettings> {
        conn.execute(
            r#"
            INSERT INTO user_settings (
                user_id, meta_analysis_after_days, meta_analysis_after_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                settings.user_id,
                settings.meta_analysis_after_days,
                settings.meta_analysis_after_count,
                format_ts(&settings.created_at),
                format_ts(&settings.updated_at),
            ],
        )
        .await?;

        Ok(UserSettings {
            id: conn.last_insert_rowid(),
            ..settings.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, user_id: i64) -> Result<Option<UserSettings>> {
        Self::find_one(conn, "id = ?1 AND user_id = ?2", params![id, user_id]).await
    }

    pub async fn get_for_user(conn: &Connection, user_id: i64) -> Result<Option<UserSettings>> {
        Self::find_one(conn, "user_id = ?1", params![user_id]).await
    }

    /// Return the user's settings, inserting defaults when none exist yet.
    pub async fn get_or_create(conn: &Connection, user_id: i64) -> Result<UserSettings> {
        let defaults = UserSettings::defaults_for(user_id);
        conn.execute(
            r#"
            INSERT INTO user_settings (
                user_id, meta_analysis_after_days, meta_analysis_after_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO NOTHING
            "#,
            params![
                user_id,
                defaults.meta_analysis_after_days,
                defaults.meta_analysis_after_count,
                format_ts(&defaults.created_at),
                format_ts(&defaults.updated_at),
            ],
        )
        .await?;

        match Self::get_for_user(conn, user_id).await? {
            Some(settings) => Ok(settings),
            None => Err(crate::error::SarnetError::Internal(format!(
                "settings for user {user_id} missing after insert"
            ))),
        }
    }

    pub async fn list(
        conn: &Connection,
        user_id: i64,
        page: Page,
    ) -> Result<(Vec<UserSettings>, u64)> {
        let total = count(
            conn,
            "SELECT COUNT(*) FROM user_settings WHERE user_id = ?1",
            params![user_id],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE user_id = ?1 \
                     ORDER BY id LIMIT ?2 OFFSET ?3"
                ),
                params![user_id, page.limit(), page.offset()],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_settings(&row)?);
        }
        Ok((results, total))
    }

    pub async fn update(conn: &Connection, settings: &UserSettings) -> Result<()> {
        conn.execute(
            r#"
            UPDATE user_settings SET
                meta_analysis_after_days = ?3,
                meta_analysis_after_count = ?4,
                updated_at = ?5
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![
                settings.id,
                settings.user_id,
                settings.meta_analysis_after_days,
                settings.meta_analysis_after_count,
                format_ts(&settings.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "DELETE FROM user_settings WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    async fn find_one(
        conn: &Connection,
        predicate: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<UserSettings>> {
        let mut rows = conn
            .query(
                &format!("SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE {predicate}"),
                params,
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_settings(&row)?))
        } else {
            Ok(None)
        }
    }

    fn row_to_settings(row: &libsql::Row) -> Result<UserSettings> {
        Ok(UserSettings {
            id: row.get(0)?,
            user_id: row.get(1)?,
            meta_analysis_after_days: row.get(2)?,
            meta_analysis_after_count: row.get(3)?,
            created_at: parse_ts(&row.get::<String>(4)?),
            updated_at: parse_ts(&row.get::<String>(5)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::{make_user, setup_test_db};
    use chrono::Utc;

    #[tokio::test]
    async fn test_user_lookup_by_email_is_case_insensitive() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;

        let found = UserRepository::get_by_email(&conn, "ALICE@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert!(UserRepository::username_exists(&conn, "alice").await.unwrap());
        assert!(!UserRepository::username_exists(&conn, "bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let conn = setup_test_db().await;
        make_user(&conn, "alice").await;

        let dup = User::new(
            "alice@example.com".to_string(),
            "alice2".to_string(),
            "hash".to_string(),
        );
        assert!(UserRepository::create(&conn, &dup).await.is_err());

        let shouting = User::new(
            "ALICE@Example.com".to_string(),
            "alice3".to_string(),
            "hash".to_string(),
        );
        assert!(UserRepository::create(&conn, &shouting).await.is_err());
    }

    #[tokio::test]
    async fn test_list_scoped_to_single_user() {
        let conn = setup_test_db().await;
        let alice = make_user(&conn, "alice").await;
        make_user(&conn, "bob").await;

        let (own, total) = UserRepository::list(&conn, Some(alice.id), Page::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(own[0].username, "alice");

        let (all, total) = UserRepository::list(&conn, None, Page::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_user_profile_fields() {
        let conn = setup_test_db().await;
        let mut user = make_user(&conn, "alice").await;
        user.first_name = "Alice".to_string();
        user.date_of_birth = NaiveDate::from_ymd_opt(1990, 4, 12);
        UserRepository::update(&conn, &user).await.unwrap();

        let reloaded = UserRepository::get_by_id(&conn, user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.first_name, "Alice");
        assert_eq!(reloaded.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 12));
    }

    #[tokio::test]
    async fn test_credentials_unique_per_user_and_username() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        let now = Utc::now();
        let creds = UserCredentials {
            id: 0,
            user_id: user.id,
            username: "alice_ig".to_string(),
            password_hash: "h".to_string(),
            salt: "s".to_string(),
            hash_algorithm: crate::models::DEFAULT_HASH_ALGORITHM.to_string(),
            created_at: now,
            updated_at: now,
        };
        CredentialsRepository::create(&conn, &creds).await.unwrap();
        assert!(CredentialsRepository::create(&conn, &creds).await.is_err());

        let other = make_user(&conn, "bob").await;
        let (bobs, _) = CredentialsRepository::list(&conn, other.id, Page::default())
            .await
            .unwrap();
        assert!(bobs.is_empty());
    }

    #[tokio::test]
    async fn test_settings_get_or_create_is_idempotent() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;

        let first = SettingsRepository::get_or_create(&conn, user.id).await.unwrap();
        assert_eq!(first.meta_analysis_after_days, 7);
        assert_eq!(first.meta_analysis_after_count, 10);

        let second = SettingsRepository::get_or_create(&conn, user.id).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_settings_thresholds_must_be_positive() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        let mut settings = UserSettings::defaults_for(user.id);
        settings.meta_analysis_after_days = 0;
        assert!(SettingsRepository::create(&conn, &settings).await.is_err());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_settings() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        SettingsRepository::get_or_create(&conn, user.id).await.unwrap();

        assert!(UserRepository::delete(&conn, user.id).await.unwrap());
        assert!(SettingsRepository::get_for_user(&conn, user.id)
            .await
            .unwrap()
            .is_none());
    }
}
