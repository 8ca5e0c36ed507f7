use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
    pub(crate) busy_timeout_ms: u64,
    pub(crate) journal_mode: String,
    pub(crate) synchronous: String,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
        let db = Builder::new_local(path).build().await?;

        let database = Self {
            db: Arc::new(db),
            busy_timeout_ms: config.busy_timeout_ms,
            journal_mode: normalize_journal_mode(&config.journal_mode).to_string(),
            synchronous: normalize_synchronous(&config.synchronous).to_string(),
        };
        database.configure_database().await?;
        database.init_schema().await?;

        Ok(database)
    }

    /// Open a connection with foreign-key enforcement switched on.
    ///
    /// SQLite scopes `foreign_keys` to the connection, so cascades only fire on
    /// connections obtained through here.
    pub async fn connect(&self) -> Result<Connection> {
        let conn = self.db.connect()?;
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))
        .await?;
        Ok(conn)
    }

    async fn configure_database(&self) -> Result<()> {
        let conn = self.connect().await?;

        let journal_sql = format!("PRAGMA journal_mode = {}", self.journal_mode);
        if let Err(error) = conn.execute_batch(&journal_sql).await {
            tracing::warn!(
                mode = %self.journal_mode,
                error = %error,
                "Failed to set SQLite journal_mode"
            );
        }

        let synchronous_sql = format!("PRAGMA synchronous = {}", self.synchronous);
        if let Err(error) = conn.execute_batch(&synchronous_sql).await {
            tracing::warn!(
                mode = %self.synchronous,
                error = %error,
                "Failed to set SQLite synchronous pragma"
            );
        }

        Ok(())
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.connect().await?;
        schema::init_schema(&conn).await?;
        Ok(())
    }

    /// Round-trip a trivial query; used by the health check.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.connect().await?;
        let mut rows = conn.query("SELECT 1", ()).await?;
        rows.next().await?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode.clone(),
            synchronous: self.synchronous.clone(),
        }
    }
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "PERSIST" => "PERSIST",
        "MEMORY" => "MEMORY",
        "WAL" => "WAL",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn normalize_synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "NORMAL" => "NORMAL",
        "FULL" => "FULL",
        "EXTRA" => "EXTRA",
        _ => "NORMAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pragmas_fall_back() {
        assert_eq!(normalize_journal_mode("delete"), "DELETE");
        assert_eq!(normalize_journal_mode("bogus; DROP TABLE users"), "WAL");
        assert_eq!(normalize_synchronous(" full "), "FULL");
        assert_eq!(normalize_synchronous(""), "NORMAL");
    }

    #[tokio::test]
    async fn test_new_creates_schema_and_enforces_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("file:{}", dir.path().join("test.db").display()),
            busy_timeout_ms: 1000,
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        };
        let db = Database::new(&config).await.unwrap();
        db.ping().await.unwrap();

        let conn = db.connect().await.unwrap();
        let result = conn
            .execute(
                "INSERT INTO sessions (user_id, session_id, username, date, created_at, updated_at)
                 VALUES (999, 's-1', 'ghost', 'x', 'x', 'x')",
                (),
            )
            .await;
        assert!(result.is_err());
    }
}
