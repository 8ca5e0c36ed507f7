use serde::Deserialize;
use std::env;
use std::path::PathBuf;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_list(var: &str) -> Vec<String> {
    env::var(var)
        .map(|val| {
            val.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    pub pagination: PaginationConfig,
    pub colorizer: ColorizerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub synchronous: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// True when no `JWT_SECRET` was configured and a per-process secret was generated.
    pub ephemeral_secret: bool,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub page_size: u32,
    pub max_page_size: u32,
}

/// Settings for the SAR colorization generator.
#[derive(Debug, Clone, Deserialize)]
pub struct ColorizerConfig {
    /// Path to a `.pth`/`.pt` PyTorch checkpoint or a `.mpk` burn record.
    pub checkpoint_path: PathBuf,
    /// Side length of the square input the generator was trained on.
    pub image_size: u32,
    /// Load the model at startup instead of on the first request.
    pub preload: bool,
}

impl Default for ColorizerConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: PathBuf::from("model/checkpoint_epoch_200.pth"),
            image_size: 256,
            preload: false,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_page_size: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let (jwt_secret, ephemeral_secret) = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => (secret, false),
            _ => (nanoid::nanoid!(64), true),
        };

        Self {
            server: ServerConfig {
                host: env::var("SARNET_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("SARNET_PORT", 8000),
                cors_allowed_origins: parse_env_list("CORS_ALLOWED_ORIGINS"),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:sarnet.db".to_string()),
                busy_timeout_ms: parse_env_or("DATABASE_BUSY_TIMEOUT_MS", 5000),
                journal_mode: env::var("DATABASE_JOURNAL_MODE")
                    .unwrap_or_else(|_| "WAL".to_string()),
                synchronous: env::var("DATABASE_SYNCHRONOUS")
                    .unwrap_or_else(|_| "NORMAL".to_string()),
            },
            auth: AuthConfig {
                jwt_secret,
                ephemeral_secret,
                access_ttl_minutes: parse_env_or("JWT_ACCESS_TTL_MINUTES", 60),
                refresh_ttl_days: parse_env_or("JWT_REFRESH_TTL_DAYS", 7),
            },
            media: MediaConfig {
                root: PathBuf::from(
                    env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
                ),
                max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            },
            pagination: PaginationConfig {
                page_size: parse_env_or("PAGE_SIZE", 20).clamp(1, 100),
                max_page_size: 100,
            },
            colorizer: ColorizerConfig {
                checkpoint_path: PathBuf::from(
                    env::var("COLORIZER_CHECKPOINT")
                        .unwrap_or_else(|_| "model/checkpoint_epoch_200.pth".to_string()),
                ),
                image_size: parse_env_or("COLORIZER_IMAGE_SIZE", 256),
                preload: parse_env_or("COLORIZER_PRELOAD", false),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Strip the `file:` prefix libsql URLs carry and return the local path.
    pub fn database_path(&self) -> &str {
        self.database
            .url
            .strip_prefix("file:")
            .unwrap_or(&self.database.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_server_config_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::remove_var("SARNET_PORT");
        std::env::remove_var("CORS_ALLOWED_ORIGINS");
        let config = Config::from_env();
        assert_eq!(config.server.port, 8000);
        assert!(config.server.cors_allowed_origins.is_empty());
    }

    #[test]
    fn test_cors_origins_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var(
            "CORS_ALLOWED_ORIGINS",
            "http://localhost:3000, https://sar.example.com,",
        );
        let config = Config::from_env();
        assert_eq!(
            config.server.cors_allowed_origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://sar.example.com".to_string()
            ]
        );
        std::env::remove_var("CORS_ALLOWED_ORIGINS");
    }

    #[test]
    fn test_jwt_secret_generated_when_missing() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::remove_var("JWT_SECRET");
        let first = Config::from_env();
        let second = Config::from_env();
        assert!(first.auth.ephemeral_secret);
        assert_eq!(first.auth.jwt_secret.len(), 64);
        assert_ne!(first.auth.jwt_secret, second.auth.jwt_secret);
    }

    #[test]
    fn test_jwt_secret_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("JWT_SECRET", "top-secret");
        let config = Config::from_env();
        assert!(!config.auth.ephemeral_secret);
        assert_eq!(config.auth.jwt_secret, "top-secret");
        assert_eq!(config.auth.access_ttl_minutes, 60);
        assert_eq!(config.auth.refresh_ttl_days, 7);
        std::env::remove_var("JWT_SECRET");
    }

    #[test]
    fn test_colorizer_config_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::remove_var("COLORIZER_CHECKPOINT");
        std::env::remove_var("COLORIZER_PRELOAD");
        let config = Config::from_env();
        assert_eq!(
            config.colorizer.checkpoint_path,
            PathBuf::from("model/checkpoint_epoch_200.pth")
        );
        assert_eq!(config.colorizer.image_size, 256);
        assert!(!config.colorizer.preload);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("PAGE_SIZE", "5000");
        let config = Config::from_env();
        assert_eq!(config.pagination.page_size, 100);
        std::env::remove_var("PAGE_SIZE");
    }

    #[test]
    fn test_parse_env_or_invalid_value_falls_back() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("__TEST_PARSE_PORT", "not-a-port");
        let result: u16 = parse_env_or("__TEST_PARSE_PORT", 8000);
        assert_eq!(result, 8000);
        std::env::remove_var("__TEST_PARSE_PORT");
    }

    #[test]
    fn test_database_path_strips_file_prefix() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("DATABASE_URL", "file:/tmp/sar.db");
        let config = Config::from_env();
        assert_eq!(config.database_path(), "/tmp/sar.db");
        std::env::remove_var("DATABASE_URL");
    }
}
