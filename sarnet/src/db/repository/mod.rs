mod activity;
mod jobs;
mod notifications;
mod outputs;
mod sessions;
mod users;

pub use activity::{EventRepository, PatternRepository, ViaEventRepository};
pub use jobs::{JobRepository, JobResultRepository};
pub use notifications::NotificationRepository;
pub use outputs::{OutputRepository, SourceDownloadRepository};
pub use sessions::{ImageRepository, SessionRepository};
pub use users::{CredentialsRepository, SettingsRepository, UserRepository};

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{params::IntoParams, Connection};

use crate::error::Result;

/// Timestamps are stored with fixed precision so that text ordering matches
/// chronological ordering.
pub(crate) fn format_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_opt_ts(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

pub(crate) fn parse_json(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::json!({}))
}

pub(crate) async fn count(conn: &Connection, sql: &str, params: impl IntoParams) -> Result<u64> {
    let mut rows = conn.query(sql, params).await?;
    let total: i64 = match rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    };
    Ok(total.max(0) as u64)
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(1500);
        assert!(format_ts(&earlier) < format_ts(&later));
        assert_eq!(parse_ts(&format_ts(&later)), later);
    }

    #[test]
    fn test_parse_opt_ts_ignores_garbage() {
        assert_eq!(parse_opt_ts(Some("yesterday".to_string())), None);
        assert_eq!(parse_opt_ts(None), None);
    }
}
