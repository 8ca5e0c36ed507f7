use libsql::{params, Connection};

use super::{count, format_ts, parse_json, parse_ts};
use crate::error::Result;
use crate::models::{Event, Page, Pattern, ViaEvent};

const EVENT_COLUMNS: &str =
    "id, user_id, chat_session_id, event_id, event_type, timestamp, created_at, updated_at";

pub struct EventRepository;

impl EventRepository {
    pub async fn create(conn: &Connection, event: &Event) -> Result<Event> {
        conn.execute(
            r#"
            INSERT INTO events (
                user_id, chat_session_id, event_id, event_type, timestamp, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                event.user_id,
                event.chat_session_id,
                event.event_id.clone(),
                event.event_type.clone(),
                format_ts(&event.timestamp),
                format_ts(&event.created_at),
                format_ts(&event.updated_at),
            ],
        )
        .await?;

        Ok(Event {
            id: conn.last_insert_rowid(),
            ..event.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, user_id: i64) -> Result<Option<Event>> {
        let mut rows = conn
            .query(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_event(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Most recent timestamp first.
    pub async fn list(conn: &Connection, user_id: i64, page: Page) -> Result<(Vec<Event>, u64)> {
        let total = count(
            conn,
            "SELECT COUNT(*) FROM events WHERE user_id = ?1",
            params![user_id],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1 \
                     ORDER BY timestamp DESC, id DESC LIMIT ?2 OFFSET ?3"
                ),
                params![user_id, page.limit(), page.offset()],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(Self::row_to_event(&row)?);
        }
        Ok((events, total))
    }

    pub async fn update(conn: &Connection, event: &Event) -> Result<()> {
        conn.execute(
            r#"
            UPDATE events SET
                chat_session_id = ?3,
                event_id = ?4,
                event_type = ?5,
                timestamp = ?6,
                updated_at = ?7
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![
                event.id,
                event.user_id,
                event.chat_session_id,
                event.event_id.clone(),
                event.event_type.clone(),
                format_ts(&event.timestamp),
                format_ts(&event.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "DELETE FROM events WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    fn row_to_event(row: &libsql::Row) -> Result<Event> {
        Ok(Event {
            id: row.get(0)?,
            user_id: row.get(1)?,
            chat_session_id: row.get(2)?,
            event_id: row.get(3)?,
            event_type: row.get(4)?,
            timestamp: parse_ts(&row.get::<String>(5)?),
            created_at: parse_ts(&row.get::<String>(6)?),
            updated_at: parse_ts(&row.get::<String>(7)?),
        })
    }
}

const PATTERN_COLUMNS: &str =
    "id, user_id, pattern_id, pattern_name, description, confidence, created_at, updated_at";

pub struct PatternRepository;

impl PatternRepository {
    pub async fn create(conn: &Connection, pattern: &Pattern) -> Result<Pattern> {
        conn.execute(
            r#"
            INSERT INTO patterns (
                user_id, pattern_id, pattern_name, description, confidence, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                pattern.user_id,
                pattern.pattern_id.clone(),
                pattern.pattern_name.clone(),
                pattern.description.clone(),
                pattern.confidence,
                format_ts(&pattern.created_at),
                format_ts(&pattern.updated_at),
            ],
        )
        .await?;

        Ok(Pattern {
            id: conn.last_insert_rowid(),
            ..pattern.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, user_id: i64) -> Result<Option<Pattern>> {
        let mut rows = conn
            .query(
                &format!("SELECT {PATTERN_COLUMNS} FROM patterns WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_pattern(&row)?))
        } else {
            Ok(None)
        }
    }

    /// With `above`, only patterns whose confidence is strictly greater are returned,
    /// most confident first.
    pub async fn list(
        conn: &Connection,
        user_id: i64,
        above: Option<f64>,
        page: Page,
    ) -> Result<(Vec<Pattern>, u64)> {
        // Negative infinity is not representable in SQLite; -1.0 is below any valid confidence.
        let floor = above.unwrap_or(-1.0);
        let order = if above.is_some() {
            "confidence DESC, id DESC"
        } else {
            "id DESC"
        };

        let total = count(
            conn,
            "SELECT COUNT(*) FROM patterns WHERE user_id = ?1 AND confidence > ?2",
            params![user_id, floor],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {PATTERN_COLUMNS} FROM patterns WHERE user_id = ?1 AND confidence > ?2 \
                     ORDER BY {order} LIMIT ?3 OFFSET ?4"
                ),
                params![user_id, floor, page.limit(), page.offset()],
            )
            .await?;

        let mut patterns = Vec::new();
        while let Some(row) = rows.next().await? {
            patterns.push(Self::row_to_pattern(&row)?);
        }
        Ok((patterns, total))
    }

    pub async fn update(conn: &Connection, pattern: &Pattern) -> Result<()> {
        conn.execute(
            r#"
            UPDATE patterns SET
                pattern_id = ?3,
                pattern_name = ?4,
                description = ?5,
                confidence = ?6,
                updated_at = ?7
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![
                pattern.id,
                pattern.user_id,
                pattern.pattern_id.clone(),
                pattern.pattern_name.clone(),
                pattern.description.clone(),
                pattern.confidence,
                format_ts(&pattern.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "DELETE FROM patterns WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    fn row_to_pattern(row: &libsql::Row) -> Result<Pattern> {
        Ok(Pattern {
            id: row.get(0)?,
            user_id: row.get(1)?,
            pattern_id: row.get(2)?,
            pattern_name: row.get(3)?,
            description: row.get(4)?,
            confidence: row.get(5)?,
            created_at: parse_ts(&row.get::<String>(6)?),
            updated_at: parse_ts(&row.get::<String>(7)?),
        })
    }
}

const VIA_EVENT_COLUMNS: &str = "id, user_id, event_id, via_id, image, stage_status, stage_data, \
     message, created_at, updated_at";

pub struct ViaEventRepository;

impl ViaEventRepository {
    pub async fn create(conn: &Connection, event: &ViaEvent) -> Result<ViaEvent> {
        conn.execute(
            r#"
            INSERT INTO via_events (
                user_id, event_id, via_id, image, stage_status, stage_data, message,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                event.user_id,
                event.event_id.clone(),
                event.via_id.clone(),
                event.image.clone(),
                event.stage_status.clone(),
                serde_json::to_string(&event.stage_data)?,
                event.message.clone(),
                format_ts(&event.created_at),
                format_ts(&event.updated_at),
            ],
        )
        .await?;

        Ok(ViaEvent {
            id: conn.last_insert_rowid(),
            ..event.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, user_id: i64) -> Result<Option<ViaEvent>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {VIA_EVENT_COLUMNS} FROM via_events WHERE id = ?1 AND user_id = ?2"
                ),
                params![id, user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_via_event(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list(conn: &Connection, user_id: i64, page: Page) -> Result<(Vec<ViaEvent>, u64)> {
        let total = count(
            conn,
            "SELECT COUNT(*) FROM via_events WHERE user_id = ?1",
            params![user_id],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {VIA_EVENT_COLUMNS} FROM via_events WHERE user_id = ?1 \
                     ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                ),
                params![user_id, page.limit(), page.offset()],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(Self::row_to_via_event(&row)?);
        }
        Ok((events, total))
    }

    pub async fn update(conn: &Connection, event: &ViaEvent) -> Result<()> {
        conn.execute(
            r#"
            UPDATE via_events SET
                event_id = ?3,
                via_id = ?4,
                image = ?5,
                stage_status = ?6,
                stage_data = ?7,
                message = ?8,
                updated_at = ?9
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![
                event.id,
                event.user_id,
                event.event_id.clone(),
                event.via_id.clone(),
                event.image.clone(),
                event.stage_status.clone(),
                serde_json::to_string(&event.stage_data)?,
                event.message.clone(),
                format_ts(&event.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "DELETE FROM via_events WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    fn row_to_via_event(row: &libsql::Row) -> Result<ViaEvent> {
        Ok(ViaEvent {
            id: row.get(0)?,
            user_id: row.get(1)?,
            event_id: row.get(2)?,
            via_id: row.get(3)?,
            image: row.get(4)?,
            stage_status: row.get(5)?,
            stage_data: parse_json(&row.get::<String>(6)?),
            message: row.get(7)?,
            created_at: parse_ts(&row.get::<String>(8)?),
            updated_at: parse_ts(&row.get::<String>(9)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::{make_user, setup_test_db};
    use chrono::Utc;

    fn make_pattern(user_id: i64, pattern_id: &str, confidence: f64) -> Pattern {
        let now = Utc::now();
        Pattern {
            id: 0,
            user_id,
            pattern_id: pattern_id.to_string(),
            pattern_name: format!("pattern {pattern_id}"),
            description: String::new(),
            confidence,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_high_confidence_is_strictly_greater() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        for (id, confidence) in [("p1", 0.5), ("p2", 0.8), ("p3", 0.95)] {
            PatternRepository::create(&conn, &make_pattern(user.id, id, confidence))
                .await
                .unwrap();
        }

        let (high, total) = PatternRepository::list(&conn, user.id, Some(0.8), Page::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(high[0].pattern_id, "p3");

        let (all, _) = PatternRepository::list(&conn, user.id, None, Page::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_confidence_out_of_range_rejected_by_schema() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        assert!(
            PatternRepository::create(&conn, &make_pattern(user.id, "bad", 1.2))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_events_ordered_by_timestamp() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        let now = Utc::now();
        for (event_id, offset) in [("e-old", 10), ("e-new", 0)] {
            let event = Event {
                id: 0,
                user_id: Some(user.id),
                chat_session_id: None,
                event_id: event_id.to_string(),
                event_type: "login".to_string(),
                timestamp: now - chrono::Duration::minutes(offset),
                created_at: now,
                updated_at: now,
            };
            EventRepository::create(&conn, &event).await.unwrap();
        }

        let (events, _) = EventRepository::list(&conn, user.id, Page::default())
            .await
            .unwrap();
        assert_eq!(events[0].event_id, "e-new");
    }

    #[tokio::test]
    async fn test_via_event_stage_data_persists() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        let now = Utc::now();
        let event = ViaEvent {
            id: 0,
            user_id: user.id,
            event_id: "ev-1".to_string(),
            via_id: "via-1".to_string(),
            image: "scan.png".to_string(),
            stage_status: "colorized".to_string(),
            stage_data: serde_json::json!({"band": "C", "looks": 4}),
            message: String::new(),
            created_at: now,
            updated_at: now,
        };
        let created = ViaEventRepository::create(&conn, &event).await.unwrap();
        let reloaded = ViaEventRepository::get(&conn, created.id, user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.stage_data["band"], "C");
        assert_eq!(reloaded.stage_data["looks"], 4);
    }
}
