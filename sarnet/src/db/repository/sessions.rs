use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use super::{count, format_ts, parse_opt_ts, parse_ts};
use crate::error::Result;
use crate::models::{Image, Page, Session};

const SESSION_COLUMNS: &str = "id, user_id, session_id, username, text, session_type, date, \
     total_cnt, user_status, user_status_date, post_analysis_at, created_at, updated_at";

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(conn: &Connection, session: &Session) -> Result<Session> {
        conn.execute(
            r#"
            INSERT INTO sessions (
                user_id, session_id, username, text, session_type, date, total_cnt,
                user_status, user_status_date, post_analysis_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                session.user_id,
                session.session_id.clone(),
                session.username.clone(),
                session.text.clone(),
                session.session_type.clone(),
                format_ts(&session.date),
                session.total_cnt,
                session.user_status.clone(),
                session.user_status_date.as_ref().map(format_ts),
                session.post_analysis_at.as_ref().map(format_ts),
                format_ts(&session.created_at),
                format_ts(&session.updated_at),
            ],
        )
        .await?;

        Ok(Session {
            id: conn.last_insert_rowid(),
            ..session.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, user_id: i64) -> Result<Option<Session>> {
        let mut rows = conn
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_session(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Newest first.
    pub async fn list(conn: &Connection, user_id: i64, page: Page) -> Result<(Vec<Session>, u64)> {
        let total = count(
            conn,
            "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
            params![user_id],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?1 \
                     ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                ),
                params![user_id, page.limit(), page.offset()],
            )
            .await?;

        let mut sessions = Vec::new();
        while let Some(row) = rows.next().await? {
            sessions.push(Self::row_to_session(&row)?);
        }
        Ok((sessions, total))
    }

    pub async fn update(conn: &Connection, session: &Session) -> Result<()> {
        conn.execute(
            r#"
            UPDATE sessions SET
                session_id = ?3,
                username = ?4,
                text = ?5,
                session_type = ?6,
                date = ?7,
                user_status = ?8,
                user_status_date = ?9,
                post_analysis_at = ?10,
                updated_at = ?11
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![
                session.id,
                session.user_id,
                session.session_id.clone(),
                session.username.clone(),
                session.text.clone(),
                session.session_type.clone(),
                format_ts(&session.date),
                session.user_status.clone(),
                session.user_status_date.as_ref().map(format_ts),
                session.post_analysis_at.as_ref().map(format_ts),
                format_ts(&session.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn mark_analyzed(
        conn: &Connection,
        id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "UPDATE sessions SET post_analysis_at = ?3, updated_at = ?3 \
                 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id, format_ts(&at)],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    /// Shift the image counter, never letting it drop below zero.
    pub async fn adjust_total_cnt(conn: &Connection, id: i64, delta: i64) -> Result<()> {
        conn.execute(
            "UPDATE sessions SET total_cnt = MAX(total_cnt + ?2, 0), updated_at = ?3 WHERE id = ?1",
            params![id, delta, format_ts(&Utc::now())],
        )
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "DELETE FROM sessions WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    /// Remove every session a user owns. Images and events go with them.
    pub async fn delete_all_for_user(conn: &Connection, user_id: i64) -> Result<u64> {
        let rows_affected = conn
            .execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])
            .await?;

        Ok(rows_affected)
    }

    fn row_to_session(row: &libsql::Row) -> Result<Session> {
        Ok(Session {
            id: row.get(0)?,
            user_id: row.get(1)?,
            session_id: row.get(2)?,
            username: row.get(3)?,
            text: row.get(4)?,
            session_type: row.get(5)?,
            date: parse_ts(&row.get::<String>(6)?),
            total_cnt: row.get(7)?,
            user_status: row.get(8)?,
            user_status_date: parse_opt_ts(row.get(9)?),
            post_analysis_at: parse_opt_ts(row.get(10)?),
            created_at: parse_ts(&row.get::<String>(11)?),
            updated_at: parse_ts(&row.get::<String>(12)?),
        })
    }
}

const IMAGE_COLUMNS: &str =
    "i.id, i.session_id, i.user_id, i.image_id, i.storage_path, i.created_at, i.updated_at";

/// Images are owned through their session; every lookup joins on it.
pub struct ImageRepository;

impl ImageRepository {
    pub async fn create(conn: &Connection, image: &Image) -> Result<Image> {
        conn.execute(
            r#"
            INSERT INTO images (session_id, user_id, image_id, storage_path, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                image.session_id,
                image.user_id.clone(),
                image.image_id.clone(),
                image.storage_path.clone(),
                format_ts(&image.created_at),
                format_ts(&image.updated_at),
            ],
        )
        .await?;

        Ok(Image {
            id: conn.last_insert_rowid(),
            ..image.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, owner_id: i64) -> Result<Option<Image>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {IMAGE_COLUMNS} FROM images i JOIN sessions s ON s.id = i.session_id \
                     WHERE i.id = ?1 AND s.user_id = ?2"
                ),
                params![id, owner_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_image(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list(conn: &Connection, owner_id: i64, page: Page) -> Result<(Vec<Image>, u64)> {
        let total = count(
            conn,
            "SELECT COUNT(*) FROM images i JOIN sessions s ON s.id = i.session_id WHERE s.user_id = ?1",
            params![owner_id],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {IMAGE_COLUMNS} FROM images i JOIN sessions s ON s.id = i.session_id \
                     WHERE s.user_id = ?1 ORDER BY i.created_at DESC, i.id DESC LIMIT ?2 OFFSET ?3"
                ),
                params![owner_id, page.limit(), page.offset()],
            )
            .await?;

        let mut images = Vec::new();
        while let Some(row) = rows.next().await? {
            images.push(Self::row_to_image(&row)?);
        }
        Ok((images, total))
    }

    pub async fn list_for_session(conn: &Connection, session_id: i64) -> Result<Vec<Image>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {IMAGE_COLUMNS} FROM images i WHERE i.session_id = ?1 ORDER BY i.id"
                ),
                params![session_id],
            )
            .await?;

        let mut images = Vec::new();
        while let Some(row) = rows.next().await? {
            images.push(Self::row_to_image(&row)?);
        }
        Ok(images)
    }

    pub async fn update(conn: &Connection, image: &Image) -> Result<()> {
        conn.execute(
            r#"
            UPDATE images SET
                session_id = ?2,
                user_id = ?3,
                image_id = ?4,
                storage_path = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
            params![
                image.id,
                image.session_id,
                image.user_id.clone(),
                image.image_id.clone(),
                image.storage_path.clone(),
                format_ts(&image.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute("DELETE FROM images WHERE id = ?1", params![id])
            .await?;

        Ok(rows_affected > 0)
    }

    fn row_to_image(row: &libsql::Row) -> Result<Image> {
        Ok(Image {
            id: row.get(0)?,
            session_id: row.get(1)?,
            user_id: row.get(2)?,
            image_id: row.get(3)?,
            storage_path: row.get(4)?,
            created_at: parse_ts(&row.get::<String>(5)?),
            updated_at: parse_ts(&row.get::<String>(6)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::{make_user, setup_test_db};

    fn make_session(user_id: i64, session_id: &str) -> Session {
        let now = Utc::now();
        Session {
            id: 0,
            user_id,
            session_id: session_id.to_string(),
            username: "alice".to_string(),
            text: "hello".to_string(),
            session_type: "chat".to_string(),
            date: now,
            total_cnt: 0,
            user_status: "active".to_string(),
            user_status_date: None,
            post_analysis_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_image(session_id: i64, image_id: &str) -> Image {
        let now = Utc::now();
        Image {
            id: 0,
            session_id,
            user_id: "1".to_string(),
            image_id: image_id.to_string(),
            storage_path: format!("images/user_1/{image_id}_scan.png"),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_sessions_are_scoped_to_owner() {
        let conn = setup_test_db().await;
        let alice = make_user(&conn, "alice").await;
        let bob = make_user(&conn, "bob").await;
        let session = SessionRepository::create(&conn, &make_session(alice.id, "s-1"))
            .await
            .unwrap();

        assert!(SessionRepository::get(&conn, session.id, alice.id)
            .await
            .unwrap()
            .is_some());
        assert!(SessionRepository::get(&conn, session.id, bob.id)
            .await
            .unwrap()
            .is_none());
        assert!(!SessionRepository::delete(&conn, session.id, bob.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_returns_newest_first() {
        let conn = setup_test_db().await;
        let alice = make_user(&conn, "alice").await;
        let mut older = make_session(alice.id, "s-old");
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        SessionRepository::create(&conn, &older).await.unwrap();
        SessionRepository::create(&conn, &make_session(alice.id, "s-new"))
            .await
            .unwrap();

        let (sessions, total) = SessionRepository::list(&conn, alice.id, Page::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(sessions[0].session_id, "s-new");
        assert_eq!(sessions[1].session_id, "s-old");
    }

    #[tokio::test]
    async fn test_mark_analyzed_sets_timestamp() {
        let conn = setup_test_db().await;
        let alice = make_user(&conn, "alice").await;
        let session = SessionRepository::create(&conn, &make_session(alice.id, "s-1"))
            .await
            .unwrap();

        let at = Utc::now();
        assert!(SessionRepository::mark_analyzed(&conn, session.id, alice.id, at)
            .await
            .unwrap());
        let reloaded = SessionRepository::get(&conn, session.id, alice.id)
            .await
            .unwrap()
            .unwrap();
        assert!(reloaded.post_analysis_at.is_some());
    }

    #[tokio::test]
    async fn test_total_cnt_never_negative() {
        let conn = setup_test_db().await;
        let alice = make_user(&conn, "alice").await;
        let session = SessionRepository::create(&conn, &make_session(alice.id, "s-1"))
            .await
            .unwrap();

        SessionRepository::adjust_total_cnt(&conn, session.id, 2).await.unwrap();
        SessionRepository::adjust_total_cnt(&conn, session.id, -5).await.unwrap();
        let reloaded = SessionRepository::get(&conn, session.id, alice.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.total_cnt, 0);
    }

    #[tokio::test]
    async fn test_clear_history_cascades_to_images() {
        let conn = setup_test_db().await;
        let alice = make_user(&conn, "alice").await;
        let session = SessionRepository::create(&conn, &make_session(alice.id, "s-1"))
            .await
            .unwrap();
        let image = ImageRepository::create(&conn, &make_image(session.id, "img-1"))
            .await
            .unwrap();

        let deleted = SessionRepository::delete_all_for_user(&conn, alice.id)
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(ImageRepository::get(&conn, image.id, alice.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_images_visible_only_through_owned_sessions() {
        let conn = setup_test_db().await;
        let alice = make_user(&conn, "alice").await;
        let bob = make_user(&conn, "bob").await;
        let session = SessionRepository::create(&conn, &make_session(alice.id, "s-1"))
            .await
            .unwrap();
        ImageRepository::create(&conn, &make_image(session.id, "img-1"))
            .await
            .unwrap();

        let (mine, _) = ImageRepository::list(&conn, alice.id, Page::default())
            .await
            .unwrap();
        let (theirs, total) = ImageRepository::list(&conn, bob.id, Page::default())
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert!(theirs.is_empty());
        assert_eq!(total, 0);
        assert_eq!(
            ImageRepository::list_for_session(&conn, session.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
