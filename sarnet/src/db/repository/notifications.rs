use chrono::Utc;
use libsql::{params, Connection};

use super::{count, format_ts, parse_ts};
use crate::error::Result;
use crate::models::{Notification, Page};

const COLUMNS: &str = "id, user_id, notification_type, notification_channel, title, message, \
     is_read, created_at, updated_at";

pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn create(conn: &Connection, notification: &Notification) -> Result<Notification> {
        conn.execute(
            r#"
            INSERT INTO notifications (
                user_id, notification_type, notification_channel, title, message, is_read,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                notification.user_id,
                notification.notification_type.clone(),
                notification.notification_channel.clone(),
                notification.title.clone(),
                notification.message.clone(),
                notification.is_read as i64,
                format_ts(&notification.created_at),
                format_ts(&notification.updated_at),
            ],
        )
        .await?;

        Ok(Notification {
            id: conn.last_insert_rowid(),
            ..notification.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, user_id: i64) -> Result<Option<Notification>> {
        let mut rows = conn
            .query(
                &format!("SELECT {COLUMNS} FROM notifications WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_notification(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Newest first. With `unread_only`, read notifications are skipped.
    pub async fn list(
        conn: &Connection,
        user_id: i64,
        unread_only: bool,
        page: Page,
    ) -> Result<(Vec<Notification>, u64)> {
        let filter = if unread_only {
            "user_id = ?1 AND is_read = 0"
        } else {
            "user_id = ?1"
        };

        let total = count(
            conn,
            &format!("SELECT COUNT(*) FROM notifications WHERE {filter}"),
            params![user_id],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM notifications WHERE {filter} \
                     ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                ),
                params![user_id, page.limit(), page.offset()],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_notification(&row)?);
        }
        Ok((results, total))
    }

    pub async fn update(conn: &Connection, notification: &Notification) -> Result<()> {
        conn.execute(
            r#"
            UPDATE notifications SET
                notification_type = ?3,
                notification_channel = ?4,
                title = ?5,
                message = ?6,
                is_read = ?7,
                updated_at = ?8
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![
                notification.id,
                notification.user_id,
                notification.notification_type.clone(),
                notification.notification_channel.clone(),
                notification.title.clone(),
                notification.message.clone(),
                notification.is_read as i64,
                format_ts(&notification.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn set_read(conn: &Connection, id: i64, user_id: i64, is_read: bool) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "UPDATE notifications SET is_read = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id, is_read as i64, format_ts(&Utc::now())],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    /// Returns how many notifications flipped from unread to read.
    pub async fn mark_all_read(conn: &Connection, user_id: i64) -> Result<u64> {
        let rows_affected = conn
            .execute(
                "UPDATE notifications SET is_read = 1, updated_at = ?2 WHERE user_id = ?1 AND is_read = 0",
                params![user_id, format_ts(&Utc::now())],
            )
            .await?;

        Ok(rows_affected)
    }

    pub async fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    fn row_to_notification(row: &libsql::Row) -> Result<Notification> {
        Ok(Notification {
            id: row.get(0)?,
            user_id: row.get(1)?,
            notification_type: row.get(2)?,
            notification_channel: row.get(3)?,
            title: row.get(4)?,
            message: row.get(5)?,
            is_read: row.get::<i64>(6)? != 0,
            created_at: parse_ts(&row.get::<String>(7)?),
            updated_at: parse_ts(&row.get::<String>(8)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::{make_user, setup_test_db};

    fn make_notification(user_id: i64, title: &str) -> Notification {
        let now = Utc::now();
        Notification {
            id: 0,
            user_id,
            notification_type: "analysis".to_string(),
            notification_channel: "in_app".to_string(),
            title: title.to_string(),
            message: "Your scan is ready".to_string(),
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_unread_filter_and_mark_read() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        let first = NotificationRepository::create(&conn, &make_notification(user.id, "one"))
            .await
            .unwrap();
        NotificationRepository::create(&conn, &make_notification(user.id, "two"))
            .await
            .unwrap();

        assert!(NotificationRepository::set_read(&conn, first.id, user.id, true)
            .await
            .unwrap());
        let (unread, total) = NotificationRepository::list(&conn, user.id, true, Page::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(unread[0].title, "two");

        assert!(NotificationRepository::set_read(&conn, first.id, user.id, false)
            .await
            .unwrap());
        let (unread, _) = NotificationRepository::list(&conn, user.id, true, Page::default())
            .await
            .unwrap();
        assert_eq!(unread.len(), 2);
    }

    #[tokio::test]
    async fn test_mark_all_read_only_touches_owner() {
        let conn = setup_test_db().await;
        let alice = make_user(&conn, "alice").await;
        let bob = make_user(&conn, "bob").await;
        NotificationRepository::create(&conn, &make_notification(alice.id, "a1"))
            .await
            .unwrap();
        NotificationRepository::create(&conn, &make_notification(alice.id, "a2"))
            .await
            .unwrap();
        NotificationRepository::create(&conn, &make_notification(bob.id, "b1"))
            .await
            .unwrap();

        let flipped = NotificationRepository::mark_all_read(&conn, alice.id)
            .await
            .unwrap();
        assert_eq!(flipped, 2);

        let (bobs_unread, _) = NotificationRepository::list(&conn, bob.id, true, Page::default())
            .await
            .unwrap();
        assert_eq!(bobs_unread.len(), 1);
    }

    #[tokio::test]
    async fn test_set_read_on_foreign_notification_is_noop() {
        let conn = setup_test_db().await;
        let alice = make_user(&conn, "alice").await;
        let bob = make_user(&conn, "bob").await;
        let n = NotificationRepository::create(&conn, &make_notification(alice.id, "a1"))
            .await
            .unwrap();

        assert!(!NotificationRepository::set_read(&conn, n.id, bob.id, true)
            .await
            .unwrap());
    }
}
