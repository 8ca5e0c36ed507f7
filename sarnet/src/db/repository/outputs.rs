use libsql::{params, Connection};

use super::{count, format_ts, parse_json, parse_ts};
use crate::error::Result;
use crate::models::{Page, ProcessingOutput, SourceDownload};

const OUTPUT_COLUMNS: &str = "id, user_id, output_id, source_format, text, storage_path, meta_data, \
     created_at, updated_at";

pub struct OutputRepository;

impl OutputRepository {
    pub async fn create(conn: &Connection, output: &ProcessingOutput) -> Result<ProcessingOutput> {
        conn.execute(
            r#"
            INSERT INTO processing_outputs (
                user_id, output_id, source_format, text, storage_path, meta_data,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                output.user_id,
                output.output_id.clone(),
                output.source_format.clone(),
                output.text.clone(),
                output.storage_path.clone(),
                serde_json::to_string(&output.meta_data)?,
                format_ts(&output.created_at),
                format_ts(&output.updated_at),
            ],
        )
        .await?;

        Ok(ProcessingOutput {
            id: conn.last_insert_rowid(),
            ..output.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, user_id: i64) -> Result<Option<ProcessingOutput>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {OUTPUT_COLUMNS} FROM processing_outputs WHERE id = ?1 AND user_id = ?2"
                ),
                params![id, user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_output(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Newest first, optionally restricted to one source format.
    pub async fn list(
        conn: &Connection,
        user_id: i64,
        source_format: Option<&str>,
        page: Page,
    ) -> Result<(Vec<ProcessingOutput>, u64)> {
        let filter = if source_format.is_some() {
            "user_id = ?1 AND source_format = ?2"
        } else {
            "user_id = ?1 AND ?2 IS NULL"
        };
        let format_param = source_format.map(str::to_string);

        let total = count(
            conn,
            &format!("SELECT COUNT(*) FROM processing_outputs WHERE {filter}"),
            params![user_id, format_param.clone()],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {OUTPUT_COLUMNS} FROM processing_outputs WHERE {filter} \
                     ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4"
                ),
                params![user_id, format_param, page.limit(), page.offset()],
            )
            .await?;

        let mut outputs = Vec::new();
        while let Some(row) = rows.next().await? {
            outputs.push(Self::row_to_output(&row)?);
        }
        Ok((outputs, total))
    }

    pub async fn update(conn: &Connection, output: &ProcessingOutput) -> Result<()> {
        conn.execute(
            r#"
            UPDATE processing_outputs SET
                output_id = ?3,
                source_format = ?4,
                text = ?5,
                storage_path = ?6,
                meta_data = ?7,
                updated_at = ?8
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![
                output.id,
                output.user_id,
                output.output_id.clone(),
                output.source_format.clone(),
                output.text.clone(),
                output.storage_path.clone(),
                serde_json::to_string(&output.meta_data)?,
                format_ts(&output.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "DELETE FROM processing_outputs WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    fn row_to_output(row: &libsql::Row) -> Result<ProcessingOutput> {
        Ok(ProcessingOutput {
            id: row.get(0)?,
            user_id: row.get(1)?,
            output_id: row.get(2)?,
            source_format: row.get(3)?,
            text: row.get(4)?,
            storage_path: row.get(5)?,
            meta_data: parse_json(&row.get::<String>(6)?),
            created_at: parse_ts(&row.get::<String>(7)?),
            updated_at: parse_ts(&row.get::<String>(8)?),
        })
    }
}

const DOWNLOAD_COLUMNS: &str = "id, user_id, source_id, created_at, updated_at";

pub struct SourceDownloadRepository;

impl SourceDownloadRepository {
    pub async fn create(conn: &Connection, download: &SourceDownload) -> Result<SourceDownload> {
        conn.execute(
            "INSERT INTO source_downloads (user_id, source_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                download.user_id,
                download.source_id.clone(),
                format_ts(&download.created_at),
                format_ts(&download.updated_at),
            ],
        )
        .await?;

        Ok(SourceDownload {
            id: conn.last_insert_rowid(),
            ..download.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, user_id: i64) -> Result<Option<SourceDownload>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {DOWNLOAD_COLUMNS} FROM source_downloads WHERE id = ?1 AND user_id = ?2"
                ),
                params![id, user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_download(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list(
        conn: &Connection,
        user_id: i64,
        page: Page,
    ) -> Result<(Vec<SourceDownload>, u64)> {
        let total = count(
            conn,
            "SELECT COUNT(*) FROM source_downloads WHERE user_id = ?1",
            params![user_id],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {DOWNLOAD_COLUMNS} FROM source_downloads WHERE user_id = ?1 \
                     ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                ),
                params![user_id, page.limit(), page.offset()],
            )
            .await?;

        let mut downloads = Vec::new();
        while let Some(row) = rows.next().await? {
            downloads.push(Self::row_to_download(&row)?);
        }
        Ok((downloads, total))
    }

    pub async fn update(conn: &Connection, download: &SourceDownload) -> Result<()> {
        conn.execute(
            "UPDATE source_downloads SET source_id = ?3, updated_at = ?4 \
             WHERE id = ?1 AND user_id = ?2",
            params![
                download.id,
                download.user_id,
                download.source_id.clone(),
                format_ts(&download.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "DELETE FROM source_downloads WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    fn row_to_download(row: &libsql::Row) -> Result<SourceDownload> {
        Ok(SourceDownload {
            id: row.get(0)?,
            user_id: row.get(1)?,
            source_id: row.get(2)?,
            created_at: parse_ts(&row.get::<String>(3)?),
            updated_at: parse_ts(&row.get::<String>(4)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::{make_user, setup_test_db};
    use chrono::Utc;

    fn make_output(user_id: i64, output_id: &str, format: &str) -> ProcessingOutput {
        let now = Utc::now();
        ProcessingOutput {
            id: 0,
            user_id,
            output_id: output_id.to_string(),
            source_format: format.to_string(),
            text: String::new(),
            storage_path: format!("outputs/{output_id}.{format}"),
            meta_data: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_filter_outputs_by_format() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        OutputRepository::create(&conn, &make_output(user.id, "o-1", "png"))
            .await
            .unwrap();
        OutputRepository::create(&conn, &make_output(user.id, "o-2", "tiff"))
            .await
            .unwrap();

        let (pngs, total) = OutputRepository::list(&conn, user.id, Some("png"), Page::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(pngs[0].output_id, "o-1");

        let (all, total) = OutputRepository::list(&conn, user.id, None, Page::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_source_id_unique() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        let now = Utc::now();
        let download = SourceDownload {
            id: 0,
            user_id: user.id,
            source_id: "src-1".to_string(),
            created_at: now,
            updated_at: now,
        };
        SourceDownloadRepository::create(&conn, &download)
            .await
            .unwrap();
        assert!(SourceDownloadRepository::create(&conn, &download)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_pagination_windows() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        for i in 0..5 {
            OutputRepository::create(&conn, &make_output(user.id, &format!("o-{i}"), "png"))
                .await
                .unwrap();
        }

        let (page_two, total) = OutputRepository::list(&conn, user.id, None, Page::new(2, 2))
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page_two.len(), 2);
        let (page_three, _) = OutputRepository::list(&conn, user.id, None, Page::new(3, 2))
            .await
            .unwrap();
        assert_eq!(page_three.len(), 1);
    }
}
