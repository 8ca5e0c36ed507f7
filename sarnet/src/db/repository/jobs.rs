use chrono::Utc;
use libsql::{params, Connection};

use super::{count, format_ts, parse_json, parse_ts};
use crate::error::Result;
use crate::models::{JobResult, JobStatus, Page, ProcessingJob};

const JOB_COLUMNS: &str = "id, user_id, job_id, job_type, status, priority, schedule, message, \
     created_at, updated_at";

pub struct JobRepository;

impl JobRepository {
    pub async fn create(conn: &Connection, job: &ProcessingJob) -> Result<ProcessingJob> {
        conn.execute(
            r#"
            INSERT INTO processing_jobs (
                user_id, job_id, job_type, status, priority, schedule, message, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                job.user_id,
                job.job_id.clone(),
                job.job_type.clone(),
                job.status.to_string(),
                job.priority,
                format_ts(&job.schedule),
                job.message.clone(),
                format_ts(&job.created_at),
                format_ts(&job.updated_at),
            ],
        )
        .await?;

        Ok(ProcessingJob {
            id: conn.last_insert_rowid(),
            ..job.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, user_id: i64) -> Result<Option<ProcessingJob>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM processing_jobs WHERE id = ?1 AND user_id = ?2"
                ),
                params![id, user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_job(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Highest priority first, then earliest schedule.
    pub async fn list(
        conn: &Connection,
        user_id: i64,
        status: Option<JobStatus>,
        page: Page,
    ) -> Result<(Vec<ProcessingJob>, u64)> {
        let (filter, status_param) = match status {
            Some(status) => ("user_id = ?1 AND status = ?2", status.to_string()),
            None => ("user_id = ?1 AND ?2 = ?2", String::new()),
        };

        let total = count(
            conn,
            &format!("SELECT COUNT(*) FROM processing_jobs WHERE {filter}"),
            params![user_id, status_param.clone()],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM processing_jobs WHERE {filter} \
                     ORDER BY priority DESC, schedule ASC, id ASC LIMIT ?3 OFFSET ?4"
                ),
                params![user_id, status_param, page.limit(), page.offset()],
            )
            .await?;

        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await? {
            jobs.push(Self::row_to_job(&row)?);
        }
        Ok((jobs, total))
    }

    pub async fn update(conn: &Connection, job: &ProcessingJob) -> Result<()> {
        conn.execute(
            r#"
            UPDATE processing_jobs SET
                job_id = ?3,
                job_type = ?4,
                status = ?5,
                priority = ?6,
                schedule = ?7,
                message = ?8,
                updated_at = ?9
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![
                job.id,
                job.user_id,
                job.job_id.clone(),
                job.job_type.clone(),
                job.status.to_string(),
                job.priority,
                format_ts(&job.schedule),
                job.message.clone(),
                format_ts(&job.updated_at),
            ],
        )
        .await?;

        Ok(())
    }

    /// Fail a job on the owner's behalf, but only while it is still pending.
    /// Returns false when the job is missing, foreign, or already started.
    pub async fn cancel_if_pending(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                r#"
                UPDATE processing_jobs SET status = ?3, message = ?4, updated_at = ?5
                WHERE id = ?1 AND user_id = ?2 AND status = 'pending'
                "#,
                params![
                    id,
                    user_id,
                    JobStatus::Failed.to_string(),
                    ProcessingJob::CANCELLED_MESSAGE,
                    format_ts(&Utc::now()),
                ],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    pub async fn delete(conn: &Connection, id: i64, user_id: i64) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "DELETE FROM processing_jobs WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    fn row_to_job(row: &libsql::Row) -> Result<ProcessingJob> {
        Ok(ProcessingJob {
            id: row.get(0)?,
            user_id: row.get(1)?,
            job_id: row.get(2)?,
            job_type: row.get(3)?,
            status: row.get::<String>(4)?.parse().unwrap_or_default(),
            priority: row.get(5)?,
            schedule: parse_ts(&row.get::<String>(6)?),
            message: row.get(7)?,
            created_at: parse_ts(&row.get::<String>(8)?),
            updated_at: parse_ts(&row.get::<String>(9)?),
        })
    }
}

const RESULT_COLUMNS: &str =
    "r.id, r.job_id, r.result_id, r.result_data, r.created_at, r.updated_at";

/// Results are owned through their job.
pub struct JobResultRepository;

impl JobResultRepository {
    pub async fn create(conn: &Connection, result: &JobResult) -> Result<JobResult> {
        conn.execute(
            r#"
            INSERT INTO job_results (job_id, result_id, result_data, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                result.job_id,
                result.result_id.clone(),
                serde_json::to_string(&result.result_data)?,
                format_ts(&result.created_at),
                format_ts(&result.updated_at),
            ],
        )
        .await?;

        Ok(JobResult {
            id: conn.last_insert_rowid(),
            ..result.clone()
        })
    }

    pub async fn get(conn: &Connection, id: i64, owner_id: i64) -> Result<Option<JobResult>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {RESULT_COLUMNS} FROM job_results r \
                     JOIN processing_jobs j ON j.id = r.job_id WHERE r.id = ?1 AND j.user_id = ?2"
                ),
                params![id, owner_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_result(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn get_for_job(conn: &Connection, job_id: i64) -> Result<Option<JobResult>> {
        let mut rows = conn
            .query(
                &format!("SELECT {RESULT_COLUMNS} FROM job_results r WHERE r.job_id = ?1"),
                params![job_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_result(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list(
        conn: &Connection,
        owner_id: i64,
        page: Page,
    ) -> Result<(Vec<JobResult>, u64)> {
        let total = count(
            conn,
            "SELECT COUNT(*) FROM job_results r JOIN processing_jobs j ON j.id = r.job_id \
             WHERE j.user_id = ?1",
            params![owner_id],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {RESULT_COLUMNS} FROM job_results r \
                     JOIN processing_jobs j ON j.id = r.job_id WHERE j.user_id = ?1 \
                     ORDER BY r.created_at DESC, r.id DESC LIMIT ?2 OFFSET ?3"
                ),
                params![owner_id, page.limit(), page.offset()],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_result(&row)?);
        }
        Ok((results, total))
    }

    fn row_to_result(row: &libsql::Row) -> Result<JobResult> {
        Ok(JobResult {
            id: row.get(0)?,
            job_id: row.get(1)?,
            result_id: row.get(2)?,
            result_data: parse_json(&row.get::<String>(3)?),
            created_at: parse_ts(&row.get::<String>(4)?),
            updated_at: parse_ts(&row.get::<String>(5)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::{make_user, setup_test_db};

    fn make_job(user_id: i64, job_id: &str, priority: i64) -> ProcessingJob {
        let now = Utc::now();
        ProcessingJob {
            id: 0,
            user_id,
            job_id: job_id.to_string(),
            job_type: "colorize".to_string(),
            status: JobStatus::Pending,
            priority,
            schedule: now,
            message: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_cancel_only_pending_jobs() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        let pending = JobRepository::create(&conn, &make_job(user.id, "j-1", 0))
            .await
            .unwrap();
        let mut running = make_job(user.id, "j-2", 0);
        running.status = JobStatus::Running;
        let running = JobRepository::create(&conn, &running).await.unwrap();

        assert!(JobRepository::cancel_if_pending(&conn, pending.id, user.id)
            .await
            .unwrap());
        let cancelled = JobRepository::get(&conn, pending.id, user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.status, JobStatus::Failed);
        assert_eq!(cancelled.message, "Cancelled by user");

        assert!(!JobRepository::cancel_if_pending(&conn, running.id, user.id)
            .await
            .unwrap());
        assert!(!JobRepository::cancel_if_pending(&conn, pending.id, user.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_orders_by_priority_and_filters_status() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        JobRepository::create(&conn, &make_job(user.id, "low", 1))
            .await
            .unwrap();
        JobRepository::create(&conn, &make_job(user.id, "high", 9))
            .await
            .unwrap();
        let mut done = make_job(user.id, "done", 5);
        done.status = JobStatus::Completed;
        JobRepository::create(&conn, &done).await.unwrap();

        let (all, total) = JobRepository::list(&conn, user.id, None, Page::default())
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(all[0].job_id, "high");

        let (pending, total) =
            JobRepository::list(&conn, user.id, Some(JobStatus::Pending), Page::default())
                .await
                .unwrap();
        assert_eq!(total, 2);
        assert!(pending.iter().all(|j| j.status == JobStatus::Pending));
    }

    #[tokio::test]
    async fn test_negative_priority_rejected_by_schema() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        assert!(JobRepository::create(&conn, &make_job(user.id, "neg", -1))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_one_result_per_job() {
        let conn = setup_test_db().await;
        let user = make_user(&conn, "alice").await;
        let job = JobRepository::create(&conn, &make_job(user.id, "j-1", 0))
            .await
            .unwrap();
        let now = Utc::now();
        let result = JobResult {
            id: 0,
            job_id: job.id,
            result_id: "r-1".to_string(),
            result_data: serde_json::json!({"ok": true}),
            created_at: now,
            updated_at: now,
        };
        JobResultRepository::create(&conn, &result).await.unwrap();

        let second = JobResult {
            result_id: "r-2".to_string(),
            ..result
        };
        let err = JobResultRepository::create(&conn, &second).await.unwrap_err();
        assert!(err.is_unique_violation("job_results.job_id"));
        assert!(!err.is_unique_violation("job_results.result_id"));

        let stored = JobResultRepository::get_for_job(&conn, job.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.result_data["ok"], true);
    }

    #[tokio::test]
    async fn test_results_scoped_through_job_owner() {
        let conn = setup_test_db().await;
        let alice = make_user(&conn, "alice").await;
        let bob = make_user(&conn, "bob").await;
        let job = JobRepository::create(&conn, &make_job(alice.id, "j-1", 0))
            .await
            .unwrap();
        let now = Utc::now();
        let created = JobResultRepository::create(
            &conn,
            &JobResult {
                id: 0,
                job_id: job.id,
                result_id: "r-1".to_string(),
                result_data: serde_json::json!({}),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        assert!(JobResultRepository::get(&conn, created.id, bob.id)
            .await
            .unwrap()
            .is_none());
        let (alices, _) = JobResultRepository::list(&conn, alice.id, Page::default())
            .await
            .unwrap();
        assert_eq!(alices.len(), 1);
    }
}
