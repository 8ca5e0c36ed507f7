use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Event, Image, JobResult, JobStatus, Notification, Page, Pattern, ProcessingJob,
    ProcessingOutput, Session, SourceDownload, User, UserCredentials, UserSettings, ViaEvent,
};

// ---------------------------------------------------------------------------
// Individual store traits
// ---------------------------------------------------------------------------
//
// Every owned record is looked up with the caller's user id; a record owned by
// somebody else is indistinguishable from a missing one.

/// Accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<User>;
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn username_exists(&self, username: &str) -> Result<bool>;
    /// `scope` of `None` lists every user.
    async fn list_users(&self, scope: Option<i64>, page: Page) -> Result<(Vec<User>, u64)>;
    async fn update_user(&self, user: &User) -> Result<()>;
    async fn delete_user(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create_credentials(&self, creds: &UserCredentials) -> Result<UserCredentials>;
    async fn get_credentials(&self, id: i64, user_id: i64) -> Result<Option<UserCredentials>>;
    async fn list_credentials(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<(Vec<UserCredentials>, u64)>;
    async fn update_credentials(&self, creds: &UserCredentials) -> Result<()>;
    async fn delete_credentials(&self, id: i64, user_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn create_settings(&self, settings: &UserSettings) -> Result<UserSettings>;
    async fn get_settings(&self, id: i64, user_id: i64) -> Result<Option<UserSettings>>;
    async fn get_or_create_settings(&self, user_id: i64) -> Result<UserSettings>;
    async fn list_settings(&self, user_id: i64, page: Page) -> Result<(Vec<UserSettings>, u64)>;
    async fn update_settings(&self, settings: &UserSettings) -> Result<()>;
    async fn delete_settings(&self, id: i64, user_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<Session>;
    async fn get_session(&self, id: i64, user_id: i64) -> Result<Option<Session>>;
    async fn list_sessions(&self, user_id: i64, page: Page) -> Result<(Vec<Session>, u64)>;
    async fn update_session(&self, session: &Session) -> Result<()>;
    async fn mark_session_analyzed(&self, id: i64, user_id: i64, at: DateTime<Utc>)
        -> Result<bool>;
    async fn delete_session(&self, id: i64, user_id: i64) -> Result<bool>;
    /// Delete every session the user owns, returning how many were removed.
    async fn clear_sessions(&self, user_id: i64) -> Result<u64>;
}

/// Images keep their session's `total_cnt` in step.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn create_image(&self, image: &Image) -> Result<Image>;
    async fn get_image(&self, id: i64, owner_id: i64) -> Result<Option<Image>>;
    async fn list_images(&self, owner_id: i64, page: Page) -> Result<(Vec<Image>, u64)>;
    async fn list_session_images(&self, session_id: i64) -> Result<Vec<Image>>;
    /// `previous_session_id` lets the counters follow an image that moved sessions.
    async fn update_image(&self, image: &Image, previous_session_id: i64) -> Result<()>;
    async fn delete_image(&self, image: &Image) -> Result<bool>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(&self, notification: &Notification) -> Result<Notification>;
    async fn get_notification(&self, id: i64, user_id: i64) -> Result<Option<Notification>>;
    async fn list_notifications(
        &self,
        user_id: i64,
        unread_only: bool,
        page: Page,
    ) -> Result<(Vec<Notification>, u64)>;
    async fn update_notification(&self, notification: &Notification) -> Result<()>;
    async fn set_notification_read(&self, id: i64, user_id: i64, is_read: bool) -> Result<bool>;
    async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64>;
    async fn delete_notification(&self, id: i64, user_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: &Event) -> Result<Event>;
    async fn get_event(&self, id: i64, user_id: i64) -> Result<Option<Event>>;
    async fn list_events(&self, user_id: i64, page: Page) -> Result<(Vec<Event>, u64)>;
    async fn update_event(&self, event: &Event) -> Result<()>;
    async fn delete_event(&self, id: i64, user_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn create_pattern(&self, pattern: &Pattern) -> Result<Pattern>;
    async fn get_pattern(&self, id: i64, user_id: i64) -> Result<Option<Pattern>>;
    /// `above` keeps only patterns with confidence strictly greater than it.
    async fn list_patterns(
        &self,
        user_id: i64,
        above: Option<f64>,
        page: Page,
    ) -> Result<(Vec<Pattern>, u64)>;
    async fn update_pattern(&self, pattern: &Pattern) -> Result<()>;
    async fn delete_pattern(&self, id: i64, user_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait ViaEventStore: Send + Sync {
    async fn create_via_event(&self, event: &ViaEvent) -> Result<ViaEvent>;
    async fn get_via_event(&self, id: i64, user_id: i64) -> Result<Option<ViaEvent>>;
    async fn list_via_events(&self, user_id: i64, page: Page) -> Result<(Vec<ViaEvent>, u64)>;
    async fn update_via_event(&self, event: &ViaEvent) -> Result<()>;
    async fn delete_via_event(&self, id: i64, user_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: &ProcessingJob) -> Result<ProcessingJob>;
    async fn get_job(&self, id: i64, user_id: i64) -> Result<Option<ProcessingJob>>;
    async fn list_jobs(
        &self,
        user_id: i64,
        status: Option<JobStatus>,
        page: Page,
    ) -> Result<(Vec<ProcessingJob>, u64)>;
    async fn update_job(&self, job: &ProcessingJob) -> Result<()>;
    /// Returns false unless the job existed, belonged to the user, and was pending.
    async fn cancel_job(&self, id: i64, user_id: i64) -> Result<bool>;
    async fn delete_job(&self, id: i64, user_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait JobResultStore: Send + Sync {
    async fn create_job_result(&self, result: &JobResult) -> Result<JobResult>;
    async fn get_job_result(&self, id: i64, owner_id: i64) -> Result<Option<JobResult>>;
    async fn get_result_for_job(&self, job_id: i64) -> Result<Option<JobResult>>;
    async fn list_job_results(&self, owner_id: i64, page: Page) -> Result<(Vec<JobResult>, u64)>;
}

#[async_trait]
pub trait OutputStore: Send + Sync {
    async fn create_output(&self, output: &ProcessingOutput) -> Result<ProcessingOutput>;
    async fn get_output(&self, id: i64, user_id: i64) -> Result<Option<ProcessingOutput>>;
    async fn list_outputs(
        &self,
        user_id: i64,
        source_format: Option<&str>,
        page: Page,
    ) -> Result<(Vec<ProcessingOutput>, u64)>;
    async fn update_output(&self, output: &ProcessingOutput) -> Result<()>;
    async fn delete_output(&self, id: i64, user_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait SourceDownloadStore: Send + Sync {
    async fn create_download(&self, download: &SourceDownload) -> Result<SourceDownload>;
    async fn get_download(&self, id: i64, user_id: i64) -> Result<Option<SourceDownload>>;
    async fn list_downloads(&self, user_id: i64, page: Page)
        -> Result<(Vec<SourceDownload>, u64)>;
    async fn update_download(&self, download: &SourceDownload) -> Result<()>;
    async fn delete_download(&self, id: i64, user_id: i64) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Composite backend
// ---------------------------------------------------------------------------

/// Everything the API needs from persistence.
#[async_trait]
pub trait DatabaseBackend:
    UserStore
    + CredentialStore
    + SettingsStore
    + SessionStore
    + ImageStore
    + NotificationStore
    + EventStore
    + PatternStore
    + ViaEventStore
    + JobStore
    + JobResultStore
    + OutputStore
    + SourceDownloadStore
{
    /// Cheap liveness probe.
    async fn ping(&self) -> Result<()>;
}
