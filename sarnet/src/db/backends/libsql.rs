use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::connection::Database;
use crate::db::repository::{
    CredentialsRepository, EventRepository, ImageRepository, JobRepository, JobResultRepository,
    NotificationRepository, OutputRepository, PatternRepository, SessionRepository,
    SettingsRepository, SourceDownloadRepository, UserRepository, ViaEventRepository,
};
use crate::db::traits::{
    CredentialStore, DatabaseBackend, EventStore, ImageStore, JobResultStore, JobStore,
    NotificationStore, OutputStore, PatternStore, SessionStore, SettingsStore,
    SourceDownloadStore, UserStore, ViaEventStore,
};
use crate::error::Result;
use crate::models::{
    Event, Image, JobResult, JobStatus, Notification, Page, Pattern, ProcessingJob,
    ProcessingOutput, Session, SourceDownload, User, UserCredentials, UserSettings, ViaEvent,
};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for LibSqlBackend {
    async fn create_user(&self, user: &User) -> Result<User> {
        let conn = self.db.connect().await?;
        UserRepository::create(&conn, user).await
    }
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.db.connect().await?;
        UserRepository::get_by_id(&conn, id).await
    }
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.connect().await?;
        UserRepository::get_by_email(&conn, email).await
    }
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.db.connect().await?;
        UserRepository::get_by_username(&conn, username).await
    }
    async fn username_exists(&self, username: &str) -> Result<bool> {
        let conn = self.db.connect().await?;
        UserRepository::username_exists(&conn, username).await
    }
    async fn list_users(&self, scope: Option<i64>, page: Page) -> Result<(Vec<User>, u64)> {
        let conn = self.db.connect().await?;
        UserRepository::list(&conn, scope, page).await
    }
    async fn update_user(&self, user: &User) -> Result<()> {
        let conn = self.db.connect().await?;
        UserRepository::update(&conn, user).await
    }
    async fn delete_user(&self, id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        UserRepository::delete(&conn, id).await
    }
}

#[async_trait]
impl CredentialStore for LibSqlBackend {
    async fn create_credentials(&self, creds: &UserCredentials) -> Result<UserCredentials> {
        let conn = self.db.connect().await?;
        CredentialsRepository::create(&conn, creds).await
    }
    async fn get_credentials(&self, id: i64, user_id: i64) -> Result<Option<UserCredentials>> {
        let conn = self.db.connect().await?;
        CredentialsRepository::get(&conn, id, user_id).await
    }
    async fn list_credentials(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<(Vec<UserCredentials>, u64)> {
        let conn = self.db.connect().await?;
        CredentialsRepository::list(&conn, user_id, page).await
    }
    async fn update_credentials(&self, creds: &UserCredentials) -> Result<()> {
        let conn = self.db.connect().await?;
        CredentialsRepository::update(&conn, creds).await
    }
    async fn delete_credentials(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        CredentialsRepository::delete(&conn, id, user_id).await
    }
}

#[async_trait]
impl SettingsStore for LibSqlBackend {
    async fn create_settings(&self, settings: &UserSettings) -> Result<UserSettings> {
        let conn = self.db.connect().await?;
        SettingsRepository::create(&conn, settings).await
    }
    async fn get_settings(&self, id: i64, user_id: i64) -> Result<Option<UserSettings>> {
        let conn = self.db.connect().await?;
        SettingsRepository::get(&conn, id, user_id).await
    }
    async fn get_or_create_settings(&self, user_id: i64) -> Result<UserSettings> {
        let conn = self.db.connect().await?;
        SettingsRepository::get_or_create(&conn, user_id).await
    }
    async fn list_settings(&self, user_id: i64, page: Page) -> Result<(Vec<UserSettings>, u64)> {
        let conn = self.db.connect().await?;
        SettingsRepository::list(&conn, user_id, page).await
    }
    async fn update_settings(&self, settings: &UserSettings) -> Result<()> {
        let conn = self.db.connect().await?;
        SettingsRepository::update(&conn, settings).await
    }
    async fn delete_settings(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        SettingsRepository::delete(&conn, id, user_id).await
    }
}

#[async_trait]
impl SessionStore for LibSqlBackend {
    async fn create_session(&self, session: &Session) -> Result<Session> {
        let conn = self.db.connect().await?;
        SessionRepository::create(&conn, session).await
    }
    async fn get_session(&self, id: i64, user_id: i64) -> Result<Option<Session>> {
        let conn = self.db.connect().await?;
        SessionRepository::get(&conn, id, user_id).await
    }
    async fn list_sessions(&self, user_id: i64, page: Page) -> Result<(Vec<Session>, u64)> {
        let conn = self.db.connect().await?;
        SessionRepository::list(&conn, user_id, page).await
    }
    async fn update_session(&self, session: &Session) -> Result<()> {
        let conn = self.db.connect().await?;
        SessionRepository::update(&conn, session).await
    }
    async fn mark_session_analyzed(
        &self,
        id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.db.connect().await?;
        SessionRepository::mark_analyzed(&conn, id, user_id, at).await
    }
    async fn delete_session(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        SessionRepository::delete(&conn, id, user_id).await
    }
    async fn clear_sessions(&self, user_id: i64) -> Result<u64> {
        let conn = self.db.connect().await?;
        SessionRepository::delete_all_for_user(&conn, user_id).await
    }
}

#[async_trait]
impl ImageStore for LibSqlBackend {
    async fn create_image(&self, image: &Image) -> Result<Image> {
        let conn = self.db.connect().await?;
        let tx = conn.transaction().await?;
        let created = ImageRepository::create(&tx, image).await?;
        SessionRepository::adjust_total_cnt(&tx, created.session_id, 1).await?;
        tx.commit().await?;
        Ok(created)
    }
    async fn get_image(&self, id: i64, owner_id: i64) -> Result<Option<Image>> {
        let conn = self.db.connect().await?;
        ImageRepository::get(&conn, id, owner_id).await
    }
    async fn list_images(&self, owner_id: i64, page: Page) -> Result<(Vec<Image>, u64)> {
        let conn = self.db.connect().await?;
        ImageRepository::list(&conn, owner_id, page).await
    }
    async fn list_session_images(&self, session_id: i64) -> Result<Vec<Image>> {
        let conn = self.db.connect().await?;
        ImageRepository::list_for_session(&conn, session_id).await
    }
    async fn update_image(&self, image: &Image, previous_session_id: i64) -> Result<()> {
        let conn = self.db.connect().await?;
        let tx = conn.transaction().await?;
        ImageRepository::update(&tx, image).await?;
        if image.session_id != previous_session_id {
            SessionRepository::adjust_total_cnt(&tx, previous_session_id, -1).await?;
            SessionRepository::adjust_total_cnt(&tx, image.session_id, 1).await?;
        }
        tx.commit().await?;
        Ok(())
    }
    async fn delete_image(&self, image: &Image) -> Result<bool> {
        let conn = self.db.connect().await?;
        let tx = conn.transaction().await?;
        let deleted = ImageRepository::delete(&tx, image.id).await?;
        if deleted {
            SessionRepository::adjust_total_cnt(&tx, image.session_id, -1).await?;
        }
        tx.commit().await?;
        Ok(deleted)
    }
}

#[async_trait]
impl NotificationStore for LibSqlBackend {
    async fn create_notification(&self, notification: &Notification) -> Result<Notification> {
        let conn = self.db.connect().await?;
        NotificationRepository::create(&conn, notification).await
    }
    async fn get_notification(&self, id: i64, user_id: i64) -> Result<Option<Notification>> {
        let conn = self.db.connect().await?;
        NotificationRepository::get(&conn, id, user_id).await
    }
    async fn list_notifications(
        &self,
        user_id: i64,
        unread_only: bool,
        page: Page,
    ) -> Result<(Vec<Notification>, u64)> {
        let conn = self.db.connect().await?;
        NotificationRepository::list(&conn, user_id, unread_only, page).await
    }
    async fn update_notification(&self, notification: &Notification) -> Result<()> {
        let conn = self.db.connect().await?;
        NotificationRepository::update(&conn, notification).await
    }
    async fn set_notification_read(&self, id: i64, user_id: i64, is_read: bool) -> Result<bool> {
        let conn = self.db.connect().await?;
        NotificationRepository::set_read(&conn, id, user_id, is_read).await
    }
    async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64> {
        let conn = self.db.connect().await?;
        NotificationRepository::mark_all_read(&conn, user_id).await
    }
    async fn delete_notification(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        NotificationRepository::delete(&conn, id, user_id).await
    }
}

#[async_trait]
impl EventStore for LibSqlBackend {
    async fn create_event(&self, event: &Event) -> Result<Event> {
        let conn = self.db.connect().await?;
        EventRepository::create(&conn, event).await
    }
    async fn get_event(&self, id: i64, user_id: i64) -> Result<Option<Event>> {
        let conn = self.db.connect().await?;
        EventRepository::get(&conn, id, user_id).await
    }
    async fn list_events(&self, user_id: i64, page: Page) -> Result<(Vec<Event>, u64)> {
        let conn = self.db.connect().await?;
        EventRepository::list(&conn, user_id, page).await
    }
    async fn update_event(&self, event: &Event) -> Result<()> {
        let conn = self.db.connect().await?;
        EventRepository::update(&conn, event).await
    }
    async fn delete_event(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        EventRepository::delete(&conn, id, user_id).await
    }
}

#[async_trait]
impl PatternStore for LibSqlBackend {
    async fn create_pattern(&self, pattern: &Pattern) -> Result<Pattern> {
        let conn = self.db.connect().await?;
        PatternRepository::create(&conn, pattern).await
    }
    async fn get_pattern(&self, id: i64, user_id: i64) -> Result<Option<Pattern>> {
        let conn = self.db.connect().await?;
        PatternRepository::get(&conn, id, user_id).await
    }
    async fn list_patterns(
        &self,
        user_id: i64,
        above: Option<f64>,
        page: Page,
    ) -> Result<(Vec<Pattern>, u64)> {
        let conn = self.db.connect().await?;
        PatternRepository::list(&conn, user_id, above, page).await
    }
    async fn update_pattern(&self, pattern: &Pattern) -> Result<()> {
        let conn = self.db.connect().await?;
        PatternRepository::update(&conn, pattern).await
    }
    async fn delete_pattern(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        PatternRepository::delete(&conn, id, user_id).await
    }
}

#[async_trait]
impl ViaEventStore for LibSqlBackend {
    async fn create_via_event(&self, event: &ViaEvent) -> Result<ViaEvent> {
        let conn = self.db.connect().await?;
        ViaEventRepository::create(&conn, event).await
    }
    async fn get_via_event(&self, id: i64, user_id: i64) -> Result<Option<ViaEvent>> {
        let conn = self.db.connect().await?;
        ViaEventRepository::get(&conn, id, user_id).await
    }
    async fn list_via_events(&self, user_id: i64, page: Page) -> Result<(Vec<ViaEvent>, u64)> {
        let conn = self.db.connect().await?;
        ViaEventRepository::list(&conn, user_id, page).await
    }
    async fn update_via_event(&self, event: &ViaEvent) -> Result<()> {
        let conn = self.db.connect().await?;
        ViaEventRepository::update(&conn, event).await
    }
    async fn delete_via_event(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        ViaEventRepository::delete(&conn, id, user_id).await
    }
}

#[async_trait]
impl JobStore for LibSqlBackend {
    async fn create_job(&self, job: &ProcessingJob) -> Result<ProcessingJob> {
        let conn = self.db.connect().await?;
        JobRepository::create(&conn, job).await
    }
    async fn get_job(&self, id: i64, user_id: i64) -> Result<Option<ProcessingJob>> {
        let conn = self.db.connect().await?;
        JobRepository::get(&conn, id, user_id).await
    }
    async fn list_jobs(
        &self,
        user_id: i64,
        status: Option<JobStatus>,
        page: Page,
    ) -> Result<(Vec<ProcessingJob>, u64)> {
        let conn = self.db.connect().await?;
        JobRepository::list(&conn, user_id, status, page).await
    }
    async fn update_job(&self, job: &ProcessingJob) -> Result<()> {
        let conn = self.db.connect().await?;
        JobRepository::update(&conn, job).await
    }
    async fn cancel_job(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        JobRepository::cancel_if_pending(&conn, id, user_id).await
    }
    async fn delete_job(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        JobRepository::delete(&conn, id, user_id).await
    }
}

#[async_trait]
impl JobResultStore for LibSqlBackend {
    async fn create_job_result(&self, result: &JobResult) -> Result<JobResult> {
        let conn = self.db.connect().await?;
        JobResultRepository::create(&conn, result).await
    }
    async fn get_job_result(&self, id: i64, owner_id: i64) -> Result<Option<JobResult>> {
        let conn = self.db.connect().await?;
        JobResultRepository::get(&conn, id, owner_id).await
    }
    async fn get_result_for_job(&self, job_id: i64) -> Result<Option<JobResult>> {
        let conn = self.db.connect().await?;
        JobResultRepository::get_for_job(&conn, job_id).await
    }
    async fn list_job_results(&self, owner_id: i64, page: Page) -> Result<(Vec<JobResult>, u64)> {
        let conn = self.db.connect().await?;
        JobResultRepository::list(&conn, owner_id, page).await
    }
}

#[async_trait]
impl OutputStore for LibSqlBackend {
    async fn create_output(&self, output: &ProcessingOutput) -> Result<ProcessingOutput> {
        let conn = self.db.connect().await?;
        OutputRepository::create(&conn, output).await
    }
    async fn get_output(&self, id: i64, user_id: i64) -> Result<Option<ProcessingOutput>> {
        let conn = self.db.connect().await?;
        OutputRepository::get(&conn, id, user_id).await
    }
    async fn list_outputs(
        &self,
        user_id: i64,
        source_format: Option<&str>,
        page: Page,
    ) -> Result<(Vec<ProcessingOutput>, u64)> {
        let conn = self.db.connect().await?;
        OutputRepository::list(&conn, user_id, source_format, page).await
    }
    async fn update_output(&self, output: &ProcessingOutput) -> Result<()> {
        let conn = self.db.connect().await?;
        OutputRepository::update(&conn, output).await
    }
    async fn delete_output(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        OutputRepository::delete(&conn, id, user_id).await
    }
}

#[async_trait]
impl SourceDownloadStore for LibSqlBackend {
    async fn create_download(&self, download: &SourceDownload) -> Result<SourceDownload> {
        let conn = self.db.connect().await?;
        SourceDownloadRepository::create(&conn, download).await
    }
    async fn get_download(&self, id: i64, user_id: i64) -> Result<Option<SourceDownload>> {
        let conn = self.db.connect().await?;
        SourceDownloadRepository::get(&conn, id, user_id).await
    }
    async fn list_downloads(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<(Vec<SourceDownload>, u64)> {
        let conn = self.db.connect().await?;
        SourceDownloadRepository::list(&conn, user_id, page).await
    }
    async fn update_download(&self, download: &SourceDownload) -> Result<()> {
        let conn = self.db.connect().await?;
        SourceDownloadRepository::update(&conn, download).await
    }
    async fn delete_download(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        SourceDownloadRepository::delete(&conn, id, user_id).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}
