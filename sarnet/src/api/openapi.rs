use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;
use crate::auth;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SARNet API",
        version = "1.0.0",
        description = "SAR image records, processing bookkeeping and GAN-based pseudo-colorization.",
    ),
    paths(
        handlers::health::health_check,
        // Auth
        handlers::auth::obtain_token,
        handlers::auth::refresh_token,
        handlers::auth::verify_token,
        handlers::auth::login,
        handlers::auth::register,
        handlers::auth::current_user,
        // Users
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::users::me,
        handlers::users::update_me,
        handlers::users::update_profile,
        handlers::users::upload_avatar,
        handlers::credentials::list_credentials,
        handlers::credentials::create_credentials,
        handlers::credentials::get_credentials,
        handlers::credentials::update_credentials,
        handlers::credentials::delete_credentials,
        handlers::settings::list_settings,
        handlers::settings::create_settings,
        handlers::settings::my_settings,
        handlers::settings::get_settings,
        handlers::settings::update_settings,
        handlers::settings::delete_settings,
        // Sessions & images
        handlers::sessions::list_sessions,
        handlers::sessions::create_session,
        handlers::sessions::get_session,
        handlers::sessions::update_session,
        handlers::sessions::delete_session,
        handlers::sessions::mark_analyzed,
        handlers::sessions::clear_history,
        handlers::images::list_images,
        handlers::images::create_image,
        handlers::images::get_image,
        handlers::images::update_image,
        handlers::images::delete_image,
        // Notifications
        handlers::notifications::list_notifications,
        handlers::notifications::unread_notifications,
        handlers::notifications::create_notification,
        handlers::notifications::get_notification,
        handlers::notifications::update_notification,
        handlers::notifications::delete_notification,
        handlers::notifications::mark_read,
        handlers::notifications::mark_unread,
        handlers::notifications::mark_all_read,
        // Activity
        handlers::events::list_events,
        handlers::events::create_event,
        handlers::events::get_event,
        handlers::events::update_event,
        handlers::events::delete_event,
        handlers::patterns::list_patterns,
        handlers::patterns::high_confidence,
        handlers::patterns::create_pattern,
        handlers::patterns::get_pattern,
        handlers::patterns::update_pattern,
        handlers::patterns::delete_pattern,
        handlers::via_events::list_via_events,
        handlers::via_events::create_via_event,
        handlers::via_events::get_via_event,
        handlers::via_events::update_via_event,
        handlers::via_events::delete_via_event,
        // Processing
        handlers::jobs::list_jobs,
        handlers::jobs::pending_jobs,
        handlers::jobs::create_job,
        handlers::jobs::get_job,
        handlers::jobs::update_job,
        handlers::jobs::delete_job,
        handlers::jobs::cancel_job,
        handlers::jobs::list_job_results,
        handlers::jobs::create_job_result,
        handlers::jobs::get_job_result,
        handlers::outputs::list_outputs,
        handlers::outputs::outputs_by_format,
        handlers::outputs::create_output,
        handlers::outputs::get_output,
        handlers::outputs::update_output,
        handlers::outputs::delete_output,
        handlers::outputs::list_downloads,
        handlers::outputs::create_download,
        handlers::outputs::get_download,
        handlers::outputs::update_download,
        handlers::outputs::delete_download,
        // Colorization
        handlers::predict::predict,
    ),
    components(schemas(
        // Envelope
        response::ErrorCode,
        response::ApiError,
        response::StatusMessage,
        // Records
        models::User,
        models::UserCredentials,
        models::UserSettings,
        models::Session,
        models::Image,
        models::Notification,
        models::Event,
        models::Pattern,
        models::ViaEvent,
        models::JobStatus,
        models::ProcessingJob,
        models::JobResult,
        models::ProcessingOutput,
        models::SourceDownload,
        // Auth
        auth::TokenPair,
        dto::TokenObtainRequest,
        dto::TokenRefreshRequest,
        dto::TokenVerifyRequest,
        dto::AccessTokenResponse,
        dto::AuthResponse,
        dto::RegistrationRequest,
        // Users
        dto::CreateUserRequest,
        dto::UpdateUserRequest,
        dto::CreateCredentialsRequest,
        dto::UpdateCredentialsRequest,
        dto::SettingsRequest,
        // Sessions & images
        dto::CreateSessionRequest,
        dto::UpdateSessionRequest,
        dto::SessionResponse,
        dto::ClearHistoryResponse,
        dto::UpdateImageRequest,
        dto::ImageUploadForm,
        // Notifications
        dto::CreateNotificationRequest,
        dto::UpdateNotificationRequest,
        // Activity
        dto::CreateEventRequest,
        dto::UpdateEventRequest,
        dto::CreatePatternRequest,
        dto::UpdatePatternRequest,
        dto::CreateViaEventRequest,
        dto::UpdateViaEventRequest,
        // Processing
        dto::CreateJobRequest,
        dto::UpdateJobRequest,
        dto::JobResponse,
        dto::CreateJobResultRequest,
        dto::CreateOutputRequest,
        dto::UpdateOutputRequest,
        dto::CreateDownloadRequest,
        dto::UpdateDownloadRequest,
        // Colorization
        dto::PredictForm,
        dto::PredictResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::ColorizerStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "auth", description = "JWT issuance, login and registration"),
        (name = "users", description = "User accounts and profiles"),
        (name = "credentials", description = "Stored credential metadata"),
        (name = "settings", description = "Per-user analysis settings"),
        (name = "sessions", description = "Chat sessions and history"),
        (name = "images", description = "Uploaded SAR images"),
        (name = "notifications", description = "User notifications"),
        (name = "events", description = "Activity events"),
        (name = "patterns", description = "Detected behaviour patterns"),
        (name = "via-events", description = "VIA pipeline events"),
        (name = "processing-jobs", description = "Processing jobs and their results"),
        (name = "processing-outputs", description = "Processing outputs and source downloads"),
        (name = "predict", description = "GAN colorization"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::HttpBuilder::new()
                    .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
