use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    auth, credentials, events, images, jobs, notifications, outputs, patterns, predict, sessions,
    settings, users, via_events,
};
use super::openapi;
use super::state::AppState;

/// Everything mounted under `/api`. Paths keep their trailing slash.
pub fn api_router() -> Router<AppState> {
    let auth = Router::new()
        .route("/token/", post(auth::obtain_token))
        .route("/token/refresh/", post(auth::refresh_token))
        .route("/token/verify/", post(auth::verify_token))
        .route("/auth/login/", post(auth::login))
        .route("/auth/registration/", post(auth::register))
        .route("/auth/user/", get(auth::current_user));

    let users = Router::new()
        .route("/users/", get(users::list_users).post(users::create_user))
        .route(
            "/users/me/",
            get(users::me).put(users::update_me).patch(users::update_me),
        )
        .route(
            "/users/update_profile/",
            put(users::update_profile).patch(users::update_profile),
        )
        .route("/users/avatar/", post(users::upload_avatar))
        .route(
            "/users/{id}/",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        );

    let credentials = Router::new()
        .route(
            "/user-credentials/",
            get(credentials::list_credentials).post(credentials::create_credentials),
        )
        .route(
            "/user-credentials/{id}/",
            get(credentials::get_credentials)
                .put(credentials::update_credentials)
                .patch(credentials::update_credentials)
                .delete(credentials::delete_credentials),
        );

    let settings = Router::new()
        .route(
            "/user-settings/",
            get(settings::list_settings).post(settings::create_settings),
        )
        .route("/user-settings/my_settings/", get(settings::my_settings))
        .route(
            "/user-settings/{id}/",
            get(settings::get_settings)
                .put(settings::update_settings)
                .patch(settings::update_settings)
                .delete(settings::delete_settings),
        );

    let sessions = Router::new()
        .route(
            "/sessions/",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route("/sessions/clear_history/", post(sessions::clear_history))
        .route(
            "/sessions/{id}/",
            get(sessions::get_session)
                .put(sessions::update_session)
                .patch(sessions::update_session)
                .delete(sessions::delete_session),
        )
        .route("/sessions/{id}/mark_analyzed/", post(sessions::mark_analyzed));

    let images = Router::new()
        .route("/images/", get(images::list_images).post(images::create_image))
        .route(
            "/images/{id}/",
            get(images::get_image)
                .put(images::update_image)
                .patch(images::update_image)
                .delete(images::delete_image),
        );

    let notifications = Router::new()
        .route(
            "/notifications/",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route("/notifications/unread/", get(notifications::unread_notifications))
        .route("/notifications/mark_all_read/", post(notifications::mark_all_read))
        .route(
            "/notifications/{id}/",
            get(notifications::get_notification)
                .put(notifications::update_notification)
                .patch(notifications::update_notification)
                .delete(notifications::delete_notification),
        )
        .route("/notifications/{id}/mark_read/", post(notifications::mark_read))
        .route("/notifications/{id}/mark_unread/", post(notifications::mark_unread));

    let events = Router::new()
        .route("/events/", get(events::list_events).post(events::create_event))
        .route(
            "/events/{id}/",
            get(events::get_event)
                .put(events::update_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        );

    let patterns = Router::new()
        .route(
            "/patterns/",
            get(patterns::list_patterns).post(patterns::create_pattern),
        )
        .route("/patterns/high_confidence/", get(patterns::high_confidence))
        .route(
            "/patterns/{id}/",
            get(patterns::get_pattern)
                .put(patterns::update_pattern)
                .patch(patterns::update_pattern)
                .delete(patterns::delete_pattern),
        );

    let jobs = Router::new()
        .route("/processing-jobs/", get(jobs::list_jobs).post(jobs::create_job))
        .route("/processing-jobs/pending/", get(jobs::pending_jobs))
        .route(
            "/processing-jobs/{id}/",
            get(jobs::get_job)
                .put(jobs::update_job)
                .patch(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route("/processing-jobs/{id}/cancel/", post(jobs::cancel_job));

    let job_results = Router::new()
        .route(
            "/job-results/",
            get(jobs::list_job_results).post(jobs::create_job_result),
        )
        .route("/job-results/{id}/", get(jobs::get_job_result));

    let via_events = Router::new()
        .route(
            "/via-events/",
            get(via_events::list_via_events).post(via_events::create_via_event),
        )
        .route(
            "/via-events/{id}/",
            get(via_events::get_via_event)
                .put(via_events::update_via_event)
                .patch(via_events::update_via_event)
                .delete(via_events::delete_via_event),
        );

    let outputs = Router::new()
        .route("/processing-outputs/", get(outputs::list_outputs).post(outputs::create_output))
        .route("/processing-outputs/by_format/", get(outputs::outputs_by_format))
        .route(
            "/processing-outputs/{id}/",
            get(outputs::get_output)
                .put(outputs::update_output)
                .patch(outputs::update_output)
                .delete(outputs::delete_output),
        );

    let downloads = Router::new()
        .route(
            "/source-downloads/",
            get(outputs::list_downloads).post(outputs::create_download),
        )
        .route(
            "/source-downloads/{id}/",
            get(outputs::get_download)
                .put(outputs::update_download)
                .patch(outputs::update_download)
                .delete(outputs::delete_download),
        );

    let public_routes = Router::new()
        .route("/health/", get(super::handlers::health_check))
        .route("/openapi.json", get(openapi::openapi_json))
        .merge(openapi::redoc_router());

    Router::new()
        .merge(public_routes)
        .merge(auth)
        .route("/predict/", post(predict::predict))
        .merge(users)
        .merge(credentials)
        .merge(settings)
        .merge(sessions)
        .merge(images)
        .merge(notifications)
        .merge(events)
        .merge(patterns)
        .merge(jobs)
        .merge(job_results)
        .merge(via_events)
        .merge(outputs)
        .merge(downloads)
}
