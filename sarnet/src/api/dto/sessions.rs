use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{double_option, validate_session_id};
use crate::models::{Image, Session};

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateSessionRequest {
    #[validate(
        length(min = 1, max = 255),
        custom(function = validate_session_id)
    )]
    pub session_id: String,
    /// Defaults to the caller's username.
    #[validate(length(max = 150))]
    pub username: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "type")]
    #[validate(length(max = 50))]
    pub session_type: String,
    /// Defaults to now.
    #[schema(value_type = Option<String>)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub user_status: String,
    #[schema(value_type = Option<String>)]
    pub user_status_date: Option<DateTime<Utc>>,
}

impl CreateSessionRequest {
    pub fn into_session(self, user_id: i64, default_username: &str) -> Session {
        let now = Utc::now();
        Session {
            id: 0,
            user_id,
            session_id: self.session_id,
            username: self
                .username
                .unwrap_or_else(|| default_username.to_string()),
            text: self.text,
            session_type: self.session_type,
            date: self.date.unwrap_or(now),
            total_cnt: 0,
            user_status: self.user_status,
            user_status_date: self.user_status_date,
            post_analysis_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateSessionRequest {
    #[validate(
        length(min = 1, max = 255),
        custom(function = validate_session_id)
    )]
    pub session_id: Option<String>,
    #[validate(length(max = 150))]
    pub username: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(max = 50))]
    pub session_type: Option<String>,
    #[schema(value_type = Option<String>)]
    pub date: Option<DateTime<Utc>>,
    #[validate(length(max = 50))]
    pub user_status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub user_status_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub post_analysis_at: Option<Option<DateTime<Utc>>>,
}

impl UpdateSessionRequest {
    pub fn apply(self, session: &mut Session) {
        if let Some(session_id) = self.session_id {
            session.session_id = session_id;
        }
        if let Some(username) = self.username {
            session.username = username;
        }
        if let Some(text) = self.text {
            session.text = text;
        }
        if let Some(session_type) = self.session_type {
            session.session_type = session_type;
        }
        if let Some(date) = self.date {
            session.date = date;
        }
        if let Some(user_status) = self.user_status {
            session.user_status = user_status;
        }
        if let Some(user_status_date) = self.user_status_date {
            session.user_status_date = user_status_date;
        }
        if let Some(post_analysis_at) = self.post_analysis_at {
            session.post_analysis_at = post_analysis_at;
        }
    }
}

/// A session with its images inlined.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: Session,
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ClearHistoryResponse {
    pub status: String,
    pub deleted: u64,
}

/// Partial update of an image's metadata. The file itself is immutable;
/// upload a new image to replace it.
#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateImageRequest {
    /// Move the image to another of the caller's sessions.
    pub session: Option<i64>,
    #[validate(length(min = 1, max = 255))]
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub image_id: Option<String>,
}

impl UpdateImageRequest {
    pub fn apply(self, image: &mut Image) {
        if let Some(session) = self.session {
            image.session_id = session;
        }
        if let Some(user_id) = self.user_id {
            image.user_id = user_id;
        }
        if let Some(image_id) = self.image_id {
            image.image_id = image_id;
        }
    }
}

/// Multipart form for `POST /api/images/`.
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    pub session: i64,
    /// Defaults to a random UUID.
    pub image_id: Option<String>,
    /// Defaults to the caller's id.
    pub user_id: Option<String>,
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_defaults() {
        let req: CreateSessionRequest =
            serde_json::from_value(serde_json::json!({"session_id": "chat-1", "type": "chat"}))
                .unwrap();
        req.validate().unwrap();
        let session = req.into_session(7, "alice");
        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "alice");
        assert_eq!(session.session_type, "chat");
        assert_eq!(session.total_cnt, 0);
        assert!(session.post_analysis_at.is_none());
    }

    #[test]
    fn test_session_id_must_be_slug() {
        let req: CreateSessionRequest =
            serde_json::from_value(serde_json::json!({"session_id": "bad id!"})).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("session_id"));
    }

    #[test]
    fn test_update_can_clear_analysis_time() {
        let mut session = CreateSessionRequest {
            session_id: "s".into(),
            username: None,
            text: String::new(),
            session_type: String::new(),
            date: None,
            user_status: String::new(),
            user_status_date: None,
        }
        .into_session(1, "u");
        session.post_analysis_at = Some(Utc::now());

        let req: UpdateSessionRequest =
            serde_json::from_value(serde_json::json!({"post_analysis_at": null, "text": "hi"}))
                .unwrap();
        req.apply(&mut session);
        assert!(session.post_analysis_at.is_none());
        assert_eq!(session.text, "hi");
    }

    #[test]
    fn test_session_response_flattens() {
        let session = CreateSessionRequest {
            session_id: "s1".into(),
            username: Some("bob".into()),
            text: String::new(),
            session_type: "chat".into(),
            date: None,
            user_status: String::new(),
            user_status_date: None,
        }
        .into_session(1, "bob");
        let value = serde_json::to_value(SessionResponse {
            session,
            images: vec![],
        })
        .unwrap();
        assert_eq!(value["session_id"], "s1");
        assert_eq!(value["type"], "chat");
        assert_eq!(value["images"], serde_json::json!([]));
    }
}
