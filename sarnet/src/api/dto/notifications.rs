use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::models::Notification;

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateNotificationRequest {
    #[validate(length(min = 1, max = 100))]
    pub notification_type: String,
    #[validate(length(min = 1, max = 50))]
    pub notification_channel: String,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
}

impl CreateNotificationRequest {
    pub fn into_notification(self, user_id: i64) -> Notification {
        let now = Utc::now();
        Notification {
            id: 0,
            user_id,
            notification_type: self.notification_type,
            notification_channel: self.notification_channel,
            title: self.title,
            message: self.message,
            is_read: self.is_read,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateNotificationRequest {
    #[validate(length(min = 1, max = 100))]
    pub notification_type: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub notification_channel: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub message: Option<String>,
    pub is_read: Option<bool>,
}

impl UpdateNotificationRequest {
    pub fn apply(self, notification: &mut Notification) {
        if let Some(notification_type) = self.notification_type {
            notification.notification_type = notification_type;
        }
        if let Some(channel) = self.notification_channel {
            notification.notification_channel = channel;
        }
        if let Some(title) = self.title {
            notification.title = title;
        }
        if let Some(message) = self.message {
            notification.message = message;
        }
        if let Some(is_read) = self.is_read {
            notification.is_read = is_read;
        }
    }
}
