//! Events, behavioral patterns and VIA pipeline events.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use super::common::double_option;
use crate::error::{Result, SarnetError};
use crate::models::{Event, Pattern, ViaEvent};

const CONFIDENCE_MESSAGE: &str = "Confidence score must be between 0.0 and 1.0";

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateEventRequest {
    /// Optional link to one of the caller's sessions.
    pub chat_session: Option<i64>,
    #[validate(length(min = 1, max = 255))]
    pub event_id: String,
    #[validate(length(min = 1, max = 100))]
    pub event_type: String,
    /// Defaults to now.
    #[schema(value_type = Option<String>)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CreateEventRequest {
    pub fn into_event(self, user_id: i64) -> Event {
        let now = Utc::now();
        Event {
            id: 0,
            user_id: Some(user_id),
            chat_session_id: self.chat_session,
            event_id: self.event_id,
            event_type: self.event_type,
            timestamp: self.timestamp.unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateEventRequest {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub chat_session: Option<Option<i64>>,
    #[validate(length(min = 1, max = 255))]
    pub event_id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub event_type: Option<String>,
    #[schema(value_type = Option<String>)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl UpdateEventRequest {
    pub fn apply(self, event: &mut Event) {
        if let Some(chat_session) = self.chat_session {
            event.chat_session_id = chat_session;
        }
        if let Some(event_id) = self.event_id {
            event.event_id = event_id;
        }
        if let Some(event_type) = self.event_type {
            event.event_type = event_type;
        }
        if let Some(timestamp) = self.timestamp {
            event.timestamp = timestamp;
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreatePatternRequest {
    #[validate(length(min = 1, max = 255))]
    pub pattern_id: String,
    #[validate(length(min = 1, max = 255))]
    pub pattern_name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.0, max = 1.0, message = "Confidence score must be between 0.0 and 1.0"))]
    pub confidence: f64,
}

impl CreatePatternRequest {
    pub fn into_pattern(self, user_id: i64) -> Pattern {
        let now = Utc::now();
        Pattern {
            id: 0,
            user_id,
            pattern_id: self.pattern_id,
            pattern_name: self.pattern_name,
            description: self.description,
            confidence: self.confidence,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdatePatternRequest {
    #[validate(length(min = 1, max = 255))]
    pub pattern_id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub pattern_name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, max = 1.0, message = "Confidence score must be between 0.0 and 1.0"))]
    pub confidence: Option<f64>,
}

impl UpdatePatternRequest {
    pub fn apply(self, pattern: &mut Pattern) {
        if let Some(pattern_id) = self.pattern_id {
            pattern.pattern_id = pattern_id;
        }
        if let Some(pattern_name) = self.pattern_name {
            pattern.pattern_name = pattern_name;
        }
        if let Some(description) = self.description {
            pattern.description = description;
        }
        if let Some(confidence) = self.confidence {
            pattern.confidence = confidence;
        }
    }
}

/// Query for `GET /api/patterns/high_confidence/`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThresholdQuery {
    /// Exclusive lower bound in [0, 1]. Defaults to 0.8.
    pub threshold: Option<String>,
}

impl ThresholdQuery {
    pub fn resolve(&self) -> Result<f64> {
        let Some(raw) = self.threshold.as_deref().map(str::trim) else {
            return Ok(Pattern::HIGH_CONFIDENCE_THRESHOLD);
        };
        let value: f64 = raw
            .parse()
            .map_err(|_| SarnetError::Validation(format!("Invalid threshold: {raw}")))?;
        if !(0.0..=1.0).contains(&value) {
            return Err(SarnetError::Validation(CONFIDENCE_MESSAGE.to_string()));
        }
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// VIA events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateViaEventRequest {
    #[validate(length(min = 1, max = 255))]
    pub event_id: String,
    #[validate(length(min = 1, max = 255))]
    pub via_id: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub image: String,
    #[validate(length(min = 1, max = 50))]
    pub stage_status: String,
    #[serde(default = "empty_object")]
    #[schema(value_type = Object)]
    pub stage_data: Value,
    #[serde(default)]
    pub message: String,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl CreateViaEventRequest {
    pub fn into_via_event(self, user_id: i64) -> ViaEvent {
        let now = Utc::now();
        ViaEvent {
            id: 0,
            user_id,
            event_id: self.event_id,
            via_id: self.via_id,
            image: self.image,
            stage_status: self.stage_status,
            stage_data: self.stage_data,
            message: self.message,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateViaEventRequest {
    #[validate(length(min = 1, max = 255))]
    pub event_id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub via_id: Option<String>,
    #[validate(length(max = 255))]
    pub image: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub stage_status: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub stage_data: Option<Value>,
    pub message: Option<String>,
}

impl UpdateViaEventRequest {
    pub fn apply(self, event: &mut ViaEvent) {
        if let Some(event_id) = self.event_id {
            event.event_id = event_id;
        }
        if let Some(via_id) = self.via_id {
            event.via_id = via_id;
        }
        if let Some(image) = self.image {
            event.image = image;
        }
        if let Some(stage_status) = self.stage_status {
            event.stage_status = stage_status;
        }
        if let Some(stage_data) = self.stage_data {
            event.stage_data = stage_data;
        }
        if let Some(message) = self.message {
            event.message = message;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_bounds() {
        let mut req = CreatePatternRequest {
            pattern_id: "p1".into(),
            pattern_name: "night owl".into(),
            description: String::new(),
            confidence: 1.0,
        };
        assert!(req.validate().is_ok());

        req.confidence = 1.01;
        let errors = req.validate().unwrap_err();
        let messages = &errors.field_errors()["confidence"];
        assert_eq!(
            messages[0].message.as_deref(),
            Some("Confidence score must be between 0.0 and 1.0")
        );

        let update = UpdatePatternRequest {
            confidence: Some(-0.1),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_threshold_query() {
        assert_eq!(ThresholdQuery::default().resolve().unwrap(), 0.8);

        let q = ThresholdQuery {
            threshold: Some("0.5".into()),
        };
        assert_eq!(q.resolve().unwrap(), 0.5);

        for bad in ["abc", "1.5", "-0.2"] {
            let q = ThresholdQuery {
                threshold: Some(bad.into()),
            };
            assert!(matches!(q.resolve(), Err(SarnetError::Validation(_))));
        }
    }

    #[test]
    fn test_event_update_unlinks_session() {
        let mut event = CreateEventRequest {
            chat_session: Some(4),
            event_id: "e1".into(),
            event_type: "click".into(),
            timestamp: None,
        }
        .into_event(2);
        assert_eq!(event.user_id, Some(2));

        let req: UpdateEventRequest =
            serde_json::from_value(serde_json::json!({"chat_session": null})).unwrap();
        req.apply(&mut event);
        assert!(event.chat_session_id.is_none());
    }

    #[test]
    fn test_via_event_stage_data_defaults_to_object() {
        let req: CreateViaEventRequest = serde_json::from_value(serde_json::json!({
            "event_id": "e",
            "via_id": "v",
            "stage_status": "started",
        }))
        .unwrap();
        assert_eq!(req.stage_data, serde_json::json!({}));
    }
}
