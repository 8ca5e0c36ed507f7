use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::error::{Result, SarnetError};
use crate::models::{ProcessingOutput, SourceDownload};

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateOutputRequest {
    #[validate(length(min = 1, max = 255))]
    pub output_id: String,
    #[validate(length(min = 1, max = 100))]
    pub source_format: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub storage_path: String,
    #[serde(default = "empty_object")]
    #[schema(value_type = Object)]
    pub meta_data: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl CreateOutputRequest {
    pub fn into_output(self, user_id: i64) -> ProcessingOutput {
        let now = Utc::now();
        ProcessingOutput {
            id: 0,
            user_id,
            output_id: self.output_id,
            source_format: self.source_format,
            text: self.text,
            storage_path: self.storage_path,
            meta_data: self.meta_data,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateOutputRequest {
    #[validate(length(min = 1, max = 255))]
    pub output_id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub source_format: Option<String>,
    pub text: Option<String>,
    #[validate(length(max = 500))]
    pub storage_path: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub meta_data: Option<Value>,
}

impl UpdateOutputRequest {
    pub fn apply(self, output: &mut ProcessingOutput) {
        if let Some(output_id) = self.output_id {
            output.output_id = output_id;
        }
        if let Some(source_format) = self.source_format {
            output.source_format = source_format;
        }
        if let Some(text) = self.text {
            output.text = text;
        }
        if let Some(storage_path) = self.storage_path {
            output.storage_path = storage_path;
        }
        if let Some(meta_data) = self.meta_data {
            output.meta_data = meta_data;
        }
    }
}

/// Query for `GET /api/outputs/by_format/`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FormatQuery {
    pub format: Option<String>,
}

impl FormatQuery {
    pub fn required(&self) -> Result<&str> {
        match self.format.as_deref().map(str::trim) {
            Some(format) if !format.is_empty() => Ok(format),
            _ => Err(SarnetError::Validation(
                "Format parameter required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateDownloadRequest {
    #[validate(length(min = 1, max = 255))]
    pub source_id: String,
}

impl CreateDownloadRequest {
    pub fn into_download(self, user_id: i64) -> SourceDownload {
        let now = Utc::now();
        SourceDownload {
            id: 0,
            user_id,
            source_id: self.source_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateDownloadRequest {
    #[validate(length(min = 1, max = 255))]
    pub source_id: Option<String>,
}

impl UpdateDownloadRequest {
    pub fn apply(self, download: &mut SourceDownload) {
        if let Some(source_id) = self.source_id {
            download.source_id = source_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_required() {
        assert!(FormatQuery::default().required().is_err());
        assert!(FormatQuery {
            format: Some("  ".into())
        }
        .required()
        .is_err());
        assert_eq!(
            FormatQuery {
                format: Some("pdf".into())
            }
            .required()
            .unwrap(),
            "pdf"
        );
    }

    #[test]
    fn test_output_meta_defaults_to_object() {
        let req: CreateOutputRequest = serde_json::from_value(serde_json::json!({
            "output_id": "o1",
            "source_format": "pdf",
        }))
        .unwrap();
        let output = req.into_output(1);
        assert_eq!(output.meta_data, serde_json::json!({}));
        assert_eq!(output.storage_path, "");
    }
}
