pub mod auth;
pub mod credentials;
pub mod events;
pub(crate) mod health;
pub mod images;
pub mod jobs;
pub mod notifications;
pub mod outputs;
pub mod patterns;
pub mod predict;
pub mod sessions;
pub mod settings;
pub mod users;
pub mod via_events;

pub use health::health_check;

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;
use validator::Validate;

use crate::error::{Result, SarnetError};

/// Run `validator` rules, turning failures into a 400 with per-field messages.
pub(crate) fn validated<T: Validate>(req: T) -> Result<T> {
    req.validate()?;
    Ok(req)
}

pub(crate) fn not_found(kind: &str, id: i64) -> SarnetError {
    SarnetError::NotFound(format!("{kind} {id} not found"))
}

/// An uploaded file part.
pub(crate) struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// A fully read multipart form: text fields and file parts by field name.
#[derive(Default)]
pub(crate) struct FormData {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    form.files.insert(name, UploadedFile { file_name, bytes });
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn take_file(&mut self, name: &str) -> Result<UploadedFile> {
        self.files.remove(name).ok_or_else(|| {
            SarnetError::Validation(format!("No file was submitted in the '{name}' field"))
        })
    }

    /// A trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required_text(&self, name: &str) -> Result<&str> {
        self.text(name)
            .ok_or_else(|| SarnetError::Validation(format!("Missing required field: {name}")))
    }
}
