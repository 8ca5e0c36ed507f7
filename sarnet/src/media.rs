//! Uploaded files on local disk.
//!
//! Every stored file is addressed by a path relative to `MEDIA_ROOT`; that
//! relative path is what lands in the database and what `/media/` serves.
//! Existing files are never overwritten: a taken name gets a random suffix.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::config::MediaConfig;
use crate::error::{Result, SarnetError};

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    max_upload_bytes: usize,
}

impl MediaStorage {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.root.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Reject uploads that are too large or not a recognizable image.
    pub fn check_image(&self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Err(SarnetError::Validation(
                "The submitted file is empty".to_string(),
            ));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(SarnetError::Validation(format!(
                "File too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_upload_bytes
            )));
        }
        if !infer::is_image(bytes) {
            return Err(SarnetError::Validation(
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn save_avatar(&self, user_id: i64, file_name: &str, bytes: &[u8]) -> Result<String> {
        self.write_new(
            &format!("avatars/user_{user_id}"),
            &sanitize_filename(file_name),
            bytes,
        )
        .await
    }

    pub async fn save_image(
        &self,
        user_id: i64,
        image_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let name = format!(
            "{}_{}",
            sanitize_filename(image_id),
            sanitize_filename(file_name)
        );
        self.write_new(&format!("images/user_{user_id}"), &name, bytes)
            .await
    }

    /// Remove a stored file. Missing files are not an error.
    pub async fn delete(&self, relative: &str) -> Result<()> {
        let Some(path) = self.resolve(relative) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Map a media-relative path to disk, refusing anything that climbs out
    /// of the root.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let escapes = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir)
        });
        (!escapes).then(|| self.root.join(relative))
    }

    /// Create `dir/name`, or `dir/<stem>_<suffix>.<ext>` when that name is
    /// already taken. Returns the media-relative path actually written.
    async fn write_new(&self, dir: &str, name: &str, bytes: &[u8]) -> Result<String> {
        let mut relative = format!("{dir}/{name}");
        loop {
            let path = self
                .resolve(&relative)
                .ok_or_else(|| SarnetError::Validation("Invalid file name".to_string()))?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match opened {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Stored upload");
                    return Ok(relative);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    relative = format!("{dir}/{}", with_random_suffix(name));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

const SUFFIX_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

fn with_random_suffix(name: &str) -> String {
    let suffix = nanoid::nanoid!(7, &SUFFIX_ALPHABET);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{name}_{suffix}"),
    }
}

/// Keep only the final path component, with anything outside
/// `[A-Za-z0-9._-]` replaced by `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "upload".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn storage(root: &Path, max: usize) -> MediaStorage {
        MediaStorage::new(&MediaConfig {
            root: root.to_path_buf(),
            max_upload_bytes: max,
        })
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("scene 01.png"), "scene_01.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\tmp\\sar.tif"), "sar.tif");
        assert_eq!(sanitize_filename(".."), "upload");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn test_check_image() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path(), 64);

        assert!(media.check_image(PNG_MAGIC).is_ok());
        assert!(matches!(
            media.check_image(b"plain text, not an image"),
            Err(SarnetError::Validation(_))
        ));
        assert!(media.check_image(&[]).is_err());

        let mut big = PNG_MAGIC.to_vec();
        big.resize(65, 0);
        assert!(media.check_image(&big).is_err());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let media = storage(Path::new("/srv/media"), 1);
        assert_eq!(
            media.resolve("images/user_1/a.png"),
            Some(PathBuf::from("/srv/media/images/user_1/a.png"))
        );
        assert_eq!(media.resolve("../secret"), None);
        assert_eq!(media.resolve("/etc/passwd"), None);
    }

    #[tokio::test]
    async fn test_save_and_delete_image() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path(), 1024);

        let relative = media
            .save_image(7, "img-1", "my scan.png", PNG_MAGIC)
            .await
            .unwrap();
        assert_eq!(relative, "images/user_7/img-1_my_scan.png");
        assert!(dir.path().join(&relative).exists());

        media.delete(&relative).await.unwrap();
        assert!(!dir.path().join(&relative).exists());
        media.delete(&relative).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_image_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path(), 1024);

        let first = media.save_image(7, "dup", "tile.png", PNG_MAGIC).await.unwrap();
        let second = media.save_image(7, "dup", "tile.png", b"second").await.unwrap();
        assert_eq!(first, "images/user_7/dup_tile.png");
        assert_ne!(first, second);
        assert!(second.starts_with("images/user_7/dup_tile_"));
        assert!(second.ends_with(".png"));

        assert_eq!(std::fs::read(dir.path().join(&first)).unwrap(), PNG_MAGIC);
        media.delete(&second).await.unwrap();
        assert!(dir.path().join(&first).exists());
    }

    #[test]
    fn test_random_suffix_keeps_extension() {
        let name = with_random_suffix("scan.tar.gz");
        assert!(name.starts_with("scan.tar_"));
        assert!(name.ends_with(".gz"));
        assert_eq!(name.len(), "scan.tar_".len() + 7 + ".gz".len());
        assert!(with_random_suffix("noext").starts_with("noext_"));
    }

    #[tokio::test]
    async fn test_save_avatar_path() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path(), 1024);
        let relative = media.save_avatar(3, "me.png", PNG_MAGIC).await.unwrap();
        assert_eq!(relative, "avatars/user_3/me.png");
    }
}
