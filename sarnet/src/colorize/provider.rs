use std::path::{Path, PathBuf};
use std::sync::Arc;

use burn::backend::ndarray::{NdArray, NdArrayDevice};
use burn::prelude::*;
use burn::record::{CompactRecorder, FullPrecisionSettings, Recorder};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use crate::config::ColorizerConfig;
use crate::error::{Result, SarnetError};

use super::model::{UnetGenerator, UnetGeneratorConfig, UnetGeneratorRecord};
use super::preprocessing::{decode_grayscale, to_input_tensor, to_png_base64};

type InferBackend = NdArray;

/// Top-level key of the generator weights inside a training checkpoint.
const STATE_DICT_KEY: &str = "generator_state_dict";

/// The generator halves its input eight times.
const SIZE_MULTIPLE: u32 = 256;

type SharedModel = Arc<Mutex<UnetGenerator<InferBackend>>>;

struct LocalColorizer {
    checkpoint: PathBuf,
    image_size: u32,
    model: OnceCell<SharedModel>,
}

impl LocalColorizer {
    /// Build the model on first use. Concurrent callers wait on the same load.
    async fn model(&self) -> Result<SharedModel> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let path = self.checkpoint.clone();
                let started = std::time::Instant::now();
                let generator = tokio::task::spawn_blocking(move || load_generator(&path))
                    .await
                    .map_err(|e| SarnetError::Internal(format!("Model load task failed: {e}")))??;
                info!(
                    checkpoint = %self.checkpoint.display(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Colorization model loaded"
                );
                Ok::<_, SarnetError>(Arc::new(Mutex::new(generator)))
            })
            .await?;
        Ok(Arc::clone(model))
    }
}

enum ColorizerBackend {
    Local(Arc<LocalColorizer>),
    Unavailable { reason: String },
}

/// Lazily loaded U-Net generator that turns SAR images into color PNGs.
#[derive(Clone)]
pub struct ColorizerProvider {
    backend: Arc<ColorizerBackend>,
    checkpoint: PathBuf,
}

impl ColorizerProvider {
    /// Never fails: a missing checkpoint or unusable size leaves the provider
    /// unavailable and `/api/predict/` answers 503.
    pub fn new(config: &ColorizerConfig) -> Self {
        let backend = if config.image_size == 0 || config.image_size % SIZE_MULTIPLE != 0 {
            let reason = format!(
                "Colorizer image size {} is not a positive multiple of {SIZE_MULTIPLE}",
                config.image_size
            );
            warn!("{}", reason);
            ColorizerBackend::Unavailable { reason }
        } else if !config.checkpoint_path.is_file() {
            let reason = format!(
                "Colorizer checkpoint not found at {}",
                config.checkpoint_path.display()
            );
            warn!("{}", reason);
            ColorizerBackend::Unavailable { reason }
        } else {
            info!(checkpoint = %config.checkpoint_path.display(), "Colorizer checkpoint found");
            ColorizerBackend::Local(Arc::new(LocalColorizer {
                checkpoint: config.checkpoint_path.clone(),
                image_size: config.image_size,
                model: OnceCell::new(),
            }))
        };

        Self {
            backend: Arc::new(backend),
            checkpoint: config.checkpoint_path.clone(),
        }
    }

    /// Wrap an already built generator, e.g. one with random weights.
    pub fn from_model(model: UnetGenerator<InferBackend>, image_size: u32) -> Self {
        let local = LocalColorizer {
            checkpoint: PathBuf::new(),
            image_size,
            model: OnceCell::new_with(Some(Arc::new(Mutex::new(model)))),
        };
        Self {
            backend: Arc::new(ColorizerBackend::Local(Arc::new(local))),
            checkpoint: PathBuf::new(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: Arc::new(ColorizerBackend::Unavailable {
                reason: reason.into(),
            }),
            checkpoint: PathBuf::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(*self.backend, ColorizerBackend::Unavailable { .. })
    }

    pub fn is_loaded(&self) -> bool {
        match &*self.backend {
            ColorizerBackend::Local(local) => local.model.initialized(),
            ColorizerBackend::Unavailable { .. } => false,
        }
    }

    pub fn checkpoint(&self) -> &Path {
        &self.checkpoint
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &*self.backend {
            ColorizerBackend::Unavailable { reason } => Some(reason),
            ColorizerBackend::Local(_) => None,
        }
    }

    /// Load the model now instead of on the first request.
    pub async fn preload(&self) -> Result<()> {
        self.local()?.model().await.map(|_| ())
    }

    /// Colorize one encoded image, returning a base64 PNG.
    pub async fn colorize(&self, image_bytes: Vec<u8>) -> Result<String> {
        let local = self.local()?;
        let model = local.model().await?;
        let size = local.image_size;

        tokio::task::spawn_blocking(move || {
            let model = model.blocking_lock();
            run_inference(&*model, &image_bytes, size, &NdArrayDevice::default())
        })
        .await
        .map_err(|e| SarnetError::Internal(format!("Colorize task failed: {e}")))?
    }

    fn local(&self) -> Result<Arc<LocalColorizer>> {
        match &*self.backend {
            ColorizerBackend::Local(local) => Ok(Arc::clone(local)),
            ColorizerBackend::Unavailable { reason } => {
                Err(SarnetError::ColorizerUnavailable(reason.clone()))
            }
        }
    }
}

fn run_inference<B: Backend>(
    model: &UnetGenerator<B>,
    image_bytes: &[u8],
    size: u32,
    device: &B::Device,
) -> Result<String> {
    let gray = decode_grayscale(image_bytes)?;
    let input = to_input_tensor(&gray, size);
    let side = size as usize;

    let x = Tensor::<B, 4>::from_data(TensorData::new(input, [1, 1, side, side]), device);
    let y = model.forward(x);
    let values = y
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| SarnetError::Colorize(format!("Failed to read generator output: {e:?}")))?;

    to_png_base64(&values, size)
}

/// Build the generator and load weights from a PyTorch state dict
/// (`.pth`/`.pt`) or a burn record (anything else).
fn load_generator(path: &Path) -> Result<UnetGenerator<InferBackend>> {
    let device = NdArrayDevice::default();
    let model = UnetGeneratorConfig::new().init::<InferBackend>(&device);
    let load_err = |e: burn::record::RecorderError| {
        SarnetError::Colorize(format!(
            "Failed to load checkpoint {}: {e}",
            path.display()
        ))
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "pth" | "pt" => {
            let args = LoadArgs::new(path.to_path_buf())
                .with_top_level_key(STATE_DICT_KEY)
                // `encoder.enc1.conv_block.conv.weight` -> `encoder.enc1.conv.weight`
                .with_key_remap(r"\.conv_block\.", ".")
                .with_key_remap(r"^final\.0\.(.+)$", "final_conv.$1");
            let record: UnetGeneratorRecord<InferBackend> =
                PyTorchFileRecorder::<FullPrecisionSettings>::default()
                    .load(args, &device)
                    .map_err(load_err)?;
            Ok(model.load_record(record))
        }
        _ => model
            .load_file(path.to_path_buf(), &CompactRecorder::new(), &device)
            .map_err(load_err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use image::GenericImageView;

    fn tiny_provider() -> ColorizerProvider {
        let model = UnetGeneratorConfig::new()
            .with_base_channels(2)
            .init::<InferBackend>(&NdArrayDevice::default());
        ColorizerProvider::from_model(model, 256)
    }

    fn gray_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::GrayImage::from_fn(width, height, |x, y| image::Luma([((x + y) % 256) as u8]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_missing_checkpoint_is_unavailable() {
        let provider = ColorizerProvider::new(&ColorizerConfig {
            checkpoint_path: PathBuf::from("/nonexistent/checkpoint.pth"),
            ..ColorizerConfig::default()
        });
        assert!(!provider.is_available());
        assert!(provider
            .unavailable_reason()
            .unwrap()
            .contains("checkpoint not found"));
    }

    #[test]
    fn test_bad_image_size_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.pth");
        std::fs::write(&path, b"x").unwrap();
        let provider = ColorizerProvider::new(&ColorizerConfig {
            checkpoint_path: path,
            image_size: 100,
            preload: false,
        });
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn test_unavailable_colorize_errors() {
        let provider = ColorizerProvider::unavailable("no weights");
        let err = provider.colorize(gray_png(8, 8)).await.unwrap_err();
        assert!(matches!(err, SarnetError::ColorizerUnavailable(_)));
    }

    #[tokio::test]
    async fn test_colorize_produces_square_png() {
        let provider = tiny_provider();
        assert!(provider.is_loaded());

        let encoded = provider.colorize(gray_png(300, 120)).await.unwrap();
        let png = STANDARD.decode(encoded).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!(img.dimensions(), (256, 256));
        assert_eq!(img.color(), image::ColorType::Rgb8);
    }

    #[tokio::test]
    async fn test_colorize_rejects_undecodable_input() {
        let provider = tiny_provider();
        let err = provider.colorize(b"not an image".to_vec()).await.unwrap_err();
        assert!(matches!(err, SarnetError::Colorize(_)));
    }
}
