//! SAR Colorization Module
//!
//! Wraps a pretrained pix2pix-style U-Net generator that maps single-channel
//! SAR images to pseudo-color RGB.
//!
//! # Architecture
//!
//! - `model`: the generator network, written against burn's `Backend` so it
//!   can be tested with random weights on any backend
//! - `preprocessing`: decoding, resizing and normalization on the way in,
//!   denormalization and PNG/base64 encoding on the way out
//! - `provider`: `ColorizerProvider`, which owns the checkpoint path, builds
//!   the model once per process and runs inference on the blocking pool
//!
//! # Usage
//!
//! ```rust,ignore
//! let colorizer = ColorizerProvider::new(&config.colorizer);
//! let png_base64 = colorizer.colorize(image_bytes).await?;
//! ```

mod model;
mod preprocessing;
mod provider;

pub use model::{
    DownsamplingBlock, UnetDecoder, UnetEncoder, UnetGenerator, UnetGeneratorConfig,
    UpsamplingBlock,
};
pub use preprocessing::{decode_grayscale, to_input_tensor, to_png_base64};
pub use provider::ColorizerProvider;
