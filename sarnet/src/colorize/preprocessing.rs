use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, GrayImage, ImageFormat, ImageReader, Luma, RgbImage};

use crate::error::{Result, SarnetError};

/// Decode any format the `image` crate recognizes and reduce it to luma
/// with ITU-R 601-2 weights, the conversion the checkpoints were trained on.
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayImage> {
    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| SarnetError::Colorize(format!("Failed to read image: {e}")))?;

    let img = reader
        .decode()
        .map_err(|e| SarnetError::Colorize(format!("Failed to decode image: {e}")))?;

    let rgb = img.to_rgb8();
    Ok(GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma_601(r, g, b)])
    }))
}

/// `L = 0.299 R + 0.587 G + 0.114 B` in 16.16 fixed point, rounded.
fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    let l = u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000;
    (l >> 16) as u8
}

/// Resize to `size`×`size` (aspect ratio ignored) and normalize to [-1, 1].
///
/// The returned buffer is laid out as `[1, 1, size, size]`.
pub fn to_input_tensor(gray: &GrayImage, size: u32) -> Vec<f32> {
    let resized = image::imageops::resize(gray, size, size, FilterType::Triangle);
    resized
        .as_raw()
        .iter()
        .map(|&v| (v as f32 / 255.0 - 0.5) / 0.5)
        .collect()
}

/// Encode a planar `[1, 3, size, size]` generator output in [-1, 1] as a
/// base64 RGB PNG.
pub fn to_png_base64(output: &[f32], size: u32) -> Result<String> {
    let plane = (size as usize) * (size as usize);
    if output.len() != plane * 3 {
        return Err(SarnetError::Colorize(format!(
            "Unexpected generator output length {} for {size}x{size} RGB",
            output.len()
        )));
    }

    let to_u8 = |x: f32| ((x * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0) as u8;
    let mut pixels = Vec::with_capacity(plane * 3);
    for i in 0..plane {
        pixels.push(to_u8(output[i]));
        pixels.push(to_u8(output[plane + i]));
        pixels.push(to_u8(output[2 * plane + i]));
    }

    let img = RgbImage::from_raw(size, size, pixels).ok_or_else(|| {
        SarnetError::Colorize("Generator output does not fit the image buffer".to_string())
    })?;

    let mut png = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| SarnetError::Colorize(format!("Failed to encode image: {e}")))?;

    Ok(STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb};

    fn encode(img: image::DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), format)
            .unwrap();
        buf
    }

    #[test]
    fn test_decode_any_format_to_luma() {
        let rgb = RgbImage::from_pixel(31, 17, Rgb([200, 10, 10]));
        for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Bmp] {
            let bytes = encode(image::DynamicImage::ImageRgb8(rgb.clone()), format);
            let gray = decode_grayscale(&bytes).unwrap();
            assert_eq!(gray.dimensions(), (31, 17));
        }
    }

    #[test]
    fn test_luma_uses_601_weights() {
        let rgb = RgbImage::from_pixel(2, 2, Rgb([200, 10, 10]));
        let bytes = encode(image::DynamicImage::ImageRgb8(rgb), ImageFormat::Png);
        let gray = decode_grayscale(&bytes).unwrap();
        // Rec. 709 weights would give 50 here.
        assert_eq!(gray.get_pixel(0, 0), &Luma([67]));

        assert_eq!(luma_601(255, 255, 255), 255);
        assert_eq!(luma_601(0, 0, 0), 0);
        assert_eq!(luma_601(0, 0, 255), 29);
    }

    #[test]
    fn test_gray_input_is_unchanged() {
        let gray = GrayImage::from_fn(16, 1, |x, _| Luma([(x * 16) as u8]));
        let bytes = encode(image::DynamicImage::ImageLuma8(gray.clone()), ImageFormat::Png);
        assert_eq!(decode_grayscale(&bytes).unwrap(), gray);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_grayscale(b"definitely not an image").unwrap_err();
        assert!(matches!(err, SarnetError::Colorize(_)));
    }

    #[test]
    fn test_input_tensor_normalization() {
        let tensor = to_input_tensor(&GrayImage::from_pixel(4, 4, Luma([255])), 8);
        assert_eq!(tensor.len(), 64);
        assert!(tensor.iter().all(|&v| (v - 1.0).abs() < 1e-6));

        let tensor = to_input_tensor(&GrayImage::from_pixel(3, 9, Luma([0])), 4);
        assert!(tensor.iter().all(|&v| (v + 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_png_output_is_rgb_square() {
        let size = 256;
        let plane = (size * size) as usize;
        let mut output = vec![-1.0f32; plane];
        output.extend(vec![0.0f32; plane]);
        output.extend(vec![2.0f32; plane]);

        let encoded = to_png_base64(&output, size).unwrap();
        let png = STANDARD.decode(encoded).unwrap();
        let img = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();

        assert_eq!(img.dimensions(), (256, 256));
        assert_eq!(img.color(), image::ColorType::Rgb8);
        // 0.0 maps to 0.5 and truncates to 127; out-of-range values clamp.
        assert_eq!(img.to_rgb8().get_pixel(10, 10), &Rgb([0, 127, 255]));
    }

    #[test]
    fn test_png_rejects_wrong_length() {
        assert!(to_png_base64(&[0.0; 10], 4).is_err());
    }
}
