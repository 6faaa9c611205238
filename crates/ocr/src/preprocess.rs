use image::{DynamicImage, GrayImage, ImageBuffer};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

pub const BRIGHTNESS_FACTOR: f32 = 1.1;
pub const CONTRAST_FACTOR: f32 = 1.5;
/// Bilateral neighbourhood diameter in pixels.
pub const BILATERAL_DIAMETER: u32 = 9;
pub const BILATERAL_SIGMA_COLOR: f32 = 75.0;
pub const BILATERAL_SIGMA_SPACE: f32 = 75.0;
/// BT.601 luma weights (R, G, B).
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Load an image file and normalize it for recognition.
pub fn preprocess_file(path: &Path) -> Result<GrayImage, PreprocessError> {
    let img = image::open(path)?;
    Ok(preprocess(&img))
}

/// Decode raw image bytes (PNG / JPEG / TIFF / BMP / WEBP) and normalize them.
pub fn preprocess_bytes(data: &[u8]) -> Result<GrayImage, PreprocessError> {
    let img = image::load_from_memory(data)?;
    Ok(preprocess(&img))
}

/// Grayscale → brightness → contrast → bilateral smoothing.
///
/// Output has the input's dimensions and a single channel.
pub fn preprocess(img: &DynamicImage) -> GrayImage {
    let gray = to_gray(img);
    let gray = enhance_brightness(&gray, BRIGHTNESS_FACTOR);
    let gray = enhance_contrast(&gray, CONTRAST_FACTOR);
    bilateral_filter(
        &gray,
        BILATERAL_DIAMETER / 2,
        BILATERAL_SIGMA_COLOR,
        BILATERAL_SIGMA_SPACE,
    )
}

/// PNG-encode a normalized image for backends that take encoded bytes.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

/// BT.601 weighted sum, rounded. `image`'s own `to_luma8` uses Rec. 709.
fn to_gray(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
        let luma: f32 = rgb
            .get_pixel(x, y)
            .0
            .iter()
            .zip(LUMA_WEIGHTS)
            .map(|(&c, w)| f32::from(c) * w)
            .sum();
        image::Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Blend toward black: `p * factor`.
fn enhance_brightness(gray: &GrayImage, factor: f32) -> GrayImage {
    map_pixels(gray, |p| p * factor)
}

/// Blend toward a flat image at the rounded mean luminance.
fn enhance_contrast(gray: &GrayImage, factor: f32) -> GrayImage {
    let count = u64::from(gray.width()) * u64::from(gray.height());
    if count == 0 {
        return gray.clone();
    }
    let sum: u64 = gray.pixels().map(|p| u64::from(p[0])).sum();
    let mean = (sum as f64 / count as f64 + 0.5).floor() as f32;
    map_pixels(gray, |p| mean + factor * (p - mean))
}

/// Blend results are clamped, then truncated toward zero.
fn map_pixels(gray: &GrayImage, f: impl Fn(f32) -> f32) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p[0] = f(f32::from(p[0])).clamp(0.0, 255.0) as u8;
    }
    out
}

/// Edge-preserving smoothing over a circular window of `radius`.
///
/// Neighbours outside the image are skipped rather than mirrored.
fn bilateral_filter(gray: &GrayImage, radius: u32, sigma_color: f32, sigma_space: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let r = radius as i64;

    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let offsets: Vec<(i64, i64, f32)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= r * r)
        .map(|(dx, dy)| (dx, dy, (((dx * dx + dy * dy) as f32) * space_coeff).exp()))
        .collect();

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let color_weight: Vec<f32> = (0..256)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect();

    ImageBuffer::from_fn(w, h, |x, y| {
        let center = gray.get_pixel(x, y)[0];
        let (mut sum, mut weight_sum) = (0.0f32, 0.0f32);

        for &(dx, dy, space_w) in &offsets {
            let nx = i64::from(x) + dx;
            let ny = i64::from(y) + dy;
            if nx < 0 || ny < 0 || nx >= i64::from(w) || ny >= i64::from(h) {
                continue;
            }
            let v = gray.get_pixel(nx as u32, ny as u32)[0];
            let weight = space_w * color_weight[usize::from(center.abs_diff(v))];
            sum += f32::from(v) * weight;
            weight_sum += weight;
        }

        // The centre always contributes weight 1.0, so weight_sum > 0.
        image::Luma([(sum / weight_sum).round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn solid_gray(width: u32, height: u32, value: u8) -> GrayImage {
        ImageBuffer::from_fn(width, height, |_, _| Luma([value]))
    }

    fn split_gray(width: u32, height: u32, left: u8, right: u8) -> GrayImage {
        ImageBuffer::from_fn(width, height, |x, _| Luma([if x < width / 2 { left } else { right }]))
    }

    #[test]
    fn brightness_scales_and_clamps() {
        let img = split_gray(2, 1, 100, 250);
        let out = enhance_brightness(&img, 1.1);
        assert_eq!(out.get_pixel(0, 0)[0], 110);
        assert_eq!(out.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn brightness_truncates_fraction() {
        let out = enhance_brightness(&solid_gray(1, 1, 128), 1.1);
        // 140.8 → 140
        assert_eq!(out.get_pixel(0, 0)[0], 140);
    }

    #[test]
    fn gray_uses_bt601_weights() {
        let rgb: RgbImage = ImageBuffer::from_fn(3, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });
        let gray = to_gray(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 29);
    }

    #[test]
    fn gray_input_passes_through() {
        let gray = to_gray(&DynamicImage::ImageLuma8(split_gray(2, 1, 17, 230)));
        assert_eq!(gray.get_pixel(0, 0)[0], 17);
        assert_eq!(gray.get_pixel(1, 0)[0], 230);
    }

    #[test]
    fn contrast_spreads_around_mean() {
        let img = split_gray(2, 1, 100, 200);
        let out = enhance_contrast(&img, 1.5);
        assert_eq!(out.get_pixel(0, 0)[0], 75);
        assert_eq!(out.get_pixel(1, 0)[0], 225);
    }

    #[test]
    fn bilateral_keeps_uniform_image() {
        let img = solid_gray(12, 12, 90);
        let out = bilateral_filter(&img, 4, 75.0, 75.0);
        assert!(out.pixels().all(|p| p[0] == 90));
    }

    #[test]
    fn bilateral_preserves_hard_edges() {
        let img = split_gray(20, 10, 0, 255);
        let out = bilateral_filter(&img, 4, 75.0, 75.0);
        assert!(out.get_pixel(9, 5)[0] < 20, "left of edge: {}", out.get_pixel(9, 5)[0]);
        assert!(out.get_pixel(10, 5)[0] > 235, "right of edge: {}", out.get_pixel(10, 5)[0]);
    }

    #[test]
    fn bilateral_smooths_small_noise() {
        let mut img = solid_gray(9, 9, 120);
        img.put_pixel(4, 4, Luma([130]));
        let out = bilateral_filter(&img, 4, 75.0, 75.0);
        let v = out.get_pixel(4, 4)[0];
        assert!((120..130).contains(&v), "centre was {v}");
    }

    #[test]
    fn preprocess_keeps_dimensions_and_drops_color() {
        let rgb: RgbImage = ImageBuffer::from_fn(17, 5, |x, _| Rgb([(x * 10) as u8, 40, 200]));
        let out = preprocess(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(out.dimensions(), (17, 5));
    }

    #[test]
    fn preprocess_bytes_rejects_garbage() {
        assert!(matches!(
            preprocess_bytes(b"definitely not an image"),
            Err(PreprocessError::Load(_))
        ));
    }

    #[test]
    fn preprocess_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        solid_gray(6, 4, 128).save(&path).unwrap();
        let out = preprocess_file(&path).unwrap();
        assert_eq!(out.dimensions(), (6, 4));
        // 128 * 1.1 truncates to 140; a flat image is its own mean after that.
        assert!(out.pixels().all(|p| p[0] == 140));
    }

    #[test]
    fn encode_png_produces_png_header() {
        let bytes = encode_png(&solid_gray(4, 4, 100)).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}
