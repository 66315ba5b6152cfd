use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
}

/// OCR recognition quality drops sharply below this resolution for typical
/// phone-camera receipt photos, so smaller images are scaled up to it.
pub const MIN_LONG_EDGE: u32 = 1800;

const DENOISE_RANGE_SIGMA: f32 = 30.0;
const CONTRAST_FACTOR: f32 = 1.8;
const SHARPNESS_FACTOR: f32 = 2.0;
const BRIGHTNESS_FACTOR: f32 = 1.1;

/// Decode raw bytes (JPEG / PNG / WEBP / …) and normalize for OCR.
/// Decoding is the only fallible step; the transform itself cannot fail.
pub fn normalize_bytes(data: &[u8]) -> Result<RgbImage, PreprocessError> {
    let img = image::load_from_memory(data)?;
    Ok(normalize(img))
}

/// Fixed-order normalization: force three-channel RGB, upscale small images,
/// denoise, then boost contrast, sharpness, and brightness in that order.
/// Contrast first compensates for washed-out receipt paper, sharpening
/// restores text edges softened by denoising, brightness nudges mid-tones up.
pub fn normalize(img: DynamicImage) -> RgbImage {
    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return rgb;
    }
    let rgb = upscale_for_ocr(rgb);
    let rgb = denoise(&rgb);
    let rgb = enhance_contrast(&rgb, CONTRAST_FACTOR);
    let rgb = enhance_sharpness(&rgb, SHARPNESS_FACTOR);
    enhance_brightness(&rgb, BRIGHTNESS_FACTOR)
}

/// Scale uniformly so the longer edge equals [`MIN_LONG_EDGE`] whenever
/// either dimension is below it. Images already at or above the floor on
/// both edges pass through untouched, so the transform is idempotent.
fn upscale_for_ocr(img: RgbImage) -> RgbImage {
    let (w, h) = (img.width(), img.height());
    if w.min(h) >= MIN_LONG_EDGE {
        return img;
    }
    let scale = MIN_LONG_EDGE as f32 / w.max(h) as f32;
    let new_w = ((w as f32 * scale) as u32).max(1);
    let new_h = ((h as f32 * scale) as u32).max(1);
    if (new_w, new_h) == (w, h) {
        return img;
    }
    image::imageops::resize(&img, new_w, new_h, FilterType::CatmullRom)
}

/// Color-preserving denoise: a 3x3 bilateral pass where each neighbor is
/// weighted by color similarity alone. Flat regions average out photographic
/// noise while text edges (large color distance) contribute near-zero weight.
fn denoise(img: &RgbImage) -> RgbImage {
    // Range weights indexed by Manhattan color distance (0..=765).
    let sigma_sq_2 = 2.0 * DENOISE_RANGE_SIGMA * DENOISE_RANGE_SIGMA;
    let mut lut = [0.0f32; 766];
    for (d, w) in lut.iter_mut().enumerate() {
        *w = (-((d * d) as f32) / sigma_sq_2).exp();
    }

    let (w, h) = (img.width(), img.height());
    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let center = img.get_pixel(x, y).0;
            let mut sum = [0.0f32; 3];
            let mut weight_sum = 0.0f32;
            for ny in y.saturating_sub(1)..(y + 2).min(h) {
                for nx in x.saturating_sub(1)..(x + 2).min(w) {
                    let p = img.get_pixel(nx, ny).0;
                    let dist = p[0].abs_diff(center[0]) as usize
                        + p[1].abs_diff(center[1]) as usize
                        + p[2].abs_diff(center[2]) as usize;
                    let weight = lut[dist];
                    sum[0] += p[0] as f32 * weight;
                    sum[1] += p[1] as f32 * weight;
                    sum[2] += p[2] as f32 * weight;
                    weight_sum += weight;
                }
            }
            out.put_pixel(
                x,
                y,
                Rgb([
                    (sum[0] / weight_sum).round() as u8,
                    (sum[1] / weight_sum).round() as u8,
                    (sum[2] / weight_sum).round() as u8,
                ]),
            );
        }
    }
    out
}

/// Linear interpolation away from a degenerate image: factor 1.0 is identity,
/// above 1.0 extrapolates. Same model as PIL's ImageEnhance family.
fn enhance_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    // Degenerate image for contrast is solid gray at the mean luminance.
    let mean = mean_luma(img);
    map_channels(img, |v| mean + (v - mean) * factor)
}

fn enhance_sharpness(img: &RgbImage, factor: f32) -> RgbImage {
    // Degenerate image is a 3x3 smoothing (PIL's SMOOTH kernel).
    #[rustfmt::skip]
    let kernel = [
        1.0 / 13.0, 1.0 / 13.0, 1.0 / 13.0,
        1.0 / 13.0, 5.0 / 13.0, 1.0 / 13.0,
        1.0 / 13.0, 1.0 / 13.0, 1.0 / 13.0,
    ];
    let smooth: RgbImage = image::imageops::filter3x3(img, &kernel);
    let (w, h) = (img.width(), img.height());
    let mut out = RgbImage::new(w, h);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let orig = img.get_pixel(x, y).0;
        let base = smooth.get_pixel(x, y).0;
        for c in 0..3 {
            let v = base[c] as f32 + (orig[c] as f32 - base[c] as f32) * factor;
            px.0[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn enhance_brightness(img: &RgbImage, factor: f32) -> RgbImage {
    map_channels(img, |v| v * factor)
}

fn map_channels(img: &RgbImage, f: impl Fn(f32) -> f32) -> RgbImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        for c in 0..3 {
            px.0[c] = f(px.0[c] as f32).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Mean ITU-R BT.601 luminance over the whole image.
fn mean_luma(img: &RgbImage) -> f32 {
    let count = (img.width() as u64 * img.height() as u64).max(1);
    let sum: f64 = img
        .pixels()
        .map(|p| {
            0.299 * p.0[0] as f64 + 0.587 * p.0[1] as f64 + 0.114 * p.0[2] as f64
        })
        .sum();
    (sum / count as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn solid_rgb(w: u32, h: u32, v: u8) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([v, v, v]))
    }

    #[test]
    fn normalize_forces_three_channels() {
        let rgba = ImageBuffer::from_pixel(40, 30, Rgba([120u8, 130, 140, 200]));
        let result = normalize(DynamicImage::ImageRgba8(rgba));
        // Output type is RgbImage; only dimensions need checking.
        assert_eq!(result.width(), MIN_LONG_EDGE);
        assert_eq!(result.height(), 1350);
    }

    #[test]
    fn small_image_upscaled_to_long_edge_floor() {
        let result = upscale_for_ocr(solid_rgb(400, 300, 128));
        assert_eq!(result.width(), MIN_LONG_EDGE);
        assert_eq!(result.height(), 1350);
    }

    #[test]
    fn large_image_not_rescaled() {
        let result = upscale_for_ocr(solid_rgb(2000, 1900, 128));
        assert_eq!((result.width(), result.height()), (2000, 1900));
    }

    #[test]
    fn mixed_dimensions_scale_by_longer_edge() {
        // One edge above the floor still triggers scaling when the other is
        // below it; the longer edge lands exactly on the floor.
        let result = upscale_for_ocr(solid_rgb(2000, 500, 128));
        assert_eq!((result.width(), result.height()), (1800, 450));
    }

    #[test]
    fn upscale_is_idempotent() {
        let once = upscale_for_ocr(solid_rgb(200, 150, 90));
        let (w1, h1) = (once.width(), once.height());
        let twice = upscale_for_ocr(once);
        assert_eq!((twice.width(), twice.height()), (w1, h1));
    }

    #[test]
    fn normalize_twice_keeps_dimensions() {
        let first = normalize(DynamicImage::ImageRgb8(solid_rgb(150, 100, 128)));
        let (w, h) = (first.width(), first.height());
        let second = normalize(DynamicImage::ImageRgb8(first));
        assert!(second.width() >= w && second.height() >= h);
        assert_eq!((second.width(), second.height()), (w, h));
    }

    #[test]
    fn zero_sized_image_passes_through() {
        let empty = RgbImage::new(0, 0);
        let result = normalize(DynamicImage::ImageRgb8(empty));
        assert_eq!((result.width(), result.height()), (0, 0));
    }

    #[test]
    fn denoise_preserves_uniform_image() {
        let img = solid_rgb(20, 20, 130);
        let out = denoise(&img);
        assert!(out.pixels().all(|p| p.0 == [130, 130, 130]));
    }

    #[test]
    fn denoise_smooths_isolated_speck() {
        let mut img = solid_rgb(9, 9, 200);
        img.put_pixel(4, 4, Rgb([180, 180, 180]));
        let out = denoise(&img);
        let center = out.get_pixel(4, 4).0[0];
        assert!(center > 180, "speck should be pulled toward neighbors, got {center}");
    }

    #[test]
    fn denoise_keeps_hard_text_edge() {
        // Black-on-white edge: color distance is far outside the range sigma,
        // so neighbors across the edge contribute nothing.
        let mut img = solid_rgb(10, 10, 255);
        for y in 0..10 {
            for x in 0..5 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let out = denoise(&img);
        assert_eq!(out.get_pixel(2, 5).0[0], 0);
        assert_eq!(out.get_pixel(7, 5).0[0], 255);
    }

    #[test]
    fn contrast_widens_value_spread() {
        let mut img = solid_rgb(4, 2, 100);
        for x in 0..4 {
            img.put_pixel(x, 1, Rgb([150, 150, 150]));
        }
        let out = enhance_contrast(&img, CONTRAST_FACTOR);
        let low = out.get_pixel(0, 0).0[0];
        let high = out.get_pixel(0, 1).0[0];
        assert!(high - low > 50, "spread should grow: {low}..{high}");
    }

    #[test]
    fn contrast_is_identity_on_uniform_image() {
        let img = solid_rgb(6, 6, 117);
        let out = enhance_contrast(&img, CONTRAST_FACTOR);
        assert!(out.pixels().all(|p| p.0 == [117, 117, 117]));
    }

    #[test]
    fn brightness_scales_and_clamps() {
        let mut img = solid_rgb(2, 1, 100);
        img.put_pixel(1, 0, Rgb([250, 250, 250]));
        let out = enhance_brightness(&img, BRIGHTNESS_FACTOR);
        assert_eq!(out.get_pixel(0, 0).0[0], 110);
        assert_eq!(out.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn normalize_bytes_decodes_png() {
        let img = DynamicImage::ImageRgb8(solid_rgb(64, 48, 180));
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let result = normalize_bytes(&png).unwrap();
        assert_eq!(result.width(), MIN_LONG_EDGE);
    }

    #[test]
    fn normalize_bytes_rejects_garbage() {
        assert!(normalize_bytes(&[0xde, 0xad, 0xbe, 0xef]).is_err());
    }
}
