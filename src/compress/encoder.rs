//! 写真のエンコーダ（主経路とフォールバック）

use super::orientation;
use crate::config::CompressionConfig;
use crate::error::{FleetError, Result};
use fleet_checkin_common::{bound_dimensions, EncodedImage};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageReader, Rgb, RgbImage};
use std::io::Cursor;

/// 主経路で下げる品質の下限
const MIN_QUALITY: u8 = 30;
const QUALITY_STEP: u8 = 10;
/// 品質を下げきっても超える場合に寸法を縮める回数
const MAX_SHRINK_ROUNDS: u32 = 4;

pub trait PhotoEncoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, bytes: &[u8], settings: &CompressionConfig) -> Result<EncodedImage>;
}

/// 主経路: EXIF補正 → Lanczos縮小 → 品質を下げながらJPEG化
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaryEncoder;

impl PhotoEncoder for PrimaryEncoder {
    fn name(&self) -> &'static str {
        "primary"
    }

    fn encode(&self, bytes: &[u8], settings: &CompressionConfig) -> Result<EncodedImage> {
        let decoded = image::load_from_memory(bytes)?;
        let image = orientation::upright(decoded, bytes);

        let max_bytes = settings.max_output_bytes();
        let mut max_dimension = settings.max_dimension;

        for round in 0..=MAX_SHRINK_ROUNDS {
            let (w, h) = bound_dimensions(image.width(), image.height(), max_dimension);
            let resized = if (w, h) == (image.width(), image.height()) {
                image.to_rgb8()
            } else {
                image.resize_exact(w, h, FilterType::Lanczos3).to_rgb8()
            };

            let mut quality = settings.initial_quality.clamp(1, 100);
            loop {
                let encoded = encode_jpeg(&resized, quality)?;
                if encoded.len() <= max_bytes {
                    log::debug!(
                        "圧縮: {}x{} q={} {}KB (round {})",
                        w,
                        h,
                        quality,
                        encoded.len() / 1024,
                        round
                    );
                    return Ok(EncodedImage::jpeg(encoded));
                }
                if quality <= MIN_QUALITY {
                    break;
                }
                quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
            }

            max_dimension = ((max_dimension as f64) * 0.8) as u32;
            if max_dimension < 16 {
                break;
            }
        }

        Err(FleetError::Compression(format!(
            "não foi possível reduzir para {} KB",
            max_bytes / 1024
        )))
    }
}

/// フォールバック: 白背景のビットマップに描き直して固定品質でJPEG化
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackEncoder;

impl PhotoEncoder for FallbackEncoder {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn encode(&self, bytes: &[u8], settings: &CompressionConfig) -> Result<EncodedImage> {
        let decoded = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()?;
        let (w, h) = bound_dimensions(decoded.width(), decoded.height(), settings.max_dimension);
        let small = imageops::thumbnail(&decoded, w, h);

        let mut bitmap = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
        for (x, y, pixel) in small.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as u32;
            let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
            bitmap.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
        }

        let encoded = encode_jpeg(&bitmap, settings.fallback_quality.clamp(1, 100))?;
        if encoded.len() > settings.max_output_bytes() {
            log::warn!(
                "フォールバック出力が上限を超過: {}KB > {}KB ({}x{})",
                encoded.len() / 1024,
                settings.max_output_bytes() / 1024,
                w,
                h
            );
        }
        Ok(EncodedImage::jpeg(encoded))
    }
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder.encode_image(image)?;
    Ok(bytes)
}
