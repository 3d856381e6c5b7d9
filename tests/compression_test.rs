//! 写真圧縮テスト
//!
//! 上限・サイズ超過・フォールバック・順次処理を検証

use fleet_checkin::compress::{Compressor, PhotoEncoder, PhotoInput};
use fleet_checkin::config::CompressionConfig;
use fleet_checkin::error::{FleetError, Result};
use fleet_checkin_common::EncodedImage;
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn settings() -> CompressionConfig {
    CompressionConfig {
        delay_ms: 0,
        ..CompressionConfig::default()
    }
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(w, h, |x, y| Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 90]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// 常に失敗するエンコーダ
struct BrokenEncoder;

impl PhotoEncoder for BrokenEncoder {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn encode(&self, _bytes: &[u8], _settings: &CompressionConfig) -> Result<EncodedImage> {
        Err(FleetError::Compression("decoder unavailable".into()))
    }
}

/// 呼び出し回数を数えるエンコーダ
#[derive(Default)]
struct CountingEncoder {
    calls: AtomicUsize,
}

impl PhotoEncoder for CountingEncoder {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn encode(&self, bytes: &[u8], _settings: &CompressionConfig) -> Result<EncodedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EncodedImage::jpeg(bytes[..4].to_vec()))
    }
}

/// 同時に実行中のエンコード数の最大値を記録するエンコーダ
#[derive(Default)]
struct ConcurrencyEncoder {
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl PhotoEncoder for ConcurrencyEncoder {
    fn name(&self) -> &'static str {
        "concurrency"
    }

    fn encode(&self, bytes: &[u8], _settings: &CompressionConfig) -> Result<EncodedImage> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(15));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(EncodedImage::jpeg(bytes[..4].to_vec()))
    }
}

fn memory_inputs(n: usize) -> Vec<PhotoInput> {
    (0..n)
        .map(|i| PhotoInput::Memory {
            name: format!("{}.png", i),
            bytes: png(4, 4),
        })
        .collect()
}

#[tokio::test]
async fn test_large_photo_is_bounded() {
    let compressor = Compressor::new(settings());
    let image = compressor.compress("grande.png", png(2400, 1200)).await.unwrap();

    assert_eq!(image.mime, "image/jpeg");
    assert!(image.len() <= settings().max_output_bytes());
    let decoded = image::load_from_memory(&image.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1024, 512));
}

#[tokio::test]
async fn test_fallback_used_when_primary_fails() {
    let fallback = Arc::new(CountingEncoder::default());
    let compressor = Compressor::with_encoders(settings(), Arc::new(BrokenEncoder), fallback.clone());

    let image = compressor.compress("a.png", png(10, 10)).await.unwrap();
    assert_eq!(image.len(), 4);
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_both_encoders_failing() {
    let compressor = Compressor::with_encoders(settings(), Arc::new(BrokenEncoder), Arc::new(BrokenEncoder));
    let err = compressor.compress("a.png", png(10, 10)).await.unwrap_err();
    assert!(matches!(err, FleetError::Compression(_)));
    assert_eq!(err.user_message(), "Erro ao processar imagem. Tente novamente.");
}

#[tokio::test]
async fn test_batch_over_limit_is_rejected() {
    let encoder = Arc::new(CountingEncoder::default());
    let compressor = Compressor::with_encoders(settings(), encoder.clone(), encoder.clone());
    let err = compressor.compress_batch(memory_inputs(3), 2, |_, _, _| {}).await.unwrap_err();
    assert!(matches!(err, FleetError::PhotoLimitExceeded { remaining: 2 }));
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_batch_skips_oversized_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let small = dir.path().join("pequena.png");
    let big = dir.path().join("enorme.jpg");
    std::fs::write(&small, png(8, 8)).unwrap();
    std::fs::write(&big, vec![0u8; 3 * 1024 * 1024]).unwrap();

    let config = CompressionConfig {
        max_input_mb: 2,
        ..settings()
    };
    let compressor = Compressor::new(config);

    let mut seen = Vec::new();
    let outcome = compressor
        .compress_batch(
            vec![PhotoInput::File(big), PhotoInput::File(small)],
            20,
            |done, total, name| seen.push((done, total, name.to_string())),
        )
        .await
        .unwrap();

    assert_eq!(outcome.images.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "enorme.jpg");
    assert!(matches!(outcome.failures[0].1, FleetError::FileTooLarge { max_mb: 2, .. }));
    assert_eq!(
        seen,
        vec![(1, 2, "enorme.jpg".to_string()), (2, 2, "pequena.png".to_string())]
    );
}

#[tokio::test]
async fn test_missing_file_reported() {
    let compressor = Compressor::new(settings());
    let outcome = compressor
        .compress_batch(vec![PhotoInput::File("/nonexistent/foto.jpg".into())], 5, |_, _, _| {})
        .await
        .unwrap();
    assert!(outcome.images.is_empty());
    assert_eq!(outcome.failures.len(), 1);
}

/// 1枚ごとに待ちを入れる（最初の1枚の前には入れない）
#[tokio::test]
async fn test_batch_waits_between_items() {
    let encoder = Arc::new(CountingEncoder::default());
    let config = CompressionConfig {
        delay_ms: 40,
        ..CompressionConfig::default()
    };
    let compressor = Compressor::with_encoders(config, encoder.clone(), encoder.clone());

    let started = Instant::now();
    let outcome = compressor.compress_batch(memory_inputs(4), 20, |_, _, _| {}).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.images.len(), 4);
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 4);
    assert!(elapsed >= Duration::from_millis(3 * 40), "elapsed {:?}", elapsed);
}

/// 複数枚でもエンコードは同時に1つだけ
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_encodes_one_at_a_time() {
    let encoder = Arc::new(ConcurrencyEncoder::default());
    let compressor = Compressor::with_encoders(settings(), encoder.clone(), encoder.clone());

    let mut order = Vec::new();
    let outcome = compressor
        .compress_batch(memory_inputs(5), 20, |done, _, name| order.push((done, name.to_string())))
        .await
        .unwrap();

    assert_eq!(outcome.images.len(), 5);
    assert_eq!(encoder.max_active.load(Ordering::SeqCst), 1);
    let names: Vec<&str> = order.iter().map(|(_, n)| n.as_str()).collect();
    assert_eq!(names, vec!["0.png", "1.png", "2.png", "3.png", "4.png"]);
}
