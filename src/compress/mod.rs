//! 写真圧縮パイプライン
//!
//! - 入力サイズ上限を超えるものは圧縮前に拒否
//! - エンコードは spawn_blocking で実行（呼び出し側をブロックしない）
//! - 主経路が失敗したらフォールバック経路で再エンコード
//! - 複数枚は必ず1枚ずつ順番に処理し、間に短い待ちを入れる

mod encoder;
mod orientation;

pub use encoder::{FallbackEncoder, PhotoEncoder, PrimaryEncoder};
pub use orientation::{apply_orientation, read_orientation};

use crate::config::CompressionConfig;
use crate::error::{FleetError, Result};
use fleet_checkin_common::EncodedImage;
use std::path::PathBuf;
use std::sync::Arc;

/// 圧縮対象
#[derive(Debug, Clone)]
pub enum PhotoInput {
    File(PathBuf),
    Memory { name: String, bytes: Vec<u8> },
}

impl PhotoInput {
    pub fn name(&self) -> String {
        match self {
            PhotoInput::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            PhotoInput::Memory { name, .. } => name.clone(),
        }
    }

    /// 読み込まずにサイズを得る
    pub fn size(&self) -> Result<u64> {
        match self {
            PhotoInput::File(path) => {
                if !path.exists() {
                    return Err(FleetError::FileNotFound(path.display().to_string()));
                }
                Ok(std::fs::metadata(path)?.len())
            }
            PhotoInput::Memory { bytes, .. } => Ok(bytes.len() as u64),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            PhotoInput::File(path) => Ok(std::fs::read(path)?),
            PhotoInput::Memory { bytes, .. } => Ok(bytes),
        }
    }
}

/// バッチ処理の結果
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// 入力順
    pub images: Vec<EncodedImage>,
    /// スキップ・失敗した入力（ファイル名, 理由）
    pub failures: Vec<(String, FleetError)>,
}

#[derive(Clone)]
pub struct Compressor {
    settings: CompressionConfig,
    primary: Arc<dyn PhotoEncoder>,
    fallback: Arc<dyn PhotoEncoder>,
}

impl Compressor {
    pub fn new(settings: CompressionConfig) -> Self {
        Self::with_encoders(settings, Arc::new(PrimaryEncoder), Arc::new(FallbackEncoder))
    }

    pub fn with_encoders(
        settings: CompressionConfig,
        primary: Arc<dyn PhotoEncoder>,
        fallback: Arc<dyn PhotoEncoder>,
    ) -> Self {
        Self {
            settings,
            primary,
            fallback,
        }
    }

    pub fn settings(&self) -> &CompressionConfig {
        &self.settings
    }

    /// 入力サイズの事前チェック
    pub fn check_size(&self, name: &str, size: u64) -> Result<()> {
        if size > self.settings.max_input_bytes() {
            return Err(FleetError::FileTooLarge {
                name: name.to_string(),
                size_mb: size as f64 / (1024.0 * 1024.0),
                max_mb: self.settings.max_input_mb,
            });
        }
        Ok(())
    }

    /// 1枚を圧縮
    pub async fn compress(&self, name: &str, bytes: Vec<u8>) -> Result<EncodedImage> {
        self.check_size(name, bytes.len() as u64)?;

        let settings = self.settings.clone();
        let primary = Arc::clone(&self.primary);
        let fallback = Arc::clone(&self.fallback);
        let label = name.to_string();

        tokio::task::spawn_blocking(move || match primary.encode(&bytes, &settings) {
            Ok(image) => Ok(image),
            Err(e) => {
                log::warn!("{}: {} エンコード失敗 ({}), {} で再試行", label, primary.name(), e, fallback.name());
                fallback
                    .encode(&bytes, &settings)
                    .map_err(|e| FleetError::Compression(format!("{}: {}", label, e)))
            }
        })
        .await
        .map_err(|e| FleetError::Compression(e.to_string()))?
    }

    /// 複数枚を順番に圧縮
    ///
    /// `remaining` を超える枚数が選ばれた場合は全体を拒否する。
    /// サイズ超過・圧縮失敗の入力は個別にスキップして `failures` に入れる。
    /// `progress` は (処理済み枚数, 全枚数, ファイル名) で呼ばれる。
    pub async fn compress_batch<F>(
        &self,
        inputs: Vec<PhotoInput>,
        remaining: usize,
        mut progress: F,
    ) -> Result<BatchOutcome>
    where
        F: FnMut(usize, usize, &str),
    {
        if inputs.len() > remaining {
            return Err(FleetError::PhotoLimitExceeded { remaining });
        }

        let total = inputs.len();
        let mut outcome = BatchOutcome::default();

        for (i, input) in inputs.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.settings.delay()).await;
            }

            let name = input.name();
            match self.compress_input(&name, input).await {
                Ok(image) => outcome.images.push(image),
                Err(e) => {
                    log::warn!("{} をスキップ: {}", name, e);
                    outcome.failures.push((name.clone(), e));
                }
            }
            progress(i + 1, total, &name);
        }

        log::info!("圧縮完了: {}/{}枚", outcome.images.len(), total);
        Ok(outcome)
    }

    /// サイズ確認してから圧縮
    pub async fn compress_input(&self, name: &str, input: PhotoInput) -> Result<EncodedImage> {
        self.check_size(name, input.size()?)?;
        let bytes = input.into_bytes()?;
        self.compress(name, bytes).await
    }
}
