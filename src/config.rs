use crate::error::{FleetError, Result};
use fleet_checkin_common::PayloadProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 写真圧縮の設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompressionConfig {
    /// 出力の最大サイズ（MB）
    pub max_size_mb: f64,
    /// 長辺の最大ピクセル
    pub max_dimension: u32,
    /// JPEG品質（主経路の初期値）
    pub initial_quality: u8,
    /// JPEG品質（フォールバック経路）
    pub fallback_quality: u8,
    /// これを超える入力は圧縮前に拒否（MB）
    pub max_input_mb: u64,
    /// 1枚ごとの待ち時間（ms）
    pub delay_ms: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_size_mb: 1.0,
            max_dimension: 1024,
            initial_quality: 70,
            fallback_quality: 60,
            max_input_mb: 20,
            delay_ms: 100,
        }
    }
}

impl CompressionConfig {
    pub fn max_output_bytes(&self) -> usize {
        (self.max_size_mb * 1024.0 * 1024.0) as usize
    }

    pub fn max_input_bytes(&self) -> u64 {
        self.max_input_mb * 1024 * 1024
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub api_key: Option<String>,
    /// 損傷描き込み用の車両図
    pub reference_image: Option<PathBuf>,
    /// 下書き保存先（省略時はデータディレクトリ）
    pub draft_dir: Option<PathBuf>,
    pub timeout_seconds: u64,
    pub max_photos: usize,
    pub compression: CompressionConfig,
    pub payload: PayloadProfile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".into(),
            api_key: None,
            reference_image: None,
            draft_dir: None,
            timeout_seconds: 30,
            max_photos: 20,
            compression: CompressionConfig::default(),
            payload: PayloadProfile::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| FleetError::Config("Diretório home não encontrado".into()))?;
        Ok(home.join(".config").join("fleet-checkin").join("config.json"))
    }

    /// 下書きの保存先
    pub fn draft_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.draft_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| FleetError::Config("Diretório de dados não encontrado".into()))?;
        Ok(base.join("fleet-checkin").join("drafts"))
    }

    /// APIキー（環境変数を優先、未設定なら空文字）
    pub fn api_key(&self) -> String {
        if let Ok(key) = std::env::var("FLEET_API_KEY") {
            return key;
        }
        self.api_key.clone().unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn set_base_url(&mut self, url: String) -> Result<()> {
        self.base_url = url.trim_end_matches('/').to_string();
        self.save()
    }
}
