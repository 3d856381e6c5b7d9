//! エンコード済み画像（写真・描き込み結果・レシート）
//!
//! 下書きJSONには Data URL 文字列として保存する。

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// MIMEタイプ付きのエンコード済み画像
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncodedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new("image/jpeg", bytes)
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new("image/png", bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// "data:image/jpeg;base64,..." 形式に変換
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// Data URLを解析
    ///
    /// base64部分が壊れている場合は None。MIMEが取れない場合は image/jpeg とみなす。
    pub fn from_data_url(data_url: &str) -> Option<Self> {
        let (header, payload) = data_url.split_once(',')?;
        let mime = header
            .strip_prefix("data:")
            .and_then(|s| s.split(';').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("image/jpeg");
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        Some(Self::new(mime, bytes))
    }

    /// 送信時のファイル拡張子
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

impl TryFrom<String> for EncodedImage {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_url(&value).ok_or_else(|| "invalid data URL".to_string())
    }
}

impl From<EncodedImage> for String {
    fn from(image: EncodedImage) -> Self {
        image.to_data_url()
    }
}
