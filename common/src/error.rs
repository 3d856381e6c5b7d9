//! エラー型定義

use crate::validation::FieldError;
use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 入力検証エラー（最初の1件をメッセージに使う）
    #[error("{}", .0.first().map(|e| e.message.as_str()).unwrap_or("Por favor, corrija os erros no formulário."))]
    Validation(Vec<FieldError>),
}

impl Error {
    /// 検証エラーの一覧（それ以外は空）
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Error::Validation(errors) => errors,
            _ => &[],
        }
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
