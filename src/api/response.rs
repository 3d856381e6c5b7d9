//! サーバー応答本文の解釈
//!
//! JSONでない本文（PHPのエラーページなど）から読めるメッセージを拾う。

use crate::error::FleetError;
use regex::Regex;
use serde::de::DeserializeOwned;

/// 応答を読む文脈（データベースエラー時のメッセージが変わる）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseContext {
    /// QR読み取り・車両データ取得
    Lookup,
    /// 送信
    Submit,
}

impl ResponseContext {
    fn database_message(&self) -> &'static str {
        match self {
            ResponseContext::Lookup => "Erro de configuração do banco de dados. Tabela não encontrada.",
            ResponseContext::Submit => "Erro de banco de dados durante a operação.",
        }
    }
}

/// バックエンドのメッセージから改行エスケープを除く
pub fn clean_error_message(message: &str) -> String {
    message.replace("\\n\\r", "\n").replace("\\n", "\n").trim().to_string()
}

/// JSONでない本文からエラーメッセージを作る
pub fn describe_malformed(body: &str, context: ResponseContext) -> String {
    lazy_static::lazy_static! {
        static ref BOLD_RE: Regex = Regex::new(r"<b>(.*?)</b>").unwrap();
        static ref ERROR_P_RE: Regex = Regex::new(r#"<p class="error">(.*?)</p>"#).unwrap();
    }

    if body.contains("Database Error") || body.contains("Error Number") {
        return context.database_message().to_string();
    }

    let fragment = BOLD_RE
        .captures(body)
        .or_else(|| ERROR_P_RE.captures(body))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    match fragment {
        Some(text) => format!("Erro do servidor: {}", text),
        None => "Resposta inválida do servidor.".to_string(),
    }
}

/// 本文をJSONとして読む。読めなければ `MalformedResponse`
pub fn parse_json<T: DeserializeOwned>(body: &str, context: ResponseContext) -> Result<T, FleetError> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(500).collect();
        log::error!("JSONでない応答 ({}): {}", e, preview);
        FleetError::MalformedResponse(describe_malformed(body, context))
    })
}
