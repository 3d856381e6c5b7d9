//! バックエンドAPIクライアント
//!
//! ## 変更履歴
//! - 2026-02-03: 送信フィールドを PayloadProfile で切り替え

pub mod response;
pub mod types;

pub use response::{clean_error_message, describe_malformed, ResponseContext};
pub use types::{QrAccepted, QrValidation, SubmitResponse, VehicleData};

use crate::controller::KmValidator;
use crate::error::{FleetError, Result};
use fleet_checkin_common::{FormValue, OperationType, Payload, PayloadProfile, SessionIds};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use response::parse_json;
use std::time::Duration;
use types::{FrotaRaw, HistoricoResponse};

/// バックエンドとのやり取り
#[allow(async_fn_in_trait)]
pub trait FleetBackend {
    /// ログイン済みか（失敗はすべて未ログイン扱い）
    async fn check_login(&self) -> bool;

    async fn validate_qr(&self, id_frota: &str, id_empresa: &str) -> Result<QrAccepted>;

    async fn fetch_vehicle(&self, ids: &SessionIds, qr: &QrAccepted) -> Result<VehicleData>;

    /// 送信して成功メッセージを返す
    async fn submit(&self, payload: &Payload, profile: &PayloadProfile, timestamp: &str) -> Result<String>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/index.php/{}", self.base_url, path)
    }

    async fn get_text(&self, path: &str) -> Result<(StatusCode, String)> {
        let url = self.url(path);
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    fn check_status(status: StatusCode, what: &str) -> Result<()> {
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FleetError::SessionExpired),
            s => Err(FleetError::Network(format!("Erro {} ao buscar {}", s.as_u16(), what))),
        }
    }

    fn build_form(payload: &Payload, profile: &PayloadProfile, timestamp: &str) -> Result<Form> {
        let mut form = Form::new();
        for field in payload.form_fields(profile, timestamp) {
            form = match field.value {
                FormValue::Text(value) => form.text(field.name, value),
                FormValue::File { file_name, mime, bytes } => {
                    let part = Part::bytes(bytes).file_name(file_name).mime_str(&mime)?;
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }
}

impl FleetBackend for HttpBackend {
    async fn check_login(&self) -> bool {
        match self.get_text("webhook/testa_login").await {
            Ok((status, body)) if status.is_success() => {
                let logged_in = body.trim().parse::<i64>().map(|v| v == 1).unwrap_or(false);
                log::info!("ログイン状態: {}", if logged_in { "1" } else { "0" });
                logged_in
            }
            Ok((status, _)) => {
                log::warn!("ログイン確認に失敗 ({}), 未ログインとみなす", status);
                false
            }
            Err(e) => {
                log::warn!("ログイン確認に失敗: {}", e);
                false
            }
        }
    }

    async fn validate_qr(&self, id_frota: &str, id_empresa: &str) -> Result<QrAccepted> {
        let (status, body) = self
            .get_text(&format!("frota/leitura_qrcode/{}/{}", id_frota, id_empresa))
            .await?;
        if !status.is_success() {
            return Err(FleetError::Network(format!(
                "Erro {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )));
        }
        let validation: QrValidation = parse_json(&body, ResponseContext::Lookup)?;
        log::debug!("QR検証結果: {:?}", validation);
        validation.into_result()
    }

    async fn fetch_vehicle(&self, ids: &SessionIds, qr: &QrAccepted) -> Result<VehicleData> {
        let historico_id = match qr.operation {
            OperationType::CheckOut => qr.id_frota_historico.as_deref(),
            OperationType::CheckIn => None,
        };

        if let Some(id) = historico_id {
            let (status, body) = self.get_text(&format!("frota/dados_frota_historico/{}", id)).await?;
            Self::check_status(status, "histórico")?;
            let response: HistoricoResponse = parse_json(&body, ResponseContext::Lookup)?;
            Ok(VehicleData::from_raw(response.frota, response.frota_historico, ids, qr))
        } else {
            let (status, body) = self.get_text(&format!("frota/dados_frota/{}", ids.id_frota)).await?;
            Self::check_status(status, "veículo")?;
            let frota: FrotaRaw = parse_json(&body, ResponseContext::Lookup)?;
            Ok(VehicleData::from_raw(frota, None, ids, qr))
        }
    }

    async fn submit(&self, payload: &Payload, profile: &PayloadProfile, timestamp: &str) -> Result<String> {
        let url = match payload {
            Payload::CheckIn(p) => self.url(&format!("frota/adiciona_historico/{}", p.id_frota)),
            Payload::CheckOut(_) => self.url("frota/fechar_frota_historico"),
        };
        let form = Self::build_form(payload, profile, timestamp)?;

        log::info!("送信: {}", url);
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        log::debug!("送信応答 {}: {}", status, body.chars().take(500).collect::<String>());

        let parsed: SubmitResponse = parse_json(&body, ResponseContext::Submit)?;
        if !status.is_success() || !parsed.status {
            let message = parsed
                .mensagem
                .or(parsed.error)
                .map(|m| clean_error_message(&m))
                .unwrap_or_else(|| format!("Erro {}: {}", status.as_u16(), status.canonical_reason().unwrap_or("")));
            return Err(FleetError::Server(message));
        }

        Ok(parsed.mensagem.unwrap_or_else(|| match payload.operation() {
            OperationType::CheckIn => "Check-In realizado com sucesso!".to_string(),
            OperationType::CheckOut => "Check-Out realizado com sucesso!".to_string(),
        }))
    }
}

impl KmValidator for HttpBackend {
    async fn validate_km(&self, operation: OperationType, ids: &SessionIds, km: &str) -> Result<bool> {
        let path = match operation {
            OperationType::CheckIn => format!("frota/ultimo_km_api/{}/{}", ids.id_frota, km),
            OperationType::CheckOut => match &ids.id_frota_historico {
                Some(historico) => format!("frota/validar_km_chegada_api/{}/{}", historico, km),
                None => {
                    log::warn!("idFrotaHistorico がないため KM を検証できない");
                    return Ok(false);
                }
            },
        };

        let (status, body) = self
            .get_text(&path)
            .await
            .map_err(|e| FleetError::KmCheckFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(FleetError::KmCheckFailed(format!("Erro {}", status.as_u16())));
        }
        Ok(body.trim() == "1")
    }
}
