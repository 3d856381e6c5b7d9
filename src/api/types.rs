//! バックエンドAPIの応答型
//!
//! PHP側は同じ項目を bool / "1" / 1 / null のどれでも返すことがあるため、
//! 値は寛容に読む。

use super::response::clean_error_message;
use crate::error::{FleetError, QrRejection, Result};
use fleet_checkin_common::{OperationType, SessionIds};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const QR_INVALID: &str = "QR Code inválido";

fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "TRUE" | "True"),
        _ => false,
    })
}

fn flexible_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// 先頭の整数部分を読む（"45230 km" → 45230）
fn leading_int(value: Option<&str>) -> Option<u64> {
    let digits: String = value?.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// `leading_int` で読めて 0 でない最初の値
fn first_nonzero(values: &[Option<&str>]) -> u64 {
    values
        .iter()
        .filter_map(|v| leading_int(*v))
        .find(|v| *v != 0)
        .unwrap_or(0)
}

/// QR読み取り応答
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QrValidation {
    #[serde(rename = "Status", default, deserialize_with = "flexible_bool")]
    pub status: bool,
    /// true = 利用開始（check-in）、false = 利用終了（check-out）
    #[serde(rename = "flgAbreFecha", default, deserialize_with = "flexible_bool")]
    pub flg_abre_fecha: bool,
    #[serde(rename = "idFrotaHistorico", default, deserialize_with = "flexible_string")]
    pub id_frota_historico: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    pub mensagem: Option<String>,
    #[serde(rename = "KMChegada", default, deserialize_with = "flexible_string")]
    pub km_chegada: Option<String>,
}

/// QRが受理されたときの内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrAccepted {
    pub operation: OperationType,
    pub id_frota_historico: Option<String>,
    pub km_chegada: Option<String>,
}

impl QrValidation {
    /// 拒否なら種類別の `QrRejected` にする
    pub fn into_result(self) -> Result<QrAccepted> {
        if !self.status {
            let message = self.mensagem.as_deref().map(clean_error_message);
            let (kind, message) = match message {
                Some(m) if m.contains("Favor realizar login na empresa correta") => (QrRejection::WrongCompany, m),
                Some(m) if m.contains("Existe historico criado") => (QrRejection::VehicleInUse, m),
                Some(m) if !m.is_empty() => (QrRejection::Generic, m),
                _ => (QrRejection::Generic, QR_INVALID.to_string()),
            };
            return Err(FleetError::QrRejected { kind, message });
        }

        let operation = if self.flg_abre_fecha {
            OperationType::CheckIn
        } else {
            OperationType::CheckOut
        };
        Ok(QrAccepted {
            operation,
            id_frota_historico: self.id_frota_historico,
            km_chegada: self.km_chegada,
        })
    }
}

/// 車両マスタ（dados_frota / dados_frota_historico.frota）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrotaRaw {
    #[serde(rename = "idFrota", default, deserialize_with = "flexible_string")]
    pub id_frota: Option<String>,
    #[serde(rename = "PlacaNumero", default, deserialize_with = "flexible_string")]
    pub placa: Option<String>,
    #[serde(rename = "Modelo", default, deserialize_with = "flexible_string")]
    pub modelo: Option<String>,
    #[serde(rename = "AnoFabricacao", default, deserialize_with = "flexible_string")]
    pub ano: Option<String>,
    #[serde(rename = "Cor", default, deserialize_with = "flexible_string")]
    pub cor: Option<String>,
    #[serde(rename = "KMAtual", default, deserialize_with = "flexible_string")]
    pub km_atual: Option<String>,
    #[serde(rename = "Km", default, deserialize_with = "flexible_string")]
    pub km: Option<String>,
    #[serde(rename = "NomeResponsavel", default, deserialize_with = "flexible_string")]
    pub responsavel: Option<String>,
    #[serde(rename = "Marca", default, deserialize_with = "flexible_string")]
    pub marca: Option<String>,
    #[serde(rename = "ChassiNumero", default, deserialize_with = "flexible_string")]
    pub chassi: Option<String>,
    #[serde(rename = "RenavamNumero", default, deserialize_with = "flexible_string")]
    pub renavam: Option<String>,
}

/// 利用履歴（check-out時）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrotaHistoricoRaw {
    #[serde(rename = "idFrotaHistorico", default, deserialize_with = "flexible_string")]
    pub id_frota_historico: Option<String>,
    #[serde(rename = "KMSaida", default, deserialize_with = "flexible_string")]
    pub km_saida: Option<String>,
    /// 0.0〜1.0
    #[serde(rename = "CombustivelSaida", default)]
    pub combustivel_saida: Option<f64>,
}

/// dados_frota_historico の応答
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoricoResponse {
    #[serde(default)]
    pub frota: FrotaRaw,
    #[serde(rename = "frotaHistorico", default)]
    pub frota_historico: Option<FrotaHistoricoRaw>,
}

/// 画面表示用の車両情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleData {
    pub id_frota: String,
    pub id_frota_historico: Option<String>,
    pub placa: String,
    pub modelo: String,
    pub ano: u32,
    pub cor: String,
    pub km: u64,
    pub combustivel: u8,
    pub responsavel: String,
    pub marca: Option<String>,
    pub chassi: Option<String>,
    pub renavam: Option<String>,
    /// 利用可能（check-in）か
    pub is_available: bool,
}

impl VehicleData {
    /// API応答から組み立てる
    pub fn from_raw(
        frota: FrotaRaw,
        historico: Option<FrotaHistoricoRaw>,
        ids: &SessionIds,
        qr: &QrAccepted,
    ) -> Self {
        let km = match &historico {
            Some(h) => leading_int(h.km_saida.as_deref()).unwrap_or(0),
            None => first_nonzero(&[
                frota.km_atual.as_deref(),
                qr.km_chegada.as_deref(),
                frota.km.as_deref(),
            ]),
        };
        let combustivel = match &historico {
            Some(h) => (h.combustivel_saida.unwrap_or(0.0) * 100.0).round().clamp(0.0, 100.0) as u8,
            None => 100,
        };
        let id_frota_historico = historico
            .as_ref()
            .and_then(|h| h.id_frota_historico.clone())
            .or_else(|| ids.id_frota_historico.clone());

        Self {
            id_frota: frota.id_frota.unwrap_or_else(|| ids.id_frota.clone()),
            id_frota_historico,
            placa: frota.placa.unwrap_or_else(|| "Não informada".into()),
            modelo: frota.modelo.unwrap_or_else(|| "Não informado".into()),
            ano: leading_int(frota.ano.as_deref()).unwrap_or(0) as u32,
            cor: frota.cor.unwrap_or_else(|| "Não informada".into()),
            km,
            combustivel,
            responsavel: frota.responsavel.unwrap_or_else(|| "Não definido".into()),
            marca: frota.marca,
            chassi: frota.chassi,
            renavam: frota.renavam,
            is_available: qr.operation == OperationType::CheckIn,
        }
    }
}

/// 送信応答
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitResponse {
    #[serde(rename = "Status", default, deserialize_with = "flexible_bool")]
    pub status: bool,
    #[serde(default, deserialize_with = "flexible_string")]
    pub mensagem: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    pub error: Option<String>,
}
