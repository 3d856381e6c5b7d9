//! 送信ペイロード
//!
//! check-in と check-out で必須フィールドが異なる。
//! 運転者名とAPIキーを含めるかどうかは配備ごとの設定（PayloadProfile）で切り替える。
//!
//! ## 変更履歴
//! - 2026-02-03: 運転者名・APIキーの有無を設定化

use crate::form::{FormDraft, OperationType};
use crate::image_data::EncodedImage;
use crate::stroke::StrokeHistory;
use serde::{Deserialize, Serialize};

/// ペイロードに含める任意フィールドの設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadProfile {
    /// Condutor を送る
    pub include_driver: bool,
    /// chaveAPI を送る
    pub include_api_key: bool,
}

impl Default for PayloadProfile {
    fn default() -> Self {
        Self {
            include_driver: true,
            include_api_key: true,
        }
    }
}

/// 送信先・車両の識別子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIds {
    pub id_frota: String,
    /// check-out時の利用履歴ID
    pub id_frota_historico: Option<String>,
}

/// Check-In ペイロード
///
/// 送信時のフィールド名は `form_fields` が決める。
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInPayload {
    pub id_frota: String,
    pub condutor: String,
    pub utilizacao: String,
    pub combustivel_saida: u8,
    pub km_saida: String,
    pub observacao_saida: String,
    pub observacao_ocorrencia: String,
    pub flg_ocorrencia: bool,
    pub imagem_ocorrencia: Option<EncodedImage>,
    pub file_envio_ocorrencia: Vec<EncodedImage>,
    pub desenho_avaria_history: StrokeHistory,
    pub chave_api: String,
}

/// Check-Out ペイロード
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutPayload {
    pub id_frota: String,
    pub condutor: String,
    pub id_frota_historico: String,
    pub combustivel_chegada: u8,
    pub km_chegada: String,
    pub observacao_chegada: String,
    pub flg_abastecimento: bool,
    pub valor_abastecimento: String,
    pub file_envio: Option<EncodedImage>,
    pub observacao_ocorrencia: String,
    pub flg_ocorrencia: bool,
    pub imagem_ocorrencia: Option<EncodedImage>,
    pub file_envio_ocorrencia: Vec<EncodedImage>,
    pub desenho_avaria_history: StrokeHistory,
    pub chave_api: String,
}

/// 送信ペイロード（操作種別ごと）
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    CheckIn(CheckInPayload),
    CheckOut(CheckOutPayload),
}

/// multipartの値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// multipartの1フィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

impl FormField {
    fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    /// 空画像は送らない
    fn file(name: impl Into<String>, file_name: impl Into<String>, image: &EncodedImage) -> Option<Self> {
        if image.is_empty() {
            return None;
        }
        Some(Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                mime: image.mime.clone(),
                bytes: image.bytes.clone(),
            },
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            FormValue::Text(s) => Some(s),
            FormValue::File { .. } => None,
        }
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn or_zero(value: &str) -> String {
    if value.trim().is_empty() {
        "0".to_string()
    } else {
        value.to_string()
    }
}

impl Payload {
    /// 下書きからペイロードを組み立てる
    pub fn build(operation: OperationType, ids: &SessionIds, draft: &FormDraft, chave_api: &str) -> Self {
        match operation {
            OperationType::CheckIn => Payload::CheckIn(CheckInPayload {
                id_frota: ids.id_frota.clone(),
                condutor: draft.condutor.clone(),
                utilizacao: draft.motivo.clone(),
                combustivel_saida: draft.combustivel,
                km_saida: draft.km.clone(),
                observacao_saida: draft.observacoes.clone(),
                observacao_ocorrencia: draft.descricao_ocorrencia.clone(),
                flg_ocorrencia: draft.tem_ocorrencia,
                imagem_ocorrencia: draft.desenho_avaria.clone(),
                file_envio_ocorrencia: draft.fotos.clone(),
                desenho_avaria_history: draft.desenho_avaria_history.clone(),
                chave_api: chave_api.to_string(),
            }),
            OperationType::CheckOut => Payload::CheckOut(CheckOutPayload {
                id_frota: ids.id_frota.clone(),
                condutor: draft.condutor.clone(),
                id_frota_historico: ids.id_frota_historico.clone().unwrap_or_default(),
                combustivel_chegada: draft.combustivel,
                km_chegada: draft.km.clone(),
                observacao_chegada: draft.observacoes.clone(),
                flg_abastecimento: draft.teve_abastecimento,
                valor_abastecimento: draft.valor_abastecimento.clone(),
                file_envio: draft.comprovante_abastecimento.clone(),
                observacao_ocorrencia: draft.descricao_ocorrencia.clone(),
                flg_ocorrencia: draft.tem_ocorrencia,
                imagem_ocorrencia: draft.desenho_avaria.clone(),
                file_envio_ocorrencia: draft.fotos.clone(),
                desenho_avaria_history: draft.desenho_avaria_history.clone(),
                chave_api: chave_api.to_string(),
            }),
        }
    }

    pub fn operation(&self) -> OperationType {
        match self {
            Payload::CheckIn(_) => OperationType::CheckIn,
            Payload::CheckOut(_) => OperationType::CheckOut,
        }
    }

    pub fn id_frota(&self) -> &str {
        match self {
            Payload::CheckIn(p) => &p.id_frota,
            Payload::CheckOut(p) => &p.id_frota,
        }
    }

    pub fn km(&self) -> &str {
        match self {
            Payload::CheckIn(p) => &p.km_saida,
            Payload::CheckOut(p) => &p.km_chegada,
        }
    }

    pub fn combustivel(&self) -> u8 {
        match self {
            Payload::CheckIn(p) => p.combustivel_saida,
            Payload::CheckOut(p) => p.combustivel_chegada,
        }
    }

    /// multipartフィールドを組み立てる
    ///
    /// `timestamp` は "YYYY-MM-DD HH:MM:SS"。
    pub fn form_fields(&self, profile: &PayloadProfile, timestamp: &str) -> Vec<FormField> {
        let mut fields = Vec::new();
        match self {
            Payload::CheckIn(p) => {
                if profile.include_api_key {
                    fields.push(FormField::text("chaveAPI", &p.chave_api));
                }
                fields.push(FormField::text("idFrota", &p.id_frota));
                if profile.include_driver {
                    fields.push(FormField::text("Condutor", &p.condutor));
                }
                fields.push(FormField::text("Utilizacao", &p.utilizacao));
                fields.push(FormField::text("KMSaida", or_zero(&p.km_saida)));
                fields.push(FormField::text("CombustivelSaida", p.combustivel_saida.to_string()));
                fields.push(FormField::text("ObservacaoSaida", &p.observacao_saida));
                fields.push(FormField::text("FlgOcorrencia", flag(p.flg_ocorrencia)));
                fields.push(FormField::text("ObservacaoOcorrencia", &p.observacao_ocorrencia));
                fields.push(FormField::text("DataHoraOperacao", timestamp));

                if let Some(image) = &p.imagem_ocorrencia {
                    fields.extend(FormField::file("imagemOcorrencia", "ocorrencia.png", image));
                }
                for (i, photo) in p.file_envio_ocorrencia.iter().enumerate() {
                    fields.extend(FormField::file(
                        format!("fileEnvioOcorrencia[{}]", i),
                        format!("ocorrencia_{}.{}", i, photo.extension()),
                        photo,
                    ));
                }
            }
            Payload::CheckOut(p) => {
                if profile.include_api_key {
                    fields.push(FormField::text("chaveAPI", &p.chave_api));
                }
                fields.push(FormField::text("idFrota", &p.id_frota));
                if profile.include_driver {
                    fields.push(FormField::text("Condutor", &p.condutor));
                }
                fields.push(FormField::text("idFrotaHistorico", &p.id_frota_historico));
                fields.push(FormField::text("CombustivelChegada", p.combustivel_chegada.to_string()));
                fields.push(FormField::text("KMChegada", or_zero(&p.km_chegada)));
                fields.push(FormField::text("ObservacaoChegada", &p.observacao_chegada));
                fields.push(FormField::text("FlgAbastecimento", flag(p.flg_abastecimento)));
                fields.push(FormField::text("DataHoraOperacao", timestamp));

                if p.flg_abastecimento {
                    fields.push(FormField::text("ValorAbastecimento", or_zero(&p.valor_abastecimento)));
                    if let Some(receipt) = &p.file_envio {
                        fields.extend(FormField::file(
                            "fileEnvio",
                            format!("comprovante_abastecimento.{}", receipt.extension()),
                            receipt,
                        ));
                    }
                }

                fields.push(FormField::text("FlgOcorrencia", flag(p.flg_ocorrencia)));
                if p.flg_ocorrencia {
                    fields.push(FormField::text("ObservacaoOcorrencia", &p.observacao_ocorrencia));
                    if let Some(image) = &p.imagem_ocorrencia {
                        fields.extend(FormField::file(
                            "imagemOcorrencia",
                            format!("ocorrencia_checkout.{}", image.extension()),
                            image,
                        ));
                    }
                }

                for (i, photo) in p.file_envio_ocorrencia.iter().enumerate() {
                    fields.extend(FormField::file(
                        format!("fileEnvioOcorrencia[{}]", i),
                        format!("foto_veiculo_checkout_{}.{}", i, photo.extension()),
                        photo,
                    ));
                }
            }
        }
        fields
    }
}
