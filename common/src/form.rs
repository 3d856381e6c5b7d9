//! チェックイン/チェックアウト フォームの型定義
//!
//! - OperationType: 操作種別（check-in / check-out）
//! - Step: ウィザードの段階（操作種別で数が変わる）
//! - FormDraft: 送信前の入力内容（下書き）

use crate::fuel::DEFAULT_FUEL;
use crate::image_data::EncodedImage;
use crate::stroke::StrokeHistory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 操作種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// 利用開始（出発時KM・燃料を記録）
    #[serde(rename = "checkin")]
    CheckIn,
    /// 利用終了（到着時KM・燃料、給油・事故を記録）
    #[serde(rename = "checkout")]
    CheckOut,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::CheckIn => "checkin",
            OperationType::CheckOut => "checkout",
        }
    }

    /// 画面表示名
    pub fn title(&self) -> &'static str {
        match self {
            OperationType::CheckIn => "Check-In",
            OperationType::CheckOut => "Check-Out",
        }
    }

    /// "Saída" / "Chegada"
    pub fn moment_label(&self) -> &'static str {
        match self {
            OperationType::CheckIn => "Saída",
            OperationType::CheckOut => "Chegada",
        }
    }

    pub fn is_checkout(&self) -> bool {
        matches!(self, OperationType::CheckOut)
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "checkin" | "in" => Ok(OperationType::CheckIn),
            "checkout" | "out" => Ok(OperationType::CheckOut),
            _ => Err(format!("Unknown operation: {}. Use checkin or checkout", s)),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ウィザードの段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// KM・利用目的・燃料
    Details,
    /// 給油（check-outのみ）
    Fueling,
    /// 車両写真・事故・損傷描き込み
    Conditions,
    /// 備考
    Notes,
    /// 確認
    Confirm,
}

const CHECKIN_STEPS: [Step; 4] = [Step::Details, Step::Conditions, Step::Notes, Step::Confirm];
const CHECKOUT_STEPS: [Step; 5] = [
    Step::Details,
    Step::Fueling,
    Step::Conditions,
    Step::Notes,
    Step::Confirm,
];

impl Step {
    /// 操作種別ごとの段階一覧
    pub fn sequence(operation: OperationType) -> &'static [Step] {
        match operation {
            OperationType::CheckIn => &CHECKIN_STEPS,
            OperationType::CheckOut => &CHECKOUT_STEPS,
        }
    }

    pub fn label(&self, operation: OperationType) -> String {
        match self {
            Step::Details => format!("Dados da {}", operation.moment_label()),
            Step::Fueling => "Abastecimento".to_string(),
            Step::Conditions => "Condições do Veículo".to_string(),
            Step::Notes => "Observações".to_string(),
            Step::Confirm => "Finalizar".to_string(),
        }
    }
}

/// 送信前の入力内容
///
/// キーは (操作種別, 車両ID)。フィールド名は保存済み下書きとの互換のため camelCase。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormDraft {
    pub condutor: String,
    pub motivo: String,
    pub km: String,
    pub combustivel: u8,
    pub teve_abastecimento: bool,
    pub valor_abastecimento: String,
    pub comprovante_abastecimento: Option<EncodedImage>,
    pub fotos: Vec<EncodedImage>,
    pub tem_ocorrencia: bool,
    pub desenho_avaria: Option<EncodedImage>,
    pub desenho_avaria_history: StrokeHistory,
    pub descricao_ocorrencia: String,
    pub observacoes: String,
}

impl Default for FormDraft {
    fn default() -> Self {
        Self {
            condutor: String::new(),
            motivo: String::new(),
            km: String::new(),
            combustivel: DEFAULT_FUEL,
            teve_abastecimento: false,
            valor_abastecimento: String::new(),
            comprovante_abastecimento: None,
            fotos: Vec::new(),
            tem_ocorrencia: false,
            desenho_avaria: None,
            desenho_avaria_history: StrokeHistory::new(),
            descricao_ocorrencia: String::new(),
            observacoes: String::new(),
        }
    }
}

impl FormDraft {
    /// 運転者名だけ入った新規下書き
    pub fn for_driver(condutor: impl Into<String>) -> Self {
        Self {
            condutor: condutor.into(),
            ..Self::default()
        }
    }

    /// KM入力（数字と , . 以外は捨てる）
    pub fn set_km(&mut self, input: &str) {
        self.km = sanitize_km(input);
    }

    /// 燃料（0〜100にクランプ）
    pub fn set_combustivel(&mut self, value: u8) {
        self.combustivel = value.min(100);
    }

    /// KM検証APIに渡す値（小数点を . に統一）
    pub fn km_for_api(&self) -> String {
        self.km.trim().replace(',', ".")
    }

    /// 何も入力されていないか（運転者名は除く）
    pub fn is_pristine(&self) -> bool {
        *self
            == Self {
                condutor: self.condutor.clone(),
                ..Self::default()
            }
    }
}

/// KM入力のサニタイズ
pub fn sanitize_km(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect()
}

/// 給油金額を pt-BR 形式（1.234,56）に整形
///
/// 数値として読めない場合は None。
pub fn format_brl_amount(input: &str) -> Option<String> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("R$")
        .trim()
        .replace('.', "")
        .replace(',', ".");
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let cents = (value * 100.0).round() as u64;
    let integer = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    Some(format!("{},{:02}", grouped, cents % 100))
}

/// 下書きストアのキー
pub fn draft_key(operation: OperationType, fleet_id: &str) -> String {
    format!("fleet-form-{}-{}", operation.as_str(), fleet_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parse() {
        assert_eq!("checkin".parse::<OperationType>().unwrap(), OperationType::CheckIn);
        assert_eq!("check-out".parse::<OperationType>().unwrap(), OperationType::CheckOut);
        assert!("other".parse::<OperationType>().is_err());
    }

    #[test]
    fn test_step_sequences() {
        assert_eq!(Step::sequence(OperationType::CheckIn).len(), 4);
        assert_eq!(Step::sequence(OperationType::CheckOut).len(), 5);
        assert_eq!(Step::sequence(OperationType::CheckIn)[1], Step::Conditions);
        assert_eq!(Step::sequence(OperationType::CheckOut)[2], Step::Conditions);
    }

    #[test]
    fn test_step_label() {
        assert_eq!(Step::Details.label(OperationType::CheckIn), "Dados da Saída");
        assert_eq!(Step::Details.label(OperationType::CheckOut), "Dados da Chegada");
    }

    #[test]
    fn test_sanitize_km() {
        assert_eq!(sanitize_km("45.230 km"), "45.230");
        assert_eq!(sanitize_km("1,5abc"), "1,5");
    }

    #[test]
    fn test_km_for_api() {
        let mut draft = FormDraft::default();
        draft.set_km("45,2");
        assert_eq!(draft.km_for_api(), "45.2");
    }

    #[test]
    fn test_default_draft() {
        let draft = FormDraft::for_driver("Maria");
        assert_eq!(draft.combustivel, 50);
        assert!(draft.is_pristine());

        let mut touched = draft.clone();
        touched.observacoes = "ok".into();
        assert!(!touched.is_pristine());
    }

    #[test]
    fn test_draft_json_field_names() {
        let json = serde_json::to_string(&FormDraft::default()).unwrap();
        assert!(json.contains("\"teveAbastecimento\""));
        assert!(json.contains("\"desenhoAvariaHistory\":[]"));

        let partial: FormDraft = serde_json::from_str(r#"{"km":"100"}"#).unwrap();
        assert_eq!(partial.km, "100");
        assert_eq!(partial.combustivel, 50);
    }

    #[test]
    fn test_format_brl_amount() {
        assert_eq!(format_brl_amount("1234,5").as_deref(), Some("1.234,50"));
        assert_eq!(format_brl_amount("R$ 89,90").as_deref(), Some("89,90"));
        assert_eq!(format_brl_amount("1.000.000").as_deref(), Some("1.000.000,00"));
        assert_eq!(format_brl_amount("abc"), None);
    }

    #[test]
    fn test_draft_key() {
        assert_eq!(draft_key(OperationType::CheckIn, "42"), "fleet-form-checkin-42");
    }
}
