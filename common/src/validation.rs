//! フォーム入力の検証
//!
//! 検証結果は常に下書きから純粋関数で計算する（「有効」フラグを別に持たない）。
//! リモートのKM妥当性チェックは非同期なのでここでは扱わない。

use crate::error::{Error, Result};
use crate::form::{FormDraft, OperationType, Step};
use serde::{Deserialize, Serialize};

pub const MSG_KM_REQUIRED: &str = "KM é obrigatória";
pub const MSG_MOTIVO_REQUIRED: &str = "Motivo da utilização é obrigatório";
pub const MSG_FOTOS_REQUIRED: &str = "É obrigatório anexar pelo menos 1 foto";
pub const MSG_COMBUSTIVEL_RANGE: &str = "Nível de combustível deve estar entre 0 e 100";

/// 検証対象フィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Km,
    Motivo,
    Fotos,
    Combustivel,
}

/// フィールド単位の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// 1フィールドの状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState {
    Valid,
    Invalid(String),
}

impl FieldState {
    pub fn is_valid(&self) -> bool {
        matches!(self, FieldState::Valid)
    }

    fn from_error(error: Option<FieldError>) -> Self {
        match error {
            Some(e) => FieldState::Invalid(e.message),
            None => FieldState::Valid,
        }
    }
}

/// 全フィールドの状態（表示用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValidation {
    pub km: FieldState,
    /// check-outでは None（入力欄なし）
    pub motivo: Option<FieldState>,
    pub fotos: FieldState,
    pub combustivel: FieldState,
}

fn check_km(draft: &FormDraft) -> Option<FieldError> {
    draft
        .km
        .trim()
        .is_empty()
        .then(|| FieldError::new(Field::Km, MSG_KM_REQUIRED))
}

fn check_motivo(draft: &FormDraft, operation: OperationType) -> Option<FieldError> {
    (!operation.is_checkout() && draft.motivo.trim().is_empty())
        .then(|| FieldError::new(Field::Motivo, MSG_MOTIVO_REQUIRED))
}

fn check_fotos(draft: &FormDraft) -> Option<FieldError> {
    draft
        .fotos
        .is_empty()
        .then(|| FieldError::new(Field::Fotos, MSG_FOTOS_REQUIRED))
}

fn check_combustivel(draft: &FormDraft) -> Option<FieldError> {
    (draft.combustivel > 100).then(|| FieldError::new(Field::Combustivel, MSG_COMBUSTIVEL_RANGE))
}

/// 現在の下書きから各フィールドの状態を計算
pub fn field_validation(draft: &FormDraft, operation: OperationType) -> FieldValidation {
    FieldValidation {
        km: FieldState::from_error(check_km(draft)),
        motivo: (!operation.is_checkout())
            .then(|| FieldState::from_error(check_motivo(draft, operation))),
        fotos: FieldState::from_error(check_fotos(draft)),
        combustivel: FieldState::from_error(check_combustivel(draft)),
    }
}

/// 次の段階へ進む前の検証
pub fn validate_step(step: Step, draft: &FormDraft, operation: OperationType) -> Vec<FieldError> {
    match step {
        Step::Details => [check_km(draft), check_motivo(draft, operation), check_combustivel(draft)]
            .into_iter()
            .flatten()
            .collect(),
        Step::Conditions => check_fotos(draft).into_iter().collect(),
        Step::Fueling | Step::Notes | Step::Confirm => Vec::new(),
    }
}

/// 送信前の全必須項目チェック（KM → 利用目的 → 写真の順）
pub fn validate_all(draft: &FormDraft, operation: OperationType) -> Vec<FieldError> {
    [
        check_km(draft),
        check_motivo(draft, operation),
        check_fotos(draft),
        check_combustivel(draft),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn into_result(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

/// `validate_step` のエラーを `Error::Validation` にする
pub fn ensure_step(step: Step, draft: &FormDraft, operation: OperationType) -> Result<()> {
    into_result(validate_step(step, draft, operation))
}

/// `validate_all` のエラーを `Error::Validation` にする
pub fn ensure_all(draft: &FormDraft, operation: OperationType) -> Result<()> {
    into_result(validate_all(draft, operation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_data::EncodedImage;

    fn filled_draft() -> FormDraft {
        FormDraft {
            km: "45.230".into(),
            motivo: "Entrega".into(),
            fotos: vec![EncodedImage::jpeg(vec![1, 2, 3])],
            ..FormDraft::default()
        }
    }

    #[test]
    fn test_details_requires_km() {
        let draft = FormDraft {
            km: "  ".into(),
            ..filled_draft()
        };
        let errors = validate_step(Step::Details, &draft, OperationType::CheckIn);
        assert_eq!(errors, vec![FieldError::new(Field::Km, MSG_KM_REQUIRED)]);
    }

    #[test]
    fn test_details_requires_motivo_on_checkin_only() {
        let draft = FormDraft {
            motivo: String::new(),
            ..filled_draft()
        };
        assert_eq!(validate_step(Step::Details, &draft, OperationType::CheckIn).len(), 1);
        assert!(validate_step(Step::Details, &draft, OperationType::CheckOut).is_empty());
    }

    #[test]
    fn test_conditions_requires_photo() {
        let draft = FormDraft {
            fotos: Vec::new(),
            ..filled_draft()
        };
        let errors = validate_step(Step::Conditions, &draft, OperationType::CheckOut);
        assert_eq!(errors[0].message, "É obrigatório anexar pelo menos 1 foto");
    }

    #[test]
    fn test_validate_all_order() {
        let errors = validate_all(&FormDraft::default(), OperationType::CheckIn);
        let fields: Vec<Field> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![Field::Km, Field::Motivo, Field::Fotos]);
    }

    #[test]
    fn test_field_validation_tracks_data() {
        let mut draft = filled_draft();
        let states = field_validation(&draft, OperationType::CheckIn);
        assert!(states.km.is_valid());
        assert_eq!(states.motivo, Some(FieldState::Valid));

        draft.fotos.clear();
        let states = field_validation(&draft, OperationType::CheckIn);
        assert_eq!(states.fotos, FieldState::Invalid(MSG_FOTOS_REQUIRED.into()));

        let states = field_validation(&draft, OperationType::CheckOut);
        assert!(states.motivo.is_none());
    }

    #[test]
    fn test_combustivel_range() {
        let draft = FormDraft {
            combustivel: 120,
            ..filled_draft()
        };
        let errors = validate_all(&draft, OperationType::CheckOut);
        assert_eq!(errors[0].field, Field::Combustivel);
    }

    #[test]
    fn test_ensure_step_wraps_errors() {
        assert!(ensure_step(Step::Details, &filled_draft(), OperationType::CheckIn).is_ok());
        let err = ensure_all(&FormDraft::default(), OperationType::CheckOut).unwrap_err();
        assert_eq!(err.to_string(), MSG_KM_REQUIRED);
        assert_eq!(err.field_errors().len(), 2);
    }
}
