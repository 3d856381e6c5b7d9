//! 多段フォームの制御
//!
//! 下書きの唯一の所有者。フィールドを変更するたびに下書きストアへ同期保存する。
//!
//! ## 変更履歴
//! - 2026-02-03: KM検証結果を値と一緒に保持（入力変更で自動的に無効化）
//! - 2026-10-16: KM入力直後にも検証（km_status）

use crate::draft::{load_draft, save_draft, DraftStore};
use crate::error::{FleetError, Result};
use fleet_checkin_common::{
    draft_key, ensure_all, ensure_step, field_validation, EncodedImage, FieldValidation, FormDraft,
    OperationType, Payload, SessionIds, Step, StrokeHistory,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const UNSAVED_CHANGES_PROMPT: &str = "Você tem alterações não salvas. Deseja realmente cancelar?";

/// リモートのKM妥当性チェック
#[allow(async_fn_in_trait)]
pub trait KmValidator {
    /// 受け付けられるKMなら true。呼び出し自体の失敗は Err
    async fn validate_km(&self, operation: OperationType, ids: &SessionIds, km: &str) -> Result<bool>;
}

/// 送信中フラグ（多重送信の抑止）
#[derive(Debug, Clone, Default)]
pub struct SubmitGate {
    busy: Arc<AtomicBool>,
}

impl SubmitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 空いていれば取得。送信中なら None
    pub fn try_acquire(&self) -> Option<SubmitGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// drop で送信中フラグを下ろす
#[derive(Debug)]
pub struct SubmitGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// 確定したペイロード
///
/// 保持している間は送信中フラグが立ったまま（送信完了まで持ち続ける）。
#[derive(Debug)]
pub struct Submission {
    pub payload: Payload,
    _guard: SubmitGuard,
}

/// 入力直後のKM確認結果
#[derive(Debug)]
pub enum KmStatus {
    /// 未入力（問い合わせない）
    Missing,
    Accepted,
    Rejected,
    /// 問い合わせ自体が失敗（`KmCheckFailed`）
    Unverified(FleetError),
}

/// 直近のKMチェック結果（チェックした値つき）
#[derive(Debug, Clone, PartialEq, Eq)]
struct KmCheck {
    km: String,
    valid: bool,
}

pub struct FormController<S: DraftStore> {
    operation: OperationType,
    ids: SessionIds,
    chave_api: String,
    store: S,
    key: String,
    draft: FormDraft,
    step_index: usize,
    km_check: Option<KmCheck>,
    max_photos: usize,
    gate: SubmitGate,
}

impl<S: DraftStore> FormController<S> {
    /// 保存済みの下書きがあれば復元して開始（ストアの読み込みはここだけ）
    pub fn mount(
        operation: OperationType,
        ids: SessionIds,
        condutor: &str,
        chave_api: impl Into<String>,
        store: S,
    ) -> Self {
        let key = draft_key(operation, &ids.id_frota);
        let draft = match load_draft(&store, &key) {
            Some(draft) => {
                log::info!("下書きを復元: {}", key);
                draft
            }
            None => FormDraft::for_driver(condutor),
        };
        Self {
            operation,
            ids,
            chave_api: chave_api.into(),
            store,
            key,
            draft,
            step_index: 0,
            km_check: None,
            max_photos: 20,
            gate: SubmitGate::new(),
        }
    }

    pub fn with_max_photos(mut self, max_photos: usize) -> Self {
        self.max_photos = max_photos;
        self
    }

    pub fn operation(&self) -> OperationType {
        self.operation
    }

    pub fn ids(&self) -> &SessionIds {
        &self.ids
    }

    pub fn draft(&self) -> &FormDraft {
        &self.draft
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn draft_key(&self) -> &str {
        &self.key
    }

    pub fn steps(&self) -> &'static [Step] {
        Step::sequence(self.operation)
    }

    pub fn current_step(&self) -> Step {
        self.steps()[self.step_index]
    }

    /// 1始まりの段階番号
    pub fn step_number(&self) -> usize {
        self.step_index + 1
    }

    pub fn is_last_step(&self) -> bool {
        self.step_index + 1 == self.steps().len()
    }

    pub fn gate(&self) -> SubmitGate {
        self.gate.clone()
    }

    /// 表示用の各フィールド状態
    pub fn validation(&self) -> FieldValidation {
        field_validation(&self.draft, self.operation)
    }

    /// 下書きを変更してストアに同期保存
    pub fn update<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut FormDraft),
    {
        mutate(&mut self.draft);
        save_draft(&mut self.store, &self.key, &self.draft)
    }

    pub fn set_km(&mut self, input: &str) -> Result<()> {
        self.update(|d| d.set_km(input))
    }

    pub fn set_combustivel(&mut self, value: u8) -> Result<()> {
        self.update(|d| d.set_combustivel(value))
    }

    /// 残り追加可能な写真枚数
    pub fn remaining_photos(&self) -> usize {
        self.max_photos.saturating_sub(self.draft.fotos.len())
    }

    pub fn add_photos(&mut self, photos: Vec<EncodedImage>) -> Result<()> {
        let remaining = self.remaining_photos();
        if photos.len() > remaining {
            return Err(FleetError::PhotoLimitExceeded { remaining });
        }
        self.update(|d| d.fotos.extend(photos))
    }

    pub fn remove_photo(&mut self, index: usize) -> Result<bool> {
        if index >= self.draft.fotos.len() {
            return Ok(false);
        }
        self.update(|d| {
            d.fotos.remove(index);
        })?;
        Ok(true)
    }

    /// 描き込み結果（合成画像 + 履歴）を保存
    pub fn set_annotation(&mut self, image: Option<EncodedImage>, history: StrokeHistory) -> Result<()> {
        self.update(|d| {
            d.desenho_avaria = image;
            d.desenho_avaria_history = history;
        })
    }

    /// 次の段階へ（現在の段階の検証に通った場合のみ）
    pub fn next(&mut self) -> Result<Step> {
        ensure_step(self.current_step(), &self.draft, self.operation)?;
        if !self.is_last_step() {
            self.step_index += 1;
        }
        Ok(self.current_step())
    }

    /// 前の段階へ（最初の段階では何もしない）
    pub fn back(&mut self) -> Step {
        self.step_index = self.step_index.saturating_sub(1);
        self.current_step()
    }

    /// リモートでKMを検証（同じ値の結果は再利用）
    pub async fn check_km<V: KmValidator>(&mut self, validator: &V) -> Result<bool> {
        let km = self.draft.km_for_api();
        if let Some(check) = &self.km_check {
            if check.km == km {
                return Ok(check.valid);
            }
        }

        let valid = match validator.validate_km(self.operation, &self.ids, &km).await {
            Ok(valid) => valid,
            Err(FleetError::KmCheckFailed(msg)) => return Err(FleetError::KmCheckFailed(msg)),
            Err(e) => return Err(FleetError::KmCheckFailed(e.to_string())),
        };
        log::info!("KM {} の検証結果: {}", km, if valid { "OK" } else { "NG" });
        self.km_check = Some(KmCheck { km, valid });
        Ok(valid)
    }

    /// 入力直後のKM確認
    ///
    /// 結果はキャッシュされるので、値を変えなければ最終確認で再度問い合わせない。
    pub async fn km_status<V: KmValidator>(&mut self, validator: &V) -> KmStatus {
        if self.draft.km.trim().is_empty() {
            return KmStatus::Missing;
        }
        match self.check_km(validator).await {
            Ok(true) => KmStatus::Accepted,
            Ok(false) => KmStatus::Rejected,
            Err(e) => KmStatus::Unverified(e),
        }
    }

    /// 最終確認
    ///
    /// 全必須項目とKMを検証し、通ればペイロードを組み立てて下書きを消す。
    /// 失敗時は下書きに触れない。送信中（前回の `Submission` が生きている間）の
    /// 呼び出しは `SubmitInFlight`。
    pub async fn confirm<V: KmValidator>(&mut self, validator: &V) -> Result<Submission> {
        let guard = self.gate.try_acquire().ok_or(FleetError::SubmitInFlight)?;

        ensure_all(&self.draft, self.operation)?;

        if !self.check_km(validator).await? {
            return Err(FleetError::KmRejected);
        }

        let payload = Payload::build(self.operation, &self.ids, &self.draft, &self.chave_api);
        self.store.clear(&self.key)?;
        log::info!("{} の下書きを削除して送信準備完了", self.key);
        Ok(Submission {
            payload,
            _guard: guard,
        })
    }

    /// 送信に失敗したとき、メモリ上の下書きをストアに書き戻す
    pub fn restore_draft(&mut self) -> Result<()> {
        save_draft(&mut self.store, &self.key, &self.draft)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.draft.is_pristine()
    }

    /// 下書きを破棄して最初の段階に戻る
    pub fn discard(&mut self) -> Result<()> {
        self.store.clear(&self.key)?;
        self.draft = FormDraft::for_driver(self.draft.condutor.clone());
        self.step_index = 0;
        self.km_check = None;
        Ok(())
    }

    /// キャンセル
    ///
    /// 未保存の入力があれば `confirm_prompt` で確認する。破棄したら true。
    pub fn cancel<F>(&mut self, confirm_prompt: F) -> Result<bool>
    where
        F: FnOnce(&str) -> bool,
    {
        if self.has_unsaved_changes() && !confirm_prompt(UNSAVED_CHANGES_PROMPT) {
            return Ok(false);
        }
        self.discard()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::MemoryDraftStore;

    fn ids() -> SessionIds {
        SessionIds {
            id_frota: "7".into(),
            id_frota_historico: None,
        }
    }

    #[test]
    fn test_submit_gate() {
        let gate = SubmitGate::new();
        let guard = gate.try_acquire().unwrap();
        assert!(gate.is_busy());
        assert!(gate.try_acquire().is_none());
        drop(guard);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn test_back_is_noop_on_first_step() {
        let mut form = FormController::mount(OperationType::CheckIn, ids(), "Ana", "", MemoryDraftStore::new());
        assert_eq!(form.back(), Step::Details);
        assert_eq!(form.step_number(), 1);
    }

    #[test]
    fn test_every_update_is_persisted() {
        let mut form = FormController::mount(OperationType::CheckIn, ids(), "Ana", "", MemoryDraftStore::new());
        form.set_km("12a3").unwrap();
        let stored = load_draft(form.store(), form.draft_key()).unwrap();
        assert_eq!(stored.km, "123");
    }

    #[test]
    fn test_photo_limit() {
        let mut form = FormController::mount(OperationType::CheckIn, ids(), "Ana", "", MemoryDraftStore::new())
            .with_max_photos(2);
        let photo = EncodedImage::jpeg(vec![1]);
        form.add_photos(vec![photo.clone()]).unwrap();
        let err = form.add_photos(vec![photo.clone(), photo]).unwrap_err();
        assert!(matches!(err, FleetError::PhotoLimitExceeded { remaining: 1 }));
        assert_eq!(form.draft().fotos.len(), 1);
        assert!(form.remove_photo(0).unwrap());
        assert!(!form.remove_photo(0).unwrap());
    }

    #[test]
    fn test_cancel_pristine_needs_no_prompt() {
        let mut form = FormController::mount(OperationType::CheckOut, ids(), "Ana", "", MemoryDraftStore::new());
        let discarded = form.cancel(|_| panic!("prompt should not be shown")).unwrap();
        assert!(discarded);
    }

    #[test]
    fn test_cancel_declined_keeps_draft() {
        let mut form = FormController::mount(OperationType::CheckOut, ids(), "Ana", "", MemoryDraftStore::new());
        form.set_km("100").unwrap();
        let mut asked = String::new();
        let discarded = form
            .cancel(|msg| {
                asked = msg.to_string();
                false
            })
            .unwrap();
        assert!(!discarded);
        assert_eq!(asked, UNSAVED_CHANGES_PROMPT);
        assert_eq!(form.draft().km, "100");

        assert!(form.cancel(|_| true).unwrap());
        assert!(form.draft().km.is_empty());
        assert_eq!(form.draft().condutor, "Ana");
        assert!(form.store().is_empty());
    }
}
