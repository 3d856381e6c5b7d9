//! 下書き保存テスト
//!
//! ファイル保存の読み書き・破損時の扱い・キーの分離を検証

use fleet_checkin::controller::FormController;
use fleet_checkin::draft::{load_draft, save_draft, DraftStore, FileDraftStore};
use fleet_checkin_common::{draft_key, EncodedImage, FormDraft, OperationType, SessionIds};
use tempfile::tempdir;

fn ids(id: &str) -> SessionIds {
    SessionIds {
        id_frota: id.into(),
        id_frota_historico: Some("900".into()),
    }
}

/// 保存した下書きをそのまま読み戻せる
#[test]
fn test_file_store_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut store = FileDraftStore::new(dir.path().join("drafts"));

    let mut draft = FormDraft::for_driver("João");
    draft.set_km("45.230");
    draft.fotos.push(EncodedImage::jpeg(vec![1, 2, 3, 4]));
    let key = draft_key(OperationType::CheckOut, "15");

    save_draft(&mut store, &key, &draft).expect("下書き保存失敗");
    assert!(store.path_for(&key).exists());

    let reopened = FileDraftStore::new(dir.path().join("drafts"));
    assert_eq!(load_draft(&reopened, &key), Some(draft));
}

/// 壊れたファイルは新規扱い
#[test]
fn test_corrupt_file_starts_fresh() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut store = FileDraftStore::new(dir.path());
    let key = draft_key(OperationType::CheckIn, "15");
    store.set(&key, "{\"km\": ").unwrap();

    let form = FormController::mount(OperationType::CheckIn, ids("15"), "Ana", "", store);
    assert!(form.draft().km.is_empty());
    assert_eq!(form.draft().condutor, "Ana");
}

/// 操作種別・車両ごとに別のキー
#[test]
fn test_keys_are_isolated() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = FileDraftStore::new(dir.path());

    let mut checkin = FormController::mount(OperationType::CheckIn, ids("15"), "Ana", "", store.clone());
    checkin.set_km("100").unwrap();

    let checkout = FormController::mount(OperationType::CheckOut, ids("15"), "Ana", "", store.clone());
    assert!(checkout.draft().km.is_empty());

    let other = FormController::mount(OperationType::CheckIn, ids("16"), "Ana", "", store.clone());
    assert!(other.draft().km.is_empty());

    let restored = FormController::mount(OperationType::CheckIn, ids("15"), "Ana", "", store);
    assert_eq!(restored.draft().km, "100");
}

/// 破棄すると保存ファイルも消える
#[test]
fn test_discard_removes_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = FileDraftStore::new(dir.path());
    let mut form = FormController::mount(OperationType::CheckIn, ids("15"), "Ana", "", store);
    form.set_km("250").unwrap();
    let path = form.store().path_for(form.draft_key());
    assert!(path.exists());

    form.discard().unwrap();
    assert!(!path.exists());
    assert!(form.draft().is_pristine());
}

/// 下書きJSONのフィールド名は camelCase
#[test]
fn test_draft_json_field_names() {
    let mut draft = FormDraft::for_driver("Ana");
    draft.teve_abastecimento = true;
    let json = serde_json::to_value(&draft).unwrap();
    assert_eq!(json["teveAbastecimento"], serde_json::json!(true));
    assert!(json.get("desenhoAvariaHistory").is_some());
}
