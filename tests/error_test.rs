//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use fleet_checkin::api::{describe_malformed, ResponseContext};
use fleet_checkin::error::{FleetError, QrRejection};
use fleet_checkin::scanner;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"));
    assert!(matches!(result, Err(FleetError::FolderNotFound(_))));
}

/// 画像のないフォルダをスキャンした場合
#[test]
fn test_scan_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("test.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("data.json"), "{}").unwrap();

    let result = scanner::scan_folder(dir.path()).unwrap();
    assert!(result.is_empty());
}

/// 存在しない入力ファイル
#[test]
fn test_expand_missing_input() {
    let result = scanner::expand_inputs(&[PathBuf::from("/nonexistent/foto.jpg")]);
    assert!(matches!(result, Err(FleetError::FileNotFound(_))));
}

/// FleetErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        FleetError::Config("teste".to_string()),
        FleetError::FileNotFound("foto.jpg".to_string()),
        FleetError::FolderNotFound("/fotos".to_string()),
        FleetError::KmCheckFailed("Erro 500".to_string()),
        FleetError::SessionExpired,
        FleetError::InvalidLink("sem idFrota".to_string()),
        FleetError::SubmitInFlight,
        FleetError::FileTooLarge {
            name: "grande.jpg".to_string(),
            size_mb: 25.4,
            max_mb: 20,
        },
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "Display should not be empty for {:?}", err);
        assert!(!err.toast_title().is_empty());
    }
}

#[test]
fn test_file_too_large_message() {
    let err = FleetError::FileTooLarge {
        name: "grande.jpg".to_string(),
        size_mb: 25.44,
        max_mb: 20,
    };
    assert_eq!(err.to_string(), "Arquivo muito grande: grande.jpg (25.4 MB, máximo 20 MB)");
    assert_eq!(err.toast_title(), "Arquivo muito grande");
}

#[test]
fn test_qr_rejection_titles() {
    let wrong = FleetError::QrRejected {
        kind: QrRejection::WrongCompany,
        message: "Favor realizar login na empresa correta".into(),
    };
    assert_eq!(wrong.toast_title(), "Empresa incorreta");
    assert_eq!(wrong.user_message(), "Favor realizar login na empresa correta");
    assert!(!wrong.is_retryable());
}

/// HTMLのエラーページからメッセージを取り出す
#[test]
fn test_malformed_response_message() {
    let body = "<html><p class=\"error\">Campo obrigatório ausente</p></html>";
    let message = describe_malformed(body, ResponseContext::Submit);
    assert!(message.contains("Campo obrigatório ausente"), "{}", message);

    let message = describe_malformed("not json", ResponseContext::Lookup);
    assert!(!message.is_empty());
}
