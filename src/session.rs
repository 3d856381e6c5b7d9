//! 1回の利用セッション（ログイン確認 → QR検証 → 車両データ → 送信）

use crate::api::{FleetBackend, VehicleData};
use crate::cancel::CancelToken;
use crate::controller::{FormController, KmValidator};
use crate::draft::DraftStore;
use crate::error::{FleetError, Result};
use fleet_checkin_common::{OperationType, PayloadProfile, SessionIds};
use std::future::Future;

/// セッション開始時に確定する情報
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub operation: OperationType,
    pub ids: SessionIds,
    pub vehicle: VehicleData,
}

/// 送信日時（UTC, "YYYY-MM-DD HH:MM:SS"）
pub fn operation_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// リンクのパラメータを検証してQR・車両データを取得
pub async fn open_session<B: FleetBackend>(
    backend: &B,
    id_frota: &str,
    id_empresa: &str,
    cancel: &CancelToken,
) -> Result<SessionContext> {
    let id_frota = id_frota.trim();
    let id_empresa = id_empresa.trim();
    if id_frota.is_empty() || id_empresa.is_empty() {
        return Err(FleetError::InvalidLink(
            "os parâmetros idFrota e idEmpresa são obrigatórios".into(),
        ));
    }

    if !cancel.run(backend.check_login()).await? {
        return Err(FleetError::SessionExpired);
    }

    let qr = cancel.run(backend.validate_qr(id_frota, id_empresa)).await??;
    log::info!(
        "QR受理: {} (idFrotaHistorico={:?})",
        qr.operation.title(),
        qr.id_frota_historico
    );

    let ids = SessionIds {
        id_frota: id_frota.to_string(),
        id_frota_historico: qr.id_frota_historico.clone(),
    };
    let vehicle = cancel.run(backend.fetch_vehicle(&ids, &qr)).await??;

    // 車両データ側の履歴IDを優先
    let ids = SessionIds {
        id_frota_historico: vehicle.id_frota_historico.clone().or(ids.id_frota_historico),
        ..ids
    };

    Ok(SessionContext {
        operation: qr.operation,
        ids,
        vehicle,
    })
}

/// 最終確認して送信
///
/// 送信が始まったら取り消さない。送信失敗時は下書きを書き戻す。
pub async fn submit<S, B>(
    form: &mut FormController<S>,
    backend: &B,
    profile: &PayloadProfile,
) -> Result<String>
where
    S: DraftStore,
    B: FleetBackend + KmValidator,
{
    let submission = form.confirm(backend).await?;
    let timestamp = operation_timestamp();

    match backend.submit(&submission.payload, profile, &timestamp).await {
        Ok(message) => {
            log::info!("送信完了 ({}): {}", timestamp, message);
            Ok(message)
        }
        Err(e) => {
            log::error!("送信失敗: {}", e);
            if let Err(restore_err) = form.restore_draft() {
                log::error!("下書きの書き戻しに失敗: {}", restore_err);
            }
            Err(e)
        }
    }
}

/// リトライ可能なエラーのあいだ `ask_retry` が true を返す限り繰り返す
pub async fn retrying<T, F, Fut, P>(mut attempt: F, mut ask_retry: P) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnMut(&FleetError) -> bool,
{
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && ask_retry(&e) => {
                log::warn!("再試行: {}", e);
            }
            Err(e) => return Err(e),
        }
    }
}
