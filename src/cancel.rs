//! 画面（コンポーネント）の寿命に結びつけたキャンセル
//!
//! キャンセル後に届いた応答は捨てる。

use crate::error::{FleetError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// キャンセルされるまで待つ
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// `future` を実行し、先にキャンセルされたら結果を捨てて `Cancelled` を返す
    pub async fn run<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(FleetError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(FleetError::Cancelled),
            output = future => {
                // 完了と同時にキャンセルされた場合も古い応答として捨てる
                if self.is_cancelled() {
                    Err(FleetError::Cancelled)
                } else {
                    Ok(output)
                }
            }
        }
    }

    /// drop時にキャンセルするガード
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            token: self.clone(),
        }
    }
}

pub struct CancelOnDrop {
    token: CancelToken,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_completes() {
        let token = CancelToken::new();
        let value = token.run(async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_stale_response_discarded() {
        let token = CancelToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let result = token
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            })
            .await;
        assert!(matches!(result, Err(FleetError::Cancelled)));
    }

    #[tokio::test]
    async fn test_drop_guard_cancels() {
        let token = CancelToken::new();
        {
            let _guard = token.drop_guard();
        }
        assert!(token.is_cancelled());
        assert!(token.run(async { 1 }).await.is_err());
    }
}
