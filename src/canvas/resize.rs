//! コンテナサイズ変化の集約
//!
//! `notify` は何度呼ばれても最後の幅だけを保持し、`tick` ごとに高々1回だけ
//! 新しいジオメトリを返す。ストローク履歴には触れない。

use fleet_checkin_common::CanvasGeometry;

#[derive(Debug, Clone)]
pub struct ResizeCoordinator {
    natural_width: u32,
    natural_height: u32,
    current: Option<CanvasGeometry>,
    pending_width: Option<u32>,
}

impl ResizeCoordinator {
    pub fn new(natural_width: u32, natural_height: u32) -> Self {
        Self {
            natural_width,
            natural_height,
            current: None,
            pending_width: None,
        }
    }

    /// コンテナ幅の変化を記録（描画はしない）
    pub fn notify(&mut self, container_width: u32) {
        self.pending_width = Some(container_width);
    }

    pub fn has_pending(&self) -> bool {
        self.pending_width.is_some()
    }

    /// 保留中の変化を反映する
    ///
    /// 再描画が必要なときだけ新しいジオメトリを返す。
    pub fn tick(&mut self) -> Option<CanvasGeometry> {
        let width = self.pending_width.take()?;
        let geometry = CanvasGeometry::fit_width(width, self.natural_width, self.natural_height)?;
        if self.current == Some(geometry) {
            return None;
        }
        log::debug!(
            "キャンバスをリサイズ: {}x{} (scale {:.3})",
            geometry.display_width,
            geometry.display_height,
            geometry.scale_x
        );
        self.current = Some(geometry);
        Some(geometry)
    }

    pub fn geometry(&self) -> Option<CanvasGeometry> {
        self.current
    }
}
