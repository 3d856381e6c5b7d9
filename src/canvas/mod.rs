//! 損傷箇所の描き込みキャンバス
//!
//! ストローク記録・合成・リサイズをまとめたウィジェット。
//! 履歴が変わるたびに合成画像を作り直し、`output()` で参照できる。

mod compositor;
mod resize;

pub use compositor::Compositor;
pub use resize::ResizeCoordinator;

use crate::error::Result;
use fleet_checkin_common::{CanvasGeometry, EncodedImage, StrokeColor, StrokeHistory, StrokeRecorder};

pub struct DrawingCanvas {
    recorder: StrokeRecorder,
    compositor: Compositor,
    resize: ResizeCoordinator,
    output: Option<EncodedImage>,
}

impl DrawingCanvas {
    /// 保存済みの履歴から復元して初期幅で描画する
    pub fn new(compositor: Compositor, history: StrokeHistory, container_width: u32) -> Result<Self> {
        let (w, h) = compositor.natural_size();
        let mut canvas = Self {
            recorder: StrokeRecorder::with_history(history),
            compositor,
            resize: ResizeCoordinator::new(w, h),
            output: None,
        };
        canvas.resize.notify(container_width);
        canvas.frame()?;
        Ok(canvas)
    }

    pub fn geometry(&self) -> Option<CanvasGeometry> {
        self.resize.geometry()
    }

    pub fn set_color(&mut self, color: StrokeColor) {
        self.recorder.set_color(color);
    }

    pub fn set_size(&mut self, size: f32) {
        self.recorder.set_size(size);
    }

    /// 表示上のピクセル位置でストローク開始
    pub fn pointer_down(&mut self, px: f64, py: f64) -> Result<()> {
        if let Some(geometry) = self.geometry() {
            // 描画中のストロークがあれば確定するので描き直す
            let was_drawing = self.recorder.is_drawing();
            self.recorder.begin(geometry.normalize_pointer(px, py));
            if was_drawing {
                self.redraw()?;
            }
        }
        Ok(())
    }

    pub fn pointer_move(&mut self, px: f64, py: f64) {
        if let Some(geometry) = self.geometry() {
            self.recorder.extend(geometry.normalize_pointer(px, py));
        }
    }

    /// ポインタを離した / キャンバス外に出た
    pub fn pointer_up(&mut self) -> Result<bool> {
        let committed = self.recorder.end();
        if committed {
            self.redraw()?;
        }
        Ok(committed)
    }

    pub fn undo(&mut self) -> Result<bool> {
        let removed = self.recorder.undo().is_some();
        if removed {
            self.redraw()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.recorder.clear();
        self.redraw()
    }

    /// コンテナ幅の変化（次の `frame` でまとめて反映）
    pub fn container_resized(&mut self, width: u32) {
        self.resize.notify(width);
    }

    /// 保留中のリサイズを反映する。再描画したら true
    pub fn frame(&mut self) -> Result<bool> {
        match self.resize.tick() {
            Some(_) => {
                self.redraw()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn redraw(&mut self) -> Result<()> {
        if let Some(geometry) = self.geometry() {
            self.output = Some(self.compositor.render(self.recorder.history(), &geometry)?);
        }
        Ok(())
    }

    /// 最新の合成画像（表示解像度）
    pub fn output(&self) -> Option<&EncodedImage> {
        self.output.as_ref()
    }

    /// 原寸で書き出し
    pub fn export(&self) -> Result<EncodedImage> {
        self.compositor
            .render_export(self.recorder.history(), self.geometry().as_ref())
    }

    pub fn history(&self) -> &StrokeHistory {
        self.recorder.history()
    }

    pub fn into_history(self) -> StrokeHistory {
        self.recorder.into_history()
    }
}
