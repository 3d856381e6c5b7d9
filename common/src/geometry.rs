//! キャンバスの座標変換
//!
//! 正規化座標（0.0〜1.0）とピクセル座標の相互変換、
//! コンテナ幅からの表示サイズ計算、最大辺に収める縮小サイズ計算。

use crate::stroke::{PointerPos, StrokePoint};

/// 表示中キャンバスの寸法（リサイズのたびに再計算、永続化しない）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    pub display_width: u32,
    pub display_height: u32,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl CanvasGeometry {
    /// コンテナ幅に合わせ、参照画像のアスペクト比で高さを決める
    ///
    /// いずれかの寸法が0なら None。
    pub fn fit_width(container_width: u32, natural_width: u32, natural_height: u32) -> Option<Self> {
        if container_width == 0 || natural_width == 0 || natural_height == 0 {
            return None;
        }
        let aspect = natural_width as f64 / natural_height as f64;
        let display_height = ((container_width as f64 / aspect).round() as u32).max(1);
        Some(Self {
            display_width: container_width,
            display_height,
            scale_x: container_width as f64 / natural_width as f64,
            scale_y: display_height as f64 / natural_height as f64,
        })
    }

    /// 参照画像の原寸
    pub fn natural(natural_width: u32, natural_height: u32) -> Option<Self> {
        Self::fit_width(natural_width, natural_width, natural_height)
    }

    /// 正規化座標 → この表示サイズでのピクセル座標
    pub fn to_pixel(&self, point: &StrokePoint) -> (f32, f32) {
        denormalize(point.x, point.y, self.display_width, self.display_height)
    }

    /// 表示上のピクセル位置 → クランプ済みの正規化座標
    pub fn normalize_pointer(&self, pixel_x: f64, pixel_y: f64) -> PointerPos {
        normalize(pixel_x, pixel_y, self.display_width, self.display_height)
    }
}

/// ピクセル座標を正規化座標（クランプ済み）に変換
pub fn normalize(pixel_x: f64, pixel_y: f64, width: u32, height: u32) -> PointerPos {
    if width == 0 || height == 0 {
        return PointerPos::new(0.0, 0.0);
    }
    PointerPos::new(pixel_x / width as f64, pixel_y / height as f64).clamped()
}

/// 正規化座標をピクセル座標に変換
pub fn denormalize(x: f64, y: f64, width: u32, height: u32) -> (f32, f32) {
    ((x * width as f64) as f32, (y * height as f64) as f32)
}

/// 長辺が `max_dimension` 以下になる寸法（アスペクト比維持、拡大はしない）
pub fn bound_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width == 0 || height == 0 || max_dimension == 0 {
        return (width, height);
    }
    let longer = width.max(height);
    if longer <= max_dimension {
        return (width, height);
    }
    let ratio = max_dimension as f64 / longer as f64;
    let scaled = |v: u32| ((v as f64 * ratio).round() as u32).clamp(1, max_dimension);
    if width >= height {
        (max_dimension, scaled(height))
    } else {
        (scaled(width), max_dimension)
    }
}
