//! 参照画像 + ストローク履歴の合成
//!
//! 出力は常に (参照画像, 履歴, 寸法) の純粋関数。同じ入力なら同じPNGバイト列になる。

use crate::error::{FleetError, Result};
use fleet_checkin_common::{CanvasGeometry, EncodedImage, Stroke, StrokeHistory};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Transform};

/// 表示寸法が不明なときの書き出し用の太さ倍率
const EXPORT_FALLBACK_WIDTH_SCALE: f32 = 2.0;

/// 参照画像を保持する合成器
#[derive(Debug, Clone)]
pub struct Compositor {
    /// 白背景に合成済み（不透明）の原寸画像
    reference: RgbaImage,
}

impl Compositor {
    pub fn new(reference: &DynamicImage) -> Self {
        Self {
            reference: flatten_on_white(reference.to_rgba8()),
        }
    }

    /// 参照画像なし（白紙）
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            reference: RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([255, 255, 255, 255])),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FleetError::FileNotFound(path.display().to_string()));
        }
        let image = image::open(path)?;
        log::debug!("参照画像を読み込み: {} ({}x{})", path.display(), image.width(), image.height());
        Ok(Self::new(&image))
    }

    pub fn natural_size(&self) -> (u32, u32) {
        self.reference.dimensions()
    }

    /// 原寸のジオメトリ
    pub fn natural_geometry(&self) -> Option<CanvasGeometry> {
        let (w, h) = self.natural_size();
        CanvasGeometry::natural(w, h)
    }

    /// 指定寸法でラスタ化
    ///
    /// `width_scale` はストロークの太さに掛ける倍率（表示描画では 1.0）。
    pub fn render_pixels(
        &self,
        history: &StrokeHistory,
        width: u32,
        height: u32,
        width_scale: f32,
    ) -> Result<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(FleetError::Render(format!("tamanho inválido: {}x{}", width, height)));
        }

        let base = if self.reference.dimensions() == (width, height) {
            self.reference.clone()
        } else {
            imageops::resize(&self.reference, width, height, FilterType::Triangle)
        };

        if history.is_empty() {
            return Ok(base);
        }

        let size = tiny_skia::IntSize::from_wh(width, height)
            .ok_or_else(|| FleetError::Render("pixmap".into()))?;
        let mut pixmap = Pixmap::from_vec(base.into_raw(), size)
            .ok_or_else(|| FleetError::Render("pixmap".into()))?;

        for stroke in history.iter() {
            draw_stroke(&mut pixmap, stroke, width, height, width_scale);
        }

        RgbaImage::from_raw(width, height, pixmap.take())
            .ok_or_else(|| FleetError::Render("buffer".into()))
    }

    /// 表示寸法で描画してPNGにする
    pub fn render(&self, history: &StrokeHistory, geometry: &CanvasGeometry) -> Result<EncodedImage> {
        let pixels = self.render_pixels(history, geometry.display_width, geometry.display_height, 1.0)?;
        encode_png(pixels)
    }

    /// 原寸で描画してPNGにする（書き出し用）
    ///
    /// ストロークの太さは表示時の見た目に合わせて拡大する。
    pub fn render_export(&self, history: &StrokeHistory, display: Option<&CanvasGeometry>) -> Result<EncodedImage> {
        let (width, height) = self.natural_size();
        let width_scale = match display {
            Some(g) if g.scale_x > 0.0 => (1.0 / g.scale_x) as f32,
            _ => EXPORT_FALLBACK_WIDTH_SCALE,
        };
        let pixels = self.render_pixels(history, width, height, width_scale)?;
        encode_png(pixels)
    }
}

fn draw_stroke(pixmap: &mut Pixmap, stroke: &Stroke, width: u32, height: u32, width_scale: f32) {
    let color = stroke.color();
    let line_width = (stroke.size() * width_scale).max(0.5);

    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, 255);
    paint.anti_alias = true;

    let to_pixel = |x: f64, y: f64| ((x * width as f64) as f32, (y * height as f64) as f32);
    let points = stroke.points();

    // 1点だけのストロークは点として描く
    if points.len() == 1 {
        let (cx, cy) = to_pixel(points[0].x, points[0].y);
        if let Some(dot) = PathBuilder::from_circle(cx, cy, line_width / 2.0) {
            pixmap.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
        }
        return;
    }

    let mut pb = PathBuilder::new();
    let (x0, y0) = to_pixel(points[0].x, points[0].y);
    pb.move_to(x0, y0);
    for point in &points[1..] {
        let (x, y) = to_pixel(point.x, point.y);
        pb.line_to(x, y);
    }

    if let Some(path) = pb.finish() {
        let line = tiny_skia::Stroke {
            width: line_width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint, &line, Transform::identity(), None);
    }
}

/// 透過部分を白背景に合成
fn flatten_on_white(mut image: RgbaImage) -> RgbaImage {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        if a == 255 {
            continue;
        }
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        *pixel = Rgba([blend(r), blend(g), blend(b), 255]);
    }
    image
}

pub(crate) fn encode_png(pixels: RgbaImage) -> Result<EncodedImage> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(pixels).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(EncodedImage::png(bytes))
}
