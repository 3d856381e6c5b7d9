//! 描き込みキャンバステスト
//!
//! 書き出し寸法・履歴からの復元・リサイズの集約を検証

use fleet_checkin::canvas::{Compositor, DrawingCanvas, ResizeCoordinator};
use fleet_checkin_common::{StrokeHistory, PALETTE};
use image::{DynamicImage, Rgba, RgbaImage};

fn draw_line(canvas: &mut DrawingCanvas, from: (f64, f64), to: (f64, f64)) {
    canvas.pointer_down(from.0, from.1).unwrap();
    canvas.pointer_move((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
    canvas.pointer_move(to.0, to.1);
    assert!(canvas.pointer_up().unwrap());
}

/// 原寸で書き出し、ストロークが参照画像の上に描かれる
#[test]
fn test_export_uses_natural_size() {
    let mut canvas = DrawingCanvas::new(Compositor::blank(400, 200), StrokeHistory::new(), 200).unwrap();
    canvas.set_color(PALETTE[0]);
    canvas.set_size(8.0);
    draw_line(&mut canvas, (10.0, 50.0), (190.0, 50.0));

    let exported = canvas.export().unwrap();
    assert_eq!(exported.mime, "image/png");

    let decoded = image::load_from_memory(&exported.bytes).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (400, 200));

    let center = decoded.get_pixel(200, 100);
    assert!(center[0] > 200 && center[1] < 120, "stroke pixel: {:?}", center);
    let corner = decoded.get_pixel(5, 5);
    assert_eq!(corner, &Rgba([255, 255, 255, 255]));
}

/// 保存した履歴から復元すると同じ画像になる
#[test]
fn test_restore_from_serialized_history() {
    let mut canvas = DrawingCanvas::new(Compositor::blank(300, 300), StrokeHistory::new(), 300).unwrap();
    draw_line(&mut canvas, (20.0, 20.0), (280.0, 280.0));
    draw_line(&mut canvas, (280.0, 20.0), (20.0, 280.0));
    let rendered = canvas.output().cloned().unwrap();

    let json = serde_json::to_string(canvas.history()).unwrap();
    let history: StrokeHistory = serde_json::from_str(&json).unwrap();
    assert_eq!(history.len(), 2);

    let restored = DrawingCanvas::new(Compositor::blank(300, 300), history, 300).unwrap();
    assert_eq!(restored.output(), Some(&rendered));
}

/// 参照画像の透明部分は白で埋める
#[test]
fn test_transparent_reference_flattened() {
    let reference = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 0])));
    let compositor = Compositor::new(&reference);
    let pixels = compositor.render_pixels(&StrokeHistory::new(), 40, 20, 1.0).unwrap();
    assert_eq!(pixels.get_pixel(10, 10), &Rgba([255, 255, 255, 255]));
}

/// 連続したリサイズ通知は最後の幅だけ反映される
#[test]
fn test_resize_burst_collapses() {
    let mut resize = ResizeCoordinator::new(1000, 500);
    for width in [320, 330, 340, 360] {
        resize.notify(width);
    }
    assert!(resize.has_pending());

    let geometry = resize.tick().unwrap();
    assert_eq!(geometry.display_width, 360);
    assert_eq!(geometry.display_height, 180);
    assert!(resize.tick().is_none());

    resize.notify(360);
    assert!(resize.tick().is_none());
}

#[test]
fn test_zero_size_render_is_error() {
    let compositor = Compositor::blank(10, 10);
    assert!(compositor.render_pixels(&StrokeHistory::new(), 0, 10, 1.0).is_err());
}
