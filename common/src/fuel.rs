//! 燃料ゲージ（8セグメント）

/// セグメント数
pub const SEGMENTS: u8 = 8;

/// 新規下書きの初期値（%）
pub const DEFAULT_FUEL: u8 = 50;

/// セグメントの色区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelBand {
    Inactive,
    Empty,
    Low,
    Mid,
    High,
    Full,
}

/// セグメント `index`（0始まり）をクリックしたときの値
pub fn segment_value(index: u8) -> u8 {
    let index = index.min(SEGMENTS - 1);
    ((index as f64 + 1.0) / SEGMENTS as f64 * 100.0).round() as u8
}

/// 塗りつぶすセグメント数
pub fn filled_segments(value: u8) -> u8 {
    ((value.min(100) as f64 / 100.0) * SEGMENTS as f64).round() as u8
}

/// セグメントの表示区分
pub fn segment_band(index: u8, value: u8) -> FuelBand {
    if index >= filled_segments(value) {
        return FuelBand::Inactive;
    }
    let position = index as f64 / SEGMENTS as f64;
    if position < 0.125 {
        FuelBand::Empty
    } else if position < 0.375 {
        FuelBand::Low
    } else if position < 0.625 {
        FuelBand::Mid
    } else if position < 0.875 {
        FuelBand::High
    } else {
        FuelBand::Full
    }
}

/// 端末表示用のゲージ文字列（例: `E [■■■■□□□□] F 50%`）
pub fn gauge_line(value: u8) -> String {
    let bar: String = (0..SEGMENTS)
        .map(|i| match segment_band(i, value) {
            FuelBand::Inactive => '□',
            _ => '■',
        })
        .collect();
    format!("E [{}] F {}%", bar, value.min(100))
}
