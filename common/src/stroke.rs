//! 手書きマーキング（損傷箇所の描き込み）のデータモデル
//!
//! 座標はすべてキャンバス幅・高さに対する割合（0.0〜1.0）で保持する。
//! 表示解像度が変わってもストローク履歴は変わらない。
//!
//! - StrokePoint: 1点（座標 + 色 + 太さ）
//! - Stroke: 1回のドラッグで描かれた点列（1点以上）
//! - StrokeHistory: ストロークの列（追加・undo・clearのみ）
//! - StrokeRecorder: idle → drawing → idle の状態機械

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ストロークの色（"#rrggbb" 形式でシリアライズ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StrokeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl StrokeColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for StrokeColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let expanded: String = match hex.len() {
            // "#f00" 形式
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(format!("Invalid color: {}", s)),
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| format!("Invalid color: {}", s))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for StrokeColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StrokeColor> for String {
    fn from(color: StrokeColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for StrokeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// 選択可能な色（赤・橙・黄・緑）
pub const PALETTE: [StrokeColor; 4] = [
    StrokeColor::rgb(0xef, 0x44, 0x44),
    StrokeColor::rgb(0xf9, 0x73, 0x16),
    StrokeColor::rgb(0xea, 0xb3, 0x08),
    StrokeColor::rgb(0x22, 0xc5, 0x5e),
];

/// 選択可能な太さ（px、表示解像度基準）
pub const BRUSH_SIZES: [f32; 4] = [2.0, 4.0, 8.0, 12.0];

/// 現在のブラシ設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub color: StrokeColor,
    pub size: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: PALETTE[0],
            size: 4.0,
        }
    }
}

/// ポインタ位置（キャンバスに対する割合、範囲外も受け付ける）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPos {
    pub x: f64,
    pub y: f64,
}

impl PointerPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// [0,1]×[0,1] にクランプ（NaNは0扱い）
    pub fn clamped(self) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self {
            x: clamp(self.x),
            y: clamp(self.y),
        }
    }
}

/// ストロークの1点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub color: StrokeColor,
    pub size: f32,
}

/// 1本のストローク（1点以上）
///
/// 描画時の色と太さは先頭の点のものを使う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StrokePoint>", into = "Vec<StrokePoint>")]
pub struct Stroke {
    points: Vec<StrokePoint>,
}

impl Stroke {
    /// 空の点列からは作れない
    pub fn new(points: Vec<StrokePoint>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    pub fn color(&self) -> StrokeColor {
        self.points[0].color
    }

    pub fn size(&self) -> f32 {
        self.points[0].size
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 常にfalse（Strokeは1点以上）
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl TryFrom<Vec<StrokePoint>> for Stroke {
    type Error = String;

    fn try_from(points: Vec<StrokePoint>) -> Result<Self, Self::Error> {
        Stroke::new(points).ok_or_else(|| "stroke must contain at least one point".to_string())
    }
}

impl From<Stroke> for Vec<StrokePoint> {
    fn from(stroke: Stroke) -> Self {
        stroke.points
    }
}

/// ストローク履歴（描き込みの唯一の永続表現）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeHistory {
    strokes: Vec<Stroke>,
}

impl StrokeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// 最後のストロークを取り除く（空なら何もしない）
    pub fn undo(&mut self) -> Option<Stroke> {
        self.strokes.pop()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter()
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// 保存済みJSONから読み込む
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl FromIterator<Stroke> for StrokeHistory {
    fn from_iter<I: IntoIterator<Item = Stroke>>(iter: I) -> Self {
        Self {
            strokes: iter.into_iter().collect(),
        }
    }
}

/// レコーダーの状態
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderState {
    Idle,
    Drawing(Vec<StrokePoint>),
}

/// ポインタ入力からストローク履歴を組み立てる状態機械
///
/// 同時に描けるストロークは1本だけ。pointer-leave でも必ず `end()` を呼ぶこと。
#[derive(Debug, Clone)]
pub struct StrokeRecorder {
    history: StrokeHistory,
    state: RecorderState,
    brush: Brush,
}

impl Default for StrokeRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl StrokeRecorder {
    pub fn new() -> Self {
        Self::with_history(StrokeHistory::new())
    }

    /// 下書きから復元した履歴で開始
    pub fn with_history(history: StrokeHistory) -> Self {
        Self {
            history,
            state: RecorderState::Idle,
            brush: Brush::default(),
        }
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    pub fn set_color(&mut self, color: StrokeColor) {
        self.brush.color = color;
    }

    /// 太さは正の値のみ受け付ける
    pub fn set_size(&mut self, size: f32) {
        if size.is_finite() && size > 0.0 {
            self.brush.size = size;
        }
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, RecorderState::Drawing(_))
    }

    /// 描画中の点列
    pub fn in_progress(&self) -> Option<&[StrokePoint]> {
        match &self.state {
            RecorderState::Drawing(points) => Some(points),
            RecorderState::Idle => None,
        }
    }

    fn point_at(&self, pos: PointerPos) -> StrokePoint {
        let pos = pos.clamped();
        StrokePoint {
            x: pos.x,
            y: pos.y,
            color: self.brush.color,
            size: self.brush.size,
        }
    }

    /// 新しいストロークを開始
    ///
    /// 描画中に呼ばれた場合は、それまでの点列を確定してから始める。
    pub fn begin(&mut self, pos: PointerPos) {
        if self.is_drawing() {
            self.end();
        }
        let point = self.point_at(pos);
        self.state = RecorderState::Drawing(vec![point]);
    }

    /// 描画中のストロークに点を追加（idleなら何もしない）
    pub fn extend(&mut self, pos: PointerPos) -> bool {
        let point = self.point_at(pos);
        match &mut self.state {
            RecorderState::Drawing(points) => {
                points.push(point);
                true
            }
            RecorderState::Idle => false,
        }
    }

    /// 描画中のストロークを履歴に確定
    ///
    /// 確定した場合は true。
    pub fn end(&mut self) -> bool {
        match std::mem::replace(&mut self.state, RecorderState::Idle) {
            RecorderState::Drawing(points) => match Stroke::new(points) {
                Some(stroke) => {
                    self.history.push(stroke);
                    true
                }
                None => false,
            },
            RecorderState::Idle => false,
        }
    }

    pub fn undo(&mut self) -> Option<Stroke> {
        self.history.undo()
    }

    /// 履歴と描画中の点列をすべて破棄
    pub fn clear(&mut self) {
        self.history.clear();
        self.state = RecorderState::Idle;
    }

    pub fn history(&self) -> &StrokeHistory {
        &self.history
    }

    pub fn into_history(self) -> StrokeHistory {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse_and_display() {
        let color: StrokeColor = "#ef4444".parse().unwrap();
        assert_eq!(color, PALETTE[0]);
        assert_eq!(color.to_string(), "#ef4444");

        let short: StrokeColor = "#f00".parse().unwrap();
        assert_eq!(short, StrokeColor::rgb(255, 0, 0));

        assert!("#zzzzzz".parse::<StrokeColor>().is_err());
        assert!("red".parse::<StrokeColor>().is_err());
    }

    #[test]
    fn test_stroke_point_json_shape() {
        let point = StrokePoint {
            x: 0.5,
            y: 0.25,
            color: PALETTE[3],
            size: 4.0,
        };
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("\"color\":\"#22c55e\""));

        let history: StrokeHistory =
            serde_json::from_str(r##"[[{"x":0.1,"y":0.2,"color":"#ef4444","size":4}]]"##).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.strokes()[0].size(), 4.0);
    }

    #[test]
    fn test_empty_stroke_rejected_on_deserialize() {
        let result: Result<StrokeHistory, _> = serde_json::from_str("[[]]");
        assert!(result.is_err());
    }

    #[test]
    fn test_begin_extend_end_commits_clamped_points() {
        let mut recorder = StrokeRecorder::new();
        recorder.begin(PointerPos::new(0.1, 0.1));
        recorder.extend(PointerPos::new(1.5, -0.2));
        recorder.extend(PointerPos::new(0.5, 0.5));
        assert!(recorder.end());

        let stroke = &recorder.history().strokes()[0];
        let coords: Vec<(f64, f64)> = stroke.points().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(coords, vec![(0.1, 0.1), (1.0, 0.0), (0.5, 0.5)]);
        assert!(!recorder.is_drawing());
    }

    #[test]
    fn test_extend_without_begin_is_noop() {
        let mut recorder = StrokeRecorder::new();
        assert!(!recorder.extend(PointerPos::new(0.3, 0.3)));
        assert!(!recorder.end());
        assert!(recorder.history().is_empty());
    }

    #[test]
    fn test_single_point_stroke_is_committed() {
        let mut recorder = StrokeRecorder::new();
        recorder.begin(PointerPos::new(0.4, 0.6));
        assert!(recorder.end());
        assert_eq!(recorder.history().strokes()[0].len(), 1);
    }

    #[test]
    fn test_begin_while_drawing_commits_previous() {
        let mut recorder = StrokeRecorder::new();
        recorder.begin(PointerPos::new(0.1, 0.1));
        recorder.extend(PointerPos::new(0.2, 0.2));
        recorder.begin(PointerPos::new(0.9, 0.9));
        recorder.end();
        assert_eq!(recorder.history().len(), 2);
        assert_eq!(recorder.history().strokes()[0].len(), 2);
    }

    #[test]
    fn test_brush_applies_to_new_points() {
        let mut recorder = StrokeRecorder::new();
        recorder.set_color(PALETTE[2]);
        recorder.set_size(12.0);
        recorder.set_size(-1.0);
        recorder.begin(PointerPos::new(0.0, 0.0));
        recorder.end();

        let stroke = &recorder.history().strokes()[0];
        assert_eq!(stroke.color(), PALETTE[2]);
        assert_eq!(stroke.size(), 12.0);
    }

    #[test]
    fn test_undo_and_clear() {
        let mut recorder = StrokeRecorder::new();
        assert!(recorder.undo().is_none());

        for i in 0..3 {
            recorder.begin(PointerPos::new(0.1 * i as f64, 0.5));
            recorder.end();
        }
        assert_eq!(recorder.history().len(), 3);

        recorder.undo();
        assert_eq!(recorder.history().len(), 2);

        recorder.begin(PointerPos::new(0.5, 0.5));
        recorder.clear();
        assert!(recorder.history().is_empty());
        assert!(!recorder.is_drawing());
    }

    #[test]
    fn test_nan_pointer_clamps_to_origin() {
        let pos = PointerPos::new(f64::NAN, 2.0).clamped();
        assert_eq!(pos, PointerPos::new(0.0, 1.0));
    }
}
