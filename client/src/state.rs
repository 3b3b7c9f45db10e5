use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use inkboard_shared::Segment;

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_WIDTH: f32 = 3.0;

/// An in-flight pointer gesture: one stroke id shared by every segment
/// emitted until the pointer lifts.
pub struct Gesture {
    pub stroke_id: String,
    pub last_x: f32,
    pub last_y: f32,
}

pub struct State {
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
    pub segments: Vec<Segment>,
    pub color: String,
    pub width: f32,
    pub gesture: Option<Gesture>,
    pub board_width: f64,
    pub board_height: f64,
}
