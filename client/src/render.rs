use web_sys::CanvasRenderingContext2d;

use inkboard_shared::Segment;

use crate::state::State;

pub fn draw_segment(ctx: &CanvasRenderingContext2d, segment: &Segment) {
    ctx.begin_path();
    ctx.move_to(segment.x0 as f64, segment.y0 as f64);
    ctx.line_to(segment.x1 as f64, segment.y1 as f64);
    ctx.set_stroke_style_str(&segment.color);
    ctx.set_line_width(segment.width as f64);
    ctx.stroke();
}

/// Full repaint from the local segment list, front to back. Replay order
/// is paint order, so overlapping strokes come out the same everywhere.
pub fn redraw(state: &State) {
    state
        .ctx
        .clear_rect(0.0, 0.0, state.board_width, state.board_height);
    for segment in &state.segments {
        draw_segment(&state.ctx, segment);
    }
}
