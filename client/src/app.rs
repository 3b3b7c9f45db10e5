use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Element, Event, HtmlButtonElement, HtmlCanvasElement, HtmlElement,
    PointerEvent,
};

use inkboard_shared::{ClientMessage, Segment, ServerMessage};

use crate::cursors::CursorLayer;
use crate::dom::{event_position, get_element, resize_canvas, set_status};
use crate::render::{draw_segment, redraw};
use crate::state::{Gesture, State, DEFAULT_COLOR, DEFAULT_WIDTH};
use crate::util::make_stroke_id;
use crate::ws::{connect_ws, WsEvent};

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;

    let canvas: HtmlCanvasElement = get_element(&document, "board")?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Missing canvas context"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    ctx.set_line_cap("round");
    ctx.set_line_join("round");

    let undo_button: HtmlButtonElement = get_element(&document, "undo")?;
    let app_el: HtmlElement = get_element(&document, "app")?;
    let status_el: Element = get_element(&document, "status")?;

    let state = Rc::new(RefCell::new(State {
        canvas: canvas.clone(),
        ctx,
        segments: Vec::new(),
        color: DEFAULT_COLOR.to_string(),
        width: DEFAULT_WIDTH,
        gesture: None,
        board_width: 0.0,
        board_height: 0.0,
    }));
    let cursors = Rc::new(RefCell::new(CursorLayer::new(app_el)));

    set_status(&status_el, "connecting", "Connecting...");
    {
        let mut state = state.borrow_mut();
        resize_canvas(&window, &mut state);
    }

    let sender = {
        let message_state = state.clone();
        let cursors = cursors.clone();
        let document = document.clone();
        let status_el = status_el.clone();
        connect_ws(&window, move |event| match event {
            WsEvent::Open => set_status(&status_el, "open", "Live connection"),
            WsEvent::Close => set_status(&status_el, "closed", "Offline"),
            WsEvent::Error => set_status(&status_el, "closed", "Connection error"),
            WsEvent::Message(message) => {
                let mut state = message_state.borrow_mut();
                match message {
                    ServerMessage::Init { color, history } => {
                        state.color = color;
                        state.segments = history;
                        redraw(&state);
                    }
                    ServerMessage::Draw {
                        x0,
                        y0,
                        x1,
                        y1,
                        color,
                        width,
                        stroke_id,
                    } => {
                        let segment = Segment {
                            x0,
                            y0,
                            x1,
                            y1,
                            color,
                            width,
                            stroke_id,
                            author_id: None,
                        };
                        draw_segment(&state.ctx, &segment);
                        state.segments.push(segment);
                    }
                    // Undo may have removed entries from anywhere in the
                    // log, so the board is rebuilt wholesale.
                    ServerMessage::BoardRefresh { history } => {
                        state.segments = history;
                        redraw(&state);
                    }
                    ServerMessage::Cursor {
                        id,
                        x,
                        y,
                        color,
                        name,
                    } => {
                        cursors.borrow_mut().update(&document, &id, x, y, &color, &name);
                    }
                    ServerMessage::UserDisconnected { id } => {
                        cursors.borrow_mut().remove(&id);
                    }
                }
            }
        })?
    };

    {
        let resize_state = state.clone();
        let window_cb = window.clone();
        let onresize = Closure::<dyn FnMut()>::new(move || {
            let mut state = resize_state.borrow_mut();
            resize_canvas(&window_cb, &mut state);
        });
        window.add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
        onresize.forget();
    }

    {
        let undo_sender = sender.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            undo_sender.send(&ClientMessage::Undo);
        });
        undo_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let down_state = state.clone();
        let down_canvas = canvas.clone();
        let ondown = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            if event.button() != 0 {
                return;
            }
            event.prevent_default();
            let Some((x, y)) = event_position(&down_canvas, &event) else {
                return;
            };
            let _ = down_canvas.set_pointer_capture(event.pointer_id());
            down_state.borrow_mut().gesture = Some(Gesture {
                stroke_id: make_stroke_id(),
                last_x: x,
                last_y: y,
            });
        });
        canvas.add_event_listener_with_callback("pointerdown", ondown.as_ref().unchecked_ref())?;
        ondown.forget();
    }

    {
        let move_state = state.clone();
        let move_canvas = canvas.clone();
        let move_sender = sender.clone();
        let onmove = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            let Some((x, y)) = event_position(&move_canvas, &event) else {
                return;
            };
            // Cursor presence goes out whether or not ink is flowing.
            move_sender.send(&ClientMessage::Cursor { x, y });

            let mut state = move_state.borrow_mut();
            let Some(gesture) = &mut state.gesture else {
                return;
            };
            let (x0, y0) = (gesture.last_x, gesture.last_y);
            let stroke_id = gesture.stroke_id.clone();
            gesture.last_x = x;
            gesture.last_y = y;

            let segment = Segment {
                x0,
                y0,
                x1: x,
                y1: y,
                color: state.color.clone(),
                width: state.width,
                stroke_id: Some(stroke_id.clone()),
                author_id: None,
            };
            draw_segment(&state.ctx, &segment);
            state.segments.push(segment);
            move_sender.send(&ClientMessage::Draw {
                x0,
                y0,
                x1: x,
                y1: y,
                color: state.color.clone(),
                width: state.width,
                stroke_id: Some(stroke_id),
            });
        });
        canvas.add_event_listener_with_callback("pointermove", onmove.as_ref().unchecked_ref())?;
        onmove.forget();
    }

    for kind in ["pointerup", "pointercancel", "pointerout"] {
        let up_state = state.clone();
        let onup = Closure::<dyn FnMut(PointerEvent)>::new(move |_| {
            up_state.borrow_mut().gesture = None;
        });
        canvas.add_event_listener_with_callback(kind, onup.as_ref().unchecked_ref())?;
        onup.forget();
    }

    Ok(())
}
