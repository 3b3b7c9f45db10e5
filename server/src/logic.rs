use std::sync::Arc;

use inkboard_shared::{ClientMessage, Segment, ServerMessage};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::state::Board;

/// Applies one inbound message against the board and returns the messages
/// to fan out, plus whether the sender is included in the fan-out. `None`
/// means nothing goes on the wire: a rejected payload, a cursor from an
/// unknown connection, or an undo that found nothing to remove.
pub fn apply_client_message(
    board: &mut Board,
    sender: Uuid,
    message: ClientMessage,
) -> Option<(Vec<ServerMessage>, bool)> {
    match message {
        ClientMessage::Draw {
            x0,
            y0,
            x1,
            y1,
            color,
            width,
            stroke_id,
        } => {
            let stroke_id = normalize_stroke_id(stroke_id)?;
            let color = sanitize_color(color);
            let segment = Segment {
                x0,
                y0,
                x1,
                y1,
                color: color.clone(),
                width,
                stroke_id: stroke_id.clone(),
                author_id: None,
            };
            if let Err(error) = board.append_segment(segment, sender) {
                log::debug!("draw rejected conn={sender} error={error}");
                return None;
            }
            Some((
                vec![ServerMessage::Draw {
                    x0,
                    y0,
                    x1,
                    y1,
                    color,
                    width,
                    stroke_id,
                }],
                false,
            ))
        }
        ClientMessage::Undo => {
            // Newest-first scan for the sender's latest segment. A tagged
            // segment takes its whole stroke with it, wherever the other
            // segments sit in the log; an untagged one is removed alone.
            let author = sender.to_string();
            let stroke_id = board
                .segments
                .iter()
                .rfind(|segment| segment.author_id.as_deref() == Some(author.as_str()))
                .map(|segment| segment.stroke_id.clone())?;
            let removed = match stroke_id {
                Some(stroke_id) => board.remove_stroke(&stroke_id),
                None => board.remove_last_segment_by_author(sender),
            };
            if removed == 0 {
                return None;
            }
            log::debug!(
                "undo conn={sender} removed={removed} remaining={}",
                board.segments.len()
            );
            // Arbitrary interior entries may be gone, so clients get the
            // full log back, the requester included.
            Some((
                vec![ServerMessage::BoardRefresh {
                    history: board.snapshot(),
                }],
                true,
            ))
        }
        ClientMessage::Cursor { x, y } => {
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            let identity = board.identities.get(&sender)?;
            Some((
                vec![ServerMessage::Cursor {
                    id: sender.to_string(),
                    x,
                    y,
                    color: identity.color.clone(),
                    name: identity.name.clone(),
                }],
                false,
            ))
        }
    }
}

pub async fn broadcast_except(
    board: &Arc<RwLock<Board>>,
    sender: Uuid,
    message: ServerMessage,
) {
    let mut stale = Vec::new();
    {
        let board = board.read().await;
        for (id, tx) in board.peers.iter() {
            if *id == sender {
                continue;
            }
            if tx.send(message.clone()).is_err() {
                stale.push(*id);
            }
        }
    }

    if !stale.is_empty() {
        let mut board = board.write().await;
        for id in stale {
            board.peers.remove(&id);
        }
    }
}

pub async fn broadcast_all(board: &Arc<RwLock<Board>>, message: ServerMessage) {
    let mut stale = Vec::new();
    {
        let board = board.read().await;
        for (id, tx) in board.peers.iter() {
            if tx.send(message.clone()).is_err() {
                stale.push(*id);
            }
        }
    }

    if !stale.is_empty() {
        let mut board = board.write().await;
        for id in stale {
            board.peers.remove(&id);
        }
    }
}

/// An empty tag is treated as absent, matching how untagged legacy
/// segments are recorded. Oversized tags drop the whole payload.
fn normalize_stroke_id(stroke_id: Option<String>) -> Option<Option<String>> {
    match stroke_id {
        None => Some(None),
        Some(id) if id.is_empty() => Some(None),
        Some(id) if id.len() > 64 => None,
        Some(id) => Some(Some(id)),
    }
}

fn sanitize_color(mut color: String) -> String {
    if color.is_empty() {
        return "#1f1f1f".to_string();
    }
    if color.len() > 32 {
        color.truncate(32);
    }
    color
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(x0: f32, stroke_id: Option<&str>) -> ClientMessage {
        ClientMessage::Draw {
            x0,
            y0: 0.0,
            x1: x0 + 1.0,
            y1: 1.0,
            color: "#1f1f1f".to_string(),
            width: 3.0,
            stroke_id: stroke_id.map(|id| id.to_string()),
        }
    }

    fn stroke_ids(board: &Board) -> Vec<Option<String>> {
        board
            .segments
            .iter()
            .map(|segment| segment.stroke_id.clone())
            .collect()
    }

    #[test]
    fn draw_appends_and_echoes_to_others_only() {
        let mut board = Board::new();
        let sender = Uuid::new_v4();
        let (messages, include_sender) =
            apply_client_message(&mut board, sender, draw(0.0, Some("a"))).unwrap();

        assert!(!include_sender);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            ServerMessage::Draw { x0, stroke_id, .. } => {
                assert_eq!(*x0, 0.0);
                assert_eq!(stroke_id.as_deref(), Some("a"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(board.segments.len(), 1);
        assert_eq!(
            board.segments[0].author_id.as_deref(),
            Some(sender.to_string().as_str())
        );
    }

    #[test]
    fn malformed_draw_is_dropped_without_a_message() {
        let mut board = Board::new();
        let sender = Uuid::new_v4();
        let bad_coordinate = ClientMessage::Draw {
            x0: f32::NAN,
            y0: 0.0,
            x1: 1.0,
            y1: 1.0,
            color: "#000".to_string(),
            width: 3.0,
            stroke_id: Some("a".to_string()),
        };
        assert!(apply_client_message(&mut board, sender, bad_coordinate).is_none());

        let bad_width = ClientMessage::Draw {
            x0: 0.0,
            y0: 0.0,
            x1: 1.0,
            y1: 1.0,
            color: "#000".to_string(),
            width: 0.0,
            stroke_id: Some("a".to_string()),
        };
        assert!(apply_client_message(&mut board, sender, bad_width).is_none());
        assert!(board.segments.is_empty());
    }

    #[test]
    fn undo_removes_the_whole_stroke_across_interleaved_authors() {
        // A draws S1,S2 (stroke "a"); B draws S3 (stroke "b"); A draws S4
        // (stroke "a"). A undoes: the log becomes [S3] and everyone,
        // including A, gets the refresh.
        let mut board = Board::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        apply_client_message(&mut board, alice, draw(0.0, Some("a"))).unwrap();
        apply_client_message(&mut board, alice, draw(1.0, Some("a"))).unwrap();
        apply_client_message(&mut board, bob, draw(2.0, Some("b"))).unwrap();
        apply_client_message(&mut board, alice, draw(3.0, Some("a"))).unwrap();

        let (messages, include_sender) =
            apply_client_message(&mut board, alice, ClientMessage::Undo).unwrap();

        assert!(include_sender);
        assert_eq!(stroke_ids(&board), vec![Some("b".to_string())]);
        match &messages[0] {
            ServerMessage::BoardRefresh { history } => {
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].stroke_id.as_deref(), Some("b"));
                assert_eq!(
                    history[0].author_id.as_deref(),
                    Some(bob.to_string().as_str())
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn undo_never_touches_another_authors_segments() {
        let mut board = Board::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        apply_client_message(&mut board, bob, draw(0.0, Some("b"))).unwrap();

        assert!(apply_client_message(&mut board, alice, ClientMessage::Undo).is_none());
        assert_eq!(board.segments.len(), 1);
    }

    #[test]
    fn undo_with_no_prior_segments_is_silent() {
        let mut board = Board::new();
        let sender = Uuid::new_v4();
        assert!(apply_client_message(&mut board, sender, ClientMessage::Undo).is_none());
        assert!(board.segments.is_empty());
    }

    #[test]
    fn repeated_undo_after_a_no_op_stays_a_no_op() {
        let mut board = Board::new();
        let sender = Uuid::new_v4();
        apply_client_message(&mut board, sender, draw(0.0, Some("a"))).unwrap();
        assert!(apply_client_message(&mut board, sender, ClientMessage::Undo).is_some());
        assert!(apply_client_message(&mut board, sender, ClientMessage::Undo).is_none());
        assert!(apply_client_message(&mut board, sender, ClientMessage::Undo).is_none());
        assert!(board.segments.is_empty());
    }

    #[test]
    fn legacy_segments_undo_one_at_a_time_most_recent_first() {
        let mut board = Board::new();
        let sender = Uuid::new_v4();
        apply_client_message(&mut board, sender, draw(0.0, None)).unwrap();
        apply_client_message(&mut board, sender, draw(1.0, None)).unwrap();

        let (messages, include_sender) =
            apply_client_message(&mut board, sender, ClientMessage::Undo).unwrap();
        assert!(include_sender);
        assert!(matches!(&messages[0], ServerMessage::BoardRefresh { history } if history.len() == 1));
        assert_eq!(board.segments[0].x0, 0.0);

        let (messages, _) = apply_client_message(&mut board, sender, ClientMessage::Undo).unwrap();
        assert!(matches!(&messages[0], ServerMessage::BoardRefresh { history } if history.is_empty()));
        assert!(board.segments.is_empty());
    }

    #[test]
    fn legacy_fallback_applies_when_the_latest_segment_is_untagged() {
        // An older tagged stroke does not change what undo targets: the
        // sender's most recent segment decides.
        let mut board = Board::new();
        let sender = Uuid::new_v4();
        apply_client_message(&mut board, sender, draw(0.0, Some("a"))).unwrap();
        apply_client_message(&mut board, sender, draw(1.0, None)).unwrap();

        apply_client_message(&mut board, sender, ClientMessage::Undo).unwrap();
        assert_eq!(stroke_ids(&board), vec![Some("a".to_string())]);
    }

    #[test]
    fn empty_stroke_tag_is_recorded_as_legacy() {
        let mut board = Board::new();
        let sender = Uuid::new_v4();
        apply_client_message(&mut board, sender, draw(0.0, Some(""))).unwrap();
        assert_eq!(stroke_ids(&board), vec![None]);
    }

    #[test]
    fn oversized_stroke_tag_drops_the_payload() {
        let mut board = Board::new();
        let sender = Uuid::new_v4();
        let tag = "x".repeat(65);
        assert!(apply_client_message(&mut board, sender, draw(0.0, Some(&tag))).is_none());
        assert!(board.segments.is_empty());
    }

    #[test]
    fn cursor_is_decorated_with_the_senders_identity() {
        let mut board = Board::new();
        let sender = Uuid::new_v4();
        let identity = board.assign_identity(sender);

        let (messages, include_sender) =
            apply_client_message(&mut board, sender, ClientMessage::Cursor { x: 4.0, y: 5.0 })
                .unwrap();
        assert!(!include_sender);
        match &messages[0] {
            ServerMessage::Cursor {
                id,
                x,
                y,
                color,
                name,
            } => {
                assert_eq!(id, &sender.to_string());
                assert_eq!((*x, *y), (4.0, 5.0));
                assert_eq!(color, &identity.color);
                assert_eq!(name, &identity.name);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn cursor_without_identity_or_with_bad_coordinates_is_dropped() {
        let mut board = Board::new();
        let sender = Uuid::new_v4();
        assert!(
            apply_client_message(&mut board, sender, ClientMessage::Cursor { x: 1.0, y: 1.0 })
                .is_none()
        );

        board.assign_identity(sender);
        assert!(apply_client_message(
            &mut board,
            sender,
            ClientMessage::Cursor {
                x: f32::NAN,
                y: 1.0
            }
        )
        .is_none());
    }

    #[test]
    fn late_joiner_snapshot_matches_arrival_order() {
        let mut board = Board::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        apply_client_message(&mut board, alice, draw(0.0, Some("a"))).unwrap();
        apply_client_message(&mut board, bob, draw(1.0, Some("b"))).unwrap();
        apply_client_message(&mut board, alice, draw(2.0, Some("a"))).unwrap();

        let xs: Vec<_> = board.snapshot().iter().map(|segment| segment.x0).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }
}
