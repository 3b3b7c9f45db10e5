use std::collections::HashMap;
use std::sync::Arc;

use inkboard_shared::{Segment, ServerMessage};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub board: Arc<RwLock<Board>>,
}

/// Per-connection color and display name, valid for the connection's
/// lifetime only.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub color: String,
    pub name: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum MalformedSegment {
    #[error("segment has non-finite coordinates")]
    NonFiniteCoordinates,
    #[error("segment width must be positive, got {0}")]
    NonPositiveWidth(f32),
}

/// The authoritative board: the ordered segment log plus the live
/// connections. The log is append-only except for undo removals; order is
/// server arrival order and doubles as redraw order.
#[derive(Default)]
pub struct Board {
    pub segments: Vec<Segment>,
    pub identities: HashMap<Uuid, Identity>,
    pub peers: HashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign_identity(&mut self, connection_id: Uuid) -> Identity {
        let identity = Identity {
            color: color_for(connection_id),
            name: name_for(connection_id),
        };
        self.identities.insert(connection_id, identity.clone());
        identity
    }

    /// Validates and appends. The author stamp always comes from the
    /// connection, never from the payload.
    pub fn append_segment(
        &mut self,
        mut segment: Segment,
        author: Uuid,
    ) -> Result<(), MalformedSegment> {
        for value in [segment.x0, segment.y0, segment.x1, segment.y1] {
            if !value.is_finite() {
                return Err(MalformedSegment::NonFiniteCoordinates);
            }
        }
        if !segment.width.is_finite() || segment.width <= 0.0 {
            return Err(MalformedSegment::NonPositiveWidth(segment.width));
        }
        segment.author_id = Some(author.to_string());
        self.segments.push(segment);
        Ok(())
    }

    /// Removes every segment tagged with `stroke_id`, wherever it sits in
    /// the log. Returns how many were removed; 0 for an unknown id.
    pub fn remove_stroke(&mut self, stroke_id: &str) -> usize {
        let before = self.segments.len();
        self.segments
            .retain(|segment| segment.stroke_id.as_deref() != Some(stroke_id));
        before - self.segments.len()
    }

    /// Legacy fallback for untagged segments: removes the single most
    /// recent segment authored by `author`, if any.
    pub fn remove_last_segment_by_author(&mut self, author: Uuid) -> usize {
        let author = author.to_string();
        match self
            .segments
            .iter()
            .rposition(|segment| segment.author_id.as_deref() == Some(author.as_str()))
        {
            Some(index) => {
                self.segments.remove(index);
                1
            }
            None => 0,
        }
    }

    pub fn snapshot(&self) -> Vec<Segment> {
        self.segments.clone()
    }

    /// Forgets the connection's identity. Drawn segments stay on the
    /// board; only an explicit undo removes them.
    pub fn drop_identity(&mut self, connection_id: Uuid) {
        self.identities.remove(&connection_id);
    }
}

fn color_for(connection_id: Uuid) -> String {
    let bytes = connection_id.as_bytes();
    format!("#{:02x}{:02x}{:02x}", bytes[0], bytes[1], bytes[2])
}

fn name_for(connection_id: Uuid) -> String {
    let hex = connection_id.simple().to_string();
    format!("User {}", &hex[..4])
}
