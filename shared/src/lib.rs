use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// One drawn line segment. `stroke_id` ties together every segment of a
/// single pointer-down..pointer-up gesture; segments recorded before the
/// field existed carry `None`. `author_id` is stamped by the server at
/// ingestion and is never taken from the client.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct Segment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub color: String,
    pub width: f32,
    #[serde(rename = "strokeId", default, skip_serializing_if = "Option::is_none")]
    pub stroke_id: Option<String>,
    #[serde(rename = "authorId", default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "draw")]
    Draw {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        color: String,
        width: f32,
        #[serde(rename = "strokeId", default)]
        stroke_id: Option<String>,
    },
    #[serde(rename = "undo")]
    Undo,
    #[serde(rename = "cursor")]
    Cursor { x: f32, y: f32 },
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "init")]
    Init { color: String, history: Vec<Segment> },
    #[serde(rename = "draw")]
    Draw {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        color: String,
        width: f32,
        #[serde(rename = "strokeId", default)]
        stroke_id: Option<String>,
    },
    #[serde(rename = "board_refresh")]
    BoardRefresh { history: Vec<Segment> },
    #[serde(rename = "cursor")]
    Cursor {
        id: String,
        x: f32,
        y: f32,
        color: String,
        name: String,
    },
    #[serde(rename = "user_disconnected")]
    UserDisconnected { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_payload_uses_wire_field_names() {
        let message = ClientMessage::Draw {
            x0: 1.0,
            y0: 2.0,
            x1: 3.0,
            y1: 4.0,
            color: "#1f1f1f".to_string(),
            width: 3.0,
            stroke_id: Some("s-1".to_string()),
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"type\":\"draw\""));
        assert!(json.contains("\"strokeId\":\"s-1\""));
        assert!(!json.contains("stroke_id"));
    }

    #[test]
    fn draw_payload_without_stroke_id_parses_as_legacy() {
        let json = r##"{"type":"draw","x0":0,"y0":0,"x1":5,"y1":5,"color":"#000","width":2}"##;
        let message: ClientMessage = serde_json::from_str(json).unwrap();
        match message {
            ClientMessage::Draw { stroke_id, .. } => assert!(stroke_id.is_none()),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn client_supplied_author_is_not_part_of_draw() {
        // Unknown fields are dropped on the way in, so a forged authorId
        // never reaches the handlers.
        let json = r##"{"type":"draw","x0":0,"y0":0,"x1":1,"y1":1,"color":"#000","width":2,"authorId":"evil"}"##;
        assert!(serde_json::from_str::<ClientMessage>(json).is_ok());
    }

    #[test]
    fn board_refresh_history_carries_author_and_stroke() {
        let message = ServerMessage::BoardRefresh {
            history: vec![Segment {
                x0: 0.0,
                y0: 0.0,
                x1: 1.0,
                y1: 1.0,
                color: "#000".to_string(),
                width: 2.0,
                stroke_id: Some("s-1".to_string()),
                author_id: Some("c-1".to_string()),
            }],
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"type\":\"board_refresh\""));
        assert!(json.contains("\"strokeId\":\"s-1\""));
        assert!(json.contains("\"authorId\":\"c-1\""));
    }

    #[test]
    fn undo_has_no_payload() {
        let message: ClientMessage = serde_json::from_str(r#"{"type":"undo"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Undo));
    }
}
