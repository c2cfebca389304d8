//! Live Message Types
//!
//! Wire format of the live connection. Inbound frames are JSON objects tagged
//! by `type`; the only outbound frame is the keepalive token.

use serde::Deserialize;
use thiserror::Error;

use crate::model::{ClassificationEvent, StatisticsSnapshot};

/// Text frame sent on every keepalive tick
pub const KEEPALIVE_TOKEN: &str = "ping";

/// Messages sent from the backend to the dashboard
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Full replacement statistics snapshot
    Stats { data: StatisticsSnapshot },
    /// A new classification result
    Classification { data: ClassificationEvent },
    /// Any tag this client does not know; ignored
    #[serde(other)]
    Unknown,
}

/// Errors decoding an inbound frame
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

impl InboundMessage {
    /// Decode a text frame
    pub fn decode(text: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn test_decode_stats() {
        let json = r#"{"type":"stats","data":{"category_counts":{"fresh_fruit":3,"spoiled_fruit":1,"other":0},"total":4,"avg_confidence":0.92,"avg_processing_time":0.15}}"#;
        match InboundMessage::decode(json).unwrap() {
            InboundMessage::Stats { data } => {
                assert_eq!(data.total, 4);
                assert_eq!(data.category_counts.fresh_fruit, 3);
            }
            other => panic!("Expected Stats, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_classification() {
        let json = r#"{"type":"classification","data":{"classification":"spoiled_fruit","confidence":0.81}}"#;
        match InboundMessage::decode(json).unwrap() {
            InboundMessage::Classification { data } => {
                assert_eq!(data.classification, Category::SpoiledFruit);
            }
            other => panic!("Expected Classification, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let json = r#"{"type":"pong","data":{"anything":true}}"#;
        assert!(matches!(
            InboundMessage::decode(json).unwrap(),
            InboundMessage::Unknown
        ));
    }

    #[test]
    fn test_malformed_frames() {
        assert!(InboundMessage::decode("not json").is_err());
        assert!(InboundMessage::decode(r#"{"data":{}}"#).is_err());
        assert!(InboundMessage::decode(r#"{"type":"classification","data":{"confidence":0.5}}"#).is_err());
        assert!(InboundMessage::decode(r#"{"type":"stats"}"#).is_err());
    }
}
