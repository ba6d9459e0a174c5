//! Control notices: deletions and rate limits

use crate::message::{id_field, RawMessage};

/// Status deletion notice (`delete.status`)
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionEvent {
    raw: RawMessage,
}

message_view!(DeletionEvent);

impl DeletionEvent {
    /// Id of the deleted status
    pub fn status_id(&self) -> Option<u64> {
        id_field(self.raw.pointer("/delete/status"), "id")
    }

    /// Id of the user who owned the status
    pub fn user_id(&self) -> Option<u64> {
        id_field(self.raw.pointer("/delete/status"), "user_id")
    }
}

/// Track limit notice (`limit.track`)
///
/// Sent when a filtered stream matched more statuses than it is allowed
/// to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitEvent {
    raw: RawMessage,
}

message_view!(LimitEvent);

impl LimitEvent {
    /// Number of undelivered statuses since the connection opened
    pub fn track(&self) -> Option<u64> {
        self.raw.pointer("/limit/track")?.as_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deletion_ids() {
        let event = DeletionEvent::new(RawMessage::from(json!({
            "delete": {"status": {"id": 1, "user_id": 2}}
        })));
        assert_eq!(event.status_id(), Some(1));
        assert_eq!(event.user_id(), Some(2));
    }

    #[test]
    fn test_deletion_ids_from_strings() {
        let event = DeletionEvent::new(RawMessage::from(json!({
            "delete": {"status": {"id_str": "10", "user_id_str": "20"}}
        })));
        assert_eq!(event.status_id(), Some(10));
        assert_eq!(event.user_id(), Some(20));
    }

    #[test]
    fn test_limit_track() {
        let event = LimitEvent::new(RawMessage::from(json!({"limit": {"track": 5}})));
        assert_eq!(event.track(), Some(5));
    }
}
