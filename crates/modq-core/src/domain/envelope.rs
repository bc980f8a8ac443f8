//! Message envelopes carried on the moderation and dead-letter topics.
//!
//! Both are plain JSON objects (UTF-8). Timestamps travel as the ISO-8601
//! string they were produced with and are never re-formatted on decode.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::CodecError;
use super::ids::{ItemId, TaskId};

/// One moderation request: `{"task_id": int, "item_id": int, "timestamp": "<ISO-8601>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRequestMessage {
    pub task_id: TaskId,
    pub item_id: ItemId,
    pub timestamp: String,
}

impl ModerationRequestMessage {
    pub fn new(task_id: TaskId, item_id: ItemId, timestamp: DateTime<Utc>) -> Self {
        Self {
            task_id,
            item_id,
            timestamp: timestamp.to_rfc3339(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode and validate a payload.
    ///
    /// Rejects missing fields, negative ids and timestamps that are not ISO-8601.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let message: Self = serde_json::from_slice(bytes)?;
        parse_iso8601(&message.timestamp)?;
        Ok(message)
    }

    /// The request timestamp as UTC.
    pub fn requested_at(&self) -> Result<DateTime<Utc>, CodecError> {
        parse_iso8601(&self.timestamp)
    }
}

/// Record written to the dead-letter topic once the retry budget is exhausted.
///
/// Write-once: nothing in this system reads it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterMessage {
    pub original_message: String,
    pub error: String,
    pub timestamp: String,
    pub retry_count: u32,
}

impl DeadLetterMessage {
    pub fn new(
        original_message: impl Into<String>,
        error: impl Into<String>,
        retry_count: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            original_message: original_message.into(),
            error: error.into(),
            timestamp: at.to_rfc3339(),
            retry_count,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Accepts RFC 3339 (with offset) and naive `YYYY-MM-DDTHH:MM:SS[.ffffff]`,
/// the latter read as UTC.
fn parse_iso8601(raw: &str) -> Result<DateTime<Utc>, CodecError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| CodecError::InvalidTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[test]
    fn request_roundtrip_preserves_triple() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();
        let message = ModerationRequestMessage::new(TaskId::new(2), ItemId::new(5), at);

        let bytes = message.encode().unwrap();
        let back = ModerationRequestMessage::decode(&bytes).unwrap();

        assert_eq!(back.task_id, TaskId::new(2));
        assert_eq!(back.item_id, ItemId::new(5));
        assert_eq!(back.timestamp, message.timestamp);
        assert_eq!(back.requested_at().unwrap(), at);
    }

    #[test]
    fn request_wire_shape() {
        let raw = br#"{"task_id": 1, "item_id": 999, "timestamp": "2025-01-01T00:00:00.123456"}"#;
        let message = ModerationRequestMessage::decode(raw).unwrap();
        assert_eq!(message.task_id, TaskId::new(1));
        assert_eq!(message.item_id, ItemId::new(999));
        // naive timestamps are kept verbatim
        assert_eq!(message.timestamp, "2025-01-01T00:00:00.123456");

        let v: serde_json::Value = serde_json::from_slice(&message.encode().unwrap()).unwrap();
        assert_eq!(v["task_id"], 1);
        assert_eq!(v["item_id"], 999);
        assert_eq!(v["timestamp"], "2025-01-01T00:00:00.123456");
    }

    #[rstest]
    #[case::not_json(&b"not json"[..])]
    #[case::missing_item(&br#"{"task_id": 1, "timestamp": "2025-01-01T00:00:00Z"}"#[..])]
    #[case::negative_task(&br#"{"task_id": -1, "item_id": 2, "timestamp": "2025-01-01T00:00:00Z"}"#[..])]
    #[case::string_id(&br#"{"task_id": "1", "item_id": 2, "timestamp": "2025-01-01T00:00:00Z"}"#[..])]
    fn malformed_requests_are_rejected(#[case] raw: &[u8]) {
        let err = ModerationRequestMessage::decode(raw).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let raw = br#"{"task_id": 1, "item_id": 2, "timestamp": "yesterday"}"#;
        let err = ModerationRequestMessage::decode(raw).unwrap_err();
        assert!(matches!(err, CodecError::InvalidTimestamp(ts) if ts == "yesterday"));
    }

    #[test]
    fn dead_letter_wire_shape() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let dlq = DeadLetterMessage::new("item item-999 not found", "NotFound", 3, at);

        let v: serde_json::Value = serde_json::from_slice(&dlq.encode().unwrap()).unwrap();
        assert_eq!(v["original_message"], "item item-999 not found");
        assert_eq!(v["error"], "NotFound");
        assert_eq!(v["retry_count"], 3);
        assert_eq!(v["timestamp"], "2025-03-01T00:00:00+00:00");
    }
}
