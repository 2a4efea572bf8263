//! Request/response bodies for the budget authority and sequence provider

use serde::{Deserialize, Serialize};

use crate::events::SessionEndReason;

/// One playable unit in an externally supplied ordered sequence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequencedMediaItem {
    /// Opaque item identifier
    pub id: String,
    /// Item length in seconds
    pub duration_seconds: f64,
    /// Position within the sequence (unique and contiguous)
    pub order: u32,
}

/// Sequence provider response for a scanned token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceResponse {
    #[serde(default)]
    pub items: Vec<SequencedMediaItem>,
}

/// `start-session(profile, item)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub profile_id: String,
    pub item_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub remaining_seconds: f64,
    /// Some authorities report exhaustion inline instead of with an error status
    #[serde(default)]
    pub limit_reached: bool,
}

/// `heartbeat(sessionId, positionSeconds)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub position_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub elapsed_seconds: f64,
    pub remaining_seconds: f64,
    pub limit_reached: bool,
}

/// `end-session(sessionId, reason, finalPosition)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndSessionRequest {
    pub reason: SessionEndReason,
    pub final_position_seconds: f64,
}

/// Error body returned by the authority on non-success statuses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorityErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub limit_reached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_response_defaults_to_empty() {
        let parsed: SequenceResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn test_start_session_response_limit_flag_optional() {
        let parsed: StartSessionResponse =
            serde_json::from_str(r#"{"session_id":"s1","remaining_seconds":900}"#).unwrap();
        assert_eq!(parsed.session_id, "s1");
        assert_eq!(parsed.remaining_seconds, 900.0);
        assert!(!parsed.limit_reached);
    }

    #[test]
    fn test_end_session_reason_snake_case() {
        let body = EndSessionRequest {
            reason: SessionEndReason::LimitReached,
            final_position_seconds: 42.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["reason"], "limit_reached");
    }
}
