use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors the wire codec can encounter on inbound frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("frame of {0} bytes exceeds the size cap")]
    FrameTooLarge(usize),
    #[error("frame is not valid JSON: {0}")]
    Malformed(String),
    #[error("frame has no `type` field")]
    MissingType,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("invalid `{message_type}` frame: {reason}")]
    Invalid {
        message_type: String,
        reason: String,
    },
}

/// Client-visible error codes. Serialized in SCREAMING_SNAKE_CASE to
/// match the wire taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthInvalid,
    RateLimited,
    ValidationFailed,
    NpcNotFound,
    MultipleCombatSessions,
    BoxNotFound,
    BoxExpired,
    BoxExclusive,
    BoxBusy,
    BoxTooFar,
    InvalidPlayerPosition,
    DbTransient,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthInvalid => "AUTH_INVALID",
            Self::RateLimited => "RATE_LIMITED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::NpcNotFound => "NPC_NOT_FOUND",
            Self::MultipleCombatSessions => "MULTIPLE_COMBAT_SESSIONS",
            Self::BoxNotFound => "BOX_NOT_FOUND",
            Self::BoxExpired => "BOX_EXPIRED",
            Self::BoxExclusive => "BOX_EXCLUSIVE",
            Self::BoxBusy => "BOX_BUSY",
            Self::BoxTooFar => "BOX_TOO_FAR",
            Self::InvalidPlayerPosition => "INVALID_PLAYER_POSITION",
            Self::DbTransient => "DB_TRANSIENT",
            Self::Internal => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_screaming() {
        let json = serde_json::to_string(&ErrorCode::MultipleCombatSessions).unwrap();
        assert_eq!(json, "\"MULTIPLE_COMBAT_SESSIONS\"");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::MultipleCombatSessions);
    }

    #[test]
    fn as_str_matches_serde_form() {
        for code in [
            ErrorCode::AuthInvalid,
            ErrorCode::RateLimited,
            ErrorCode::BoxTooFar,
            ErrorCode::Internal,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }
}
