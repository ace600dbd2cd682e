//! Identity checks for inbound frames.
//!
//! Every message carries two possible player identities: the numeric
//! database row id (display) and the issuer UUID (auth). Legacy
//! clients send either one in `playerId`, sometimes as a string, so
//! the accepting comparison coerces numerics. New code should prefer
//! the explicit fields; this shim keeps old clients working.

use serde_json::Value;
use uuid::Uuid;

/// `true` iff `received` coerces-equal to the numeric db id, or is
/// exactly the user's UUID string.
pub fn validate_player_id(received: &Value, player_db_id: i64, user_id: &Uuid) -> bool {
    match received {
        Value::Number(num) => num.as_i64() == Some(player_db_id),
        Value::String(raw) => {
            if raw == &user_id.to_string() {
                return true;
            }
            // numeric-coercing equality, e.g. "42" == 42
            raw.parse::<i64>().map(|n| n == player_db_id).unwrap_or(false)
        }
        _ => false,
    }
}

/// Strict equality against the server-assigned connection id.
pub fn validate_client_id(received: u64, expected: u64) -> bool {
    received == expected
}
