//! JSON wire codec. One JSON object per WebSocket text frame; a
//! required `type` discriminator selects the message. Hot clientbound
//! channels override their payload with compact array rows.

use serde_json::Value;

use crate::client::ClientMessage;
use crate::server::Serverbound;
use crate::ProtocolError;

/// Default inbound frame cap. Kept conservative; config can lower it.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Decode one inbound frame. Rejects oversized frames, non-JSON,
/// missing/unknown `type` tags, and structurally invalid fields, each
/// with a distinct error so the router can count unknown-type spam
/// separately.
pub fn decode(raw: &str, max_bytes: usize) -> Result<Serverbound, ProtocolError> {
    if raw.len() > max_bytes {
        return Err(ProtocolError::FrameTooLarge(raw.len()));
    }
    let value: Value =
        serde_json::from_str(raw).map_err(|err| ProtocolError::Malformed(err.to_string()))?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    if !Serverbound::KNOWN_TYPES.contains(&tag) {
        return Err(ProtocolError::UnknownType(tag.to_string()));
    }
    let tag = tag.to_string();
    serde_json::from_value(value).map_err(|err| ProtocolError::Invalid {
        message_type: tag,
        reason: err.to_string(),
    })
}

/// Encode a clientbound message to its wire string. Serialized once
/// per broadcast; the transport clones the resulting frame cheaply.
pub fn encode<M: ClientMessage>(message: &M) -> String {
    let mut value = message.payload();
    match &mut value {
        Value::Object(map) => {
            map.insert("type".to_string(), Value::String(M::MESSAGE_TYPE.to_string()));
        }
        // Payloads are objects by contract; anything else is a
        // programming error surfaced loudly in tests.
        other => {
            debug_assert!(false, "non-object payload for {}", M::MESSAGE_TYPE);
            log::error!("non-object payload for {}: {other:?}", M::MESSAGE_TYPE);
        }
    }
    value.to_string()
}
