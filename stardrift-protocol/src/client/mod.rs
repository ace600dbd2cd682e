//! Clientbound messages, grouped the way the simulation emits them.
//! Every message carries a `type` tag injected at encode time, so the
//! structs stay plain payloads.

mod cargo;
mod combat;
mod movement;
mod npc;
mod rows;
mod session;
mod state;

use serde_json::Value;

pub use cargo::*;
pub use combat::*;
pub use movement::*;
pub use npc::*;
pub use session::*;
pub use state::*;

/// Implemented by every clientbound message. `payload` must return a
/// JSON object; the codec injects the `type` discriminator into it.
pub trait ClientMessage {
    const MESSAGE_TYPE: &'static str;

    fn payload(&self) -> Value;
}

/// Wires a serde-serializable struct up as a clientbound message.
macro_rules! client_message {
    ($ty:ty = $tag:literal) => {
        impl crate::client::ClientMessage for $ty {
            const MESSAGE_TYPE: &'static str = $tag;

            fn payload(&self) -> serde_json::Value {
                // Infallible: clientbound payloads are plain structs
                // with string-keyed maps only.
                serde_json::to_value(self).expect("clientbound payload serializes")
            }
        }
    };
}

pub(crate) use client_message;
