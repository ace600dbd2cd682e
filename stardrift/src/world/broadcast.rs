//! Serialize-once fan-out to connected players. Closed sockets are
//! skipped by the outbound handles themselves; these helpers only
//! decide who is in the audience.

use stardrift_core::math::Vector2;
use tokio_tungstenite::tungstenite::Message;

use stardrift_protocol::client::ClientMessage;
use stardrift_protocol::codec;

use crate::entity::Player;

pub fn to_map<'p, M: ClientMessage>(
    players: impl IntoIterator<Item = &'p Player>,
    message: &M,
    exclude: Option<u64>,
) {
    let frame = Message::text(codec::encode(message));
    for player in players {
        if exclude == Some(player.client_id) {
            continue;
        }
        player.outbound.send_frame(frame.clone());
    }
}

/// Interest-scoped fan-out: squared-distance test, no sqrt.
pub fn near<'p, M: ClientMessage>(
    players: impl IntoIterator<Item = &'p Player>,
    center: Vector2,
    radius: f64,
    message: &M,
    exclude: Option<u64>,
) {
    let frame = Message::text(codec::encode(message));
    let r2 = radius * radius;
    for player in players {
        if exclude == Some(player.client_id) {
            continue;
        }
        if player.pos.distance_squared(&center) > r2 {
            continue;
        }
        player.outbound.send_frame(frame.clone());
    }
}
