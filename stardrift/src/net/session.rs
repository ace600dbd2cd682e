//! Per-connection session lifecycle: WebSocket handshake, the join
//! flow (token verification, row load, map handoff), rate limiting,
//! and disconnect cleanup.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use uuid::Uuid;

use stardrift_protocol::client::CError;
use stardrift_protocol::server::{SJoin, Serverbound};
use stardrift_protocol::{codec, ErrorCode, ProtocolError};

use crate::net::client::OutboundHandle;
use crate::net::rate_limit::Category;
use crate::server::Server;
use crate::world::{JoinContext, MapCommand, MapHandle};

const MAX_NICKNAME_CHARS: usize = 24;

pub async fn run_connection(server: Arc<Server>, stream: TcpStream, addr: SocketAddr) {
    let websocket = match accept_async(stream).await {
        Ok(websocket) => websocket,
        Err(err) => {
            log::debug!("handshake with {addr} failed: {err}");
            return;
        }
    };
    let client_id = server.allocate_client_id();
    server.crash.begin_session(client_id);
    log::debug!("client {client_id} connected from {addr}");

    let (sink, stream) = websocket.split();
    let (outbound, outbound_rx) = OutboundHandle::channel();
    tokio::spawn(write_loop(sink, outbound_rx, outbound.clone()));

    let mut session = Session {
        server: &server,
        client_id,
        outbound: outbound.clone(),
        map: None,
        unknown_frames: 0,
    };
    session.read_loop(stream).await;

    if let Some(map) = &session.map {
        map.disconnect(client_id);
    }
    outbound.mark_closed();
    server.crash.end_session(client_id);
    server.limits.sweep();
    log::debug!("client {client_id} session ended");
}

async fn write_loop(
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
    handle: OutboundHandle,
) {
    while let Some(frame) = rx.recv().await {
        if sink.send(frame).await.is_err() {
            handle.mark_closed();
            break;
        }
    }
    let _ = sink.close().await;
}

struct Session<'s> {
    server: &'s Arc<Server>,
    client_id: u64,
    outbound: OutboundHandle,
    map: Option<MapHandle>,
    unknown_frames: u64,
}

impl Session<'_> {
    async fn read_loop(&mut self, mut stream: SplitStream<WebSocketStream<TcpStream>>) {
        while let Some(next) = stream.next().await {
            let message = match next {
                Ok(message) => message,
                Err(err) => {
                    log::debug!("client {} read error: {err}", self.client_id);
                    break;
                }
            };
            match message {
                Message::Text(text) => {
                    if !self.handle_text(text.as_str()).await {
                        break;
                    }
                }
                Message::Close(_) => break,
                // binary frames are not part of the protocol
                Message::Binary(_) => {
                    self.unknown_frames += 1;
                }
                _ => {}
            }
            if self.outbound.is_closed() {
                break;
            }
        }
    }

    /// Returns false when the connection should be torn down.
    async fn handle_text(&mut self, raw: &str) -> bool {
        let max_bytes = self.server.registries.server.max_frame_bytes;
        let message = match codec::decode(raw, max_bytes) {
            Ok(message) => message,
            Err(ProtocolError::UnknownType(tag)) => {
                // counted and dropped; sustained spam burns the misc quota
                self.unknown_frames += 1;
                self.server.crash.record(
                    Some(self.client_id),
                    "unknown_message_type",
                    tag.clone(),
                );
                if !self.server.limits.allow(self.client_id, Category::Other) {
                    self.outbound
                        .send(&CError::new(ErrorCode::RateLimited, "slow down"));
                }
                log::debug!(
                    "client {}: unknown type {tag} ({} so far)",
                    self.client_id,
                    self.unknown_frames
                );
                return true;
            }
            Err(err) => {
                self.outbound
                    .send(&CError::new(ErrorCode::ValidationFailed, err.to_string()));
                return true;
            }
        };

        let category = Category::of(&message);
        if !self.server.limits.allow(self.client_id, category) {
            if category.user_visible() {
                self.outbound.send(&CError::new(
                    ErrorCode::RateLimited,
                    "too many requests, dropped",
                ));
            }
            return true;
        }

        if self.map.is_none() {
            return match message {
                Serverbound::Join(join) => self.handle_join(join).await,
                other => {
                    log::debug!(
                        "client {} sent {} before join",
                        self.client_id,
                        other.message_type()
                    );
                    self.outbound
                        .send(&CError::new(ErrorCode::AuthInvalid, "join first"));
                    true
                }
            };
        }
        if let Some(map) = &self.map {
            map.frame(self.client_id, message);
        }
        true
    }

    /// The join handshake. Every await here belongs to the session
    /// task; the map actor only ever sees the finished JoinContext.
    async fn handle_join(&mut self, join: SJoin) -> bool {
        let verified = match self.server.verifier.verify(&join.auth_token).await {
            Ok(verified) => verified,
            Err(err) => {
                log::info!("client {} failed auth: {err}", self.client_id);
                self.outbound
                    .send(&CError::new(ErrorCode::AuthInvalid, "invalid session token"));
                return false;
            }
        };
        // the claimed uuid must agree with the token's identity
        if let Ok(claimed) = Uuid::parse_str(join.user_id.trim()) {
            if claimed != verified.user_id {
                self.outbound.send(&CError::new(
                    ErrorCode::AuthInvalid,
                    "userId does not match token",
                ));
                return false;
            }
        }

        let nickname = clean_nickname(&join.nickname);
        let row = match self
            .server
            .store
            .load(verified.user_id, &nickname)
            .await
        {
            Ok(row) => row,
            Err(err) => {
                log::error!("player load failed for {}: {err}", verified.user_id);
                self.server
                    .crash
                    .record(Some(self.client_id), "load_failed", err.to_string());
                self.outbound.send(&CError::new(
                    ErrorCode::DbTransient,
                    "profile unavailable, try again",
                ));
                return false;
            }
        };
        let recent_honor = self
            .server
            .store
            .recent_honor_average(verified.user_id, 7)
            .await
            .unwrap_or(0.0);

        let map = row
            .map_id
            .as_deref()
            .and_then(|id| self.server.map(id))
            .or_else(|| self.server.default_map());
        let Some(map) = map else {
            log::error!("no maps configured, closing client {}", self.client_id);
            self.outbound
                .send(&CError::new(ErrorCode::Internal, "no maps available"));
            return false;
        };

        map.send(MapCommand::Join(Box::new(JoinContext {
            client_id: self.client_id,
            user_id: verified.user_id,
            row,
            recent_honor,
            requested_position: join.position,
            outbound: self.outbound.clone(),
        })));
        self.map = Some(map.clone());
        true
    }
}

fn clean_nickname(raw: &str) -> String {
    let trimmed: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NICKNAME_CHARS)
        .collect();
    if trimmed.is_empty() {
        "pilot".to_string()
    } else {
        trimmed
    }
}
