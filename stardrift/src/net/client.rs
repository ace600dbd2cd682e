use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use stardrift_protocol::client::ClientMessage;
use stardrift_protocol::codec;

/// Cheap-to-clone handle for pushing frames at one client. Writes are
/// best-effort: once the writer task is gone the handle flips closed
/// and every later send is a no-op, which is how broadcasts skip dead
/// sockets without tracking them.
#[derive(Clone)]
pub struct OutboundHandle {
    tx: mpsc::UnboundedSender<Message>,
    closed: Arc<AtomicBool>,
}

impl OutboundHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (handle, rx)
    }

    /// A handle with no reader; sends disappear. Handy for NPCs' dead
    /// drops in tests.
    pub fn detached() -> Self {
        let (handle, rx) = Self::channel();
        drop(rx);
        handle.closed.store(true, Ordering::Relaxed);
        handle
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    /// Send an already-encoded frame. Used by broadcasts so the JSON is
    /// serialized once and the buffer shared between recipients.
    pub fn send_frame(&self, frame: Message) {
        if self.is_closed() {
            return;
        }
        if self.tx.send(frame).is_err() {
            self.mark_closed();
        }
    }

    pub fn send<M: ClientMessage>(&self, message: &M) {
        self.send_frame(Message::text(codec::encode(message)));
    }
}
