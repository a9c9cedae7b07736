//!
//! Client Session (spec §4.4, component C4): per-connection state —
//! the inbound attachment queue, the received-attachments map, and the
//! `CONNECTING -> OPEN -> CLOSING -> CLOSED` lifecycle.
//!
//! Mutated only by the owning connection's read loop (spec §5 "Shared
//! resources"), so plain [`Mutex`] is sufficient; there is no
//! cross-session contention on this state.
//!

use std::collections::VecDeque;
use std::sync::Mutex;

use ahash::AHashMap;

use crate::argument::Argument;
use crate::id::ClientId;
use workflow_websocket::server::WebSocketSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Per-connection state held for the lifetime of one WebSocket.
pub struct ClientSession {
    pub client_id: ClientId,
    pub sink: WebSocketSink,
    state: Mutex<ConnectionState>,
    inbound_queue: Mutex<VecDeque<String>>,
    received: Mutex<AHashMap<String, Vec<u8>>>,
}

impl ClientSession {
    pub fn new(client_id: ClientId, sink: WebSocketSink) -> Self {
        ClientSession {
            client_id,
            sink,
            state: Mutex::new(ConnectionState::Connecting),
            inbound_queue: Mutex::new(VecDeque::new()),
            received: Mutex::new(AHashMap::new()),
        }
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    /// Extend the inbound queue with keys named by an Attachment Header
    /// (spec §4.1 decode side).
    pub fn push_attachment_keys(&self, keys: Vec<String>) {
        self.inbound_queue.lock().unwrap().extend(keys);
    }

    /// Pair an arriving binary frame with the head of the inbound queue.
    /// If the queue is empty the frame is silently discarded (spec §3
    /// invariant, §7 "A binary frame with no pending key is dropped").
    pub fn accept_binary(&self, data: Vec<u8>) {
        let key = self.inbound_queue.lock().unwrap().pop_front();
        if let Some(key) = key {
            self.received.lock().unwrap().insert(key, data);
        }
    }

    /// Recursively substitute any placeholder leaf in `arg` that has a
    /// matching entry in the received-attachments map, draining each
    /// entry as it is consumed (spec §4.1 decode side).
    pub fn substitute(&self, arg: Argument) -> Argument {
        let mut received = self.received.lock().unwrap();
        arg.substitute_attachments(&mut received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn session() -> ClientSession {
        let (sink, _rx) = unbounded_channel();
        ClientSession::new("c".repeat(32), sink)
    }

    #[test]
    fn binary_without_pending_key_is_dropped() {
        let session = session();
        session.accept_binary(vec![1, 2, 3]);
        let substituted = session.substitute(Argument::String("wslink_bin0".to_string()));
        assert_eq!(substituted, Argument::String("wslink_bin0".to_string()));
    }

    #[test]
    fn binary_pairs_with_queue_head_in_order() {
        let session = session();
        session.push_attachment_keys(vec!["wslink_bin0".to_string(), "wslink_bin1".to_string()]);
        session.accept_binary(vec![0xAA]);
        session.accept_binary(vec![0xBB]);

        let arg = Argument::Array(vec![
            Argument::String("wslink_bin0".to_string()),
            Argument::String("wslink_bin1".to_string()),
        ]);
        let substituted = session.substitute(arg);
        match substituted {
            Argument::Array(items) => {
                assert_eq!(items[0], Argument::Bytes(vec![0xAA]));
                assert_eq!(items[1], Argument::Bytes(vec![0xBB]));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }
}
