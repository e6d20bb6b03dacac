//! Channel Transport Adapter
//!
//! Implements `PeerTransport` over tokio channels, for embedders that own
//! the actual socket in another task.
//!
//! Requests travel as [`OutboundMessage::Request`] with a one-shot reply
//! slot. A dropped slot, a closed channel or a timeout all read as "peer
//! unavailable".

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::ports::outbound::PeerTransport;
use crate::protocol::Command;

/// Default time to wait for a reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Traffic handed to the socket owner.
#[derive(Debug)]
pub enum OutboundMessage {
    /// Fire-and-forget emit.
    Emit {
        /// Event name.
        event: String,
        /// JSON payload.
        payload: Value,
    },
    /// Request awaiting a reply.
    Request {
        /// Command.
        command: Command,
        /// JSON payload.
        payload: Value,
        /// Where the reply goes; `None` or an empty body means no data.
        reply: oneshot::Sender<Option<Vec<u8>>>,
    },
    /// Close the connection.
    Close,
}

/// Transport backed by an mpsc channel.
pub struct ChannelTransport {
    address: String,
    outbound: mpsc::Sender<OutboundMessage>,
    request_timeout: Duration,
    connected: AtomicBool,
}

impl ChannelTransport {
    /// Create a transport and the receiver the socket owner drains.
    pub fn new(address: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        Self::with_timeout(address, capacity, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create with a custom reply timeout.
    pub fn with_timeout(
        address: impl Into<String>,
        capacity: usize,
        request_timeout: Duration,
    ) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (outbound, receiver) = mpsc::channel(capacity);
        let transport = Self {
            address: address.into(),
            outbound,
            request_timeout,
            connected: AtomicBool::new(false),
        };
        (transport, receiver)
    }

    /// Record the socket state; requests short-circuit while disconnected.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Whether the socket is up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerTransport for ChannelTransport {
    fn emit(&self, event: &str, payload: Value) {
        let message = OutboundMessage::Emit {
            event: event.to_string(),
            payload,
        };
        if let Err(e) = self.outbound.try_send(message) {
            warn!(peer = %self.address, event, error = %e, "[mirror] Emit dropped");
        }
    }

    async fn request(&self, command: Command, payload: Value) -> Option<Vec<u8>> {
        if !self.is_connected() {
            return None;
        }

        let (reply, response) = oneshot::channel();
        let message = OutboundMessage::Request {
            command,
            payload,
            reply,
        };
        if self.outbound.send(message).await.is_err() {
            debug!(peer = %self.address, "[mirror] Outbound channel closed");
            return None;
        }

        match tokio::time::timeout(self.request_timeout, response).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(_)) => None,
            Err(_) => {
                warn!(
                    peer = %self.address,
                    command = command.as_str(),
                    "[mirror] Request timed out"
                );
                None
            }
        }
    }

    fn close(&self) {
        self.set_connected(false);
        if self.outbound.try_send(OutboundMessage::Close).is_err() {
            debug!(peer = %self.address, "[mirror] Close not delivered");
        }
    }

    fn peer_address(&self) -> &str {
        &self.address
    }
}
