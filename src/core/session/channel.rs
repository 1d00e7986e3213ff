//! Per-session message channel: a bounded inbound request queue paired with
//! a bounded outbound event queue.

use tokio::sync::mpsc::{self, error::SendError, error::TrySendError};

use super::Event;
use crate::core::protocol::Request;

/// Sending halves, owned by the [`Session`](super::Session).
#[derive(Debug)]
pub struct MessageChannel {
    inbound: mpsc::Sender<Request>,
    outbound: mpsc::Sender<Event>,
}

/// Receiving halves. `inbound` goes to the dispatcher, `outbound` to the
/// stream; each has exactly one reader.
#[derive(Debug)]
pub struct ChannelReceivers {
    pub inbound: mpsc::Receiver<Request>,
    pub outbound: mpsc::Receiver<Event>,
}

impl MessageChannel {
    /// Create a channel pair. Capacities are clamped to at least 1.
    pub fn new(inbound_capacity: usize, outbound_capacity: usize) -> (Self, ChannelReceivers) {
        let (inbound_tx, inbound_rx) = mpsc::channel(inbound_capacity.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(outbound_capacity.max(1));

        (
            Self {
                inbound: inbound_tx,
                outbound: outbound_tx,
            },
            ChannelReceivers {
                inbound: inbound_rx,
                outbound: outbound_rx,
            },
        )
    }

    /// Enqueue a request without waiting. The POST handler never blocks.
    pub fn try_push_inbound(&self, request: Request) -> Result<(), TrySendError<Request>> {
        self.inbound.try_send(request)
    }

    /// Enqueue an event, waiting for room if the stream is behind.
    pub async fn push_outbound(&self, event: Event) -> Result<(), SendError<Event>> {
        self.outbound.send(event).await
    }

    pub fn try_push_outbound(&self, event: Event) -> Result<(), TrySendError<Event>> {
        self.outbound.try_send(event)
    }

    /// Whether the stream side has gone away.
    pub fn is_outbound_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}
