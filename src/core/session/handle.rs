//! A single live session.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc::error::TrySendError, watch};
use tracing::debug;

use super::{Event, MessageChannel, SessionError, SessionId, SessionState};
use crate::core::protocol::{Request, RequestId};

/// Per-client session: id, lifecycle state, the sending halves of its
/// message channel and the set of request ids still awaiting a Response.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    state: watch::Sender<SessionState>,
    channel: MessageChannel,
    in_flight: Mutex<HashSet<RequestId>>,
}

impl Session {
    pub(crate) fn new(id: SessionId, channel: MessageChannel) -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        Self {
            id,
            created_at: Utc::now(),
            state,
            channel,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_accepting(&self) -> bool {
        self.state().is_accepting()
    }

    /// Number of accepted requests not answered yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// `Connecting` → `Open`. No-op in any other state.
    pub(crate) fn open(&self) {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Connecting {
                *state = SessionState::Open;
                true
            } else {
                false
            }
        });
    }

    /// Stop accepting requests. Returns false if already closing or closed.
    pub(crate) fn begin_close(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminating() {
                false
            } else {
                *state = SessionState::Closing;
                true
            }
        })
    }

    pub(crate) fn mark_closed(&self) {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Closed {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        });
    }

    /// Accept a request onto the inbound queue.
    ///
    /// Never waits: a full queue is reported as [`SessionError::Busy`].
    pub fn submit(&self, request: Request) -> Result<(), SessionError> {
        if !self.is_accepting() {
            return Err(SessionError::NotFound(self.id.clone()));
        }

        let request_id = request.request_id.clone();
        if !self.in_flight.lock().insert(request_id.clone()) {
            return Err(SessionError::DuplicateRequest(request_id));
        }

        match self.channel.try_push_inbound(request) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.complete(&request_id);
                Err(SessionError::Busy(self.id.clone()))
            }
            Err(TrySendError::Closed(_)) => {
                self.complete(&request_id);
                Err(SessionError::NotFound(self.id.clone()))
            }
        }
    }

    /// Release a request id once its Response has been produced.
    pub fn complete(&self, request_id: &RequestId) {
        self.in_flight.lock().remove(request_id);
    }

    /// Push an event onto the outbound queue, waiting for room.
    pub async fn deliver(&self, event: Event) -> Result<(), SessionError> {
        if self.state() == SessionState::Closed {
            return Err(SessionError::Closed(self.id.clone()));
        }
        self.channel
            .push_outbound(event)
            .await
            .map_err(|_| SessionError::Closed(self.id.clone()))
    }

    /// Push an event without waiting. Used for control frames.
    pub(crate) fn try_deliver(&self, event: Event) -> bool {
        match self.channel.try_push_outbound(event) {
            Ok(()) => true,
            Err(e) => {
                debug!(session = %self.id, "Control frame not queued: {}", e);
                false
            }
        }
    }
}
