//! Session manager for tracking connected SSE clients.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{ChannelReceivers, Event, MessageChannel, Session, SessionError, SessionId};

/// Owns every live session, keyed by id.
///
/// All map mutations go through a single lock; lookups take the read side.
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    inbound_capacity: usize,
    outbound_capacity: usize,
}

impl SessionManager {
    pub fn new(inbound_capacity: usize, outbound_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            inbound_capacity,
            outbound_capacity,
        }
    }

    /// Create and register a new session in the `Connecting` state.
    ///
    /// The returned receivers are the session's only readers: the inbound
    /// half for the dispatcher, the outbound half for the stream.
    pub fn create(&self) -> (Arc<Session>, ChannelReceivers) {
        let (channel, receivers) = MessageChannel::new(self.inbound_capacity, self.outbound_capacity);

        let mut sessions = self.sessions.write();
        let mut id = SessionId::generate();
        while sessions.contains_key(&id) {
            id = SessionId::generate();
        }

        let session = Arc::new(Session::new(id.clone(), channel));
        sessions.insert(id, session.clone());
        drop(sessions);

        info!(session = %session.id(), "Session created");
        (session, receivers)
    }

    /// Find a live session that still accepts requests.
    pub fn lookup(&self, id: &SessionId) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .get(id)
            .filter(|session| session.is_accepting())
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Close a session from the server side.
    ///
    /// Marks it `Closing`, queues a close frame for the stream and drops it
    /// from the map so no further request can reach it. Requests already
    /// running finish and queued ones are dropped unrun.
    pub fn close(&self, id: &SessionId, reason: &str) -> bool {
        let Some(session) = self.sessions.write().remove(id) else {
            return false;
        };

        session.begin_close();
        session.try_deliver(Event::Close {
            reason: reason.to_string(),
        });
        info!(session = %id, reason, "Session closing");
        true
    }

    /// Drop a session whose stream has ended. Idempotent.
    pub fn release(&self, id: &SessionId) {
        if let Some(session) = self.sessions.write().remove(id) {
            session.begin_close();
            debug!(session = %id, "Session released by stream");
        }
    }

    /// Close every session, e.g. on shutdown.
    pub fn close_all(&self, reason: &str) -> usize {
        let ids: Vec<SessionId> = self.sessions.read().keys().cloned().collect();
        ids.iter().filter(|id| self.close(id, reason)).count()
    }

    /// Get active session count.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(64, 256)
    }
}
