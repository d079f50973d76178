//! Session lifecycle state machine.
//!
//! ```text
//! Connecting ─► AwaitingPeerIdentity ─► Validating ─► Ready
//!      │                 │                   │          │
//!      └─────────────────┴───────────────────┴──────────┴─► Closed
//! ```
//!
//! `Closed` is terminal. Threads blocked in [`Session::wait_ready`] wake on
//! `Ready` or `Closed`.

use std::fmt;
use std::sync::OnceLock;

use parking_lot::{Condvar, Mutex};

use super::VersionMismatch;
use crate::error::{LinkError, Result};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket is being opened.
    Connecting,
    /// Socket is open; waiting for the engine's identity message.
    AwaitingPeerIdentity,
    /// Identity received; fingerprints are being checked.
    Validating,
    /// Handshake succeeded; messages and actions may flow.
    Ready,
    /// Session ended. Terminal.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::AwaitingPeerIdentity => "awaiting-peer-identity",
            Self::Validating => "validating",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Shared session state with blocking readiness wait.
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
    changed: Condvar,
    peer_id: OnceLock<u32>,
    mismatch: Mutex<Option<VersionMismatch>>,
}

impl Session {
    /// Create a session in [`SessionState::Connecting`].
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Connecting),
            changed: Condvar::new(),
            peer_id: OnceLock::new(),
            mismatch: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Robot id recorded on handshake success.
    pub fn peer_id(&self) -> Option<u32> {
        self.peer_id.get().copied()
    }

    /// Socket is open; start waiting for the identity message.
    ///
    /// Returns `false` if the session is not in `Connecting`.
    pub fn socket_opened(&self) -> bool {
        self.advance(SessionState::Connecting, SessionState::AwaitingPeerIdentity)
    }

    /// Identity message arrived; start validating.
    ///
    /// Returns `false` if the session was not waiting for one. A second
    /// identity message after the handshake is ignored by the caller.
    pub fn identity_received(&self) -> bool {
        self.advance(SessionState::AwaitingPeerIdentity, SessionState::Validating)
    }

    /// Fingerprints matched: record the peer id and become ready.
    ///
    /// The peer id is set once and never changes afterwards.
    pub fn validated(&self, peer_id: u32) -> bool {
        let mut state = self.state.lock();
        if *state != SessionState::Validating {
            return false;
        }
        let _ = self.peer_id.set(peer_id);
        *state = SessionState::Ready;
        drop(state);

        tracing::info!("Session ready (robot {})", peer_id);
        self.changed.notify_all();
        true
    }

    /// Fingerprints did not match: record why and close.
    pub fn rejected(&self, mismatch: VersionMismatch) {
        tracing::error!("Handshake rejected: {}", mismatch);
        *self.mismatch.lock() = Some(mismatch);
        self.close();
    }

    /// Move to `Closed`. Returns `false` if already closed.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if *state == SessionState::Closed {
            return false;
        }
        let previous = *state;
        *state = SessionState::Closed;
        drop(state);

        tracing::debug!("Session {} -> closed", previous);
        self.changed.notify_all();
        true
    }

    /// Whether the session has reached `Closed`.
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Block until the session is `Ready` or `Closed`.
    ///
    /// No timeout is applied.
    ///
    /// # Errors
    ///
    /// - [`LinkError::ProtocolVersionMismatch`] if the handshake was rejected
    /// - [`LinkError::ConnectionClosed`] if the session closed for any other
    ///   reason
    pub fn wait_ready(&self) -> Result<u32> {
        let mut state = self.state.lock();
        while !matches!(*state, SessionState::Ready | SessionState::Closed) {
            self.changed.wait(&mut state);
        }
        let reached = *state;
        drop(state);

        match (reached, self.peer_id()) {
            (SessionState::Ready, Some(id)) => Ok(id),
            _ => match self.mismatch.lock().clone() {
                Some(mismatch) => Err(LinkError::ProtocolVersionMismatch(mismatch)),
                None => Err(LinkError::ConnectionClosed),
            },
        }
    }

    fn advance(&self, from: SessionState, to: SessionState) -> bool {
        let mut state = self.state.lock();
        if *state != from {
            return false;
        }
        *state = to;
        drop(state);

        tracing::debug!("Session {} -> {}", from, to);
        self.changed.notify_all();
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::FingerprintDirection;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn ready_session(peer: u32) -> Session {
        let session = Session::new();
        assert!(session.socket_opened());
        assert!(session.identity_received());
        assert!(session.validated(peer));
        session
    }

    #[test]
    fn test_happy_path() {
        let session = ready_session(7);

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.peer_id(), Some(7));
        assert_eq!(session.wait_ready().unwrap(), 7);
    }

    #[test]
    fn test_out_of_order_transitions_rejected() {
        let session = Session::new();

        assert!(!session.identity_received());
        assert!(!session.validated(1));
        assert_eq!(session.state(), SessionState::Connecting);
    }

    #[test]
    fn test_second_identity_ignored_once_ready() {
        let session = ready_session(7);

        assert!(!session.identity_received());
        assert!(!session.validated(9));
        assert_eq!(session.peer_id(), Some(7));
    }

    #[test]
    fn test_closed_is_terminal() {
        let session = ready_session(1);

        assert!(session.close());
        assert!(!session.close());
        assert!(!session.socket_opened());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_wait_ready_blocks_until_validated() {
        let session = Arc::new(Session::new());
        session.socket_opened();

        let waiter = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.wait_ready())
        };

        thread::sleep(Duration::from_millis(20));
        session.identity_received();
        session.validated(5);

        assert_eq!(waiter.join().unwrap().unwrap(), 5);
    }

    #[test]
    fn test_wait_ready_reports_mismatch() {
        let session = Session::new();
        session.socket_opened();
        session.identity_received();
        session.rejected(VersionMismatch {
            direction: FingerprintDirection::EngineToGame,
            engine: vec![1],
            client: vec![2],
        });

        let err = session.wait_ready().unwrap_err();
        assert!(matches!(err, LinkError::ProtocolVersionMismatch(_)));
        assert!(session.peer_id().is_none());
    }

    #[test]
    fn test_wait_ready_reports_plain_close() {
        let session = Session::new();
        session.socket_opened();
        session.close();

        assert!(matches!(
            session.wait_ready().unwrap_err(),
            LinkError::ConnectionClosed
        ));
    }
}
