//! Connection builder and read loop.
//!
//! The [`ConnectionBuilder`] provides a fluent API for configuring the
//! session and opening it. The [`Connection`] manages the lifecycle:
//! 1. Open the TCP socket to the engine
//! 2. Install built-in listeners (ping echo, handshake, action completion)
//! 3. Start the read loop on a dedicated thread
//! 4. Block until the handshake succeeds or the session closes
//!
//! Callbacks run on the read-loop thread. A callback that blocks stalls
//! delivery of every later message.
//!
//! # Example
//!
//! ```ignore
//! use cozmo_link::message::{RobotState, SetLiftHeight};
//! use cozmo_link::{Connection, SubscriberId};
//!
//! let connection = Connection::builder()
//!     .thread_name("engine-reader")
//!     .connect(("127.0.0.1", 5106))?;
//!
//! let me = SubscriberId::next();
//! connection.add_callback(me, |state: &RobotState| {
//!     println!("battery {:.2}V", state.battery_voltage);
//!     Ok(())
//! })?;
//!
//! let action = connection.send_action(
//!     SetLiftHeight {
//!         height_mm: 90.0,
//!         max_speed_rad_per_sec: 5.0,
//!         accel_rad_per_sec2: 10.0,
//!         duration_sec: 0.0,
//!     },
//!     0,
//!     false,
//! )?;
//! action.wait();
//! connection.close();
//! ```

use std::fmt;
use std::io::{ErrorKind, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::action::{Action, ActionTracker};
use crate::control::{
    success_reply, validate, wrong_version_reply, ClientInfo, Fingerprints, Session, SessionState,
};
use crate::error::{LinkError, Result};
use crate::handler::{CallbackRegistry, CallbackResult, SubscriberId};
use crate::message::{
    Inbound, InboundMessage, Outbound, Ping, QueueActionPosition, RobotAction,
    RobotCompletedAction, UiDeviceConnected,
};
use crate::protocol::{FrameBuffer, READ_CHUNK_SIZE};
use crate::transport;
use crate::writer::FrameWriter;

/// Default name of the read-loop thread.
pub const DEFAULT_THREAD_NAME: &str = "cozmo-link-reader";

/// Settings for a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Bytes requested per socket read.
    pub read_chunk_size: usize,
    /// Catalog fingerprints the engine must report.
    pub fingerprints: Fingerprints,
    /// Metadata sent to the engine on handshake success.
    pub client_info: ClientInfo,
    /// Name of the read-loop thread.
    pub thread_name: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: READ_CHUNK_SIZE,
            fingerprints: Fingerprints::default(),
            client_info: ClientInfo::default(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

/// Builder for configuring and opening a [`Connection`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionBuilder {
    config: ConnectionConfig,
}

impl ConnectionBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every setting at once.
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of bytes requested per socket read.
    ///
    /// Independent of the maximum message size; a frame may span any
    /// number of reads. Zero is treated as one.
    /// Default: 8192
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size.max(1);
        self
    }

    /// Set the catalog fingerprints the engine must report.
    pub fn fingerprints(mut self, fingerprints: Fingerprints) -> Self {
        self.config.fingerprints = fingerprints;
        self
    }

    /// Set the metadata sent to the engine on handshake success.
    pub fn client_info(mut self, info: ClientInfo) -> Self {
        self.config.client_info = info;
        self
    }

    /// Set the name of the read-loop thread.
    ///
    /// Default: `cozmo-link-reader`
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Open the connection and complete the handshake.
    ///
    /// This will:
    /// 1. Connect the TCP socket
    /// 2. Install built-in listeners
    /// 3. Spawn the read loop
    /// 4. Block until the session is ready (no timeout)
    ///
    /// # Errors
    ///
    /// - [`LinkError::Io`] if the socket cannot be opened
    /// - [`LinkError::ProtocolVersionMismatch`] if the engine's catalog
    ///   fingerprints differ from the expected ones
    /// - [`LinkError::ConnectionClosed`] if the session ends before the
    ///   handshake completes
    pub fn connect<A: ToSocketAddrs>(self, addr: A) -> Result<Connection> {
        let stream = transport::connect(addr)?;
        Connection::start(stream, self.config)
    }
}

/// State shared between the caller-facing handle and the read loop.
struct Shared {
    writer: Arc<FrameWriter>,
    registry: CallbackRegistry,
    actions: Arc<ActionTracker>,
    session: Arc<Session>,
    shutdown: AtomicBool,
}

impl Shared {
    /// Stop the session: refuse sends, unblock the read, release waiters.
    ///
    /// Safe to call any number of times from any thread.
    fn shut_down(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.writer.close();
        if self.session.close() {
            tracing::info!("Connection closed");
        }
        let abandoned = self.actions.abandon_all();
        if abandoned > 0 {
            tracing::debug!("Released {} pending action(s) on close", abandoned);
        }
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Whether `message` names a robot other than the session's peer.
    ///
    /// Messages without a robot id, and anything before the handshake,
    /// are never foreign.
    fn is_foreign(&self, message: &Inbound) -> bool {
        match (message.peer_id(), self.session.peer_id()) {
            (Some(from), Some(peer)) => from != peer,
            _ => false,
        }
    }
}

/// An open session with the engine.
///
/// Use [`send_message`](Self::send_message) and
/// [`send_action`](Self::send_action) to talk to the engine, and
/// [`add_callback`](Self::add_callback) to receive from it. Dropping the
/// connection closes it.
pub struct Connection {
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
    config: ConnectionConfig,
}

impl Connection {
    /// Create a new connection builder.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Open a connection with default settings.
    ///
    /// See [`ConnectionBuilder::connect`].
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        ConnectionBuilder::new().connect(addr)
    }

    fn start(stream: TcpStream, config: ConnectionConfig) -> Result<Self> {
        let (read_half, write_half) = transport::split(stream)?;

        let session = Arc::new(Session::new());
        let shared = Arc::new(Shared {
            writer: Arc::new(FrameWriter::new(write_half)?),
            registry: CallbackRegistry::new(),
            actions: Arc::new(ActionTracker::new()),
            session: Arc::clone(&session),
            shutdown: AtomicBool::new(false),
        });

        install_builtin_listeners(&shared, &config)?;
        session.socket_opened();

        let handle = {
            let shared = Arc::clone(&shared);
            let chunk_size = config.read_chunk_size;
            thread::Builder::new()
                .name(config.thread_name.clone())
                .spawn(move || read_loop(read_half, chunk_size, shared))?
        };

        let connection = Connection {
            shared,
            reader: Mutex::new(Some(handle)),
            config,
        };

        // On error the connection is dropped here, which joins the reader.
        let peer_id = session.wait_ready()?;
        tracing::info!("Connected to engine (robot {})", peer_id);
        Ok(connection)
    }

    /// Settings this connection was opened with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Robot id reported by the engine during the handshake.
    pub fn peer_id(&self) -> Option<u32> {
        self.shared.session.peer_id()
    }

    /// Current session state.
    pub fn session_state(&self) -> SessionState {
        self.shared.session.state()
    }

    /// Whether messages can currently be sent.
    pub fn is_open(&self) -> bool {
        self.shared.writer.is_open() && !self.shared.session.is_closed()
    }

    /// Encode `message` and write it as one frame on the calling thread.
    ///
    /// # Errors
    ///
    /// - [`LinkError::SendWhileClosed`] if the connection is not open;
    ///   nothing is written and the connection is unaffected
    /// - [`LinkError::Io`] if the write fails; the connection closes
    pub fn send_message(&self, message: impl Into<Outbound>) -> Result<()> {
        self.shared.writer.send(&message.into())
    }

    /// Queue an action on the engine and return a handle to it.
    ///
    /// The action is placed at the front of the engine's queue, or run
    /// alongside already queued actions when `in_parallel` is set. This
    /// does not wait for completion; see [`Action::wait`].
    ///
    /// # Errors
    ///
    /// Returns the send error if the envelope could not be written. The
    /// action is not tracked in that case.
    pub fn send_action(
        &self,
        action: impl Into<RobotAction>,
        num_retries: u8,
        in_parallel: bool,
    ) -> Result<Action> {
        let position = if in_parallel {
            QueueActionPosition::InParallel
        } else {
            QueueActionPosition::Now
        };

        let pending = self.shared.actions.create(action.into(), num_retries, position);
        let id = pending.message.id_tag;

        if let Err(e) = self.shared.writer.send(&Outbound::from(pending.message.clone())) {
            self.shared.actions.forget(id);
            return Err(e);
        }

        tracing::debug!(
            "Queued action {} ({})",
            id,
            pending.message.action.action_type()
        );
        Ok(pending.into_action(
            Arc::clone(&self.shared.actions),
            Arc::clone(&self.shared.writer),
        ))
    }

    /// Register `callback` for inbound messages of type `M`.
    ///
    /// The callback runs on the read-loop thread.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::DuplicateRegistration`] if `subscriber` already
    /// has a callback for `M`.
    pub fn add_callback<M, F>(&self, subscriber: SubscriberId, callback: F) -> Result<()>
    where
        M: InboundMessage,
        F: Fn(&M) -> CallbackResult + Send + Sync + 'static,
    {
        self.shared.registry.register(subscriber, callback)
    }

    /// Remove the callback `subscriber` registered for type `M`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotRegistered`] if there is no such callback.
    pub fn remove_callback<M: InboundMessage>(&self, subscriber: SubscriberId) -> Result<()> {
        self.shared.registry.unregister::<M>(subscriber)
    }

    /// Number of actions awaiting completion.
    pub fn pending_actions(&self) -> usize {
        self.shared.actions.pending_count()
    }

    /// Close the connection.
    ///
    /// Refuses further sends, shuts the socket down (which unblocks the
    /// pending read) and joins the read loop. Pending actions resolve to
    /// [`ActionStatus::ConnectionLost`](crate::action::ActionStatus::ConnectionLost).
    /// Calling this from a callback skips the join. Idempotent.
    pub fn close(&self) {
        self.shared.shut_down();

        let Some(handle) = self.reader.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::error!("Read loop panicked");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.session_state())
            .field("peer_id", &self.peer_id())
            .field("pending_actions", &self.pending_actions())
            .finish()
    }
}

/// Register the listeners every connection needs under
/// [`SubscriberId::CONNECTION`].
fn install_builtin_listeners(shared: &Shared, config: &ConnectionConfig) -> Result<()> {
    let registry = &shared.registry;

    let writer = Arc::clone(&shared.writer);
    registry.register(SubscriberId::CONNECTION, move |ping: &Ping| {
        writer.send(&Outbound::from(Ping {
            counter: ping.counter,
            time_sent_ms: ping.time_sent_ms,
            is_response: true,
        }))?;
        Ok(())
    })?;

    let writer = Arc::clone(&shared.writer);
    let session = Arc::clone(&shared.session);
    let fingerprints = config.fingerprints.clone();
    let info = config.client_info.clone();
    registry.register(SubscriberId::CONNECTION, move |identity: &UiDeviceConnected| {
        if !session.identity_received() {
            tracing::debug!("Ignoring identity message in state {}", session.state());
            return Ok(());
        }

        match validate(&fingerprints, identity) {
            Ok(()) => {
                if let Err(e) = writer.send(&Outbound::from(success_reply(identity, &info))) {
                    tracing::error!("Could not complete handshake: {}", e);
                    session.close();
                    writer.close();
                    return Err(e.into());
                }
                session.validated(identity.robot_id);
            }
            Err(mismatch) => {
                if let Err(e) = writer.send(&Outbound::from(wrong_version_reply(identity, &info))) {
                    tracing::debug!("Could not report version mismatch: {}", e);
                }
                session.rejected(mismatch);
                writer.close();
            }
        }
        Ok(())
    })?;

    let actions = Arc::clone(&shared.actions);
    registry.register(SubscriberId::CONNECTION, move |done: &RobotCompletedAction| {
        let matched = actions.complete(done.id_tag, done.result);
        if matched > 0 {
            tracing::debug!(
                "Action {} ({}) completed: {:?}",
                done.id_tag,
                done.action_type,
                done.result
            );
        } else {
            tracing::trace!("Completion for untracked action {}", done.id_tag);
        }
        Ok(())
    })?;

    Ok(())
}

/// Read frames until the socket closes or the stream becomes unreadable,
/// dispatching each message on this thread.
fn read_loop(mut stream: TcpStream, chunk_size: usize, shared: Arc<Shared>) {
    let mut buffer = FrameBuffer::with_capacity(chunk_size * 2);
    let mut chunk = vec![0u8; chunk_size];

    'read: loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => {
                if !shared.is_shutting_down() {
                    tracing::info!("Engine closed the connection");
                }
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                if !shared.is_shutting_down() {
                    tracing::error!("Socket read failed: {}", e);
                }
                break;
            }
        };
        tracing::trace!("Read {} bytes", n);

        for frame in buffer.push(&chunk[..n]) {
            if shared.is_shutting_down() {
                break 'read;
            }

            let message: Inbound = match frame.decode() {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!("{}", frame_error(e));
                    break 'read;
                }
            };

            tracing::trace!("Received {}", message.tag());
            if shared.is_foreign(&message) {
                tracing::warn!(
                    "{} names robot {:?}, session is with robot {:?}",
                    message.tag(),
                    message.peer_id(),
                    shared.session.peer_id()
                );
            }
            shared.registry.dispatch(&message);
        }
    }

    shared.shut_down();
}

fn frame_error(err: LinkError) -> String {
    match err {
        LinkError::Framing { .. } => format!("Closing connection: {}", err),
        other => format!("Closing connection, undecodable frame: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_builder_default() {
        let builder = ConnectionBuilder::default();

        assert_eq!(builder.config.read_chunk_size, READ_CHUNK_SIZE);
        assert_eq!(builder.config.thread_name, DEFAULT_THREAD_NAME);
        assert_eq!(builder.config.fingerprints, Fingerprints::default());
    }

    #[test]
    fn test_builder_configuration() {
        let fingerprints = Fingerprints {
            engine_to_game: vec![1, 2],
            game_to_engine: vec![3, 4],
        };
        let builder = Connection::builder()
            .read_chunk_size(16)
            .thread_name("reader")
            .fingerprints(fingerprints.clone());

        assert_eq!(builder.config.read_chunk_size, 16);
        assert_eq!(builder.config.thread_name, "reader");
        assert_eq!(builder.config.fingerprints, fingerprints);
    }

    #[test]
    fn test_zero_chunk_size_clamped() {
        let builder = Connection::builder().read_chunk_size(0);

        assert_eq!(builder.config.read_chunk_size, 1);
    }

    #[test]
    fn test_connect_refused() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();

        let err = Connection::connect(addr).unwrap_err();
        assert!(matches!(err, LinkError::Io(_)));
    }

    #[test]
    fn test_frame_error_wording() {
        let framing = frame_error(LinkError::Framing {
            declared: 9,
            consumed: 5,
        });
        assert!(framing.contains("message size 5 not equal to frame size 9"));

        let other = frame_error(LinkError::ConnectionClosed);
        assert!(other.contains("undecodable"));
    }

    fn shared_with_peer(peer: Option<u32>) -> Shared {
        let session = Arc::new(Session::new());
        if let Some(peer) = peer {
            session.socket_opened();
            session.identity_received();
            session.validated(peer);
        }
        Shared {
            writer: Arc::new(FrameWriter::closed()),
            registry: CallbackRegistry::new(),
            actions: Arc::new(ActionTracker::new()),
            session,
            shutdown: AtomicBool::new(false),
        }
    }

    fn state_from(robot_id: u32) -> Inbound {
        Inbound::from(crate::message::RobotState {
            robot_id,
            battery_voltage: 3.9,
            lift_height_mm: 32.0,
            head_angle_rad: 0.0,
        })
    }

    #[test]
    fn test_foreign_robot_detected_after_handshake() {
        let shared = shared_with_peer(Some(7));

        assert!(!shared.is_foreign(&state_from(7)));
        assert!(shared.is_foreign(&state_from(8)));
    }

    #[test]
    fn test_messages_without_robot_id_are_never_foreign() {
        let shared = shared_with_peer(Some(7));
        let ping = Inbound::from(Ping {
            counter: 1,
            time_sent_ms: 0.0,
            is_response: false,
        });

        assert!(!shared.is_foreign(&ping));
        assert!(!shared_with_peer(None).is_foreign(&state_from(8)));
    }
}
