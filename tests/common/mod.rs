//! Loopback fake engine shared by the session tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cozmo_link::message::version::{ENGINE_TO_GAME_HASH, GAME_TO_ENGINE_HASH};
use cozmo_link::message::{Inbound, Outbound, UiConnectionType, UiDeviceConnected};
use cozmo_link::protocol::{encode_frame, FrameBuffer};
use cozmo_link::Connection;
use tracing_subscriber::EnvFilter;

/// Upper bound on any single read by the fake engine.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once. Filter with `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Identity message with the compiled-in fingerprints.
pub fn identity(robot_id: u32) -> UiDeviceConnected {
    UiDeviceConnected {
        connection_type: UiConnectionType::SdkOverTcp,
        device_id: 1,
        robot_id,
        success: true,
        to_game_hash: ENGINE_TO_GAME_HASH.to_vec(),
        to_engine_hash: GAME_TO_ENGINE_HASH.to_vec(),
        build_version: "engine-test".into(),
    }
}

/// Listening side of the fake engine.
pub struct FakeEngine {
    listener: TcpListener,
}

impl FakeEngine {
    pub fn bind() -> Self {
        init_logging();
        Self {
            listener: TcpListener::bind("127.0.0.1:0").unwrap(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.listener.local_addr().unwrap()
    }

    pub fn accept(&self) -> EnginePeer {
        let (stream, _) = self.listener.accept().unwrap();
        stream.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
        EnginePeer {
            stream,
            buffer: FrameBuffer::new(),
            ready: VecDeque::new(),
        }
    }

    /// Accept on a background thread and run `script` against the peer.
    pub fn serve<T, F>(self, script: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(EnginePeer) -> T + Send + 'static,
    {
        thread::spawn(move || script(self.accept()))
    }
}

/// Accepted connection, seen from the engine side.
pub struct EnginePeer {
    stream: TcpStream,
    buffer: FrameBuffer,
    ready: VecDeque<Outbound>,
}

impl EnginePeer {
    pub fn send(&mut self, message: impl Into<Inbound>) {
        let frame = encode_frame(&message.into()).unwrap();
        self.stream.write_all(&frame).unwrap();
    }

    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
    }

    /// Next message from the client, or `None` once the client hung up.
    pub fn recv(&mut self) -> Option<Outbound> {
        let mut chunk = [0u8; 512];
        while self.ready.is_empty() {
            let n = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::ConnectionReset => 0,
                Err(e) => panic!("engine read failed: {e}"),
            };
            if n == 0 {
                return None;
            }
            for frame in self.buffer.push(&chunk[..n]) {
                self.ready.push_back(frame.decode().unwrap());
            }
        }
        self.ready.pop_front()
    }

    /// Expect the client to hang up without sending anything else.
    pub fn expect_eof(&mut self) {
        assert_eq!(self.recv(), None);
    }

    /// Send a valid identity and return the client's reply.
    pub fn handshake(&mut self, robot_id: u32) -> Outbound {
        self.send(identity(robot_id));
        self.recv().expect("client hung up during handshake")
    }
}

/// Open a client connection against a fake engine that completes the
/// handshake, returning both ends.
pub fn connected_pair(robot_id: u32) -> (Connection, EnginePeer) {
    let engine = FakeEngine::bind();
    let addr = engine.addr();
    let server = engine.serve(move |mut peer| {
        let reply = peer.handshake(robot_id);
        assert!(matches!(reply, Outbound::UiDeviceConnectionSuccess(_)));
        peer
    });

    let connection = Connection::connect(addr).unwrap();
    (connection, server.join().unwrap())
}
