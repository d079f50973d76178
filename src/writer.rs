//! Synchronous frame writer shared by every sending thread.
//!
//! Sends happen on whichever thread calls them: caller threads for
//! `send_message`/`send_action`, and the read loop for built-in replies
//! (ping echo, handshake). A mutex around the socket keeps each frame's
//! bytes contiguous on the wire.
//!
//! # Architecture
//!
//! ```text
//! Caller 1 ──┐
//! Caller 2 ──┼─► FrameWriter (Mutex<TcpStream>) ─► Socket
//! Read loop ─┘
//! ```
//!
//! A failed write shuts the socket down in both directions. That also
//! fails the read loop's pending read, which then closes the session.

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{LinkError, Result};
use crate::message::Outbound;
use crate::protocol::encode_frame;

/// Writes framed outbound messages to the engine socket.
#[derive(Debug)]
pub struct FrameWriter {
    /// Write half of the socket; `None` once closed.
    stream: Mutex<Option<TcpStream>>,
    /// Second handle to the same socket, used to shut it down without
    /// waiting for a write that is blocked under the lock.
    control: Option<TcpStream>,
    /// Fast-path flag checked before encoding.
    open: AtomicBool,
}

impl FrameWriter {
    /// Create a writer over a connected socket.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the socket handle cannot be duplicated.
    pub fn new(stream: TcpStream) -> Result<Self> {
        let control = stream.try_clone()?;
        Ok(Self {
            stream: Mutex::new(Some(stream)),
            control: Some(control),
            open: AtomicBool::new(true),
        })
    }

    /// Create a writer that rejects every send.
    pub fn closed() -> Self {
        Self {
            stream: Mutex::new(None),
            control: None,
            open: AtomicBool::new(false),
        }
    }

    /// Whether sends are currently accepted.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Encode `message` and write it as a single frame.
    ///
    /// # Errors
    ///
    /// - [`LinkError::SendWhileClosed`] if the writer is closed; nothing is
    ///   written
    /// - Codec errors or [`LinkError::PayloadTooLarge`] if the message
    ///   cannot be framed
    /// - [`LinkError::Io`] if the write fails; the writer is closed
    pub fn send(&self, message: &Outbound) -> Result<()> {
        if !self.is_open() {
            return Err(Self::send_while_closed(message));
        }

        let frame = encode_frame(message)?;

        let mut guard = self.stream.lock();
        let Some(stream) = guard.as_mut().filter(|_| self.is_open()) else {
            return Err(Self::send_while_closed(message));
        };

        if let Err(e) = stream.write_all(&frame) {
            if self.open.swap(false, Ordering::AcqRel) {
                tracing::error!("Failed to send {}: {}", message.tag(), e);
            } else {
                tracing::debug!("Send of {} interrupted by close: {}", message.tag(), e);
            }
            if let Some(stream) = guard.take() {
                let _ = stream.shutdown(Shutdown::Both);
            }
            return Err(LinkError::Io(e));
        }

        tracing::trace!("Sent {} ({} bytes)", message.tag(), frame.len());
        Ok(())
    }

    /// Stop accepting sends and shut the socket down in both directions.
    ///
    /// The socket is shut down before the write lock is taken, so a send
    /// blocked on a peer that stopped reading fails instead of stalling
    /// the close.
    ///
    /// Returns `false` if the writer was already closed.
    pub fn close(&self) -> bool {
        let was_open = self.open.swap(false, Ordering::AcqRel);
        if let Some(control) = &self.control {
            let _ = control.shutdown(Shutdown::Both);
        }
        if let Some(stream) = self.stream.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        was_open
    }

    fn send_while_closed(message: &Outbound) -> LinkError {
        let err = LinkError::SendWhileClosed {
            tag: message.tag(),
        };
        tracing::warn!("{}", err);
        err
    }
}
