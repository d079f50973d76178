//! TCP connection setup.
//!
//! # Example
//!
//! ```ignore
//! use cozmo_link::transport::{connect, split, DEFAULT_HOST, DEFAULT_PORT};
//!
//! let stream = connect((DEFAULT_HOST, DEFAULT_PORT))?;
//! let (reader, writer) = split(stream)?;
//! ```

use std::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;

/// Address the engine listens on when running locally.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the engine accepts SDK connections on.
pub const DEFAULT_PORT: u16 = 5106;

/// Open a TCP connection to the engine.
///
/// Nagle is disabled: messages are small and latency-sensitive.
///
/// # Errors
///
/// Returns an I/O error if no address resolves or every connect attempt fails.
pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    if let Ok(peer) = stream.peer_addr() {
        tracing::debug!("TCP connected to {}", peer);
    }
    Ok(stream)
}

/// Split a socket into independent read and write handles.
///
/// Both handles refer to the same socket; shutting one down affects both.
///
/// # Errors
///
/// Returns an I/O error if the handle cannot be duplicated.
pub fn split(stream: TcpStream) -> Result<(TcpStream, TcpStream)> {
    let reader = stream.try_clone()?;
    Ok((reader, stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn test_connect_and_split() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = connect(listener.local_addr().unwrap()).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        assert!(stream.nodelay().unwrap());

        let (mut reader, mut writer) = split(stream).unwrap();
        writer.write_all(b"up").unwrap();
        server.write_all(b"down").unwrap();

        let mut up = [0u8; 2];
        server.read_exact(&mut up).unwrap();
        let mut down = [0u8; 4];
        reader.read_exact(&mut down).unwrap();

        assert_eq!(&up, b"up");
        assert_eq!(&down, b"down");
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on.
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();

        assert!(connect(addr).is_err());
    }
}
