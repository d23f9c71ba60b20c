//! Upstream connection to the usage monitor
//!
//! A [`Connector`] makes exactly one connection attempt per call; retrying is
//! the dispatch loop's job.

pub mod codec;

use std::io::{self, Read};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from the upstream socket
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("failed to connect to {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to configure socket: {0}")]
    Configure(#[source] io::Error),
    #[error("failed to read state codes: {0}")]
    Read(#[source] io::Error),
}

/// Result of one read on a connected stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were placed at the start of the buffer
    Data(usize),
    /// The peer closed the connection
    EndOfStream,
    /// The read timeout elapsed without data
    Idle,
}

/// Single-attempt connection primitive
pub trait Connector {
    type Stream: Read;

    /// Human-readable endpoint for log messages
    fn endpoint(&self) -> String;

    fn connect(&mut self) -> Result<Self::Stream, ConnectionError>;
}

/// Connects to the monitor's Unix stream socket
#[derive(Debug, Clone)]
pub struct UnixSocketConnector {
    path: PathBuf,
    read_timeout: Option<Duration>,
}

impl UnixSocketConnector {
    /// `read_timeout` bounds each blocking read so the caller can observe
    /// shutdown requests; `None` blocks indefinitely.
    pub fn new(path: impl Into<PathBuf>, read_timeout: Option<Duration>) -> Self {
        Self {
            path: path.into(),
            read_timeout,
        }
    }
}

impl Connector for UnixSocketConnector {
    type Stream = UnixStream;

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }

    fn connect(&mut self) -> Result<UnixStream, ConnectionError> {
        let stream = UnixStream::connect(&self.path).map_err(|source| ConnectionError::Connect {
            path: self.path.clone(),
            source,
        })?;
        stream
            .set_read_timeout(self.read_timeout)
            .map_err(ConnectionError::Configure)?;
        Ok(stream)
    }
}

/// Read the next chunk from `stream` into `buffer`
pub fn read_next<R: Read>(stream: &mut R, buffer: &mut [u8]) -> Result<ReadOutcome, ConnectionError> {
    loop {
        match stream.read(buffer) {
            Ok(0) => return Ok(ReadOutcome::EndOfStream),
            Ok(n) => return Ok(ReadOutcome::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(ReadOutcome::Idle)
            }
            Err(e) => return Err(ConnectionError::Read(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use std::os::unix::net::UnixListener;
    use tempfile::TempDir;

    #[test]
    fn test_connect_to_missing_socket_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.sock");
        let mut connector = UnixSocketConnector::new(&path, None);

        match connector.connect() {
            Err(ConnectionError::Connect { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_connect_and_read_codes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage-bar.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let mut connector = UnixSocketConnector::new(&path, Some(Duration::from_millis(500)));
        let mut stream = connector.connect().unwrap();

        let (mut peer, _) = listener.accept().unwrap();
        peer.write_all(b"3\n").unwrap();

        let mut buffer = [0u8; 256];
        assert_eq!(read_next(&mut stream, &mut buffer).unwrap(), ReadOutcome::Data(2));
        assert_eq!(&buffer[..2], b"3\n");

        drop(peer);
        assert_eq!(read_next(&mut stream, &mut buffer).unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn test_read_timeout_reports_idle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quiet.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let mut connector = UnixSocketConnector::new(&path, Some(Duration::from_millis(20)));
        let mut stream = connector.connect().unwrap();
        let _peer = listener.accept().unwrap();

        let mut buffer = [0u8; 16];
        assert_eq!(read_next(&mut stream, &mut buffer).unwrap(), ReadOutcome::Idle);
    }

    #[test]
    fn test_read_next_on_exhausted_reader() {
        let mut reader = Cursor::new(b"12".to_vec());
        let mut buffer = [0u8; 8];

        assert_eq!(read_next(&mut reader, &mut buffer).unwrap(), ReadOutcome::Data(2));
        assert_eq!(read_next(&mut reader, &mut buffer).unwrap(), ReadOutcome::EndOfStream);
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
        }
    }

    #[test]
    fn test_read_error_is_reported() {
        let mut buffer = [0u8; 8];
        assert!(matches!(
            read_next(&mut BrokenReader, &mut buffer),
            Err(ConnectionError::Read(_))
        ));
    }
}
