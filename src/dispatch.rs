//! State dispatch loop
//!
//! Drives the connection state machine
//! `Disconnected -> (timed wait) -> Connecting -> Connected -> Disconnected`
//! and feeds every decoded state code to the display controller, in order.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::connection::codec::{CodeDecoder, Token};
use crate::connection::{read_next, Connector, ReadOutcome};
use crate::display::{DisplayError, DisplaySurfaceProvider};
use crate::overlay::DisplayController;
use crate::shutdown::Waiter;

/// Fixed delays between connection attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after a failed connect
    pub connect_retry: Duration,
    /// Wait after the stream ended
    pub reconnect_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_retry: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

enum LinkState<S> {
    Disconnected { retry_in: Duration },
    Connecting,
    Connected(S),
}

enum StreamStatus {
    Open,
    Closed,
}

/// Reads state codes from the upstream connection and dispatches them
pub struct DispatchLoop<C: Connector, W: Waiter> {
    connector: C,
    waiter: W,
    policy: RetryPolicy,
    buffer: Vec<u8>,
    decoder: CodeDecoder,
}

impl<C: Connector, W: Waiter> DispatchLoop<C, W> {
    pub fn new(connector: C, waiter: W, policy: RetryPolicy, buffer_size: usize) -> Self {
        Self {
            connector,
            waiter,
            policy,
            buffer: vec![0; buffer_size.max(1)],
            decoder: CodeDecoder::new(),
        }
    }

    /// Run until shutdown is requested.
    ///
    /// Connection failures are retried forever. Only a display failure ends
    /// the loop with an error.
    pub fn run<P: DisplaySurfaceProvider>(
        &mut self,
        controller: &mut DisplayController<P>,
    ) -> Result<(), DisplayError> {
        info!("Connecting to socket at {}", self.connector.endpoint());
        let mut link = LinkState::Connecting;

        loop {
            if self.waiter.shutdown_requested() {
                info!("Dispatch loop stopping");
                return Ok(());
            }

            link = match link {
                LinkState::Disconnected { retry_in } => {
                    if !self.waiter.wait(retry_in) {
                        info!("Dispatch loop stopping");
                        return Ok(());
                    }
                    LinkState::Connecting
                }
                LinkState::Connecting => match self.connector.connect() {
                    Ok(stream) => {
                        info!("Connected to socket");
                        self.decoder.reset();
                        LinkState::Connected(stream)
                    }
                    Err(e) => {
                        warn!(
                            "{}, retrying in {} seconds...",
                            e,
                            self.policy.connect_retry.as_secs_f32()
                        );
                        LinkState::Disconnected {
                            retry_in: self.policy.connect_retry,
                        }
                    }
                },
                LinkState::Connected(mut stream) => match self.pump(&mut stream, controller)? {
                    StreamStatus::Open => LinkState::Connected(stream),
                    StreamStatus::Closed => {
                        drop(stream);
                        info!("Disconnected from socket, reconnecting...");
                        LinkState::Disconnected {
                            retry_in: self.policy.reconnect_delay,
                        }
                    }
                },
            };
        }
    }

    /// Read one chunk and dispatch every code it completes
    fn pump<P: DisplaySurfaceProvider>(
        &mut self,
        stream: &mut C::Stream,
        controller: &mut DisplayController<P>,
    ) -> Result<StreamStatus, DisplayError> {
        let len = match read_next(stream, &mut self.buffer) {
            Ok(ReadOutcome::Data(len)) => len,
            Ok(ReadOutcome::Idle) => return Ok(StreamStatus::Open),
            Ok(ReadOutcome::EndOfStream) => {
                apply_tokens(self.decoder.finish(), controller)?;
                return Ok(StreamStatus::Closed);
            }
            Err(e) => {
                warn!("{}", e);
                self.decoder.reset();
                return Ok(StreamStatus::Closed);
            }
        };

        apply_tokens(self.decoder.feed(&self.buffer[..len]), controller)?;
        Ok(StreamStatus::Open)
    }
}

fn apply_tokens<P: DisplaySurfaceProvider>(
    tokens: impl IntoIterator<Item = Token>,
    controller: &mut DisplayController<P>,
) -> Result<(), DisplayError> {
    for token in tokens {
        match token {
            Token::Code(code) => {
                debug!("Received state: {}", code);
                controller.dispatch(code)?;
            }
            Token::Malformed(text) => warn!("Ignoring malformed state code {:?}", text),
        }
    }
    Ok(())
}
