//! Interactive channel: a transport plus prompt-driven reads.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};
use crate::transport::Transport;

/// Configuration for channel reads.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Search depth for pattern matching.
    pub search_depth: usize,

    /// How long to keep listening after a prompt matched before treating the
    /// read as complete. Output that arrives inside the window is appended
    /// and the prompt search starts over.
    pub settle: Duration,

    /// Line terminator sent after each command.
    pub return_char: &'static str,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            search_depth: super::buffer::DEFAULT_SEARCH_DEPTH,
            settle: Duration::from_millis(100),
            return_char: "\n",
        }
    }
}

/// High-level channel for interactive device sessions.
pub struct PtyChannel {
    transport: Transport,
    buffer: PatternBuffer,
    config: PtyConfig,
}

impl PtyChannel {
    /// Wrap an open transport.
    pub fn new(transport: Transport, config: PtyConfig) -> Self {
        Self {
            transport,
            buffer: PatternBuffer::new(config.search_depth),
            config,
        }
    }

    /// Send one line of input.
    pub async fn send_line(&mut self, input: &str) -> Result<()> {
        let mut line = Vec::with_capacity(input.len() + self.config.return_char.len());
        line.extend_from_slice(input.as_bytes());
        line.extend_from_slice(self.config.return_char.as_bytes());
        self.transport.write(&line).await
    }

    /// Read until `pattern` matches the end of the received output.
    ///
    /// Returns everything read, including the matched prompt. Fails with
    /// [`ChannelError::PatternTimeout`] when `timeout` elapses first and with
    /// [`ChannelError::Closed`] when the remote side hangs up.
    pub async fn read_until_pattern(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.buffer.tail_contains(pattern) {
                if self.config.settle.is_zero() {
                    return Ok(self.buffer.take());
                }
                match tokio::time::timeout(self.config.settle, self.transport.read()).await {
                    Err(_) | Ok(Ok(None)) => return Ok(self.buffer.take()),
                    Ok(Ok(Some(chunk))) => {
                        trace!("late output after prompt: {} bytes", chunk.len());
                        self.buffer.extend(&chunk);
                        continue;
                    }
                    Ok(Err(e)) => return Err(e),
                }
            }

            match tokio::time::timeout_at(deadline, self.transport.read()).await {
                Err(_) => return Err(ChannelError::PatternTimeout(timeout).into()),
                Ok(Ok(Some(chunk))) => {
                    trace!("read {} bytes", chunk.len());
                    self.buffer.extend(&chunk);
                }
                Ok(Ok(None)) => return Err(ChannelError::Closed.into()),
                Ok(Err(e)) => return Err(e),
            }
        }
    }

    /// Close the underlying transport.
    pub async fn close(self) -> Result<()> {
        self.transport.close().await
    }

    /// Whether the transport expects an in-band login.
    pub fn needs_login(&self) -> bool {
        self.transport.needs_login()
    }
}
