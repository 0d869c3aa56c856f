//! Device sessions.
//!
//! The driver layer provides the API the collector talks to: send a command
//! and get its output back, step into a line-card shell and back out, and
//! close the session.

mod builder;
mod connector;
pub(crate) mod response;
mod session;

pub use builder::SessionBuilder;
pub use connector::{CliConnector, Connector, Credentials};
pub use response::Response;
pub use session::CliSession;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Lifecycle of a session.
///
/// ```text
/// Closed --open--> Ready --enter_context--> InSubContext
///   ^                |  <----exit_context------'
///   '----close-------'
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Ready,
    InSubContext,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Closed => "closed",
            SessionState::Ready => "ready",
            SessionState::InSubContext => "in a sub-context",
        };
        f.write_str(name)
    }
}

/// An open command session to one device.
pub trait Session: Send {
    /// Send a command and wait for the current prompt.
    ///
    /// In a sub-context the prompt is the one given to
    /// [`enter_context`](Session::enter_context), otherwise the platform's
    /// exec prompt.
    fn send(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Send a command that opens a nested shell and wait for `prompt`.
    ///
    /// `prompt` is anchored to the end of the received output. A timeout
    /// surfaces as [`ChannelError::PromptMismatch`](crate::error::ChannelError::PromptMismatch).
    fn enter_context(
        &mut self,
        command: &str,
        timeout: Duration,
        prompt: &str,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Leave the nested shell and wait for `prompt`.
    fn exit_context(
        &mut self,
        timeout: Duration,
        prompt: &str,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Release the connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Current lifecycle state.
    fn state(&self) -> SessionState;
}
