//! Error types for ncswatch.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for ncswatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Inventory file could not be loaded or validated
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Transport-level errors (connect, authenticate)
    #[error("Connection error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors (timeouts, prompt mismatches)
    #[error("Command error: {0}")]
    Channel(#[from] ChannelError),

    /// Session state errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Discovery output did not have the expected shape
    #[error("Parsing error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Per-device output file errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Archive creation errors
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

impl Error {
    /// Whether this error is confined to a single device run.
    ///
    /// Device-scoped errors are logged and the batch moves on to the next
    /// device. Everything else aborts the batch.
    pub fn is_device_scoped(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Channel(_) | Error::Session(_) | Error::Discovery(_)
        )
    }

    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "Config error",
            Error::Transport(_) => "Connection error",
            Error::Channel(ChannelError::PromptMismatch { .. }) => "Prompt mismatch",
            Error::Channel(_) => "Command error",
            Error::Session(_) => "Session error",
            Error::Discovery(_) => "Parsing error",
            Error::Output(_) => "Output error",
            Error::Archive(_) => "Archive error",
        }
    }
}

/// Inventory loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// YAML syntax, unknown field, bad address or unsupported device type
    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Well-formed but semantically invalid
    #[error("invalid config: {message}")]
    Invalid { message: String },

    /// Transport config file could not be read
    #[error("failed to read transport config '{path}': {source}")]
    TransportConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Transport layer errors (SSH or telnet connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key does not match the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host not present in known_hosts under strict checking
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, reads and writes).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Context switch did not produce the expected prompt
    #[error("Prompt '{pattern}' not seen within {timeout:?} after '{command}'")]
    PromptMismatch {
        command: String,
        pattern: String,
        timeout: Duration,
    },

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// I/O error on the underlying stream
    #[error("Channel I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Session layer errors (state machine misuse).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Session not connected
    #[error("Session not connected - call open() first")]
    NotConnected,

    /// Session already connected
    #[error("Session already connected")]
    AlreadyConnected,

    /// Operation not valid in the current state
    #[error("'{operation}' is not valid while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Discovery output errors.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The device rejected the discovery command
    #[error("'{command}' was rejected ({marker}): {output}")]
    Rejected {
        command: String,
        marker: String,
        output: String,
    },
}

/// Per-device output file errors.
#[derive(Error, Debug)]
pub enum OutputError {
    /// Failed writing the output file
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed reading the output file
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Working directory is already present on disk
    #[error("working directory '{path}' already exists")]
    WorkDirExists { path: PathBuf },

    /// Archive would be written inside the working directory it archives
    #[error("archive '{archive}' must not be inside the working directory '{work_dir}'")]
    ArchiveInWorkDir { archive: PathBuf, work_dir: PathBuf },

    /// Output text did not start with a header block
    #[error("malformed output: {message}")]
    Malformed { message: String },
}

/// Archive creation errors.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Filesystem error while walking or reading the source tree
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory walk failed
    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// Zip writer error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Result type alias using ncswatch's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_scoped() {
        assert!(Error::from(TransportError::Disconnected).is_device_scoped());
        assert!(Error::from(ChannelError::Closed).is_device_scoped());
        assert!(Error::from(SessionError::NotConnected).is_device_scoped());
        assert!(
            !Error::from(ConfigError::Invalid {
                message: "x".into()
            })
            .is_device_scoped()
        );
        assert!(
            !Error::from(OutputError::Malformed {
                message: "x".into()
            })
            .is_device_scoped()
        );
    }

    #[test]
    fn test_kind_labels() {
        let err = Error::from(ChannelError::PromptMismatch {
            command: "attach location 0/1/CPU0".into(),
            pattern: "[#$]".into(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(err.kind(), "Prompt mismatch");
        assert_eq!(
            Error::from(ChannelError::PatternTimeout(Duration::from_secs(1))).kind(),
            "Command error"
        );
        assert_eq!(
            Error::from(TransportError::Disconnected).kind(),
            "Connection error"
        );
    }
}
