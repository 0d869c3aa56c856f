//! Builder for creating device sessions.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use super::session::{CliSession, Target};
use crate::channel::PtyConfig;
use crate::error::{Result, SessionError};
use crate::platform::PlatformDefinition;
use crate::transport::{AuthMethod, HostKeyVerification, HostParams, SshConfig, TransportKind};

/// Builder for constructing device sessions.
///
/// # Example
///
/// ```rust,no_run
/// use ncswatch::driver::SessionBuilder;
/// use ncswatch::platform::vendors::cisco_xr;
///
/// # async fn example() -> Result<(), ncswatch::Error> {
/// let mut session = SessionBuilder::new("192.0.2.10")
///     .username("admin")
///     .password("secret")
///     .platform(cisco_xr::platform())
///     .build()?;
///
/// session.open().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: Option<u16>,
    transport: TransportKind,
    username: Option<String>,
    password: Option<SecretString>,
    identity_files: Vec<PathBuf>,
    platform: Option<PlatformDefinition>,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    host_params: HostParams,
    pty_config: PtyConfig,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            transport: TransportKind::Ssh,
            username: None,
            password: None,
            identity_files: Vec::new(),
            platform: None,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            host_params: HostParams::default(),
            pty_config: PtyConfig::default(),
        }
    }

    /// Set the port (default: the transport's well-known port).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Choose SSH or telnet.
    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password, used for SSH password and keyboard-interactive
    /// authentication and for telnet login.
    pub fn password(mut self, password: impl Into<SecretString>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Add a private key to try before the password.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.identity_files.push(key_path.into());
        self
    }

    /// Set the platform definition.
    pub fn platform(mut self, platform: PlatformDefinition) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set the connect and login timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set host key verification mode (default: `AcceptNew`).
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Set a custom known_hosts file path (default: `~/.ssh/known_hosts`).
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Apply settings resolved from an OpenSSH client config.
    ///
    /// Explicit builder settings win over the config, except that the config
    /// `HostName` replaces the host and its identity files are tried first.
    pub fn host_params(mut self, params: HostParams) -> Self {
        self.host_params = params;
        self
    }

    /// Set channel read settings.
    pub fn pty_config(mut self, config: PtyConfig) -> Self {
        self.pty_config = config;
        self
    }

    /// Build the session.
    ///
    /// This does not connect. Call [`CliSession::open`] on the result.
    pub fn build(self) -> Result<CliSession> {
        let platform = self.platform.ok_or_else(|| SessionError::InvalidConfig {
            message: "Platform must be specified".to_string(),
        })?;

        let params = self.host_params;
        let username = self
            .username
            .or(params.user)
            .ok_or_else(|| SessionError::InvalidConfig {
                message: "Username is required".to_string(),
            })?;

        let target = match self.transport {
            TransportKind::Telnet => {
                let password = self.password.ok_or_else(|| SessionError::InvalidConfig {
                    message: "Telnet login requires a password".to_string(),
                })?;
                Target::Telnet {
                    host: self.host,
                    port: self.port.unwrap_or(TransportKind::Telnet.default_port()),
                    username,
                    password,
                }
            }
            TransportKind::Ssh => {
                let mut auth: Vec<AuthMethod> = params
                    .identity_files
                    .into_iter()
                    .chain(self.identity_files)
                    .map(|path| AuthMethod::PrivateKey {
                        path,
                        passphrase: None,
                    })
                    .collect();
                if let Some(password) = self.password {
                    let copy = SecretString::from(password.expose_secret());
                    auth.push(AuthMethod::Password(password));
                    auth.push(AuthMethod::KeyboardInteractive(copy));
                }
                if auth.is_empty() {
                    return Err(SessionError::InvalidConfig {
                        message: "No authentication method configured".to_string(),
                    }
                    .into());
                }

                Target::Ssh(SshConfig {
                    host: params.host_name.unwrap_or(self.host),
                    port: self
                        .port
                        .or(params.port)
                        .unwrap_or(TransportKind::Ssh.default_port()),
                    username,
                    auth,
                    timeout: params.connect_timeout.unwrap_or(self.timeout),
                    terminal_width: platform.terminal_width,
                    terminal_height: platform.terminal_height,
                    host_key_verification: params
                        .strict_host_key_checking
                        .unwrap_or(self.host_key_verification),
                    known_hosts_path: self.known_hosts_path.or(params.user_known_hosts_file),
                })
            }
        };

        Ok(CliSession::new(target, platform, self.pty_config, self.timeout))
    }
}
