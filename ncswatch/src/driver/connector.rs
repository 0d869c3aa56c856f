//! Opening sessions for inventory devices.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use super::{CliSession, Session, SessionBuilder};
use crate::channel::PtyConfig;
use crate::config::DeviceConfig;
use crate::error::Result;
use crate::transport::{OpenSshConfig, TransportKind};

/// Login credentials shared by every device in a batch.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self::new(
            self.username.clone(),
            SecretString::from(self.password.expose_secret()),
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Something that can open a ready-to-use session for an inventory device.
pub trait Connector: Send + Sync {
    type Session: Session;

    /// Connect to `device` and wait until it accepts commands.
    ///
    /// `timeout` bounds the connect and every prompt wait during login.
    fn connect(
        &self,
        name: &str,
        device: &DeviceConfig,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// Connector for real devices over SSH or telnet.
#[derive(Debug, Clone)]
pub struct CliConnector {
    credentials: Credentials,
    transport_config: Option<OpenSshConfig>,
    pty_config: PtyConfig,
}

impl CliConnector {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            transport_config: None,
            pty_config: PtyConfig::default(),
        }
    }

    /// Resolve SSH settings from an OpenSSH client config.
    pub fn with_transport_config(mut self, config: OpenSshConfig) -> Self {
        self.transport_config = Some(config);
        self
    }

    /// Override channel read settings.
    pub fn with_pty_config(mut self, config: PtyConfig) -> Self {
        self.pty_config = config;
        self
    }

    fn builder(&self, device: &DeviceConfig, timeout: Duration) -> SessionBuilder {
        let host = device.address.to_string();
        let transport = device.device_type.transport();

        let mut builder = SessionBuilder::new(&host)
            .transport(transport)
            .platform(device.device_type.platform())
            .username(&self.credentials.username)
            .password(SecretString::from(self.credentials.password.expose_secret()))
            .timeout(timeout)
            .pty_config(self.pty_config.clone());

        if let (TransportKind::Ssh, Some(config)) = (transport, &self.transport_config) {
            builder = builder.host_params(config.resolve(&host));
        }

        builder
    }
}

impl Connector for CliConnector {
    type Session = CliSession;

    async fn connect(
        &self,
        name: &str,
        device: &DeviceConfig,
        timeout: Duration,
    ) -> Result<CliSession> {
        debug!("[{}] platform {}", name, device.device_type);
        let mut session = self.builder(device, timeout).build()?;
        session.open().await?;
        Ok(session)
    }
}
