//! CLI session over SSH or telnet.

use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;

use super::response::Response;
use super::{Session, SessionState};
use crate::channel::{PtyChannel, PtyConfig, compile_prompt_pattern};
use crate::error::{ChannelError, Error, Result, SessionError, TransportError};
use crate::platform::PlatformDefinition;
use crate::transport::{SshConfig, SshShell, TelnetTransport, Transport};

static USERNAME_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:user ?name|login)\s*:\s*\z").expect("valid username prompt pattern")
});

static PASSWORD_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)password\s*:\s*\z").expect("valid password prompt pattern"));

/// Where and how to connect.
#[derive(Debug)]
pub(crate) enum Target {
    Ssh(SshConfig),
    Telnet {
        host: String,
        port: u16,
        username: String,
        password: SecretString,
    },
}

/// Interactive CLI session against one device.
///
/// Created by [`SessionBuilder`](super::SessionBuilder); call
/// [`open`](CliSession::open) before sending anything.
pub struct CliSession {
    target: Target,
    platform: PlatformDefinition,
    pty_config: PtyConfig,
    timeout: Duration,
    channel: Option<PtyChannel>,
    state: SessionState,
    context_prompt: Option<Regex>,
}

impl CliSession {
    pub(crate) fn new(
        target: Target,
        platform: PlatformDefinition,
        pty_config: PtyConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            target,
            platform,
            pty_config,
            timeout,
            channel: None,
            state: SessionState::Closed,
            context_prompt: None,
        }
    }

    /// Get a reference to the platform definition.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    #[cfg(test)]
    pub(crate) fn target(&self) -> &Target {
        &self.target
    }

    /// Connect the transport, log in if needed and prepare the terminal.
    pub async fn open(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Err(SessionError::AlreadyConnected.into());
        }

        let transport = match &self.target {
            Target::Ssh(config) => Transport::Ssh(SshShell::open(config).await?),
            Target::Telnet { host, port, .. } => {
                Transport::Telnet(TelnetTransport::connect(host, *port, self.timeout).await?)
            }
        };

        self.open_with(transport).await
    }

    /// Finish opening the session over an already connected transport.
    pub async fn open_with(&mut self, transport: Transport) -> Result<()> {
        if self.channel.is_some() {
            return Err(SessionError::AlreadyConnected.into());
        }

        let mut channel = PtyChannel::new(transport, self.pty_config.clone());
        match establish(&mut channel, &self.platform, &self.target, self.timeout).await {
            Ok(()) => {
                self.channel = Some(channel);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = channel.close().await {
                    debug!("close after failed open: {}", close_err);
                }
                Err(e)
            }
        }
    }

    fn state_error(&self, operation: &'static str) -> Error {
        match self.state {
            SessionState::Closed => SessionError::NotConnected.into(),
            state => SessionError::InvalidState {
                operation,
                state: state.to_string(),
            }
            .into(),
        }
    }

    async fn switch_context(
        &mut self,
        command: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<(Response, Regex)> {
        let pattern = compile_prompt_pattern(prompt).map_err(ChannelError::from)?;
        let channel = self.channel.as_mut().ok_or(SessionError::NotConnected)?;

        let start = Instant::now();
        channel.send_line(command).await?;
        let data = channel
            .read_until_pattern(&pattern, timeout)
            .await
            .map_err(|e| match e {
                Error::Channel(ChannelError::PatternTimeout(timeout)) => {
                    ChannelError::PromptMismatch {
                        command: command.to_string(),
                        pattern: prompt.to_string(),
                        timeout,
                    }
                    .into()
                }
                other => other,
            })?;

        let response =
            Response::from_output(command, &data, &pattern, start.elapsed(), &self.platform);
        Ok((response, pattern))
    }
}

/// Log in if the transport needs it, wait for the exec prompt and run the
/// platform's on-open commands.
async fn establish(
    channel: &mut PtyChannel,
    platform: &PlatformDefinition,
    target: &Target,
    timeout: Duration,
) -> Result<()> {
    match target {
        Target::Telnet {
            username, password, ..
        } if channel.needs_login() => login(channel, platform, username, password, timeout).await?,
        _ => {
            wait_for(channel, &platform.exec_prompt, timeout).await?;
        }
    }

    for command in &platform.on_open_commands {
        debug!("on-open: {}", command);
        channel.send_line(command).await?;
        channel
            .read_until_pattern(&platform.exec_prompt, timeout)
            .await?;
    }

    Ok(())
}

async fn login(
    channel: &mut PtyChannel,
    platform: &PlatformDefinition,
    username: &str,
    password: &SecretString,
    timeout: Duration,
) -> Result<()> {
    wait_for(channel, &USERNAME_PROMPT, timeout).await?;
    channel.send_line(username).await?;
    wait_for(channel, &PASSWORD_PROMPT, timeout).await?;
    channel.send_line(password.expose_secret()).await?;

    // Either the exec prompt or another login round
    let either = Regex::new(&format!(
        "(?:{})|(?:{})|(?:{})",
        platform.exec_prompt.as_str(),
        USERNAME_PROMPT.as_str(),
        PASSWORD_PROMPT.as_str()
    ))
    .map_err(ChannelError::from)?;
    let data = wait_for(channel, &either, timeout).await?;

    if platform.exec_prompt.is_match(&data) {
        trace!("telnet login accepted");
        Ok(())
    } else {
        Err(TransportError::AuthenticationFailed {
            user: username.to_string(),
        }
        .into())
    }
}

/// Wait for a prompt during open; timeouts and hangups are connection
/// failures at this stage.
async fn wait_for(channel: &mut PtyChannel, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
    channel
        .read_until_pattern(pattern, timeout)
        .await
        .map_err(|e| match e {
            Error::Channel(ChannelError::PatternTimeout(t)) => TransportError::Timeout(t).into(),
            Error::Channel(ChannelError::Closed) => TransportError::Disconnected.into(),
            other => other,
        })
}

impl Session for CliSession {
    async fn send(&mut self, command: &str, timeout: Duration) -> Result<Response> {
        let channel = self.channel.as_mut().ok_or(SessionError::NotConnected)?;
        let pattern = match (&self.state, &self.context_prompt) {
            (SessionState::InSubContext, Some(context)) => context,
            _ => &self.platform.exec_prompt,
        };

        let start = Instant::now();
        channel.send_line(command).await?;
        let data = channel.read_until_pattern(pattern, timeout).await?;

        Ok(Response::from_output(
            command,
            &data,
            pattern,
            start.elapsed(),
            &self.platform,
        ))
    }

    async fn enter_context(
        &mut self,
        command: &str,
        timeout: Duration,
        prompt: &str,
    ) -> Result<Response> {
        if self.state != SessionState::Ready {
            return Err(self.state_error("enter_context"));
        }

        let (response, pattern) = self.switch_context(command, prompt, timeout).await?;
        self.context_prompt = Some(pattern);
        self.state = SessionState::InSubContext;
        Ok(response)
    }

    async fn exit_context(&mut self, timeout: Duration, prompt: &str) -> Result<Response> {
        if self.state != SessionState::InSubContext {
            return Err(self.state_error("exit_context"));
        }

        let command = self.platform.context_exit_command.clone();
        let (response, _) = self.switch_context(&command, prompt, timeout).await?;
        self.context_prompt = None;
        self.state = SessionState::Ready;
        Ok(response)
    }

    async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Closed;
        self.context_prompt = None;
        if let Some(channel) = self.channel.take() {
            channel.close().await?;
        }
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::vendors::cisco_xr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    const PROMPT: &[u8] = b"\r\nRP/0/RP0/CPU0:r1#";

    fn telnet_session() -> CliSession {
        CliSession::new(
            Target::Telnet {
                host: "192.0.2.1".to_string(),
                port: 23,
                username: "admin".to_string(),
                password: SecretString::from("secret"),
            },
            cisco_xr::platform(),
            PtyConfig {
                settle: Duration::ZERO,
                ..Default::default()
            },
            Duration::from_millis(500),
        )
    }

    fn transport_pair() -> (Transport, DuplexStream) {
        let (ours, theirs) = tokio::io::duplex(8192);
        (
            Transport::Telnet(TelnetTransport::new(Box::new(ours))),
            theirs,
        )
    }

    /// Read one line the session sent.
    async fn recv_line(device: &mut DuplexStream) -> String {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            device.read_exact(&mut byte).await.unwrap();
            if byte[0] == b'\n' {
                return String::from_utf8(line).unwrap();
            }
            line.push(byte[0]);
        }
    }

    /// Play a well-behaved router: login, on-open commands, then echo each
    /// command followed by `reply` and the matching prompt.
    async fn fake_router(mut device: DuplexStream, replies: Vec<(&'static str, &'static [u8])>) {
        device.write_all(b"\r\nUsername: ").await.unwrap();
        assert_eq!(recv_line(&mut device).await, "admin");
        device.write_all(b"\r\nPassword: ").await.unwrap();
        assert_eq!(recv_line(&mut device).await, "secret");
        device.write_all(PROMPT).await.unwrap();

        for expected in ["terminal length 0", "terminal width 511"] {
            assert_eq!(recv_line(&mut device).await, expected);
            device.write_all(expected.as_bytes()).await.unwrap();
            device.write_all(PROMPT).await.unwrap();
        }

        for (expected, reply) in replies {
            let line = recv_line(&mut device).await;
            assert_eq!(line, expected);
            device.write_all(line.as_bytes()).await.unwrap();
            device.write_all(reply).await.unwrap();
        }

        // Hold the stream open until the session hangs up
        let mut rest = Vec::new();
        let _ = device.read_to_end(&mut rest).await;
    }

    #[tokio::test]
    async fn test_open_send_close() {
        let (transport, device) = transport_pair();
        let router = tokio::spawn(fake_router(
            device,
            vec![(
                "show clock",
                b"\r\n10:00:00.000 UTC Thu Oct 16 2026\r\nRP/0/RP0/CPU0:r1#",
            )],
        ));

        let mut session = telnet_session();
        session.open_with(transport).await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        let response = session
            .send("show clock", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.result, "10:00:00.000 UTC Thu Oct 16 2026");
        assert_eq!(response.prompt, "RP/0/RP0/CPU0:r1#");

        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        router.await.unwrap();
    }

    #[tokio::test]
    async fn test_sub_context_round_trip() {
        let (transport, device) = transport_pair();
        let router = tokio::spawn(fake_router(
            device,
            vec![
                ("attach location 0/1/CPU0", b"\r\n[xr-vm_node0_1_CPU0:~]$ "),
                (
                    "ofa_show_ltrace | grep linkstatus",
                    b"\r\nlinkstatus up\r\n[xr-vm_node0_1_CPU0:~]$ ",
                ),
                ("exit", b"\r\nlogout\r\nRP/0/RP0/CPU0:r1#"),
            ],
        ));

        let mut session = telnet_session();
        session.open_with(transport).await.unwrap();

        let timeout = Duration::from_secs(1);
        session
            .enter_context("attach location 0/1/CPU0", timeout, r"[#$]")
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::InSubContext);

        let response = session
            .send("ofa_show_ltrace | grep linkstatus", timeout)
            .await
            .unwrap();
        assert_eq!(response.result, "linkstatus up");

        session.exit_context(timeout, r"[#$]").await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        session.close().await.unwrap();
        router.await.unwrap();
    }

    #[tokio::test]
    async fn test_enter_context_prompt_mismatch() {
        let (transport, device) = transport_pair();
        let router = tokio::spawn(fake_router(
            device,
            vec![("attach location 0/9/CPU0", b"\r\nconnecting...")],
        ));

        let mut session = telnet_session();
        session.open_with(transport).await.unwrap();

        let err = session
            .enter_context("attach location 0/9/CPU0", Duration::from_millis(50), r"[#$]")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Channel(ChannelError::PromptMismatch { .. })
        ));
        assert_eq!(session.state(), SessionState::Ready);

        session.close().await.unwrap();
        router.await.unwrap();
    }

    #[tokio::test]
    async fn test_state_checks() {
        let mut session = telnet_session();
        let timeout = Duration::from_millis(10);

        assert!(matches!(
            session.send("show clock", timeout).await,
            Err(Error::Session(SessionError::NotConnected))
        ));
        assert!(matches!(
            session.exit_context(timeout, "#").await,
            Err(Error::Session(SessionError::NotConnected))
        ));

        let (transport, device) = transport_pair();
        let router = tokio::spawn(fake_router(device, vec![]));
        session.open_with(transport).await.unwrap();

        assert!(matches!(
            session.exit_context(timeout, "#").await,
            Err(Error::Session(SessionError::InvalidState { .. }))
        ));

        session.close().await.unwrap();
        // Closing twice is harmless
        session.close().await.unwrap();
        router.await.unwrap();
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let (transport, mut device) = transport_pair();
        let router = tokio::spawn(async move {
            device.write_all(b"Username: ").await.unwrap();
            recv_line(&mut device).await;
            device.write_all(b"Password: ").await.unwrap();
            recv_line(&mut device).await;
            device
                .write_all(b"\r\n% Authentication failed\r\n\r\nUsername: ")
                .await
                .unwrap();
            device
        });

        let mut session = telnet_session();
        let err = session.open_with(transport).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::AuthenticationFailed { .. })
        ));
        assert_eq!(session.state(), SessionState::Closed);
        drop(router.await.unwrap());
    }

    #[tokio::test]
    async fn test_no_prompt_is_connection_error() {
        let (transport, mut device) = transport_pair();
        device.write_all(b"Username: ").await.unwrap();

        let mut session = telnet_session();
        let open = session.open_with(transport);
        // Swallow the username and never answer again
        let (result, _) = tokio::join!(open, recv_line(&mut device));
        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::Timeout(_)))
        ));
    }
}
