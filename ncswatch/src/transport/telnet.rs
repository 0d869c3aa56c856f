//! Minimal telnet transport.
//!
//! Only what an IOS-XR vty needs: option negotiation where we agree to let
//! the server echo and suppress go-ahead and refuse everything else, with
//! subnegotiations dropped. Login is handled one layer up against the
//! decoded byte stream.

use std::time::Duration;

use bytes::BytesMut;
use log::trace;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::BoxedStream;
use crate::error::{ChannelError, Result, TransportError};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;

/// Telnet connection over any byte stream.
pub struct TelnetTransport {
    stream: BoxedStream,
    decoder: TelnetDecoder,
    read_buf: BytesMut,
    /// Decoded data not yet handed to the caller.
    pending: Vec<u8>,
    /// Negotiation replies not yet written.
    replies: Vec<u8>,
}

impl TelnetTransport {
    /// Open a TCP connection to the telnet server.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
            .map_err(|source| TransportError::ConnectionFailed {
                host: host.to_string(),
                port,
                source,
            })?;
        stream.set_nodelay(true).map_err(TransportError::Io)?;
        Ok(Self::new(Box::new(stream)))
    }

    /// Wrap an already connected stream.
    pub fn new(stream: BoxedStream) -> Self {
        Self {
            stream,
            decoder: TelnetDecoder::default(),
            read_buf: BytesMut::with_capacity(4096),
            pending: Vec::new(),
            replies: Vec::new(),
        }
    }

    /// Write data, escaping literal 0xFF bytes.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let escaped;
        let out = if memchr::memchr(IAC, data).is_some() {
            escaped = data
                .iter()
                .flat_map(|&b| if b == IAC { vec![IAC, IAC] } else { vec![b] })
                .collect::<Vec<u8>>();
            escaped.as_slice()
        } else {
            data
        };
        self.stream.write_all(out).await.map_err(ChannelError::Io)?;
        self.stream.flush().await.map_err(ChannelError::Io)?;
        Ok(())
    }

    /// Read the next chunk of application data, `None` on EOF.
    ///
    /// Negotiation replies are written before the data is returned.
    pub async fn read(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if !self.replies.is_empty() {
                trace!("telnet: sending {} negotiation bytes", self.replies.len());
                self.stream
                    .write_all(&self.replies)
                    .await
                    .map_err(ChannelError::Io)?;
                self.stream.flush().await.map_err(ChannelError::Io)?;
                self.replies.clear();
            }

            if !self.pending.is_empty() {
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            self.read_buf.clear();
            let n = self
                .stream
                .read_buf(&mut self.read_buf)
                .await
                .map_err(ChannelError::Io)?;
            if n == 0 {
                return Ok(None);
            }

            self.decoder
                .decode(&self.read_buf, &mut self.pending, &mut self.replies);
        }
    }

    /// Shut down the write side of the stream.
    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(ChannelError::Io)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Incremental telnet stream decoder; state survives chunk boundaries.
#[derive(Debug, Default)]
struct TelnetDecoder {
    state: DecodeState,
}

impl TelnetDecoder {
    fn decode(&mut self, input: &[u8], data: &mut Vec<u8>, replies: &mut Vec<u8>) {
        let mut rest = input;

        while !rest.is_empty() {
            if self.state == DecodeState::Data {
                match memchr::memchr(IAC, rest) {
                    Some(pos) => {
                        data.extend_from_slice(&rest[..pos]);
                        self.state = DecodeState::Iac;
                        rest = &rest[pos + 1..];
                    }
                    None => {
                        data.extend_from_slice(rest);
                        return;
                    }
                }
                continue;
            }

            let byte = rest[0];
            rest = &rest[1..];

            self.state = match self.state {
                DecodeState::Iac => match byte {
                    IAC => {
                        data.push(IAC);
                        DecodeState::Data
                    }
                    DO | DONT | WILL | WONT => DecodeState::Negotiate(byte),
                    SB => DecodeState::Sub,
                    // NOP, GA, AYT and friends carry no payload
                    _ => DecodeState::Data,
                },
                DecodeState::Negotiate(verb) => {
                    if let Some(reply) = negotiation_reply(verb, byte) {
                        replies.extend_from_slice(&[IAC, reply, byte]);
                    }
                    DecodeState::Data
                }
                DecodeState::Sub => {
                    if byte == IAC {
                        DecodeState::SubIac
                    } else {
                        DecodeState::Sub
                    }
                }
                DecodeState::SubIac => {
                    if byte == SE {
                        DecodeState::Data
                    } else {
                        DecodeState::Sub
                    }
                }
                DecodeState::Data => DecodeState::Data,
            };
        }
    }
}

/// Reply to a negotiation request, or `None` when already in agreement.
fn negotiation_reply(verb: u8, option: u8) -> Option<u8> {
    match verb {
        WILL if option == OPT_ECHO || option == OPT_SGA => Some(DO),
        WILL => Some(DONT),
        DO => Some(WONT),
        // Refusals need no answer since we never enable anything on our side
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> (Vec<u8>, Vec<u8>) {
        let mut decoder = TelnetDecoder::default();
        let mut data = Vec::new();
        let mut replies = Vec::new();
        for chunk in chunks {
            decoder.decode(chunk, &mut data, &mut replies);
        }
        (data, replies)
    }

    #[test]
    fn test_plain_data_passes_through() {
        let (data, replies) = decode_all(&[b"Username: "]);
        assert_eq!(data, b"Username: ");
        assert!(replies.is_empty());
    }

    #[test]
    fn test_negotiation_replies() {
        let (data, replies) = decode_all(&[&[
            IAC, WILL, OPT_ECHO, IAC, WILL, OPT_SGA, IAC, DO, 24, IAC, WILL, 31, b'o', b'k',
        ]]);
        assert_eq!(data, b"ok");
        assert_eq!(
            replies,
            vec![IAC, DO, OPT_ECHO, IAC, DO, OPT_SGA, IAC, WONT, 24, IAC, DONT, 31]
        );
    }

    #[test]
    fn test_sequence_split_across_chunks() {
        let (data, replies) = decode_all(&[b"ab", &[IAC], &[DO], &[OPT_ECHO, b'c']]);
        assert_eq!(data, b"abc");
        assert_eq!(replies, vec![IAC, WONT, OPT_ECHO]);
    }

    #[test]
    fn test_subnegotiation_dropped() {
        let (data, _) = decode_all(&[&[b'x', IAC, SB, 24, 1, IAC, SE, b'y']]);
        assert_eq!(data, b"xy");
    }

    #[test]
    fn test_escaped_iac() {
        let (data, _) = decode_all(&[&[b'a', IAC, IAC, b'b']]);
        assert_eq!(data, vec![b'a', IAC, b'b']);
    }

    #[tokio::test]
    async fn test_read_answers_before_returning_data() {
        let mock = tokio_test::io::Builder::new()
            .read(&[IAC, DO, OPT_ECHO, b'U', b's', b'e', b'r', b':', b' '])
            .write(&[IAC, WONT, OPT_ECHO])
            .read(b"more")
            .build();
        let mut telnet = TelnetTransport::new(Box::new(mock));

        assert_eq!(telnet.read().await.unwrap(), Some(b"User: ".to_vec()));
        assert_eq!(telnet.read().await.unwrap(), Some(b"more".to_vec()));
        assert_eq!(telnet.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_escapes_iac() {
        let mock = tokio_test::io::Builder::new()
            .write(&[b'a', IAC, IAC, b'\n'])
            .build();
        let mut telnet = TelnetTransport::new(Box::new(mock));
        telnet.write(&[b'a', IAC, b'\n']).await.unwrap();
    }

    #[tokio::test]
    async fn test_negotiation_only_chunk_keeps_reading() {
        let mock = tokio_test::io::Builder::new()
            .read(&[IAC, WILL, OPT_SGA])
            .write(&[IAC, DO, OPT_SGA])
            .read(b"RP/0/RP0/CPU0:r1#")
            .build();
        let mut telnet = TelnetTransport::new(Box::new(mock));
        assert_eq!(
            telnet.read().await.unwrap(),
            Some(b"RP/0/RP0/CPU0:r1#".to_vec())
        );
    }
}
