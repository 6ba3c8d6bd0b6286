//! Telnet transport over a plain TCP stream.
//!
//! Only the option negotiation a CLI session needs is implemented: the
//! server may echo and suppress go-ahead, every other option is refused
//! and subnegotiations are skipped.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, trace};
use memchr::memchr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::Transport;
use crate::error::{ChannelError, Result, TransportError};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SUPPRESS_GO_AHEAD: u8 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Incremental telnet command filter.
///
/// Keeps its state between calls so commands split across reads are
/// handled.
#[derive(Debug, Default)]
pub struct TelnetCodec {
    state: State,
}

impl TelnetCodec {
    /// Create a codec in the data state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip telnet commands from `input`, returning the payload bytes.
    ///
    /// Negotiation answers are appended to `replies`.
    pub fn decode(&mut self, input: &[u8], replies: &mut Vec<u8>) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len());
        let mut rest = input;

        while !rest.is_empty() {
            if self.state == State::Data {
                match memchr(IAC, rest) {
                    Some(pos) => {
                        out.extend_from_slice(&rest[..pos]);
                        self.state = State::Iac;
                        rest = &rest[pos + 1..];
                    }
                    None => {
                        out.extend_from_slice(rest);
                        break;
                    }
                }
                continue;
            }

            let byte = rest[0];
            rest = &rest[1..];
            self.state = match self.state {
                State::Iac => match byte {
                    IAC => {
                        out.push(IAC);
                        State::Data
                    }
                    DO | DONT | WILL | WONT => State::Negotiate(byte),
                    SB => State::Sub,
                    _ => State::Data,
                },
                State::Negotiate(verb) => {
                    if let Some(answer) = Self::answer(verb, byte) {
                        replies.extend_from_slice(&answer);
                    }
                    State::Data
                }
                State::Sub if byte == IAC => State::SubIac,
                State::Sub => State::Sub,
                State::SubIac if byte == SE => State::Data,
                State::SubIac => State::Sub,
                State::Data => State::Data,
            };
        }

        out
    }

    /// Escape payload bytes for the wire.
    ///
    /// IAC is doubled and bare line feeds become CR LF.
    pub fn encode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + 2);
        let mut previous = 0u8;
        for &byte in data {
            match byte {
                IAC => out.extend_from_slice(&[IAC, IAC]),
                b'\n' if previous != b'\r' => out.extend_from_slice(b"\r\n"),
                _ => out.push(byte),
            }
            previous = byte;
        }
        out
    }

    fn answer(verb: u8, option: u8) -> Option<[u8; 3]> {
        match verb {
            DO if option == OPT_SUPPRESS_GO_AHEAD => Some([IAC, WILL, option]),
            DO => Some([IAC, WONT, option]),
            WILL if option == OPT_ECHO || option == OPT_SUPPRESS_GO_AHEAD => {
                Some([IAC, DO, option])
            }
            WILL => Some([IAC, DONT, option]),
            _ => None,
        }
    }
}

/// Telnet transport.
pub struct TelnetTransport {
    stream: TcpStream,
    codec: TelnetCodec,
    read_buf: Vec<u8>,
}

impl TelnetTransport {
    /// Open a TCP connection to a telnet server.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        debug!("telnet: connecting to {}:{}", host, port);

        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
            .map_err(|source| TransportError::ConnectionFailed {
                host: host.to_string(),
                port,
                source,
            })?;

        Ok(Self {
            stream,
            codec: TelnetCodec::new(),
            read_buf: vec![0; 4096],
        })
    }
}

#[async_trait]
impl Transport for TelnetTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let encoded = TelnetCodec::encode(data);
        self.stream
            .write_all(&encoded)
            .await
            .map_err(TransportError::Io)?;
        Ok(())
    }

    async fn read(&mut self) -> Result<Bytes> {
        loop {
            let n = self
                .stream
                .read(&mut self.read_buf)
                .await
                .map_err(TransportError::Io)?;
            if n == 0 {
                return Err(ChannelError::Closed.into());
            }

            let mut replies = Vec::new();
            let payload = self.codec.decode(&self.read_buf[..n], &mut replies);

            if !replies.is_empty() {
                trace!("telnet: answering {} negotiation bytes", replies.len());
                self.stream
                    .write_all(&replies)
                    .await
                    .map_err(TransportError::Io)?;
            }

            if !payload.is_empty() {
                return Ok(Bytes::from(payload));
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(TransportError::Io)?;
        Ok(())
    }
}
