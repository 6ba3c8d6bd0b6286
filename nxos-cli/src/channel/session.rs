//! A live device session: transport, credentials and the current mode.

use bytes::Bytes;
use log::{debug, trace};
use secrecy::{ExposeSecret, SecretString};

use super::action::{Action, SecretRef};
use crate::error::Result;
use crate::transport::{SessionKind, Transport};

/// Login credentials reactions may answer with.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub enable_password: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            enable_password: None,
        }
    }

    /// Set a dedicated enable password.
    pub fn with_enable_password(mut self, enable_password: impl Into<String>) -> Self {
        self.enable_password = Some(SecretString::from(enable_password.into()));
        self
    }
}

/// A connected device session.
///
/// The session is driven by one caller at a time; the CLI service is the
/// only component that updates [`current_mode`](Self::current_mode).
pub struct Session {
    transport: Box<dyn Transport>,
    kind: SessionKind,
    credentials: Credentials,
    current_mode: Option<String>,
    search_depth: usize,
}

impl Session {
    /// Wrap a connected transport.
    pub fn new(transport: Box<dyn Transport>, kind: SessionKind, credentials: Credentials) -> Self {
        Self {
            transport,
            kind,
            credentials,
            current_mode: None,
            search_depth: 1000,
        }
    }

    /// Set how many trailing bytes are searched for prompts and triggers.
    pub fn with_search_depth(mut self, search_depth: usize) -> Self {
        self.search_depth = search_depth;
        self
    }

    /// How this session reaches the device.
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Credentials used to log in.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The mode the device was last observed in, if known.
    pub fn current_mode(&self) -> Option<&str> {
        self.current_mode.as_deref()
    }

    pub(crate) fn set_current_mode(&mut self, mode: Option<String>) {
        trace!("session mode: {:?} -> {:?}", self.current_mode, mode);
        self.current_mode = mode;
    }

    pub(crate) fn search_depth(&self) -> usize {
        self.search_depth
    }

    /// Send one line of text.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        debug!("send: {:?}", line);
        self.write_line(line).await
    }

    /// Perform a reaction against this session.
    pub async fn perform(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::SendLine(line) => self.send_line(line).await,
            Action::SendSecret(secret) => {
                let secret = self.resolve(secret);
                debug!("send: <hidden>");
                self.write_line(secret.expose_secret()).await
            }
        }
    }

    pub(crate) async fn read_chunk(&mut self) -> Result<Bytes> {
        let chunk = self.transport.read().await?;
        trace!("recv: {:?}", String::from_utf8_lossy(&chunk));
        Ok(chunk)
    }

    /// Close the underlying transport.
    pub async fn close(mut self) -> Result<()> {
        self.transport.close().await
    }

    fn resolve(&self, secret: &SecretRef) -> SecretString {
        match secret {
            SecretRef::Password => self.credentials.password.clone(),
            SecretRef::EnablePassword => self
                .credentials
                .enable_password
                .clone()
                .unwrap_or_else(|| self.credentials.password.clone()),
            SecretRef::Inline(inline) => inline.secret().clone(),
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.transport.write(&data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::action::InlineSecret;
    use crate::transport::mock::MockTransport;

    #[tokio::test]
    async fn test_secrets_resolve_from_credentials() {
        let (transport, handle) = MockTransport::new();
        let credentials = Credentials::new("admin", "login-pw");
        let mut session = Session::new(Box::new(transport), SessionKind::Ssh, credentials);

        session
            .perform(&Action::SendSecret(SecretRef::EnablePassword))
            .await
            .unwrap();
        session
            .perform(&Action::SendSecret(SecretRef::Inline(InlineSecret::new("ftp-pw"))))
            .await
            .unwrap();
        session
            .perform(&Action::SendLine("y".into()))
            .await
            .unwrap();

        assert_eq!(handle.writes(), vec!["login-pw", "ftp-pw", "y"]);
    }

    #[tokio::test]
    async fn test_enable_password_preferred_when_set() {
        let (transport, handle) = MockTransport::new();
        let credentials = Credentials::new("admin", "login-pw").with_enable_password("enable-pw");
        let mut session = Session::new(Box::new(transport), SessionKind::Telnet, credentials);

        session
            .perform(&Action::SendSecret(SecretRef::EnablePassword))
            .await
            .unwrap();

        assert_eq!(handle.writes(), vec!["enable-pw"]);
        assert!(session.current_mode().is_none());
    }
}
