//! SSH transport over russh: one authenticated connection carrying one
//! interactive PTY shell.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::Transport;
use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::error::{ChannelError, Result, TransportError};

pub struct SshTransport {
    handle: Handle<HostKeyCheck>,
    shell: Channel<Msg>,
}

impl SshTransport {
    /// Connect, authenticate and start a shell sized for the device profile.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        let rejection = Arc::new(Mutex::new(None));
        let check = HostKeyCheck {
            host: config.host.clone(),
            port: config.port,
            verification: config.host_key_verification.clone(),
            known_hosts: config.known_hosts_path.clone(),
            rejection: Arc::clone(&rejection),
        };
        let client_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        debug!("ssh: connecting to {}:{}", config.host, config.port);
        let connecting = client::connect(client_config, (config.host.as_str(), config.port), check);
        let mut handle = match tokio::time::timeout(config.timeout, connecting).await {
            Err(_) => return Err(TransportError::Timeout(config.timeout).into()),
            Ok(Ok(handle)) => handle,
            // russh only reports an unknown key; the check kept the reason
            Ok(Err(e)) => {
                let rejected = rejection.lock().ok().and_then(|mut slot| slot.take());
                return Err(rejected.unwrap_or(TransportError::Ssh(e)).into());
            }
        };

        if !authenticate(&mut handle, config).await? {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        let shell = handle
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;
        shell
            .request_pty(
                true,
                "vt100",
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;
        shell.request_shell(true).await.map_err(TransportError::Ssh)?;

        Ok(Self { handle, shell })
    }
}

async fn authenticate(handle: &mut Handle<HostKeyCheck>, config: &SshConfig) -> Result<bool> {
    let result = match &config.auth {
        AuthMethod::Password(password) => {
            handle
                .authenticate_password(&config.username, password.expose_secret())
                .await
        }
        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_secret_key(path, passphrase.as_deref())
                .map_err(|e| TransportError::Key(e.to_string()))?;
            let hash_alg = handle
                .best_supported_rsa_hash()
                .await
                .map_err(TransportError::Ssh)?
                .flatten();
            handle
                .authenticate_publickey(
                    &config.username,
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                )
                .await
        }
    };
    Ok(result.map_err(TransportError::Ssh)?.success())
}

#[async_trait]
impl Transport for SshTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.shell.data(data).await.map_err(TransportError::Ssh)?;
        Ok(())
    }

    async fn read(&mut self) -> Result<Bytes> {
        loop {
            match self.shell.wait().await {
                Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                    return Ok(Bytes::copy_from_slice(&data));
                }
                Some(ChannelMsg::Eof | ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed.into());
                }
                Some(other) => trace!("ssh: skipping {:?}", other),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// Host key policy applied during the handshake.
struct HostKeyCheck {
    host: String,
    port: u16,
    verification: HostKeyVerification,
    known_hosts: Option<PathBuf>,
    /// Why the last key was refused, for `connect` to report.
    rejection: Arc<Mutex<Option<TransportError>>>,
}

impl HostKeyCheck {
    /// Whether `key` is already recorded for this host.
    fn is_known(&self, key: &PublicKey) -> std::result::Result<bool, TransportError> {
        let found = match &self.known_hosts {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, key),
        };
        found.map_err(|e| match e {
            russh::keys::Error::KeyChanged { line } => TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            },
            other => TransportError::KnownHosts(other.to_string()),
        })
    }

    fn remember(&self, key: &PublicKey) {
        let saved = match &self.known_hosts {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, key, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = saved {
            warn!("ssh: could not record host key for {}: {}", self.host, e);
        }
    }

    fn accept(&self, key: &PublicKey) -> bool {
        let verdict = match self.verification {
            HostKeyVerification::Disabled => Ok(()),
            HostKeyVerification::AcceptNew => self.is_known(key).map(|known| {
                if !known {
                    self.remember(key);
                }
            }),
            HostKeyVerification::Strict => self.is_known(key).and_then(|known| {
                if known {
                    Ok(())
                } else {
                    Err(TransportError::HostKeyUnknown {
                        host: self.host.clone(),
                        port: self.port,
                    })
                }
            }),
        };

        match verdict {
            Ok(()) => true,
            Err(e) => {
                if let Ok(mut slot) = self.rejection.lock() {
                    *slot = Some(e);
                }
                false
            }
        }
    }
}

impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(self.accept(server_public_key))
    }
}
