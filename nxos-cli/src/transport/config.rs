//! Connection parameters handed over by the orchestration layer.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab use only.
    Disabled,
}

/// Transport the operator asked for.
///
/// `Console` restricts factory selection to console-server transports and
/// `Auto` tries every registered factory in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CliType {
    Ssh,
    Telnet,
    Console,
    #[default]
    Auto,
}

impl fmt::Display for CliType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CliType::Ssh => "ssh",
            CliType::Telnet => "telnet",
            CliType::Console => "console",
            CliType::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// Everything needed to reach and log into a device.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionParams {
    /// Target host (hostname or IP address). For console transports this
    /// is the console server.
    pub host: String,

    /// Port override. Defaults to 22 for SSH and 23 for Telnet.
    #[serde(default)]
    pub port: Option<u16>,

    /// Requested transport.
    #[serde(default)]
    pub cli_type: CliType,

    /// Login username.
    pub username: String,

    /// Login password.
    #[serde(deserialize_with = "deserialize_secret")]
    pub password: SecretString,

    /// Enable password; the login password is used when absent.
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub enable_password: Option<SecretString>,

    /// Private key for SSH public key authentication.
    #[serde(default)]
    pub private_key: Option<PathBuf>,

    /// Connection establishment timeout.
    #[serde(default = "default_connect_timeout")]
    pub timeout: Duration,

    /// Host key verification for SSH transports.
    #[serde(default)]
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    #[serde(default)]
    pub known_hosts_path: Option<PathBuf>,
}

impl ConnectionParams {
    /// Create connection parameters with password authentication and defaults.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: None,
            cli_type: CliType::default(),
            username: username.into(),
            password: SecretString::from(password.into()),
            enable_password: None,
            private_key: None,
            timeout: default_connect_timeout(),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Port to use for an SSH-based factory.
    pub fn ssh_port(&self) -> u16 {
        self.port.unwrap_or(22)
    }

    /// Port to use for a Telnet-based factory.
    pub fn telnet_port(&self) -> u16 {
        self.port.unwrap_or(23)
    }

    /// Build the SSH configuration for this connection.
    pub fn ssh_config(&self, terminal_width: u32, terminal_height: u32) -> SshConfig {
        let auth = match &self.private_key {
            Some(path) => AuthMethod::PrivateKey {
                path: path.clone(),
                passphrase: None,
            },
            None => AuthMethod::Password(self.password.clone()),
        };

        SshConfig {
            host: self.host.clone(),
            port: self.ssh_port(),
            username: self.username.clone(),
            auth,
            timeout: self.timeout,
            terminal_width,
            terminal_height,
            host_key_verification: self.host_key_verification.clone(),
            known_hosts_path: self.known_hosts_path.clone(),
        }
    }
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// Resolved settings for one SSH connection attempt.
#[derive(Debug, Clone)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: AuthMethod,
    /// Covers TCP connect and key exchange, not authentication.
    pub timeout: Duration,
    /// PTY size in characters.
    pub terminal_width: u32,
    pub terminal_height: u32,
    pub host_key_verification: HostKeyVerification,
    pub known_hosts_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum AuthMethod {
    Password(SecretString),
    /// Key file, with the passphrase for encrypted keys.
    PrivateKey {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_deserialize_minimal_params() {
        let params: ConnectionParams = serde_json::from_str(
            r#"{"host": "10.0.0.1", "username": "admin", "password": "secret"}"#,
        )
        .unwrap();

        assert_eq!(params.host, "10.0.0.1");
        assert_eq!(params.cli_type, CliType::Auto);
        assert_eq!(params.password.expose_secret(), "secret");
        assert!(params.enable_password.is_none());
        assert_eq!(params.ssh_port(), 22);
        assert_eq!(params.telnet_port(), 23);
        assert_eq!(params.host_key_verification, HostKeyVerification::AcceptNew);
    }

    #[test]
    fn test_deserialize_console_params() {
        let params: ConnectionParams = serde_json::from_str(
            r#"{
                "host": "console.lab",
                "port": 7001,
                "cli_type": "console",
                "username": "admin",
                "password": "secret",
                "enable_password": "enable-secret",
                "host_key_verification": "disabled"
            }"#,
        )
        .unwrap();

        assert_eq!(params.cli_type, CliType::Console);
        assert_eq!(params.telnet_port(), 7001);
        assert_eq!(
            params.enable_password.as_ref().map(|p| p.expose_secret()),
            Some("enable-secret")
        );
        assert_eq!(params.host_key_verification, HostKeyVerification::Disabled);
    }

    #[test]
    fn test_ssh_config_prefers_private_key() {
        let mut params = ConnectionParams::new("switch", "admin", "secret");
        assert!(matches!(
            params.ssh_config(300, 24).auth,
            AuthMethod::Password(_)
        ));

        params.private_key = Some(PathBuf::from("/keys/id_ed25519"));
        let config = params.ssh_config(300, 24);
        assert!(matches!(config.auth, AuthMethod::PrivateKey { .. }));
        assert_eq!(config.terminal_width, 300);
    }
}
