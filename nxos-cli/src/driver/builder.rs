//! Builder for creating CLI handlers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use super::handler::CliHandler;
use super::settings::CliSettings;
use crate::error::{DriverError, Result};
use crate::platform::{DeviceProfile, nxos};
use crate::transport::{CliType, ConnectionParams, HostKeyVerification, SessionRegistry};

/// Builder for constructing a [`CliHandler`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use nxos_cli::driver::CliHandlerBuilder;
/// use nxos_cli::transport::CliType;
///
/// # fn example() -> Result<(), nxos_cli::Error> {
/// let handler = CliHandlerBuilder::new("console-server.lab")
///     .port(7012)
///     .cli_type(CliType::Console)
///     .username("admin")
///     .password("secret")
///     .command_timeout(Duration::from_secs(60))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct CliHandlerBuilder {
    host: String,
    port: Option<u16>,
    cli_type: CliType,
    username: Option<String>,
    password: Option<String>,
    enable_password: Option<String>,
    private_key: Option<PathBuf>,
    connect_timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    profile: Option<DeviceProfile>,
    registry: Option<SessionRegistry>,
    settings: CliSettings,
}

impl CliHandlerBuilder {
    /// Create a new builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            cli_type: CliType::Auto,
            username: None,
            password: None,
            enable_password: None,
            private_key: None,
            connect_timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            profile: None,
            registry: None,
            settings: CliSettings::default(),
        }
    }

    /// Start from deserialized connection parameters.
    pub fn from_params(params: ConnectionParams) -> Self {
        let mut builder = Self::new(params.host)
            .cli_type(params.cli_type)
            .username(params.username)
            .password(params.password.expose_secret())
            .connect_timeout(params.timeout)
            .host_key_verification(params.host_key_verification);
        builder.port = params.port;
        builder.enable_password = params
            .enable_password
            .map(|p| p.expose_secret().to_string());
        builder.private_key = params.private_key;
        builder.known_hosts_path = params.known_hosts_path;
        builder
    }

    /// Set the port (default: 22 for SSH, 23 for telnet).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Restrict which session factories may be used.
    pub fn cli_type(mut self, cli_type: CliType) -> Self {
        self.cli_type = cli_type;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Password for entering the enable mode, if it differs from the
    /// login password.
    pub fn enable_password(mut self, password: impl Into<String>) -> Self {
        self.enable_password = Some(password.into());
        self
    }

    /// Authenticate SSH sessions with a private key.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.private_key = Some(key_path.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Default time a command may take to reach its prompt.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Reactions allowed per command.
    pub fn max_reactions(mut self, max_reactions: usize) -> Self {
        self.settings.max_reactions = max_reactions;
        self
    }

    pub fn search_depth(mut self, search_depth: usize) -> Self {
        self.settings.search_depth = search_depth;
        self
    }

    pub fn settings(mut self, settings: CliSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn host_key_verification(mut self, verification: HostKeyVerification) -> Self {
        self.host_key_verification = verification;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Use a custom device profile instead of NX-OS.
    pub fn profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Use a custom set of session factories.
    pub fn registry(mut self, registry: SessionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the handler.
    ///
    /// This validates the configuration and the profile's mode graph but
    /// does not connect.
    pub fn build(self) -> Result<CliHandler> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        let password = match (self.password, &self.private_key) {
            (Some(password), _) => password,
            (None, Some(_)) => String::new(),
            (None, None) => {
                return Err(DriverError::InvalidConfig {
                    message: "A password or private key is required".to_string(),
                }
                .into());
            }
        };

        if self.settings.search_depth == 0 {
            return Err(DriverError::InvalidConfig {
                message: "Search depth must be positive".to_string(),
            }
            .into());
        }

        let params = ConnectionParams {
            host: self.host,
            port: self.port,
            cli_type: self.cli_type,
            username,
            password: SecretString::from(password),
            enable_password: self.enable_password.map(SecretString::from),
            private_key: self.private_key,
            timeout: self.connect_timeout,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        CliHandler::new(
            params,
            self.profile.unwrap_or_else(nxos::profile),
            self.registry.unwrap_or_default(),
            self.settings,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ModeError};
    use crate::platform::CommandMode;

    #[test]
    fn test_username_required() {
        let err = CliHandlerBuilder::new("switch").password("secret").build().unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::InvalidConfig { .. })));
    }

    #[test]
    fn test_password_or_key_required() {
        let err = CliHandlerBuilder::new("switch").username("admin").build().unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::InvalidConfig { .. })));

        let handler = CliHandlerBuilder::new("switch")
            .username("admin")
            .private_key("/home/admin/.ssh/id_ed25519")
            .build()
            .unwrap();
        assert!(handler.params().private_key.is_some());
    }

    #[test]
    fn test_settings_flow_into_handler() {
        let handler = CliHandlerBuilder::new("switch")
            .username("admin")
            .password("secret")
            .enable_password("enable-pw")
            .command_timeout(Duration::from_secs(90))
            .max_reactions(5)
            .build()
            .unwrap();

        assert_eq!(handler.settings().timeout, Duration::from_secs(90));
        assert_eq!(handler.settings().max_reactions, 5);
        assert!(handler.credentials().enable_password.is_some());
        assert_eq!(handler.graph().profile().name, "cisco_nxos");
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let profile = nxos::profile().with_mode(CommandMode::new("shell", r"\$\s*$").unwrap());
        let err = CliHandlerBuilder::new("switch")
            .username("admin")
            .password("secret")
            .profile(profile)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Mode(ModeError::InvalidGraph { .. })));
    }

    #[test]
    fn test_from_params() {
        let json = r#"{
            "host": "10.0.0.10",
            "cli_type": "console",
            "port": 7012,
            "username": "admin",
            "password": "secret"
        }"#;
        let params: ConnectionParams = serde_json::from_str(json).unwrap();
        let handler = CliHandlerBuilder::from_params(params).build().unwrap();

        assert_eq!(handler.cli_type(), CliType::Console);
        assert_eq!(handler.params().port, Some(7012));
    }
}
