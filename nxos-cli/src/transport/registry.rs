//! Registry of session factories, selected by connection parameters.

use super::config::{CliType, ConnectionParams};
use super::ssh::SshTransport;
use super::telnet::TelnetTransport;
use super::{SessionKind, Transport};
use crate::error::Result;

/// Byte-stream protocol a factory speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Ssh,
    Telnet,
}

/// Description of one way to reach a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFactory {
    /// Wire protocol.
    pub transport: TransportKind,

    /// Whether the connection goes through a console server.
    pub console: bool,

    /// Send a bare newline right after connecting to wake the console.
    pub start_with_new_line: bool,
}

impl SessionFactory {
    /// A direct (in-band) session factory.
    pub const fn generic(transport: TransportKind) -> Self {
        Self {
            transport,
            console: false,
            start_with_new_line: false,
        }
    }

    /// A console-server session factory.
    pub const fn console(transport: TransportKind, start_with_new_line: bool) -> Self {
        Self {
            transport,
            console: true,
            start_with_new_line,
        }
    }

    /// Kind of session this factory produces.
    pub fn session_kind(&self) -> SessionKind {
        match (self.transport, self.console) {
            (TransportKind::Ssh, false) => SessionKind::Ssh,
            (TransportKind::Telnet, false) => SessionKind::Telnet,
            (TransportKind::Ssh, true) => SessionKind::ConsoleSsh,
            (TransportKind::Telnet, true) => SessionKind::ConsoleTelnet,
        }
    }

    /// Whether this factory may serve the requested cli type.
    pub fn accepts(&self, cli_type: CliType) -> bool {
        match cli_type {
            CliType::Ssh => self.transport == TransportKind::Ssh && !self.console,
            CliType::Telnet => self.transport == TransportKind::Telnet && !self.console,
            CliType::Console => self.console,
            CliType::Auto => true,
        }
    }

    /// Whether the device itself asks for credentials after connecting.
    ///
    /// SSH authenticates in the protocol; telnet and console lines get a
    /// login dialogue answered by the login action map.
    pub fn uses_login_dialogue(&self) -> bool {
        self.console || self.transport == TransportKind::Telnet
    }

    /// Open the underlying transport.
    pub async fn connect(
        &self,
        params: &ConnectionParams,
        terminal_width: u32,
        terminal_height: u32,
    ) -> Result<Box<dyn Transport>> {
        match self.transport {
            TransportKind::Ssh => {
                let config = params.ssh_config(terminal_width, terminal_height);
                let transport = SshTransport::connect(&config).await?;
                Ok(Box::new(transport))
            }
            TransportKind::Telnet => {
                let transport =
                    TelnetTransport::connect(&params.host, params.telnet_port(), params.timeout)
                        .await?;
                Ok(Box::new(transport))
            }
        }
    }
}

/// Ordered set of session factories.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    factories: Vec<SessionFactory>,
}

impl SessionRegistry {
    /// Create a registry from an explicit factory list.
    pub fn new(factories: Vec<SessionFactory>) -> Self {
        Self { factories }
    }

    /// The factories registered for NX-OS devices.
    pub fn nxos() -> Self {
        Self::new(vec![
            SessionFactory::generic(TransportKind::Ssh),
            SessionFactory::generic(TransportKind::Telnet),
            SessionFactory::console(TransportKind::Ssh, true),
            SessionFactory::console(TransportKind::Telnet, false),
            SessionFactory::console(TransportKind::Telnet, true),
        ])
    }

    /// All registered factories in selection order.
    pub fn factories(&self) -> &[SessionFactory] {
        &self.factories
    }

    /// Factories eligible for `cli_type`, in selection order.
    pub fn candidates(&self, cli_type: CliType) -> impl Iterator<Item = &SessionFactory> {
        self.factories.iter().filter(move |f| f.accepts(cli_type))
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::nxos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(registry: &SessionRegistry, cli_type: CliType) -> Vec<SessionKind> {
        registry
            .candidates(cli_type)
            .map(SessionFactory::session_kind)
            .collect()
    }

    #[test]
    fn test_nxos_registry_order() {
        let registry = SessionRegistry::nxos();
        assert_eq!(registry.factories().len(), 5);
        assert_eq!(
            kinds(&registry, CliType::Auto),
            vec![
                SessionKind::Ssh,
                SessionKind::Telnet,
                SessionKind::ConsoleSsh,
                SessionKind::ConsoleTelnet,
                SessionKind::ConsoleTelnet,
            ]
        );
    }

    #[test]
    fn test_selection_by_cli_type() {
        let registry = SessionRegistry::nxos();
        assert_eq!(kinds(&registry, CliType::Ssh), vec![SessionKind::Ssh]);
        assert_eq!(kinds(&registry, CliType::Telnet), vec![SessionKind::Telnet]);

        let console: Vec<_> = registry.candidates(CliType::Console).collect();
        assert_eq!(console.len(), 3);
        assert!(console.iter().all(|f| f.console));
        // Both console-telnet quirks are registered, without newline first
        assert!(!console[1].start_with_new_line);
        assert!(console[2].start_with_new_line);
    }

    #[test]
    fn test_login_dialogue() {
        assert!(!SessionFactory::generic(TransportKind::Ssh).uses_login_dialogue());
        assert!(SessionFactory::generic(TransportKind::Telnet).uses_login_dialogue());
        assert!(SessionFactory::console(TransportKind::Ssh, true).uses_login_dialogue());
    }
}
