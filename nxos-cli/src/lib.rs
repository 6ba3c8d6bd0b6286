//! # nxos-cli
//!
//! Async automation of Cisco NX-OS switches through their interactive CLI.
//!
//! Commands are sent the way an operator would type them; the device's
//! prompts and questions are recognized in the output and answered from
//! ordered action maps until the expected prompt comes back.
//!
//! ## Features
//!
//! - SSH, Telnet and console-server sessions (russh, tokio)
//! - Mode graph navigation between exec, enable and configuration modes
//! - Scoped mode changes that always return to the caller's mode
//! - Configuration restore, including a console-only startup override
//!   that erases and reloads the device
//! - VLAN membership of switch ports
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nxos_cli::{CliHandler, ConfigurationFlow, ConfigurationType, RestoreMethod, RestoreRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nxos_cli::Error> {
//!     let handler = CliHandler::builder("10.0.0.10")
//!         .username("admin")
//!         .password("secret")
//!         .build()?;
//!
//!     let mut session = handler.open_session().await?;
//!     let request = RestoreRequest::new(
//!         "tftp://10.0.0.5/configs/sw1.cfg".parse()?,
//!         ConfigurationType::Running,
//!         RestoreMethod::Append,
//!     )
//!     .with_vrf("management");
//!
//!     ConfigurationFlow::new(&handler).restore(&mut session, &request).await?;
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod flows;
pub mod platform;
pub mod transport;

pub use channel::{ActionMap, Session};
pub use driver::{CliHandler, CliHandlerBuilder, CliService, Response};
pub use error::{Error, Result};
pub use flows::{
    ConfigSource, ConfigurationFlow, ConfigurationType, ConnectivityFlow, RestoreMethod,
    RestoreRequest, VlanMode,
};
pub use platform::{CommandMode, DeviceProfile};
pub use transport::{CliType, ConnectionParams, SessionKind};
