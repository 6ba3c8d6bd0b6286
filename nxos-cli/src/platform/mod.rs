//! Device profiles.
//!
//! A profile describes the command modes of a device family, how prompts
//! look in each mode, and the CLI conventions the service relies on.

mod command_mode;
mod definition;
pub mod nxos;

pub use command_mode::CommandMode;
pub use definition::DeviceProfile;
