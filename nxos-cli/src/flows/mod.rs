//! Device workflows built on the CLI service: configuration restore and
//! save, VLAN membership, and the system actions they share.

mod configuration;
mod connectivity;
mod locator;
mod reload;
mod system;

pub use configuration::{
    BACKUP_RESTORE_TIMEOUT, ConfigurationFlow, ConfigurationType, RestoreMethod, RestoreRequest,
    RestoreStep, SETTLE_DELAY,
};
pub use connectivity::{ConnectivityFlow, VlanMode, port_name};
pub use locator::{
    BACKUP_STARTUP_LOCATION, ConfigLocation, ConfigSource, RUNNING_LOCATION, RemoteLocation,
    STARTUP_LOCATION, TEMP_CONFIG_LOCATION,
};
pub use reload::reload_action_map;
pub use system::{COPY_TIMEOUT, RELOAD_TIMEOUT, SystemActions};
