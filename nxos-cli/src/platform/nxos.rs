//! Cisco NX-OS device profile.
//!
//! # Prompt Examples
//!
//! ```text
//! switch>                            # default mode
//! switch#                            # enable mode
//! switch(config)#                    # config mode
//! switch(config-if)#                 # config sub-mode (interface)
//! ```
//!
//! # Mode Graph
//!
//! ```text
//! ┌─────────┐  enable   ┌────────┐  configure terminal  ┌───────────┐
//! │ default ├───────────► enable ├──────────────────────► config    │
//! │    >    │  disable  │   #    │        end           │ (config*)#│
//! └─────────┘◄──────────┴────────┘◄─────────────────────┴───────────┘
//! ```

use crate::channel::{ActionMap, SecretRef};
use crate::platform::{CommandMode, DeviceProfile};

pub const DEFAULT_MODE: &str = "default";
pub const ENABLE_MODE: &str = "enable";
pub const CONFIG_MODE: &str = "config";

/// Hostname characters; excluding `)` keeps the enable prompt from
/// matching config prompts.
const HOSTNAME: &str = r"[\w.\-@/:]{1,63}";

/// Create the NX-OS device profile.
pub fn profile() -> DeviceProfile {
    let paging = ActionMap::new().send_line(r"--More--", " ").unwrap();

    let default = CommandMode::new(DEFAULT_MODE, &format!(r"{HOSTNAME}>\s*$")).unwrap();

    let enable = CommandMode::new(ENABLE_MODE, &format!(r"{HOSTNAME}#\s*$"))
        .unwrap()
        .with_parent(DEFAULT_MODE)
        .with_enter("enable")
        .with_exit("disable")
        .with_enter_actions(
            ActionMap::new()
                .send_secret(r"[Pp]assword:?\s*$", SecretRef::EnablePassword)
                .unwrap(),
        )
        .with_default_actions(paging.clone());

    let config = CommandMode::new(CONFIG_MODE, &format!(r"{HOSTNAME}\(config[^)]*\)#\s*$"))
        .unwrap()
        .with_parent(ENABLE_MODE)
        .with_enter("configure terminal")
        .with_exit("end")
        .with_default_actions(paging);

    DeviceProfile::new("cisco_nxos")
        .with_mode(default)
        .with_mode(enable)
        .with_mode(config)
        .with_service_modes(ENABLE_MODE, CONFIG_MODE)
        .with_failure_pattern("% Invalid")
        .with_failure_pattern("% Incomplete")
        .with_failure_pattern("% Ambiguous")
        .with_failure_pattern("Error:")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 300")
        .with_on_open_config_command("no logging console")
        .with_terminal_size(300, 24)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(name: &str) -> CommandMode {
        profile().get_mode(name).unwrap().clone()
    }

    #[test]
    fn test_nxos_profile() {
        let profile = profile();
        assert_eq!(profile.name, "cisco_nxos");
        assert_eq!(profile.modes.len(), 3);
        assert_eq!(profile.enable_mode, ENABLE_MODE);
        assert_eq!(profile.config_mode, CONFIG_MODE);
        assert_eq!(
            profile.on_open_commands,
            vec!["terminal length 0", "terminal width 300"]
        );
        assert_eq!(profile.on_open_config_commands, vec!["no logging console"]);
    }

    #[test]
    fn test_default_prompt_match() {
        let default = mode(DEFAULT_MODE);
        assert!(default.matches("switch>"));
        assert!(default.matches("switch> "));
        assert!(!default.matches("switch#"));
    }

    #[test]
    fn test_enable_prompt_match() {
        let enable = mode(ENABLE_MODE);
        assert!(enable.matches("switch#"));
        assert!(enable.matches("show clock\n12:00:00\nnx-9k.lab# "));
        assert!(!enable.matches("switch(config)#"));
        assert!(!enable.matches("switch(config-if)#"));
        assert!(!enable.matches("switch>"));
    }

    #[test]
    fn test_config_prompt_match() {
        let config = mode(CONFIG_MODE);
        assert!(config.matches("switch(config)#"));
        assert!(config.matches("switch(config-if)# "));
        assert!(config.matches("switch(config-vlan)#"));
        assert!(!config.matches("switch#"));
    }

    #[test]
    fn test_prompt_must_end_output() {
        let enable = mode(ENABLE_MODE);
        assert!(!enable.matches("switch#\nBuilding configuration..."));
    }
}
