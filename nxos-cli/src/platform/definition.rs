//! Device profile: the command modes and CLI conventions of a platform.

use indexmap::IndexMap;

use super::command_mode::CommandMode;

/// Everything the CLI service needs to know about a device family.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    /// Profile name (e.g., "cisco_nxos").
    pub name: String,

    /// Command modes, in prompt-detection order.
    pub modes: IndexMap<String, CommandMode>,

    /// Privileged mode most commands run in.
    pub enable_mode: String,

    /// Global configuration mode.
    pub config_mode: String,

    /// Output substrings that mark a command as failed.
    pub failed_when_contains: Vec<String>,

    /// Commands run in the enable mode when a session starts.
    pub on_open_commands: Vec<String>,

    /// Commands run in the config mode when a session starts.
    pub on_open_config_commands: Vec<String>,

    /// Terminal width for the PTY.
    pub terminal_width: u32,

    /// Terminal height for the PTY.
    pub terminal_height: u32,
}

impl DeviceProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modes: IndexMap::new(),
            enable_mode: String::new(),
            config_mode: String::new(),
            failed_when_contains: vec![],
            on_open_commands: vec![],
            on_open_config_commands: vec![],
            terminal_width: 300,
            terminal_height: 24,
        }
    }

    /// Add a command mode. Modes are tried in insertion order when a
    /// prompt is classified, so list more specific prompts first when
    /// two patterns overlap.
    pub fn with_mode(mut self, mode: CommandMode) -> Self {
        self.modes.insert(mode.name.clone(), mode);
        self
    }

    /// Set the privileged and configuration mode names.
    pub fn with_service_modes(
        mut self,
        enable_mode: impl Into<String>,
        config_mode: impl Into<String>,
    ) -> Self {
        self.enable_mode = enable_mode.into();
        self.config_mode = config_mode.into();
        self
    }

    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    pub fn with_on_open_config_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_config_commands.push(command.into());
        self
    }

    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Get a mode by name.
    pub fn get_mode(&self, name: &str) -> Option<&CommandMode> {
        self.modes.get(name)
    }

    /// First failure string contained in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_builder() {
        let profile = DeviceProfile::new("lab")
            .with_mode(CommandMode::new("exec", r">\s*$").unwrap())
            .with_service_modes("exec", "exec")
            .with_failure_pattern("% Invalid")
            .with_terminal_size(132, 50);

        assert_eq!(profile.modes.len(), 1);
        assert!(profile.get_mode("exec").is_some());
        assert!(profile.get_mode("config").is_none());
        assert_eq!(profile.terminal_width, 132);
    }

    #[test]
    fn test_detect_failure_returns_first_match() {
        let profile = DeviceProfile::new("lab")
            .with_failure_pattern("% Invalid")
            .with_failure_pattern("% Incomplete");

        assert_eq!(
            profile.detect_failure("% Incomplete command at '^' marker."),
            Some("% Incomplete")
        );
        assert_eq!(profile.detect_failure("Copy complete."), None);
    }
}
