//! Command mode definition.

use regex::bytes::Regex;

use crate::channel::ActionMap;

/// A command mode of the device CLI.
///
/// Modes form a tree: every mode but the root names a parent, plus the
/// commands that enter it from the parent and leave it back to the parent.
#[derive(Debug, Clone)]
pub struct CommandMode {
    /// Name of this mode (e.g., "default", "enable", "config").
    pub name: String,

    /// Prompt shown while the device is in this mode.
    pub prompt: Regex,

    /// Name of the parent mode (None for the root).
    pub parent: Option<String>,

    /// Command that enters this mode from the parent.
    pub enter_command: Option<String>,

    /// Command that leaves this mode to the parent.
    pub exit_command: Option<String>,

    /// Reactions while entering this mode (e.g., an enable password).
    pub enter_actions: ActionMap,

    /// Reactions while leaving this mode.
    pub exit_actions: ActionMap,

    /// Reactions merged into every command sent in this mode.
    pub default_actions: ActionMap,
}

impl CommandMode {
    /// Create a root mode from its name and prompt pattern.
    pub fn new(name: impl Into<String>, prompt: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            prompt: Regex::new(prompt)?,
            parent: None,
            enter_command: None,
            exit_command: None,
            enter_actions: ActionMap::new(),
            exit_actions: ActionMap::new(),
            default_actions: ActionMap::new(),
        })
    }

    /// Set the parent mode.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the command entering this mode from its parent.
    pub fn with_enter(mut self, command: impl Into<String>) -> Self {
        self.enter_command = Some(command.into());
        self
    }

    /// Set the command leaving this mode to its parent.
    pub fn with_exit(mut self, command: impl Into<String>) -> Self {
        self.exit_command = Some(command.into());
        self
    }

    pub fn with_enter_actions(mut self, actions: ActionMap) -> Self {
        self.enter_actions = actions;
        self
    }

    pub fn with_exit_actions(mut self, actions: ActionMap) -> Self {
        self.exit_actions = actions;
        self
    }

    pub fn with_default_actions(mut self, actions: ActionMap) -> Self {
        self.default_actions = actions;
        self
    }

    /// Check if this mode's prompt matches the end of `output`.
    pub fn matches(&self, output: &str) -> bool {
        self.prompt.is_match(output.as_bytes())
    }

    /// Whether this is the root of the mode tree.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_transitions() {
        let config = CommandMode::new("config", r"\(config[^)]*\)#\s*$")
            .unwrap()
            .with_parent("enable")
            .with_enter("configure terminal")
            .with_exit("end");

        assert!(!config.is_root());
        assert_eq!(config.parent.as_deref(), Some("enable"));
        assert_eq!(config.enter_command.as_deref(), Some("configure terminal"));
        assert_eq!(config.exit_command.as_deref(), Some("end"));
        assert!(config.matches("switch(config-if)# "));
        assert!(!config.matches("switch#"));
    }

    #[test]
    fn test_invalid_prompt_is_rejected() {
        assert!(CommandMode::new("broken", r"(config").is_err());
    }
}
