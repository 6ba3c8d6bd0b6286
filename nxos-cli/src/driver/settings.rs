//! Tunables shared by every command sent through a CLI service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Command execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliSettings {
    /// Default time a command may take to reach its prompt.
    pub timeout: Duration,

    /// Reactions allowed per command before it is abandoned.
    pub max_reactions: usize,

    /// Trailing bytes searched for prompts and triggers.
    pub search_depth: usize,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_reactions: 20,
            search_depth: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CliSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.max_reactions, 20);
        assert_eq!(settings.search_depth, 1000);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let settings: CliSettings = serde_json::from_str(r#"{"max_reactions": 5}"#).unwrap();
        assert_eq!(settings.max_reactions, 5);
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }
}
