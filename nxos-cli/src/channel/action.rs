//! Action maps: ordered trigger pattern → reaction tables.
//!
//! Devices interleave unsolicited questions ("Do you wish to proceed
//! anyway? (y/n)") with command output. An [`ActionMap`] lists the
//! questions a caller expects and the answer to each. Triggers are
//! consulted in insertion order and the first match wins, so specific
//! prompts must be pushed before generic catch-alls.
//!
//! Reactions are plain data ([`Action`]) evaluated against the session,
//! which keeps maps inspectable and serializable.
//!
//! # Example
//!
//! ```rust
//! use nxos_cli::channel::{ActionMap, SecretRef};
//!
//! # fn example() -> Result<(), regex::Error> {
//! let map = ActionMap::new()
//!     .send_line(r"[Ll]ogin:|[Uu]sername:", "admin")?
//!     .send_secret(r"[Pp]assword:", SecretRef::Password)?;
//! assert_eq!(map.len(), 2);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use regex::bytes::Regex;
use secrecy::SecretString;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::buffer::PatternBuffer;

/// Reaction to a matched trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Action {
    /// Send a line of text.
    SendLine(String),

    /// Send a secret as a line; never logged.
    SendSecret(SecretRef),
}

/// Which secret a [`Action::SendSecret`] sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretRef {
    /// The session's login password.
    Password,

    /// The session's enable password, falling back to the login password.
    EnablePassword,

    /// A secret carried by the map itself, e.g. a file server password.
    Inline(InlineSecret),
}

/// A secret embedded in an action map. Serializes as `<hidden>`.
#[derive(Debug, Clone)]
pub struct InlineSecret(SecretString);

impl InlineSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::from(secret.into()))
    }

    pub fn secret(&self) -> &SecretString {
        &self.0
    }
}

impl Serialize for InlineSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<hidden>")
    }
}

impl<'de> Deserialize<'de> for InlineSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(InlineSecret::new)
    }
}

/// One entry of an action map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    /// Pattern searched in device output.
    #[serde(with = "regex_serde")]
    pub pattern: Regex,

    /// Reaction performed when the pattern matches.
    pub action: Action,

    /// Extra time granted to the overall deadline each time this fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend_deadline: Option<Duration>,
}

impl Trigger {
    /// Create a trigger, compiling `pattern`.
    pub fn new(pattern: &str, action: Action) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            action,
            extend_deadline: None,
        })
    }

    /// Extend the dispatch deadline by `extra` whenever this trigger fires.
    pub fn with_deadline_extension(mut self, extra: Duration) -> Self {
        self.extend_deadline = Some(extra);
        self
    }
}

/// Ordered trigger → reaction table. First match wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionMap {
    triggers: Vec<Trigger>,
}

impl ActionMap {
    /// Create an empty action map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a trigger that answers with `line`.
    pub fn send_line(self, pattern: &str, line: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(self.with(Trigger::new(pattern, Action::SendLine(line.into()))?))
    }

    /// Append a trigger that answers with a secret.
    pub fn send_secret(self, pattern: &str, secret: SecretRef) -> Result<Self, regex::Error> {
        Ok(self.with(Trigger::new(pattern, Action::SendSecret(secret))?))
    }

    /// Append a prepared trigger.
    pub fn with(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Append a prepared trigger in place.
    pub fn push(&mut self, trigger: Trigger) {
        self.triggers.push(trigger);
    }

    /// Combine two maps; every entry of `first` is consulted before `then`.
    pub fn merged(first: &ActionMap, then: &ActionMap) -> ActionMap {
        let mut triggers = Vec::with_capacity(first.len() + then.len());
        triggers.extend(first.triggers.iter().cloned());
        triggers.extend(then.triggers.iter().cloned());
        ActionMap { triggers }
    }

    /// Number of triggers.
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    /// Whether the map has no triggers.
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Triggers in consultation order.
    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    /// First trigger, in insertion order, matching the buffer tail and
    /// ending at or before `limit`.
    ///
    /// Returns the trigger and the absolute offset where its match ends.
    pub(crate) fn first_match(
        &self,
        buffer: &PatternBuffer,
        limit: usize,
    ) -> Option<(&Trigger, usize)> {
        self.triggers.iter().find_map(|trigger| {
            buffer
                .find_in_tail(&trigger.pattern)
                .filter(|m| m.end <= limit)
                .map(|m| (trigger, m.end))
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SendLine(line) => write!(f, "send {:?}", line),
            Action::SendSecret(_) => f.write_str("send <hidden>"),
        }
    }
}

mod regex_serde {
    use regex::bytes::Regex;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(pattern: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(pattern.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Regex, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        Regex::new(&pattern).map_err(D::Error::custom)
    }
}
