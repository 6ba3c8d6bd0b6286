//! Command mode graph with path resolution between modes.

use std::collections::{HashMap, HashSet, VecDeque};

use regex::bytes::Regex;

use crate::channel::ActionMap;
use crate::error::{ModeError, Result};
use crate::platform::{CommandMode, DeviceProfile};

/// Validated mode tree of a [`DeviceProfile`].
///
/// Modes connect to their parent in both directions: entering a child
/// runs the child's enter command, leaving it runs the child's exit
/// command. The graph handles:
/// - Classifying device output by prompt
/// - Finding the shortest hop sequence between two modes
#[derive(Debug)]
pub struct ModeGraph {
    profile: DeviceProfile,

    /// Adjacency list for the mode tree.
    graph: HashMap<String, HashSet<String>>,

    /// Name of the root mode.
    root: String,

    /// Alternation of every mode prompt.
    any_prompt: Regex,
}

/// One hop between adjacent modes.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'g> {
    pub from: &'g str,
    pub to: &'g str,

    /// Command sent to make the hop.
    pub command: &'g str,

    /// Reactions while the hop completes.
    pub actions: &'g ActionMap,

    /// Prompt that confirms arrival.
    pub prompt: &'g Regex,
}

impl ModeGraph {
    /// Validate the profile's modes and build the graph.
    ///
    /// # Errors
    ///
    /// [`ModeError::InvalidGraph`] unless the modes form a single tree
    /// whose non-root members all carry enter and exit commands, and the
    /// profile's enable and config modes exist.
    pub fn new(profile: DeviceProfile) -> Result<Self> {
        let root = Self::validate(&profile)?;
        let graph = Self::build_graph(&profile);

        let alternation = profile
            .modes
            .values()
            .map(|mode| format!("(?:{})", mode.prompt.as_str()))
            .collect::<Vec<_>>()
            .join("|");
        let any_prompt = Regex::new(&alternation)?;

        Ok(Self {
            profile,
            graph,
            root,
            any_prompt,
        })
    }

    fn validate(profile: &DeviceProfile) -> Result<String> {
        let invalid = |message: String| -> crate::error::Error {
            ModeError::InvalidGraph { message }.into()
        };

        let mut roots = profile.modes.values().filter(|mode| mode.is_root());
        let root = match (roots.next(), roots.next()) {
            (Some(root), None) => root.name.clone(),
            (None, _) => return Err(invalid("no root mode".into())),
            (Some(a), Some(b)) => {
                return Err(invalid(format!(
                    "modes '{}' and '{}' both lack a parent",
                    a.name, b.name
                )));
            }
        };

        for mode in profile.modes.values() {
            let Some(parent) = mode.parent.as_deref() else {
                continue;
            };
            if !profile.modes.contains_key(parent) {
                return Err(invalid(format!(
                    "mode '{}' has unknown parent '{}'",
                    mode.name, parent
                )));
            }
            if mode.enter_command.is_none() || mode.exit_command.is_none() {
                return Err(invalid(format!(
                    "mode '{}' needs both enter and exit commands",
                    mode.name
                )));
            }
        }

        // Every parent chain must reach the root.
        for mode in profile.modes.values() {
            let mut steps = 0;
            let mut node = mode;
            while let Some(parent) = node.parent.as_deref() {
                steps += 1;
                if steps > profile.modes.len() {
                    return Err(invalid(format!("mode '{}' is part of a cycle", mode.name)));
                }
                node = &profile.modes[parent];
            }
        }

        for name in [&profile.enable_mode, &profile.config_mode] {
            if !profile.modes.contains_key(name) {
                return Err(invalid(format!("service mode '{}' is not defined", name)));
            }
        }

        Ok(root)
    }

    fn build_graph(profile: &DeviceProfile) -> HashMap<String, HashSet<String>> {
        let mut graph: HashMap<String, HashSet<String>> = HashMap::new();

        for (name, mode) in &profile.modes {
            graph.entry(name.clone()).or_default();

            if let Some(ref parent) = mode.parent {
                graph.entry(name.clone()).or_default().insert(parent.clone());
                graph.entry(parent.clone()).or_default().insert(name.clone());
            }
        }

        graph
    }

    /// The profile this graph was built from.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Name of the root mode.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Pattern matching the prompt of any mode.
    pub fn any_prompt(&self) -> &Regex {
        &self.any_prompt
    }

    /// Get a mode by name.
    pub fn mode(&self, name: &str) -> Result<&CommandMode> {
        self.profile
            .get_mode(name)
            .ok_or_else(|| ModeError::UnknownMode(name.to_string()).into())
    }

    /// Classify output by the prompt it ends with.
    pub fn determine_from_prompt(&self, output: &str) -> Result<&CommandMode> {
        self.profile
            .modes
            .values()
            .find(|mode| mode.matches(output))
            .ok_or_else(|| {
                let prompt = output.lines().last().unwrap_or_default().trim();
                ModeError::UnrecognizedPrompt {
                    prompt: prompt.to_string(),
                }
                .into()
            })
    }

    /// Find the shortest path from one mode to another.
    ///
    /// Returns the mode names to traverse, including both ends.
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<String>> {
        self.mode(from)?;
        self.mode(to)?;

        if from == to {
            return Ok(vec![from.to_string()]);
        }

        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        let mut parent: HashMap<String, String> = HashMap::new();

        queue.push_back(from.to_string());
        visited.insert(from.to_string());

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![to.to_string()];
                let mut node = to.to_string();

                while let Some(prev) = parent.get(&node) {
                    path.push(prev.clone());
                    node = prev.clone();
                }

                path.reverse();
                return Ok(path);
            }

            if let Some(neighbors) = self.graph.get(&current) {
                for neighbor in neighbors {
                    if visited.insert(neighbor.clone()) {
                        parent.insert(neighbor.clone(), current.clone());
                        queue.push_back(neighbor.clone());
                    }
                }
            }
        }

        Err(ModeError::UnreachableMode {
            from: from.to_string(),
            to: to.to_string(),
        }
        .into())
    }

    /// Get the hop between two adjacent modes.
    pub fn get_transition(&self, from: &str, to: &str) -> Option<Transition<'_>> {
        let (from_name, from_mode) = self.profile.modes.get_key_value(from)?;
        let (to_name, to_mode) = self.profile.modes.get_key_value(to)?;

        if to_mode.parent.as_deref() == Some(from) {
            return Some(Transition {
                from: from_name,
                to: to_name,
                command: to_mode.enter_command.as_deref()?,
                actions: &to_mode.enter_actions,
                prompt: &to_mode.prompt,
            });
        }

        if from_mode.parent.as_deref() == Some(to) {
            return Some(Transition {
                from: from_name,
                to: to_name,
                command: from_mode.exit_command.as_deref()?,
                actions: &from_mode.exit_actions,
                prompt: &to_mode.prompt,
            });
        }

        None
    }

    /// Ordered hops leading from `from` to `to`. Empty when they are equal.
    pub fn resolve_path(&self, from: &str, to: &str) -> Result<Vec<Transition<'_>>> {
        let path = self.find_path(from, to)?;
        path.windows(2)
            .map(|pair| {
                self.get_transition(&pair[0], &pair[1]).ok_or_else(|| {
                    ModeError::UnreachableMode {
                        from: pair[0].clone(),
                        to: pair[1].clone(),
                    }
                    .into()
                })
            })
            .collect()
    }

    /// All mode names, in profile order.
    pub fn mode_names(&self) -> impl Iterator<Item = &str> {
        self.profile.modes.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::platform::nxos;

    fn graph() -> ModeGraph {
        ModeGraph::new(nxos::profile()).unwrap()
    }

    fn is_invalid(result: Result<ModeGraph>) -> bool {
        matches!(result, Err(Error::Mode(ModeError::InvalidGraph { .. })))
    }

    #[test]
    fn test_determine_mode() {
        let graph = graph();

        assert_eq!(graph.determine_from_prompt("switch>").unwrap().name, "default");
        assert_eq!(graph.determine_from_prompt("switch#").unwrap().name, "enable");
        assert_eq!(
            graph.determine_from_prompt("switch(config-if)#").unwrap().name,
            "config"
        );

        let err = graph.determine_from_prompt("login:").unwrap_err();
        assert!(matches!(err, Error::Mode(ModeError::UnrecognizedPrompt { ref prompt }) if prompt == "login:"));
    }

    #[test]
    fn test_any_prompt_matches_every_mode() {
        let graph = graph();
        for prompt in ["switch>", "switch#", "switch(config)#"] {
            assert!(graph.any_prompt().is_match(prompt.as_bytes()), "{prompt}");
        }
        assert!(!graph.any_prompt().is_match(b"Password:"));
    }

    #[test]
    fn test_find_path() {
        let graph = graph();

        let path = graph.find_path("default", "config").unwrap();
        assert_eq!(path, vec!["default", "enable", "config"]);

        let path = graph.find_path("config", "default").unwrap();
        assert_eq!(path, vec!["config", "enable", "default"]);

        assert_eq!(graph.find_path("enable", "enable").unwrap(), vec!["enable"]);
        assert!(matches!(
            graph.find_path("enable", "vlan"),
            Err(Error::Mode(ModeError::UnknownMode(_)))
        ));
    }

    #[test]
    fn test_get_transition() {
        let graph = graph();

        let enter = graph.get_transition("default", "enable").unwrap();
        assert_eq!(enter.command, "enable");
        assert_eq!(enter.actions.len(), 1);
        assert!(enter.prompt.is_match(b"switch#"));

        let exit = graph.get_transition("config", "enable").unwrap();
        assert_eq!(exit.command, "end");
        assert!(exit.actions.is_empty());

        assert!(graph.get_transition("default", "config").is_none());
    }

    #[test]
    fn test_resolve_path_round_trip() {
        let graph = graph();
        let names: Vec<_> = graph.mode_names().collect();

        for &a in &names {
            for &b in &names {
                let there = graph.resolve_path(a, b).unwrap();
                let back = graph.resolve_path(b, a).unwrap();
                assert_eq!(there.len(), back.len());

                let mut at = a;
                for hop in there.iter().chain(back.iter()) {
                    assert_eq!(hop.from, at);
                    at = hop.to;
                }
                assert_eq!(at, a, "{a} -> {b} -> {a}");
            }
        }
    }

    #[test]
    fn test_rejects_two_roots() {
        let profile = nxos::profile()
            .with_mode(CommandMode::new("shell", r"\$\s*$").unwrap());
        assert!(is_invalid(ModeGraph::new(profile)));
    }

    #[test]
    fn test_rejects_unknown_parent() {
        let profile = nxos::profile().with_mode(
            CommandMode::new("vlan", r"\(config-vlan\)#\s*$")
                .unwrap()
                .with_parent("interface")
                .with_enter("vlan 10")
                .with_exit("exit"),
        );
        assert!(is_invalid(ModeGraph::new(profile)));
    }

    #[test]
    fn test_rejects_cycle() {
        let profile = DeviceProfile::new("loop")
            .with_mode(CommandMode::new("root", r">\s*$").unwrap())
            .with_mode(
                CommandMode::new("a", r"a#\s*$")
                    .unwrap()
                    .with_parent("b")
                    .with_enter("a")
                    .with_exit("exit"),
            )
            .with_mode(
                CommandMode::new("b", r"b#\s*$")
                    .unwrap()
                    .with_parent("a")
                    .with_enter("b")
                    .with_exit("exit"),
            )
            .with_service_modes("root", "root");
        assert!(is_invalid(ModeGraph::new(profile)));
    }

    #[test]
    fn test_rejects_missing_transition_commands() {
        let profile = nxos::profile().with_mode(
            CommandMode::new("maintenance", r"\(maint\)#\s*$")
                .unwrap()
                .with_parent("enable"),
        );
        assert!(is_invalid(ModeGraph::new(profile)));
    }
}
