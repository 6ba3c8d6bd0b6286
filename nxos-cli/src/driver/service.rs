//! Mode-aware command execution over a session.
//!
//! A [`CliService`] is bound to one command mode. Before every command it
//! makes sure the device is in that mode, walking the [`ModeGraph`] from
//! wherever the session currently is.
//!
//! Temporary mode changes go through [`CliService::enter_mode`], which
//! runs a closure against a service bound to the other mode and then
//! returns the device to the original mode, whether the closure
//! succeeded or not.
//!
//! # Example
//!
//! ```rust,no_run
//! use nxos_cli::driver::CliService;
//! use nxos_cli::platform::nxos::CONFIG_MODE;
//!
//! # async fn example(cli: &mut CliService<'_>) -> Result<(), nxos_cli::Error> {
//! let version = cli.send_command("show version").await?;
//! println!("{}", version.result);
//!
//! cli.enter_mode(CONFIG_MODE, |config| {
//!     Box::pin(async move {
//!         config.send_command("vlan 10").await?.ensure_success()?;
//!         config.send_command("exit").await?.ensure_success()?;
//!         Ok::<_, nxos_cli::Error>(())
//!     })
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use log::{debug, warn};
use regex::bytes::Regex;

use super::mode_graph::{ModeGraph, Transition};
use super::response::Response;
use super::settings::CliSettings;
use crate::channel::{ActionMap, Session, dispatch};
use crate::error::{DriverError, Error, Result};

/// Command execution bound to one command mode.
pub struct CliService<'a> {
    session: &'a mut Session,
    graph: &'a ModeGraph,
    mode: String,
    settings: CliSettings,
}

impl<'a> CliService<'a> {
    /// Bind `session` to `mode`. Nothing is sent until the first command.
    pub fn new(
        session: &'a mut Session,
        graph: &'a ModeGraph,
        mode: &str,
        settings: CliSettings,
    ) -> Result<Self> {
        graph.mode(mode)?;
        Ok(Self {
            session,
            graph,
            mode: mode.to_string(),
            settings,
        })
    }

    /// The mode this service runs commands in.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn graph(&self) -> &'a ModeGraph {
        self.graph
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    pub fn settings(&self) -> CliSettings {
        self.settings
    }

    /// Move the device into this service's mode if it is elsewhere.
    pub async fn ensure_mode(&mut self) -> Result<()> {
        let target = self.mode.clone();
        self.navigate(&target).await
    }

    async fn navigate(&mut self, target: &str) -> Result<()> {
        let graph = self.graph;
        let current = match self.session.current_mode() {
            Some(mode) => mode.to_string(),
            None => self.detect_mode().await?,
        };
        if current == target {
            return Ok(());
        }

        debug!("changing mode: {} -> {}", current, target);
        for hop in graph.resolve_path(&current, target)? {
            if let Err(e) = self.hop(hop).await {
                self.session.set_current_mode(None);
                return Err(DriverError::ModeTransitionFailed {
                    from: hop.from.to_string(),
                    to: hop.to.to_string(),
                    source: Box::new(e),
                }
                .into());
            }
            self.session.set_current_mode(Some(hop.to.to_string()));
        }
        Ok(())
    }

    async fn hop(&mut self, hop: Transition<'_>) -> Result<()> {
        self.session.send_line(hop.command).await?;
        dispatch::run(
            self.session,
            hop.prompt,
            hop.actions,
            self.settings.timeout,
            self.settings.max_reactions,
        )
        .await?;
        Ok(())
    }

    /// Send an empty line and classify the prompt that comes back.
    pub async fn detect_mode(&mut self) -> Result<String> {
        let graph = self.graph;
        self.session.send_line("").await?;
        let output = dispatch::run(
            self.session,
            graph.any_prompt(),
            &ActionMap::new(),
            self.settings.timeout,
            self.settings.max_reactions,
        )
        .await?;
        self.resync(&output)
    }

    /// Record the mode whose prompt ends `output`.
    pub(crate) fn resync(&mut self, output: &str) -> Result<String> {
        let name = self.graph.determine_from_prompt(output)?.name.clone();
        self.session.set_current_mode(Some(name.clone()));
        Ok(name)
    }

    /// Send a command with the mode's default reactions.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.send_command_with(command, &ActionMap::new(), None).await
    }

    /// Send a command, answering questions from `actions` first and the
    /// mode's default reactions second.
    ///
    /// Output containing one of the profile's failure strings yields a
    /// failed [`Response`], not an error; see [`Response::ensure_success`].
    pub async fn send_command_with(
        &mut self,
        command: &str,
        actions: &ActionMap,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        self.ensure_mode().await?;

        let graph = self.graph;
        let mode = graph.mode(&self.mode)?;
        let actions = ActionMap::merged(actions, &mode.default_actions);
        let start = Instant::now();

        self.session.send_line(command).await?;
        let raw = self
            .dispatch(&mode.prompt, &actions, timeout)
            .await?;

        let response = Response::from_output(
            command,
            raw,
            &graph.profile().failed_when_contains,
            start.elapsed(),
        );
        if let Some(ref message) = response.failure_message {
            warn!("command {:?} failed: {}", command, message);
        }
        Ok(response)
    }

    /// Send a command and read until `target` rather than the mode prompt.
    ///
    /// For commands that leave the mode, such as `reload`. The session's
    /// mode is re-derived from the output's final prompt.
    pub async fn send_command_until(
        &mut self,
        command: &str,
        target: &Regex,
        actions: &ActionMap,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.ensure_mode().await?;
        self.session.send_line(command).await?;
        let output = self.dispatch(target, actions, timeout).await?;

        if self.resync(&output).is_err() {
            self.session.set_current_mode(None);
        }
        Ok(output)
    }

    async fn dispatch(
        &mut self,
        target: &Regex,
        actions: &ActionMap,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let result = dispatch::run(
            self.session,
            target,
            actions,
            timeout.unwrap_or(self.settings.timeout),
            self.settings.max_reactions,
        )
        .await;

        // After a failed read the device may be anywhere.
        if result.is_err() {
            self.session.set_current_mode(None);
        }
        result
    }

    /// Run `body` against a service bound to `mode`, then return the
    /// device to this service's mode.
    ///
    /// The return trip happens even when `body` fails; if it also fails,
    /// the body's error wins and the second failure is logged. Scopes
    /// nest.
    pub async fn enter_mode<T, F>(&mut self, mode: &str, body: F) -> Result<T>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut CliService<'_>) -> BoxFuture<'s, Result<T>> + Send,
    {
        let graph = self.graph;
        graph.mode(mode)?;
        debug!("entering mode '{}' from '{}'", mode, self.mode);

        let outcome = {
            let mut scoped = CliService {
                session: &mut *self.session,
                graph,
                mode: mode.to_string(),
                settings: self.settings,
            };
            match scoped.ensure_mode().await {
                Ok(()) => body(&mut scoped).await,
                Err(e) => Err(e),
            }
        };

        let restored = self.ensure_mode().await;
        match (outcome, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore)) => {
                warn!("failed to return to mode '{}': {}", self.mode, restore);
                Err(e)
            }
        }
    }

    /// Run the profile's session start commands: terminal settings in the
    /// enable mode, then configuration commands in the config mode.
    pub async fn initialize(&mut self) -> Result<()> {
        let profile = self.graph.profile();
        let enable_mode = profile.enable_mode.clone();
        let config_mode = profile.config_mode.clone();
        let commands = profile.on_open_commands.clone();
        let config_commands = profile.on_open_config_commands.clone();

        self.enter_mode(&enable_mode, move |enable| {
            Box::pin(async move {
                for command in &commands {
                    enable.send_command(command).await?.ensure_success()?;
                }
                if !config_commands.is_empty() {
                    enable
                        .enter_mode(&config_mode, move |config| {
                            Box::pin(async move {
                                for command in &config_commands {
                                    config.send_command(command).await?.ensure_success()?;
                                }
                                Ok::<_, Error>(())
                            })
                        })
                        .await?;
                }
                Ok::<_, Error>(())
            })
        })
        .await
    }
}
