//! Device-level actions: copy, erase, reload.

use std::fmt::Write as _;
use std::time::Duration;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use super::locator::ConfigSource;
use crate::channel::{ActionMap, InlineSecret, SecretRef};
use crate::driver::CliService;
use crate::error::{FlowError, Result};

/// Default time a copy may take.
pub const COPY_TIMEOUT: Duration = Duration::from_secs(180);

/// Default time a reload may take, login included.
pub const RELOAD_TIMEOUT: Duration = Duration::from_secs(500);

static COPY_OK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\d+ bytes copied|copied.*[\[\(].*[1-9][0-9]* bytes.*[\)\]]|copy complete|[\(\[]OK[\]\)]",
    )
    .unwrap()
});

static COPY_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%.*|TFTP put operation failed.*|sysmgr.*not supported.*|[Ee]rror.*").unwrap()
});

/// Actions run through a CLI service bound to the enable mode.
pub struct SystemActions<'c, 'a> {
    cli: &'c mut CliService<'a>,
}

impl<'c, 'a> SystemActions<'c, 'a> {
    pub fn new(cli: &'c mut CliService<'a>) -> Self {
        Self { cli }
    }

    /// Copy `source` to `destination`, both device references.
    ///
    /// Succeeds only when the output carries a copy completion marker;
    /// otherwise fails with [`FlowError::CopyFailed`] quoting the device's
    /// error line.
    pub async fn copy(
        &mut self,
        source: &str,
        destination: &str,
        vrf: Option<&str>,
        actions: &ActionMap,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let vrf = vrf.filter(|v| !v.is_empty());
        let mut command = format!("copy {source} {destination}");
        if let Some(vrf) = vrf {
            let _ = write!(command, " vrf {vrf}");
        }

        let actions = ActionMap::merged(actions, &copy_action_map(vrf)?);
        let response = self
            .cli
            .send_command_with(&command, &actions, Some(timeout.unwrap_or(COPY_TIMEOUT)))
            .await?;

        if COPY_OK.is_match(&response.result) {
            info!("copied {} to {}", source, destination);
            return Ok(response.result);
        }

        let message = COPY_ERROR
            .find(&response.result)
            .map(|m| m.as_str().trim().to_string())
            .or(response.failure_message)
            .unwrap_or_else(|| "no copy completion marker in output".to_string());
        Err(FlowError::CopyFailed { message }.into())
    }

    /// Erase the startup configuration.
    pub async fn write_erase(&mut self) -> Result<()> {
        let actions = ActionMap::new()
            .send_line(r"\(y/n\)", "y")?
            .send_line(r"\[confirm\]", "")?;
        self.cli
            .send_command_with("write erase", &actions, None)
            .await?
            .ensure_success()?;
        Ok(())
    }

    /// Reload the device and wait, over the console, until it is back at
    /// a prompt; then classify that prompt and rerun the session start
    /// commands.
    pub async fn reload_device_via_console(
        &mut self,
        actions: &ActionMap,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let timeout = timeout.unwrap_or(RELOAD_TIMEOUT);
        let graph = self.cli.graph();

        info!("reloading device, allowing {:?}", timeout);
        let output = self
            .cli
            .send_command_until("reload", graph.any_prompt(), actions, Some(timeout))
            .await?;
        debug!("device back after reload: {:?}", output.lines().last());

        self.cli.initialize().await
    }

    /// Reactions for the questions a copy between `source` and
    /// `destination` may ask: default file and host names are accepted,
    /// and remote credentials are answered from the locator.
    pub fn prepare_action_map(source: &ConfigSource, destination: &ConfigSource) -> Result<ActionMap> {
        let mut map = ActionMap::new();

        let mut names: Vec<&str> = Vec::new();
        for name in [destination.file_name(), source.file_name()].into_iter().flatten() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        for name in names {
            map = map.send_line(&format!(r"[\[\(][^\]\)\n]*{}[\)\]]", regex::escape(name)), "")?;
        }

        if let Some(remote) = source.remote().or_else(|| destination.remote()) {
            if let Some(host) = remote.host() {
                map = map.send_line(&format!(r"[\[\(]{}[\)\]]", regex::escape(host)), "")?;
            }
            if let Some(username) = remote.username() {
                map = map.send_line(r"[Uu]ser(?:name)?:\s*$", username)?;
            }
            if let Some(password) = remote.password() {
                map = map.send_secret(
                    r"[Pp]assword:\s*$",
                    SecretRef::Inline(InlineSecret::new(password)),
                )?;
            }
        }

        Ok(map)
    }
}

/// Questions every copy may ask.
fn copy_action_map(vrf: Option<&str>) -> Result<ActionMap> {
    Ok(ActionMap::new()
        .send_line(r"[Ee]nter vrf", vrf.unwrap_or_default())?
        .send_line(r"\(y/n\)", "y")?
        .send_line(r"[\[\(][Yy]es/[Nn]o[\)\]]", "yes")?
        .send_line(r"\[confirm\]", "")?)
}
