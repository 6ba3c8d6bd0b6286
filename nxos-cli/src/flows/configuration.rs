//! Configuration restore and save.

use std::fmt;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::locator::{
    BACKUP_STARTUP_LOCATION, ConfigLocation, ConfigSource, RUNNING_LOCATION, STARTUP_LOCATION,
    TEMP_CONFIG_LOCATION,
};
use super::reload::reload_action_map;
use super::system::{RELOAD_TIMEOUT, SystemActions};
use crate::channel::Session;
use crate::driver::{CliHandler, CliService};
use crate::error::{FlowError, Result};

/// Minimum pause between applying a configuration and restoring startup.
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Timeout for copying the backup back to startup after a reload.
pub const BACKUP_RESTORE_TIMEOUT: Duration = Duration::from_secs(200);

/// Which configuration a restore or save targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigurationType {
    Startup,
    Running,
}

impl ConfigurationType {
    pub fn location(&self) -> ConfigLocation {
        match self {
            ConfigurationType::Startup => STARTUP_LOCATION,
            ConfigurationType::Running => RUNNING_LOCATION,
        }
    }
}

impl fmt::Display for ConfigurationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationType::Startup => f.write_str("startup"),
            ConfigurationType::Running => f.write_str("running"),
        }
    }
}

/// How a restored configuration combines with the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreMethod {
    /// Merge into the existing configuration.
    Append,
    /// Replace the existing configuration.
    Override,
}

impl fmt::Display for RestoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreMethod::Append => f.write_str("append"),
            RestoreMethod::Override => f.write_str("override"),
        }
    }
}

/// A request to restore a configuration file onto the device.
#[derive(Debug, Clone, Deserialize)]
pub struct RestoreRequest {
    pub source: ConfigSource,
    pub configuration_type: ConfigurationType,
    pub restore_method: RestoreMethod,
    #[serde(default)]
    pub vrf: Option<String>,
}

impl RestoreRequest {
    pub fn new(
        source: ConfigSource,
        configuration_type: ConfigurationType,
        restore_method: RestoreMethod,
    ) -> Self {
        Self {
            source,
            configuration_type,
            restore_method,
            vrf: None,
        }
    }

    pub fn with_vrf(mut self, vrf: impl Into<String>) -> Self {
        self.vrf = Some(vrf.into());
        self
    }
}

/// Structural steps of a startup override; a failure in any of them
/// aborts the restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStep {
    StageConfiguration,
    EraseConfiguration,
    Reload,
    ApplyConfiguration,
    RestoreStartup,
}

impl fmt::Display for RestoreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestoreStep::StageConfiguration => "stage configuration",
            RestoreStep::EraseConfiguration => "erase configuration",
            RestoreStep::Reload => "reload",
            RestoreStep::ApplyConfiguration => "apply configuration",
            RestoreStep::RestoreStartup => "restore startup configuration",
        };
        f.write_str(name)
    }
}

fn step<T>(step: RestoreStep, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        FlowError::StepFailed {
            step,
            source: Box::new(e),
        }
        .into()
    })
}

/// Restores and saves device configuration through one handler's sessions.
#[derive(Debug)]
pub struct ConfigurationFlow<'h> {
    handler: &'h CliHandler,
    settle_delay: Duration,
    backup_restore_timeout: Duration,
    reload_timeout: Duration,
}

impl<'h> ConfigurationFlow<'h> {
    pub fn new(handler: &'h CliHandler) -> Self {
        Self {
            handler,
            settle_delay: SETTLE_DELAY,
            backup_restore_timeout: BACKUP_RESTORE_TIMEOUT,
            reload_timeout: RELOAD_TIMEOUT,
        }
    }

    /// Wait longer after applying a configuration. Never shorter than
    /// [`SETTLE_DELAY`].
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay.max(SETTLE_DELAY);
        self
    }

    pub fn with_reload_timeout(mut self, timeout: Duration) -> Self {
        self.reload_timeout = timeout;
        self
    }

    pub fn with_backup_restore_timeout(mut self, timeout: Duration) -> Self {
        self.backup_restore_timeout = timeout;
        self
    }

    /// Restore `request.source` onto the device.
    ///
    /// Startup with append is rejected, and startup with override is
    /// rejected unless `session` reaches the device through a console,
    /// both before anything is sent. Any other combination is a single
    /// copy onto the target configuration; in particular an override of
    /// the running configuration neither erases nor reloads and needs no
    /// console.
    pub async fn restore(&self, session: &mut Session, request: &RestoreRequest) -> Result<()> {
        match (request.configuration_type, request.restore_method) {
            (ConfigurationType::Startup, RestoreMethod::Append) => {
                Err(FlowError::UnsupportedRestoreCombination {
                    configuration: request.configuration_type.to_string(),
                    method: request.restore_method.to_string(),
                }
                .into())
            }
            (ConfigurationType::Startup, RestoreMethod::Override) => {
                if !session.kind().is_console() {
                    return Err(FlowError::UnsupportedSessionType {
                        kind: session.kind(),
                    }
                    .into());
                }
                let mut cli = self.handler.enable_service(session)?;
                self.override_startup(&mut cli, request).await
            }
            (configuration_type, _) => {
                let mut cli = self.handler.enable_service(session)?;
                let target = ConfigSource::from(configuration_type.location());
                let actions = SystemActions::prepare_action_map(&request.source, &target)?;
                SystemActions::new(&mut cli)
                    .copy(
                        &request.source.device_reference(),
                        &target.device_reference(),
                        request.vrf.as_deref(),
                        &actions,
                        None,
                    )
                    .await?;
                info!("restored {} configuration from {}", configuration_type, request.source);
                Ok(())
            }
        }
    }

    async fn override_startup(&self, cli: &mut CliService<'_>, request: &RestoreRequest) -> Result<()> {
        let staging = ConfigSource::from(TEMP_CONFIG_LOCATION);
        let startup = ConfigSource::from(STARTUP_LOCATION);
        let backup = ConfigSource::from(BACKUP_STARTUP_LOCATION);
        let running = ConfigSource::from(RUNNING_LOCATION);
        let mut system = SystemActions::new(cli);

        info!("staging {} for startup override", request.source);
        let actions = SystemActions::prepare_action_map(&request.source, &staging)?;
        step(
            RestoreStep::StageConfiguration,
            system
                .copy(
                    &request.source.device_reference(),
                    &staging.device_reference(),
                    request.vrf.as_deref(),
                    &actions,
                    None,
                )
                .await,
        )?;

        let actions = SystemActions::prepare_action_map(&startup, &backup)?;
        let backed_up = match system
            .copy(
                &startup.device_reference(),
                &backup.device_reference(),
                None,
                &actions,
                None,
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to backup startup-config. Error: {}", e);
                false
            }
        };

        step(RestoreStep::EraseConfiguration, system.write_erase().await)?;

        let actions = reload_action_map()?;
        step(
            RestoreStep::Reload,
            system
                .reload_device_via_console(&actions, Some(self.reload_timeout))
                .await,
        )?;

        let actions = SystemActions::prepare_action_map(&staging, &running)?;
        step(
            RestoreStep::ApplyConfiguration,
            system
                .copy(
                    &staging.device_reference(),
                    &running.device_reference(),
                    None,
                    &actions,
                    None,
                )
                .await,
        )?;

        tokio::time::sleep(self.settle_delay).await;

        if backed_up {
            let actions = SystemActions::prepare_action_map(&backup, &startup)?;
            step(
                RestoreStep::RestoreStartup,
                system
                    .copy(
                        &backup.device_reference(),
                        &startup.device_reference(),
                        None,
                        &actions,
                        Some(self.backup_restore_timeout),
                    )
                    .await,
            )?;
        }

        info!("startup configuration overridden from {}", request.source);
        Ok(())
    }

    /// Copy the `configuration_type` configuration to `destination`.
    ///
    /// Returns the destination as the device referred to it.
    pub async fn save(
        &self,
        session: &mut Session,
        destination: &ConfigSource,
        configuration_type: ConfigurationType,
        vrf: Option<&str>,
    ) -> Result<String> {
        let source = ConfigSource::from(configuration_type.location());
        let actions = SystemActions::prepare_action_map(&source, destination)?;
        let mut cli = self.handler.enable_service(session)?;

        SystemActions::new(&mut cli)
            .copy(
                &source.device_reference(),
                &destination.device_reference(),
                vrf,
                &actions,
                None,
            )
            .await?;

        let reference = destination.device_reference();
        info!("saved {} configuration to {}", configuration_type, reference);
        Ok(reference)
    }
}
