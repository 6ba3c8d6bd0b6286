//! VLAN membership of switch ports.

use std::fmt;

use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::channel::Session;
use crate::driver::{CliHandler, CliService};
use crate::error::{Error, FlowError, Result};

const MAX_VLAN_ID: u16 = 4094;

/// Switchport mode a VLAN is carried in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VlanMode {
    Access,
    Trunk,
}

impl fmt::Display for VlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VlanMode::Access => f.write_str("access"),
            VlanMode::Trunk => f.write_str("trunk"),
        }
    }
}

/// Interface name for a port address such as
/// `Switch/Chassis 1/Ethernet1-5`: the last segment, with a `-` between
/// slot numbers read as `/`.
pub fn port_name(port: &str) -> String {
    let segment = port.rsplit('/').next().unwrap_or(port).trim();
    let mut name = String::with_capacity(segment.len());
    let mut prev: Option<char> = None;
    for c in segment.chars() {
        match (c, prev) {
            ('-', Some(p)) if p.is_ascii_digit() => name.push('/'),
            _ => name.push(c),
        }
        prev = Some(c);
    }
    name
}

/// Check a range like `10`, `10-20` or `10,12,30-40`.
fn validate_vlan_range(range: &str) -> Result<()> {
    let invalid = |message: String| FlowError::InvalidVlanRange {
        range: range.to_string(),
        message,
    };

    if range.trim().is_empty() {
        return Err(invalid("empty range".to_string()).into());
    }

    for part in range.split(',') {
        let (low, high) = part.split_once('-').unwrap_or((part, part));
        let parse = |id: &str| -> Result<u16> {
            match id.trim().parse::<u16>() {
                Ok(id) if (1..=MAX_VLAN_ID).contains(&id) => Ok(id),
                _ => Err(invalid(format!("'{}' is not a VLAN id", id.trim())).into()),
            }
        };
        if parse(low)? > parse(high)? {
            return Err(invalid(format!("'{}' is descending", part.trim())).into());
        }
    }
    Ok(())
}

/// Adds and removes VLANs on switch ports.
#[derive(Debug)]
pub struct ConnectivityFlow<'h> {
    handler: &'h CliHandler,
}

impl<'h> ConnectivityFlow<'h> {
    pub fn new(handler: &'h CliHandler) -> Self {
        Self { handler }
    }

    /// Create the VLANs in `vlan_range` and carry them on `port`.
    ///
    /// With `qnq` the port becomes a dot1q tunnel whose outer tag is the
    /// VLAN; the change is checked against the interface's running
    /// configuration afterwards.
    pub async fn add_vlan(
        &self,
        session: &mut Session,
        vlan_range: &str,
        port: &str,
        mode: VlanMode,
        qnq: bool,
    ) -> Result<String> {
        validate_vlan_range(vlan_range)?;
        let range = vlan_range.replace(' ', "");
        let interface = port_name(port);

        let mut commands = vec![
            format!("vlan {range}"),
            "exit".to_string(),
            format!("interface {interface}"),
            "switchport".to_string(),
        ];
        match (mode, qnq) {
            (_, true) => {
                commands.push("switchport mode dot1q-tunnel".to_string());
                commands.push(format!("switchport access vlan {range}"));
            }
            (VlanMode::Access, false) => {
                commands.push("switchport mode access".to_string());
                commands.push(format!("switchport access vlan {range}"));
            }
            (VlanMode::Trunk, false) => {
                commands.push("switchport mode trunk".to_string());
                commands.push(format!("switchport trunk allowed vlan {range}"));
            }
        }
        commands.push("no shutdown".to_string());

        let mut cli = self.handler.enable_service(session)?;
        configure(&mut cli, commands).await?;

        let running = show_interface(&mut cli, &interface).await?;
        if !vlan_applied(&running, &range)? {
            return Err(FlowError::VlanNotApplied {
                range,
                port: interface,
            }
            .into());
        }

        info!("VLAN {} added to {} in {} mode", range, interface, mode);
        Ok(format!("Vlan {range} configuration successfully completed"))
    }

    /// Stop carrying `vlan_range` on `port`. The VLANs themselves stay.
    pub async fn remove_vlan(
        &self,
        session: &mut Session,
        vlan_range: &str,
        port: &str,
        mode: VlanMode,
    ) -> Result<String> {
        validate_vlan_range(vlan_range)?;
        let range = vlan_range.replace(' ', "");
        let interface = port_name(port);

        let removal = match mode {
            VlanMode::Access => "no switchport access vlan".to_string(),
            VlanMode::Trunk => format!("switchport trunk allowed vlan remove {range}"),
        };
        let commands = vec![format!("interface {interface}"), removal];

        let mut cli = self.handler.enable_service(session)?;
        configure(&mut cli, commands).await?;

        info!("VLAN {} removed from {}", range, interface);
        Ok(format!("Remove Vlan {range} configuration successfully completed"))
    }
}

/// Run `commands` in the config mode, returning to the caller's mode even
/// when one fails.
async fn configure(cli: &mut CliService<'_>, commands: Vec<String>) -> Result<()> {
    let config_mode = cli.graph().profile().config_mode.clone();
    cli.enter_mode(&config_mode, move |config| {
        Box::pin(async move {
            for command in &commands {
                config.send_command(command).await?.ensure_success()?;
            }
            Ok::<_, Error>(())
        })
    })
    .await
}

/// Whether an interface's running configuration carries `range` as one
/// whole entry of a `switchport ... vlan` list.
fn vlan_applied(running: &str, range: &str) -> Result<bool> {
    let range: String = range.chars().filter(|c| !c.is_whitespace()).collect();
    let line = Regex::new(&format!(
        r"(?m)^\s*switchport (?:access|trunk allowed) vlan (?:\S*,)?{}(?:,|\s*$)",
        regex::escape(&range)
    ))?;
    Ok(line.is_match(running))
}

async fn show_interface(cli: &mut CliService<'_>, interface: &str) -> Result<String> {
    let response = cli
        .send_command(&format!("show running-config interface {interface}"))
        .await?
        .ensure_success()?;
    Ok(response.result)
}
