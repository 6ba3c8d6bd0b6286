//! Restore a configuration file onto an NX-OS switch.
//!
//! A startup override erases and reloads the switch, so it is only
//! accepted over a console server connection.
//!
//! # Usage
//!
//! Merge a remote file into the running configuration over SSH:
//! ```bash
//! cargo run --example restore_config -- --host 10.0.0.10 --user admin --password secret \
//!     --source tftp://10.0.0.5/configs/sw1.cfg --vrf management
//! ```
//!
//! Replace the startup configuration through a console server:
//! ```bash
//! cargo run --example restore_config -- --host console-server.lab --port 7012 \
//!     --cli-type console --user admin --password secret \
//!     --source bootflash:golden.cfg --type startup --method override
//! ```

use std::env;
use std::time::Duration;

use nxos_cli::{
    CliHandler, CliType, ConfigurationFlow, ConfigurationType, RestoreMethod, RestoreRequest,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=debug shows every command and reaction
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let Some(source) = args.source else {
        eprintln!("Error: --source is required");
        std::process::exit(1);
    };

    let mut builder = CliHandler::builder(&args.host)
        .cli_type(args.cli_type)
        .username(&args.user)
        .password(&args.password)
        .command_timeout(Duration::from_secs(args.timeout));
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    let handler = builder.build()?;

    println!("Connecting to {}...", args.host);
    let mut session = handler.open_session().await?;
    println!("Connected over {}", session.kind());

    let mut request = RestoreRequest::new(source.parse()?, args.configuration_type, args.method);
    if let Some(vrf) = args.vrf {
        request = request.with_vrf(vrf);
    }

    println!(
        "Restoring {} configuration ({}) from {}",
        request.configuration_type, request.restore_method, request.source
    );
    ConfigurationFlow::new(&handler)
        .restore(&mut session, &request)
        .await?;
    println!("Done!");

    session.close().await?;
    Ok(())
}

struct Args {
    host: String,
    port: Option<u16>,
    cli_type: CliType,
    user: String,
    password: String,
    source: Option<String>,
    configuration_type: ConfigurationType,
    method: RestoreMethod,
    vrf: Option<String>,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            port: None,
            cli_type: CliType::Auto,
            user: "admin".to_string(),
            password: String::new(),
            source: None,
            configuration_type: ConfigurationType::Running,
            method: RestoreMethod::Append,
            vrf: None,
            timeout: 30,
        };

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let value = args.get(i + 1).cloned();
            match (flag, value) {
                ("--help", _) => {
                    Self::print_help();
                    std::process::exit(0);
                }
                ("--host" | "-h", Some(v)) => parsed.host = v,
                ("--port" | "-p", Some(v)) => parsed.port = v.parse().ok(),
                ("--user" | "-u", Some(v)) => parsed.user = v,
                ("--password" | "-P", Some(v)) => parsed.password = v,
                ("--source" | "-s", Some(v)) => parsed.source = Some(v),
                ("--vrf", Some(v)) => parsed.vrf = Some(v),
                ("--timeout" | "-t", Some(v)) => parsed.timeout = v.parse().unwrap_or(30),
                ("--cli-type", Some(v)) => {
                    parsed.cli_type = match v.as_str() {
                        "ssh" => CliType::Ssh,
                        "telnet" => CliType::Telnet,
                        "console" => CliType::Console,
                        _ => CliType::Auto,
                    }
                }
                ("--type", Some(v)) => {
                    parsed.configuration_type = match v.as_str() {
                        "startup" => ConfigurationType::Startup,
                        _ => ConfigurationType::Running,
                    }
                }
                ("--method", Some(v)) => {
                    parsed.method = match v.as_str() {
                        "override" => RestoreMethod::Override,
                        _ => RestoreMethod::Append,
                    }
                }
                (flag, _) => {
                    eprintln!("Unknown or incomplete argument: {}", flag);
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"nxos-cli restore_config example

USAGE:
    cargo run --example restore_config -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Switch or console server [default: localhost]
    -p, --port <PORT>          Port [default: 22 for SSH, 23 for telnet]
    --cli-type <TYPE>          ssh, telnet, console or auto [default: auto]
    -u, --user <USER>          Username [default: admin]
    -P, --password <PASS>      Password
    -s, --source <LOCATOR>     File to restore: bootflash:name or scheme://host/path
    --type <TYPE>              startup or running [default: running]
    --method <METHOD>          append or override [default: append]
    --vrf <NAME>               VRF used to reach a remote source
    -t, --timeout <SECS>       Command timeout [default: 30]
    --help                     Print this help message
"#
        );
    }
}
