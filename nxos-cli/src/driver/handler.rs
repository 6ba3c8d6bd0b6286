//! Session lifecycle: connect, log in, classify the prompt, initialize.

use log::{debug, info, warn};

use super::builder::CliHandlerBuilder;
use super::mode_graph::ModeGraph;
use super::service::CliService;
use super::settings::CliSettings;
use crate::channel::{ActionMap, Credentials, SecretRef, Session, dispatch};
use crate::error::{Error, Result, TransportError};
use crate::platform::DeviceProfile;
use crate::transport::{CliType, ConnectionParams, SessionFactory, SessionRegistry};

/// Opens sessions to one device and hands out CLI services over them.
///
/// # Example
///
/// ```rust,no_run
/// use nxos_cli::driver::CliHandler;
///
/// # async fn example() -> Result<(), nxos_cli::Error> {
/// let handler = CliHandler::builder("10.0.0.10")
///     .username("admin")
///     .password("secret")
///     .build()?;
///
/// let mut session = handler.open_session().await?;
/// let mut cli = handler.enable_service(&mut session)?;
/// let response = cli.send_command("show version").await?;
/// println!("{}", response.result);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CliHandler {
    params: ConnectionParams,
    graph: ModeGraph,
    registry: SessionRegistry,
    settings: CliSettings,
}

impl CliHandler {
    pub(crate) fn new(
        params: ConnectionParams,
        profile: DeviceProfile,
        registry: SessionRegistry,
        settings: CliSettings,
    ) -> Result<Self> {
        Ok(Self {
            params,
            graph: ModeGraph::new(profile)?,
            registry,
            settings,
        })
    }

    pub fn builder(host: impl Into<String>) -> CliHandlerBuilder {
        CliHandlerBuilder::new(host)
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Requested session selection.
    pub fn cli_type(&self) -> CliType {
        self.params.cli_type
    }

    pub fn graph(&self) -> &ModeGraph {
        &self.graph
    }

    pub fn settings(&self) -> CliSettings {
        self.settings
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.params.username.clone(),
            password: self.params.password.clone(),
            enable_password: self.params.enable_password.clone(),
        }
    }

    /// Reactions answering a device's own login dialogue.
    pub fn login_action_map(&self) -> Result<ActionMap> {
        Ok(ActionMap::new()
            .send_line(
                r"(?:[Ll]ogin|[Uu]ser|[Uu]sername):\s*$",
                self.params.username.clone(),
            )?
            .send_secret(r"[Pp]assword:?\s*$", SecretRef::Password)?)
    }

    /// Open a session with the first eligible factory that both connects
    /// and reaches a prompt.
    ///
    /// A factory whose session does not start is closed and the next one
    /// is tried; the last error is returned when none succeeds.
    pub async fn open_session(&self) -> Result<Session> {
        let profile = self.graph.profile();
        let mut last_error: Option<Error> = None;

        for factory in self.registry.candidates(self.params.cli_type) {
            let kind = factory.session_kind();
            debug!("trying {} session to {}", kind, self.params.host);

            let transport = match factory
                .connect(&self.params, profile.terminal_width, profile.terminal_height)
                .await
            {
                Ok(transport) => transport,
                Err(e) => {
                    warn!("{} session to {} failed: {}", kind, self.params.host, e);
                    last_error = Some(e);
                    continue;
                }
            };

            let mut session = Session::new(transport, kind, self.credentials())
                .with_search_depth(self.settings.search_depth);
            match self.start_session(&mut session, factory).await {
                Ok(()) => return Ok(session),
                Err(e) => {
                    warn!("{} session to {} did not start: {}", kind, self.params.host, e);
                    if let Err(close_err) = session.close().await {
                        debug!("closing abandoned {} session: {}", kind, close_err);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            TransportError::NoSessionAvailable {
                cli_type: self.params.cli_type.to_string(),
            }
            .into()
        }))
    }

    /// Bring a freshly connected session to a known prompt and run the
    /// session start sequence.
    pub async fn start_session(&self, session: &mut Session, factory: &SessionFactory) -> Result<()> {
        if factory.start_with_new_line {
            session.send_line("").await?;
        }

        let actions = if factory.uses_login_dialogue() {
            self.login_action_map()?
        } else {
            ActionMap::new()
        };
        let output = dispatch::run(
            session,
            self.graph.any_prompt(),
            &actions,
            self.settings.timeout,
            self.settings.max_reactions,
        )
        .await?;

        let mode = self.graph.determine_from_prompt(&output)?.name.clone();
        info!(
            "{} session to {} ready in mode '{}'",
            session.kind(),
            self.params.host,
            mode
        );
        session.set_current_mode(Some(mode));
        self.on_session_start(session).await
    }

    /// Terminal and logging setup run on every new session.
    pub async fn on_session_start(&self, session: &mut Session) -> Result<()> {
        debug!("running session start commands");
        self.enable_service(session)?.initialize().await
    }

    /// A service bound to `mode`.
    pub fn service<'a>(&'a self, session: &'a mut Session, mode: &str) -> Result<CliService<'a>> {
        CliService::new(session, &self.graph, mode, self.settings)
    }

    pub fn enable_service<'a>(&'a self, session: &'a mut Session) -> Result<CliService<'a>> {
        let mode = &self.graph.profile().enable_mode;
        self.service(session, mode)
    }

    pub fn config_service<'a>(&'a self, session: &'a mut Session) -> Result<CliService<'a>> {
        let mode = &self.graph.profile().config_mode;
        self.service(session, mode)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::transport::{SessionKind, TransportKind};

    fn handler() -> CliHandler {
        CliHandler::builder("10.0.0.10")
            .username("admin")
            .password("secret")
            .build()
            .unwrap()
    }

    fn init_replies(transport: MockTransport) -> MockTransport {
        transport
            .on("terminal length 0", "switch#")
            .on("terminal width 300", "switch#")
            .on("configure terminal", "switch(config)#")
            .on("no logging console", "switch(config)#")
            .on("end", "switch#")
    }

    #[tokio::test]
    async fn test_console_login_dialogue() {
        let handler = handler();
        let (transport, handle) = MockTransport::new();
        let transport = init_replies(
            transport
                .on("", "\r\nUser Access Verification\r\nswitch login: ")
                .on("admin", "Password: ")
                .on("secret", "\r\nLast login: Sun Oct 18 09:00:00 2026\r\nswitch# "),
        );
        let mut session = Session::new(
            Box::new(transport),
            crate::transport::SessionKind::ConsoleTelnet,
            handler.credentials(),
        );

        let factory = SessionFactory::console(TransportKind::Telnet, true);
        handler.start_session(&mut session, &factory).await.unwrap();

        assert_eq!(
            handle.writes(),
            vec![
                "",
                "admin",
                "secret",
                "terminal length 0",
                "terminal width 300",
                "configure terminal",
                "no logging console",
                "end",
            ]
        );
        assert_eq!(session.current_mode(), Some("enable"));
    }

    #[tokio::test]
    async fn test_ssh_session_skips_login_dialogue() {
        let handler = handler();
        let (transport, handle) = MockTransport::new();
        let transport = init_replies(transport.banner("Cisco Nexus Operating System\r\nswitch# "));
        let mut session = Session::new(
            Box::new(transport),
            crate::transport::SessionKind::Ssh,
            handler.credentials(),
        );

        let factory = SessionFactory::generic(TransportKind::Ssh);
        handler.start_session(&mut session, &factory).await.unwrap();

        assert_eq!(handle.count("terminal"), 2);
        assert_eq!(handle.writes().first().map(String::as_str), Some("terminal length 0"));
    }

    /// A console line that stays silent until it receives a newline, then
    /// answers every line with the prompt of the mode it is in.
    async fn silent_console() -> (u16, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let mut line = Vec::new();
                    let mut in_config = false;
                    while let Ok(n) = stream.read(&mut buf).await {
                        if n == 0 {
                            break;
                        }
                        for &b in &buf[..n] {
                            if b != b'\n' {
                                line.push(b);
                                continue;
                            }
                            let command = String::from_utf8_lossy(&line).trim().to_string();
                            line.clear();
                            in_config = match command.as_str() {
                                "configure terminal" => true,
                                "end" => false,
                                _ => in_config,
                            };
                            let prompt: &[u8] = if in_config {
                                b"\r\nswitch(config)# "
                            } else {
                                b"\r\nswitch# "
                            };
                            if stream.write_all(prompt).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        (port, accepted)
    }

    #[tokio::test]
    async fn test_silent_console_falls_through_to_newline_factory() {
        let (port, accepted) = silent_console().await;
        let handler = CliHandler::builder("127.0.0.1")
            .port(port)
            .cli_type(CliType::Console)
            .username("admin")
            .password("secret")
            .command_timeout(Duration::from_millis(500))
            .registry(SessionRegistry::new(vec![
                SessionFactory::console(TransportKind::Telnet, false),
                SessionFactory::console(TransportKind::Telnet, true),
            ]))
            .build()
            .unwrap();

        let session = handler.open_session().await.unwrap();

        assert_eq!(session.kind(), SessionKind::ConsoleTelnet);
        assert_eq!(session.current_mode(), Some("enable"));
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_registry_reports_no_session() {
        let handler = CliHandler::builder("switch")
            .username("admin")
            .password("secret")
            .registry(SessionRegistry::new(vec![]))
            .build()
            .unwrap();

        let err = handler.open_session().await.err().unwrap();
        assert!(matches!(
            err,
            Error::Transport(TransportError::NoSessionAvailable { .. })
        ));
    }

    #[test]
    fn test_login_map_is_anchored_to_prompt() {
        let handler = handler();
        let map = handler.login_action_map().unwrap();
        let login = map.iter().next().unwrap();
        assert!(login.pattern.is_match(b"switch login: "));
        assert!(!login.pattern.is_match(b"Last login: Sun Oct 18\r\nswitch#"));
    }

    #[test]
    fn test_services_bind_profile_modes() {
        let handler = handler();
        let (transport, _handle) = MockTransport::new();
        let mut session = Session::new(
            Box::new(transport),
            crate::transport::SessionKind::Ssh,
            handler.credentials(),
        );

        assert_eq!(handler.enable_service(&mut session).unwrap().mode(), "enable");
        assert_eq!(handler.config_service(&mut session).unwrap().mode(), "config");
        assert_eq!(handler.cli_type(), CliType::Auto);
    }
}
