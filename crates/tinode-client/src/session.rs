//! Session context.
//!
//! Sans-IO core of the client: owns the id counter, the session defaults,
//! the completion registry and the command compiler. The engine feeds it
//! operator lines and server messages; it returns the messages to send and
//! queues everything meant for the operator in the [`Outbox`].
//!
//! # Invariants
//!
//! - Ids strictly increase. The counter advances only when a request is
//!   actually produced, so rejected lines and `.use` leave it unchanged.
//! - A completion is registered before its request is handed out, so an ack
//!   can never overtake its callback.

use base64::Engine as _;
use tinode_proto::{
    ClientMessage, Params, Request, ServerMessage,
    client::{Hello, Login},
};

use crate::{
    command::{AckAction, CommandCompiler, Compiled},
    completion::{Completion, Completions},
    cookie::CookieStore,
    defaults::SessionDefaults,
    mediator::is_exit_command,
    outbox::Outbox,
    render,
};

/// Protocol version announced in `{hi}`.
pub const PROTOCOL_VERSION: &str = "0.22";

/// Startup login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Authentication scheme.
    pub scheme: String,
    /// Raw secret bytes.
    pub secret: Vec<u8>,
}

impl Credentials {
    /// `basic` scheme with a `user:password` secret.
    pub fn basic(user_password: &str) -> Self {
        Self { scheme: "basic".to_string(), secret: user_password.as_bytes().to_vec() }
    }

    /// `token` scheme. Tokens are issued base64-encoded; one that does not
    /// decode is sent as-is.
    pub fn token(token: &str) -> Self {
        let secret = base64::engine::general_purpose::STANDARD
            .decode(token.trim())
            .unwrap_or_else(|_| token.as_bytes().to_vec());
        Self { scheme: "token".to_string(), secret }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("scheme", &self.scheme).finish_non_exhaustive()
    }
}

/// What to do with one operator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Send this request.
    Send(ClientMessage),
    /// Nothing to send; any output is already queued.
    Handled,
    /// Operator asked to leave.
    Exit,
}

/// Protocol state for one run.
#[derive(Debug)]
pub struct Session {
    next_id: u64,
    defaults: SessionDefaults,
    completions: Completions,
    compiler: CommandCompiler,
    outbox: Outbox,
    cookies: CookieStore,
}

impl Session {
    /// Session starting from a random id in `10000..60000`.
    pub fn new(outbox: Outbox, cookies: CookieStore) -> Self {
        Self::with_first_id(rand::random_range(10_000..60_000), outbox, cookies)
    }

    /// Session whose first request gets `first_id`.
    pub fn with_first_id(first_id: u64, outbox: Outbox, cookies: CookieStore) -> Self {
        Self {
            next_id: first_id,
            defaults: SessionDefaults::default(),
            completions: Completions::new(),
            compiler: CommandCompiler::new(outbox.clone()),
            outbox,
            cookies,
        }
    }

    /// Opening requests: `{hi}`, then `{login}` when credentials are given.
    pub fn start(&mut self, credentials: Option<&Credentials>) -> Vec<ClientMessage> {
        let mut messages = Vec::with_capacity(2);

        let id = self.take_id();
        let hello = Request::Hello(Hello {
            id: id.clone(),
            ver: PROTOCOL_VERSION.to_string(),
            user_agent: user_agent(),
            lang: "EN".to_string(),
        });
        self.register(id, AckAction::ShowServerParams);
        messages.push(ClientMessage::new(hello));

        if let Some(credentials) = credentials {
            let id = self.take_id();
            let login = Request::Login(Login {
                id: id.clone(),
                scheme: credentials.scheme.clone(),
                secret: credentials.secret.clone(),
                cred: Vec::new(),
            });
            self.register(id, AckAction::SaveCookie);
            messages.push(ClientMessage::new(login));
        }

        messages
    }

    /// Handle one operator line.
    pub fn handle_line(&mut self, line: &str) -> LineOutcome {
        if is_exit_command(line) {
            return LineOutcome::Exit;
        }

        let id = self.next_id.to_string();
        match self.compiler.compile(line, &id, &mut self.defaults) {
            Compiled::Request(outgoing) => {
                self.next_id += 1;
                if let Some(action) = outgoing.on_ack {
                    self.register(id, action);
                }
                tracing::debug!(
                    id = outgoing.message.request.id(),
                    kind = outgoing.message.request.kind(),
                    "request compiled"
                );
                LineOutcome::Send(outgoing.message)
            },
            Compiled::Local | Compiled::Nothing => LineOutcome::Handled,
        }
    }

    /// Handle one server message.
    pub fn dispatch(&mut self, message: ServerMessage) {
        tracing::debug!(kind = message.kind(), "dispatching server message");
        match message {
            ServerMessage::Ctrl(ctrl) => {
                if !ctrl.is_success() {
                    tracing::debug!(id = ?ctrl.id, code = ctrl.code, "request rejected");
                }
                if let Some(id) = &ctrl.id {
                    let params = ctrl.params.clone().unwrap_or_default();
                    self.completions.resolve(id, ctrl.code, &params);
                }
                self.outbox.println(render::ctrl(&ctrl));
            },
            ServerMessage::Data(data) => {
                for line in render::data(&data) {
                    self.outbox.println(line);
                }
            },
            ServerMessage::Pres(pres) => {
                tracing::trace!(topic = %pres.topic, what = %pres.what, "presence");
            },
            ServerMessage::Info(info) => self.outbox.println(render::info(&info)),
            ServerMessage::Meta(meta) => self.outbox.println(render::meta(&meta)),
        }
    }

    /// Current defaults.
    pub fn defaults(&self) -> &SessionDefaults {
        &self.defaults
    }

    /// Id the next request will get.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Number of requests still waiting for an ack with a callback.
    pub fn pending(&self) -> usize {
        self.completions.len()
    }

    fn take_id(&mut self) -> String {
        let id = self.next_id.to_string();
        self.next_id += 1;
        id
    }

    fn register(&mut self, id: String, action: AckAction) {
        let callback = match action {
            AckAction::ShowServerParams => show_server_params(self.outbox.clone()),
            AckAction::SaveCookie => save_cookie(self.outbox.clone(), self.cookies.clone()),
        };
        if let Err(e) = self.completions.register(id, callback) {
            tracing::warn!("{e}");
        }
    }
}

fn show_server_params(outbox: Outbox) -> Completion {
    Box::new(move |params: &Params| {
        outbox.println("Connected to server:");
        for (key, value) in params {
            outbox.println(format!("\t{key}: {}", value.to_display_string()));
        }
    })
}

fn save_cookie(outbox: Outbox, cookies: CookieStore) -> Completion {
    Box::new(move |params: &Params| {
        let user = params.get("user").map(|u| u.to_display_string()).unwrap_or_default();
        outbox.println(format!("Authenticated as {user}"));

        if let Err(e) = cookies.save(params) {
            tracing::warn!(path = %cookies.path().display(), "cookie not saved: {e}");
            outbox.println(format!("Failed to save authentication cookie: {e}"));
        }
    })
}

fn user_agent() -> String {
    format!(
        "tn-cli/{} ({}/{}); tinode-rs/{PROTOCOL_VERSION}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tinode_proto::{Blob, Ctrl, Data, Pres};

    use super::*;
    use crate::outbox::OutputReceiver;

    fn session(dir: &tempfile::TempDir) -> (Session, OutputReceiver) {
        let (outbox, rx) = Outbox::new();
        let cookies = CookieStore::new(dir.path().join("cookie"));
        (Session::with_first_id(100, outbox, cookies), rx)
    }

    fn drain(rx: &mut OutputReceiver) -> Vec<String> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn ack(id: &str, code: u16, params: &[(&str, &str)]) -> ServerMessage {
        let params = params.iter().map(|(k, v)| ((*k).to_string(), Blob::encode(v).unwrap())).collect();
        ServerMessage::Ctrl(Ctrl {
            id: Some(id.into()),
            topic: None,
            code,
            text: "ok".into(),
            params: Some(params),
        })
    }

    #[test]
    fn start_sends_hello_then_login() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _rx) = session(&dir);

        let messages = session.start(Some(&Credentials::basic("alice:pw")));
        let kinds: Vec<_> = messages.iter().map(|m| (m.request.kind(), m.request.id().to_string())).collect();
        assert_eq!(kinds, vec![("hi", "100".to_string()), ("login", "101".to_string())]);
        assert_eq!(session.pending(), 2);
        assert_eq!(session.next_id(), 102);
    }

    #[test]
    fn start_without_credentials_only_greets() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _rx) = session(&dir);

        assert_eq!(session.start(None).len(), 1);
        assert_eq!(session.pending(), 1);
    }

    #[test]
    fn hello_ack_prints_server_params() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, mut rx) = session(&dir);
        session.start(None);

        session.dispatch(ack("100", 201, &[("ver", "0.22"), ("build", "mysql")]));
        assert_eq!(
            drain(&mut rx),
            vec!["Connected to server:", "\tbuild: mysql", "\tver: 0.22", "201 ok"]
        );
        assert_eq!(session.pending(), 0);
    }

    #[test]
    fn login_ack_saves_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, mut rx) = session(&dir);
        session.start(Some(&Credentials::token("dG9rZW4=")));

        session.dispatch(ack("101", 200, &[("token", "abc"), ("user", "usr1")]));
        assert!(drain(&mut rx).contains(&"Authenticated as usr1".to_string()));
        assert_eq!(CookieStore::new(dir.path().join("cookie")).load().as_deref(), Some("abc"));
    }

    #[test]
    fn failed_login_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, mut rx) = session(&dir);
        session.start(Some(&Credentials::basic("alice:wrong")));

        session.dispatch(ack("101", 401, &[]));
        assert_eq!(drain(&mut rx), vec!["401 ok"]);
        assert!(!dir.path().join("cookie").exists());
        assert_eq!(session.pending(), 1);
    }

    #[test]
    fn unsaved_cookie_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (outbox, mut rx) = Outbox::new();
        let cookies = CookieStore::new(dir.path().join("missing-dir").join("cookie"));
        let mut session = Session::with_first_id(1, outbox, cookies);
        session.start(Some(&Credentials::basic("a:b")));

        session.dispatch(ack("2", 200, &[("token", "t"), ("user", "u")]));
        let output = drain(&mut rx);
        assert!(output.iter().any(|l| l.starts_with("Failed to save authentication cookie")));
        assert_eq!(output.last().map(String::as_str), Some("200 ok"));
    }

    #[test]
    fn rejected_lines_keep_the_counter() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _rx) = session(&dir);

        for line in ["", "frobnicate", ".use --topic grp1", "leave --bogus"] {
            assert_eq!(session.handle_line(line), LineOutcome::Handled);
        }
        assert_eq!(session.next_id(), 100);
        assert_eq!(session.defaults().topic.as_deref(), Some("grp1"));

        let LineOutcome::Send(message) = session.handle_line("pub hi") else {
            panic!("expected request");
        };
        assert_eq!(message.request.id(), "100");
        assert_eq!(message.request.topic(), Some("grp1"));
        assert_eq!(session.next_id(), 101);
    }

    #[test]
    fn exit_and_quit_end_input() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _rx) = session(&dir);
        assert_eq!(session.handle_line("exit"), LineOutcome::Exit);
        assert_eq!(session.handle_line(" quit"), LineOutcome::Exit);
    }

    #[test]
    fn compiled_login_registers_completion() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _rx) = session(&dir);

        session.handle_line("login --uname a --password b");
        assert_eq!(session.pending(), 1);
        session.handle_line("get me --desc");
        assert_eq!(session.pending(), 1);
    }

    #[test]
    fn data_and_presence_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, mut rx) = session(&dir);

        session.dispatch(ServerMessage::Pres(Pres {
            topic: "me".into(),
            src: Some("usr2".into()),
            what: "on".into(),
            seq: None,
        }));
        session.dispatch(ServerMessage::Data(Data {
            topic: "grp1".into(),
            from: Some("usr2".into()),
            seq: 1,
            content: Some(Blob::encode("yo").unwrap()),
        }));
        assert_eq!(drain(&mut rx), vec!["From: usr2:", "yo"]);
    }

    #[test]
    fn unsolicited_ack_is_only_shown() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, mut rx) = session(&dir);
        session.dispatch(ack("9999", 200, &[]));
        assert_eq!(drain(&mut rx), vec!["200 ok"]);
    }

    #[test]
    fn token_credentials_decode_base64() {
        assert_eq!(Credentials::token("dG9rZW4=").secret, b"token");
        assert_eq!(Credentials::token("not base64!").secret, b"not base64!");
        assert_eq!(Credentials::basic("u:p").scheme, "basic");
    }
}
