//! Command compiler.
//!
//! Turns one operator line into a typed request. Lines are split with shell
//! quoting rules and the first token picks a grammar; every grammar is a clap
//! parser, so `-h` and malformed flags produce clap's own usage text.
//!
//! Nothing here fails: problems are rendered into the [`Outbox`] and the
//! line compiles to [`Compiled::Nothing`]. The compiler holds no registry;
//! a request that needs follow-up on success names it with an [`AckAction`]
//! and the session binds the callback.

use std::{fmt::Display, path::PathBuf};

use base64::Engine;
use clap::{CommandFactory, Parser, ValueEnum, error::ErrorKind};
use serde::Serialize;
use tinode_proto::{
    Blob, ClientMessage, Request,
    client::{
        Account, Credential, DefaultAcsMode, Delete, DeleteWhat, Get, GetQuery, Leave, Login,
        Note, NoteWhat, Publish, SeqRange, Set, SetDesc, SetQuery, SetSub, Subscribe,
    },
};

use crate::{defaults::SessionDefaults, outbox::Outbox, vcard::Vcard};

/// Follow-up to run when the server accepts a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckAction {
    /// Show the server's handshake parameters.
    ShowServerParams,
    /// Persist the login token.
    SaveCookie,
}

/// A compiled request ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    /// The message.
    pub message: ClientMessage,
    /// Follow-up on success.
    pub on_ack: Option<AckAction>,
}

/// Result of compiling one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compiled {
    /// A request to send.
    Request(Box<Outgoing>),
    /// Handled locally (`.use`).
    Local,
    /// Blank, unknown or rejected; any explanation is already queued.
    Nothing,
}

const USAGE: &str = "Possible commands:
\t.use\t- set default user or topic
\tacc\t- create account
\tlogin\t- authenticate
\tsub\t- subscribe to topic
\tleave\t- detach or unsubscribe from topic
\tpub\t- post message to topic
\tget\t- query topic for metadata or messages
\tset\t- update topic metadata
\tdel\t- delete message(s), topic or subscription
\tnote\t- send notification

\tType <command> -h for help";

/// Compiles operator lines.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    outbox: Outbox,
}

impl CommandCompiler {
    /// Compiler reporting problems to `outbox`.
    pub fn new(outbox: Outbox) -> Self {
        Self { outbox }
    }

    /// Compile `line` as request `id`.
    ///
    /// `.use` updates `defaults`; every other command only reads them.
    pub fn compile(&self, line: &str, id: &str, defaults: &mut SessionDefaults) -> Compiled {
        let Some(tokens) = shlex::split(line) else {
            self.outbox.println(format!("Unbalanced quotes in: {line}"));
            return Compiled::Nothing;
        };
        let Some(name) = tokens.first() else {
            return Compiled::Nothing;
        };

        let result = match name.as_str() {
            ".use" => {
                return match UseArgs::try_parse_from(&tokens) {
                    Ok(args) => {
                        self.apply_use(args, defaults);
                        Compiled::Local
                    },
                    Err(e) => {
                        self.report(&e);
                        Compiled::Nothing
                    },
                };
            },
            "acc" => AccArgs::try_parse_from(&tokens).and_then(|a| self.account(a, id, defaults)),
            "login" => LoginArgs::try_parse_from(&tokens).and_then(|a| login(a, id)),
            "sub" => SubArgs::try_parse_from(&tokens).and_then(|a| self.subscribe(a, id, defaults)),
            "leave" => LeaveArgs::try_parse_from(&tokens).map(|a| leave(a, id, defaults)),
            "pub" => PubArgs::try_parse_from(&tokens).and_then(|a| publish(a, id, defaults)),
            "get" => GetArgs::try_parse_from(&tokens).map(|a| get(a, id, defaults)),
            "set" => SetArgs::try_parse_from(&tokens).and_then(|a| self.set(a, id, defaults)),
            "del" => DelArgs::try_parse_from(&tokens).and_then(|a| delete(a, id, defaults)),
            "note" => NoteArgs::try_parse_from(&tokens).and_then(|a| note(a, id, defaults)),
            other => {
                self.outbox.println(format!("Unrecognized: {other}"));
                self.outbox.push_text(USAGE);
                return Compiled::Nothing;
            },
        };

        match result {
            Ok(outgoing) => Compiled::Request(Box::new(outgoing)),
            Err(e) => {
                self.report(&e);
                Compiled::Nothing
            },
        }
    }

    fn report(&self, error: &clap::Error) {
        self.outbox.push_text(&error.render().to_string());
    }

    fn apply_use(&self, args: UseArgs, defaults: &mut SessionDefaults) {
        if let Some(user) = args.user {
            self.outbox.println(format!("Default user is '{user}'"));
            defaults.user = Some(user);
        }
        if let Some(topic) = args.topic {
            self.outbox.println(format!("Default topic is '{topic}'"));
            defaults.topic = Some(topic);
        }
    }

    fn account(&self, args: AccArgs, id: &str, defaults: &SessionDefaults) -> Result<Outgoing, clap::Error> {
        let secret = match (args.secret, args.uname) {
            (Some(secret), _) => secret.into_bytes(),
            (None, Some(uname)) => basic_secret(&uname, args.password.as_deref()),
            (None, None) => Vec::new(),
        };

        let public = Vcard::build(args.full_name.as_deref(), args.photo.as_deref(), &self.outbox)
            .map(|card| encode::<AccArgs, _>(&card))
            .transpose()?;
        let desc = SetDesc {
            default_acs: default_acs(args.auth, args.anon),
            public,
            private: args.private.map(|p| encode::<AccArgs, _>(&p)).transpose()?,
        };

        let request = Request::Account(Account {
            id: id.to_string(),
            user: args.user,
            scheme: args.scheme,
            secret,
            login: args.do_login,
            tags: split_list(args.tags.as_deref()),
            desc: (!desc.is_empty()).then_some(desc),
            cred: parse_credentials::<AccArgs>(args.cred.as_deref())?,
        });

        Ok(Outgoing {
            message: ClientMessage::on_behalf_of(request, defaults.acting_user()),
            on_ack: args.do_login.then_some(AckAction::SaveCookie),
        })
    }

    fn subscribe(&self, args: SubArgs, id: &str, defaults: &SessionDefaults) -> Result<Outgoing, clap::Error> {
        let public = Vcard::build(args.full_name.as_deref(), args.photo.as_deref(), &self.outbox)
            .map(|card| encode::<SubArgs, _>(&card))
            .transpose()?;
        let desc = SetDesc {
            default_acs: default_acs(args.auth, args.anon),
            public,
            private: args.private.map(|p| encode::<SubArgs, _>(&p)).transpose()?,
        };
        let set_query = SetQuery {
            desc: (!desc.is_empty()).then_some(desc),
            sub: args.mode.map(|mode| SetSub { user: None, mode: Some(mode) }),
            tags: split_list(args.tags.as_deref()),
        };
        let get_query =
            args.get_query.map(|q| GetQuery { what: split_list(Some(&q)).join(" ") });

        let request = Request::Subscribe(Subscribe {
            id: id.to_string(),
            topic: defaults.topic_or(args.topic_flag.or(args.topic)),
            set_query: (!set_query.is_empty()).then_some(set_query),
            get_query,
        });
        Ok(Outgoing { message: ClientMessage::on_behalf_of(request, defaults.acting_user()), on_ack: None })
    }

    fn set(&self, args: SetArgs, id: &str, defaults: &SessionDefaults) -> Result<Outgoing, clap::Error> {
        let public = match args.public {
            Some(public) => Some(encode::<SetArgs, _>(&public)?),
            None => Vcard::build(args.full_name.as_deref(), args.photo.as_deref(), &self.outbox)
                .map(|card| encode::<SetArgs, _>(&card))
                .transpose()?,
        };
        let desc = SetDesc {
            default_acs: default_acs(args.auth, args.anon),
            public,
            private: args.private.map(|p| encode::<SetArgs, _>(&p)).transpose()?,
        };
        let sub = (args.user.is_some() || args.mode.is_some())
            .then(|| SetSub { user: args.user, mode: args.mode });

        let request = Request::Set(Set {
            id: id.to_string(),
            topic: Some(args.topic),
            query: SetQuery {
                desc: (!desc.is_empty()).then_some(desc),
                sub,
                tags: split_list(args.tags.as_deref()),
            },
        });
        Ok(Outgoing { message: ClientMessage::on_behalf_of(request, defaults.acting_user()), on_ack: None })
    }
}

/// `.use`
#[derive(Parser, Debug)]
#[command(name = ".use", about = "Set default user or topic")]
struct UseArgs {
    /// ID of the default user
    #[arg(long)]
    user: Option<String>,
    /// Name of default topic
    #[arg(long)]
    topic: Option<String>,
}

/// `acc`
#[derive(Parser, Debug)]
#[command(name = "acc", about = "Create or alter an account")]
struct AccArgs {
    /// ID of the account to update
    #[arg(long, default_value = "new")]
    user: String,
    /// Authentication scheme
    #[arg(long, default_value = "basic")]
    scheme: String,
    /// Secret for authentication
    #[arg(long)]
    secret: Option<String>,
    /// User name for basic authentication
    #[arg(long)]
    uname: Option<String>,
    /// Password for basic authentication
    #[arg(long)]
    password: Option<String>,
    /// Login with the newly created account
    #[arg(long)]
    do_login: bool,
    /// Tags for user discovery, comma separated list without spaces
    #[arg(long)]
    tags: Option<String>,
    /// User's human name
    #[arg(long = "fn")]
    full_name: Option<String>,
    /// Avatar file name
    #[arg(long)]
    photo: Option<PathBuf>,
    /// User's private info
    #[arg(long)]
    private: Option<String>,
    /// Default access mode for authenticated users
    #[arg(long)]
    auth: Option<String>,
    /// Default access mode for anonymous users
    #[arg(long)]
    anon: Option<String>,
    /// Credentials, comma separated list in method:value format, e.g.
    /// email:test@example.com,tel:12345
    #[arg(long)]
    cred: Option<String>,
}

/// `login`
#[derive(Parser, Debug)]
#[command(name = "login", about = "Authenticate current session")]
struct LoginArgs {
    /// Authentication secret, base64-encoded
    #[arg(value_name = "SECRET")]
    secret: Option<String>,
    /// Authentication secret, base64-encoded
    #[arg(long = "secret", value_name = "SECRET")]
    secret_flag: Option<String>,
    /// Authentication scheme
    #[arg(long, default_value = "basic")]
    scheme: String,
    /// User name in basic authentication scheme
    #[arg(long)]
    uname: Option<String>,
    /// Password in basic authentication scheme
    #[arg(long)]
    password: Option<String>,
    /// Credentials, comma separated list in method:value format
    #[arg(long)]
    cred: Option<String>,
}

/// `sub`
#[derive(Parser, Debug)]
#[command(name = "sub", about = "Subscribe to topic")]
struct SubArgs {
    /// Topic to subscribe to
    #[arg(value_name = "TOPIC")]
    topic: Option<String>,
    /// Topic to subscribe to
    #[arg(long = "topic", value_name = "TOPIC")]
    topic_flag: Option<String>,
    /// Topic's user-visible name
    #[arg(long = "fn")]
    full_name: Option<String>,
    /// Avatar file name
    #[arg(long)]
    photo: Option<PathBuf>,
    /// Topic's private info
    #[arg(long)]
    private: Option<String>,
    /// Default access mode for authenticated users
    #[arg(long)]
    auth: Option<String>,
    /// Default access mode for anonymous users
    #[arg(long)]
    anon: Option<String>,
    /// New value of access mode
    #[arg(long)]
    mode: Option<String>,
    /// Tags for topic discovery, comma separated list without spaces
    #[arg(long)]
    tags: Option<String>,
    /// Query for topic metadata or messages, comma separated list without
    /// spaces
    #[arg(long)]
    get_query: Option<String>,
}

/// `leave`
#[derive(Parser, Debug)]
#[command(name = "leave", about = "Detach or unsubscribe from topic")]
struct LeaveArgs {
    /// Topic to detach from
    #[arg(value_name = "TOPIC")]
    topic: Option<String>,
    /// Topic to detach from
    #[arg(long = "topic", value_name = "TOPIC")]
    topic_flag: Option<String>,
    /// Detach and unsubscribe from topic
    #[arg(long)]
    unsub: bool,
}

/// `pub`
#[derive(Parser, Debug)]
#[command(name = "pub", about = "Send message to topic")]
struct PubArgs {
    /// `[TOPIC] CONTENT`: a single value is the content
    #[arg(value_name = "ARGS", num_args = 1..=2)]
    positional: Vec<String>,
    /// Topic to publish to
    #[arg(long = "topic", value_name = "TOPIC")]
    topic_flag: Option<String>,
    /// Message to send
    #[arg(long = "content", value_name = "CONTENT")]
    content_flag: Option<String>,
}

/// `get`
#[derive(Parser, Debug)]
#[command(name = "get", about = "Query topic for messages or metadata")]
struct GetArgs {
    /// Topic to query
    #[arg(value_name = "TOPIC")]
    topic: Option<String>,
    /// Topic to query
    #[arg(long = "topic", value_name = "TOPIC")]
    topic_flag: Option<String>,
    /// Query topic description
    #[arg(long)]
    desc: bool,
    /// Query topic subscriptions
    #[arg(long)]
    sub: bool,
    /// Query topic tags
    #[arg(long)]
    tags: bool,
    /// Query topic messages
    #[arg(long)]
    data: bool,
}

/// `set`
#[derive(Parser, Debug)]
#[command(name = "set", about = "Update topic metadata")]
struct SetArgs {
    /// Topic to update
    topic: String,
    /// Topic's name
    #[arg(long = "fn")]
    full_name: Option<String>,
    /// Avatar file name
    #[arg(long)]
    photo: Option<PathBuf>,
    /// Topic's public info, alternative to fn+photo
    #[arg(long)]
    public: Option<String>,
    /// Topic's private info
    #[arg(long)]
    private: Option<String>,
    /// Default access mode for authenticated users
    #[arg(long)]
    auth: Option<String>,
    /// Default access mode for anonymous users
    #[arg(long)]
    anon: Option<String>,
    /// ID of the account to update
    #[arg(long)]
    user: Option<String>,
    /// New value of access mode
    #[arg(long)]
    mode: Option<String>,
    /// Tags for topic discovery, comma separated list without spaces
    #[arg(long)]
    tags: Option<String>,
}

/// What `del` removes.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum DelTarget {
    /// Messages
    Msg,
    /// A subscription
    Sub,
    /// The topic
    Topic,
}

/// `del`
#[derive(Parser, Debug)]
#[command(name = "del", about = "Delete message(s), subscription or topic")]
struct DelArgs {
    /// `[TOPIC] {msg|sub|topic}`
    #[arg(value_name = "ARGS", num_args = 1..=2, required = true)]
    positional: Vec<String>,
    /// Topic being affected
    #[arg(long = "topic", value_name = "TOPIC")]
    topic_flag: Option<String>,
    /// Delete subscription with the given user id
    #[arg(long, conflicts_with = "list")]
    user: Option<String>,
    /// Comma separated list of message IDs to delete, or `all`
    #[arg(long)]
    list: Option<String>,
    /// Hard-delete messages
    #[arg(long)]
    hard: bool,
}

/// Notification kinds accepted by `note`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
enum NoteKind {
    /// Key press
    #[default]
    Kp,
    /// Messages read
    Read,
    /// Messages received
    Recv,
}

/// `note`
#[derive(Parser, Debug)]
#[command(name = "note", about = "Send notification to topic, ex \"note grp1 kp\"")]
struct NoteArgs {
    /// Topic to notify
    topic: String,
    /// Notification type
    #[arg(value_enum, default_value_t = NoteKind::Kp)]
    what: NoteKind,
    /// Value being reported
    #[arg(long)]
    seq: Option<u64>,
}

fn login(args: LoginArgs, id: &str) -> Result<Outgoing, clap::Error> {
    let secret = match args.secret_flag.or(args.secret) {
        Some(encoded) => base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| invalid::<LoginArgs>(format!("secret is not valid base64: {e}")))?,
        None => basic_secret(args.uname.as_deref().unwrap_or_default(), args.password.as_deref()),
    };

    let request = Request::Login(Login {
        id: id.to_string(),
        scheme: args.scheme,
        secret,
        cred: parse_credentials::<LoginArgs>(args.cred.as_deref())?,
    });
    Ok(Outgoing { message: ClientMessage::new(request), on_ack: Some(AckAction::SaveCookie) })
}

fn leave(args: LeaveArgs, id: &str, defaults: &SessionDefaults) -> Outgoing {
    let request = Request::Leave(Leave {
        id: id.to_string(),
        topic: defaults.topic_or(args.topic_flag.or(args.topic)),
        unsub: args.unsub,
    });
    Outgoing { message: ClientMessage::on_behalf_of(request, defaults.acting_user()), on_ack: None }
}

fn publish(args: PubArgs, id: &str, defaults: &SessionDefaults) -> Result<Outgoing, clap::Error> {
    let mut positional = args.positional.into_iter();
    let (topic, content) = match args.content_flag {
        Some(content) => (positional.next(), Some(content)),
        None => match (positional.next(), positional.next()) {
            (Some(topic), Some(content)) => (Some(topic), Some(content)),
            (content, None) => (None, content),
            (None, Some(_)) => (None, None),
        },
    };

    let request = Request::Publish(Publish {
        id: id.to_string(),
        topic: defaults.topic_or(args.topic_flag.or(topic)),
        no_echo: true,
        content: content.map(|c| encode::<PubArgs, _>(&c)).transpose()?,
    });
    Ok(Outgoing { message: ClientMessage::on_behalf_of(request, defaults.acting_user()), on_ack: None })
}

fn get(args: GetArgs, id: &str, defaults: &SessionDefaults) -> Outgoing {
    let what: Vec<&str> = [(args.desc, "desc"), (args.sub, "sub"), (args.tags, "tags"), (args.data, "data")]
        .into_iter()
        .filter_map(|(wanted, name)| wanted.then_some(name))
        .collect();

    let request = Request::Get(Get {
        id: id.to_string(),
        topic: defaults.topic_or(args.topic_flag.or(args.topic)),
        query: GetQuery { what: what.join(" ") },
    });
    Outgoing { message: ClientMessage::on_behalf_of(request, defaults.acting_user()), on_ack: None }
}

fn delete(args: DelArgs, id: &str, defaults: &SessionDefaults) -> Result<Outgoing, clap::Error> {
    let mut positional = args.positional;
    let what = positional.pop().unwrap_or_default();
    let what = DelTarget::from_str(&what, false).map_err(|_| {
        DelArgs::command().error(
            ErrorKind::InvalidValue,
            format!("invalid value '{what}' for what to delete [possible values: msg, sub, topic]"),
        )
    })?;
    let topic = defaults.topic_or(args.topic_flag.or(positional.pop()));

    let (what, ranges, user) = match what {
        DelTarget::Msg => (DeleteWhat::Messages, parse_ranges(args.list.as_deref())?, None),
        DelTarget::Sub => (DeleteWhat::Subscription, Vec::new(), args.user),
        DelTarget::Topic => (DeleteWhat::Topic, Vec::new(), None),
    };

    let request =
        Request::Delete(Delete { id: id.to_string(), topic, what, ranges, user, hard: args.hard });
    Ok(Outgoing { message: ClientMessage::on_behalf_of(request, defaults.acting_user()), on_ack: None })
}

fn note(args: NoteArgs, id: &str, defaults: &SessionDefaults) -> Result<Outgoing, clap::Error> {
    let (what, seq) = match args.what {
        NoteKind::Kp => (NoteWhat::Kp, None),
        NoteKind::Read | NoteKind::Recv => {
            let seq = args.seq.ok_or_else(|| {
                NoteArgs::command()
                    .error(ErrorKind::MissingRequiredArgument, "--seq is required for read and recv")
            })?;
            let what = if args.what == NoteKind::Read { NoteWhat::Read } else { NoteWhat::Recv };
            (what, Some(seq))
        },
    };

    let request = Request::Note(Note {
        id: id.to_string(),
        topic: defaults.topic_or(Some(args.topic)),
        what,
        seq,
    });
    Ok(Outgoing { message: ClientMessage::on_behalf_of(request, defaults.acting_user()), on_ack: None })
}

/// `uname:password` with a missing password treated as empty.
fn basic_secret(uname: &str, password: Option<&str>) -> Vec<u8> {
    format!("{uname}:{}", password.unwrap_or_default()).into_bytes()
}

fn default_acs(auth: Option<String>, anon: Option<String>) -> Option<DefaultAcsMode> {
    (auth.is_some() || anon.is_some()).then_some(DefaultAcsMode { auth, anon })
}

fn split_list(list: Option<&str>) -> Vec<String> {
    list.map(|l| l.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn parse_credentials<A: CommandFactory>(list: Option<&str>) -> Result<Vec<Credential>, clap::Error> {
    split_list(list)
        .into_iter()
        .map(|item| match item.split_once(':') {
            Some((method, value)) => {
                Ok(Credential { method: method.to_string(), value: value.to_string() })
            },
            None => Err(invalid::<A>(format!("credential '{item}' is not in method:value format"))),
        })
        .collect()
}

fn parse_ranges(list: Option<&str>) -> Result<Vec<SeqRange>, clap::Error> {
    match list.map(str::trim) {
        None => Ok(Vec::new()),
        Some("all") => Ok(vec![SeqRange::all()]),
        Some(list) => split_list(Some(list))
            .iter()
            .map(|item| {
                item.parse::<u64>()
                    .map(SeqRange::single)
                    .map_err(|_| invalid::<DelArgs>(format!("message id '{item}' is not a number")))
            })
            .collect(),
    }
}

fn encode<A: CommandFactory, T: Serialize + ?Sized>(value: &T) -> Result<Blob, clap::Error> {
    Blob::encode(value).map_err(|e| invalid::<A>(e))
}

fn invalid<A: CommandFactory>(message: impl Display) -> clap::Error {
    A::command().error(ErrorKind::ValueValidation, message)
}
