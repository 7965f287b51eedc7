//! Startup flags.

use std::{fmt, path::PathBuf, time::Duration};

use clap::{ArgGroup, Parser};
use tinode_client::{
    ClientConfig, CookieStore, Credentials, DEFAULT_COOKIE_PATH, EngineConfig,
    config::{DEFAULT_API_KEY, DEFAULT_CLOSE_TIMEOUT, DEFAULT_HOST},
};

/// Tinode command line client
#[derive(Parser, Debug)]
#[command(name = "tinode-cli")]
#[command(about = "Interactive command line client for Tinode servers")]
#[command(version)]
#[command(group(ArgGroup::new("login").args(["login_basic", "login_token", "login_cookie"])))]
pub struct Args {
    /// Address of Tinode server
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// API key sent when connecting
    #[arg(long, default_value = DEFAULT_API_KEY)]
    pub api_key: String,

    /// Connect over TLS (wss://)
    #[arg(long)]
    pub secure: bool,

    /// Login using basic authentication username:password
    #[arg(long, value_name = "USER:PASSWORD")]
    pub login_basic: Option<String>,

    /// Login using token authentication
    #[arg(long, value_name = "TOKEN")]
    pub login_token: Option<String>,

    /// Read token from cookie file and use it for authentication
    #[arg(long)]
    pub login_cookie: bool,

    /// Do not login even if cookie file is present
    #[arg(long)]
    pub no_login: bool,

    /// Where the authentication cookie is kept
    #[arg(long, default_value = DEFAULT_COOKIE_PATH)]
    pub cookie_file: PathBuf,

    /// Seconds to wait for the server to finish closing
    #[arg(long, default_value_t = DEFAULT_CLOSE_TIMEOUT.as_secs())]
    pub close_timeout: u64,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Where startup credentials came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginSource {
    /// `--login-token`
    Token,
    /// `--login-basic`
    Basic,
    /// Cookie file
    Cookie,
}

impl fmt::Display for LoginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => f.write_str("token"),
            Self::Basic => f.write_str("login:password"),
            Self::Cookie => f.write_str("cookie file"),
        }
    }
}

/// Credentials to log in with at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupLogin {
    /// Credentials sent in `{login}`.
    pub credentials: Credentials,
    /// Where they came from.
    pub source: LoginSource,
}

impl Args {
    /// Connection and session settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            api_key: self.api_key.clone(),
            secure: self.secure,
            cookie_path: self.cookie_file.clone(),
            close_timeout: Duration::from_secs(self.close_timeout),
            engine: EngineConfig::default(),
        }
    }

    /// Pick startup credentials: none with `--no-login`, else the token,
    /// else `user:password`, else the cookie file's token when readable.
    pub fn startup_login(&self, cookies: &CookieStore) -> Option<StartupLogin> {
        if self.no_login {
            return None;
        }

        if let Some(token) = &self.login_token {
            return Some(StartupLogin { credentials: Credentials::token(token), source: LoginSource::Token });
        }
        if let Some(user_password) = &self.login_basic {
            return Some(StartupLogin {
                credentials: Credentials::basic(user_password),
                source: LoginSource::Basic,
            });
        }

        cookies
            .load()
            .map(|token| StartupLogin { credentials: Credentials::token(&token), source: LoginSource::Cookie })
    }
}
