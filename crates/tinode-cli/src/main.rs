//! Tinode CLI entry point.
//!
//! # Usage
//!
//! ```bash
//! # Anonymous session against a local server
//! tinode-cli --no-login
//!
//! # Basic login, logs to a file
//! tinode-cli --host chat.example.com:443 --secure --login-basic alice:alice123 --log-file tn.log
//! ```

use clap::Parser;
use tinode_cli::{Args, logging, runtime};
use tinode_client::CookieStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_logging(&args.log_level, args.log_file.as_deref())?;

    let config = args.client_config();
    let login = args.startup_login(&CookieStore::new(&config.cookie_path));
    tracing::info!(host = %config.host, login = ?login.as_ref().map(|l| l.source), "tinode-cli starting");

    runtime::run(config, login).await?;
    Ok(())
}
