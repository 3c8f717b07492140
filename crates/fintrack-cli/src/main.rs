//! fintrack - command-line front end for the finance tracker gateway.
//!
//! Logs in against the backend, keeps the sealed session in the cache
//! directory, and forwards resource requests through the authenticated
//! gateway, refreshing tokens as needed.

mod commands;
mod session_file;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use fintrack_core::{Config, RequestOptions};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Cli;

const USAGE: &str = "\
Usage: fintrack <command> [args]

Commands:
  login [username] [--remember]   Sign in (optionally keep the password in the OS keychain)
  logout [--forget]               Sign out and revoke the session
  status                          Show the current session
  get <path>                      GET a backend resource, e.g. `get transactions`
  post <path> <json>              POST a JSON body to a backend resource
  delete <path>                   DELETE a backend resource, e.g. `delete transactions/42`
  transactions                    List transactions
  accounts                        List accounts
";

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "fintrack.log";

/// Daily rolling log file in `dir`, creating the directory first.
fn file_appender(dir: &Path) -> io::Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
        .map_err(io::Error::other)
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and, when `log_dir` is usable, to a daily rolling
/// file. The file writer is non-blocking; the returned guard flushes it on
/// drop.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard, file_error) = match log_dir.map(file_appender) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard), None)
        }
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    if let Some(e) = file_error {
        warn!(error = %e, "File logging disabled");
    }

    guard
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprint!("{}", USAGE);
        return Ok(ExitCode::FAILURE);
    };
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load()?;
    let log_dir = config.cache_dir().ok();
    let _guard = init_tracing(log_dir.as_deref());

    let flag = |name: &str| args.iter().any(|a| a == name);
    let positional: Vec<&str> = args[1..]
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .collect();

    info!(command = %command, "fintrack starting");
    let mut cli = Cli::new(config)?;

    match (command.as_str(), positional.as_slice()) {
        ("login", rest) => {
            let username = rest.first().map(|s| s.to_string());
            cli.login(username, flag("--remember")).await
        }
        ("logout", []) => cli.logout(flag("--forget")).await,
        ("status", []) => cli.status().await,
        ("get", [path]) => cli.proxy(path, RequestOptions::get()).await,
        ("post", [path, body]) => {
            let body = commands::parse_body(body)?;
            cli.proxy(path, RequestOptions::post(body)).await
        }
        ("delete", [path]) => cli.proxy(path, RequestOptions::delete()).await,
        ("transactions", []) => cli.transactions().await,
        ("accounts", []) => cli.accounts().await,
        _ => {
            eprint!("{}", USAGE);
            Ok(ExitCode::FAILURE)
        }
    }
}
