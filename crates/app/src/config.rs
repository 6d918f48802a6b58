//! Command-line and environment configuration for the `placement` binary.

use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

pub const DB_URL_ENV: &str = "PLACEMENT_DB_URL";
pub const HOST_ENV: &str = "PLACEMENT_HOST";
pub const PORT_ENV: &str = "PLACEMENT_PORT";

pub const DEFAULT_DB_URL: &str = "sqlite://placement.sqlite3";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("{flag} requires a value")]
    MissingValue { flag: &'static str },
    #[error("unknown argument: {0}")]
    UnknownArg(String),
    #[error("unknown subcommand: {0}")]
    UnknownCommand(String),
    #[error("invalid database url: {raw}")]
    InvalidDbUrl { raw: String },
    #[error("invalid host: {raw}")]
    InvalidHost { raw: String },
    #[error("invalid port: {raw}")]
    InvalidPort { raw: String },
}

/// Options for `placement serve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeArgs {
    pub db_url: String,
    pub host: IpAddr,
    pub port: u16,
}

/// Options for `placement seed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedArgs {
    pub db_url: String,
    /// JSON blueprint draft; the bundled sample is used when absent.
    pub file: Option<PathBuf>,
    pub activate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve(ServeArgs),
    Seed(SeedArgs),
    Help,
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_db_url(raw: String) -> Result<String, ArgsError> {
    if raw.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw });
    }
    Ok(normalize_sqlite_url(raw))
}

fn parse_host(raw: String) -> Result<IpAddr, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidHost { raw })
}

fn parse_port(raw: String) -> Result<u16, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidPort { raw })
}

/// Parse argv (without the program name). `env` looks up environment
/// variables; flags win over the environment, which wins over defaults.
///
/// # Errors
///
/// Returns `ArgsError` for unknown arguments or invalid values.
pub fn parse_command(
    argv: Vec<String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Command, ArgsError> {
    let mut args = argv.into_iter().peekable();

    let sub = match args.peek().map(String::as_str) {
        None => "serve".to_owned(),
        Some(first) if first.starts_with("--") => "serve".to_owned(),
        Some(_) => args.next().unwrap_or_default(),
    };

    match sub.as_str() {
        "serve" => parse_serve(&mut args, &env),
        "seed" => parse_seed(&mut args, &env),
        "help" | "-h" => Ok(Command::Help),
        other => Err(ArgsError::UnknownCommand(other.to_owned())),
    }
}

fn env_db_url(env: &impl Fn(&str) -> Option<String>) -> Result<String, ArgsError> {
    env(DB_URL_ENV).map_or_else(|| Ok(DEFAULT_DB_URL.to_owned()), parse_db_url)
}

fn parse_serve(
    args: &mut impl Iterator<Item = String>,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<Command, ArgsError> {
    let mut db_url = env_db_url(env)?;
    let mut host = parse_host(env(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_owned()))?;
    let mut port = env(PORT_ENV).map_or(Ok(DEFAULT_PORT), parse_port)?;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db_url = parse_db_url(require_value(args, "--db")?)?,
            "--host" => host = parse_host(require_value(args, "--host")?)?,
            "--port" => port = parse_port(require_value(args, "--port")?)?,
            "--help" | "-h" => return Ok(Command::Help),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }

    Ok(Command::Serve(ServeArgs { db_url, host, port }))
}

fn parse_seed(
    args: &mut impl Iterator<Item = String>,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<Command, ArgsError> {
    let mut db_url = env_db_url(env)?;
    let mut file = None;
    let mut activate = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db_url = parse_db_url(require_value(args, "--db")?)?,
            "--file" => file = Some(PathBuf::from(require_value(args, "--file")?)),
            "--activate" => activate = true,
            "--help" | "-h" => return Ok(Command::Help),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }

    Ok(Command::Seed(SeedArgs {
        db_url,
        file,
        activate,
    }))
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  placement serve [--db <sqlite_url>] [--host <ip>] [--port <port>]");
    eprintln!("  placement seed  [--db <sqlite_url>] [--file <blueprint.json>] [--activate]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --host {DEFAULT_HOST}");
    eprintln!("  --port {DEFAULT_PORT}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {DB_URL_ENV}, {HOST_ENV}, {PORT_ENV}, RUST_LOG");
}

/// Turn bare paths and `sqlite:` URLs into absolute `sqlite://` URLs.
/// In-memory and already-absolute URLs pass through.
pub fn normalize_sqlite_url(raw: String) -> String {
    if raw.starts_with("sqlite::memory:") || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}
