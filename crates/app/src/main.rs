mod config;
mod seed;

use std::net::SocketAddr;

use api::{AppState, create_router};
use services::{Clock, PlacementServices};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{Command, SeedArgs, ServeArgs};

const DEFAULT_LOG_FILTER: &str =
    "placement=info,api=info,services=info,storage=info,tower_http=info";

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Create the SQLite file (and its directory) so the pool can open it.
fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url.starts_with("sqlite::memory:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| config::ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(config::ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    prepare_sqlite_file(&args.db_url)?;
    let services = PlacementServices::new_sqlite(&args.db_url, Clock::System).await?;
    let app = create_router(AppState::new(services));

    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, db = %args.db_url, "placement api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn run_seed(args: SeedArgs) -> Result<(), Box<dyn std::error::Error>> {
    let draft = seed::load_draft(args.file.as_deref())?;
    prepare_sqlite_file(&args.db_url)?;
    let services = PlacementServices::new_sqlite(&args.db_url, Clock::System).await?;
    let id = seed::seed(&services, &draft, args.activate).await?;
    println!("{id}");
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let command = config::parse_command(argv, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        config::print_usage();
        e
    })?;

    match command {
        Command::Help => {
            config::print_usage();
            Ok(())
        }
        Command::Serve(args) => run_serve(args).await,
        Command::Seed(args) => run_seed(args).await,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        tracing::error!(error = %err, "placement exited with an error");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
