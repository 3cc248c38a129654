mod api;
mod config;
mod metadata_client;
mod openapi;
mod song_db;
mod startup;
mod state;
mod verses;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "song-catalog-server", version = api::health::VERSION)]
pub(crate) struct Args {
    /// HTTP bind address, e.g. 0.0.0.0:8081 (overrides --port)
    #[arg(long, env = "BIND")]
    bind: Option<SocketAddr>,

    /// HTTP port when no bind address is given (default 8081)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// SQLite database file (default songs.sqlite)
    #[arg(long, env = "DB_PATH")]
    db_path: Option<PathBuf>,

    /// Base URL of the song metadata provider (default http://localhost:8081)
    #[arg(long, env = "API_BASE_URL")]
    api_base_url: Option<String>,

    /// Optional server config file (TOML)
    #[arg(long, env = "SONG_CATALOG_CONFIG")]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,actix_web=info,song_catalog_server=info")
        }))
        .init();

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "ignoring unreadable .env file"),
    }

    startup::run(args).await
}
