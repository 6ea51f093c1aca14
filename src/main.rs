use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use strike::notes::NoteStore;
use strike::server::{self, ServerConfig};
use strike::{RenderOptions, DEFAULT_MAX_DEPTH};

/// Serve the notes demo with streaming render and island pushes.
#[derive(Debug, Parser)]
#[command(name = "strike-notes", version)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "STRIKE_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Pause between the flushed HTML shell and the payload push, in
    /// milliseconds. Makes the two phases visible in a browser.
    #[arg(long, env = "STRIKE_FLUSH_DELAY_MS", default_value_t = 0)]
    flush_delay_ms: u64,

    /// Maximum nesting of component expansions per page.
    #[arg(long, env = "STRIKE_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            addr: self.addr,
            render: RenderOptions {
                flush_delay: Duration::from_millis(self.flush_delay_ms),
                max_depth: self.max_depth,
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("strike=info,strike_notes=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Cli::parse().into_config();
    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    let notes = Arc::new(NoteStore::seeded());
    server::serve(listener, notes, config.render)
        .await
        .context("server stopped")
}
