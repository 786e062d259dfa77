//! guestbook - append-and-read list service over a primary/replica store
//!
//! Routes:
//! - GET /lrange/{key}         read a list from the replica
//! - GET /rpush/{key}/{value}  append on the primary, then read back
//! - GET /info                 raw store status from the primary
//! - GET /env                  process environment as JSON
//! - anything else             static files from --public

use anyhow::Result;
use clap::Parser;

mod serve;
mod tracing_setup;

use serve::ServeArgs;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "guestbook",
    author,
    version,
    about = "Guestbook HTTP service backed by a Redis-protocol primary/replica pair"
)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env before clap reads the environment.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig {
        debug: cli.serve.debug,
        trace_key: cli.serve.trace_key.clone(),
    })?;

    let result = serve::run_serve(cli.serve).await;
    tracing_setup::shutdown_otel();
    result
}
