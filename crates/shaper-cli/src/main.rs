//! # Shaper CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Connections per host for 40k requests/s on the public endpoint
//! shaper recommend --rate 40000 --endpoint PUBLIC
//!
//! # Validate a configuration (prints JSON)
//! shaper check --rate 5000 --hosts 2 --connections 2 --json
//!
//! # Replay 500 arrivals, one per millisecond, against 100 requests/s
//! shaper simulate --rate 100 --requests 500 --interval-us 1000
//!
//! # Retry schedule
//! shaper backoff --max-attempts 5 --min-wait-ms 10 --max-wait-ms 200
//! ```

use anyhow::Result;
use shaper_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // JSON output stays clean for piping; logs go to stderr otherwise.
    if !cli.command.wants_json() {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let output = shaper_cli::run(cli.command).await?;
    println!("{}", output);
    Ok(())
}
