//! # readygate
//!
//! Replays engine startup scenarios against a readiness gate.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 apps/readygate (THE BINARY)              │
//! │                                                          │
//! │  ┌─────────────┐    ┌──────────────┐    ┌────────────┐   │
//! │  │   CLI       │───▶│  Scenario    │───▶│  Engine    │   │
//! │  │  (clap)     │    │  runner      │    │  bridge    │   │
//! │  └─────────────┘    └──────┬───────┘    └────────────┘   │
//! │                            ▼                             │
//! │                   ┌─────────────────┐                    │
//! │                   │ readygate-core  │                    │
//! │                   │  (THE LOGIC)    │                    │
//! │                   └─────────────────┘                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! readygate run -f demos/startup.toml
//! readygate check -f demos/startup.toml
//! readygate states --json-mode
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // READYGATE_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("READYGATE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose {
        "readygate=debug,readygate_core=debug"
    } else {
        "readygate=info,readygate_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  readygate v{}
  deferred calls, released in order
"#,
        env!("CARGO_PKG_VERSION")
    );
}
