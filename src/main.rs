//! API from routes - Command-line tool for generating a typed API client module.
//!
//! This binary walks a file-based route tree, extracts every route's exported
//! `apiDefinition` together with the helpers it needs, and writes one merged
//! module (or a JSON/YAML manifest of the definitions).
//!
//! # Usage
//!
//! ```bash
//! api-from-routes [OPTIONS] [ROUTES_DIR]
//! ```
//!
//! # Examples
//!
//! Generate the client module:
//! ```bash
//! api-from-routes ./routes -o dist/api-definition.js
//! ```
//!
//! Generate a JSON manifest:
//! ```bash
//! api-from-routes ./routes -f json -o api.json
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! api-from-routes ./routes -v
//! ```

use anyhow::Result;
use api_from_routes::cli;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    // Parse once up front so the verbose flag can configure the logger
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    info!("api-from-routes starting...");

    let args = cli::parse_args_from_parsed(args)?;

    cli::run(args)?;

    Ok(())
}
