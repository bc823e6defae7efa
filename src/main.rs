//! Hono OpenAPI Generator - Command-line tool for generating OpenAPI documentation.
//!
//! Analyzes TypeScript sources written against the Hono router and writes an OpenAPI 3.0
//! document describing their routes, parameters, request bodies and responses.
//!
//! # Usage
//!
//! ```bash
//! hono-openapi-from-source [OPTIONS] <PATTERN>...
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! hono-openapi-from-source "src/**/*.ts" -o openapi.yaml
//! ```
//!
//! Folder-based routes as JSON:
//! ```bash
//! hono-openapi-from-source src/routes --autorouter src/routes -f json -o openapi.json
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! hono-openapi-from-source src -v
//! ```

use anyhow::Result;
use clap::Parser;
use hono_openapi_from_source::cli;
use log::info;

fn main() -> Result<()> {
    // Parse once to read the verbose flag before the logger exists, validate afterwards
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Hono OpenAPI Generator starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
