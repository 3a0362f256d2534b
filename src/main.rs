use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use std::process::ExitCode;

mod config;
mod decoder;
mod error;
mod io;
mod models;
mod network;
mod normalizer;
mod parsers;
mod pipeline;
mod report;

use crate::config::{Args, ReportFormat};
use crate::error::{AppError, OutputError};
use crate::io::write_output;
use crate::network::{build_client, fetch_body};
use crate::pipeline::{analyze, Options};
use crate::report::{render_json, render_text};


#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let default_filter = if args.verbose {
        concat!(env!("CARGO_CRATE_NAME"), "=debug")
    } else {
        "info"
    };
    env_logger::init_from_env(Env::default().default_filter_or(default_filter));

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(args: &Args) -> Result<(), AppError> {
    let client = build_client(args.fetch_timeout())?;

    info!("Fetching {}", args.url);
    let raw = fetch_body(&client, &args.url, args.fetch_timeout()).await?;

    let options = Options {
        inject_udp: args.inject_udp && !args.count_only,
        scan_only: args.scan_only,
    };
    let analysis = analyze(&raw, &options)?;

    let with_entries = !args.count_only;
    match args.format {
        ReportFormat::Text => print!("{}", render_text(&analysis, with_entries)),
        ReportFormat::Json => {
            let json = render_json(&analysis, with_entries).map_err(OutputError::from)?;
            println!("{}", json);
        }
    }

    if args.count_only {
        return Ok(());
    }

    match &args.output {
        Some(path) => {
            let content = analysis.render_output()?;
            write_output(path, &content).await?;
            info!("Wrote output to {}", path);
        }
        None if args.inject_udp => debug!("no output path given, UDP injection not persisted"),
        None => {}
    }

    Ok(())
}
