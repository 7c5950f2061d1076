// Copyright 2023 - 2026 The Gauntlet Authors

//! `gauntlet`: thin command-line front door over the engine library.

use std::process::exit;

use anyhow::Result;
use clap::Parser;
use gauntlet::console::Console;
use gauntlet::error::EngineError;
use gauntlet::list::{list_json, list_mutants};
use gauntlet::options::{Args, Config, Options};
use gauntlet::parse::TextFrontend;
use gauntlet::{exit_code, interrupt};
use tracing::error;
use tracing_subscriber::prelude::*;

fn main() {
    let args = Args::parse();
    let _log_guard = init_tracing(&args);
    interrupt::install_handler();
    let console = Console::new();
    match run(&args, &console) {
        Ok(code) => exit(code),
        Err(err) => {
            console.print_error(&format!("{err:#}"));
            error!("{err:#}");
            let code = err
                .downcast_ref::<EngineError>()
                .map_or(exit_code::SOFTWARE, EngineError::exit_code);
            exit(code);
        }
    }
}

fn run(args: &Args, console: &Console) -> Result<i32> {
    let config = Config::read_tree_config(camino::Utf8Path::new("."))?;
    let options = Options::new(args, &config)?;
    let frontend = TextFrontend::new();
    if args.list {
        let listed = list_mutants(&frontend, &options, &args.sources, args.diff)?;
        if args.json {
            println!("{}", list_json(&listed)?);
        } else {
            console.list_mutants(listed.iter().map(|l| (&l.mutant, l.diff.clone())));
        }
        return Ok(exit_code::SUCCESS);
    }
    // Running mutants needs a test-platform adapter for the target
    // language's host; this binary ships only the reference frontend.
    // Embedders drive `gauntlet::Lab` with their own adapter.
    Err(EngineError::ConfigurationInvalid(
        "no test-platform adapter is built into this binary; use --list, \
         or drive gauntlet::Lab from an embedding with an adapter"
            .to_owned(),
    )
    .into())
}

/// Logging: concise human output on stderr controlled by `RUST_LOG`, plus
/// a full debug log in the output directory.
fn init_tracing(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let log_dir = args
        .output
        .clone()
        .unwrap_or_else(|| "gauntlet.out".into());
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let appender = tracing_appender::rolling::never(&log_dir, "gauntlet.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(file_layer)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
        None
    }
}
