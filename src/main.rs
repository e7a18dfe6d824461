use anyhow::Result;
use clap::Parser;
use fm::cli::Cli;
use fm::output::{self, Verbosity};
use std::process;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "fm=debug" } else { "fm=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    output::set_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose));
    init_tracing(cli.verbose);

    fm::commands::dispatch(cli.command)
}

fn main() {
    if let Err(e) = run() {
        output::error(&format!("{e:#}"));
        process::exit(1);
    }
}
