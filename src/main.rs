use anyhow::Result;
use clap::Parser;
use devprof::cli::Cli;
use devprof::commands;

fn main() -> Result<()> {
    // stdout carries shell code for `env`; logs go to stderr
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("devprof=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    commands::execute(cli)
}
