use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod matching;
mod ordering;
mod parsing;
mod scoring;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("ref_scaffold=debug,info")
    } else {
        EnvFilter::new("ref_scaffold=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Scaffold(args) => {
            cli::scaffold::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Zscore(args) => {
            cli::zscore::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Match(args) => {
            cli::matching::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
