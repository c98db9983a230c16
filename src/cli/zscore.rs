use clap::Args;

use crate::cli::OutputFormat;
use crate::scoring::zscore::{zscore, zscore_naive};
use crate::utils::validation::validate_theta;

/// Segments longer than this are not summed directly with `--check`
const NAIVE_LIMIT: u64 = 5_000;

/// Arguments for the zscore command
#[derive(Args)]
pub struct ZscoreArgs {
    /// Length of the first segment
    pub n: u64,

    /// Length of the second segment
    pub m: u64,

    /// Gap between the segments
    pub k: u64,

    /// Per-base decay [0-1)
    pub theta: f64,

    /// Also evaluate the direct double sum
    #[arg(long)]
    pub check: bool,
}

/// Execute the zscore command
///
/// # Errors
///
/// Returns an error if theta is out of range or `--check` is given for
/// segments too long to sum directly.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: ZscoreArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let theta = validate_theta(args.theta)?;
    let value = zscore(args.n, args.m, args.k, theta);
    let naive = if args.check {
        if args.n > NAIVE_LIMIT || args.m > NAIVE_LIMIT {
            anyhow::bail!("--check supports segment lengths up to {NAIVE_LIMIT}");
        }
        Some(zscore_naive(args.n, args.m, args.k, theta))
    } else {
        None
    };

    if verbose {
        eprintln!(
            "zscore(n={}, m={}, k={}, theta={theta})",
            args.n, args.m, args.k
        );
    }

    match format {
        OutputFormat::Text => {
            println!("{value}");
            if let Some(naive) = naive {
                println!("Direct sum: {naive} (difference {:e})", (value - naive).abs());
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "n": args.n,
                "m": args.m,
                "k": args.k,
                "theta": theta,
                "zscore": value,
                "direct_sum": naive,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("n\tm\tk\ttheta\tzscore");
            println!("{}\t{}\t{}\t{theta}\t{value}", args.n, args.m, args.k);
        }
    }
    Ok(())
}
