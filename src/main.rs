use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spx_fp::{choose_by_signing_cap, choose_by_size_target, report, sweep, Params};

#[derive(Parser, Debug)]
#[command(name = "spx-fp", about = "SPX/FP cost & m_max tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// SPX parameter flags shared by every subcommand.
#[derive(Args, Debug)]
struct ParamArgs {
    /// Hash output length in bytes.
    #[arg(long)]
    n: u32,
    /// Winternitz parameter (power of two).
    #[arg(long)]
    w: u32,
    /// Total hypertree height.
    #[arg(long)]
    h: u32,
    /// Number of hypertree layers.
    #[arg(long)]
    d: u32,
    /// Leaf slots per few-time tree.
    #[arg(long)]
    t: u64,
    /// Leaves selected per signature.
    #[arg(long)]
    k: u64,
    /// Signing-query bound for the security estimate.
    #[arg(long)]
    q: u64,
    /// Write the JSON result to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ParamArgs {
    fn params(&self) -> Params {
        Params {
            n: self.n,
            w: self.w,
            h: self.h,
            d: self.d,
            t: self.t,
            k: self.k,
            q: self.q,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute metrics for a specific m_max.
    Report {
        #[command(flatten)]
        params: ParamArgs,
        /// Threshold on the singles statistic.
        #[arg(long = "m-max")]
        m_max: u32,
    },
    /// List metrics for every supported m_max.
    Sweep {
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Pick m_max by a signing-cost increase cap (percent).
    ChooseSign {
        #[command(flatten)]
        params: ParamArgs,
        /// Largest acceptable signing-cost increase, percent.
        #[arg(long)]
        cap: f64,
    },
    /// Pick m_max by a signature-size decrease target (percent).
    ChooseSize {
        #[command(flatten)]
        params: ParamArgs,
        /// Desired size decrease versus the baseline, percent.
        #[arg(long)]
        target: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Report { params, m_max } => {
            let p = params.params();
            info!(m_max, "building one-shot report");
            emit(&report(&p, m_max)?, params.output.as_deref())
        }
        Commands::Sweep { params } => {
            let p = params.params();
            info!("sweeping all thresholds");
            emit(&sweep(&p)?, params.output.as_deref())
        }
        Commands::ChooseSign { params, cap } => {
            let p = params.params();
            info!(cap, "selecting threshold by signing cap");
            emit(&choose_by_signing_cap(&p, cap)?, params.output.as_deref())
        }
        Commands::ChooseSize { params, target } => {
            let p = params.params();
            info!(target, "selecting threshold by size target");
            emit(&choose_by_size_target(&p, target)?, params.output.as_deref())
        }
    }
}

fn emit<T: Serialize>(result: &T, output: Option<&std::path::Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("failed to serialize result")?;
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
