use clap::Parser;
use realstack::devtools::prepush::{default_stages, run_stages, SystemRunner};
use realstack::infra::logging::{init_logging, LoggingConfig};
use std::path::PathBuf;

/// Runs lint, type-check, test and security-audit before a push.
///
/// Exits 0 only when every blocking stage passes. The audit is informational.
#[derive(Parser, Debug)]
#[command(name = "prepush", version)]
struct Args {
    /// Directory to run the checks in (defaults to the current directory).
    #[arg(long)]
    workdir: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    init_logging(LoggingConfig::default());

    let runner = SystemRunner {
        workdir: args.workdir,
    };
    let summary = run_stages(&runner, &default_stages());
    println!("{}", summary.render());
    std::process::exit(summary.exit_code());
}
