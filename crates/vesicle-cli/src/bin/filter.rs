//! vesicle-filter: keep the masks that satisfy the `[filtering]` bounds.

use std::process::ExitCode;

use clap::Parser;
use vesicle_cli::Common;
use vesicle_io::StageReport;

/// Filter detected vesicle masks by their measured statistics.
#[derive(Parser)]
#[command(name = "vesicle-filter", version)]
struct Cli {
    #[command(flatten)]
    common: Common,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    vesicle_cli::init_logging();
    vesicle_cli::finish(run(&cli))
}

fn run(cli: &Cli) -> anyhow::Result<StageReport> {
    let config = cli.common.load()?;
    Ok(vesicle_io::run_filter(&config, &cli.common.run_options())?)
}
