//! vesicle-find: segment every new micrograph and measure its masks.
//!
//! ```text
//! vesicle-find [--force] <PARAMETERS>
//! ```

use std::process::ExitCode;

use clap::Parser;
use vesicle_cli::Common;
use vesicle_io::StageReport;

/// Find vesicle masks in motion-corrected micrographs.
///
/// Writes `<output>/masks/<mic>_mask.json` for every micrograph in which
/// the segmentation backend found at least one mask.
#[derive(Parser)]
#[command(name = "vesicle-find", version)]
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
    Ok(vesicle_io::run_find(&config, &cli.common.run_options())?)
}
