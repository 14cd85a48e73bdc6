//! vesicle-display: three-panel previews of detected and filtered masks.

use std::process::ExitCode;

use clap::Parser;
use vesicle_cli::Common;
use vesicle_io::StageReport;

/// Render previews (micrograph, all masks, filtered masks) for a sample
/// of micrographs.
#[derive(Parser)]
#[command(name = "vesicle-display", version)]
struct Cli {
    #[command(flatten)]
    common: Common,

    /// Number of micrographs to preview; negative previews all of them.
    #[arg(long = "n", default_value_t = 10, allow_negative_numbers = true)]
    count: i64,
}

impl Cli {
    fn limit(&self) -> Option<usize> {
        usize::try_from(self.count).ok()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    vesicle_cli::init_logging();
    vesicle_cli::finish(run(&cli))
}

fn run(cli: &Cli) -> anyhow::Result<StageReport> {
    let config = cli.common.load()?;
    Ok(vesicle_io::run_display(
        &config,
        cli.limit(),
        &cli.common.run_options(),
    )?)
}
