//! vesicle-picks: RELION manual-pick coordinate files from filtered masks.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use vesicle_cli::Common;
use vesicle_io::StageReport;
use vesicle_pipeline::PickMode;

/// Generate particle picks along vesicle membranes or across their
/// projected surface.
#[derive(Parser)]
#[command(name = "vesicle-picks", version)]
struct Cli {
    #[command(flatten)]
    common: Common,

    /// Where on each vesicle to place picks.
    #[arg(long, value_enum, default_value_t = Mode::Edge)]
    mode: Mode,
}

/// Pick placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Along the membrane contour.
    Edge,
    /// On a square lattice inside the mask.
    Surface,
}

impl From<Mode> for PickMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Edge => Self::Edge,
            Mode::Surface => Self::Surface,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    vesicle_cli::init_logging();
    vesicle_cli::finish(run(&cli))
}

fn run(cli: &Cli) -> anyhow::Result<StageReport> {
    let config = cli.common.load()?;
    Ok(vesicle_io::run_picks(
        &config,
        cli.mode.into(),
        &cli.common.run_options(),
    )?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn edge_is_the_default() {
        let cli = Cli::try_parse_from(["vesicle-picks", "job.ini"]).unwrap();
        assert_eq!(PickMode::from(cli.mode), PickMode::Edge);
    }

    #[test]
    fn surface_mode() {
        let cli = Cli::try_parse_from(["vesicle-picks", "job.ini", "--mode", "surface"]).unwrap();
        assert_eq!(PickMode::from(cli.mode), PickMode::Surface);
        assert!(Cli::try_parse_from(["vesicle-picks", "job.ini", "--mode", "inside"]).is_err());
    }
}
