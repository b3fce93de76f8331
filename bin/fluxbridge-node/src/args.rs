//! Parses command-line arguments for the dev simulator.

use std::path::PathBuf;

use clap::{crate_version, Parser};

#[derive(Debug, Parser)]
#[clap(
    name = "fluxbridge-node",
    about = "Runs a simulated pair of bridged chains in one process",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration for the simulated chain pair",
        default_value = "config.toml"
    )]
    pub config: PathBuf,
}
