//! Command line arguments.

use clap::Parser;
use std::path::PathBuf;

/// School snack-ordering API server.
#[derive(Debug, Parser)]
#[command(name = "merenda", version, about)]
pub struct Args {
    /// Path to the TOML config file (default: merenda.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "MERENDA_PORT")]
    pub port: Option<u16>,

    /// Directory for the persisted store (overrides config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Disable route-level role checks (development only)
    #[arg(long)]
    pub auth_bypass: bool,
}
