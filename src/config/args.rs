//! Command-line argument parsing for tight-binding SCF runs

use clap::Parser;

/// Copper–carbon cluster tight-binding SCF with YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file (defaults are used when absent)
    #[arg(short, long)]
    pub config_file: Option<String>,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override grid size (power of two)
    #[arg(long)]
    pub grid_size: Option<usize>,

    /// Override Fermi sharpness beta
    #[arg(long)]
    pub beta: Option<f64>,

    /// Override chemical potential
    #[arg(long)]
    pub mu: Option<f64>,

    /// Override convergence threshold
    #[arg(long)]
    pub convergence_threshold: Option<f64>,

    /// Override maximum SCF cycles
    #[arg(long)]
    pub max_cycle: Option<usize>,

    /// Override density mixing parameter
    #[arg(long)]
    pub density_mixing: Option<f64>,

    /// Simulate shot noise with this many shots
    #[arg(long)]
    pub shots: Option<u64>,

    /// Seed of the shot-noise generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override DOS broadening (eV)
    #[arg(long)]
    pub dos_sigma: Option<f64>,

    /// Override copper height above the carbon ring (Å)
    #[arg(long)]
    pub copper_height: Option<f64>,

    /// Run the copper-height sweep
    #[arg(long)]
    pub sweep: bool,
}
