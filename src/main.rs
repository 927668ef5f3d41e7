//! Tight-binding SCF command-line interface
//!
//! Runs a single copper–carbon cluster calculation, or a copper-height sweep,
//! from a YAML configuration.

use color_eyre::eyre::Result;

mod app;
mod config;
mod io;

use app::ScfApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    ScfApplication::from_cli()?.run()
}
