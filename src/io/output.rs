//! Output formatting and logging utilities

use color_eyre::eyre::Result;
use cuc_scf::{DensityOfStates, SweepPoint};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::time::SystemTime as StdSystemTime;
use tracing::info;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

/// Custom time formatter that shows only seconds
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = StdSystemTime::now();
        let duration = now
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        let total_seconds = duration.as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Setup output logging to file or stdout
pub fn setup_output(output_path: Option<&String>) {
    match output_path {
        Some(path) => match File::create(path) {
            Ok(log) => {
                let file_layer = layer()
                    .with_writer(log)
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false);
                Registry::default().with(file_layer).init();
                info!("Output will be written to: {}", path);
            }
            Err(e) => eprintln!("Could not create output file {}: {}", path, e),
        },
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(SecondPrecisionTimer)
                .with_ansi(true);
            Registry::default().with(stdout_layer).init();
            info!("Output will be printed to stdout");
        }
    }
}

/// Two-column `energy  dos` table
pub fn write_dos_table<W: Write>(writer: &mut W, dos: &DensityOfStates) -> Result<()> {
    writeln!(writer, "# sigma = {:.4} eV", dos.sigma)?;
    writeln!(writer, "# energy (eV)      DOS (states/eV)")?;
    for (e, v) in dos.energies.iter().zip(&dos.values) {
        writeln!(writer, "{:>14.6} {:>16.8}", e, v)?;
    }
    Ok(())
}

pub fn write_sweep_table<W: Write>(writer: &mut W, points: &[SweepPoint]) -> Result<()> {
    writeln!(
        writer,
        "# height (A)   status                 iter   E_F (eV)    DOS(E_F)    interface   conductivity"
    )?;
    for p in points {
        writeln!(
            writer,
            "{:>12.4}   {:<22} {:>4} {:>10.5} {:>11.5} {:>11.5} {:>14.6}",
            p.copper_height,
            format!("{:?}", p.status),
            p.iterations,
            p.fermi_energy,
            p.dos_at_fermi,
            p.interface_quality,
            p.conductivity
        )?;
    }
    Ok(())
}
