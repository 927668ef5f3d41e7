use cuc_scf::{ElectronicProperties, Result, ScfResult, ScfStatus, SweepPoint, TightBindingScf};
use tracing::{info, warn};

pub fn report_scf_summary(engine: &TightBindingScf, result: &ScfResult) {
    match result.status {
        ScfStatus::Converged => info!("\nSCF converged after {} cycles.", result.iterations),
        _ => warn!(
            "\nSCF not converged after {} cycles (last |dn| = {:.3e}); reporting best-effort result.",
            result.iterations,
            result.final_residual().unwrap_or(f64::NAN)
        ),
    }

    info!("\nFinal Energy Levels:");
    for (i, (energy, occ)) in result
        .eigenvalues
        .iter()
        .zip(result.occupations.iter())
        .enumerate()
    {
        info!("  Level {:>2}: {:>12.6} eV   f = {:.6}", i + 1, energy, occ);
    }

    info!("\nElectron density per atom:");
    let atoms = engine.configuration().atoms();
    for (idx, (atom, n)) in atoms.iter().zip(&result.per_atom_density).enumerate() {
        info!(
            "  Atom {:>2} {:>2}: [{:+.4}, {:+.4}, {:+.4}]  n = {:.6}",
            idx + 1,
            atom.species.symbol(),
            atom.position.x,
            atom.position.y,
            atom.position.z,
            n
        );
    }
    let unmapped = engine.layout().unmapped_points();
    if unmapped > 0 {
        let padded: f64 = result.density.iter().skip(result.density.len() - unmapped).sum();
        info!("  Unmapped grid points ({}): n = {:.6}", unmapped, padded);
    }
    info!(
        "Total electrons: {:.6} (expected {})",
        result.density.sum(),
        engine.configuration().total_valence_electrons()
    );
}

pub fn report_properties(props: &ElectronicProperties) {
    let c = &props.conductivity;
    info!("\nElectronic properties:");
    info!("  Fermi energy:          {:.6} eV", c.fermi_energy);
    info!("  DOS at Fermi energy:   {:.6} states/eV", c.dos_at_fermi);
    info!("  Interface quality:     {:.6}", c.interface_quality);
    info!("  Mobility factor:       {:.3}", c.mobility_factor);
    info!("  Conductivity estimate: {:.6}", c.conductivity);
}

/// Log every sweep point and return the successful ones.
pub fn report_sweep(heights: &[f64], results: &[Result<SweepPoint>]) -> Vec<SweepPoint> {
    let mut points = Vec::with_capacity(results.len());
    for (height, result) in heights.iter().zip(results) {
        match result {
            Ok(p) => {
                info!(
                    "  h = {:.4} A: {:?} after {} cycles, conductivity = {:.6}",
                    height, p.status, p.iterations, p.conductivity
                );
                points.push(*p);
            }
            Err(e) => warn!("  h = {:.4} A: failed: {}", height, e),
        }
    }
    points
}
