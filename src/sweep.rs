//! Copper-height sweeps
//!
//! Every sweep point builds its own [`AtomicConfiguration`] from the base
//! geometry and runs a full, independent SCF, so the points are evaluated in
//! parallel without shared state.

use crate::error::Result;
use crate::geometry::ClusterGeometry;
use crate::scf_impl::{ScfSettings, ScfStatus, TightBindingScf};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SweepPoint {
    pub copper_height: f64,
    pub status: ScfStatus,
    pub iterations: usize,
    pub fermi_energy: f64,
    pub dos_at_fermi: f64,
    pub interface_quality: f64,
    pub conductivity: f64,
}

/// Run one SCF per height. Results come back in input order; a failure at
/// one height does not stop the others.
pub fn run_height_sweep(
    geometry: &ClusterGeometry,
    settings: &ScfSettings,
    heights: &[f64],
) -> Vec<Result<SweepPoint>> {
    info!("Sweeping {} copper heights", heights.len());
    heights
        .par_iter()
        .enumerate()
        .map(|(idx, &height)| {
            let point_settings = ScfSettings {
                noise: settings.noise.offset_seed(idx as u64),
                ..*settings
            };
            evaluate_height(geometry, &point_settings, height)
        })
        .collect()
}

fn evaluate_height(
    geometry: &ClusterGeometry,
    settings: &ScfSettings,
    height: f64,
) -> Result<SweepPoint> {
    let config = geometry.with_copper_height(height).build()?;
    let engine = TightBindingScf::new(config, *settings)?;
    let result = engine.scf_cycle()?;
    let props = engine.properties(&result)?;
    Ok(SweepPoint {
        copper_height: height,
        status: result.status,
        iterations: result.iterations,
        fermi_energy: props.conductivity.fermi_energy,
        dos_at_fermi: props.conductivity.dos_at_fermi,
        interface_quality: props.conductivity.interface_quality,
        conductivity: props.conductivity.conductivity,
    })
}

/// Successful point with the largest conductivity.
pub fn best_point(points: &[Result<SweepPoint>]) -> Option<SweepPoint> {
    points
        .iter()
        .filter_map(|p| p.as_ref().ok())
        .max_by(|a, b| a.conductivity.total_cmp(&b.conductivity))
        .copied()
}

/// `n` evenly spaced heights from `start` to `end` inclusive.
pub fn height_grid(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|k| start + step * k as f64).collect()
        }
    }
}
