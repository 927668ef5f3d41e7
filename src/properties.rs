//! Density of states and conductivity estimates
//!
//! Both are computed once from the final SCF state.

use crate::density::per_atom_density;
use crate::error::{Result, ScfError};
use crate::geometry::{AtomicConfiguration, Species};
use crate::hamiltonian::GridLayout;
use nalgebra::DVector;
use serde::Serialize;
use std::f64::consts::PI;

/// Number of points on the DOS energy grid.
pub const DOS_POINTS: usize = 200;
/// Padding added below the lowest and above the highest eigenvalue (eV).
pub const DOS_PADDING: f64 = 1.0;
/// Placeholder carrier mobility.
pub const MOBILITY_FACTOR: f64 = 1.0;

/// Gaussian-broadened density of states.
#[derive(Debug, Clone, Serialize)]
pub struct DensityOfStates {
    pub energies: Vec<f64>,
    pub values: Vec<f64>,
    pub sigma: f64,
}

impl DensityOfStates {
    /// Broaden `eigenvalues` with a Gaussian of width `sigma` on a
    /// [`DOS_POINTS`]-point grid spanning `[min(E) - 1, max(E) + 1]`.
    pub fn compute(eigenvalues: &[f64], sigma: f64) -> Result<Self> {
        if eigenvalues.is_empty() {
            return Err(ScfError::numerical("No eigenvalues to broaden"));
        }
        if !(sigma > 0.0 && sigma.is_finite()) {
            return Err(ScfError::config(format!(
                "DOS broadening must be positive, got {}",
                sigma
            )));
        }
        if eigenvalues.iter().any(|e| !e.is_finite()) {
            return Err(ScfError::numerical("Eigenvalues contain NaN or Inf"));
        }

        let e_min = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min) - DOS_PADDING;
        let e_max = eigenvalues
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
            + DOS_PADDING;
        let step = (e_max - e_min) / (DOS_POINTS - 1) as f64;
        let energies: Vec<f64> = (0..DOS_POINTS).map(|k| e_min + step * k as f64).collect();

        let two_sigma_sq = 2.0 * sigma * sigma;
        let norm = (2.0 * PI * sigma * sigma).sqrt();
        let values: Vec<f64> = energies
            .iter()
            .map(|&e| {
                eigenvalues
                    .iter()
                    .map(|&ei| (-(e - ei).powi(2) / two_sigma_sq).exp())
                    .sum::<f64>()
                    / norm
            })
            .collect();

        if values.iter().any(|v| !v.is_finite()) {
            return Err(ScfError::numerical("DOS contains NaN or Inf"));
        }

        Ok(DensityOfStates {
            energies,
            values,
            sigma,
        })
    }

    /// DOS value at the grid point closest to `energy`.
    pub fn value_near(&self, energy: f64) -> f64 {
        self.energies
            .iter()
            .zip(&self.values)
            .min_by(|(a, _), (b, _)| {
                (*a - energy)
                    .abs()
                    .partial_cmp(&(*b - energy).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(_, &v)| v)
            .unwrap_or(0.0)
    }

    /// Trapezoidal integral over the energy grid.
    pub fn integrate(&self) -> f64 {
        self.energies
            .windows(2)
            .zip(self.values.windows(2))
            .map(|(e, v)| 0.5 * (e[1] - e[0]) * (v[0] + v[1]))
            .sum()
    }
}

/// Conductivity estimate and the quantities it is built from.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConductivityEstimate {
    pub fermi_energy: f64,
    pub dos_at_fermi: f64,
    pub interface_quality: f64,
    pub mobility_factor: f64,
    pub conductivity: f64,
}

/// Eigenvalue at index `len / 2`.
pub fn fermi_energy(eigenvalues: &[f64]) -> Result<f64> {
    eigenvalues
        .get(eigenvalues.len() / 2)
        .copied()
        .ok_or_else(|| ScfError::numerical("Cannot pick a Fermi energy from an empty spectrum"))
}

/// Mean of `(n_C + n_Cu) / 2` over all carbon–copper atom pairs, using the
/// per-atom aggregated density. Zero if either species is absent.
pub fn interface_quality(
    config: &AtomicConfiguration,
    layout: &GridLayout,
    density: &DVector<f64>,
) -> f64 {
    let per_atom = per_atom_density(density, layout);
    let carbon = config.indices_of(Species::Carbon);
    let copper = config.indices_of(Species::Copper);
    if carbon.is_empty() || copper.is_empty() {
        return 0.0;
    }

    let total: f64 = carbon
        .iter()
        .flat_map(|&c| copper.iter().map(move |&u| (c, u)))
        .map(|(c, u)| 0.5 * (per_atom[c] + per_atom[u]))
        .sum();
    total / (carbon.len() * copper.len()) as f64
}

/// `dos(E_F) * interface_quality * mobility`
pub fn estimate_conductivity(
    config: &AtomicConfiguration,
    layout: &GridLayout,
    eigenvalues: &[f64],
    density: &DVector<f64>,
    dos: &DensityOfStates,
) -> Result<ConductivityEstimate> {
    let fermi_energy = fermi_energy(eigenvalues)?;
    let dos_at_fermi = dos.value_near(fermi_energy);
    let interface_quality = interface_quality(config, layout, density);
    let conductivity = dos_at_fermi * interface_quality * MOBILITY_FACTOR;

    if !conductivity.is_finite() {
        return Err(ScfError::numerical(format!(
            "Conductivity is not finite (dos = {}, interface = {})",
            dos_at_fermi, interface_quality
        )));
    }

    Ok(ConductivityEstimate {
        fermi_energy,
        dos_at_fermi,
        interface_quality,
        mobility_factor: MOBILITY_FACTOR,
        conductivity,
    })
}
