//! Electron density extraction from a density matrix

use crate::error::{Result, ScfError};
use crate::hamiltonian::GridLayout;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Statistical model for the density read-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NoiseModel {
    /// Exact diagonal of the density matrix.
    Noiseless,
    /// Shot noise: every site gets `N(0, 1/sqrt(shots)) * |n_i|` added.
    Shots { shots: u64, seed: Option<u64> },
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel::Noiseless
    }
}

impl NoiseModel {
    /// Standard deviation of the relative perturbation, or `None` for the
    /// noiseless model.
    pub fn relative_sigma(&self) -> Option<f64> {
        match self {
            NoiseModel::Noiseless => None,
            NoiseModel::Shots { shots, .. } => Some(1.0 / (*shots as f64).sqrt()),
        }
    }

    /// Independent random source for this model.
    pub fn sampler(&self) -> Result<NoiseSampler> {
        if let NoiseModel::Shots { shots: 0, .. } = self {
            return Err(ScfError::config("Shot count must be positive"));
        }
        let (sigma, seed) = match (*self, self.relative_sigma()) {
            (NoiseModel::Shots { seed, .. }, Some(sigma)) => (sigma, seed),
            _ => return Ok(NoiseSampler { inner: None }),
        };
        let normal = Normal::new(0.0, sigma)
            .map_err(|e| ScfError::config(format!("Invalid noise width: {}", e)))?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(NoiseSampler {
            inner: Some((rng, normal)),
        })
    }

    /// Same model with the seed shifted by `offset`, so independent runs do
    /// not share a random stream.
    pub fn offset_seed(&self, offset: u64) -> Self {
        match *self {
            NoiseModel::Shots {
                shots,
                seed: Some(seed),
            } => NoiseModel::Shots {
                shots,
                seed: Some(seed.wrapping_add(offset)),
            },
            other => other,
        }
    }
}

/// Random state carried across SCF cycles.
pub struct NoiseSampler {
    inner: Option<(StdRng, Normal<f64>)>,
}

impl NoiseSampler {
    fn perturb(&mut self, density: &mut DVector<f64>) {
        if let Some((rng, normal)) = self.inner.as_mut() {
            for n in density.iter_mut() {
                let scale = n.abs();
                *n += normal.sample(rng) * scale;
            }
        }
    }
}

/// Extract the per-site density from `density_matrix`.
///
/// Takes the diagonal, perturbs it through `sampler`, clamps it to be
/// non-negative and rescales it so that it sums to `total_electrons`.
pub fn extract_density(
    density_matrix: &DMatrix<f64>,
    total_electrons: f64,
    sampler: &mut NoiseSampler,
) -> Result<DVector<f64>> {
    if !density_matrix.is_square() {
        return Err(ScfError::numerical("Density matrix must be square"));
    }
    let mut density: DVector<f64> = density_matrix.diagonal();
    sampler.perturb(&mut density);
    density.apply(|n| *n = n.max(0.0));
    renormalize(density, total_electrons)
}

/// Rescale `density` so that it sums to `total_electrons`.
pub fn renormalize(mut density: DVector<f64>, total_electrons: f64) -> Result<DVector<f64>> {
    if density.iter().any(|x| !x.is_finite()) {
        return Err(ScfError::numerical("Density contains NaN or Inf"));
    }
    let sum = density.sum();
    if sum <= 0.0 {
        return Err(ScfError::numerical(format!(
            "Cannot renormalise a density with sum {}",
            sum
        )));
    }
    density *= total_electrons / sum;
    if density.iter().any(|x| !x.is_finite()) {
        return Err(ScfError::numerical(
            "Density renormalisation produced non-finite values",
        ));
    }
    Ok(density)
}

/// Uniform starting density spread over all grid points.
pub fn uniform_density(grid_size: usize, total_electrons: f64) -> DVector<f64> {
    DVector::from_element(grid_size, total_electrons / grid_size as f64)
}

/// Sum the grid density over each atom's block.
pub fn per_atom_density(density: &DVector<f64>, layout: &GridLayout) -> Vec<f64> {
    (0..layout.n_atoms)
        .map(|k| layout.block(k).map(|g| density[g]).sum())
        .collect()
}
