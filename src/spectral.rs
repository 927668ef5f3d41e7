//! Spectral occupation filter
//!
//! Diagonalises the Hamiltonian, weights each eigenstate with its
//! Fermi–Dirac occupation and assembles the density matrix
//! `P = V · diag(f(E)) · Vᵀ`.

use crate::error::{Result, ScfError};
use nalgebra::{DMatrix, DVector};
use std::cmp::Ordering;

/// Tolerance handed to the symmetric eigensolver.
const EIGEN_EPS: f64 = 1e-12;
/// Iteration cap for the symmetric eigensolver; `0` would mean unbounded.
const EIGEN_MAX_ITER: usize = 10_000;

/// Fermi–Dirac occupation `1 / (1 + exp(beta * (e - mu)))`.
pub fn fermi_dirac(energy: f64, beta: f64, mu: f64) -> f64 {
    1.0 / (1.0 + (beta * (energy - mu)).exp())
}

/// Eigen-decomposition of a real symmetric matrix with ascending eigenvalues.
#[derive(Debug, Clone)]
pub struct SpectralDecomposition {
    pub eigenvalues: DVector<f64>,
    /// Orthonormal eigenvectors stored column-wise, in eigenvalue order.
    pub eigenvectors: DMatrix<f64>,
}

impl SpectralDecomposition {
    pub fn new(h: &DMatrix<f64>) -> Result<Self> {
        if !h.is_square() {
            return Err(ScfError::numerical(format!(
                "Hamiltonian must be square, got {}x{}",
                h.nrows(),
                h.ncols()
            )));
        }
        if h.iter().any(|x| !x.is_finite()) {
            return Err(ScfError::numerical("Hamiltonian contains NaN or Inf"));
        }

        let eig = h
            .clone()
            .try_symmetric_eigen(EIGEN_EPS, EIGEN_MAX_ITER)
            .ok_or_else(|| {
                ScfError::numerical("Symmetric eigendecomposition did not converge")
            })?;

        let mut indices: Vec<usize> = (0..eig.eigenvalues.len()).collect();
        indices.sort_by(|&a, &b| {
            eig.eigenvalues[a]
                .partial_cmp(&eig.eigenvalues[b])
                .unwrap_or(Ordering::Equal)
        });
        let eigenvalues = DVector::from_fn(indices.len(), |i, _| eig.eigenvalues[indices[i]]);
        let eigenvectors = align_eigenvectors(eig.eigenvectors.select_columns(&indices));

        if eigenvalues.iter().any(|x| !x.is_finite())
            || eigenvectors.iter().any(|x| !x.is_finite())
        {
            return Err(ScfError::numerical(
                "Eigendecomposition produced non-finite values",
            ));
        }

        Ok(SpectralDecomposition {
            eigenvalues,
            eigenvectors,
        })
    }

    pub fn occupations(&self, beta: f64, mu: f64) -> DVector<f64> {
        self.eigenvalues.map(|e| fermi_dirac(e, beta, mu))
    }

    /// `V · diag(occ) · Vᵀ`
    pub fn density_matrix(&self, occupations: &DVector<f64>) -> DMatrix<f64> {
        let mut weighted = self.eigenvectors.clone();
        for (j, &f) in occupations.iter().enumerate() {
            weighted.column_mut(j).scale_mut(f);
        }
        &weighted * self.eigenvectors.transpose()
    }
}

/// Output of the filter: spectrum, occupations and the density matrix.
#[derive(Debug, Clone)]
pub struct FilteredState {
    pub spectrum: SpectralDecomposition,
    pub occupations: DVector<f64>,
    pub density_matrix: DMatrix<f64>,
}

impl FilteredState {
    /// Occupied-state count `Σ f(E)`, equal to `tr P`.
    pub fn occupied_states(&self) -> f64 {
        self.occupations.sum()
    }
}

/// Apply the Fermi–Dirac filter to `h`.
pub fn fermi_filter(h: &DMatrix<f64>, beta: f64, mu: f64) -> Result<FilteredState> {
    if !beta.is_finite() || !mu.is_finite() {
        return Err(ScfError::config(format!(
            "beta and mu must be finite (beta = {}, mu = {})",
            beta, mu
        )));
    }
    let spectrum = SpectralDecomposition::new(h)?;
    let occupations = spectrum.occupations(beta, mu);
    let density_matrix = spectrum.density_matrix(&occupations);
    Ok(FilteredState {
        spectrum,
        occupations,
        density_matrix,
    })
}

/// Flip each eigenvector so that its largest-magnitude entry is positive.
pub fn align_eigenvectors(mut eigvecs: DMatrix<f64>) -> DMatrix<f64> {
    for j in 0..eigvecs.ncols() {
        let max_val = eigvecs
            .column(j)
            .iter()
            .copied()
            .max_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(Ordering::Less))
            .unwrap_or(0.0);
        if max_val < 0.0 {
            eigvecs.column_mut(j).neg_mut();
        }
    }
    eigvecs
}
