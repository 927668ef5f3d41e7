//! Tight-binding SCF loop
//!
//! One cycle runs the Hamiltonian builder, the Fermi–Dirac filter and the
//! density extractor, then hands the new density to [`ConvergenceState`],
//! which decides whether to keep iterating. Running out of cycles is a
//! regular outcome ([`ScfStatus::MaxIterationsReached`]), not an error.

use crate::density::{
    extract_density, per_atom_density, uniform_density, NoiseModel, NoiseSampler,
};
use crate::error::{Result, ScfError};
use crate::geometry::AtomicConfiguration;
use crate::hamiltonian::{build_hamiltonian, GridLayout, TightBindingParams};
use crate::properties::{estimate_conductivity, ConductivityEstimate, DensityOfStates};
use crate::spectral::{fermi_filter, FilteredState};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Numerical settings of one SCF run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScfSettings {
    pub grid_size: usize,
    pub hopping: TightBindingParams,
    /// Inverse-temperature-like sharpness of the Fermi function
    pub beta: f64,
    /// Chemical potential (eV)
    pub mu: f64,
    pub convergence_threshold: f64,
    pub max_iterations: usize,
    /// Fraction of the new density mixed into the next input, in (0, 1]
    pub density_mixing: f64,
    pub noise: NoiseModel,
    /// Gaussian broadening of the DOS (eV)
    pub dos_sigma: f64,
    /// Reject grids that do not divide evenly over the atoms
    pub strict_grid_mapping: bool,
}

impl Default for ScfSettings {
    fn default() -> Self {
        ScfSettings {
            grid_size: 16,
            hopping: TightBindingParams::default(),
            beta: 40.0,
            mu: 0.0,
            convergence_threshold: 1e-3,
            max_iterations: 50,
            density_mixing: 1.0,
            noise: NoiseModel::Noiseless,
            dos_sigma: 0.1,
            strict_grid_mapping: false,
        }
    }
}

impl ScfSettings {
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 || !self.grid_size.is_power_of_two() {
            return Err(ScfError::config(format!(
                "grid_size must be a power of two, got {}",
                self.grid_size
            )));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(ScfError::config(format!("beta must be positive, got {}", self.beta)));
        }
        if !self.mu.is_finite() {
            return Err(ScfError::config("mu must be finite"));
        }
        if !(self.convergence_threshold.is_finite() && self.convergence_threshold > 0.0) {
            return Err(ScfError::config(format!(
                "convergence threshold must be positive, got {}",
                self.convergence_threshold
            )));
        }
        if self.max_iterations == 0 {
            return Err(ScfError::config("max_iterations must be at least 1"));
        }
        if !(self.density_mixing > 0.0 && self.density_mixing <= 1.0) {
            return Err(ScfError::config(format!(
                "density mixing must lie in (0, 1], got {}",
                self.density_mixing
            )));
        }
        if !(self.dos_sigma.is_finite() && self.dos_sigma > 0.0) {
            return Err(ScfError::config(format!(
                "DOS broadening must be positive, got {}",
                self.dos_sigma
            )));
        }
        let h = &self.hopping;
        if ![h.t_cc, h.t_cucu, h.t_ccu, h.density_coupling]
            .iter()
            .all(|x| x.is_finite())
        {
            return Err(ScfError::config("hopping parameters must be finite"));
        }
        if let NoiseModel::Shots { shots: 0, .. } = self.noise {
            return Err(ScfError::config("Shot count must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScfStatus {
    Iterating,
    Converged,
    MaxIterationsReached,
}

impl ScfStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ScfStatus::Iterating)
    }
}

/// Density bookkeeping of a running SCF loop.
#[derive(Debug, Clone)]
pub struct ConvergenceState {
    /// Density fed into the most recent Hamiltonian build
    pub previous: DVector<f64>,
    /// Density extracted in the most recent cycle
    pub current: Option<DVector<f64>>,
    pub iteration: usize,
    pub threshold: f64,
    pub max_iterations: usize,
    pub residuals: Vec<f64>,
    pub status: ScfStatus,
}

impl ConvergenceState {
    pub fn new(initial: DVector<f64>, threshold: f64, max_iterations: usize) -> Self {
        ConvergenceState {
            previous: initial,
            current: None,
            iteration: 0,
            threshold,
            max_iterations,
            residuals: Vec::new(),
            status: ScfStatus::Iterating,
        }
    }

    /// Record the density produced from `previous` and move the state
    /// machine forward. Returns the new status and the residual
    /// `‖new - previous‖`.
    pub fn advance(&mut self, new_density: DVector<f64>, mixing: f64) -> (ScfStatus, f64) {
        let residual = (&new_density - &self.previous).norm();
        self.iteration += 1;
        self.residuals.push(residual);

        self.status = if residual < self.threshold {
            ScfStatus::Converged
        } else if self.iteration >= self.max_iterations {
            ScfStatus::MaxIterationsReached
        } else {
            ScfStatus::Iterating
        };

        if self.status == ScfStatus::Iterating {
            self.previous = if mixing >= 1.0 {
                new_density.clone()
            } else {
                &self.previous * (1.0 - mixing) + &new_density * mixing
            };
        }
        self.current = Some(new_density);
        (self.status, residual)
    }

    /// Density to feed into the next Hamiltonian build; `None` before the
    /// first cycle.
    pub fn feedback(&self) -> Option<&DVector<f64>> {
        if self.iteration == 0 {
            None
        } else {
            Some(&self.previous)
        }
    }
}

/// Products of one builder → filter → extractor pass.
#[derive(Debug, Clone)]
pub struct ScfStep {
    pub hamiltonian: DMatrix<f64>,
    pub filtered: FilteredState,
    pub density: DVector<f64>,
}

/// Final state of an SCF run.
#[derive(Debug, Clone)]
pub struct ScfResult {
    pub status: ScfStatus,
    pub iterations: usize,
    pub residuals: Vec<f64>,
    pub hamiltonian: DMatrix<f64>,
    pub density_matrix: DMatrix<f64>,
    pub eigenvalues: DVector<f64>,
    pub occupations: DVector<f64>,
    /// Self-consistent density. On convergence this is the input of the
    /// final Hamiltonian build, which maps onto itself within the threshold.
    pub density: DVector<f64>,
    /// Density extracted in the final cycle
    pub output_density: DVector<f64>,
    pub per_atom_density: Vec<f64>,
}

impl ScfResult {
    pub fn is_converged(&self) -> bool {
        self.status == ScfStatus::Converged
    }

    pub fn final_residual(&self) -> Option<f64> {
        self.residuals.last().copied()
    }
}

/// Quantities derived once from a finished run.
#[derive(Debug, Clone)]
pub struct ElectronicProperties {
    pub dos: DensityOfStates,
    pub conductivity: ConductivityEstimate,
}

/// SCF engine for one immutable atomic configuration.
#[derive(Debug, Clone)]
pub struct TightBindingScf {
    config: AtomicConfiguration,
    layout: GridLayout,
    settings: ScfSettings,
}

impl TightBindingScf {
    /// Validate `settings` against `config`; fails before any matrix is built.
    pub fn new(config: AtomicConfiguration, settings: ScfSettings) -> Result<Self> {
        settings.validate()?;
        let layout = GridLayout::for_configuration(
            settings.grid_size,
            &config,
            settings.strict_grid_mapping,
        )?;
        Ok(TightBindingScf {
            config,
            layout,
            settings,
        })
    }

    pub fn configuration(&self) -> &AtomicConfiguration {
        &self.config
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn settings(&self) -> &ScfSettings {
        &self.settings
    }

    pub fn total_electrons(&self) -> f64 {
        self.config.total_valence_electrons() as f64
    }

    pub fn build_hamiltonian(&self, density: Option<&DVector<f64>>) -> Result<DMatrix<f64>> {
        build_hamiltonian(&self.config, &self.layout, &self.settings.hopping, density)
    }

    /// One builder → filter → extractor pass starting from `density`.
    pub fn iterate(
        &self,
        density: Option<&DVector<f64>>,
        sampler: &mut NoiseSampler,
    ) -> Result<ScfStep> {
        let hamiltonian = self.build_hamiltonian(density)?;
        let filtered = fermi_filter(&hamiltonian, self.settings.beta, self.settings.mu)?;
        let density = extract_density(&filtered.density_matrix, self.total_electrons(), sampler)?;
        Ok(ScfStep {
            hamiltonian,
            filtered,
            density,
        })
    }

    /// Iterate until the density residual drops below the threshold or the
    /// cycle limit is hit.
    pub fn scf_cycle(&self) -> Result<ScfResult> {
        let total = self.total_electrons();
        let mut sampler = self.settings.noise.sampler()?;
        let mut state = ConvergenceState::new(
            uniform_density(self.layout.grid_size, total),
            self.settings.convergence_threshold,
            self.settings.max_iterations,
        );

        info!(
            "Starting SCF: {} atoms ({} C, {} Cu), {} electrons, grid {}",
            self.config.len(),
            self.config.n_carbon(),
            self.config.n_copper(),
            total,
            self.layout.grid_size
        );

        let last = loop {
            let step = self.iterate(state.feedback(), &mut sampler)?;
            debug!(
                "Cycle {}: occupied states {:.6}",
                state.iteration + 1,
                step.filtered.occupied_states()
            );
            let (status, residual) =
                state.advance(step.density.clone(), self.settings.density_mixing);
            info!("Cycle {}: |dn| = {:.6e}", state.iteration, residual);
            if status.is_terminal() {
                break step;
            }
        };

        match state.status {
            ScfStatus::Converged => info!("SCF converged in {} cycles.", state.iteration),
            _ => warn!(
                "SCF stopped after {} cycles without reaching |dn| < {:e}",
                state.iteration, state.threshold
            ),
        }

        let density = match state.status {
            ScfStatus::Converged => state.previous,
            _ => last.density.clone(),
        };
        let per_atom_density = per_atom_density(&density, &self.layout);
        Ok(ScfResult {
            status: state.status,
            iterations: state.iteration,
            residuals: state.residuals,
            hamiltonian: last.hamiltonian,
            density_matrix: last.filtered.density_matrix,
            eigenvalues: last.filtered.spectrum.eigenvalues,
            occupations: last.filtered.occupations,
            density,
            output_density: last.density,
            per_atom_density,
        })
    }

    /// DOS and conductivity of a finished run.
    pub fn properties(&self, result: &ScfResult) -> Result<ElectronicProperties> {
        let eigenvalues = result.eigenvalues.as_slice();
        let dos = DensityOfStates::compute(eigenvalues, self.settings.dos_sigma)?;
        let conductivity =
            estimate_conductivity(&self.config, &self.layout, eigenvalues, &result.density, &dos)?;
        Ok(ElectronicProperties { dos, conductivity })
    }
}

#[cfg(test)]
mod tests;
