//! Configuration management for tight-binding SCF runs
//!
//! This module handles the YAML configuration structures, their defaults,
//! and the translation into engine settings.

mod args;

pub use args::Args;

use cuc_scf::{
    Atom, AtomicConfiguration, ClusterGeometry, NoiseModel, ScfError, ScfSettings, Species,
    TightBindingParams,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cluster: ClusterParams,
    /// Explicit atom list; replaces the generated cluster when present
    #[serde(default)]
    pub geometry: Option<Vec<AtomConfig>>,
    #[serde(default)]
    pub hopping: HoppingParams,
    #[serde(default)]
    pub scf_params: ScfParams,
    #[serde(default)]
    pub properties: PropertyParams,
    pub sweep: Option<SweepParams>,
}

/// Atomic position configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AtomConfig {
    pub element: String,
    pub coords: [f64; 3],
}

/// Generated cluster parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterParams {
    pub n_carbon: Option<usize>,
    pub n_copper: Option<usize>,
    pub cc_bond: Option<f64>,
    pub cucu_bond: Option<f64>,
    pub copper_height: Option<f64>,
}

impl Default for ClusterParams {
    fn default() -> Self {
        let g = ClusterGeometry::default();
        ClusterParams {
            n_carbon: Some(g.n_carbon),
            n_copper: Some(g.n_copper),
            cc_bond: Some(g.cc_bond),
            cucu_bond: Some(g.cucu_bond),
            copper_height: Some(g.copper_height),
        }
    }
}

impl ClusterParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        self.n_carbon = self.n_carbon.or(defaults.n_carbon);
        self.n_copper = self.n_copper.or(defaults.n_copper);
        self.cc_bond = self.cc_bond.or(defaults.cc_bond);
        self.cucu_bond = self.cucu_bond.or(defaults.cucu_bond);
        self.copper_height = self.copper_height.or(defaults.copper_height);
        self
    }
}

/// Hopping amplitudes (eV)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HoppingParams {
    pub t_cc: Option<f64>,
    pub t_cucu: Option<f64>,
    pub t_ccu: Option<f64>,
    pub density_coupling: Option<f64>,
}

impl Default for HoppingParams {
    fn default() -> Self {
        let t = TightBindingParams::default();
        HoppingParams {
            t_cc: Some(t.t_cc),
            t_cucu: Some(t.t_cucu),
            t_ccu: Some(t.t_ccu),
            density_coupling: Some(t.density_coupling),
        }
    }
}

impl HoppingParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        self.t_cc = self.t_cc.or(defaults.t_cc);
        self.t_cucu = self.t_cucu.or(defaults.t_cucu);
        self.t_ccu = self.t_ccu.or(defaults.t_ccu);
        self.density_coupling = self.density_coupling.or(defaults.density_coupling);
        self
    }
}

/// SCF-specific parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScfParams {
    pub grid_size: Option<usize>,
    pub beta: Option<f64>,
    pub mu: Option<f64>,
    pub convergence_threshold: Option<f64>,
    pub max_cycle: Option<usize>,
    pub density_mixing: Option<f64>,
    /// Shot count of the noisy read-out; absent means noiseless
    pub shots: Option<u64>,
    pub seed: Option<u64>,
    pub strict_grid_mapping: Option<bool>,
}

impl Default for ScfParams {
    fn default() -> Self {
        let s = ScfSettings::default();
        ScfParams {
            grid_size: Some(s.grid_size),
            beta: Some(s.beta),
            mu: Some(s.mu),
            convergence_threshold: Some(s.convergence_threshold),
            max_cycle: Some(s.max_iterations),
            density_mixing: Some(s.density_mixing),
            shots: None,
            seed: None,
            strict_grid_mapping: Some(s.strict_grid_mapping),
        }
    }
}

impl ScfParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        self.grid_size = self.grid_size.or(defaults.grid_size);
        self.beta = self.beta.or(defaults.beta);
        self.mu = self.mu.or(defaults.mu);
        self.convergence_threshold = self.convergence_threshold.or(defaults.convergence_threshold);
        self.max_cycle = self.max_cycle.or(defaults.max_cycle);
        self.density_mixing = self.density_mixing.or(defaults.density_mixing);
        self.strict_grid_mapping = self.strict_grid_mapping.or(defaults.strict_grid_mapping);
        self
    }
}

/// Property estimation parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PropertyParams {
    pub dos_sigma: Option<f64>,
    /// Write the DOS curve to this file
    pub dos_output: Option<String>,
}

impl Default for PropertyParams {
    fn default() -> Self {
        PropertyParams {
            dos_sigma: Some(ScfSettings::default().dos_sigma),
            dos_output: None,
        }
    }
}

impl PropertyParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        self.dos_sigma = self.dos_sigma.or(Self::default().dos_sigma);
        self
    }
}

/// Copper-height sweep parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepParams {
    pub enabled: Option<bool>,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub points: Option<usize>,
}

impl Default for SweepParams {
    fn default() -> Self {
        SweepParams {
            enabled: Some(false),
            start: Some(1.5),
            end: Some(3.5),
            points: Some(9),
        }
    }
}

impl SweepParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        self.enabled = self.enabled.or(defaults.enabled);
        self.start = self.start.or(defaults.start);
        self.end = self.end.or(defaults.end);
        self.points = self.points.or(defaults.points);
        self
    }
}

impl Config {
    /// Apply defaults to all configuration sections
    pub fn with_defaults(mut self) -> Self {
        self.cluster = self.cluster.with_defaults();
        self.hopping = self.hopping.with_defaults();
        self.scf_params = self.scf_params.with_defaults();
        self.properties = self.properties.with_defaults();
        if let Some(sweep) = self.sweep.take() {
            self.sweep = Some(sweep.with_defaults());
        }
        self
    }

    /// Apply command-line overrides on top of the file values
    pub fn apply_overrides(mut self, args: &Args) -> Self {
        let scf = &mut self.scf_params;
        scf.grid_size = args.grid_size.or(scf.grid_size);
        scf.beta = args.beta.or(scf.beta);
        scf.mu = args.mu.or(scf.mu);
        scf.convergence_threshold = args.convergence_threshold.or(scf.convergence_threshold);
        scf.max_cycle = args.max_cycle.or(scf.max_cycle);
        scf.density_mixing = args.density_mixing.or(scf.density_mixing);
        scf.shots = args.shots.or(scf.shots);
        scf.seed = args.seed.or(scf.seed);
        self.properties.dos_sigma = args.dos_sigma.or(self.properties.dos_sigma);
        self.cluster.copper_height = args.copper_height.or(self.cluster.copper_height);
        if args.sweep {
            let mut sweep = self.sweep.take().unwrap_or_default().with_defaults();
            sweep.enabled = Some(true);
            self.sweep = Some(sweep);
        }
        self
    }

    pub fn cluster_geometry(&self) -> ClusterGeometry {
        let defaults = ClusterGeometry::default();
        ClusterGeometry {
            n_carbon: self.cluster.n_carbon.unwrap_or(defaults.n_carbon),
            n_copper: self.cluster.n_copper.unwrap_or(defaults.n_copper),
            cc_bond: self.cluster.cc_bond.unwrap_or(defaults.cc_bond),
            cucu_bond: self.cluster.cucu_bond.unwrap_or(defaults.cucu_bond),
            copper_height: self.cluster.copper_height.unwrap_or(defaults.copper_height),
        }
    }

    /// Atomic configuration: the explicit atom list if given, otherwise the
    /// generated cluster.
    pub fn atomic_configuration(&self) -> Result<AtomicConfiguration, ScfError> {
        match &self.geometry {
            Some(atoms) => {
                let atoms = atoms
                    .iter()
                    .map(|a| -> Result<Atom, ScfError> {
                        let species = Species::from_symbol(&a.element)?;
                        Ok(Atom::new(
                            species,
                            Vector3::new(a.coords[0], a.coords[1], a.coords[2]),
                        ))
                    })
                    .collect::<Result<Vec<_>, ScfError>>()?;
                AtomicConfiguration::new(atoms)
            }
            None => self.cluster_geometry().build(),
        }
    }

    pub fn scf_settings(&self) -> ScfSettings {
        let defaults = ScfSettings::default();
        let p = &self.scf_params;
        let h = &self.hopping;
        let noise = match p.shots {
            Some(shots) => NoiseModel::Shots {
                shots,
                seed: p.seed,
            },
            None => NoiseModel::Noiseless,
        };
        ScfSettings {
            grid_size: p.grid_size.unwrap_or(defaults.grid_size),
            hopping: TightBindingParams {
                t_cc: h.t_cc.unwrap_or(defaults.hopping.t_cc),
                t_cucu: h.t_cucu.unwrap_or(defaults.hopping.t_cucu),
                t_ccu: h.t_ccu.unwrap_or(defaults.hopping.t_ccu),
                density_coupling: h
                    .density_coupling
                    .unwrap_or(defaults.hopping.density_coupling),
            },
            beta: p.beta.unwrap_or(defaults.beta),
            mu: p.mu.unwrap_or(defaults.mu),
            convergence_threshold: p
                .convergence_threshold
                .unwrap_or(defaults.convergence_threshold),
            max_iterations: p.max_cycle.unwrap_or(defaults.max_iterations),
            density_mixing: p.density_mixing.unwrap_or(defaults.density_mixing),
            noise,
            dos_sigma: self.properties.dos_sigma.unwrap_or(defaults.dos_sigma),
            strict_grid_mapping: p
                .strict_grid_mapping
                .unwrap_or(defaults.strict_grid_mapping),
        }
    }

    /// Check if the copper-height sweep is enabled
    pub fn is_sweep_enabled(&self) -> bool {
        self.sweep.as_ref().and_then(|s| s.enabled).unwrap_or(false)
    }

    /// Validate everything that can be checked without building matrices
    pub fn validate(&self) -> Result<(), ScfError> {
        self.scf_settings().validate()?;
        if let Some(sweep) = &self.sweep {
            if sweep.points == Some(0) {
                return Err(ScfError::config("sweep needs at least one point"));
            }
        }
        Ok(())
    }
}
