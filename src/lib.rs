// Tight-binding SCF engine for copper–carbon clusters

pub mod density;
pub mod error;
pub mod geometry;
pub mod hamiltonian;
pub mod properties;
pub mod scf_impl;
pub mod spectral;
pub mod sweep;

pub use density::NoiseModel;
pub use error::{Result, ScfError};
pub use geometry::{Atom, AtomicConfiguration, ClusterGeometry, Species};
pub use hamiltonian::{GridLayout, TightBindingParams};
pub use properties::{ConductivityEstimate, DensityOfStates};
pub use scf_impl::{
    ConvergenceState, ElectronicProperties, ScfResult, ScfSettings, ScfStatus, TightBindingScf,
};
pub use sweep::{run_height_sweep, SweepPoint};
