//! Tests for the tight-binding SCF loop

use super::*;
use crate::geometry::ClusterGeometry;
use crate::hamiltonian::is_symmetric;
use approx::assert_relative_eq;

fn default_engine(settings: ScfSettings) -> TightBindingScf {
    let config = ClusterGeometry::default().build().unwrap();
    TightBindingScf::new(config, settings).unwrap()
}

// === Convergence state machine ===

#[test]
fn test_convergence_state_starts_iterating() {
    let state = ConvergenceState::new(DVector::from_element(4, 1.0), 1e-3, 10);
    assert_eq!(state.status, ScfStatus::Iterating);
    assert!(state.feedback().is_none());
    assert!(state.current.is_none());
}

#[test]
fn test_convergence_state_converges_on_small_residual() {
    let mut state = ConvergenceState::new(DVector::from_element(4, 1.0), 1e-3, 10);
    let (status, residual) = state.advance(DVector::from_element(4, 2.0), 1.0);
    assert_eq!(status, ScfStatus::Iterating);
    assert_relative_eq!(residual, 2.0, epsilon = 1e-12);
    assert_eq!(state.feedback().unwrap(), &DVector::from_element(4, 2.0));

    let (status, residual) = state.advance(DVector::from_element(4, 2.0 + 1e-5), 1.0);
    assert_eq!(status, ScfStatus::Converged);
    assert!(residual < 1e-3);
    assert_eq!(state.iteration, 2);
    assert_eq!(state.residuals.len(), 2);
}

#[test]
fn test_convergence_state_hits_max_iterations() {
    let mut state = ConvergenceState::new(DVector::from_element(2, 0.0), 1e-6, 3);
    let mut statuses = Vec::new();
    for k in 1..=3 {
        let (status, _) = state.advance(DVector::from_element(2, k as f64), 1.0);
        statuses.push(status);
    }
    assert_eq!(
        statuses,
        vec![
            ScfStatus::Iterating,
            ScfStatus::Iterating,
            ScfStatus::MaxIterationsReached
        ]
    );
    assert!(state.status.is_terminal());
}

#[test]
fn test_convergence_state_mixing() {
    let mut state = ConvergenceState::new(DVector::from_element(3, 1.0), 1e-6, 10);
    state.advance(DVector::from_element(3, 3.0), 0.25);
    // (1 - 0.25) * 1 + 0.25 * 3
    assert_eq!(state.feedback().unwrap(), &DVector::from_element(3, 1.5));
    assert_eq!(state.current.as_ref().unwrap(), &DVector::from_element(3, 3.0));
}

// === Settings validation ===

#[test]
fn test_non_power_of_two_grid_rejected() {
    let config = ClusterGeometry::default().build().unwrap();
    let settings = ScfSettings {
        grid_size: 12,
        ..ScfSettings::default()
    };
    let err = TightBindingScf::new(config, settings).unwrap_err();
    assert!(matches!(err, ScfError::Configuration(_)));
}

#[test]
fn test_invalid_settings_rejected() {
    let bad = [
        ScfSettings {
            max_iterations: 0,
            ..ScfSettings::default()
        },
        ScfSettings {
            convergence_threshold: 0.0,
            ..ScfSettings::default()
        },
        ScfSettings {
            density_mixing: 1.5,
            ..ScfSettings::default()
        },
        ScfSettings {
            beta: f64::NAN,
            ..ScfSettings::default()
        },
        ScfSettings {
            dos_sigma: -0.1,
            ..ScfSettings::default()
        },
        ScfSettings {
            noise: NoiseModel::Shots {
                shots: 0,
                seed: None,
            },
            ..ScfSettings::default()
        },
    ];
    for settings in bad.iter() {
        assert!(
            matches!(settings.validate(), Err(ScfError::Configuration(_))),
            "{:?} should be rejected",
            settings
        );
    }
    assert!(ScfSettings::default().validate().is_ok());
}

#[test]
fn test_strict_grid_mapping() {
    let config = ClusterGeometry::default().build().unwrap();
    let settings = ScfSettings {
        strict_grid_mapping: true,
        ..ScfSettings::default()
    };
    assert!(TightBindingScf::new(config, settings).is_err());
}

// === Full SCF runs ===

#[test]
fn test_noiseless_scf_converges() {
    let engine = default_engine(ScfSettings::default());
    let result = engine.scf_cycle().unwrap();

    assert_eq!(result.status, ScfStatus::Converged);
    assert!(result.is_converged());
    assert!(result.iterations <= engine.settings().max_iterations);
    assert_eq!(result.residuals.len(), result.iterations);
    assert!(result.final_residual().unwrap() < engine.settings().convergence_threshold);

    assert_eq!(result.hamiltonian.shape(), (16, 16));
    assert!(is_symmetric(&result.hamiltonian));
    assert_relative_eq!(result.density.sum(), 68.0, epsilon = 1e-9);
    assert!(result.density.iter().all(|&x| x >= 0.0));
    assert_eq!(result.per_atom_density.len(), 10);
    assert!(result
        .eigenvalues
        .as_slice()
        .windows(2)
        .all(|w| w[0] <= w[1]));
}

#[test]
fn test_converged_density_is_fixed_point() {
    let engine = default_engine(ScfSettings::default());
    let result = engine.scf_cycle().unwrap();
    assert!(result.is_converged());

    let mut sampler = NoiseModel::Noiseless.sampler().unwrap();
    let step = engine.iterate(Some(&result.density), &mut sampler).unwrap();
    let change = (&step.density - &result.density).norm();
    assert!(
        change < engine.settings().convergence_threshold,
        "fixed point moved by {}",
        change
    );
}

#[test]
fn test_mixed_feedback_density_is_fixed_point() {
    let settings = ScfSettings {
        hopping: TightBindingParams {
            density_coupling: 0.5,
            ..TightBindingParams::default()
        },
        density_mixing: 0.3,
        max_iterations: 200,
        ..ScfSettings::default()
    };
    let engine = default_engine(settings);
    let result = engine.scf_cycle().unwrap();
    assert_eq!(result.status, ScfStatus::Converged);
    assert!(result.iterations > 2);
    assert_relative_eq!(result.density.sum(), 68.0, epsilon = 1e-9);

    let mut sampler = NoiseModel::Noiseless.sampler().unwrap();
    let step = engine.iterate(Some(&result.density), &mut sampler).unwrap();
    let change = (&step.density - &result.density).norm();
    assert!(
        change < engine.settings().convergence_threshold,
        "fixed point moved by {}",
        change
    );
    assert_relative_eq!(step.density, result.output_density, epsilon = 1e-9);
}

#[test]
fn test_noisy_scf_reports_max_iterations() {
    let settings = ScfSettings {
        noise: NoiseModel::Shots {
            shots: 100,
            seed: Some(3),
        },
        convergence_threshold: 1e-12,
        max_iterations: 4,
        ..ScfSettings::default()
    };
    let engine = default_engine(settings);
    let result = engine.scf_cycle().unwrap();

    assert_eq!(result.status, ScfStatus::MaxIterationsReached);
    assert!(!result.is_converged());
    assert_eq!(result.iterations, 4);
    // partial results remain usable
    assert_relative_eq!(result.density.sum(), 68.0, epsilon = 1e-9);
    let props = engine.properties(&result).unwrap();
    assert!(props.conductivity.conductivity.is_finite());
}

#[test]
fn test_density_feedback_run_terminates() {
    let settings = ScfSettings {
        hopping: TightBindingParams {
            density_coupling: 0.02,
            ..TightBindingParams::default()
        },
        density_mixing: 0.3,
        max_iterations: 30,
        ..ScfSettings::default()
    };
    let engine = default_engine(settings);
    let result = engine.scf_cycle().unwrap();

    assert!(result.status.is_terminal());
    assert!(result.iterations >= 1 && result.iterations <= 30);
    assert_eq!(result.residuals.len(), result.iterations);
    assert!(result.residuals.iter().all(|r| r.is_finite()));
    assert!(is_symmetric(&result.hamiltonian));
    assert_relative_eq!(result.density.sum(), 68.0, epsilon = 1e-9);
}

#[test]
fn test_properties_of_default_cluster() {
    let engine = default_engine(ScfSettings::default());
    let result = engine.scf_cycle().unwrap();
    let props = engine.properties(&result).unwrap();

    assert_eq!(props.dos.energies.len(), 200);
    assert!(props.dos.values.iter().all(|&v| v >= 0.0));
    assert_relative_eq!(props.dos.integrate(), 16.0, epsilon = 0.05);

    let sigma = props.conductivity;
    assert_eq!(sigma.fermi_energy, result.eigenvalues[8]);
    assert_eq!(sigma.mobility_factor, 1.0);
    assert!(sigma.conductivity.is_finite());
    assert!(sigma.conductivity >= 0.0);
    assert_relative_eq!(
        sigma.conductivity,
        sigma.dos_at_fermi * sigma.interface_quality,
        epsilon = 1e-12
    );
}
