//! Tight-binding Hamiltonian construction
//!
//! The discretisation grid is split evenly across the atoms: atom `k` owns the
//! block `[k * ppa, (k + 1) * ppa)` with `ppa = grid_size / n_atoms`, and all
//! couplings are written at the first index of each block. When the grid size
//! is not a multiple of the atom count the trailing points stay uncoupled.

use crate::error::{Result, ScfError};
use crate::geometry::{AtomicConfiguration, Species};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Carbon–carbon coupling cutoff (Å)
pub const CC_CUTOFF: f64 = 1.5;
/// Copper–copper coupling cutoff (Å)
pub const CUCU_CUTOFF: f64 = 3.0;
/// Carbon–copper coupling cutoff (Å)
pub const CCU_CUTOFF: f64 = 3.5;
/// Reference distance of the carbon–copper exponential decay (Å)
pub const CCU_REFERENCE_DISTANCE: f64 = 2.5;

/// Hopping amplitudes and density feedback strength (eV).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TightBindingParams {
    pub t_cc: f64,
    pub t_cucu: f64,
    pub t_ccu: f64,
    /// Strength `α` of the local potential `α·n[i]` added to the diagonal.
    pub density_coupling: f64,
}

impl Default for TightBindingParams {
    fn default() -> Self {
        TightBindingParams {
            t_cc: -2.7,
            t_cucu: -1.2,
            t_ccu: -0.8,
            density_coupling: 0.0,
        }
    }
}

impl TightBindingParams {
    /// Hopping for a species pair at distance `dist`, or `None` outside the cutoff.
    pub fn coupling(&self, a: Species, b: Species, dist: f64) -> Option<f64> {
        match (a, b) {
            (Species::Carbon, Species::Carbon) if dist < CC_CUTOFF => Some(self.t_cc),
            (Species::Copper, Species::Copper) if dist < CUCU_CUTOFF => Some(self.t_cucu),
            (Species::Carbon, Species::Copper) | (Species::Copper, Species::Carbon)
                if dist < CCU_CUTOFF =>
            {
                Some(self.t_ccu * (-0.5 * (dist - CCU_REFERENCE_DISTANCE)).exp())
            }
            _ => None,
        }
    }
}

/// Mapping from atoms onto the discretisation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub grid_size: usize,
    pub n_atoms: usize,
    pub points_per_atom: usize,
}

impl GridLayout {
    /// Validate `grid_size` against the atom count.
    ///
    /// `strict` turns an uneven split into an error; otherwise the unmapped
    /// tail of the grid is kept as padding.
    pub fn new(grid_size: usize, n_atoms: usize, strict: bool) -> Result<Self> {
        if grid_size == 0 || !grid_size.is_power_of_two() {
            return Err(ScfError::config(format!(
                "grid_size must be a power of two, got {}",
                grid_size
            )));
        }
        if n_atoms == 0 {
            return Err(ScfError::config("Cannot map a grid onto zero atoms"));
        }
        if grid_size < n_atoms {
            return Err(ScfError::config(format!(
                "grid_size {} is smaller than the number of atoms {}",
                grid_size, n_atoms
            )));
        }

        let layout = GridLayout {
            grid_size,
            n_atoms,
            points_per_atom: grid_size / n_atoms,
        };
        let unmapped = layout.unmapped_points();
        if unmapped > 0 {
            if strict {
                return Err(ScfError::config(format!(
                    "grid_size {} is not divisible by {} atoms ({} unmapped points)",
                    grid_size, n_atoms, unmapped
                )));
            }
            warn!(
                "grid_size {} does not divide evenly over {} atoms: {} trailing grid points stay uncoupled",
                grid_size, n_atoms, unmapped
            );
        }
        Ok(layout)
    }

    pub fn for_configuration(
        grid_size: usize,
        config: &AtomicConfiguration,
        strict: bool,
    ) -> Result<Self> {
        Self::new(grid_size, config.len(), strict)
    }

    /// First grid index owned by `atom`.
    pub fn representative(&self, atom: usize) -> usize {
        atom * self.points_per_atom
    }

    /// Grid indices owned by `atom`.
    pub fn block(&self, atom: usize) -> std::ops::Range<usize> {
        let start = self.representative(atom);
        start..start + self.points_per_atom
    }

    pub fn unmapped_points(&self) -> usize {
        self.grid_size - self.points_per_atom * self.n_atoms
    }
}

/// Build the Hamiltonian for `config`.
///
/// `density` is the per-grid-point density of the previous cycle. It only
/// enters through the local potential `α·n[i]` and is ignored on the first
/// build (`None`).
pub fn build_hamiltonian(
    config: &AtomicConfiguration,
    layout: &GridLayout,
    params: &TightBindingParams,
    density: Option<&DVector<f64>>,
) -> Result<DMatrix<f64>> {
    if layout.n_atoms != config.len() {
        return Err(ScfError::config(format!(
            "grid layout was built for {} atoms but the configuration has {}",
            layout.n_atoms,
            config.len()
        )));
    }

    let n = layout.grid_size;
    let mut h = DMatrix::<f64>::zeros(n, n);
    let atoms = config.atoms();

    let mut n_couplings = 0usize;
    for (i, j) in config.pairs() {
        let dist = config.distance(i, j);
        if let Some(t) = params.coupling(atoms[i].species, atoms[j].species, dist) {
            let (gi, gj) = (layout.representative(i), layout.representative(j));
            h[(gi, gj)] = t;
            h[(gj, gi)] = t;
            n_couplings += 1;
        }
    }

    for (k, atom) in atoms.iter().enumerate() {
        let g = layout.representative(k);
        h[(g, g)] = atom.species.on_site_energy();
    }

    if let Some(density) = density {
        if density.len() != n {
            return Err(ScfError::config(format!(
                "density has {} entries but the grid has {} points",
                density.len(),
                n
            )));
        }
        if params.density_coupling != 0.0 {
            for i in 0..n {
                h[(i, i)] += params.density_coupling * density[i];
            }
        }
    }

    debug!(
        "Built {}x{} Hamiltonian with {} atom-pair couplings",
        n, n, n_couplings
    );
    Ok(h)
}

/// Exact symmetry check `H[i][j] == H[j][i]`.
pub fn is_symmetric(h: &DMatrix<f64>) -> bool {
    h.is_square()
        && (0..h.nrows()).all(|i| (0..i).all(|j| h[(i, j)] == h[(j, i)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Atom, ClusterGeometry};
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    fn default_cluster() -> AtomicConfiguration {
        ClusterGeometry::default().build().unwrap()
    }

    #[test]
    fn test_grid_size_must_be_power_of_two() {
        for bad in [0, 3, 10, 12, 24] {
            let err = GridLayout::new(bad, 2, false).unwrap_err();
            assert!(matches!(err, ScfError::Configuration(_)), "grid {}", bad);
        }
        assert!(GridLayout::new(16, 2, false).is_ok());
    }

    #[test]
    fn test_grid_smaller_than_atom_count() {
        assert!(matches!(
            GridLayout::new(8, 10, false),
            Err(ScfError::Configuration(_))
        ));
    }

    #[test]
    fn test_uneven_grid_padding() {
        let layout = GridLayout::new(16, 10, false).unwrap();
        assert_eq!(layout.points_per_atom, 1);
        assert_eq!(layout.unmapped_points(), 6);
        assert!(GridLayout::new(16, 10, true).is_err());

        let even = GridLayout::new(16, 4, true).unwrap();
        assert_eq!(even.points_per_atom, 4);
        assert_eq!(even.block(2), 8..12);
    }

    #[test]
    fn test_default_cluster_hamiltonian_couplings() {
        let config = default_cluster();
        let layout = GridLayout::for_configuration(16, &config, false).unwrap();
        let params = TightBindingParams::default();
        let h = build_hamiltonian(&config, &layout, &params, None).unwrap();

        assert_eq!(h.shape(), (16, 16));
        assert!(is_symmetric(&h));

        // hexagon: nearest neighbours coupled, others not
        for i in 0..6 {
            for j in 0..6 {
                if i == j {
                    continue;
                }
                let ring_gap = (i as isize - j as isize).rem_euclid(6);
                let expected = if ring_gap == 1 || ring_gap == 5 {
                    params.t_cc
                } else {
                    0.0
                };
                assert_eq!(h[(i, j)], expected, "C{} - C{}", i, j);
            }
        }

        // tetrahedron: every copper pair coupled
        for i in 6..10 {
            for j in 6..10 {
                if i != j {
                    assert_eq!(h[(i, j)], params.t_cucu);
                }
            }
        }

        // on-site energies
        for i in 0..6 {
            assert_eq!(h[(i, i)], 0.0);
        }
        for i in 6..10 {
            assert_eq!(h[(i, i)], -0.5);
        }

        // padding rows stay empty
        for i in 10..16 {
            assert!(h.row(i).iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn test_carbon_copper_coupling_decay() {
        let atoms = vec![
            Atom::new(Species::Carbon, Vector3::zeros()),
            Atom::new(Species::Copper, Vector3::new(0.0, 0.0, 2.5)),
        ];
        let config = AtomicConfiguration::new(atoms).unwrap();
        let layout = GridLayout::new(4, 2, true).unwrap();
        let params = TightBindingParams::default();
        let h = build_hamiltonian(&config, &layout, &params, None).unwrap();
        // at the reference distance the exponential is exactly one
        assert_abs_diff_eq!(h[(0, 2)], params.t_ccu, epsilon = 1e-14);
        assert_eq!(h[(0, 2)], h[(2, 0)]);

        let far = params.coupling(Species::Carbon, Species::Copper, 3.4).unwrap();
        assert_abs_diff_eq!(far, params.t_ccu * (-0.45f64).exp(), epsilon = 1e-14);
        assert!(params
            .coupling(Species::Copper, Species::Carbon, 3.6)
            .is_none());
    }

    #[test]
    fn test_density_feedback_on_diagonal() {
        let config = default_cluster();
        let layout = GridLayout::for_configuration(16, &config, false).unwrap();
        let params = TightBindingParams {
            density_coupling: 0.1,
            ..TightBindingParams::default()
        };
        let density = DVector::from_element(16, 2.0);
        let bare = build_hamiltonian(&config, &layout, &params, None).unwrap();
        let fed = build_hamiltonian(&config, &layout, &params, Some(&density)).unwrap();

        for i in 0..16 {
            assert_abs_diff_eq!(fed[(i, i)] - bare[(i, i)], 0.2, epsilon = 1e-12);
        }
        assert!(is_symmetric(&fed));
    }

    #[test]
    fn test_density_length_mismatch() {
        let config = default_cluster();
        let layout = GridLayout::for_configuration(16, &config, false).unwrap();
        let density = DVector::from_element(8, 1.0);
        let result = build_hamiltonian(
            &config,
            &layout,
            &TightBindingParams::default(),
            Some(&density),
        );
        assert!(matches!(result, Err(ScfError::Configuration(_))));
    }
}
