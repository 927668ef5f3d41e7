//! Atomic configurations for the copper–carbon cluster
//!
//! An [`AtomicConfiguration`] is an immutable list of atoms. Geometry changes
//! (for example a different copper height during a sweep) always go through
//! [`ClusterGeometry::with_copper_height`], which yields a fresh value instead
//! of editing positions in place.

use crate::error::{Result, ScfError};
use itertools::Itertools;
use nalgebra::Vector3;
use periodic_table_on_an_enum::Element;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Atomic species supported by the tight-binding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Carbon,
    Copper,
}

impl Species {
    /// Valence electrons contributed to the electron count.
    pub fn valence_electrons(self) -> usize {
        match self {
            Species::Carbon => 4,
            Species::Copper => 11,
        }
    }

    /// On-site energy in eV.
    pub fn on_site_energy(self) -> f64 {
        match self {
            Species::Carbon => 0.0,
            Species::Copper => -0.5,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Species::Carbon => "C",
            Species::Copper => "Cu",
        }
    }

    pub fn element(self) -> Element {
        match self {
            Species::Carbon => Element::Carbon,
            Species::Copper => Element::Copper,
        }
    }

    /// Parse an element symbol; only carbon and copper are accepted.
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        let element = Element::from_symbol(symbol)
            .ok_or_else(|| ScfError::config(format!("Invalid element symbol: {}", symbol)))?;
        match element {
            Element::Carbon => Ok(Species::Carbon),
            Element::Copper => Ok(Species::Copper),
            _ => Err(ScfError::config(format!(
                "Unsupported element {}: the model only knows C and Cu",
                symbol
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    pub species: Species,
    pub position: Vector3<f64>,
}

impl Atom {
    pub fn new(species: Species, position: Vector3<f64>) -> Self {
        Atom { species, position }
    }
}

/// Ordered, immutable set of atoms used for one SCF run.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicConfiguration {
    atoms: Vec<Atom>,
}

impl AtomicConfiguration {
    pub fn new(atoms: Vec<Atom>) -> Result<Self> {
        if atoms.is_empty() {
            return Err(ScfError::config("Atomic configuration contains no atoms"));
        }
        if let Some(bad) = atoms.iter().position(|a| !a.position.iter().all(|x| x.is_finite())) {
            return Err(ScfError::config(format!(
                "Atom {} has a non-finite position",
                bad + 1
            )));
        }
        Ok(AtomicConfiguration { atoms })
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn n_carbon(&self) -> usize {
        self.count(Species::Carbon)
    }

    pub fn n_copper(&self) -> usize {
        self.count(Species::Copper)
    }

    fn count(&self, species: Species) -> usize {
        self.atoms.iter().filter(|a| a.species == species).count()
    }

    /// `4 * n_carbon + 11 * n_copper`
    pub fn total_valence_electrons(&self) -> usize {
        self.atoms
            .iter()
            .map(|a| a.species.valence_electrons())
            .sum()
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        (self.atoms[i].position - self.atoms[j].position).norm()
    }

    /// Every unordered atom pair `(i, j)` with `i < j`.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> {
        (0..self.atoms.len()).tuple_combinations()
    }

    /// Indices of all atoms of the given species, in configuration order.
    pub fn indices_of(&self, species: Species) -> Vec<usize> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| a.species == species)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Parametric copper–carbon cluster: a planar carbon ring with a copper
/// tetrahedron sitting above its centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterGeometry {
    pub n_carbon: usize,
    pub n_copper: usize,
    /// Carbon nearest-neighbour distance (Å)
    pub cc_bond: f64,
    /// Copper tetrahedron edge (Å)
    pub cucu_bond: f64,
    /// Height of the copper base plane above the carbon ring (Å)
    pub copper_height: f64,
}

impl Default for ClusterGeometry {
    fn default() -> Self {
        ClusterGeometry {
            n_carbon: 6,
            n_copper: 4,
            cc_bond: 1.42,
            cucu_bond: 2.55,
            copper_height: 2.0,
        }
    }
}

impl ClusterGeometry {
    /// Same cluster with the copper block moved to `height`.
    pub fn with_copper_height(&self, height: f64) -> Self {
        ClusterGeometry {
            copper_height: height,
            ..*self
        }
    }

    pub fn build(&self) -> Result<AtomicConfiguration> {
        if self.n_carbon + self.n_copper == 0 {
            return Err(ScfError::config("Cluster needs at least one atom"));
        }
        if !(self.cc_bond > 0.0 && self.cucu_bond > 0.0) {
            return Err(ScfError::config("Bond lengths must be positive"));
        }
        if !self.copper_height.is_finite() {
            return Err(ScfError::config("Copper height must be finite"));
        }

        let mut atoms = Vec::with_capacity(self.n_carbon + self.n_copper);
        atoms.extend(
            self.carbon_positions()
                .into_iter()
                .map(|p| Atom::new(Species::Carbon, p)),
        );
        atoms.extend(
            self.copper_positions()
                .into_iter()
                .map(|p| Atom::new(Species::Copper, p)),
        );
        AtomicConfiguration::new(atoms)
    }

    fn carbon_positions(&self) -> Vec<Vector3<f64>> {
        let n = self.n_carbon;
        match n {
            0 => Vec::new(),
            1 => vec![Vector3::zeros()],
            _ => {
                // chord between neighbours equals the bond length
                let radius = self.cc_bond / (2.0 * (PI / n as f64).sin());
                (0..n)
                    .map(|k| {
                        let phi = 2.0 * PI * k as f64 / n as f64;
                        Vector3::new(radius * phi.cos(), radius * phi.sin(), 0.0)
                    })
                    .collect()
            }
        }
    }

    fn copper_positions(&self) -> Vec<Vector3<f64>> {
        let a = self.cucu_bond;
        let base_radius = a / 3f64.sqrt();
        let apex_z = self.copper_height + a * (2.0f64 / 3.0).sqrt();

        let mut shell: Vec<Vector3<f64>> = (0..3)
            .map(|k| {
                let phi = 2.0 * PI * k as f64 / 3.0;
                Vector3::new(
                    base_radius * phi.cos(),
                    base_radius * phi.sin(),
                    self.copper_height,
                )
            })
            .collect();
        shell.push(Vector3::new(0.0, 0.0, apex_z));

        let mut positions: Vec<Vector3<f64>> = shell.into_iter().take(self.n_copper).collect();

        let extra = self.n_copper.saturating_sub(4);
        for k in 0..extra {
            let phi = 2.0 * PI * k as f64 / extra as f64;
            positions.push(Vector3::new(a * phi.cos(), a * phi.sin(), apex_z));
        }
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_default_cluster_counts() {
        let config = ClusterGeometry::default().build().unwrap();
        assert_eq!(config.len(), 10);
        assert_eq!(config.n_carbon(), 6);
        assert_eq!(config.n_copper(), 4);
        assert_eq!(config.total_valence_electrons(), 68);
    }

    #[test]
    fn test_carbon_ring_is_hexagon() {
        let config = ClusterGeometry::default().build().unwrap();
        for k in 0..6 {
            let next = (k + 1) % 6;
            assert_abs_diff_eq!(config.distance(k, next), 1.42, epsilon = 1e-10);
        }
        // second neighbours sit outside the 1.5 Å carbon cutoff
        assert!(config.distance(0, 2) > 1.5);
        assert!(config.distance(0, 3) > 1.5);
    }

    #[test]
    fn test_copper_tetrahedron_edges() {
        let config = ClusterGeometry::default().build().unwrap();
        let copper = config.indices_of(Species::Copper);
        assert_eq!(copper, vec![6, 7, 8, 9]);
        for (i, j) in copper.iter().copied().tuple_combinations() {
            assert_abs_diff_eq!(config.distance(i, j), 2.55, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_with_copper_height_leaves_original_untouched() {
        let base = ClusterGeometry::default();
        let raised = base.with_copper_height(3.0);
        assert_eq!(base.copper_height, 2.0);
        assert_eq!(raised.copper_height, 3.0);

        let low = base.build().unwrap();
        let high = raised.build().unwrap();
        assert_abs_diff_eq!(
            high.atoms()[6].position.z - low.atoms()[6].position.z,
            1.0,
            epsilon = 1e-12
        );
        // carbon atoms do not move
        assert_eq!(high.atoms()[0], low.atoms()[0]);
    }

    #[test]
    fn test_extra_copper_atoms_are_placed() {
        let geometry = ClusterGeometry {
            n_copper: 6,
            ..ClusterGeometry::default()
        };
        let config = geometry.build().unwrap();
        assert_eq!(config.n_copper(), 6);
        assert_eq!(config.total_valence_electrons(), 6 * 4 + 6 * 11);
    }

    #[test]
    fn test_empty_cluster_rejected() {
        let geometry = ClusterGeometry {
            n_carbon: 0,
            n_copper: 0,
            ..ClusterGeometry::default()
        };
        assert!(matches!(geometry.build(), Err(ScfError::Configuration(_))));
    }

    #[test]
    fn test_species_from_symbol() {
        assert_eq!(Species::from_symbol("C").unwrap(), Species::Carbon);
        assert_eq!(Species::from_symbol("Cu").unwrap(), Species::Copper);
        assert!(Species::from_symbol("O").is_err());
        assert!(Species::from_symbol("Xx").is_err());
        assert_eq!(Species::Carbon.element().get_atomic_number() as usize, 6);
        assert_eq!(Species::Copper.element().get_atomic_number() as usize, 29);
    }

    #[test]
    fn test_pairs_are_unordered() {
        let config = ClusterGeometry::default().build().unwrap();
        let pairs: Vec<_> = config.pairs().collect();
        assert_eq!(pairs.len(), 10 * 9 / 2);
        assert!(pairs.iter().all(|&(i, j)| i < j));
    }
}
