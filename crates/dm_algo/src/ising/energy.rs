//! crates/dm_algo/src/ising/energy.rs
//! Energy calculators over any `Graph` backend.
//!
//! - Hamiltonian: `H = −Σ_edges s(u)·s(v)`; low H means clustered spins.
//! - Gamma: number of minority–minority edges.
//! - Normalized Gamma: Gamma / `2·√M·(√M − 1)`, the edge count of a compact square of
//!   `M` minority vertices. `scale_factor` returns that maximum so deltas compare
//!   against a temperature calibrated for raw edge counts.
//!
//! Swap deltas assume `v_minority` and `v_majority` carry opposite spins and are
//! neither adjacent nor identical.

use dm_core::{CoreError, CoreResult, EnergyKind, Graph, Spin, VertexId, VoterConfig};

pub trait EnergyCalculator {
    /// Energy of the edges incident to `v`.
    fn contribution_at<G: Graph>(&self, graph: &G, config: &VoterConfig, v: VertexId) -> f64;

    /// Change in total energy if the two spins were exchanged.
    fn swap_delta<G: Graph>(
        &self,
        graph: &G,
        config: &VoterConfig,
        v_minority: VertexId,
        v_majority: VertexId,
    ) -> f64;

    fn total_energy<G: Graph>(&self, graph: &G, config: &VoterConfig) -> f64;

    /// Multiplier applied to a delta before the temperature test.
    fn scale_factor(&self) -> f64 {
        1.0
    }
}

/* -------------------------------- Hamiltonian ------------------------------------ */

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hamiltonian;

impl EnergyCalculator for Hamiltonian {
    fn contribution_at<G: Graph>(&self, graph: &G, config: &VoterConfig, v: VertexId) -> f64 {
        let s = config.spin(v).value();
        let around: i32 = graph.neighbors(v).map(|w| config.spin(w).value()).sum();
        f64::from(-s * around)
    }

    fn swap_delta<G: Graph>(
        &self,
        graph: &G,
        config: &VoterConfig,
        v_minority: VertexId,
        v_majority: VertexId,
    ) -> f64 {
        -2.0 * (self.contribution_at(graph, config, v_minority)
            + self.contribution_at(graph, config, v_majority))
    }

    fn total_energy<G: Graph>(&self, graph: &G, config: &VoterConfig) -> f64 {
        let sum: i64 = graph
            .edges()
            .into_iter()
            .map(|(u, v)| i64::from(config.spin(u).value() * config.spin(v).value()))
            .sum();
        -(sum as f64)
    }
}

/* ----------------------------------- Gamma --------------------------------------- */

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gamma;

impl Gamma {
    fn minority_neighbors<G: Graph>(graph: &G, config: &VoterConfig, v: VertexId) -> usize {
        graph.neighbors(v).filter(|&w| config.spin(w) == Spin::Minority).count()
    }
}

impl EnergyCalculator for Gamma {
    fn contribution_at<G: Graph>(&self, graph: &G, config: &VoterConfig, v: VertexId) -> f64 {
        Self::minority_neighbors(graph, config, v) as f64
    }

    fn swap_delta<G: Graph>(
        &self,
        graph: &G,
        config: &VoterConfig,
        v_minority: VertexId,
        v_majority: VertexId,
    ) -> f64 {
        Self::minority_neighbors(graph, config, v_majority) as f64
            - Self::minority_neighbors(graph, config, v_minority) as f64
    }

    /// Half the summed minority-neighbor counts over minority vertices.
    fn total_energy<G: Graph>(&self, graph: &G, config: &VoterConfig) -> f64 {
        let twice: usize = (0..graph.vertex_count())
            .filter(|&v| config.is_minority(v))
            .map(|v| Self::minority_neighbors(graph, config, v))
            .sum();
        (twice / 2) as f64
    }
}

/* ------------------------------ Normalized Gamma --------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedGamma {
    max_gamma: f64,
}

impl NormalizedGamma {
    /// Needs at least two minority vertices, otherwise the maximum is zero.
    pub fn new(minority_count: usize) -> CoreResult<Self> {
        if minority_count < 2 {
            return Err(CoreError::invalid(format!(
                "normalized-gamma needs >= 2 minority vertices, got {minority_count}"
            )));
        }
        let root = (minority_count as f64).sqrt();
        Ok(Self { max_gamma: 2.0 * root * (root - 1.0) })
    }

    #[inline]
    pub fn max_gamma(&self) -> f64 {
        self.max_gamma
    }
}

impl EnergyCalculator for NormalizedGamma {
    fn contribution_at<G: Graph>(&self, graph: &G, config: &VoterConfig, v: VertexId) -> f64 {
        Gamma.contribution_at(graph, config, v) / self.max_gamma
    }

    fn swap_delta<G: Graph>(
        &self,
        graph: &G,
        config: &VoterConfig,
        v_minority: VertexId,
        v_majority: VertexId,
    ) -> f64 {
        Gamma.swap_delta(graph, config, v_minority, v_majority) / self.max_gamma
    }

    fn total_energy<G: Graph>(&self, graph: &G, config: &VoterConfig) -> f64 {
        Gamma.total_energy(graph, config) / self.max_gamma
    }

    fn scale_factor(&self) -> f64 {
        self.max_gamma
    }
}

/* --------------------------------- Dispatch -------------------------------------- */

/// The calculator bound to one simulation, selected by `EnergyKind`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnergyModel {
    Hamiltonian(Hamiltonian),
    Gamma(Gamma),
    NormalizedGamma(NormalizedGamma),
}

impl EnergyModel {
    pub fn new(kind: EnergyKind, minority_count: usize) -> CoreResult<Self> {
        Ok(match kind {
            EnergyKind::Hamiltonian => EnergyModel::Hamiltonian(Hamiltonian),
            EnergyKind::Gamma => EnergyModel::Gamma(Gamma),
            EnergyKind::NormalizedGamma => {
                EnergyModel::NormalizedGamma(NormalizedGamma::new(minority_count)?)
            }
        })
    }

    /// Parse the selector string first (`hamiltonian|gamma|normalized-gamma`).
    pub fn from_name(name: &str, minority_count: usize) -> CoreResult<Self> {
        Self::new(name.parse()?, minority_count)
    }

    pub fn kind(&self) -> EnergyKind {
        match self {
            EnergyModel::Hamiltonian(_) => EnergyKind::Hamiltonian,
            EnergyModel::Gamma(_) => EnergyKind::Gamma,
            EnergyModel::NormalizedGamma(_) => EnergyKind::NormalizedGamma,
        }
    }
}

impl EnergyCalculator for EnergyModel {
    fn contribution_at<G: Graph>(&self, graph: &G, config: &VoterConfig, v: VertexId) -> f64 {
        match self {
            EnergyModel::Hamiltonian(c) => c.contribution_at(graph, config, v),
            EnergyModel::Gamma(c) => c.contribution_at(graph, config, v),
            EnergyModel::NormalizedGamma(c) => c.contribution_at(graph, config, v),
        }
    }

    fn swap_delta<G: Graph>(
        &self,
        graph: &G,
        config: &VoterConfig,
        v_minority: VertexId,
        v_majority: VertexId,
    ) -> f64 {
        match self {
            EnergyModel::Hamiltonian(c) => c.swap_delta(graph, config, v_minority, v_majority),
            EnergyModel::Gamma(c) => c.swap_delta(graph, config, v_minority, v_majority),
            EnergyModel::NormalizedGamma(c) => c.swap_delta(graph, config, v_minority, v_majority),
        }
    }

    fn total_energy<G: Graph>(&self, graph: &G, config: &VoterConfig) -> f64 {
        match self {
            EnergyModel::Hamiltonian(c) => c.total_energy(graph, config),
            EnergyModel::Gamma(c) => c.total_energy(graph, config),
            EnergyModel::NormalizedGamma(c) => c.total_energy(graph, config),
        }
    }

    fn scale_factor(&self) -> f64 {
        match self {
            EnergyModel::Hamiltonian(c) => c.scale_factor(),
            EnergyModel::Gamma(c) => c.scale_factor(),
            EnergyModel::NormalizedGamma(c) => c.scale_factor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_core::{AdjacencyKind, GridGraph};

    fn swapped(config: &VoterConfig, a: VertexId, b: VertexId) -> VoterConfig {
        let mut c = config.clone();
        let (sa, sb) = (c.spin(a), c.spin(b));
        c.set(a, sb);
        c.set(b, sa);
        c
    }

    fn corner_config() -> VoterConfig {
        // 4x4 rook grid, minority on 0, 1, 4 and 15.
        let mut c = VoterConfig::with_minority_prefix(16, 0);
        for v in [0, 1, 4, 15] {
            c.set(v, Spin::Minority);
        }
        c
    }

    #[test]
    fn gamma_counts_minority_pairs() {
        let g = GridGraph::new(4, AdjacencyKind::Rook).unwrap();
        let c = corner_config();
        assert_eq!(Gamma.total_energy(&g, &c), 2.0);
        assert_eq!(Gamma.contribution_at(&g, &c, 0), 2.0);
    }

    #[test]
    fn hamiltonian_total_matches_half_contributions() {
        let g = GridGraph::new(4, AdjacencyKind::Queen).unwrap();
        let c = corner_config();
        let half: f64 =
            (0..16).map(|v| Hamiltonian.contribution_at(&g, &c, v)).sum::<f64>() / 2.0;
        assert_eq!(Hamiltonian.total_energy(&g, &c), half);
    }

    #[test]
    fn swap_deltas_match_recomputed_totals() {
        let g = GridGraph::new(4, AdjacencyKind::Rook).unwrap();
        let c = corner_config();
        // 1 is minority, 10 is majority; not adjacent.
        let after = swapped(&c, 1, 10);
        let models = [
            EnergyModel::new(EnergyKind::Hamiltonian, 4).unwrap(),
            EnergyModel::new(EnergyKind::Gamma, 4).unwrap(),
            EnergyModel::new(EnergyKind::NormalizedGamma, 4).unwrap(),
        ];
        for m in models {
            let expected = m.total_energy(&g, &after) - m.total_energy(&g, &c);
            let got = m.swap_delta(&g, &c, 1, 10);
            assert!((expected - got).abs() < 1e-12, "{}", m.kind());
        }
    }

    #[test]
    fn normalized_gamma_scale() {
        let n = NormalizedGamma::new(4).unwrap();
        assert_eq!(n.max_gamma(), 4.0);
        assert_eq!(n.scale_factor(), 4.0);
        assert!(NormalizedGamma::new(1).is_err());
    }

    #[test]
    fn unknown_energy_name_is_invalid() {
        assert!(matches!(EnergyModel::from_name("potts", 4), Err(CoreError::InvalidArgument(_))));
        assert_eq!(EnergyModel::from_name("gamma", 4).unwrap().kind(), EnergyKind::Gamma);
    }
}
