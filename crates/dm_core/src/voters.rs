//! crates/dm_core/src/voters.rs
//! Voter configurations: one spin per vertex, minority = -1, majority = +1.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::VertexId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Spin {
    Minority,
    Majority,
}

impl Spin {
    #[inline]
    pub fn value(self) -> i32 {
        match self {
            Spin::Minority => -1,
            Spin::Majority => 1,
        }
    }
}

/// Owned spin vector. Cloning yields an independent sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoterConfig {
    spins: Vec<Spin>,
}

impl VoterConfig {
    pub fn new(spins: Vec<Spin>) -> Self {
        Self { spins }
    }

    /// `minority_count` minority vertices at the front, the rest majority.
    pub fn with_minority_prefix(vertex_count: usize, minority_count: usize) -> Self {
        let spins = (0..vertex_count)
            .map(|i| if i < minority_count { Spin::Minority } else { Spin::Majority })
            .collect();
        Self { spins }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.spins.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spins.is_empty()
    }

    #[inline]
    pub fn spin(&self, v: VertexId) -> Spin {
        self.spins[v]
    }

    #[inline]
    pub fn is_minority(&self, v: VertexId) -> bool {
        self.spins[v] == Spin::Minority
    }

    #[inline]
    pub fn set(&mut self, v: VertexId, s: Spin) {
        self.spins[v] = s;
    }

    #[inline]
    pub fn spins(&self) -> &[Spin] {
        &self.spins
    }

    pub(crate) fn spins_mut(&mut self) -> &mut [Spin] {
        &mut self.spins
    }

    pub fn minority_count(&self) -> usize {
        self.spins.iter().filter(|s| **s == Spin::Minority).count()
    }

    /// Spins as `-1`/`+1` integers, in vertex order.
    pub fn values(&self) -> Vec<i32> {
        self.spins.iter().map(|s| s.value()).collect()
    }
}

impl crate::rng::ChainRng {
    /// Uniformly permute a configuration in place (count of each spin is preserved).
    pub fn shuffle_config(&mut self, config: &mut VoterConfig) {
        self.shuffle_in_place(config.spins_mut());
    }
}
