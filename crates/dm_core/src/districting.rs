//! crates/dm_core/src/districting.rs
//! Districtings (vertex → district label), their immutable snapshots, and ensembles.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};
use crate::graph::{is_connected_subset, Graph, VertexId};

/// District label in `[0, k)`.
pub type Label = u32;

/// Mutable assignment of every vertex to a district label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Districting {
    labels: Vec<Label>,
    num_districts: u32,
}

impl Districting {
    /// Wrap a label vector. Every label must lie in `[0, num_districts)` and
    /// every district must be used.
    pub fn new(labels: Vec<Label>, num_districts: u32) -> CoreResult<Self> {
        if num_districts == 0 {
            return Err(CoreError::invalid("number of districts must be >= 1"));
        }
        let mut used = vec![false; num_districts as usize];
        for (v, &l) in labels.iter().enumerate() {
            if l >= num_districts {
                return Err(CoreError::invalid(format!(
                    "vertex {v} has label {l} outside [0, {num_districts})"
                )));
            }
            used[l as usize] = true;
        }
        if let Some(missing) = used.iter().position(|u| !u) {
            return Err(CoreError::invalid(format!("district {missing} has no vertices")));
        }
        Ok(Self { labels, num_districts })
    }

    #[inline]
    pub fn num_districts(&self) -> u32 {
        self.num_districts
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn label(&self, v: VertexId) -> Label {
        self.labels[v]
    }

    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Relabel one vertex. Callers keep sizes and any derived structure in step.
    #[inline]
    pub fn set_label(&mut self, v: VertexId, label: Label) {
        debug_assert!(label < self.num_districts);
        self.labels[v] = label;
    }

    /// Vertex count per district.
    pub fn sizes(&self) -> Vec<usize> {
        let mut out = vec![0usize; self.num_districts as usize];
        for &l in &self.labels {
            out[l as usize] += 1;
        }
        out
    }

    /// Vertices of district `d`, ascending.
    pub fn members(&self, d: Label) -> Vec<VertexId> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(v, &l)| (l == d).then_some(v))
            .collect()
    }

    /// Full validity check: vertex count matches, every district is contiguous,
    /// and every size lies within `target ± tolerance`.
    pub fn validate<G: Graph>(&self, graph: &G, target: usize, tolerance: usize) -> CoreResult<()> {
        if self.labels.len() != graph.vertex_count() {
            return Err(CoreError::invalid(format!(
                "districting covers {} vertices, graph has {}",
                self.labels.len(),
                graph.vertex_count()
            )));
        }
        for (d, size) in self.sizes().into_iter().enumerate() {
            if size.abs_diff(target) > tolerance {
                return Err(CoreError::invalid(format!(
                    "district {d} has {size} vertices, target {target} ± {tolerance}"
                )));
            }
            if !is_connected_subset(graph, &self.members(d as Label)) {
                return Err(CoreError::invalid(format!("district {d} is not contiguous")));
            }
        }
        Ok(())
    }

    /// Owned, independent copy of the current labels.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.labels.clone().into_boxed_slice())
    }
}

/// Immutable labeling captured from a `Districting`; later mutation of the live
/// state never reaches a stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Snapshot(Box<[Label]>);

impl Snapshot {
    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `max label + 1`; zero for an empty snapshot.
    pub fn num_districts(&self) -> u32 {
        self.0.iter().copied().max().map_or(0, |m| m + 1)
    }
}

impl From<Vec<Label>> for Snapshot {
    fn from(v: Vec<Label>) -> Self {
        Snapshot(v.into_boxed_slice())
    }
}

/// Sampled districtings: a plain sequence, or a deduplicated set when requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensemble {
    Sequence(Vec<Snapshot>),
    Unique(BTreeSet<Snapshot>),
}

impl Ensemble {
    pub fn len(&self) -> usize {
        match self {
            Ensemble::Sequence(v) => v.len(),
            Ensemble::Unique(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_unique(&self) -> bool {
        matches!(self, Ensemble::Unique(_))
    }

    /// Sequence order, or ascending label order for a set.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Snapshot> + '_> {
        match self {
            Ensemble::Sequence(v) => Box::new(v.iter()),
            Ensemble::Unique(s) => Box::new(s.iter()),
        }
    }

    /// Every `stride`-th snapshot starting with the first; `stride == 0` is invalid.
    pub fn thinned(&self, stride: usize) -> CoreResult<Vec<Snapshot>> {
        if stride == 0 {
            return Err(CoreError::invalid("thinning stride must be >= 1"));
        }
        Ok(self.iter().step_by(stride).cloned().collect())
    }

    pub fn into_vec(self) -> Vec<Snapshot> {
        match self {
            Ensemble::Sequence(v) => v,
            Ensemble::Unique(s) => s.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AdjacencyKind, GridGraph};

    fn quadrants() -> Districting {
        Districting::new(vec![0, 0, 1, 1, 0, 0, 1, 1, 2, 2, 3, 3, 2, 2, 3, 3], 4).unwrap()
    }

    #[test]
    fn rejects_unused_or_out_of_range_labels() {
        assert!(Districting::new(vec![0, 0, 2], 3).is_err());
        assert!(Districting::new(vec![0, 1, 3], 3).is_err());
        assert!(Districting::new(vec![], 0).is_err());
    }

    #[test]
    fn validate_checks_size_and_contiguity() {
        let g = GridGraph::new(4, AdjacencyKind::Rook).unwrap();
        let d = quadrants();
        assert_eq!(d.sizes(), vec![4, 4, 4, 4]);
        assert!(d.validate(&g, 4, 0).is_ok());

        // Split district 0 into two pieces of the grid.
        let mut labels = d.labels().to_vec();
        labels.swap(0, 15);
        let split = Districting::new(labels, 4).unwrap();
        assert!(split.validate(&g, 4, 0).is_err());
    }

    #[test]
    fn snapshot_is_independent_of_live_state() {
        let mut d = quadrants();
        let snap = d.snapshot();
        d.set_label(0, 1);
        assert_eq!(snap.labels()[0], 0);
        assert_eq!(snap.num_districts(), 4);
    }

    #[test]
    fn thinning_keeps_first_and_strides() {
        let e = Ensemble::Sequence((0..7u32).map(|i| Snapshot::from(vec![i])).collect());
        let t = e.thinned(3).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t[1].labels(), &[3]);
        assert!(e.thinned(0).is_err());
    }
}
