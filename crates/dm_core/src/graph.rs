//! crates/dm_core/src/graph.rs
//! Graph backends behind a single `neighbors(vertex)` capability.
//!
//! - `GridGraph`: implicit n×n grid (rook or queen adjacency), row-major indices.
//! - `AdjacencyGraph`: explicit CSR adjacency with a mirror-arc index, built from an
//!   edge list or from any other `Graph`.
//!
//! Both are immutable once built and are shared by reference.

use core::fmt;
use core::ops::Range;
use core::str::FromStr;
use std::collections::{BTreeSet, VecDeque};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

pub type VertexId = usize;

/// Read-only adjacency capability shared by every component.
pub trait Graph {
    fn vertex_count(&self) -> usize;

    /// Neighbors of `v` in a stable order.
    fn neighbors(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_;

    /// Every undirected edge exactly once, lower endpoint first, deterministic order.
    fn edges(&self) -> Vec<(VertexId, VertexId)>;

    fn degree(&self, v: VertexId) -> usize {
        self.neighbors(v).count()
    }

    /// Graph-adjacent or identical.
    fn are_adjacent_or_same(&self, u: VertexId, v: VertexId) -> bool {
        u == v || self.neighbors(u).any(|w| w == v)
    }
}

/* -------------------------------------------------------------------------- */
/*                                 Adjacency kind                              */
/* -------------------------------------------------------------------------- */

/// Rook = 4-neighborhood, Queen = 8-neighborhood (adds diagonals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AdjacencyKind {
    #[default]
    Rook,
    Queen,
}

impl AdjacencyKind {
    #[inline]
    pub fn diagonals(self) -> bool {
        matches!(self, AdjacencyKind::Queen)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdjacencyKind::Rook => "rook",
            AdjacencyKind::Queen => "queen",
        }
    }
}

impl fmt::Display for AdjacencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjacencyKind {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "rook" => Ok(AdjacencyKind::Rook),
            "queen" => Ok(AdjacencyKind::Queen),
            other => Err(CoreError::invalid(format!("invalid adjacency type: {other}"))),
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                   Grid graph                                */
/* -------------------------------------------------------------------------- */

/// Implicit n×n grid. Vertex `i` sits at row `i / n`, column `i % n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGraph {
    side: usize,
    adjacency: AdjacencyKind,
}

impl GridGraph {
    pub fn new(side: usize, adjacency: AdjacencyKind) -> CoreResult<Self> {
        if side < 1 {
            return Err(CoreError::invalid("grid side must be >= 1"));
        }
        Ok(Self { side, adjacency })
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    pub fn adjacency(&self) -> AdjacencyKind {
        self.adjacency
    }

    #[inline]
    pub fn coords(&self, v: VertexId) -> (usize, usize) {
        (v / self.side, v % self.side)
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> VertexId {
        row * self.side + col
    }

    /// Materialize as an explicit adjacency (same edge order as `edges()`).
    pub fn to_adjacency(&self) -> AdjacencyGraph {
        AdjacencyGraph::from_graph(self)
    }
}

impl Graph for GridGraph {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.side * self.side
    }

    fn neighbors(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        let n = self.side;
        let (r, c) = self.coords(v);
        let up = r > 0;
        let down = r + 1 < n;
        let left = c > 0;
        let right = c + 1 < n;
        let diag = self.adjacency.diagonals();

        let slots: [Option<VertexId>; 8] = [
            up.then(|| v - n),
            left.then(|| v - 1),
            right.then(|| v + 1),
            down.then(|| v + n),
            (diag && up && left).then(|| v - n - 1),
            (diag && up && right).then(|| v - n + 1),
            (diag && down && left).then(|| v + n - 1),
            (diag && down && right).then(|| v + n + 1),
        ];
        slots.into_iter().flatten()
    }

    /// Edges to south/east (and south-west/south-east for queen) from each vertex;
    /// W, N, NE, NW were already emitted by lower-indexed vertices.
    fn edges(&self) -> Vec<(VertexId, VertexId)> {
        let n = self.side;
        let diag = self.adjacency.diagonals();
        let mut out = Vec::with_capacity(if diag { 4 * n * n } else { 2 * n * n });
        for i in 0..n * n {
            let (row, col) = self.coords(i);
            if row + 1 < n {
                out.push((i, i + n));
            }
            if col + 1 < n {
                out.push((i, i + 1));
            }
            if diag && row + 1 < n {
                if col > 0 {
                    out.push((i, i + n - 1));
                }
                if col + 1 < n {
                    out.push((i, i + n + 1));
                }
            }
        }
        out
    }

    fn are_adjacent_or_same(&self, u: VertexId, v: VertexId) -> bool {
        let (ru, cu) = self.coords(u);
        let (rv, cv) = self.coords(v);
        let di = ru.abs_diff(rv);
        let dj = cu.abs_diff(cv);
        if self.adjacency.diagonals() {
            di <= 1 && dj <= 1
        } else {
            di + dj < 2
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                Adjacency graph                              */
/* -------------------------------------------------------------------------- */

/// Explicit CSR adjacency. Arc `a` in `arcs(v)` points at `arc_target(a)`;
/// `mirror(a)` is the reverse arc stored under that neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyGraph {
    offsets: Vec<usize>,
    targets: Vec<VertexId>,
    mirror: Vec<usize>,
    edges: Vec<(VertexId, VertexId)>,
}

impl AdjacencyGraph {
    /// Build from an undirected edge list. Self-loops, duplicates (in either
    /// orientation) and out-of-range endpoints are rejected.
    pub fn from_edges(vertex_count: usize, edges: &[(VertexId, VertexId)]) -> CoreResult<Self> {
        let mut seen: BTreeSet<(VertexId, VertexId)> = BTreeSet::new();
        let mut normalized = Vec::with_capacity(edges.len());
        for &(a, b) in edges {
            if a >= vertex_count || b >= vertex_count {
                return Err(CoreError::invalid(format!(
                    "edge ({a}, {b}) out of range for {vertex_count} vertices"
                )));
            }
            if a == b {
                return Err(CoreError::invalid(format!("self-loop at vertex {a}")));
            }
            let e = (a.min(b), a.max(b));
            if !seen.insert(e) {
                return Err(CoreError::invalid(format!("duplicate edge ({}, {})", e.0, e.1)));
            }
            normalized.push(e);
        }
        Ok(Self::build_csr(vertex_count, normalized))
    }

    /// Copy any backend into explicit form, preserving its edge order.
    pub fn from_graph<G: Graph>(g: &G) -> Self {
        let edges: Vec<_> = g.edges().into_iter().map(|(a, b)| (a.min(b), a.max(b))).collect();
        Self::build_csr(g.vertex_count(), edges)
    }

    fn build_csr(vertex_count: usize, edges: Vec<(VertexId, VertexId)>) -> Self {
        let mut degree = vec![0usize; vertex_count];
        for &(a, b) in &edges {
            degree[a] += 1;
            degree[b] += 1;
        }
        let mut offsets = Vec::with_capacity(vertex_count + 1);
        offsets.push(0);
        for d in &degree {
            let last = *offsets.last().unwrap_or(&0);
            offsets.push(last + d);
        }

        let arcs = 2 * edges.len();
        let mut targets = vec![0; arcs];
        let mut mirror = vec![0; arcs];
        let mut cursor: Vec<usize> = offsets[..vertex_count].to_vec();
        for &(a, b) in &edges {
            let ia = cursor[a];
            let ib = cursor[b];
            cursor[a] += 1;
            cursor[b] += 1;
            targets[ia] = b;
            targets[ib] = a;
            mirror[ia] = ib;
            mirror[ib] = ia;
        }

        Self { offsets, targets, mirror, edges }
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn arc_count(&self) -> usize {
        self.targets.len()
    }

    /// Arc indices leaving `v`.
    #[inline]
    pub fn arcs(&self, v: VertexId) -> Range<usize> {
        self.offsets[v]..self.offsets[v + 1]
    }

    #[inline]
    pub fn arc_target(&self, arc: usize) -> VertexId {
        self.targets[arc]
    }

    #[inline]
    pub fn mirror(&self, arc: usize) -> usize {
        self.mirror[arc]
    }

    #[inline]
    pub fn edge(&self, i: usize) -> (VertexId, VertexId) {
        self.edges[i]
    }
}

impl Graph for AdjacencyGraph {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.offsets.len() - 1
    }

    fn neighbors(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.targets[self.arcs(v)].iter().copied()
    }

    fn edges(&self) -> Vec<(VertexId, VertexId)> {
        self.edges.clone()
    }

    #[inline]
    fn degree(&self, v: VertexId) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }
}

/* -------------------------------------------------------------------------- */
/*                                 Connectivity                                */
/* -------------------------------------------------------------------------- */

/// True iff the whole graph is one component (an empty graph is not connected).
pub fn is_connected<G: Graph>(g: &G) -> bool {
    let n = g.vertex_count();
    if n == 0 {
        return false;
    }
    let members: Vec<VertexId> = (0..n).collect();
    is_connected_subset(g, &members)
}

/// True iff `members` induces a connected subgraph. An empty set is not connected.
pub fn is_connected_subset<G: Graph>(g: &G, members: &[VertexId]) -> bool {
    let Some(&start) = members.first() else {
        return false;
    };
    let mut inside = vec![false; g.vertex_count()];
    let mut distinct = 0usize;
    for &m in members {
        if !inside[m] {
            inside[m] = true;
            distinct += 1;
        }
    }
    let mut seen = vec![false; g.vertex_count()];
    let mut queue = VecDeque::from([start]);
    seen[start] = true;
    let mut reached = 1usize;
    while let Some(u) = queue.pop_front() {
        for w in g.neighbors(u) {
            if inside[w] && !seen[w] {
                seen[w] = true;
                reached += 1;
                queue.push_back(w);
            }
        }
    }
    reached == distinct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rook_grid_edge_count_and_order() {
        let g = GridGraph::new(3, AdjacencyKind::Rook).unwrap();
        let e = g.edges();
        assert_eq!(e.len(), 12);
        assert_eq!(&e[..3], &[(0, 3), (0, 1), (1, 4)]);
        assert!(e.iter().all(|&(a, b)| a < b));
    }

    #[test]
    fn queen_grid_has_diagonals_without_duplicates() {
        let g = GridGraph::new(3, AdjacencyKind::Queen).unwrap();
        let e = g.edges();
        // 12 rook edges + 2 diagonals per 2x2 cell (4 cells).
        assert_eq!(e.len(), 20);
        let set: BTreeSet<_> = e.iter().copied().collect();
        assert_eq!(set.len(), e.len());
        assert!(set.contains(&(1, 3)) && set.contains(&(0, 4)));
    }

    #[test]
    fn zero_side_is_invalid() {
        assert!(matches!(
            GridGraph::new(0, AdjacencyKind::Rook),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn grid_neighbors_agree_with_edges() {
        for kind in [AdjacencyKind::Rook, AdjacencyKind::Queen] {
            let g = GridGraph::new(4, kind).unwrap();
            let adj = g.to_adjacency();
            for v in 0..g.vertex_count() {
                let mut a: Vec<_> = g.neighbors(v).collect();
                let mut b: Vec<_> = adj.neighbors(v).collect();
                a.sort_unstable();
                b.sort_unstable();
                assert_eq!(a, b, "vertex {v} ({kind})");
                for w in &a {
                    assert!(g.are_adjacent_or_same(v, *w));
                }
            }
        }
    }

    #[test]
    fn mirror_arcs_point_back() {
        let g = GridGraph::new(3, AdjacencyKind::Queen).unwrap().to_adjacency();
        for v in 0..g.vertex_count() {
            for a in g.arcs(v) {
                let w = g.arc_target(a);
                let back = g.mirror(a);
                assert!(g.arcs(w).contains(&back));
                assert_eq!(g.arc_target(back), v);
            }
        }
    }

    #[test]
    fn explicit_graph_rejects_bad_edges() {
        assert!(AdjacencyGraph::from_edges(3, &[(0, 0)]).is_err());
        assert!(AdjacencyGraph::from_edges(3, &[(0, 1), (1, 0)]).is_err());
        assert!(AdjacencyGraph::from_edges(3, &[(0, 3)]).is_err());
        let g = AdjacencyGraph::from_edges(3, &[(1, 0), (1, 2)]).unwrap();
        assert_eq!(g.edges(), vec![(0, 1), (1, 2)]);
        assert_eq!(g.degree(1), 2);
    }

    #[test]
    fn connectivity_helpers() {
        let g = AdjacencyGraph::from_edges(4, &[(0, 1), (2, 3)]).unwrap();
        assert!(!is_connected(&g));
        assert!(is_connected_subset(&g, &[0, 1]));
        assert!(!is_connected_subset(&g, &[1, 2]));
        assert!(!is_connected_subset(&g, &[]));
        let grid = GridGraph::new(2, AdjacencyKind::Rook).unwrap();
        assert!(is_connected(&grid));
        assert!(!is_connected_subset(&grid, &[0, 3]));
    }
}
