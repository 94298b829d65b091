//! crates/dm_algo/src/subgraph.rs
//! District subgraph: the edges of the base graph whose endpoints share a label.
//!
//! Stored as one activity bit per CSR arc; an undirected edge is active iff both of
//! its arcs are. `detach_vertex` / `reattach_vertex` touch only `v`'s arcs, so a flip
//! costs O(degree). The component count is the contiguity oracle: a districting with
//! `k` non-empty labels is contiguous iff the count equals `k`.

use dm_core::{AdjacencyGraph, CoreError, CoreResult, Districting, Graph, VertexId};

#[derive(Debug, Clone)]
pub struct DistrictSubgraph<'g> {
    graph: &'g AdjacencyGraph,
    active: Vec<bool>,
    edge_count: usize,
    // BFS scratch, reused across counts.
    seen: Vec<bool>,
    stack: Vec<VertexId>,
}

impl<'g> DistrictSubgraph<'g> {
    /// Full build from a districting. Only used once, at chain construction.
    pub fn from_scratch(graph: &'g AdjacencyGraph, districting: &Districting) -> CoreResult<Self> {
        let n = graph.vertex_count();
        if districting.vertex_count() != n {
            return Err(CoreError::invalid(format!(
                "districting covers {} vertices, graph has {n}",
                districting.vertex_count()
            )));
        }
        let mut active = vec![false; graph.arc_count()];
        let mut edge_count = 0usize;
        for v in 0..n {
            for a in graph.arcs(v) {
                let w = graph.arc_target(a);
                if districting.label(v) == districting.label(w) {
                    active[a] = true;
                    if v < w {
                        edge_count += 1;
                    }
                }
            }
        }
        Ok(Self { graph, active, edge_count, seen: vec![false; n], stack: Vec::new() })
    }

    /// Drop every subgraph edge incident to `v`. Call before changing `v`'s label.
    pub fn detach_vertex(&mut self, v: VertexId) {
        for a in self.graph.arcs(v) {
            if self.active[a] {
                self.active[a] = false;
                self.active[self.graph.mirror(a)] = false;
                self.edge_count -= 1;
            }
        }
    }

    /// Add an edge from `v` to every neighbor that now carries `v`'s label.
    pub fn reattach_vertex(&mut self, v: VertexId, districting: &Districting) {
        let label = districting.label(v);
        for a in self.graph.arcs(v) {
            let w = self.graph.arc_target(a);
            if districting.label(w) == label && !self.active[a] {
                self.active[a] = true;
                self.active[self.graph.mirror(a)] = true;
                self.edge_count += 1;
            }
        }
    }

    /// Detach + reattach in one call, after `v`'s label has been changed.
    #[inline]
    pub fn refresh_vertex(&mut self, v: VertexId, districting: &Districting) {
        self.detach_vertex(v);
        self.reattach_vertex(v, districting);
    }

    pub fn count_connected_components(&mut self) -> usize {
        let n = self.graph.vertex_count();
        self.seen.iter_mut().for_each(|s| *s = false);
        let mut components = 0usize;
        for start in 0..n {
            if self.seen[start] {
                continue;
            }
            components += 1;
            self.seen[start] = true;
            self.stack.push(start);
            while let Some(u) = self.stack.pop() {
                for a in self.graph.arcs(u) {
                    if !self.active[a] {
                        continue;
                    }
                    let w = self.graph.arc_target(a);
                    if !self.seen[w] {
                        self.seen[w] = true;
                        self.stack.push(w);
                    }
                }
            }
        }
        components
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Active undirected edges, lower endpoint first, ascending.
    pub fn edges(&self) -> Vec<(VertexId, VertexId)> {
        let mut out = Vec::with_capacity(self.edge_count);
        for v in 0..self.graph.vertex_count() {
            for a in self.graph.arcs(v) {
                let w = self.graph.arc_target(a);
                if self.active[a] && v < w {
                    out.push((v, w));
                }
            }
        }
        out.sort_unstable();
        out
    }

    /// True iff the tracked edge set equals a fresh build from `districting`.
    pub fn matches(&self, districting: &Districting) -> bool {
        (0..self.graph.vertex_count()).all(|v| {
            self.graph.arcs(v).all(|a| {
                let w = self.graph.arc_target(a);
                let same = districting.label(v) == districting.label(w);
                self.active[a] == same && self.active[self.graph.mirror(a)] == same
            })
        })
    }
}
