//! crates/dm_algo/src/analysis/metagraph.rs
//! Meta-adjacency between districting plans.
//!
//! Two plans are neighbors when some relabeling of the second makes it differ from
//! the first at exactly one vertex (a flip) or at exactly two vertices whose labels
//! are exchanged (a swap). Relabelings are enumerated exhaustively, so `k` is capped.

use std::collections::VecDeque;

use dm_core::{CoreError, CoreResult, Label, Snapshot, VertexId};

/// Largest district count accepted (8! relabelings per comparison).
pub const MAX_META_DISTRICTS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaMove {
    Flip { vertex: VertexId },
    Swap { first: VertexId, second: VertexId },
}

#[derive(Debug, Clone)]
pub struct MetaGraph {
    plans: Vec<Snapshot>,
    adjacency: Vec<Vec<usize>>,
    edges: Vec<(usize, usize, MetaMove)>,
}

impl MetaGraph {
    pub fn build(plans: Vec<Snapshot>) -> CoreResult<Self> {
        let Some(first) = plans.first() else {
            return Ok(Self { plans, adjacency: Vec::new(), edges: Vec::new() });
        };
        let n = first.len();
        if let Some(bad) = plans.iter().position(|p| p.len() != n) {
            return Err(CoreError::invalid(format!(
                "plan {bad} covers {} vertices, expected {n}",
                plans[bad].len()
            )));
        }
        let k = plans.iter().map(Snapshot::num_districts).max().unwrap_or(0);
        if k > MAX_META_DISTRICTS {
            return Err(CoreError::invalid(format!(
                "metagraph supports at most {MAX_META_DISTRICTS} districts, got {k}"
            )));
        }

        let perms = permutations(k as usize);
        let mut adjacency = vec![Vec::new(); plans.len()];
        let mut edges = Vec::new();
        for i in 0..plans.len() {
            for j in i + 1..plans.len() {
                if let Some(m) = compare(&plans[i], &plans[j], &perms) {
                    adjacency[i].push(j);
                    adjacency[j].push(i);
                    edges.push((i, j, m));
                }
            }
        }
        tracing::debug!(plans = plans.len(), edges = edges.len(), "metagraph built");
        Ok(Self { plans, adjacency, edges })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    #[inline]
    pub fn plans(&self) -> &[Snapshot] {
        &self.plans
    }

    #[inline]
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.adjacency[i]
    }

    #[inline]
    pub fn edges(&self) -> &[(usize, usize, MetaMove)] {
        &self.edges
    }

    /// BFS hop counts from `start`; `None` for unreachable plans.
    pub fn distances_from(&self, start: usize) -> Vec<Option<usize>> {
        let mut dist = vec![None; self.plans.len()];
        if start >= self.plans.len() {
            return dist;
        }
        dist[start] = Some(0);
        let mut queue = VecDeque::from([start]);
        while let Some(u) = queue.pop_front() {
            let next = dist[u].map_or(0, |d| d + 1);
            for &w in &self.adjacency[u] {
                if dist[w].is_none() {
                    dist[w] = Some(next);
                    queue.push_back(w);
                }
            }
        }
        dist
    }

    /// Largest pairwise distance; `None` when the metagraph is empty or disconnected.
    pub fn diameter(&self) -> Option<usize> {
        let mut best = None;
        for s in 0..self.plans.len() {
            for d in self.distances_from(s) {
                best = Some(best.unwrap_or(0).max(d?));
            }
        }
        best
    }
}

/// First relabeling under which `b` is one move from `a`.
fn compare(a: &Snapshot, b: &Snapshot, perms: &[Vec<Label>]) -> Option<MetaMove> {
    let (a, b) = (a.labels(), b.labels());
    let mut found_swap = None;
    for p in perms {
        let mut diff = [0usize; 2];
        let mut count = 0usize;
        for (v, (&x, &y)) in a.iter().zip(b).enumerate() {
            if x != p[y as usize] {
                if count == 2 {
                    count = 3;
                    break;
                }
                diff[count] = v;
                count += 1;
            }
        }
        match count {
            1 => return Some(MetaMove::Flip { vertex: diff[0] }),
            2 if found_swap.is_none() => {
                let (u, w) = (diff[0], diff[1]);
                if a[u] == p[b[w] as usize] && a[w] == p[b[u] as usize] {
                    found_swap = Some(MetaMove::Swap { first: u, second: w });
                }
            }
            _ => {}
        }
    }
    found_swap
}

/// All permutations of `0..k` (Heap's algorithm, iterative).
fn permutations(k: usize) -> Vec<Vec<Label>> {
    let mut current: Vec<Label> = (0..k as Label).collect();
    let mut out = vec![current.clone()];
    let mut c = vec![0usize; k];
    let mut i = 0;
    while i < k {
        if c[i] < i {
            if i % 2 == 0 {
                current.swap(0, i);
            } else {
                current.swap(c[i], i);
            }
            out.push(current.clone());
            c[i] += 1;
            i = 0;
        } else {
            c[i] = 0;
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(v: &[Label]) -> Snapshot {
        Snapshot::from(v.to_vec())
    }

    #[test]
    fn heap_enumerates_every_permutation_once() {
        let mut p = permutations(4);
        assert_eq!(p.len(), 24);
        p.sort();
        p.dedup();
        assert_eq!(p.len(), 24);
        assert_eq!(permutations(0).len(), 1);
    }

    #[test]
    fn relabeled_swap_is_adjacent() {
        let a = snap(&[0, 0, 1, 1]);
        // Same as swapping vertices 1 and 2 of `a`, with labels exchanged.
        let b = snap(&[1, 0, 1, 0]);
        let g = MetaGraph::build(vec![a, b]).unwrap();
        assert_eq!(g.neighbors(0), &[1]);
        assert!(matches!(g.edges()[0].2, MetaMove::Swap { .. }));
    }

    #[test]
    fn flip_is_adjacent_and_far_plans_are_not() {
        let a = snap(&[0, 0, 0, 1, 1, 1]);
        let b = snap(&[0, 0, 1, 1, 1, 1]);
        let c = snap(&[0, 1, 0, 1, 0, 1]);
        let g = MetaGraph::build(vec![a, b, c]).unwrap();
        assert_eq!(g.edges()[0], (0, 1, MetaMove::Flip { vertex: 2 }));
        assert_eq!(g.distances_from(0), vec![Some(0), Some(1), None]);
        // `c` is unreachable, so there is no finite diameter.
        assert_eq!(g.diameter(), None);

        let pair = MetaGraph::build(vec![snap(&[0, 0, 0, 1, 1, 1]), snap(&[0, 0, 1, 1, 1, 1])]).unwrap();
        assert_eq!(pair.diameter(), Some(1));
    }

    #[test]
    fn path_of_plans_has_linear_diameter() {
        let plans = vec![
            snap(&[0, 0, 0, 0, 1, 1, 1, 1]),
            snap(&[0, 0, 0, 1, 0, 1, 1, 1]),
            snap(&[0, 0, 1, 1, 0, 0, 1, 1]),
        ];
        let g = MetaGraph::build(plans).unwrap();
        assert_eq!(g.distances_from(0), vec![Some(0), Some(1), Some(2)]);
        assert_eq!(g.diameter(), Some(2));
    }

    #[test]
    fn too_many_districts_is_invalid() {
        let p = snap(&(0..9).collect::<Vec<_>>());
        assert!(MetaGraph::build(vec![p]).is_err());
        assert_eq!(MetaGraph::build(Vec::new()).unwrap().diameter(), None);
    }
}
