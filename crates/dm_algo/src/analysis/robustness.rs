//! crates/dm_algo/src/analysis/robustness.rs
//! How far a perturbed vote map moved from the original.
//!
//! - KL divergence (plain and symmetric) over precinct histograms, counting only cells
//!   positive in both.
//! - Earth mover's distance with graph hop distance or a flat "teleport" metric between
//!   precincts.
//! - Mean relative change per precinct.
//!
//! Histograms are normalized to unit mass first, so absolute counts are fine as input.

use std::collections::VecDeque;

use dm_core::{CoreError, CoreResult, Graph};

use super::votes::PrecinctVotes;

const EPS: f64 = 1e-12;

fn normalized(h: &[f64]) -> CoreResult<Vec<f64>> {
    if h.iter().any(|x| !x.is_finite() || *x < 0.0) {
        return Err(CoreError::invalid("histogram entries must be finite and >= 0"));
    }
    let mass: f64 = h.iter().sum();
    if mass <= 0.0 {
        return Err(CoreError::invalid("histogram has no mass"));
    }
    Ok(h.iter().map(|x| x / mass).collect())
}

fn same_len(p: &[f64], q: &[f64]) -> CoreResult<()> {
    if p.len() != q.len() {
        return Err(CoreError::invalid(format!("histograms have {} and {} bins", p.len(), q.len())));
    }
    Ok(())
}

/* --------------------------------------- KL --------------------------------------- */

/// `Σ P·ln(P/Q)` over bins where both `P` and `Q` are positive.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> CoreResult<f64> {
    same_len(p, q)?;
    let (p, q) = (normalized(p)?, normalized(q)?);
    Ok(p.iter()
        .zip(&q)
        .filter(|(a, b)| **a > 0.0 && **b > 0.0)
        .map(|(a, b)| a * (a / b).ln())
        .sum())
}

pub fn symmetric_kl(p: &[f64], q: &[f64]) -> CoreResult<f64> {
    Ok(kl_divergence(p, q)? + kl_divergence(q, p)?)
}

/* -------------------------------- Ground distances -------------------------------- */

/// Dense symmetric metric between bins.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    d: Vec<f64>,
}

impl DistanceMatrix {
    /// Hop counts by BFS from every vertex. The graph must be connected.
    pub fn graph_distances<G: Graph>(graph: &G) -> CoreResult<Self> {
        let n = graph.vertex_count();
        let mut d = vec![0.0; n * n];
        for s in 0..n {
            let mut hops = vec![usize::MAX; n];
            hops[s] = 0;
            let mut queue = VecDeque::from([s]);
            while let Some(u) = queue.pop_front() {
                for w in graph.neighbors(u) {
                    if hops[w] == usize::MAX {
                        hops[w] = hops[u] + 1;
                        queue.push_back(w);
                    }
                }
            }
            for (t, &h) in hops.iter().enumerate() {
                if h == usize::MAX {
                    return Err(CoreError::invalid(format!("vertex {t} is unreachable from {s}")));
                }
                d[s * n + t] = h as f64;
            }
        }
        Ok(Self { n, d })
    }

    /// Every pair of distinct bins at distance 1.
    pub fn teleport(n: usize) -> Self {
        let mut d = vec![1.0; n * n];
        for i in 0..n {
            d[i * n + i] = 0.0;
        }
        Self { n, d }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.d[i * self.n + j]
    }
}

/* -------------------------------- Earth mover's distance -------------------------------- */

/// Minimum cost of moving the unit mass of `p` onto `q` under `dist`.
///
/// Both constructors of [`DistanceMatrix`] yield metrics, so mass shared by a bin stays
/// put and only the surplus is shipped. The transport problem on the surplus is solved
/// by successive shortest paths with Bellman-Ford on the residual graph.
pub fn earth_movers_distance(p: &[f64], q: &[f64], dist: &DistanceMatrix) -> CoreResult<f64> {
    same_len(p, q)?;
    if p.len() != dist.len() {
        return Err(CoreError::invalid(format!(
            "histograms have {} bins, distance matrix covers {}",
            p.len(),
            dist.len()
        )));
    }
    let (p, q) = (normalized(p)?, normalized(q)?);

    let sources: Vec<usize> = (0..p.len()).filter(|&i| p[i] - q[i] > EPS).collect();
    let sinks: Vec<usize> = (0..p.len()).filter(|&j| q[j] - p[j] > EPS).collect();
    let mut supply: Vec<f64> = sources.iter().map(|&i| p[i] - q[i]).collect();
    let mut demand: Vec<f64> = sinks.iter().map(|&j| q[j] - p[j]).collect();
    let (m, k) = (sources.len(), sinks.len());
    let cost = |a: usize, b: usize| dist.get(sources[a], sinks[b]);
    let mut flow = vec![0.0; m * k];

    // Nodes: sources 0..m, sinks m..m+k. Paths start at a source with supply left and
    // end at a sink with demand left.
    while supply.iter().any(|&s| s > EPS) && demand.iter().any(|&d| d > EPS) {
        let mut best = vec![f64::INFINITY; m + k];
        let mut pred: Vec<Option<usize>> = vec![None; m + k];
        for a in 0..m {
            if supply[a] > EPS {
                best[a] = 0.0;
            }
        }
        for _ in 0..(m + k) {
            let mut changed = false;
            for a in 0..m {
                if best[a].is_infinite() {
                    continue;
                }
                for b in 0..k {
                    let via = best[a] + cost(a, b);
                    if via < best[m + b] - EPS {
                        best[m + b] = via;
                        pred[m + b] = Some(a);
                        changed = true;
                    }
                }
            }
            for b in 0..k {
                if best[m + b].is_infinite() {
                    continue;
                }
                for a in 0..m {
                    if flow[a * k + b] > EPS {
                        let via = best[m + b] - cost(a, b);
                        if via < best[a] - EPS {
                            best[a] = via;
                            pred[a] = Some(m + b);
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        let Some(end) = (0..k)
            .filter(|&b| demand[b] > EPS && best[m + b].is_finite())
            .min_by(|&x, &y| best[m + x].total_cmp(&best[m + y]))
        else {
            return Err(CoreError::invariant("transport left unmatched mass"));
        };

        // Walk back to the starting source, collecting the bottleneck.
        let mut path = vec![m + end];
        let mut node = m + end;
        while let Some(prev) = pred[node] {
            path.push(prev);
            node = prev;
            if path.len() > 2 * (m + k) {
                return Err(CoreError::invariant("cycle in transport residual graph"));
            }
        }
        path.reverse();
        let mut amount = supply[path[0]].min(demand[end]);
        for hop in path.windows(2) {
            if hop[0] >= m {
                // Sink back to source: undo existing flow.
                amount = amount.min(flow[hop[1] * k + (hop[0] - m)]);
            }
        }
        for hop in path.windows(2) {
            if hop[0] < m {
                flow[hop[0] * k + (hop[1] - m)] += amount;
            } else {
                flow[hop[1] * k + (hop[0] - m)] -= amount;
            }
        }
        supply[path[0]] -= amount;
        demand[end] -= amount;
    }

    let mut total = 0.0;
    for a in 0..m {
        for b in 0..k {
            total += flow[a * k + b] * cost(a, b);
        }
    }
    Ok(total)
}

/* ------------------------------------- Relative ------------------------------------- */

/// Mean of `|after − before| / before` over bins where `before` is positive.
pub fn mean_relative_change(before: &[f64], after: &[f64]) -> CoreResult<f64> {
    same_len(before, after)?;
    let changes: Vec<f64> = before
        .iter()
        .zip(after)
        .filter(|(b, _)| **b > 0.0)
        .map(|(b, a)| (a - b).abs() / b)
        .collect();
    if changes.is_empty() {
        return Err(CoreError::invalid("no positive bins to compare"));
    }
    Ok(changes.iter().sum::<f64>() / changes.len() as f64)
}

/* ------------------------------------ Vote maps ------------------------------------ */

#[derive(Debug, Clone, Copy)]
pub enum VoteDistance<'a> {
    Kl,
    SymmetricKl,
    EarthMovers(&'a DistanceMatrix),
    RelativeChange,
}

/// Which groups' histograms contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteGroups {
    Minority,
    Both,
}

/// Distance between two vote maps: the minority term, plus the majority term for
/// [`VoteGroups::Both`].
pub fn vote_distance(
    before: &PrecinctVotes,
    after: &PrecinctVotes,
    metric: VoteDistance<'_>,
    groups: VoteGroups,
) -> CoreResult<f64> {
    let one = |p: &[f64], q: &[f64]| match metric {
        VoteDistance::Kl => kl_divergence(p, q),
        VoteDistance::SymmetricKl => symmetric_kl(p, q),
        VoteDistance::EarthMovers(d) => earth_movers_distance(p, q, d),
        VoteDistance::RelativeChange => mean_relative_change(p, q),
    };
    let minority = one(before.minority(), after.minority())?;
    match groups {
        VoteGroups::Minority => Ok(minority),
        VoteGroups::Both => Ok(minority + one(before.majority(), after.majority())?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_core::AdjacencyGraph;

    fn path(n: usize) -> AdjacencyGraph {
        let edges: Vec<_> = (1..n).map(|i| (i - 1, i)).collect();
        AdjacencyGraph::from_edges(n, &edges).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn kl_matches_hand_values() {
        assert_eq!(kl_divergence(&[2.0, 3.0], &[4.0, 6.0]).unwrap(), 0.0);
        let want = 0.5 * 2f64.ln() + 0.5 * (2.0f64 / 3.0).ln();
        assert!(close(kl_divergence(&[1.0, 1.0], &[1.0, 3.0]).unwrap(), want));
        // Bins empty on either side are ignored.
        assert!(close(kl_divergence(&[1.0, 1.0, 0.0], &[1.0, 1.0, 5.0]).unwrap(), 3.5f64.ln()));
    }

    #[test]
    fn symmetric_kl_is_symmetric() {
        let (p, q) = ([1.0, 2.0, 3.0], [3.0, 2.0, 1.0]);
        assert!(close(symmetric_kl(&p, &q).unwrap(), symmetric_kl(&q, &p).unwrap()));
        assert!(kl_divergence(&[0.0, 0.0], &[1.0, 1.0]).is_err());
        assert!(kl_divergence(&[1.0], &[1.0, 1.0]).is_err());
    }

    #[test]
    fn graph_distances_are_hop_counts() {
        let d = DistanceMatrix::graph_distances(&path(4)).unwrap();
        assert_eq!(d.get(0, 3), 3.0);
        assert_eq!(d.get(2, 1), 1.0);
        let split = AdjacencyGraph::from_edges(4, &[(0, 1), (2, 3)]).unwrap();
        assert!(DistanceMatrix::graph_distances(&split).is_err());
    }

    #[test]
    fn emd_on_a_path() {
        let d = DistanceMatrix::graph_distances(&path(3)).unwrap();
        assert!(close(earth_movers_distance(&[1.0, 0.0, 0.0], &[0.0, 0.0, 1.0], &d).unwrap(), 2.0));
        assert!(close(earth_movers_distance(&[0.5, 0.5, 0.0], &[0.0, 0.5, 0.5], &d).unwrap(), 1.0));
        assert_eq!(earth_movers_distance(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0], &d).unwrap(), 0.0);
    }

    #[test]
    fn emd_pairs_each_surplus_with_its_nearest_deficit() {
        // 0→1 and 2→3, never 0→3.
        let d = DistanceMatrix::graph_distances(&path(4)).unwrap();
        let got = earth_movers_distance(&[0.5, 0.0, 0.5, 0.0], &[0.0, 0.5, 0.0, 0.5], &d).unwrap();
        assert!(close(got, 1.0), "{got}");
    }

    #[test]
    fn emd_under_teleport_is_total_variation() {
        let p = [4.0, 1.0, 0.0, 3.0, 2.0];
        let q = [1.0, 1.0, 5.0, 2.0, 1.0];
        let d = DistanceMatrix::teleport(5);
        let (pn, qn) = (normalized(&p).unwrap(), normalized(&q).unwrap());
        let tv: f64 = pn.iter().zip(&qn).map(|(a, b)| (a - b).max(0.0)).sum();
        assert!(close(earth_movers_distance(&p, &q, &d).unwrap(), tv));
    }

    #[test]
    fn relative_change_skips_empty_bins() {
        assert!(close(mean_relative_change(&[10.0, 0.0, 4.0], &[12.0, 3.0, 3.0]).unwrap(), 0.225));
        assert!(mean_relative_change(&[0.0], &[1.0]).is_err());
    }

    #[test]
    fn vote_distance_adds_the_majority_term() {
        let before = PrecinctVotes::new(vec![1.0, 1.0], vec![1.0, 3.0]).unwrap();
        let after = PrecinctVotes::new(vec![1.0, 3.0], vec![1.0, 1.0]).unwrap();
        let min = vote_distance(&before, &after, VoteDistance::Kl, VoteGroups::Minority).unwrap();
        let both = vote_distance(&before, &after, VoteDistance::Kl, VoteGroups::Both).unwrap();
        assert!(close(min, kl_divergence(&[1.0, 1.0], &[1.0, 3.0]).unwrap()));
        assert!(close(both, min + kl_divergence(&[1.0, 3.0], &[1.0, 1.0]).unwrap()));

        let d = DistanceMatrix::teleport(2);
        let emd = vote_distance(&before, &after, VoteDistance::EarthMovers(&d), VoteGroups::Both).unwrap();
        assert!(close(emd, 0.5));
    }
}
