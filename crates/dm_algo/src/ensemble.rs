//! crates/dm_algo/src/ensemble.rs
//! Ensemble generator: a constrained random walk over contiguous, balanced districtings.
//!
//! Step:
//! 1) draw edges uniformly until one crosses a district boundary; a fair coin picks
//!    which endpoint is the base and which flips,
//! 2) balance guard: reject if the base district would exceed `target + t`, or the flip
//!    district would drop below `max(target − t, 1)`,
//! 3) tentative relabel + detach/reattach on the subgraph tracker,
//! 4) accept iff the subgraph has exactly `k` components, else roll back through the
//!    same detach/reattach path.
//!
//! The seed districting is the first ensemble element. After `stall_budget` consecutive
//! non-accepted proposals an exhaustive scan of every boundary move decides between
//! continuing and `DegenerateChain("no further moves")`.
//!
//! With `unique` set, only unseen plans are collected and the run ends at
//! `ensemble_size` distinct plans; `stall_budget` consecutive accepted repeats fail with
//! `DegenerateChain` instead of looping on an exhausted state space.

use std::collections::BTreeSet;

use dm_core::{
    graph::is_connected, AdjacencyGraph, ChainRng, CoreError, CoreResult, Districting, Ensemble,
    EnsembleParams, Graph, Label, Snapshot, VertexId,
};

use crate::subgraph::DistrictSubgraph;

const PROGRESS_EVERY: usize = 10_000;

/// Result of one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Accepted,
    RejectedBalance,
    RejectedContiguity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainStats {
    pub proposals: u64,
    pub accepted: u64,
    pub rejected_balance: u64,
    pub rejected_contiguity: u64,
    /// Exhaustive move scans triggered by the stall budget.
    pub stall_scans: u64,
}

impl ChainStats {
    fn record(&mut self, outcome: StepOutcome) {
        self.proposals += 1;
        match outcome {
            StepOutcome::Accepted => self.accepted += 1,
            StepOutcome::RejectedBalance => self.rejected_balance += 1,
            StepOutcome::RejectedContiguity => self.rejected_contiguity += 1,
        }
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.proposals == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposals as f64
        }
    }
}

/// Owns the live districting, its sizes and subgraph, and the collected snapshots.
#[derive(Debug)]
pub struct EnsembleGenerator<'g> {
    graph: &'g AdjacencyGraph,
    districting: Districting,
    sizes: Vec<usize>,
    subgraph: DistrictSubgraph<'g>,
    params: EnsembleParams,
    target: usize,
    rng: ChainRng,
    samples: Vec<Snapshot>,
    seen: BTreeSet<Snapshot>,
    stats: ChainStats,
    stalled: u64,
    repeats: u64,
}

impl<'g> EnsembleGenerator<'g> {
    /// Validate everything up front; no stateful loop starts on bad input.
    pub fn new(
        graph: &'g AdjacencyGraph,
        seed: Districting,
        params: &EnsembleParams,
        rng: ChainRng,
    ) -> CoreResult<Self> {
        params.validate()?;
        let n = graph.vertex_count();
        let k = params.num_districts;
        if k as usize > n {
            return Err(CoreError::invalid(format!("{k} districts exceed {n} vertices")));
        }
        if k == 1 {
            return Err(CoreError::degenerate("a single district has no boundary edges"));
        }
        if n % k as usize != 0 {
            return Err(CoreError::invalid(format!(
                "{n} vertices are not divisible into {k} districts"
            )));
        }
        if !is_connected(graph) {
            return Err(CoreError::invalid("graph is not connected"));
        }
        if seed.num_districts() != k {
            return Err(CoreError::invalid(format!(
                "seed districting has {} districts, expected {k}",
                seed.num_districts()
            )));
        }
        let target = n / k as usize;
        seed.validate(graph, target, params.balance_tolerance)?;

        let mut subgraph = DistrictSubgraph::from_scratch(graph, &seed)?;
        let components = subgraph.count_connected_components();
        if components != k as usize {
            return Err(CoreError::invariant(format!(
                "seed subgraph has {components} components, expected {k}"
            )));
        }

        let sizes = seed.sizes();
        let samples = vec![seed.snapshot()];
        let seen = if params.unique { samples.iter().cloned().collect() } else { BTreeSet::new() };
        Ok(Self {
            graph,
            districting: seed,
            sizes,
            subgraph,
            params: params.clone(),
            target,
            rng,
            samples,
            seen,
            stats: ChainStats::default(),
            stalled: 0,
            repeats: 0,
        })
    }

    #[inline]
    pub fn districting(&self) -> &Districting {
        &self.districting
    }

    #[inline]
    pub fn subgraph(&self) -> &DistrictSubgraph<'g> {
        &self.subgraph
    }

    #[inline]
    pub fn stats(&self) -> ChainStats {
        self.stats
    }

    #[inline]
    pub fn target_size(&self) -> usize {
        self.target
    }

    /// Snapshots collected so far (seed first).
    #[inline]
    pub fn samples(&self) -> &[Snapshot] {
        &self.samples
    }

    /// One proposal. Mutates the live state only when accepted.
    pub fn step(&mut self) -> CoreResult<StepOutcome> {
        let (v_base, v_flip) = self.draw_boundary_move();
        let outcome = self.try_flip(v_base, v_flip, true)?;
        self.stats.record(outcome);
        Ok(outcome)
    }

    /// Run until `ensemble_size` snapshots are collected (the seed counts). In unique
    /// mode only first visits are collected.
    pub fn run(&mut self) -> CoreResult<Ensemble> {
        let wanted = self.params.ensemble_size;
        while self.samples.len() < wanted {
            match self.step()? {
                StepOutcome::Accepted => {
                    self.stalled = 0;
                    let snapshot = self.districting.snapshot();
                    if self.params.unique && !self.seen.insert(snapshot.clone()) {
                        self.repeats += 1;
                        if self.repeats >= self.params.stall_budget {
                            return Err(CoreError::degenerate(format!(
                                "no new distinct plan in {} accepted moves ({} collected)",
                                self.repeats,
                                self.samples.len()
                            )));
                        }
                        continue;
                    }
                    self.repeats = 0;
                    self.samples.push(snapshot);
                    if self.samples.len() % PROGRESS_EVERY == 0 {
                        tracing::debug!(
                            collected = self.samples.len(),
                            wanted,
                            acceptance = self.stats.acceptance_rate(),
                            "ensemble progress"
                        );
                    }
                }
                StepOutcome::RejectedBalance | StepOutcome::RejectedContiguity => {
                    self.stalled += 1;
                    if self.stalled >= self.params.stall_budget {
                        self.stats.stall_scans += 1;
                        if !self.has_legal_move()? {
                            return Err(CoreError::degenerate("no further moves"));
                        }
                        tracing::warn!(
                            stalled = self.stalled,
                            "stall budget reached but a legal move exists, continuing"
                        );
                        self.stalled = 0;
                    }
                }
            }
        }

        tracing::info!(
            samples = self.samples.len(),
            proposals = self.stats.proposals,
            accepted = self.stats.accepted,
            "ensemble complete"
        );
        let samples = std::mem::take(&mut self.samples);
        Ok(if self.params.unique {
            self.seen.clear();
            Ensemble::Unique(samples.into_iter().collect())
        } else {
            Ensemble::Sequence(samples)
        })
    }

    /* ------------------------------- internals ------------------------------- */

    /// Redraw until the edge crosses a boundary. Terminates because a connected graph
    /// with ≥ 2 non-empty labels always has a boundary edge.
    fn draw_boundary_move(&mut self) -> (VertexId, VertexId) {
        let m = self.graph.edge_count() as u64;
        loop {
            let Some(i) = self.rng.gen_range(m) else {
                continue;
            };
            let (a, b) = self.graph.edge(i as usize);
            let (v_base, v_flip) = if self.rng.coin() { (a, b) } else { (b, a) };
            if self.districting.label(v_base) != self.districting.label(v_flip) {
                return (v_base, v_flip);
            }
        }
    }

    fn balanced(&self, base: Label, flip: Label) -> bool {
        let t = self.params.balance_tolerance;
        let ceiling = self.target + t;
        let floor = self.target.saturating_sub(t).max(1);
        self.sizes[base as usize] + 1 <= ceiling && self.sizes[flip as usize] > floor
    }

    /// Tentatively move `v_flip` into `v_base`'s district. With `keep == false` the
    /// move is always rolled back (used by the exhaustive scan).
    fn try_flip(&mut self, v_base: VertexId, v_flip: VertexId, keep: bool) -> CoreResult<StepOutcome> {
        let new_label = self.districting.label(v_base);
        let old_label = self.districting.label(v_flip);
        if !self.balanced(new_label, old_label) {
            return Ok(StepOutcome::RejectedBalance);
        }

        self.relabel(v_flip, old_label, new_label)?;
        let contiguous =
            self.subgraph.count_connected_components() == self.params.num_districts as usize;
        if contiguous && keep {
            return Ok(StepOutcome::Accepted);
        }
        self.relabel(v_flip, new_label, old_label)?;
        Ok(if contiguous { StepOutcome::Accepted } else { StepOutcome::RejectedContiguity })
    }

    fn relabel(&mut self, v: VertexId, from: Label, to: Label) -> CoreResult<()> {
        let shrunk = self.sizes[from as usize]
            .checked_sub(1)
            .ok_or_else(|| CoreError::invariant(format!("district {from} size underflow")))?;
        self.sizes[from as usize] = shrunk;
        self.sizes[to as usize] += 1;
        self.subgraph.detach_vertex(v);
        self.districting.set_label(v, to);
        self.subgraph.reattach_vertex(v, &self.districting);
        Ok(())
    }

    /// True iff some boundary move passes both guards. Leaves the state untouched.
    fn has_legal_move(&mut self) -> CoreResult<bool> {
        for i in 0..self.graph.edge_count() {
            let (a, b) = self.graph.edge(i);
            if self.districting.label(a) == self.districting.label(b) {
                continue;
            }
            for (v_base, v_flip) in [(a, b), (b, a)] {
                if self.try_flip(v_base, v_flip, false)? == StepOutcome::Accepted {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// Convenience driver: build a generator and run it to completion.
pub fn generate_ensemble(
    graph: &AdjacencyGraph,
    seed: Districting,
    params: &EnsembleParams,
    rng: ChainRng,
) -> CoreResult<(Ensemble, ChainStats)> {
    let mut generator = EnsembleGenerator::new(graph, seed, params, rng)?;
    let ensemble = generator.run()?;
    Ok((ensemble, generator.stats()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::block_districting;
    use dm_core::{AdjacencyKind, GridGraph};

    fn grid(side: usize, kind: AdjacencyKind) -> (GridGraph, AdjacencyGraph) {
        let g = GridGraph::new(side, kind).unwrap();
        let adj = g.to_adjacency();
        (g, adj)
    }

    fn params(k: u32, size: usize) -> EnsembleParams {
        EnsembleParams { num_districts: k, ensemble_size: size, ..EnsembleParams::default() }
    }

    #[test]
    fn seed_is_first_and_count_is_exact() {
        let (g, adj) = grid(4, AdjacencyKind::Rook);
        let seed = block_districting(&g, 4).unwrap();
        let first = seed.snapshot();
        let (ens, stats) =
            generate_ensemble(&adj, seed, &params(4, 50), ChainRng::from_seed_u64(1)).unwrap();
        assert_eq!(ens.len(), 50);
        assert_eq!(ens.iter().next(), Some(&first));
        assert_eq!(stats.accepted, 49);
    }

    #[test]
    fn every_sample_is_valid() {
        let (g, adj) = grid(6, AdjacencyKind::Queen);
        let seed = block_districting(&g, 3).unwrap();
        let (ens, _) =
            generate_ensemble(&adj, seed, &params(3, 200), ChainRng::from_seed_u64(5)).unwrap();
        for snap in ens.iter() {
            let d = Districting::new(snap.labels().to_vec(), 3).unwrap();
            assert!(d.validate(&adj, 12, 1).is_ok());
        }
    }

    #[test]
    fn tracker_stays_consistent_across_steps() {
        let (g, adj) = grid(6, AdjacencyKind::Rook);
        let seed = block_districting(&g, 4).unwrap();
        let mut gen =
            EnsembleGenerator::new(&adj, seed, &params(4, 10), ChainRng::from_seed_u64(8)).unwrap();
        for _ in 0..500 {
            gen.step().unwrap();
            assert!(gen.subgraph().matches(gen.districting()));
        }
        let s = gen.stats();
        assert_eq!(s.proposals, 500);
        assert_eq!(s.accepted + s.rejected_balance + s.rejected_contiguity, 500);
    }

    #[test]
    fn unique_mode_deduplicates() {
        let (g, adj) = grid(4, AdjacencyKind::Rook);
        let seed = block_districting(&g, 2).unwrap();
        let p = EnsembleParams { unique: true, ..params(2, 30) };
        let (ens, stats) = generate_ensemble(&adj, seed, &p, ChainRng::from_seed_u64(2)).unwrap();
        assert!(ens.is_unique());
        assert_eq!(ens.len(), 30);
        assert!(stats.accepted >= 29);
    }

    #[test]
    fn unique_mode_fails_once_the_space_is_exhausted() {
        // 1×4 path, k = 2, tolerance 1: only [0,0,1,1], [0,1,1,1], [0,0,0,1] are reachable.
        let adj = AdjacencyGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3)]).unwrap();
        let seed = Districting::new(vec![0, 0, 1, 1], 2).unwrap();
        let p = EnsembleParams { unique: true, stall_budget: 200, ..params(2, 10) };
        let err = generate_ensemble(&adj, seed, &p, ChainRng::from_seed_u64(5)).unwrap_err();
        assert!(matches!(err, CoreError::DegenerateChain(_)));
    }

    #[test]
    fn single_district_is_degenerate() {
        let (g, adj) = grid(3, AdjacencyKind::Rook);
        let seed = block_districting(&g, 1).unwrap();
        let err = EnsembleGenerator::new(&adj, seed, &params(1, 5), ChainRng::default()).unwrap_err();
        assert!(matches!(err, CoreError::DegenerateChain(_)));
    }

    #[test]
    fn two_by_two_into_four_reports_no_further_moves() {
        let (g, adj) = grid(2, AdjacencyKind::Rook);
        let seed = block_districting(&g, 4).unwrap();
        let p = EnsembleParams { stall_budget: 1000, ..params(4, 5) };
        let err = generate_ensemble(&adj, seed, &p, ChainRng::from_seed_u64(3)).unwrap_err();
        assert_eq!(err, CoreError::degenerate("no further moves"));
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let (g, adj) = grid(4, AdjacencyKind::Rook);
        let seed = block_districting(&g, 4).unwrap();
        assert!(matches!(
            EnsembleGenerator::new(&adj, seed.clone(), &params(2, 5), ChainRng::default()),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            EnsembleGenerator::new(&adj, seed.clone(), &params(3, 5), ChainRng::default()),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            EnsembleGenerator::new(&adj, seed, &params(4, 0), ChainRng::default()),
            Err(CoreError::InvalidArgument(_))
        ));
    }
}
