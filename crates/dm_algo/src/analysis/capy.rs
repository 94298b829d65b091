//! crates/dm_algo/src/analysis/capy.rs
//! Clustering score of two voter groups counted per precinct, and a Metropolis walk on
//! those counts that steers the score toward a target.
//!
//! With `A` the adjacency matrix and `x`, `y` the per-vertex counts of each group:
//! - `self(x)    = (xᵀ(A+I)x − Σx) / 2`, same-group voter pairs sharing or adjoining a precinct
//! - `cross(x,y) = xᵀ(A+I)y`, mixed pairs under the same relation
//! - `capy(x,y)  = ½·(self(x)/(self(x)+cross) + self(y)/(self(y)+cross))`
//!
//! A fully segregated map scores 1; perfectly mixed counts drive it toward ½ or below.

use dm_core::{ChainRng, CoreError, CoreResult, Graph};

fn check_lengths<G: Graph>(graph: &G, x: &[f64], y: &[f64]) -> CoreResult<()> {
    let n = graph.vertex_count();
    if x.len() != n || y.len() != n {
        return Err(CoreError::invalid(format!(
            "vote vectors have {} and {} entries for {n} vertices",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

fn self_pairs<G: Graph>(graph: &G, x: &[f64]) -> f64 {
    let within: f64 = x.iter().map(|&c| c * (c - 1.0)).sum::<f64>() / 2.0;
    let across: f64 = graph.edges().into_iter().map(|(u, v)| x[u] * x[v]).sum();
    within + across
}

fn cross_pairs<G: Graph>(graph: &G, x: &[f64], y: &[f64]) -> f64 {
    let within: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let across: f64 = graph
        .edges()
        .into_iter()
        .map(|(u, v)| x[u] * y[v] + x[v] * y[u])
        .sum();
    within + across
}

/// `(xᵀ(A+I)x − Σx) / 2`.
pub fn self_energy<G: Graph>(graph: &G, x: &[f64]) -> CoreResult<f64> {
    check_lengths(graph, x, x)?;
    Ok(self_pairs(graph, x))
}

/// `xᵀ(A+I)y`.
pub fn cross_energy<G: Graph>(graph: &G, x: &[f64], y: &[f64]) -> CoreResult<f64> {
    check_lengths(graph, x, y)?;
    Ok(cross_pairs(graph, x, y))
}

/// Mean same-group share of each group's adjacent voter pairs.
pub fn capy_score<G: Graph>(graph: &G, x: &[f64], y: &[f64]) -> CoreResult<f64> {
    check_lengths(graph, x, y)?;
    let (xx, yy, xy) = (self_pairs(graph, x), self_pairs(graph, y), cross_pairs(graph, x, y));
    if xx + xy <= 0.0 || yy + xy <= 0.0 {
        return Err(CoreError::invalid("a voter group has no adjacent pairs"));
    }
    Ok((xx / (xx + xy) + yy / (yy + xy)) / 2.0)
}

/* ------------------------------------ Vote walk ------------------------------------ */

#[derive(Debug, Clone, PartialEq)]
pub struct VoteWalkParams {
    /// Inverse temperature of the acceptance rule.
    pub beta: f64,
    /// Score the walk climbs toward from below and descends toward from above.
    pub target: f64,
    /// Proposals before the walk ends.
    pub steps: usize,
}

impl Default for VoteWalkParams {
    fn default() -> Self {
        Self { beta: 1_048_576.0, target: 1.0, steps: 100 }
    }
}

/// One proposal: `s` minority voters leave precinct `i` for `j` while `s` majority
/// voters go the other way, so every precinct keeps its turnout and each group keeps
/// its total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteStep {
    pub from: usize,
    pub to: usize,
    pub moved: u64,
    pub accepted: bool,
    pub energy: f64,
}

/// Iterator over `steps` proposals; yields the step taken and the score after it.
#[derive(Debug)]
pub struct VoteWalk<'g, G: Graph> {
    graph: &'g G,
    minority: Vec<u64>,
    majority: Vec<u64>,
    params: VoteWalkParams,
    energy: f64,
    rng: ChainRng,
    remaining: usize,
}

impl<'g, G: Graph> VoteWalk<'g, G> {
    pub fn new(
        graph: &'g G,
        minority: Vec<u64>,
        majority: Vec<u64>,
        params: VoteWalkParams,
        rng: ChainRng,
    ) -> CoreResult<Self> {
        if graph.vertex_count() < 2 {
            return Err(CoreError::invalid("vote walk needs at least two precincts"));
        }
        if !params.beta.is_finite() || params.beta <= 0.0 {
            return Err(CoreError::invalid("beta must be finite and > 0"));
        }
        if !params.target.is_finite() {
            return Err(CoreError::invalid("target score must be finite"));
        }
        let energy = capy_score(graph, &as_f64(&minority), &as_f64(&majority))?;
        let remaining = params.steps;
        Ok(Self { graph, minority, majority, params, energy, rng, remaining })
    }

    #[inline]
    pub fn energy(&self) -> f64 {
        self.energy
    }

    #[inline]
    pub fn minority(&self) -> &[u64] {
        &self.minority
    }

    #[inline]
    pub fn majority(&self) -> &[u64] {
        &self.majority
    }

    fn apply(&mut self, from: usize, to: usize, s: u64) {
        self.minority[from] -= s;
        self.minority[to] += s;
        self.majority[from] += s;
        self.majority[to] -= s;
    }

    fn step(&mut self) -> VoteStep {
        let n = self.graph.vertex_count();
        let from = self.rng.choose_index(n).unwrap_or(0);
        let mut to = self.rng.choose_index(n - 1).unwrap_or(0);
        if to >= from {
            to += 1;
        }
        let available = self.minority[from].min(self.majority[to]);
        let moved = match self.rng.gen_range(available) {
            Some(r) => r + 1,
            None => 0,
        };
        if moved == 0 {
            return VoteStep { from, to, moved, accepted: true, energy: self.energy };
        }

        self.apply(from, to, moved);
        let proposed = capy_score(self.graph, &as_f64(&self.minority), &as_f64(&self.majority));
        let accepted = match proposed {
            Ok(new) => {
                let old = self.energy;
                let ok = if old < self.params.target {
                    self.accept(old, new)
                } else {
                    self.accept(new, old)
                };
                if ok {
                    self.energy = new;
                }
                ok
            }
            Err(_) => false,
        };
        if !accepted {
            self.apply(to, from, moved);
        }
        VoteStep { from, to, moved, accepted, energy: self.energy }
    }

    /// Always take `hi >= lo`; otherwise with probability `exp(−β·(lo − hi))`.
    fn accept(&mut self, lo: f64, hi: f64) -> bool {
        if hi >= lo {
            return true;
        }
        self.rng.next_unit_f64() < (-self.params.beta * (lo - hi)).exp()
    }
}

impl<G: Graph> Iterator for VoteWalk<'_, G> {
    type Item = VoteStep;

    fn next(&mut self) -> Option<VoteStep> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.step())
    }
}

fn as_f64(counts: &[u64]) -> Vec<f64> {
    counts.iter().map(|&c| c as f64).collect()
}
