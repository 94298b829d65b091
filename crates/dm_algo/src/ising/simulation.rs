//! crates/dm_algo/src/ising/simulation.rs
//! Target-energy Metropolis-Hastings walk over voter configurations.
//!
//! State: the configuration, its cached energy, and minority/majority index lists
//! with a position map so a swap is O(1). The minority count never changes.
//!
//! Step toward `target`:
//! - draw one minority and one majority vertex, redrawing while they are adjacent or
//!   identical (bounded; then an exhaustive pick, or `DegenerateChain` if no pair exists),
//! - `dE` from the bound calculator, `scaled = dE · scale_factor`,
//! - at or above target: accept if `dE ≤ 0`, else with probability `exp(−scaled/T)`;
//!   below target: accept if `dE ≥ 0`, else with probability `exp(scaled/T)`.
//!   The uniform draw happens only when the deterministic branch fails.

use dm_core::{
    ChainRng, CoreError, CoreResult, Graph, IsingParams, SamplingPlan, Spin, VertexId,
    VoterConfig,
};

use super::energy::{EnergyCalculator, EnergyModel};

const MAX_PAIR_DRAWS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct IsingSimulation<'g, G: Graph> {
    graph: &'g G,
    calculator: EnergyModel,
    temperature: f64,
    minority_count: usize,
    config: VoterConfig,
    energy: f64,
    minority: Vec<VertexId>,
    majority: Vec<VertexId>,
    // Index of each vertex inside whichever list currently holds it.
    position: Vec<usize>,
    rng: ChainRng,
}

impl<'g, G: Graph> IsingSimulation<'g, G> {
    /// Validate, bind the calculator and start from a random configuration.
    pub fn new(graph: &'g G, params: &IsingParams, rng: ChainRng) -> CoreResult<Self> {
        params.validate()?;
        let n = graph.vertex_count();
        let minority_count = params.minority_count(n);
        if minority_count == 0 || minority_count >= n {
            return Err(CoreError::invalid(format!(
                "minority count {minority_count} must lie in 1..{n} (proportion {})",
                params.minority_proportion
            )));
        }
        let calculator = EnergyModel::new(params.energy, minority_count)?;
        let mut sim = Self {
            graph,
            calculator,
            temperature: params.temperature,
            minority_count,
            config: VoterConfig::with_minority_prefix(n, minority_count),
            energy: 0.0,
            minority: Vec::with_capacity(minority_count),
            majority: Vec::with_capacity(n - minority_count),
            position: vec![0; n],
            rng,
        };
        sim.randomize();
        Ok(sim)
    }

    /// Fresh uniform configuration with exactly `minority_count` minority vertices.
    pub fn randomize(&mut self) {
        let n = self.graph.vertex_count();
        self.config = VoterConfig::with_minority_prefix(n, self.minority_count);
        self.rng.shuffle_config(&mut self.config);
        self.rebuild_lists();
        self.energy = self.calculator.total_energy(self.graph, &self.config);
    }

    fn rebuild_lists(&mut self) {
        self.minority.clear();
        self.majority.clear();
        for v in 0..self.config.len() {
            let list = match self.config.spin(v) {
                Spin::Minority => &mut self.minority,
                Spin::Majority => &mut self.majority,
            };
            self.position[v] = list.len();
            list.push(v);
        }
    }

    #[inline]
    pub fn energy(&self) -> f64 {
        self.energy
    }

    #[inline]
    pub fn config(&self) -> &VoterConfig {
        &self.config
    }

    #[inline]
    pub fn calculator(&self) -> &EnergyModel {
        &self.calculator
    }

    #[inline]
    pub fn minority_count(&self) -> usize {
        self.minority_count
    }

    #[inline]
    pub fn minority_vertices(&self) -> &[VertexId] {
        &self.minority
    }

    #[inline]
    pub fn majority_vertices(&self) -> &[VertexId] {
        &self.majority
    }

    /// Total energy from scratch; the cached value should agree within rounding.
    pub fn recompute_energy(&self) -> f64 {
        self.calculator.total_energy(self.graph, &self.config)
    }

    pub fn metropolis_step(&mut self, target: f64) -> CoreResult<SwapOutcome> {
        let (v_minority, v_majority) = self.draw_pair()?;

        let de = self.calculator.swap_delta(self.graph, &self.config, v_minority, v_majority);
        let scaled = de * self.calculator.scale_factor();
        let accept = if target - self.energy <= 0.0 {
            de <= 0.0 || self.rng.next_unit_f64() < (-scaled / self.temperature).exp()
        } else {
            de >= 0.0 || self.rng.next_unit_f64() < (scaled / self.temperature).exp()
        };

        if !accept {
            return Ok(SwapOutcome::Rejected);
        }
        self.swap(v_minority, v_majority);
        self.energy += de;
        Ok(SwapOutcome::Accepted)
    }

    /// `steps` Metropolis steps toward `target`; returns how many were accepted.
    pub fn run_steps(&mut self, target: f64, steps: usize) -> CoreResult<usize> {
        let mut accepted = 0;
        for _ in 0..steps {
            if self.metropolis_step(target)? == SwapOutcome::Accepted {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    fn draw_pair(&mut self) -> CoreResult<(VertexId, VertexId)> {
        let (nm, nj) = (self.minority.len(), self.majority.len());
        for _ in 0..MAX_PAIR_DRAWS {
            let (Some(i), Some(j)) = (self.rng.choose_index(nm), self.rng.choose_index(nj)) else {
                break;
            };
            let (a, b) = (self.minority[i], self.majority[j]);
            if !self.graph.are_adjacent_or_same(a, b) {
                return Ok((a, b));
            }
        }

        let pairs: Vec<(VertexId, VertexId)> = self
            .minority
            .iter()
            .flat_map(|&a| self.majority.iter().map(move |&b| (a, b)))
            .filter(|&(a, b)| !self.graph.are_adjacent_or_same(a, b))
            .collect();
        match self.rng.choose_index(pairs.len()) {
            Some(i) => Ok(pairs[i]),
            None => Err(CoreError::degenerate(
                "every minority vertex is adjacent to every majority vertex",
            )),
        }
    }

    fn swap(&mut self, v_minority: VertexId, v_majority: VertexId) {
        let p = self.position[v_minority];
        let q = self.position[v_majority];
        self.minority[p] = v_majority;
        self.majority[q] = v_minority;
        self.position[v_majority] = p;
        self.position[v_minority] = q;
        self.config.set(v_minority, Spin::Majority);
        self.config.set(v_majority, Spin::Minority);
    }

    /// Lazy sample stream over `plan`, restarting from a random configuration per target.
    pub fn sampler(&mut self, plan: SamplingPlan) -> EnergySampler<'_, 'g, G> {
        EnergySampler { sim: self, plan, target_index: 0, taken: 0, failed: false }
    }
}

/* --------------------------------- Sampling driver -------------------------------- */

/// One recorded configuration with the target it was driven toward.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySample {
    pub target: f64,
    pub config: VoterConfig,
    pub energy: f64,
}

/// Yields `targets.len() · samples_per_target` samples, then `None`. Stops after the
/// first error.
#[derive(Debug)]
pub struct EnergySampler<'s, 'g, G: Graph> {
    sim: &'s mut IsingSimulation<'g, G>,
    plan: SamplingPlan,
    target_index: usize,
    taken: usize,
    failed: bool,
}

impl<'s, 'g, G: Graph> EnergySampler<'s, 'g, G> {
    fn next_sample(&mut self, target: f64) -> CoreResult<EnergySample> {
        if self.taken == 0 {
            self.sim.randomize();
            self.sim.run_steps(target, self.plan.warmup_steps)?;
        }
        self.sim.run_steps(target, self.plan.steps_between_samples)?;
        Ok(EnergySample { target, config: self.sim.config().clone(), energy: self.sim.energy() })
    }
}

impl<'s, 'g, G: Graph> Iterator for EnergySampler<'s, 'g, G> {
    type Item = CoreResult<EnergySample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.plan.samples_per_target == 0 {
            return None;
        }
        let target = *self.plan.targets.get(self.target_index)?;
        let sample = self.next_sample(target);
        if sample.is_err() {
            self.failed = true;
            return Some(sample);
        }
        self.taken += 1;
        if self.taken == self.plan.samples_per_target {
            tracing::debug!(target_energy = target, energy = self.sim.energy(), "target sampled");
            self.target_index += 1;
            self.taken = 0;
        }
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let left = self.plan.total_samples()
            - (self.target_index * self.plan.samples_per_target + self.taken).min(self.plan.total_samples());
        (left, Some(left))
    }
}

/// Eager driver: parallel `(configs, energies)` for every target in `plan`.
pub fn collect_configurations<G: Graph>(
    graph: &G,
    params: &IsingParams,
    plan: &SamplingPlan,
    rng: ChainRng,
) -> CoreResult<(Vec<VoterConfig>, Vec<f64>)> {
    let mut sim = IsingSimulation::new(graph, params, rng)?;
    let mut configs = Vec::with_capacity(plan.total_samples());
    let mut energies = Vec::with_capacity(plan.total_samples());
    for sample in sim.sampler(plan.clone()) {
        let sample = sample?;
        configs.push(sample.config);
        energies.push(sample.energy);
    }
    tracing::info!(
        samples = configs.len(),
        energy = %params.energy,
        proportion = params.minority_proportion,
        "voter configurations collected"
    );
    Ok((configs, energies))
}
