//! crates/dm_algo/src/analysis/seats.rs
//! Minority seat counts of voter configurations under districting plans.
//!
//! A district is won by the minority when its spin sum is negative; a zero sum is a
//! tie worth half a seat. Expected seats average over a whole ensemble.

use dm_core::{
    ChainRng, CoreError, CoreResult, Graph, IsingParams, SamplingPlan, Snapshot, VoterConfig,
};

use crate::ising::collect_configurations;

/// Seats won by the minority in `config` under `plan`.
pub fn minority_seat_share(config: &VoterConfig, plan: &Snapshot) -> CoreResult<f64> {
    if config.len() != plan.len() {
        return Err(CoreError::invalid(format!(
            "configuration has {} vertices, plan has {}",
            config.len(),
            plan.len()
        )));
    }
    let mut sums = vec![0i64; plan.num_districts() as usize];
    for (v, &d) in plan.labels().iter().enumerate() {
        sums[d as usize] += i64::from(config.spin(v).value());
    }
    Ok(sums
        .into_iter()
        .map(|s| match s.signum() {
            -1 => 1.0,
            0 => 0.5,
            _ => 0.0,
        })
        .sum())
}

/// Mean seat count per configuration over `plans`.
pub fn expected_minority_seat_shares(
    configs: &[VoterConfig],
    plans: &[Snapshot],
) -> CoreResult<Vec<f64>> {
    if plans.is_empty() {
        return Err(CoreError::invalid("expected seats need at least one plan"));
    }
    configs
        .iter()
        .map(|c| {
            let total = plans
                .iter()
                .map(|p| minority_seat_share(c, p))
                .sum::<CoreResult<f64>>()?;
            Ok(total / plans.len() as f64)
        })
        .collect()
}

/// One point of the votes/energy → seats surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeatPoint {
    pub proportion: f64,
    pub energy: f64,
    pub expected_seats: f64,
}

/// For each minority proportion: sample configurations over `plan`, then score them
/// against `plans`. Each proportion runs on its own stream forked from `rng`.
pub fn seat_sweep<G: Graph>(
    graph: &G,
    proportions: &[f64],
    ising: &IsingParams,
    plan: &SamplingPlan,
    plans: &[Snapshot],
    rng: &mut ChainRng,
) -> CoreResult<Vec<SeatPoint>> {
    let mut points = Vec::with_capacity(proportions.len() * plan.total_samples());
    for &p in proportions {
        let params = IsingParams { minority_proportion: p, ..ising.clone() };
        let child = ChainRng::from_seed_u64(rng.next_u64());
        let (configs, energies) = collect_configurations(graph, &params, plan, child)?;
        let seats = expected_minority_seat_shares(&configs, plans)?;
        points.extend(energies.into_iter().zip(seats).map(|(energy, expected_seats)| SeatPoint {
            proportion: p,
            energy,
            expected_seats,
        }));
        tracing::debug!(proportion = p, points = points.len(), "seat sweep step");
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_core::Spin;

    fn config(spins: &[i32]) -> VoterConfig {
        VoterConfig::new(
            spins.iter().map(|&s| if s < 0 { Spin::Minority } else { Spin::Majority }).collect(),
        )
    }

    #[test]
    fn ties_count_half() {
        let plan = Snapshot::from(vec![0, 0, 1, 1, 2, 2]);
        let c = config(&[-1, -1, -1, 1, 1, 1]);
        assert_eq!(minority_seat_share(&c, &plan).unwrap(), 1.5);
    }

    #[test]
    fn expectation_averages_over_plans() {
        let c = config(&[-1, -1, 1, 1]);
        let plans = [Snapshot::from(vec![0, 0, 1, 1]), Snapshot::from(vec![0, 1, 0, 1])];
        // First plan: one win; second: two ties.
        assert_eq!(expected_minority_seat_shares(&[c], &plans).unwrap(), vec![1.0]);
        assert!(expected_minority_seat_shares(&[], &[]).is_err());
    }

    #[test]
    fn length_mismatch_is_invalid() {
        let c = config(&[-1, 1, 1]);
        assert!(minority_seat_share(&c, &Snapshot::from(vec![0, 1])).is_err());
    }
}
