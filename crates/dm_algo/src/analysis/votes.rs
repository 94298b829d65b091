//! crates/dm_algo/src/analysis/votes.rs
//! Per-precinct vote counts: seat outcomes under a plan, score bucketing, and bounded
//! random perturbations of turnout and minority share.
//!
//! Counts are `f64` since perturbed counts are not rounded.

use dm_core::{ChainRng, CoreError, CoreResult, Snapshot};

/// Minority and majority votes per precinct (vertex).
#[derive(Debug, Clone, PartialEq)]
pub struct PrecinctVotes {
    minority: Vec<f64>,
    majority: Vec<f64>,
}

impl PrecinctVotes {
    pub fn new(minority: Vec<f64>, majority: Vec<f64>) -> CoreResult<Self> {
        if minority.len() != majority.len() {
            return Err(CoreError::invalid(format!(
                "{} minority counts for {} majority counts",
                minority.len(),
                majority.len()
            )));
        }
        if minority.iter().chain(&majority).any(|c| !c.is_finite() || *c < 0.0) {
            return Err(CoreError::invalid("vote counts must be finite and >= 0"));
        }
        Ok(Self { minority, majority })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.minority.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.minority.is_empty()
    }

    #[inline]
    pub fn minority(&self) -> &[f64] {
        &self.minority
    }

    #[inline]
    pub fn majority(&self) -> &[f64] {
        &self.majority
    }

    pub fn total(&self, v: usize) -> f64 {
        self.minority[v] + self.majority[v]
    }

    /// Redraw every precinct: turnout scaled by `1 + U(−population_shift, population_shift)`,
    /// minority share moved by `U(−minority_shift, minority_shift)` and clamped to `[0, 1]`.
    /// Empty precincts stay empty.
    pub fn perturb(&self, shift: &Perturbation, rng: &mut ChainRng) -> CoreResult<Self> {
        shift.validate()?;
        let mut minority = Vec::with_capacity(self.len());
        let mut majority = Vec::with_capacity(self.len());
        for v in 0..self.len() {
            let scale = 1.0 + uniform(rng, shift.population_shift);
            let nudge = uniform(rng, shift.minority_shift);
            let total = self.total(v);
            if total <= 0.0 {
                minority.push(0.0);
                majority.push(0.0);
                continue;
            }
            let new_total = total * scale;
            let share = (self.minority[v] / total + nudge).clamp(0.0, 1.0);
            minority.push(share * new_total);
            majority.push(new_total - share * new_total);
        }
        Ok(Self { minority, majority })
    }

    fn district_sums(&self, plan: &Snapshot) -> CoreResult<Vec<(f64, f64)>> {
        if plan.len() != self.len() {
            return Err(CoreError::invalid(format!(
                "plan covers {} vertices, votes cover {}",
                plan.len(),
                self.len()
            )));
        }
        let mut sums = vec![(0.0, 0.0); plan.num_districts() as usize];
        for (v, &d) in plan.labels().iter().enumerate() {
            let s = &mut sums[d as usize];
            s.0 += self.minority[v];
            s.1 += self.majority[v];
        }
        Ok(sums)
    }
}

/// Bounds of a [`PrecinctVotes::perturb`] draw.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Perturbation {
    /// Half-width of the additive minority-share shift, in `[0, 1]`.
    pub minority_shift: f64,
    /// Half-width of the relative turnout change, in `[0, 1)`.
    pub population_shift: f64,
}

impl Perturbation {
    fn validate(&self) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&self.minority_shift) {
            return Err(CoreError::invalid("minority shift must be in [0, 1]"));
        }
        if !(0.0..1.0).contains(&self.population_shift) {
            return Err(CoreError::invalid("population shift must be in [0, 1)"));
        }
        Ok(())
    }
}

fn uniform(rng: &mut ChainRng, half_width: f64) -> f64 {
    half_width * (2.0 * rng.next_unit_f64() - 1.0)
}

/* -------------------------------------- Seats -------------------------------------- */

/// Districts where the minority outpolls the majority; ties are worth half a seat.
pub fn vote_seat_share(votes: &PrecinctVotes, plan: &Snapshot) -> CoreResult<f64> {
    Ok(votes
        .district_sums(plan)?
        .into_iter()
        .map(|(a, b)| {
            if a > b {
                1.0
            } else if a == b {
                0.5
            } else {
                0.0
            }
        })
        .sum())
}

fn check_margin(epsilon: f64) -> CoreResult<()> {
    if !(0.0..=0.5).contains(&epsilon) {
        return Err(CoreError::invalid("epsilon must be in [0, 0.5]"));
    }
    Ok(())
}

fn minority_shares(votes: &PrecinctVotes, plan: &Snapshot) -> CoreResult<Vec<f64>> {
    Ok(votes
        .district_sums(plan)?
        .into_iter()
        .filter(|(a, b)| a + b > 0.0)
        .map(|(a, b)| a / (a + b))
        .collect())
}

/// Minority wins with a share in `[½, ½ + ε]`. Districts without votes are skipped.
pub fn tossup_seats(votes: &PrecinctVotes, plan: &Snapshot, epsilon: f64) -> CoreResult<usize> {
    check_margin(epsilon)?;
    Ok(minority_shares(votes, plan)?
        .into_iter()
        .filter(|&s| (0.5..=0.5 + epsilon).contains(&s))
        .count())
}

/// Minority wins with a share of at least `1 − ε`. Districts without votes are skipped.
pub fn safe_seats(votes: &PrecinctVotes, plan: &Snapshot, epsilon: f64) -> CoreResult<usize> {
    check_margin(epsilon)?;
    Ok(minority_shares(votes, plan)?
        .into_iter()
        .filter(|&s| s >= 1.0 - epsilon)
        .count())
}

/* ------------------------------------- Buckets ------------------------------------- */

/// Sort `(score, seats)` pairs by score and average consecutive runs of `len`; a
/// shorter trailing run becomes its own bucket.
pub fn bucket_means(scores: &[f64], seats: &[f64], len: usize) -> CoreResult<Vec<(f64, f64)>> {
    if scores.len() != seats.len() {
        return Err(CoreError::invalid(format!(
            "{} scores for {} seat counts",
            scores.len(),
            seats.len()
        )));
    }
    if len == 0 {
        return Err(CoreError::invalid("bucket length must be >= 1"));
    }
    let mut pairs: Vec<(f64, f64)> = scores.iter().copied().zip(seats.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(pairs
        .chunks(len)
        .map(|chunk| {
            let n = chunk.len() as f64;
            let (s, e) = chunk.iter().fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
            (s / n, e / n)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(minority: &[f64], majority: &[f64]) -> PrecinctVotes {
        PrecinctVotes::new(minority.to_vec(), majority.to_vec()).unwrap()
    }

    #[test]
    fn seats_count_wins_and_half_ties() {
        let v = votes(&[3.0, 1.0, 2.0, 2.0, 0.0, 1.0], &[1.0, 1.0, 2.0, 2.0, 4.0, 1.0]);
        let plan = Snapshot::from(vec![0, 0, 1, 1, 2, 2]);
        // 4:2 win, 4:4 tie, 1:5 loss.
        assert_eq!(vote_seat_share(&v, &plan).unwrap(), 1.5);
    }

    #[test]
    fn tossups_and_safe_seats() {
        let v = votes(&[55.0, 95.0, 40.0, 0.0], &[45.0, 5.0, 60.0, 0.0]);
        let plan = Snapshot::from(vec![0, 1, 2, 3]);
        assert_eq!(tossup_seats(&v, &plan, 0.1).unwrap(), 1);
        assert_eq!(safe_seats(&v, &plan, 0.1).unwrap(), 1);
        assert_eq!(safe_seats(&v, &plan, 0.5).unwrap(), 2);
        assert!(tossup_seats(&v, &plan, 0.6).is_err());
    }

    #[test]
    fn mismatched_inputs_are_invalid() {
        assert!(PrecinctVotes::new(vec![1.0], vec![]).is_err());
        assert!(PrecinctVotes::new(vec![-1.0], vec![1.0]).is_err());
        let v = votes(&[1.0, 2.0], &[2.0, 1.0]);
        assert!(vote_seat_share(&v, &Snapshot::from(vec![0, 0, 1])).is_err());
    }

    #[test]
    fn buckets_average_sorted_runs() {
        let got = bucket_means(&[3.0, 1.0, 2.0, 4.0, 5.0], &[30.0, 10.0, 20.0, 40.0, 50.0], 2).unwrap();
        assert_eq!(got, vec![(1.5, 15.0), (3.5, 35.0), (5.0, 50.0)]);
        assert!(bucket_means(&[1.0], &[1.0], 0).is_err());
        assert!(bucket_means(&[1.0], &[], 1).is_err());
    }

    #[test]
    fn perturbation_keeps_shares_in_range() {
        let v = votes(&[10.0, 0.0, 5.0, 0.0], &[0.0, 10.0, 5.0, 0.0]);
        let shift = Perturbation { minority_shift: 0.2, population_shift: 0.1 };
        let mut rng = ChainRng::from_seed_u64(12);
        for _ in 0..50 {
            let p = v.perturb(&shift, &mut rng).unwrap();
            for i in 0..3 {
                let total = p.total(i);
                assert!((9.0 - 1e-9..=11.0 + 1e-9).contains(&total), "total {total}");
                let share = p.minority()[i] / total;
                assert!((0.0..=1.0).contains(&share));
            }
            assert_eq!((p.minority()[3], p.majority()[3]), (0.0, 0.0));
            assert!((p.minority()[2] / p.total(2) - 0.5).abs() <= 0.2 + 1e-9);
        }
    }

    #[test]
    fn zero_perturbation_is_identity() {
        let v = votes(&[3.0, 1.0], &[1.0, 3.0]);
        let mut rng = ChainRng::from_seed_u64(1);
        assert_eq!(v.perturb(&Perturbation::default(), &mut rng).unwrap(), v);
        let bad = Perturbation { minority_shift: 0.0, population_shift: 1.0 };
        assert!(v.perturb(&bad, &mut rng).is_err());
    }
}
