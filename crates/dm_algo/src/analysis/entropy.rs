//! crates/dm_algo/src/analysis/entropy.rs
//! Joint-occupancy entropy between two plans on the same vertices.

use dm_core::{CoreError, CoreResult, Snapshot};

/// `P[a][b]` = share of a district's worth of vertices labelled `a` in the first plan
/// and `b` in the second, i.e. each vertex adds `k / |V|`. Returns `Σ P·ln(1/P)`.
/// Identical plans score 0.
pub fn partition_entropy(a: &Snapshot, b: &Snapshot, k: u32) -> CoreResult<f64> {
    if a.len() != b.len() {
        return Err(CoreError::invalid(format!(
            "plans cover {} and {} vertices",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() || k == 0 {
        return Err(CoreError::invalid("entropy needs non-empty plans and k >= 1"));
    }
    let k = k as usize;
    if a.num_districts() as usize > k || b.num_districts() as usize > k {
        return Err(CoreError::invalid(format!("plan labels exceed k = {k}")));
    }

    let unit = k as f64 / a.len() as f64;
    let mut p = vec![0.0f64; k * k];
    for (&x, &y) in a.labels().iter().zip(b.labels()) {
        p[x as usize * k + y as usize] += unit;
    }
    Ok(p.into_iter()
        .filter(|&q| q > 1e-12)
        .map(|q| q * (1.0 / q).ln())
        .sum())
}
