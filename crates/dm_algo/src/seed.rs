//! crates/dm_algo/src/seed.rs
//! Seed districtings: rectangular block tiling for square grids, randomized region
//! growth with swap repair for arbitrary connected graphs.
//!
//! Contract:
//! - Block tiling searches `across = ceil(sqrt(k))` down to 1 for a factorization
//!   `k = across · down` whose blocks evenly divide the grid side.
//! - Region growth requires `|V| % k == 0` and a connected graph. Every attempt is
//!   bounded by a round budget; a round with no change is a dead end. Exhausting
//!   `max_attempts` surfaces `Unsatisfiable` instead of looping.
//!
//! Determinism:
//! - Grid tiling is pure. Region growth draws only from the supplied `ChainRng`.

use dm_core::{
    graph::{is_connected, is_connected_subset},
    AdjacencyGraph, ChainRng, CoreError, CoreResult, Districting, Graph, GridGraph,
    GrowthParams, Label, VertexId,
};

/* ---------------------------------- Block tiling ---------------------------------- */

/// `(across, down)` block counts for `k` districts on a `side × side` grid.
pub fn block_tiling(side: usize, k: u32) -> CoreResult<(usize, usize)> {
    let k = k as usize;
    if k == 0 {
        return Err(CoreError::invalid("number of districts must be >= 1"));
    }
    if k > side * side {
        return Err(CoreError::invalid(format!(
            "{k} districts exceed {} vertices",
            side * side
        )));
    }
    let mut across = ceil_sqrt(k);
    while across > 0 {
        if k % across == 0 {
            let down = k / across;
            if side % across == 0 && side % down == 0 {
                return Ok((across, down));
            }
        }
        across -= 1;
    }
    Err(CoreError::unsatisfiable(format!(
        "no block tiling of a {side}x{side} grid into {k} districts"
    )))
}

/// Block-layout seed: block index = `block_row · across + block_col`.
pub fn block_districting(grid: &GridGraph, k: u32) -> CoreResult<Districting> {
    let side = grid.side();
    let (across, down) = block_tiling(side, k)?;
    let block_width = side / across;
    let block_height = side / down;
    let labels = (0..grid.vertex_count())
        .map(|v| {
            let (row, col) = grid.coords(v);
            ((row / block_height) * across + col / block_width) as Label
        })
        .collect();
    Districting::new(labels, k)
}

fn ceil_sqrt(k: usize) -> usize {
    let mut r = (k as f64).sqrt() as usize;
    while r * r < k {
        r += 1;
    }
    while r > 1 && (r - 1) * (r - 1) >= k {
        r -= 1;
    }
    r
}

/* --------------------------------- Region growth ---------------------------------- */

/// Grow `k` equal-size contiguous regions from random seed vertices.
pub fn region_growth(
    graph: &AdjacencyGraph,
    k: u32,
    params: &GrowthParams,
    rng: &mut ChainRng,
) -> CoreResult<Districting> {
    let n = graph.vertex_count();
    if k == 0 {
        return Err(CoreError::invalid("number of districts must be >= 1"));
    }
    if k as usize > n {
        return Err(CoreError::invalid(format!("{k} districts exceed {n} vertices")));
    }
    if n % k as usize != 0 {
        return Err(CoreError::invalid(format!(
            "{n} vertices are not divisible into {k} districts"
        )));
    }
    if !is_connected(graph) {
        return Err(CoreError::invalid("graph is not connected"));
    }

    let rounds = params.rounds_for(n);
    for attempt in 1..=params.max_attempts {
        match grow_once(graph, k as usize, rounds, rng) {
            Some(labels) => {
                tracing::debug!(attempt, "region growth completed");
                return Districting::new(labels, k);
            }
            None => tracing::warn!(attempt, max = params.max_attempts, "region growth dead end, reseeding"),
        }
    }
    Err(CoreError::unsatisfiable(format!(
        "region growth found no {k}-district seed within {} attempts",
        params.max_attempts
    )))
}

fn grow_once(
    graph: &AdjacencyGraph,
    k: usize,
    rounds: usize,
    rng: &mut ChainRng,
) -> Option<Vec<Label>> {
    let n = graph.vertex_count();
    let target = n / k;

    let mut order: Vec<VertexId> = (0..n).collect();
    rng.shuffle_in_place(&mut order);

    let mut labels: Vec<Option<Label>> = vec![None; n];
    let mut members: Vec<Vec<VertexId>> = Vec::with_capacity(k);
    for (d, &v) in order.iter().take(k).enumerate() {
        labels[v] = Some(d as Label);
        members.push(vec![v]);
    }
    let mut stuck = vec![false; k];
    let mut assigned = k;

    for _ in 0..rounds {
        if assigned == n {
            break;
        }
        let mut changed = false;
        for d in 0..k {
            if members[d].len() >= target {
                stuck[d] = false;
                continue;
            }
            if let Some(v) = first_unclaimed_neighbor(graph, &labels, &members[d]) {
                stuck[d] = false;
                labels[v] = Some(d as Label);
                members[d].push(v);
                assigned += 1;
                changed = true;
                continue;
            }
            stuck[d] = true;
            if let Some((v, donor)) = steal_candidate(graph, &labels, &members, &stuck, d) {
                members[donor].retain(|&m| m != v);
                members[d].push(v);
                labels[v] = Some(d as Label);
                changed = true;
            }
        }
        if !changed {
            return None;
        }
    }

    if assigned != n {
        return None;
    }
    labels.into_iter().collect()
}

fn first_unclaimed_neighbor(
    graph: &AdjacencyGraph,
    labels: &[Option<Label>],
    region: &[VertexId],
) -> Option<VertexId> {
    region
        .iter()
        .flat_map(|&m| graph.neighbors(m))
        .find(|&w| labels[w].is_none())
}

/// A boundary vertex of a non-stuck neighboring region whose removal keeps that
/// region non-empty and contiguous.
fn steal_candidate(
    graph: &AdjacencyGraph,
    labels: &[Option<Label>],
    members: &[Vec<VertexId>],
    stuck: &[bool],
    d: usize,
) -> Option<(VertexId, usize)> {
    for &m in &members[d] {
        for w in graph.neighbors(m) {
            let Some(l) = labels[w] else { continue };
            let donor = l as usize;
            if donor == d || stuck[donor] || members[donor].len() < 2 {
                continue;
            }
            let rest: Vec<VertexId> = members[donor].iter().copied().filter(|&x| x != w).collect();
            if is_connected_subset(graph, &rest) {
                return Some((w, donor));
            }
        }
    }
    None
}
