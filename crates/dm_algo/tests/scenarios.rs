//! End-to-end scenarios: grid → seed → ensemble → Ising → seats / entropy / metagraph.

use dm_algo::analysis::{expected_minority_seat_shares, partition_entropy, seat_sweep, MetaGraph};
use dm_algo::ising::{collect_configurations, IsingSimulation};
use dm_algo::{block_districting, generate_ensemble, region_growth, DistrictSubgraph};
use dm_core::{
    AdjacencyGraph, AdjacencyKind, ChainRng, CoreError, EnergyKind, EnsembleParams, Graph,
    GridGraph, GrowthParams, IsingParams, SamplingPlan,
};

#[test]
fn four_by_four_block_seed() {
    let grid = GridGraph::new(4, AdjacencyKind::Rook).unwrap();
    let adj = grid.to_adjacency();
    let seed = block_districting(&grid, 4).unwrap();
    let mut sub = DistrictSubgraph::from_scratch(&adj, &seed).unwrap();
    assert_eq!(sub.count_connected_components(), 4);
    assert_eq!(seed.sizes(), vec![4, 4, 4, 4]);
}

#[test]
fn gamma_energy_is_minority_pair_count() {
    let grid = GridGraph::new(4, AdjacencyKind::Rook).unwrap();
    let params = IsingParams {
        minority_proportion: 0.25,
        energy: EnergyKind::Gamma,
        temperature: 0.25,
    };
    let sim = IsingSimulation::new(&grid, &params, ChainRng::from_seed_u64(2024)).unwrap();
    let c = sim.config();
    let pairs = grid
        .edges()
        .into_iter()
        .filter(|&(u, v)| c.is_minority(u) && c.is_minority(v))
        .count();
    assert_eq!(c.minority_count(), 4);
    assert_eq!(sim.energy(), pairs as f64);
}

#[test]
fn singleton_districts_terminate_with_degenerate_chain() {
    let grid = GridGraph::new(2, AdjacencyKind::Rook).unwrap();
    let adj = grid.to_adjacency();
    let seed = block_districting(&grid, 4).unwrap();
    let params = EnsembleParams { num_districts: 4, ensemble_size: 5, ..EnsembleParams::default() };
    let err = generate_ensemble(&adj, seed, &params, ChainRng::from_seed_u64(0)).unwrap_err();
    assert!(matches!(err, CoreError::DegenerateChain(ref m) if m == "no further moves"));
}

#[test]
fn region_grown_seed_feeds_the_chain() {
    // 2 x 6 ladder, three districts of four.
    let mut edges = Vec::new();
    for c in 0..6 {
        edges.push((c, c + 6));
        if c + 1 < 6 {
            edges.push((c, c + 1));
            edges.push((c + 6, c + 7));
        }
    }
    let g = AdjacencyGraph::from_edges(12, &edges).unwrap();
    let mut rng = ChainRng::from_seed_u64(17);
    let growth = GrowthParams { max_attempts: 64, round_budget: None };
    let seed = region_growth(&g, 3, &growth, &mut rng).unwrap();
    assert!(seed.validate(&g, 4, 0).is_ok());
    let params = EnsembleParams { num_districts: 3, ensemble_size: 30, ..EnsembleParams::default() };
    let (ens, _) = generate_ensemble(&g, seed, &params, rng).unwrap();
    assert_eq!(ens.len(), 30);
}

#[test]
fn ensemble_to_expected_seats() {
    let grid = GridGraph::new(6, AdjacencyKind::Rook).unwrap();
    let adj = grid.to_adjacency();
    let params = EnsembleParams { num_districts: 4, ensemble_size: 60, ..EnsembleParams::default() };
    let seed = block_districting(&grid, 4).unwrap();
    let (ens, _) = generate_ensemble(&adj, seed, &params, ChainRng::from_seed_u64(11)).unwrap();
    let plans = ens.thinned(5).unwrap();
    assert_eq!(plans.len(), 12);

    let ising = IsingParams {
        minority_proportion: 0.25,
        energy: EnergyKind::NormalizedGamma,
        temperature: 0.25,
    };
    let plan = SamplingPlan {
        targets: vec![0.0, 0.5, 1.0],
        warmup_steps: 50,
        samples_per_target: 4,
        steps_between_samples: 10,
    };
    let (configs, energies) =
        collect_configurations(&grid, &ising, &plan, ChainRng::from_seed_u64(5)).unwrap();
    assert_eq!(configs.len(), 12);
    assert_eq!(energies.len(), 12);

    let seats = expected_minority_seat_shares(&configs, &plans).unwrap();
    assert!(seats.iter().all(|&s| (0.0..=4.0).contains(&s)));

    let mut rng = ChainRng::from_seed_u64(99);
    let points = seat_sweep(&grid, &[0.2, 0.4], &ising, &plan, &plans, &mut rng).unwrap();
    assert_eq!(points.len(), 24);
    assert!(points[..12].iter().all(|p| p.proportion == 0.2));
}

#[test]
fn small_ensemble_metagraph_builds() {
    let grid = GridGraph::new(4, AdjacencyKind::Rook).unwrap();
    let adj = grid.to_adjacency();
    let params = EnsembleParams {
        num_districts: 2,
        ensemble_size: 40,
        unique: true,
        ..EnsembleParams::default()
    };
    let seed = block_districting(&grid, 2).unwrap();
    let (ens, _) = generate_ensemble(&adj, seed, &params, ChainRng::from_seed_u64(4)).unwrap();
    let plans = ens.into_vec();
    let first = plans[0].clone();
    for p in &plans {
        assert!(partition_entropy(&first, p, 2).unwrap() >= 0.0);
    }
    let meta = MetaGraph::build(plans).unwrap();
    assert!(meta.diameter().is_some());
}

#[test]
fn perturbed_votes_move_seats_and_distance_together() {
    use dm_algo::analysis::{
        vote_distance, vote_seat_share, DistanceMatrix, Perturbation, PrecinctVotes, VoteDistance,
        VoteGroups,
    };

    let grid = GridGraph::new(4, AdjacencyKind::Rook).unwrap();
    let adj = grid.to_adjacency();
    let seed = block_districting(&grid, 4).unwrap();
    let params = EnsembleParams { num_districts: 4, ensemble_size: 20, ..EnsembleParams::default() };
    let (ens, _) = generate_ensemble(&adj, seed, &params, ChainRng::from_seed_u64(6)).unwrap();

    let minority: Vec<f64> = (0..16).map(|v| if v < 8 { 70.0 } else { 30.0 }).collect();
    let majority: Vec<f64> = minority.iter().map(|m| 100.0 - m).collect();
    let votes = PrecinctVotes::new(minority, majority).unwrap();
    let shifted = votes
        .perturb(
            &Perturbation { minority_shift: 0.05, population_shift: 0.05 },
            &mut ChainRng::from_seed_u64(2),
        )
        .unwrap();

    let ground = DistanceMatrix::graph_distances(&grid).unwrap();
    let moved = vote_distance(&votes, &shifted, VoteDistance::EarthMovers(&ground), VoteGroups::Both).unwrap();
    assert!(moved > 0.0);
    assert_eq!(
        vote_distance(&votes, &votes, VoteDistance::SymmetricKl, VoteGroups::Both).unwrap(),
        0.0
    );

    for plan in ens.iter() {
        let before = vote_seat_share(&votes, plan).unwrap();
        let after = vote_seat_share(&shifted, plan).unwrap();
        assert!((0.0..=4.0).contains(&before) && (0.0..=4.0).contains(&after));
    }
}
