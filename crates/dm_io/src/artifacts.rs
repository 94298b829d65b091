//! crates/dm_io/src/artifacts.rs
//! CSV artifacts, read and written through the `csv` crate.
//!
//! - Ensemble: one row per districting, one column per vertex, no header.
//! - Voter samples: header `target,energy,v0,v1,…`, then one row per sample with
//!   spins as `-1`/`1`.
//! - Seat points: header `proportion,energy,expected_seats`.
//! - Edge lists (input only): header `source,target`, one undirected edge per row.
//!
//! Every file is written atomically.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

use dm_core::{AdjacencyGraph, Label, Snapshot, VertexId, VoterConfig};

use crate::canonical_json::write_atomic;
use crate::{IoError, IoResult};

/* ----------------------------------- Ensembles ----------------------------------- */

pub fn ensemble_csv<'a, I>(plans: I) -> IoResult<Vec<u8>>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for plan in plans {
        wtr.write_record(plan.labels().iter().map(Label::to_string))?;
    }
    finish(wtr)
}

pub fn write_ensemble_csv<'a, I>(path: &Path, plans: I) -> IoResult<()>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    write_atomic(path, &ensemble_csv(plans)?)
}

/// Parse an ensemble CSV. Blank lines are skipped; all rows must share one width.
pub fn parse_ensemble_csv(text: &str) -> IoResult<Vec<Snapshot>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let mut plans = Vec::new();
    for record in rdr.records() {
        plans.push(Snapshot::from(parse_labels(&record?)?));
    }
    Ok(plans)
}

pub fn read_ensemble_csv(path: &Path) -> IoResult<Vec<Snapshot>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    parse_ensemble_csv(&text)
}

fn parse_labels(record: &StringRecord) -> IoResult<Vec<Label>> {
    let line = record.position().map_or(0, |p| p.line() as usize);
    record
        .iter()
        .map(|cell| {
            cell.parse::<Label>().map_err(|e| IoError::Csv {
                line,
                msg: format!("bad label {cell:?}: {e}"),
            })
        })
        .collect()
}

/* --------------------------------- Voter samples --------------------------------- */

#[derive(Debug, Clone, Copy)]
pub struct SampleRow<'a> {
    pub target: f64,
    pub energy: f64,
    pub config: &'a VoterConfig,
}

pub fn samples_csv(rows: &[SampleRow<'_>]) -> IoResult<Vec<u8>> {
    if let Some(first) = rows.first() {
        if rows.iter().any(|r| r.config.len() != first.config.len()) {
            return Err(IoError::Invalid("voter samples differ in vertex count".into()));
        }
    }
    let width = rows.first().map_or(0, |r| r.config.len());
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(Vec::new());

    let mut header = StringRecord::from(vec!["target", "energy"]);
    for v in 0..width {
        header.push_field(&format!("v{v}"));
    }
    wtr.write_record(&header)?;

    for r in rows {
        let mut record = StringRecord::with_capacity(16 * (width + 2), width + 2);
        record.push_field(&r.target.to_string());
        record.push_field(&r.energy.to_string());
        for s in r.config.spins() {
            record.push_field(&s.value().to_string());
        }
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

pub fn write_samples_csv(path: &Path, rows: &[SampleRow<'_>]) -> IoResult<()> {
    write_atomic(path, &samples_csv(rows)?)
}

/* ---------------------------------- Seat points ---------------------------------- */

#[derive(Debug, Serialize)]
struct SeatPointRow {
    proportion: f64,
    energy: f64,
    expected_seats: f64,
}

/// Rows of `(proportion, energy, expected_seats)`.
pub fn write_seat_points_csv<I>(path: &Path, points: I) -> IoResult<()>
where
    I: IntoIterator<Item = (f64, f64, f64)>,
{
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    for (proportion, energy, expected_seats) in points {
        wtr.serialize(SeatPointRow { proportion, energy, expected_seats })?;
    }
    let mut bytes = finish(wtr)?;
    // An empty sweep still gets its header.
    if bytes.is_empty() {
        bytes.extend_from_slice(b"proportion,energy,expected_seats\n");
    }
    write_atomic(path, &bytes)
}

/* ----------------------------------- Edge lists ---------------------------------- */

#[derive(Debug, Deserialize)]
struct EdgeRow {
    source: VertexId,
    target: VertexId,
}

/// Parse a `source,target` edge list into a graph on vertices `0..=max endpoint`.
pub fn parse_edge_list_csv(text: &str) -> IoResult<AdjacencyGraph> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let mut edges = Vec::new();
    for row in rdr.deserialize::<EdgeRow>() {
        let row = row?;
        edges.push((row.source, row.target));
    }
    let Some(max) = edges.iter().map(|&(a, b)| a.max(b)).max() else {
        return Err(IoError::Invalid("edge list has no edges".into()));
    };
    Ok(AdjacencyGraph::from_edges(max + 1, &edges)?)
}

pub fn read_edge_list_csv(path: &Path) -> IoResult<AdjacencyGraph> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    parse_edge_list_csv(&text)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> IoResult<Vec<u8>> {
    wtr.into_inner().map_err(|e| IoError::Path(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_core::{Graph, Spin};
    use std::fs;

    #[test]
    fn ensemble_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ensemble.csv");
        let plans = vec![Snapshot::from(vec![0, 0, 1, 1]), Snapshot::from(vec![0, 1, 1, 0])];
        write_ensemble_csv(&path, &plans).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "0,0,1,1\n0,1,1,0\n");
        assert_eq!(read_ensemble_csv(&path).unwrap(), plans);
    }

    #[test]
    fn ragged_or_garbled_rows_are_rejected() {
        assert!(matches!(parse_ensemble_csv("0,1\n0,1,2\n"), Err(IoError::Csv { .. })));
        assert!(matches!(parse_ensemble_csv("0,x\n"), Err(IoError::Csv { line: 1, .. })));
        assert!(matches!(parse_ensemble_csv("0,1\n1,y\n"), Err(IoError::Csv { line: 2, .. })));
        assert!(parse_ensemble_csv("\n\n").unwrap().is_empty());
    }

    #[test]
    fn padded_cells_are_trimmed() {
        let plans = parse_ensemble_csv(" 0, 1 \n1 ,0\n").unwrap();
        assert_eq!(plans, vec![Snapshot::from(vec![0, 1]), Snapshot::from(vec![1, 0])]);
    }

    #[test]
    fn samples_have_header_and_signed_spins() {
        let c = VoterConfig::new(vec![Spin::Minority, Spin::Majority]);
        let rows = [SampleRow { target: 0.5, energy: 0.25, config: &c }];
        assert_eq!(samples_csv(&rows).unwrap(), b"target,energy,v0,v1\n0.5,0.25,-1,1\n");
    }

    #[test]
    fn samples_of_mixed_width_are_invalid() {
        let a = VoterConfig::new(vec![Spin::Minority, Spin::Majority]);
        let b = VoterConfig::new(vec![Spin::Minority]);
        let rows = [
            SampleRow { target: 0.0, energy: 0.0, config: &a },
            SampleRow { target: 0.0, energy: 0.0, config: &b },
        ];
        assert!(matches!(samples_csv(&rows), Err(IoError::Invalid(_))));
    }

    #[test]
    fn seat_points_written_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seats.csv");
        write_seat_points_csv(&path, vec![(0.2, 0.5, 1.25)]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "proportion,energy,expected_seats\n0.2,0.5,1.25\n"
        );
        write_seat_points_csv(&path, Vec::new()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "proportion,energy,expected_seats\n");
    }

    #[test]
    fn edge_list_builds_a_graph() {
        let g = parse_edge_list_csv("source,target\n0,1\n1, 2\n2,3\n3,0\n").unwrap();
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.edge_count(), 4);
        assert!(g.neighbors(0).any(|w| w == 3));
    }

    #[test]
    fn bad_edge_lists_are_rejected() {
        assert!(matches!(parse_edge_list_csv("source,target\n"), Err(IoError::Invalid(_))));
        assert!(matches!(parse_edge_list_csv("source,target\n0,0\n"), Err(IoError::Invalid(_))));
        assert!(matches!(
            parse_edge_list_csv("source,target\n0,1\n1,z\n"),
            Err(IoError::Csv { line: 3, .. })
        ));
    }
}
