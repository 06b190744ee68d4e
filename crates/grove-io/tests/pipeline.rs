//! End-to-end integration tests: CSV -> table -> cross-validation.

use std::fmt::Write as _;
use std::fs;

use grove_comm::{LocalGroup, SoloGroup};
use grove_io::TableReader;
use grove_rf::{CrossValidation, RandomForestParams, SeedSource};
use tempfile::TempDir;

/// Write a 100-row table: two features and a label split at x = 5.
fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
    let mut csv = String::from("x,noise,label\n");
    for i in 0..100 {
        let x = (i % 10) as f64;
        let label = u8::from(x >= 5.0);
        writeln!(csv, "{x},{},{label}", (i * 3) % 7).unwrap();
    }
    let path = dir.path().join("banded.csv");
    fs::write(&path, csv).unwrap();
    path
}

#[test]
fn csv_to_cross_validation() {
    let dir = TempDir::new().unwrap();
    let table = TableReader::new(&write_fixture(&dir)).read().unwrap();
    assert_eq!(table.rows(), 100);
    assert_eq!(table.n_features(), 2);

    let params = RandomForestParams::new(5)
        .unwrap()
        .with_min_samples_leaf(1)
        .unwrap();
    let result = CrossValidation::new(5)
        .unwrap()
        .evaluate(&SoloGroup, &table, &params, &mut SeedSource::new(42))
        .unwrap();

    assert_eq!(result.fold_accuracies.len(), 5);
    assert!((0.0..=1.0).contains(&result.mean_accuracy));
}

#[test]
fn broadcast_table_matches_loaded_table() {
    use grove_comm::{Communicator, Rank};

    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let tables = LocalGroup::new(3)
        .unwrap()
        .run(|comm| {
            let loaded = comm
                .rank()
                .is_root()
                .then(|| TableReader::new(&path).with_dimensions(40, 3).read().unwrap());
            comm.broadcast(Rank::ROOT, loaded).unwrap()
        })
        .unwrap();

    assert_eq!(tables[0].rows(), 40);
    assert_eq!(tables[0], tables[1]);
    assert_eq!(tables[1], tables[2]);
}
