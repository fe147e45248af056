//! Tests for the k-way merge-join over sharded, sorted table streams.
//!
//! The key properties verified:
//!
//! 1. Completeness - every entity key present in at least one table appears
//!    in exactly one emitted bundle, with exactly its own rows
//! 2. Ordering - emitted keys are strictly increasing
//! 3. Shard-relative keys - shard order dominates entity-id magnitude

use dossier_rs::model::fields;
use dossier_rs::test_support::{
    generate_dataset, partial_work_record, period_record, training_record, VecSource,
};
use dossier_rs::{EntityBundle, EntityKey, MergeJoin, Result, ShardPattern, Table};

fn run_all(source: &VecSource, tables: &[Table]) -> Vec<EntityBundle> {
    MergeJoin::run(source, tables, ShardPattern::default())
        .collect::<Result<Vec<_>>>()
        .expect("clean run")
}

#[test]
fn every_entity_appears_exactly_once() {
    let shards = ["Reg01", "Reg05", "Reg21"];
    let (source, expected_keys) = generate_dataset(&shards, 60, 42);

    let bundles = run_all(
        &source,
        &[Table::Periods, Table::PartialWork, Table::JobChanges],
    );
    let emitted: Vec<EntityKey> = bundles.iter().map(EntityBundle::key).collect();
    assert_eq!(emitted, expected_keys);
}

#[test]
fn emitted_keys_strictly_increase() {
    let (source, _) = generate_dataset(&["Reg02", "Reg11"], 80, 7);
    let bundles = run_all(
        &source,
        &[Table::Periods, Table::PartialWork, Table::JobChanges],
    );
    for pair in bundles.windows(2) {
        assert!(pair[0].key() < pair[1].key());
    }
}

#[test]
fn bundles_hold_exactly_their_rows() {
    let mut source = VecSource::new();
    let periods = "/data/Reg01/periods.csv";
    let partial = "/data/Reg01/partial_work.csv";
    source.push(
        Table::Periods,
        period_record(periods, 3, "2015-01-01", Some("2015-02-01"), "1"),
    );
    source.push(
        Table::Periods,
        period_record(periods, 3, "2015-03-01", Some("2015-04-01"), "2"),
    );
    source.push(
        Table::Periods,
        period_record(periods, 8, "2015-01-15", None, "1"),
    );
    source.push(Table::PartialWork, partial_work_record(partial, 8, "2015-02-10"));

    let bundles = run_all(&source, &[Table::Periods, Table::PartialWork]);
    assert_eq!(bundles.len(), 2);

    let first = &bundles[0];
    assert_eq!(first.key(), EntityKey::new("Reg01", 3));
    assert_eq!(first.table(Table::Periods).unwrap().len(), 2);
    assert!(first.table(Table::PartialWork).unwrap().is_empty());

    let second = &bundles[1];
    assert_eq!(second.key(), EntityKey::new("Reg01", 8));
    assert_eq!(second.table(Table::Periods).unwrap().len(), 1);
    assert_eq!(second.table(Table::PartialWork).unwrap().len(), 1);
    for row in second.table(Table::Periods).unwrap() {
        assert_eq!(row.text_field(fields::ENTITY_ID).unwrap(), "8");
    }
}

#[test]
fn shard_order_dominates_entity_id() {
    let mut source = VecSource::new();
    source.push(
        Table::Periods,
        period_record("/data/Reg01/periods.csv", 15, "2015-01-01", None, "1"),
    );
    source.push(
        Table::Trainings,
        training_record("/data/Reg21/trainings.csv", 2, "2015-06-01", None),
    );

    let bundles = run_all(&source, &[Table::Periods, Table::Trainings]);
    let keys: Vec<EntityKey> = bundles.iter().map(EntityBundle::key).collect();
    assert_eq!(
        keys,
        vec![EntityKey::new("Reg01", 15), EntityKey::new("Reg21", 2)]
    );
}

#[test]
fn float_encoded_identifiers_group_with_plain_ones() {
    let mut source = VecSource::new();
    let origin = "/data/Reg01/periods.csv";
    let plain = period_record(origin, 47, "2015-01-01", Some("2015-02-01"), "1");
    let float_encoded = period_record(origin, 47, "2015-03-01", Some("2015-04-01"), "1")
        .with_field(fields::ENTITY_ID, dossier_rs::Value::Text("47.0".into()));
    source.push(Table::Periods, plain);
    source.push(Table::Periods, float_encoded);

    let bundles = run_all(&source, &[Table::Periods]);
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].table(Table::Periods).unwrap().len(), 2);
}

#[test]
fn empty_request_and_empty_tables() {
    let source = VecSource::new();
    assert!(run_all(&source, &[Table::Periods, Table::Trainings]).is_empty());
    assert!(run_all(&source, &[]).is_empty());
}

#[test]
fn malformed_record_surfaces_and_stops() {
    let mut source = VecSource::new();
    source.push(
        Table::Periods,
        period_record("/data/Reg01/periods.csv", 1, "2015-01-01", None, "1"),
    );
    let bad = dossier_rs::Record::new("/data/Reg01/periods.csv")
        .with_field(fields::ENTITY_ID, dossier_rs::Value::Text("not-an-id".into()));
    source.push(Table::Periods, bad);

    let mut join = MergeJoin::run(&source, &[Table::Periods], ShardPattern::default());
    assert!(join.next().unwrap().is_ok());
    let err = join.next().unwrap().unwrap_err();
    assert!(err.to_string().contains("periods"));
    assert!(join.next().is_none());
}
