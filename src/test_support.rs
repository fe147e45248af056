//! Builders and in-memory sources for tests and benchmarks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use time::macros::date;
use time::{Date, Duration};

use crate::model::{fields, EntityKey, Record, Table, Value};
use crate::stream::{RecordIter, RecordSource};

/// In-memory [`RecordSource`] over per-table vectors.
///
/// Rows must be pushed in entity-key order; the source hands them out as-is.
/// A table with no rows opens as an empty sequence.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    tables: FxHashMap<Table, Vec<Record>>,
}

impl VecSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: Table, record: Record) {
        self.tables.entry(table).or_default().push(record);
    }
}

impl RecordSource for VecSource {
    fn open_table(&self, table: Table) -> RecordIter {
        let rows = self.tables.get(&table).cloned().unwrap_or_default();
        Box::new(rows.into_iter())
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

/// A registration-period row with a default job context.
pub fn period_record(
    origin: &str,
    entity: u64,
    begin: &str,
    end: Option<&str>,
    category: &str,
) -> Record {
    period_record_with_job(origin, entity, begin, end, category, "A0000", "Town")
}

/// A registration-period row with an explicit job code and city.
pub fn period_record_with_job(
    origin: &str,
    entity: u64,
    begin: &str,
    end: Option<&str>,
    category: &str,
    job_code: &str,
    city: &str,
) -> Record {
    let mut record = Record::new(origin)
        .with_field(fields::ENTITY_ID, text(&entity.to_string()))
        .with_field(fields::REGISTRATION_DATE, text(begin))
        .with_field(fields::REGISTRATION_REASON, text("initial"))
        .with_field(fields::CATEGORY, text(category))
        .with_field(fields::JOB_CODE, text(job_code))
        .with_field(fields::CITY, text(city))
        .with_field(fields::REGION, text("North"))
        .with_field(fields::QUALIFICATION, text("technician"));
    if let Some(end) = end {
        record.set_field(fields::CANCELLATION_DATE, text(end));
        record.set_field(fields::CANCELLATION_REASON, text("left"));
    }
    record
}

/// A partial-work row for the month containing `day`.
pub fn partial_work_record(origin: &str, entity: u64, day: &str) -> Record {
    Record::new(origin)
        .with_field(fields::ENTITY_ID, text(&entity.to_string()))
        .with_field(fields::MONTH, text(day))
        .with_field(fields::HOURS_WORKED, Value::Number(78.0))
}

/// A job-group-change row valid over `[begin, end)`.
pub fn job_change_record(
    origin: &str,
    entity: u64,
    begin: &str,
    end: Option<&str>,
    job_code: &str,
    city: &str,
) -> Record {
    let mut record = Record::new(origin)
        .with_field(fields::ENTITY_ID, text(&entity.to_string()))
        .with_field(fields::VALIDITY_START, text(begin))
        .with_field(fields::JOB_CODE, text(job_code))
        .with_field(fields::CITY, text(city))
        .with_field(fields::REGION, text("North"))
        .with_field(fields::QUALIFICATION, text("senior"));
    if let Some(end) = end {
        record.set_field(fields::VALIDITY_END, text(end));
    }
    record
}

/// A training row.
pub fn training_record(origin: &str, entity: u64, begin: &str, end: Option<&str>) -> Record {
    let mut record = Record::new(origin)
        .with_field(fields::ENTITY_ID, text(&entity.to_string()))
        .with_field(fields::TRAINING_START, text(begin));
    if let Some(end) = end {
        record.set_field(fields::TRAINING_END, text(end));
    }
    record
}

/// Generate a sorted multi-shard dataset for merge-join tests.
///
/// Shards must be given in ascending name order. Each entity lands in a
/// random subset of tables; entities that land nowhere are skipped entirely.
/// Returns the source plus the expected bundle keys in emission order.
pub fn generate_dataset(
    shards: &[&str],
    entities_per_shard: u64,
    seed: u64,
) -> (VecSource, Vec<EntityKey>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut source = VecSource::new();
    let mut keys = Vec::new();
    let base = date!(2015 - 01 - 01);

    for shard in shards {
        for entity in 1..=entities_per_shard {
            let mut present = false;

            if rng.random_bool(0.8) {
                present = true;
                let origin = format!("/data/{shard}/periods.csv");
                let mut cursor = base + Duration::days(rng.random_range(0..120));
                for _ in 0..rng.random_range(1..=2) {
                    let end = cursor + Duration::days(rng.random_range(10..90));
                    // Occasionally exercise the float-encoded identifier.
                    let raw_id = if rng.random_bool(0.2) {
                        format!("{entity}.0")
                    } else {
                        entity.to_string()
                    };
                    let record = period_record(&origin, entity, &iso(cursor), Some(&iso(end)), "1")
                        .with_field(fields::ENTITY_ID, text(&raw_id));
                    source.push(Table::Periods, record);
                    cursor = end + Duration::days(rng.random_range(5..40));
                }
            }
            if rng.random_bool(0.3) {
                present = true;
                let origin = format!("/data/{shard}/partial_work.csv");
                let day = base + Duration::days(rng.random_range(0..300));
                source.push(
                    Table::PartialWork,
                    partial_work_record(&origin, entity, &iso(day)),
                );
            }
            if rng.random_bool(0.25) {
                present = true;
                let origin = format!("/data/{shard}/job_changes.csv");
                let begin = base + Duration::days(rng.random_range(0..200));
                let end = begin + Duration::days(rng.random_range(10..60));
                source.push(
                    Table::JobChanges,
                    job_change_record(&origin, entity, &iso(begin), Some(&iso(end)), "B1111", "Town"),
                );
            }

            if present {
                keys.push(EntityKey::new(*shard, entity));
            }
        }
    }

    (source, keys)
}

/// Render a date in the ISO form the builders expect.
pub fn iso(day: Date) -> String {
    day.format(crate::model::DATE_FORMAT).expect("date formats")
}
