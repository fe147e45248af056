//! # Data Model
//!
//! Flat administrative records, the shard-aware composite entity key, and the
//! per-entity bundle produced by the merge-join.
//!
//! Records arrive from a small, fixed set of named tables. Field names and
//! their meaning are table-specific; the merge-join layer only ever reads the
//! entity identifier and the record's origin, everything else stays opaque
//! until the history layer interprets it.

use crate::error::{DossierError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

/// ISO calendar-date layout used everywhere a date travels as a string.
pub const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Well-known field names shared by the source tables.
pub mod fields {
    /// Entity identifier, present in every table.
    pub const ENTITY_ID: &str = "entity_id";

    // Registration periods table.
    pub const REGISTRATION_DATE: &str = "registration_date";
    pub const CANCELLATION_DATE: &str = "cancellation_date";
    pub const REGISTRATION_REASON: &str = "registration_reason";
    pub const CANCELLATION_REASON: &str = "cancellation_reason";
    pub const CATEGORY: &str = "category";
    pub const JOB_CODE: &str = "job_code";
    pub const CITY: &str = "city";
    pub const REGION: &str = "region";
    pub const QUALIFICATION: &str = "qualification";

    // Partial-work months table.
    pub const MONTH: &str = "month";
    pub const HOURS_WORKED: &str = "hours_worked";

    // Job-group change table.
    pub const VALIDITY_START: &str = "validity_start";
    pub const VALIDITY_END: &str = "validity_end";

    // Trainings table.
    pub const TRAINING_START: &str = "training_start";
    pub const TRAINING_END: &str = "training_end";
}

/// Parse a calendar date from its ISO `YYYY-MM-DD` string form.
pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), DATE_FORMAT).ok()
}

/// Parse an entity identifier, tolerating numeric-with-decimal encodings.
///
/// Some upstream exports render integer identifiers as floats (`"47.0"`);
/// those are truncated to the integer part. Anything that is not a plain
/// non-negative number is rejected.
pub fn parse_entity_id(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (trimmed, ""),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    int_part.parse().ok()
}

/// A single field value: free text, a calendar date, or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Date(Date),
    Number(f64),
}

impl Value {
    /// Borrow the text content, if this value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Coerce this value to a calendar date.
    ///
    /// Dates pass through; text is parsed as ISO `YYYY-MM-DD`.
    pub fn coerce_date(&self) -> Option<Date> {
        match self {
            Value::Date(date) => Some(*date),
            Value::Text(text) => parse_date(text),
            Value::Number(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "{text}"),
            Value::Date(date) => write!(f, "{date}"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9e15 => {
                write!(f, "{}", *n as i64)
            }
            Value::Number(n) => write!(f, "{n}"),
        }
    }
}

/// An immutable mapping from field name to value, plus the origin (shard file
/// path or URI) the record was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    origin: String,
    fields: FxHashMap<String, Value>,
}

impl Record {
    /// Create an empty record with the given origin.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            fields: FxHashMap::default(),
        }
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// The origin identifier this record was read from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Raw field access.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn remove_field(&mut self, name: &str) {
        self.fields.remove(name);
    }

    /// Copy one field from another record, removing it here if absent there.
    pub fn copy_field_from(&mut self, other: &Record, name: &str) {
        match other.field(name) {
            Some(value) => self.set_field(name, value.clone()),
            None => self.remove_field(name),
        }
    }

    /// A required field rendered as text.
    pub fn text_field(&self, name: &str) -> Result<String> {
        let value = self.field(name).ok_or_else(|| DossierError::MissingField {
            field: name.to_string(),
        })?;
        Ok(value.to_string())
    }

    /// A required calendar-date field, coercing ISO text.
    pub fn date_field(&self, name: &str) -> Result<Date> {
        let value = self.field(name).ok_or_else(|| DossierError::MissingField {
            field: name.to_string(),
        })?;
        value.coerce_date().ok_or_else(|| DossierError::DateParse {
            field: name.to_string(),
            value: value.to_string(),
        })
    }

    /// An optional calendar-date field. Absent fields and blank text read as
    /// `None`; present but unparseable values are still an error.
    pub fn opt_date_field(&self, name: &str) -> Result<Option<Date>> {
        match self.field(name) {
            None => Ok(None),
            Some(Value::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(value) => value
                .coerce_date()
                .map(Some)
                .ok_or_else(|| DossierError::DateParse {
                    field: name.to_string(),
                    value: value.to_string(),
                }),
        }
    }
}

/// The fixed set of source tables the merge-join understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    /// Registration/cancellation periods, one row per registration spell.
    Periods,
    /// Months in which the person worked while registered.
    PartialWork,
    /// Job-group changes with their validity window.
    JobChanges,
    /// Vocational trainings.
    Trainings,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Periods,
        Table::PartialWork,
        Table::JobChanges,
        Table::Trainings,
    ];

    /// Wire name of the table, as the record source knows it.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Periods => "periods",
            Table::PartialWork => "partial_work",
            Table::JobChanges => "job_changes",
            Table::Trainings => "trainings",
        }
    }

    /// The table's own chronological field, used once per bundle to sort its
    /// rows into event order.
    pub fn sort_field(&self) -> &'static str {
        match self {
            Table::Periods => fields::REGISTRATION_DATE,
            Table::PartialWork => fields::MONTH,
            Table::JobChanges => fields::VALIDITY_END,
            Table::Trainings => fields::TRAINING_START,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extraction rule deriving the shard identifier from a record origin.
///
/// Shard files carry their shard name in the path as a fixed prefix followed
/// by a digit run (e.g. `Reg01` inside `/data/Reg01/periods.csv`). The first
/// such match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardPattern {
    prefix: String,
}

impl ShardPattern {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Extract the shard identifier from an origin, or `None` if the origin
    /// does not contain the pattern.
    pub fn extract(&self, origin: &str) -> Option<String> {
        for (idx, _) in origin.match_indices(&self.prefix) {
            let rest = &origin[idx + self.prefix.len()..];
            let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
            if digits > 0 {
                return Some(origin[idx..idx + self.prefix.len() + digits].to_string());
            }
        }
        None
    }
}

impl Default for ShardPattern {
    fn default() -> Self {
        Self::new("Reg")
    }
}

/// Composite, shard-relative ordering key.
///
/// Entity identifiers are only unique within a shard, so the key orders by
/// shard first (lexicographically, which matches the sorted order sources
/// discover shard files in), then by entity id. The derived `Ord` encodes
/// exactly that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub shard: String,
    pub entity_id: u64,
}

impl EntityKey {
    pub fn new(shard: impl Into<String>, entity_id: u64) -> Self {
        Self {
            shard: shard.into(),
            entity_id,
        }
    }

    /// Stable cross-shard identifier for downstream output rows.
    pub fn entity_ref(&self) -> String {
        format!("{}_{}", self.entity_id, self.shard)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.shard, self.entity_id)
    }
}

/// Derive the [`EntityKey`] of a record, regardless of which table it came
/// from. Two records for the same logical entity always compare equal.
pub fn entity_key(record: &Record, pattern: &ShardPattern, table: Table) -> Result<EntityKey> {
    let shard = pattern
        .extract(record.origin())
        .ok_or_else(|| DossierError::MalformedKey {
            table,
            origin: record.origin().to_string(),
            detail: format!("origin does not match shard pattern {:?}*", pattern.prefix()),
        })?;
    let raw = record
        .field(fields::ENTITY_ID)
        .ok_or_else(|| DossierError::MalformedKey {
            table,
            origin: record.origin().to_string(),
            detail: format!("missing {} field", fields::ENTITY_ID),
        })?;
    let entity_id =
        parse_entity_id(&raw.to_string()).ok_or_else(|| DossierError::MalformedKey {
            table,
            origin: record.origin().to_string(),
            detail: format!("unparseable entity id {raw:?}"),
        })?;
    Ok(EntityKey { shard, entity_id })
}

/// All rows belonging to one entity, grouped by table.
///
/// Created once per distinct [`EntityKey`] the merge-join encounters. A table
/// that was requested but holds no rows for the entity maps to an empty list;
/// a table that was never requested is absent and reads as
/// [`DossierError::MissingTable`].
#[derive(Debug, Clone)]
pub struct EntityBundle {
    pub entity_id: u64,
    pub shard: String,
    tables: FxHashMap<Table, Vec<Record>>,
}

impl EntityBundle {
    pub(crate) fn new(key: EntityKey, tables: FxHashMap<Table, Vec<Record>>) -> Self {
        Self {
            entity_id: key.entity_id,
            shard: key.shard,
            tables,
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey {
            shard: self.shard.clone(),
            entity_id: self.entity_id,
        }
    }

    /// Stable cross-shard identifier, `"{entity_id}_{shard}"`.
    pub fn entity_ref(&self) -> String {
        self.key().entity_ref()
    }

    /// Rows of one table; errors if the table was not requested for the run.
    pub fn table(&self, table: Table) -> Result<&[Record]> {
        self.tables
            .get(&table)
            .map(Vec::as_slice)
            .ok_or(DossierError::MissingTable(table))
    }

    pub fn has_table(&self, table: Table) -> bool {
        self.tables.contains_key(&table)
    }

    /// Sort each table's rows by that table's own chronological field.
    ///
    /// Rows whose sort field is missing or unparseable sort first; the error
    /// surfaces later, when the field is actually read.
    pub(crate) fn sort_chronologically(&mut self) {
        for (table, rows) in self.tables.iter_mut() {
            let field = table.sort_field();
            rows.sort_by_key(|record| record.field(field).and_then(Value::coerce_date));
        }
    }
}
