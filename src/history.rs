//! # History Module
//!
//! Career reconstruction policies over a single entity's bundle.
//!
//! An [`EntityHistory`] wraps one [`EntityBundle`] and answers questions
//! about the person's chronology by building [`IntervalSet`]s from the
//! bundle's rows and applying the algebra: category-filtered unemployment
//! periods, active-search periods with partial-work months carved out, the
//! registration state at a given date, job spells enriched with job-group
//! changes, and trainings enriched with the job context that preceded them.

use crate::error::{DossierError, Result};
use crate::model::{fields, EntityBundle, Record, Table, Value};
use crate::temporal::{cmp_by_end, month_bounds, touches, Interval, IntervalSet};
use serde::{Deserialize, Serialize};
use time::Date;

/// Synthetic reason codes stamped on boundaries the algebra creates.
pub mod reasons {
    /// A registration stretch was cut because a partial-work month started.
    pub const PARTIAL_WORK_STARTED: &str = "partial-work-started";
    /// Registration resumed after a partial-work month.
    pub const PARTIAL_WORK_ENDED: &str = "partial-work-ended";
    /// The period was still ongoing when the history was truncated at "now".
    pub const STILL_REGISTERED: &str = "still-registered";
}

/// Registration categories counted as primary unemployment.
pub const PRIMARY_CATEGORIES: [&str; 3] = ["1", "2", "3"];

/// The single category implying active job search.
pub const ACTIVE_SEARCH_CATEGORIES: [&str; 1] = ["1"];

/// One entity's bundle, normalized and ready for reconstruction queries.
#[derive(Debug, Clone)]
pub struct EntityHistory {
    bundle: EntityBundle,
}

impl EntityHistory {
    /// Wrap a bundle, sorting each table's rows by that table's own
    /// chronological field. Done once; the bundle never mutates afterwards.
    pub fn new(mut bundle: EntityBundle) -> Self {
        bundle.sort_chronologically();
        Self { bundle }
    }

    pub fn bundle(&self) -> &EntityBundle {
        &self.bundle
    }

    /// Stable cross-shard identifier, `"{entity_id}_{shard}"`.
    pub fn entity_ref(&self) -> String {
        self.bundle.entity_ref()
    }

    fn table(&self, table: Table) -> Result<&[Record]> {
        self.bundle.table(table)
    }

    /// Registration periods from the periods table, optionally merging
    /// near-adjacent periods whose gap is at most `merge_gap_days`.
    ///
    /// A negative gap disables hole-covering. Merged metadata keeps the
    /// earliest registration reason and the latest cancellation reason/date
    /// across the merged span.
    pub fn registration_periods(&self, merge_gap_days: i64) -> Result<IntervalSet<Record>> {
        self.build_periods(None, merge_gap_days)
    }

    /// Registration periods restricted to the given categories.
    pub fn category_filtered_periods(
        &self,
        categories: &[&str],
        merge_gap_days: i64,
    ) -> Result<IntervalSet<Record>> {
        self.build_periods(Some(categories), merge_gap_days)
    }

    /// Periods of category 1, 2 or 3 unemployment.
    pub fn primary_unemployment_periods(&self, merge_gap_days: i64) -> Result<IntervalSet<Record>> {
        self.category_filtered_periods(&PRIMARY_CATEGORIES, merge_gap_days)
    }

    /// Category-1 periods with every partial-work month carved out.
    ///
    /// Exclusion runs on the raw (un-merged) periods; hole-covering with
    /// `merge_gap_days` is applied only afterwards, so a partial-work month
    /// inside a merged span still leaves its hole when the gap exceeds the
    /// threshold.
    pub fn active_search_periods(&self, merge_gap_days: i64) -> Result<IntervalSet<Record>> {
        let mut periods = self.category_filtered_periods(&ACTIVE_SEARCH_CATEGORIES, -1)?;
        for record in self.table(Table::PartialWork)? {
            let month = record.date_field(fields::MONTH)?;
            let (from, to) = month_bounds(month);
            periods.exclude_period(
                from,
                to,
                |meta| stamp(meta, fields::CANCELLATION_REASON, reasons::PARTIAL_WORK_STARTED),
                |meta| stamp(meta, fields::REGISTRATION_REASON, reasons::PARTIAL_WORK_ENDED),
            );
        }
        if merge_gap_days >= 0 {
            periods.cover_holes(merge_gap_days, merge_period_meta);
        }
        Ok(periods)
    }

    /// The registration record covering `day`, or `None`.
    ///
    /// Scans periods in registration order and short-circuits on the first
    /// period registered after `day`; with sorted input this is equivalent to
    /// "first matching, else none".
    pub fn state_at(&self, day: Date) -> Result<Option<&Record>> {
        for record in self.table(Table::Periods)? {
            let registration = record.date_field(fields::REGISTRATION_DATE)?;
            if registration > day {
                return Ok(None);
            }
            let cancellation = record.opt_date_field(fields::CANCELLATION_DATE)?;
            if cancellation.map_or(true, |end| day < end) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Job spells: one output row per sub-period of each category-filtered
    /// registration period, carrying the job/geography/qualification context
    /// valid during that sub-period.
    ///
    /// The filtered periods are truncated at `now` (stamping still-ongoing
    /// ones with [`reasons::STILL_REGISTERED`]); each period is then combined
    /// with every job-group-change record whose validity window touches it,
    /// and the resulting sub-periods are emitted in ascending order of their
    /// end date. Lazy, finite, non-restartable.
    pub fn job_spells(
        &self,
        categories: &[&str],
        merge_gap_days: i64,
        now: Date,
    ) -> Result<JobSpells> {
        let mut periods = self.category_filtered_periods(categories, merge_gap_days)?;
        periods.exclude_after(now, |meta| {
            stamp(meta, fields::CANCELLATION_REASON, reasons::STILL_REGISTERED)
        });

        let mut changes = Vec::new();
        for record in self.table(Table::JobChanges)? {
            let begin = record.date_field(fields::VALIDITY_START)?;
            let end = record.opt_date_field(fields::VALIDITY_END)?;
            changes.push(Interval::new(begin, end, record.clone()));
        }

        Ok(JobSpells {
            entity_ref: self.entity_ref(),
            periods: periods.into_vec().into_iter(),
            changes,
            pending: Vec::new().into_iter(),
        })
    }

    /// Training periods enriched with the job context of the registration
    /// period that last ended before each training started.
    ///
    /// A training with no prior registration period violates the data
    /// contract and surfaces as [`DossierError::InconsistentHistory`].
    pub fn training_periods(&self) -> Result<IntervalSet<Record>> {
        let registrations = self.registration_periods(-1)?;
        let mut intervals = Vec::new();
        for record in self.table(Table::Trainings)? {
            let start = record.date_field(fields::TRAINING_START)?;
            let prior = registrations.last_ended_before(start).ok_or_else(|| {
                DossierError::InconsistentHistory(format!(
                    "training starting {start} for {} has no prior registration period",
                    self.entity_ref()
                ))
            })?;
            let mut enriched = record.clone();
            for field in [
                fields::JOB_CODE,
                fields::CITY,
                fields::REGION,
                fields::QUALIFICATION,
            ] {
                enriched.copy_field_from(&prior.meta, field);
            }
            let end = record.opt_date_field(fields::TRAINING_END)?;
            intervals.push(Interval::new(start, end, enriched));
        }
        Ok(IntervalSet::from_intervals(intervals))
    }

    fn build_periods(
        &self,
        categories: Option<&[&str]>,
        merge_gap_days: i64,
    ) -> Result<IntervalSet<Record>> {
        let mut intervals = Vec::new();
        for record in self.table(Table::Periods)? {
            if let Some(allowed) = categories {
                let category = record.text_field(fields::CATEGORY)?;
                if !allowed.contains(&category.as_str()) {
                    continue;
                }
            }
            let begin = record.date_field(fields::REGISTRATION_DATE)?;
            let end = record.opt_date_field(fields::CANCELLATION_DATE)?;
            intervals.push(Interval::new(begin, end, record.clone()));
        }
        let mut set = IntervalSet::from_intervals(intervals);
        if merge_gap_days >= 0 {
            set.cover_holes(merge_gap_days, merge_period_meta);
        }
        Ok(set)
    }
}

/// Merge metadata for hole-covering: the earlier period's registration
/// context wins, the later period's cancellation reason and date win.
fn merge_period_meta(first: &Record, second: &Record) -> Record {
    let mut merged = first.clone();
    merged.copy_field_from(second, fields::CANCELLATION_DATE);
    merged.copy_field_from(second, fields::CANCELLATION_REASON);
    merged
}

fn stamp(meta: &Record, field: &str, reason: &str) -> Record {
    let mut stamped = meta.clone();
    stamped.set_field(field, Value::Text(reason.to_string()));
    stamped
}

/// One output row of [`EntityHistory::job_spells`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpell {
    /// Stable cross-shard identifier, `"{entity_id}_{shard}"`.
    pub entity_ref: String,
    pub job_code: String,
    pub city: String,
    pub region: String,
    pub qualification: String,
}

/// Lazy sequence of [`JobSpell`]s, one covering period at a time.
pub struct JobSpells {
    entity_ref: String,
    periods: std::vec::IntoIter<Interval<Record>>,
    changes: Vec<Interval<Record>>,
    pending: std::vec::IntoIter<Interval<Record>>,
}

impl JobSpells {
    fn spell_from(&self, sub: Interval<Record>) -> Result<JobSpell> {
        Ok(JobSpell {
            entity_ref: self.entity_ref.clone(),
            job_code: sub.meta.text_field(fields::JOB_CODE)?,
            city: sub.meta.text_field(fields::CITY)?,
            region: sub.meta.text_field(fields::REGION)?,
            qualification: sub.meta.text_field(fields::QUALIFICATION)?,
        })
    }
}

impl Iterator for JobSpells {
    type Item = Result<JobSpell>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(sub) = self.pending.next() {
                return Some(self.spell_from(sub));
            }
            let period = self.periods.next()?;
            let mut subs: Vec<Interval<Record>> = self
                .changes
                .iter()
                .filter(|change| touches(change, &period))
                .cloned()
                .collect();
            subs.push(period);
            subs.sort_by(cmp_by_end);
            self.pending = subs.into_iter();
        }
    }
}
