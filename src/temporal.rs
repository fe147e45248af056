//! # Temporal Module
//!
//! Calendar-date interval algebra for career reconstruction.
//!
//! Intervals are half-open `[begin, end)`: the begin date is inclusive, the
//! end date exclusive, so adjacent intervals `[a, b)` and `[b, c)` share no
//! day. An absent end means "open-ended / still ongoing"; inside an
//! [`IntervalSet`] only the last interval may be open-ended.
//!
//! The mutating operations rebuild the interval vector in a single ordered
//! pass, so the set invariants (sorted by begin, pairwise disjoint) are
//! preserved by construction.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use time::{Date, Month};

/// A half-open interval `[begin, end)` carrying arbitrary metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval<M> {
    /// Begin date (inclusive).
    pub begin: Date,
    /// End date (exclusive); `None` means open-ended.
    pub end: Option<Date>,
    /// Metadata travelling with the interval (typically the source record).
    pub meta: M,
}

impl<M> Interval<M> {
    pub fn new(begin: Date, end: Option<Date>, meta: M) -> Self {
        Self { begin, end, meta }
    }

    /// An interval with a concrete end date.
    pub fn closed(begin: Date, end: Date, meta: M) -> Self {
        Self::new(begin, Some(end), meta)
    }

    /// An interval that is still ongoing.
    pub fn open_ended(begin: Date, meta: M) -> Self {
        Self::new(begin, None, meta)
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    /// Whether a day falls inside `[begin, end)`.
    pub fn contains(&self, day: Date) -> bool {
        self.begin <= day && self.end.map_or(true, |end| day < end)
    }

    /// Length in days; `None` for open-ended intervals.
    pub fn duration_days(&self) -> Option<i64> {
        self.end.map(|end| (end - self.begin).whole_days())
    }
}

/// Whether two intervals overlap or are adjacent with no gap.
///
/// `a` does not touch `b` only when one entirely precedes the other:
/// `a.begin` strictly after `b.end`, or `b.begin` strictly after `a.end`.
/// Open ends extend to infinity and therefore touch everything that starts
/// after the begin.
pub fn touches<A, B>(a: &Interval<A>, b: &Interval<B>) -> bool {
    let a_after_b = b.end.is_some_and(|end| a.begin > end);
    let b_after_a = a.end.is_some_and(|end| b.begin > end);
    !(a_after_b || b_after_a)
}

/// Order intervals by begin, then by end with open ends last.
pub fn cmp_by_begin<M>(a: &Interval<M>, b: &Interval<M>) -> Ordering {
    a.begin.cmp(&b.begin).then_with(|| cmp_ends(a.end, b.end))
}

/// Order intervals by end (open ends last), then by begin.
pub fn cmp_by_end<M>(a: &Interval<M>, b: &Interval<M>) -> Ordering {
    cmp_ends(a.end, b.end).then_with(|| a.begin.cmp(&b.begin))
}

fn cmp_ends(a: Option<Date>, b: Option<Date>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The month window `[first-of-month, first-of-next-month)` containing a day.
pub fn month_bounds(day: Date) -> (Date, Date) {
    let first = Date::from_calendar_date(day.year(), day.month(), 1).expect("day 1 exists");
    let (next_year, next_month) = match day.month() {
        Month::December => (day.year() + 1, Month::January),
        month => (day.year(), month.next()),
    };
    let next = Date::from_calendar_date(next_year, next_month, 1).expect("day 1 exists");
    (first, next)
}

/// An ordered list of pairwise disjoint intervals, sorted by begin.
///
/// Construction sorts but does not validate disjointness of the input
/// (garbage in, garbage out); every operation preserves the invariants when
/// they held on entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalSet<M> {
    intervals: Vec<Interval<M>>,
}

impl<M> Default for IntervalSet<M> {
    fn default() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }
}

impl<M> IntervalSet<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from intervals, sorting them by begin.
    pub fn from_intervals(mut intervals: Vec<Interval<M>>) -> Self {
        intervals.sort_by(cmp_by_begin);
        Self { intervals }
    }

    /// Build a set from `(begin, end, metadata)` triples.
    pub fn from_triples(triples: Vec<(Date, Option<Date>, M)>) -> Self {
        Self::from_intervals(
            triples
                .into_iter()
                .map(|(begin, end, meta)| Interval::new(begin, end, meta))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval<M>> {
        self.intervals.iter()
    }

    pub fn as_slice(&self) -> &[Interval<M>] {
        &self.intervals
    }

    pub fn into_vec(self) -> Vec<Interval<M>> {
        self.intervals
    }

    /// Earliest interval, or `None` if the set is empty.
    pub fn first(&self) -> Option<&Interval<M>> {
        self.intervals.first()
    }

    /// Latest interval, or `None` if the set is empty.
    pub fn last(&self) -> Option<&Interval<M>> {
        self.intervals.last()
    }

    /// The interval with the greatest defined end strictly before `day`.
    ///
    /// Open-ended intervals never qualify. Used to locate the last known
    /// state before some other event started.
    pub fn last_ended_before(&self, day: Date) -> Option<&Interval<M>> {
        self.intervals
            .iter()
            .filter(|interval| interval.end.is_some_and(|end| end < day))
            .max_by_key(|interval| interval.end)
    }

    /// Whether the set ends with an open-ended (still ongoing) interval.
    pub fn is_unfinished(&self) -> bool {
        self.last().is_some_and(Interval::is_open_ended)
    }
}

impl<M: Clone> IntervalSet<M> {
    /// Remove the sub-range `[begin, end)` from the set.
    ///
    /// An interval overlapping the range is shrunk from the right, shrunk
    /// from the left, split in two, or deleted when fully contained. The left
    /// remainder's metadata passes through `cut_end`, the right remainder's
    /// through `cut_begin` (used to stamp synthetic reason codes on the new
    /// boundaries). Open ends count as extending to infinity for the
    /// containment test.
    pub fn exclude_period(
        &mut self,
        begin: Date,
        end: Date,
        cut_end: impl Fn(&M) -> M,
        cut_begin: impl Fn(&M) -> M,
    ) {
        let mut rebuilt = Vec::with_capacity(self.intervals.len() + 1);
        for interval in self.intervals.drain(..) {
            let ends_before = interval.end.is_some_and(|e| e <= begin);
            let starts_after = interval.begin >= end;
            if ends_before || starts_after {
                rebuilt.push(interval);
                continue;
            }
            if interval.begin < begin {
                rebuilt.push(Interval::closed(
                    interval.begin,
                    begin,
                    cut_end(&interval.meta),
                ));
            }
            if interval.end.map_or(true, |e| e > end) {
                rebuilt.push(Interval::new(end, interval.end, cut_begin(&interval.meta)));
            }
        }
        self.intervals = rebuilt;
    }

    /// Drop everything at or after `day`.
    ///
    /// An interval straddling `day` is truncated to end there, its metadata
    /// passed through `update` (used to stamp a synthetic "as of now" reason
    /// on still-ongoing intervals). Intervals beginning at or after `day` are
    /// dropped entirely.
    pub fn exclude_after(&mut self, day: Date, update: impl Fn(&M) -> M) {
        let mut rebuilt = Vec::with_capacity(self.intervals.len());
        for interval in self.intervals.drain(..) {
            if interval.begin >= day {
                continue;
            }
            if interval.end.map_or(true, |e| e > day) {
                rebuilt.push(Interval::closed(
                    interval.begin,
                    day,
                    update(&interval.meta),
                ));
            } else {
                rebuilt.push(interval);
            }
        }
        self.intervals = rebuilt;
    }

    /// Merge consecutive intervals separated by a gap of at most
    /// `max_gap_days`.
    ///
    /// Left fold in sorted order: each interval either extends the previous
    /// merged result or starts a new one, so an already-merged interval is
    /// never re-merged out of order. The merged metadata comes from
    /// `merge(first, second)`. A negative gap, an empty set, or a singleton
    /// set are no-ops.
    pub fn cover_holes(&mut self, max_gap_days: i64, merge: impl Fn(&M, &M) -> M) {
        if max_gap_days < 0 || self.intervals.len() < 2 {
            return;
        }
        let mut rebuilt: Vec<Interval<M>> = Vec::with_capacity(self.intervals.len());
        for interval in self.intervals.drain(..) {
            match rebuilt.last_mut() {
                Some(prev) => {
                    // prev.end is always defined here: only the last interval
                    // of a well-formed set is open-ended.
                    let gap = prev
                        .end
                        .map_or(i64::MIN, |end| (interval.begin - end).whole_days());
                    if gap <= max_gap_days {
                        prev.meta = merge(&prev.meta, &interval.meta);
                        prev.end = interval.end;
                    } else {
                        rebuilt.push(interval);
                    }
                }
                None => rebuilt.push(interval),
            }
        }
        self.intervals = rebuilt;
    }
}

impl<M> IntoIterator for IntervalSet<M> {
    type Item = Interval<M>;
    type IntoIter = std::vec::IntoIter<Interval<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.into_iter()
    }
}

impl<'a, M> IntoIterator for &'a IntervalSet<M> {
    type Item = &'a Interval<M>;
    type IntoIter = std::slice::Iter<'a, Interval<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}
