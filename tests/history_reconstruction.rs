//! End-to-end reconstruction tests: records go through the merge-join, the
//! resulting bundle is wrapped as an `EntityHistory`, and the derived
//! interval sets are checked against hand-computed chronologies.

use dossier_rs::history::{reasons, PRIMARY_CATEGORIES};
use dossier_rs::model::fields;
use dossier_rs::test_support::{
    job_change_record, partial_work_record, period_record, period_record_with_job,
    training_record, VecSource,
};
use dossier_rs::{
    DossierError, EntityHistory, JobSpell, MergeJoin, Result, ShardPattern, Table,
};
use time::macros::date;

const PERIODS: &str = "/data/Reg01/periods.csv";
const PARTIAL: &str = "/data/Reg01/partial_work.csv";
const CHANGES: &str = "/data/Reg01/job_changes.csv";
const TRAININGS: &str = "/data/Reg01/trainings.csv";

fn single_history(source: &VecSource, tables: &[Table]) -> EntityHistory {
    let mut join = MergeJoin::run(source, tables, ShardPattern::default());
    let bundle = join.next().expect("one bundle").expect("clean run");
    assert!(join.next().is_none(), "expected a single entity");
    EntityHistory::new(bundle)
}

#[test]
fn partial_work_month_splits_active_search() {
    let mut source = VecSource::new();
    source.push(
        Table::Periods,
        period_record(PERIODS, 47, "2015-05-01", Some("2015-12-22"), "1"),
    );
    source.push(Table::PartialWork, partial_work_record(PARTIAL, 47, "2015-10-17"));
    let history = single_history(&source, &[Table::Periods, Table::PartialWork]);

    let periods = history.active_search_periods(-1).unwrap();
    assert_eq!(periods.len(), 2);

    let before = &periods.as_slice()[0];
    assert_eq!(before.begin, date!(2015 - 05 - 01));
    assert_eq!(before.end, Some(date!(2015 - 10 - 01)));
    assert_eq!(
        before.meta.text_field(fields::CANCELLATION_REASON).unwrap(),
        reasons::PARTIAL_WORK_STARTED
    );

    let after = &periods.as_slice()[1];
    assert_eq!(after.begin, date!(2015 - 11 - 01));
    assert_eq!(after.end, Some(date!(2015 - 12 - 22)));
    assert_eq!(
        after.meta.text_field(fields::REGISTRATION_REASON).unwrap(),
        reasons::PARTIAL_WORK_ENDED
    );
}

#[test]
fn near_adjacent_periods_merge_within_gap() {
    let mut source = VecSource::new();
    source.push(
        Table::Periods,
        period_record(PERIODS, 1, "2015-05-01", Some("2015-07-31"), "1"),
    );
    source.push(
        Table::Periods,
        period_record(PERIODS, 1, "2015-08-12", Some("2015-10-31"), "1"),
    );
    let history = single_history(&source, &[Table::Periods]);

    let merged = history.registration_periods(12).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.first().unwrap().begin, date!(2015 - 05 - 01));
    assert_eq!(merged.first().unwrap().end, Some(date!(2015 - 10 - 31)));

    let apart = history.registration_periods(5).unwrap();
    assert_eq!(apart.len(), 2);
}

#[test]
fn open_ended_period_truncates_at_now() {
    let mut source = VecSource::new();
    source.push(Table::Periods, period_record(PERIODS, 1, "2015-05-01", None, "1"));
    let history = single_history(&source, &[Table::Periods]);

    let mut periods = history.registration_periods(-1).unwrap();
    assert!(periods.is_unfinished());

    periods.exclude_after(date!(2015 - 09 - 15), |meta| {
        let mut stamped = meta.clone();
        stamped.set_field(
            fields::CANCELLATION_REASON,
            dossier_rs::Value::Text(reasons::STILL_REGISTERED.into()),
        );
        stamped
    });
    assert!(!periods.is_unfinished());
    let only = periods.first().unwrap();
    assert_eq!(only.begin, date!(2015 - 05 - 01));
    assert_eq!(only.end, Some(date!(2015 - 09 - 15)));
    assert_eq!(
        only.meta.text_field(fields::CANCELLATION_REASON).unwrap(),
        reasons::STILL_REGISTERED
    );
}

#[test]
fn state_at_respects_half_open_bounds_and_gaps() {
    let mut source = VecSource::new();
    source.push(
        Table::Periods,
        period_record(PERIODS, 1, "2015-05-01", Some("2015-05-22"), "1"),
    );
    source.push(
        Table::Periods,
        period_record(PERIODS, 1, "2015-06-01", Some("2015-06-22"), "1"),
    );
    let history = single_history(&source, &[Table::Periods]);

    let inside = history.state_at(date!(2015 - 05 - 10)).unwrap().unwrap();
    assert_eq!(
        inside.date_field(fields::REGISTRATION_DATE).unwrap(),
        date!(2015 - 05 - 01)
    );
    assert!(history.state_at(date!(2015 - 05 - 22)).unwrap().is_none());
    assert!(history.state_at(date!(2015 - 05 - 30)).unwrap().is_none());
    let second = history.state_at(date!(2015 - 06 - 01)).unwrap().unwrap();
    assert_eq!(
        second.date_field(fields::REGISTRATION_DATE).unwrap(),
        date!(2015 - 06 - 01)
    );
}

#[test]
fn training_inherits_prior_job_context() {
    let mut source = VecSource::new();
    source.push(
        Table::Periods,
        period_record_with_job(
            PERIODS,
            12,
            "2013-05-01",
            Some("2013-05-22"),
            "1",
            "H1234",
            "Here",
        ),
    );
    source.push(
        Table::Trainings,
        training_record(TRAININGS, 12, "2013-05-25", Some("2013-07-01")),
    );
    let history = single_history(&source, &[Table::Periods, Table::Trainings]);

    let trainings = history.training_periods().unwrap();
    assert_eq!(trainings.len(), 1);
    let training = trainings.first().unwrap();
    assert_eq!(training.begin, date!(2013 - 05 - 25));
    assert_eq!(training.end, Some(date!(2013 - 07 - 01)));
    assert_eq!(training.meta.text_field(fields::JOB_CODE).unwrap(), "H1234");
    assert_eq!(training.meta.text_field(fields::CITY).unwrap(), "Here");
    assert_eq!(
        training.meta.date_field(fields::TRAINING_START).unwrap(),
        date!(2013 - 05 - 25)
    );
}

#[test]
fn training_without_prior_registration_is_inconsistent() {
    let mut source = VecSource::new();
    source.push(
        Table::Periods,
        period_record(PERIODS, 12, "2013-06-01", Some("2013-08-01"), "1"),
    );
    source.push(
        Table::Trainings,
        training_record(TRAININGS, 12, "2013-05-25", None),
    );
    let history = single_history(&source, &[Table::Periods, Table::Trainings]);

    assert!(matches!(
        history.training_periods(),
        Err(DossierError::InconsistentHistory(_))
    ));
}

#[test]
fn job_spells_merge_changes_and_covering_period() {
    let mut source = VecSource::new();
    source.push(
        Table::Periods,
        period_record_with_job(PERIODS, 5, "2015-01-01", None, "1", "H9999", "Town"),
    );
    source.push(
        Table::JobChanges,
        job_change_record(CHANGES, 5, "2015-02-01", Some("2015-04-01"), "H1111", "Early"),
    );
    source.push(
        Table::JobChanges,
        job_change_record(CHANGES, 5, "2015-05-01", Some("2015-08-01"), "H2222", "Middle"),
    );
    let history = single_history(&source, &[Table::Periods, Table::JobChanges]);

    let spells: Vec<JobSpell> = history
        .job_spells(&PRIMARY_CATEGORIES, -1, date!(2015 - 12 - 01))
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    let codes: Vec<&str> = spells.iter().map(|spell| spell.job_code.as_str()).collect();
    assert_eq!(codes, vec!["H1111", "H2222", "H9999"]);
    assert!(spells.iter().all(|spell| spell.entity_ref == "5_Reg01"));
    assert_eq!(spells[0].city, "Early");
    assert_eq!(spells[2].city, "Town");
}

#[test]
fn non_primary_categories_stay_out_of_unemployment_periods() {
    let mut source = VecSource::new();
    source.push(
        Table::Periods,
        period_record(PERIODS, 2, "2015-01-01", Some("2015-02-01"), "1"),
    );
    source.push(
        Table::Periods,
        period_record(PERIODS, 2, "2015-03-01", Some("2015-04-01"), "5"),
    );
    let history = single_history(&source, &[Table::Periods]);

    let primary = history.primary_unemployment_periods(-1).unwrap();
    assert_eq!(primary.len(), 1);
    assert_eq!(primary.first().unwrap().begin, date!(2015 - 01 - 01));

    let all = history.registration_periods(-1).unwrap();
    assert_eq!(all.len(), 2);
}
