// Domain checks run after parsing. They only report; the caller decides
// whether anything is removed (see `LoadOptions`).
use crate::types::{Finding, Record};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// One finding per state that is attributed to more than one salesman.
pub fn check_invariant(records: &[Record]) -> Vec<Finding> {
    let mut by_state: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for r in records {
        by_state
            .entry(r.state.as_str())
            .or_default()
            .insert(r.salesman.as_str());
    }
    by_state
        .into_iter()
        .filter(|(_, salesmen)| salesmen.len() > 1)
        .map(|(state, salesmen)| {
            log::warn!("state {} has {} salesmen", state, salesmen.len());
            Finding::InvariantViolation {
                state: state.to_string(),
                salesmen: salesmen.into_iter().map(str::to_string).collect(),
            }
        })
        .collect()
}

/// One finding per (salesman, state, date) signature seen more than once.
pub fn check_duplicates(records: &[Record]) -> Vec<Finding> {
    let mut counts: BTreeMap<(&str, &str, Option<NaiveDate>), usize> = BTreeMap::new();
    for r in records {
        *counts
            .entry((r.salesman.as_str(), r.state.as_str(), r.date))
            .or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|((salesman, state, date), occurrences)| {
            log::warn!("{} / {} repeated {} times", salesman, state, occurrences);
            Finding::DuplicateRecord {
                salesman: salesman.to_string(),
                state: state.to_string(),
                date,
                occurrences,
            }
        })
        .collect()
}
