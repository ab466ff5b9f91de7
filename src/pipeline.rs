// Metrics pipeline: derive -> filter -> group/aggregate.
//
// Every stage is a pure function over borrowed input. Grouping goes through
// `BTreeMap`s and sums in input order, so two runs over the same records
// produce bit-identical floats. Overall sales totals are always the
// rank-order sum of the leaderboard.
use crate::types::{
    AchievementSummary, AggregateResult, DerivedRecord, FilterSelection, KpiSummary, Leaderboard,
    LeaderboardEntry, Record, RegionSummary, TrendPoint,
};
use crate::util::{mean, percentage};
use chrono::NaiveDate;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Rows at or above this target hit % count as "meeting target".
pub const TARGET_MET_PCT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Records whose target hit % is strictly below this go to the support list.
    pub support_threshold_pct: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            support_threshold_pct: 60.0,
        }
    }
}

pub fn compute(records: &[Record], selection: &FilterSelection) -> AggregateResult {
    compute_with(records, selection, &PipelineOptions::default())
}

pub fn compute_with(
    records: &[Record],
    selection: &FilterSelection,
    options: &PipelineOptions,
) -> AggregateResult {
    let derived = derive(records);
    let filtered = filter(&derived, selection);
    log::debug!(
        "{} of {} records pass the filter",
        filtered.len(),
        derived.len()
    );
    let board = leaderboard(&filtered);
    let achievement = summarize(&filtered, &board);
    AggregateResult {
        leaderboard: board,
        achievement,
        trend: trend(&filtered),
        kpis: kpis(&filtered),
        regions: regional_breakdown(&filtered),
        support: support_list(&filtered, options.support_threshold_pct),
    }
}

pub fn derive_one(record: &Record) -> DerivedRecord {
    let target_hit_pct = record
        .target_amount
        .and_then(|target| percentage(record.sales_amount, target));
    DerivedRecord {
        record: record.clone(),
        target_hit_pct,
        away_from_target_pct: target_hit_pct.map(|pct| 100.0 - pct),
    }
}

pub fn derive(records: &[Record]) -> Vec<DerivedRecord> {
    records.iter().map(derive_one).collect()
}

pub fn filter(derived: &[DerivedRecord], selection: &FilterSelection) -> Vec<DerivedRecord> {
    if selection.is_empty() {
        return derived.to_vec();
    }
    derived
        .iter()
        .filter(|d| selection.matches(&d.record))
        .cloned()
        .collect()
}

/// Total sales per salesman, highest first; ties resolve by name.
pub fn leaderboard(rows: &[DerivedRecord]) -> Leaderboard {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for d in rows {
        *totals.entry(d.record.salesman.as_str()).or_insert(0.0) += d.record.sales_amount;
    }
    let mut entries: Vec<LeaderboardEntry> = totals
        .into_iter()
        .map(|(salesman, total_sales)| LeaderboardEntry {
            salesman: salesman.to_string(),
            total_sales,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.total_sales
            .total_cmp(&a.total_sales)
            .then_with(|| a.salesman.cmp(&b.salesman))
    });
    Leaderboard { entries }
}

/// Sales are totalled through the leaderboard so that the achievement sum
/// and the sum of leaderboard rows are the same float, bit for bit.
pub fn achievement(rows: &[DerivedRecord]) -> AchievementSummary {
    summarize(rows, &leaderboard(rows))
}

fn summarize(rows: &[DerivedRecord], board: &Leaderboard) -> AchievementSummary {
    let total_sales_sum = board.total_sales();
    let total_target_sum: f64 = rows.iter().filter_map(|d| d.record.target_amount).sum();
    AchievementSummary {
        total_sales_sum,
        total_target_sum,
        overall_hit_pct: percentage(total_sales_sum, total_target_sum),
    }
}

/// Sales per date, oldest first. `None` when no row carries a date.
pub fn trend(rows: &[DerivedRecord]) -> Option<Vec<TrendPoint>> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for d in rows {
        if let Some(date) = d.record.date {
            *by_date.entry(date).or_insert(0.0) += d.record.sales_amount;
        }
    }
    if by_date.is_empty() {
        return None;
    }
    Some(
        by_date
            .into_iter()
            .map(|(date, total_sales)| TrendPoint { date, total_sales })
            .collect(),
    )
}

pub fn kpis(rows: &[DerivedRecord]) -> KpiSummary {
    let hit: Vec<f64> = rows.iter().filter_map(|d| d.target_hit_pct).collect();
    // Codes and names never share one set: a person whose code is blank on
    // some rows would otherwise be counted twice.
    let people: BTreeSet<&str> = if rows.iter().all(|d| d.record.emp_code.is_some()) {
        rows.iter().filter_map(|d| d.record.emp_code.as_deref()).collect()
    } else {
        rows.iter().map(|d| d.record.salesman.as_str()).collect()
    };
    KpiSummary {
        total_sales: leaderboard(rows).total_sales(),
        avg_target_hit_pct: mean(&hit),
        total_salesmen: people.len(),
        salesmen_meeting_target: hit.iter().filter(|p| **p >= TARGET_MET_PCT).count(),
    }
}

/// Per-state mean target hit %, best state first, undefined means last.
pub fn regional_breakdown(rows: &[DerivedRecord]) -> Vec<RegionSummary> {
    #[derive(Default)]
    struct Acc {
        hit: Vec<f64>,
        sales: f64,
        records: usize,
    }
    let mut map: BTreeMap<&str, Acc> = BTreeMap::new();
    for d in rows {
        let e = map.entry(d.record.state.as_str()).or_default();
        e.sales += d.record.sales_amount;
        e.records += 1;
        if let Some(p) = d.target_hit_pct {
            e.hit.push(p);
        }
    }
    let mut regions: Vec<RegionSummary> = map
        .into_iter()
        .map(|(state, acc)| {
            let avg = mean(&acc.hit);
            RegionSummary {
                state: state.to_string(),
                avg_target_hit_pct: avg,
                total_sales: acc.sales,
                records: acc.records,
                met_target: avg.is_some_and(|p| p >= TARGET_MET_PCT),
            }
        })
        .collect();
    regions.sort_by(|a, b| {
        desc_defined_first(a.avg_target_hit_pct, b.avg_target_hit_pct)
            .then_with(|| a.state.cmp(&b.state))
    });
    regions
}

/// Rows below `threshold_pct`, weakest first. Undefined percentages are
/// never listed.
pub fn support_list(rows: &[DerivedRecord], threshold_pct: f64) -> Vec<DerivedRecord> {
    let mut below: Vec<DerivedRecord> = rows
        .iter()
        .filter(|d| d.target_hit_pct.is_some_and(|p| p < threshold_pct))
        .cloned()
        .collect();
    below.sort_by(|a, b| {
        let (pa, pb) = (
            a.target_hit_pct.unwrap_or(f64::MAX),
            b.target_hit_pct.unwrap_or(f64::MAX),
        );
        pa.total_cmp(&pb)
            .then_with(|| a.record.salesman.cmp(&b.record.salesman))
    });
    below
}

fn desc_defined_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
