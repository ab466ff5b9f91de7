use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tabled::Tabled;

/// One spreadsheet row exactly as exported. Header spellings from the
/// dashboard workbook are accepted alongside the snake_case names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(
        rename = "salesman",
        alias = "Salesman",
        alias = "Sales Executive",
        alias = "Sales_Executive"
    )]
    pub salesman: Option<String>,
    #[serde(rename = "state", alias = "State", alias = "Region")]
    pub state: Option<String>,
    #[serde(
        rename = "sales_amount",
        alias = "Total Sales",
        alias = "Total_Sales",
        alias = "Sales"
    )]
    pub sales_amount: Option<String>,
    #[serde(rename = "target_amount", alias = "Target", alias = "Target Amount")]
    pub target_amount: Option<String>,
    #[serde(rename = "date", alias = "Date")]
    pub date: Option<String>,
    #[serde(rename = "emp_code", alias = "Emp Code", alias = "Emp_Code")]
    pub emp_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub salesman: String,
    pub state: String,
    pub sales_amount: f64,
    /// `None` when the target cell was blank.
    pub target_amount: Option<f64>,
    pub date: Option<NaiveDate>,
    pub emp_code: Option<String>,
}

/// A [`Record`] with its KPI columns. `None` marks an undefined percentage
/// (zero or missing target).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRecord {
    pub record: Record,
    pub target_hit_pct: Option<f64>,
    pub away_from_target_pct: Option<f64>,
}

/// Validation outcome reported back to the caller. None of these stop the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// Row dropped because a required field could not be coerced.
    ParseError {
        row: usize,
        field: String,
        value: Option<String>,
    },
    /// A state attributed to more than one salesman. Rows are kept.
    InvariantViolation {
        state: String,
        salesmen: Vec<String>,
    },
    /// The same (salesman, state, date) signature seen more than once.
    DuplicateRecord {
        salesman: String,
        state: String,
        date: Option<NaiveDate>,
        occurrences: usize,
    },
}

impl Finding {
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Finding::ParseError { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Finding::ParseError { .. } => "ParseError",
            Finding::InvariantViolation { .. } => "InvariantViolation",
            Finding::DuplicateRecord { .. } => "DuplicateRecord",
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::ParseError { row, field, value } => match value {
                Some(v) => write!(f, "row {}: cannot read {} from {:?}", row, field, v),
                None => write!(f, "row {}: {} is missing", row, field),
            },
            Finding::InvariantViolation { state, salesmen } => write!(
                f,
                "state {} is assigned to {} salesmen: {}",
                state,
                salesmen.len(),
                salesmen.join(", ")
            ),
            Finding::DuplicateRecord {
                salesman,
                state,
                date,
                occurrences,
            } => {
                let when = date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "undated".to_string());
                write!(
                    f,
                    "{} / {} / {} appears {} times",
                    salesman, state, when, occurrences
                )
            }
        }
    }
}

/// Current filter widgets. Empty sets place no restriction on a dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub states: BTreeSet<String>,
    pub salesmen: BTreeSet<String>,
}

impl FilterSelection {
    pub fn new<S, M>(states: S, salesmen: M) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        FilterSelection {
            states: states.into_iter().map(Into::into).collect(),
            salesmen: salesmen.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.salesmen.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        (self.states.is_empty() || self.states.contains(&record.state))
            && (self.salesmen.is_empty() || self.salesmen.contains(&record.salesman))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub salesman: String,
    pub total_sales: f64,
}

/// Salesmen ranked by total sales, highest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best `n` performers; the whole board when `n` exceeds its length.
    pub fn top(&self, n: usize) -> &[LeaderboardEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Weakest `n` performers, still in descending order.
    pub fn bottom(&self, n: usize) -> &[LeaderboardEntry] {
        let len = self.entries.len();
        &self.entries[len - n.min(len)..]
    }

    pub fn ascending(&self) -> Vec<LeaderboardEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    /// Sum of the ranked totals, in rank order.
    pub fn total_sales(&self) -> f64 {
        self.entries.iter().fold(0.0, |acc, e| acc + e.total_sales)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AchievementSummary {
    pub total_sales_sum: f64,
    pub total_target_sum: f64,
    pub overall_hit_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub total_sales: f64,
}

/// Headline cards shown above the charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_sales: f64,
    pub avg_target_hit_pct: Option<f64>,
    pub total_salesmen: usize,
    pub salesmen_meeting_target: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub state: String,
    pub avg_target_hit_pct: Option<f64>,
    pub total_sales: f64,
    pub records: usize,
    pub met_target: bool,
}

/// Everything the presentation layer draws for one filter selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub leaderboard: Leaderboard,
    pub achievement: AchievementSummary,
    /// `None` when no surviving record is dated, so the chart can be hidden.
    pub trend: Option<Vec<TrendPoint>>,
    pub kpis: KpiSummary,
    pub regions: Vec<RegionSummary>,
    pub support: Vec<DerivedRecord>,
}

// Rendered rows for CSV export and console previews.

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LeaderboardRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Salesman")]
    #[tabled(rename = "Salesman")]
    pub salesman: String,
    #[serde(rename = "TotalSales")]
    #[tabled(rename = "TotalSales")]
    pub total_sales: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionRow {
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "AvgTargetHit")]
    #[tabled(rename = "AvgTargetHit")]
    pub avg_target_hit: String,
    #[serde(rename = "TotalSales")]
    #[tabled(rename = "TotalSales")]
    pub total_sales: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SupportRow {
    #[serde(rename = "Salesman")]
    #[tabled(rename = "Salesman")]
    pub salesman: String,
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "TotalSales")]
    #[tabled(rename = "TotalSales")]
    pub total_sales: String,
    #[serde(rename = "Target")]
    #[tabled(rename = "Target")]
    pub target: String,
    #[serde(rename = "TargetHit")]
    #[tabled(rename = "TargetHit")]
    pub target_hit: String,
    #[serde(rename = "AwayFromTarget")]
    #[tabled(rename = "AwayFromTarget")]
    pub away_from_target: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendRow {
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: String,
    #[serde(rename = "TotalSales")]
    #[tabled(rename = "TotalSales")]
    pub total_sales: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct FindingRow {
    #[serde(rename = "Kind")]
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[serde(rename = "Detail")]
    #[tabled(rename = "Detail")]
    pub detail: String,
}

/// Contents of `summary.json`.
#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_records: usize,
    pub total_sales: f64,
    pub total_target: f64,
    pub overall_hit_pct: Option<f64>,
    pub avg_target_hit_pct: Option<f64>,
    pub total_salesmen: usize,
    pub salesmen_meeting_target: usize,
    pub findings: Vec<Finding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, sales: f64) -> LeaderboardEntry {
        LeaderboardEntry {
            salesman: name.to_string(),
            total_sales: sales,
        }
    }

    fn board() -> Leaderboard {
        Leaderboard {
            entries: vec![entry("A", 300.0), entry("B", 200.0), entry("C", 100.0)],
        }
    }

    #[test]
    fn top_and_bottom_slice_the_ranking() {
        let b = board();
        assert_eq!(b.top(2), &[entry("A", 300.0), entry("B", 200.0)]);
        assert_eq!(b.bottom(1), &[entry("C", 100.0)]);
    }

    #[test]
    fn oversized_slices_return_everything() {
        let b = board();
        assert_eq!(b.top(10).len(), 3);
        assert_eq!(b.bottom(10).len(), 3);
        assert!(Leaderboard::default().top(5).is_empty());
        assert!(Leaderboard::default().bottom(5).is_empty());
    }

    #[test]
    fn selection_matches_on_both_dimensions() {
        let rec = Record {
            salesman: "Asha".to_string(),
            state: "Goa".to_string(),
            sales_amount: 10.0,
            target_amount: Some(20.0),
            date: None,
            emp_code: None,
        };
        assert!(FilterSelection::default().matches(&rec));
        assert!(FilterSelection::new(["Goa"], Vec::<String>::new()).matches(&rec));
        assert!(FilterSelection::new(["Goa"], ["Asha"]).matches(&rec));
        assert!(!FilterSelection::new(["Goa"], ["Ravi"]).matches(&rec));
        assert!(!FilterSelection::new(["Kerala"], Vec::<String>::new()).matches(&rec));
    }

    #[test]
    fn findings_render_readable_messages() {
        let f = Finding::InvariantViolation {
            state: "X".to_string(),
            salesmen: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(f.to_string(), "state X is assigned to 2 salesmen: A, B");
        let p = Finding::ParseError {
            row: 3,
            field: "sales_amount".to_string(),
            value: Some("ten".to_string()),
        };
        assert_eq!(p.to_string(), "row 3: cannot read sales_amount from \"ten\"");
        assert!(p.is_parse_error());
    }
}
