use crate::types::{
    AggregateResult, DerivedRecord, Finding, FindingRow, Leaderboard, LeaderboardRow, RegionRow,
    SummaryStats, SupportRow, TrendPoint, TrendRow,
};
use crate::util::{format_currency, format_number, format_pct};

/// Top `n` followed by bottom `n`, ranked. Overlapping salesmen appear once,
/// which happens whenever the board holds fewer than `2 * n` entries.
pub fn leaderboard_rows(board: &Leaderboard, n: usize) -> Vec<LeaderboardRow> {
    let len = board.len();
    let mut ranks: Vec<usize> = (0..n.min(len)).collect();
    ranks.extend((len.saturating_sub(n)..len).filter(|r| *r >= n));
    ranks
        .into_iter()
        .map(|idx| {
            let e = &board.entries[idx];
            LeaderboardRow {
                rank: idx + 1,
                salesman: e.salesman.clone(),
                total_sales: format_number(e.total_sales, 2),
            }
        })
        .collect()
}

pub fn region_rows(result: &AggregateResult) -> Vec<RegionRow> {
    result
        .regions
        .iter()
        .map(|r| RegionRow {
            state: r.state.clone(),
            avg_target_hit: format_pct(r.avg_target_hit_pct),
            total_sales: format_number(r.total_sales, 2),
            status: match (r.avg_target_hit_pct, r.met_target) {
                (None, _) => "No Target".to_string(),
                (Some(_), true) => "Met".to_string(),
                (Some(_), false) => "Below".to_string(),
            },
        })
        .collect()
}

pub fn support_rows(rows: &[DerivedRecord]) -> Vec<SupportRow> {
    rows.iter()
        .map(|d| SupportRow {
            salesman: d.record.salesman.clone(),
            state: d.record.state.clone(),
            total_sales: format_currency(d.record.sales_amount),
            target: d
                .record
                .target_amount
                .map(format_currency)
                .unwrap_or_else(|| "n/a".to_string()),
            target_hit: format_pct(d.target_hit_pct),
            away_from_target: format_pct(d.away_from_target_pct),
        })
        .collect()
}

pub fn trend_rows(points: &[TrendPoint]) -> Vec<TrendRow> {
    points
        .iter()
        .map(|p| TrendRow {
            date: p.date.to_string(),
            total_sales: format_number(p.total_sales, 2),
        })
        .collect()
}

pub fn finding_rows(findings: &[Finding]) -> Vec<FindingRow> {
    findings
        .iter()
        .map(|f| FindingRow {
            kind: f.label().to_string(),
            detail: f.to_string(),
        })
        .collect()
}

pub fn summary(result: &AggregateResult, total_records: usize, findings: &[Finding]) -> SummaryStats {
    SummaryStats {
        total_records,
        total_sales: result.achievement.total_sales_sum,
        total_target: result.achievement.total_target_sum,
        overall_hit_pct: result.achievement.overall_hit_pct,
        avg_target_hit_pct: result.kpis.avg_target_hit_pct,
        total_salesmen: result.kpis.total_salesmen,
        salesmen_meeting_target: result.kpis.salesmen_meeting_target,
        findings: findings.to_vec(),
    }
}
