// Utility helpers for parsing spreadsheet cells and formatting figures.
//
// Everything that has to cope with "dirty" exported values lives here so the
// loader and the pipeline can work with typed values only.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Date layouts seen in sales exports, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Returns the trimmed cell, or `None` when it is missing or blank.
pub fn non_blank(s: Option<&str>) -> Option<&str> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Strips a leading currency sign (`$`) and thousands separators (`,`).
/// - Rejects values that contain alphabetic characters.
/// - Returns `None` for anything that cannot be safely parsed, including
///   `NaN` and infinities.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = non_blank(s)?;
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.strip_prefix('$').unwrap_or(s).replace(',', "");
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = non_blank(s)?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Arithmetic mean, `None` for an empty slice rather than `NaN`.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// `numerator / denominator * 100`, undefined when the denominator is zero.
pub fn percentage(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let pct = numerator / denominator * 100.0;
    pct.is_finite().then_some(pct)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Beyond `i64` the digits are kept ungrouped rather than lost.
    let mut res = match int_part.parse::<i64>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

pub fn format_currency(n: f64) -> String {
    let s = format_number(n, 0);
    match s.strip_prefix('-') {
        Some(abs) => format!("-${}", abs),
        None => format!("${}", s),
    }
}

/// Percentages print with one decimal; undefined values print as `n/a`.
pub fn format_pct(p: Option<f64>) -> String {
    match p {
        Some(v) => format!("{}%", format_number(v, 1)),
        None => "n/a".to_string(),
    }
}
