use crate::error::Result;
use crate::types::{Finding, RawRow, Record};
use crate::util::{non_blank, parse_date_safe, parse_f64_safe};
use crate::validation::{check_duplicates, check_invariant};
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Opt-in strictness applied after validation. The default keeps every
/// flagged row so the figures stay auditable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Keep only the first row of each repeated (salesman, state, date).
    pub drop_duplicates: bool,
    /// Drop every row of a state that has more than one salesman.
    pub exclude_conflicting_states: bool,
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_csv_from_reader(file)
}

/// Reads a headered sheet. Cells are decoded lossily, so a row exported
/// in a legacy encoding (e.g. Windows-1252 accents) is kept with `U+FFFD`
/// in place of the bad bytes instead of failing the whole file.
pub fn read_csv_from_reader<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = decode_record(rdr.byte_headers()?, true);
    let mut rows = Vec::new();
    for (idx, result) in rdr.byte_records().enumerate() {
        let record = result?;
        if std::str::from_utf8(record.as_slice()).is_err() {
            log::warn!("row {}: invalid UTF-8, undecodable bytes replaced", idx + 1);
        }
        let row: RawRow = decode_record(&record, false).deserialize(Some(&headers))?;
        rows.push(row);
    }
    log::debug!("read {} raw rows", rows.len());
    Ok(rows)
}

fn decode_record(record: &ByteRecord, trim: bool) -> StringRecord {
    record
        .iter()
        .map(|cell| {
            let text = String::from_utf8_lossy(cell);
            if trim {
                text.trim().to_string()
            } else {
                text.into_owned()
            }
        })
        .collect()
}

/// Coerce raw rows into [`Record`]s. Rows that cannot be coerced are left
/// out and reported as [`Finding::ParseError`] with their 1-based index.
pub fn parse(raw_rows: &[RawRow]) -> (Vec<Record>, Vec<Finding>) {
    let mut records = Vec::with_capacity(raw_rows.len());
    let mut findings = Vec::new();
    for (idx, raw) in raw_rows.iter().enumerate() {
        match parse_row(idx + 1, raw) {
            Ok(record) => records.push(record),
            Err(finding) => {
                log::debug!("skipping {}", finding);
                findings.push(finding);
            }
        }
    }
    (records, findings)
}

fn parse_row(row: usize, raw: &RawRow) -> std::result::Result<Record, Finding> {
    let fail = |field: &str, value: &Option<String>| Finding::ParseError {
        row,
        field: field.to_string(),
        value: non_blank(value.as_deref()).map(str::to_string),
    };

    let salesman =
        non_blank(raw.salesman.as_deref()).ok_or_else(|| fail("salesman", &raw.salesman))?;
    let state = non_blank(raw.state.as_deref()).ok_or_else(|| fail("state", &raw.state))?;

    let sales_amount = match parse_f64_safe(raw.sales_amount.as_deref()) {
        Some(v) if v >= 0.0 => v,
        _ => return Err(fail("sales_amount", &raw.sales_amount)),
    };

    // A blank target is allowed and yields undefined percentages later on.
    let target_amount = match non_blank(raw.target_amount.as_deref()) {
        None => None,
        Some(cell) => match parse_f64_safe(Some(cell)) {
            Some(v) if v >= 0.0 => Some(v),
            _ => return Err(fail("target_amount", &raw.target_amount)),
        },
    };

    let date = match non_blank(raw.date.as_deref()) {
        None => None,
        Some(cell) => match parse_date_safe(Some(cell)) {
            Some(d) => Some(d),
            None => return Err(fail("date", &raw.date)),
        },
    };

    Ok(Record {
        salesman: salesman.to_string(),
        state: state.to_string(),
        sales_amount,
        target_amount,
        date,
        emp_code: non_blank(raw.emp_code.as_deref()).map(str::to_string),
    })
}

/// Parse and validate a dataset. Findings come back in the order
/// parse errors, invariant violations, duplicates.
pub fn load(raw_rows: &[RawRow]) -> (Vec<Record>, Vec<Finding>) {
    load_with(raw_rows, &LoadOptions::default())
}

pub fn load_with(raw_rows: &[RawRow], options: &LoadOptions) -> (Vec<Record>, Vec<Finding>) {
    let (mut records, mut findings) = parse(raw_rows);
    let violations = check_invariant(&records);
    let duplicates = check_duplicates(&records);

    if options.exclude_conflicting_states && !violations.is_empty() {
        let conflicted: HashSet<&str> = violations
            .iter()
            .filter_map(|f| match f {
                Finding::InvariantViolation { state, .. } => Some(state.as_str()),
                _ => None,
            })
            .collect();
        let before = records.len();
        records.retain(|r| !conflicted.contains(r.state.as_str()));
        log::info!(
            "excluded {} rows from {} conflicting states",
            before - records.len(),
            conflicted.len()
        );
    }

    if options.drop_duplicates && !duplicates.is_empty() {
        let before = records.len();
        let mut seen = HashSet::new();
        records.retain(|r| seen.insert((r.salesman.clone(), r.state.clone(), r.date)));
        log::info!("dropped {} duplicate rows", before - records.len());
    }

    let parse_errors = findings.len();
    findings.extend(violations);
    findings.extend(duplicates);
    log::info!(
        "loaded {} of {} rows ({} parse errors, {} warnings)",
        records.len(),
        raw_rows.len(),
        parse_errors,
        findings.len() - parse_errors
    );
    (records, findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(salesman: &str, state: &str, sales: &str, target: &str, date: &str) -> RawRow {
        let cell = |s: &str| Some(s.to_string());
        RawRow {
            salesman: cell(salesman),
            state: cell(state),
            sales_amount: cell(sales),
            target_amount: cell(target),
            date: cell(date),
            emp_code: None,
        }
    }

    #[test]
    fn parses_clean_rows() {
        let (records, findings) = parse(&[raw("A", "X", "1,000", "$2,000", "2024-01-31")]);
        assert!(findings.is_empty());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sales_amount, 1000.0);
        assert_eq!(records[0].target_amount, Some(2000.0));
        assert_eq!(records[0].date.map(|d| d.to_string()).as_deref(), Some("2024-01-31"));
    }

    #[test]
    fn malformed_sales_drops_the_row_with_its_index() {
        let rows = [raw("A", "X", "100", "200", ""), raw("B", "Y", "lots", "100", "")];
        let (records, findings) = parse(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(
            findings,
            vec![Finding::ParseError {
                row: 2,
                field: "sales_amount".to_string(),
                value: Some("lots".to_string()),
            }]
        );
    }

    #[test]
    fn negative_and_missing_values_are_rejected() {
        let rows = [
            raw("A", "X", "-5", "200", ""),
            raw("B", "Y", "", "200", ""),
            raw("C", "Z", "10", "-1", ""),
            raw("", "W", "10", "10", ""),
            raw("D", "V", "10", "10", "someday"),
        ];
        let (records, findings) = parse(&rows);
        assert!(records.is_empty());
        let fields: Vec<String> = findings
            .iter()
            .map(|f| match f {
                Finding::ParseError { field, .. } => field.clone(),
                other => panic!("unexpected finding {other:?}"),
            })
            .collect();
        assert_eq!(
            fields,
            vec!["sales_amount", "sales_amount", "target_amount", "salesman", "date"]
        );
    }

    #[test]
    fn blank_target_is_kept_as_missing() {
        let (records, findings) = parse(&[raw("A", "X", "50", " ", "")]);
        assert!(findings.is_empty());
        assert_eq!(records[0].target_amount, None);
        assert_eq!(records[0].date, None);
    }

    #[test]
    fn reads_workbook_headers() {
        let csv = "Emp Code,Sales Executive,Region,Total Sales,Target,Target Hit %\n\
                   E1,Asha,Goa,\"1,200\",1500,80.00%\n\
                   E2,Ravi,Kerala,900,1000,90.00%\n";
        let rows = read_csv_from_reader(csv.as_bytes()).unwrap();
        let (records, findings) = load(&rows);
        assert!(findings.is_empty());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].salesman, "Asha");
        assert_eq!(records[0].state, "Goa");
        assert_eq!(records[0].sales_amount, 1200.0);
        assert_eq!(records[0].emp_code.as_deref(), Some("E1"));
    }

    #[test]
    fn invalid_utf8_row_is_kept_with_replacement() {
        let bytes: &[u8] = b"salesman,state,sales_amount,target_amount\n\
                             Asha,Goa,100,200\n\
                             Jos\xe9,Kerala,50,100\n\
                             Ravi,Assam,70,100\n";
        let rows = read_csv_from_reader(bytes).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].salesman.as_deref(), Some("Jos\u{FFFD}"));
        let (records, findings) = load(&rows);
        assert!(findings.is_empty());
        let names: Vec<&str> = records.iter().map(|r| r.salesman.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Jos\u{FFFD}", "Ravi"]);
        assert_eq!(records[1].sales_amount, 50.0);
    }

    #[test]
    fn load_flags_but_keeps_by_default() {
        let rows = [
            raw("A", "X", "10", "10", "2024-01-01"),
            raw("A", "X", "10", "10", "2024-01-01"),
            raw("B", "X", "5", "10", "2024-01-02"),
        ];
        let (records, findings) = load(&rows);
        assert_eq!(records.len(), 3);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].label(), "InvariantViolation");
        assert_eq!(findings[1].label(), "DuplicateRecord");
    }

    #[test]
    fn strict_options_remove_flagged_rows() {
        let rows = [
            raw("A", "X", "10", "10", "2024-01-01"),
            raw("B", "X", "5", "10", "2024-01-02"),
            raw("C", "Y", "7", "10", "2024-01-01"),
            raw("C", "Y", "7", "10", "2024-01-01"),
        ];
        let dedup = LoadOptions {
            drop_duplicates: true,
            ..LoadOptions::default()
        };
        let (records, findings) = load_with(&rows, &dedup);
        assert_eq!(records.len(), 3);
        assert_eq!(findings.len(), 2);

        let strict = LoadOptions {
            drop_duplicates: true,
            exclude_conflicting_states: true,
        };
        let (records, _) = load_with(&rows, &strict);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].salesman, "C");
    }
}
