use crate::error::Result;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Serializes `rows` as CSV (header row first) into any writer and returns
/// how many data rows were written.
pub fn write_csv_to<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

/// Export a report table, creating the output directory if needed.
pub fn write_csv<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    let written = write_csv_to(create_file(path)?, rows)?;
    log::debug!("wrote {} rows to {}", written, path.display());
    Ok(())
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let mut out = create_file(path.as_ref())?;
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush()?;
    Ok(())
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Markdown table of the first `max_rows` rows, or a placeholder line.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrendRow;

    fn rows() -> Vec<TrendRow> {
        vec![
            TrendRow {
                date: "2024-01-01".to_string(),
                total_sales: "10.00".to_string(),
            },
            TrendRow {
                date: "2024-01-02".to_string(),
                total_sales: "12.50".to_string(),
            },
        ]
    }

    #[test]
    fn writes_csv_with_renamed_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trend.csv");
        write_csv(&path, &rows()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Date,TotalSales\n2024-01-01,10.00\n2024-01-02,12.50\n");
    }

    #[test]
    fn writes_into_memory_and_nested_dirs() {
        let mut buf = Vec::new();
        assert_eq!(write_csv_to(&mut buf, &rows()).unwrap(), 2);
        assert!(String::from_utf8(buf).unwrap().starts_with("Date,TotalSales\n"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("summary.json");
        write_json(&path, &serde_json::json!({ "total_sales": 250.0 })).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"total_sales\": 250.0"));
    }

    #[test]
    fn renders_markdown_and_placeholder() {
        let table = render_table(&rows(), 1);
        assert!(table.contains("| Date"));
        assert!(table.contains("2024-01-01"));
        assert!(!table.contains("2024-01-02"));
        assert_eq!(render_table::<TrendRow>(&[], 5), "(no rows)");
    }
}
