use std::path::Path;

use crate::error::{CardbookError, Result};

/// One untyped spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: &str, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.to_string(),
            rows,
        }
    }

    /// Build a sheet of text cells; empty strings become `Cell::Empty`.
    #[cfg(test)]
    pub fn from_text(name: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|c| Cell::from(*c)).collect())
            .collect();
        Self::new(name, rows)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }
}

/// Load a statement file, choosing the reader by extension.
pub fn load_workbook(file_path: &Path) -> Result<Workbook> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => read_csv(file_path),
        #[cfg(feature = "workbook")]
        "xlsx" | "xlsm" | "xls" | "ods" => read_spreadsheet(file_path),
        _ => Err(CardbookError::UnsupportedFile(format!(
            "{} (expected .csv, .xlsx, .xls or .ods)",
            file_path.display()
        ))),
    }
}

fn read_csv(file_path: &Path) -> Result<Workbook> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(Cell::from).collect());
    }
    let name = file_path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("Sheet1");
    Ok(Workbook::new(vec![Sheet::new(name, rows)]))
}

#[cfg(feature = "workbook")]
fn read_spreadsheet(file_path: &Path) -> Result<Workbook> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| CardbookError::Workbook(format!("Failed to open {}: {e}", file_path.display())))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names().to_owned() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!(sheet = %name, "skipping unreadable sheet: {e}");
                continue;
            }
        };
        let rows = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Data::Empty | Data::Error(_) => Cell::Empty,
                        Data::String(s) => Cell::from(s.as_str()),
                        Data::Float(f) => Cell::Number(*f),
                        Data::Int(i) => Cell::Number(*i as f64),
                        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
                        other => Cell::Text(other.to_string()),
                    })
                    .collect()
            })
            .collect();
        sheets.push(Sheet::new(&name, rows));
    }
    Ok(Workbook::new(sheets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(Cell::Number(5000.0).text(), "5000");
        assert_eq!(Cell::Number(12.5).text(), "12.5");
        assert_eq!(Cell::Empty.text(), "");
        assert_eq!(Cell::from("스타벅스").text(), "스타벅스");
    }

    #[test]
    fn test_cell_is_empty() {
        assert!(Cell::from("   ").is_empty());
        assert!(Cell::from("").is_empty());
        assert!(!Cell::Number(0.0).is_empty());
    }

    #[test]
    fn test_load_csv_as_single_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("march.csv");
        std::fs::write(&path, "승인일자,가맹점명,승인금액(원)\n2024-03-05,스타벅스,\"5,000\"\n").unwrap();
        let wb = load_workbook(&path).unwrap();
        assert_eq!(wb.sheets.len(), 1);
        assert_eq!(wb.sheets[0].name, "march");
        assert_eq!(wb.sheets[0].rows.len(), 2);
        assert_eq!(wb.sheets[0].rows[1][2], Cell::Text("5,000".into()));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statement.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        assert!(matches!(
            load_workbook(&path),
            Err(CardbookError::UnsupportedFile(_))
        ));
    }
}
