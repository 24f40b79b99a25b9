//! Minimal spreadsheet model serialized as JSON.
//!
//! A workbook is an ordered list of named sheets; a sheet is a ragged grid
//! of optional cells. Coordinates are zero-based internally, while log
//! messages use spreadsheet notation (`C1`, `A3`).

use serde::{Deserialize, Serialize};

/// One cell value. Empty cells are `None` in the row vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Trimmed textual rendering of the cell.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }

    /// Textual rendering with text cells kept verbatim.
    #[must_use]
    pub fn as_raw_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            other => other.as_text(),
        }
    }

    /// Numeric value, accepting hand-edited text such as `"1 234"`,
    /// `"12,5"` or `"98%"` (the last one read as `0.98`).
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => parse_number_text(s),
        }
    }

    /// Integer value; fractional numbers are truncated toward zero.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            other => other.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

fn parse_number_text(raw: &str) -> Option<f64> {
    let mut s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if s.is_empty() {
        return None;
    }
    let percent = s.ends_with('%');
    if percent {
        s.pop();
    }
    if s.contains(',') && !s.contains('.') {
        s = s.replace(',', ".");
    }
    let v: f64 = s.parse().ok()?;
    Some(if percent { v / 100.0 } else { v })
}

/// Spreadsheet column letters for a zero-based index (`0 -> A`, `26 -> AA`).
#[must_use]
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Vec<Option<Cell>>>,
}

impl Sheet {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Writes a cell, growing the grid as needed.
    pub fn set(&mut self, row: usize, col: usize, cell: impl Into<Cell>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, None);
        }
        cells[col] = Some(cell.into());
    }

    /// Writes a cell only when a value is present.
    pub fn set_opt(&mut self, row: usize, col: usize, cell: Option<impl Into<Cell>>) {
        if let Some(cell) = cell {
            self.set(row, col, cell);
        }
    }

    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(col)?.as_ref()
    }

    /// Trimmed text of a cell; empty cells and blank text are `None`.
    #[must_use]
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.cell(row, col).map(Cell::as_text).filter(|s| !s.is_empty())
    }

    /// Untrimmed text of a cell, for snapshot columns that must round-trip
    /// exactly.
    #[must_use]
    pub fn raw_text(&self, row: usize, col: usize) -> Option<String> {
        self.cell(row, col).map(Cell::as_raw_text)
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    #[must_use]
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn push(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(2), "C");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
    }

    #[test]
    fn test_tolerant_numbers() {
        assert_eq!(Cell::from("1 234").as_i64(), Some(1234));
        assert_eq!(Cell::from("12,5").as_f64(), Some(12.5));
        assert_eq!(Cell::from("120,5%").as_f64(), Some(1.205));
        assert_eq!(Cell::from("abc").as_f64(), None);
        assert_eq!(Cell::from(1.9).as_i64(), Some(1));
    }

    #[test]
    fn test_sheet_grows() {
        let mut sheet = Sheet::new("S");
        sheet.set(2, 3, "x");
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.text(2, 3).as_deref(), Some("x"));
        assert!(sheet.cell(0, 0).is_none());
        assert!(sheet.cell(2, 9).is_none());
    }

    #[test]
    fn test_raw_text_keeps_whitespace() {
        let mut sheet = Sheet::new("S");
        sheet.set(0, 0, "  a b;\n");
        sheet.set(0, 1, 7_i64);
        assert_eq!(sheet.text(0, 0).as_deref(), Some("a b;"));
        assert_eq!(sheet.raw_text(0, 0).as_deref(), Some("  a b;\n"));
        assert_eq!(sheet.raw_text(0, 1).as_deref(), Some("7"));
        assert!(sheet.raw_text(0, 2).is_none());
    }

    #[test]
    fn test_json_shape() {
        let mut wb = Workbook::default();
        let mut sheet = Sheet::new("Results");
        sheet.set(0, 0, "Weapon");
        sheet.set(0, 2, 1500_i64);
        sheet.set(1, 1, 0.5);
        wb.push(sheet);

        let json = serde_json::to_string(&wb).unwrap();
        assert_eq!(
            json,
            r#"{"sheets":[{"name":"Results","rows":[["Weapon",null,1500],[null,0.5]]}]}"#
        );
        let back: Workbook = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wb);
    }
}
