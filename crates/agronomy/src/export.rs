//! Minimal CSV writer for report downloads.
//!
//! Every row must have exactly as many cells as the header. Cells containing
//! a comma, quote or line break are quoted and inner quotes are doubled.

use crate::error::AgronomyError;

#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CsvTable {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push<I, S>(&mut self, row: I) -> Result<(), AgronomyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = row.into_iter().map(Into::into).collect();
        if row.len() != self.header.len() {
            return Err(AgronomyError::ColumnMismatch {
                expected: self.header.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> usize {
        self.header.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        write_line(&mut out, &self.header);
        for row in &self.rows {
            write_line(&mut out, row);
        }
        out
    }
}

fn write_line(out: &mut String, cells: &[String]) {
    let line: Vec<String> = cells.iter().map(|c| escape(c)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

pub fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Formats an optional number for a CSV cell, empty when absent.
pub fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
