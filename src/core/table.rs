// src/core/table.rs

use std::collections::BTreeMap;

/// A plain-text table whose columns are padded to their widest cell.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<TableRow>,
}

#[derive(Debug, Clone)]
struct TableRow {
    cells: Vec<String>,
    /// Free text printed on its own line under the row (e.g. tags).
    note: Option<String>,
}

impl Table {
    /// An empty table with these column headers.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row; cells beyond the header count are dropped.
    pub fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(TableRow { cells, note: None });
    }

    /// Appends a row followed by `note` on a line of its own.
    pub fn push_row_with_note(&mut self, cells: Vec<String>, note: Option<String>) {
        self.rows.push(TableRow { cells, note });
    }

    /// Whether no rows were pushed.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(&row.cells) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths
    }

    /// Renders the header, a rule the width of the header line, and the rows.
    pub fn render(&self) -> String {
        let widths = self.widths();
        let header_line = join_padded(&self.headers, &widths);
        let mut out = String::new();
        out.push_str(&header_line);
        out.push('\n');
        out.push_str(&"-".repeat(header_line.chars().count()));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&join_padded(&row.cells, &widths));
            out.push('\n');
            if let Some(note) = &row.note {
                out.push_str(note);
                out.push('\n');
            }
        }
        out
    }
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Counts how often each value occurs, sorted by value.
pub fn distribution<'a, I>(values: I) -> BTreeMap<&'a str, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

/// Renders a titled distribution block:
/// ```text
/// OS Type Distribution:
///   Linux: 2
/// ```
pub fn render_distribution(title: &str, counts: &BTreeMap<&str, usize>) -> String {
    let mut out = format!("{}:\n", title);
    for (value, count) in counts {
        out.push_str(&format!("  {}: {}\n", value, count));
    }
    out
}

/// A banner line made of `=`.
pub fn rule(width: usize) -> String {
    "=".repeat(width)
}
