//! Table formatting utilities for CLI list commands
//!
//! Each record command describes its columns once and hands rows to
//! [`TableFormatter`], which renders them as an aligned table, CSV, Markdown
//! or bare ids.

use console::style;

use crate::cli::helpers::{display_date, escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::entities::CropStatus;

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Record key (cyan)
    Id(String),
    /// Plain text, truncated to the column
    Text(String),
    /// Enumerated label (soil type, work type)
    Choice(String),
    /// Crop lifecycle stage with color coding
    Status(CropStatus),
    /// Backend date string, shown as the calendar date
    Date(String),
    /// Whole number
    Number(u64),
    /// Real number with precision
    Float(f64, usize),
    /// Empty/placeholder
    Empty,
}

impl CellValue {
    /// Format for TSV output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => format!("{:<width$}", style(id).cyan(), width = width),
            CellValue::Text(s) | CellValue::Choice(s) => {
                let truncated = truncate_str(s, width.saturating_sub(2));
                format!("{:<width$}", truncated, width = width)
            }
            CellValue::Status(status) => {
                let s = status.to_string();
                let styled = match status {
                    CropStatus::PreparingToSow | CropStatus::Sowing => style(&s).dim(),
                    CropStatus::Active => style(&s).green(),
                    CropStatus::PreparingToHarvest | CropStatus::Harvesting => style(&s).yellow(),
                    CropStatus::Completed => style(&s).cyan().bold(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Empty => format!("{:<width$}", "-", width = width),
            _ => format!("{:<width$}", self.raw(), width = width),
        }
    }

    /// Format for CSV output (RFC 4180, no colors)
    pub fn format_csv(&self) -> String {
        escape_csv(&self.raw())
    }

    /// Format for Markdown output (no colors, escaped pipes)
    pub fn format_md(&self) -> String {
        let raw = match self {
            CellValue::Empty => "-".to_string(),
            other => other.raw(),
        };
        raw.replace('|', "\\|")
    }

    /// Get raw string value (no formatting, for ID output)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(s) | CellValue::Text(s) | CellValue::Choice(s) => s.clone(),
            CellValue::Status(status) => status.to_string(),
            CellValue::Date(d) => display_date(d),
            CellValue::Number(n) => n.to_string(),
            CellValue::Float(f, precision) => format!("{:.prec$}", f, prec = precision),
            CellValue::Empty => String::new(),
        }
    }

    /// Display width of the content, in characters
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Empty => 1,
            other => other.raw().chars().count(),
        }
    }
}

/// Column definition with header label and width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    pub id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(id: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    entity_name_plural: Option<&'static str>,
    show_summary: bool,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            entity_name_plural: None,
            show_summary: true,
        }
    }

    /// Set a custom plural name (e.g., "crops" instead of "crop(s)")
    pub fn with_plural(mut self, plural: &'static str) -> Self {
        self.entity_name_plural = Some(plural);
        self
    }

    /// Skip the "N found" line
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    /// Output rows in the specified format
    pub fn output<I>(&self, rows: I, format: OutputFormat)
    where
        I: IntoIterator<Item = TableRow>,
    {
        let rows: Vec<TableRow> = rows.into_iter().collect();

        match format {
            OutputFormat::Csv => self.output_csv(&rows),
            OutputFormat::Md => self.output_md(&rows),
            OutputFormat::Id => self.output_ids(&rows),
            _ => self.output_tsv(&rows),
        }
    }

    /// Calculate dynamic column widths based on actual content
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        self.columns
            .iter()
            .map(|col| {
                let max_content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(|v| v.display_width())
                    .max()
                    .unwrap_or(0);
                // +2 for the truncation buffer; never wider than the column allows
                col.header
                    .len()
                    .max(max_content.saturating_add(2))
                    .min(col.width)
            })
            .collect()
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| format!("{:<width$}", style(col.header).bold(), width = w))
            .collect();
        println!("{}", header.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let parts: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(col, w)| match row.get(col.key) {
                    Some(value) => value.format_tsv(*w),
                    None => format!("{:<width$}", "-", width = w),
                })
                .collect();
            println!("{}", parts.join(" "));
        }

        if self.show_summary {
            println!();
            match self.entity_name_plural {
                Some(plural) if rows.len() != 1 => {
                    println!("{} {} found.", style(rows.len()).cyan(), plural)
                }
                _ => println!(
                    "{} {}(s) found.",
                    style(rows.len()).cyan(),
                    self.entity_name
                ),
            }
        }
    }

    fn output_csv(&self, rows: &[TableRow]) {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.key).collect();
        println!("{}", headers.join(","));

        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| row.get(col.key).map(CellValue::format_csv).unwrap_or_default())
                .collect();
            println!("{}", values.join(","));
        }
    }

    fn output_md(&self, rows: &[TableRow]) {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.header).collect();
        println!("| {} |", headers.join(" | "));

        let separators: Vec<&str> = headers.iter().map(|_| "---").collect();
        println!("|{}|", separators.join("|"));

        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| {
                    row.get(col.key)
                        .map(CellValue::format_md)
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            println!("| {} |", values.join(" | "));
        }
    }

    fn output_ids(&self, rows: &[TableRow]) {
        for row in rows {
            println!("{}", row.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_raw_values() {
        assert_eq!(CellValue::Float(16.25, 2).raw(), "16.25");
        assert_eq!(CellValue::Number(85).raw(), "85");
        assert_eq!(
            CellValue::Date("2024-03-15T00:00:00.000Z".to_string()).raw(),
            "2024-03-15"
        );
        assert_eq!(CellValue::Status(CropStatus::Active).raw(), "активний");
        assert_eq!(CellValue::Empty.raw(), "");
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        assert_eq!(CellValue::Text("a|b".to_string()).format_md(), "a\\|b");
        assert_eq!(CellValue::Empty.format_md(), "-");
    }

    #[test]
    fn test_widths_respect_caps() {
        const COLUMNS: &[ColumnDef] = &[
            ColumnDef::new("name", "NAME", 8),
            ColumnDef::new("area", "AREA (HA)", 12),
        ];
        let rows = vec![TableRow::new("x")
            .cell("name", CellValue::Text("a very long field name".to_string()))
            .cell("area", CellValue::Float(1.5, 2))];
        let widths = TableFormatter::new(COLUMNS, "field").calculate_widths(&rows);
        assert_eq!(widths, vec![8, 9]);
    }

    #[test]
    fn test_display_width_counts_chars() {
        assert_eq!(CellValue::Choice("чорнозем".to_string()).display_width(), 8);
    }
}
