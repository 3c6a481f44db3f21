//! Table output formatting for CLI commands
//!
//! Renders migration status and table statistics with comfy-table.
//! Colors are dropped when `NO_COLOR` is set or the terminal is dumb.

use std::env;

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use super::group_thousands;
use crate::domain::models::{MigrationStatus, TableRowCount};

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self { use_colors, max_width }
    }

    /// One row per registered migration.
    pub fn format_migrations(&self, migrations: &[MigrationStatus]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            header("Version"),
            header("Name"),
            header("Status"),
            header("Applied at"),
        ]);

        for m in migrations {
            let (label, color) = if m.applied {
                ("✓ applied", Color::Green)
            } else {
                ("✗ pending", Color::Yellow)
            };
            let status = if self.use_colors {
                Cell::new(label).fg(color)
            } else {
                Cell::new(label)
            };

            table.add_row(vec![
                Cell::new(&m.version),
                Cell::new(&m.name),
                status,
                Cell::new(
                    m.applied_at
                        .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
                ),
            ]);
        }

        table.to_string()
    }

    /// Row counts, with failed counts shown as `ERROR`.
    pub fn format_row_counts(&self, counts: &[TableRowCount]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![header("Table"), header("Rows")]);

        for count in counts {
            let rows = match count.rows {
                Some(n) => Cell::new(group_thousands(n.unsigned_abs())),
                None if self.use_colors => Cell::new("ERROR").fg(Color::Red),
                None => Cell::new("ERROR"),
            };
            table.add_row(vec![Cell::new(&count.table), rows.set_alignment(CellAlignment::Right)]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn supports_color() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_migrations_plain() {
        let formatter = TableFormatter::with_config(false, Some(100));
        let rendered = formatter.format_migrations(&[
            MigrationStatus {
                version: "001".to_string(),
                name: "initial_schema".to_string(),
                description: String::new(),
                applied: true,
                applied_at: Some(chrono::Utc::now()),
            },
            MigrationStatus {
                version: "002".to_string(),
                name: "add_notes".to_string(),
                description: String::new(),
                applied: false,
                applied_at: None,
            },
        ]);

        assert!(rendered.contains("initial_schema"));
        assert!(rendered.contains("✓ applied"));
        assert!(rendered.contains("✗ pending"));
    }

    #[test]
    fn test_format_row_counts_marks_errors() {
        let formatter = TableFormatter::with_config(false, Some(100));
        let rendered = formatter.format_row_counts(&[
            TableRowCount {
                table: "contacts".to_string(),
                rows: Some(12_345),
            },
            TableRowCount {
                table: "groups".to_string(),
                rows: None,
            },
        ]);

        assert!(rendered.contains("12,345"));
        assert!(rendered.contains("ERROR"));
    }
}
