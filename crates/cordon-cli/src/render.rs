//! Tabular text rendering for search and audit output.

use chrono::SecondsFormat;

use cordon_core::{AuditAction, BlockEntry};

/// Placeholder rendered for an unset user.
const NO_USER: &str = "-";

/// Escapes control characters so a hostile reason cannot mangle the table.
pub fn escape_nonprint(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

/// Left-aligned column writer: pads every cell to its column's widest value.
#[derive(Debug, Default)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one row of cells.
    pub fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Renders all rows with aligned columns, one row per line.
    pub fn render(&self) -> String {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for row in &self.rows {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i + 1 == row.len() {
                    line.push_str(cell);
                } else {
                    line.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
                }
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Renders blocklist entries as `<id> <user> <reason>` rows.
pub fn render_search(entries: &[BlockEntry], headers: bool) -> String {
    let mut table = Table::new();
    if headers {
        table.push_row(vec![
            "Id".to_string(),
            "User".to_string(),
            "Reason".to_string(),
        ]);
    }
    for entry in entries {
        table.push_row(vec![
            entry.id.to_string(),
            entry.user.clone().unwrap_or_else(|| NO_USER.to_string()),
            escape_nonprint(&entry.reason),
        ]);
    }
    table.render()
}

/// Renders audit actions as `<created> <action> <user> <ids> <reason>` rows.
pub fn render_audit(actions: &[AuditAction], headers: bool) -> String {
    let mut table = Table::new();
    if headers {
        table.push_row(vec![
            "Created".to_string(),
            "Action".to_string(),
            "User".to_string(),
            "Ids".to_string(),
            "Reason".to_string(),
        ]);
    }
    for action in actions {
        let ids = action
            .ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        table.push_row(vec![
            action
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            action.kind.label().to_string(),
            action.user.clone().unwrap_or_else(|| NO_USER.to_string()),
            ids,
            escape_nonprint(&action.reason),
        ]);
    }
    table.render()
}
