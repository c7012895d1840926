//! Markdown run summary.
//!
//! Rows that record an attempt (created, failed, triggered) sort ahead of skip
//! rows; each group is alphabetical by repository.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const TABLE_HEADER: &str = "| Repository | Branch | Status | Details |";
const TABLE_RULE: &str = "|------------|--------|--------|---------|";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowKind {
    Attempted,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub kind: RowKind,
    pub repo: String,
    pub branch: Option<String>,
    pub status: String,
    pub details: String,
}

/// Anything that can report itself as one table row.
pub trait ToSummaryRow {
    fn summary_row(&self) -> SummaryRow;
}

#[derive(Debug)]
pub struct Summary {
    title: String,
    rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn from_records<T: ToSummaryRow>(title: &str, records: &[T]) -> Self {
        let mut summary = Self::new(title);
        for record in records {
            summary.push(record.summary_row());
        }
        summary
    }

    pub fn push(&mut self, row: SummaryRow) {
        self.rows.push(row);
    }

    pub fn sorted_rows(&self) -> Vec<&SummaryRow> {
        let mut rows: Vec<&SummaryRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| (a.kind, &a.repo).cmp(&(b.kind, &b.repo)));
        rows
    }

    pub fn render(&self) -> String {
        let mut out = format!("## {}\n\n{TABLE_HEADER}\n{TABLE_RULE}\n", self.title);
        for row in self.sorted_rows() {
            let branch = row
                .branch
                .as_deref()
                .map(|branch| format!("`{}`", escape_cell(branch)))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                escape_cell(&row.repo),
                branch,
                escape_cell(&row.status),
                escape_cell(&row.details)
            ));
        }
        out
    }

    /// Write to the step-summary file when one is configured, else stdout.
    pub fn publish(&self, step_summary: Option<&Path>) -> Result<()> {
        let rendered = self.render();
        match step_summary {
            Some(path) => {
                fs::write(path, rendered.as_bytes())
                    .with_context(|| format!("write step summary {}", path.display()))?;
                tracing::info!(path = %path.display(), rows = self.rows.len(), "wrote step summary");
            }
            None => {
                println!("GITHUB_STEP_SUMMARY not set. Printing summary instead:");
                print!("{rendered}");
            }
        }
        Ok(())
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
