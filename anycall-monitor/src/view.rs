use anycall_core::LogEntry;
use chrono::{DateTime, Local, Utc};
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;

const COLUMNS: [&str; 5] = ["#", "TIMESTAMP", "METHOD", "IP", "ORIGIN"];

/// One fetched copy of the request log, as shown on screen.
///
/// Every successful poll produces a brand-new view; nothing is merged.
/// Rows are addressed by their position in this view, so a detail lookup
/// refers to whatever was rendered last.
#[derive(Debug, Clone, Default)]
pub struct LogView {
    rows: Arc<Vec<LogEntry>>,
    fetched_at: Option<DateTime<Utc>>,
}

impl LogView {
    pub fn new(rows: Vec<LogEntry>) -> Self {
        Self {
            rows: Arc::new(rows),
            fetched_at: Some(Utc::now()),
        }
    }

    pub fn rows(&self) -> &[LogEntry] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `None` until the first successful fetch.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn detail(&self, index: usize) -> Option<&LogEntry> {
        self.rows.get(index)
    }

    /// Fixed-width table of every row.
    pub fn render_table(&self) -> String {
        let cells: Vec<[String; 5]> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, e)| {
                [
                    i.to_string(),
                    display_timestamp(&e.timestamp),
                    e.method.clone(),
                    e.ip.clone().unwrap_or_default(),
                    origin_or_na(&e.origin).to_string(),
                ]
            })
            .collect();

        let mut widths = COLUMNS.map(str::len);
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        push_row(&mut out, &COLUMNS.map(String::from), &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", rule.join("-+-"));
        for row in &cells {
            push_row(&mut out, row, &widths);
        }
        if cells.is_empty() {
            out.push_str("(no calls recorded yet)\n");
        }
        out
    }

    /// Full record for the row at `index`, or `None` if there is no such row.
    pub fn render_detail(&self, index: usize) -> Option<String> {
        let e = self.detail(index)?;
        let mut out = String::new();
        let _ = writeln!(out, "Request Details");
        let _ = writeln!(out, "Timestamp: {}", display_timestamp(&e.timestamp));
        let _ = writeln!(out, "Method:    {}", e.method);
        let _ = writeln!(out, "IP:        {}", e.ip.as_deref().unwrap_or(""));
        let _ = writeln!(out, "Origin:    {}", origin_or_na(&e.origin));
        let _ = writeln!(out, "Browser:   {}", e.browser.as_deref().unwrap_or(""));
        let _ = writeln!(out, "OS:        {}", e.os.as_deref().unwrap_or(""));
        let _ = writeln!(out, "Query:\n{}", pretty(&e.query));
        let _ = writeln!(out, "Body:\n{}", pretty(&e.body));
        let _ = writeln!(out, "Headers:");
        for (name, value) in &e.headers {
            let _ = writeln!(out, "  {name}: {}", value.joined());
        }
        Some(out)
    }
}

fn push_row(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{c:<w$}"))
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

fn origin_or_na(origin: &str) -> &str {
    if origin.is_empty() { "N/A" } else { origin }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Local wall-clock time, 24h. Unparseable timestamps are shown as stored.
fn display_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}
