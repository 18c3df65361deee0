use colored::Colorize;

use crate::browser::VisibleRow;
use crate::loader::LoadState;
use crate::selection::SelectionSnapshot;
use crate::source::Artwork;

const TITLE_WIDTH: usize = 40;
const ARTIST_WIDTH: usize = 28;

/// Everything the status line needs, gathered by the caller from the browser.
#[derive(Clone, Debug)]
pub struct StatusLine<'a> {
    pub state: &'a LoadState,
    pub page_index: Option<u64>,
    pub page_count: Option<u64>,
    pub total_records: Option<u64>,
    pub total_selected: u64,
    pub bulk: u64,
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn format_dates(record: &Artwork) -> String {
    match (record.date_start, record.date_end) {
        (Some(start), Some(end)) if start == end => start.to_string(),
        (Some(start), Some(end)) => format!("{start}-{end}"),
        (Some(start), None) => start.to_string(),
        (None, Some(end)) => end.to_string(),
        (None, None) => String::new(),
    }
}

pub fn render_rows(rows: &[VisibleRow<'_, Artwork>]) -> String {
    let mut out = String::new();
    for (position, row) in rows.iter().enumerate() {
        let checkbox = if row.selected {
            "[x]".bold().green().to_string()
        } else {
            "[ ]".dimmed().to_string()
        };
        let title = row.record.title.as_deref().unwrap_or("(untitled)");
        let artist = row
            .record
            .artist_display
            .as_deref()
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("");
        out.push_str(&format!(
            "{:>3} {} {:>7} {:<tw$} {:<aw$} {}\n",
            position + 1,
            checkbox,
            format!("#{}", row.row.rank()),
            truncate(title, TITLE_WIDTH),
            truncate(artist, ARTIST_WIDTH),
            format_dates(row.record),
            tw = TITLE_WIDTH,
            aw = ARTIST_WIDTH,
        ));
    }
    if rows.is_empty() {
        out.push_str(&format!("{}\n", "no rows on this page".dimmed()));
    }
    out
}

pub fn render_status(status: &StatusLine<'_>) -> String {
    let page = match (status.page_index, status.page_count) {
        (Some(index), Some(count)) => format!("page {}/{}", index + 1, count.max(1)),
        (Some(index), None) => format!("page {}", index + 1),
        (None, _) => "no page".to_string(),
    };
    let total = status
        .total_records
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());
    let mut line = format!(
        ":: {} :: selected {} of {} :: bulk {}",
        page, status.total_selected, total, status.bulk
    );
    match status.state {
        LoadState::Loading { page } => {
            line.push_str(&format!(" :: {}", format!("loading page {}", page + 1).yellow()));
        }
        LoadState::Failed { page, reason } => {
            line.push_str(&format!(
                " :: {}",
                format!("page {} failed: {reason}", page + 1).red()
            ));
        }
        LoadState::Idle | LoadState::Loaded { .. } => {}
    }
    line.push_str(" ::");
    line
}

pub fn render_json(snapshot: &SelectionSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}

pub fn render_help() -> String {
    [
        "n, next          next page",
        "p, prev          previous page",
        "g <page>         go to page (1-based)",
        "t <row>          flip a row on this page",
        "a | none         select or clear every row on this page",
        "s [count]        select the first <count> records",
        "r, reload        retry or refetch the page",
        "j, json          print the selection as JSON",
        "h, help          this help",
        "q, quit          exit",
    ]
    .join("\n")
}
