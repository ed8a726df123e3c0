//! Plain-text rendering of pages and cache diagnostics.

use serde_json::Value;

use pagepipe::{CacheStats, PageResponse, WindowSnapshot, WindowState};

/// Widest a rendered cell may get before it is cut.
const MAX_CELL_WIDTH: usize = 32;

/// Render a page as an aligned table with a position header.
pub fn render_page(page: &PageResponse, start: usize) -> String {
    let mut out = String::new();
    if page.rows.is_empty() {
        out.push_str(&format!("No rows (of {})", page.total_filtered));
    } else {
        out.push_str(&format!(
            "Rows {}-{} of {}",
            start + 1,
            start + page.rows.len(),
            page.total_filtered
        ));
    }
    if page.total_filtered != page.total_records {
        out.push_str(&format!(" (filtered from {})", page.total_records));
    }
    out.push('\n');

    let cells: Vec<Vec<String>> = page.rows.iter().map(row_cells).collect();
    let columns = cells.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            cells
                .iter()
                .filter_map(|row| row.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();
    let index_width = (start + page.rows.len()).to_string().len();

    for (i, row) in cells.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(c, cell)| format!("{cell:<width$}", width = widths[c]))
            .collect();
        out.push_str(&format!(
            "{:>index_width$}  {}\n",
            start + i + 1,
            line.join(" | ").trim_end()
        ));
    }
    out
}

fn row_cells(row: &Value) -> Vec<String> {
    match row {
        Value::Array(cells) => cells.iter().map(cell_text).collect(),
        Value::Object(map) => map.values().map(cell_text).collect(),
        other => vec![cell_text(other)],
    }
}

fn cell_text(cell: &Value) -> String {
    let text = match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
        format!("{cut}~")
    } else {
        text
    }
}

/// Render the window bookkeeping and counters.
pub fn render_window(snapshot: &WindowSnapshot, stats: &CacheStats) -> String {
    let state = match snapshot.state {
        WindowState::Empty => "empty".to_string(),
        WindowState::Partial { lower, upper } => format!("rows {lower}..{upper}"),
        WindowState::Complete => "all rows".to_string(),
    };
    let sort = if snapshot.signature.sort.is_empty() {
        "none".to_string()
    } else {
        snapshot
            .signature
            .sort
            .iter()
            .map(|s| format!("{}:{}", s.column, s.direction.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    };

    let mut out = String::new();
    out.push_str(&format!("Window:    {state}\n"));
    out.push_str(&format!("Buffered:  {} rows\n", snapshot.buffered_rows));
    if let Some(length) = snapshot.buffered_length {
        out.push_str(&format!("Page size: {length}\n"));
    }
    out.push_str(&format!("Sort:      {sort}\n"));
    out.push_str(&format!(
        "Search:    {}\n",
        snapshot.signature.search.as_deref().unwrap_or("none")
    ));
    if let (Some(total), Some(filtered)) = (snapshot.total_records, snapshot.total_filtered) {
        out.push_str(&format!("Totals:    {filtered} filtered / {total} records\n"));
    }
    out.push_str(&format!(
        "Requests:  {} hits, {} misses, {} failed, {} discarded ({:.0}% hit)\n",
        stats.hits,
        stats.misses,
        stats.failures,
        stats.discarded,
        stats.hit_ratio() * 100.0
    ));
    out
}
