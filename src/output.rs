//! Rendering of link lists for the command line: JSON and a CSV table.

use jaccard_core::Link;
use std::collections::HashMap;

/// Sparse table; `None` cells render empty. Rows may be shorter than the
/// header, trailing empty cells are not stored.
pub type Table = Vec<Vec<Option<String>>>;

/// Last path component of a file name.
pub fn file_label(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Lay links out as a symmetric table.
///
/// The header starts with an empty cell followed by one column per item in
/// the order it first appears as a target; each item gets one row in the
/// order it first appears as a source. Every link fills both
/// `(source, target)` and `(target, source)`.
pub fn links_to_table(links: &[Link<String>]) -> Table {
    let mut header: Vec<Option<String>> = vec![Some(String::new())];
    let mut body: Table = Vec::new();
    let mut rows: HashMap<String, usize> = HashMap::new();
    let mut cols: HashMap<String, usize> = HashMap::new();

    let mut add = |source: &str, target: &str, value: f64| {
        let row = *rows.entry(source.to_string()).or_insert_with(|| {
            body.push(vec![Some(file_label(source).to_string())]);
            body.len() - 1
        });
        let col = *cols.entry(target.to_string()).or_insert_with(|| {
            header.push(Some(file_label(target).to_string()));
            header.len() - 1
        });
        let cells = &mut body[row];
        if cells.len() <= col {
            cells.resize(col + 1, None);
        }
        cells[col] = Some(value.to_string());
    };

    for link in links {
        add(&link.source, &link.target, link.value);
        add(&link.target, &link.source, link.value);
    }

    let mut table = Vec::with_capacity(body.len() + 1);
    table.push(header);
    table.extend(body);
    table
}

/// Render a table as CSV, one line per row with a trailing newline.
pub fn table_to_csv(table: &Table) -> String {
    let mut csv = String::new();
    for row in table {
        let line: Vec<String> = row
            .iter()
            .map(|cell| cell.as_deref().map(escape_csv).unwrap_or_default())
            .collect();
        csv.push_str(&line.join(","));
        csv.push('\n');
    }
    csv
}

/// Collapse each run of whitespace, commas, quotes and backslashes into a
/// single space.
pub fn escape_csv(cell: &str) -> String {
    let mut escaped = String::with_capacity(cell.len());
    let mut in_run = false;
    for c in cell.chars() {
        if c.is_whitespace() || matches!(c, ',' | '"' | '\\') {
            if !in_run {
                escaped.push(' ');
                in_run = true;
            }
        } else {
            escaped.push(c);
            in_run = false;
        }
    }
    escaped
}

/// Links as a pretty-printed JSON array of `{source, target, value}`.
pub fn links_to_json(links: &[Link<String>]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(links)
}
