use crate::block::TableBlock;
use crate::theme::Theme;

pub const MIN_COLUMN_WIDTH: usize = 8;
pub const MAX_COLUMN_WIDTH: usize = 40;

/// Per-column width: the widest of header and cells, clamped to
/// [`MIN_COLUMN_WIDTH`]..=[`MAX_COLUMN_WIDTH`]. Every row counts, including
/// rows past the display limit.
pub fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let columns = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);

    (0..columns)
        .map(|column| {
            let header = headers.get(column).map_or(0, |h| h.chars().count());
            let cells = rows
                .iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            header.max(cells).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Pads to `width`, or cuts to `width - 1` characters plus `…`.
pub fn fit_cell(text: &str, width: usize) -> String {
    let length = text.chars().count();
    if length <= width {
        format!("{text}{}", " ".repeat(width - length))
    } else {
        let kept: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

pub fn render_table(table: &TableBlock, max_rows: usize, theme: &Theme) -> String {
    let widths = column_widths(&table.headers, &table.rows);
    let mut lines = Vec::new();

    if let Some(title) = &table.title {
        lines.push(theme.apply("header", title));
    }

    if !table.headers.is_empty() {
        let header = row_line(&table.headers, &widths);
        lines.push(theme.apply("header", &header));
        let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        lines.push(rule.join("─┼─"));
    }

    for row in table.rows.iter().take(max_rows) {
        lines.push(row_line(row, &widths));
    }

    if table.rows.len() > max_rows {
        let hidden = table.rows.len() - max_rows;
        lines.push(theme.apply("muted", &format!("...and {hidden} more rows")));
    }

    lines.join("\n")
}

fn row_line(cells: &[String], widths: &[usize]) -> String {
    let fitted: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(column, width)| fit_cell(cells.get(column).map_or("", String::as_str), *width))
        .collect();
    fitted.join(" │ ").trim_end().to_string()
}
