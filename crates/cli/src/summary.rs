//! Human-readable run summary on stderr.

use pedidos_recon::model::{CellValue, RunSummary};
use pedidos_recon::Table;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Rows shown from each end of the table.
pub const PREVIEW_ROWS: usize = 5;
/// Widest a preview column gets, in terminal cells.
const MAX_CELL_WIDTH: usize = 18;

pub fn print_summary(summary: &RunSummary, table: &Table) {
    eprint!("{}", render_summary(summary, table));
}

pub fn render_summary(summary: &RunSummary, table: &Table) -> String {
    let mut out = format!(
        "{}: {} records, {} columns\ncolumns: {}\n",
        summary.meta.config_name,
        summary.total_records,
        summary.columns.len(),
        summary.columns.join(", ")
    );

    if !table.rows.is_empty() {
        let head: Vec<_> = table.rows.iter().take(PREVIEW_ROWS).collect();
        let skip = table.rows.len().saturating_sub(PREVIEW_ROWS);
        let tail: Vec<_> = table.rows.iter().skip(skip).collect();
        out.push_str(&format!("first {} rows:\n", head.len()));
        out.push_str(&render_rows(&table.columns, &head));
        out.push_str(&format!("last {} rows:\n", tail.len()));
        out.push_str(&render_rows(&table.columns, &tail));
    }

    let p = &summary.parse;
    let footer = if p.footer_found {
        format!("footer found ({} rows dropped)", p.truncated_rows)
    } else {
        "no footer".to_string()
    };
    out.push_str(&format!(
        "parse: {} input rows, {} product headers, {footer}\n",
        p.input_rows, p.header_rows
    ));

    let e = &summary.enrichment;
    out.push_str(&format!(
        "enrich ({} >= {}): {} exact, {} fuzzy, {} unmatched ({} dictionary entries)\n",
        e.scorer, e.threshold, e.exact, e.fuzzy, e.unmatched, summary.dictionary_entries
    ));

    out.push_str(&match &summary.join {
        Some(j) => format!(
            "join: {} by legal name, {} by trade name, {} unmatched\n",
            j.by_legal_name, j.by_trade_name, j.unmatched
        ),
        None => "join: skipped\n".to_string(),
    });

    let warnings: Vec<_> = summary.warnings().collect();
    if !warnings.is_empty() {
        out.push_str(&format!("warnings ({}):\n", warnings.len()));
        for n in warnings {
            out.push_str(&format!("  [{}] {}\n", n.stage, n.message));
        }
    }
    out
}

fn render_rows(columns: &[String], rows: &[&Vec<CellValue>]) -> String {
    let texts: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            (0..columns.len())
                .map(|c| row.get(c).map(CellValue::to_text).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(c, label)| {
            texts
                .iter()
                .map(|row| row[c].width())
                .chain(std::iter::once(label.width()))
                .max()
                .unwrap_or(0)
                .min(MAX_CELL_WIDTH)
        })
        .collect();

    let mut out = render_line(columns.iter().map(String::as_str), &widths);
    for row in &texts {
        out.push_str(&render_line(row.iter().map(String::as_str), &widths));
    }
    out
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells.zip(widths).map(|(text, &w)| fit(text, w)).collect();
    format!("  {}\n", padded.join("  ").trim_end())
}

/// Pad to exactly `width` terminal cells, cutting with "~" when too long.
fn fit(text: &str, width: usize) -> String {
    // Newlines inside cells would break the grid
    let flat: String = text.chars().map(|c| if c.is_control() { ' ' } else { c }).collect();
    let full = flat.width();
    if full <= width {
        return format!("{}{}", flat, " ".repeat(width - full));
    }

    let budget = width.saturating_sub(1);
    let mut used = 0;
    let mut cut = String::new();
    for ch in flat.chars() {
        let cw = ch.width().unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        cut.push(ch);
    }
    cut.push('~');
    used += 1;
    if used < width {
        cut.push_str(&" ".repeat(width - used));
    }
    cut
}
