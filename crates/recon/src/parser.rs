//! Block parser: turns the "product header + line items" sheet into labeled
//! records.
//!
//! The sheet encodes product groups positionally: a header row whose first
//! column reads "Produto: ..." is followed by its line items. The stages below
//! run in a fixed order. Propagation needs the original row order, the sort
//! must finish before the footer search, and column cleanup runs on the
//! truncated, sorted rows.

use chrono::NaiveDate;
use chrono::NaiveDateTime;

use crate::model::{
    BlockRow, CellValue, Notice, ParseSummary, Report, SalesRecord, Stage, Table,
    UnlabeledReport, CANONICAL_COLUMNS,
};

/// Substring (lowercase) that marks a product header row.
pub const HEADER_MARKER: &str = "produto";
/// Substring (lowercase) of the report footer row.
pub const FOOTER_MARKER: &str = "data emissão";
/// Column of the working layout holding the date/order key.
pub const KEY_COLUMN: usize = 1;
/// Working-layout columns that get decimal-comma and whitespace cleanup.
pub const CLEANUP_COLUMNS: [usize; 5] = [0, 3, 5, 6, 7];

const DESCRIPTION_COLUMN: &str = "descricao";
const CLASSIFICATION_COLUMNS: [&str; 2] = ["categoria", "calibre"];
const DESCRIPTION_PREFIX: &str = "Produto:";

/// Day-first fallbacks, tried in order after the strict `dd/mm/yyyy` parse.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %m %Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    // Month-first only when the day-first reading is impossible
    "%m/%d/%Y",
];

/// Result of parsing the report sheet.
#[derive(Debug)]
pub struct Parsed {
    pub report: Report,
    pub summary: ParseSummary,
    pub notices: Vec<Notice>,
}

/// Run every parser stage in order.
pub fn parse_report(table: Table) -> Parsed {
    ReportRows::from_table(table)
        .mark_headers()
        .propagate_descriptions()
        .sort_by_key_column()
        .truncate_at_footer()
        .add_classification_columns()
        .clean_descriptions()
        .normalize_text_columns()
        .format_dates()
        .label()
}

/// Ordered, positional report rows threaded through the parser stages.
///
/// Every stage takes the rows by value and hands them to the next one, so
/// the order dependency between stages is explicit at the call site.
#[derive(Debug, Clone)]
pub struct ReportRows {
    pub columns: Vec<String>,
    pub rows: Vec<BlockRow>,
    summary: ParseSummary,
}

impl ReportRows {
    /// Insert the empty leading `descricao` column. Rows are padded (or cut)
    /// to the sheet's header width.
    pub fn from_table(table: Table) -> Self {
        let width = table.width();
        let mut columns = Vec::with_capacity(width + 1);
        columns.push(DESCRIPTION_COLUMN.to_string());
        columns.extend(table.columns);

        let rows: Vec<BlockRow> = table
            .rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(width, CellValue::Empty);
                BlockRow {
                    descricao: String::new(),
                    cells,
                }
            })
            .collect();

        let summary = ParseSummary {
            input_rows: rows.len(),
            ..Default::default()
        };
        Self {
            columns,
            rows,
            summary,
        }
    }

    pub fn summary(&self) -> &ParseSummary {
        &self.summary
    }

    /// Stage 1: a text key cell containing "produto" makes the row a product
    /// header; its full text becomes the row's description.
    pub fn mark_headers(mut self) -> Self {
        let mut headers = 0;
        for row in &mut self.rows {
            if let Some(text) = row.cell(KEY_COLUMN).as_str() {
                if text.to_lowercase().contains(HEADER_MARKER) {
                    row.descricao = text.to_string();
                    headers += 1;
                }
            }
        }
        self.summary.header_rows = headers;
        self
    }

    /// Stage 2: forward-fill each header's description down to the rows
    /// below it. Rows above the first header stay empty.
    pub fn propagate_descriptions(mut self) -> Self {
        let mut current: Option<String> = None;
        let mut orphans = 0;
        for row in &mut self.rows {
            if !row.descricao.is_empty() {
                current = Some(row.descricao.clone());
            } else if let Some(ref description) = current {
                row.descricao = description.clone();
            } else {
                orphans += 1;
            }
        }
        self.summary.rows_before_first_header = orphans;
        self
    }

    /// Stage 3: stable ascending sort on the key column.
    pub fn sort_by_key_column(mut self) -> Self {
        self.rows
            .sort_by(|a, b| a.cell(KEY_COLUMN).sort_cmp(b.cell(KEY_COLUMN)));
        self
    }

    /// Stage 4: drop the footer row and everything after it.
    pub fn truncate_at_footer(mut self) -> Self {
        let footer = self.rows.iter().position(|row| {
            row.cell(KEY_COLUMN)
                .to_text()
                .to_lowercase()
                .contains(FOOTER_MARKER)
        });
        if let Some(pos) = footer {
            self.summary.footer_found = true;
            self.summary.truncated_rows = self.rows.len() - pos;
            self.rows.truncate(pos);
        }
        self
    }

    /// Stage 5: append the null `categoria` and `calibre` columns.
    pub fn add_classification_columns(mut self) -> Self {
        self.columns
            .extend(CLASSIFICATION_COLUMNS.iter().map(|c| c.to_string()));
        for row in &mut self.rows {
            row.cells
                .extend(CLASSIFICATION_COLUMNS.iter().map(|_| CellValue::Empty));
        }
        self
    }

    /// Stage 6: strip the "Produto:" prefix and leading dashes.
    pub fn clean_descriptions(mut self) -> Self {
        for row in &mut self.rows {
            row.descricao = clean_description(&row.descricao);
        }
        self
    }

    /// Stage 7: decimal comma to dot and whitespace collapse on the cleanup
    /// columns that exist.
    pub fn normalize_text_columns(mut self) -> Self {
        let width = self.columns.len();
        for &pos in CLEANUP_COLUMNS.iter().filter(|&&p| p < width) {
            for row in &mut self.rows {
                if pos == 0 {
                    row.descricao = normalize_text(&row.descricao);
                } else if let Some(cell) = row.cells.get_mut(pos - 1) {
                    if !cell.is_empty() {
                        *cell = CellValue::Text(normalize_text(&cell.to_text()));
                    }
                }
            }
        }
        self
    }

    /// Stage 8: rewrite the key column as `YYYY-MM-DD` where it parses.
    pub fn format_dates(mut self) -> Self {
        for row in &mut self.rows {
            if let Some(cell) = row.cells.get_mut(KEY_COLUMN - 1) {
                *cell = format_date(cell);
            }
        }
        self
    }

    /// Stage 9: rename into the canonical schema when there are exactly ten
    /// columns; otherwise keep the positional labels and report it.
    pub fn label(self) -> Parsed {
        let Self {
            columns,
            rows,
            mut summary,
        } = self;
        let mut notices = Vec::new();

        summary.output_rows = rows.len();
        summary.columns = columns.len();

        let report = if columns.len() == CANONICAL_COLUMNS.len() {
            summary.labeled = true;
            Report::Records(rows.into_iter().map(into_record).collect())
        } else {
            notices.push(Notice::warning(
                Stage::Parse,
                format!(
                    "report has {} columns, expected {}; columns left unrenamed",
                    columns.len(),
                    CANONICAL_COLUMNS.len()
                ),
            ));
            Report::Unlabeled(UnlabeledReport { columns, rows })
        };

        if summary.footer_found {
            log::debug!(
                "parse: footer found, {} trailing row(s) dropped",
                summary.truncated_rows
            );
        } else {
            notices.push(Notice::info(
                Stage::Parse,
                "no \"Data Emissão\" footer found; all rows kept",
            ));
        }
        log::info!(
            "parse: {} input row(s), {} header(s), {} output row(s)",
            summary.input_rows,
            summary.header_rows,
            summary.output_rows
        );

        Parsed {
            report,
            summary,
            notices,
        }
    }
}

/// The only place that reads the canonical layout by position.
fn into_record(row: BlockRow) -> SalesRecord {
    let mut cells = row.cells.into_iter();
    let mut next = || cells.next().unwrap_or(CellValue::Empty);
    SalesRecord {
        descricao: row.descricao,
        data_venda: next().to_text(),
        pedido: next(),
        cliente: next().to_text(),
        vendedor: next(),
        valor_unitario: next().to_text(),
        unidades: next().to_text(),
        valor: next().to_text(),
        categoria: next().non_empty(),
        calibre: next().non_empty(),
        contact: Default::default(),
    }
}

/// `"Produto: - Cartucho .38 "` -> `"Cartucho .38"`.
pub fn clean_description(text: &str) -> String {
    let rest = match text.strip_prefix(DESCRIPTION_PREFIX) {
        Some(rest) => rest.trim_start(),
        None => text,
    };
    rest.trim_start_matches(|c: char| c == '-' || c == ' ')
        .trim()
        .to_string()
}

/// Decimal comma to dot, whitespace runs collapsed to one space, trimmed.
pub fn normalize_text(text: &str) -> String {
    text.replace(',', ".")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strict `dd/mm/yyyy`, then day-first fallbacks, else the trimmed text.
pub fn format_date(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::Empty => CellValue::Empty,
        CellValue::DateTime(dt) => CellValue::Text(dt.date().format("%Y-%m-%d").to_string()),
        other => {
            let raw = other.to_text();
            let text = raw.trim();
            match parse_strict(text).or_else(|| parse_day_first(text)) {
                Some(date) => CellValue::Text(date.format("%Y-%m-%d").to_string()),
                None => CellValue::Text(text.to_string()),
            }
        }
    }
}

fn parse_strict(text: &str) -> Option<NaiveDate> {
    let mut parts = text.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let digits = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
    };
    if !digits(day, 1, 2) || !digits(month, 1, 2) || !digits(year, 4, 4) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn parse_day_first(text: &str) -> Option<NaiveDate> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
        })
}
