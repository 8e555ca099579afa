use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Cells + tables
// ---------------------------------------------------------------------------

/// A single untyped spreadsheet cell as delivered by the importers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Null in the dataframe sense: no value, or an empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell the way the sheet displays it.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                // Integers without decimals
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Self::Int(n) => n.to_string(),
            Self::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// `None` for empty cells, so callers can chain `Option::or`.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    fn sort_rank(&self) -> u8 {
        match self {
            Self::Number(_) | Self::Int(_) => 0,
            Self::DateTime(_) => 1,
            Self::Bool(_) => 2,
            Self::Text(s) if !s.is_empty() => 3,
            Self::Text(_) | Self::Empty => 4,
        }
    }

    /// Total order used by the report sort: numbers, date-times, booleans,
    /// text, then empty cells last.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        let rank = self.sort_rank().cmp(&other.sort_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Number(_) | Self::Int(_), Self::Number(_) | Self::Int(_)) => {
                let (a, b) = (self.as_f64(), other.as_f64());
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Int(n) => *n as f64,
            _ => f64::NAN,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

pub static EMPTY_CELL: CellValue = CellValue::Empty;

/// Column labels plus ordered rows, the shape every importer produces and
/// every exporter consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    /// Position of a column whose trimmed label equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.trim() == name)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (row, col); short rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

// ---------------------------------------------------------------------------
// Canonical schema
// ---------------------------------------------------------------------------

pub const CANONICAL_COLUMNS: [&str; 10] = [
    "descricao",
    "data_venda",
    "pedido",
    "cliente",
    "vendedor",
    "valor_unitario",
    "unidades",
    "valor",
    "categoria",
    "calibre",
];

pub const CONTACT_COLUMNS: [&str; 3] = ["CNPJ/CPF", "Telefones", "E-mails"];

/// Contact fields attached by the customer join. `None` means null.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Contact {
    #[serde(rename = "CNPJ/CPF")]
    pub cnpj_cpf: Option<CellValue>,
    #[serde(rename = "Telefones")]
    pub telefones: Option<CellValue>,
    #[serde(rename = "E-mails")]
    pub emails: Option<CellValue>,
}

impl Contact {
    /// Field-wise null coalescing: keep `self` where present, else `fallback`.
    pub fn or(self, fallback: Contact) -> Contact {
        Contact {
            cnpj_cpf: self.cnpj_cpf.or(fallback.cnpj_cpf),
            telefones: self.telefones.or(fallback.telefones),
            emails: self.emails.or(fallback.emails),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cnpj_cpf.is_none() && self.telefones.is_none() && self.emails.is_none()
    }
}

/// A fully labeled report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub descricao: String,
    pub data_venda: String,
    pub pedido: CellValue,
    pub cliente: String,
    pub vendedor: CellValue,
    pub valor_unitario: String,
    pub unidades: String,
    pub valor: String,
    pub categoria: Option<CellValue>,
    pub calibre: Option<CellValue>,
    #[serde(flatten)]
    pub contact: Contact,
}

impl SalesRecord {
    /// Cells in canonical column order followed by the contact columns.
    pub fn to_cells(&self) -> Vec<CellValue> {
        let opt = |v: &Option<CellValue>| v.clone().unwrap_or(CellValue::Empty);
        vec![
            CellValue::text(&self.descricao),
            CellValue::text(&self.data_venda),
            self.pedido.clone(),
            CellValue::text(&self.cliente),
            self.vendedor.clone(),
            CellValue::text(&self.valor_unitario),
            CellValue::text(&self.unidades),
            CellValue::text(&self.valor),
            opt(&self.categoria),
            opt(&self.calibre),
            opt(&self.contact.cnpj_cpf),
            opt(&self.contact.telefones),
            opt(&self.contact.emails),
        ]
    }
}

// ---------------------------------------------------------------------------
// Parsed report
// ---------------------------------------------------------------------------

/// One report row while it is still positional.
///
/// `descricao` is column 0 of the working layout; `cells[i]` is column
/// `i + 1`. Once the classification columns are appended they are the last
/// two cells.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRow {
    pub descricao: String,
    pub cells: Vec<CellValue>,
}

impl BlockRow {
    /// Cell at column `pos` of the working layout (`pos >= 1`).
    pub fn cell(&self, pos: usize) -> &CellValue {
        pos.checked_sub(1)
            .and_then(|i| self.cells.get(i))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn to_cells(&self) -> Vec<CellValue> {
        let mut out = Vec::with_capacity(self.cells.len() + 1);
        out.push(CellValue::text(&self.descricao));
        out.extend(self.cells.iter().cloned());
        out
    }
}

/// Report whose column count did not fit the canonical schema. Labels are
/// `descricao`, the sheet's own headers, `categoria`, `calibre`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlabeledReport {
    pub columns: Vec<String>,
    pub rows: Vec<BlockRow>,
}

/// Output of the block parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Records(Vec<SalesRecord>),
    Unlabeled(UnlabeledReport),
}

impl Report {
    pub fn len(&self) -> usize {
        match self {
            Self::Records(records) => records.len(),
            Self::Unlabeled(report) => report.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_labeled(&self) -> bool {
        matches!(self, Self::Records(_))
    }

    /// Column labels of the table `to_table` would produce.
    pub fn columns(&self, with_contacts: bool) -> Vec<String> {
        match self {
            Self::Records(_) => {
                let mut columns: Vec<String> =
                    CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect();
                if with_contacts {
                    columns.extend(CONTACT_COLUMNS.iter().map(|c| c.to_string()));
                }
                columns
            }
            Self::Unlabeled(report) => report.columns.clone(),
        }
    }

    /// Flatten into a table. Contact columns appear only for labeled records
    /// that went through the customer join.
    pub fn to_table(&self, with_contacts: bool) -> Table {
        let columns = self.columns(with_contacts);
        let rows = match self {
            Self::Records(records) => records
                .iter()
                .map(|r| {
                    let mut cells = r.to_cells();
                    cells.truncate(columns.len());
                    cells
                })
                .collect(),
            Self::Unlabeled(report) => report.rows.iter().map(BlockRow::to_cells).collect(),
        };
        Table::with_rows(columns, rows)
    }
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// Values stored under one normalized product key: (category, caliber, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
    pub key: String,
    pub values: Vec<CellValue>,
}

impl ReferenceEntry {
    pub fn category(&self) -> Option<CellValue> {
        self.values.first().cloned().and_then(CellValue::non_empty)
    }

    pub fn caliber(&self) -> Option<CellValue> {
        self.values.get(1).cloned().and_then(CellValue::non_empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerEntry {
    pub legal_name: String,
    pub trade_name: String,
    pub contact: Contact,
}

// ---------------------------------------------------------------------------
// Summary + notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Dictionary,
    Parse,
    Join,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Dictionary => write!(f, "dictionary"),
            Self::Parse => write!(f, "parse"),
            Self::Join => write!(f, "join"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// A reported, non-fatal condition raised by a stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub stage: Stage,
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("{stage}: {message}");
        Self {
            stage,
            severity: Severity::Warning,
            message,
        }
    }

    pub fn info(stage: Stage, message: impl Into<String>) -> Self {
        let message = message.into();
        log::info!("{stage}: {message}");
        Self {
            stage,
            severity: Severity::Info,
            message,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseSummary {
    pub input_rows: usize,
    pub header_rows: usize,
    pub rows_before_first_header: usize,
    pub footer_found: bool,
    pub truncated_rows: usize,
    pub output_rows: usize,
    pub columns: usize,
    pub labeled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichmentSummary {
    pub exact: usize,
    pub fuzzy: usize,
    pub unmatched: usize,
    pub threshold: u8,
    pub scorer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinSummary {
    pub by_legal_name: usize,
    pub by_trade_name: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub meta: RunMeta,
    pub dictionary_entries: usize,
    pub parse: ParseSummary,
    pub enrichment: EnrichmentSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinSummary>,
    pub total_records: usize,
    pub columns: Vec<String>,
    pub notices: Vec<Notice>,
}

impl RunSummary {
    pub fn warnings(&self) -> impl Iterator<Item = &Notice> {
        self.notices
            .iter()
            .filter(|n| n.severity == Severity::Warning)
    }

    pub fn to_json_pretty(&self) -> Result<String, crate::error::ReconError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::error::ReconError::Serialize(e.to_string()))
    }
}
