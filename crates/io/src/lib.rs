// File I/O - CSV and Excel tables in, xlsx or CSV out

pub mod csv;
pub mod output;
pub mod xlsx;

use std::path::Path;

use pedidos_recon::model::Table;

/// Extensions handled by calamine.
pub const EXCEL_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Load one table from a file, dispatching on the extension.
///
/// `sheet` selects a worksheet in spreadsheet files and is ignored for
/// delimited text.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<Table, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if !path.exists() {
        return Err(format!("File not found: {}", path.display()));
    }

    match ext.as_str() {
        "csv" | "txt" => csv::import(path),
        "tsv" | "tab" => csv::import_tsv(path),
        e if EXCEL_EXTENSIONS.contains(&e) => xlsx::import_sheet(path, sheet),
        "" => Err(format!("Cannot determine file type of {}", path.display())),
        other => Err(format!("Unsupported file type '.{}': {}", other, path.display())),
    }
}
