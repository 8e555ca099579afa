// Excel import/export (xlsx, xlsm, xls, xlsb, ods via calamine; xlsx via rust_xlsxwriter)

use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

use pedidos_recon::model::{CellValue, Table};

/// Excel caps
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Sheet name used when writing a single-table workbook.
pub const OUTPUT_SHEET_NAME: &str = "Sheet1";

const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Import one sheet as a table: first row = column labels.
///
/// `sheet = None` reads the first sheet. Rows that are entirely empty are
/// dropped; a sheet with no rows at all yields a table with no columns.
pub fn import_sheet(path: &Path, sheet: Option<&str>) -> Result<Table, String> {
    let start_time = Instant::now();

    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| {
                format!(
                    "Sheet '{}' not found (available: {})",
                    name,
                    sheet_names.join(", ")
                )
            })?,
        None => sheet_names[0].clone(),
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let table = range_to_table(&range);
    log::debug!(
        "imported sheet '{}' from {}: {} columns, {} rows in {} ms",
        sheet_name,
        path.display(),
        table.width(),
        table.rows.len(),
        start_time.elapsed().as_millis()
    );
    Ok(table)
}

fn range_to_table(range: &Range<Data>) -> Table {
    let (height, width) = range.get_size();
    if height == 0 || width == 0 {
        return Table::default();
    }

    // Range start offset (data may not begin at A1); leading columns stay
    // positional, leading rows are skipped
    let (_, data_start_col) = range.start().unwrap_or((0, 0));
    let lead = data_start_col as usize;
    let total_cols = (lead + width).min(MAX_COLS);

    let mut rows = range.rows().take(MAX_ROWS).map(|row| {
        let mut cells = vec![CellValue::Empty; lead.min(total_cols)];
        cells.extend(row.iter().take(total_cols - cells.len()).map(convert_cell));
        cells
    });

    let header = rows.next().unwrap_or_default();
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell.to_text().trim() {
            "" => format!("Unnamed: {i}"),
            _ => cell.to_text(),
        })
        .collect();

    let rows = rows
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();
    Table::with_rows(columns, rows)
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Int(*n),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => match serial_to_datetime(dt.as_f64()) {
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
            })
            .map(CellValue::DateTime)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Excel 1900 date system; serial 0 is 1899-12-30 (Lotus leap-year bug folded in).
fn excel_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Round to the millisecond to absorb float noise in the time part
    let millis = (serial * 86_400_000.0).round() as i64;
    excel_epoch()?.checked_add_signed(Duration::milliseconds(millis))
}

fn datetime_to_serial(value: &NaiveDateTime) -> Option<f64> {
    let delta = value.signed_duration_since(excel_epoch()?);
    Some(delta.num_milliseconds() as f64 / 86_400_000.0)
}

/// Write a table to a single-sheet xlsx file with a bold header row.
pub fn export(table: &Table, path: &Path) -> Result<(), String> {
    if table.width() > MAX_COLS || table.rows.len() + 1 > MAX_ROWS {
        return Err(format!(
            "Table of {}x{} exceeds Excel limits",
            table.rows.len() + 1,
            table.width()
        ));
    }

    let mut xlsx_workbook = XlsxWorkbook::new();
    let worksheet = xlsx_workbook
        .add_worksheet()
        .set_name(OUTPUT_SHEET_NAME)
        .map_err(|e| format!("Failed to create sheet '{}': {}", OUTPUT_SHEET_NAME, e))?;

    let header_format = Format::new().set_bold();
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

    for (col, label) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, label, &header_format)
            .map_err(|e| format!("Failed to write header '{}': {}", label, e))?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row32 = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let col16 = col_idx as u16;
            let written = match cell {
                CellValue::Empty => continue,
                CellValue::Text(s) => worksheet.write_string(row32, col16, s).map(|_| ()),
                CellValue::Number(n) => worksheet.write_number(row32, col16, *n).map(|_| ()),
                CellValue::Int(n) => worksheet.write_number(row32, col16, *n as f64).map(|_| ()),
                CellValue::Bool(b) => worksheet.write_boolean(row32, col16, *b).map(|_| ()),
                CellValue::DateTime(dt) => match datetime_to_serial(dt) {
                    Some(serial) => worksheet
                        .write_number_with_format(row32, col16, serial, &datetime_format)
                        .map(|_| ()),
                    None => worksheet.write_string(row32, col16, cell.to_text()).map(|_| ()),
                },
            };
            written.map_err(|e| {
                format!("Failed to write cell ({}, {}): {}", row32 + 1, col_idx + 1, e)
            })?;
        }
    }

    worksheet.autofit();

    xlsx_workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    #[test]
    fn test_serial_conversion() {
        let dt = serial_to_datetime(45366.5).unwrap();
        assert_eq!(dt.to_string(), "2024-03-15 12:00:00");
        assert_eq!(datetime_to_serial(&dt), Some(45366.5));
        assert!(serial_to_datetime(-1.0).is_none());
    }

    #[test]
    fn test_xlsx_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let dt = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();

        let table = Table::with_rows(
            vec!["descricao".into(), "pedido".into(), "valor".into(), "quando".into()],
            vec![
                vec![t("Cartucho .38"), CellValue::Int(101), t("10.50"), CellValue::DateTime(dt)],
                vec![t("Pistola"), CellValue::Number(2.5), CellValue::Empty, CellValue::Bool(true)],
            ],
        );
        export(&table, &path).unwrap();

        let imported = import_sheet(&path, Some(OUTPUT_SHEET_NAME)).unwrap();
        assert_eq!(imported.columns, table.columns);
        assert_eq!(imported.rows.len(), 2);
        assert_eq!(imported.rows[0][0], t("Cartucho .38"));
        // xlsx stores every number as a float
        assert_eq!(imported.rows[0][1].to_text(), "101");
        assert_eq!(imported.rows[0][2], t("10.50"));
        assert_eq!(imported.rows[0][3], CellValue::DateTime(dt));
        assert_eq!(imported.rows[1][1], CellValue::Number(2.5));
        assert_eq!(imported.rows[1][2], CellValue::Empty);
        assert_eq!(imported.rows[1][3], CellValue::Bool(true));
    }

    #[test]
    fn test_missing_sheet_lists_available() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("one.xlsx");
        export(&Table::with_rows(vec!["a".into()], vec![vec![t("x")]]), &path).unwrap();

        let err = import_sheet(&path, Some("Relatório")).unwrap_err();
        assert!(err.contains("Relatório"));
        assert!(err.contains("Sheet1"));
    }

    #[test]
    fn test_blank_rows_dropped_and_headers_named() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gaps.xlsx");
        let table = Table::with_rows(
            vec!["a".into(), "".into()],
            vec![
                vec![t("1"), t("2")],
                vec![CellValue::Empty, CellValue::Empty],
                vec![t("3"), CellValue::Empty],
            ],
        );
        export(&table, &path).unwrap();

        let imported = import_sheet(&path, None).unwrap();
        assert_eq!(imported.columns, vec!["a".to_string(), "Unnamed: 1".to_string()]);
        assert_eq!(imported.rows.len(), 2);
        assert_eq!(imported.rows[1], vec![t("3"), CellValue::Empty]);
    }

    #[test]
    fn test_import_nonexistent_file() {
        let err = import_sheet(Path::new("/nonexistent/relatorio.xlsx"), None).unwrap_err();
        assert!(err.starts_with("Failed to open Excel file"));
    }
}
