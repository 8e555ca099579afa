// Timestamped output files

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use pedidos_recon::config::OutputFormat;
use pedidos_recon::model::Table;

/// `<dir>/<prefix>-<YYYY-MM-DD_HH-MM>.<ext>`
pub fn timestamped_path(dir: &Path, prefix: &str, format: OutputFormat, at: NaiveDateTime) -> PathBuf {
    dir.join(format!(
        "{}-{}.{}",
        prefix,
        at.format("%Y-%m-%d_%H-%M"),
        format.extension()
    ))
}

/// Create the output directory (and parents) if absent.
pub fn prepare_output_dir(dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create output directory '{}': {}", dir.display(), e))
}

/// Write the table in the configured format, creating the directory first.
pub fn write_table(table: &Table, path: &Path, format: OutputFormat) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        prepare_output_dir(parent)?;
    }
    match format {
        OutputFormat::Xlsx => crate::xlsx::export(table, path),
        OutputFormat::Csv => crate::csv::export(table, path),
    }?;
    log::info!("wrote {} rows to {}", table.rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pedidos_recon::model::CellValue;
    use tempfile::tempdir;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 42)
            .unwrap()
    }

    #[test]
    fn test_path_naming() {
        let path = timestamped_path(Path::new("Final_Procesado"), "arquivo", OutputFormat::Xlsx, at());
        assert_eq!(path, Path::new("Final_Procesado/arquivo-2024-03-05_09-07.xlsx"));

        let path = timestamped_path(Path::new("out"), "pedidos", OutputFormat::Csv, at());
        assert_eq!(path, Path::new("out/pedidos-2024-03-05_09-07.csv"));
    }

    #[test]
    fn test_write_creates_nested_dir() {
        let dir = tempdir().unwrap();
        let out_dir = dir.path().join("a").join("b");
        let path = timestamped_path(&out_dir, "arquivo", OutputFormat::Csv, at());

        let table = Table::with_rows(vec!["descricao".into()], vec![vec![CellValue::text("x")]]);
        write_table(&table, &path, OutputFormat::Csv).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "descricao\nx\n");
    }

    #[test]
    fn test_prepare_existing_dir_is_ok() {
        let dir = tempdir().unwrap();
        prepare_output_dir(dir.path()).unwrap();
        prepare_output_dir(dir.path()).unwrap();
    }
}
