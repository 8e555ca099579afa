//! `pedidos run` and `pedidos validate`: config-driven report reconciliation.

use std::path::{Path, PathBuf};

use pedidos_recon::model::{Notice, Stage};
use pedidos_recon::{PipelineConfig, PipelineInput, ReconError};

use crate::exit_codes::{EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_LOAD, EXIT_PIPELINE, EXIT_WRITE};
use crate::summary;
use crate::CliError;

fn load_config(config_path: &Path) -> Result<PipelineConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::new(
            EXIT_INVALID_CONFIG,
            format!("cannot read config {}: {e}", config_path.display()),
        )
    })?;
    PipelineConfig::from_toml(&config_str)
        .map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))
}

/// Directory that relative paths in the config resolve against.
fn base_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: '{}' (threshold {}, scorer {}, duplicate keys {}, output {})",
        config.name,
        config.matching.threshold,
        config.matching.scorer,
        config.matching.duplicate_keys,
        config.output.format.extension(),
    );
    Ok(())
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    threshold: Option<u8>,
    output_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut config = load_config(&config_path)?;
    if let Some(threshold) = threshold {
        config.matching.threshold = threshold;
    }
    let base = base_dir(&config_path);
    let inputs = &config.inputs;

    // The report is mandatory; nothing runs without it
    let report_path = base.join(&inputs.report);
    let report = pedidos_io::load_table(&report_path, Some(&inputs.report_sheet)).map_err(|e| {
        CliError::new(EXIT_LOAD, format!("cannot load report {}: {e}", report_path.display()))
            .with_hint("check inputs.report and inputs.report_sheet")
    })?;
    log::info!("report: {} rows from {}", report.rows.len(), report_path.display());

    let mut notices = Vec::new();
    let reference = load_optional(
        "reference",
        &base.join(&inputs.reference),
        Some(&inputs.reference_sheet),
        "continuing with an empty dictionary",
        &mut notices,
    );
    let customers = load_optional(
        "customers",
        &base.join(&inputs.customers),
        inputs.customers_sheet.as_deref(),
        "join skipped",
        &mut notices,
    );

    let output = pedidos_recon::run(
        &config,
        PipelineInput {
            report,
            reference,
            customers,
            notices,
        },
    )
    .map_err(pipeline_err)?;

    let out_dir = match output_dir {
        Some(dir) => dir,
        None => base.join(&config.output.dir),
    };
    let out_path = pedidos_io::output::timestamped_path(
        &out_dir,
        &config.output.prefix,
        config.output.format,
        chrono::Local::now().naive_local(),
    );
    let table = output.to_table();
    pedidos_io::output::write_table(&table, &out_path, config.output.format)
        .map_err(|e| CliError::new(EXIT_WRITE, e))?;

    if json_output {
        let mut value = serde_json::to_value(&output.summary)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        value["output"] = serde_json::Value::String(out_path.display().to_string());
        let json_str = serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        summary::print_summary(&output.summary, &table);
    }
    eprintln!("wrote {}", out_path.display());

    Ok(())
}

/// Load a secondary table; failure becomes a warning notice and `None`.
fn load_optional(
    role: &str,
    path: &Path,
    sheet: Option<&str>,
    consequence: &str,
    notices: &mut Vec<Notice>,
) -> Option<pedidos_recon::Table> {
    match pedidos_io::load_table(path, sheet) {
        Ok(table) => {
            log::info!("{role}: {} rows from {}", table.rows.len(), path.display());
            Some(table)
        }
        Err(e) => {
            notices.push(Notice::warning(
                Stage::Load,
                format!("cannot load {role} {}: {e}; {consequence}", path.display()),
            ));
            None
        }
    }
}

fn pipeline_err(e: ReconError) -> CliError {
    let err = CliError::new(EXIT_PIPELINE, e.to_string());
    match e {
        ReconError::DuplicateKey { .. } => err.with_hint(
            "fix the reference table or set matching.duplicate_keys = \"keep_last\"",
        ),
        _ => err,
    }
}
