use crate::config::PipelineConfig;
use crate::dictionary::ReferenceDictionary;
use crate::error::ReconError;
use crate::join::{join_customers, CustomerDirectory};
use crate::matcher::{enrich, FuzzyMatcher};
use crate::model::{
    EnrichmentSummary, JoinSummary, Notice, Report, RunMeta, RunSummary, Stage, Table,
    UnlabeledReport,
};
use crate::parser::parse_report;

/// Pre-loaded tables for one run.
///
/// A reference or customer table that failed to load is `None`; the caller
/// records why in `notices`.
#[derive(Debug, Default)]
pub struct PipelineInput {
    pub report: Table,
    pub reference: Option<Table>,
    pub customers: Option<Table>,
    pub notices: Vec<Notice>,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub report: Report,
    pub summary: RunSummary,
}

impl PipelineOutput {
    /// Whether the customer join ran and the contact columns exist.
    pub fn joined(&self) -> bool {
        self.summary.join.is_some()
    }

    /// The final table: canonical columns, plus contacts when joined.
    pub fn to_table(&self) -> Table {
        self.report.to_table(self.joined())
    }
}

/// Run every stage per config: dictionary, parse, enrich, join.
///
/// Only a `reject` duplicate policy can fail the run; everything else is
/// reported as a notice in the summary.
pub fn run(config: &PipelineConfig, input: PipelineInput) -> Result<PipelineOutput, ReconError> {
    let PipelineInput {
        report,
        reference,
        customers,
        mut notices,
    } = input;

    let dictionary = match reference {
        Some(table) => {
            let build = ReferenceDictionary::build(&table, config.matching.duplicate_keys)?;
            notices.extend(build.notices);
            build.dictionary
        }
        None => ReferenceDictionary::empty(),
    };

    let directory = customers.and_then(|table| match CustomerDirectory::from_table(&table) {
        Ok(build) => {
            notices.extend(build.notices);
            Some(build.directory)
        }
        Err(e) => {
            notices.push(Notice::warning(Stage::Join, format!("{e}; join skipped")));
            None
        }
    });

    let parsed = parse_report(report);
    notices.extend(parsed.notices);

    let matcher = FuzzyMatcher::from_config(&config.matching);
    let (report, enrichment, join) =
        classify_and_join(parsed.report, &dictionary, directory.as_ref(), &matcher, &mut notices);

    let summary = RunSummary {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        dictionary_entries: dictionary.len(),
        parse: parsed.summary,
        enrichment,
        total_records: report.len(),
        columns: report.columns(join.is_some()),
        join,
        notices,
    };

    Ok(PipelineOutput { report, summary })
}

fn classify_and_join(
    report: Report,
    dictionary: &ReferenceDictionary,
    directory: Option<&CustomerDirectory>,
    matcher: &FuzzyMatcher,
    notices: &mut Vec<Notice>,
) -> (Report, EnrichmentSummary, Option<JoinSummary>) {
    match report {
        Report::Records(records) => {
            let (records, enrichment) = enrich(records, dictionary, matcher);
            match directory {
                Some(directory) => {
                    let (records, join) = join_customers(records, directory);
                    (Report::Records(records), enrichment, Some(join))
                }
                None => (Report::Records(records), enrichment, None),
            }
        }
        Report::Unlabeled(UnlabeledReport { columns, rows }) => {
            let (rows, enrichment) = enrich(rows, dictionary, matcher);
            if directory.is_some() {
                notices.push(Notice::warning(
                    Stage::Join,
                    "report columns are unlabeled, 'cliente' cannot be located; join skipped",
                ));
            }
            (
                Report::Unlabeled(UnlabeledReport { columns, rows }),
                enrichment,
                None,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, Severity};

    fn config(duplicates: &str) -> PipelineConfig {
        PipelineConfig::from_toml(&format!(
            r#"
name = "engine test"
[inputs]
report = "r.csv"
reference = "p.csv"
customers = "c.csv"
[matching]
duplicate_keys = "{duplicates}"
"#
        ))
        .unwrap()
    }

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn report() -> Table {
        Table::with_rows(
            ["Data", "Pedido", "Cliente", "Vendedor", "Unit", "Qtde", "Valor"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec![
                vec![t("Produto: Cartucho 38")],
                vec![t("15/03/2024"), CellValue::Int(1), t("Loja Alfa"), t("Ana"), t("2,50"), t("4"), t("10,00")],
                vec![t("Data Emissão: 16/03/2024")],
            ],
        )
    }

    fn reference() -> Table {
        Table::with_rows(
            vec!["produto".into(), "categoria".into(), "calibre".into()],
            vec![
                vec![t("cartucho 38"), t("Munição"), t(".38")],
                vec![t("Cartucho 38 "), t("Munição"), t(".38 SPL")],
            ],
        )
    }

    fn customers() -> Table {
        Table::with_rows(
            ["Razão social", "Nome fantasia", "CNPJ/CPF", "Telefones", "E-mails"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec![vec![t("Alfa Ltda"), t("Loja Alfa"), t("11.111"), CellValue::Empty, t("a@ex.com")]],
        )
    }

    #[test]
    fn full_run_produces_contacts() {
        let output = run(
            &config("keep_last"),
            PipelineInput {
                report: report(),
                reference: Some(reference()),
                customers: Some(customers()),
                notices: Vec::new(),
            },
        )
        .unwrap();

        assert!(output.joined());
        let summary = &output.summary;
        assert_eq!(summary.total_records, 1);
        assert_eq!(summary.dictionary_entries, 1);
        assert_eq!(summary.enrichment.exact, 1);
        assert_eq!(summary.join.as_ref().unwrap().by_trade_name, 1);
        assert_eq!(summary.columns.len(), 13);
        // duplicate reference key
        assert_eq!(summary.warnings().count(), 1);

        let table = output.to_table();
        assert_eq!(table.columns[12], "E-mails");
        assert_eq!(table.rows[0][8], t("Munição"));
        assert_eq!(table.rows[0][9], t(".38 SPL"));
        assert_eq!(table.rows[0][10], t("11.111"));
        assert_eq!(table.rows[0][11], CellValue::Empty);
    }

    #[test]
    fn reject_policy_fails_run() {
        let err = run(
            &config("reject"),
            PipelineInput {
                report: report(),
                reference: Some(reference()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::DuplicateKey { .. }));
    }

    #[test]
    fn missing_inputs_degrade_to_warnings() {
        let output = run(
            &config("keep_last"),
            PipelineInput {
                report: report(),
                reference: None,
                customers: None,
                notices: vec![Notice::warning(Stage::Load, "reference: file not found")],
            },
        )
        .unwrap();
        assert!(!output.joined());
        assert_eq!(output.summary.enrichment.unmatched, 1);
        assert_eq!(output.summary.columns.len(), 10);
        assert_eq!(output.to_table().columns.len(), 10);
        assert_eq!(output.summary.notices[0].stage, Stage::Load);
    }

    #[test]
    fn customer_table_without_columns_skips_join() {
        let output = run(
            &config("keep_last"),
            PipelineInput {
                report: report(),
                customers: Some(Table::new(vec!["Razão social".into()])),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!output.joined());
        assert!(output
            .summary
            .notices
            .iter()
            .any(|n| n.stage == Stage::Join && n.severity == Severity::Warning));
    }

    #[test]
    fn unlabeled_report_enriches_but_skips_join() {
        let mut table = report();
        table.columns.push("Extra".into());
        let output = run(
            &config("keep_first"),
            PipelineInput {
                report: table,
                reference: Some(reference()),
                customers: Some(customers()),
                notices: Vec::new(),
            },
        )
        .unwrap();
        assert!(!output.report.is_labeled());
        assert!(!output.joined());
        assert_eq!(output.summary.enrichment.exact, 1);
        let table = output.to_table();
        assert_eq!(table.columns.len(), 11);
        // keep_first: the first row's caliber
        assert_eq!(table.rows[0][10], t(".38"));
        let join_warnings = output
            .summary
            .warnings()
            .filter(|n| n.stage == Stage::Join)
            .count();
        assert_eq!(join_warnings, 1);
    }
}
