//! Customer contact join: legal name first, trade name as fallback.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::ReconError;
use crate::model::{Contact, CustomerEntry, JoinSummary, Notice, SalesRecord, Stage, Table};

pub const LEGAL_NAME_COLUMN: &str = "Razão social";
pub const TRADE_NAME_COLUMN: &str = "Nome fantasia";
pub const CNPJ_COLUMN: &str = "CNPJ/CPF";
pub const PHONES_COLUMN: &str = "Telefones";
pub const EMAILS_COLUMN: &str = "E-mails";

/// Customer rows indexed by legal and by trade name.
#[derive(Debug, Clone, Default)]
pub struct CustomerDirectory {
    entries: Vec<CustomerEntry>,
    by_legal: HashMap<String, usize>,
    by_trade: HashMap<String, usize>,
}

#[derive(Debug)]
pub struct DirectoryBuild {
    pub directory: CustomerDirectory,
    pub notices: Vec<Notice>,
}

impl CustomerDirectory {
    /// Build from a customer table. Every one of the five columns must be
    /// present; labels are compared after trimming.
    pub fn from_table(table: &Table) -> Result<DirectoryBuild, ReconError> {
        let column = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| ReconError::MissingColumn {
                    table: "customers".into(),
                    column: name.into(),
                })
        };
        let legal_col = column(LEGAL_NAME_COLUMN)?;
        let trade_col = column(TRADE_NAME_COLUMN)?;
        let cnpj_col = column(CNPJ_COLUMN)?;
        let phones_col = column(PHONES_COLUMN)?;
        let emails_col = column(EMAILS_COLUMN)?;

        let mut directory = Self::default();
        let mut notices = Vec::new();

        for i in 0..table.rows.len() {
            let sheet_row = i + 2;
            let entry = CustomerEntry {
                legal_name: table.cell(i, legal_col).to_text(),
                trade_name: table.cell(i, trade_col).to_text(),
                contact: Contact {
                    cnpj_cpf: table.cell(i, cnpj_col).clone().non_empty(),
                    telefones: table.cell(i, phones_col).clone().non_empty(),
                    emails: table.cell(i, emails_col).clone().non_empty(),
                },
            };
            let pos = directory.entries.len();

            for (label, name, index) in [
                ("legal name", &entry.legal_name, &mut directory.by_legal),
                ("trade name", &entry.trade_name, &mut directory.by_trade),
            ] {
                if name.is_empty() {
                    continue;
                }
                match index.entry(name.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(pos);
                    }
                    Entry::Occupied(slot) => notices.push(Notice::warning(
                        Stage::Join,
                        format!(
                            "customer row {sheet_row}: {label} '{name}' already on row {}, first row kept",
                            slot.get() + 2
                        ),
                    )),
                }
            }
            directory.entries.push(entry);
        }

        log::debug!(
            "customer directory: {} rows, {} legal names, {} trade names",
            directory.entries.len(),
            directory.by_legal.len(),
            directory.by_trade.len()
        );
        Ok(DirectoryBuild { directory, notices })
    }

    pub fn by_legal_name(&self, name: &str) -> Option<&CustomerEntry> {
        self.by_legal.get(name).map(|&i| &self.entries[i])
    }

    pub fn by_trade_name(&self, name: &str) -> Option<&CustomerEntry> {
        self.by_trade.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attach contact data to every record.
///
/// Each field takes the legal-name match's value unless that is null, then
/// the trade-name match's value.
pub fn join_customers(
    mut records: Vec<SalesRecord>,
    directory: &CustomerDirectory,
) -> (Vec<SalesRecord>, JoinSummary) {
    let mut summary = JoinSummary::default();

    for record in &mut records {
        let legal = directory.by_legal_name(&record.cliente);
        let trade = directory.by_trade_name(&record.cliente);

        match (legal, trade) {
            (Some(_), _) => summary.by_legal_name += 1,
            (None, Some(_)) => summary.by_trade_name += 1,
            (None, None) => summary.unmatched += 1,
        }

        let first = legal.map(|c| c.contact.clone()).unwrap_or_default();
        let second = trade.map(|c| c.contact.clone()).unwrap_or_default();
        record.contact = first.or(second);
    }

    log::info!(
        "join: {} by legal name, {} by trade name, {} unmatched",
        summary.by_legal_name,
        summary.by_trade_name,
        summary.unmatched
    );
    (records, summary)
}
