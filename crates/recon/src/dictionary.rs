use std::collections::HashMap;

use crate::config::DuplicatePolicy;
use crate::error::ReconError;
use crate::model::{Notice, ReferenceEntry, Stage, Table};

/// Lowercase + trim. Every dictionary key and every lookup goes through this.
pub fn normalize_key(text: &str) -> String {
    text.to_lowercase().trim().to_string()
}

/// Normalized product key -> (category, caliber, ...), in insertion order.
///
/// Iteration order is the order in which each key was first seen; fuzzy
/// tie-breaks depend on it.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDictionary {
    entries: Vec<ReferenceEntry>,
    index: HashMap<String, usize>,
    // Sheet row of each entry's first occurrence
    first_rows: Vec<usize>,
}

/// A built dictionary plus the conditions reported while building it.
#[derive(Debug)]
pub struct DictionaryBuild {
    pub dictionary: ReferenceDictionary,
    pub notices: Vec<Notice>,
}

impl ReferenceDictionary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a reference table: first column is the product key, the
    /// remaining columns are stored verbatim.
    pub fn build(table: &Table, policy: DuplicatePolicy) -> Result<DictionaryBuild, ReconError> {
        let mut dictionary = Self::empty();
        let mut notices = Vec::new();

        if table.width() == 0 {
            notices.push(Notice::warning(
                Stage::Dictionary,
                "reference table has no columns; every record will be unmatched",
            ));
            return Ok(DictionaryBuild { dictionary, notices });
        }

        for (i, row) in table.rows.iter().enumerate() {
            // Sheet row number: header is row 1
            let sheet_row = i + 2;
            let key = normalize_key(&table.cell(i, 0).to_text());
            if key.is_empty() {
                notices.push(Notice::warning(
                    Stage::Dictionary,
                    format!("row {sheet_row}: empty product key, skipped"),
                ));
                continue;
            }
            let values: Vec<_> = row.iter().skip(1).cloned().collect();

            match dictionary.index.get(&key) {
                Some(&pos) => {
                    let first_row = dictionary.first_rows[pos];
                    match policy {
                        DuplicatePolicy::Reject => {
                            return Err(ReconError::DuplicateKey {
                                key,
                                first_row,
                                row: sheet_row,
                            });
                        }
                        DuplicatePolicy::KeepLast => {
                            notices.push(Notice::warning(
                                Stage::Dictionary,
                                format!(
                                    "duplicate key '{key}' on row {sheet_row} overwrites row {first_row}"
                                ),
                            ));
                            dictionary.entries[pos].values = values;
                        }
                        DuplicatePolicy::KeepFirst => {
                            notices.push(Notice::warning(
                                Stage::Dictionary,
                                format!(
                                    "duplicate key '{key}' on row {sheet_row} ignored, keeping row {first_row}"
                                ),
                            ));
                        }
                    }
                }
                None => {
                    dictionary.index.insert(key.clone(), dictionary.entries.len());
                    dictionary.first_rows.push(sheet_row);
                    dictionary.entries.push(ReferenceEntry { key, values });
                }
            }
        }

        if dictionary.is_empty() {
            notices.push(Notice::warning(
                Stage::Dictionary,
                "reference table produced no entries; every record will be unmatched",
            ));
        }
        log::debug!("reference dictionary: {} entries", dictionary.len());

        Ok(DictionaryBuild { dictionary, notices })
    }

    /// Exact lookup of an already-normalized key.
    pub fn get(&self, key: &str) -> Option<&ReferenceEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Exact lookup of free text, normalized first.
    pub fn lookup(&self, text: &str) -> Option<&ReferenceEntry> {
        self.get(&normalize_key(text))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    fn reference(rows: &[(&str, &str, &str)]) -> Table {
        Table::with_rows(
            vec!["produto".into(), "categoria".into(), "calibre".into()],
            rows.iter()
                .map(|(k, c, cal)| vec![CellValue::text(*k), CellValue::text(*c), CellValue::text(*cal)])
                .collect(),
        )
    }

    #[test]
    fn lookup_ignores_case_and_outer_whitespace() {
        let build = ReferenceDictionary::build(
            &reference(&[("Widget A", "Armas", "9mm")]),
            DuplicatePolicy::KeepLast,
        )
        .unwrap();
        let dict = build.dictionary;
        for probe in ["Widget A", "widget a", " widget a ", "WIDGET A\t"] {
            let entry = dict.lookup(probe).unwrap();
            assert_eq!(entry.key, "widget a");
            assert_eq!(entry.category(), Some(CellValue::text("Armas")));
            assert_eq!(entry.caliber(), Some(CellValue::text("9mm")));
        }
        assert!(build.notices.is_empty());
    }

    #[test]
    fn keep_last_overwrites_value_but_keeps_position() {
        let build = ReferenceDictionary::build(
            &reference(&[("a", "first", "1"), ("b", "b", "2"), ("A ", "last", "3")]),
            DuplicatePolicy::KeepLast,
        )
        .unwrap();
        let keys: Vec<_> = build.dictionary.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(
            build.dictionary.get("a").unwrap().category(),
            Some(CellValue::text("last"))
        );
        assert_eq!(build.notices.len(), 1);
        assert!(build.notices[0].message.contains("row 4 overwrites row 2"));
    }

    #[test]
    fn keep_first_ignores_later_duplicates() {
        let build = ReferenceDictionary::build(
            &reference(&[("a", "first", "1"), ("a", "last", "3")]),
            DuplicatePolicy::KeepFirst,
        )
        .unwrap();
        assert_eq!(
            build.dictionary.get("a").unwrap().category(),
            Some(CellValue::text("first"))
        );
        assert_eq!(build.notices.len(), 1);
    }

    #[test]
    fn reject_fails_on_duplicate() {
        let err = ReferenceDictionary::build(
            &reference(&[("a", "x", "1"), ("a", "y", "2")]),
            DuplicatePolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::DuplicateKey { first_row: 2, row: 3, .. }));
    }

    #[test]
    fn empty_keys_are_skipped() {
        let build = ReferenceDictionary::build(
            &reference(&[("", "x", "1"), ("  ", "y", "2"), ("k", "z", "3")]),
            DuplicatePolicy::KeepLast,
        )
        .unwrap();
        assert_eq!(build.dictionary.len(), 1);
        assert_eq!(build.notices.len(), 2);
    }

    #[test]
    fn empty_table_yields_empty_dictionary() {
        let build = ReferenceDictionary::build(&Table::default(), DuplicatePolicy::KeepLast).unwrap();
        assert!(build.dictionary.is_empty());
        assert_eq!(build.notices.len(), 1);
    }

    #[test]
    fn numeric_keys_render_as_text() {
        let table = Table::with_rows(
            vec!["produto".into(), "categoria".into()],
            vec![vec![CellValue::Number(1234.0), CellValue::text("Peças")]],
        );
        let build = ReferenceDictionary::build(&table, DuplicatePolicy::KeepLast).unwrap();
        let entry = build.dictionary.lookup("1234").unwrap();
        assert_eq!(entry.category(), Some(CellValue::text("Peças")));
        assert_eq!(entry.caliber(), None);
    }
}
