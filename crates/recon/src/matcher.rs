//! Product classification: exact dictionary lookup with a fuzzy fallback.
//!
//! The fallback scans every dictionary key for every unmatched record, so a
//! run costs O(records x entries) similarity calls. Reference tables are a
//! few thousand rows at most; no approximate index is kept.

use crate::config::MatchingConfig;
use crate::dictionary::{normalize_key, ReferenceDictionary};
use crate::model::{BlockRow, CellValue, EnrichmentSummary, ReferenceEntry, SalesRecord};
use crate::similarity::Scorer;

/// A row that carries a product description and receives a classification.
pub trait Classify {
    fn descricao(&self) -> &str;
    fn assign(&mut self, entry: &ReferenceEntry);
}

impl Classify for SalesRecord {
    fn descricao(&self) -> &str {
        &self.descricao
    }

    fn assign(&mut self, entry: &ReferenceEntry) {
        self.categoria = entry.category();
        self.calibre = entry.caliber();
    }
}

/// Positional rows keep `categoria` and `calibre` as their last two cells.
impl Classify for BlockRow {
    fn descricao(&self) -> &str {
        &self.descricao
    }

    fn assign(&mut self, entry: &ReferenceEntry) {
        let n = self.cells.len();
        if n < 2 {
            return;
        }
        self.cells[n - 2] = entry.category().unwrap_or(CellValue::Empty);
        self.cells[n - 1] = entry.caliber().unwrap_or(CellValue::Empty);
    }
}

/// How one description resolved against the dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    Exact(&'a ReferenceEntry),
    Fuzzy { entry: &'a ReferenceEntry, score: u8 },
    /// Best score seen, 0 when nothing scored at all.
    Unmatched { best_score: u8 },
}

impl<'a> Resolution<'a> {
    pub fn entry(&self) -> Option<&'a ReferenceEntry> {
        match self {
            Self::Exact(entry) | Self::Fuzzy { entry, .. } => Some(*entry),
            Self::Unmatched { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    pub scorer: Scorer,
    pub threshold: u8,
}

impl FuzzyMatcher {
    pub fn new(scorer: Scorer, threshold: u8) -> Self {
        Self { scorer, threshold }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(config.scorer, config.threshold)
    }

    /// Exact lookup first; otherwise the best-scoring key in dictionary order.
    ///
    /// Only a strictly higher score replaces the current best, so the first
    /// key wins ties and a key scoring 0 is never chosen.
    pub fn resolve<'a>(&self, dict: &'a ReferenceDictionary, text: &str) -> Resolution<'a> {
        let key = normalize_key(text);
        if let Some(entry) = dict.get(&key) {
            return Resolution::Exact(entry);
        }

        let mut best: Option<&ReferenceEntry> = None;
        let mut best_score = 0u8;
        for entry in dict.iter() {
            let score = self.scorer.score(&key, &entry.key);
            if score > best_score {
                best_score = score;
                best = Some(entry);
            }
        }

        match best {
            Some(entry) if best_score >= self.threshold => Resolution::Fuzzy {
                entry,
                score: best_score,
            },
            _ => Resolution::Unmatched { best_score },
        }
    }
}

/// Classify every row, returning the rows and the outcome counters.
pub fn enrich<T: Classify>(
    mut rows: Vec<T>,
    dict: &ReferenceDictionary,
    matcher: &FuzzyMatcher,
) -> (Vec<T>, EnrichmentSummary) {
    let mut summary = EnrichmentSummary {
        threshold: matcher.threshold,
        scorer: matcher.scorer.to_string(),
        ..Default::default()
    };

    for row in &mut rows {
        let resolution = matcher.resolve(dict, row.descricao());
        match &resolution {
            Resolution::Exact(_) => summary.exact += 1,
            Resolution::Fuzzy { entry, score } => {
                log::debug!(
                    "fuzzy match '{}' -> '{}' ({score})",
                    row.descricao(),
                    entry.key
                );
                summary.fuzzy += 1;
            }
            Resolution::Unmatched { .. } => summary.unmatched += 1,
        }
        if let Some(entry) = resolution.entry() {
            row.assign(entry);
        }
    }

    log::info!(
        "enrich: {} exact, {} fuzzy, {} unmatched",
        summary.exact,
        summary.fuzzy,
        summary.unmatched
    );
    (rows, summary)
}
