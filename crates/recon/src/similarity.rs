//! String similarity scorers on a 0-100 integer scale.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Normalized InDel ratio: `2 * LCS / (|a| + |b|)`.
    #[default]
    Indel,
    /// `strsim::normalized_levenshtein`.
    Levenshtein,
    /// `strsim::jaro_winkler`.
    JaroWinkler,
}

impl Scorer {
    /// Similarity of `a` and `b`, rounded to the nearest integer in 0..=100.
    pub fn score(&self, a: &str, b: &str) -> u8 {
        match self {
            Self::Indel => indel_ratio(a, b),
            Self::Levenshtein => to_percent(strsim::normalized_levenshtein(a, b)),
            Self::JaroWinkler => to_percent(strsim::jaro_winkler(a, b)),
        }
    }
}

impl std::fmt::Display for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indel => write!(f, "indel"),
            Self::Levenshtein => write!(f, "levenshtein"),
            Self::JaroWinkler => write!(f, "jaro_winkler"),
        }
    }
}

/// Rounds half to even, so 72.5 scores 72 and 73.5 scores 74.
fn to_percent(similarity: f64) -> u8 {
    (similarity * 100.0).round_ties_even().clamp(0.0, 100.0) as u8
}

/// InDel similarity ratio over Unicode scalar values.
///
/// Only insertions and deletions count as edits, so a substitution costs 2.
/// Two empty strings are identical (100). Exact halves round to even.
pub fn indel_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let lcs = lcs_len(&a, &b);

    // 200 * lcs / total in integers; a float would blur the exact halves
    let scaled = 200 * lcs;
    let (quot, rem) = (scaled / total, scaled % total);
    let rounded = match (2 * rem).cmp(&total) {
        std::cmp::Ordering::Less => quot,
        std::cmp::Ordering::Greater => quot + 1,
        std::cmp::Ordering::Equal => quot + quot % 2,
    };
    rounded.min(100) as u8
}

/// Longest common subsequence length, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
