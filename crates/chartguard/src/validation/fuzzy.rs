//! Approximate matching of unknown names against a dataset.

use serde::Serialize;
use strsim::normalized_damerau_levenshtein;

use crate::dataset::{DatasetContext, RefKind};

use super::sanitize::sanitize_user_input;

/// A close match for an unknown reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyMatch {
    pub name: String,
    pub kind: RefKind,
    pub type_label: String,
    pub score: f64,
}

impl FuzzyMatch {
    /// Suggestion text naming the match and its kind, safe to place in an
    /// error.
    pub fn suggestion(&self) -> String {
        let name = sanitize_user_input(&self.name);
        match self.kind {
            RefKind::Column => format!(
                "Did you mean '{}' (column, {})?",
                name,
                sanitize_user_input(&self.type_label)
            ),
            RefKind::Metric => format!("Did you mean '{}' (saved metric)?", name),
        }
    }
}

fn similarity(a: &str, b: &str) -> f64 {
    normalized_damerau_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// Rank `candidates` by similarity to `query`, keeping at most `limit`
/// scoring at least `cutoff`. Ties are broken alphabetically.
pub fn closest_matches<'a>(
    query: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    limit: usize,
    cutoff: f64,
) -> Vec<(&'a str, f64)> {
    let mut scored: Vec<(&str, f64)> = candidates
        .into_iter()
        .map(|c| (c, similarity(query, c)))
        .filter(|(_, score)| *score >= cutoff)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored.truncate(limit);
    scored
}

/// Columns and metrics of `dataset` whose names resemble `query`.
///
/// Comparison ignores case. A metric sharing a column's name is not
/// offered twice.
pub fn suggest_similar(
    query: &str,
    dataset: &DatasetContext,
    limit: usize,
    cutoff: f64,
) -> Vec<FuzzyMatch> {
    let mut matches: Vec<FuzzyMatch> = Vec::new();
    for candidate in dataset.candidates() {
        let name = candidate.name();
        if matches.iter().any(|m| m.name.eq_ignore_ascii_case(name)) {
            continue;
        }
        let score = similarity(query, name);
        if score >= cutoff {
            matches.push(FuzzyMatch {
                name: name.to_string(),
                kind: candidate.kind(),
                type_label: candidate.type_label().to_string(),
                score,
            });
        }
    }

    matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    matches.truncate(limit);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetColumn, DatasetMetric};

    fn dataset() -> DatasetContext {
        DatasetContext::new(1, "orders")
            .with_column(DatasetColumn::new("order_date", "DATE"))
            .with_column(DatasetColumn::new("order_id", "BIGINT"))
            .with_column(DatasetColumn::new("region", "VARCHAR"))
            .with_metric(DatasetMetric::new("total_revenue", "SUM(amount)"))
    }

    #[test]
    fn test_typo_found() {
        let matches = suggest_similar("ordr_date", &dataset(), 3, 0.6);
        assert_eq!(matches[0].name, "order_date");
        assert_eq!(matches[0].kind, RefKind::Column);
        assert!(matches[0].suggestion().contains("DATE"));
    }

    #[test]
    fn test_case_ignored() {
        let matches = suggest_similar("REGION", &dataset(), 3, 0.6);
        assert_eq!(matches[0].name, "region");
        assert!((matches[0].score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metric_matched() {
        let matches = suggest_similar("total_revenu", &dataset(), 3, 0.6);
        assert_eq!(matches[0].kind, RefKind::Metric);
        assert_eq!(matches[0].suggestion(), "Did you mean 'total_revenue' (saved metric)?");
    }

    #[test]
    fn test_cutoff_and_limit() {
        assert!(suggest_similar("zzzz", &dataset(), 3, 0.6).is_empty());
        assert!(suggest_similar("order", &dataset(), 1, 0.0).len() <= 1);
    }

    #[test]
    fn test_closest_matches_ordering() {
        let ranked = closest_matches("SUMM", ["SUM", "COUNT", "MIN"], 3, 0.5);
        assert_eq!(ranked[0].0, "SUM");
    }
}
