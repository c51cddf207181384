//! Relevance of a candidate product name to a free-text search query.
//!
//! All comparisons are case-insensitive. Query tokens shorter than three
//! characters ("of", "1l", "g") are ignored for token matching.

/// Tokens must be longer than this to count.
const MIN_TOKEN_CHARS: usize = 2;

/// Weights for [`RelevanceScorer::score`]. Empirical; tune freely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceWeights {
    pub exact: f64,
    pub starts_with: f64,
    pub contains: f64,
    pub per_token: f64,
    pub token_fraction: f64,
    pub short_name_bonus: f64,
    /// How many characters longer than the query a candidate may be and
    /// still receive the short-name bonus.
    pub short_name_slack: usize,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            exact: 100.0,
            starts_with: 50.0,
            contains: 30.0,
            per_token: 10.0,
            token_fraction: 20.0,
            short_name_bonus: 15.0,
            short_name_slack: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceScorer {
    weights: RelevanceWeights,
}

impl RelevanceScorer {
    #[must_use]
    pub fn new(weights: RelevanceWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn weights(&self) -> &RelevanceWeights {
        &self.weights
    }

    /// `true` when at least half of the query's tokens (and never fewer than
    /// one) occur in the candidate name.
    ///
    /// A query with no qualifying tokens can match none, so nothing is
    /// relevant to it.
    #[must_use]
    pub fn is_relevant(&self, candidate: &str, query: &str) -> bool {
        let candidate = candidate.trim().to_lowercase();
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }

        let tokens = query_tokens(&query);
        if tokens.is_empty() {
            return false;
        }

        let matched = count_matches(&candidate, &tokens);
        let required = tokens.len().div_ceil(2).max(1);
        matched >= required
    }

    /// Weighted relevance score; higher is more relevant.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // token counts are tiny
    pub fn score(&self, candidate: &str, query: &str) -> f64 {
        let w = &self.weights;
        let candidate = candidate.trim().to_lowercase();
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return 0.0;
        }

        let mut score = 0.0;
        if candidate == query {
            score += w.exact;
        }
        if candidate.starts_with(&query) {
            score += w.starts_with;
        }
        let contains = candidate.contains(&query);
        if contains {
            score += w.contains;
        }

        let tokens = query_tokens(&query);
        if !tokens.is_empty() {
            let matched = count_matches(&candidate, &tokens);
            score += matched as f64 * w.per_token;
            score += (matched as f64 / tokens.len() as f64) * w.token_fraction;
        }

        if contains && candidate.chars().count() <= query.chars().count() + w.short_name_slack {
            score += w.short_name_bonus;
        }

        score
    }
}

fn query_tokens(query: &str) -> Vec<&str> {
    query
        .split_whitespace()
        .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
        .collect()
}

fn count_matches(candidate: &str, tokens: &[&str]) -> usize {
    tokens.iter().filter(|t| candidate.contains(**t)).count()
}
