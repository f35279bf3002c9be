//! "Did you mean" suggestions for unknown definitions, groups and operations

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

const MAX_SUGGESTIONS: usize = 3;

/// Ranks `candidates` by similarity to `attempted` and returns the best few.
///
/// A candidate matches when either string fuzzy-matches the other, which
/// catches both dropped characters (`uplod`) and extra ones (`uploads`).
#[must_use]
pub fn suggest_similar<'a, I>(attempted: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let matcher = SkimMatcherV2::default().ignore_case();

    let mut scored: Vec<(i64, &str)> = candidates
        .into_iter()
        .filter(|candidate| !candidate.is_empty())
        .filter_map(|candidate| {
            let forward = matcher.fuzzy_match(candidate, attempted);
            let backward = matcher.fuzzy_match(attempted, candidate);
            forward.max(backward).map(|score| (score, candidate))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggests_missing_letters() {
        let suggestions = suggest_similar("uplod", ["upload", "download", "delete"]);
        assert_eq!(suggestions.first().map(String::as_str), Some("upload"));
    }

    #[test]
    fn test_suggests_extra_letters() {
        let suggestions = suggest_similar("buckets-list", ["buckets", "folders"]);
        assert_eq!(suggestions, vec!["buckets".to_string()]);
    }

    #[test]
    fn test_no_match_returns_empty() {
        let suggestions = suggest_similar("zzz", ["upload", "download"]);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_limits_to_three() {
        let suggestions = suggest_similar("a", ["a1", "a2", "a3", "a4"]);
        assert_eq!(suggestions.len(), 3);
    }
}
