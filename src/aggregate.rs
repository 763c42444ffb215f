//! Aggregation of repository lists into an ordered language series.

use crate::colors::language_color;
use crate::models::{LanguageBucket, Repository};
use std::collections::BTreeMap;

/// Reserved bucket key counting forked repositories.
pub const FORKS_KEY: &str = "__forks__";
/// Display label of the forks bucket.
pub const FORKS_LABEL: &str = "Forked repos";
/// Color of the forks bucket.
pub const FORKS_COLOR: &str = "#ededed";
/// Bucket collecting repositories without a reported language.
pub const UNKNOWN_KEY: &str = "Unknown";

/// Fold a repository list into language buckets, most-used first.
///
/// Forks are counted into the reserved `__forks__` bucket regardless of
/// language; repositories without a language land in `Unknown`. The sort is
/// stable on `value` descending, so equal counts keep alphabetical language
/// order with the forks bucket last.
#[must_use]
pub fn aggregate(repos: &[Repository]) -> Vec<LanguageBucket> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    let mut forks: u64 = 0;

    for repo in repos {
        if repo.is_fork {
            forks += 1;
            continue;
        }
        let language = repo
            .language
            .as_deref()
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .unwrap_or(UNKNOWN_KEY);
        *counts.entry(language).or_insert(0) += 1;
    }

    let mut buckets: Vec<LanguageBucket> = counts
        .into_iter()
        .map(|(language, value)| LanguageBucket {
            key: language.to_string(),
            label: language.to_string(),
            value,
            color: language_color(language).to_string(),
        })
        .collect();

    if forks > 0 {
        buckets.push(LanguageBucket {
            key: FORKS_KEY.to_string(),
            label: FORKS_LABEL.to_string(),
            value: forks,
            color: FORKS_COLOR.to_string(),
        });
    }

    buckets.sort_by(|a, b| b.value.cmp(&a.value));
    buckets
}
