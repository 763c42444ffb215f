//! Upstream provider identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A version-control provider known to the service.
///
/// Only GitHub is currently wired to an upstream client; the other
/// variants are accepted at the HTTP edge and answered with
/// `not_implemented`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Gitlab,
    Bitbucket,
}

impl Provider {
    /// Parse a provider name as it appears in query strings.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "github" => Some(Self::Github),
            "gitlab" => Some(Self::Gitlab),
            "bitbucket" => Some(Self::Bitbucket),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Bitbucket => "bitbucket",
        }
    }

    /// Whether an upstream client exists for this provider.
    #[must_use]
    pub fn is_implemented(self) -> bool {
        matches!(self, Self::Github)
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::Github
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Provider;
    use rstest::rstest;

    #[rstest]
    #[case("github", Some(Provider::Github))]
    #[case("GitHub", Some(Provider::Github))]
    #[case(" gitlab ", Some(Provider::Gitlab))]
    #[case("bitbucket", Some(Provider::Bitbucket))]
    #[case("sourcehut", None)]
    #[case("", None)]
    fn parse_cases(#[case] input: &str, #[case] expected: Option<Provider>) {
        assert_eq!(Provider::parse(input), expected);
    }

    #[test]
    fn only_github_is_implemented() {
        assert!(Provider::Github.is_implemented());
        assert!(!Provider::Gitlab.is_implemented());
        assert!(!Provider::Bitbucket.is_implemented());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Provider::Github).expect("serialize");
        assert_eq!(json, "\"github\"");
    }
}
