//! Types used by the GitHub GraphQL client.

use serde::Deserialize;

/// A GitHub API authentication token.
#[derive(Debug, Clone, Default)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A GitHub GraphQL API endpoint URL.
#[derive(Debug, Clone)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self(GITHUB_GRAPHQL_URL.to_string())
    }
}

pub(super) const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Top-level GraphQL response body.
///
/// `data` and `errors` can coexist: GitHub answers lookups of a handle that
/// exists as only one of user/organization with a NOT_FOUND error for the
/// other selection AND a populated `data` object.
#[derive(Debug, Deserialize)]
pub(super) struct GraphQlEnvelope {
    pub(super) data: Option<AccountData>,
    pub(super) errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct GraphQlError {
    pub(super) message: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub(super) kind: Option<String>,
}

impl GraphQlError {
    pub(super) fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

/// The projected `data` object: at most one side is populated.
#[derive(Debug, Deserialize)]
pub(super) struct AccountData {
    pub(super) user: Option<UserNode>,
    pub(super) organization: Option<OrganizationNode>,
}

impl AccountData {
    pub(super) fn has_account(&self) -> bool {
        self.user.is_some() || self.organization.is_some()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserNode {
    pub(super) id: String,
    pub(super) name: Option<String>,
    pub(super) email: Option<String>,
    pub(super) avatar_url: Option<String>,
    pub(super) created_at: Option<String>,
    pub(super) followers: Option<CountNode>,
    pub(super) following: Option<CountNode>,
    #[serde(default)]
    pub(super) repositories: ConnectionNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OrganizationNode {
    pub(super) id: String,
    pub(super) name: Option<String>,
    pub(super) avatar_url: Option<String>,
    pub(super) created_at: Option<String>,
    pub(super) is_verified: Option<bool>,
    pub(super) members_with_role: Option<CountNode>,
    #[serde(default)]
    pub(super) repositories: ConnectionNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CountNode {
    pub(super) total_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ConnectionNode {
    #[serde(default)]
    pub(super) nodes: Vec<RepositoryNode>,
    #[serde(default)]
    pub(super) page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RepositoryNode {
    pub(super) name: String,
    #[serde(default)]
    pub(super) is_fork: bool,
    pub(super) primary_language: Option<LanguageNode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LanguageNode {
    pub(super) name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PageInfo {
    #[serde(default)]
    pub(super) has_next_page: bool,
    pub(super) end_cursor: Option<String>,
}
