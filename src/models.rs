//! Provider-agnostic account and language series models.

use serde::{Deserialize, Serialize};

/// Follower/member counts attached to a profile.
///
/// Users carry `followers`/`following`; organizations carry `members`.
/// Counts are present only when the provider returned them: an explicit
/// zero is kept, a missing count is omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<u64>,
}

impl Statistics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.followers.is_none() && self.following.is_none() && self.members.is_none()
    }
}

/// Fields common to both account variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub provider_user_id: String,
    /// Display name; omitted entirely when the provider value trims to empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Provider-formatted ISO-8601 string, passed through unparsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub is_verified: bool,
    /// Base URL of the provider instance, without a trailing slash.
    pub provider_base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
}

/// A resolved account, tagged `user` or `organization` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Account {
    User(Profile),
    Organization(Profile),
}

impl Account {
    #[must_use]
    pub fn profile(&self) -> &Profile {
        match self {
            Self::User(profile) | Self::Organization(profile) => profile,
        }
    }

    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.profile().avatar_url.as_deref()
    }
}

/// One public repository as projected from the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    /// Primary language; `None` when the provider reported none.
    pub language: Option<String>,
    pub is_fork: bool,
}

/// One entry in the aggregated language series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageBucket {
    pub key: String,
    pub label: String,
    pub value: u64,
    pub color: String,
}

/// The cacheable result of a successful search.
///
/// Cache-timing metadata is deliberately not part of this payload; the
/// store row carries the timestamps and they are re-attached on each read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPayload {
    pub profile: Account,
    pub data: Vec<LanguageBucket>,
}

/// A search result together with its timing metadata, in UNIX seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub payload: SearchPayload,
    pub generated_at: i64,
    pub cached_at: Option<i64>,
    pub cached_until: Option<i64>,
}
