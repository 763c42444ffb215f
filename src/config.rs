//! Service configuration from flags and environment.

use clap::Parser;

/// Longest cache lifetime the service accepts.
const MAX_CACHE_TTL_HOURS: u32 = 24;

/// Runtime configuration for the `lingo` service.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lingo",
    about = "Language statistics service for GitHub accounts",
    version
)]
pub struct Config {
    /// Port to bind the HTTP server to.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// GitHub API token; anonymous access when unset.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GraphQL endpoint override, e.g. a GitHub Enterprise instance.
    #[arg(long, env = "GITHUB_GRAPHQL_URL")]
    pub github_api_url: Option<String>,

    /// SQLite database path, or ":memory:" for a throwaway database.
    #[arg(long, env = "LINGO_DB_PATH", default_value = "lingo.db")]
    pub db_path: String,

    /// Comma-separated list of allowed CORS origins; empty allows any.
    #[arg(long, env = "LINGO_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Serve results from the cache.
    #[arg(
        long,
        env = "LINGO_ENABLE_CACHE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub enable_cache: bool,

    /// Cache entry lifetime in hours.
    #[arg(long, env = "LINGO_CACHE_TTL_HOURS", default_value_t = 12)]
    pub cache_ttl_hours: u32,

    /// Maximum simultaneous upstream fetches.
    #[arg(long, env = "LINGO_CONCURRENCY_LIMIT", default_value_t = 20)]
    pub concurrency_limit: usize,

    /// Log filter when RUST_LOG is unset, e.g. "info" or "lingo=debug".
    #[arg(long, env = "LINGO_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Enforce value constraints, capping the TTL rather than refusing it.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero TTL or a zero concurrency limit.
    pub fn validate(mut self) -> anyhow::Result<Self> {
        if self.cache_ttl_hours == 0 {
            anyhow::bail!("cache TTL must be a positive number of hours");
        }
        if self.cache_ttl_hours > MAX_CACHE_TTL_HOURS {
            tracing::warn!(
                requested = self.cache_ttl_hours,
                capped = MAX_CACHE_TTL_HOURS,
                "cache TTL exceeds the maximum, capping"
            );
            self.cache_ttl_hours = MAX_CACHE_TTL_HOURS;
        }
        if self.concurrency_limit == 0 {
            anyhow::bail!("concurrency limit must be positive");
        }
        Ok(self)
    }

    /// The configured TTL in seconds, as the store expects it.
    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        i64::from(self.cache_ttl_hours) * 3600
    }
}
