//! Demo configuration loaded from environment variables.

use common::AggregateId;

/// Demo configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `"json"` for JSON log lines, anything else for text
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory store when unset
/// - `DEMO_ORDER_ID`: identity of the sample order (default: a fresh UUID)
/// - `DEMO_DEBUG`: `"true"` or `"1"` to log every replayed event
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_json: bool,
    pub database_url: Option<String>,
    pub order_id: AggregateId,
    pub debug: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            order_id: lookup("DEMO_ORDER_ID")
                .filter(|id| !id.is_empty())
                .map(AggregateId::new)
                .unwrap_or_else(AggregateId::generate),
            debug: lookup("DEMO_DEBUG").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
