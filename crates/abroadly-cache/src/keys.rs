//! Cache key builders.
//!
//! Every key is namespaced with the configured prefix so several deployments
//! can share one Redis instance.

/// Builds namespaced cache keys.
#[derive(Clone, Debug)]
pub struct CacheKeys {
    prefix: String,
}

impl CacheKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn build(&self, parts: &[&str]) -> String {
        format!("{}:{}", self.prefix, parts.join(":"))
    }

    /// Admin dashboard totals, growth and feeds.
    pub fn dashboard_stats(&self) -> String {
        self.build(&["dashboard", "stats"])
    }

    pub fn dashboard_trends(&self, months: u32) -> String {
        self.build(&["dashboard", "trends", &months.to_string()])
    }

    /// Pattern matching every dashboard key.
    pub fn dashboard_pattern(&self) -> String {
        self.build(&["dashboard", "*"])
    }
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new("abroadly")
    }
}
