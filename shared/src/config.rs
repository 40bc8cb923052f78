//! Configuration management for the skill Lambda.

use std::env;

use crate::{Error, Result};

/// Default idle timeout for the web app surface.
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 300;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Full location of the hosted web app (bucket website root)
    pub webapp_root: String,
    /// Seconds the web app may stay idle before the device closes it
    pub webapp_timeout_seconds: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let webapp_root = env::var("WEBAPP_S3_BUCKET_ROOT").map_err(|_| {
            Error::Config(
                "WEBAPP_S3_BUCKET_ROOT not set, web app location unknown".to_string(),
            )
        })?;

        let webapp_timeout_seconds = match env::var("WEBAPP_TIMEOUT_SECONDS") {
            Ok(raw) => raw.parse().map_err(|e| {
                Error::Config(format!("Invalid WEBAPP_TIMEOUT_SECONDS '{}': {}", raw, e))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECONDS,
        };

        Ok(Self::new(webapp_root, webapp_timeout_seconds))
    }

    /// Build a config directly. Trailing slashes on the root are dropped.
    pub fn new(webapp_root: impl Into<String>, webapp_timeout_seconds: u32) -> Self {
        let webapp_root = webapp_root.into().trim_end_matches('/').to_string();
        Self {
            webapp_root,
            webapp_timeout_seconds,
        }
    }

    /// URI of the web app entry page.
    pub fn webapp_index_uri(&self) -> String {
        format!("{}/index.html", self.webapp_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_uri_strips_trailing_slash() {
        let config = Config::new("https://bucket.s3.amazonaws.com/", 300);
        assert_eq!(
            config.webapp_index_uri(),
            "https://bucket.s3.amazonaws.com/index.html"
        );
    }
}
