use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::blog::api::DEFAULT_BASE_URL;
use crate::blog::{AppFlags, BlogApi};
use crate::subscription::http::{ConfigError, QueryConfig};

/// Command-line options. Every flag can also be set through the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "blogem", version, about = "Read a JSONPlaceholder blog in the terminal")]
pub struct Args {
    /// Base URL of the blog API
    #[arg(long, env = "BLOGEM_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Maximum redraws per second
    #[arg(long, env = "BLOGEM_FRAME_RATE", default_value_t = 30)]
    pub frame_rate: u32,

    /// Seconds before cached data is considered stale
    #[arg(long, env = "BLOGEM_STALE_TIME_SECS", default_value_t = 600)]
    pub stale_time_secs: u64,

    /// Seconds an unused cache entry is kept
    /// Must not be shorter than --stale-time-secs
    #[arg(long, env = "BLOGEM_CACHE_TIME_SECS", default_value_t = 900)]
    pub cache_time_secs: u64,

    /// Write logs to this file (the terminal is owned by the UI)
    #[arg(long, env = "BLOGEM_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// The cache policy of the reader: configured windows, no automatic refetching.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the cache time is shorter than the stale time.
    pub fn query_config(&self) -> Result<QueryConfig, ConfigError> {
        let config = QueryConfig::new(
            Duration::from_secs(self.stale_time_secs),
            Duration::from_secs(self.cache_time_secs),
        )?;
        Ok(config.without_refetch())
    }

    #[must_use]
    pub fn api(&self) -> BlogApi {
        BlogApi::new(self.api_url.as_str())
    }

    /// # Errors
    ///
    /// See [`Args::query_config`].
    pub fn flags(&self) -> Result<AppFlags, ConfigError> {
        Ok(AppFlags {
            api: self.api(),
            config: self.query_config()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["blogem"]).expect("defaults parse");
        assert_eq!(args.api_url, DEFAULT_BASE_URL);
        assert_eq!(args.frame_rate, 30);
        assert!(args.log_file.is_none());

        let config = args.query_config().expect("default windows are valid");
        assert_eq!(config.stale_time, Duration::from_secs(600));
        assert_eq!(config.cache_time, Duration::from_secs(900));
        assert!(!config.refetch_on_mount);
        assert!(!config.refetch_on_window_focus);
        assert!(!config.refetch_on_reconnect);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "blogem",
            "--api-url",
            "http://localhost:3000/",
            "--frame-rate",
            "10",
            "--stale-time-secs",
            "5",
            "--cache-time-secs",
            "60",
            "--log-file",
            "/tmp/blogem.log",
        ])
        .expect("flags parse");

        assert_eq!(args.api().base_url(), "http://localhost:3000");
        assert_eq!(args.frame_rate, 10);
        assert_eq!(args.log_file, Some(PathBuf::from("/tmp/blogem.log")));
        assert_eq!(
            args.flags().expect("valid").config.cache_time,
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_rejects_cache_time_below_stale_time() {
        let args = Args::try_parse_from(["blogem", "--stale-time-secs", "60", "--cache-time-secs", "5"])
            .expect("flags parse");
        assert!(matches!(
            args.flags(),
            Err(ConfigError::CacheTimeBelowStaleTime { .. })
        ));
    }
}
