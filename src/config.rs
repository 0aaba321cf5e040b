use std::time::Duration;

use anyhow::Context as _;

pub const DEFAULT_DOCS_BASE_URL: &str = "https://docs.googleapis.com";
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub access_token: Option<String>,
    pub docs_base_url: String,
    pub drive_base_url: String,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: None,
            docs_base_url: DEFAULT_DOCS_BASE_URL.to_owned(),
            drive_base_url: DEFAULT_DRIVE_BASE_URL.to_owned(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let http_timeout = match non_empty("DOCPATCH_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid DOCPATCH_HTTP_TIMEOUT_SECS={raw:?}"))?;
                Duration::from_secs(secs)
            }
            None => defaults.http_timeout,
        };

        Ok(Self {
            access_token: non_empty("DOCPATCH_GOOGLE_ACCESS_TOKEN"),
            docs_base_url: non_empty("DOCPATCH_DOCS_BASE_URL").unwrap_or(defaults.docs_base_url),
            drive_base_url: non_empty("DOCPATCH_DRIVE_BASE_URL")
                .unwrap_or(defaults.drive_base_url),
            http_timeout,
        })
    }
}
