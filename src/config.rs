use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Base URL used when `DESCPICS_API_URL` is not set
pub const DEFAULT_API_URL: &str = "https://description.pics";

/// Configuration for talking to the description API
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    /// Per-request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and .env file
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but invalid
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if it exists

        let api_url = env::var("DESCPICS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_url = Self::validate_api_url(&api_url)?;

        let timeout = match env::var("DESCPICS_TIMEOUT_SECS") {
            Ok(value) => Some(Self::parse_timeout(&value)?),
            Err(_) => None,
        };

        Ok(Self { api_url, timeout })
    }

    /// Replace the base URL, e.g. from a command line flag
    pub fn with_api_url(self, api_url: &str) -> Result<Self> {
        Ok(Self {
            api_url: Self::validate_api_url(api_url)?,
            ..self
        })
    }

    /// Validate the API base URL and strip trailing slashes
    fn validate_api_url(url: &str) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            anyhow::bail!("DESCPICS_API_URL cannot be empty");
        }

        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .with_context(|| {
                format!(
                    "DESCPICS_API_URL '{}' must start with http:// or https://",
                    url
                )
            })?;

        let host = rest.trim_end_matches('/');
        if host.is_empty() {
            anyhow::bail!("DESCPICS_API_URL '{}' has no host", url);
        }

        if host.contains(char::is_whitespace) {
            anyhow::bail!("DESCPICS_API_URL '{}' contains whitespace", url);
        }

        Ok(url.trim_end_matches('/').to_string())
    }

    fn parse_timeout(value: &str) -> Result<Duration> {
        let secs: u64 = value.trim().parse().with_context(|| {
            format!(
                "DESCPICS_TIMEOUT_SECS '{}' is not a whole number of seconds",
                value
            )
        })?;

        if secs == 0 {
            anyhow::bail!("DESCPICS_TIMEOUT_SECS must be greater than 0");
        }

        Ok(Duration::from_secs(secs))
    }

    /// Construct the full URL of an API path
    ///
    /// # Arguments
    ///
    /// * `path` - Endpoint path such as `/api/add-image-info`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}
