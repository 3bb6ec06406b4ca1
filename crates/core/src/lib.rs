pub mod advisory;
pub mod domain;
pub mod llm;
pub mod session;
pub mod weather;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_QVERIS_BASE_URL: &str = "https://qveris.ai/api/v1";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        pub qveris_api_key: Option<String>,
        pub qveris_base_url: String,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                gemini_api_key: non_empty_var("GEMINI_API_KEY"),
                qveris_api_key: non_empty_var("QVERIS_API_KEY"),
                qveris_base_url: non_empty_var("QVERIS_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_QVERIS_BASE_URL.to_string()),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }

        pub fn require_qveris_api_key(&self) -> anyhow::Result<&str> {
            self.qveris_api_key
                .as_deref()
                .context("QVERIS_API_KEY is required")
        }
    }

    /// Reads a whole-second duration from the environment, falling back to `default_secs`.
    pub fn secs_from_env(key: &str, default_secs: u64) -> Duration {
        let secs = std::env::var(key)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(default_secs);
        Duration::from_secs(secs)
    }

    // An empty variable in a .env file means "unset", not "empty credential".
    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }
}
