use crate::advisory::classifier;
use crate::domain::advisory::{Advisory, AdvisorySource};
use crate::domain::weather::WeatherObservation;
use crate::llm::LlmClient;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// AI-first advisory with a silent rule-based fallback. Always returns a
/// well-formed advisory within the timeout plus classifier time.
#[derive(Clone)]
pub struct AdvisoryOrchestrator {
    llm: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
}

impl AdvisoryOrchestrator {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub fn from_env(llm: Option<Arc<dyn LlmClient>>) -> Self {
        let timeout = crate::config::secs_from_env("ADVISORY_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        Self::new(llm, timeout)
    }

    /// Rule-based only.
    pub fn offline() -> Self {
        Self::new(None, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub async fn get_advisory(&self, observation: &WeatherObservation, beginner_mode: bool) -> Advisory {
        self.get_advisory_with_source(observation, beginner_mode)
            .await
            .0
    }

    pub async fn get_advisory_with_source(
        &self,
        observation: &WeatherObservation,
        beginner_mode: bool,
    ) -> (Advisory, AdvisorySource) {
        let Some(llm) = &self.llm else {
            return (
                classifier::classify(observation, beginner_mode),
                AdvisorySource::RuleBased,
            );
        };

        let attempt = tokio::time::timeout(
            self.timeout,
            llm.generate_advisory(observation, beginner_mode),
        )
        .await;

        let failure = match attempt {
            Ok(Ok(advisory)) if advisory.beginner_tips.is_some() == beginner_mode => {
                return (advisory, AdvisorySource::Ai);
            }
            Ok(Ok(_)) => "beginner tips do not match the requested mode".to_string(),
            Ok(Err(err)) => format!("{err:#}"),
            Err(_) => format!("timed out after {:?}", self.timeout),
        };

        tracing::warn!(
            provider = ?llm.provider(),
            location = %observation.location,
            beginner_mode,
            error = %failure,
            "AI advisory unavailable; using rule-based advisory"
        );
        (
            classifier::classify(observation, beginner_mode),
            AdvisorySource::RuleBased,
        )
    }
}
