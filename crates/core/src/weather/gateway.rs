use crate::domain::resort::SkiResort;
use crate::domain::weather::WeatherObservation;
use crate::weather::synthetic::synthetic_observation;
use crate::weather::WeatherProvider;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone)]
pub struct WeatherGateway {
    provider: Option<Arc<dyn WeatherProvider>>,
    timeout: Duration,
}

impl WeatherGateway {
    pub fn new(provider: Option<Arc<dyn WeatherProvider>>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn from_env(provider: Option<Arc<dyn WeatherProvider>>) -> Self {
        let timeout = crate::config::secs_from_env("WEATHER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        Self::new(provider, timeout)
    }

    /// Reading for a free-form location. Failures are returned so the caller can
    /// offer a retry; there is no resort to build a synthetic reading around.
    pub async fn try_fetch(&self, location_query: &str) -> anyhow::Result<WeatherObservation> {
        let query = location_query.trim();
        anyhow::ensure!(!query.is_empty(), "location must be non-empty");
        let reading = self.fetch_reading(query).await?;
        let location = reading.location.clone().unwrap_or_else(|| query.to_string());
        Ok(reading.into_observation(&location, query))
    }

    /// Reading for a resort. Never fails: any provider problem yields a synthetic
    /// observation, logged and tagged as such.
    pub async fn fetch_observation(&self, resort: &SkiResort) -> WeatherObservation {
        match self.fetch_resort(resort).await {
            Ok(observation) => observation,
            Err(err) => {
                tracing::warn!(
                    resort_id = %resort.id,
                    resort = %resort.name,
                    error = %format!("{err:#}"),
                    "weather fetch failed; serving synthetic observation"
                );
                synthetic_observation(resort, &mut rand::thread_rng())
            }
        }
    }

    async fn fetch_resort(&self, resort: &SkiResort) -> anyhow::Result<WeatherObservation> {
        let query = resort
            .weather_query()
            .with_context(|| format!("resort {} has no usable coordinates", resort.id))?;
        let reading = self.fetch_reading(&query).await?;
        Ok(reading.into_observation(&resort.name, &resort.display_address()))
    }

    async fn fetch_reading(
        &self,
        query: &str,
    ) -> anyhow::Result<crate::weather::normalize::UpstreamReading> {
        let provider = self
            .provider
            .as_ref()
            .context("no weather provider configured")?;
        tokio::time::timeout(self.timeout, provider.fetch_reading(query))
            .await
            .with_context(|| {
                format!(
                    "{} timed out after {:?}",
                    provider.provider_name(),
                    self.timeout
                )
            })?
    }
}
