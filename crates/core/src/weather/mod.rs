pub mod gateway;
pub mod normalize;
pub mod qveris;
pub mod resorts;
pub mod synthetic;

pub use gateway::WeatherGateway;
pub use resorts::ResortDirectory;

use crate::config::Settings;
use crate::domain::resort::SkiResort;
use normalize::UpstreamReading;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Current-hour reading for a "lat,lng" pair or a place name.
    async fn fetch_reading(&self, location_query: &str) -> anyhow::Result<UpstreamReading>;
}

#[async_trait::async_trait]
pub trait ResortProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn search_resorts(&self, city: &str, keywords: &str) -> anyhow::Result<Vec<SkiResort>>;
}

/// Tool gateway client when `QVERIS_API_KEY` is set; otherwise weather is synthetic
/// and resorts come from the built-in list.
pub fn qveris_from_settings(settings: &Settings) -> anyhow::Result<Option<Arc<qveris::QverisClient>>> {
    if settings.qveris_api_key.is_none() {
        tracing::warn!("QVERIS_API_KEY not configured; using synthetic weather and built-in resorts");
        return Ok(None);
    }
    Ok(Some(Arc::new(qveris::QverisClient::from_settings(settings)?)))
}
