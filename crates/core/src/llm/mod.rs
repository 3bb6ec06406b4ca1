pub mod error;
pub mod gemini;
pub mod json;
pub mod prompts;

use crate::config::Settings;
use crate::domain::advisory::Advisory;
use crate::domain::coaching::{ChatTurn, SpeechAudio};
use crate::domain::weather::WeatherObservation;
use std::sync::Arc;

/// Everything the analysis model needs for one clip.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub video_base64: String,
    pub mime_type: String,
    pub goal_label: String,
    pub user_context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Structured advisory for a reading. Output is validated before it is returned.
    async fn generate_advisory(
        &self,
        observation: &WeatherObservation,
        beginner_mode: bool,
    ) -> anyhow::Result<Advisory>;

    /// Free-text coaching report, rendered as-is.
    async fn analyze_video(&self, input: &AnalysisInput) -> anyhow::Result<String>;

    async fn ask_follow_up(&self, history: &[ChatTurn], message: &str) -> anyhow::Result<String>;

    async fn synthesize_speech(&self, text: &str) -> anyhow::Result<SpeechAudio>;
}

/// Builds the shared client once at the composition root.
/// `None` when no AI credential is configured, so callers skip AI paths entirely.
pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Option<Arc<dyn LlmClient>>> {
    if settings.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not configured; AI features fall back to rule-based output");
        return Ok(None);
    }
    let client = gemini::GeminiClient::from_settings(settings)?;
    Ok(Some(Arc::new(client)))
}
