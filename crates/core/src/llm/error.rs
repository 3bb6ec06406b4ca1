use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

/// Step of a provider call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmStage {
    Http,
    Blocked,
    EmptyResponse,
    Parse,
    Audio,
}

impl LlmStage {
    fn as_str(self) -> &'static str {
        match self {
            LlmStage::Http => "http",
            LlmStage::Blocked => "blocked",
            LlmStage::EmptyResponse => "empty_response",
            LlmStage::Parse => "parse",
            LlmStage::Audio => "audio",
        }
    }
}

/// AI failure with enough context to debug it from a log line or a Sentry event.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: LlmStage,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    pub fn new(provider: Provider, stage: LlmStage, detail: impl Into<String>) -> Self {
        Self {
            provider,
            stage,
            detail: detail.into(),
            raw_output: None,
            raw_response_json: None,
        }
    }

    pub fn with_raw_output(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.raw_response_json = serde_json::from_str::<Value>(&raw).ok();
        self.raw_output = Some(raw);
        self
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}): {}",
            self.provider,
            self.stage.as_str(),
            self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_raw_json_when_parseable() {
        let err = LlmDiagnosticsError::new(Provider::Gemini, LlmStage::Http, "status=500")
            .with_raw_output(r#"{"error":{"message":"boom"}}"#);
        assert_eq!(err.raw_response_json.unwrap()["error"]["message"], "boom");
        assert_eq!(
            format!("{}", LlmDiagnosticsError::new(Provider::Gemini, LlmStage::Parse, "x")),
            "LLM error (provider=Gemini, stage=parse): x"
        );
    }

    #[test]
    fn downcasts_from_anyhow() {
        let err: anyhow::Error =
            LlmDiagnosticsError::new(Provider::Gemini, LlmStage::Blocked, "SAFETY").into();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, LlmStage::Blocked);
        assert!(diag.raw_output.is_none());
    }
}
