use crate::config::Settings;
use crate::domain::advisory::Advisory;
use crate::domain::coaching::{ChatTurn, Speaker, SpeechAudio};
use crate::domain::weather::WeatherObservation;
use crate::llm::error::{LlmDiagnosticsError, LlmStage};
use crate::llm::{json, prompts, AnalysisInput, LlmClient, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
const DEFAULT_VOICE: &str = "Kore";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const ADVISORY_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    tts_model: String,
    voice: String,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_gemini_api_key()?.to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let tts_model =
            std::env::var("GEMINI_TTS_MODEL").unwrap_or_else(|_| DEFAULT_TTS_MODEL.to_string());
        let voice = std::env::var("GEMINI_VOICE").unwrap_or_else(|_| DEFAULT_VOICE.to_string());

        let timeout = crate::config::secs_from_env("GEMINI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            tts_model,
            voice,
        })
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn generate_content(
        &self,
        model: &str,
        req: &GenerateContentRequest,
    ) -> anyhow::Result<GenerateContentResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(&self.api_key)?);

        let res = self
            .http
            .post(self.url(model))
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::new(
                Provider::Gemini,
                LlmStage::Http,
                format!("status={status}"),
            )
            .with_raw_output(text)
            .into());
        }

        let parsed = serde_json::from_str::<GenerateContentResponse>(&text)
            .with_context(|| format!("failed to decode Gemini response: {text}"))?;

        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(LlmDiagnosticsError::new(
                Provider::Gemini,
                LlmStage::Blocked,
                format!("block_reason={reason}"),
            )
            .with_raw_output(text)
            .into());
        }

        Ok(parsed)
    }

    fn response_text(res: &GenerateContentResponse) -> anyhow::Result<String> {
        let mut out = String::new();
        for part in res.first_parts() {
            if let Part::Text { text } = part {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        if out.trim().is_empty() {
            return Err(LlmDiagnosticsError::new(
                Provider::Gemini,
                LlmStage::EmptyResponse,
                format!("finish_reason={:?}", res.finish_reason()),
            )
            .into());
        }
        Ok(out)
    }

    fn response_audio(res: &GenerateContentResponse) -> anyhow::Result<SpeechAudio> {
        res.first_parts()
            .iter()
            .find_map(|part| match part {
                Part::InlineData { inline_data } => Some(SpeechAudio {
                    mime_type: inline_data.mime_type.clone(),
                    data_base64: inline_data.data.clone(),
                }),
                _ => None,
            })
            .ok_or_else(|| {
                LlmDiagnosticsError::new(
                    Provider::Gemini,
                    LlmStage::Audio,
                    "no inline audio in response",
                )
                .into()
            })
    }

    fn system_instruction() -> Content {
        Content {
            role: None,
            parts: vec![Part::text(prompts::coach_system_prompt())],
        }
    }

    fn chat_contents(history: &[ChatTurn], message: &str) -> Vec<Content> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content {
                role: Some(match turn.speaker {
                    Speaker::User => "user",
                    Speaker::Coach => "model",
                }),
                parts: vec![Part::text(turn.text.clone())],
            })
            .collect();
        contents.push(Content::user(vec![Part::text(message)]));
        contents
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate_advisory(
        &self,
        observation: &WeatherObservation,
        beginner_mode: bool,
    ) -> anyhow::Result<Advisory> {
        let req = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(prompts::advisory_prompt(
                observation,
                beginner_mode,
            ))])],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: Some(ADVISORY_TEMPERATURE),
                ..Default::default()
            }),
        };
        let res = self.generate_content(&self.model, &req).await?;
        let text = Self::response_text(&res)?;
        json::parse_advisory(&text, beginner_mode).map_err(|err| {
            LlmDiagnosticsError::new(Provider::Gemini, LlmStage::Parse, format!("{err:#}"))
                .with_raw_output(text)
                .into()
        })
    }

    async fn analyze_video(&self, input: &AnalysisInput) -> anyhow::Result<String> {
        let req = GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: input.mime_type.clone(),
                        data: input.video_base64.clone(),
                    },
                },
                Part::text(prompts::analysis_prompt(input)),
            ])],
            system_instruction: Some(Self::system_instruction()),
            generation_config: None,
        };
        let res = self.generate_content(&self.model, &req).await?;
        Self::response_text(&res)
    }

    async fn ask_follow_up(&self, history: &[ChatTurn], message: &str) -> anyhow::Result<String> {
        let req = GenerateContentRequest {
            contents: Self::chat_contents(history, message),
            system_instruction: Some(Self::system_instruction()),
            generation_config: None,
        };
        let res = self.generate_content(&self.model, &req).await?;
        Self::response_text(&res)
    }

    async fn synthesize_speech(&self, text: &str) -> anyhow::Result<SpeechAudio> {
        let req = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(prompts::speech_prompt(text))])],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO"]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.voice.clone(),
                        },
                    },
                }),
                ..Default::default()
            }),
        };
        let res = self.generate_content(&self.tts_model, &req).await?;
        Self::response_audio(&res)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none", skip_deserializing)]
    role: Option<&'static str>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user"),
            parts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineData,
    },
    /// Thoughts, function calls and anything else we never send.
    #[serde(skip_serializing)]
    Other(serde::de::IgnoredAny),
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    fn finish_reason(&self) -> Option<&str> {
        self.candidates.first().and_then(|c| c.finish_reason.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
