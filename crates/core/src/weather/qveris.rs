//! Client for the Qveris tool gateway, which fronts both the weather timeline and
//! the POI search we use.

use crate::config::Settings;
use crate::domain::resort::SkiResort;
use crate::weather::normalize::{self, UpstreamReading};
use crate::weather::resorts::parse_pois;
use crate::weather::{ResortProvider, WeatherProvider};
use anyhow::{Context, Result};
use chrono::Timelike;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_RESPONSE_SIZE: u32 = 20_480;
const SEARCH_ID: &str = "skipro-weather";

pub const WEATHER_TOOL_ID: &str = "visualcrossing.timeline.retrieve.v1";
pub const POI_TOOL_ID: &str = "amap_webservice.place.text.list.v3";
const POI_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone)]
pub struct QverisClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    search_id: &'a str,
    session_id: String,
    parameters: Value,
    max_response_size: u32,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error_message: Option<String>,
}

impl QverisClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_qveris_api_key()?.to_string();
        let timeout = crate::config::secs_from_env("QVERIS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build qveris http client")?;

        Ok(Self {
            http,
            base_url: settings.qveris_base_url.clone(),
            api_key,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        Ok(headers)
    }

    /// Runs one tool and returns its payload, unwrapping a `data` envelope when present.
    pub async fn execute_tool(&self, tool_id: &str, parameters: Value) -> Result<Value> {
        let url = format!("{}/tools/execute", self.base_url.trim_end_matches('/'));
        let body = ExecuteRequest {
            search_id: SEARCH_ID,
            session_id: format!("skipro-{}", chrono::Utc::now().timestamp_millis()),
            parameters,
            max_response_size: MAX_RESPONSE_SIZE,
        };

        let res = self
            .http
            .post(url)
            .headers(self.headers()?)
            .query(&[("tool_id", tool_id)])
            .json(&body)
            .send()
            .await
            .with_context(|| format!("qveris request failed (tool={tool_id})"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read qveris response")?;
        if !status.is_success() {
            anyhow::bail!("qveris HTTP {status} (tool={tool_id}): {text}");
        }

        let parsed = serde_json::from_str::<ExecuteResponse>(&text)
            .with_context(|| format!("qveris response is not valid JSON: {text}"))?;
        unwrap_result(parsed, tool_id)
    }
}

fn unwrap_result(parsed: ExecuteResponse, tool_id: &str) -> Result<Value> {
    if !parsed.success {
        anyhow::bail!(
            "qveris tool {tool_id} failed: {}",
            parsed
                .error_message
                .as_deref()
                .unwrap_or("execution failed")
        );
    }
    Ok(match parsed.result {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or_default(),
        other => other,
    })
}

#[async_trait::async_trait]
impl WeatherProvider for QverisClient {
    fn provider_name(&self) -> &'static str {
        "qveris_visualcrossing"
    }

    async fn fetch_reading(&self, location_query: &str) -> Result<UpstreamReading> {
        let payload = self
            .execute_tool(
                WEATHER_TOOL_ID,
                json!({ "location": location_query, "unitGroup": "metric" }),
            )
            .await?;
        let hour = chrono::Local::now().hour();
        normalize::reading_from_timeline(&payload, hour)
    }
}

#[async_trait::async_trait]
impl ResortProvider for QverisClient {
    fn provider_name(&self) -> &'static str {
        "qveris_amap"
    }

    async fn search_resorts(&self, city: &str, keywords: &str) -> Result<Vec<SkiResort>> {
        let payload = self
            .execute_tool(
                POI_TOOL_ID,
                json!({
                    "keywords": keywords,
                    "city": city,
                    "extensions": "all",
                    "offset": POI_PAGE_SIZE,
                }),
            )
            .await?;
        Ok(parse_pois(&payload, city))
    }
}
