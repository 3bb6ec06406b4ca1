mod error;
mod sessions;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skipro_core::advisory::AdvisoryOrchestrator;
use skipro_core::domain::advisory::{Advisory, AdvisorySource};
use skipro_core::domain::resort::SkiResort;
use skipro_core::domain::weather::WeatherObservation;
use skipro_core::session::Coach;
use skipro_core::weather::resorts::{DEFAULT_CITY, DEFAULT_KEYWORDS};
use skipro_core::weather::{ResortDirectory, ResortProvider, WeatherGateway, WeatherProvider};

use crate::error::{ApiError, ApiJson};
use crate::sessions::SessionStore;

const DEFAULT_PORT: u16 = 3001;
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = skipro_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let llm = skipro_core::llm::client_from_settings(&settings).unwrap_or_else(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, "AI client init failed; starting API in degraded mode");
        None
    });
    let qveris = skipro_core::weather::qveris_from_settings(&settings).unwrap_or_else(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, "tool gateway init failed; serving synthetic weather");
        None
    });

    let weather_provider = qveris.clone().map(|c| c as Arc<dyn WeatherProvider>);
    let resort_provider = qveris.map(|c| c as Arc<dyn ResortProvider>);

    let state = AppState {
        ai_configured: llm.is_some(),
        weather_configured: weather_provider.is_some(),
        advisory: AdvisoryOrchestrator::from_env(llm.clone()),
        weather: WeatherGateway::from_env(weather_provider),
        resorts: Arc::new(ResortDirectory::new(resort_provider)),
        coach: Coach::from_env(llm),
        sessions: Arc::new(SessionStore::from_env()),
        max_body_bytes: sessions::MAX_BODY_BYTES,
    };

    let sweeper = state.sessions.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            sweeper.sweep().await;
        }
    });

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
pub(crate) struct AppState {
    ai_configured: bool,
    weather_configured: bool,
    advisory: AdvisoryOrchestrator,
    weather: WeatherGateway,
    resorts: Arc<ResortDirectory>,
    coach: Coach,
    sessions: Arc<SessionStore>,
    max_body_bytes: usize,
}

fn router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/health", get(health))
        .route("/api/weather", get(get_weather))
        .route("/api/ski-resorts", get(list_resorts))
        .route("/api/resorts/:id/weather", get(get_resort_weather))
        .route("/api/advisory", post(post_advisory))
        .merge(sessions::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    ai_configured: bool,
    weather_configured: bool,
    timestamp: DateTime<Utc>,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        ai_configured: state.ai_configured,
        weather_configured: state.weather_configured,
        timestamp: Utc::now(),
    })
}

/// An observation plus its display helpers.
#[derive(Debug, Serialize)]
struct WeatherView {
    #[serde(flatten)]
    observation: WeatherObservation,
    wind_direction_label: &'static str,
    icon_emoji: &'static str,
}

impl From<WeatherObservation> for WeatherView {
    fn from(observation: WeatherObservation) -> Self {
        Self {
            wind_direction_label: observation.wind_direction_label(),
            icon_emoji: observation.icon_emoji(),
            observation,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherQuery {
    location: Option<String>,
}

async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherView>, ApiError> {
    let location = query
        .location
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("location is required".to_string()))?;

    let observation = state
        .weather
        .try_fetch(&location)
        .await
        .map_err(ApiError::Upstream)?;
    Ok(Json(observation.into()))
}

#[derive(Debug, Deserialize)]
struct ResortQuery {
    city: Option<String>,
    keywords: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResortList {
    resorts: Vec<SkiResort>,
}

async fn list_resorts(
    State(state): State<AppState>,
    Query(query): Query<ResortQuery>,
) -> Json<ResortList> {
    let city = query.city.filter(|c| !c.trim().is_empty());
    let keywords = query.keywords.filter(|k| !k.trim().is_empty());
    let resorts = state
        .resorts
        .search(
            city.as_deref().unwrap_or(DEFAULT_CITY),
            keywords.as_deref().unwrap_or(DEFAULT_KEYWORDS),
        )
        .await;
    Json(ResortList { resorts })
}

async fn get_resort_weather(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WeatherView>, ApiError> {
    let resort = state
        .resorts
        .find(&id)
        .ok_or_else(|| ApiError::NotFound(format!("resort {id}")))?;
    let observation = state.weather.fetch_observation(&resort).await;
    Ok(Json(observation.into()))
}

#[derive(Debug, Deserialize)]
struct AdvisoryRequest {
    resort_id: Option<String>,
    weather: Option<WeatherObservation>,
    #[serde(default)]
    beginner_mode: bool,
}

#[derive(Debug, Serialize)]
struct AdvisoryResponse {
    advisory: Advisory,
    source: AdvisorySource,
    weather: WeatherView,
}

/// Advisory for an explicit observation, or for a resort's current weather.
async fn post_advisory(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AdvisoryRequest>,
) -> Result<Json<AdvisoryResponse>, ApiError> {
    let observation = match (req.weather, req.resort_id) {
        (Some(weather), _) => weather,
        (None, Some(id)) => {
            let resort = state
                .resorts
                .find(&id)
                .ok_or_else(|| ApiError::NotFound(format!("resort {id}")))?;
            state.weather.fetch_observation(&resort).await
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either weather or resort_id is required".to_string(),
            ))
        }
    };

    let (advisory, source) = state
        .advisory
        .get_advisory_with_source(&observation, req.beginner_mode)
        .await;
    Ok(Json(AdvisoryResponse {
        advisory,
        source,
        weather: observation.into(),
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &skipro_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
