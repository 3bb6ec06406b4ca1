use anyhow::Context;
use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skipro_core::advisory::AdvisoryOrchestrator;
use skipro_core::domain::advisory::{Advisory, AdvisorySource};
use skipro_core::domain::coaching::MediaUpload;
use skipro_core::domain::goal::{find_goal, grouped_goals, Discipline};
use skipro_core::domain::resort::SkiResort;
use skipro_core::domain::weather::WeatherObservation;
use skipro_core::session::{Coach, CoachingSession};
use skipro_core::weather::resorts::{DEFAULT_CITY, DEFAULT_KEYWORDS};
use skipro_core::weather::{ResortDirectory, ResortProvider, WeatherGateway, WeatherProvider};

#[derive(Debug, Parser)]
#[command(name = "skipro_cli")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ski-day advisory for a resort's current weather.
    Advisory {
        /// Resort id, as listed by `resorts`.
        #[arg(long)]
        resort: String,

        /// Include beginner tips.
        #[arg(long)]
        beginner: bool,
    },

    /// Search ski resorts in a city.
    Resorts {
        #[arg(long, default_value = DEFAULT_CITY)]
        city: String,

        #[arg(long, default_value = DEFAULT_KEYWORDS)]
        keywords: String,
    },

    /// List training goals for a discipline.
    Goals {
        #[arg(long, value_enum, default_value_t = DisciplineArg::Ski)]
        discipline: DisciplineArg,
    },

    /// Analyse a clip against a goal and optionally ask one follow-up question.
    Coach {
        #[arg(long)]
        video: PathBuf,

        /// Goal id, as listed by `goals`.
        #[arg(long)]
        goal: String,

        /// Notes for the coach about the clip.
        #[arg(long, default_value = "")]
        context: String,

        #[arg(long)]
        ask: Option<String>,

        /// Write the spoken summary here instead of printing it as base64.
        #[arg(long)]
        audio_out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DisciplineArg {
    Ski,
    Snowboard,
}

impl From<DisciplineArg> for Discipline {
    fn from(arg: DisciplineArg) -> Self {
        match arg {
            DisciplineArg::Ski => Discipline::Ski,
            DisciplineArg::Snowboard => Discipline::Snowboard,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = skipro_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(args.command, &settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "command failed");
    }
    result
}

async fn run(command: Command, settings: &skipro_core::config::Settings) -> anyhow::Result<()> {
    let qveris = skipro_core::weather::qveris_from_settings(settings)?;
    let directory = ResortDirectory::new(qveris.clone().map(|c| c as Arc<dyn ResortProvider>));

    match command {
        Command::Advisory { resort, beginner } => {
            let gateway = WeatherGateway::from_env(qveris.map(|c| c as Arc<dyn WeatherProvider>));
            let orchestrator =
                AdvisoryOrchestrator::from_env(skipro_core::llm::client_from_settings(settings)?);

            directory.search(DEFAULT_CITY, DEFAULT_KEYWORDS).await;
            let resort = directory
                .find(&resort)
                .with_context(|| format!("unknown resort id: {resort}"))?;
            let weather = gateway.fetch_observation(&resort).await;
            let (advisory, source) = orchestrator
                .get_advisory_with_source(&weather, beginner)
                .await;

            print_json(&AdvisoryReport {
                resort,
                weather,
                advisory,
                source,
            })
        }
        Command::Resorts { city, keywords } => print_json(&directory.search(&city, &keywords).await),
        Command::Goals { discipline } => print_json(&grouped_goals(discipline.into())),
        Command::Coach {
            video,
            goal,
            context,
            ask,
            audio_out,
        } => {
            let llm = skipro_core::llm::client_from_settings(settings)?;
            anyhow::ensure!(llm.is_some(), "GEMINI_API_KEY is required for coaching");
            let coach = Coach::from_env(llm);

            let goal = find_goal(&goal).with_context(|| format!("unknown goal id: {goal}"))?;
            let upload = read_upload(&video).await?;

            let mut session = CoachingSession::new();
            session.select_discipline(goal.discipline)?;
            session.select_goal(goal.id)?;
            session.attach_media(upload)?;
            session.set_user_context(context)?;
            coach.analyze(&mut session).await?;

            if let Some(question) = ask {
                session.open_chat()?;
                coach.ask(&mut session, &question).await?;
            }

            let mut snapshot = session.snapshot();
            if let (Some(path), Some(audio)) = (audio_out, snapshot.audio.take()) {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(audio.data_base64.as_bytes())
                    .context("speech audio is not valid base64")?;
                tokio::fs::write(&path, bytes)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), mime_type = %audio.mime_type, "wrote speech audio");
            }
            print_json(&snapshot)
        }
    }
}

#[derive(Debug, Serialize)]
struct AdvisoryReport {
    resort: SkiResort,
    weather: WeatherObservation,
    advisory: Advisory,
    source: AdvisorySource,
}

async fn read_upload(path: &Path) -> anyhow::Result<MediaUpload> {
    let mime_type = mime_for_path(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(MediaUpload::from_bytes(file_name, mime_type, &bytes))
}

fn mime_for_path(path: &Path) -> anyhow::Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => Ok("video/mp4"),
        "mov" => Ok("video/quicktime"),
        "avi" => Ok("video/x-msvideo"),
        "webm" => Ok("video/webm"),
        other => anyhow::bail!("unsupported video extension: {other:?}"),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
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
