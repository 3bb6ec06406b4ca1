use super::{CoachingSession, SessionError, Step};
use crate::domain::coaching::{ChatTurn, Feedback, SpeechAudio};
use crate::llm::{prompts, AnalysisInput, LlmClient};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;
const REPLY_TIMEOUT: Duration = Duration::from_secs(60);
const SPEECH_TIMEOUT: Duration = Duration::from_secs(60);

/// Only the opening of a report is read aloud.
pub const SPEECH_CHAR_LIMIT: usize = 300;
pub const DEFAULT_RATING: f64 = 8.5;
pub const CHAT_APOLOGY: &str = "Sorry, the coach drifted off for a moment. Could you say that again?";

/// An analysis begun on a session, identified by the session's attempt counter.
#[derive(Debug, Clone)]
pub struct PendingAnalysis {
    input: AnalysisInput,
    goal_id: String,
    seq: u64,
}

/// Runs the AI calls of a coaching session and applies their outcome to it.
#[derive(Clone)]
pub struct Coach {
    llm: Option<Arc<dyn LlmClient>>,
    analysis_timeout: Duration,
}

impl Coach {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, analysis_timeout: Duration) -> Self {
        Self {
            llm,
            analysis_timeout,
        }
    }

    pub fn from_env(llm: Option<Arc<dyn LlmClient>>) -> Self {
        let timeout =
            crate::config::secs_from_env("ANALYSIS_TIMEOUT_SECS", DEFAULT_ANALYSIS_TIMEOUT_SECS);
        Self::new(llm, timeout)
    }

    /// UPLOAD -> ANALYZING -> RESULT, or back to UPLOAD with the error recorded.
    /// A failed speech synthesis does not fail the analysis.
    pub async fn analyze(&self, session: &mut CoachingSession) -> Result<Feedback, SessionError> {
        let pending = self.start_analysis(session)?;
        let outcome = self.run_analysis(&pending).await;
        let feedback = self.settle_analysis(session, &pending, outcome)?;
        if let Some(audio) = self.narrate(&feedback.analysis).await {
            self.attach_narration(session, &pending, audio);
        }
        Ok(feedback)
    }

    /// UPLOAD -> ANALYZING. The returned handle lets the AI call run without
    /// holding on to the session.
    pub fn start_analysis(&self, session: &mut CoachingSession) -> Result<PendingAnalysis, SessionError> {
        let input = session.begin_analysis()?;
        Ok(PendingAnalysis {
            input,
            goal_id: session.selection().goal().id.to_string(),
            seq: session.analysis_seq(),
        })
    }

    pub async fn run_analysis(&self, pending: &PendingAnalysis) -> Result<String, String> {
        let Some(llm) = &self.llm else {
            return Err("AI coach is not configured".to_string());
        };
        match tokio::time::timeout(self.analysis_timeout, llm.analyze_video(&pending.input)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Ok(_)) => Err("the coach returned an empty report".to_string()),
            Ok(Err(err)) => Err(format!("{err:#}")),
            Err(_) => Err(format!("analysis timed out after {:?}", self.analysis_timeout)),
        }
    }

    /// Applies an outcome to the session. Outcomes of a superseded attempt (the
    /// session was restarted meanwhile) are rejected and leave it untouched.
    pub fn settle_analysis(
        &self,
        session: &mut CoachingSession,
        pending: &PendingAnalysis,
        outcome: Result<String, String>,
    ) -> Result<Feedback, SessionError> {
        if session.analysis_seq() != pending.seq || session.step() != Step::Analyzing {
            return Err(SessionError::InvalidTransition {
                from: session.step(),
                action: "finish a superseded analysis",
            });
        }

        let analysis = match outcome {
            Ok(text) => text,
            Err(message) => {
                tracing::warn!(goal_id = %pending.goal_id, error = %message, "video analysis failed");
                session.fail_analysis(message.clone())?;
                return Err(SessionError::Analysis(message));
            }
        };

        let feedback = Feedback {
            goal_id: pending.goal_id.clone(),
            created_at: Utc::now(),
            rating: extract_rating(&analysis),
            analysis,
        };
        session.finish_analysis(feedback.clone())?;
        tracing::info!(goal_id = %feedback.goal_id, rating = feedback.rating, "video analysis complete");
        Ok(feedback)
    }

    /// Speech for the opening of a report; `None` when synthesis is unavailable.
    pub async fn narrate(&self, analysis: &str) -> Option<SpeechAudio> {
        let llm = self.llm.as_ref()?;
        let excerpt: String = analysis.chars().take(SPEECH_CHAR_LIMIT).collect();
        match tokio::time::timeout(SPEECH_TIMEOUT, llm.synthesize_speech(&excerpt)).await {
            Ok(Ok(audio)) => Some(audio),
            Ok(Err(err)) => {
                tracing::warn!(error = %format!("{err:#}"), "speech synthesis failed");
                None
            }
            Err(_) => {
                tracing::warn!("speech synthesis timed out");
                None
            }
        }
    }

    /// Attaches audio if the session still shows this attempt's result.
    pub fn attach_narration(&self, session: &mut CoachingSession, pending: &PendingAnalysis, audio: SpeechAudio) {
        if session.analysis_seq() != pending.seq {
            tracing::debug!("dropping speech for a superseded analysis");
            return;
        }
        if let Err(err) = session.attach_audio(audio) {
            tracing::debug!(error = %err, "dropping speech; session moved on");
        }
    }

    /// Records the user's message and the coach's reply. The AI sees the transcript as
    /// it was before this message; any AI failure becomes an apology reply.
    pub async fn ask(
        &self,
        session: &mut CoachingSession,
        message: &str,
    ) -> Result<ChatTurn, SessionError> {
        let history = session.transcript().to_vec();
        session.record_user_message(message)?;
        let message = message.trim();

        let reply = match &self.llm {
            None => Err("AI coach is not configured".to_string()),
            Some(llm) => {
                match tokio::time::timeout(REPLY_TIMEOUT, llm.ask_follow_up(&history, message)).await {
                    Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
                    Ok(Ok(_)) => Err("empty reply".to_string()),
                    Ok(Err(err)) => Err(format!("{err:#}")),
                    Err(_) => Err(format!("reply timed out after {REPLY_TIMEOUT:?}")),
                }
            }
        };

        let text = reply.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "follow-up question failed; sending apology");
            CHAT_APOLOGY.to_string()
        });
        session.record_coach_reply(text.clone())?;
        Ok(ChatTurn::coach(text))
    }
}

/// Reads the first number after the score heading, clamped to 0..=10.
pub fn extract_rating(analysis: &str) -> f64 {
    let marker = prompts::SCORE_HEADING.trim_start_matches('#').trim();
    let section = analysis
        .lines()
        .position(|line| line.trim_start().starts_with('#') && line.contains(marker))
        .map(|idx| analysis.lines().skip(idx + 1).collect::<Vec<_>>().join("\n"));

    section
        .as_deref()
        .and_then(first_number)
        .filter(|n| n.is_finite())
        .map(|n| n.clamp(0.0, 10.0))
        .unwrap_or(DEFAULT_RATING)
}

fn first_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::advisory::Advisory;
    use crate::domain::coaching::{MediaUpload, Speaker};
    use crate::domain::weather::WeatherObservation;
    use crate::llm::Provider;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCoach {
        report: Option<String>,
        reply: Option<String>,
        speech_fails: bool,
        hang: bool,
        seen_history: Mutex<Vec<ChatTurn>>,
        seen_speech: Mutex<Option<String>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for FakeCoach {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn generate_advisory(
            &self,
            _observation: &WeatherObservation,
            _beginner_mode: bool,
        ) -> anyhow::Result<Advisory> {
            anyhow::bail!("not used")
        }

        async fn analyze_video(&self, input: &AnalysisInput) -> anyhow::Result<String> {
            assert_eq!(input.video_base64, "AAAA");
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.report.clone().ok_or_else(|| anyhow::anyhow!("503 overloaded"))
        }

        async fn ask_follow_up(&self, history: &[ChatTurn], _message: &str) -> anyhow::Result<String> {
            *self.seen_history.lock().unwrap() = history.to_vec();
            self.reply.clone().ok_or_else(|| anyhow::anyhow!("connection reset"))
        }

        async fn synthesize_speech(&self, text: &str) -> anyhow::Result<SpeechAudio> {
            *self.seen_speech.lock().unwrap() = Some(text.to_string());
            if self.speech_fails {
                anyhow::bail!("tts quota exceeded");
            }
            Ok(SpeechAudio {
                mime_type: "audio/pcm".to_string(),
                data_base64: "UklGRg==".to_string(),
            })
        }
    }

    fn uploaded_session() -> CoachingSession {
        let mut s = CoachingSession::new();
        s.select_goal("ski-adv-carving").unwrap();
        s.attach_media(MediaUpload {
            file_name: "run.mp4".to_string(),
            mime_type: "video/mp4".to_string(),
            size_bytes: 3,
            data_base64: "AAAA".to_string(),
        })
        .unwrap();
        s
    }

    fn report(score: &str) -> String {
        format!("### 🧭 Overview\nSolid edging.\n\n### 📊 Score\n{score}")
    }

    #[test]
    fn rating_is_read_from_score_section() {
        assert_eq!(extract_rating(&report("7/10")), 7.0);
        assert_eq!(extract_rating(&report("**7.5** out of 10.")), 7.5);
        assert_eq!(extract_rating(&report("15")), 10.0);
    }

    #[test]
    fn rating_defaults_without_score() {
        assert_eq!(extract_rating("### 🧭 Overview\n2 turns looked good"), DEFAULT_RATING);
        assert_eq!(extract_rating(&report("great job")), DEFAULT_RATING);
    }

    #[tokio::test]
    async fn successful_analysis_reaches_result_with_audio() {
        let long = format!("{}{}", report("8"), "x".repeat(400));
        let fake = Arc::new(FakeCoach {
            report: Some(long.clone()),
            ..Default::default()
        });
        let coach = Coach::new(Some(fake.clone()), Duration::from_secs(1));
        let mut s = uploaded_session();

        let feedback = coach.analyze(&mut s).await.unwrap();
        assert_eq!(s.step(), Step::Result);
        assert_eq!(feedback.goal_id, "ski-adv-carving");
        assert_eq!(feedback.analysis, long);
        assert!(s.audio().is_some());
        let spoken = fake.seen_speech.lock().unwrap().clone().unwrap();
        assert_eq!(spoken.chars().count(), SPEECH_CHAR_LIMIT);
    }

    #[tokio::test]
    async fn speech_failure_is_not_fatal() {
        let coach = Coach::new(
            Some(Arc::new(FakeCoach {
                report: Some(report("6")),
                speech_fails: true,
                ..Default::default()
            })),
            Duration::from_secs(1),
        );
        let mut s = uploaded_session();
        let feedback = coach.analyze(&mut s).await.unwrap();
        assert_eq!(feedback.rating, 6.0);
        assert_eq!(s.step(), Step::Result);
        assert!(s.audio().is_none());
    }

    #[tokio::test]
    async fn failed_analysis_returns_to_upload() {
        let coach = Coach::new(Some(Arc::new(FakeCoach::default())), Duration::from_secs(1));
        let mut s = uploaded_session();
        let err = coach.analyze(&mut s).await.unwrap_err();
        assert!(matches!(err, SessionError::Analysis(_)));
        assert_eq!(s.step(), Step::Upload);
        assert!(s.last_error().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn hanging_analysis_times_out() {
        let coach = Coach::new(
            Some(Arc::new(FakeCoach {
                hang: true,
                ..Default::default()
            })),
            Duration::from_millis(50),
        );
        let mut s = uploaded_session();
        assert!(coach.analyze(&mut s).await.is_err());
        assert_eq!(s.step(), Step::Upload);
        assert!(s.last_error().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn superseded_analysis_is_discarded() {
        let coach = Coach::new(
            Some(Arc::new(FakeCoach {
                report: Some(report("9")),
                ..Default::default()
            })),
            Duration::from_secs(1),
        );
        let mut s = uploaded_session();
        let stale = coach.start_analysis(&mut s).unwrap();
        s.restart();
        s.select_goal("ski-adv-carving").unwrap();
        s.attach_media(MediaUpload::from_bytes("second.mp4", "video/mp4", b"abc")).unwrap();
        let current = coach.start_analysis(&mut s).unwrap();

        let outcome = coach.run_analysis(&stale).await;
        assert!(matches!(
            coach.settle_analysis(&mut s, &stale, outcome),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert_eq!(s.step(), Step::Analyzing);

        let outcome = Ok(report("7"));
        let feedback = coach.settle_analysis(&mut s, &current, outcome).unwrap();
        assert_eq!(feedback.rating, 7.0);
        assert_eq!(s.step(), Step::Result);
    }

    #[tokio::test]
    async fn missing_client_fails_analysis() {
        let coach = Coach::new(None, Duration::from_secs(1));
        let mut s = uploaded_session();
        assert!(coach.analyze(&mut s).await.is_err());
        assert_eq!(s.step(), Step::Upload);
    }

    #[tokio::test]
    async fn chat_passes_prior_history_and_apologises_on_failure() {
        let fake = Arc::new(FakeCoach {
            report: Some(report("8")),
            ..Default::default()
        });
        let coach = Coach::new(Some(fake.clone()), Duration::from_secs(1));
        let mut s = uploaded_session();
        coach.analyze(&mut s).await.unwrap();
        s.open_chat().unwrap();

        let reply = coach.ask(&mut s, "Why do I skid?").await.unwrap();
        assert_eq!(reply.speaker, Speaker::Coach);
        assert_eq!(reply.text, CHAT_APOLOGY);
        assert!(fake.seen_history.lock().unwrap().is_empty());

        coach.ask(&mut s, "Again?").await.unwrap();
        assert_eq!(fake.seen_history.lock().unwrap().len(), 2);
        assert_eq!(s.transcript().len(), 4);
    }

    #[tokio::test]
    async fn chat_records_the_reply() {
        let coach = Coach::new(
            Some(Arc::new(FakeCoach {
                report: Some(report("8")),
                reply: Some("Tip your knees in.".to_string()),
                ..Default::default()
            })),
            Duration::from_secs(1),
        );
        let mut s = uploaded_session();
        coach.analyze(&mut s).await.unwrap();
        s.open_chat().unwrap();
        coach.ask(&mut s, "Edge grip?").await.unwrap();
        assert_eq!(s.transcript()[1], ChatTurn::coach("Tip your knees in."));
    }

    #[tokio::test]
    async fn empty_message_is_ignored() {
        let coach = Coach::new(None, Duration::from_secs(1));
        let mut s = uploaded_session();
        s.begin_analysis().unwrap();
        s.finish_analysis(Feedback {
            goal_id: "ski-adv-carving".to_string(),
            created_at: Utc::now(),
            analysis: "ok".to_string(),
            rating: DEFAULT_RATING,
        })
        .unwrap();
        s.open_chat().unwrap();
        assert!(matches!(coach.ask(&mut s, "  ").await, Err(SessionError::EmptyMessage)));
        assert!(s.transcript().is_empty());
    }
}
