//! One coaching flow: goal -> upload -> analyzing -> result <-> chat, with a weather
//! side trip from the goal step. The session is plain owned state; the [`coach`]
//! module drives the external calls around it.

pub mod coach;

pub use coach::Coach;

use crate::domain::coaching::{ChatTurn, Feedback, Keyframe, MediaUpload, SpeechAudio};
use crate::domain::goal::{find_goal, Discipline, GoalSelection};
use crate::llm::AnalysisInput;
use serde::{Deserialize, Serialize};

pub const MAX_UPLOAD_BYTES: u64 = 30 * 1024 * 1024;
pub const MAX_KEYFRAMES: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    #[default]
    Goal,
    Upload,
    Analyzing,
    Result,
    Chat,
    Weather,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("video must be at most {limit_bytes} bytes (got {size_bytes})")]
    MediaTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("at most {max} keyframes are allowed (got {got})")]
    TooManyKeyframes { got: usize, max: usize },

    #[error("message must be non-empty")]
    EmptyMessage,

    #[error("unknown goal: {0}")]
    UnknownGoal(String),

    #[error("goal {goal_id} does not belong to {discipline:?}")]
    GoalOutsideDiscipline {
        goal_id: String,
        discipline: Discipline,
    },

    #[error("cannot {action} during step {from:?}")]
    InvalidTransition { from: Step, action: &'static str },

    #[error("no video has been uploaded")]
    MissingMedia,

    #[error("analysis failed: {0}")]
    Analysis(String),
}

impl SessionError {
    /// Problems with what the user supplied, reported without changing step.
    pub fn is_input_validation(&self) -> bool {
        matches!(
            self,
            SessionError::MediaTooLarge { .. }
                | SessionError::UnsupportedMedia(_)
                | SessionError::TooManyKeyframes { .. }
                | SessionError::EmptyMessage
                | SessionError::UnknownGoal(_)
                | SessionError::GoalOutsideDiscipline { .. }
                | SessionError::MissingMedia
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoachingSession {
    step: Step,
    selection: GoalSelection,
    user_context: String,
    media: Option<MediaUpload>,
    media_file_name: Option<String>,
    keyframes: Vec<Keyframe>,
    feedback: Option<Feedback>,
    audio: Option<SpeechAudio>,
    transcript: Vec<ChatTurn>,
    last_error: Option<String>,
    analysis_seq: u64,
}

/// Serializable view of a session for the presentation layer. Media bytes are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub step: Step,
    pub discipline: Discipline,
    pub goal_id: &'static str,
    pub goal_title: &'static str,
    pub user_context: String,
    pub media_file_name: Option<String>,
    pub keyframe_count: usize,
    pub feedback: Option<Feedback>,
    pub audio: Option<SpeechAudio>,
    pub transcript: Vec<ChatTurn>,
    pub last_error: Option<String>,
}

impl CoachingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn selection(&self) -> &GoalSelection {
        &self.selection
    }

    pub fn media(&self) -> Option<&MediaUpload> {
        self.media.as_ref()
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn audio(&self) -> Option<&SpeechAudio> {
        self.audio.as_ref()
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Bumped by every [`begin_analysis`](Self::begin_analysis); survives restarts so a
    /// late result can be told apart from the current attempt.
    pub fn analysis_seq(&self) -> u64 {
        self.analysis_seq
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let goal = self.selection.goal();
        SessionSnapshot {
            step: self.step,
            discipline: self.selection.discipline(),
            goal_id: goal.id,
            goal_title: goal.title,
            user_context: self.user_context.clone(),
            media_file_name: self.media_file_name.clone(),
            keyframe_count: self.keyframes.len(),
            feedback: self.feedback.clone(),
            audio: self.audio.clone(),
            transcript: self.transcript.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn expect_step(&self, allowed: &[Step], action: &'static str) -> Result<(), SessionError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.step,
                action,
            })
        }
    }

    pub fn select_discipline(&mut self, discipline: Discipline) -> Result<(), SessionError> {
        self.expect_step(&[Step::Goal], "switch discipline")?;
        self.selection.switch_discipline(discipline);
        Ok(())
    }

    /// GOAL -> UPLOAD.
    pub fn select_goal(&mut self, goal_id: &str) -> Result<(), SessionError> {
        self.expect_step(&[Step::Goal], "select a goal")?;
        let goal = find_goal(goal_id).ok_or_else(|| SessionError::UnknownGoal(goal_id.to_string()))?;
        if self.selection.choose(goal.id).is_none() {
            return Err(SessionError::GoalOutsideDiscipline {
                goal_id: goal_id.to_string(),
                discipline: self.selection.discipline(),
            });
        }
        self.step = Step::Upload;
        Ok(())
    }

    /// GOAL -> WEATHER. Coaching state is left untouched.
    pub fn open_weather(&mut self) -> Result<(), SessionError> {
        self.expect_step(&[Step::Goal], "open weather")?;
        self.step = Step::Weather;
        Ok(())
    }

    /// WEATHER -> GOAL.
    pub fn close_weather(&mut self) -> Result<(), SessionError> {
        self.expect_step(&[Step::Weather], "close weather")?;
        self.step = Step::Goal;
        Ok(())
    }

    /// Validates and stores a clip. Rejected uploads leave the session as it was.
    pub fn attach_media(&mut self, media: MediaUpload) -> Result<(), SessionError> {
        self.expect_step(&[Step::Upload], "upload a video")?;
        if media.size_bytes > MAX_UPLOAD_BYTES {
            return Err(SessionError::MediaTooLarge {
                size_bytes: media.size_bytes,
                limit_bytes: MAX_UPLOAD_BYTES,
            });
        }
        if !media.mime_type.starts_with("video/") {
            return Err(SessionError::UnsupportedMedia(media.mime_type));
        }
        self.media_file_name = Some(media.file_name.clone());
        self.media = Some(media);
        self.keyframes.clear();
        self.last_error = None;
        Ok(())
    }

    /// Keyframes are captured client-side and may arrive after analysis has started.
    pub fn set_keyframes(&mut self, keyframes: Vec<Keyframe>) -> Result<(), SessionError> {
        self.expect_step(
            &[Step::Upload, Step::Analyzing, Step::Result, Step::Chat],
            "attach keyframes",
        )?;
        if keyframes.len() > MAX_KEYFRAMES {
            return Err(SessionError::TooManyKeyframes {
                got: keyframes.len(),
                max: MAX_KEYFRAMES,
            });
        }
        if self.media_file_name.is_none() {
            return Err(SessionError::MissingMedia);
        }
        self.keyframes = keyframes;
        Ok(())
    }

    pub fn set_user_context(&mut self, context: impl Into<String>) -> Result<(), SessionError> {
        self.expect_step(&[Step::Upload], "describe the clip")?;
        self.user_context = context.into();
        Ok(())
    }

    /// UPLOAD -> ANALYZING. Returns what the analysis call needs.
    pub fn begin_analysis(&mut self) -> Result<AnalysisInput, SessionError> {
        self.expect_step(&[Step::Upload], "start analysis")?;
        let media = self.media.as_ref().ok_or(SessionError::MissingMedia)?;
        let input = AnalysisInput {
            video_base64: media.data_base64.clone(),
            mime_type: media.mime_type.clone(),
            goal_label: self.selection.goal().prompt_label(),
            user_context: self.user_context.clone(),
        };
        self.step = Step::Analyzing;
        self.last_error = None;
        self.analysis_seq += 1;
        Ok(input)
    }

    /// ANALYZING -> RESULT. The clip bytes are released; only its name is kept.
    pub fn finish_analysis(&mut self, feedback: Feedback) -> Result<(), SessionError> {
        self.expect_step(&[Step::Analyzing], "finish analysis")?;
        self.media = None;
        self.feedback = Some(feedback);
        self.audio = None;
        self.transcript.clear();
        self.step = Step::Result;
        Ok(())
    }

    /// ANALYZING -> UPLOAD, keeping the clip so the user can retry.
    pub fn fail_analysis(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        self.expect_step(&[Step::Analyzing], "fail analysis")?;
        self.last_error = Some(message.into());
        self.step = Step::Upload;
        Ok(())
    }

    pub fn attach_audio(&mut self, audio: SpeechAudio) -> Result<(), SessionError> {
        self.expect_step(&[Step::Result, Step::Chat], "attach audio")?;
        self.audio = Some(audio);
        Ok(())
    }

    /// RESULT -> CHAT.
    pub fn open_chat(&mut self) -> Result<(), SessionError> {
        self.expect_step(&[Step::Result], "open chat")?;
        self.step = Step::Chat;
        Ok(())
    }

    /// CHAT -> RESULT. The transcript is kept.
    pub fn back_to_result(&mut self) -> Result<(), SessionError> {
        self.expect_step(&[Step::Chat], "go back to the result")?;
        self.step = Step::Result;
        Ok(())
    }

    pub fn record_user_message(&mut self, text: &str) -> Result<(), SessionError> {
        self.expect_step(&[Step::Chat], "send a message")?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.transcript.push(ChatTurn::user(text));
        Ok(())
    }

    pub fn record_coach_reply(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.expect_step(&[Step::Chat], "record a reply")?;
        self.transcript.push(ChatTurn::coach(text));
        Ok(())
    }

    /// Any step -> GOAL. Drops goal, media, analysis and transcript; keeps the discipline.
    pub fn restart(&mut self) {
        let discipline = self.selection.discipline();
        *self = Self {
            selection: GoalSelection::new(discipline),
            analysis_seq: self.analysis_seq,
            ..Self::default()
        };
    }
}
