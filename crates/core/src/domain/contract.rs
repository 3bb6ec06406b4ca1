use crate::domain::advisory::{Advisory, AdvisoryLevel};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Advisory exactly as an AI provider returned it. Untrusted until validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAdvisory {
    pub level: String,
    pub title: String,
    pub suggestions: Vec<String>,
    #[serde(default, alias = "beginnerTips")]
    pub beginner_tips: Option<Vec<String>>,
}

impl LlmAdvisory {
    pub fn validate_and_into_advisory(self, beginner_mode: bool) -> anyhow::Result<Advisory> {
        let level = self
            .level
            .parse::<AdvisoryLevel>()
            .context("LLM output has an invalid level")?;

        let title = self.title.trim().to_string();
        ensure!(!title.is_empty(), "title must be non-empty");

        let suggestions = clean_lines(self.suggestions);
        ensure!(
            !suggestions.is_empty(),
            "suggestions must contain at least one non-empty line"
        );

        let beginner_tips = if beginner_mode {
            let tips = clean_lines(
                self.beginner_tips
                    .context("beginnerTips must be present in beginner mode")?,
            );
            ensure!(!tips.is_empty(), "beginnerTips must be non-empty in beginner mode");
            Some(tips)
        } else {
            // Tips outside beginner mode are dropped, not treated as a contract break.
            None
        };

        Ok(Advisory {
            level,
            title,
            suggestions,
            beginner_tips,
        })
    }
}

fn clean_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(level: &str, tips: Option<Vec<&str>>) -> LlmAdvisory {
        LlmAdvisory {
            level: level.to_string(),
            title: " Great day ".to_string(),
            suggestions: vec!["a".to_string(), "  ".to_string(), "b".to_string()],
            beginner_tips: tips.map(|t| t.into_iter().map(str::to_string).collect()),
        }
    }

    #[test]
    fn trims_and_drops_blank_lines() {
        let advisory = raw("excellent", None).validate_and_into_advisory(false).unwrap();
        assert_eq!(advisory.level, AdvisoryLevel::Excellent);
        assert_eq!(advisory.title, "Great day");
        assert_eq!(advisory.suggestions, vec!["a", "b"]);
        assert_eq!(advisory.beginner_tips, None);
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(raw("dangerous", None).validate_and_into_advisory(false).is_err());
    }

    #[test]
    fn beginner_mode_requires_tips() {
        assert!(raw("good", None).validate_and_into_advisory(true).is_err());
        assert!(raw("good", Some(vec![" "])).validate_and_into_advisory(true).is_err());
        let advisory = raw("good", Some(vec!["stay low"]))
            .validate_and_into_advisory(true)
            .unwrap();
        assert_eq!(advisory.beginner_tips, Some(vec!["stay low".to_string()]));
    }

    #[test]
    fn tips_are_dropped_outside_beginner_mode() {
        let advisory = raw("good", Some(vec!["stay low"]))
            .validate_and_into_advisory(false)
            .unwrap();
        assert_eq!(advisory.beginner_tips, None);
    }

    #[test]
    fn rejects_empty_suggestions() {
        let mut r = raw("good", None);
        r.suggestions = vec![];
        assert!(r.validate_and_into_advisory(false).is_err());
    }
}
