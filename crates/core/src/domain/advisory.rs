use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of an advisory, ordered by rank: excellent < good < caution < warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryLevel {
    Excellent,
    Good,
    Caution,
    Warning,
}

impl AdvisoryLevel {
    pub const ALL: [AdvisoryLevel; 4] = [
        AdvisoryLevel::Excellent,
        AdvisoryLevel::Good,
        AdvisoryLevel::Caution,
        AdvisoryLevel::Warning,
    ];

    pub fn rank(self) -> u8 {
        match self {
            AdvisoryLevel::Excellent => 0,
            AdvisoryLevel::Good => 1,
            AdvisoryLevel::Caution => 2,
            AdvisoryLevel::Warning => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdvisoryLevel::Excellent => "excellent",
            AdvisoryLevel::Good => "good",
            AdvisoryLevel::Caution => "caution",
            AdvisoryLevel::Warning => "warning",
        }
    }
}

impl fmt::Display for AdvisoryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdvisoryLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| anyhow::anyhow!("unknown advisory level: {s:?}"))
    }
}

/// Ski-day recommendation derived from one weather reading. Never persisted.
///
/// `beginner_tips` is `None` when beginner mode was off; it is never `Some(vec![])`
/// as a stand-in for "off".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub level: AdvisoryLevel,
    pub title: String,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beginner_tips: Option<Vec<String>>,
}

/// Which path produced an advisory. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorySource {
    Ai,
    RuleBased,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_declaration_order() {
        let ranks: Vec<u8> = AdvisoryLevel::ALL.iter().map(|l| l.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(AdvisoryLevel::Excellent < AdvisoryLevel::Good);
        assert!(AdvisoryLevel::Caution < AdvisoryLevel::Warning);
    }

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!(" Caution ".parse::<AdvisoryLevel>().unwrap(), AdvisoryLevel::Caution);
        assert!("severe".parse::<AdvisoryLevel>().is_err());
    }

    #[test]
    fn absent_tips_are_not_serialized() {
        let advisory = Advisory {
            level: AdvisoryLevel::Good,
            title: "t".to_string(),
            suggestions: vec![],
            beginner_tips: None,
        };
        let v = serde_json::to_value(&advisory).unwrap();
        assert!(v.get("beginner_tips").is_none());
        assert_eq!(v["level"], "good");
    }
}
