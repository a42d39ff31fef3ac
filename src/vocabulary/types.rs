use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed set of mutually exclusive word topics. `Common` is always part of the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    Common,
    Education,
    Finance,
    Health,
    Law,
    Medicine,
    Programming,
    Technology,
    Travel,
}

impl Topic {
    /// Seeding order: earlier topics claim a word first.
    pub const ALL: [Topic; 9] = [
        Topic::Common,
        Topic::Education,
        Topic::Finance,
        Topic::Health,
        Topic::Law,
        Topic::Medicine,
        Topic::Programming,
        Topic::Technology,
        Topic::Travel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Education => "Education",
            Self::Finance => "Finance",
            Self::Health => "Health",
            Self::Law => "Law",
            Self::Medicine => "Medicine",
            Self::Programming => "Programming",
            Self::Technology => "Technology",
            Self::Travel => "Travel",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic: {0}")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Topic::ALL
            .into_iter()
            .find(|topic| topic.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

/// Learning status of a word.
///
/// `Refused` marks a word the user pushed out of the rotation without learning it;
/// it is neither offered again nor counted as learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LearnedState {
    #[default]
    NotLearned,
    Learned {
        at: DateTime<Utc>,
    },
    Refused,
}

impl LearnedState {
    pub fn learned_now() -> Self {
        Self::Learned { at: Utc::now() }
    }

    pub fn learned_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Learned { at } => Some(*at),
            _ => None,
        }
    }
}

/// A vocabulary entry. Equality and hashing use the id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: Uuid,
    pub text: String,
    pub topic: Topic,
    #[serde(default)]
    pub learned: LearnedState,
}

impl Word {
    pub fn new(text: impl Into<String>, topic: Topic) -> Self {
        Self {
            id: Uuid::now_v7(),
            text: text.into(),
            topic,
            learned: LearnedState::NotLearned,
        }
    }

    pub fn is_learned(&self) -> bool {
        matches!(self.learned, LearnedState::Learned { .. })
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Word {}

impl Hash for Word {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Translation target languages. English is the source language of every word list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    Ukrainian,
    Hebrew,
    Polish,
    German,
    Russian,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::Ukrainian,
        Language::Hebrew,
        Language::Polish,
        Language::German,
        Language::Russian,
    ];

    pub fn culture_code(self) -> &'static str {
        match self {
            Self::English => "en-US",
            Self::Ukrainian => "uk-UA",
            Self::Hebrew => "he-IL",
            Self::Polish => "pl-PL",
            Self::German => "de-DE",
            Self::Russian => "ru-RU",
        }
    }

    /// ISO 639-1 code, e.g. `uk`.
    pub fn iso_code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Ukrainian => "uk",
            Self::Hebrew => "he",
            Self::Polish => "pl",
            Self::German => "de",
            Self::Russian => "ru",
        }
    }

    /// Code understood by the remote translation endpoint (legacy `iw` for Hebrew).
    pub fn remote_code(self) -> &'static str {
        match self {
            Self::Hebrew => "iw",
            other => other.iso_code(),
        }
    }

    pub fn is_right_to_left(self) -> bool {
        matches!(self, Self::Hebrew)
    }

    /// Exact culture-code lookup.
    pub fn from_culture_code(code: &str) -> Option<Self> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.culture_code().eq_ignore_ascii_case(code.trim()))
    }

    /// Lenient lookup used for stored preferences: unknown codes fall back to English.
    pub fn parse_or_english(code: &str) -> Self {
        Self::from_culture_code(code).unwrap_or(Self::English)
    }
}
