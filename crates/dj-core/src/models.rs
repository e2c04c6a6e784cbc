//! # Domain Models
//!
//! These structs represent the core entities of Digital Journal.
//! Identifiers are random UUID v4 values assigned by the core, never by storage.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recents::RecentJournals;

/// Default name given to entries created without one.
pub const DEFAULT_ENTRY_NAME: &str = "New Entry";

/// Default name given to custom-template journals created without one.
pub const DEFAULT_JOURNAL_NAME: &str = "New Journal";

/// An account holder. Owns journals, templates and exactly one [`Profile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// `@` followed by at least three word characters, e.g. `@johndoe`
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub recently_accessed: RecentJournals,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// True when the user authenticated within `window` of `now`.
    /// Users that never logged in are never considered recent.
    pub fn logged_in_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.last_login {
            Some(last) => now - last <= window,
            None => false,
        }
    }
}

/// Everything needed to insert a user. The profile is created alongside it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Gamification state attached one-to-one to a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub level: u32,
    pub experience: u32,
    /// Names of unlocked achievements, keyed into the global catalog.
    pub achievements: BTreeSet<String>,
}

impl Profile {
    /// A fresh level 1 profile with no experience and nothing unlocked.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            level: 1,
            experience: 0,
            achievements: BTreeSet::new(),
        }
    }
}

/// Leaderboard row: a profile joined with its owner's handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStanding {
    pub user_id: Uuid,
    pub username: String,
    pub level: u32,
    pub experience: u32,
}

/// A milestone from the fixed achievement catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub name: String,
    pub description: String,
    /// Derived from the catalog; unknown names get 0.
    pub level: u32,
}

impl Achievement {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let level = crate::gamification::achievement_threshold(&name).unwrap_or(0);
        Self {
            name,
            description: description.into(),
            level,
        }
    }
}

/// An ordered list of prompts that every entry of a journal answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    /// `None` once the owning user has been deleted.
    pub owner_id: Option<Uuid>,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub id: Uuid,
    pub name: String,
    /// `None` once the owning user has been deleted.
    pub owner_id: Option<Uuid>,
    pub template_id: Uuid,
    /// Set once at creation.
    pub created_on: NaiveDate,
}

impl Journal {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == Some(user_id)
    }
}

/// One dated submission of answers to a journal's template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub journal_id: Uuid,
    pub name: String,
    /// Set once at creation.
    pub created_on: NaiveDate,
    /// Positionally aligned with the template questions. See [`Entry::answers`].
    pub responses: Vec<String>,
    pub mood: Option<Mood>,
    /// File name handed out by the media store.
    pub attachment: Option<String>,
}

impl Entry {
    /// Pairs the template questions with this entry's responses.
    ///
    /// Every question yields exactly one pair: missing responses read as the
    /// empty string and responses beyond the last question are dropped.
    pub fn answers(&self, template: &Template) -> Vec<QuestionResponse> {
        template
            .questions
            .iter()
            .enumerate()
            .map(|(i, question)| QuestionResponse {
                question: question.clone(),
                response: self.responses.get(i).cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Whether the attachment is a still image a document can embed.
    pub fn has_image_attachment(&self) -> bool {
        self.attachment
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg" | "gif"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question: String,
    pub response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Neutral,
    Angry,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Happy, Mood::Sad, Mood::Neutral, Mood::Angry];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Neutral => "neutral",
            Mood::Angry => "angry",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Neutral => "Neutral",
            Mood::Angry => "Angry",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Select a valid choice. {s} is not one of the available choices."))
    }
}
