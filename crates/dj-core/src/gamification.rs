//! # Gamification
//!
//! Experience, levels and achievements. Creating journals and entries emits a
//! [`DomainEvent`]; the [`GamificationEngine`] turns it into experience, runs
//! the level-up cascade on the [`Profile`] and persists the result once.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Achievement, Profile};
use crate::traits::JournalRepo;

/// Experience awarded for creating a journal.
pub const JOURNAL_EXPERIENCE: u32 = 100;

/// Experience awarded for creating an entry.
pub const ENTRY_EXPERIENCE: u32 = 50;

/// Experience needed per level: level `n` needs `n * 50` to reach `n + 1`.
pub const EXPERIENCE_PER_LEVEL: u32 = 50;

/// The fixed achievement catalog as (name, level threshold), lowest first.
pub const ACHIEVEMENT_LEVELS: [(&str, u32); 12] = [
    ("Getting Started", 2),
    ("Novice Scribe", 5),
    ("Journal Enthusiast", 10),
    ("Diary Keeper", 15),
    ("Journal Master", 20),
    ("Memoir Architect", 25),
    ("Sage of Stories", 30),
    ("Chronicle Champion", 40),
    ("Legend of Literature", 50),
    ("Pinnacle of Penmanship", 60),
    ("Archivist Ascendant", 75),
    ("Epic of Expression", 100),
];

/// Level threshold for a catalog name.
pub fn achievement_threshold(name: &str) -> Option<u32> {
    ACHIEVEMENT_LEVELS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, level)| *level)
}

/// Catalog record for `name`, as written the first time anyone unlocks it.
pub fn catalog_achievement(name: &str) -> Achievement {
    let level = achievement_threshold(name).unwrap_or(0);
    Achievement::new(name, format!("Reached level {level} in journaling!"))
}

impl Profile {
    pub fn required_experience_for_next_level(&self) -> u32 {
        self.level.saturating_mul(EXPERIENCE_PER_LEVEL)
    }

    /// Adds experience and levels up as many times as it covers.
    ///
    /// Returns the levels reached, in order. Leaves `experience` strictly below
    /// the requirement for the next level.
    pub fn add_experience(&mut self, amount: u32) -> Vec<u32> {
        self.experience = self.experience.saturating_add(amount);
        let mut reached = Vec::new();
        while self.experience >= self.required_experience_for_next_level() {
            self.level_up();
            reached.push(self.level);
        }
        reached
    }

    fn level_up(&mut self) {
        self.experience -= self.required_experience_for_next_level();
        self.level += 1;
        self.assign_achievements();
    }

    /// Unlocks every catalog achievement at or below the current level.
    /// Returns the names newly added.
    pub fn assign_achievements(&mut self) -> Vec<&'static str> {
        ACHIEVEMENT_LEVELS
            .iter()
            .filter(|(_, threshold)| self.level >= *threshold)
            .filter_map(|(name, _)| self.achievements.insert((*name).to_string()).then_some(*name))
            .collect()
    }

    /// The unlocked achievement with the highest threshold.
    pub fn highest_achievement(&self) -> Option<Achievement> {
        self.achievements
            .iter()
            .map(|name| catalog_achievement(name))
            .max_by_key(|achievement| achievement.level)
    }

    /// Share of the current level already earned, 0–100.
    pub fn progress_percent(&self) -> f64 {
        let required = self.required_experience_for_next_level();
        if required == 0 {
            return 0.0;
        }
        f64::from(self.experience) * 100.0 / f64::from(required)
    }
}

/// Something that happened in the domain that is worth experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainEvent {
    JournalCreated { owner_id: Option<Uuid> },
    EntryCreated { owner_id: Option<Uuid> },
}

impl DomainEvent {
    pub fn experience(&self) -> u32 {
        match self {
            DomainEvent::JournalCreated { .. } => JOURNAL_EXPERIENCE,
            DomainEvent::EntryCreated { .. } => ENTRY_EXPERIENCE,
        }
    }

    pub fn owner_id(&self) -> Option<Uuid> {
        match self {
            DomainEvent::JournalCreated { owner_id } | DomainEvent::EntryCreated { owner_id } => *owner_id,
        }
    }
}

/// What an awarded event did to a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceAward {
    pub profile: Profile,
    pub gained: u32,
    pub levels_reached: Vec<u32>,
}

/// Applies [`DomainEvent`]s to profiles.
#[derive(Clone)]
pub struct GamificationEngine {
    repo: Arc<dyn JournalRepo>,
}

impl GamificationEngine {
    pub fn new(repo: Arc<dyn JournalRepo>) -> Self {
        Self { repo }
    }

    /// Awards the event's experience to its owner.
    ///
    /// Events without an owner (journal orphaned by a deleted user) award
    /// nothing and return `None`.
    pub async fn apply(&self, event: DomainEvent) -> Result<Option<ExperienceAward>> {
        let Some(owner_id) = event.owner_id() else {
            debug!(?event, "event has no owner, no experience awarded");
            return Ok(None);
        };

        let mut profile = self
            .repo
            .get_profile(owner_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", owner_id))?;

        let gained = event.experience();
        let levels_reached = profile.add_experience(gained);
        self.repo.save_profile(&profile).await?;

        if let Some(level) = levels_reached.last() {
            info!(user_id = %owner_id, level, "profile levelled up");
        }

        Ok(Some(ExperienceAward {
            profile,
            gained,
            levels_reached,
        }))
    }
}
