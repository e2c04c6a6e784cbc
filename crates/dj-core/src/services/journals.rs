//! Journal and entry use cases.
//!
//! Callers pass journals and entries that already went through
//! [`authorize`](crate::access::authorize); nothing here re-checks ownership.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::{self, DocumentBlock};
use crate::error::{AppError, FieldErrors, Result};
use crate::gamification::{DomainEvent, ExperienceAward, GamificationEngine};
use crate::models::{Entry, Journal, Mood, QuestionResponse, Template, User, DEFAULT_ENTRY_NAME, DEFAULT_JOURNAL_NAME};
use crate::search::SearchFilter;
use crate::services::templates::TemplateCatalog;
use crate::streak;
use crate::traits::{JournalRepo, MediaStore};
use crate::validation;

/// A freshly created item and the experience its creation earned.
#[derive(Debug, Clone)]
pub struct Created<T> {
    pub item: T,
    pub award: Option<ExperienceAward>,
}

#[derive(Debug, Clone)]
pub enum JournalCreation {
    Created(Created<Journal>),
    /// The chosen template is the "write your own" marker. The caller should
    /// collect questions and finish with [`JournalService::create_custom_journal`].
    NeedsCustomTemplate { journal_name: String },
}

#[derive(Debug, Clone, Default)]
pub struct CustomJournal {
    /// Auto-named when absent.
    pub journal_name: Option<String>,
    pub template_name: String,
    /// One question per line.
    pub questions: String,
}

/// A file posted with an entry form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    pub name: String,
    pub responses: Vec<String>,
    /// Raw mood choice; empty clears it.
    pub mood: Option<String>,
    pub upload: Option<Upload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub entry: Entry,
    pub answers: Vec<QuestionResponse>,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalPage {
    pub journal: Journal,
    pub entries: Vec<Entry>,
    pub streak: u32,
}

#[derive(Clone)]
pub struct JournalService {
    repo: Arc<dyn JournalRepo>,
    media: Arc<dyn MediaStore>,
    gamification: GamificationEngine,
    catalog: TemplateCatalog,
}

impl JournalService {
    pub fn new(repo: Arc<dyn JournalRepo>, media: Arc<dyn MediaStore>, catalog: TemplateCatalog) -> Self {
        Self {
            gamification: GamificationEngine::new(repo.clone()),
            repo,
            media,
            catalog,
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    // Journal Operations

    /// The user's journals, optionally narrowed by a name search.
    pub async fn list_journals(&self, user: &User, search: Option<&str>) -> Result<Vec<Journal>> {
        let journals = self.repo.list_journals(user.id).await?;
        match search {
            Some(needle) => SearchFilter::new("journal", "name")?
                .scoped("owner", user.id)?
                .apply(journals, needle),
            None => Ok(journals),
        }
    }

    pub async fn create_journal(&self, user: &User, name: &str, template_id: Uuid, today: NaiveDate) -> Result<JournalCreation> {
        let mut errors = FieldErrors::default();
        validation::name(&mut errors, "journal_name", name);
        let mut template = self.repo.get_template(template_id).await?;
        if let Some(candidate) = &template {
            if !self.is_accessible(user, candidate).await? {
                template = None;
            }
        }
        if template.is_none() {
            errors.add("template", "Select a valid choice. That choice is not one of the available choices.");
        }
        errors.into_result()?;
        let template = template.ok_or_else(|| AppError::not_found("Template", template_id))?;

        if self.catalog.is_custom(&template).await? {
            return Ok(JournalCreation::NeedsCustomTemplate {
                journal_name: name.trim().to_string(),
            });
        }
        let created = self.insert_journal(user, name.trim(), &template, today).await?;
        Ok(JournalCreation::Created(created))
    }

    /// Creates the user's own template and a journal that uses it.
    pub async fn create_custom_journal(&self, user: &User, form: CustomJournal, today: NaiveDate) -> Result<Created<Journal>> {
        let journal_name = match form.journal_name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None => self.next_journal_name(user).await?,
        };

        let mut errors = FieldErrors::default();
        validation::name(&mut errors, "journal_name", &journal_name);
        validation::name(&mut errors, "template_name", &form.template_name);
        let questions = validation::questions(&mut errors, &form.questions);
        errors.into_result()?;

        let template = self.catalog.create(Some(user.id), &form.template_name, questions).await?;
        info!(user_id = %user.id, template = %template.name, "custom template saved");
        self.insert_journal(user, journal_name.trim(), &template, today).await
    }

    /// `"New Journal #{n}"`, where n counts the user's journals already named that way.
    pub async fn next_journal_name(&self, user: &User) -> Result<String> {
        let taken = self
            .repo
            .list_journals(user.id)
            .await?
            .iter()
            .filter(|j| j.name.starts_with(DEFAULT_JOURNAL_NAME))
            .count();
        Ok(format!("{DEFAULT_JOURNAL_NAME} #{taken}"))
    }

    /// Loads a journal page and records the visit in the user's recents.
    pub async fn open_journal(&self, user: &mut User, journal: Journal, search: Option<&str>, today: NaiveDate) -> Result<JournalPage> {
        user.recently_accessed.push(journal.id);
        self.repo.save_user(user).await?;

        let entries = self.repo.list_entries(journal.id).await?;
        let streak = streak::journal_streak(&entries, today);
        let entries = match search {
            Some(needle) => SearchFilter::new("entry", "name")?
                .scoped("journal", journal.id)?
                .apply(entries, needle)?,
            None => entries,
        };
        Ok(JournalPage {
            journal,
            entries,
            streak,
        })
    }

    /// Deletes the journal with its entries and drops it from the owner's recents.
    pub async fn delete_journal(&self, user: &mut User, journal: &Journal) -> Result<()> {
        let entries = self.repo.list_entries(journal.id).await?;
        self.repo.delete_journal(journal.id).await?;
        for entry in &entries {
            self.discard_attachment(entry).await;
        }
        if user.recently_accessed.forget(journal.id) {
            self.repo.save_user(user).await?;
        }
        info!(journal_id = %journal.id, entries = entries.len(), "journal deleted");
        Ok(())
    }

    // Entry Operations

    /// Starts today's entry. A journal takes at most one entry per day.
    pub async fn create_entry(&self, journal: &Journal, today: NaiveDate) -> Result<Created<Entry>> {
        let already_today =
            || AppError::Conflict("Entry could not be created. You have already created one today!".into());
        let entries = self.repo.list_entries(journal.id).await?;
        if entries.iter().any(|e| e.created_on == today) {
            return Err(already_today());
        }

        let taken = entries.iter().filter(|e| e.name.starts_with(DEFAULT_ENTRY_NAME)).count();
        let entry = Entry {
            id: Uuid::new_v4(),
            journal_id: journal.id,
            name: format!("{DEFAULT_ENTRY_NAME} #{taken}"),
            created_on: today,
            responses: Vec::new(),
            mood: None,
            attachment: None,
        };
        // A concurrent request may have written today's entry since the check.
        if !self.repo.create_entry(&entry).await? {
            return Err(already_today());
        }
        let award = self
            .gamification
            .apply(DomainEvent::EntryCreated {
                owner_id: journal.owner_id,
            })
            .await?;
        Ok(Created { item: entry, award })
    }

    /// Saves the edit form. Validation covers every field before anything is written.
    pub async fn update_entry(&self, journal: &Journal, mut entry: Entry, update: EntryUpdate) -> Result<Entry> {
        let template = self.template_of(journal).await?;

        let mut errors = FieldErrors::default();
        validation::name(&mut errors, "entry_name", &update.name);
        let mood = match update.mood.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(raw) => match raw.parse::<Mood>() {
                Ok(mood) => Some(mood),
                Err(message) => {
                    errors.add("mood", message);
                    None
                }
            },
            None => None,
        };
        if let Some(upload) = &update.upload {
            validation::attachment(&mut errors, &upload.file_name);
        }
        errors.into_result()?;

        entry.name = update.name.trim().to_string();
        entry.responses = update.responses;
        entry.responses.resize(template.questions.len(), String::new());
        entry.mood = mood;

        if let Some(upload) = update.upload {
            let file_name = attachment_name(&entry.name, &upload);
            let stored = self.media.save_attachment(&file_name, upload.data).await?;
            self.discard_attachment(&entry).await;
            entry.attachment = Some(stored);
        }

        self.repo.save_entry(&entry).await?;
        Ok(entry)
    }

    pub async fn entry_view(&self, journal: &Journal, entry: Entry) -> Result<EntryView> {
        let template = self.template_of(journal).await?;
        Ok(EntryView {
            answers: entry.answers(&template),
            attachment_url: entry.attachment.as_deref().map(|name| self.media.url(name)),
            entry,
        })
    }

    pub async fn delete_entry(&self, entry: &Entry) -> Result<()> {
        self.repo.delete_entry(entry.id).await?;
        self.discard_attachment(entry).await;
        Ok(())
    }

    // Export Operations

    pub async fn entry_document(&self, journal: &Journal, entry: &Entry) -> Result<Vec<DocumentBlock>> {
        let template = self.template_of(journal).await?;
        Ok(document::entry_blocks(entry, &template, |name| self.media.local_path(name)))
    }

    /// Every entry of the journal, oldest first.
    pub async fn journal_document(&self, journal: &Journal) -> Result<Vec<DocumentBlock>> {
        let template = self.template_of(journal).await?;
        let mut entries = self.repo.list_entries(journal.id).await?;
        entries.reverse();
        Ok(document::journal_blocks(journal, &template, &entries, |name| {
            self.media.local_path(name)
        }))
    }

    async fn insert_journal(&self, user: &User, name: &str, template: &Template, today: NaiveDate) -> Result<Created<Journal>> {
        let journal = Journal {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id: Some(user.id),
            template_id: template.id,
            created_on: today,
        };
        self.repo.create_journal(&journal).await?;
        info!(user_id = %user.id, journal_id = %journal.id, "journal created");
        let award = self
            .gamification
            .apply(DomainEvent::JournalCreated {
                owner_id: journal.owner_id,
            })
            .await?;
        Ok(Created { item: journal, award })
    }

    async fn is_accessible(&self, user: &User, template: &Template) -> Result<bool> {
        if template.owner_id == Some(user.id) {
            return Ok(true);
        }
        let owner = self.catalog.system_owner().await?;
        Ok(template.owner_id == Some(owner.id))
    }

    async fn template_of(&self, journal: &Journal) -> Result<Template> {
        self.repo
            .get_template(journal.template_id)
            .await?
            .ok_or_else(|| AppError::not_found("Template", journal.template_id))
    }

    async fn discard_attachment(&self, entry: &Entry) {
        if let Some(name) = entry.attachment.as_deref() {
            if let Err(err) = self.media.remove_attachment(name).await {
                warn!(entry_id = %entry.id, attachment = name, error = %err, "failed to remove attachment");
            }
        }
    }
}

/// `{slug}_{8 hex}{ext}`: images are stored as `.png`, videos as `.mp4`.
fn attachment_name(entry_name: &str, upload: &Upload) -> String {
    let ext = if upload.content_type.contains("image") {
        ".png".to_string()
    } else if upload.content_type.contains("video") {
        ".mp4".to_string()
    } else {
        validation::extension(&upload.file_name).unwrap_or_default()
    };
    let token = Uuid::new_v4().simple().to_string();
    format!("{}_{}{}", validation::slugify(entry_name), &token[..8], ext)
}
