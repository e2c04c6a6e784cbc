//! Template catalog: default templates owned by the system account, plus the
//! ones each user authors.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, FieldErrors, Result};
use crate::models::{NewUser, Template, User};
use crate::seed::SeedTemplate;
use crate::traits::{CredentialProvider, JournalRepo};
use crate::validation;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub owner_created: bool,
    pub templates_created: Vec<String>,
}

#[derive(Clone)]
pub struct TemplateCatalog {
    repo: Arc<dyn JournalRepo>,
    owner_username: String,
    custom_template_name: String,
}

impl TemplateCatalog {
    pub fn new(repo: Arc<dyn JournalRepo>, owner_username: impl Into<String>, custom_template_name: impl Into<String>) -> Self {
        Self {
            repo,
            owner_username: owner_username.into(),
            custom_template_name: custom_template_name.into(),
        }
    }

    /// The account that owns the default templates. Missing means the server
    /// was started without seeding, which is a deployment mistake.
    pub async fn system_owner(&self) -> Result<User> {
        self.repo
            .find_user_by_username(&self.owner_username)
            .await?
            .ok_or_else(|| AppError::Configuration(format!("default template owner {} does not exist", self.owner_username)))
    }

    /// Templates a user may build a journal from: their own and the defaults.
    pub async fn accessible(&self, user: &User) -> Result<Vec<Template>> {
        let owner = self.system_owner().await?;
        let mut templates = self.repo.list_templates(user.id).await?;
        if owner.id != user.id {
            templates.extend(self.repo.list_templates(owner.id).await?);
        }
        Ok(templates)
    }

    /// Whether `template` is the default "write your own questions" marker.
    pub async fn is_custom(&self, template: &Template) -> Result<bool> {
        let owner = self.system_owner().await?;
        Ok(template.owner_id == Some(owner.id) && template.name == self.custom_template_name)
    }

    /// Validates and stores a template for `owner_id`.
    pub async fn create(&self, owner_id: Option<Uuid>, name: &str, questions: Vec<String>) -> Result<Template> {
        let mut errors = FieldErrors::default();
        validation::name(&mut errors, "template_name", name);
        let questions = validation::clean_questions(questions.iter().map(String::as_str));
        if questions.is_empty() {
            errors.add("questions", "This field is required.");
        }
        errors.into_result()?;

        let template = Template {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            owner_id,
            questions,
        };
        self.repo.create_template(&template).await?;
        Ok(template)
    }

    /// Adds a default template to the system owner's catalog.
    pub async fn create_default(&self, seed: &SeedTemplate) -> Result<Template> {
        let owner = self.system_owner().await?;
        self.create(Some(owner.id), &seed.template_name, seed.questions.clone()).await
    }

    /// Ensures the system owner exists and owns every seed template by name.
    pub async fn seed(&self, credentials: &dyn CredentialProvider, seeds: &[SeedTemplate], now: DateTime<Utc>) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        let owner = match self.repo.find_user_by_username(&self.owner_username).await? {
            Some(owner) => owner,
            None => {
                warn!(username = %self.owner_username, "default template owner not found, creating it");
                // Nobody logs in as the system owner; its password is never handed out.
                let password_hash = credentials.hash_password(&Uuid::new_v4().to_string())?;
                let owner = self
                    .repo
                    .create_user(NewUser {
                        id: Uuid::new_v4(),
                        username: self.owner_username.clone(),
                        email: format!("{}@journalsapp.com", self.owner_username.trim_start_matches('@')),
                        first_name: "All".into(),
                        last_name: "All".into(),
                        password_hash,
                        created_at: now,
                    })
                    .await?;
                report.owner_created = true;
                owner
            }
        };

        for seed in seeds {
            if self.repo.find_template(owner.id, &seed.template_name).await?.is_some() {
                continue;
            }
            self.create(Some(owner.id), &seed.template_name, seed.questions.clone()).await?;
            info!(template = %seed.template_name, "created default template");
            report.templates_created.push(seed.template_name.clone());
        }
        Ok(report)
    }
}
