//! Sign-up, log-in, account settings, the dashboard and the recents list.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, FieldErrors, Result};
use crate::leaderboard::Leaderboard;
use crate::models::{Achievement, Journal, NewUser, User};
use crate::traits::{CredentialProvider, JournalRepo};
use crate::validation;

#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub new_password: String,
    pub password_confirmation: String,
}

/// The editable account fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    /// The current password.
    pub password: String,
    pub new_password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub user: User,
    pub recent_journals: Vec<Journal>,
    pub level: u32,
    pub current_experience: u32,
    pub experience_needed: u32,
    pub progress_to_next_level: f64,
    pub achievements: Vec<Achievement>,
    pub leaderboard: Leaderboard,
}

#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn JournalRepo>,
    credentials: Arc<dyn CredentialProvider>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn JournalRepo>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { repo, credentials }
    }

    /// Registers a user. The storage layer creates the profile with it.
    pub async fn sign_up(&self, form: SignUp, now: DateTime<Utc>) -> Result<User> {
        let mut errors = FieldErrors::default();
        validation::name(&mut errors, "first_name", &form.first_name);
        validation::name(&mut errors, "last_name", &form.last_name);
        validation::username(&mut errors, &form.username);
        validation::email(&mut errors, &form.email);
        validation::new_password(&mut errors, &form.new_password, &form.password_confirmation);

        if errors.get("username").is_empty() && self.repo.find_user_by_username(&form.username).await?.is_some() {
            errors.add("username", "User with this Username already exists.");
        }
        if errors.get("email").is_empty() && self.repo.find_user_by_email(&form.email).await?.is_some() {
            errors.add("email", "User with this Email already exists.");
        }
        errors.into_result()?;

        let password_hash = self.credentials.hash_password(&form.new_password)?;
        let user = self
            .repo
            .create_user(NewUser {
                id: Uuid::new_v4(),
                username: form.username,
                email: form.email,
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                password_hash,
                created_at: now,
            })
            .await?;
        info!(user_id = %user.id, username = %user.username, "user signed up");
        Ok(user)
    }

    /// Checks credentials and stamps the login time.
    pub async fn log_in(&self, username: &str, password: &str, now: DateTime<Utc>) -> Result<User> {
        let invalid = || AppError::Unauthorized("The credentials provided were invalid!".into());
        let mut user = self.repo.find_user_by_username(username).await?.ok_or_else(invalid)?;
        if !self.credentials.verify_password(password, &user.password_hash) {
            return Err(invalid());
        }
        user.last_login = Some(now);
        self.repo.save_user(&user).await?;
        debug!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    /// Edits names, username and email under the sign-up rules. A handle
    /// taken by another account is a field error; keeping your own is fine.
    pub async fn update_profile(&self, mut user: User, form: ProfileUpdate) -> Result<User> {
        let mut errors = FieldErrors::default();
        validation::name(&mut errors, "first_name", &form.first_name);
        validation::name(&mut errors, "last_name", &form.last_name);
        validation::username(&mut errors, &form.username);
        validation::email(&mut errors, &form.email);

        if errors.get("username").is_empty() && form.username != user.username {
            if let Some(other) = self.repo.find_user_by_username(&form.username).await? {
                if other.id != user.id {
                    errors.add("username", "User with this Username already exists.");
                }
            }
        }
        if errors.get("email").is_empty() && form.email != user.email {
            if let Some(other) = self.repo.find_user_by_email(&form.email).await? {
                if other.id != user.id {
                    errors.add("email", "User with this Email already exists.");
                }
            }
        }
        errors.into_result()?;

        user.first_name = form.first_name.trim().to_string();
        user.last_name = form.last_name.trim().to_string();
        user.username = form.username;
        user.email = form.email;
        self.repo.save_user(&user).await?;
        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }

    /// Replaces the password hash once the current password checks out.
    pub async fn change_password(&self, mut user: User, form: PasswordChange) -> Result<User> {
        let mut errors = FieldErrors::default();
        if !self.credentials.verify_password(&form.password, &user.password_hash) {
            errors.add("password", "Password is invalid");
        }
        validation::new_password(&mut errors, &form.new_password, &form.password_confirmation);
        errors.into_result()?;

        user.password_hash = self.credentials.hash_password(&form.new_password)?;
        self.repo.save_user(&user).await?;
        info!(user_id = %user.id, "password changed");
        Ok(user)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.repo.get_user(user_id).await?)
    }

    /// Resolves the recents list to journals, in stored order.
    ///
    /// Ids whose journal no longer exists are pruned from the stored list.
    pub async fn recent_journals(&self, user: &mut User) -> Result<Vec<Journal>> {
        let mut journals = Vec::with_capacity(user.recently_accessed.len());
        let mut dangling = HashSet::new();
        for id in user.recently_accessed.iter() {
            match self.repo.get_journal(*id).await? {
                Some(journal) => journals.push(journal),
                None => {
                    dangling.insert(*id);
                }
            }
        }
        if !dangling.is_empty() {
            debug!(user_id = %user.id, pruned = dangling.len(), "pruning dangling recent journals");
            user.recently_accessed.retain(|id| !dangling.contains(id));
            self.repo.save_user(user).await?;
        }
        Ok(journals)
    }

    pub async fn dashboard(&self, mut user: User) -> Result<Dashboard> {
        let profile = self
            .repo
            .get_profile(user.id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", user.id))?;
        let recent_journals = self.recent_journals(&mut user).await?;
        let mut achievements = self.repo.list_achievements(user.id).await?;
        achievements.sort_by_key(|a| a.level);
        let leaderboard = Leaderboard::build(self.repo.list_standings().await?, user.id);

        Ok(Dashboard {
            recent_journals,
            level: profile.level,
            current_experience: profile.experience,
            experience_needed: profile.required_experience_for_next_level(),
            progress_to_next_level: profile.progress_percent(),
            achievements,
            leaderboard,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Profile, ProfileStanding};
    use crate::recents::RecentJournals;
    use crate::traits::{MockCredentialProvider, MockJournalRepo};
    use chrono::NaiveDate;

    fn form() -> SignUp {
        SignUp {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            username: "@janedoe".into(),
            email: "jane@example.org".into(),
            new_password: "Password123".into(),
            password_confirmation: "Password123".into(),
        }
    }

    fn stored(new: NewUser) -> User {
        User {
            id: new.id,
            username: new.username,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            password_hash: new.password_hash,
            recently_accessed: RecentJournals::new(),
            last_login: None,
            created_at: new.created_at,
        }
    }

    fn journal(id: Uuid, owner: Uuid) -> Journal {
        Journal {
            id,
            name: "Travel".into(),
            owner_id: Some(owner),
            template_id: Uuid::new_v4(),
            created_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn sign_up_hashes_and_stores() {
        let mut repo = MockJournalRepo::new();
        repo.expect_find_user_by_username().returning(|_| Ok(None));
        repo.expect_find_user_by_email().returning(|_| Ok(None));
        repo.expect_create_user()
            .withf(|u| u.password_hash == "hashed" && u.username == "@janedoe")
            .returning(|u| Ok(stored(u)));
        let mut credentials = MockCredentialProvider::new();
        credentials.expect_hash_password().returning(|_| Ok("hashed".into()));

        let service = AccountService::new(Arc::new(repo), Arc::new(credentials));
        let user = service.sign_up(form(), Utc::now()).await.unwrap();
        assert_eq!(user.full_name(), "Jane Doe");
    }

    #[tokio::test]
    async fn sign_up_reports_every_bad_field_and_taken_handles() {
        let mut repo = MockJournalRepo::new();
        repo.expect_find_user_by_username().returning(|u| {
            Ok(Some(stored(NewUser {
                id: Uuid::new_v4(),
                username: u.to_string(),
                email: "x@example.org".into(),
                first_name: "X".into(),
                last_name: "Y".into(),
                password_hash: String::new(),
                created_at: Utc::now(),
            })))
        });
        repo.expect_create_user().never();
        let service = AccountService::new(Arc::new(repo), Arc::new(MockCredentialProvider::new()));

        let mut bad = form();
        bad.email = "not-an-email".into();
        bad.password_confirmation = "Different1".into();
        match service.sign_up(bad, Utc::now()).await {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.get("username"), ["User with this Username already exists.".to_string()]);
                assert_eq!(errors.get("email").len(), 1);
                assert_eq!(errors.get("password_confirmation").len(), 1);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn log_in_rejects_wrong_password_and_stamps_time_on_success() {
        let now = Utc::now();
        let mut repo = MockJournalRepo::new();
        repo.expect_find_user_by_username().returning(|u| {
            Ok(Some(stored(NewUser {
                id: Uuid::new_v4(),
                username: u.to_string(),
                email: "jane@example.org".into(),
                first_name: "Jane".into(),
                last_name: "Doe".into(),
                password_hash: "hash".into(),
                created_at: Utc::now(),
            })))
        });
        repo.expect_save_user()
            .withf(move |u| u.last_login == Some(now))
            .times(1)
            .returning(|_| Ok(()));
        let mut credentials = MockCredentialProvider::new();
        credentials
            .expect_verify_password()
            .returning(|password, _| password == "Password123");

        let service = AccountService::new(Arc::new(repo), Arc::new(credentials));
        assert!(matches!(
            service.log_in("@janedoe", "nope", now).await,
            Err(AppError::Unauthorized(_))
        ));
        let user = service.log_in("@janedoe", "Password123", now).await.unwrap();
        assert_eq!(user.last_login, Some(now));
    }

    fn jane() -> User {
        stored(NewUser {
            id: Uuid::new_v4(),
            username: "@janedoe".into(),
            email: "jane@example.org".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            password_hash: "old-hash".into(),
            created_at: Utc::now(),
        })
    }

    fn profile_form() -> ProfileUpdate {
        ProfileUpdate {
            first_name: " Janet ".into(),
            last_name: "Doe".into(),
            username: "@janedoe".into(),
            email: "janet@example.org".into(),
        }
    }

    #[tokio::test]
    async fn profile_update_keeps_own_username_and_saves_trimmed_names() {
        let user = jane();
        let mut repo = MockJournalRepo::new();
        repo.expect_find_user_by_username().never();
        repo.expect_find_user_by_email().returning(|_| Ok(None));
        repo.expect_save_user()
            .withf(|u| u.first_name == "Janet" && u.email == "janet@example.org")
            .times(1)
            .returning(|_| Ok(()));

        let service = AccountService::new(Arc::new(repo), Arc::new(MockCredentialProvider::new()));
        let updated = service.update_profile(user, profile_form()).await.unwrap();
        assert_eq!(updated.full_name(), "Janet Doe");
        assert_eq!(updated.username, "@janedoe");
    }

    #[tokio::test]
    async fn profile_update_rejects_handles_taken_by_someone_else() {
        let user = jane();
        let mut repo = MockJournalRepo::new();
        repo.expect_find_user_by_username().returning(|name| {
            let mut other = jane();
            other.username = name.to_string();
            Ok(Some(other))
        });
        repo.expect_find_user_by_email().returning(|email| {
            let mut other = jane();
            other.email = email.to_string();
            Ok(Some(other))
        });
        repo.expect_save_user().never();

        let service = AccountService::new(Arc::new(repo), Arc::new(MockCredentialProvider::new()));
        let mut form = profile_form();
        form.username = "@johndoe".into();
        form.last_name = " ".into();
        match service.update_profile(user, form).await {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.get("username"), ["User with this Username already exists.".to_string()]);
                assert_eq!(errors.get("email"), ["User with this Email already exists.".to_string()]);
                assert_eq!(errors.get("last_name").len(), 1);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn password_change_needs_the_current_password() {
        let mut repo = MockJournalRepo::new();
        repo.expect_save_user().never();
        let mut credentials = MockCredentialProvider::new();
        credentials.expect_verify_password().returning(|_, _| false);
        credentials.expect_hash_password().never();

        let service = AccountService::new(Arc::new(repo), Arc::new(credentials));
        let form = PasswordChange {
            password: "wrong".into(),
            new_password: "weak".into(),
            password_confirmation: "weak".into(),
        };
        match service.change_password(jane(), form).await {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.get("password"), ["Password is invalid".to_string()]);
                assert_eq!(errors.get("new_password").len(), 1);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn password_change_stores_a_fresh_hash() {
        let mut repo = MockJournalRepo::new();
        repo.expect_save_user()
            .withf(|u| u.password_hash == "new-hash")
            .times(1)
            .returning(|_| Ok(()));
        let mut credentials = MockCredentialProvider::new();
        credentials
            .expect_verify_password()
            .returning(|password, hash| password == "Password123" && hash == "old-hash");
        credentials
            .expect_hash_password()
            .withf(|password| password == "Password456")
            .returning(|_| Ok("new-hash".into()));

        let service = AccountService::new(Arc::new(repo), Arc::new(credentials));
        let form = PasswordChange {
            password: "Password123".into(),
            new_password: "Password456".into(),
            password_confirmation: "Password456".into(),
        };
        let user = service.change_password(jane(), form).await.unwrap();
        assert_eq!(user.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn dangling_recent_ids_are_pruned_on_read() {
        let user_id = Uuid::new_v4();
        let kept = Uuid::new_v4();
        let gone = Uuid::new_v4();
        let mut user = stored(NewUser {
            id: user_id,
            username: "@janedoe".into(),
            email: "jane@example.org".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        });
        user.recently_accessed = [gone, kept].into_iter().collect();

        let mut repo = MockJournalRepo::new();
        repo.expect_get_journal()
            .returning(move |id| Ok((id == kept).then(|| journal(id, user_id))));
        repo.expect_save_user()
            .withf(move |u| u.recently_accessed.to_vec() == vec![kept])
            .times(1)
            .returning(|_| Ok(()));
        repo.expect_get_profile().returning(|id| Ok(Some(Profile::new(id))));
        repo.expect_list_achievements().returning(|_| Ok(vec![]));
        repo.expect_list_standings().returning(move || {
            Ok(vec![ProfileStanding {
                user_id,
                username: "@janedoe".into(),
                level: 1,
                experience: 0,
            }])
        });

        let service = AccountService::new(Arc::new(repo), Arc::new(MockCredentialProvider::new()));
        let dashboard = service.dashboard(user).await.unwrap();
        assert_eq!(dashboard.recent_journals.len(), 1);
        assert_eq!(dashboard.recent_journals[0].id, kept);
        assert_eq!(dashboard.experience_needed, 50);
        assert!(dashboard.leaderboard.includes(user_id));
    }
}
