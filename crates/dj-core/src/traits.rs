//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::document::DocumentBlock;
use crate::models::{Achievement, Entry, Journal, NewUser, Profile, ProfileStanding, Template, User};

/// Data persistence contract for users, profiles, templates, journals and entries.
///
/// Referential rules the implementation must uphold: creating a user creates
/// its profile atomically, deleting a journal deletes its entries, deleting a
/// user clears the owner of its journals and templates.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JournalRepo: Send + Sync {
    // User Operations
    async fn create_user(&self, user: NewUser) -> anyhow::Result<User>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
    /// Persists username, names, email, password hash, recents and last login.
    async fn save_user(&self, user: &User) -> anyhow::Result<()>;
    async fn delete_user(&self, id: Uuid) -> anyhow::Result<()>;

    // Profile Operations
    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;
    /// Persists level and experience, get-or-creates every unlocked achievement
    /// and links it to the profile.
    async fn save_profile(&self, profile: &Profile) -> anyhow::Result<()>;
    async fn list_standings(&self) -> anyhow::Result<Vec<ProfileStanding>>;
    async fn list_achievements(&self, user_id: Uuid) -> anyhow::Result<Vec<Achievement>>;

    // Template Operations
    async fn create_template(&self, template: &Template) -> anyhow::Result<()>;
    async fn get_template(&self, id: Uuid) -> anyhow::Result<Option<Template>>;
    async fn find_template(&self, owner_id: Uuid, name: &str) -> anyhow::Result<Option<Template>>;
    async fn list_templates(&self, owner_id: Uuid) -> anyhow::Result<Vec<Template>>;

    // Journal Operations
    async fn create_journal(&self, journal: &Journal) -> anyhow::Result<()>;
    async fn get_journal(&self, id: Uuid) -> anyhow::Result<Option<Journal>>;
    async fn list_journals(&self, owner_id: Uuid) -> anyhow::Result<Vec<Journal>>;
    async fn delete_journal(&self, id: Uuid) -> anyhow::Result<()>;

    // Entry Operations
    /// Returns `false`, writing nothing, when the journal already has an entry
    /// dated `entry.created_on`.
    async fn create_entry(&self, entry: &Entry) -> anyhow::Result<bool>;
    async fn get_entry(&self, id: Uuid) -> anyhow::Result<Option<Entry>>;
    /// Entries of a journal, newest first.
    async fn list_entries(&self, journal_id: Uuid) -> anyhow::Result<Vec<Entry>>;
    async fn save_entry(&self, entry: &Entry) -> anyhow::Result<()>;
    async fn delete_entry(&self, id: Uuid) -> anyhow::Result<()>;
}

/// Media storage contract for entry attachments.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes under `file_name` and returns the stored name.
    async fn save_attachment(&self, file_name: &str, data: Vec<u8>) -> anyhow::Result<String>;
    async fn remove_attachment(&self, file_name: &str) -> anyhow::Result<()>;
    /// Public URL the browser fetches the attachment from.
    fn url(&self, file_name: &str) -> String;
    /// Filesystem path, for collaborators that read the file directly.
    fn local_path(&self, file_name: &str) -> PathBuf;
}

/// Password hashing contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialProvider: Send + Sync {
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;
    fn verify_password(&self, password: &str, hash: &str) -> bool;
}

/// Turns an ordered block list into a finished document (PDF bytes).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, blocks: &[DocumentBlock]) -> anyhow::Result<Vec<u8>>;
}

/// Outbound messages to users. Fire-and-forget: delivery is not confirmed.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}
