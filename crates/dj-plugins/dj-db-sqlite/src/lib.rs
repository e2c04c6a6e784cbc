//! # dj-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `dj-core` domain models. Identifiers are stored as 16-byte BLOBs,
//! list-valued fields (questions, responses, recents) as JSON text.

use std::collections::BTreeSet;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use dj_core::gamification::catalog_achievement;
use dj_core::models::{Achievement, Entry, Journal, Mood, NewUser, Profile, ProfileStanding, Template, User};
use dj_core::recents::RecentJournals;
use dj_core::traits::JournalRepo;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

pub struct SqliteJournalRepo {
    pool: SqlitePool,
}

impl SqliteJournalRepo {
    /// Opens (creating if needed) the database at `url` and runs migrations.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database is a separate database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("connecting to {url}"))?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(url, "sqlite database ready");
        Ok(Self { pool })
    }
}

// Helpers for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> anyhow::Result<Uuid> {
    Uuid::from_slice(blob).map_err(|e| anyhow!("corrupt id column: {e}"))
}

fn optional_uuid(row: &SqliteRow, column: &str) -> anyhow::Result<Option<Uuid>> {
    row.try_get::<Option<Vec<u8>>, _>(column)?
        .map(|blob| blob_to_uuid(&blob))
        .transpose()
}

fn row_to_user(row: &SqliteRow) -> anyhow::Result<User> {
    let recents: RecentJournals = serde_json::from_str(&row.try_get::<String, _>("recently_accessed")?)?;
    Ok(User {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        password_hash: row.try_get("password_hash")?,
        recently_accessed: recents,
        last_login: row.try_get("last_login")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_template(row: &SqliteRow) -> anyhow::Result<Template> {
    Ok(Template {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
        name: row.try_get("name")?,
        owner_id: optional_uuid(row, "owner_id")?,
        questions: serde_json::from_str(&row.try_get::<String, _>("questions")?)?,
    })
}

fn row_to_journal(row: &SqliteRow) -> anyhow::Result<Journal> {
    Ok(Journal {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
        name: row.try_get("name")?,
        owner_id: optional_uuid(row, "owner_id")?,
        template_id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("template_id")?)?,
        created_on: row.try_get("created_on")?,
    })
}

fn row_to_entry(row: &SqliteRow) -> anyhow::Result<Entry> {
    let mood = row
        .try_get::<Option<String>, _>("mood")?
        .map(|raw| Mood::from_str(&raw).map_err(|e| anyhow!(e)))
        .transpose()?;
    Ok(Entry {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
        journal_id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("journal_id")?)?,
        name: row.try_get("name")?,
        created_on: row.try_get("created_on")?,
        responses: serde_json::from_str(&row.try_get::<String, _>("responses")?)?,
        mood,
        attachment: row.try_get("attachment")?,
    })
}

fn level_column(row: &SqliteRow, column: &str) -> anyhow::Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value).with_context(|| format!("{column} out of range: {value}"))
}

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, recently_accessed, last_login, created_at";

#[async_trait]
impl JournalRepo for SqliteJournalRepo {
    // User Operations

    /// Inserts the user and its level 1 profile in one transaction.
    async fn create_user(&self, user: NewUser) -> anyhow::Result<User> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, username, email, first_name, last_name, password_hash, recently_accessed, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, '[]', ?)",
        )
        .bind(uuid_to_blob(user.id))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO profiles (user_id, level, experience) VALUES (?, 1, 0)")
            .bind(uuid_to_blob(user.id))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(user_id = %user.id, "user and profile inserted");

        Ok(User {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            recently_accessed: RecentJournals::new(),
            last_login: None,
            created_at: user.created_at,
        })
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_user)
            .collect()
    }

    async fn save_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET username = ?, email = ?, first_name = ?, last_name = ?, password_hash = ?, \
             recently_accessed = ?, last_login = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(serde_json::to_string(&user.recently_accessed)?)
        .bind(user.last_login)
        .bind(uuid_to_blob(user.id))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // Profile Operations

    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let Some(row) = sqlx::query("SELECT level, experience FROM profiles WHERE user_id = ?")
            .bind(uuid_to_blob(user_id))
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let achievements = sqlx::query("SELECT achievement_name FROM profile_achievements WHERE user_id = ?")
            .bind(uuid_to_blob(user_id))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>("achievement_name"))
            .collect::<Result<BTreeSet<String>, _>>()?;

        Ok(Some(Profile {
            user_id,
            level: level_column(&row, "level")?,
            experience: level_column(&row, "experience")?,
            achievements,
        }))
    }

    /// Writes level and experience, then get-or-creates each unlocked
    /// achievement and links it, all in one transaction.
    async fn save_profile(&self, profile: &Profile) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE profiles SET level = ?, experience = ? WHERE user_id = ?")
            .bind(i64::from(profile.level))
            .bind(i64::from(profile.experience))
            .bind(uuid_to_blob(profile.user_id))
            .execute(&mut *tx)
            .await?;

        for name in &profile.achievements {
            let achievement = catalog_achievement(name);
            sqlx::query("INSERT OR IGNORE INTO achievements (name, description, level) VALUES (?, ?, ?)")
                .bind(&achievement.name)
                .bind(&achievement.description)
                .bind(i64::from(achievement.level))
                .execute(&mut *tx)
                .await?;
            sqlx::query("INSERT OR IGNORE INTO profile_achievements (user_id, achievement_name) VALUES (?, ?)")
                .bind(uuid_to_blob(profile.user_id))
                .bind(&achievement.name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_standings(&self) -> anyhow::Result<Vec<ProfileStanding>> {
        sqlx::query(
            "SELECT p.user_id, u.username, p.level, p.experience \
             FROM profiles p JOIN users u ON u.id = p.user_id \
             ORDER BY p.level DESC, p.experience DESC",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| -> anyhow::Result<ProfileStanding> {
            Ok(ProfileStanding {
                user_id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("user_id")?)?,
                username: row.try_get("username")?,
                level: level_column(row, "level")?,
                experience: level_column(row, "experience")?,
            })
        })
        .collect()
    }

    async fn list_achievements(&self, user_id: Uuid) -> anyhow::Result<Vec<Achievement>> {
        sqlx::query(
            "SELECT a.name, a.description, a.level FROM achievements a \
             JOIN profile_achievements pa ON pa.achievement_name = a.name \
             WHERE pa.user_id = ? ORDER BY a.level",
        )
        .bind(uuid_to_blob(user_id))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| -> anyhow::Result<Achievement> {
            Ok(Achievement {
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                level: level_column(row, "level")?,
            })
        })
        .collect()
    }

    // Template Operations

    async fn create_template(&self, template: &Template) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO templates (id, name, owner_id, questions) VALUES (?, ?, ?, ?)")
            .bind(uuid_to_blob(template.id))
            .bind(&template.name)
            .bind(template.owner_id.map(uuid_to_blob))
            .bind(serde_json::to_string(&template.questions)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_template(&self, id: Uuid) -> anyhow::Result<Option<Template>> {
        let row = sqlx::query("SELECT id, name, owner_id, questions FROM templates WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_template).transpose()
    }

    async fn find_template(&self, owner_id: Uuid, name: &str) -> anyhow::Result<Option<Template>> {
        let row = sqlx::query("SELECT id, name, owner_id, questions FROM templates WHERE owner_id = ? AND name = ? LIMIT 1")
            .bind(uuid_to_blob(owner_id))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_template).transpose()
    }

    async fn list_templates(&self, owner_id: Uuid) -> anyhow::Result<Vec<Template>> {
        sqlx::query("SELECT id, name, owner_id, questions FROM templates WHERE owner_id = ? ORDER BY rowid")
            .bind(uuid_to_blob(owner_id))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_template)
            .collect()
    }

    // Journal Operations

    async fn create_journal(&self, journal: &Journal) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO journals (id, name, owner_id, template_id, created_on) VALUES (?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(journal.id))
            .bind(&journal.name)
            .bind(journal.owner_id.map(uuid_to_blob))
            .bind(uuid_to_blob(journal.template_id))
            .bind(journal.created_on)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_journal(&self, id: Uuid) -> anyhow::Result<Option<Journal>> {
        let row = sqlx::query("SELECT id, name, owner_id, template_id, created_on FROM journals WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_journal).transpose()
    }

    async fn list_journals(&self, owner_id: Uuid) -> anyhow::Result<Vec<Journal>> {
        sqlx::query("SELECT id, name, owner_id, template_id, created_on FROM journals WHERE owner_id = ? ORDER BY rowid")
            .bind(uuid_to_blob(owner_id))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_journal)
            .collect()
    }

    /// Entries go with the journal via `ON DELETE CASCADE`.
    async fn delete_journal(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM journals WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // Entry Operations

    async fn create_entry(&self, entry: &Entry) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO entries (id, journal_id, name, created_on, responses, mood, attachment) VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (journal_id, created_on) DO NOTHING",
        )
        .bind(uuid_to_blob(entry.id))
        .bind(uuid_to_blob(entry.journal_id))
        .bind(&entry.name)
        .bind(entry.created_on)
        .bind(serde_json::to_string(&entry.responses)?)
        .bind(entry.mood.map(|m| m.as_str()))
        .bind(entry.attachment.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_entry(&self, id: Uuid) -> anyhow::Result<Option<Entry>> {
        let row = sqlx::query(
            "SELECT id, journal_id, name, created_on, responses, mood, attachment FROM entries WHERE id = ?",
        )
        .bind(uuid_to_blob(id))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_entry).transpose()
    }

    async fn list_entries(&self, journal_id: Uuid) -> anyhow::Result<Vec<Entry>> {
        sqlx::query(
            "SELECT id, journal_id, name, created_on, responses, mood, attachment FROM entries \
             WHERE journal_id = ? ORDER BY created_on DESC, rowid DESC",
        )
        .bind(uuid_to_blob(journal_id))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(row_to_entry)
        .collect()
    }

    /// The creation date is immutable and never rewritten.
    async fn save_entry(&self, entry: &Entry) -> anyhow::Result<()> {
        sqlx::query("UPDATE entries SET name = ?, responses = ?, mood = ?, attachment = ? WHERE id = ?")
            .bind(&entry.name)
            .bind(serde_json::to_string(&entry.responses)?)
            .bind(entry.mood.map(|m| m.as_str()))
            .bind(entry.attachment.as_deref())
            .bind(uuid_to_blob(entry.id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_entry(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
