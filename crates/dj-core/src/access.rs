//! # Access Control
//!
//! Ownership gate for journal and entry endpoints. The outcome is a value, not
//! an error: adapters turn [`AccessDecision`] into a login redirect, a soft
//! redirect to the journal list, a 404, or let the request through.

use uuid::Uuid;

use crate::error::Result;
use crate::models::{Entry, Journal};
use crate::traits::JournalRepo;

/// What a request is trying to reach. An entry id wins over a journal id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessTarget {
    pub entry_id: Option<Uuid>,
    pub journal_id: Option<Uuid>,
}

impl AccessTarget {
    pub fn journal(journal_id: Uuid) -> Self {
        Self {
            entry_id: None,
            journal_id: Some(journal_id),
        }
    }

    pub fn entry(entry_id: Uuid) -> Self {
        Self {
            entry_id: Some(entry_id),
            journal_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The requester owns the governing journal (or nothing needed owning).
    Granted {
        journal: Option<Journal>,
        entry: Option<Entry>,
    },
    /// Not authenticated; come back to `next` after logging in.
    RedirectToLogin { next: String },
    /// Authenticated but not the owner.
    RedirectToJournals,
    /// The entry or journal id does not exist.
    NotFound,
}

/// Decides whether `requester` may act on `target`.
///
/// Authentication is checked first, then existence, then ownership.
pub async fn authorize(
    repo: &dyn JournalRepo,
    requester: Option<Uuid>,
    target: AccessTarget,
    requested_path: &str,
) -> Result<AccessDecision> {
    let Some(user_id) = requester else {
        return Ok(AccessDecision::RedirectToLogin {
            next: requested_path.to_string(),
        });
    };

    let (journal, entry) = if let Some(entry_id) = target.entry_id {
        let Some(entry) = repo.get_entry(entry_id).await? else {
            return Ok(AccessDecision::NotFound);
        };
        let Some(journal) = repo.get_journal(entry.journal_id).await? else {
            return Ok(AccessDecision::NotFound);
        };
        (Some(journal), Some(entry))
    } else if let Some(journal_id) = target.journal_id {
        let Some(journal) = repo.get_journal(journal_id).await? else {
            return Ok(AccessDecision::NotFound);
        };
        (Some(journal), None)
    } else {
        (None, None)
    };

    if let Some(journal) = &journal {
        if !journal.is_owned_by(user_id) {
            return Ok(AccessDecision::RedirectToJournals);
        }
    }

    Ok(AccessDecision::Granted { journal, entry })
}
