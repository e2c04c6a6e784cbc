//! Cookie-session helpers and the guard functions handlers chain before
//! touching a journal or entry.
//!
//! Guards return `Err(ApiError::Redirect)` for the soft outcomes, so a
//! handler can write `let user = require_user(..).await?;` and stop there.

use actix_session::Session;
use actix_web::HttpRequest;
use dj_core::access::{self, AccessDecision, AccessTarget};
use dj_core::models::{Entry, Journal, User};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const USER_KEY: &str = "user_id";
const FLASH_KEY: &str = "flash";
const PENDING_JOURNAL_KEY: &str = "pending_journal_name";

pub const LOGIN_PATH: &str = "/log_in/";
pub const JOURNALS_PATH: &str = "/journals/";
pub const DASHBOARD_PATH: &str = "/dashboard/";

pub fn login_url(next: &str) -> String {
    format!("{LOGIN_PATH}?next={}", urlencoding::encode(next))
}

/// Only same-site absolute paths are followed after log-in.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => DASHBOARD_PATH,
    }
}

fn requested_path(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.path().to_string())
}

pub fn log_in(session: &Session, user_id: Uuid) -> Result<(), ApiError> {
    session.renew();
    session.insert(USER_KEY, user_id).map_err(|e| ApiError::internal(anyhow::anyhow!("{e}")))
}

pub fn log_out(session: &Session) {
    session.purge();
}

pub fn set_flash(session: &Session, message: impl Into<String>) -> Result<(), ApiError> {
    session
        .insert(FLASH_KEY, message.into())
        .map_err(|e| ApiError::internal(anyhow::anyhow!("{e}")))
}

/// Reads and clears the one-shot message.
pub fn take_flash(session: &Session) -> Option<String> {
    session.remove_as::<String>(FLASH_KEY).and_then(Result::ok)
}

pub fn set_pending_journal(session: &Session, name: &str) -> Result<(), ApiError> {
    session
        .insert(PENDING_JOURNAL_KEY, name)
        .map_err(|e| ApiError::internal(anyhow::anyhow!("{e}")))
}

pub fn pending_journal(session: &Session) -> Option<String> {
    session.get::<String>(PENDING_JOURNAL_KEY).ok().flatten()
}

pub fn clear_pending_journal(session: &Session) {
    session.remove(PENDING_JOURNAL_KEY);
}

/// The logged-in user, if the session names one that still exists.
pub async fn current_user(state: &AppState, session: &Session) -> Result<Option<User>, ApiError> {
    let Some(user_id) = session.get::<Uuid>(USER_KEY).ok().flatten() else {
        return Ok(None);
    };
    let user = state.accounts.current_user(user_id).await?;
    if user.is_none() {
        debug!(%user_id, "session names a deleted user");
        session.purge();
    }
    Ok(user)
}

/// Login gate: anonymous requests are sent to the log-in page with `next`.
pub async fn require_user(state: &AppState, session: &Session, req: &HttpRequest) -> Result<User, ApiError> {
    current_user(state, session)
        .await?
        .ok_or_else(|| ApiError::redirect(login_url(&requested_path(req))))
}

/// What a granted ownership check hands the handler.
pub struct Access {
    pub user: User,
    pub journal: Journal,
    pub entry: Option<Entry>,
}

impl Access {
    /// The entry of an entry-scoped target, also checking it belongs to the
    /// journal named in the URL.
    pub fn entry_in(self, journal_id: Uuid) -> Result<(User, Journal, Entry), ApiError> {
        match self.entry {
            Some(entry) if self.journal.id == journal_id => Ok((self.user, self.journal, entry)),
            Some(entry) => Err(dj_core::AppError::not_found("Entry", entry.id).into()),
            None => Err(dj_core::AppError::not_found("Entry", journal_id).into()),
        }
    }
}

/// Login gate chained with the ownership policy.
pub async fn require_access(
    state: &AppState,
    session: &Session,
    req: &HttpRequest,
    target: AccessTarget,
) -> Result<Access, ApiError> {
    let user = current_user(state, session).await?;
    let decision = access::authorize(
        state.repo.as_ref(),
        user.as_ref().map(|u| u.id),
        target,
        &requested_path(req),
    )
    .await?;

    match (decision, user) {
        (AccessDecision::Granted { journal: Some(journal), entry }, Some(user)) => Ok(Access { user, journal, entry }),
        (AccessDecision::RedirectToLogin { next }, _) => Err(ApiError::redirect(login_url(&next))),
        (AccessDecision::RedirectToJournals, _) => Err(ApiError::redirect(JOURNALS_PATH)),
        (AccessDecision::Granted { .. }, _) | (AccessDecision::NotFound, _) => {
            Err(dj_core::AppError::not_found("Journal", format!("{target:?}")).into())
        }
    }
}
