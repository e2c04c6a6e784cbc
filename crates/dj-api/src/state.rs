use std::sync::Arc;

use dj_core::services::accounts::AccountService;
use dj_core::services::journals::JournalService;
use dj_core::services::templates::TemplateCatalog;
use dj_core::traits::{CredentialProvider, DocumentRenderer, JournalRepo, MediaStore};

/// State shared across all Actix-web workers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn JournalRepo>,
    pub accounts: AccountService,
    pub journals: JournalService,
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn JournalRepo>,
        media: Arc<dyn MediaStore>,
        credentials: Arc<dyn CredentialProvider>,
        renderer: Arc<dyn DocumentRenderer>,
        catalog: TemplateCatalog,
    ) -> Self {
        Self {
            accounts: AccountService::new(repo.clone(), credentials),
            journals: JournalService::new(repo.clone(), media, catalog),
            repo,
            renderer,
        }
    }
}
