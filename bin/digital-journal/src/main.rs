//! # Digital Journal Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::Key;
use actix_web::{web, App, HttpServer};
use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dj_api::middleware::{security_headers, session_middleware, standard_middleware};
use dj_api::{configure_routes, AppState};
use dj_config::Settings;
use dj_core::seed::{self, SeedTemplate};
use dj_core::services::templates::TemplateCatalog;
use dj_core::traits::{CredentialProvider, DocumentRenderer, JournalRepo, MediaStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Feature-gated imports
#[cfg(feature = "db-sqlite")]
use dj_db_sqlite::SqliteJournalRepo;

#[cfg(feature = "storage-local")]
use dj_storage_local::LocalMediaStore;

#[cfg(feature = "auth-simple")]
use dj_auth_simple::Argon2Credentials;

#[cfg(feature = "export-pdf")]
use dj_export_pdf::PdfiumRenderer;

#[cfg(not(all(feature = "db-sqlite", feature = "storage-local", feature = "auth-simple", feature = "export-pdf")))]
compile_error!("digital-journal needs the db-sqlite, storage-local, auth-simple and export-pdf features");

#[derive(Debug, Parser)]
#[command(name = "digital-journal", version, about = "Multi-user journaling server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Seed the default templates, then serve HTTP (the default).
    Serve,
    /// Add a default template and prepend it to the seed document.
    CreateTemplate {
        #[arg(long)]
        name: String,
        /// Comma-separated questions.
        #[arg(long, value_delimiter = ',', required = true)]
        questions: Vec<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// The adapters selected at compile time.
struct Plugins {
    repo: Arc<dyn JournalRepo>,
    media: Arc<dyn MediaStore>,
    credentials: Arc<dyn CredentialProvider>,
    renderer: Arc<dyn DocumentRenderer>,
}

async fn plugins(settings: &Settings) -> anyhow::Result<Plugins> {
    // 1. Initialize Database Implementation
    let repo = SqliteJournalRepo::new(&settings.database.url).await?;

    // 2. Initialize Storage Implementation
    tokio::fs::create_dir_all(&settings.media.root)
        .await
        .with_context(|| format!("creating {}", settings.media.root.display()))?;
    let media = LocalMediaStore::new(settings.media.root.clone(), settings.media.url_prefix.clone());

    // 3. Initialize Auth Implementation
    let credentials = Argon2Credentials::new();

    // 4. Initialize Document Export
    let renderer = PdfiumRenderer::new(settings.pdf.library_path.clone());

    Ok(Plugins {
        repo: Arc::new(repo),
        media: Arc::new(media),
        credentials: Arc::new(credentials),
        renderer: Arc::new(renderer),
    })
}

#[cfg(feature = "notify")]
fn spawn_reminders(settings: &Settings, repo: Arc<dyn JournalRepo>) -> anyhow::Result<()> {
    use dj_core::services::reminders::ReminderJob;
    use dj_core::traits::Notifier;
    use dj_notify::{LogNotifier, WebhookNotifier};

    let reminder = &settings.reminder;
    let notifier: Arc<dyn Notifier> = match &reminder.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone(), reminder.from_address.clone())?),
        None => Arc::new(LogNotifier::new(reminder.from_address.clone())),
    };
    let job = ReminderJob::new(repo, notifier);
    let period = Duration::from_secs(reminder.interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            if let Err(err) = job.run(Utc::now()).await {
                warn!(error = %err, "reminder pass aborted");
            }
        }
    });
    info!(every_secs = period.as_secs(), "reminder job scheduled");
    Ok(())
}

#[cfg(not(feature = "notify"))]
fn spawn_reminders(_settings: &Settings, _repo: Arc<dyn JournalRepo>) -> anyhow::Result<()> {
    warn!("built without the notify feature, reminders are disabled");
    Ok(())
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let plugins = plugins(&settings).await?;
    let catalog = TemplateCatalog::new(
        plugins.repo.clone(),
        settings.templates.owner_username.clone(),
        settings.templates.custom_template_name.clone(),
    );

    let seeds = seed::load(&settings.templates.seed_path)?;
    let report = catalog
        .seed(plugins.credentials.as_ref(), &seeds, Utc::now())
        .await?;
    info!(
        owner_created = report.owner_created,
        created = report.templates_created.len(),
        "default templates checked"
    );

    spawn_reminders(&settings, plugins.repo.clone())?;

    let state = AppState::new(
        plugins.repo,
        plugins.media,
        plugins.credentials,
        plugins.renderer,
        catalog,
    );
    let key = Key::try_from(settings.session.key_bytes()).map_err(|e| anyhow!("session key: {e}"))?;
    let media_prefix = settings.media.url_prefix.clone();
    let media_root = settings.media.root.clone();
    let cookie_secure = settings.session.cookie_secure;
    let bind = settings.server.bind_address();

    info!("Digital Journal starting on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(standard_middleware())
            .wrap(security_headers())
            .wrap(session_middleware(key.clone(), cookie_secure))
            .service(actix_files::Files::new(&media_prefix, &media_root))
            .configure(configure_routes)
    })
    .bind(bind)?
    .run()
    .await?;
    Ok(())
}

async fn create_template(settings: Settings, name: String, questions: Vec<String>) -> anyhow::Result<()> {
    let plugins = plugins(&settings).await?;
    let catalog = TemplateCatalog::new(
        plugins.repo,
        settings.templates.owner_username.clone(),
        settings.templates.custom_template_name.clone(),
    );
    let template = catalog
        .create_default(&SeedTemplate {
            template_name: name,
            questions,
        })
        .await?;

    let written = seed::prepend(
        &settings.templates.seed_path,
        SeedTemplate {
            template_name: template.name.clone(),
            questions: template.questions.clone(),
        },
    )?;
    info!(
        template = %template.name,
        questions = template.questions.len(),
        seed_templates = written.len(),
        "default template created"
    );
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    init_tracing(settings.log.json);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::CreateTemplate { name, questions } => create_template(settings, name, questions).await,
    }
}
