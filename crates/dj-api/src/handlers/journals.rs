//! Journal list, creation (including the custom-template detour), the
//! entries page, journal export and deletion.

use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use dj_core::access::AccessTarget;
use dj_core::error::{AppError, FieldErrors};
use dj_core::models::User;
use dj_core::services::journals::{CustomJournal, JournalCreation};
use dj_ui::{CustomTemplateTemplate, JournalEntriesTemplate, JournalsTemplate};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{journal_url, page, pdf, see_other, today};
use crate::error::ApiError;
use crate::session::{self, JOURNALS_PATH};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

async fn journals_page(
    data: &AppState,
    user: &User,
    flash: Option<&str>,
    search: &str,
    journal_name: &str,
    mut errors: FieldErrors,
    status: StatusCode,
) -> Result<HttpResponse, ApiError> {
    let journals = match data.journals.list_journals(user, Some(search)).await {
        Ok(journals) => journals,
        Err(AppError::Validation(search_errors)) => {
            for message in search_errors.get("search") {
                errors.add("search", message.clone());
            }
            data.journals.list_journals(user, None).await?
        }
        Err(err) => return Err(err.into()),
    };
    let templates = data.journals.catalog().accessible(user).await?;
    let status = if errors.get("search").is_empty() {
        status
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    page(
        status,
        &JournalsTemplate {
            nav_user: Some(&user.username),
            flash,
            journals: &journals,
            templates: &templates,
            search,
            journal_name,
            errors: &errors,
        },
    )
}

pub async fn list_journals(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let user = session::require_user(&data, &session, &req).await?;
    let flash = session::take_flash(&session);
    let search = query.search.as_deref().unwrap_or("");
    journals_page(
        &data,
        &user,
        flash.as_deref(),
        search,
        "",
        FieldErrors::default(),
        StatusCode::OK,
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct CreateJournalForm {
    pub journal_name: String,
    pub template: String,
}

pub async fn create_journal(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    form: web::Form<CreateJournalForm>,
) -> Result<HttpResponse, ApiError> {
    let user = session::require_user(&data, &session, &req).await?;
    // An unparsable id reads as a template that does not exist.
    let template_id = form.template.trim().parse::<Uuid>().unwrap_or_else(|_| Uuid::nil());

    match data
        .journals
        .create_journal(&user, &form.journal_name, template_id, today())
        .await
    {
        Ok(JournalCreation::Created(created)) => {
            if let Some(award) = &created.award {
                session::set_flash(&session, format!("+{} XP", award.gained))?;
            }
            Ok(see_other(journal_url(created.item.id)))
        }
        Ok(JournalCreation::NeedsCustomTemplate { journal_name }) => {
            session::set_pending_journal(&session, &journal_name)?;
            Ok(see_other("/custom_template/"))
        }
        Err(AppError::Validation(errors)) => {
            journals_page(
                &data,
                &user,
                None,
                "",
                &form.journal_name,
                errors,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn custom_template_page(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user = session::require_user(&data, &session, &req).await?;
    let journal_name = session::pending_journal(&session).unwrap_or_default();
    page(
        StatusCode::OK,
        &CustomTemplateTemplate {
            nav_user: Some(&user.username),
            flash: None,
            journal_name: &journal_name,
            template_name: "",
            questions: "",
            errors: &FieldErrors::default(),
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct CustomTemplateForm {
    #[serde(default)]
    pub journal_name: String,
    pub template_name: String,
    pub questions: String,
}

pub async fn create_custom_journal(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    form: web::Form<CustomTemplateForm>,
) -> Result<HttpResponse, ApiError> {
    let user = session::require_user(&data, &session, &req).await?;
    let form = form.into_inner();
    let journal_name = Some(form.journal_name.clone())
        .filter(|name| !name.trim().is_empty())
        .or_else(|| session::pending_journal(&session));

    let request = CustomJournal {
        journal_name,
        template_name: form.template_name.clone(),
        questions: form.questions.clone(),
    };
    match data.journals.create_custom_journal(&user, request, today()).await {
        Ok(created) => {
            session::clear_pending_journal(&session);
            if let Some(award) = &created.award {
                session::set_flash(&session, format!("+{} XP", award.gained))?;
            }
            Ok(see_other(journal_url(created.item.id)))
        }
        Err(AppError::Validation(errors)) => page(
            StatusCode::UNPROCESSABLE_ENTITY,
            &CustomTemplateTemplate {
                nav_user: Some(&user.username),
                flash: None,
                journal_name: &form.journal_name,
                template_name: &form.template_name,
                questions: &form.questions,
                errors: &errors,
            },
        ),
        Err(err) => Err(err.into()),
    }
}

async fn entries_page(
    data: &AppState,
    session: &Session,
    req: &HttpRequest,
    journal_id: Uuid,
    search: &str,
) -> Result<HttpResponse, ApiError> {
    let access = session::require_access(data, session, req, AccessTarget::journal(journal_id)).await?;
    let mut user = access.user;
    let flash = session::take_flash(session);

    let mut errors = FieldErrors::default();
    let journal_page = match data
        .journals
        .open_journal(&mut user, access.journal.clone(), Some(search), today())
        .await
    {
        Ok(journal_page) => journal_page,
        Err(AppError::Validation(search_errors)) => {
            errors = search_errors;
            data.journals.open_journal(&mut user, access.journal, None, today()).await?
        }
        Err(err) => return Err(err.into()),
    };
    let status = if errors.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    page(
        status,
        &JournalEntriesTemplate {
            nav_user: Some(&user.username),
            flash: flash.as_deref(),
            page: &journal_page,
            search,
            errors: &errors,
        },
    )
}

pub async fn journal_entries(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let search = query.search.as_deref().unwrap_or("");
    entries_page(&data, &session, &req, path.into_inner(), search).await
}

/// The search box posts back to the entries page.
pub async fn search_entries(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    path: web::Path<Uuid>,
    form: web::Form<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let search = form.search.as_deref().unwrap_or("");
    entries_page(&data, &session, &req, path.into_inner(), search).await
}

pub async fn download_journal_pdf(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let access = session::require_access(&data, &session, &req, AccessTarget::journal(path.into_inner())).await?;
    let blocks = data.journals.journal_document(&access.journal).await?;
    let renderer = data.renderer.clone();
    let bytes = web::block(move || renderer.render(&blocks))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;
    Ok(pdf(&format!("journal_{}_entries.pdf", access.journal.id), bytes))
}

pub async fn delete_journal(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let access = session::require_access(&data, &session, &req, AccessTarget::journal(path.into_inner())).await?;
    let mut user = access.user;
    data.journals.delete_journal(&mut user, &access.journal).await?;
    info!(user_id = %user.id, journal_id = %access.journal.id, "journal removed by owner");
    session::set_flash(&session, format!("Deleted \"{}\".", access.journal.name))?;
    Ok(see_other(JOURNALS_PATH))
}
