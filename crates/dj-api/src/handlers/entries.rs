//! Entry creation, the multipart edit form, the read-only view, export
//! and deletion.

use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use dj_core::access::AccessTarget;
use dj_core::error::{AppError, FieldErrors};
use dj_core::models::{Entry, Journal};
use dj_core::services::journals::{EntryUpdate, Upload};
use dj_ui::{mood_options, EditEntryTemplate, ViewEntryTemplate};
use futures_util::TryStreamExt;
use tracing::{debug, info};
use uuid::Uuid;

use super::{journal_url, page, pdf, see_other, today};
use crate::error::ApiError;
use crate::session;
use crate::state::AppState;

/// Uploads above this are refused before reaching the media store.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn entry_url(journal_id: Uuid, entry_id: Uuid, action: &str) -> String {
    format!("/journals/{journal_id}/entries/{entry_id}/{action}")
}

pub async fn create_entry(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let access = session::require_access(&data, &session, &req, AccessTarget::journal(path.into_inner())).await?;
    match data.journals.create_entry(&access.journal, today()).await {
        Ok(created) => {
            if let Some(award) = &created.award {
                session::set_flash(&session, format!("+{} XP", award.gained))?;
            }
            Ok(see_other(entry_url(access.journal.id, created.item.id, "edit")))
        }
        Err(AppError::Conflict(message)) => {
            session::set_flash(&session, message)?;
            Ok(see_other(journal_url(access.journal.id)))
        }
        Err(err) => Err(err.into()),
    }
}

async fn edit_page(
    data: &AppState,
    username: &str,
    journal: &Journal,
    entry: Entry,
    errors: &FieldErrors,
    status: StatusCode,
) -> Result<HttpResponse, ApiError> {
    let moods = mood_options(entry.mood);
    let view = data.journals.entry_view(journal, entry).await?;
    page(
        status,
        &EditEntryTemplate {
            nav_user: Some(username),
            flash: None,
            journal,
            view: &view,
            moods,
            errors,
        },
    )
}

pub async fn edit_entry_page(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (journal_id, entry_id) = path.into_inner();
    let (user, journal, entry) = session::require_access(&data, &session, &req, AccessTarget::entry(entry_id))
        .await?
        .entry_in(journal_id)?;
    edit_page(&data, &user.username, &journal, entry, &FieldErrors::default(), StatusCode::OK).await
}

/// Collects the edit form. `responses` repeats once per question.
async fn read_entry_form(mut payload: Multipart) -> Result<EntryUpdate, ApiError> {
    let mut update = EntryUpdate::default();
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let file_name = disposition.get_filename().map(str::to_string);
        // Fall back to the file extension when the browser sends no type.
        let content_type = match (field.content_type(), &file_name) {
            (Some(mime), _) if mime.essence_str() != "application/octet-stream" => mime.essence_str().to_string(),
            (_, Some(file_name)) => mime_guess::from_path(file_name).first_or_octet_stream().essence_str().to_string(),
            _ => "application/octet-stream".to_string(),
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?
        {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(ApiError::BadRequest("upload too large".into()));
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "multimedia_file" => {
                // Browsers send an empty part when no file was chosen.
                if let Some(file_name) = file_name.filter(|n| !n.is_empty()) {
                    update.upload = Some(Upload {
                        file_name,
                        content_type,
                        data: bytes,
                    });
                }
            }
            "entry_name" => update.name = String::from_utf8_lossy(&bytes).into_owned(),
            "responses" => update.responses.push(String::from_utf8_lossy(&bytes).into_owned()),
            "mood" => update.mood = Some(String::from_utf8_lossy(&bytes).into_owned()),
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }
    Ok(update)
}

pub async fn edit_entry(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let (journal_id, entry_id) = path.into_inner();
    let (user, journal, entry) = session::require_access(&data, &session, &req, AccessTarget::entry(entry_id))
        .await?
        .entry_in(journal_id)?;
    let update = read_entry_form(payload).await?;

    // Re-rendering after a failed save shows what was typed.
    let mut submitted = entry.clone();
    submitted.name = update.name.clone();
    submitted.responses = update.responses.clone();

    match data.journals.update_entry(&journal, entry, update).await {
        Ok(saved) => {
            info!(entry_id = %saved.id, "entry saved");
            Ok(see_other(entry_url(journal.id, saved.id, "view")))
        }
        Err(AppError::Validation(errors)) => {
            edit_page(
                &data,
                &user.username,
                &journal,
                submitted,
                &errors,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn view_entry(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (journal_id, entry_id) = path.into_inner();
    let (user, journal, entry) = session::require_access(&data, &session, &req, AccessTarget::entry(entry_id))
        .await?
        .entry_in(journal_id)?;
    let show_image = entry.has_image_attachment();
    let view = data.journals.entry_view(&journal, entry).await?;
    let flash = session::take_flash(&session);
    page(
        StatusCode::OK,
        &ViewEntryTemplate {
            nav_user: Some(&user.username),
            flash: flash.as_deref(),
            journal: &journal,
            view: &view,
            show_image,
        },
    )
}

pub async fn download_entry_pdf(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (journal_id, entry_id) = path.into_inner();
    let (_, journal, entry) = session::require_access(&data, &session, &req, AccessTarget::entry(entry_id))
        .await?
        .entry_in(journal_id)?;
    let blocks = data.journals.entry_document(&journal, &entry).await?;
    let renderer = data.renderer.clone();
    let bytes = web::block(move || renderer.render(&blocks))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;
    Ok(pdf(&format!("entry_{}.pdf", entry.id), bytes))
}

pub async fn delete_entry(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let access = session::require_access(&data, &session, &req, AccessTarget::entry(path.into_inner())).await?;
    let Some(entry) = access.entry else {
        return Err(AppError::not_found("Entry", access.journal.id).into());
    };
    data.journals.delete_entry(&entry).await?;
    session::set_flash(&session, format!("Deleted \"{}\".", entry.name))?;
    Ok(see_other(journal_url(access.journal.id)))
}
