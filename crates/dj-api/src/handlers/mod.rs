//! # dj-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core services.

pub mod accounts;
pub mod entries;
pub mod journals;

use actix_web::http::header::{self, ContentType};
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use askama::Template;
use chrono::{NaiveDate, Utc};

use crate::error::ApiError;

pub(crate) fn page(status: StatusCode, template: &impl Template) -> Result<HttpResponse, ApiError> {
    let html = template.render()?;
    Ok(HttpResponse::build(status).content_type(ContentType::html()).body(html))
}

pub(crate) fn see_other(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

pub(crate) fn pdf(file_name: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ))
        .body(bytes)
}

/// Entry dates follow the server's UTC calendar.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn journal_url(journal_id: impl std::fmt::Display) -> String {
    format!("/journals/{journal_id}/entries")
}
