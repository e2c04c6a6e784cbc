//! Home page, sign-up, log-in/out, account settings and the dashboard.

use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use dj_core::error::{AppError, FieldErrors};
use dj_core::models::User;
use dj_core::services::accounts::{PasswordChange, ProfileUpdate, SignUp};
use dj_ui::{
    DashboardTemplate, HomeTemplate, LogInTemplate, PasswordTemplate, ProfileTemplate, SignUpTemplate, SignUpValues,
};
use serde::Deserialize;
use tracing::info;

use super::{page, see_other};
use crate::error::ApiError;
use crate::session::{self, DASHBOARD_PATH};
use crate::state::AppState;

pub async fn home(data: web::Data<AppState>, session: Session) -> Result<HttpResponse, ApiError> {
    if session::current_user(&data, &session).await?.is_some() {
        return Ok(see_other(DASHBOARD_PATH));
    }
    let flash = session::take_flash(&session);
    page(
        StatusCode::OK,
        &HomeTemplate {
            nav_user: None,
            flash: flash.as_deref(),
        },
    )
}

pub async fn sign_up_page(data: web::Data<AppState>, session: Session) -> Result<HttpResponse, ApiError> {
    if session::current_user(&data, &session).await?.is_some() {
        return Ok(see_other(DASHBOARD_PATH));
    }
    page(
        StatusCode::OK,
        &SignUpTemplate {
            nav_user: None,
            flash: None,
            values: &SignUpValues::default(),
            errors: &FieldErrors::default(),
        },
    )
}

pub async fn sign_up(
    data: web::Data<AppState>,
    session: Session,
    form: web::Form<SignUp>,
) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();
    let values = SignUpValues {
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        username: form.username.clone(),
        email: form.email.clone(),
    };

    match data.accounts.sign_up(form, Utc::now()).await {
        Ok(user) => {
            session::log_in(&session, user.id)?;
            session::set_flash(&session, format!("Welcome, {}!", user.first_name))?;
            Ok(see_other(DASHBOARD_PATH))
        }
        Err(AppError::Validation(errors)) => page(
            StatusCode::UNPROCESSABLE_ENTITY,
            &SignUpTemplate {
                nav_user: None,
                flash: None,
                values: &values,
                errors: &errors,
            },
        ),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

pub async fn log_in_page(
    data: web::Data<AppState>,
    session: Session,
    query: web::Query<NextQuery>,
) -> Result<HttpResponse, ApiError> {
    let next = session::safe_next(query.next.as_deref());
    if session::current_user(&data, &session).await?.is_some() {
        return Ok(see_other(next));
    }
    let flash = session::take_flash(&session);
    page(
        StatusCode::OK,
        &LogInTemplate {
            nav_user: None,
            flash: flash.as_deref(),
            username: "",
            next,
            error: None,
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct LogInForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

pub async fn log_in(
    data: web::Data<AppState>,
    session: Session,
    form: web::Form<LogInForm>,
) -> Result<HttpResponse, ApiError> {
    let next = session::safe_next(form.next.as_deref());
    match data.accounts.log_in(form.username.trim(), &form.password, Utc::now()).await {
        Ok(user) => {
            session::log_in(&session, user.id)?;
            info!(user_id = %user.id, "session started");
            Ok(see_other(next))
        }
        Err(AppError::Unauthorized(message)) => page(
            StatusCode::UNAUTHORIZED,
            &LogInTemplate {
                nav_user: None,
                flash: None,
                username: &form.username,
                next,
                error: Some(&message),
            },
        ),
        Err(err) => Err(err.into()),
    }
}

pub async fn log_out(session: Session) -> HttpResponse {
    session::log_out(&session);
    see_other("/")
}

pub async fn profile_page(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user = session::require_user(&data, &session, &req).await?;
    let values = current_values(&user);
    page(
        StatusCode::OK,
        &ProfileTemplate {
            nav_user: Some(&user.username),
            flash: None,
            values: &values,
            errors: &FieldErrors::default(),
        },
    )
}

fn current_values(user: &User) -> SignUpValues {
    SignUpValues {
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
    }
}

pub async fn update_profile(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    form: web::Form<ProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    let user = session::require_user(&data, &session, &req).await?;
    let form = form.into_inner();
    let values = SignUpValues {
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        username: form.username.clone(),
        email: form.email.clone(),
    };
    let username = user.username.clone();

    match data.accounts.update_profile(user, form).await {
        Ok(_) => {
            session::set_flash(&session, "Profile Updated!")?;
            Ok(see_other(DASHBOARD_PATH))
        }
        Err(AppError::Validation(errors)) => page(
            StatusCode::UNPROCESSABLE_ENTITY,
            &ProfileTemplate {
                nav_user: Some(&username),
                flash: None,
                values: &values,
                errors: &errors,
            },
        ),
        Err(err) => Err(err.into()),
    }
}

pub async fn password_page(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user = session::require_user(&data, &session, &req).await?;
    page(
        StatusCode::OK,
        &PasswordTemplate {
            nav_user: Some(&user.username),
            flash: None,
            errors: &FieldErrors::default(),
        },
    )
}

pub async fn change_password(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    form: web::Form<PasswordChange>,
) -> Result<HttpResponse, ApiError> {
    let user = session::require_user(&data, &session, &req).await?;
    let username = user.username.clone();

    match data.accounts.change_password(user, form.into_inner()).await {
        Ok(user) => {
            // Fresh session id for the new credentials.
            session::log_in(&session, user.id)?;
            session::set_flash(&session, "Password updated!")?;
            Ok(see_other(DASHBOARD_PATH))
        }
        Err(AppError::Validation(errors)) => page(
            StatusCode::UNPROCESSABLE_ENTITY,
            &PasswordTemplate {
                nav_user: Some(&username),
                flash: None,
                errors: &errors,
            },
        ),
        Err(err) => Err(err.into()),
    }
}

pub async fn dashboard(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user = session::require_user(&data, &session, &req).await?;
    let dashboard = data.accounts.dashboard(user).await?;
    let flash = session::take_flash(&session);
    page(
        StatusCode::OK,
        &DashboardTemplate {
            nav_user: Some(&dashboard.user.username),
            flash: flash.as_deref(),
            dashboard: &dashboard,
        },
    )
}
