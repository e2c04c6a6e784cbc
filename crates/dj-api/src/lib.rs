//! # dj-api
//!
//! The web routing and orchestration layer for Digital Journal.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;
pub mod state;

use actix_web::web;

pub use error::ApiError;
pub use state::AppState;

use handlers::{accounts, entries, journals};

/// Registers every page route. Media files are served by the binary.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(accounts::home))
        .route("/sign_up/", web::get().to(accounts::sign_up_page))
        .route("/sign_up/", web::post().to(accounts::sign_up))
        .route("/log_in/", web::get().to(accounts::log_in_page))
        .route("/log_in/", web::post().to(accounts::log_in))
        .route("/log_out/", web::post().to(accounts::log_out))
        .route("/profile/", web::get().to(accounts::profile_page))
        .route("/profile/", web::post().to(accounts::update_profile))
        .route("/password/", web::get().to(accounts::password_page))
        .route("/password/", web::post().to(accounts::change_password))
        .route("/dashboard/", web::get().to(accounts::dashboard))
        .route("/custom_template/", web::get().to(journals::custom_template_page))
        .route("/custom_template/", web::post().to(journals::create_custom_journal))
        .service(
            web::scope("/journals")
                .route("/", web::get().to(journals::list_journals))
                .route("/create_journal/", web::post().to(journals::create_journal))
                .route("/entries/{entry_id}/delete/", web::post().to(entries::delete_entry))
                .route("/{journal_id}/entries", web::get().to(journals::journal_entries))
                .route("/{journal_id}/entries", web::post().to(journals::search_entries))
                .route("/{journal_id}/create_entry", web::post().to(entries::create_entry))
                .route("/{journal_id}/download_journal_pdf", web::get().to(journals::download_journal_pdf))
                .route("/{journal_id}/delete_journal/", web::post().to(journals::delete_journal))
                .route("/{journal_id}/entries/{entry_id}/edit", web::get().to(entries::edit_entry_page))
                .route("/{journal_id}/entries/{entry_id}/edit", web::post().to(entries::edit_entry))
                .route("/{journal_id}/entries/{entry_id}/view", web::get().to(entries::view_entry))
                .route(
                    "/{journal_id}/entries/{entry_id}/download_entry_pdf",
                    web::get().to(entries::download_entry_pdf),
                ),
        );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::cookie::{Cookie, Key};
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use chrono::{NaiveDate, Utc};
    use dj_core::models::{Entry, Journal, Template, User};
    use dj_core::recents::RecentJournals;
    use dj_core::services::templates::TemplateCatalog;
    use dj_core::traits::{MockCredentialProvider, MockDocumentRenderer, MockJournalRepo, MockMediaStore};
    use uuid::Uuid;

    use super::*;

    fn user(username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: format!("{}@example.org", username.trim_start_matches('@')),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            password_hash: "hash".into(),
            recently_accessed: RecentJournals::default(),
            last_login: None,
            created_at: Utc::now(),
        }
    }

    fn journal(owner: &User) -> Journal {
        Journal {
            id: Uuid::new_v4(),
            name: "Gratitude".into(),
            owner_id: Some(owner.id),
            template_id: Uuid::new_v4(),
            created_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    fn state(repo: MockJournalRepo, credentials: MockCredentialProvider) -> AppState {
        state_with_renderer(repo, credentials, MockDocumentRenderer::new())
    }

    fn state_with_renderer(
        repo: MockJournalRepo,
        credentials: MockCredentialProvider,
        renderer: MockDocumentRenderer,
    ) -> AppState {
        let repo: Arc<dyn dj_core::JournalRepo> = Arc::new(repo);
        AppState::new(
            repo.clone(),
            Arc::new(MockMediaStore::new()),
            Arc::new(credentials),
            Arc::new(renderer),
            TemplateCatalog::new(repo, "@all", "Custom"),
        )
    }

    /// A repo that knows `me` well enough for the log-in form and the session guard.
    fn signed_in_repo(me: &User) -> MockJournalRepo {
        let mut repo = MockJournalRepo::new();
        let found = me.clone();
        repo.expect_find_user_by_username().returning(move |_| Ok(Some(found.clone())));
        repo.expect_save_user().returning(|_| Ok(()));
        let current = me.clone();
        repo.expect_get_user().returning(move |_| Ok(Some(current.clone())));
        repo
    }

    fn accepting_credentials() -> MockCredentialProvider {
        let mut credentials = MockCredentialProvider::new();
        credentials.expect_verify_password().returning(|_, _| true);
        credentials
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .wrap(middleware::session_middleware(Key::generate(), false))
                    .configure(configure_routes),
            )
            .await
        };
    }

    fn location<B>(response: &actix_web::dev::ServiceResponse<B>) -> &str {
        response.headers().get(header::LOCATION).unwrap().to_str().unwrap()
    }

    /// Logs `username` in through the real form and yields the session cookie.
    macro_rules! log_in_cookie {
        ($app:expr, $username:expr) => {{
            let request = test::TestRequest::post()
                .uri("/log_in/")
                .set_form([("username", $username), ("password", "Secret123"), ("next", "/journals/")])
                .to_request();
            let response = test::call_service($app, request).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/journals/");
            let cookie: Cookie<'static> = response
                .response()
                .cookies()
                .next()
                .expect("session cookie")
                .into_owned();
            cookie
        }};
    }

    #[actix_web::test]
    async fn anonymous_dashboard_redirects_to_log_in_with_next() {
        let app = app!(state(MockJournalRepo::new(), MockCredentialProvider::new()));
        let response = test::call_service(&app, test::TestRequest::get().uri("/dashboard/").to_request()).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/log_in/?next=%2Fdashboard%2F");
    }

    #[actix_web::test]
    async fn anonymous_journal_page_redirects_before_any_lookup() {
        let app = app!(state(MockJournalRepo::new(), MockCredentialProvider::new()));
        let uri = format!("/journals/{}/entries", Uuid::new_v4());
        let response = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/log_in/?next=%2Fjournals%2F"));
    }

    #[actix_web::test]
    async fn bad_credentials_re_render_the_form() {
        let mut repo = MockJournalRepo::new();
        repo.expect_find_user_by_username().returning(|_| Ok(None));
        let app = app!(state(repo, MockCredentialProvider::new()));

        let request = test::TestRequest::post()
            .uri("/log_in/")
            .set_form([("username", "@nobody"), ("password", "x")])
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = test::read_body(response).await;
        assert!(String::from_utf8_lossy(&body).contains("The credentials provided were invalid!"));
    }

    #[actix_web::test]
    async fn someone_elses_entry_redirects_to_journal_list() {
        let me = user("@jane");
        let other = user("@john");
        let theirs = journal(&other);
        let entry = Entry {
            id: Uuid::new_v4(),
            journal_id: theirs.id,
            name: "Private".into(),
            created_on: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            responses: vec![],
            mood: None,
            attachment: None,
        };

        let mut repo = MockJournalRepo::new();
        let found = me.clone();
        repo.expect_find_user_by_username().returning(move |_| Ok(Some(found.clone())));
        repo.expect_save_user().returning(|_| Ok(()));
        let current = me.clone();
        repo.expect_get_user().returning(move |_| Ok(Some(current.clone())));
        let stored_entry = entry.clone();
        repo.expect_get_entry().returning(move |_| Ok(Some(stored_entry.clone())));
        let stored_journal = theirs.clone();
        repo.expect_get_journal().returning(move |_| Ok(Some(stored_journal.clone())));

        let mut credentials = MockCredentialProvider::new();
        credentials.expect_verify_password().returning(|_, _| true);

        let app = app!(state(repo, credentials));
        let cookie = log_in_cookie!(&app, "@jane");

        let uri = format!("/journals/{}/entries/{}/view", theirs.id, entry.id);
        let request = test::TestRequest::get().uri(&uri).cookie(cookie).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/journals/");
    }

    #[actix_web::test]
    async fn entry_under_the_wrong_journal_is_not_found() {
        let me = user("@jane");
        let mine = journal(&me);
        let entry = Entry {
            id: Uuid::new_v4(),
            journal_id: mine.id,
            name: "Day one".into(),
            created_on: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            responses: vec![],
            mood: None,
            attachment: None,
        };

        let mut repo = MockJournalRepo::new();
        let found = me.clone();
        repo.expect_find_user_by_username().returning(move |_| Ok(Some(found.clone())));
        repo.expect_save_user().returning(|_| Ok(()));
        let current = me.clone();
        repo.expect_get_user().returning(move |_| Ok(Some(current.clone())));
        let stored_entry = entry.clone();
        repo.expect_get_entry().returning(move |_| Ok(Some(stored_entry.clone())));
        let stored_journal = mine.clone();
        repo.expect_get_journal().returning(move |_| Ok(Some(stored_journal.clone())));

        let mut credentials = MockCredentialProvider::new();
        credentials.expect_verify_password().returning(|_, _| true);

        let app = app!(state(repo, credentials));
        let cookie = log_in_cookie!(&app, "@jane");

        let uri = format!("/journals/{}/entries/{}/view", Uuid::new_v4(), entry.id);
        let request = test::TestRequest::get().uri(&uri).cookie(cookie).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn second_entry_today_flashes_and_returns_to_journal() {
        let me = user("@jane");
        let mine = journal(&me);
        let today_entry = Entry {
            id: Uuid::new_v4(),
            journal_id: mine.id,
            name: "New Entry #0".into(),
            created_on: Utc::now().date_naive(),
            responses: vec![],
            mood: None,
            attachment: None,
        };

        let mut repo = MockJournalRepo::new();
        let found = me.clone();
        repo.expect_find_user_by_username().returning(move |_| Ok(Some(found.clone())));
        repo.expect_save_user().returning(|_| Ok(()));
        let current = me.clone();
        repo.expect_get_user().returning(move |_| Ok(Some(current.clone())));
        let stored_journal = mine.clone();
        repo.expect_get_journal().returning(move |_| Ok(Some(stored_journal.clone())));
        repo.expect_list_entries().returning(move |_| Ok(vec![today_entry.clone()]));
        repo.expect_create_entry().never();

        let mut credentials = MockCredentialProvider::new();
        credentials.expect_verify_password().returning(|_, _| true);

        let app = app!(state(repo, credentials));
        let cookie = log_in_cookie!(&app, "@jane");

        let uri = format!("/journals/{}/create_entry", mine.id);
        let request = test::TestRequest::post().uri(&uri).cookie(cookie).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/journals/{}/entries", mine.id));
    }

    #[actix_web::test]
    async fn over_long_journal_search_is_unprocessable_with_a_message() {
        let me = user("@jane");
        let mine = journal(&me);
        let mut repo = signed_in_repo(&me);
        repo.expect_list_journals().returning(move |_| Ok(vec![mine.clone()]));
        repo.expect_list_templates().returning(|_| Ok(vec![]));

        let app = app!(state(repo, accepting_credentials()));
        let cookie = log_in_cookie!(&app, "@jane");

        let uri = format!("/journals/?search={}", "x".repeat(51));
        let request = test::TestRequest::get().uri(&uri).cookie(cookie).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = String::from_utf8_lossy(&test::read_body(response).await).into_owned();
        assert!(body.contains("Ensure this value has at most 50 characters."));
        assert!(body.contains("Gratitude"));
    }

    #[actix_web::test]
    async fn journal_export_is_named_after_its_entries() {
        let me = user("@jane");
        let mine = journal(&me);
        let template = Template {
            id: mine.template_id,
            name: "Daily".into(),
            owner_id: Some(me.id),
            questions: vec!["How was today?".into()],
        };
        let mut repo = signed_in_repo(&me);
        let stored_journal = mine.clone();
        repo.expect_get_journal().returning(move |_| Ok(Some(stored_journal.clone())));
        repo.expect_get_template().returning(move |_| Ok(Some(template.clone())));
        repo.expect_list_entries().returning(|_| Ok(vec![]));
        let mut renderer = MockDocumentRenderer::new();
        renderer.expect_render().times(1).returning(|_| Ok(b"%PDF-1.7".to_vec()));

        let app = app!(state_with_renderer(repo, accepting_credentials(), renderer));
        let cookie = log_in_cookie!(&app, "@jane");

        let uri = format!("/journals/{}/download_journal_pdf", mine.id);
        let request = test::TestRequest::get().uri(&uri).cookie(cookie).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert_eq!(disposition, format!("attachment; filename=\"journal_{}_entries.pdf\"", mine.id));
    }

    #[actix_web::test]
    async fn profile_update_with_a_taken_email_re_renders() {
        let me = user("@jane");
        let other = user("@john");
        let mut repo = signed_in_repo(&me);
        repo.expect_find_user_by_email().returning(move |_| Ok(Some(other.clone())));

        let app = app!(state(repo, accepting_credentials()));
        let cookie = log_in_cookie!(&app, "@jane");

        let request = test::TestRequest::post()
            .uri("/profile/")
            .cookie(cookie)
            .set_form([
                ("first_name", "Jane"),
                ("last_name", "Doe"),
                ("username", "@jane"),
                ("email", "john@example.org"),
            ])
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = String::from_utf8_lossy(&test::read_body(response).await).into_owned();
        assert!(body.contains("User with this Email already exists."));
    }

    #[actix_web::test]
    async fn password_change_returns_to_the_dashboard() {
        let me = user("@jane");
        let repo = signed_in_repo(&me);
        let mut credentials = accepting_credentials();
        credentials.expect_hash_password().times(1).returning(|_| Ok("rehashed".into()));

        let app = app!(state(repo, credentials));
        let cookie = log_in_cookie!(&app, "@jane");

        let request = test::TestRequest::post()
            .uri("/password/")
            .cookie(cookie)
            .set_form([
                ("password", "Secret123"),
                ("new_password", "Secret456"),
                ("password_confirmation", "Secret456"),
            ])
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard/");
    }

    #[actix_web::test]
    async fn anonymous_profile_page_redirects_to_log_in() {
        let app = app!(state(MockJournalRepo::new(), MockCredentialProvider::new()));
        let response = test::call_service(&app, test::TestRequest::get().uri("/profile/").to_request()).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/log_in/?next=%2Fprofile%2F");
    }
}
