//! # dj-ui
//!
//! Askama page templates. Every page extends `base.html`, which reads
//! `nav_user` and `flash` for the navigation bar and the one-shot message.

use askama::Template;
use dj_core::error::FieldErrors;
use dj_core::models::{Journal, Mood, Template as QuestionTemplate};
use dj_core::services::accounts::Dashboard;
use dj_core::services::journals::{EntryView, JournalPage};

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "log_in.html")]
pub struct LogInTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub username: &'a str,
    /// Where to go after a successful log-in.
    pub next: &'a str,
    pub error: Option<&'a str>,
}

/// Values echoed back into the sign-up and profile forms. Passwords never are.
#[derive(Debug, Clone, Default)]
pub struct SignUpValues {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}

#[derive(Template)]
#[template(path = "sign_up.html")]
pub struct SignUpTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub values: &'a SignUpValues,
    pub errors: &'a FieldErrors,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub values: &'a SignUpValues,
    pub errors: &'a FieldErrors,
}

#[derive(Template)]
#[template(path = "password.html")]
pub struct PasswordTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub errors: &'a FieldErrors,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub dashboard: &'a Dashboard,
}

#[derive(Template)]
#[template(path = "journals.html")]
pub struct JournalsTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub journals: &'a [Journal],
    pub templates: &'a [QuestionTemplate],
    pub search: &'a str,
    pub journal_name: &'a str,
    pub errors: &'a FieldErrors,
}

#[derive(Template)]
#[template(path = "custom_template.html")]
pub struct CustomTemplateTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub journal_name: &'a str,
    pub template_name: &'a str,
    pub questions: &'a str,
    pub errors: &'a FieldErrors,
}

#[derive(Template)]
#[template(path = "journal_entries.html")]
pub struct JournalEntriesTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub page: &'a JournalPage,
    pub search: &'a str,
    pub errors: &'a FieldErrors,
}

/// One `<option>` of the mood picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// The empty choice first, then every mood in declaration order.
pub fn mood_options(current: Option<Mood>) -> Vec<MoodOption> {
    let mut options = vec![MoodOption {
        value: "",
        label: "---------",
        selected: current.is_none(),
    }];
    options.extend(Mood::ALL.into_iter().map(|mood| MoodOption {
        value: mood.as_str(),
        label: mood.label(),
        selected: current == Some(mood),
    }));
    options
}

#[derive(Template)]
#[template(path = "edit_entry.html")]
pub struct EditEntryTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub journal: &'a Journal,
    pub view: &'a EntryView,
    pub moods: Vec<MoodOption>,
    pub errors: &'a FieldErrors,
}

#[derive(Template)]
#[template(path = "view_entry.html")]
pub struct ViewEntryTemplate<'a> {
    pub nav_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub journal: &'a Journal,
    pub view: &'a EntryView,
    pub show_image: bool,
}
