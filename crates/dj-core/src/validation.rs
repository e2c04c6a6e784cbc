//! Field rules for user input. Each check appends to a [`FieldErrors`] so a
//! form reports every problem at once.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FieldErrors;

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_USERNAME_LEN: usize = 30;
pub const MAX_SEARCH_LEN: usize = 50;

/// Extensions accepted for entry attachments, lowercase with the dot.
pub const ATTACHMENT_EXTENSIONS: [&str; 11] = [
    ".jpg", ".jpeg", ".png", ".gif", ".mp3", ".wav", ".mp4", ".avi", ".pdf", ".doc", ".docx",
];

static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@\w{3,}$").expect("valid username regex"));

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub fn username(errors: &mut FieldErrors, value: &str) {
    if value.chars().count() > MAX_USERNAME_LEN {
        errors.add("username", format!("Ensure this value has at most {MAX_USERNAME_LEN} characters."));
    } else if !USERNAME.is_match(value) {
        errors.add("username", "Username must consist of @ followed by at least three alphanumericals");
    }
}

pub fn email(errors: &mut FieldErrors, value: &str) {
    if !EMAIL.is_match(value) {
        errors.add("email", "Enter a valid email address.");
    }
}

/// A required name of at most [`MAX_NAME_LEN`] characters after trimming.
pub fn name(errors: &mut FieldErrors, field: &str, value: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "This field is required.");
    } else if trimmed.chars().count() > MAX_NAME_LEN {
        errors.add(field, format!("Ensure this value has at most {MAX_NAME_LEN} characters."));
    }
}

pub fn new_password(errors: &mut FieldErrors, password: &str, confirmation: &str) {
    let upper = password.chars().any(|c| c.is_uppercase());
    let lower = password.chars().any(|c| c.is_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if !(upper && lower && digit) {
        errors.add(
            "new_password",
            "Password must contain an uppercase character, a lowercase character and a number",
        );
    }
    if password != confirmation {
        errors.add("password_confirmation", "Confirmation does not match password.");
    }
}

/// Splits a block of text into questions, one per line, dropping blanks.
pub fn questions(errors: &mut FieldErrors, raw: &str) -> Vec<String> {
    let questions = clean_questions(raw.lines());
    if questions.is_empty() {
        errors.add("questions", "This field is required.");
    }
    questions
}

pub fn clean_questions<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    raw.into_iter()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn search(errors: &mut FieldErrors, value: &str) {
    if value.chars().count() > MAX_SEARCH_LEN {
        errors.add("search", format!("Ensure this value has at most {MAX_SEARCH_LEN} characters."));
    }
}

/// Lowercased extension with its leading dot, if the file name has one.
pub fn extension(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rfind('.')
        .filter(|index| *index > 0)
        .map(|index| base[index..].to_ascii_lowercase())
}

pub fn attachment(errors: &mut FieldErrors, file_name: &str) {
    let supported = extension(file_name)
        .map(|ext| ATTACHMENT_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    if !supported {
        errors.add("multimedia_file", "Unsupported file extension.");
    }
}

/// Lowercase ASCII slug: runs of anything but letters and digits become `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
