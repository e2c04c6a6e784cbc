//! Structured document model handed to a [`DocumentRenderer`](crate::traits::DocumentRenderer).
//!
//! The core decides *what* goes in an export and in which order; the renderer
//! decides how it looks.

use std::path::PathBuf;

use serde::Serialize;

use crate::models::{Entry, Journal, Template};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentBlock {
    /// Large bold title line.
    Heading(String),
    /// A line of body text such as `Date: 2024-01-01`.
    Text(String),
    /// Vertical gap in points.
    Spacer(f32),
    /// Grid with a highlighted header row.
    Table { header: Vec<String>, rows: Vec<Vec<String>> },
    /// A picture read from disk, scaled into the given box (points).
    Image { path: PathBuf, width: f32, height: f32 },
}

/// Edge length of the square box attachments are scaled into.
pub const IMAGE_BOX: f32 = 300.0;

/// Gap inserted after each entry in a journal export.
pub const ENTRY_SEPARATOR: f32 = 24.0;

/// Blocks describing one entry.
///
/// `attachment_path` resolves a stored attachment name to a file on disk; it
/// is only consulted when the attachment is an image.
pub fn entry_blocks(entry: &Entry, template: &Template, attachment_path: impl Fn(&str) -> PathBuf) -> Vec<DocumentBlock> {
    let mood = entry.mood.map(|m| m.as_str().to_string()).unwrap_or_else(|| "None".into());
    let mut blocks = vec![
        DocumentBlock::Heading(entry.name.clone()),
        DocumentBlock::Spacer(6.0),
        DocumentBlock::Text(format!("Date: {}", entry.created_on.format("%Y-%m-%d"))),
        DocumentBlock::Spacer(6.0),
        DocumentBlock::Text(format!("Mood: {mood}")),
        DocumentBlock::Spacer(12.0),
        DocumentBlock::Table {
            header: vec!["Question".into(), "Response".into()],
            rows: entry
                .answers(template)
                .into_iter()
                .map(|pair| vec![pair.question, pair.response])
                .collect(),
        },
    ];

    if let Some(name) = entry.attachment.as_deref().filter(|_| entry.has_image_attachment()) {
        blocks.push(DocumentBlock::Spacer(20.0));
        blocks.push(DocumentBlock::Image {
            path: attachment_path(name),
            width: IMAGE_BOX,
            height: IMAGE_BOX,
        });
        blocks.push(DocumentBlock::Spacer(20.0));
    }
    blocks
}

/// Blocks for a whole journal: its title, then every entry in the given order.
pub fn journal_blocks(
    journal: &Journal,
    template: &Template,
    entries: &[Entry],
    attachment_path: impl Fn(&str) -> PathBuf,
) -> Vec<DocumentBlock> {
    let mut blocks = vec![DocumentBlock::Text(journal.name.clone()), DocumentBlock::Spacer(12.0)];
    for entry in entries {
        blocks.extend(entry_blocks(entry, template, &attachment_path));
        blocks.push(DocumentBlock::Spacer(ENTRY_SEPARATOR));
    }
    blocks
}
