//! Default template seed document.
//!
//! A JSON array of `{"template_name": ..., "questions": [...]}` objects. The
//! server reads it at startup; the `create-template` command prepends to it.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTemplate {
    pub template_name: String,
    pub questions: Vec<String>,
}

pub fn load(path: &Path) -> anyhow::Result<Vec<SeedTemplate>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Puts `template` first in the document at `path`, keeping the rest.
pub fn prepend(path: &Path, template: SeedTemplate) -> anyhow::Result<Vec<SeedTemplate>> {
    let mut templates = vec![template];
    templates.extend(load(path)?);
    let body = serde_json::to_string_pretty(&templates)?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(templates)
}
