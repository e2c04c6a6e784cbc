//! # Search
//!
//! Case-insensitive "name contains" filtering over one entity kind, optionally
//! restricted to rows whose relation equals a given id.
//!
//! The kind, the text field and the relation are fixed by the call site, so
//! getting them wrong is a [`AppError::Configuration`], not a validation error.
//! Only the search text comes from the user.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{AppError, FieldErrors, Result};
use crate::models::{Entry, Journal, Template};
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Journal,
    Entry,
    Template,
}

impl EntityKind {
    fn text_fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Journal | EntityKind::Template => &["name"],
            EntityKind::Entry => &["name", "mood"],
        }
    }

    fn relations(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Journal => &["owner", "template"],
            EntityKind::Entry => &["journal"],
            EntityKind::Template => &["owner"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Journal => "journal",
            EntityKind::Entry => "entry",
            EntityKind::Template => "template",
        })
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "journal" => Ok(EntityKind::Journal),
            "entry" => Ok(EntityKind::Entry),
            "template" => Ok(EntityKind::Template),
            other => Err(AppError::Configuration(format!("invalid entity kind provided: {other:?}"))),
        }
    }
}

/// An entity the search filter can look into.
pub trait Searchable {
    const KIND: EntityKind;

    fn text_field(&self, field: &str) -> Option<&str>;
    fn relation(&self, field: &str) -> Option<Uuid>;
}

impl Searchable for Journal {
    const KIND: EntityKind = EntityKind::Journal;

    fn text_field(&self, field: &str) -> Option<&str> {
        (field == "name").then_some(self.name.as_str())
    }

    fn relation(&self, field: &str) -> Option<Uuid> {
        match field {
            "owner" => self.owner_id,
            "template" => Some(self.template_id),
            _ => None,
        }
    }
}

impl Searchable for Entry {
    const KIND: EntityKind = EntityKind::Entry;

    fn text_field(&self, field: &str) -> Option<&str> {
        match field {
            "name" => Some(self.name.as_str()),
            "mood" => self.mood.as_ref().map(|m| m.as_str()),
            _ => None,
        }
    }

    fn relation(&self, field: &str) -> Option<Uuid> {
        (field == "journal").then_some(self.journal_id)
    }
}

impl Searchable for Template {
    const KIND: EntityKind = EntityKind::Template;

    fn text_field(&self, field: &str) -> Option<&str> {
        (field == "name").then_some(self.name.as_str())
    }

    fn relation(&self, field: &str) -> Option<Uuid> {
        (field == "owner").then_some(self.owner_id).flatten()
    }
}

/// A validated "name contains" filter for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    kind: EntityKind,
    name_field: &'static str,
    scope: Option<(&'static str, Uuid)>,
}

impl SearchFilter {
    /// Fails with a configuration error when `kind` is unknown or `name_field`
    /// is missing or not a text field of that kind.
    pub fn new(kind: &str, name_field: &str) -> Result<Self> {
        let kind: EntityKind = kind.parse()?;
        if name_field.is_empty() {
            return Err(AppError::Configuration("no name field provided".into()));
        }
        let name_field = kind
            .text_fields()
            .iter()
            .copied()
            .find(|field| *field == name_field)
            .ok_or_else(|| AppError::Configuration(format!("{kind} has no text field {name_field:?}")))?;
        Ok(Self {
            kind,
            name_field,
            scope: None,
        })
    }

    /// Restricts matches to rows whose `relation` equals `value`.
    pub fn scoped(mut self, relation: &str, value: Uuid) -> Result<Self> {
        let relation = self
            .kind
            .relations()
            .iter()
            .copied()
            .find(|field| *field == relation)
            .ok_or_else(|| AppError::Configuration(format!("{} has no relation {relation:?}", self.kind)))?;
        self.scope = Some((relation, value));
        Ok(self)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Keeps the items matching `needle`. A blank needle keeps everything in
    /// scope.
    pub fn apply<T: Searchable>(&self, items: impl IntoIterator<Item = T>, needle: &str) -> Result<Vec<T>> {
        if T::KIND != self.kind {
            return Err(AppError::Configuration(format!(
                "filter built for {} applied to {}",
                self.kind,
                T::KIND
            )));
        }

        let mut errors = FieldErrors::default();
        validation::search(&mut errors, needle);
        errors.into_result()?;

        let needle = needle.trim().to_lowercase();
        Ok(items.into_iter().filter(|item| self.matches(item, &needle)).collect())
    }

    fn matches<T: Searchable>(&self, item: &T, needle_lower: &str) -> bool {
        if let Some((relation, value)) = self.scope {
            if item.relation(relation) != Some(value) {
                return false;
            }
        }
        if needle_lower.is_empty() {
            return true;
        }
        item.text_field(self.name_field)
            .map(|text| text.to_lowercase().contains(needle_lower))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(journal_id: Uuid, name: &str) -> Entry {
        Entry {
            id: Uuid::new_v4(),
            journal_id,
            name: name.into(),
            created_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            responses: vec![],
            mood: None,
            attachment: None,
        }
    }

    #[test]
    fn rejects_unknown_kind_and_missing_field() {
        assert!(matches!(SearchFilter::new("notes", "name"), Err(AppError::Configuration(_))));
        assert!(matches!(SearchFilter::new("entry", ""), Err(AppError::Configuration(_))));
        assert!(matches!(SearchFilter::new("entry", "body"), Err(AppError::Configuration(_))));
        assert!(matches!(
            SearchFilter::new("entry", "name").unwrap().scoped("owner", Uuid::new_v4()),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn filter_applied_to_the_wrong_kind_is_a_configuration_error() {
        let filter = SearchFilter::new("journal", "name").unwrap();
        let result = filter.apply(vec![entry(Uuid::new_v4(), "x")], "x");
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn case_insensitive_contains_within_scope() {
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();
        let entries = vec![
            entry(mine, "Morning Pages"),
            entry(mine, "evening reflection"),
            entry(mine, "MORNING run"),
            entry(other, "morning elsewhere"),
        ];
        let filter = SearchFilter::new("entry", "name").unwrap().scoped("journal", mine).unwrap();
        let names: Vec<String> = filter
            .apply(entries, "morning")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Morning Pages", "MORNING run"]);
    }

    #[test]
    fn blank_search_returns_whole_scope() {
        let mine = Uuid::new_v4();
        let entries = vec![entry(mine, "a"), entry(mine, "b"), entry(Uuid::new_v4(), "c")];
        let filter = SearchFilter::new("entry", "name").unwrap().scoped("journal", mine).unwrap();
        assert_eq!(filter.apply(entries.clone(), "").unwrap().len(), 2);
        assert_eq!(filter.apply(entries, "   ").unwrap().len(), 2);
    }

    #[test]
    fn unscoped_filter_searches_everything() {
        let entries = vec![entry(Uuid::new_v4(), "Alpha"), entry(Uuid::new_v4(), "beta")];
        let filter = SearchFilter::new("entry", "name").unwrap();
        assert_eq!(filter.apply(entries, "A").unwrap().len(), 2);
    }

    #[test]
    fn overlong_search_is_a_validation_error() {
        let filter = SearchFilter::new("entry", "name").unwrap();
        let result = filter.apply(Vec::<Entry>::new(), &"x".repeat(51));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
