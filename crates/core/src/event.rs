//! Calendar events.
//!
//! An event carries its own time interval plus a URL-safe slug derived from
//! the name exactly once, at creation. Renaming an event later never
//! regenerates the slug, so external references stay stable.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use cliniq_types::NonEmptyText;
use cliniq_uuid::RecordId;

/// A scheduled appointment slot.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalendarEvent {
    pub id: RecordId,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub description: String,
    slug: String,
}

impl CalendarEvent {
    /// Creates a new event, deriving the slug from `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInterval`] if `end_time <= start_time`.
    pub fn new(
        name: NonEmptyText,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        description: impl Into<String>,
    ) -> CoreResult<Self> {
        Self::validate_interval(start_time, end_time)?;
        let name = name.as_str().to_owned();
        let slug = slugify(&name);
        Ok(Self {
            id: RecordId::new(),
            name,
            start_time,
            end_time,
            description: description.into(),
            slug,
        })
    }

    /// Rejects intervals where the end does not come strictly after the start.
    pub fn validate_interval(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> CoreResult<()> {
        if end_time <= start_time {
            return Err(CoreError::InvalidInterval);
        }
        Ok(())
    }

    /// The slug derived from the name at creation. Immutable after first save.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Changes the display name. The slug is left untouched.
    pub fn rename(&mut self, name: NonEmptyText) {
        self.name = name.as_str().to_owned();
    }

    /// Relative URL for this event, e.g. `/calendar/check-up`.
    pub fn url_path(&self) -> String {
        format!("/calendar/{}", self.slug)
    }
}

/// Derives a URL-safe slug from a display name: lowercase ASCII
/// alphanumerics with runs of everything else collapsed to single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}
