use chrono::{DateTime, Utc};
use cliniq_uuid::RecordId;

/// The kinds of entity the store manages, used in `NotFound` reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Professional,
    Patient,
    CalendarEvent,
    Calendar,
    ClinicalHistory,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Professional => "professional",
            EntityKind::Patient => "patient",
            EntityKind::CalendarEvent => "calendar event",
            EntityKind::Calendar => "calendar",
            EntityKind::ClinicalHistory => "clinical history",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("ending time must be after the starting time")]
    InvalidInterval,
    #[error("there is an overlap with another event: {name}, {start}-{end}")]
    Overlap {
        event_id: RecordId,
        name: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("{what} not found: {id}")]
    NotFound { what: EntityKind, id: RecordId },
    #[error("duplicate {0}")]
    DuplicateKey(String),
    #[error("event {event_id} is already linked to professional {professional_id}")]
    DuplicateLink {
        event_id: RecordId,
        professional_id: RecordId,
    },
    #[error("professional {0} is deactivated and cannot take bookings")]
    InactiveProfessional(RecordId),
    #[error("invalid value: {0}")]
    InvalidValue(#[from] cliniq_types::ValueError),
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] cliniq_uuid::IdError),
    #[error("failed to create storage directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete record: {0}")]
    FileDelete(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error(
        "save failed and cleanup also failed (path: {path}): save={save_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterSaveFailed {
        path: std::path::PathBuf,
        #[source]
        save_error: Box<CoreError>,
        cleanup_error: std::io::Error,
    },
}

impl CoreError {
    /// Stable machine-readable name for the error, used by the web layer to
    /// build `{kind, detail}` payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "invalid_input",
            CoreError::InvalidInterval => "invalid_interval",
            CoreError::Overlap { .. } => "overlap",
            CoreError::NotFound { .. } => "not_found",
            CoreError::DuplicateKey(_) => "duplicate_key",
            CoreError::DuplicateLink { .. } => "duplicate_link",
            CoreError::InactiveProfessional(_) => "inactive_professional",
            CoreError::InvalidValue(_) => "invalid_input",
            CoreError::InvalidId(_) => "invalid_input",
            CoreError::DirCreation(_)
            | CoreError::FileWrite(_)
            | CoreError::FileRead(_)
            | CoreError::FileDelete(_)
            | CoreError::Serialization(_)
            | CoreError::Deserialization(_)
            | CoreError::CleanupAfterSaveFailed { .. } => "storage",
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
