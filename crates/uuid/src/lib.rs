//! Record identifiers and sharded-path utilities.
//!
//! Cliniq stores every entity under a sharded directory derived from its
//! identifier. To keep path derivation deterministic, identifiers use a
//! *canonical* representation: **32 lowercase hexadecimal characters** (no
//! hyphens), the same value `Uuid::new_v4().simple()` produces.
//!
//! For a canonical identifier `u`, records live under
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`, for example
//! `clinic_data/events/55/0e/550e8400e29b41d4a716446655440000/`.
//! Two-level sharding bounds per-directory fan-out so a clinic with many
//! thousands of records does not degrade filesystem performance.
//!
//! Externally supplied identifiers (API path segments, request bodies) must
//! already be canonical; use [`RecordId::parse`] to validate them.

mod service;

pub use service::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
