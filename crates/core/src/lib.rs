//! # Cliniq Core
//!
//! Core business logic for the Cliniq clinic-management system.
//!
//! This crate contains pure data operations and booking validation:
//! - User records with role-tagged profiles (professional, staff, patient)
//!   and explicit permission checks
//! - Calendar events with once-only slugs and interval validation
//! - The overlap-validated booking pipeline with per-professional
//!   serialisation of check-and-persist
//! - A sharded-JSON entity store enforcing referential integrity
//!
//! **No API concerns**: authentication, HTTP servers, and response shaping
//! belong in the web layer (`cliniq-run` and `api-shared`).

pub mod booking;
pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod history;
pub mod overlap;
pub mod store;
pub mod user;

pub use booking::{BookedEvent, BookingRequest, BookingService};
pub use calendar::Calendar;
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult, EntityKind};
pub use event::{slugify, CalendarEvent};
pub use history::ClinicalHistory;
pub use overlap::overlaps;
pub use store::EntityStore;
pub use user::{Permission, Role, RoleProfile, User};

pub use cliniq_types::{NonEmptyText, SocialSecNumber};
pub use cliniq_uuid::RecordId;
