//! # API Shared
//!
//! Shared request/response definitions for the Cliniq web layer.
//!
//! Contains:
//! - JSON DTOs (`dto` module) with serde + OpenAPI schema derives
//! - Shared services like `HealthService`
//!
//! The web layer converts between these DTOs and `cliniq-core` types at the
//! boundary; core types never leak raw into HTTP responses.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
