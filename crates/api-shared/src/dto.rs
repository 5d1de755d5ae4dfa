//! JSON request and response bodies for the REST API.

use chrono::{DateTime, NaiveDate, Utc};
use cliniq_core::{BookedEvent, CalendarEvent, User};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Role-specific fields of a signup request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum SignupRole {
    Professional {
        title: String,
    },
    Staff {},
    Patient {
        social_sec_number: i64,
        /// Canonical id of the professional in charge, if any.
        prof_in_charge: Option<String>,
    },
}

/// Signup request for any user role.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupReq {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(flatten)]
    pub role: SignupRole,
}

/// A user as rendered to API clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRes {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
}

impl From<&User> for UserRes {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role().to_string(),
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListUsersRes {
    pub users: Vec<UserRes>,
}

/// A proposed booking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingReq {
    /// Canonical id of the professional taking the appointment.
    pub professional_id: String,
    /// Canonical id of the patient being seen.
    pub patient_id: String,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

/// A committed booking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingRes {
    pub event_id: String,
    pub calendar_id: String,
    pub slug: String,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&BookedEvent> for BookingRes {
    fn from(booked: &BookedEvent) -> Self {
        Self {
            event_id: booked.event.id.to_string(),
            calendar_id: booked.calendar_id.to_string(),
            slug: booked.event.slug().to_owned(),
            name: booked.event.name.clone(),
            start_time: booked.event.start_time,
            end_time: booked.event.end_time,
        }
    }
}

/// A calendar event as rendered to API clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventRes {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub description: String,
}

impl From<&CalendarEvent> for EventRes {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            id: event.id.to_string(),
            name: event.name.clone(),
            slug: event.slug().to_owned(),
            start_time: event.start_time,
            end_time: event.end_time,
            description: event.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListEventsRes {
    pub events: Vec<EventRes>,
}

/// Structured error payload: a stable machine-readable kind plus a
/// human-readable detail message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub kind: String,
    pub detail: String,
}

impl ErrorRes {
    pub fn from_core(err: &cliniq_core::CoreError) -> Self {
        Self {
            kind: err.kind().to_owned(),
            detail: err.to_string(),
        }
    }
}
