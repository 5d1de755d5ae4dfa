//! User records and role-based permissions.
//!
//! A user is a single flat record with a role-tagged profile rather than a
//! class hierarchy: the `profile` field selects the professional, staff, or
//! patient variant and carries the fields specific to that role. Storage
//! stays flat and there is no dispatch beyond a `match`.

use chrono::NaiveDate;
use cliniq_types::{NonEmptyText, SocialSecNumber};
use cliniq_uuid::RecordId;

/// Role discriminant for a [`User`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Professional,
    Staff,
    Patient,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Professional => "professional",
            Role::Staff => "staff",
            Role::Patient => "patient",
        };
        write!(f, "{}", name)
    }
}

/// Role-specific fields of a user record.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoleProfile {
    /// A clinician. Owns calendar events through calendar links.
    Professional {
        /// Professional title or licence, e.g. "Cardiologist".
        title: String,
    },
    /// A doctor's assistant. May manage bookings but owns no calendar.
    Staff {},
    /// A patient.
    Patient {
        /// Unique across all patients; uniqueness is enforced by the store.
        social_sec_number: SocialSecNumber,
        /// Weak reference to the professional in charge. Association only;
        /// deleting that professional cascades deletion of this patient.
        prof_in_charge: Option<RecordId>,
    },
}

/// Actions a user can be allowed to perform.
///
/// Replaces the historical always-true admin stub with explicit checks the
/// web layer consults before invoking core operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    CreateBooking,
    CancelBooking,
    ManageUsers,
    ViewCalendar,
}

/// A clinic user: professional, staff member, or patient.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: RecordId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub is_active: bool,
    #[serde(flatten)]
    pub profile: RoleProfile,
}

impl User {
    fn new(
        email: NonEmptyText,
        first_name: String,
        last_name: String,
        date_of_birth: Option<NaiveDate>,
        profile: RoleProfile,
    ) -> Self {
        Self {
            id: RecordId::new(),
            email: email.as_str().to_owned(),
            first_name,
            last_name,
            date_of_birth,
            is_active: true,
            profile,
        }
    }

    /// Creates an active professional record.
    pub fn new_professional(
        email: NonEmptyText,
        first_name: String,
        last_name: String,
        date_of_birth: Option<NaiveDate>,
        title: NonEmptyText,
    ) -> Self {
        Self::new(
            email,
            first_name,
            last_name,
            date_of_birth,
            RoleProfile::Professional {
                title: title.as_str().to_owned(),
            },
        )
    }

    /// Creates an active staff record.
    pub fn new_staff(
        email: NonEmptyText,
        first_name: String,
        last_name: String,
        date_of_birth: Option<NaiveDate>,
    ) -> Self {
        Self::new(email, first_name, last_name, date_of_birth, RoleProfile::Staff {})
    }

    /// Creates an active patient record.
    pub fn new_patient(
        email: NonEmptyText,
        first_name: String,
        last_name: String,
        date_of_birth: Option<NaiveDate>,
        social_sec_number: SocialSecNumber,
        prof_in_charge: Option<RecordId>,
    ) -> Self {
        Self::new(
            email,
            first_name,
            last_name,
            date_of_birth,
            RoleProfile::Patient {
                social_sec_number,
                prof_in_charge,
            },
        )
    }

    /// The role discriminant for this user's profile.
    pub fn role(&self) -> Role {
        match self.profile {
            RoleProfile::Professional { .. } => Role::Professional,
            RoleProfile::Staff {} => Role::Staff,
            RoleProfile::Patient { .. } => Role::Patient,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Soft-deactivates this user. Deactivated professionals stop taking
    /// bookings but their records and links remain intact.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Whether this user may perform `permission`.
    ///
    /// A deactivated user holds no permissions at all. Professionals hold
    /// every permission, staff everything except user management, patients
    /// may only view calendars (they request bookings through staff).
    pub fn has_permission(&self, permission: Permission) -> bool {
        if !self.is_active {
            return false;
        }
        match self.role() {
            Role::Professional => true,
            Role::Staff => permission != Permission::ManageUsers,
            Role::Patient => permission == Permission::ViewCalendar,
        }
    }
}
