//! Calendar links.
//!
//! A calendar link binds one event to one professional and one patient.
//! The link exclusively owns the association: deleting the event deletes
//! the link, while deleting the professional or patient only clears the
//! corresponding reference and leaves the link queryable.

use cliniq_uuid::RecordId;

/// A booking: the association of one event with one professional and one
/// patient.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Calendar {
    pub id: RecordId,
    /// The linked event. Required at creation; the link dies with the event.
    pub event: RecordId,
    /// Cleared (not cascaded) when the professional is deleted.
    pub professional: Option<RecordId>,
    /// Cleared (not cascaded) when the patient is deleted.
    pub patient: Option<RecordId>,
}

impl Calendar {
    /// Creates a link binding `event` to a professional and a patient.
    ///
    /// Cardinality (one event never linked to two different professionals)
    /// is enforced by the entity store at save time, which can see the
    /// other persisted links.
    pub fn new(event: RecordId, professional: RecordId, patient: RecordId) -> Self {
        Self {
            id: RecordId::new(),
            event,
            professional: Some(professional),
            patient: Some(patient),
        }
    }
}
