//! Clinical history records.

use cliniq_uuid::RecordId;

/// A clinical history entry: a named, opaque file attachment tied loosely
/// to a professional and a patient.
///
/// Both references are weak; deleting either party clears the reference and
/// keeps the history record. The attachment is stored by reference only —
/// upload and retrieval of the file content happen outside the core.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClinicalHistory {
    pub id: RecordId,
    pub name: String,
    /// Opaque reference to the attached file, if any.
    pub file: Option<String>,
    pub professional: Option<RecordId>,
    pub patient: Option<RecordId>,
}

impl ClinicalHistory {
    pub fn new(
        name: impl Into<String>,
        file: Option<String>,
        professional: Option<RecordId>,
        patient: Option<RecordId>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            name: name.into(),
            file,
            professional,
            patient,
        }
    }
}
