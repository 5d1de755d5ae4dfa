//! Booking validation pipeline.
//!
//! A booking request moves `Proposed -> Validating -> {Persisted | Rejected}`.
//! Validation short-circuits on the first failure:
//!
//! 1. resolve the professional and patient (wrong role counts as missing);
//! 2. reject a deactivated professional;
//! 3. reject `end_time <= start_time`;
//! 4. under the professional's booking lock, load that professional's
//!    persisted events and check each for overlap;
//! 5. persist the event, then create the calendar link.
//!
//! The per-professional lock is held across steps 4-5 so a concurrent
//! request for the same professional cannot read a stale calendar and
//! double-book the slot. Requests for different professionals never
//! contend. A failure after the event was persisted rolls the event back,
//! so no partially-booked state is ever observable.

use crate::calendar::Calendar;
use crate::error::{CoreError, CoreResult, EntityKind};
use crate::event::CalendarEvent;
use crate::overlap::overlaps;
use crate::store::EntityStore;
use crate::user::Role;
use chrono::{DateTime, Utc};
use cliniq_types::NonEmptyText;
use cliniq_uuid::RecordId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A proposed booking as submitted by the web layer.
#[derive(Clone, Debug)]
pub struct BookingRequest {
    pub professional_id: RecordId,
    pub patient_id: RecordId,
    pub name: NonEmptyText,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub description: String,
}

/// The outcome of a successful booking: the persisted event and the
/// calendar link binding it to the professional and patient.
#[derive(Clone, Debug)]
pub struct BookedEvent {
    pub event: CalendarEvent,
    pub calendar_id: RecordId,
}

/// Validates and commits booking requests.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<EntityStore>,
    locks: Arc<Mutex<HashMap<RecordId, Arc<Mutex<()>>>>>,
}

fn recover<'a, T>(result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    // A thread that panicked while booking leaves no partial state behind
    // (ordering of persist + rollback guarantees that), so the data the
    // lock protects is still consistent.
    result.unwrap_or_else(PoisonError::into_inner)
}

impl BookingService {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            store,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn professional_lock(&self, professional_id: RecordId) -> Arc<Mutex<()>> {
        let mut locks = recover(self.locks.lock());
        locks
            .entry(professional_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Validates a proposed booking and, if it is internally consistent and
    /// conflict-free, persists the event and its calendar link.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the professional or patient is missing
    ///   or the referenced user holds a different role;
    /// - [`CoreError::InactiveProfessional`] for a deactivated professional;
    /// - [`CoreError::InvalidInterval`] if the end does not come strictly
    ///   after the start;
    /// - [`CoreError::Overlap`] naming the first conflicting event;
    /// - a storage error if persisting fails.
    pub fn book(&self, request: BookingRequest) -> CoreResult<BookedEvent> {
        let professional = self.store.get_user(request.professional_id)?;
        if professional.role() != Role::Professional {
            return Err(CoreError::NotFound {
                what: EntityKind::Professional,
                id: request.professional_id,
            });
        }
        if !professional.is_active {
            return Err(CoreError::InactiveProfessional(professional.id));
        }
        let patient = self.store.get_user(request.patient_id)?;
        if patient.role() != Role::Patient {
            return Err(CoreError::NotFound {
                what: EntityKind::Patient,
                id: request.patient_id,
            });
        }

        CalendarEvent::validate_interval(request.start_time, request.end_time)?;

        // Serialise check-and-persist per professional. Bookings for other
        // professionals proceed concurrently on their own locks.
        let lock = self.professional_lock(professional.id);
        let _guard = recover(lock.lock());

        for existing in self.store.events_for_professional(professional.id) {
            if overlaps(
                existing.start_time,
                existing.end_time,
                request.start_time,
                request.end_time,
            ) {
                tracing::debug!(
                    "booking for professional {} rejected: conflict with event {}",
                    professional.id,
                    existing.id
                );
                return Err(CoreError::Overlap {
                    event_id: existing.id,
                    name: existing.name.clone(),
                    start: existing.start_time,
                    end: existing.end_time,
                });
            }
        }

        let event = CalendarEvent::new(
            request.name,
            request.start_time,
            request.end_time,
            request.description,
        )?;
        self.store.save_event(&event)?;

        let link = Calendar::new(event.id, professional.id, patient.id);
        if let Err(link_error) = self.store.save_calendar(&link) {
            // Roll the event back so no half-booked state survives.
            if let Err(cleanup_error) = self.store.delete_event(event.id) {
                tracing::warn!(
                    "failed to roll back event {} after link failure: {}",
                    event.id,
                    cleanup_error
                );
            }
            return Err(link_error);
        }

        tracing::info!(
            "booked event {} for professional {} and patient {}",
            event.id,
            professional.id,
            patient.id
        );
        Ok(BookedEvent {
            event,
            calendar_id: link.id,
        })
    }

    /// Cancels a booking by deleting the event; its calendar link cascades.
    pub fn cancel(&self, event_id: RecordId) -> CoreResult<()> {
        self.store.delete_event(event_id)?;
        tracing::info!("cancelled event {}", event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::user::User;
    use chrono::TimeZone;
    use cliniq_types::SocialSecNumber;
    use std::sync::Barrier;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<EntityStore>,
        service: BookingService,
        professional: User,
        patient: User,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Arc::new(CoreConfig::new(dir.path().to_path_buf()));
        let store = Arc::new(EntityStore::new(cfg));
        let service = BookingService::new(store.clone());

        let professional = User::new_professional(
            NonEmptyText::new("g.house@clinic.example").unwrap(),
            "Gregory".into(),
            "House".into(),
            None,
            NonEmptyText::new("Diagnostician").unwrap(),
        );
        store.save_user(&professional).unwrap();
        let patient = User::new_patient(
            NonEmptyText::new("j.doe@example.com").unwrap(),
            "Jane".into(),
            "Doe".into(),
            None,
            SocialSecNumber::new(12345678).unwrap(),
            Some(professional.id),
        );
        store.save_user(&patient).unwrap();

        Fixture {
            _dir: dir,
            store,
            service,
            professional,
            patient,
        }
    }

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, hour, min, 0).unwrap()
    }

    fn request(fx: &Fixture, name: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> BookingRequest {
        BookingRequest {
            professional_id: fx.professional.id,
            patient_id: fx.patient.id,
            name: NonEmptyText::new(name).unwrap(),
            start_time: start,
            end_time: end,
            description: String::new(),
        }
    }

    #[test]
    fn booking_persists_event_and_link() {
        let fx = fixture();
        let booked = fx
            .service
            .book(request(&fx, "Check-Up", at(9, 0), at(10, 0)))
            .unwrap();

        let stored = fx.store.get_event(booked.event.id).unwrap();
        assert_eq!(stored.slug(), "check-up");
        let link = fx.store.get_calendar(booked.calendar_id).unwrap();
        assert_eq!(link.event, booked.event.id);
        assert_eq!(link.professional, Some(fx.professional.id));
        assert_eq!(link.patient, Some(fx.patient.id));
    }

    #[test]
    fn overlap_is_rejected_with_the_conflicting_event() {
        let fx = fixture();
        let booked = fx
            .service
            .book(request(&fx, "Check-Up", at(9, 0), at(10, 0)))
            .unwrap();

        match fx.service.book(request(&fx, "Follow-Up", at(9, 45), at(10, 15))) {
            Err(CoreError::Overlap {
                event_id,
                name,
                start,
                end,
            }) => {
                assert_eq!(event_id, booked.event.id);
                assert_eq!(name, "Check-Up");
                assert_eq!(start, at(9, 0));
                assert_eq!(end, at(10, 0));
            }
            other => panic!("expected Overlap, got {:?}", other),
        }
    }

    #[test]
    fn back_to_back_booking_succeeds() {
        let fx = fixture();
        fx.service
            .book(request(&fx, "Check-Up", at(9, 0), at(10, 0)))
            .unwrap();
        fx.service
            .book(request(&fx, "Follow-Up", at(10, 0), at(10, 30)))
            .unwrap();
        assert_eq!(fx.store.events_for_professional(fx.professional.id).len(), 2);
    }

    #[test]
    fn degenerate_interval_is_rejected_before_overlap_checks() {
        let fx = fixture();
        fx.service
            .book(request(&fx, "Check-Up", at(9, 0), at(10, 0)))
            .unwrap();
        // Starts inside the existing event, but the interval error wins.
        let result = fx.service.book(request(&fx, "Broken", at(9, 30), at(9, 30)));
        assert!(matches!(result, Err(CoreError::InvalidInterval)));
    }

    #[test]
    fn rejection_is_idempotent() {
        let fx = fixture();
        fx.service
            .book(request(&fx, "Check-Up", at(9, 0), at(10, 0)))
            .unwrap();
        let first = fx.service.book(request(&fx, "Follow-Up", at(9, 30), at(10, 30)));
        let second = fx.service.book(request(&fx, "Follow-Up", at(9, 30), at(10, 30)));
        assert!(matches!(first, Err(CoreError::Overlap { .. })));
        assert!(matches!(second, Err(CoreError::Overlap { .. })));
    }

    #[test]
    fn unknown_professional_is_not_found() {
        let fx = fixture();
        let mut req = request(&fx, "Check-Up", at(9, 0), at(10, 0));
        req.professional_id = RecordId::new();
        assert!(matches!(
            fx.service.book(req),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn patient_cannot_stand_in_for_the_professional() {
        let fx = fixture();
        let mut req = request(&fx, "Check-Up", at(9, 0), at(10, 0));
        req.professional_id = fx.patient.id;
        assert!(matches!(
            fx.service.book(req),
            Err(CoreError::NotFound {
                what: EntityKind::Professional,
                ..
            })
        ));
    }

    #[test]
    fn deactivated_professional_takes_no_bookings() {
        let fx = fixture();
        let mut prof = fx.professional.clone();
        prof.deactivate();
        fx.store.save_user(&prof).unwrap();
        let result = fx.service.book(request(&fx, "Check-Up", at(9, 0), at(10, 0)));
        assert!(matches!(result, Err(CoreError::InactiveProfessional(_))));
    }

    #[test]
    fn cancelling_frees_the_slot() {
        let fx = fixture();
        let booked = fx
            .service
            .book(request(&fx, "Check-Up", at(9, 0), at(10, 0)))
            .unwrap();
        fx.service.cancel(booked.event.id).unwrap();
        fx.service
            .book(request(&fx, "Rebooked", at(9, 0), at(10, 0)))
            .unwrap();
    }

    #[test]
    fn bookings_for_different_professionals_are_independent() {
        let fx = fixture();
        let other = User::new_professional(
            NonEmptyText::new("j.wilson@clinic.example").unwrap(),
            "James".into(),
            "Wilson".into(),
            None,
            NonEmptyText::new("Oncologist").unwrap(),
        );
        fx.store.save_user(&other).unwrap();

        fx.service
            .book(request(&fx, "Check-Up", at(9, 0), at(10, 0)))
            .unwrap();
        let mut req = request(&fx, "Same Slot Elsewhere", at(9, 0), at(10, 0));
        req.professional_id = other.id;
        fx.service.book(req).unwrap();
    }

    #[test]
    fn concurrent_conflicting_bookings_admit_exactly_one() {
        let fx = fixture();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let service = fx.service.clone();
                let barrier = barrier.clone();
                let req = request(
                    &fx,
                    &format!("Race {}", i),
                    at(9, 0),
                    at(10, 0),
                );
                std::thread::spawn(move || {
                    barrier.wait();
                    service.book(req)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one concurrent booking must win");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(CoreError::Overlap { .. }))));
        assert_eq!(fx.store.events_for_professional(fx.professional.id).len(), 1);
    }
}
