//! Durable entity storage.
//!
//! Every record is a JSON document under a sharded directory tree derived
//! from its identifier:
//!
//! ```text
//! <data_dir>/
//!   users/<s1>/<s2>/<id>/user.json
//!   events/<s1>/<s2>/<id>/event.json
//!   calendars/<s1>/<s2>/<id>/calendar.json
//!   histories/<s1>/<s2>/<id>/history.json
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the canonical id.
//!
//! The store owns referential integrity between record kinds. Deletion
//! applies a per-relationship policy:
//!
//! - deleting a calendar event cascades deletion of its calendar links;
//! - deleting a professional cascades deletion of the patients in their
//!   charge, and clears the professional reference on calendar links and
//!   clinical histories;
//! - deleting a patient clears the patient reference on calendar links and
//!   clinical histories.
//!
//! Queries are explicit and eager: each call does one pass over the shard
//! tree and returns a finite `Vec`. Unreadable or unparsable record files
//! are logged and skipped rather than failing the whole listing.

use crate::calendar::Calendar;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult, EntityKind};
use crate::event::CalendarEvent;
use crate::history::ClinicalHistory;
use crate::user::{RoleProfile, User};
use cliniq_uuid::RecordId;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const USER_FILE: &str = "user.json";
const EVENT_FILE: &str = "event.json";
const CALENDAR_FILE: &str = "calendar.json";
const HISTORY_FILE: &str = "history.json";

/// File-backed store for users, events, calendar links, and histories.
#[derive(Clone, Debug)]
pub struct EntityStore {
    cfg: Arc<CoreConfig>,
}

impl EntityStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Persists a user record, enforcing unique emails across all users and
    /// unique social security numbers across patients.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateKey`] when another user already holds
    /// the email or social security number, or a storage error.
    pub fn save_user(&self, user: &User) -> CoreResult<()> {
        for existing in self.list_users() {
            if existing.id == user.id {
                continue;
            }
            if existing.email == user.email {
                return Err(CoreError::DuplicateKey(format!(
                    "email '{}' is already registered",
                    user.email
                )));
            }
            if let (
                RoleProfile::Patient {
                    social_sec_number: theirs,
                    ..
                },
                RoleProfile::Patient {
                    social_sec_number: ours,
                    ..
                },
            ) = (&existing.profile, &user.profile)
            {
                if theirs == ours {
                    return Err(CoreError::DuplicateKey(format!(
                        "social security number '{}' is already registered",
                        ours
                    )));
                }
            }
        }
        self.write_record(&self.cfg.users_dir(), user.id, USER_FILE, user)
    }

    pub fn get_user(&self, id: RecordId) -> CoreResult<User> {
        self.read_record(&self.cfg.users_dir(), id, USER_FILE, EntityKind::User)
    }

    /// All user records, in shard-tree order.
    pub fn list_users(&self) -> Vec<User> {
        self.walk_records(&self.cfg.users_dir(), USER_FILE)
    }

    /// Deletes a user, applying the per-relationship policies for their role.
    ///
    /// Professionals take their in-charge patients with them and are cleared
    /// from calendar links and histories; patients are only cleared from
    /// links and histories.
    pub fn delete_user(&self, id: RecordId) -> CoreResult<()> {
        let user = self.get_user(id)?;
        match user.profile {
            RoleProfile::Professional { .. } => {
                let in_charge: Vec<RecordId> = self
                    .list_users()
                    .into_iter()
                    .filter(|u| {
                        matches!(
                            u.profile,
                            RoleProfile::Patient {
                                prof_in_charge: Some(p),
                                ..
                            } if p == id
                        )
                    })
                    .map(|u| u.id)
                    .collect();
                for patient_id in in_charge {
                    self.delete_user(patient_id)?;
                }
                for mut link in self.list_calendars() {
                    if link.professional == Some(id) {
                        link.professional = None;
                        self.write_record(
                            &self.cfg.calendars_dir(),
                            link.id,
                            CALENDAR_FILE,
                            &link,
                        )?;
                    }
                }
                for mut history in self.list_histories() {
                    if history.professional == Some(id) {
                        history.professional = None;
                        self.write_record(
                            &self.cfg.histories_dir(),
                            history.id,
                            HISTORY_FILE,
                            &history,
                        )?;
                    }
                }
            }
            RoleProfile::Patient { .. } => {
                for mut link in self.list_calendars() {
                    if link.patient == Some(id) {
                        link.patient = None;
                        self.write_record(
                            &self.cfg.calendars_dir(),
                            link.id,
                            CALENDAR_FILE,
                            &link,
                        )?;
                    }
                }
                for mut history in self.list_histories() {
                    if history.patient == Some(id) {
                        history.patient = None;
                        self.write_record(
                            &self.cfg.histories_dir(),
                            history.id,
                            HISTORY_FILE,
                            &history,
                        )?;
                    }
                }
            }
            RoleProfile::Staff {} => {}
        }
        self.remove_record(&self.cfg.users_dir(), id, EntityKind::User)
    }

    // ------------------------------------------------------------------
    // Calendar events
    // ------------------------------------------------------------------

    /// Persists an event. The `end > start` invariant is re-checked here so
    /// no code path can persist a degenerate interval.
    pub fn save_event(&self, event: &CalendarEvent) -> CoreResult<()> {
        CalendarEvent::validate_interval(event.start_time, event.end_time)?;
        self.write_record(&self.cfg.events_dir(), event.id, EVENT_FILE, event)
    }

    pub fn get_event(&self, id: RecordId) -> CoreResult<CalendarEvent> {
        self.read_record(
            &self.cfg.events_dir(),
            id,
            EVENT_FILE,
            EntityKind::CalendarEvent,
        )
    }

    pub fn list_events(&self) -> Vec<CalendarEvent> {
        self.walk_records(&self.cfg.events_dir(), EVENT_FILE)
    }

    /// Deletes an event and cascades deletion of its calendar links.
    pub fn delete_event(&self, id: RecordId) -> CoreResult<()> {
        // Confirm the event exists before touching any link.
        self.get_event(id)?;
        for link in self.list_calendars() {
            if link.event == id {
                self.remove_record(&self.cfg.calendars_dir(), link.id, EntityKind::Calendar)?;
            }
        }
        self.remove_record(&self.cfg.events_dir(), id, EntityKind::CalendarEvent)
    }

    // ------------------------------------------------------------------
    // Calendar links
    // ------------------------------------------------------------------

    /// Persists a calendar link, enforcing that one event is never linked to
    /// two different professionals.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the linked event does not exist,
    /// or [`CoreError::DuplicateLink`] if another link already binds the
    /// event to a different professional.
    pub fn save_calendar(&self, link: &Calendar) -> CoreResult<()> {
        self.get_event(link.event)?;
        if let Some(proposed) = link.professional {
            for existing in self.list_calendars() {
                if existing.id == link.id || existing.event != link.event {
                    continue;
                }
                if let Some(bound) = existing.professional {
                    if bound != proposed {
                        return Err(CoreError::DuplicateLink {
                            event_id: link.event,
                            professional_id: bound,
                        });
                    }
                }
            }
        }
        self.write_record(&self.cfg.calendars_dir(), link.id, CALENDAR_FILE, link)
    }

    pub fn get_calendar(&self, id: RecordId) -> CoreResult<Calendar> {
        self.read_record(
            &self.cfg.calendars_dir(),
            id,
            CALENDAR_FILE,
            EntityKind::Calendar,
        )
    }

    pub fn list_calendars(&self) -> Vec<Calendar> {
        self.walk_records(&self.cfg.calendars_dir(), CALENDAR_FILE)
    }

    pub fn delete_calendar(&self, id: RecordId) -> CoreResult<()> {
        self.remove_record(&self.cfg.calendars_dir(), id, EntityKind::Calendar)
    }

    /// All events linked to `professional_id`, ordered by start time.
    ///
    /// This is the scoped query the booking pipeline validates against: it
    /// resolves the professional's calendar links and loads each linked
    /// event. A link whose event record is missing is logged and skipped.
    pub fn events_for_professional(&self, professional_id: RecordId) -> Vec<CalendarEvent> {
        let mut events = Vec::new();
        for link in self.list_calendars() {
            if link.professional != Some(professional_id) {
                continue;
            }
            match self.get_event(link.event) {
                Ok(event) => events.push(event),
                Err(err) => {
                    tracing::warn!(
                        "calendar link {} references unreadable event {}: {}",
                        link.id,
                        link.event,
                        err
                    );
                }
            }
        }
        events.sort_by_key(|e| e.start_time);
        events
    }

    // ------------------------------------------------------------------
    // Clinical histories
    // ------------------------------------------------------------------

    pub fn save_history(&self, history: &ClinicalHistory) -> CoreResult<()> {
        self.write_record(&self.cfg.histories_dir(), history.id, HISTORY_FILE, history)
    }

    pub fn get_history(&self, id: RecordId) -> CoreResult<ClinicalHistory> {
        self.read_record(
            &self.cfg.histories_dir(),
            id,
            HISTORY_FILE,
            EntityKind::ClinicalHistory,
        )
    }

    pub fn list_histories(&self) -> Vec<ClinicalHistory> {
        self.walk_records(&self.cfg.histories_dir(), HISTORY_FILE)
    }

    pub fn delete_history(&self, id: RecordId) -> CoreResult<()> {
        self.remove_record(&self.cfg.histories_dir(), id, EntityKind::ClinicalHistory)
    }

    // ------------------------------------------------------------------
    // Shared record plumbing
    // ------------------------------------------------------------------

    fn write_record<T: serde::Serialize>(
        &self,
        parent: &Path,
        id: RecordId,
        file_name: &str,
        record: &T,
    ) -> CoreResult<()> {
        let dir = id.sharded_dir(parent);
        let existed = dir.is_dir();
        fs::create_dir_all(&dir).map_err(CoreError::DirCreation)?;

        let write = || -> CoreResult<()> {
            let json = serde_json::to_string_pretty(record).map_err(CoreError::Serialization)?;
            fs::write(dir.join(file_name), json).map_err(CoreError::FileWrite)
        };

        if let Err(save_error) = write() {
            // A brand-new record dir must not survive a failed save.
            if !existed {
                if let Err(cleanup_error) = fs::remove_dir_all(&dir) {
                    return Err(CoreError::CleanupAfterSaveFailed {
                        path: dir,
                        save_error: Box::new(save_error),
                        cleanup_error,
                    });
                }
            }
            return Err(save_error);
        }
        Ok(())
    }

    fn read_record<T: DeserializeOwned>(
        &self,
        parent: &Path,
        id: RecordId,
        file_name: &str,
        what: EntityKind,
    ) -> CoreResult<T> {
        let path = id.sharded_dir(parent).join(file_name);
        if !path.is_file() {
            return Err(CoreError::NotFound { what, id });
        }
        let contents = fs::read_to_string(&path).map_err(CoreError::FileRead)?;
        serde_json::from_str(&contents).map_err(CoreError::Deserialization)
    }

    fn remove_record(&self, parent: &Path, id: RecordId, what: EntityKind) -> CoreResult<()> {
        let dir = id.sharded_dir(parent);
        if !dir.is_dir() {
            return Err(CoreError::NotFound { what, id });
        }
        fs::remove_dir_all(&dir).map_err(CoreError::FileDelete)
    }

    /// Walks the `<parent>/<s1>/<s2>/<id>/<file_name>` shard tree and
    /// collects every parsable record.
    fn walk_records<T: DeserializeOwned>(&self, parent: &Path, file_name: &str) -> Vec<T> {
        let mut records = Vec::new();

        let s1_iter = match fs::read_dir(parent) {
            Ok(it) => it,
            Err(_) => return records,
        };
        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }

            let s2_iter = match fs::read_dir(&s1_path) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }

                let id_iter = match fs::read_dir(&s2_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };
                for id_ent in id_iter.flatten() {
                    let record_path: PathBuf = id_ent.path().join(file_name);
                    if !record_path.is_file() {
                        continue;
                    }
                    match fs::read_to_string(&record_path) {
                        Ok(contents) => match serde_json::from_str::<T>(&contents) {
                            Ok(record) => records.push(record),
                            Err(err) => {
                                tracing::warn!(
                                    "failed to parse record {}: {}",
                                    record_path.display(),
                                    err
                                );
                            }
                        },
                        Err(err) => {
                            tracing::warn!(
                                "failed to read record {}: {}",
                                record_path.display(),
                                err
                            );
                        }
                    }
                }
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use cliniq_types::{NonEmptyText, SocialSecNumber};

    fn store() -> (tempfile::TempDir, EntityStore) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Arc::new(CoreConfig::new(dir.path().to_path_buf()));
        (dir, EntityStore::new(cfg))
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, hour, 0, 0).unwrap()
    }

    fn professional(store: &EntityStore, email: &str) -> User {
        let user = User::new_professional(
            NonEmptyText::new(email).unwrap(),
            "Gregory".into(),
            "House".into(),
            None,
            NonEmptyText::new("Diagnostician").unwrap(),
        );
        store.save_user(&user).unwrap();
        user
    }

    fn patient(store: &EntityStore, email: &str, ssn: i64, prof: Option<RecordId>) -> User {
        let user = User::new_patient(
            NonEmptyText::new(email).unwrap(),
            "Jane".into(),
            "Doe".into(),
            None,
            SocialSecNumber::new(ssn).unwrap(),
            prof,
        );
        store.save_user(&user).unwrap();
        user
    }

    fn event(store: &EntityStore, name: &str, start: u32, end: u32) -> CalendarEvent {
        let ev = CalendarEvent::new(NonEmptyText::new(name).unwrap(), at(start), at(end), "")
            .unwrap();
        store.save_event(&ev).unwrap();
        ev
    }

    #[test]
    fn user_round_trip() {
        let (_dir, store) = store();
        let prof = professional(&store, "g.house@clinic.example");
        let loaded = store.get_user(prof.id).unwrap();
        assert_eq!(loaded, prof);
    }

    #[test]
    fn missing_user_is_not_found() {
        let (_dir, store) = store();
        let result = store.get_user(RecordId::new());
        assert!(matches!(
            result,
            Err(CoreError::NotFound {
                what: EntityKind::User,
                ..
            })
        ));
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (_dir, store) = store();
        professional(&store, "g.house@clinic.example");
        let dup = User::new_staff(
            NonEmptyText::new("g.house@clinic.example").unwrap(),
            "Greg".into(),
            "House".into(),
            None,
        );
        assert!(matches!(
            store.save_user(&dup),
            Err(CoreError::DuplicateKey(_))
        ));
    }

    #[test]
    fn duplicate_social_sec_number_is_rejected() {
        let (_dir, store) = store();
        patient(&store, "a@example.com", 111, None);
        let dup = User::new_patient(
            NonEmptyText::new("b@example.com").unwrap(),
            "John".into(),
            "Roe".into(),
            None,
            SocialSecNumber::new(111).unwrap(),
            None,
        );
        assert!(matches!(
            store.save_user(&dup),
            Err(CoreError::DuplicateKey(_))
        ));
    }

    #[test]
    fn resaving_the_same_user_is_an_update_not_a_duplicate() {
        let (_dir, store) = store();
        let mut prof = professional(&store, "g.house@clinic.example");
        prof.deactivate();
        store.save_user(&prof).unwrap();
        assert!(!store.get_user(prof.id).unwrap().is_active);
    }

    #[test]
    fn degenerate_interval_never_persists() {
        let (_dir, store) = store();
        let mut ev = event(&store, "Check-Up", 9, 10);
        ev.end_time = ev.start_time;
        assert!(matches!(
            store.save_event(&ev),
            Err(CoreError::InvalidInterval)
        ));
    }

    #[test]
    fn calendar_link_requires_the_event() {
        let (_dir, store) = store();
        let prof = professional(&store, "g.house@clinic.example");
        let pat = patient(&store, "j.doe@example.com", 111, None);
        let link = Calendar::new(RecordId::new(), prof.id, pat.id);
        assert!(matches!(
            store.save_calendar(&link),
            Err(CoreError::NotFound {
                what: EntityKind::CalendarEvent,
                ..
            })
        ));
    }

    #[test]
    fn one_event_cannot_serve_two_professionals() {
        let (_dir, store) = store();
        let prof_a = professional(&store, "a@clinic.example");
        let prof_b = professional(&store, "b@clinic.example");
        let pat = patient(&store, "j.doe@example.com", 111, None);
        let ev = event(&store, "Check-Up", 9, 10);

        store
            .save_calendar(&Calendar::new(ev.id, prof_a.id, pat.id))
            .unwrap();
        let second = Calendar::new(ev.id, prof_b.id, pat.id);
        match store.save_calendar(&second) {
            Err(CoreError::DuplicateLink {
                event_id,
                professional_id,
            }) => {
                assert_eq!(event_id, ev.id);
                assert_eq!(professional_id, prof_a.id);
            }
            other => panic!("expected DuplicateLink, got {:?}", other),
        }
    }

    #[test]
    fn deleting_an_event_cascades_its_links() {
        let (_dir, store) = store();
        let prof = professional(&store, "g.house@clinic.example");
        let pat = patient(&store, "j.doe@example.com", 111, None);
        let ev = event(&store, "Check-Up", 9, 10);
        let link = Calendar::new(ev.id, prof.id, pat.id);
        store.save_calendar(&link).unwrap();

        store.delete_event(ev.id).unwrap();

        assert!(store.get_event(ev.id).is_err());
        assert!(store.get_calendar(link.id).is_err());
    }

    #[test]
    fn deleting_a_professional_cascades_patients_and_clears_references() {
        let (_dir, store) = store();
        let prof = professional(&store, "g.house@clinic.example");
        let pat = patient(&store, "j.doe@example.com", 111, Some(prof.id));
        let bystander = patient(&store, "k.roe@example.com", 222, None);

        let ev = event(&store, "Check-Up", 9, 10);
        let link = Calendar::new(ev.id, prof.id, bystander.id);
        store.save_calendar(&link).unwrap();
        let history = ClinicalHistory::new("notes", None, Some(prof.id), Some(bystander.id));
        store.save_history(&history).unwrap();

        store.delete_user(prof.id).unwrap();

        // In-charge patient went with the professional; the other stayed.
        assert!(store.get_user(pat.id).is_err());
        assert!(store.get_user(bystander.id).is_ok());

        // Link and history survive as orphans with the reference cleared.
        let orphan = store.get_calendar(link.id).unwrap();
        assert_eq!(orphan.professional, None);
        assert_eq!(orphan.patient, Some(bystander.id));
        assert_eq!(store.get_history(history.id).unwrap().professional, None);
    }

    #[test]
    fn deleting_a_patient_clears_references_only() {
        let (_dir, store) = store();
        let prof = professional(&store, "g.house@clinic.example");
        let pat = patient(&store, "j.doe@example.com", 111, None);
        let ev = event(&store, "Check-Up", 9, 10);
        let link = Calendar::new(ev.id, prof.id, pat.id);
        store.save_calendar(&link).unwrap();
        let history = ClinicalHistory::new("notes", None, Some(prof.id), Some(pat.id));
        store.save_history(&history).unwrap();

        store.delete_user(pat.id).unwrap();

        let orphan = store.get_calendar(link.id).unwrap();
        assert_eq!(orphan.patient, None);
        assert_eq!(orphan.professional, Some(prof.id));
        assert_eq!(store.get_history(history.id).unwrap().patient, None);
        assert!(store.get_event(ev.id).is_ok());
    }

    #[test]
    fn events_are_scoped_to_one_professional() {
        let (_dir, store) = store();
        let prof_a = professional(&store, "a@clinic.example");
        let prof_b = professional(&store, "b@clinic.example");
        let pat = patient(&store, "j.doe@example.com", 111, None);

        let ev_a = event(&store, "Morning Round", 9, 10);
        let ev_b = event(&store, "Afternoon Round", 14, 15);
        store
            .save_calendar(&Calendar::new(ev_a.id, prof_a.id, pat.id))
            .unwrap();
        store
            .save_calendar(&Calendar::new(ev_b.id, prof_b.id, pat.id))
            .unwrap();

        let events_a = store.events_for_professional(prof_a.id);
        assert_eq!(events_a.len(), 1);
        assert_eq!(events_a[0].id, ev_a.id);
        assert_eq!(store.events_for_professional(prof_b.id).len(), 1);
    }

    #[test]
    fn events_for_professional_are_sorted_by_start_time() {
        let (_dir, store) = store();
        let prof = professional(&store, "g.house@clinic.example");
        let pat = patient(&store, "j.doe@example.com", 111, None);

        let late = event(&store, "Late", 15, 16);
        let early = event(&store, "Early", 8, 9);
        store
            .save_calendar(&Calendar::new(late.id, prof.id, pat.id))
            .unwrap();
        store
            .save_calendar(&Calendar::new(early.id, prof.id, pat.id))
            .unwrap();

        let events = store.events_for_professional(prof.id);
        assert_eq!(
            events.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![early.id, late.id]
        );
    }
}
