//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into
//! core services. The intent is to avoid reading process-wide environment
//! variables during request handling, which can lead to inconsistent
//! behaviour in multi-threaded runtimes and test harnesses.

use std::path::{Path, PathBuf};

/// Directory name for user records under the data dir.
pub const USERS_DIR_NAME: &str = "users";
/// Directory name for calendar event records under the data dir.
pub const EVENTS_DIR_NAME: &str = "events";
/// Directory name for calendar link records under the data dir.
pub const CALENDARS_DIR_NAME: &str = "calendars";
/// Directory name for clinical history records under the data dir.
pub const HISTORIES_DIR_NAME: &str = "histories";

/// Default data directory when `CLINIC_DATA_DIR` is not set.
pub const DEFAULT_DATA_DIR: &str = "/clinic_data";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig` rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join(USERS_DIR_NAME)
    }

    pub fn events_dir(&self) -> PathBuf {
        self.data_dir.join(EVENTS_DIR_NAME)
    }

    pub fn calendars_dir(&self) -> PathBuf {
        self.data_dir.join(CALENDARS_DIR_NAME)
    }

    pub fn histories_dir(&self) -> PathBuf {
        self.data_dir.join(HISTORIES_DIR_NAME)
    }
}
