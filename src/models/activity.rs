use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::Page;
use crate::format;

/// Page size of the door log.
pub const ACTIVITY_PAGE_SIZE: usize = 100;

/// One row of `/room/admin/{slug}/activity`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoorEvent {
    #[serde(deserialize_with = "super::string_or_number")]
    pub id: String,
    pub occurred_at: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub door: Option<String>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl DoorEvent {
    pub fn when(&self, tz: Tz) -> String {
        format::date_time(&self.occurred_at, tz)
    }

    pub fn user_label(&self) -> &str {
        self.user.as_deref().unwrap_or("Unknown")
    }

    pub fn action_label(&self) -> String {
        format::humanize_key(&self.action)
    }
}

/// One page of the door log, newest first.
pub type ActivityPage = Page<DoorEvent>;
