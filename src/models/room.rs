use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEZONE: &str = "America/Toronto";
pub const DEFAULT_CURRENCY: &str = "CAD";

/// Entry of the room list (`POST /room`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomIp {
    pub id: i64,
    #[serde(default)]
    pub room_id: Option<i64>,
    pub ip: String,
}

/// Room configuration as returned by `/room/admin/{slug}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub tz: String,
    pub currency: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub show_in_app: Option<bool>,
    #[serde(default)]
    pub enable_web: Option<bool>,
    #[serde(default, skip_serializing)]
    pub ips: Vec<RoomIp>,
}

impl Room {
    /// The room's IANA timezone, `None` when the stored name is unknown.
    pub fn timezone(&self) -> Option<Tz> {
        self.tz.trim().parse().ok()
    }
}

/// Body of `POST /room/admin/create` and `PUT /room/admin/{slug}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomInput {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_tz")]
    pub tz: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub show_in_app: bool,
    #[serde(default)]
    pub enable_web: bool,
}

fn default_tz() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl RoomInput {
    /// Trims every text field and rejects missing required ones.
    pub fn validated(mut self) -> Result<Self, String> {
        self.name = self.name.trim().to_string();
        self.slug = self.slug.trim().to_lowercase();
        self.tz = self.tz.trim().to_string();
        self.currency = self.currency.trim().to_uppercase();
        self.email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        if self.name.is_empty()
            || self.slug.is_empty()
            || self.tz.is_empty()
            || self.currency.is_empty()
        {
            return Err("Please fill all required fields.".to_string());
        }

        if self.tz.parse::<Tz>().is_err() {
            return Err(format!("Unknown timezone: {}", self.tz));
        }

        if !self
            .slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err("Slug may only contain letters, digits, '-' and '_'.".to_string());
        }

        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomIpInput {
    pub ip: String,
}

impl RoomIpInput {
    pub fn validated(self) -> Result<Self, String> {
        let ip = self.ip.trim().to_string();
        if ip.is_empty() {
            return Err("IP address is required".to_string());
        }
        Ok(Self { ip })
    }
}

/// A snooker table in a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Table {
    pub id: i64,
    pub room_id: i64,
    pub name: String,
    pub table_type: String,
    pub in_service: bool,
    #[serde(default)]
    pub table_controller_id: Option<i64>,
    #[serde(default)]
    pub light_controller: Option<String>,
    pub price_policy_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableInput {
    pub name: String,
    pub table_type: String,
    #[serde(default)]
    pub in_service: bool,
    #[serde(default)]
    pub table_controller_id: Option<i64>,
    #[serde(default)]
    pub light_controller: Option<String>,
    pub price_policy_id: i64,
}

impl TableInput {
    pub fn validated(mut self) -> Result<Self, String> {
        self.name = self.name.trim().to_string();
        self.table_type = self.table_type.trim().to_string();
        self.light_controller = self
            .light_controller
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        if self.name.is_empty() {
            return Err("Table name is required".to_string());
        }
        if self.table_type.is_empty() {
            return Err("Table type is required".to_string());
        }
        Ok(self)
    }
}
