// Models module - DTOs mirrored from the platform backend's JSON

use serde::{Deserialize, Deserializer};

pub mod activity;
pub mod content;
pub mod fees;
pub mod financials;
pub mod league;
pub mod page;
pub mod room;
pub mod user;

pub use activity::DoorEvent;
pub use content::{WebFaq, WebPublicContent};
pub use fees::RoomFeeSchedule;
pub use financials::{MonthlyRow, RoomFinancialSummary, TransactionRow};
pub use league::{League, MatchReport, Standing};
pub use page::Page;
pub use room::{Room, RoomIp, RoomSummary, Table, TableInput};
pub use user::{Permissions, UserClaims, UserInfo};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(n) => n.to_string(),
        }
    }
}

/// Identifiers arrive as either JSON strings or numbers depending on the endpoint.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}
