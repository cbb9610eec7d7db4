use std::collections::HashMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

/// Claims decoded from the id token payload.
///
/// The signature is not checked here; the backend verifies the token on
/// every call and these claims only drive what the pages display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl UserClaims {
    pub fn from_id_token(token: &str) -> Option<Self> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn display_label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }
}

/// `/user/me`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserInfo {
    #[serde(deserialize_with = "super::string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub handicap: Option<f64>,
    #[serde(default)]
    pub id_verified: Option<bool>,
}

impl UserInfo {
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Capability tags returned by `/user/web/mypermissions`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Permissions {
    #[serde(default, deserialize_with = "super::opt_string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub global_permissions: Vec<String>,
    #[serde(default)]
    pub room_permissions: Vec<String>,
    #[serde(default)]
    pub event_permissions: Vec<String>,
}

impl Permissions {
    /// True when the tag appears in any of the three scopes.
    pub fn has(&self, permission: &str) -> bool {
        self.global_permissions.iter().any(|p| p == permission)
            || self.room_permissions.iter().any(|p| p == permission)
            || self.event_permissions.iter().any(|p| p == permission)
    }

    pub fn is_empty(&self) -> bool {
        self.global_permissions.is_empty()
            && self.room_permissions.is_empty()
            && self.event_permissions.is_empty()
    }
}
