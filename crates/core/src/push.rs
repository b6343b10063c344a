//! Push payloads and the notifications built from them.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Decoded push message body. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl PushPayload {
    /// Decode a raw push body. An empty body yields the all-default payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if a non-empty body is not a JSON object.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(data).map_err(|e| Error::InvalidInput(format!("invalid push payload: {e}")))
    }
}

/// Values used for fields a push payload leaves out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDefaults {
    pub title: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "Exam Prep".into(),
            icon: Some("/icons/icon-192x192.png".into()),
            badge: Some("/icons/icon-72x72.png".into()),
        }
    }
}

/// A system notification to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
    /// URL opened when the notification is tapped.
    pub data: String,
}

impl Notification {
    pub fn from_payload(payload: PushPayload, defaults: &NotificationDefaults) -> Self {
        Self {
            title: payload.title.unwrap_or_else(|| defaults.title.clone()),
            body: payload.body.unwrap_or_default(),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            data: payload.url.filter(|u| !u.is_empty()).unwrap_or_else(|| "/".into()),
        }
    }

    /// Where a tap on this notification leads.
    pub fn target_url(&self) -> &str {
        &self.data
    }
}
