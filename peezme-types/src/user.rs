use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub fcm_token: String,
}

impl User {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            photo_url: String::new(),
            available: true,
            fcm_token: String::new(),
        }
    }

    /// Minimal profile for an id that has no cached snapshot.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            photo_url: String::new(),
            available: false,
            fcm_token: String::new(),
        }
    }
}
