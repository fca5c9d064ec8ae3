use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::ids::next_entity_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Note {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: next_entity_id(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Link {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl Link {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: next_entity_id(),
            title: title.into(),
            url: url.into(),
            created_at: Utc::now(),
        }
    }
}

/// An uploaded file embedded inline as a data URI (venue plans, shared images).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub data: String,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn new(name: impl Into<String>, data: String) -> Self {
        Self {
            id: next_entity_id(),
            name: name.into(),
            data,
            created_at: Utc::now(),
        }
    }
}
