use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::ids::next_entity_id;
use crate::types::WorkOrderStatus;

/// A production work order. `image` holds a normalized JPEG data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WorkOrder {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: WorkOrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateWorkOrder {
    pub title: String,
    pub material: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl WorkOrder {
    pub fn new(data: CreateWorkOrder) -> Self {
        Self {
            id: next_entity_id(),
            title: data.title,
            material: data.material.unwrap_or_default(),
            description: data.description.unwrap_or_default(),
            image: data.image,
            status: WorkOrderStatus::Planned,
            created_at: Utc::now(),
        }
    }
}
