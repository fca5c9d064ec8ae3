use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::ids::next_entity_id;
use crate::types::RiskSeverity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Risk {
    pub id: String,
    pub description: String,
    pub severity: RiskSeverity,
    #[serde(default)]
    pub mitigation: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateRisk {
    pub description: String,
    pub severity: RiskSeverity,
    pub mitigation: Option<String>,
}

impl Risk {
    pub fn new(data: CreateRisk) -> Self {
        Self {
            id: next_entity_id(),
            description: data.description,
            severity: data.severity,
            mitigation: data.mitigation.unwrap_or_default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity.is_critical()
    }
}

pub fn critical_count(risks: &[Risk]) -> usize {
    risks.iter().filter(|risk| risk.is_critical()).count()
}
