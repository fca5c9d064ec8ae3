use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use ts_rs::TS;

/// The three columns of a project's task board.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, Display, EnumIter, Default,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum TaskColumn {
    #[default]
    Todo,
    #[strum(to_string = "inProgress", serialize = "in-progress")]
    InProgress,
    Done,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, Display, EnumIter, Default,
)]
pub enum RiskSeverity {
    #[serde(rename = "låg")]
    #[strum(to_string = "låg", serialize = "lag")]
    Low,
    #[default]
    #[serde(rename = "medel")]
    #[strum(serialize = "medel")]
    Medium,
    #[serde(rename = "hög")]
    #[strum(to_string = "hög", serialize = "hog")]
    High,
}

impl RiskSeverity {
    /// Only the top level counts towards the critical risk totals.
    pub fn is_critical(self) -> bool {
        matches!(self, RiskSeverity::High)
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, Display, EnumIter, Default,
)]
pub enum WorkOrderStatus {
    #[default]
    #[serde(rename = "planerad")]
    #[strum(serialize = "planerad")]
    Planned,
    #[serde(rename = "pågående")]
    #[strum(to_string = "pågående", serialize = "pagaende")]
    InProgress,
    #[serde(rename = "klar")]
    #[strum(serialize = "klar")]
    Done,
}

/// Project milestones, in the order they are displayed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusMilestone {
    Brief,
    Design,
    Produktion,
    Leverans,
    Klar,
}
