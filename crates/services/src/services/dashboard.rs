use chrono::NaiveDate;
use db::{models::project::Project, types::StatusMilestone};
use serde::Serialize;
use ts_rs::TS;

/// Totals shown on the home view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct DashboardStats {
    pub active_projects: usize,
    pub completed_projects: usize,
    pub total_tasks: usize,
    pub done_tasks: usize,
    /// Risks at the highest severity across all projects.
    pub critical_risks: usize,
}

impl DashboardStats {
    pub fn from_projects(projects: &[Project]) -> Self {
        projects.iter().fold(Self::default(), |mut stats, project| {
            if project.is_completed() {
                stats.completed_projects += 1;
            } else {
                stats.active_projects += 1;
            }
            stats.total_tasks += project.tasks.total();
            stats.done_tasks += project.tasks.completed();
            stats.critical_risks += project.critical_risks();
            stats
        })
    }
}

/// One project card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub client: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub badge: StatusMilestone,
    pub tasks_done: usize,
    pub tasks_total: usize,
    pub has_critical_risk: bool,
}

impl ProjectSummary {
    pub fn of(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            client: project.client.clone(),
            start_date: project.start_date,
            end_date: project.end_date,
            badge: project.status_checks.stage(),
            tasks_done: project.tasks.completed(),
            tasks_total: project.tasks.total(),
            has_critical_risk: project.critical_risks() > 0,
        }
    }

    /// Share of tasks in the done column, rounded down. Zero without tasks.
    pub fn progress_percent(&self) -> u8 {
        if self.tasks_total == 0 {
            return 0;
        }
        (self.tasks_done * 100 / self.tasks_total) as u8
    }
}

/// Splits into (active, completed), keeping list order.
pub fn partition_by_completion(projects: &[Project]) -> (Vec<&Project>, Vec<&Project>) {
    projects.iter().partition(|project| !project.is_completed())
}
