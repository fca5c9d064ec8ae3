use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{ids::next_entity_id, project::ProjectError};
use crate::types::TaskColumn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Task {
    pub id: String,
    pub text: String,
    /// Carried through for compatibility; column membership is the task's state.
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Tasks partitioned into three ordered columns. A task lives in exactly one
/// column at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default, rename_all = "camelCase")]
#[ts(export)]
pub struct TaskBoard {
    pub todo: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub done: Vec<Task>,
}

impl TaskBoard {
    pub fn column(&self, column: TaskColumn) -> &[Task] {
        match column {
            TaskColumn::Todo => &self.todo,
            TaskColumn::InProgress => &self.in_progress,
            TaskColumn::Done => &self.done,
        }
    }

    fn column_mut(&mut self, column: TaskColumn) -> &mut Vec<Task> {
        match column {
            TaskColumn::Todo => &mut self.todo,
            TaskColumn::InProgress => &mut self.in_progress,
            TaskColumn::Done => &mut self.done,
        }
    }

    /// Appends a new task to `column` and returns it.
    pub fn add(&mut self, column: TaskColumn, text: impl Into<String>) -> &Task {
        let task = Task {
            id: next_entity_id(),
            text: text.into(),
            completed: false,
            created_at: Utc::now(),
        };
        let tasks = self.column_mut(column);
        tasks.push(task);
        &tasks[tasks.len() - 1]
    }

    /// Moves a task from `from` to the end of `to`.
    pub fn move_task(
        &mut self,
        task_id: &str,
        from: TaskColumn,
        to: TaskColumn,
    ) -> Result<(), ProjectError> {
        let source = self.column_mut(from);
        let index = source
            .iter()
            .position(|task| task.id == task_id)
            .ok_or_else(|| ProjectError::entry_not_found("task", task_id))?;
        if from == to {
            return Ok(());
        }
        let task = source.remove(index);
        self.column_mut(to).push(task);
        Ok(())
    }

    /// Removes a task from whichever column holds it.
    pub fn remove(&mut self, task_id: &str) -> Result<Task, ProjectError> {
        for column in [TaskColumn::Todo, TaskColumn::InProgress, TaskColumn::Done] {
            let tasks = self.column_mut(column);
            if let Some(index) = tasks.iter().position(|task| task.id == task_id) {
                return Ok(tasks.remove(index));
            }
        }
        Err(ProjectError::entry_not_found("task", task_id))
    }

    pub fn find(&self, task_id: &str) -> Option<(TaskColumn, &Task)> {
        [TaskColumn::Todo, TaskColumn::InProgress, TaskColumn::Done]
            .into_iter()
            .find_map(|column| {
                self.column(column)
                    .iter()
                    .find(|task| task.id == task_id)
                    .map(|task| (column, task))
            })
    }

    pub fn total(&self) -> usize {
        self.todo.len() + self.in_progress.len() + self.done.len()
    }

    pub fn completed(&self) -> usize {
        self.done.len()
    }
}
