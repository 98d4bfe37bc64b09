// Filter selectors and the search/filter pipeline for task queries

use crate::models::{Priority, Task};
use std::fmt;
use std::str::FromStr;

/// Selector narrowing tasks by completion status or by priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
    Priority(Priority),
}

impl TaskFilter {
    /// Every selector, in display order
    pub const ALL: [TaskFilter; 6] = [
        TaskFilter::All,
        TaskFilter::Pending,
        TaskFilter::Completed,
        TaskFilter::Priority(Priority::Low),
        TaskFilter::Priority(Priority::Medium),
        TaskFilter::Priority(Priority::High),
    ];

    pub fn matches(self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Pending => task.is_pending(),
            TaskFilter::Completed => task.completed,
            TaskFilter::Priority(p) => task.priority == p,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Pending => "pending",
            TaskFilter::Completed => "completed",
            TaskFilter::Priority(p) => p.as_str(),
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "pending" => Ok(TaskFilter::Pending),
            "completed" => Ok(TaskFilter::Completed),
            other => other.parse::<Priority>().map(TaskFilter::Priority).map_err(|_| {
                format!(
                    "Unknown filter: {} (expected all, pending, completed, low, medium or high)",
                    other
                )
            }),
        }
    }
}

/// Case-insensitive substring match on task text; an empty needle matches everything
pub fn matches_search(task: &Task, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    task.text.to_lowercase().contains(&search.to_lowercase())
}

/// Apply search, then filter, over an independent copy of `tasks`
///
/// Relative order is preserved.
pub fn apply(tasks: &[Task], filter: TaskFilter, search: &str) -> Vec<Task> {
    let mut selected: Vec<Task> = tasks.to_vec();

    if !search.is_empty() {
        selected.retain(|task| matches_search(task, search));
    }

    selected.retain(|task| filter.matches(task));
    selected
}
