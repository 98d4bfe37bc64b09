// Data models for TaskMaster

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the store; never reused within a store's lifetime
pub type TaskId = u64;

/// Maximum task text length, counted in characters after trimming
pub const MAX_TEXT_LEN: usize = 200;

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub(crate) fn new(id: TaskId, text: String, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            completed: false,
            priority,
            created_at: now,
            completed_at: None,
        }
    }

    /// Flip completion, keeping `completed_at` present iff `completed`
    pub(crate) fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.completed_at = if self.completed { Some(now) } else { None };
    }

    pub(crate) fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.completed = true;
        self.completed_at = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        !self.completed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("Unknown priority: {} (expected low, medium or high)", other)),
        }
    }
}

/// Aggregate counts over the whole task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Percentage in 0..=100, rounded half up; 0 for an empty list
    pub completion_rate: u32,
}

impl Stats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            pending: total - completed,
            completion_rate: completion_rate(completed, total),
        }
    }
}

fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    // round(100 * completed / total) in integers
    ((200 * completed + total) / (2 * total)) as u32
}

/// Helper function to get the current time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn task(id: TaskId, completed: bool) -> Task {
        let mut t = Task::new(id, format!("Task {}", id), Priority::Medium, fixed_time());
        if completed {
            t.mark_completed(fixed_time());
        }
        t
    }

    #[test]
    fn test_priority_serialization() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, "\"high\"");

        let parsed: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, Priority::Low);
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" medium ".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_task_serialization_uses_camel_case() {
        let t = task(7, false);
        let json = serde_json::to_value(&t).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["createdAt"], "2026-03-01T12:00:00Z");
        assert!(json["completedAt"].is_null());

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_task_deserializes_without_completed_at() {
        let json = r#"{"id":1,"text":"x","completed":false,"priority":"low","createdAt":"2026-03-01T12:00:00.000Z"}"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.completed_at, None);
        assert_eq!(t.priority, Priority::Low);
    }

    #[test]
    fn test_toggle_keeps_completed_at_in_step() {
        let mut t = task(1, false);
        t.toggle(fixed_time());
        assert!(t.completed);
        assert_eq!(t.completed_at, Some(fixed_time()));

        t.toggle(fixed_time());
        assert!(!t.completed);
        assert_eq!(t.completed_at, None);
    }

    #[test]
    fn test_stats_empty() {
        let stats = Stats::from_tasks(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate, 0);
    }

    #[test]
    fn test_stats_rounding() {
        let tasks = vec![task(1, true), task(2, false), task(3, false)];
        let stats = Stats::from_tasks(&tasks);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.completion_rate, 33);

        let tasks = vec![task(1, true), task(2, true), task(3, false)];
        assert_eq!(Stats::from_tasks(&tasks).completion_rate, 67);

        let tasks = vec![task(1, true), task(2, false)];
        assert_eq!(Stats::from_tasks(&tasks).completion_rate, 50);
    }

    #[test]
    fn test_now() {
        // Should be reasonable timestamp (after year 2020)
        assert!(now().timestamp() > 1_600_000_000);
    }
}
