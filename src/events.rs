// Change notifications from the task store to its presentation layer

use crate::models::{Task, TaskId};
use std::fmt;

/// Something that happened to the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Added(Task),
    Deleted(TaskId),
    Toggled(Task),
    Edited(Task),
    /// Number of tasks newly marked complete (may be 0)
    CompletedAll(usize),
    /// Number of completed tasks removed (may be 0)
    DeletedCompleted(usize),
    /// Number of tasks removed by a clear
    Cleared(usize),
    /// State was replaced from persisted bytes or seeded
    Loaded { count: usize },
    Saved,
    SaveFailed(String),
}

/// Severity hint for surfacing an event to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

impl StoreEvent {
    /// User-facing notification for this event, if it warrants one
    pub fn notice(&self) -> Option<(NoticeKind, String)> {
        let notice = match self {
            StoreEvent::Added(_) => (NoticeKind::Success, "Task added successfully!".to_string()),
            StoreEvent::Deleted(_) => (NoticeKind::Success, "Task deleted!".to_string()),
            StoreEvent::Toggled(task) if task.completed => (NoticeKind::Success, "Task completed! 🎉".to_string()),
            StoreEvent::Toggled(_) => (NoticeKind::Success, "Task marked as pending".to_string()),
            StoreEvent::Edited(_) => (NoticeKind::Success, "Task updated!".to_string()),
            StoreEvent::CompletedAll(0) => (NoticeKind::Info, "No pending tasks to complete!".to_string()),
            StoreEvent::CompletedAll(n) => (NoticeKind::Success, format!("{} tasks completed!", n)),
            StoreEvent::DeletedCompleted(0) => (NoticeKind::Info, "No completed tasks to delete!".to_string()),
            StoreEvent::DeletedCompleted(n) => (NoticeKind::Success, format!("{} completed tasks deleted!", n)),
            StoreEvent::Cleared(0) => (NoticeKind::Info, "No tasks to clear!".to_string()),
            StoreEvent::Cleared(_) => (NoticeKind::Success, "All tasks cleared!".to_string()),
            StoreEvent::SaveFailed(_) => (NoticeKind::Warning, "Error saving tasks!".to_string()),
            StoreEvent::Loaded { .. } | StoreEvent::Saved => return None,
        };
        Some(notice)
    }
}

impl fmt::Display for StoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreEvent::Added(task) => write!(f, "added #{}", task.id),
            StoreEvent::Deleted(id) => write!(f, "deleted #{}", id),
            StoreEvent::Toggled(task) => write!(f, "toggled #{} (completed={})", task.id, task.completed),
            StoreEvent::Edited(task) => write!(f, "edited #{}", task.id),
            StoreEvent::CompletedAll(n) => write!(f, "completed {} tasks", n),
            StoreEvent::DeletedCompleted(n) => write!(f, "deleted {} completed tasks", n),
            StoreEvent::Cleared(n) => write!(f, "cleared {} tasks", n),
            StoreEvent::Loaded { count } => write!(f, "loaded {} tasks", count),
            StoreEvent::Saved => write!(f, "saved"),
            StoreEvent::SaveFailed(message) => write!(f, "save failed: {}", message),
        }
    }
}

/// Receives every event the store emits, after the state change is complete
pub trait StoreObserver {
    fn on_event(&mut self, event: &StoreEvent);
}

impl<F> StoreObserver for F
where
    F: FnMut(&StoreEvent),
{
    fn on_event(&mut self, event: &StoreEvent) {
        (*self)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, now};

    fn task(completed: bool) -> Task {
        let mut t = Task::new(1, "x".to_string(), Priority::Low, now());
        if completed {
            t.mark_completed(now());
        }
        t
    }

    #[test]
    fn test_notice_messages() {
        assert_eq!(
            StoreEvent::Toggled(task(true)).notice(),
            Some((NoticeKind::Success, "Task completed! 🎉".to_string()))
        );
        assert_eq!(
            StoreEvent::Toggled(task(false)).notice(),
            Some((NoticeKind::Success, "Task marked as pending".to_string()))
        );
        assert_eq!(
            StoreEvent::CompletedAll(3).notice(),
            Some((NoticeKind::Success, "3 tasks completed!".to_string()))
        );
        assert_eq!(
            StoreEvent::DeletedCompleted(0).notice(),
            Some((NoticeKind::Info, "No completed tasks to delete!".to_string()))
        );
        assert_eq!(StoreEvent::Saved.notice(), None);
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |event: &StoreEvent| seen.push(event.to_string());
            observer.on_event(&StoreEvent::Deleted(4));
        }
        assert_eq!(seen, vec!["deleted #4".to_string()]);
    }
}
