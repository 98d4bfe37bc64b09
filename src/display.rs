// Terminal rendering for tasks, stats and notices

use crate::events::NoticeKind;
use crate::humanize::{created_date, time_ago};
use crate::models::{Priority, Stats, Task};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};

const PROGRESS_WIDTH: usize = 20;

/// Make user text safe to print: control characters (escape sequences,
/// carriage returns, newlines) become spaces
pub fn sanitize(text: &str) -> String {
    text.chars().map(|c| if c.is_control() { ' ' } else { c }).collect()
}

fn priority_badge(priority: Priority) -> ColoredString {
    let label = format!("{} priority", priority);
    match priority {
        Priority::High => label.red(),
        Priority::Medium => label.yellow(),
        Priority::Low => label.green(),
    }
}

pub fn render_task(task: &Task, now: DateTime<Utc>) -> String {
    let checkbox = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let text = sanitize(&task.text);
    let text = if task.completed {
        text.dimmed().strikethrough()
    } else {
        text.bold()
    };

    let mut meta = vec![
        priority_badge(task.priority).to_string(),
        format!("Created: {}", created_date(task.created_at)),
        time_ago(task.created_at, now),
    ];
    if task.completed {
        meta.push("✅ Completed".to_string());
    }

    format!(
        "{} {:>4}  {}\n          {}",
        checkbox,
        format!("#{}", task.id).cyan(),
        text,
        meta.join(" · ").dimmed()
    )
}

/// Render `visible` tasks, or the empty-state message when there are none
///
/// `store_is_empty` picks between the first-run hint and the "adjust your
/// filter" hint.
pub fn render_list(visible: &[Task], store_is_empty: bool, now: DateTime<Utc>) -> String {
    if visible.is_empty() {
        let hint = if store_is_empty {
            "Add your first task to get started with TaskMaster Pro"
        } else {
            "Try adjusting your search or filter criteria"
        };
        return format!("📋 {}\n   {}", "No tasks found!".bold(), hint);
    }

    visible
        .iter()
        .map(|task| render_task(task, now))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn progress_bar(rate: u32) -> String {
    let filled = (rate.min(100) as usize * PROGRESS_WIDTH) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(PROGRESS_WIDTH - filled))
}

pub fn render_stats(stats: &Stats) -> String {
    format!(
        "Total: {}  Completed: {}  Pending: {}  {} {}%",
        stats.total.to_string().bold(),
        stats.completed.to_string().green(),
        stats.pending.to_string().yellow(),
        progress_bar(stats.completion_rate),
        stats.completion_rate
    )
}

pub fn render_notice(kind: NoticeKind, message: &str) -> String {
    match kind {
        NoticeKind::Success => format!("{} {}", "✔".green(), message.green()),
        NoticeKind::Info => format!("{} {}", "ℹ".blue(), message.blue()),
        NoticeKind::Warning => format!("{} {}", "⚠".yellow(), message.yellow()),
        NoticeKind::Error => format!("{} {}", "✖".red(), message.red()),
    }
}
