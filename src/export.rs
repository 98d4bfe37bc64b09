// Export of the full task list to a standalone JSON document

use crate::models::Task;
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub tasks: Vec<Task>,
    pub export_date: DateTime<Utc>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
}

impl ExportDocument {
    pub fn new(tasks: Vec<Task>, export_date: DateTime<Utc>) -> Self {
        let completed_tasks = tasks.iter().filter(|t| t.completed).count();
        Self {
            total_tasks: tasks.len(),
            completed_tasks,
            tasks,
            export_date,
        }
    }

    /// `taskmaster-export-YYYY-MM-DD.json` for the export date
    pub fn default_file_name(&self) -> String {
        format!("taskmaster-export-{}.json", self.export_date.format("%Y-%m-%d"))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize export")
    }
}

/// Write `doc` as pretty JSON
///
/// A directory `path` receives a file named by [`ExportDocument::default_file_name`].
/// Returns the path actually written.
pub fn write_export(path: &Path, doc: &ExportDocument) -> Result<PathBuf> {
    let target = if path.is_dir() {
        path.join(doc.default_file_name())
    } else {
        path.to_path_buf()
    };

    fs::write(&target, doc.to_json_pretty()?).with_context(|| format!("Failed to write export to {}", target.display()))?;
    info!(path = ?target, count = doc.total_tasks, "Exported tasks");

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn export_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
    }

    fn doc() -> ExportDocument {
        let mut done = Task::new(2, "Done".to_string(), Priority::High, export_date());
        done.mark_completed(export_date());
        let open = Task::new(1, "Open".to_string(), Priority::Low, export_date());
        ExportDocument::new(vec![done, open], export_date())
    }

    #[test]
    fn test_document_totals() {
        let doc = doc();
        assert_eq!(doc.total_tasks, 2);
        assert_eq!(doc.completed_tasks, 1);
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(doc().default_file_name(), "taskmaster-export-2026-10-18.json");
    }

    #[test]
    fn test_json_shape() {
        let json: serde_json::Value = serde_json::from_str(&doc().to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["totalTasks"], 2);
        assert_eq!(json["completedTasks"], 1);
        assert_eq!(json["exportDate"], "2026-10-18T09:30:00Z");
        assert_eq!(json["tasks"][0]["id"], 2);
    }

    #[test]
    fn test_write_export_into_directory() {
        let temp = TempDir::new().unwrap();
        let written = write_export(temp.path(), &doc()).unwrap();

        assert_eq!(written, temp.path().join("taskmaster-export-2026-10-18.json"));
        let back: ExportDocument = serde_json::from_str(&fs::read_to_string(&written).unwrap()).unwrap();
        assert_eq!(back.tasks, doc().tasks);
    }

    #[test]
    fn test_write_export_to_file_path() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("backup.json");
        let written = write_export(&target, &doc()).unwrap();
        assert_eq!(written, target);
        assert!(target.exists());
    }
}
