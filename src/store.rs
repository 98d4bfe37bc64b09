// Task store: ordered task list, id counter, view state and persistence

use crate::backend::ByteStore;
use crate::error::{Result, StoreError, validate_text};
use crate::events::{StoreEvent, StoreObserver};
use crate::export::ExportDocument;
use crate::filter::{self, TaskFilter};
use crate::models::{Priority, Stats, Task, TaskId, now};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Key the task list is stored under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "taskmaster_tasks";

/// Text of the task seeded into a store with no prior state
pub const WELCOME_TASK_TEXT: &str = "Welcome to TaskMaster Pro! Edit or delete this task to get started.";

const INITIAL_COUNTER: TaskId = 1;

fn initial_counter() -> TaskId {
    INITIAL_COUNTER
}

/// Persisted shape of the store
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(rename = "taskIdCounter", alias = "counter", default = "initial_counter")]
    counter: TaskId,
}

/// How `load` arrived at the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Prior state was read back
    Restored { count: usize },
    /// Nothing was stored yet; default content was seeded
    Seeded,
    /// Stored state was unreadable and has been replaced by default content
    Recovered,
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Key in the byte store holding the serialized task list
    pub storage_key: String,
    /// Text of the task seeded when no prior state exists; `None` seeds nothing
    pub welcome_task: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            welcome_task: Some(WELCOME_TASK_TEXT.to_string()),
        }
    }
}

/// Owner of the task list
///
/// Tasks are kept newest first. Every mutation writes the full state to the
/// backing [`ByteStore`]; a failed write is logged and reported to observers
/// as [`StoreEvent::SaveFailed`] but never fails the mutation itself.
pub struct TaskStore {
    backend: Box<dyn ByteStore>,
    options: StoreOptions,
    tasks: Vec<Task>,
    next_id: TaskId,
    filter: TaskFilter,
    search: String,
    observers: Vec<Box<dyn StoreObserver>>,
}

impl TaskStore {
    /// Create an empty store over `backend` without reading prior state
    pub fn new(backend: Box<dyn ByteStore>, options: StoreOptions) -> Self {
        Self {
            backend,
            options,
            tasks: Vec::new(),
            next_id: INITIAL_COUNTER,
            filter: TaskFilter::All,
            search: String::new(),
            observers: Vec::new(),
        }
    }

    /// Create a store and restore it from `backend`
    pub fn open(backend: Box<dyn ByteStore>, options: StoreOptions) -> Self {
        let mut store = Self::new(backend, options);
        store.load();
        store
    }

    pub fn subscribe(&mut self, observer: Box<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    // ========================================================================
    // Read API
    // ========================================================================

    /// All tasks, newest first
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Id the next added task will receive
    pub fn next_id(&self) -> TaskId {
        self.next_id
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_pending()).count()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Tasks whose text contains `search` (case-insensitive) and that match `filter`
    ///
    /// Returns an independent copy in store order.
    pub fn query(&self, filter: TaskFilter, search: &str) -> Vec<Task> {
        filter::apply(&self.tasks, filter, search)
    }

    pub fn stats(&self) -> Stats {
        Stats::from_tasks(&self.tasks)
    }

    pub fn export(&self) -> ExportDocument {
        ExportDocument::new(self.tasks.clone(), now())
    }

    // ========================================================================
    // View state
    // ========================================================================

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    /// Current search text, lower-cased
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_lowercase();
    }

    /// `query` with the current filter and search
    pub fn visible(&self) -> Vec<Task> {
        self.query(self.filter, &self.search)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Validate `text` and prepend a new pending task
    pub fn add(&mut self, text: &str, priority: Priority) -> Result<Task> {
        let text = validate_text(text)?;

        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(StoreError::IdsExhausted)?;

        let task = Task::new(id, text, priority, now());
        self.tasks.insert(0, task.clone());
        debug!(id, %priority, "Added task");

        self.persist();
        self.emit(StoreEvent::Added(task.clone()));
        Ok(task)
    }

    /// Remove the task with `id`; unknown ids are ignored
    ///
    /// Returns whether a task was removed.
    pub fn delete(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;

        if removed {
            debug!(id, "Deleted task");
        } else {
            debug!(id, "Delete of unknown task ignored");
        }

        self.persist();
        if removed {
            self.emit(StoreEvent::Deleted(id));
        }
        removed
    }

    pub fn toggle_complete(&mut self, id: TaskId) -> Result<Task> {
        let task = self.get_mut(id)?;
        task.toggle(now());
        let task = task.clone();
        debug!(id, completed = task.completed, "Toggled task");

        self.persist();
        self.emit(StoreEvent::Toggled(task.clone()));
        Ok(task)
    }

    /// Replace the text of task `id`, keeping every other field
    pub fn edit(&mut self, id: TaskId, text: &str) -> Result<Task> {
        let text = validate_text(text)?;

        let task = self.get_mut(id)?;
        task.text = text;
        let task = task.clone();
        debug!(id, "Edited task");

        self.persist();
        self.emit(StoreEvent::Edited(task.clone()));
        Ok(task)
    }

    /// Complete every pending task; returns how many changed
    pub fn mark_all_complete(&mut self) -> usize {
        let at = now();
        let mut count = 0;
        for task in self.tasks.iter_mut().filter(|t| t.is_pending()) {
            task.mark_completed(at);
            count += 1;
        }
        debug!(count, "Marked all tasks complete");

        if count > 0 {
            self.persist();
        }
        self.emit(StoreEvent::CompletedAll(count));
        count
    }

    /// Remove every completed task; returns how many were removed
    pub fn delete_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let count = before - self.tasks.len();
        debug!(count, "Deleted completed tasks");

        if count > 0 {
            self.persist();
        }
        self.emit(StoreEvent::DeletedCompleted(count));
        count
    }

    /// Remove every task and reset the id counter; returns how many were removed
    pub fn clear_all(&mut self) -> usize {
        let count = self.tasks.len();
        self.tasks.clear();
        self.next_id = INITIAL_COUNTER;
        info!(count, "Cleared all tasks");

        self.persist();
        self.emit(StoreEvent::Cleared(count));
        count
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the full task list and counter to the backing store
    pub fn save(&mut self) -> Result<()> {
        let snapshot = SnapshotRef {
            tasks: &self.tasks,
            counter: self.next_id,
        };
        let bytes = serde_json::to_vec(&snapshot).map_err(|e| StoreError::Persistence(e.into()))?;

        self.backend
            .set(&self.options.storage_key, &bytes)
            .map_err(StoreError::Persistence)?;

        debug!(key = %self.options.storage_key, count = self.tasks.len(), "Saved tasks");
        Ok(())
    }

    /// Replace in-memory state with the persisted state
    ///
    /// Missing, unreadable or malformed data falls back to the seeded default
    /// content; this never fails.
    pub fn load(&mut self) -> LoadOutcome {
        let key = self.options.storage_key.clone();

        let outcome = match self.backend.get(&key) {
            Ok(Some(bytes)) => match Self::decode(&bytes) {
                Ok(snapshot) => {
                    let count = snapshot.tasks.len();
                    self.tasks = snapshot.tasks;
                    self.next_id = snapshot.counter;
                    info!(key = %key, count, "Restored tasks");
                    LoadOutcome::Restored { count }
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Stored tasks are corrupt, starting fresh");
                    self.seed();
                    LoadOutcome::Recovered
                }
            },
            Ok(None) => {
                info!(key = %key, "No stored tasks, seeding defaults");
                self.seed();
                LoadOutcome::Seeded
            }
            Err(e) => {
                let message = format!("{:#}", e);
                warn!(key = %key, error = %message, "Failed to read stored tasks, starting fresh");
                self.seed();
                LoadOutcome::Recovered
            }
        };

        self.emit(StoreEvent::Loaded { count: self.tasks.len() });
        outcome
    }

    fn decode(bytes: &[u8]) -> eyre::Result<Snapshot> {
        let mut snapshot: Snapshot = serde_json::from_slice(bytes)?;

        let mut seen = HashSet::new();
        for task in &snapshot.tasks {
            if !seen.insert(task.id) {
                return Err(eyre::eyre!("Duplicate task id: {}", task.id));
            }
        }

        for task in snapshot.tasks.iter_mut() {
            if task.completed != task.completed_at.is_some() {
                warn!(id = task.id, "Repairing completion timestamp");
                task.completed_at = if task.completed { Some(task.created_at) } else { None };
            }
        }

        let mut min_counter = INITIAL_COUNTER;
        for task in &snapshot.tasks {
            let next = task.id.checked_add(1).ok_or_else(|| eyre::eyre!("Task id out of range: {}", task.id))?;
            min_counter = min_counter.max(next);
        }
        if snapshot.counter < min_counter {
            warn!(
                stored = snapshot.counter,
                repaired = min_counter,
                "Stored id counter is behind existing ids, raising it"
            );
            snapshot.counter = min_counter;
        }

        Ok(snapshot)
    }

    fn seed(&mut self) {
        self.tasks.clear();
        self.next_id = INITIAL_COUNTER;

        if let Some(text) = self.options.welcome_task.clone() {
            match validate_text(&text) {
                Ok(text) => {
                    self.tasks.push(Task::new(INITIAL_COUNTER, text, Priority::Medium, now()));
                    self.next_id = INITIAL_COUNTER + 1;
                }
                Err(e) => warn!(error = %e, "Configured welcome task is invalid, seeding nothing"),
            }
        }
    }

    /// Save after a mutation; failures are reported, not returned
    fn persist(&mut self) {
        match self.save() {
            Ok(()) => self.emit(StoreEvent::Saved),
            Err(e) => {
                let message = match &e {
                    StoreError::Persistence(report) => format!("{:#}", report),
                    other => other.to_string(),
                };
                warn!(error = %message, "Error saving tasks");
                self.emit(StoreEvent::SaveFailed(message));
            }
        }
    }

    fn get_mut(&mut self, id: TaskId) -> Result<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id).ok_or(StoreError::NotFound(id))
    }

    fn emit(&mut self, event: StoreEvent) {
        for observer in self.observers.iter_mut() {
            observer.on_event(&event);
        }
    }
}

/// Borrowing twin of [`Snapshot`] so saving does not clone the task list
#[derive(Serialize)]
struct SnapshotRef<'a> {
    tasks: &'a [Task],
    #[serde(rename = "taskIdCounter")]
    counter: TaskId,
}
