use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::reminder::ReminderSpec;
use crate::utils::checklist_progress;

const NO_DESCRIPTION: &str = "Tidak ada deskripsi";

/// Namespaced entity identifier, e.g. `note-42` or `task-7`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn note(id: &RawId) -> Self {
        EntityId(format!("note-{}", id))
    }

    pub fn task(id: &RawId) -> Self {
        EntityId(format!("task-{}", id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend ids arrive as numbers from one API version and strings from another
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawId(String);

impl RawId {
    pub fn new(id: impl Into<String>) -> Self {
        RawId(id.into())
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RawId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum AnyId {
            Number(i64),
            Text(String),
        }

        Ok(match AnyId::deserialize(deserializer)? {
            AnyId::Number(n) => RawId(n.to_string()),
            AnyId::Text(s) => RawId(s),
        })
    }
}

/// Anything the reminder scheduler can notify about
pub trait Remindable {
    fn entity_id(&self) -> EntityId;
    fn title(&self) -> &str;
    /// Short description shown under the alert title
    fn summary(&self) -> String;
    fn reminder(&self) -> Option<ReminderSpec>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: RawId,
    pub title: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub reminder: Option<ReminderSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

/// Reminder option picked in the task form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskReminder {
    #[default]
    None,
    #[serde(rename = "1-hour")]
    OneHour,
    #[serde(rename = "1-day")]
    OneDay,
    SameDay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: RawId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// ISO 8601 deadline, date or date-time
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, rename = "ChecklistItems", alias = "checklist")]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub reminder: TaskReminder,
}

impl Note {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: RawId::new(id),
            title: title.into(),
            text: None,
            tags: Vec::new(),
            checklist: Vec::new(),
            reminder: None,
        }
    }
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: RawId::new(id),
            title: title.into(),
            description: None,
            deadline: None,
            priority: Priority::default(),
            status: TaskStatus::default(),
            checklist: Vec::new(),
            reminder: TaskReminder::default(),
        }
    }
}

fn summarize(text: Option<&str>, checklist: &[ChecklistItem]) -> String {
    let mut summary = text
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(NO_DESCRIPTION)
        .to_string();
    if !checklist.is_empty() {
        let done = checklist.iter().filter(|item| item.completed).count();
        summary.push_str(&format!(
            "\nChecklist: {}/{} ({}%)",
            done,
            checklist.len(),
            checklist_progress(checklist)
        ));
    }
    summary
}

impl Remindable for Note {
    fn entity_id(&self) -> EntityId {
        EntityId::note(&self.id)
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn summary(&self) -> String {
        summarize(self.text.as_deref(), &self.checklist)
    }

    fn reminder(&self) -> Option<ReminderSpec> {
        self.reminder.clone()
    }
}

impl Remindable for Task {
    fn entity_id(&self) -> EntityId {
        EntityId::task(&self.id)
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn summary(&self) -> String {
        summarize(self.description.as_deref(), &self.checklist)
    }

    // Finished tasks and tasks without a reminder option never notify
    fn reminder(&self) -> Option<ReminderSpec> {
        if self.reminder == TaskReminder::None || self.status == TaskStatus::Done {
            return None;
        }
        self.deadline
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(ReminderSpec::iso)
    }
}

/// An entity export as returned by the backend list endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityExport {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl EntityExport {
    /// Every entity in the export, notes first
    pub fn entities(&self) -> impl Iterator<Item = &dyn Remindable> {
        self.notes
            .iter()
            .map(|n| n as &dyn Remindable)
            .chain(self.tasks.iter().map(|t| t as &dyn Remindable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        let json = r#"{
            "notes": [{"id": 12, "title": "Belanja"}],
            "tasks": [{"id": "a7f", "title": "Laporan"}]
        }"#;
        let export: EntityExport = serde_json::from_str(json).expect("valid export");
        assert_eq!(export.notes[0].entity_id().as_str(), "note-12");
        assert_eq!(export.tasks[0].entity_id().as_str(), "task-a7f");
    }

    #[test]
    fn test_note_summary_falls_back_and_counts_checklist() {
        let mut note = Note::new("1", "Belanja");
        assert_eq!(note.summary(), "Tidak ada deskripsi");

        note.text = Some("Pasar pagi".to_string());
        note.checklist = vec![
            ChecklistItem { text: "Telur".to_string(), completed: true },
            ChecklistItem { text: "Beras".to_string(), completed: false },
        ];
        assert_eq!(note.summary(), "Pasar pagi\nChecklist: 1/2 (50%)");
    }

    #[test]
    fn test_task_reminder_follows_deadline() {
        let json = r#"{"id": 3, "title": "Sidang", "deadline": "2025-03-14T09:30:00Z",
                       "reminder": "1-hour", "status": "in-progress", "priority": "high"}"#;
        let mut task: Task = serde_json::from_str(json).expect("valid task");
        assert_eq!(task.reminder(), Some(ReminderSpec::iso("2025-03-14T09:30:00Z")));

        task.status = TaskStatus::Done;
        assert_eq!(task.reminder(), None);

        task.status = TaskStatus::Todo;
        task.reminder = TaskReminder::None;
        assert_eq!(task.reminder(), None);
    }

    #[test]
    fn test_demo_export_parses() {
        let export: EntityExport =
            serde_json::from_str(include_str!("../demos/entities.json")).expect("demo export");
        let with_reminder = export.entities().filter(|e| e.reminder().is_some()).count();
        assert_eq!(export.notes.len(), 4);
        assert_eq!(export.tasks.len(), 2);
        assert_eq!(with_reminder, 4);
    }

    #[test]
    fn test_entities_iterates_notes_then_tasks() {
        let export = EntityExport {
            notes: vec![Note::new("1", "a")],
            tasks: vec![Task::new("1", "b")],
        };
        let ids: Vec<String> = export.entities().map(|e| e.entity_id().to_string()).collect();
        assert_eq!(ids, vec!["note-1", "task-1"]);
    }
}
