//! Task list
//!
//! Newest tasks first, saved to the store after every change.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::persistence::{Store, keys};
use crate::platform::Clock;
use crate::present::{NoticeKind, TaskView};

/// A to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

/// Counts shown next to the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
}

pub struct TaskList {
    tasks: Vec<Task>,
    store: Rc<Store>,
    clock: Rc<dyn Clock>,
    view: Box<dyn TaskView>,
}

impl TaskList {
    pub fn new(store: Rc<Store>, clock: Rc<dyn Clock>, view: Box<dyn TaskView>) -> Self {
        let mut list = Self {
            tasks: Vec::new(),
            store,
            clock,
            view,
        };
        list.reload();
        list
    }

    /// Re-read the list from the store and re-render
    pub fn reload(&mut self) {
        self.tasks = self.store.get(keys::TASKS, Vec::new());
        self.render();
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats {
            total: self.tasks.len(),
            completed: self.completed_count(),
        }
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Add a task from user input. Blank input is rejected.
    ///
    /// Returns the new task's id.
    pub fn add(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            self.view.notify("Enter a valid task", NoticeKind::Error);
            return None;
        }

        let now = self.clock.now_ms();
        let id = crate::unique_id(now);
        self.tasks.insert(
            0,
            Task {
                id: id.clone(),
                text: text.to_string(),
                completed: false,
                created_at: now,
                completed_at: None,
            },
        );
        self.commit();
        self.view.notify("Task added", NoticeKind::Success);
        Some(id)
    }

    /// Flip a task's completion. Returns the new state, `None` for an
    /// unknown id.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let now = self.clock.now_ms();
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.completed = !task.completed;
        task.completed_at = task.completed.then_some(now);
        let completed = task.completed;

        self.commit();
        if completed {
            self.view.notify("Task completed!", NoticeKind::Success);
        }
        Some(completed)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        self.tasks.remove(index);
        self.commit();
        self.view.notify("Task removed", NoticeKind::Info);
        true
    }

    /// Drop every completed task. Unconditional; callers confirm first.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.commit();
            let message = format!("{} task(s) removed", removed);
            self.view.notify(&message, NoticeKind::Success);
        }
        removed
    }

    /// Write the list to the store
    pub fn save(&mut self) -> bool {
        match self.store.set(keys::TASKS, &self.tasks) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Could not save tasks: {}", e);
                self.view.notify("Could not save tasks", NoticeKind::Error);
                false
            }
        }
    }

    fn commit(&mut self) {
        self.save();
        self.render();
    }

    fn render(&mut self) {
        let stats = self.stats();
        self.view.render_tasks(&self.tasks, stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[test]
    fn test_add_trims_and_prepends() {
        let h = Harness::new(1_000);
        let mut list = h.task_list();
        assert!(list.add("   ").is_none());
        let first = list.add("  write report ").unwrap();
        h.clock.set(2_000);
        let second = list.add("review").unwrap();

        assert_eq!(list.tasks()[0].id, second);
        assert_eq!(list.tasks()[1].id, first);
        assert_eq!(list.tasks()[1].text, "write report");
        assert_eq!(list.tasks()[1].created_at, 1_000);

        let stored: Vec<Task> = h.store.get(keys::TASKS, Vec::new());
        assert_eq!(stored, list.tasks());
    }

    #[test]
    fn test_toggle_records_completion_time() {
        let h = Harness::new(0);
        let mut list = h.task_list();
        let id = list.add("a").unwrap();
        h.clock.set(500);
        assert_eq!(list.toggle(&id), Some(true));
        assert_eq!(list.tasks()[0].completed_at, Some(500));
        assert_eq!(list.toggle(&id), Some(false));
        assert_eq!(list.tasks()[0].completed_at, None);
        assert_eq!(list.toggle("nope"), None);
    }

    #[test]
    fn test_delete_and_clear_completed() {
        let h = Harness::new(0);
        let mut list = h.task_list();
        let a = list.add("a").unwrap();
        let b = list.add("b").unwrap();
        let c = list.add("c").unwrap();
        list.toggle(&a);
        list.toggle(&c);

        assert!(list.delete(&b));
        assert!(!list.delete(&b));
        assert_eq!(list.stats(), TaskStats { total: 2, completed: 2 });
        assert_eq!(list.clear_completed(), 2);
        assert_eq!(list.clear_completed(), 0);
        assert!(list.tasks().is_empty());
    }

    #[test]
    fn test_reload_reads_store() {
        let h = Harness::new(0);
        {
            let mut list = h.task_list();
            list.add("persisted");
        }
        let list = h.task_list();
        assert_eq!(list.tasks().len(), 1);
        assert_eq!(h.view.log().task_renders.last().map(|s| s.total), Some(1));
    }
}
