//! Read-only view over a task collection.
//!
//! Lookups by id, parent/child traversal and the inverse dependency index
//! ("who depends on me"). Ids that don't resolve are treated as absent
//! relationships, never as errors.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::types::{Task, TaskLevel};

pub struct TaskStore<'a> {
    tasks: &'a [Task],
    by_id: HashMap<&'a str, usize>,
    /// Inverse dependency edges: task id → indices of tasks that list it.
    dependents: HashMap<&'a str, Vec<usize>>,
}

impl<'a> TaskStore<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        let mut by_id = HashMap::with_capacity(tasks.len());
        let mut dependents: HashMap<&'a str, Vec<usize>> = HashMap::new();

        for (idx, task) in tasks.iter().enumerate() {
            // First occurrence wins on duplicate ids.
            by_id.entry(task.id.as_str()).or_insert(idx);

            let mut seen = HashSet::new();
            for dep in &task.dependencies {
                if seen.insert(dep.as_str()) {
                    dependents.entry(dep.as_str()).or_default().push(idx);
                }
            }
        }

        Self {
            tasks,
            by_id,
            dependents,
        }
    }

    pub fn tasks(&self) -> &'a [Task] {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&'a Task> {
        self.by_id.get(id).map(|&idx| &self.tasks[idx])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.tasks.iter().map(|t| t.id.as_str())
    }

    /// Direct dependents of `id`, in collection order.
    pub fn dependents_of(&self, id: &str) -> Vec<&'a Task> {
        self.dependents
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| &self.tasks[i]).collect())
            .unwrap_or_default()
    }

    /// Indices of the direct dependents of `id`, in collection order.
    pub fn dependent_indices(&self, id: &str) -> &[usize] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn child_indices(&self, id: &str) -> Vec<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.parent_id.as_deref() == Some(id))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn children_of(&self, id: &str) -> Vec<&'a Task> {
        self.tasks
            .iter()
            .filter(|t| t.parent_id.as_deref() == Some(id))
            .collect()
    }

    pub fn parent_of(&self, task: &Task) -> Option<&'a Task> {
        let parent_id = task.parent_id.as_deref()?;
        let parent = self.get(parent_id);
        if parent.is_none() {
            log::debug!("Task {} has unknown parent {}", task.id, parent_id);
        }
        parent
    }

    /// Parent chain of `id`, nearest first. Stops at the first repeated id so
    /// a malformed parent loop can't spin forever.
    pub fn ancestors_of(&self, id: &str) -> Vec<&'a Task> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(id);

        let mut current = self.get(id);
        while let Some(task) = current {
            let Some(parent) = self.parent_of(task) else {
                break;
            };
            if !seen.insert(parent.id.as_str()) {
                log::warn!("Parent loop detected at task {}", parent.id);
                break;
            }
            chain.push(parent);
            current = Some(parent);
        }

        chain
    }

    /// Day-level tasks whose start falls on `date`, in collection order.
    pub fn day_tasks_on(&self, date: NaiveDate) -> Vec<&'a Task> {
        self.tasks
            .iter()
            .filter(|t| t.level == TaskLevel::Day && t.start_date.date() == date)
            .collect()
    }
}
