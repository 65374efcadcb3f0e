//! Dependency propagation after a task's dates change.
//!
//! Restores finish-to-start consistency around one changed task:
//! 1. Reject the change if the dependents graph reachable from it has a cycle
//! 2. Collect the affected set (transitive dependents)
//! 3. Shift violating dependents forward level by level, re-checking each
//!    shifted task's own dependents in turn
//! 4. Recompute every touched ancestor's range from its children
//!
//! Every function takes a slice and returns a fresh collection; the input is
//! never mutated.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::error::EngineError;
use crate::store::TaskStore;
use crate::types::Task;

/// Result of propagating one change through a task collection.
#[derive(Debug, Clone)]
pub struct PropagationOutcome {
    pub tasks: Vec<Task>,
    /// Transitive dependents of the changed task, in discovery order.
    pub affected: Vec<String>,
    /// Tasks whose dates were pushed forward, each listed once.
    pub shifted: Vec<String>,
    /// Ancestors whose aggregate range actually changed.
    pub recomputed_parents: Vec<String>,
}

impl PropagationOutcome {
    fn unchanged(tasks: &[Task]) -> Self {
        Self {
            tasks: tasks.to_vec(),
            affected: Vec::new(),
            shifted: Vec::new(),
            recomputed_parents: Vec::new(),
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The affected tasks as they stand after propagation.
    pub fn affected_tasks(&self) -> Vec<Task> {
        self.affected
            .iter()
            .filter_map(|id| self.task(id).cloned())
            .collect()
    }
}

/// Set `task_id` to `[start, end]` and propagate.
///
/// An unknown id is a no-op. An inverted range is rejected before anything
/// changes.
pub fn move_task(
    tasks: &[Task],
    task_id: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<PropagationOutcome, EngineError> {
    let Some(idx) = tasks.iter().position(|t| t.id == task_id) else {
        log::debug!("Move ignored: task {} not in collection", task_id);
        return Ok(PropagationOutcome::unchanged(tasks));
    };

    if end < start {
        return Err(EngineError::InvalidDateRange {
            task_id: task_id.to_string(),
            start,
            end,
        });
    }

    let mut updated = tasks.to_vec();
    updated[idx].set_dates(start, end);
    propagate_from(&updated, task_id)
}

/// Propagate from a task whose dates are already in place.
///
/// Running this on its own output changes nothing.
pub fn propagate_from(tasks: &[Task], changed_id: &str) -> Result<PropagationOutcome, EngineError> {
    let store = TaskStore::new(tasks);
    if !store.contains(changed_id) {
        log::debug!("Propagation ignored: task {} not in collection", changed_id);
        return Ok(PropagationOutcome::unchanged(tasks));
    }

    if let Some(cycle) = find_cycle(&store, changed_id) {
        log::warn!("Refusing to propagate from {}: cycle {:?}", changed_id, cycle);
        return Err(EngineError::CycleDetected(cycle));
    }

    let affected = affected_set(&store, changed_id);
    let mut result = tasks.to_vec();
    let shifted = shift_dependents(&store, &mut result, changed_id);

    let mut touched: Vec<&str> = Vec::with_capacity(shifted.len() + 1);
    touched.push(changed_id);
    touched.extend(shifted.iter().map(String::as_str));
    let recomputed_parents = recompute_ancestors(&store, &mut result, &touched);

    log::debug!(
        "Propagated {}: {} affected, {} shifted, {} parents recomputed",
        changed_id,
        affected.len(),
        shifted.len(),
        recomputed_parents.len()
    );

    Ok(PropagationOutcome {
        tasks: result,
        affected,
        shifted,
        recomputed_parents,
    })
}

/// All tasks that transitively depend on `id`, breadth-first, excluding `id`.
pub fn affected_set(store: &TaskStore, id: &str) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(id);
    let mut order = Vec::new();
    let mut frontier = vec![id.to_string()];

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for current in &frontier {
            for dependent in store.dependents_of(current) {
                if seen.insert(dependent.id.as_str()) {
                    order.push(dependent.id.clone());
                    next.push(dependent.id.clone());
                }
            }
        }
        frontier = next;
    }

    order
}

/// Depth-first search over "depends on me" edges from `start`. Returns the
/// cycle path (first id repeated at the end) if a node is reached again while
/// still on the active path.
pub fn find_cycle(store: &TaskStore, start: &str) -> Option<Vec<String>> {
    let start_idx = store.index_of(start)?;

    let tasks = store.tasks();
    // (task index, next dependent to visit)
    let mut frames: Vec<(usize, usize)> = vec![(start_idx, 0)];
    let mut on_path: HashSet<usize> = HashSet::from([start_idx]);
    let mut finished: HashSet<usize> = HashSet::new();

    while let Some(&(node, next)) = frames.last() {
        let dependents = store.dependent_indices(&tasks[node].id);
        if next >= dependents.len() {
            on_path.remove(&node);
            finished.insert(node);
            frames.pop();
            continue;
        }

        if let Some(frame) = frames.last_mut() {
            frame.1 += 1;
        }
        let child = dependents[next];

        if on_path.contains(&child) {
            let from = frames.iter().position(|&(i, _)| i == child).unwrap_or(0);
            let mut cycle: Vec<String> = frames[from..]
                .iter()
                .map(|&(i, _)| tasks[i].id.clone())
                .collect();
            cycle.push(tasks[child].id.clone());
            return Some(cycle);
        }

        if !finished.contains(&child) {
            on_path.insert(child);
            frames.push((child, 0));
        }
    }

    None
}

/// Push dependents forward until none starts before a changed predecessor
/// ends. Only edges out of tasks that actually moved are re-checked.
fn shift_dependents(store: &TaskStore, result: &mut [Task], changed_id: &str) -> Vec<String> {
    let mut shifted = Vec::new();
    let mut shifted_set: HashSet<usize> = HashSet::new();

    let Some(changed_idx) = store.index_of(changed_id) else {
        return shifted;
    };
    let mut pending = vec![changed_idx];

    while let Some(current) = pending.pop() {
        let end = result[current].end_date;
        let mut moved_here = Vec::new();

        for &dep in store.dependent_indices(&result[current].id) {
            if result[dep].start_date < end {
                let delta = end - result[dep].start_date;
                result[dep].shift_by(delta);
                log::debug!(
                    "Shifted {} by {}h to follow {}",
                    result[dep].id,
                    delta.num_hours(),
                    result[current].id
                );
                if shifted_set.insert(dep) {
                    shifted.push(result[dep].id.clone());
                }
                moved_here.push(dep);
            }
        }

        // Reverse so the first dependent is settled first.
        pending.extend(moved_here.into_iter().rev());
    }

    shifted
}

/// Walk up from each touched task and reset every ancestor to
/// `[min(children.start), max(children.end)]`.
fn recompute_ancestors(store: &TaskStore, result: &mut [Task], touched: &[&str]) -> Vec<String> {
    let mut recomputed = Vec::new();
    let mut recorded: HashSet<String> = HashSet::new();

    for id in touched {
        for ancestor in store.ancestors_of(id) {
            let Some(parent_idx) = store.index_of(&ancestor.id) else {
                continue;
            };
            let children = store.child_indices(&ancestor.id);

            let start = children.iter().map(|&i| result[i].start_date).min();
            let end = children.iter().map(|&i| result[i].end_date).max();
            let (Some(start), Some(end)) = (start, end) else {
                continue;
            };

            let parent = &mut result[parent_idx];
            if parent.start_date != start || parent.end_date != end {
                parent.set_dates(start, end);
                if recorded.insert(parent.id.clone()) {
                    recomputed.push(parent.id.clone());
                }
            }
        }
    }

    recomputed
}
