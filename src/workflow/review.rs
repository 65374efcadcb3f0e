//! Review drafting for the end of a day.

use chrono::NaiveDate;

use crate::store::TaskStore;
use crate::types::{DailyPlan, IncompleteEntry, Plan, Review, Task};

/// Pre-fill a review for `date` from that day's plan.
///
/// Referenced tasks that are completed go to `completed_tasks`; every other
/// resolvable task becomes an incomplete entry with its blocked reason (if
/// any) as the reason. A day with no plan yields an empty review.
pub fn draft_review(plan: &Plan, date: NaiveDate, tomorrow_available_hours: f64) -> Review {
    let store = TaskStore::new(&plan.tasks);
    let mut completed_tasks = Vec::new();
    let mut incomplete_tasks = Vec::new();

    if let Some(day) = plan.daily_plan(date) {
        for task in day.scheduled_ids().into_iter().filter_map(|id| store.get(id)) {
            if task.is_completed() {
                completed_tasks.push(task.id.clone());
            } else {
                incomplete_tasks.push(IncompleteEntry {
                    task_id: task.id.clone(),
                    reason: task.blocked_reason.clone().unwrap_or_default(),
                });
            }
        }
    } else {
        log::debug!("No daily plan for {}; drafting an empty review", date);
    }

    Review {
        date,
        completed_tasks,
        incomplete_tasks,
        tomorrow_available_hours,
        tomorrow_priority: None,
        notes: None,
    }
}

/// Percentage (0-100, rounded) of the day's referenced tasks that are completed.
pub fn completion_rate(daily: &DailyPlan, tasks: &[Task]) -> u32 {
    let store = TaskStore::new(tasks);
    let referenced: Vec<&Task> = daily
        .scheduled_ids()
        .into_iter()
        .filter_map(|id| store.get(id))
        .collect();

    if referenced.is_empty() {
        return 0;
    }

    let done = referenced.iter().filter(|t| t.is_completed()).count();
    ((done as f64 / referenced.len() as f64) * 100.0).round() as u32
}
