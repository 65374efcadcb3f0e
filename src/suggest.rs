//! Post-move advice: split long tasks, re-sequence wide ripples.
//!
//! Suggestions are never applied automatically. `apply_suggestion` is the
//! only path that changes data, and only splits change anything.

use std::collections::HashSet;

use chrono::Duration;

use crate::propagate::PropagationOutcome;
use crate::types::{AiSuggestion, EngineConfig, SuggestionPreview, SuggestionType, Task};

/// Suggestions for a task that was just moved, given the propagation result.
pub fn suggest_after_move(
    moved_id: &str,
    outcome: &PropagationOutcome,
    config: &EngineConfig,
) -> Vec<AiSuggestion> {
    let mut suggestions = Vec::new();

    if let Some(moved) = outcome.task(moved_id) {
        if let Some(split) = split_suggestion(moved, config.split_threshold_days) {
            suggestions.push(split);
        }
    }

    let affected = outcome.affected_tasks();
    if let Some(reorganize) = reorganize_suggestion(&affected, config.reorganize_min_affected) {
        suggestions.push(reorganize);
    }

    suggestions
}

/// Propose two halves for a task longer than `threshold_days`.
///
/// The first half keeps the original start, dependencies and `ceil(d/2)`
/// days; the second starts where the first ends, depends only on the first
/// and ends where the original ended.
pub fn split_suggestion(task: &Task, threshold_days: i64) -> Option<AiSuggestion> {
    if task.duration <= threshold_days {
        return None;
    }

    let first_days = (task.duration + 1) / 2;
    let boundary = task.start_date + Duration::days(first_days);
    let first_id = format!("{}-1", task.id);

    let mut first = task.clone();
    first.id = first_id.clone();
    first.title = format!("{} (part 1)", task.title);
    first.set_dates(task.start_date, boundary);

    let mut second = task.clone();
    second.id = format!("{}-2", task.id);
    second.title = format!("{} (part 2)", task.title);
    second.dependencies = vec![first_id];
    second.set_dates(boundary, task.end_date.max(boundary));

    Some(AiSuggestion {
        suggestion_type: SuggestionType::Split,
        target_task_ids: vec![task.id.clone()],
        reason: format!(
            "Task runs {} days, over the {}-day limit; split it into smaller pieces",
            task.duration, threshold_days
        ),
        preview: SuggestionPreview {
            before: vec![task.clone()],
            after: vec![first, second],
        },
        impact: "Splits into 2 tasks; total span unchanged".to_string(),
    })
}

/// Flag a ripple that touched more than `min_affected` tasks.
pub fn reorganize_suggestion(affected: &[Task], min_affected: usize) -> Option<AiSuggestion> {
    if affected.len() <= min_affected {
        return None;
    }

    Some(AiSuggestion {
        suggestion_type: SuggestionType::Reorganize,
        target_task_ids: affected.iter().map(|t| t.id.clone()).collect(),
        reason: format!(
            "This change affects {} downstream tasks; consider re-sequencing them",
            affected.len()
        ),
        preview: SuggestionPreview {
            before: affected.to_vec(),
            after: affected.to_vec(),
        },
        impact: format!("{} tasks need rescheduling", affected.len()),
    })
}

/// Apply an accepted suggestion to a task collection.
///
/// Split: the targets are removed, the preview's `after` tasks appended, and
/// any remaining task that depended on a removed target now depends on the
/// last inserted half. Reorganize: no structural change.
pub fn apply_suggestion(tasks: &[Task], suggestion: &AiSuggestion) -> Vec<Task> {
    match suggestion.suggestion_type {
        SuggestionType::Reorganize => {
            log::debug!(
                "Reorganize accepted for {} tasks; nothing to change",
                suggestion.target_task_ids.len()
            );
            tasks.to_vec()
        }
        SuggestionType::Split => {
            let removed = |id: &str| suggestion.target_task_ids.iter().any(|t| t == id);
            let tail_id = suggestion.preview.after.last().map(|t| t.id.clone());

            let mut result: Vec<Task> = tasks
                .iter()
                .filter(|t| !removed(t.id.as_str()))
                .cloned()
                .map(|mut t| {
                    if let Some(tail) = &tail_id {
                        let mut rewired = false;
                        for dep in t.dependencies.iter_mut() {
                            if removed(dep.as_str()) {
                                *dep = tail.clone();
                                rewired = true;
                            }
                        }
                        if rewired {
                            let mut seen = HashSet::new();
                            t.dependencies.retain(|d| seen.insert(d.clone()));
                        }
                    }
                    t
                })
                .collect();

            result.extend(suggestion.preview.after.iter().cloned());
            log::info!(
                "Split applied: {:?} -> {} tasks",
                suggestion.target_task_ids,
                suggestion.preview.after.len()
            );
            result
        }
    }
}
