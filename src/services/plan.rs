// Plan service
// Plan-level operations: every function takes a Plan and hands back a new one.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::allocate::daily_plan_for;
use crate::error::EngineError;
use crate::history::ReviewHistory;
use crate::propagate;
use crate::suggest;
use crate::types::{
    AiSuggestion, DailyPlan, EngineConfig, Plan, Review, SuggestionType, Task, TaskStatus,
};
use crate::util;
use crate::workflow::reconcile::{reconcile_review, tomorrow_of};

/// One requested date change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub task_id: String,
    #[serde(with = "util::flexible_datetime")]
    pub start: NaiveDateTime,
    #[serde(with = "util::flexible_datetime")]
    pub end: NaiveDateTime,
}

/// What a single move did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveReport {
    pub task_id: String,
    pub affected: Vec<String>,
    pub shifted: Vec<String>,
    pub recomputed_parents: Vec<String>,
    pub suggestions: Vec<AiSuggestion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub plan: Plan,
    /// One report per applied move, in order.
    pub moves: Vec<MoveReport>,
}

impl MoveOutcome {
    pub fn suggestions(&self) -> impl Iterator<Item = &AiSuggestion> {
        self.moves.iter().flat_map(|m| m.suggestions.iter())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub plan: Plan,
    #[serde(with = "util::flexible_date")]
    pub tomorrow: NaiveDate,
    pub overflow: Vec<String>,
    pub escalated: Vec<String>,
}

/// Check every task before a mutation; the first violation wins.
pub fn validate_tasks(tasks: &[Task]) -> Result<(), EngineError> {
    tasks.iter().try_for_each(Task::validate)
}

/// Move one task, propagate, and collect suggestions.
pub fn move_task(
    plan: &Plan,
    task_id: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    config: &EngineConfig,
) -> Result<MoveOutcome, EngineError> {
    let request = MoveRequest {
        task_id: task_id.to_string(),
        start,
        end,
    };
    move_tasks(plan, std::slice::from_ref(&request), config)
}

/// Apply moves one at a time, in order.
///
/// Each move fully settles (propagation and parent ranges) before the next
/// is applied, so a task downstream of two moved tasks ends up satisfying
/// both. Any failure aborts the batch and leaves `plan` untouched.
pub fn move_tasks(
    plan: &Plan,
    moves: &[MoveRequest],
    config: &EngineConfig,
) -> Result<MoveOutcome, EngineError> {
    let mut tasks = plan.tasks.clone();
    let mut reports = Vec::with_capacity(moves.len());

    for request in moves {
        let outcome = propagate::move_task(&tasks, &request.task_id, request.start, request.end)?;
        let suggestions = suggest::suggest_after_move(&request.task_id, &outcome, config);
        reports.push(MoveReport {
            task_id: request.task_id.clone(),
            affected: outcome.affected,
            shifted: outcome.shifted,
            recomputed_parents: outcome.recomputed_parents,
            suggestions,
        });
        tasks = outcome.tasks;
    }

    Ok(MoveOutcome {
        plan: Plan {
            tasks,
            ..plan.clone()
        },
        moves: reports,
    })
}

/// Reconcile a review and store the resulting day plans.
pub fn submit_review(
    plan: &Plan,
    review: &Review,
    history: &impl ReviewHistory,
    config: &EngineConfig,
) -> ReviewOutcome {
    let outcome = reconcile_review(plan, review, history, config);

    let mut updated = Plan {
        tasks: outcome.tasks,
        ..plan.clone()
    };
    if let Some(today) = outcome.today_plan {
        updated.upsert_daily_plan(today);
    }
    updated.upsert_daily_plan(outcome.tomorrow_plan);

    ReviewOutcome {
        plan: updated,
        tomorrow: tomorrow_of(review),
        overflow: outcome.overflow,
        escalated: outcome.escalated,
    }
}

/// Set a task's status.
///
/// An unknown id is a no-op. `Blocked` needs a non-empty reason; any other
/// status clears the stored reason.
pub fn update_task_status(
    tasks: &[Task],
    task_id: &str,
    status: TaskStatus,
    blocked_reason: Option<&str>,
) -> Result<Vec<Task>, EngineError> {
    let mut updated = tasks.to_vec();
    let Some(task) = updated.iter_mut().find(|t| t.id == task_id) else {
        log::debug!("Status update ignored: task {} not in collection", task_id);
        return Ok(updated);
    };

    let reason = blocked_reason.map(str::trim).filter(|r| !r.is_empty());
    match status {
        TaskStatus::Blocked => match reason {
            Some(r) => task.blocked_reason = Some(r.to_string()),
            None => return Err(EngineError::MissingBlockedReason(task_id.to_string())),
        },
        _ => task.blocked_reason = None,
    }
    task.status = status;
    Ok(updated)
}

/// Apply an accepted suggestion to the plan.
///
/// For a split, day plans that scheduled a replaced task now schedule its
/// first half.
pub fn apply_suggestion(plan: &Plan, suggestion: &AiSuggestion) -> Plan {
    let mut updated = Plan {
        tasks: suggest::apply_suggestion(&plan.tasks, suggestion),
        ..plan.clone()
    };

    if suggestion.suggestion_type == SuggestionType::Split {
        if let Some(head) = suggestion.preview.after.first() {
            for daily in updated.daily_plans.iter_mut() {
                for target in &suggestion.target_task_ids {
                    daily.replace_id(target, &head.id);
                }
            }
        }
    }
    updated
}

/// The day plan for `date`: stored if present, otherwise freshly allocated
/// with `hours` (or the configured default).
pub fn today_plan(
    plan: &Plan,
    date: NaiveDate,
    hours: Option<f64>,
    config: &EngineConfig,
) -> DailyPlan {
    daily_plan_for(plan, date, hours.unwrap_or(config.default_available_hours))
}
