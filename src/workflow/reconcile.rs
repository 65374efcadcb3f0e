//! End-of-day reconciliation
//!
//! Folds a submitted review into the plan for the following day:
//! - Resolve the review's incomplete tasks (unknown ids dropped)
//! - Merge them ahead of whatever tomorrow already holds
//! - Order by quadrant score and pack against tomorrow's hours
//! - Push the tasks that don't fit one day further out
//! - Raise risk on tasks that keep coming back incomplete
//!
//! Packing is a single pass in priority order. Every candidate is tested
//! against the remaining capacity, so a small task can still fit after a
//! larger one before it did not.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::history::ReviewHistory;
use crate::priority::by_quadrant_score_desc;
use crate::store::TaskStore;
use crate::types::{DailyPlan, EngineConfig, Plan, Review, Task, MAX_SCORE};
use crate::util::{add_days, start_of_day};

/// Result of reconciling one review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub tasks: Vec<Task>,
    pub tomorrow_plan: DailyPlan,
    /// The reviewed day's plan with the review's completions recorded, if
    /// the plan had one for that day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today_plan: Option<DailyPlan>,
    /// Tasks deferred past tomorrow, in priority order.
    pub overflow: Vec<String>,
    /// Tasks whose risk went up.
    pub escalated: Vec<String>,
}

/// Split of a priority-ordered candidate list against a capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Packing {
    pub fitting: Vec<String>,
    pub overflow: Vec<String>,
    pub used_hours: f64,
}

pub fn tomorrow_of(review: &Review) -> NaiveDate {
    review.date + Duration::days(1)
}

/// Reconcile `review` against `plan` and build tomorrow's plan.
///
/// `history` must reflect reviews submitted *before* this one.
pub fn reconcile_review(
    plan: &Plan,
    review: &Review,
    history: &impl ReviewHistory,
    config: &EngineConfig,
) -> ReconcileOutcome {
    let tomorrow = tomorrow_of(review);
    let store = TaskStore::new(&plan.tasks);

    let incomplete = resolve_incomplete(&store, review);

    let mut tomorrow_plan = plan
        .daily_plan(tomorrow)
        .cloned()
        .unwrap_or_else(|| DailyPlan::empty(tomorrow, review.tomorrow_available_hours));
    tomorrow_plan.available_hours = review.tomorrow_available_hours;

    let existing: Vec<&Task> = tomorrow_plan
        .scheduled_ids()
        .into_iter()
        .filter_map(|id| {
            let found = store.get(id);
            if found.is_none() {
                log::debug!("Tomorrow's plan references unknown task {}", id);
            }
            found
        })
        .filter(|t| !t.is_completed())
        .collect();

    let mut candidates = merge_candidates(incomplete.iter().copied(), existing);
    candidates.sort_by(|a, b| by_quadrant_score_desc(a, b));

    let packing = pack(&candidates, review.tomorrow_available_hours);
    tomorrow_plan.fill_slots(packing.fitting.clone());

    let mut tasks = plan.tasks.clone();
    defer_overflow(&mut tasks, &packing.overflow, tomorrow);
    let escalated = escalate_risk(&mut tasks, &incomplete, history, config.risk_escalation_after);

    let today_plan = plan.daily_plan(review.date).cloned().map(|mut today| {
        record_completed(&mut today, &review.completed_tasks);
        today
    });

    log::info!(
        "Reconciled review for {}: {} planned for {} ({:.1}/{:.1}h), {} deferred, {} escalated",
        review.date,
        packing.fitting.len(),
        tomorrow,
        packing.used_hours,
        review.tomorrow_available_hours,
        packing.overflow.len(),
        escalated.len()
    );

    ReconcileOutcome {
        tasks,
        tomorrow_plan,
        today_plan,
        overflow: packing.overflow,
        escalated,
    }
}

/// Incomplete entries resolved to tasks, first mention wins.
fn resolve_incomplete<'a>(store: &TaskStore<'a>, review: &Review) -> Vec<&'a Task> {
    let mut seen = HashSet::new();
    review
        .incomplete_tasks
        .iter()
        .filter(|entry| seen.insert(entry.task_id.as_str()))
        .filter_map(|entry| {
            let found = store.get(&entry.task_id);
            if found.is_none() {
                log::debug!("Review lists unknown task {}; dropped", entry.task_id);
            }
            found
        })
        .collect()
}

/// `first ++ second` with later duplicates removed.
fn merge_candidates<'a>(
    first: impl IntoIterator<Item = &'a Task>,
    second: impl IntoIterator<Item = &'a Task>,
) -> Vec<&'a Task> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|t| seen.insert(t.id.as_str()))
        .collect()
}

/// Single-pass accumulate over `ordered`; nothing is reordered.
///
/// Durations are compared against hours as plain numbers.
pub fn pack(ordered: &[&Task], capacity: f64) -> Packing {
    let mut used = 0.0;
    let mut fitting = Vec::new();
    let mut overflow = Vec::new();

    for task in ordered {
        let duration = task.duration as f64;
        if used + duration <= capacity {
            used += duration;
            fitting.push(task.id.clone());
        } else {
            overflow.push(task.id.clone());
        }
    }

    Packing {
        fitting,
        overflow,
        used_hours: used,
    }
}

/// Move each overflow task to start the day after `tomorrow`, keeping its span.
fn defer_overflow(tasks: &mut [Task], overflow: &[String], tomorrow: NaiveDate) {
    let start = start_of_day(tomorrow + Duration::days(1));
    for id in overflow {
        if let Some(task) = tasks.iter_mut().find(|t| &t.id == id) {
            let end = add_days(start, task.duration);
            task.set_dates(start, end);
            log::info!("Deferred {} to {}", id, start.date());
        }
    }
}

/// Bump risk on repeat offenders. Returns the ids whose risk actually rose.
fn escalate_risk(
    tasks: &mut [Task],
    incomplete: &[&Task],
    history: &impl ReviewHistory,
    threshold: usize,
) -> Vec<String> {
    let mut escalated = Vec::new();

    for id in incomplete.iter().map(|t| t.id.as_str()) {
        let previous = history.count_incomplete(id);
        if previous < threshold {
            continue;
        }
        if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
            let raised = task.risk.saturating_add(1).min(MAX_SCORE).max(task.risk);
            if raised != task.risk {
                log::info!(
                    "Risk for {} raised {} -> {} ({} previous incompletions)",
                    id,
                    task.risk,
                    raised,
                    previous
                );
                task.risk = raised;
                escalated.push(id.to_string());
            }
        }
    }

    escalated
}

fn record_completed(today: &mut DailyPlan, completed: &[String]) {
    for id in completed {
        if !today.completed_tasks.contains(id) {
            today.completed_tasks.push(id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{NoHistory, ReviewLog};
    use crate::types::{fixture_task, IncompleteEntry, TaskStatus};
    use crate::util::parse_datetime;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(id: &str, importance: u8, urgency: u8, days: i64) -> Task {
        let start = parse_datetime("2026-03-10").unwrap();
        Task {
            status: TaskStatus::InProgress,
            importance,
            urgency,
            ..fixture_task(id, start, add_days(start, days))
        }
    }

    fn review(incomplete: &[&str], hours: f64) -> Review {
        Review {
            date: date("2026-03-10"),
            completed_tasks: Vec::new(),
            incomplete_tasks: incomplete
                .iter()
                .map(|id| IncompleteEntry {
                    task_id: id.to_string(),
                    reason: "ran out of time".to_string(),
                })
                .collect(),
            tomorrow_available_hours: hours,
            tomorrow_priority: None,
            notes: None,
        }
    }

    fn plan(tasks: Vec<Task>) -> Plan {
        Plan {
            project_id: "proj".to_string(),
            tasks,
            milestones: Vec::new(),
            daily_plans: Vec::new(),
        }
    }

    #[test]
    fn small_task_still_fits_after_a_miss() {
        let p = plan(vec![task("nu", 2, 5, 1), task("in", 5, 1, 2), task("iu", 5, 5, 2)]);
        let out = reconcile_review(&p, &review(&["nu", "in", "iu"], 3.0), &NoHistory, &EngineConfig::default());

        assert_eq!(out.tomorrow_plan.top1.as_deref(), Some("iu"));
        assert_eq!(out.tomorrow_plan.top2.as_deref(), Some("nu"));
        assert!(out.tomorrow_plan.top3.is_none());
        assert!(out.tomorrow_plan.backlog.is_empty());
        assert_eq!(out.overflow, vec!["in"]);
        assert_eq!(out.tomorrow_plan.date, date("2026-03-11"));
        assert_eq!(out.tomorrow_plan.available_hours, 3.0);
    }

    #[test]
    fn fitting_never_exceeds_capacity() {
        let tasks: Vec<Task> = (0..8)
            .map(|i| task(&format!("t{}", i), (i % 5 + 1) as u8, (5 - i % 5) as u8, (i % 3 + 1) as i64))
            .collect();
        let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let p = plan(tasks);

        for hours in [0.0, 1.0, 2.5, 4.0, 7.0, 100.0] {
            let out = reconcile_review(&p, &review(&refs, hours), &NoHistory, &EngineConfig::default());
            let used: i64 = out
                .tomorrow_plan
                .scheduled_ids()
                .iter()
                .map(|id| p.tasks.iter().find(|t| t.id == *id).unwrap().duration)
                .sum();
            assert!(used as f64 <= hours.max(0.0));
            for id in &out.overflow {
                assert!(!out.tomorrow_plan.scheduled_ids().contains(&id.as_str()));
            }
        }
    }

    #[test]
    fn zero_or_negative_hours_defers_everything() {
        let p = plan(vec![task("a", 5, 5, 1), task("b", 3, 3, 2)]);
        for hours in [0.0, -2.0] {
            let out = reconcile_review(&p, &review(&["a", "b"], hours), &NoHistory, &EngineConfig::default());
            assert!(out.tomorrow_plan.scheduled_ids().is_empty());
            assert_eq!(out.overflow, vec!["a", "b"]);
        }
    }

    #[test]
    fn loaded_plan_without_duration_still_respects_zero_hours() {
        let p: Plan = serde_json::from_str(
            r#"{
                "projectId": "proj",
                "tasks": [
                    { "id": "a", "title": "a", "startDate": "2026-03-10", "endDate": "2026-03-15",
                      "importance": 5, "urgency": 5 }
                ]
            }"#,
        )
        .unwrap();

        let out = reconcile_review(&p, &review(&["a"], 0.0), &NoHistory, &EngineConfig::default());
        assert!(out.tomorrow_plan.top1.is_none());
        assert_eq!(out.overflow, vec!["a"]);
        let a = out.tasks.iter().find(|t| t.id == "a").unwrap();
        assert_eq!(a.start_date, parse_datetime("2026-03-12").unwrap());
        assert_eq!(a.duration, 5);
    }

    #[test]
    fn overflow_moves_to_day_after_tomorrow() {
        let p = plan(vec![task("big", 5, 5, 3)]);
        let out = reconcile_review(&p, &review(&["big"], 1.0), &NoHistory, &EngineConfig::default());

        let big = out.tasks.iter().find(|t| t.id == "big").unwrap();
        assert_eq!(big.start_date, parse_datetime("2026-03-12").unwrap());
        assert_eq!(big.end_date, parse_datetime("2026-03-15").unwrap());
        assert_eq!(big.duration, 3);
    }

    #[test]
    fn incomplete_merged_ahead_of_existing_and_deduped() {
        let mut p = plan(vec![
            task("carry", 3, 3, 1),
            task("planned", 3, 3, 1),
            task("done", 5, 5, 1),
        ]);
        p.tasks[2].status = TaskStatus::Completed;
        let mut tomorrow = DailyPlan::empty(date("2026-03-11"), 8.0);
        tomorrow.fill_slots(vec!["planned".into(), "carry".into(), "done".into(), "ghost".into()]);
        p.daily_plans.push(tomorrow);

        let out = reconcile_review(&p, &review(&["carry", "carry", "nope"], 5.0), &NoHistory, &EngineConfig::default());

        // Equal scores: the incomplete task keeps its place ahead.
        assert_eq!(out.tomorrow_plan.scheduled_ids(), vec!["carry", "planned"]);
        assert!(out.overflow.is_empty());
        assert_eq!(out.tomorrow_plan.available_hours, 5.0);
    }

    #[test]
    fn risk_escalates_on_third_incompletion() {
        let mut p = plan(vec![task("a", 5, 5, 1), task("b", 5, 5, 1), task("c", 5, 5, 1)]);
        p.tasks[2].risk = 5;
        let mut log = ReviewLog::default();
        log.record(review(&["a", "c"], 1.0));
        log.record(review(&["a", "b", "c"], 1.0));
        let history_only_b = review(&["b"], 1.0);

        let out = reconcile_review(&p, &history_only_b, &log, &EngineConfig::default());
        assert_eq!(out.escalated, Vec::<String>::new());

        let out = reconcile_review(&p, &review(&["a", "b", "c"], 3.0), &log, &EngineConfig::default());
        let risk = |id: &str| out.tasks.iter().find(|t| t.id == id).unwrap().risk;
        assert_eq!(risk("a"), 2);
        assert_eq!(risk("b"), 1);
        // Already at the ceiling.
        assert_eq!(risk("c"), 5);
        assert_eq!(out.escalated, vec!["a"]);
    }

    #[test]
    fn risk_never_decreases() {
        let mut p = plan(vec![task("a", 5, 5, 1)]);
        p.tasks[0].risk = 4;
        let log = ReviewLog::new(vec![review(&["a"], 1.0), review(&["a"], 1.0), review(&["a"], 1.0)]);

        let out = reconcile_review(&p, &review(&["a"], 1.0), &log, &EngineConfig::default());
        assert_eq!(out.tasks[0].risk, 5);
        let again = reconcile_review(&plan(out.tasks), &review(&["a"], 1.0), &log, &EngineConfig::default());
        assert_eq!(again.tasks[0].risk, 5);
    }

    #[test]
    fn completions_recorded_on_reviewed_day() {
        let mut p = plan(vec![task("a", 5, 5, 1), task("b", 3, 3, 1)]);
        let mut today = DailyPlan::empty(date("2026-03-10"), 4.0);
        today.fill_slots(vec!["a".into(), "b".into()]);
        today.completed_tasks.push("a".into());
        p.daily_plans.push(today);

        let mut r = review(&["b"], 2.0);
        r.completed_tasks = vec!["a".into(), "x".into()];
        let out = reconcile_review(&p, &r, &NoHistory, &EngineConfig::default());
        assert_eq!(out.today_plan.unwrap().completed_tasks, vec!["a", "x"]);

        let out = reconcile_review(&plan(Vec::new()), &r, &NoHistory, &EngineConfig::default());
        assert!(out.today_plan.is_none());
    }

    #[test]
    fn pack_tests_every_candidate() {
        let a = task("a", 5, 5, 2);
        let b = task("b", 5, 1, 2);
        let c = task("c", 2, 5, 1);
        let packing = pack(&[&a, &b, &c], 3.0);
        assert_eq!(packing.fitting, vec!["a", "c"]);
        assert_eq!(packing.overflow, vec!["b"]);
        assert_eq!(packing.used_hours, 3.0);
    }
}
