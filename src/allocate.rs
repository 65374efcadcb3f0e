//! Daily allocation: top 3 + backlog for a day with no plan yet.
//!
//! Allocation is deliberately unconstrained by capacity. Every eligible task
//! for the day is included; only review reconciliation bin-packs against
//! available hours.

use chrono::{Duration, NaiveDate};

use crate::priority::by_triage_score_desc;
use crate::store::TaskStore;
use crate::types::{DailyPlan, Plan, Task};

/// Build a plan for `date` from day-level tasks starting that day.
///
/// Completed tasks are skipped. Ties keep collection order.
pub fn create_daily_plan(date: NaiveDate, tasks: &[Task], available_hours: f64) -> DailyPlan {
    let store = TaskStore::new(tasks);
    let mut eligible: Vec<&Task> = store
        .day_tasks_on(date)
        .into_iter()
        .filter(|t| !t.is_completed())
        .collect();

    eligible.sort_by(|a, b| by_triage_score_desc(a, b));

    let mut plan = DailyPlan::empty(date, available_hours);
    plan.fill_slots(eligible.into_iter().map(|t| t.id.clone()).collect());

    log::debug!(
        "Allocated {}: {} top, {} backlog",
        date,
        plan.top_ids().len(),
        plan.backlog.len()
    );
    plan
}

/// One allocated plan per day for `days` days starting at `start`.
pub fn generate_daily_plans(
    tasks: &[Task],
    start: NaiveDate,
    days: u32,
    available_hours: f64,
) -> Vec<DailyPlan> {
    (0..days as i64)
        .map(|offset| create_daily_plan(start + Duration::days(offset), tasks, available_hours))
        .collect()
}

/// The stored plan for `date`, or a freshly allocated one.
pub fn daily_plan_for(plan: &Plan, date: NaiveDate, available_hours: f64) -> DailyPlan {
    match plan.daily_plan(date) {
        Some(existing) => existing.clone(),
        None => create_daily_plan(date, &plan.tasks, available_hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{fixture_task, TaskLevel, TaskStatus};
    use crate::util::parse_datetime;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(id: &str, start: &str, importance: u8, urgency: u8) -> Task {
        let start = parse_datetime(start).unwrap();
        Task {
            importance,
            urgency,
            ..fixture_task(id, start, crate::util::add_days(start, 1))
        }
    }

    #[test]
    fn sorts_by_triage_score_into_slots() {
        let tasks = vec![
            task("low", "2026-05-04", 1, 1),
            task("mid", "2026-05-04", 3, 3),
            task("top", "2026-05-04", 5, 5),
            task("urgent", "2026-05-04", 2, 5),
            task("spill", "2026-05-04", 1, 2),
        ];
        let plan = create_daily_plan(date("2026-05-04"), &tasks, 2.0);

        assert_eq!(plan.top1.as_deref(), Some("top"));
        assert_eq!(plan.top2.as_deref(), Some("mid"));
        assert_eq!(plan.top3.as_deref(), Some("urgent"));
        assert_eq!(plan.backlog, vec!["spill".to_string(), "low".to_string()]);
        assert_eq!(plan.available_hours, 2.0);
    }

    #[test]
    fn capacity_not_enforced_at_creation() {
        let tasks: Vec<Task> = (0..6)
            .map(|i| task(&format!("t{}", i), "2026-05-04", 3, 3))
            .collect();
        let plan = create_daily_plan(date("2026-05-04"), &tasks, 0.5);
        assert_eq!(plan.scheduled_ids().len(), 6);
        // Equal scores keep input order.
        assert_eq!(plan.top1.as_deref(), Some("t0"));
        assert_eq!(plan.backlog, vec!["t3", "t4", "t5"]);
    }

    #[test]
    fn filters_other_days_levels_and_completed() {
        let mut week = task("week", "2026-05-04", 5, 5);
        week.level = TaskLevel::Week;
        let mut done = task("done", "2026-05-04", 5, 5);
        done.status = TaskStatus::Completed;
        let tasks = vec![
            week,
            done,
            task("tomorrow", "2026-05-05", 5, 5),
            task("afternoon", "2026-05-04T14:00:00", 2, 2),
        ];

        let plan = create_daily_plan(date("2026-05-04"), &tasks, 4.0);
        assert_eq!(plan.scheduled_ids(), vec!["afternoon"]);
    }

    #[test]
    fn empty_day_gives_empty_plan() {
        let plan = create_daily_plan(date("2026-05-04"), &[], 4.0);
        assert!(plan.top1.is_none());
        assert!(plan.backlog.is_empty());
    }

    #[test]
    fn generates_one_plan_per_day() {
        let tasks = vec![task("a", "2026-05-04", 3, 3), task("b", "2026-05-06", 3, 3)];
        let plans = generate_daily_plans(&tasks, date("2026-05-04"), 3, 1.5);
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].top1.as_deref(), Some("a"));
        assert!(plans[1].top1.is_none());
        assert_eq!(plans[2].top1.as_deref(), Some("b"));
        assert_eq!(plans[2].date, date("2026-05-06"));
    }

    #[test]
    fn existing_plan_preferred() {
        let tasks = vec![task("a", "2026-05-04", 3, 3)];
        let mut stored = DailyPlan::empty(date("2026-05-04"), 6.0);
        stored.top1 = Some("manual".to_string());
        let plan = Plan {
            project_id: "p".to_string(),
            tasks,
            milestones: Vec::new(),
            daily_plans: vec![stored.clone()],
        };

        assert_eq!(daily_plan_for(&plan, date("2026-05-04"), 1.0), stored);
        assert_eq!(
            daily_plan_for(&plan, date("2026-05-05"), 1.0).available_hours,
            1.0
        );
    }
}
