use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::util;

// =============================================================================
// Tasks
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Blocked,
    Completed,
}

/// Granularity a task represents. Only `Day` tasks enter daily triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskLevel {
    Month,
    Week,
    #[default]
    Day,
}

/// The atomic planning unit.
///
/// `duration` is whole days between the dates, rounded up; anything that moves
/// the dates goes through [`Task::set_dates`] so the two never drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "util::flexible_datetime")]
    pub start_date: NaiveDateTime,
    #[serde(with = "util::flexible_datetime")]
    pub end_date: NaiveDateTime,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default = "default_score")]
    pub importance: u8,
    #[serde(default = "default_score")]
    pub urgency: u8,
    /// Planning-time estimate in hours. Not authoritative for `duration`.
    #[serde(default)]
    pub cost: f64,
    #[serde(default = "default_risk")]
    pub risk: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub level: TaskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

/// Deserialize a task list with every `duration` derived from its dates.
///
/// Exported plans may omit `duration` or carry a stale one; packing and
/// splitting only ever see the derived value.
fn normalized_tasks<'de, D>(d: D) -> Result<Vec<Task>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mut tasks = Vec::<Task>::deserialize(d)?;
    tasks.iter_mut().for_each(Task::normalize);
    Ok(tasks)
}

fn default_score() -> u8 {
    3
}

fn default_risk() -> u8 {
    1
}

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

impl Task {
    /// Set both dates and recompute `duration`.
    pub fn set_dates(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        self.start_date = start;
        self.end_date = end;
        self.duration = util::duration_days(start, end);
    }

    /// Move the task later (or earlier) by `delta`, keeping its span.
    pub fn shift_by(&mut self, delta: Duration) {
        self.set_dates(self.start_date + delta, self.end_date + delta);
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d == id)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Recompute `duration` from the dates, discarding whatever was stored.
    pub fn normalize(&mut self) {
        self.set_dates(self.start_date, self.end_date);
    }

    /// Check score ranges and the blocked-reason rule.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, value) in [
            ("importance", self.importance),
            ("urgency", self.urgency),
            ("risk", self.risk),
        ] {
            if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(EngineError::OutOfRange {
                    task_id: self.id.clone(),
                    field,
                    value,
                });
            }
        }

        if self.end_date < self.start_date {
            return Err(EngineError::InvalidDateRange {
                task_id: self.id.clone(),
                start: self.start_date,
                end: self.end_date,
            });
        }

        if self.status == TaskStatus::Blocked
            && self
                .blocked_reason
                .as_deref()
                .map(|r| r.trim().is_empty())
                .unwrap_or(true)
        {
            return Err(EngineError::MissingBlockedReason(self.id.clone()));
        }

        Ok(())
    }
}

// =============================================================================
// Daily plans and reviews
// =============================================================================

/// One calendar day's triage: three top slots plus an ordered backlog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    #[serde(with = "util::flexible_date")]
    pub date: NaiveDate,
    pub available_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top3: Option<String>,
    #[serde(default)]
    pub backlog: Vec<String>,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
}

impl DailyPlan {
    pub fn empty(date: NaiveDate, available_hours: f64) -> Self {
        Self {
            date,
            available_hours,
            top1: None,
            top2: None,
            top3: None,
            backlog: Vec::new(),
            completed_tasks: Vec::new(),
        }
    }

    /// Fill the top slots from the head of `ordered`; the rest becomes backlog.
    pub fn fill_slots(&mut self, ordered: Vec<String>) {
        let mut iter = ordered.into_iter();
        self.top1 = iter.next();
        self.top2 = iter.next();
        self.top3 = iter.next();
        self.backlog = iter.collect();
    }

    /// Every task id the plan schedules, top slots first.
    pub fn scheduled_ids(&self) -> Vec<&str> {
        [&self.top1, &self.top2, &self.top3]
            .into_iter()
            .filter_map(|slot| slot.as_deref())
            .chain(self.backlog.iter().map(String::as_str))
            .collect()
    }

    /// Point every slot holding `old` at `new`. A slot that would repeat an
    /// id already scheduled earlier is dropped and the rest close up.
    pub fn replace_id(&mut self, old: &str, new: &str) {
        if !self.scheduled_ids().contains(&old) {
            return;
        }
        let mut seen = std::collections::HashSet::new();
        let ordered: Vec<String> = self
            .scheduled_ids()
            .into_iter()
            .map(|id| if id == old { new } else { id })
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect();
        self.fill_slots(ordered);
    }

    pub fn top_ids(&self) -> Vec<&str> {
        [&self.top1, &self.top2, &self.top3]
            .into_iter()
            .filter_map(|slot| slot.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompleteEntry {
    pub task_id: String,
    #[serde(default)]
    pub reason: String,
}

/// An end-of-day submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(with = "util::flexible_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
    #[serde(default)]
    pub incomplete_tasks: Vec<IncompleteEntry>,
    pub tomorrow_available_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tomorrow_priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Review {
    pub fn lists_incomplete(&self, task_id: &str) -> bool {
        self.incomplete_tasks.iter().any(|e| e.task_id == task_id)
    }
}

// =============================================================================
// Plan aggregate
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    #[serde(with = "util::flexible_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub task_ids: Vec<String>,
}

/// The unit of mutation: every engine operation takes a plan and hands back
/// new task collections or a new plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub project_id: String,
    #[serde(default, deserialize_with = "normalized_tasks")]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub daily_plans: Vec<DailyPlan>,
}

impl Plan {
    pub fn daily_plan(&self, date: NaiveDate) -> Option<&DailyPlan> {
        self.daily_plans.iter().find(|dp| dp.date == date)
    }

    /// Replace the plan for `daily.date`, or append it.
    pub fn upsert_daily_plan(&mut self, daily: DailyPlan) {
        match self.daily_plans.iter_mut().find(|dp| dp.date == daily.date) {
            Some(existing) => *existing = daily,
            None => self.daily_plans.push(daily),
        }
    }
}

// =============================================================================
// Suggestions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionType {
    Split,
    Reorganize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionPreview {
    #[serde(deserialize_with = "normalized_tasks")]
    pub before: Vec<Task>,
    #[serde(deserialize_with = "normalized_tasks")]
    pub after: Vec<Task>,
}

/// Advisory output after a move. Never applied without the caller asking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub target_task_ids: Vec<String>,
    pub reason: String,
    pub preview: SuggestionPreview,
    pub impact: String,
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Tunables stored in ~/.dayplan/config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Moved tasks longer than this many days get a split suggestion.
    #[serde(default = "default_split_threshold")]
    pub split_threshold_days: i64,
    /// A move affecting more than this many tasks gets a reorganize suggestion.
    #[serde(default = "default_reorganize_min")]
    pub reorganize_min_affected: usize,
    /// Past incompletions required before a review raises a task's risk.
    #[serde(default = "default_risk_escalation")]
    pub risk_escalation_after: usize,
    #[serde(default = "default_available_hours")]
    pub default_available_hours: f64,
    #[serde(default = "default_horizon")]
    pub planning_horizon_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            split_threshold_days: default_split_threshold(),
            reorganize_min_affected: default_reorganize_min(),
            risk_escalation_after: default_risk_escalation(),
            default_available_hours: default_available_hours(),
            planning_horizon_days: default_horizon(),
        }
    }
}

fn default_split_threshold() -> i64 {
    8
}

fn default_reorganize_min() -> usize {
    2
}

fn default_risk_escalation() -> usize {
    2
}

fn default_available_hours() -> f64 {
    1.0
}

fn default_horizon() -> u32 {
    30
}

/// Test fixture: a day-level todo task with middling scores, dated
/// `[start, end]`. Callers override fields with struct update syntax.
#[cfg(test)]
pub(crate) fn fixture_task(id: &str, start: NaiveDateTime, end: NaiveDateTime) -> Task {
    let mut task = Task {
        id: id.to_string(),
        title: id.to_string(),
        description: None,
        start_date: start,
        end_date: end,
        duration: 0,
        status: TaskStatus::Todo,
        importance: 3,
        urgency: 3,
        cost: 1.0,
        risk: 1,
        parent_id: None,
        dependencies: Vec::new(),
        level: TaskLevel::Day,
        blocked_reason: None,
    };
    task.normalize();
    task
}

#[cfg(test)]
pub(crate) fn deps(ids: &[&str]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::parse_datetime;

    fn task_json() -> &'static str {
        r#"{
            "id": "task-1",
            "title": "Frontend - home page",
            "startDate": "2026-02-12T00:00:00.000Z",
            "endDate": "2026-02-13",
            "duration": 1,
            "status": "in-progress",
            "importance": 5,
            "urgency": 3,
            "cost": 1,
            "risk": 3,
            "dependencies": ["task-0"],
            "level": "day"
        }"#
    }

    #[test]
    fn test_task_deserializes_camel_case() {
        let task: Task = serde_json::from_str(task_json()).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.level, TaskLevel::Day);
        assert_eq!(task.dependencies, vec!["task-0".to_string()]);
        assert_eq!(task.parent_id, None);
        assert_eq!(task.duration, 1);
    }

    #[test]
    fn test_task_serializes_dates_without_offset() {
        let task: Task = serde_json::from_str(task_json()).unwrap();
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["startDate"], "2026-02-12T00:00:00");
        assert_eq!(value["status"], "in-progress");
        assert!(value.get("blockedReason").is_none());
    }

    #[test]
    fn test_set_dates_keeps_duration_consistent() {
        let mut task: Task = serde_json::from_str(task_json()).unwrap();
        task.set_dates(
            parse_datetime("2026-02-12").unwrap(),
            parse_datetime("2026-02-20").unwrap(),
        );
        assert_eq!(task.duration, 8);
        task.shift_by(Duration::days(3));
        assert_eq!(task.start_date, parse_datetime("2026-02-15").unwrap());
        assert_eq!(task.duration, 8);
    }

    #[test]
    fn test_validate_requires_blocked_reason() {
        let mut task: Task = serde_json::from_str(task_json()).unwrap();
        task.status = TaskStatus::Blocked;
        assert!(matches!(
            task.validate(),
            Err(EngineError::MissingBlockedReason(_))
        ));
        task.blocked_reason = Some("waiting on design".to_string());
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_scores() {
        let mut task: Task = serde_json::from_str(task_json()).unwrap();
        task.urgency = 6;
        assert!(matches!(
            task.validate(),
            Err(EngineError::OutOfRange { field: "urgency", .. })
        ));
    }

    #[test]
    fn test_fill_slots_spills_into_backlog() {
        let mut plan = DailyPlan::empty(NaiveDate::from_ymd_opt(2026, 2, 12).unwrap(), 4.0);
        plan.fill_slots(vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()]);
        assert_eq!(plan.top1.as_deref(), Some("a"));
        assert_eq!(plan.top3.as_deref(), Some("c"));
        assert_eq!(plan.backlog, vec!["d".to_string(), "e".to_string()]);
        assert_eq!(plan.scheduled_ids(), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_plan_load_derives_duration_from_dates() {
        let plan: Plan = serde_json::from_str(
            r#"{
                "projectId": "p",
                "tasks": [
                    { "id": "missing", "title": "m", "startDate": "2026-03-10", "endDate": "2026-03-15" },
                    { "id": "stale", "title": "s", "startDate": "2026-03-10", "endDate": "2026-03-12", "duration": 9 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(plan.tasks[0].duration, 5);
        assert_eq!(plan.tasks[1].duration, 2);
    }

    #[test]
    fn test_replace_id_keeps_slots_resolvable() {
        let mut plan = DailyPlan::empty(NaiveDate::from_ymd_opt(2026, 2, 12).unwrap(), 4.0);
        plan.fill_slots(vec!["a".into(), "b".into(), "c".into(), "d".into()]);

        plan.replace_id("b", "b-1");
        assert_eq!(plan.scheduled_ids(), vec!["a", "b-1", "c", "d"]);

        // Already scheduled: the later slot is dropped and the backlog moves up.
        plan.replace_id("c", "a");
        assert_eq!(plan.scheduled_ids(), vec!["a", "b-1", "d"]);
        assert_eq!(plan.top3.as_deref(), Some("d"));

        plan.replace_id("zzz", "x");
        assert_eq!(plan.scheduled_ids(), vec!["a", "b-1", "d"]);
    }

    #[test]
    fn test_suggestion_type_field_name() {
        let suggestion = AiSuggestion {
            suggestion_type: SuggestionType::Reorganize,
            target_task_ids: vec!["a".into()],
            reason: "r".into(),
            preview: SuggestionPreview {
                before: Vec::new(),
                after: Vec::new(),
            },
            impact: "i".into(),
        };
        let value = serde_json::to_value(&suggestion).unwrap();
        assert_eq!(value["type"], "reorganize");
        assert_eq!(value["targetTaskIds"][0], "a");
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: EngineConfig = serde_json::from_str(r#"{ "splitThresholdDays": 5 }"#).unwrap();
        assert_eq!(config.split_threshold_days, 5);
        assert_eq!(config.reorganize_min_affected, 2);
        assert_eq!(config.risk_escalation_after, 2);
    }
}
