//! Project progress and day load.

use serde::Serialize;

use crate::priority::{quadrant, Quadrant};
use crate::store::TaskStore;
use crate::types::{DailyPlan, Task, TaskStatus, MAX_SCORE};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuadrantCounts {
    #[serde(rename = "IU")]
    pub iu: usize,
    #[serde(rename = "IN")]
    pub in_: usize,
    #[serde(rename = "NU")]
    pub nu: usize,
    #[serde(rename = "NN")]
    pub nn: usize,
}

impl QuadrantCounts {
    fn bump(&mut self, q: Quadrant) {
        match q {
            Quadrant::IU => self.iu += 1,
            Quadrant::IN => self.in_ += 1,
            Quadrant::NU => self.nu += 1,
            Quadrant::NN => self.nn += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub todo: usize,
    /// Rounded to the nearest whole percent; 0 for an empty collection.
    pub percent_complete: u32,
    pub by_quadrant: QuadrantCounts,
    /// Tasks sitting at the maximum risk level.
    pub at_risk: Vec<String>,
}

pub fn progress_summary(tasks: &[Task]) -> ProgressSummary {
    let mut summary = ProgressSummary {
        total: tasks.len(),
        completed: 0,
        in_progress: 0,
        blocked: 0,
        todo: 0,
        percent_complete: 0,
        by_quadrant: QuadrantCounts::default(),
        at_risk: Vec::new(),
    };

    for task in tasks {
        match task.status {
            TaskStatus::Completed => summary.completed += 1,
            TaskStatus::InProgress => summary.in_progress += 1,
            TaskStatus::Blocked => summary.blocked += 1,
            TaskStatus::Todo => summary.todo += 1,
        }
        summary.by_quadrant.bump(quadrant(task));
        if task.risk >= MAX_SCORE {
            summary.at_risk.push(task.id.clone());
        }
    }

    if summary.total > 0 {
        summary.percent_complete =
            ((summary.completed as f64 / summary.total as f64) * 100.0).round() as u32;
    }
    summary
}

/// Hours booked against one day's capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayLoad {
    pub available_hours: f64,
    pub scheduled_hours: f64,
    /// Durations of the scheduled tasks already completed.
    pub used_hours: f64,
    pub remaining_hours: f64,
    pub over_capacity: bool,
}

pub fn day_load(daily: &DailyPlan, tasks: &[Task]) -> DayLoad {
    let store = TaskStore::new(tasks);
    let mut scheduled = 0.0;
    let mut used = 0.0;

    for task in daily.scheduled_ids().into_iter().filter_map(|id| store.get(id)) {
        let hours = task.duration as f64;
        scheduled += hours;
        if task.is_completed() {
            used += hours;
        }
    }

    DayLoad {
        available_hours: daily.available_hours,
        scheduled_hours: scheduled,
        used_hours: used,
        remaining_hours: daily.available_hours - used,
        over_capacity: scheduled > daily.available_hours,
    }
}
