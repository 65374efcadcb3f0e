//! Eisenhower quadrant classification and the two priority scores.
//!
//! `triage_score` orders a freshly allocated day; `quadrant_score` orders
//! review reconciliation. They rank some pairs differently (importance is
//! double-weighted in one, quadrant rank dominates in the other), so each
//! caller keeps its own.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::Task;

const IMPORTANT_THRESHOLD: u8 = 4;
const URGENT_THRESHOLD: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    /// Important and urgent
    IU,
    /// Important, not urgent
    IN,
    /// Urgent, not important
    NU,
    /// Neither
    NN,
}

impl Quadrant {
    pub fn weight(&self) -> u8 {
        match self {
            Self::IU => 4,
            Self::IN => 3,
            Self::NU => 2,
            Self::NN => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IU => "IU",
            Self::IN => "IN",
            Self::NU => "NU",
            Self::NN => "NN",
        }
    }
}

pub fn quadrant_for(importance: u8, urgency: u8) -> Quadrant {
    let important = importance >= IMPORTANT_THRESHOLD;
    let urgent = urgency >= URGENT_THRESHOLD;
    match (important, urgent) {
        (true, true) => Quadrant::IU,
        (true, false) => Quadrant::IN,
        (false, true) => Quadrant::NU,
        (false, false) => Quadrant::NN,
    }
}

pub fn quadrant(task: &Task) -> Quadrant {
    quadrant_for(task.importance, task.urgency)
}

/// Weighted sum used when building a day from scratch.
pub fn triage_score(task: &Task) -> u32 {
    task.importance as u32 * 2 + task.urgency as u32
}

/// Lexicographic key used by reconciliation: quadrant rank, then
/// importance + urgency.
pub fn quadrant_score(task: &Task) -> (u8, u32) {
    (
        quadrant(task).weight(),
        task.importance as u32 + task.urgency as u32,
    )
}

/// Descending comparator on `triage_score`.
pub fn by_triage_score_desc(a: &Task, b: &Task) -> Ordering {
    triage_score(b).cmp(&triage_score(a))
}

/// Descending comparator on `quadrant_score`.
pub fn by_quadrant_score_desc(a: &Task, b: &Task) -> Ordering {
    quadrant_score(b).cmp(&quadrant_score(a))
}
