//! Review history: the read interface risk escalation needs, plus a simple
//! in-memory log that can be loaded from and saved to JSON.

use std::fs;
use std::path::Path;

use crate::error::EngineError;
use crate::types::Review;
use crate::util::atomic_write_str;

/// Read-only view over past reviews.
pub trait ReviewHistory {
    /// How many past reviews listed `task_id` as incomplete.
    fn count_incomplete(&self, task_id: &str) -> usize;
}

/// No history at all. Nothing ever escalates.
pub struct NoHistory;

impl ReviewHistory for NoHistory {
    fn count_incomplete(&self, _task_id: &str) -> usize {
        0
    }
}

/// Submitted reviews in submission order.
#[derive(Debug, Clone, Default)]
pub struct ReviewLog {
    reviews: Vec<Review>,
}

impl ReviewLog {
    pub fn new(reviews: Vec<Review>) -> Self {
        Self { reviews }
    }

    pub fn record(&mut self, review: Review) {
        self.reviews.push(review);
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// Load a JSON array of reviews. A missing file is an empty log.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let reviews: Vec<Review> = serde_json::from_str(&content).map_err(|e| {
            EngineError::ParseError(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self { reviews })
    }

    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let content = serde_json::to_string_pretty(&self.reviews)?;
        atomic_write_str(path, &content)
    }
}

impl ReviewHistory for ReviewLog {
    fn count_incomplete(&self, task_id: &str) -> usize {
        self.reviews
            .iter()
            .filter(|r| r.lists_incomplete(task_id))
            .count()
    }
}
