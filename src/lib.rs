pub mod allocate;
pub mod config;
pub mod error;
pub mod history;
pub mod priority;
pub mod progress;
pub mod propagate;
pub mod services;
pub mod store;
pub mod suggest;
pub mod types;
pub mod util;
pub mod workflow;

pub use error::{EngineError, EngineErrorPayload};
pub use history::{NoHistory, ReviewHistory, ReviewLog};
pub use types::{
    AiSuggestion, DailyPlan, EngineConfig, IncompleteEntry, Milestone, Plan, Review, Task,
    TaskLevel, TaskStatus,
};
