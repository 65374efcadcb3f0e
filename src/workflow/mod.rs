//! End-of-day workflows
//!
//! - `review`: draft a review from the day's plan
//! - `reconcile`: fold a submitted review into tomorrow's plan

pub mod reconcile;
pub mod review;
