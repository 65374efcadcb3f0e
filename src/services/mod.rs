// Service layer: plan-level operations built on the engine modules.

pub mod plan;
