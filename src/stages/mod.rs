// src/stages/mod.rs

pub mod intake;
pub mod planner;
pub mod refiner;

pub use intake::IntakeStage;
pub use planner::PlanStage;
pub use refiner::RefinementStage;

use thiserror::Error;

/// A failure a stage's own fallback logic could not absorb. Soft model
/// failures never surface here; anything that does is caught once at the
/// orchestrator boundary.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn contains_any(input: &str, keywords: &[&str]) -> bool {
    let lower = input.to_lowercase();
    keywords.iter().any(|keyword| lower.contains(keyword))
}
