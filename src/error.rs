//! Error types for the load generator.
use thiserror::Error;

use crate::cpu_stress::{MAX_TARGET_PERCENT, MIN_TARGET_PERCENT};

/// Rejections reported back to the operator. None of them change state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressError {
    #[error("Stress test is already running. Please stop it first.")]
    AlreadyRunning,

    #[error(
        "Target CPU percentage must be between {}% and {}%.",
        MIN_TARGET_PERCENT,
        MAX_TARGET_PERCENT
    )]
    TargetOutOfRange { target: i64 },

    #[error("No stress test is currently running.")]
    NotRunning,

    #[error("The stress generator is shutting down.")]
    ShuttingDown,
}
