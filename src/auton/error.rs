// Autonomous plan errors: plan loading failures and malformed step lines

use crate::storage::StorageError;
use thiserror::Error;

/// Plan loading errors. The previously installed plan stays in effect.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("No auton plan file found for slot {slot}")]
    NoPlanFile { slot: u8 },
    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("Slot {0} is outside 1..=3")]
    InvalidSlot(i64),
}

/// A single plan line that could not be turned into a step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepParseError {
    #[error("unknown instruction '{0}'")]
    UnknownInstruction(String),
    #[error("{kind} needs {needed} parameter(s), found {found}")]
    MissingParameter {
        kind: &'static str,
        needed: usize,
        found: usize,
    },
    #[error("parameter '{0}' is not an integer")]
    NotAnInteger(String),
}
