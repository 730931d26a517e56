// Autonomous routine interpreter: plan files, typed steps and run state

pub mod error;
pub mod parser;
pub mod plan;
pub mod state;
pub mod step;

pub use error::{PlanError, StepParseError};
pub use plan::{LoadedPlan, Plan, PlanSource};
pub use state::{AutonEvent, AutonRunState};
pub use step::{AutonSection, AutonStep};
