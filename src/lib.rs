//! Virtual robot brain: a fixed-tick stand-in for an embedded robot
//! controller, with merged controller input, differential-drive kinematics,
//! an autonomous step interpreter, a match clock and field game pieces.

pub mod assets;
pub mod auton;
pub mod command;
pub mod competition;
pub mod config;
pub mod diag;
pub mod drive;
pub mod field;
pub mod input;
pub mod logging;
pub mod recording;
pub mod robot;
pub mod runtime;
pub mod scheduler;
pub mod storage;
pub mod telemetry;
pub mod types;
pub mod utils;

pub use runtime::{Runtime, RuntimeSnapshot};
pub use scheduler::VirtualBrain;
