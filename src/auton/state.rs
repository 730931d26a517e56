// Execution state for one autonomous run

use super::step::{AutonSection, AutonStep};
use crate::config::{AXIS_LIMIT, RuntimeConfig};
use crate::types::OutputCommands;
use crate::utils::{clamp_axis, heading_turn_command, normalize_degrees, shortest_heading_error};

/// Progress notifications produced while stepping a run
#[derive(Debug, Clone, PartialEq)]
pub enum AutonEvent {
    StepStarted {
        number: usize, // 1-based
        total: usize,
        label: String,
    },
    /// A turn gave up before reaching its tolerance
    TurnTimedOut { label: String, error_deg: f64 },
    Finished,
}

/// A run in progress. Dropped as a whole when it stops or completes.
///
/// There is no `running` flag: the runtime holds an `Option<AutonRunState>`
/// and a run is active exactly while that option is `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct AutonRunState {
    pub section: AutonSection,
    sequence: Vec<AutonStep>,
    current_index: usize,
    elapsed_ms: f64,
    initialized_current_step: bool,
}

impl AutonRunState {
    /// `None` when there is nothing to run
    pub fn start(section: AutonSection, sequence: Vec<AutonStep>) -> Option<Self> {
        if sequence.is_empty() {
            return None;
        }
        Some(AutonRunState {
            section,
            sequence,
            current_index: 0,
            elapsed_ms: 0.0,
            initialized_current_step: false,
        })
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_steps(&self) -> usize {
        self.sequence.len()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn current_step(&self) -> Option<&AutonStep> {
        self.sequence.get(self.current_index)
    }

    /// Label of the step being executed, or a placeholder before the first tick
    pub fn current_label(&self) -> String {
        match self.current_step() {
            Some(step) if self.initialized_current_step => step.to_string(),
            Some(_) => "(preparing)".to_string(),
            None => "(complete)".to_string(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.sequence.len()
    }

    /// Execute one tick of the current step, writing wheel and mechanism commands.
    /// Mechanism values are left untouched by drive steps so they persist.
    pub fn tick(&mut self, heading_deg: f64, config: &RuntimeConfig, out: &mut OutputCommands) -> Vec<AutonEvent> {
        let mut events = Vec::new();
        let Some(step) = self.current_step().copied() else {
            events.push(AutonEvent::Finished);
            return events;
        };

        if !self.initialized_current_step {
            self.initialized_current_step = true;
            self.elapsed_ms = 0.0;
            events.push(AutonEvent::StepStarted {
                number: self.current_index + 1,
                total: self.sequence.len(),
                label: step.to_string(),
            });
        }

        let tick_ms = config.tick_ms as f64;
        let done = match step {
            AutonStep::Empty => true,
            AutonStep::DriveMs { speed, duration_ms } => {
                self.timed_drive(out, speed, speed, duration_ms, tick_ms)
            }
            AutonStep::TankMs {
                left,
                right,
                duration_ms,
            } => self.timed_drive(out, left, right, duration_ms, tick_ms),
            AutonStep::TurnHeading {
                target_deg,
                timeout_ms,
            } => {
                let target = normalize_degrees(target_deg as f64);
                let error = shortest_heading_error(target, heading_deg);
                let turn = heading_turn_command(error, config.heading_gain, config.heading_turn_limit);
                out.wheels.left = -turn;
                out.wheels.right = turn;
                self.elapsed_ms += tick_ms;

                let timeout = if timeout_ms == 0 {
                    config.turn_timeout_default_ms
                } else {
                    timeout_ms
                }
                .max(config.turn_timeout_floor_ms);

                let converged = error.abs() < config.turn_tolerance_deg;
                if !converged && self.elapsed_ms >= timeout as f64 {
                    events.push(AutonEvent::TurnTimedOut {
                        label: step.to_string(),
                        error_deg: error,
                    });
                }
                if converged || self.elapsed_ms >= timeout as f64 {
                    out.wheels.left = 0;
                    out.wheels.right = 0;
                    true
                } else {
                    false
                }
            }
            AutonStep::WaitMs { duration_ms } => {
                out.wheels.left = 0;
                out.wheels.right = 0;
                self.elapsed_ms += tick_ms;
                self.elapsed_ms >= duration_ms.max(0) as f64
            }
            AutonStep::IntakeOn => {
                set_mechanisms(out, AXIS_LIMIT);
                true
            }
            AutonStep::OuttakeOn => {
                set_mechanisms(out, -AXIS_LIMIT);
                true
            }
            AutonStep::IntakeOff | AutonStep::OuttakeOff => {
                set_mechanisms(out, 0);
                true
            }
        };

        if done {
            self.current_index += 1;
            self.initialized_current_step = false;
            self.elapsed_ms = 0.0;
            if self.is_finished() {
                events.push(AutonEvent::Finished);
            }
        }
        events
    }

    fn timed_drive(&mut self, out: &mut OutputCommands, left: i32, right: i32, duration_ms: i32, tick_ms: f64) -> bool {
        out.wheels.left = clamp_axis(left);
        out.wheels.right = clamp_axis(right);
        self.elapsed_ms += tick_ms;
        if self.elapsed_ms >= duration_ms.max(0) as f64 {
            out.wheels.left = 0;
            out.wheels.right = 0;
            true
        } else {
            false
        }
    }
}

/// Mechanism steps drive intake and outtake together
fn set_mechanisms(out: &mut OutputCommands, value: i32) {
    out.intake = value;
    out.outtake = value;
}
