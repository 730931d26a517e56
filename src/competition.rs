//! Match clock and phase sequencing.

use crate::config::RuntimeConfig;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CompetitionPhase {
    #[default]
    Ready,
    Auton,
    Driver,
    Ended,
}

impl CompetitionPhase {
    pub fn label(self) -> &'static str {
        match self {
            CompetitionPhase::Ready => "READY",
            CompetitionPhase::Auton => "AUTON",
            CompetitionPhase::Driver => "DRIVER",
            CompetitionPhase::Ended => "ENDED",
        }
    }

    /// Whether operator drive and mechanism input is honored
    pub fn allows_manual_control(self) -> bool {
        self == CompetitionPhase::Driver
    }

    pub fn is_live(self) -> bool {
        matches!(self, CompetitionPhase::Auton | CompetitionPhase::Driver)
    }
}

impl fmt::Display for CompetitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A phase change caused by the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTransition {
    AutonEnded,
    TimeUp,
}

// The clock is kept in whole milliseconds so thresholds are hit exactly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Competition {
    phase: CompetitionPhase,
    remaining_ms: u64,
    total_ms: u64,
    auton_end_ms: u64,
    pub summary: String,
}

impl Competition {
    pub fn new(config: &RuntimeConfig) -> Self {
        Competition {
            phase: CompetitionPhase::Ready,
            remaining_ms: config.match_total_ms,
            total_ms: config.match_total_ms,
            auton_end_ms: config.auton_end_remaining_ms.min(config.match_total_ms),
            summary: "Waiting for match start".to_string(),
        }
    }

    pub fn phase(&self) -> CompetitionPhase {
        self.phase
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn remaining_secs(&self) -> f64 {
        self.remaining_ms as f64 / 1000.0
    }

    /// Remaining time as `M:SS`, rounding partial seconds up
    pub fn clock_text(&self) -> String {
        let secs = self.remaining_ms.div_ceil(1000);
        format!("{}:{:02}", secs / 60, secs % 60)
    }

    pub fn start_session(&mut self) {
        self.phase = CompetitionPhase::Auton;
        self.remaining_ms = self.total_ms;
        self.summary = "AUTON period running".to_string();
    }

    /// Operator-requested end of the match
    pub fn end_session(&mut self, reason: &str) {
        self.phase = CompetitionPhase::Ended;
        self.summary = format!("Match ended ({})", reason);
    }

    pub fn reset(&mut self) {
        self.phase = CompetitionPhase::Ready;
        self.remaining_ms = self.total_ms;
        self.summary = "Waiting for match start".to_string();
    }

    /// Count the clock down by one tick and apply threshold transitions.
    /// Both transitions can fire on the same tick when the auton window is empty.
    pub fn tick(&mut self, tick_ms: u64) -> Vec<ClockTransition> {
        let mut transitions = Vec::new();
        if !self.phase.is_live() {
            return transitions;
        }

        self.remaining_ms = self.remaining_ms.saturating_sub(tick_ms);

        if self.phase == CompetitionPhase::Auton && self.remaining_ms <= self.auton_end_ms {
            self.phase = CompetitionPhase::Driver;
            self.summary = "DRIVER period running".to_string();
            transitions.push(ClockTransition::AutonEnded);
        }
        if self.remaining_ms == 0 {
            self.phase = CompetitionPhase::Ended;
            self.summary = "Match complete".to_string();
            transitions.push(ClockTransition::TimeUp);
        }
        transitions
    }
}
