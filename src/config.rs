//! Configuration for the virtual robot runtime.
//!
//! Every tunable lives in [`RuntimeConfig`] or [`InputBindings`]. Both are
//! built once at start-up (defaults, optionally overlaid by a JSON file) and
//! handed to the runtime by value.

use crate::types::{ControllerAction, ControllerButton, KeyboardAxisRole, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

// Defaults
pub const TICK_MS: u64 = 20;
pub const FIELD_SIZE_INCHES: f64 = 144.0;
pub const TRACK_WIDTH_INCHES: f64 = 12.0;
pub const MAX_SPEED_INCHES_PER_SEC: f64 = 60.0;
pub const MIN_SPEED_INCHES_PER_SEC: f64 = 8.0;
pub const MATCH_TOTAL_MS: u64 = 120_000;
pub const AUTON_END_REMAINING_MS: u64 = 105_000; // 15 s autonomous period

pub const TELEMETRY_CAP: usize = 20_000;
pub const PATH_SAMPLE_CAP: usize = 2_200;
pub const RUNTIME_LOG_CAP: usize = 180;
pub const AUTON_LOG_CAP: usize = 120;
pub const INPUT_LOG_CAP: usize = 220;
pub const RECORDING_PREVIEW_LINES: usize = 18;

pub const AXIS_LIMIT: i32 = 127;
pub const DPAD_BASE_SPEED: i32 = 80;
pub const DPAD_MIN_SPEED: i32 = 25;
pub const HEADING_GAIN: f64 = 1.2;
pub const HEADING_TURN_LIMIT: f64 = 60.0;
pub const TURN_TOLERANCE_DEG: f64 = 1.8;
pub const TURN_TIMEOUT_DEFAULT_MS: i32 = 2_500;
pub const TURN_TIMEOUT_FLOOR_MS: i32 = 500;

pub const PICKUP_RADIUS_INCHES: f64 = 9.5;
pub const SCORE_RADIUS_INCHES: f64 = 12.0;
pub const DROP_OFFSET_INCHES: f64 = 6.0;

pub const SPEED_SCALE_RANGE: (f64, f64) = (0.35, 2.4);
pub const SIZE_SCALE_RANGE: (f64, f64) = (0.5, 2.2);

/// Errors raised while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Colour of a movable game piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    Red,
    Blue,
}

impl PieceColor {
    pub fn label(self) -> &'static str {
        match self {
            PieceColor::Red => "red",
            PieceColor::Blue => "blue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TubeSpec {
    pub position: Point,
    pub capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub color: PieceColor,
    pub position: Point,
}

/// Initial placement of scoring tubes and blocks for a new match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub tubes: Vec<TubeSpec>,
    pub blocks: Vec<BlockSpec>,
}

impl Default for FieldLayout {
    fn default() -> Self {
        let tubes = [24.0, 52.0, 80.0, 108.0]
            .iter()
            .map(|&y| TubeSpec {
                position: Point { x: 124.0, y },
                capacity: 4,
            })
            .collect();

        // 3x3 grid in the middle of the field, alternating colours
        let mut blocks = Vec::with_capacity(9);
        for (row, &y) in [64.0, 72.0, 80.0].iter().enumerate() {
            for (col, &x) in [64.0, 72.0, 80.0].iter().enumerate() {
                let color = if (row * 3 + col) % 2 == 0 {
                    PieceColor::Red
                } else {
                    PieceColor::Blue
                };
                blocks.push(BlockSpec {
                    color,
                    position: Point { x, y },
                });
            }
        }

        FieldLayout { tubes, blocks }
    }
}

/// Simulation constants. Distances in inches, times in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub tick_ms: u64,
    pub field_size: f64,
    pub track_width: f64,
    pub max_speed: f64,
    pub min_speed: f64,
    pub start_position: Point,
    pub start_heading_deg: f64,

    pub match_total_ms: u64,
    pub auton_end_remaining_ms: u64,

    pub telemetry_cap: usize,
    pub path_sample_cap: usize,
    pub runtime_log_cap: usize,
    pub auton_log_cap: usize,
    pub input_log_cap: usize,
    pub recording_preview_lines: usize,

    pub dpad_base_speed: i32,
    pub heading_gain: f64,
    pub heading_turn_limit: f64,
    pub turn_tolerance_deg: f64,
    pub turn_timeout_default_ms: i32,
    pub turn_timeout_floor_ms: i32,

    pub pickup_radius: f64,
    pub score_radius: f64,
    pub drop_offset: f64,

    pub field_layout: FieldLayout,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            tick_ms: TICK_MS,
            field_size: FIELD_SIZE_INCHES,
            track_width: TRACK_WIDTH_INCHES,
            max_speed: MAX_SPEED_INCHES_PER_SEC,
            min_speed: MIN_SPEED_INCHES_PER_SEC,
            start_position: Point { x: 24.0, y: 24.0 },
            start_heading_deg: 0.0,
            match_total_ms: MATCH_TOTAL_MS,
            auton_end_remaining_ms: AUTON_END_REMAINING_MS,
            telemetry_cap: TELEMETRY_CAP,
            path_sample_cap: PATH_SAMPLE_CAP,
            runtime_log_cap: RUNTIME_LOG_CAP,
            auton_log_cap: AUTON_LOG_CAP,
            input_log_cap: INPUT_LOG_CAP,
            recording_preview_lines: RECORDING_PREVIEW_LINES,
            dpad_base_speed: DPAD_BASE_SPEED,
            heading_gain: HEADING_GAIN,
            heading_turn_limit: HEADING_TURN_LIMIT,
            turn_tolerance_deg: TURN_TOLERANCE_DEG,
            turn_timeout_default_ms: TURN_TIMEOUT_DEFAULT_MS,
            turn_timeout_floor_ms: TURN_TIMEOUT_FLOOR_MS,
            pickup_radius: PICKUP_RADIUS_INCHES,
            score_radius: SCORE_RADIUS_INCHES,
            drop_offset: DROP_OFFSET_INCHES,
            field_layout: FieldLayout::default(),
        }
    }
}

impl RuntimeConfig {
    /// Tick length in seconds
    pub fn dt(&self) -> f64 {
        self.tick_ms as f64 / 1000.0
    }

    /// Reject values the clock and the pose integration cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(invalid("tick_ms", "must be at least 1 ms".to_string()));
        }
        for (field, value) in [
            ("field_size", self.field_size),
            ("track_width", self.track_width),
            ("max_speed", self.max_speed),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, format!("must be a positive number, got {}", value)));
            }
        }
        if !self.min_speed.is_finite() || self.min_speed < 0.0 {
            return Err(invalid("min_speed", format!("must not be negative, got {}", self.min_speed)));
        }
        if self.auton_end_remaining_ms > self.match_total_ms {
            return Err(invalid(
                "auton_end_remaining_ms",
                format!("{} exceeds match_total_ms {}", self.auton_end_remaining_ms, self.match_total_ms),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

/// Key and button tables used by the input merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBindings {
    pub keyboard_buttons: BTreeMap<ControllerButton, String>,
    pub keyboard_axes: BTreeMap<KeyboardAxisRole, String>,
    pub actions: BTreeMap<ControllerAction, ControllerButton>,
}

impl Default for InputBindings {
    fn default() -> Self {
        use ControllerButton as B;
        use KeyboardAxisRole as K;

        let keyboard_buttons = [
            (B::L1, "1"),
            (B::L2, "2"),
            (B::R1, "3"),
            (B::R2, "4"),
            (B::A, "z"),
            (B::B, "x"),
            (B::X, "c"),
            (B::Y, "v"),
            (B::Up, "up"),
            (B::Down, "down"),
            (B::Left, "left"),
            (B::Right, "right"),
        ]
        .into_iter()
        .map(|(b, t)| (b, t.to_string()))
        .collect();

        let keyboard_axes = [
            (K::Axis1Left, "a"),
            (K::Axis1Right, "d"),
            (K::Axis2Up, "i"),
            (K::Axis2Down, "k"),
            (K::Axis3Up, "w"),
            (K::Axis3Down, "s"),
            (K::Axis4Left, "j"),
            (K::Axis4Right, "l"),
        ]
        .into_iter()
        .map(|(r, t)| (r, t.to_string()))
        .collect();

        let actions = ControllerAction::ALL
            .iter()
            .map(|&a| (a, a.default_button()))
            .collect();

        InputBindings {
            keyboard_buttons,
            keyboard_axes,
            actions,
        }
    }
}

impl InputBindings {
    pub fn button_for(&self, action: ControllerAction) -> ControllerButton {
        self.actions
            .get(&action)
            .copied()
            .unwrap_or_else(|| action.default_button())
    }

    pub fn keyboard_token(&self, button: ControllerButton) -> Option<&str> {
        self.keyboard_buttons
            .get(&button)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn axis_token(&self, role: KeyboardAxisRole) -> Option<&str> {
        self.keyboard_axes
            .get(&role)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }
}

/// Full configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub runtime: RuntimeConfig,
    pub bindings: InputBindings,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let file = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        file.runtime.validate()?;
        Ok(file)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
