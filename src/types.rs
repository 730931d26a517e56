use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point on the field, in inches
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Robot position (inches) and heading (degrees in [0, 360))
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
}

impl Pose {
    pub fn position(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }
}

/// Physical buttons on the logical controller
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ControllerButton {
    L1,
    L2,
    R1,
    R2,
    A,
    B,
    X,
    Y,
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
    #[serde(rename = "LEFT")]
    Left,
    #[serde(rename = "RIGHT")]
    Right,
}

impl ControllerButton {
    pub const COUNT: usize = 12;
    pub const ALL: [ControllerButton; Self::COUNT] = [
        ControllerButton::L1,
        ControllerButton::L2,
        ControllerButton::R1,
        ControllerButton::R2,
        ControllerButton::A,
        ControllerButton::B,
        ControllerButton::X,
        ControllerButton::Y,
        ControllerButton::Up,
        ControllerButton::Down,
        ControllerButton::Left,
        ControllerButton::Right,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            ControllerButton::L1 => "L1",
            ControllerButton::L2 => "L2",
            ControllerButton::R1 => "R1",
            ControllerButton::R2 => "R2",
            ControllerButton::A => "A",
            ControllerButton::B => "B",
            ControllerButton::X => "X",
            ControllerButton::Y => "Y",
            ControllerButton::Up => "UP",
            ControllerButton::Down => "DOWN",
            ControllerButton::Left => "LEFT",
            ControllerButton::Right => "RIGHT",
        }
    }

    pub fn is_dpad(self) -> bool {
        matches!(
            self,
            ControllerButton::Up
                | ControllerButton::Down
                | ControllerButton::Left
                | ControllerButton::Right
        )
    }
}

impl fmt::Display for ControllerButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ControllerButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        ControllerButton::ALL
            .iter()
            .copied()
            .find(|b| b.label() == upper)
            .ok_or_else(|| format!("unknown button: {}", s))
    }
}

/// Which keyboard key drives which axis direction
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardAxisRole {
    Axis1Left,
    Axis1Right,
    Axis2Up,
    Axis2Down,
    Axis3Up,
    Axis3Down,
    Axis4Left,
    Axis4Right,
}

impl KeyboardAxisRole {
    /// (positive, negative) role pair for each of the four axes
    pub const AXIS_PAIRS: [(KeyboardAxisRole, KeyboardAxisRole); 4] = [
        (KeyboardAxisRole::Axis1Right, KeyboardAxisRole::Axis1Left),
        (KeyboardAxisRole::Axis2Up, KeyboardAxisRole::Axis2Down),
        (KeyboardAxisRole::Axis3Up, KeyboardAxisRole::Axis3Down),
        (KeyboardAxisRole::Axis4Right, KeyboardAxisRole::Axis4Left),
    ];
}

/// Robot functions that can be bound to a controller button
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerAction {
    IntakeIn,
    IntakeOut,
    OuttakeOut,
    OuttakeIn,
    HeadingHoldOn,
    HeadingHoldOff,
    SixWheelOn,
    SixWheelOff,
}

impl ControllerAction {
    pub const ALL: [ControllerAction; 8] = [
        ControllerAction::IntakeIn,
        ControllerAction::IntakeOut,
        ControllerAction::OuttakeOut,
        ControllerAction::OuttakeIn,
        ControllerAction::HeadingHoldOn,
        ControllerAction::HeadingHoldOff,
        ControllerAction::SixWheelOn,
        ControllerAction::SixWheelOff,
    ];

    pub fn default_button(self) -> ControllerButton {
        match self {
            ControllerAction::IntakeIn => ControllerButton::L1,
            ControllerAction::IntakeOut => ControllerButton::L2,
            ControllerAction::OuttakeOut => ControllerButton::R1,
            ControllerAction::OuttakeIn => ControllerButton::R2,
            ControllerAction::HeadingHoldOn => ControllerButton::A,
            ControllerAction::HeadingHoldOff => ControllerButton::B,
            ControllerAction::SixWheelOn => ControllerButton::Y,
            ControllerAction::SixWheelOff => ControllerButton::X,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ControllerAction::IntakeIn => "INTAKE_IN",
            ControllerAction::IntakeOut => "INTAKE_OUT",
            ControllerAction::OuttakeOut => "OUTTAKE_OUT",
            ControllerAction::OuttakeIn => "OUTTAKE_IN",
            ControllerAction::HeadingHoldOn => "HEADING_HOLD_ON",
            ControllerAction::HeadingHoldOff => "HEADING_HOLD_OFF",
            ControllerAction::SixWheelOn => "SIX_WHEEL_ON",
            ControllerAction::SixWheelOff => "SIX_WHEEL_OFF",
        }
    }
}

/// How the merged controller state is turned into wheel commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriveMode {
    #[default]
    Tank,
    Arcade,
    Dpad,
}

impl DriveMode {
    pub fn label(self) -> &'static str {
        match self {
            DriveMode::Tank => "TANK",
            DriveMode::Arcade => "ARCADE_2_STICK",
            DriveMode::Dpad => "DPAD",
        }
    }
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DriveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tank" => Ok(DriveMode::Tank),
            "arcade" | "arcade2" | "arcade_2_stick" => Ok(DriveMode::Arcade),
            "dpad" | "d-pad" => Ok(DriveMode::Dpad),
            _ => Err(format!("unknown drive mode: {}", s)),
        }
    }
}

/// Left/right drive output, each in [-127, 127]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WheelCommands {
    pub left: i32,
    pub right: i32,
}

impl WheelCommands {
    pub const STOP: WheelCommands = WheelCommands { left: 0, right: 0 };

    pub fn new(left: i32, right: i32) -> Self {
        WheelCommands { left, right }
    }
}

/// Everything the robot is being told to do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputCommands {
    pub wheels: WheelCommands,
    pub middle: WheelCommands,
    pub intake: i32,
    pub outtake: i32,
}

impl OutputCommands {
    pub fn zero(&mut self) {
        *self = OutputCommands::default();
    }
}

/// Coarse activity label used by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobotActivity {
    #[default]
    Idle,
    Moving,
    Intake,
    Outtake,
    Auton,
}

impl RobotActivity {
    pub fn label(self) -> &'static str {
        match self {
            RobotActivity::Idle => "IDLE",
            RobotActivity::Moving => "MOVING",
            RobotActivity::Intake => "INTAKE",
            RobotActivity::Outtake => "OUTTAKE",
            RobotActivity::Auton => "AUTON",
        }
    }
}
