// Autonomous step definitions

use std::fmt;
use std::str::FromStr;

/// Which half of the plan file a routine comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutonSection {
    #[default]
    Gps,
    Basic,
}

impl AutonSection {
    pub const ALL: [AutonSection; 2] = [AutonSection::Gps, AutonSection::Basic];

    pub fn label(self) -> &'static str {
        match self {
            AutonSection::Gps => "GPS",
            AutonSection::Basic => "BASIC",
        }
    }

    /// Line that opens this section in a plan file
    pub fn marker(self) -> &'static str {
        match self {
            AutonSection::Gps => "[GPS]",
            AutonSection::Basic => "[BASIC]",
        }
    }
}

impl fmt::Display for AutonSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AutonSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GPS" => Ok(AutonSection::Gps),
            "BASIC" => Ok(AutonSection::Basic),
            _ => Err(format!("unknown auton section: {}", s)),
        }
    }
}

/// One instruction of an autonomous routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutonStep {
    Empty,
    DriveMs { speed: i32, duration_ms: i32 },
    TankMs { left: i32, right: i32, duration_ms: i32 },
    /// `timeout_ms` of 0 selects the default timeout
    TurnHeading { target_deg: i32, timeout_ms: i32 },
    WaitMs { duration_ms: i32 },
    IntakeOn,
    IntakeOff,
    OuttakeOn,
    OuttakeOff,
}

impl AutonStep {
    /// Instruction keywords paired with the number of parameters each requires
    pub const KINDS: [(&'static str, usize); 9] = [
        ("EMPTY", 0),
        ("DRIVE_MS", 2),
        ("TANK_MS", 3),
        ("TURN_HEADING", 1),
        ("WAIT_MS", 1),
        ("INTAKE_ON", 0),
        ("INTAKE_OFF", 0),
        ("OUTTAKE_ON", 0),
        ("OUTTAKE_OFF", 0),
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            AutonStep::Empty => "EMPTY",
            AutonStep::DriveMs { .. } => "DRIVE_MS",
            AutonStep::TankMs { .. } => "TANK_MS",
            AutonStep::TurnHeading { .. } => "TURN_HEADING",
            AutonStep::WaitMs { .. } => "WAIT_MS",
            AutonStep::IntakeOn => "INTAKE_ON",
            AutonStep::IntakeOff => "INTAKE_OFF",
            AutonStep::OuttakeOn => "OUTTAKE_ON",
            AutonStep::OuttakeOff => "OUTTAKE_OFF",
        }
    }

    /// Mechanism steps take effect and finish within a single tick
    pub fn is_instant(&self) -> bool {
        matches!(
            self,
            AutonStep::Empty
                | AutonStep::IntakeOn
                | AutonStep::IntakeOff
                | AutonStep::OuttakeOn
                | AutonStep::OuttakeOff
        )
    }
}

impl fmt::Display for AutonStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutonStep::DriveMs { speed, duration_ms } => {
                write!(f, "DRIVE_MS {},{}", speed, duration_ms)
            }
            AutonStep::TankMs {
                left,
                right,
                duration_ms,
            } => write!(f, "TANK_MS {},{},{}", left, right, duration_ms),
            AutonStep::TurnHeading { target_deg, .. } => write!(f, "TURN_HEADING {}", target_deg),
            AutonStep::WaitMs { duration_ms } => write!(f, "WAIT_MS {}", duration_ms),
            other => f.write_str(other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let drive = AutonStep::DriveMs {
            speed: 80,
            duration_ms: 500,
        };
        assert_eq!(drive.to_string(), "DRIVE_MS 80,500");
        let turn = AutonStep::TurnHeading {
            target_deg: 90,
            timeout_ms: 1200,
        };
        assert_eq!(turn.to_string(), "TURN_HEADING 90");
        assert_eq!(AutonStep::OuttakeOff.to_string(), "OUTTAKE_OFF");
        assert!(AutonStep::IntakeOn.is_instant());
        assert!(!AutonStep::WaitMs { duration_ms: 0 }.is_instant());
    }

    #[test]
    fn test_section_names() {
        assert_eq!("basic".parse::<AutonSection>(), Ok(AutonSection::Basic));
        assert_eq!(AutonSection::Gps.marker(), "[GPS]");
        assert!("skills".parse::<AutonSection>().is_err());
    }
}
