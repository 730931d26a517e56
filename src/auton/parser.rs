// Plan text parser: splits a plan file into sections and lines into typed steps

use super::error::StepParseError;
use super::step::{AutonSection, AutonStep};

/// A plan line that was dropped during parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub section: AutonSection,
    pub line: usize, // 1-based within the section
    pub text: String,
    pub error: StepParseError,
}

/// Raw instruction lines of each section, comments and blanks removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSections {
    pub gps: Vec<String>,
    pub basic: Vec<String>,
}

impl PlanSections {
    pub fn lines(&self, section: AutonSection) -> &[String] {
        match section {
            AutonSection::Gps => &self.gps,
            AutonSection::Basic => &self.basic,
        }
    }
}

/// Split plan text on the section markers. Lines before the first marker are ignored.
pub fn split_sections(text: &str) -> PlanSections {
    let mut sections = PlanSections::default();
    let mut current: Option<AutonSection> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(section) = AutonSection::ALL.iter().find(|s| s.marker() == line) {
            current = Some(*section);
            continue;
        }
        match current {
            Some(AutonSection::Gps) => sections.gps.push(line.to_string()),
            Some(AutonSection::Basic) => sections.basic.push(line.to_string()),
            None => {}
        }
    }
    sections
}

/// Parse one `KIND,p1[,p2[,p3]]` line
pub fn parse_step(line: &str) -> Result<AutonStep, StepParseError> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    let upper = parts[0].to_uppercase();
    let &(kind, needed) = AutonStep::KINDS
        .iter()
        .find(|(name, _)| *name == upper)
        .ok_or_else(|| StepParseError::UnknownInstruction(parts[0].to_string()))?;

    let params = &parts[1..];
    let found = params.iter().take_while(|p| !p.is_empty()).count();
    if found < needed {
        return Err(StepParseError::MissingParameter { kind, needed, found });
    }

    // Positional parameter, 0 when an optional one is absent
    let param = |i: usize| -> Result<i32, StepParseError> {
        match params.get(i) {
            Some(p) if !p.is_empty() => p
                .parse::<i32>()
                .map_err(|_| StepParseError::NotAnInteger(p.to_string())),
            _ => Ok(0),
        }
    };

    let step = match kind {
        "EMPTY" => AutonStep::Empty,
        "DRIVE_MS" => AutonStep::DriveMs {
            speed: param(0)?,
            duration_ms: param(1)?,
        },
        "TANK_MS" => AutonStep::TankMs {
            left: param(0)?,
            right: param(1)?,
            duration_ms: param(2)?,
        },
        "TURN_HEADING" => AutonStep::TurnHeading {
            target_deg: param(0)?,
            timeout_ms: param(1)?,
        },
        "WAIT_MS" => AutonStep::WaitMs {
            duration_ms: param(0)?,
        },
        "INTAKE_ON" => AutonStep::IntakeOn,
        "INTAKE_OFF" => AutonStep::IntakeOff,
        "OUTTAKE_ON" => AutonStep::OuttakeOn,
        _ => AutonStep::OuttakeOff,
    };
    Ok(step)
}

/// Parse every line of a section, collecting the ones that fail
pub fn parse_section(section: AutonSection, lines: &[String]) -> (Vec<AutonStep>, Vec<SkippedLine>) {
    let mut steps = Vec::with_capacity(lines.len());
    let mut skipped = Vec::new();

    for (i, text) in lines.iter().enumerate() {
        match parse_step(text) {
            Ok(step) => steps.push(step),
            Err(error) => skipped.push(SkippedLine {
                section,
                line: i + 1,
                text: text.clone(),
                error,
            }),
        }
    }
    (steps, skipped)
}
