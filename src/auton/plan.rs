// Plan loading: active slot selection and per-section step lists

use super::error::PlanError;
use super::parser::{SkippedLine, parse_section, split_sections};
use super::step::{AutonSection, AutonStep};
use crate::assets;
use crate::storage::{Storage, StorageError};
use std::ops::RangeInclusive;

pub const SLOT_FILE: &str = "auton_slot.txt";
pub const FALLBACK_PLAN_FILE: &str = "auton_plans.txt";
pub const SLOT_RANGE: RangeInclusive<u8> = 1..=3;
pub const DEFAULT_SLOT: u8 = 1;

pub fn plan_file_for_slot(slot: u8) -> String {
    format!("auton_plans_slot{}.txt", slot)
}

/// Slot number from the slot file contents, if valid
pub fn parse_slot(raw: &str) -> Option<u8> {
    raw.trim().parse::<u8>().ok().filter(|s| SLOT_RANGE.contains(s))
}

/// Slot to use; missing or invalid slot files select the default
pub fn read_active_slot<S: Storage + ?Sized>(storage: &S) -> u8 {
    storage
        .read(SLOT_FILE)
        .ok()
        .and_then(|text| parse_slot(&text))
        .unwrap_or(DEFAULT_SLOT)
}

pub fn write_slot<S: Storage + ?Sized>(storage: &S, slot: i64) -> Result<u8, PlanError> {
    let slot = u8::try_from(slot)
        .ok()
        .filter(|s| SLOT_RANGE.contains(s))
        .ok_or(PlanError::InvalidSlot(slot))?;
    storage.write(SLOT_FILE, &format!("{}\n", slot))?;
    Ok(slot)
}

/// Step `delta` slots from `current`, wrapping within the slot range
pub fn cycle_slot(current: u8, delta: i32) -> u8 {
    let start = *SLOT_RANGE.start() as i32;
    let count = SLOT_RANGE.len() as i32;
    let offset = (current as i32 - start + delta).rem_euclid(count);
    (start + offset) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    SdCard,
    BuiltIn,
}

impl PlanSource {
    pub fn label(self) -> &'static str {
        match self {
            PlanSource::SdCard => "SD",
            PlanSource::BuiltIn => "BUILT-IN",
        }
    }
}

/// Parsed steps for both sections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub gps: Vec<AutonStep>,
    pub basic: Vec<AutonStep>,
}

impl Plan {
    pub fn steps(&self, section: AutonSection) -> &[AutonStep] {
        match section {
            AutonSection::Gps => &self.gps,
            AutonSection::Basic => &self.basic,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gps.is_empty() && self.basic.is_empty()
    }
}

/// A plan ready to be installed into the runtime, with its parse diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPlan {
    pub slot: u8,
    pub file_name: String,
    pub source: PlanSource,
    pub plan: Plan,
    pub skipped: Vec<SkippedLine>,
}

impl LoadedPlan {
    pub fn from_text(text: &str, slot: u8, file_name: &str, source: PlanSource) -> Self {
        let sections = split_sections(text);
        let (gps, mut skipped) = parse_section(AutonSection::Gps, &sections.gps);
        let (basic, skipped_basic) = parse_section(AutonSection::Basic, &sections.basic);
        skipped.extend(skipped_basic);

        LoadedPlan {
            slot,
            file_name: file_name.to_string(),
            source,
            plan: Plan { gps, basic },
            skipped,
        }
    }

    /// The plan compiled into the binary
    pub fn built_in() -> Option<Self> {
        let text = assets::default_plan_text()?;
        Some(Self::from_text(
            &text,
            DEFAULT_SLOT,
            assets::DEFAULT_PLAN_FILE,
            PlanSource::BuiltIn,
        ))
    }
}

/// Read the slot file and the matching plan file, falling back to the shared plan file
pub fn load_active_plan<S: Storage + ?Sized>(storage: &S) -> Result<LoadedPlan, PlanError> {
    storage.ensure_root()?;
    let slot = read_active_slot(storage);
    let slot_file = plan_file_for_slot(slot);

    for file_name in [slot_file.as_str(), FALLBACK_PLAN_FILE] {
        match storage.read(file_name) {
            Ok(text) => {
                log::info!(target: "storage", "Loaded slot {} plan from {}", slot, file_name);
                return Ok(LoadedPlan::from_text(&text, slot, file_name, PlanSource::SdCard));
            }
            Err(StorageError::NotFound { .. }) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(PlanError::NoPlanFile { slot })
}
