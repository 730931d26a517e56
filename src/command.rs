//! Control commands accepted by the runtime and file work it hands back.

use crate::auton::{AutonSection, LoadedPlan};
use crate::recording::FinishedRecording;
use crate::storage::{Storage, StorageError};
use crate::types::DriveMode;

/// Operator actions. Queued commands take effect at the start of the next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartSession,
    EndSession,
    ToggleSession,
    StartAuton,
    StopAuton,
    SelectSection(AutonSection),
    InstallPlan(Box<LoadedPlan>),
    PlanLoadFailed(String),
    SetDriveMode(DriveMode),
    SetHeadingHold(bool),
    SetSixWheel(bool),
    SetSpeedScale(f64),
    SetSizeScale(f64),
    StartRecording,
    StopRecording,
    ToggleRecording,
    ExportTelemetry,
    ClearTelemetry,
    Reset,
    FileJobFinished(FileJobReport),
}

/// Text that must be written to storage outside the tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileJob {
    Recording(FinishedRecording),
    TelemetryExport {
        file_name: String,
        contents: String,
        frame_count: usize,
    },
}

impl FileJob {
    pub fn file_name(&self) -> &str {
        match self {
            FileJob::Recording(rec) => &rec.file_name,
            FileJob::TelemetryExport { file_name, .. } => file_name,
        }
    }

    fn contents(&self) -> &str {
        match self {
            FileJob::Recording(rec) => &rec.contents,
            FileJob::TelemetryExport { contents, .. } => contents,
        }
    }

    fn kind(&self) -> FileJobKind {
        match self {
            FileJob::Recording(rec) => FileJobKind::Recording {
                line_count: rec.line_count,
            },
            FileJob::TelemetryExport { frame_count, .. } => FileJobKind::TelemetryExport {
                frame_count: *frame_count,
            },
        }
    }

    /// Write the file and describe the outcome for the runtime log
    pub fn run<S: Storage + ?Sized>(&self, storage: &S) -> FileJobReport {
        let result = storage
            .write(self.file_name(), self.contents())
            .map_err(|e: StorageError| e.to_string());
        if let Err(e) = &result {
            log::warn!(target: "storage", "Writing {} failed: {}", self.file_name(), e);
        }
        FileJobReport {
            kind: self.kind(),
            file_name: self.file_name().to_string(),
            result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileJobKind {
    Recording { line_count: usize },
    TelemetryExport { frame_count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJobReport {
    pub kind: FileJobKind,
    pub file_name: String,
    pub result: Result<(), String>,
}
