//! Operator-controlled text recording of controller activity.

use crate::types::DriveMode;

pub const RECORDING_BANNER: &str = "REC_START:VIRTUAL_BRAIN";

pub fn recording_file_name(timestamp: &str) -> String {
    format!("virtual_brain_log_{}.txt", timestamp)
}

/// A finished recording waiting to be written out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedRecording {
    pub file_name: String,
    pub contents: String,
    pub line_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Recorder {
    active: bool,
    file_name: String,
    lines: Vec<String>,
}

impl Recorder {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn file_name(&self) -> Option<&str> {
        if self.active { Some(&self.file_name) } else { None }
    }

    /// Last `n` lines of the buffer
    pub fn preview(&self, n: usize) -> Vec<String> {
        let start = self.lines.len().saturating_sub(n);
        self.lines[start..].to_vec()
    }

    /// Begin a new recording. Returns false if one is already running.
    pub fn start(&mut self, drive_mode: DriveMode, timestamp: &str) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.file_name = recording_file_name(timestamp);
        self.lines = Vec::with_capacity(4096);
        self.lines.push(RECORDING_BANNER.to_string());
        self.lines.push(format!("DRIVE_MODE:{}", drive_mode.label()));
        true
    }

    /// Append a line; ignored while not recording
    pub fn push(&mut self, line: impl Into<String>) {
        if self.active {
            self.lines.push(line.into());
        }
    }

    /// Axis readout for one tick followed by that tick's button events
    pub fn record_tick<'a>(&mut self, axes: [i32; 4], events: impl IntoIterator<Item = &'a str>) {
        if !self.active {
            return;
        }
        for (i, value) in axes.iter().enumerate() {
            self.lines.push(format!("AXIS{}:{}", i + 1, value));
        }
        self.lines.extend(events.into_iter().map(str::to_string));
    }

    /// Close the recording and hand back its contents; the buffer is cleared
    pub fn stop(&mut self, reason: &str) -> Option<FinishedRecording> {
        if !self.active {
            return None;
        }
        self.active = false;
        if !reason.trim().is_empty() {
            self.lines.push(format!("REC_STOP:{}", reason));
        }

        let lines = std::mem::take(&mut self.lines);
        let mut contents = lines.join("\n");
        contents.push('\n');
        Some(FinishedRecording {
            file_name: std::mem::take(&mut self.file_name),
            contents,
            line_count: lines.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_lifecycle() {
        let mut rec = Recorder::default();
        rec.push("ignored");
        assert_eq!(rec.line_count(), 0);

        assert!(rec.start(DriveMode::Arcade, "20260102_030405"));
        assert!(!rec.start(DriveMode::Tank, "20260102_030406"));
        assert_eq!(rec.file_name(), Some("virtual_brain_log_20260102_030405.txt"));

        rec.record_tick([1, 2, 3, 4], ["BTN_INTAKE_IN:INTAKE_IN"]);
        rec.push("AUTON_START:GPS");
        assert_eq!(rec.line_count(), 8);
        assert_eq!(rec.preview(2), vec!["BTN_INTAKE_IN:INTAKE_IN", "AUTON_START:GPS"]);

        let done = rec.stop("user").expect("recording was active");
        assert_eq!(done.file_name, "virtual_brain_log_20260102_030405.txt");
        assert_eq!(done.line_count, 9);
        assert!(done.contents.starts_with("REC_START:VIRTUAL_BRAIN\nDRIVE_MODE:ARCADE_2_STICK\nAXIS1:1\n"));
        assert!(done.contents.ends_with("REC_STOP:user\n"));

        assert!(!rec.is_active());
        assert_eq!(rec.line_count(), 0);
        assert!(rec.stop("user").is_none());
    }

    #[test]
    fn test_preview_shorter_than_buffer() {
        let mut rec = Recorder::default();
        rec.start(DriveMode::Tank, "t");
        assert_eq!(rec.preview(18).len(), 2);
    }
}
