//! Per-tick telemetry frames and their CSV export.

use crate::utils::{csv_escape, push_capped};
use std::collections::VecDeque;
use std::fmt::Write;

pub const CSV_HEADER: &str = "time_s,axis1,axis2,axis3,axis4,intake_action,outtake_action,left_cmd,right_cmd,x_in,y_in,heading_deg,auton_section,auton_step";

pub const MANUAL_SECTION: &str = "MANUAL";
pub const MANUAL_STEP: &str = "MANUAL_DRIVE";

/// Direction label for a mechanism command
pub fn mechanism_label(command: i32) -> &'static str {
    match command {
        c if c > 0 => "FORWARD",
        c if c < 0 => "REVERSE",
        _ => "OFF",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub time_s: f64,
    pub axes: [i32; 4],
    pub intake_action: &'static str,
    pub outtake_action: &'static str,
    pub left_cmd: i32,
    pub right_cmd: i32,
    pub x_in: f64,
    pub y_in: f64,
    pub heading_deg: f64,
    pub auton_section: String,
    pub auton_step: String,
}

impl TelemetryFrame {
    pub fn csv_row(&self) -> String {
        format!(
            "{:.3},{},{},{},{},{},{},{},{},{:.2},{:.2},{:.2},{},{}",
            self.time_s,
            self.axes[0],
            self.axes[1],
            self.axes[2],
            self.axes[3],
            csv_escape(self.intake_action),
            csv_escape(self.outtake_action),
            self.left_cmd,
            self.right_cmd,
            self.x_in,
            self.y_in,
            self.heading_deg,
            csv_escape(&self.auton_section),
            csv_escape(&self.auton_step),
        )
    }
}

/// Capped frame buffer; always recording while the simulation runs
#[derive(Debug, Clone)]
pub struct Telemetry {
    frames: VecDeque<TelemetryFrame>,
    cap: usize,
}

impl Telemetry {
    pub fn new(cap: usize) -> Self {
        Telemetry {
            frames: VecDeque::new(),
            cap,
        }
    }

    pub fn push(&mut self, frame: TelemetryFrame) {
        push_capped(&mut self.frames, frame, self.cap);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn frames(&self) -> &VecDeque<TelemetryFrame> {
        &self.frames
    }

    pub fn last(&self) -> Option<&TelemetryFrame> {
        self.frames.back()
    }

    /// Header plus one row per frame, newline terminated
    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(64 * (self.frames.len() + 1));
        out.push_str(CSV_HEADER);
        out.push('\n');
        for frame in &self.frames {
            let _ = writeln!(out, "{}", frame.csv_row());
        }
        out
    }
}

pub fn export_file_name(timestamp: &str) -> String {
    format!("virtual_fieldreplay_{}.csv", timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(time_s: f64) -> TelemetryFrame {
        TelemetryFrame {
            time_s,
            axes: [0, 12, -34, 0],
            intake_action: mechanism_label(127),
            outtake_action: mechanism_label(0),
            left_cmd: -34,
            right_cmd: 12,
            x_in: 24.0,
            y_in: 24.5,
            heading_deg: 90.0,
            auton_section: "GPS".to_string(),
            auton_step: "DRIVE_MS 80,500".to_string(),
        }
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        let mut telemetry = Telemetry::new(4);
        for i in 0..10 {
            telemetry.push(frame(i as f64));
            assert!(telemetry.len() <= 4);
        }
        let times: Vec<f64> = telemetry.frames().iter().map(|f| f.time_s).collect();
        assert_eq!(times, vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_csv_format() {
        let mut telemetry = Telemetry::new(10);
        telemetry.push(frame(0.02));
        let csv = telemetry.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "0.020,0,12,-34,0,FORWARD,OFF,-34,12,24.00,24.50,90.00,GPS,\"DRIVE_MS 80,500\""
        );
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_mechanism_labels() {
        assert_eq!(mechanism_label(5), "FORWARD");
        assert_eq!(mechanism_label(-127), "REVERSE");
        assert_eq!(mechanism_label(0), "OFF");
        assert_eq!(export_file_name("20260101_120000"), "virtual_fieldreplay_20260101_120000.csv");
    }
}
