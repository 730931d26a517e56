//! Capped human-readable logs shown alongside the simulation.

use crate::utils::push_capped;
use chrono::{SecondsFormat, Utc};
use std::collections::VecDeque;

/// FIFO ring of text lines; the oldest line goes once `cap` is exceeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedLog {
    lines: VecDeque<String>,
    cap: usize,
}

impl BoundedLog {
    pub fn new(cap: usize) -> Self {
        BoundedLog {
            lines: VecDeque::with_capacity(cap.min(256)),
            cap,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        push_capped(&mut self.lines, line.into(), self.cap);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> impl Iterator<Item = &String> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&String> {
        self.lines.back()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

/// The three diagnostic streams owned by the runtime
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub runtime: BoundedLog,
    pub auton: BoundedLog,
    pub input: BoundedLog,
}

impl Diagnostics {
    pub fn new(runtime_cap: usize, auton_cap: usize, input_cap: usize) -> Self {
        Diagnostics {
            runtime: BoundedLog::new(runtime_cap),
            auton: BoundedLog::new(auton_cap),
            input: BoundedLog::new(input_cap),
        }
    }

    /// Timestamped runtime line, mirrored to the `runtime` log target
    pub fn runtime(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        log::info!(target: "runtime", "{}", message);
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.runtime.push(format!("[{}] {}", stamp, message));
    }

    /// Auton progress line, also copied into the runtime log
    pub fn auton(&mut self, message: impl AsRef<str>) {
        self.auton.push(message.as_ref());
        self.runtime(message);
    }

    /// Input action line, also copied into the runtime log
    pub fn input(&mut self, message: impl AsRef<str>) {
        self.input.push(message.as_ref());
        self.runtime(message);
    }
}
