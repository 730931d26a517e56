//! The virtual brain: one fixed-step simulation of the robot, its controller,
//! the autonomous interpreter, the match clock and the field.
//!
//! [`Runtime`] is single-threaded and owns every piece of simulation state.
//! Callers either drive it directly ([`Runtime::apply`] / [`Runtime::tick`])
//! or through [`crate::scheduler::VirtualBrain`], which runs ticks on a timer
//! thread and publishes [`RuntimeSnapshot`]s.

use crate::auton::{AutonEvent, AutonRunState, AutonSection, LoadedPlan, Plan, PlanSource};
use crate::command::{Command, FileJob, FileJobKind, FileJobReport};
use crate::competition::{ClockTransition, Competition, CompetitionPhase};
use crate::config::{AXIS_LIMIT, InputBindings, RuntimeConfig};
use crate::diag::Diagnostics;
use crate::drive::{DpadFlags, DriveContext, compute_wheel_commands};
use crate::field::{Field, GameBlock, GameTube};
use crate::input::{ButtonSet, ControllerSnapshot, InputEvent, InputSources, input_events};
use crate::recording::Recorder;
use crate::robot::{PoseSample, Robot};
use crate::telemetry::{MANUAL_SECTION, MANUAL_STEP, Telemetry, TelemetryFrame, export_file_name, mechanism_label};
use crate::types::{ControllerAction, DriveMode, OutputCommands, Pose, RobotActivity};
use crate::utils::timestamp_for_file_name;
use crate::{debug_auton, debug_drive, debug_game, debug_input, debug_phase};
use std::collections::VecDeque;

/// Stop reasons recorded in logs and recordings
pub mod reason {
    pub const USER: &str = "user";
    pub const USER_STOP: &str = "user-stop";
    pub const RESTART: &str = "restart";
    pub const RESET: &str = "reset";
    pub const AUTO_END: &str = "auto-end";
    pub const TIME_UP: &str = "time-up";
    pub const DONE: &str = "done";
}

/// Progress of the autonomous run as shown to the operator
#[derive(Debug, Clone, PartialEq)]
pub struct AutonProgress {
    pub running: bool,
    pub section: AutonSection,
    pub current_index: usize,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub step_text: String,
}

/// Installed plan metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanInfo {
    pub slot: u8,
    pub file_name: String,
    pub source: PlanSource,
    pub gps_steps: usize,
    pub basic_steps: usize,
}

/// Read-only copy of everything the presentation layer shows
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSnapshot {
    pub tick_count: u64,
    pub sim_time_s: f64,
    pub pose: Pose,
    pub path: Vec<PoseSample>,
    pub outputs: OutputCommands,
    pub controller: ControllerSnapshot,
    pub drive_mode: DriveMode,
    pub heading_hold: bool,
    pub six_wheel: bool,
    pub speed_scale: f64,
    pub size_scale: f64,
    pub activity: RobotActivity,
    pub phase: CompetitionPhase,
    pub clock_remaining_s: f64,
    pub clock_text: String,
    pub competition_summary: String,
    pub auton: AutonProgress,
    pub selected_section: AutonSection,
    pub plan: Option<PlanInfo>,
    pub blocks: Vec<GameBlock>,
    pub tubes: Vec<GameTube>,
    pub scored_blocks: u32,
    pub carried_blocks: usize,
    pub field_status: String,
    pub telemetry_frames: usize,
    pub recording: bool,
    pub recording_lines: usize,
    pub recording_preview: Vec<String>,
    pub runtime_log: Vec<String>,
    pub auton_log: Vec<String>,
    pub input_log: Vec<String>,
    pub status: String,
    pub last_recording_file: Option<String>,
    pub last_export_file: Option<String>,
    pub gamepad_name: Option<String>,
}

pub struct Runtime {
    config: RuntimeConfig,
    inputs: InputSources,
    controller: ControllerSnapshot,
    previous_buttons: ButtonSet,
    drive_mode: DriveMode,
    robot: Robot,
    outputs: OutputCommands,
    activity: RobotActivity,
    competition: Competition,
    field: Field,
    plan: Plan,
    plan_info: Option<PlanInfo>,
    selected_section: AutonSection,
    run: Option<AutonRunState>,
    completed_steps: usize,
    step_text: String,
    telemetry: Telemetry,
    recorder: Recorder,
    diag: Diagnostics,
    status: String,
    tick_count: u64,
    pending: VecDeque<Command>,
    file_jobs: Vec<FileJob>,
    last_recording_file: Option<String>,
    last_export_file: Option<String>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig, bindings: InputBindings) -> Self {
        let diag = Diagnostics::new(config.runtime_log_cap, config.auton_log_cap, config.input_log_cap);
        Runtime {
            inputs: InputSources::new(bindings),
            controller: ControllerSnapshot::default(),
            previous_buttons: ButtonSet::default(),
            drive_mode: DriveMode::default(),
            robot: Robot::new(&config),
            outputs: OutputCommands::default(),
            activity: RobotActivity::Idle,
            competition: Competition::new(&config),
            field: Field::new(&config.field_layout),
            plan: Plan::default(),
            plan_info: None,
            selected_section: AutonSection::default(),
            run: None,
            completed_steps: 0,
            step_text: "(idle)".to_string(),
            telemetry: Telemetry::new(config.telemetry_cap),
            recorder: Recorder::default(),
            diag,
            status: "Ready".to_string(),
            tick_count: 0,
            pending: VecDeque::new(),
            file_jobs: Vec::new(),
            last_recording_file: None,
            last_export_file: None,
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn inputs(&self) -> &InputSources {
        &self.inputs
    }

    /// Direct access to the input sources for single-threaded callers
    pub fn inputs_mut(&mut self) -> &mut InputSources {
        &mut self.inputs
    }

    pub fn phase(&self) -> CompetitionPhase {
        self.competition.phase()
    }

    pub fn pose(&self) -> Pose {
        self.robot.pose
    }

    pub fn outputs(&self) -> OutputCommands {
        self.outputs
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn is_auton_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Queue a command for the start of the next tick
    pub fn queue(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    /// File writes produced since the last call
    pub fn take_file_jobs(&mut self) -> Vec<FileJob> {
        std::mem::take(&mut self.file_jobs)
    }

    /// Whether the queued commands will clear the input sources when the
    /// next tick applies them. Session toggles are followed through the
    /// phases they would pass.
    pub fn pending_resets_inputs(&self) -> bool {
        let mut phase = self.competition.phase();
        for command in &self.pending {
            match command {
                Command::StartSession | Command::Reset => return true,
                Command::ToggleSession => match phase {
                    CompetitionPhase::Ready | CompetitionPhase::Ended => return true,
                    CompetitionPhase::Auton | CompetitionPhase::Driver => phase = CompetitionPhase::Ended,
                },
                Command::EndSession => phase = CompetitionPhase::Ended,
                _ => {}
            }
        }
        false
    }

    /// Apply a command immediately
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::StartSession => self.start_session(),
            Command::EndSession => self.end_session(reason::USER_STOP),
            Command::ToggleSession => match self.competition.phase() {
                CompetitionPhase::Ready | CompetitionPhase::Ended => self.start_session(),
                CompetitionPhase::Auton | CompetitionPhase::Driver => self.end_session(reason::USER_STOP),
            },
            Command::StartAuton => self.start_auton(),
            Command::StopAuton => self.stop_auton(reason::USER),
            Command::SelectSection(section) => {
                self.selected_section = section;
                self.diag.runtime(format!("Auton section -> {}", section));
            }
            Command::InstallPlan(loaded) => self.install_plan(*loaded),
            Command::PlanLoadFailed(message) => {
                self.status = format!("Load failed: {}", message);
                let status = self.status.clone();
                self.diag.runtime(status);
            }
            Command::SetDriveMode(mode) => {
                self.drive_mode = mode;
                self.diag.runtime(format!("Drive mode -> {}", mode));
            }
            Command::SetHeadingHold(on) => self.robot.heading_hold = on,
            Command::SetSixWheel(on) => self.robot.six_wheel = on,
            Command::SetSpeedScale(scale) => self.robot.set_speed_scale(scale),
            Command::SetSizeScale(scale) => self.robot.set_size_scale(scale),
            Command::StartRecording => self.start_recording(),
            Command::StopRecording => self.stop_recording(reason::USER),
            Command::ToggleRecording => {
                if self.recorder.is_active() {
                    self.stop_recording(reason::USER);
                } else {
                    self.start_recording();
                }
            }
            Command::ExportTelemetry => self.export_telemetry(),
            Command::ClearTelemetry => {
                self.telemetry.clear();
                self.last_export_file = None;
                self.diag.runtime("Telemetry cleared");
            }
            Command::Reset => self.reset(),
            Command::FileJobFinished(report) => self.file_job_finished(report),
        }
    }

    /// Run one full simulation step
    pub fn tick(&mut self) {
        // Update Phase 1: control commands queued since the last tick
        while let Some(command) = self.pending.pop_front() {
            self.apply(command);
        }

        self.tick_count += 1;
        let tick = self.tick_count;

        // Update Phase 2: merge input sources and detect button presses
        self.controller = self.inputs.merge();
        let pressed = self.controller.buttons.rising_edges(&self.previous_buttons);
        self.previous_buttons = self.controller.buttons;
        let events = input_events(&pressed, self.inputs.bindings());
        self.apply_toggle_actions(&events);

        // Update Phase 3: match clock
        for transition in self.competition.tick(self.config.tick_ms) {
            match transition {
                ClockTransition::AutonEnded => {
                    debug_phase!(tick, "AUTON -> DRIVER at {} ms", self.competition.remaining_ms());
                    self.stop_auton(reason::AUTO_END);
                    self.diag.runtime("Competition transition -> DRIVER");
                }
                ClockTransition::TimeUp => {
                    debug_phase!(tick, "match complete");
                    self.stop_auton(reason::TIME_UP);
                    self.outputs.zero();
                    self.diag.runtime("Competition complete");
                }
            }
        }

        // Update Phase 4: outputs from the autonomous run or the driver
        if self.run.is_some() {
            self.tick_auton();
        } else if self.competition.phase().allows_manual_control() {
            self.manual_drive();
        } else {
            self.outputs.zero();
        }

        if self.robot.six_wheel {
            self.outputs.middle = self.outputs.wheels;
        } else {
            self.outputs.middle.left = 0;
            self.outputs.middle.right = 0;
        }

        // Update Phase 5: kinematics and field interaction
        let sim_time = self.sim_time_s();
        self.robot.integrate(self.outputs.wheels, sim_time, &self.config);
        self.activity = self.current_activity();

        let field_events = self
            .field
            .update(&self.robot.pose, self.outputs.intake, self.outputs.outtake, &self.config);
        for event in field_events {
            debug_game!(tick, "{}", event);
            self.diag.runtime(format!("Game action: {}", event));
        }

        // Update Phase 6: telemetry, input log and recording
        let axes = self.reported_axes();
        let (section, step) = match &self.run {
            Some(run) => (run.section.label().to_string(), run.current_label()),
            None => (MANUAL_SECTION.to_string(), MANUAL_STEP.to_string()),
        };
        self.telemetry.push(TelemetryFrame {
            time_s: sim_time,
            axes,
            intake_action: mechanism_label(self.outputs.intake),
            outtake_action: mechanism_label(self.outputs.outtake),
            left_cmd: self.outputs.wheels.left,
            right_cmd: self.outputs.wheels.right,
            x_in: self.robot.pose.x,
            y_in: self.robot.pose.y,
            heading_deg: self.robot.pose.heading_deg,
            auton_section: section,
            auton_step: step,
        });

        for event in &events {
            self.diag.input(event.ui_text());
        }
        if self.recorder.is_active() {
            let lines: Vec<String> = events.iter().map(InputEvent::record_line).collect();
            self.recorder.record_tick(axes, lines.iter().map(String::as_str));
        }
    }

    pub fn sim_time_s(&self) -> f64 {
        self.tick_count as f64 * self.config.dt()
    }

    /// Axis values reported to telemetry and recordings. During a run the
    /// right/left stick columns carry the commanded wheel outputs.
    fn reported_axes(&self) -> [i32; 4] {
        let mut axes = self.controller.axes;
        if self.run.is_some() {
            axes[1] = self.outputs.wheels.right;
            axes[2] = self.outputs.wheels.left;
        }
        axes
    }

    fn apply_toggle_actions(&mut self, events: &[InputEvent]) {
        for event in events {
            match event.action {
                Some(ControllerAction::HeadingHoldOn) => self.robot.heading_hold = true,
                Some(ControllerAction::HeadingHoldOff) => self.robot.heading_hold = false,
                Some(ControllerAction::SixWheelOn) => self.robot.six_wheel = true,
                Some(ControllerAction::SixWheelOff) => self.robot.six_wheel = false,
                _ => {}
            }
            debug_input!(self.tick_count, "{}", event.ui_text());
        }
    }

    fn manual_drive(&mut self) {
        let ctx = DriveContext {
            heading_hold: self.robot.heading_hold,
            heading_deg: self.robot.pose.heading_deg,
            speed_scale: self.robot.speed_scale,
        };
        let dpad = DpadFlags::from_snapshot(&self.controller);
        self.outputs.wheels = compute_wheel_commands(&self.controller, self.drive_mode, dpad, &ctx, &self.config);

        let held = |action: ControllerAction| {
            let button = self.inputs.bindings().button_for(action);
            self.controller.buttons.is_pressed(button)
        };
        self.outputs.intake = if held(ControllerAction::IntakeIn) {
            AXIS_LIMIT
        } else if held(ControllerAction::IntakeOut) {
            -AXIS_LIMIT
        } else {
            0
        };
        self.outputs.outtake = if held(ControllerAction::OuttakeOut) {
            AXIS_LIMIT
        } else if held(ControllerAction::OuttakeIn) {
            -AXIS_LIMIT
        } else {
            0
        };

        debug_drive!(
            self.tick_count,
            "{} L:{} R:{} intake:{} outtake:{}",
            self.drive_mode,
            self.outputs.wheels.left,
            self.outputs.wheels.right,
            self.outputs.intake,
            self.outputs.outtake
        );
    }

    fn tick_auton(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let events = run.tick(self.robot.pose.heading_deg, &self.config, &mut self.outputs);
        self.completed_steps = run.current_index();

        for event in events {
            match event {
                AutonEvent::StepStarted { number, total, label } => {
                    debug_auton!(self.tick_count, "step {}/{} {}", number, total, label);
                    self.diag.auton(format!("Step {}/{}: {}", number, total, label));
                    self.recorder.push(format!("AUTON_STEP:{}", label));
                    self.step_text = label;
                }
                AutonEvent::TurnTimedOut { label, error_deg } => {
                    self.diag
                        .auton(format!("{} timed out ({:.1} deg off target)", label, error_deg));
                }
                AutonEvent::Finished => self.finish_auton(reason::DONE),
            }
        }
    }

    fn start_auton(&mut self) {
        let section = self.selected_section;
        let steps = self.plan.steps(section).to_vec();
        let total = steps.len();
        let Some(run) = AutonRunState::start(section, steps) else {
            self.status = format!("No {} steps loaded.", section);
            let status = self.status.clone();
            self.diag.runtime(status);
            return;
        };

        self.stop_auton(reason::RESTART);
        self.run = Some(run);
        self.completed_steps = 0;
        self.step_text = "(preparing)".to_string();
        self.outputs.zero();
        self.status = format!("Auton running ({})", section);
        self.diag.auton(format!("Auton started ({}, {} steps)", section, total));
        self.recorder.push(format!("AUTON_START:{}", section));
    }

    fn stop_auton(&mut self, why: &str) {
        if self.run.is_some() {
            self.finish_auton(why);
        }
    }

    fn finish_auton(&mut self, why: &str) {
        self.run = None;
        self.outputs.zero();
        let done = why == reason::DONE;
        self.step_text = if done { "(complete)" } else { "(stopped)" }.to_string();
        self.status = if done { "Auton complete" } else { "Auton stopped" }.to_string();
        self.diag.auton(format!("Auton stopped ({})", why));
        self.recorder.push(format!("AUTON_STOP:{}", why));
    }

    fn start_session(&mut self) {
        self.clear_inputs();
        self.diag.input.clear();
        self.robot.reset_pose(&self.config);
        self.field.reset(&self.config.field_layout);
        self.competition.start_session();
        self.status = "Competition match started".to_string();
        self.diag.runtime("Competition start -> AUTON");
        self.start_auton();
    }

    fn end_session(&mut self, why: &str) {
        self.stop_auton(why);
        self.competition.end_session(why);
        self.outputs.zero();
        self.status = "Competition ended".to_string();
        self.diag.runtime(format!("Competition ended ({})", why));
    }

    fn clear_inputs(&mut self) {
        self.inputs.clear_all();
        self.controller = ControllerSnapshot::default();
        self.previous_buttons = ButtonSet::default();
    }

    fn install_plan(&mut self, loaded: LoadedPlan) {
        for skipped in &loaded.skipped {
            self.diag.runtime(format!(
                "Skipped invalid {} step line {}: {} ({})",
                skipped.section, skipped.line, skipped.text, skipped.error
            ));
        }
        self.diag.runtime(format!(
            "Parsed auton steps -> GPS: {}, BASIC: {}",
            loaded.plan.gps.len(),
            loaded.plan.basic.len()
        ));
        self.status = format!("Loaded slot {} from {}", loaded.slot, loaded.file_name);
        let status = self.status.clone();
        self.diag.runtime(status);

        self.plan_info = Some(PlanInfo {
            slot: loaded.slot,
            file_name: loaded.file_name,
            source: loaded.source,
            gps_steps: loaded.plan.gps.len(),
            basic_steps: loaded.plan.basic.len(),
        });
        self.plan = loaded.plan;
    }

    fn start_recording(&mut self) {
        let stamp = timestamp_for_file_name();
        if self.recorder.start(self.drive_mode, &stamp) {
            let name = self.recorder.file_name().unwrap_or_default().to_string();
            self.diag.runtime(format!("Recording started -> {}", name));
        }
    }

    fn stop_recording(&mut self, why: &str) {
        if let Some(finished) = self.recorder.stop(why) {
            self.status = format!("Saving recording to {}", finished.file_name);
            self.file_jobs.push(FileJob::Recording(finished));
        }
    }

    fn export_telemetry(&mut self) {
        if self.telemetry.is_empty() {
            self.status = "No telemetry to export.".to_string();
            let status = self.status.clone();
            self.diag.runtime(status);
            return;
        }
        let file_name = export_file_name(&timestamp_for_file_name());
        self.status = format!("Exporting telemetry to {}", file_name);
        self.file_jobs.push(FileJob::TelemetryExport {
            file_name,
            contents: self.telemetry.to_csv(),
            frame_count: self.telemetry.len(),
        });
    }

    fn file_job_finished(&mut self, report: FileJobReport) {
        let FileJobReport {
            kind,
            file_name,
            result,
        } = report;
        match (kind, result) {
            (FileJobKind::Recording { line_count }, Ok(())) => {
                self.status = format!("Recording saved to {}", file_name);
                self.diag
                    .runtime(format!("Recording saved ({} lines) -> {}", line_count, file_name));
                self.last_recording_file = Some(file_name);
            }
            (FileJobKind::TelemetryExport { frame_count }, Ok(())) => {
                self.status = format!("Telemetry exported to {}", file_name);
                self.diag.runtime(format!(
                    "Telemetry export complete ({} frames) -> {}",
                    frame_count, file_name
                ));
                self.last_export_file = Some(file_name);
            }
            (FileJobKind::Recording { .. }, Err(e)) => {
                self.status = format!("Recording save failed: {}", e);
                let status = self.status.clone();
                self.diag.runtime(status);
            }
            (FileJobKind::TelemetryExport { .. }, Err(e)) => {
                self.status = format!("Telemetry export failed: {}", e);
                let status = self.status.clone();
                self.diag.runtime(status);
            }
        }
    }

    fn reset(&mut self) {
        self.stop_auton(reason::RESET);
        self.stop_recording(reason::RESET);
        self.clear_inputs();

        self.tick_count = 0;
        self.outputs.zero();
        self.activity = RobotActivity::Idle;
        self.robot = Robot::new(&self.config);
        self.telemetry.clear();
        self.last_export_file = None;
        self.competition.reset();
        self.field.reset(&self.config.field_layout);
        self.completed_steps = 0;
        self.step_text = "(idle)".to_string();
        self.status = "Reset".to_string();
        self.diag.runtime("Simulation reset");
    }

    fn current_activity(&self) -> RobotActivity {
        let wheels = self.outputs.wheels;
        if self.run.is_some() {
            RobotActivity::Auton
        } else if self.outputs.outtake != 0 {
            RobotActivity::Outtake
        } else if self.outputs.intake != 0 {
            RobotActivity::Intake
        } else if wheels.left.abs() > 10 || wheels.right.abs() > 10 {
            RobotActivity::Moving
        } else {
            RobotActivity::Idle
        }
    }

    pub fn auton_progress(&self) -> AutonProgress {
        match &self.run {
            Some(run) => AutonProgress {
                running: true,
                section: run.section,
                current_index: run.current_index(),
                total_steps: run.total_steps(),
                completed_steps: self.completed_steps,
                step_text: self.step_text.clone(),
            },
            None => AutonProgress {
                running: false,
                section: self.selected_section,
                current_index: 0,
                total_steps: self.plan.steps(self.selected_section).len(),
                completed_steps: self.completed_steps,
                step_text: self.step_text.clone(),
            },
        }
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        RuntimeSnapshot {
            tick_count: self.tick_count,
            sim_time_s: self.sim_time_s(),
            pose: self.robot.pose,
            path: self.robot.path().iter().copied().collect(),
            outputs: self.outputs,
            controller: self.controller,
            drive_mode: self.drive_mode,
            heading_hold: self.robot.heading_hold,
            six_wheel: self.robot.six_wheel,
            speed_scale: self.robot.speed_scale,
            size_scale: self.robot.size_scale,
            activity: self.activity,
            phase: self.competition.phase(),
            clock_remaining_s: self.competition.remaining_secs(),
            clock_text: self.competition.clock_text(),
            competition_summary: self.competition.summary.clone(),
            auton: self.auton_progress(),
            selected_section: self.selected_section,
            plan: self.plan_info.clone(),
            blocks: self.field.blocks.clone(),
            tubes: self.field.tubes.clone(),
            scored_blocks: self.field.scored_count,
            carried_blocks: self.field.carried_count(),
            field_status: self.field.status_text.clone(),
            telemetry_frames: self.telemetry.len(),
            recording: self.recorder.is_active(),
            recording_lines: self.recorder.line_count(),
            recording_preview: self.recorder.preview(self.config.recording_preview_lines),
            runtime_log: self.diag.runtime.to_vec(),
            auton_log: self.diag.auton.to_vec(),
            input_log: self.diag.input.to_vec(),
            status: self.status.clone(),
            last_recording_file: self.last_recording_file.clone(),
            last_export_file: self.last_export_file.clone(),
            gamepad_name: self.inputs.gamepad_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auton::AutonStep;
    use crate::field::BlockState;
    use crate::types::ControllerButton;
    use assert_approx_eq::assert_approx_eq;

    fn runtime() -> Runtime {
        Runtime::new(RuntimeConfig::default(), InputBindings::default())
    }

    fn plan_with(gps: Vec<AutonStep>) -> Command {
        Command::InstallPlan(Box::new(LoadedPlan {
            slot: 1,
            file_name: "auton_plans_slot1.txt".to_string(),
            source: PlanSource::SdCard,
            plan: Plan {
                gps,
                basic: Vec::new(),
            },
            skipped: Vec::new(),
        }))
    }

    fn run_ticks(rt: &mut Runtime, n: usize) {
        for _ in 0..n {
            rt.tick();
        }
    }

    #[test]
    fn test_ready_phase_suppresses_manual_drive() {
        let mut rt = runtime();
        rt.inputs_mut().set_touch_axes([0, 100, 100, 0]);
        run_ticks(&mut rt, 10);
        assert_eq!(rt.outputs().wheels.left, 0);
        assert_approx_eq!(rt.pose().x, 24.0);
        assert_eq!(rt.telemetry().len(), 10);
    }

    #[test]
    fn test_session_runs_auton_then_driver_then_ends() {
        let mut rt = runtime();
        rt.apply(plan_with(vec![AutonStep::DriveMs {
            speed: 100,
            duration_ms: 200,
        }]));
        rt.queue(Command::StartSession);
        rt.tick();
        assert_eq!(rt.phase(), CompetitionPhase::Auton);
        assert!(rt.is_auton_running());
        assert_eq!(rt.outputs().wheels.left, 100);

        run_ticks(&mut rt, 9);
        assert!(!rt.is_auton_running());
        assert!(rt.pose().x > 24.0);
        let frame = rt.telemetry().frames()[0].clone();
        assert_eq!(frame.auton_section, "GPS");
        assert_eq!(frame.axes[2], 100);

        // Auton phase without a script holds still even with stick input
        rt.inputs_mut().set_touch_axes([0, 80, 80, 0]);
        rt.tick();
        assert_eq!(rt.outputs().wheels.left, 0);

        run_ticks(&mut rt, 739);
        assert_eq!(rt.phase(), CompetitionPhase::Driver);
        assert_eq!(rt.outputs().wheels.left, 80);
        assert_eq!(rt.telemetry().last().map(|f| f.auton_step.as_str()), Some(MANUAL_STEP));

        run_ticks(&mut rt, 5250);
        assert_eq!(rt.phase(), CompetitionPhase::Ended);
        assert_eq!(rt.outputs(), OutputCommands::default());
        assert_eq!(rt.snapshot().clock_text, "0:00");
    }

    #[test]
    fn test_auton_cut_off_at_driver_transition() {
        let mut rt = runtime();
        rt.apply(plan_with(vec![AutonStep::WaitMs { duration_ms: 60_000 }]));
        rt.apply(Command::StartSession);
        run_ticks(&mut rt, 750);
        assert_eq!(rt.phase(), CompetitionPhase::Driver);
        assert!(!rt.is_auton_running());
        let log = rt.snapshot().auton_log;
        assert_eq!(log.last().map(String::as_str), Some("Auton stopped (auto-end)"));
    }

    #[test]
    fn test_start_without_steps_reports_status() {
        let mut rt = runtime();
        rt.apply(Command::StartAuton);
        assert!(!rt.is_auton_running());
        assert_eq!(rt.status(), "No GPS steps loaded.");
    }

    #[test]
    fn test_restart_replaces_running_auton() {
        let mut rt = runtime();
        rt.apply(plan_with(vec![AutonStep::WaitMs { duration_ms: 1000 }]));
        rt.apply(Command::StartAuton);
        run_ticks(&mut rt, 3);
        rt.apply(Command::StartAuton);
        let log = rt.snapshot().auton_log;
        assert!(log.iter().any(|l| l == "Auton stopped (restart)"));
        assert_eq!(rt.auton_progress().current_index, 0);
        rt.apply(Command::StopAuton);
        assert!(!rt.is_auton_running());
    }

    #[test]
    fn test_manual_pickup_and_score_in_driver() {
        let mut config = RuntimeConfig::default();
        config.start_position = crate::types::Point { x: 64.0, y: 64.0 };
        config.auton_end_remaining_ms = config.match_total_ms;
        let mut rt = Runtime::new(config, InputBindings::default());
        rt.apply(Command::StartSession);
        rt.tick();
        assert_eq!(rt.phase(), CompetitionPhase::Driver);

        rt.inputs_mut().set_touch_button(ControllerButton::L1, true);
        rt.tick();
        assert_eq!(rt.field().blocks[0].state, BlockState::Carried);
        assert_eq!(rt.snapshot().activity, RobotActivity::Intake);
        let input_log = rt.snapshot().input_log;
        assert_eq!(input_log.last().map(String::as_str), Some("BUTTON L1 PRESSED : INTAKE_IN"));

        rt.inputs_mut().set_touch_button(ControllerButton::L1, false);
        rt.inputs_mut().set_touch_button(ControllerButton::R1, true);
        rt.tick();
        // No tube in reach, so the block is dropped ahead of the robot
        assert_eq!(rt.field().blocks[0].state, BlockState::OnField);
        assert_eq!(rt.field().carried_count(), 0);
    }

    #[test]
    fn test_button_edges_toggle_drive_flags() {
        let mut rt = runtime();
        rt.inputs_mut().set_touch_button(ControllerButton::A, true);
        rt.inputs_mut().set_touch_button(ControllerButton::Y, true);
        rt.tick();
        let snap = rt.snapshot();
        assert!(snap.heading_hold);
        assert!(snap.six_wheel);

        rt.inputs_mut().clear_all();
        rt.inputs_mut().set_touch_button(ControllerButton::X, true);
        rt.tick();
        assert!(!rt.snapshot().six_wheel);
        assert!(rt.snapshot().heading_hold);
    }

    #[test]
    fn test_six_wheel_mirrors_middle() {
        let mut config = RuntimeConfig::default();
        config.auton_end_remaining_ms = config.match_total_ms;
        let mut rt = Runtime::new(config, InputBindings::default());
        rt.apply(Command::StartSession);
        rt.apply(Command::SetSixWheel(true));
        rt.inputs_mut().set_touch_axes([0, -50, 70, 0]);
        rt.tick();
        rt.tick();
        assert_eq!(rt.outputs().middle, rt.outputs().wheels);
        assert_eq!(rt.outputs().wheels.left, 70);
        assert_eq!(rt.outputs().wheels.right, -50);
        rt.apply(Command::SetSixWheel(false));
        rt.tick();
        assert_eq!(rt.outputs().middle.left, 0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut rt = runtime();
        rt.apply(plan_with(vec![AutonStep::DriveMs {
            speed: 90,
            duration_ms: 400,
        }]));
        rt.apply(Command::StartSession);
        run_ticks(&mut rt, 15);

        rt.apply(Command::Reset);
        let once = rt.snapshot();
        rt.apply(Command::Reset);
        let twice = rt.snapshot();

        assert_eq!(once.pose, twice.pose);
        assert_eq!(once.phase, CompetitionPhase::Ready);
        assert_eq!(once.phase, twice.phase);
        assert_eq!(once.blocks, twice.blocks);
        assert_eq!(once.tubes, twice.tubes);
        assert_eq!(once.telemetry_frames, 0);
        assert_eq!(twice.tick_count, 0);
    }

    #[test]
    fn test_recording_flow_produces_file_job() {
        let mut rt = runtime();
        rt.apply(plan_with(vec![AutonStep::WaitMs { duration_ms: 20 }]));
        rt.apply(Command::StartRecording);
        rt.apply(Command::StartAuton);
        rt.tick();
        rt.apply(Command::StopRecording);

        let jobs = rt.take_file_jobs();
        assert_eq!(jobs.len(), 1);
        let FileJob::Recording(rec) = &jobs[0] else {
            panic!("expected a recording job");
        };
        let lines: Vec<&str> = rec.contents.lines().collect();
        assert_eq!(lines[0], "REC_START:VIRTUAL_BRAIN");
        assert_eq!(lines[1], "DRIVE_MODE:TANK");
        assert_eq!(lines[2], "AUTON_START:GPS");
        assert_eq!(lines[3], "AUTON_STEP:WAIT_MS 20");
        assert_eq!(lines[4], "AUTON_STOP:done");
        assert_eq!(lines[5], "AXIS1:0");
        assert_eq!(lines.last(), Some(&"REC_STOP:user"));
        assert!(rt.take_file_jobs().is_empty());
    }

    #[test]
    fn test_export_telemetry() {
        let mut rt = runtime();
        rt.apply(Command::ExportTelemetry);
        assert!(rt.take_file_jobs().is_empty());
        assert_eq!(rt.status(), "No telemetry to export.");

        run_ticks(&mut rt, 3);
        rt.apply(Command::ExportTelemetry);
        let jobs = rt.take_file_jobs();
        let FileJob::TelemetryExport {
            contents,
            frame_count,
            file_name,
        } = &jobs[0]
        else {
            panic!("expected an export job");
        };
        assert_eq!(*frame_count, 3);
        assert_eq!(contents.lines().count(), 4);
        assert!(file_name.starts_with("virtual_fieldreplay_"));

        rt.apply(Command::FileJobFinished(FileJobReport {
            kind: FileJobKind::TelemetryExport { frame_count: 3 },
            file_name: file_name.clone(),
            result: Ok(()),
        }));
        assert_eq!(rt.snapshot().last_export_file.as_deref(), Some(file_name.as_str()));
    }

    #[test]
    fn test_install_plan_logs_skipped_lines() {
        let mut rt = runtime();
        let loaded = LoadedPlan::from_text("[GPS]\nDRIVE_MS,1\nWAIT_MS,5\n", 2, "auton_plans_slot2.txt", PlanSource::SdCard);
        rt.apply(Command::InstallPlan(Box::new(loaded)));
        let snap = rt.snapshot();
        assert!(snap.runtime_log.iter().any(|l| l.contains("Skipped invalid GPS step line 1")));
        let info = snap.plan.expect("plan installed");
        assert_eq!(info.slot, 2);
        assert_eq!(info.gps_steps, 1);
        assert_eq!(snap.auton.total_steps, 1);
    }

    #[test]
    fn test_auton_outtake_step_reverses_both_mechanisms() {
        let mut config = RuntimeConfig::default();
        config.start_position = crate::types::Point { x: 64.0, y: 64.0 };
        config.auton_end_remaining_ms = config.match_total_ms;
        let mut rt = Runtime::new(config, InputBindings::default());
        rt.apply(Command::StartSession);
        rt.tick();
        rt.inputs_mut().set_touch_button(ControllerButton::L1, true);
        rt.tick();
        rt.inputs_mut().set_touch_button(ControllerButton::L1, false);
        rt.tick();
        assert_eq!(rt.field().carried_count(), 1);

        rt.apply(plan_with(vec![AutonStep::OuttakeOn, AutonStep::WaitMs { duration_ms: 100 }]));
        rt.apply(Command::StartAuton);
        rt.tick();
        rt.tick();
        assert_eq!(rt.outputs().intake, -127);
        assert_eq!(rt.outputs().outtake, -127);
        // A reversed outtake is not a scoring edge
        assert_eq!(rt.field().carried_count(), 1);
        assert_eq!(rt.telemetry().last().map(|f| f.outtake_action), Some("REVERSE"));
    }

    #[test]
    fn test_pending_input_reset_follows_session_toggles() {
        let mut rt = runtime();
        assert!(!rt.pending_resets_inputs());
        rt.queue(Command::SetSixWheel(true));
        assert!(!rt.pending_resets_inputs());
        rt.queue(Command::ToggleSession);
        assert!(rt.pending_resets_inputs());
        rt.tick();
        assert_eq!(rt.phase(), CompetitionPhase::Auton);

        // Toggling a running session ends it; a second toggle starts a new one
        rt.queue(Command::ToggleSession);
        assert!(!rt.pending_resets_inputs());
        rt.queue(Command::ToggleSession);
        assert!(rt.pending_resets_inputs());
        rt.tick();
        assert!(!rt.pending_resets_inputs());
        rt.queue(Command::Reset);
        assert!(rt.pending_resets_inputs());
    }
}
