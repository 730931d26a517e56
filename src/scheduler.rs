//! Real-time driver around [`Runtime`].
//!
//! A dedicated thread fires one simulation step per tick period. Everything
//! else talks to the runtime indirectly: control commands go through a
//! channel and are applied at the start of the next tick, input updates land
//! in a staged copy of the input sources that the tick copies under one
//! lock, and the presentation layer reads the last published snapshot.
//! File I/O never happens on the tick thread.

use crate::auton::{PlanError, plan};
use crate::command::{Command, FileJob, FileJobReport};
use crate::config::{InputBindings, RuntimeConfig};
use crate::input::InputSources;
use crate::runtime::{Runtime, RuntimeSnapshot};
use crate::storage::Storage;
use crate::types::{ControllerButton, DriveMode};
use crossbeam_channel::{Receiver, Sender, select};
use log::{error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("failed to spawn tick thread: {0}")]
    Spawn(#[source] std::io::Error),
}

// Poisoned locks are recovered rather than propagated
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    runtime: Mutex<Runtime>,
    commands_tx: Sender<Command>,
    commands_rx: Receiver<Command>,
    staged: Mutex<InputSources>,
    snapshot: RwLock<Arc<RuntimeSnapshot>>,
    outbox: Mutex<Vec<FileJob>>,
}

impl Shared {
    /// One full tick: commands, inputs, simulation, publish
    fn step(&self) {
        let mut rt = lock(&self.runtime);
        for command in self.commands_rx.try_iter() {
            rt.queue(command);
        }
        {
            // Cleared under the same lock as the copy so inputs staged while
            // the tick runs survive into the next one
            let mut staged = lock(&self.staged);
            if rt.pending_resets_inputs() {
                staged.clear_all();
            }
            rt.inputs_mut().copy_sources_from(&staged);
        }

        rt.tick();
        self.publish(&mut rt);
    }

    fn publish(&self, rt: &mut Runtime) {
        let snapshot = Arc::new(rt.snapshot());
        let jobs = rt.take_file_jobs();
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
        if !jobs.is_empty() {
            lock(&self.outbox).extend(jobs);
        }
    }
}

/// The timer thread and the channel used to stop it
struct TickDriver {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl TickDriver {
    fn spawn(shared: Arc<Shared>, period: Duration) -> Result<Self, SchedulerError> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let ticker = crossbeam_channel::tick(period);

        let handle = thread::Builder::new()
            .name("brain-tick".to_string())
            .spawn(move || {
                loop {
                    select! {
                        recv(ticker) -> _ => shared.step(),
                        recv(stop_rx) -> _ => break,
                    }
                }
            })
            .map_err(SchedulerError::Spawn)?;

        Ok(TickDriver { stop_tx, handle })
    }

    fn stop(self) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            error!(target: "scheduler", "Tick thread panicked");
        }
    }
}

/// A runtime plus its tick driver and storage, safe to share with a UI thread
pub struct VirtualBrain<S: Storage> {
    shared: Arc<Shared>,
    storage: S,
    period: Duration,
    driver: Option<TickDriver>,
}

impl<S: Storage> VirtualBrain<S> {
    pub fn new(config: RuntimeConfig, bindings: InputBindings, storage: S) -> Self {
        let period = Duration::from_millis(config.tick_ms.max(1));
        let staged = InputSources::new(bindings.clone());
        let runtime = Runtime::new(config, bindings);
        let snapshot = Arc::new(runtime.snapshot());
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();

        VirtualBrain {
            shared: Arc::new(Shared {
                runtime: Mutex::new(runtime),
                commands_tx,
                commands_rx,
                staged: Mutex::new(staged),
                snapshot: RwLock::new(snapshot),
                outbox: Mutex::new(Vec::new()),
            }),
            storage,
            period,
            driver: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_some()
    }

    /// Start the real-time driver; does nothing when already running
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.driver.is_some() {
            return Ok(());
        }
        self.driver = Some(TickDriver::spawn(Arc::clone(&self.shared), self.period)?);
        info!(target: "scheduler", "Tick driver started ({} ms)", self.period.as_millis());
        Ok(())
    }

    /// Stop the driver after the tick in progress, if any, completes
    pub fn pause(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.stop();
            info!(target: "scheduler", "Tick driver paused");
        }
    }

    /// Stop the driver and reset the simulation. Commands sent before the
    /// reset are applied first.
    pub fn reset(&mut self) {
        self.pause();
        let mut rt = lock(&self.shared.runtime);
        for command in self.shared.commands_rx.try_iter() {
            rt.apply(command);
        }
        rt.apply(Command::Reset);
        lock(&self.shared.staged).clear_all();
        self.shared.publish(&mut rt);
    }

    /// Run exactly one tick on the calling thread
    pub fn step_once(&self) {
        self.shared.step();
    }

    /// Latest published state
    pub fn snapshot(&self) -> Arc<RuntimeSnapshot> {
        let guard = self.shared.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Queue a command for the next tick
    pub fn send(&self, command: Command) {
        // Both channel ends live in `shared`, so sending cannot fail
        let _ = self.shared.commands_tx.send(command);
    }

    pub fn start_session(&self) {
        self.send(Command::StartSession);
    }

    pub fn toggle_session(&self) {
        self.send(Command::ToggleSession);
    }

    pub fn start_auton(&self) {
        self.send(Command::StartAuton);
    }

    pub fn stop_auton(&self) {
        self.send(Command::StopAuton);
    }

    pub fn set_drive_mode(&self, mode: DriveMode) {
        self.send(Command::SetDriveMode(mode));
    }

    pub fn toggle_recording(&self) {
        self.send(Command::ToggleRecording);
    }

    pub fn export_telemetry(&self) {
        self.send(Command::ExportTelemetry);
    }

    fn with_staged(&self, f: impl FnOnce(&mut InputSources)) {
        f(&mut lock(&self.shared.staged));
    }

    pub fn set_keyboard_token(&self, raw: &str, down: bool) {
        self.with_staged(|inputs| inputs.set_keyboard_token(raw, down));
    }

    pub fn set_keyboard_enabled(&self, enabled: bool) {
        self.with_staged(|inputs| inputs.set_keyboard_enabled(enabled));
    }

    pub fn set_gamepad_axes(&self, axis1: f32, axis2: f32, axis3: f32, axis4: f32) {
        self.with_staged(|inputs| inputs.set_gamepad_axes(axis1, axis2, axis3, axis4));
    }

    pub fn set_gamepad_button(&self, button: ControllerButton, pressed: bool) {
        self.with_staged(|inputs| inputs.set_gamepad_button(button, pressed));
    }

    pub fn set_gamepad_connection(&self, name: Option<String>) {
        self.with_staged(|inputs| inputs.set_gamepad_connection(name));
    }

    pub fn set_touch_axes(&self, axes: [i32; 4]) {
        self.with_staged(|inputs| inputs.set_touch_axes(axes));
    }

    pub fn set_touch_button(&self, button: ControllerButton, pressed: bool) {
        self.with_staged(|inputs| inputs.set_touch_button(button, pressed));
    }

    /// Read and parse the active slot's plan, then hand it to the runtime.
    /// Failures become a status message on the next tick as well.
    pub fn load_active_plan(&self) -> Result<(), PlanError> {
        match plan::load_active_plan(&self.storage) {
            Ok(loaded) => {
                self.send(Command::InstallPlan(Box::new(loaded)));
                Ok(())
            }
            Err(e) => {
                warn!(target: "storage", "Plan load failed: {}", e);
                self.send(Command::PlanLoadFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Persist a new active slot and reload the plan
    pub fn set_slot(&self, slot: i64) -> Result<u8, PlanError> {
        let slot = match plan::write_slot(&self.storage, slot) {
            Ok(slot) => slot,
            Err(e) => {
                self.send(Command::PlanLoadFailed(e.to_string()));
                return Err(e);
            }
        };
        self.load_active_plan()?;
        Ok(slot)
    }

    pub fn cycle_slot(&self, delta: i32) -> Result<u8, PlanError> {
        let current = plan::read_active_slot(&self.storage);
        self.set_slot(plan::cycle_slot(current, delta) as i64)
    }

    /// Write out finished recordings and exports. Results are reported back
    /// to the runtime and returned to the caller.
    pub fn write_pending_files(&self) -> Vec<FileJobReport> {
        let jobs = std::mem::take(&mut *lock(&self.shared.outbox));
        jobs.iter()
            .map(|job| {
                let report = job.run(&self.storage);
                self.send(Command::FileJobFinished(report.clone()));
                report
            })
            .collect()
    }
}

impl<S: Storage> Drop for VirtualBrain<S> {
    fn drop(&mut self) {
        self.pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auton::PlanSource;
    use crate::competition::CompetitionPhase;
    use crate::storage::MemoryStorage;
    use std::time::Instant;

    const PLAN: &str = "[GPS]\nDRIVE_MS,100,100\n[BASIC]\nWAIT_MS,40\n";

    fn brain(files: &[(&str, &str)]) -> VirtualBrain<MemoryStorage> {
        VirtualBrain::new(
            RuntimeConfig::default(),
            InputBindings::default(),
            MemoryStorage::with_files(files.iter().copied()),
        )
    }

    #[test]
    fn test_commands_apply_on_next_tick() {
        let brain = brain(&[]);
        brain.set_drive_mode(DriveMode::Arcade);
        assert_eq!(brain.snapshot().drive_mode, DriveMode::Tank);
        brain.step_once();
        let snap = brain.snapshot();
        assert_eq!(snap.drive_mode, DriveMode::Arcade);
        assert_eq!(snap.tick_count, 1);
    }

    #[test]
    fn test_staged_inputs_reach_the_tick() {
        let brain = brain(&[]);
        brain.set_touch_axes([0, 0, 90, 0]);
        brain.set_gamepad_axes(0.0, 0.0, -0.5, 0.0);
        brain.step_once();
        assert_eq!(brain.snapshot().controller.axes[2], 90);
    }

    #[test]
    fn test_session_start_clears_staged_inputs() {
        let brain = brain(&[]);
        brain.set_touch_button(ControllerButton::L1, true);
        brain.start_session();
        brain.step_once();
        assert_eq!(brain.snapshot().phase, CompetitionPhase::Auton);
        brain.step_once();
        assert!(!brain.snapshot().controller.buttons.is_pressed(ControllerButton::L1));
    }

    #[test]
    fn test_inputs_staged_after_session_start_are_kept() {
        let brain = brain(&[]);
        brain.set_touch_button(ControllerButton::L1, true);
        brain.start_session();
        brain.step_once();
        assert!(!brain.snapshot().controller.buttons.is_pressed(ControllerButton::L1));

        brain.set_touch_button(ControllerButton::R1, true);
        brain.step_once();
        assert!(brain.snapshot().controller.buttons.is_pressed(ControllerButton::R1));
        brain.step_once();
        assert!(brain.snapshot().controller.buttons.is_pressed(ControllerButton::R1));
    }

    #[test]
    fn test_plan_loading() {
        let brain = brain(&[("auton_slot.txt", "2"), ("auton_plans_slot2.txt", PLAN)]);
        brain.load_active_plan().expect("plan should load");
        brain.step_once();
        let info = brain.snapshot().plan.clone().expect("plan installed");
        assert_eq!(info.slot, 2);
        assert_eq!(info.source, PlanSource::SdCard);
        assert_eq!((info.gps_steps, info.basic_steps), (1, 1));
    }

    #[test]
    fn test_missing_plan_reports_status() {
        let brain = brain(&[]);
        assert!(matches!(brain.load_active_plan(), Err(PlanError::NoPlanFile { slot: 1 })));
        brain.step_once();
        assert!(brain.snapshot().status.starts_with("Load failed"));
    }

    #[test]
    fn test_slot_changes_persist() {
        let brain = brain(&[("auton_plans.txt", PLAN)]);
        assert_eq!(brain.set_slot(3).expect("slot written"), 3);
        assert_eq!(brain.storage().read("auton_slot.txt").expect("slot file").trim(), "3");
        assert_eq!(brain.cycle_slot(1).expect("slot cycled"), 1);
        assert!(brain.set_slot(7).is_err());
    }

    #[test]
    fn test_recording_is_written_outside_the_tick() {
        let brain = brain(&[]);
        brain.toggle_recording();
        brain.step_once();
        brain.toggle_recording();
        brain.step_once();

        let reports = brain.write_pending_files();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].result, Ok(()));
        let text = brain.storage().read(&reports[0].file_name).expect("recording written");
        assert!(text.starts_with("REC_START:VIRTUAL_BRAIN\n"));

        brain.step_once();
        let snap = brain.snapshot();
        assert_eq!(snap.last_recording_file.as_deref(), Some(reports[0].file_name.as_str()));
        assert!(brain.write_pending_files().is_empty());
    }

    #[test]
    fn test_reset_stops_driver() {
        let mut brain = brain(&[]);
        brain.start_session();
        brain.step_once();
        brain.step_once();
        brain.reset();
        let snap = brain.snapshot();
        assert_eq!(snap.tick_count, 0);
        assert_eq!(snap.phase, CompetitionPhase::Ready);
        assert!(!brain.is_running());
    }

    #[test]
    fn test_realtime_driver_ticks_until_paused() {
        let mut config = RuntimeConfig::default();
        config.tick_ms = 2;
        let mut brain = VirtualBrain::new(config, InputBindings::default(), MemoryStorage::new());
        brain.start().expect("driver should start");
        brain.start().expect("second start is a no-op");
        assert!(brain.is_running());

        let deadline = Instant::now() + Duration::from_secs(5);
        while brain.snapshot().tick_count < 5 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        brain.pause();
        assert!(!brain.is_running());

        let ticks = brain.snapshot().tick_count;
        assert!(ticks >= 5, "only {} ticks ran", ticks);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(brain.snapshot().tick_count, ticks);
    }
}
