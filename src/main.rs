use brainsim::auton::{AutonSection, LoadedPlan};
use brainsim::command::Command;
use brainsim::competition::CompetitionPhase;
use brainsim::config::ConfigFile;
use brainsim::logging;
use brainsim::storage::{SdCardStorage, Storage};
use brainsim::types::DriveMode;
use brainsim::VirtualBrain;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

// --- Command Line Arguments ---
#[derive(Parser, Debug)]
#[command(author, version, about = "Headless virtual robot brain", long_about = None)]
struct Args {
    /// Directory standing in for the robot's SD card
    #[arg(long, default_value = "sd")]
    sd_root: PathBuf,

    /// JSON configuration file overriding the built-in constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Auton section to run at match start (GPS or BASIC)
    #[arg(long, default_value = "GPS")]
    section: AutonSection,

    /// Persist this auton slot (1-3) before loading the plan
    #[arg(long)]
    slot: Option<i64>,

    /// Drive mode (tank, arcade, dpad)
    #[arg(long, default_value = "tank")]
    drive_mode: DriveMode,

    /// Maximum number of ticks to simulate (defaults to one full match)
    #[arg(long)]
    ticks: Option<u64>,

    /// Run on the real-time tick driver instead of as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Record controller activity to the SD card
    #[arg(long)]
    record: bool,

    /// Export telemetry as CSV when the run ends
    #[arg(long)]
    export: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Debug filter to specify log topics (e.g., "auton,phase,game")
    /// Available topics: input, drive, auton, game, phase, runtime, scheduler, storage
    #[arg(long)]
    debug_filter: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = logging::init_logger(logging::parse_level(&args.log_level), args.debug_filter.clone()) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    let file = match &args.config {
        Some(path) => match ConfigFile::load(path) {
            Ok(file) => file,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ConfigFile::default(),
    };

    let tick_ms = file.runtime.tick_ms;
    let max_ticks = args.ticks.unwrap_or(file.runtime.match_total_ms / tick_ms);

    info!("Initializing virtual brain (SD root {})", args.sd_root.display());
    let storage = SdCardStorage::new(&args.sd_root);
    if let Err(e) = storage.ensure_root() {
        warn!("SD root unavailable: {}", e);
    }
    let mut brain = VirtualBrain::new(file.runtime, file.bindings, storage);

    let loaded = match args.slot {
        Some(slot) => brain.set_slot(slot).map(|_| ()),
        None => brain.load_active_plan(),
    };
    if let Err(e) = loaded {
        warn!("No plan on SD card ({}), using the built-in plan", e);
        match LoadedPlan::built_in() {
            Some(plan) => brain.send(Command::InstallPlan(Box::new(plan))),
            None => error!("Built-in plan is missing"),
        }
    }

    brain.send(Command::SelectSection(args.section));
    brain.set_drive_mode(args.drive_mode);
    if args.record {
        brain.send(Command::StartRecording);
    }
    brain.start_session();

    if args.realtime {
        run_realtime(&mut brain, max_ticks, tick_ms);
    } else {
        for _ in 0..max_ticks {
            brain.step_once();
            if brain.snapshot().phase == CompetitionPhase::Ended {
                break;
            }
        }
    }

    if args.record {
        brain.send(Command::StopRecording);
    }
    if args.export {
        brain.export_telemetry();
    }
    brain.step_once();

    for report in brain.write_pending_files() {
        match &report.result {
            Ok(()) => info!("Wrote {}", report.file_name),
            Err(e) => warn!("Could not write {}: {}", report.file_name, e),
        }
    }

    let snap = brain.snapshot();
    println!(
        "phase={} clock={} ticks={} pose=({:.2}, {:.2}, {:.1} deg) scored={} status=\"{}\"",
        snap.phase.label(),
        snap.clock_text,
        snap.tick_count,
        snap.pose.x,
        snap.pose.y,
        snap.pose.heading_deg,
        snap.scored_blocks,
        snap.status
    );
    ExitCode::SUCCESS
}

fn run_realtime<S: Storage>(brain: &mut VirtualBrain<S>, max_ticks: u64, tick_ms: u64) {
    if let Err(e) = brain.start() {
        error!("{}", e);
        return;
    }
    loop {
        thread::sleep(Duration::from_millis(tick_ms * 5));
        brain.write_pending_files();
        let snap = brain.snapshot();
        if snap.tick_count >= max_ticks || snap.phase == CompetitionPhase::Ended {
            break;
        }
    }
    brain.pause();
}
