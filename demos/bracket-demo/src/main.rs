mod commands;
mod session_state;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use bracket_capture_core::{BracketSession, CapabilitySnapshot, CaptureController, DirectoryStore, SessionConfiguration};
use bracket_capture_sim::{DevicePreset, SimulatedCamera};
use clap::Parser;

const SEQUENCE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "bracket-demo")]
#[command(about = "Run bracketed RAW and processed captures on a simulated camera")]
#[command(version)]
struct Args {
    /// Number of bracket captures to take
    #[arg(short = 'n', long, default_value = "1")]
    captures: usize,

    /// Directory captures are written to (default: ~/Pictures/Bracket Captures)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), String> {
    let output = args.output.unwrap_or_else(commands::captures_dir);
    fs::create_dir_all(&output).map_err(|e| e.to_string())?;

    let camera = SimulatedCamera::from_preset(DevicePreset::ProRawPhone);
    let control = camera.control();
    log::info!("camera capabilities: {:?}", CapabilitySnapshot::of(&camera));
    let store = Arc::new(DirectoryStore::new(output));
    let session = BracketSession::new(camera, store.clone(), SessionConfiguration::default())
        .map_err(|e| e.to_string())?;

    let logger = session_state::spawn_error_logger(session.subscribe_errors()).map_err(|e| e.to_string())?;

    session.start();
    session.sync().map_err(|e| e.to_string())?;
    session_state::log_snapshot(&session.snapshot());

    for n in 1..=args.captures {
        session.capture();
        if !control.wait_for_sequences(n, SEQUENCE_TIMEOUT) {
            return Err(format!("capture {} did not finish", n));
        }
        session.sync().map_err(|e| e.to_string())?;
        session_state::log_snapshot(&session.snapshot());
    }

    session.stop();
    session.shutdown();
    session_state::log_snapshot(&session.snapshot());

    drop(session);
    if logger.join().is_err() {
        log::warn!("error logger panicked");
    }

    for capture in commands::list_captures(store.root())? {
        match serde_json::to_string(&capture) {
            Ok(json) => log::info!("capture {}", json),
            Err(e) => log::warn!("failed to serialize capture: {}", e),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
