//! Manual Labor - auto-clicker with a global hotkey
//!
//! Clicks at a configurable rate while toggled (or held) with F6-F10.
//! Settings are edited by typing commands on the console.

use manual_labor::{
    create_input_sink, events::create_event_channel, settings, App, AppEvent, ClickEngine,
    HotkeyListener, ManualLaborError, SharedConfig,
};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Forward console lines to the event queue
fn start_stdin_reader(sender: mpsc::Sender<AppEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if sender.send(AppEvent::Command(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read console input: {}", e);
                    break;
                }
            }
        }
    })
}

fn main() -> Result<(), ManualLaborError> {
    // Initialize logging
    let level = if std::env::var_os("MANUAL_LABOR_VERBOSE").is_some() {
        Level::DEBUG
    } else {
        Level::INFO
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    info!("Manual Labor starting...");

    // Load configuration
    let settings_path = settings::settings_path();
    let config = settings_path
        .as_deref()
        .map(settings::load)
        .unwrap_or_default();
    info!(
        "Config: {} cps, ±{}%, {} button, hotkey {}",
        config.cps, config.jitter_percent, config.button, config.hotkey
    );
    let config = SharedConfig::new(config);

    // Create channel for front-end events
    let (sender, receiver) = create_event_channel();

    // Set up Ctrl+C handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    let shutdown_sender = sender.clone();

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
        let _ = shutdown_sender.send(AppEvent::Shutdown);
    })
    .map_err(|e| ManualLaborError::Signal(e.to_string()))?;

    // Create input sink
    let sink = match create_input_sink() {
        Ok(sink) => sink,
        Err(e) => {
            error!("No input backend available: {}", e);
            error!("Run under X11, or install ydotool and start ydotoold.");
            return Err(e);
        }
    };

    info!("Input sink ready");

    let engine = ClickEngine::new(config.clone(), sink, sender.clone());
    let mut app = App::new(engine, config, settings_path);

    // Start hotkey listener and console reader in background threads
    let _listener_handle = HotkeyListener::new(sender.clone()).start();
    let _stdin_handle = start_stdin_reader(sender);

    info!("Type 'help' for commands, Ctrl+C to exit");

    app.run(&receiver, &running);

    info!("Manual Labor shutting down...");

    // The listener and stdin threads block in the OS; they end with the process.

    Ok(())
}
