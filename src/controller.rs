//! Hotkey/state controller
//!
//! Maps hotkey presses and releases to engine starts and stops. In toggle
//! mode every press flips the state; in hold mode the engine runs while the
//! key is down. A configured start delay turns a start into a pending
//! deadline that [`HotkeyController::poll`] fires from the front-end loop.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::SharedConfig;
use crate::events::{HotkeyEvent, KeyAction};
use crate::ManualLaborError;

/// What the controller and the front-end need from a click engine
pub trait ClickControl {
    fn start(&mut self);
    fn stop(&mut self);
    fn is_running(&self) -> bool;

    /// Where the pointer is right now, for capturing a fixed position
    fn pointer_position(&self) -> Result<(i32, i32), ManualLaborError>;
}

/// State machine between the hotkey and the engine
pub struct HotkeyController<E: ClickControl> {
    engine: E,
    config: SharedConfig,
    holding: bool,
    pending_start: Option<Instant>,
    /// Mode the current hold/pending state was built under
    hold_mode: bool,
}

impl<E: ClickControl> HotkeyController<E> {
    pub fn new(engine: E, config: SharedConfig) -> Self {
        let hold_mode = config.snapshot().hold_mode;
        Self {
            engine,
            config,
            holding: false,
            pending_start: None,
            hold_mode,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    /// Deadline of a deferred start, if one is waiting
    pub fn pending_start(&self) -> Option<Instant> {
        self.pending_start
    }

    /// React to a hotkey press or release from the global listener
    pub fn handle_hotkey(&mut self, event: HotkeyEvent, now: Instant) {
        self.sync_mode();

        let config = self.config.snapshot();
        if event.hotkey != config.hotkey {
            return;
        }

        match (config.hold_mode, event.action) {
            (false, KeyAction::Pressed) => self.toggle(now),
            (false, KeyAction::Released) => {}
            (true, KeyAction::Pressed) => {
                if self.holding {
                    // key repeat
                    return;
                }
                self.holding = true;
                self.request_start(now);
            }
            (true, KeyAction::Released) => {
                self.holding = false;
                self.stop();
            }
        }
    }

    /// Start if stopped, stop if running or waiting to start
    pub fn toggle(&mut self, now: Instant) {
        self.sync_mode();

        if self.engine.is_running() || self.pending_start.is_some() {
            self.stop();
        } else {
            self.request_start(now);
        }
    }

    /// Start now, or after the configured start delay
    pub fn request_start(&mut self, now: Instant) {
        self.sync_mode();

        if self.engine.is_running() {
            return;
        }

        let delay = self.config.snapshot().start_delay;
        if delay > 0.0 {
            let deadline = Duration::try_from_secs_f64(delay)
                .ok()
                .and_then(|delay| now.checked_add(delay));
            match deadline {
                Some(deadline) => {
                    info!("Starting in {}s", delay);
                    self.pending_start = Some(deadline);
                }
                None => warn!("Start delay of {}s is out of range, ignoring start", delay),
            }
        } else {
            self.pending_start = None;
            self.engine.start();
        }
    }

    /// Stop the engine and drop any deferred start
    pub fn stop(&mut self) {
        if self.pending_start.take().is_some() {
            info!("Pending start cancelled");
        }
        self.engine.stop();
    }

    /// Timer tick: fire a deferred start whose deadline has passed
    pub fn poll(&mut self, now: Instant) {
        self.sync_mode();

        match self.pending_start {
            Some(deadline) if now >= deadline => {
                self.pending_start = None;
                self.engine.start();
            }
            _ => {}
        }
    }

    /// Drop hold and pending state built under a mode that has since changed
    fn sync_mode(&mut self) {
        let hold_mode = self.config.snapshot().hold_mode;
        if hold_mode == self.hold_mode {
            return;
        }

        debug!("Hold mode changed to {}", hold_mode);
        self.hold_mode = hold_mode;
        self.holding = false;
        if self.pending_start.take().is_some() {
            info!("Pending start cancelled by mode change");
        }
    }
}
