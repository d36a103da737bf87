//! Click engine
//!
//! Runs the click loop on one background thread. The loop reads a fresh
//! configuration snapshot every tick, so rate, jitter, button, position and
//! limit can be edited while it runs. It reports back only by posting
//! events to the front-end queue.

use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{Config, SharedConfig};
use crate::controller::ClickControl;
use crate::events::{AppEvent, EngineEvent};
use crate::input_sink::InputSink;
use crate::ManualLaborError;

/// Shortest sleep between ticks, whatever the jitter draws
pub const MIN_DELAY: Duration = Duration::from_millis(1);

/// Granularity at which a sleeping loop notices `stop()`
pub const SLEEP_SLICE: Duration = Duration::from_millis(5);

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Delay between ticks at the given rate, without jitter
pub fn base_delay(cps: u32) -> Duration {
    Duration::from_nanos(NANOS_PER_SEC / u64::from(cps.max(1)))
}

/// Delay between ticks with a uniform ± `jitter_percent` variation
///
/// The result never drops below [`MIN_DELAY`]; there is no upper clamp.
pub fn jittered_delay<R: Rng + ?Sized>(cps: u32, jitter_percent: u32, rng: &mut R) -> Duration {
    let base = base_delay(cps);
    if jitter_percent == 0 {
        return base;
    }

    let base_secs = base.as_secs_f64();
    let spread = base_secs * f64::from(jitter_percent) / 100.0;
    let delay = base_secs + rng.gen_range(-spread..=spread);
    Duration::from_secs_f64(delay.max(MIN_DELAY.as_secs_f64()))
}

/// Sleep for `delay`, waking early once `active` is cleared
///
/// Returns whether the run is still active afterwards.
fn sleep_while_active(delay: Duration, active: &AtomicBool) -> bool {
    let mut remaining = delay;
    while !remaining.is_zero() {
        if !active.load(Ordering::SeqCst) {
            return false;
        }
        let slice = remaining.min(SLEEP_SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
    active.load(Ordering::SeqCst)
}

type SharedSink = Arc<Mutex<Box<dyn InputSink>>>;

/// One started loop: its own cancellation flag plus the thread running it
struct Run {
    active: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

/// Everything the worker thread needs
struct ClickLoop {
    config: SharedConfig,
    sink: SharedSink,
    events: mpsc::Sender<AppEvent>,
    click_count: Arc<AtomicU64>,
    active: Arc<AtomicBool>,
}

impl ClickLoop {
    fn publish(&self, event: EngineEvent) {
        if self.events.send(AppEvent::Engine(event)).is_err() {
            debug!("Event queue closed, dropping {:?}", event);
        }
    }

    fn run(self) {
        info!("Click loop started");
        let mut rng = rand::thread_rng();

        while self.active.load(Ordering::SeqCst) {
            let config = self.config.snapshot();
            let count = self.click_count.load(Ordering::SeqCst);

            if config.click_limit > 0 && count >= u64::from(config.click_limit) {
                info!("Click limit of {} reached", config.click_limit);
                self.active.store(false, Ordering::SeqCst);
                self.publish(EngineEvent::LimitReached(count));
                self.publish(EngineEvent::StateChanged(false));
                break;
            }

            self.tick(&config);

            let count = self.click_count.fetch_add(1, Ordering::SeqCst) + 1;
            if config.click_sound {
                self.publish(EngineEvent::Bell);
            }
            self.publish(EngineEvent::CountChanged(count));

            let delay = jittered_delay(config.cps, config.jitter_percent, &mut rng);
            if !sleep_while_active(delay, &self.active) {
                break;
            }
        }

        info!(
            "Click loop stopped after {} ticks",
            self.click_count.load(Ordering::SeqCst)
        );
    }

    /// Position the pointer and click; sink failures are logged, never fatal
    fn tick(&self, config: &Config) {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());

        if let Some((x, y)) = config.fixed_position() {
            if let Err(e) = sink.set_pointer_position(x, y) {
                debug!("Ignoring pointer move: {}", e);
            }
        }

        for _ in 0..config.presses_per_tick() {
            if let Err(e) = sink.press_and_release(config.button) {
                warn!("Click failed: {}", e);
            }
        }
    }
}

/// Owns the click loop thread and its counter
pub struct ClickEngine {
    config: SharedConfig,
    sink: SharedSink,
    events: mpsc::Sender<AppEvent>,
    click_count: Arc<AtomicU64>,
    run: Option<Run>,
}

impl ClickEngine {
    /// Create a stopped engine clicking through `sink`
    pub fn new(
        config: SharedConfig,
        sink: Box<dyn InputSink>,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            config,
            sink: Arc::new(Mutex::new(sink)),
            events,
            click_count: Arc::new(AtomicU64::new(0)),
            run: None,
        }
    }

    /// Ticks performed since the last start
    pub fn click_count(&self) -> u64 {
        self.click_count.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.active.load(Ordering::SeqCst))
    }

    /// Start clicking; does nothing if a loop is already active
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("Engine already running, ignoring start");
            return;
        }

        // A loop that stopped itself at its limit has exited or is about to.
        if let Some(finished) = self.run.take() {
            join(finished.handle);
        }

        self.click_count.store(0, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));

        let click_loop = ClickLoop {
            config: self.config.clone(),
            sink: Arc::clone(&self.sink),
            events: self.events.clone(),
            click_count: Arc::clone(&self.click_count),
            active: Arc::clone(&active),
        };
        self.publish(EngineEvent::StateChanged(true));
        let handle = thread::spawn(move || click_loop.run());

        self.run = Some(Run { active, handle });
    }

    /// Stop clicking and wait for the loop to exit; does nothing if stopped
    pub fn stop(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };

        let was_active = run.active.swap(false, Ordering::SeqCst);
        join(run.handle);

        if was_active {
            self.publish(EngineEvent::StateChanged(false));
        }
    }

    /// Ask the input backend where the pointer is
    pub fn pointer_position(&self) -> Result<(i32, i32), ManualLaborError> {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        sink.pointer_position()
    }

    fn publish(&self, event: EngineEvent) {
        if self.events.send(AppEvent::Engine(event)).is_err() {
            debug!("Event queue closed, dropping {:?}", event);
        }
    }
}

fn join(handle: thread::JoinHandle<()>) {
    if handle.join().is_err() {
        error!("Click loop thread panicked");
    }
}

impl ClickControl for ClickEngine {
    fn start(&mut self) {
        ClickEngine::start(self);
    }

    fn stop(&mut self) {
        ClickEngine::stop(self);
    }

    fn is_running(&self) -> bool {
        ClickEngine::is_running(self)
    }

    fn pointer_position(&self) -> Result<(i32, i32), ManualLaborError> {
        ClickEngine::pointer_position(self)
    }
}

impl Drop for ClickEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
