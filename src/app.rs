//! Console front-end
//!
//! The single consumer of the event queue. Engine notifications, hotkey
//! events and console lines all arrive here and are applied on this thread;
//! configuration edits go through the config editor and are published to
//! the click loop by snapshot swap.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::commands::{is_help, parse_command, Command, PositionCommand};
use crate::config::SharedConfig;
use crate::controller::{ClickControl, HotkeyController};
use crate::events::{AppEvent, EngineEvent};
use crate::settings;
use crate::ManualLaborError;

/// How long the loop waits for an event before running timers
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long "Settings saved!" style notices stay on the status line
pub const NOTICE_DURATION: Duration = Duration::from_secs(2);

/// Time the user gets to move the pointer before a capture
pub const CAPTURE_DELAY: Duration = Duration::from_secs(2);

/// Minimum spacing of the running click counter in the log
pub const COUNT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Console application state
pub struct App<E: ClickControl> {
    controller: HotkeyController<E>,
    config: SharedConfig,
    settings_path: Option<PathBuf>,
    click_count: u64,
    running: bool,
    notice: Option<(String, Instant)>,
    capture_at: Option<Instant>,
    last_count_report: Option<Instant>,
    quit: bool,
}

impl<E: ClickControl> App<E> {
    pub fn new(engine: E, config: SharedConfig, settings_path: Option<PathBuf>) -> Self {
        Self {
            controller: HotkeyController::new(engine, config.clone()),
            config,
            settings_path,
            click_count: 0,
            running: false,
            notice: None,
            capture_at: None,
            last_count_report: None,
            quit: false,
        }
    }

    pub fn controller(&self) -> &HotkeyController<E> {
        &self.controller
    }

    /// Clicks shown on the counter
    pub fn click_count(&self) -> u64 {
        self.click_count
    }

    /// Engine state as last reported by the engine
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Drain events until shutdown, running timers between them
    pub fn run(&mut self, receiver: &mpsc::Receiver<AppEvent>, keep_running: &AtomicBool) {
        info!("{}", self.status_line(Instant::now()));

        while keep_running.load(Ordering::SeqCst) && !self.quit {
            match receiver.recv_timeout(POLL_INTERVAL) {
                Ok(event) => self.handle_event(event, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Event queue disconnected");
                    break;
                }
            }
            self.tick(Instant::now());
        }

        self.controller.stop();
        info!("Stopped after {} clicks", self.click_count);
    }

    pub fn handle_event(&mut self, event: AppEvent, now: Instant) {
        match event {
            AppEvent::Engine(engine_event) => self.handle_engine_event(engine_event, now),
            AppEvent::Hotkey(hotkey_event) => self.controller.handle_hotkey(hotkey_event, now),
            AppEvent::Command(line) => match parse_command(&line) {
                Ok(Some(command)) => self.apply(command, now),
                Ok(None) => {}
                Err(ManualLaborError::Command(e)) if is_help(&e) => {
                    if let Err(io) = e.print() {
                        debug!("Failed to print help: {}", io);
                    }
                }
                Err(e) => warn!("{}", e),
            },
            AppEvent::Shutdown => {
                info!("Shutdown requested");
                self.quit = true;
            }
        }
    }

    /// Timer work: deferred starts, pointer capture and notice expiry
    pub fn tick(&mut self, now: Instant) {
        self.controller.poll(now);

        if matches!(self.capture_at, Some(deadline) if now >= deadline) {
            self.capture_at = None;
            self.capture_position(now);
        }

        if matches!(self.notice, Some((_, shown)) if now.duration_since(shown) >= NOTICE_DURATION) {
            self.notice = None;
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent, now: Instant) {
        match event {
            EngineEvent::CountChanged(count) => {
                self.click_count = count;
                if self.count_report_due(now) {
                    info!("{}", self.status_line(now));
                }
            }
            EngineEvent::StateChanged(running) => {
                self.running = running;
                if running {
                    self.click_count = 0;
                }
                self.last_count_report = Some(now);
                info!("{}", self.status_line(now));
            }
            EngineEvent::LimitReached(count) => info!("Click limit reached after {} clicks", count),
            EngineEvent::Bell => {
                use std::io::Write;
                let mut stdout = std::io::stdout();
                if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
                    debug!("Failed to ring the bell: {}", e);
                }
            }
        }
    }

    /// Whether the running counter is due for another log line
    fn count_report_due(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        let due = self
            .last_count_report
            .map_or(true, |last| now.duration_since(last) >= COUNT_REPORT_INTERVAL);
        if due {
            self.last_count_report = Some(now);
        }
        due
    }

    /// Apply one console command
    pub fn apply(&mut self, command: Command, now: Instant) {
        let result = match command {
            Command::Start => {
                self.controller.request_start(now);
                Ok(())
            }
            Command::Stop => {
                self.controller.stop();
                Ok(())
            }
            Command::Toggle => {
                self.controller.toggle(now);
                Ok(())
            }
            Command::Cps { value } => self.config.update(|c| c.set_cps_text(&value)),
            Command::Jitter { percent } => self.config.update(|c| c.set_jitter_text(&percent)),
            Command::Button { button } => {
                self.config.update(|c| c.button = button);
                Ok(())
            }
            Command::Double { state } => {
                self.config.update(|c| c.double_click = state.is_on());
                Ok(())
            }
            Command::Limit { count } => self.config.update(|c| c.set_click_limit_text(&count)),
            Command::Pos { action } => match action {
                PositionCommand::Set { x, y } => {
                    self.config.update(|c| c.set_fixed_position_text(&x, &y))
                }
                PositionCommand::On => {
                    self.config.update(|c| c.use_fixed_position = true);
                    Ok(())
                }
                PositionCommand::Off => {
                    self.config.update(|c| c.use_fixed_position = false);
                    Ok(())
                }
            },
            Command::Capture => {
                info!(
                    "Move the pointer to the target, capturing in {}s",
                    CAPTURE_DELAY.as_secs()
                );
                self.capture_at = Some(now + CAPTURE_DELAY);
                Ok(())
            }
            Command::Hotkey { key } => {
                self.config.update(|c| c.hotkey = key);
                Ok(())
            }
            Command::Hold { state } => {
                self.config.update(|c| c.hold_mode = state.is_on());
                Ok(())
            }
            Command::Delay { seconds } => self.config.update(|c| c.set_start_delay_text(&seconds)),
            Command::Sound { state } => {
                self.config.update(|c| c.click_sound = state.is_on());
                Ok(())
            }
            Command::Dark { state } => {
                self.config.update(|c| c.dark_mode = state.is_on());
                Ok(())
            }
            Command::Save => {
                self.save_settings(now);
                Ok(())
            }
            Command::Status => {
                info!("{}", self.status_line(now));
                info!("{:?}", self.config.snapshot());
                Ok(())
            }
            Command::Quit => {
                self.quit = true;
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("{}", e);
        }
    }

    /// Write the current configuration to the settings file
    pub fn save_settings(&mut self, now: Instant) {
        let result = match &self.settings_path {
            Some(path) => settings::save(path, &self.config.snapshot()),
            None => Err(ManualLaborError::Persistence(
                "no home directory for the settings file".to_string(),
            )),
        };

        let message = match result {
            Ok(()) => "Settings saved!".to_string(),
            Err(e) => {
                warn!("{}", e);
                format!("Save failed: {}", e)
            }
        };
        self.notice = Some((message, now));
        info!("{}", self.status_line(now));
    }

    /// Read the pointer and make it the fixed click position
    fn capture_position(&mut self, now: Instant) {
        let message = match self.controller.engine().pointer_position() {
            Ok((x, y)) => {
                self.config.update(|c| {
                    c.use_fixed_position = true;
                    c.fixed_x = x;
                    c.fixed_y = y;
                });
                format!("Position captured: ({}, {})", x, y)
            }
            Err(e) => {
                warn!("{}", e);
                format!("Capture failed: {}", e)
            }
        };
        self.notice = Some((message, now));
        info!("{}", self.status_line(now));
    }

    /// Capture deadline, if a capture is waiting
    pub fn pending_capture(&self) -> Option<Instant> {
        self.capture_at
    }

    /// Text for the status line
    pub fn status_line(&self, now: Instant) -> String {
        if let Some((message, _)) = &self.notice {
            return message.clone();
        }

        if let Some(deadline) = self.capture_at {
            let remaining = deadline.saturating_duration_since(now);
            return format!("Capturing pointer position in {:.1}s...", remaining.as_secs_f64());
        }

        let hotkey = self.config.snapshot().hotkey;
        if let Some(deadline) = self.controller.pending_start() {
            let remaining = deadline.saturating_duration_since(now);
            return format!("Starting in {:.1}s...", remaining.as_secs_f64());
        }

        if self.running {
            format!("Status: Running | Clicks: {} | {} to stop", self.click_count, hotkey)
        } else {
            format!("Status: Stopped | Clicks: {} | {} to start", self.click_count, hotkey)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Hotkey, MouseButton};
    use crate::events::HotkeyEvent;

    #[derive(Default)]
    struct MockEngine {
        running: bool,
        pointer: Option<(i32, i32)>,
    }

    impl ClickControl for MockEngine {
        fn start(&mut self) {
            self.running = true;
        }

        fn stop(&mut self) {
            self.running = false;
        }

        fn is_running(&self) -> bool {
            self.running
        }

        fn pointer_position(&self) -> Result<(i32, i32), ManualLaborError> {
            self.pointer
                .ok_or_else(|| ManualLaborError::PointerQuery("no pointer".to_string()))
        }
    }

    fn new_app(config: Config) -> (App<MockEngine>, SharedConfig) {
        let shared = SharedConfig::new(config);
        (App::new(MockEngine::default(), shared.clone(), None), shared)
    }

    fn command(app: &mut App<MockEngine>, line: &str) {
        app.handle_event(AppEvent::Command(line.to_string()), Instant::now());
    }

    #[test]
    fn commands_edit_the_live_config() {
        let (mut app, shared) = new_app(Config::default());

        command(&mut app, "cps 99");
        command(&mut app, "jitter 5");
        command(&mut app, "button right");
        command(&mut app, "pos set 300 400");
        command(&mut app, "hotkey f7");
        command(&mut app, "double on");

        let config = shared.snapshot();
        assert_eq!(config.cps, 50);
        assert_eq!(config.jitter_percent, 5);
        assert_eq!(config.button, MouseButton::Right);
        assert_eq!(config.fixed_position(), Some((300, 400)));
        assert_eq!(config.hotkey, Hotkey::F7);
        assert!(config.double_click);
    }

    #[test]
    fn bad_values_follow_the_editor_policy() {
        let (mut app, shared) = new_app(Config::default().with_click_limit(5));

        command(&mut app, "limit lots");
        command(&mut app, "button side");
        command(&mut app, "hotkey F12");
        command(&mut app, "nonsense");

        let config = shared.snapshot();
        assert_eq!(config.click_limit, 0);
        assert_eq!(config.button, MouseButton::Left);
        assert_eq!(config.hotkey, Hotkey::F6);
    }

    #[test]
    fn engine_events_update_the_display() {
        let (mut app, _) = new_app(Config::default());
        let now = Instant::now();

        app.handle_event(EngineEvent::StateChanged(true).into(), now);
        app.handle_event(EngineEvent::CountChanged(3).into(), now);
        assert!(app.is_running());
        assert_eq!(app.click_count(), 3);
        assert_eq!(app.status_line(now), "Status: Running | Clicks: 3 | F6 to stop");

        app.handle_event(EngineEvent::LimitReached(3).into(), now);
        app.handle_event(EngineEvent::StateChanged(false).into(), now);
        assert!(!app.is_running());
        assert_eq!(app.click_count(), 3);
    }

    #[test]
    fn position_can_be_switched_off_and_on() {
        let (mut app, shared) = new_app(Config::default().with_fixed_position(5, 6));

        command(&mut app, "pos off");
        assert_eq!(shared.snapshot().fixed_position(), None);
        command(&mut app, "pos on");
        assert_eq!(shared.snapshot().fixed_position(), Some((5, 6)));
        command(&mut app, "pos set 7 x");
        assert_eq!(shared.snapshot().fixed_position(), Some((5, 6)));
    }

    #[test]
    fn help_does_not_touch_the_config() {
        let (mut app, shared) = new_app(Config::default());
        command(&mut app, "help");
        command(&mut app, "help cps");
        assert_eq!(*shared.snapshot(), Config::default());
        assert!(!app.should_quit());
    }

    #[test]
    fn capture_records_pointer_after_delay() {
        let shared = SharedConfig::new(Config::default());
        let engine = MockEngine {
            pointer: Some((812, 455)),
            ..MockEngine::default()
        };
        let mut app = App::new(engine, shared.clone(), None);
        let now = Instant::now();

        app.apply(Command::Capture, now);
        assert_eq!(app.pending_capture(), Some(now + CAPTURE_DELAY));
        assert_eq!(app.status_line(now), "Capturing pointer position in 2.0s...");

        app.tick(now + Duration::from_millis(1500));
        assert_eq!(shared.snapshot().fixed_position(), None);

        app.tick(now + CAPTURE_DELAY);
        assert_eq!(app.pending_capture(), None);
        assert_eq!(shared.snapshot().fixed_position(), Some((812, 455)));
        assert_eq!(app.status_line(now + CAPTURE_DELAY), "Position captured: (812, 455)");
    }

    #[test]
    fn failed_capture_keeps_the_old_position() {
        let (mut app, shared) = new_app(Config::default().with_fixed_position(1, 2));
        let now = Instant::now();

        app.apply(Command::Capture, now);
        app.tick(now + CAPTURE_DELAY);
        assert_eq!(shared.snapshot().fixed_position(), Some((1, 2)));
        assert!(app
            .status_line(now + CAPTURE_DELAY)
            .starts_with("Capture failed:"));
    }

    #[test]
    fn running_counter_is_reported_at_most_once_per_interval() {
        let (mut app, _) = new_app(Config::default());
        let now = Instant::now();

        assert!(!app.count_report_due(now));

        app.handle_event(EngineEvent::StateChanged(true).into(), now);
        assert!(!app.count_report_due(now + Duration::from_millis(500)));
        assert!(app.count_report_due(now + COUNT_REPORT_INTERVAL));
        assert!(!app.count_report_due(now + COUNT_REPORT_INTERVAL + Duration::from_millis(10)));

        let later = now + COUNT_REPORT_INTERVAL * 3;
        app.handle_event(EngineEvent::CountChanged(40).into(), later);
        assert_eq!(app.last_count_report, Some(later));
        assert_eq!(app.click_count(), 40);
    }

    #[test]
    fn bell_events_leave_the_display_alone() {
        let (mut app, _) = new_app(Config::default().with_click_limit(3));
        let now = Instant::now();

        app.handle_event(EngineEvent::StateChanged(true).into(), now);
        app.handle_event(EngineEvent::CountChanged(2).into(), now);
        app.handle_event(EngineEvent::Bell.into(), now);
        assert!(app.is_running());
        assert_eq!(app.click_count(), 2);
    }

    #[test]
    fn hotkey_events_reach_the_controller() {
        let (mut app, _) = new_app(Config::default());
        app.handle_event(HotkeyEvent::pressed(Hotkey::F6).into(), Instant::now());
        assert!(app.controller().is_running());
    }

    #[test]
    fn start_delay_shows_countdown_and_fires_on_tick() {
        let (mut app, _) = new_app(Config::default().with_start_delay(1.0));
        let now = Instant::now();

        app.apply(Command::Start, now);
        assert_eq!(app.status_line(now), "Starting in 1.0s...");
        app.tick(now + Duration::from_millis(500));
        assert!(!app.controller().is_running());
        app.tick(now + Duration::from_secs(1));
        assert!(app.controller().is_running());
    }

    #[test]
    fn save_notice_expires() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedConfig::new(Config::default().with_cps(33));
        let path = dir.path().join("settings.json");
        let mut app = App::new(MockEngine::default(), shared, Some(path.clone()));
        let now = Instant::now();

        app.save_settings(now);
        assert_eq!(app.status_line(now), "Settings saved!");
        assert_eq!(settings::load(&path).cps, 33);

        app.tick(now + NOTICE_DURATION);
        assert!(app.status_line(now + NOTICE_DURATION).starts_with("Status: Stopped"));
    }

    #[test]
    fn failed_save_shows_transient_error() {
        let (mut app, _) = new_app(Config::default());
        let now = Instant::now();

        app.save_settings(now);
        assert!(app.status_line(now).starts_with("Save failed:"));
    }

    #[test]
    fn shutdown_and_quit_end_the_loop() {
        let (mut app, _) = new_app(Config::default());
        app.handle_event(AppEvent::Shutdown, Instant::now());
        assert!(app.should_quit());

        let (mut app, _) = new_app(Config::default());
        command(&mut app, "quit");
        assert!(app.should_quit());
    }

    #[test]
    fn run_drains_queue_until_quit() {
        let (mut app, _) = new_app(Config::default());
        let (sender, receiver) = mpsc::channel();
        let keep_running = AtomicBool::new(true);

        sender.send(AppEvent::Command("start".into())).unwrap();
        sender.send(EngineEvent::CountChanged(7).into()).unwrap();
        sender.send(AppEvent::Shutdown).unwrap();

        app.run(&receiver, &keep_running);
        assert_eq!(app.click_count(), 7);
        assert!(!app.controller().is_running());
    }
}
