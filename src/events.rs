//! Messages posted to the front-end's event queue
//!
//! Background threads (the click loop, the hotkey listener, stdin and the
//! Ctrl+C handler) never touch display state. They send one of these over
//! an mpsc channel and the front-end applies it on its own thread.

use std::sync::mpsc;

use crate::config::Hotkey;

/// Notifications published by the click engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Click counter after a completed tick
    CountChanged(u64),
    /// Engine started (`true`) or stopped (`false`)
    StateChanged(bool),
    /// Click limit hit; the engine stopped itself
    LimitReached(u64),
    /// Audible feedback for one tick
    Bell,
}

/// Whether the hotkey went down or up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Pressed,
    Released,
}

/// Hotkey press/release observed by the global listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyEvent {
    pub hotkey: Hotkey,
    pub action: KeyAction,
}

impl HotkeyEvent {
    pub fn pressed(hotkey: Hotkey) -> Self {
        Self {
            hotkey,
            action: KeyAction::Pressed,
        }
    }

    pub fn released(hotkey: Hotkey) -> Self {
        Self {
            hotkey,
            action: KeyAction::Released,
        }
    }
}

/// Everything the front-end loop consumes
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Engine(EngineEvent),
    Hotkey(HotkeyEvent),
    /// One line typed on the console
    Command(String),
    Shutdown,
}

impl From<EngineEvent> for AppEvent {
    fn from(event: EngineEvent) -> Self {
        Self::Engine(event)
    }
}

impl From<HotkeyEvent> for AppEvent {
    fn from(event: HotkeyEvent) -> Self {
        Self::Hotkey(event)
    }
}

/// Create a channel for front-end events and return both ends
pub fn create_event_channel() -> (mpsc::Sender<AppEvent>, mpsc::Receiver<AppEvent>) {
    mpsc::channel()
}
