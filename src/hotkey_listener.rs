//! Global hotkey listening using rdev

use rdev::{listen, Event, EventType};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error, info};

use crate::config::Hotkey;
use crate::events::{AppEvent, HotkeyEvent};

/// Translate a raw rdev event into a hotkey event, if it concerns F6-F10
pub fn translate(event_type: &EventType) -> Option<HotkeyEvent> {
    match *event_type {
        EventType::KeyPress(key) => Hotkey::from_key(key).map(HotkeyEvent::pressed),
        EventType::KeyRelease(key) => Hotkey::from_key(key).map(HotkeyEvent::released),
        _ => None,
    }
}

/// Hotkey listener that captures global keyboard events
pub struct HotkeyListener {
    /// Sender into the front-end event queue
    sender: mpsc::Sender<AppEvent>,
}

impl HotkeyListener {
    /// Create a new HotkeyListener with the given channel sender
    pub fn new(sender: mpsc::Sender<AppEvent>) -> Self {
        Self { sender }
    }

    /// Start listening for key events in a background thread
    ///
    /// Only presses and releases of the candidate hotkeys are forwarded;
    /// deciding which one is active is left to the controller, which reads
    /// the live configuration.
    pub fn start(self) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            info!("Hotkey listener started");

            let sender = self.sender;

            let callback = move |event: Event| {
                if let Some(hotkey_event) = translate(&event.event_type) {
                    debug!("Hotkey event: {:?}", hotkey_event);

                    if let Err(e) = sender.send(AppEvent::Hotkey(hotkey_event)) {
                        error!("Failed to send hotkey event: {}", e);
                    }
                }
            };

            if let Err(e) = listen(callback) {
                error!("Error in hotkey listener: {:?}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::KeyAction;
    use rdev::Key;

    #[test]
    fn function_keys_are_forwarded() {
        let event = translate(&EventType::KeyPress(Key::F7)).unwrap();
        assert_eq!(event.hotkey, Hotkey::F7);
        assert_eq!(event.action, KeyAction::Pressed);

        let event = translate(&EventType::KeyRelease(Key::F10)).unwrap();
        assert_eq!(event.hotkey, Hotkey::F10);
        assert_eq!(event.action, KeyAction::Released);
    }

    #[test]
    fn other_input_is_ignored() {
        assert_eq!(translate(&EventType::KeyPress(Key::KeyQ)), None);
        assert_eq!(translate(&EventType::KeyPress(Key::F5)), None);
        assert_eq!(
            translate(&EventType::ButtonPress(rdev::Button::Left)),
            None
        );
    }
}
