//! Manual Labor - auto-clicker with a global hotkey
//!
//! This library provides components for:
//! - Live, snapshot-swapped click configuration and its JSON persistence
//! - Input simulation (pointer moves and synthetic clicks)
//! - Global hotkey listening
//! - The click engine and the toggle/hold hotkey controller
//! - A console front-end that drains engine and hotkey events

pub mod app;
pub mod commands;
pub mod config;
pub mod controller;
pub mod engine;
pub mod events;
pub mod hotkey_listener;
pub mod input_sink;
pub mod settings;

pub use app::App;
pub use config::{Config, Hotkey, MouseButton, SharedConfig};
pub use controller::{ClickControl, HotkeyController};
pub use engine::ClickEngine;
pub use events::{AppEvent, EngineEvent, HotkeyEvent, KeyAction};
pub use hotkey_listener::HotkeyListener;
pub use input_sink::{create_input_sink, InputSink};

use thiserror::Error;

/// Main error type for Manual Labor
#[derive(Error, Debug)]
pub enum ManualLaborError {
    #[error("Failed to access input backend: {0}")]
    InputAccess(String),

    #[error("Failed to send input event: {0}")]
    SendEvent(String),

    #[error("Pointer position ({x}, {y}) is out of range")]
    InvalidPosition { x: i32, y: i32 },

    #[error("Invalid value {value:?} for {field}")]
    ConfigParse { field: &'static str, value: String },

    #[error("Settings file error: {0}")]
    Persistence(String),

    #[error("Settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Hotkey listener error: {0}")]
    Listener(String),

    #[error("Failed to install signal handler: {0}")]
    Signal(String),

    #[error("Invalid command: {0}")]
    Command(#[from] clap::Error),

    #[error("Pointer position unavailable: {0}")]
    PointerQuery(String),
}
