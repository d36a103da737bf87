//! Configuration management for Manual Labor

use clap::ValueEnum;
use rdev::Key;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::ManualLaborError;

/// Slowest allowed click rate (clicks per second)
pub const MIN_CPS: u32 = 1;
/// Fastest allowed click rate (clicks per second)
pub const MAX_CPS: u32 = 50;
/// Largest allowed timing variation, in percent of the base delay
pub const MAX_JITTER_PERCENT: u32 = 30;

/// Mouse button used for synthetic clicks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Middle => "Middle",
        };
        f.write_str(name)
    }
}

/// Keys that can start and stop the clicker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Hotkey {
    #[default]
    F6,
    F7,
    F8,
    F9,
    F10,
}

impl Hotkey {
    pub fn name(self) -> &'static str {
        match self {
            Self::F6 => "F6",
            Self::F7 => "F7",
            Self::F8 => "F8",
            Self::F9 => "F9",
            Self::F10 => "F10",
        }
    }

    /// Map a raw rdev key to a hotkey, if it is one
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::F6 => Some(Self::F6),
            Key::F7 => Some(Self::F7),
            Key::F8 => Some(Self::F8),
            Key::F9 => Some(Self::F9),
            Key::F10 => Some(Self::F10),
            _ => None,
        }
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for the auto-clicker
///
/// Serialized as the flat settings record; missing keys fall back to
/// defaults thanks to `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Clicks per second (1-50)
    #[serde(deserialize_with = "non_negative")]
    pub cps: u32,

    /// Random ± variation of the delay between clicks, in percent (0-30)
    #[serde(rename = "random_variation", deserialize_with = "non_negative")]
    pub jitter_percent: u32,

    /// Button to click with
    #[serde(rename = "mouse_button")]
    pub button: MouseButton,

    /// Two presses per tick instead of one
    pub double_click: bool,

    /// Stop after this many ticks; 0 means unlimited
    #[serde(deserialize_with = "non_negative")]
    pub click_limit: u32,

    /// Move the pointer to (fixed_x, fixed_y) before every tick
    pub use_fixed_position: bool,
    pub fixed_x: i32,
    pub fixed_y: i32,

    /// Key that starts/stops clicking
    pub hotkey: Hotkey,

    /// Click only while the hotkey is held down
    pub hold_mode: bool,

    /// Seconds to wait between a start request and the first click
    pub start_delay: f64,

    /// Ring the terminal bell on every tick
    pub click_sound: bool,

    /// Persisted for the front-end; not interpreted here
    pub dark_mode: bool,
}

/// Read a count that may have been written as a negative number.
/// Negative values become 0; `Config::validate` applies the field ranges.
fn non_negative<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    Ok(value.clamp(0, i64::from(u32::MAX)) as u32)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cps: 10,
            jitter_percent: 15,
            button: MouseButton::Left,
            double_click: false,
            click_limit: 0,
            use_fixed_position: false,
            fixed_x: 0,
            fixed_y: 0,
            hotkey: Hotkey::F6,
            hold_mode: false,
            start_delay: 0.0,
            click_sound: false,
            dark_mode: false,
        }
    }
}

impl Config {
    /// Set the click rate, clamped to 1-50
    pub fn with_cps(mut self, cps: u32) -> Self {
        self.set_cps(i64::from(cps));
        self
    }

    /// Set the timing variation, clamped to 0-30%
    pub fn with_jitter(mut self, percent: u32) -> Self {
        self.set_jitter_percent(i64::from(percent));
        self
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_double_click(mut self, double_click: bool) -> Self {
        self.double_click = double_click;
        self
    }

    pub fn with_click_limit(mut self, limit: u32) -> Self {
        self.click_limit = limit;
        self
    }

    pub fn with_fixed_position(mut self, x: i32, y: i32) -> Self {
        self.use_fixed_position = true;
        self.fixed_x = x;
        self.fixed_y = y;
        self
    }

    pub fn with_hotkey(mut self, hotkey: Hotkey) -> Self {
        self.hotkey = hotkey;
        self
    }

    pub fn with_hold_mode(mut self, hold_mode: bool) -> Self {
        self.hold_mode = hold_mode;
        self
    }

    pub fn with_start_delay(mut self, seconds: f64) -> Self {
        self.start_delay = sanitize_delay(seconds);
        self
    }

    /// Target pointer position, if fixed positioning is enabled
    pub fn fixed_position(&self) -> Option<(i32, i32)> {
        self.use_fixed_position
            .then_some((self.fixed_x, self.fixed_y))
    }

    /// Number of synthetic presses per tick
    pub fn presses_per_tick(&self) -> u32 {
        if self.double_click {
            2
        } else {
            1
        }
    }

    pub fn set_cps(&mut self, cps: i64) {
        self.cps = cps.clamp(i64::from(MIN_CPS), i64::from(MAX_CPS)) as u32;
    }

    pub fn set_jitter_percent(&mut self, percent: i64) {
        self.jitter_percent = percent.clamp(0, i64::from(MAX_JITTER_PERCENT)) as u32;
    }

    /// Parse the click rate from text; invalid input keeps the current rate
    pub fn set_cps_text(&mut self, text: &str) -> Result<(), ManualLaborError> {
        let cps = parse_int("cps", text)?;
        self.set_cps(cps);
        Ok(())
    }

    /// Parse the timing variation from text; invalid input keeps the current value
    pub fn set_jitter_text(&mut self, text: &str) -> Result<(), ManualLaborError> {
        let percent = parse_int("random_variation", text)?;
        self.set_jitter_percent(percent);
        Ok(())
    }

    /// Parse the click limit from text; invalid input resets it to 0 (unlimited)
    pub fn set_click_limit_text(&mut self, text: &str) -> Result<(), ManualLaborError> {
        match parse_int("click_limit", text) {
            Ok(limit) => {
                self.click_limit = limit.clamp(0, i64::from(u32::MAX)) as u32;
                Ok(())
            }
            Err(e) => {
                self.click_limit = 0;
                Err(e)
            }
        }
    }

    /// Parse the start delay from text; invalid input resets it to 0
    pub fn set_start_delay_text(&mut self, text: &str) -> Result<(), ManualLaborError> {
        match text.trim().parse::<f64>() {
            Ok(seconds) if seconds.is_finite() => {
                self.start_delay = sanitize_delay(seconds);
                Ok(())
            }
            _ => {
                self.start_delay = 0.0;
                Err(ManualLaborError::ConfigParse {
                    field: "start_delay",
                    value: text.to_string(),
                })
            }
        }
    }

    /// Parse and enable a fixed position; invalid input keeps the last good pair
    pub fn set_fixed_position_text(&mut self, x: &str, y: &str) -> Result<(), ManualLaborError> {
        let parsed_x = parse_coordinate("fixed_x", x)?;
        let parsed_y = parse_coordinate("fixed_y", y)?;
        self.fixed_x = parsed_x;
        self.fixed_y = parsed_y;
        self.use_fixed_position = true;
        Ok(())
    }

    /// Clamp values loaded from outside the editor into their valid ranges
    pub fn validate(&mut self) {
        self.set_cps(i64::from(self.cps));
        self.set_jitter_percent(i64::from(self.jitter_percent));
        self.start_delay = sanitize_delay(self.start_delay);
    }
}

fn parse_int(field: &'static str, text: &str) -> Result<i64, ManualLaborError> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| ManualLaborError::ConfigParse {
            field,
            value: text.to_string(),
        })
}

fn parse_coordinate(field: &'static str, text: &str) -> Result<i32, ManualLaborError> {
    text.trim()
        .parse::<i32>()
        .map_err(|_| ManualLaborError::ConfigParse {
            field,
            value: text.to_string(),
        })
}

fn sanitize_delay(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

/// Live configuration shared between the front-end and the click loop
///
/// Readers take an immutable snapshot; writers swap in a modified copy,
/// so a reader never sees a half-updated record.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<Config>>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Current configuration
    pub fn snapshot(&self) -> Arc<Config> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Apply an edit and publish the result atomically
    pub fn update<R>(&self, edit: impl FnOnce(&mut Config) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut next = (**guard).clone();
        let result = edit(&mut next);
        *guard = Arc::new(next);
        result
    }
}
