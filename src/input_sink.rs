//! Input simulation backends
//!
//! X11 sessions use the XTEST extension through x11rb. Wayland sessions go
//! through ydotool, which injects events via uinput at the kernel level and
//! needs the ydotoold daemon: sudo systemctl enable --now ydotoold

use std::process::Command;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;

use crate::config::MouseButton;
use crate::ManualLaborError;

/// Something that can move the pointer and click
pub trait InputSink: Send {
    /// Move the pointer to absolute screen coordinates
    fn set_pointer_position(&mut self, x: i32, y: i32) -> Result<(), ManualLaborError>;

    /// Press and release a mouse button
    fn press_and_release(&mut self, button: MouseButton) -> Result<(), ManualLaborError>;

    /// Current pointer position in absolute screen coordinates
    fn pointer_position(&mut self) -> Result<(i32, i32), ManualLaborError>;
}

/// X11 core protocol button numbers
fn x11_button(button: MouseButton) -> u8 {
    match button {
        MouseButton::Left => 1,
        MouseButton::Middle => 2,
        MouseButton::Right => 3,
    }
}

/// XTEST-backed sink for X11 and XWayland sessions
pub struct XTestSink {
    conn: RustConnection,
    root: xproto::Window,
}

impl XTestSink {
    /// Connect to the X server and make sure XTEST is available
    pub fn new() -> Result<Self, ManualLaborError> {
        let (conn, screen_num) = x11rb::connect(None)
            .map_err(|e| ManualLaborError::InputAccess(format!("Failed to connect to X11: {}", e)))?;
        let root = conn.setup().roots[screen_num].root;

        let version = conn
            .xtest_get_version(2, 2)
            .map_err(|e| ManualLaborError::InputAccess(format!("XTEST unavailable: {}", e)))?
            .reply()
            .map_err(|e| ManualLaborError::InputAccess(format!("XTEST unavailable: {}", e)))?;

        info!(
            "Using XTEST {}.{} for input simulation",
            version.major_version, version.minor_version
        );
        Ok(Self { conn, root })
    }

    fn fake_button(&self, event_type: u8, button: MouseButton) -> Result<(), ManualLaborError> {
        self.conn
            .xtest_fake_input(
                event_type,
                x11_button(button),
                x11rb::CURRENT_TIME,
                self.root,
                0,
                0,
                0,
            )
            .map_err(|e| ManualLaborError::SendEvent(format!("XTEST fake input failed: {}", e)))?;
        Ok(())
    }

    fn flush(&self) -> Result<(), ManualLaborError> {
        self.conn
            .flush()
            .map_err(|e| ManualLaborError::SendEvent(format!("X11 flush failed: {}", e)))
    }
}

impl InputSink for XTestSink {
    fn set_pointer_position(&mut self, x: i32, y: i32) -> Result<(), ManualLaborError> {
        let (dst_x, dst_y) = match (i16::try_from(x), i16::try_from(y)) {
            (Ok(dst_x), Ok(dst_y)) => (dst_x, dst_y),
            _ => return Err(ManualLaborError::InvalidPosition { x, y }),
        };

        self.conn
            .warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, dst_x, dst_y)
            .map_err(|e| ManualLaborError::SendEvent(format!("Pointer warp failed: {}", e)))?;
        self.flush()
    }

    fn press_and_release(&mut self, button: MouseButton) -> Result<(), ManualLaborError> {
        debug!("Sending {} click via XTEST", button);
        self.fake_button(xproto::BUTTON_PRESS_EVENT, button)?;
        self.fake_button(xproto::BUTTON_RELEASE_EVENT, button)?;
        self.flush()
    }

    fn pointer_position(&mut self) -> Result<(i32, i32), ManualLaborError> {
        let pointer = self
            .conn
            .query_pointer(self.root)
            .map_err(|e| ManualLaborError::PointerQuery(e.to_string()))?
            .reply()
            .map_err(|e| ManualLaborError::PointerQuery(e.to_string()))?;
        Ok((i32::from(pointer.root_x), i32::from(pointer.root_y)))
    }
}

/// Get the ydotool socket path
fn get_socket_path() -> String {
    let uid = unsafe { libc::getuid() };
    format!("/run/user/{}/.ydotool_socket", uid)
}

/// ydotool click code: button id with the down (0x40) and up (0x80) flags
fn ydotool_click_code(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "0xC0",
        MouseButton::Right => "0xC1",
        MouseButton::Middle => "0xC2",
    }
}

/// ydotool-backed sink for Wayland sessions
pub struct YdotoolSink {
    socket_path: String,
}

impl YdotoolSink {
    /// Create a new YdotoolSink
    ///
    /// Requires ydotool to be installed and ydotoold daemon running.
    pub fn new() -> Result<Self, ManualLaborError> {
        let output = Command::new("which")
            .arg("ydotool")
            .output()
            .map_err(|e| {
                ManualLaborError::InputAccess(format!("Failed to check for ydotool: {}", e))
            })?;

        if !output.status.success() {
            return Err(ManualLaborError::InputAccess(
                "ydotool not found. Install it with your package manager".to_string(),
            ));
        }

        info!("Using ydotool for input simulation");
        Ok(Self {
            socket_path: get_socket_path(),
        })
    }

    /// Run a ydotool command with the socket path set
    fn run_ydotool(&self, args: &[&str]) -> Result<(), ManualLaborError> {
        let output = Command::new("ydotool")
            .args(args)
            .env("YDOTOOL_SOCKET", &self.socket_path)
            .output()
            .map_err(|e| ManualLaborError::SendEvent(format!("Failed to run ydotool: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ManualLaborError::SendEvent(format!(
                "ydotool failed: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl InputSink for YdotoolSink {
    fn set_pointer_position(&mut self, x: i32, y: i32) -> Result<(), ManualLaborError> {
        if x < 0 || y < 0 {
            return Err(ManualLaborError::InvalidPosition { x, y });
        }
        let (x_arg, y_arg) = (x.to_string(), y.to_string());
        self.run_ydotool(&["mousemove", "--absolute", "-x", &x_arg, "-y", &y_arg])
    }

    fn press_and_release(&mut self, button: MouseButton) -> Result<(), ManualLaborError> {
        debug!("Sending {} click via ydotool", button);
        self.run_ydotool(&["click", ydotool_click_code(button)])
    }

    fn pointer_position(&mut self) -> Result<(i32, i32), ManualLaborError> {
        // uinput is write-only
        Err(ManualLaborError::PointerQuery(
            "ydotool cannot read the pointer position".to_string(),
        ))
    }
}

/// Pick the input backend for the current session
///
/// Wayland sessions prefer ydotool, everything else prefers XTEST; the
/// other backend is tried if the preferred one is unavailable.
pub fn create_input_sink() -> Result<Box<dyn InputSink>, ManualLaborError> {
    let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some();

    let (first, second): (SinkFactory, SinkFactory) = if wayland {
        (boxed_ydotool, boxed_xtest)
    } else {
        (boxed_xtest, boxed_ydotool)
    };

    match first() {
        Ok(sink) => Ok(sink),
        Err(e) => {
            warn!("Preferred input backend unavailable: {}", e);
            second()
        }
    }
}

type SinkFactory = fn() -> Result<Box<dyn InputSink>, ManualLaborError>;

fn boxed_xtest() -> Result<Box<dyn InputSink>, ManualLaborError> {
    Ok(Box::new(XTestSink::new()?))
}

fn boxed_ydotool() -> Result<Box<dyn InputSink>, ManualLaborError> {
    Ok(Box::new(YdotoolSink::new()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x11_buttons_follow_core_protocol_numbering() {
        assert_eq!(x11_button(MouseButton::Left), 1);
        assert_eq!(x11_button(MouseButton::Middle), 2);
        assert_eq!(x11_button(MouseButton::Right), 3);
    }

    #[test]
    fn ydotool_codes_press_and_release() {
        assert_eq!(ydotool_click_code(MouseButton::Left), "0xC0");
        assert_eq!(ydotool_click_code(MouseButton::Right), "0xC1");
        assert_eq!(ydotool_click_code(MouseButton::Middle), "0xC2");
    }

    #[test]
    fn ydotool_rejects_negative_coordinates() {
        let mut sink = YdotoolSink {
            socket_path: get_socket_path(),
        };
        let err = sink.set_pointer_position(-1, 10).unwrap_err();
        assert!(matches!(err, ManualLaborError::InvalidPosition { x: -1, y: 10 }));
    }

    #[test]
    fn ydotool_cannot_report_the_pointer() {
        let mut sink = YdotoolSink {
            socket_path: get_socket_path(),
        };
        let err = sink.pointer_position().unwrap_err();
        assert!(matches!(err, ManualLaborError::PointerQuery(_)));
    }

    #[test]
    fn socket_path_is_per_user() {
        let path = get_socket_path();
        assert!(path.starts_with("/run/user/"));
        assert!(path.ends_with("/.ydotool_socket"));
    }
}
