//! Console commands
//!
//! One command per line, parsed with clap. Numeric arguments stay as text
//! so the config editor can apply its parse-error policy.

use clap::error::ErrorKind;
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{Hotkey, MouseButton};
use crate::ManualLaborError;

/// A single console line
#[derive(Parser, Debug)]
#[command(
    name = "manual-labor",
    no_binary_name = true,
    disable_version_flag = true,
    override_usage = "<COMMAND> [ARGS]"
)]
pub struct ConsoleLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start clicking (after the start delay, if one is set)
    Start,
    /// Stop clicking and cancel a pending start
    Stop,
    /// Start if stopped, stop if running
    #[command(alias = "t")]
    Toggle,
    /// Set clicks per second (1-50)
    #[command(alias = "rate")]
    Cps {
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Set the random timing variation in percent (0-30)
    #[command(alias = "variation")]
    Jitter {
        #[arg(allow_hyphen_values = true)]
        percent: String,
    },
    /// Set the mouse button to click with
    Button {
        #[arg(value_enum, ignore_case = true)]
        button: MouseButton,
    },
    /// Click twice per tick
    Double {
        #[arg(value_enum, ignore_case = true)]
        state: Switch,
    },
    /// Stop after this many clicks (0 = unlimited)
    Limit {
        #[arg(allow_hyphen_values = true)]
        count: String,
    },
    /// Pin clicks to a fixed pointer position
    #[command(alias = "position")]
    Pos {
        #[command(subcommand)]
        action: PositionCommand,
    },
    /// Record the pointer position as the fixed position in 2 seconds
    Capture,
    /// Set the start/stop hotkey (F6-F10)
    Hotkey {
        #[arg(value_enum, ignore_case = true)]
        key: Hotkey,
    },
    /// Click only while the hotkey is held
    Hold {
        #[arg(value_enum, ignore_case = true)]
        state: Switch,
    },
    /// Seconds to wait before clicking starts
    Delay {
        #[arg(allow_hyphen_values = true)]
        seconds: String,
    },
    /// Ring the terminal bell on every click
    Sound {
        #[arg(value_enum, ignore_case = true)]
        state: Switch,
    },
    /// Dark theme flag, kept in the settings file
    Dark {
        #[arg(value_enum, ignore_case = true)]
        state: Switch,
    },
    /// Write the settings file
    Save,
    /// Show the current state and settings
    Status,
    /// Stop clicking and exit
    #[command(alias = "exit", alias = "q")]
    Quit,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum PositionCommand {
    /// Move the pointer to X Y before every click
    Set {
        #[arg(allow_hyphen_values = true)]
        x: String,
        #[arg(allow_hyphen_values = true)]
        y: String,
    },
    /// Use the stored fixed position again
    On,
    /// Click wherever the pointer is
    Off,
}

/// On/off argument for the boolean settings
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    #[value(alias = "true", alias = "yes")]
    On,
    #[value(alias = "false", alias = "no")]
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

/// Parse one console line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>, ManualLaborError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let parsed = ConsoleLine::try_parse_from(line.split_whitespace())?;
    Ok(Some(parsed.command))
}

/// True for the clap "errors" that carry help text rather than a mistake
pub fn is_help(error: &clap::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        parse_command(line).unwrap().unwrap()
    }

    fn clap_error(line: &str) -> clap::Error {
        match parse_command(line) {
            Err(ManualLaborError::Command(e)) => e,
            other => panic!("expected a clap error for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn parses_actions() {
        assert_eq!(parse("start"), Command::Start);
        assert_eq!(parse("  stop "), Command::Stop);
        assert_eq!(parse("t"), Command::Toggle);
        assert_eq!(parse("quit"), Command::Quit);
        assert_eq!(parse("exit"), Command::Quit);
        assert_eq!(parse("capture"), Command::Capture);
    }

    #[test]
    fn keeps_numeric_arguments_as_text() {
        assert_eq!(parse("cps 25"), Command::Cps { value: "25".into() });
        assert_eq!(parse("rate -3"), Command::Cps { value: "-3".into() });
        assert_eq!(parse("limit abc"), Command::Limit { count: "abc".into() });
        assert_eq!(parse("delay 1.5"), Command::Delay { seconds: "1.5".into() });
    }

    #[test]
    fn parses_position_forms() {
        assert_eq!(
            parse("pos set 10 -20"),
            Command::Pos {
                action: PositionCommand::Set {
                    x: "10".into(),
                    y: "-20".into()
                }
            }
        );
        assert_eq!(parse("pos off"), Command::Pos { action: PositionCommand::Off });
        assert_eq!(parse("position on"), Command::Pos { action: PositionCommand::On });
        assert!(parse_command("pos set 10").is_err());
    }

    #[test]
    fn parses_enum_arguments() {
        assert_eq!(parse("button right"), Command::Button { button: MouseButton::Right });
        assert_eq!(parse("hotkey F7"), Command::Hotkey { key: Hotkey::F7 });
        assert!(parse_command("button side").is_err());
        assert!(parse_command("hotkey F12").is_err());
    }

    #[test]
    fn parses_switches() {
        assert_eq!(parse("double on"), Command::Double { state: Switch::On });
        assert_eq!(parse("hold OFF"), Command::Hold { state: Switch::Off });
        assert_eq!(parse("sound yes"), Command::Sound { state: Switch::On });
        assert!(parse_command("dark maybe").is_err());
        assert!(parse_command("hold").is_err());
    }

    #[test]
    fn blank_lines_are_not_commands() {
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn unknown_commands_are_errors() {
        let err = clap_error("jump 3");
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        assert!(!is_help(&err));
        assert!(parse_command("cps").is_err());
    }

    #[test]
    fn help_is_rendered_by_clap() {
        let err = clap_error("help");
        assert!(is_help(&err));
        let text = err.to_string();
        assert!(text.contains("capture"));
        assert!(text.contains("Set clicks per second"));

        let err = clap_error("help pos");
        assert!(is_help(&err));
        assert!(err.to_string().contains("Click wherever the pointer is"));
    }
}
