//! Commands accepted by a manipulator controller.
//!
//! Every command has an issue phase and a completion predicate on the
//! controller. The text form is what the console understands:
//!
//! | Command | Text |
//! |---------|------|
//! | `StartAxis(0)` | `startAxis 0` |
//! | `StopAllAxes` | `stopAllAxes` |
//! | `AddDriveOffset(1, 0.05)` | `addDriveOffset 1 0.05` |

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A lifecycle or configuration command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Stopped → Driven for one axis.
    StartAxis(usize),
    /// Driven → Stopped for one axis.
    StopAxis(usize),
    /// Stopped → Locked for one axis.
    LockAxis(usize),
    /// Locked → Stopped for one axis. Requires prepare-for-use.
    UnlockAxis(usize),
    /// Start every axis.
    StartAllAxes,
    /// Stop every axis.
    StopAllAxes,
    /// Lock every axis.
    LockAllAxes,
    /// Unlock every axis.
    UnlockAllAxes,
    /// Close the safety interlock and allow unlocking.
    PrepareForUse,
    /// Stop and lock everything, open the interlock.
    PrepareForShutdown,
    /// Accumulate into the drive offset of one axis.
    AddDriveOffset(usize, f64),
}

impl Command {
    /// Console name of the command.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartAxis(_) => "startAxis",
            Self::StopAxis(_) => "stopAxis",
            Self::LockAxis(_) => "lockAxis",
            Self::UnlockAxis(_) => "unlockAxis",
            Self::StartAllAxes => "startAllAxes",
            Self::StopAllAxes => "stopAllAxes",
            Self::LockAllAxes => "lockAllAxes",
            Self::UnlockAllAxes => "unlockAllAxes",
            Self::PrepareForUse => "prepareForUse",
            Self::PrepareForShutdown => "prepareForShutdown",
            Self::AddDriveOffset(..) => "addDriveOffset",
        }
    }

    /// Axis addressed by a single-axis command.
    pub const fn axis(&self) -> Option<usize> {
        match self {
            Self::StartAxis(i)
            | Self::StopAxis(i)
            | Self::LockAxis(i)
            | Self::UnlockAxis(i)
            | Self::AddDriveOffset(i, _) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddDriveOffset(axis, offset) => write!(f, "{} {axis} {offset}", self.name()),
            _ => match self.axis() {
                Some(axis) => write!(f, "{} {axis}", self.name()),
                None => f.write_str(self.name()),
            },
        }
    }
}

/// Console input that is not a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    /// Blank line.
    #[error("empty command")]
    Empty,

    /// First word is not a command name.
    #[error("unknown command '{0}'")]
    Unknown(String),

    /// A required argument is absent.
    #[error("{command}: missing {argument}")]
    MissingArgument {
        /// Command name.
        command: &'static str,
        /// Argument name.
        argument: &'static str,
    },

    /// An argument does not parse.
    #[error("{command}: invalid {argument} '{value}'")]
    InvalidArgument {
        /// Command name.
        command: &'static str,
        /// Argument name.
        argument: &'static str,
        /// Offending text.
        value: String,
    },

    /// Extra words after the last argument.
    #[error("{0}: unexpected trailing arguments")]
    TrailingArguments(&'static str),
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let name = words.next().ok_or(CommandParseError::Empty)?;

        let command = match name {
            "startAxis" => Self::StartAxis(parse_arg(&mut words, "startAxis", "axis")?),
            "stopAxis" => Self::StopAxis(parse_arg(&mut words, "stopAxis", "axis")?),
            "lockAxis" => Self::LockAxis(parse_arg(&mut words, "lockAxis", "axis")?),
            "unlockAxis" => Self::UnlockAxis(parse_arg(&mut words, "unlockAxis", "axis")?),
            "startAllAxes" => Self::StartAllAxes,
            "stopAllAxes" => Self::StopAllAxes,
            "lockAllAxes" => Self::LockAllAxes,
            "unlockAllAxes" => Self::UnlockAllAxes,
            "prepareForUse" => Self::PrepareForUse,
            "prepareForShutdown" => Self::PrepareForShutdown,
            "addDriveOffset" => {
                let axis = parse_arg(&mut words, "addDriveOffset", "axis")?;
                let offset: f64 = parse_arg(&mut words, "addDriveOffset", "offset")?;
                if !offset.is_finite() {
                    return Err(CommandParseError::InvalidArgument {
                        command: "addDriveOffset",
                        argument: "offset",
                        value: offset.to_string(),
                    });
                }
                Self::AddDriveOffset(axis, offset)
            }
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };

        if words.next().is_some() {
            return Err(CommandParseError::TrailingArguments(command.name()));
        }
        Ok(command)
    }
}

fn parse_arg<'a, T: FromStr>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<T, CommandParseError> {
    let word = words
        .next()
        .ok_or(CommandParseError::MissingArgument { command, argument })?;
    word.parse().map_err(|_| CommandParseError::InvalidArgument {
        command,
        argument,
        value: word.to_string(),
    })
}
