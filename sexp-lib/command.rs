//! Named structural commands.
//!
//! Every operation the engine offers has a stable kebab-case name, used by
//! key tables in the config file and by the `sexp` driver.

use std::{
  fmt,
  str::FromStr,
};

use thiserror::Error;

use crate::{
  eval::EvalError,
  transform::TransformError,
};

#[derive(Debug, Error)]
pub enum CommandError {
  #[error(transparent)]
  Transform(#[from] TransformError),
  #[error(transparent)]
  Eval(#[from] EvalError),
  #[error("{command} needs a {collaborator}, none was provided")]
  MissingCollaborator {
    command:      Command,
    collaborator: &'static str,
  },
  #[error("unknown command {0:?}")]
  Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
  // navigation
  Forward,
  Backward,
  OutForward,
  OutBackward,
  Flow,
  Different,
  Clockwise,
  Counterclockwise,
  EndOfLine,
  JumpParen,
  JumpSymbol,
  Goto,
  Follow,

  // transforms
  Slurp,
  SlurpForward,
  SlurpBackward,
  Barf,
  BarfForward,
  BarfBackward,
  Splice,
  Raise,
  RaiseSome,
  Convolute,
  Join,
  Split,
  Wrap,
  Parens,
  Brackets,
  Braces,

  // relocation
  Clone,
  MoveUp,
  MoveDown,
  Teleport,

  Eval,
  EvalAndReplace,
}

impl Command {
  pub const ALL: &'static [Command] = &[
    Command::Forward,
    Command::Backward,
    Command::OutForward,
    Command::OutBackward,
    Command::Flow,
    Command::Different,
    Command::Clockwise,
    Command::Counterclockwise,
    Command::EndOfLine,
    Command::JumpParen,
    Command::JumpSymbol,
    Command::Goto,
    Command::Follow,
    Command::Slurp,
    Command::SlurpForward,
    Command::SlurpBackward,
    Command::Barf,
    Command::BarfForward,
    Command::BarfBackward,
    Command::Splice,
    Command::Raise,
    Command::RaiseSome,
    Command::Convolute,
    Command::Join,
    Command::Split,
    Command::Wrap,
    Command::Parens,
    Command::Brackets,
    Command::Braces,
    Command::Clone,
    Command::MoveUp,
    Command::MoveDown,
    Command::Teleport,
    Command::Eval,
    Command::EvalAndReplace,
  ];

  pub const fn name(self) -> &'static str {
    match self {
      Command::Forward => "forward",
      Command::Backward => "backward",
      Command::OutForward => "out-forward",
      Command::OutBackward => "out-backward",
      Command::Flow => "flow",
      Command::Different => "different",
      Command::Clockwise => "clockwise",
      Command::Counterclockwise => "counterclockwise",
      Command::EndOfLine => "end-of-line",
      Command::JumpParen => "jump-paren",
      Command::JumpSymbol => "jump-symbol",
      Command::Goto => "goto",
      Command::Follow => "follow",
      Command::Slurp => "slurp",
      Command::SlurpForward => "slurp-forward",
      Command::SlurpBackward => "slurp-backward",
      Command::Barf => "barf",
      Command::BarfForward => "barf-forward",
      Command::BarfBackward => "barf-backward",
      Command::Splice => "splice",
      Command::Raise => "raise",
      Command::RaiseSome => "raise-some",
      Command::Convolute => "convolute",
      Command::Join => "join",
      Command::Split => "split",
      Command::Wrap => "wrap",
      Command::Parens => "parens",
      Command::Brackets => "brackets",
      Command::Braces => "braces",
      Command::Clone => "clone",
      Command::MoveUp => "move-up",
      Command::MoveDown => "move-down",
      Command::Teleport => "teleport",
      Command::Eval => "eval",
      Command::EvalAndReplace => "eval-and-replace",
    }
  }

  /// Whether the command may change the text. Edits get their own undo
  /// step.
  pub const fn is_edit(self) -> bool {
    matches!(
      self,
      Command::Slurp
        | Command::SlurpForward
        | Command::SlurpBackward
        | Command::Barf
        | Command::BarfForward
        | Command::BarfBackward
        | Command::Splice
        | Command::Raise
        | Command::RaiseSome
        | Command::Convolute
        | Command::Join
        | Command::Split
        | Command::Wrap
        | Command::Parens
        | Command::Brackets
        | Command::Braces
        | Command::Clone
        | Command::MoveUp
        | Command::MoveDown
        | Command::Teleport
        | Command::EvalAndReplace
        // outward with a selection moves text
        | Command::OutForward
        | Command::OutBackward
    )
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Command {
  type Err = CommandError;

  fn from_str(name: &str) -> Result<Self, Self::Err> {
    Command::ALL
      .iter()
      .copied()
      .find(|command| command.name() == name)
      .ok_or_else(|| CommandError::Unknown(name.to_string()))
  }
}

/// What running a command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// A navigation command; `false` when it could not move.
  Moved(bool),
  Edited,
  /// The selector was dismissed.
  Cancelled,
  Evaluated(String),
  /// The key was not structural here and was inserted as text.
  SelfInserted(char),
}
