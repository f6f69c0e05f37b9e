//! Single-key bindings for structural commands.
//!
//! Keys are plain printable chars. Whether a key runs its command or inserts
//! itself is decided by [`crate::dispatch`].

use std::collections::HashMap;

use serde::Deserialize;

use crate::{
  command::Command,
  config::ConfigError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
  pub command:    Command,
  /// After a list, run the command from the list start and come back.
  pub from_start: bool,
}

impl Binding {
  pub const fn new(command: Command) -> Self {
    Self {
      command,
      from_start: false,
    }
  }

  pub const fn from_start(mut self) -> Self {
    self.from_start = true;
    self
  }
}

/// A binding as written in the `[keys]` table: either just the command
/// name, or a table with the flag.
///
/// ```toml
/// [keys]
/// ">" = "slurp"
/// "m" = { command = "raise-some", from-start = true }
/// "x" = ""   # unbind
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BindingSpec {
  Name(String),
  #[serde(rename_all = "kebab-case")]
  Full {
    command:    String,
    #[serde(default)]
    from_start: bool,
  },
}

impl BindingSpec {
  /// `None` unbinds the key.
  fn resolve(&self) -> Result<Option<Binding>, ConfigError> {
    let (name, from_start) = match self {
      BindingSpec::Name(name) => (name, false),
      BindingSpec::Full { command, from_start } => (command, *from_start),
    };
    if name.is_empty() {
      return Ok(None);
    }
    let command = name
      .parse::<Command>()
      .map_err(|_| ConfigError::UnknownCommand(name.clone()))?;
    Ok(Some(Binding {
      command,
      from_start,
    }))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
  bindings: HashMap<char, Binding>,
}

const DEFAULT_KEYS: &[(char, Command)] = &[
  ('>', Command::Slurp),
  ('<', Command::Barf),
  ('r', Command::Raise),
  ('R', Command::RaiseSome),
  ('C', Command::Convolute),
  ('+', Command::Join),
  ('/', Command::Splice),
  ('c', Command::Clone),
  ('w', Command::MoveUp),
  ('s', Command::MoveDown),
  ('t', Command::Teleport),
  ('l', Command::OutForward),
  ('h', Command::OutBackward),
  ('f', Command::Flow),
  ('d', Command::Different),
  (']', Command::Forward),
  ('[', Command::Backward),
  ('e', Command::Eval),
  ('E', Command::EvalAndReplace),
  ('q', Command::JumpParen),
  ('a', Command::JumpSymbol),
  ('g', Command::Goto),
  ('F', Command::Follow),
];

impl Default for Keymap {
  fn default() -> Self {
    Self {
      bindings: DEFAULT_KEYS
        .iter()
        .map(|&(key, command)| (key, Binding::new(command)))
        .collect(),
    }
  }
}

impl Keymap {
  pub fn get(&self, key: char) -> Option<Binding> {
    self.bindings.get(&key).copied()
  }

  pub fn bind(&mut self, key: char, binding: Binding) -> Option<Binding> {
    self.bindings.insert(key, binding)
  }

  pub fn unbind(&mut self, key: char) -> Option<Binding> {
    self.bindings.remove(&key)
  }

  /// Bindings sorted by key.
  pub fn iter(&self) -> impl Iterator<Item = (char, Binding)> + '_ {
    let mut keys: Vec<char> = self.bindings.keys().copied().collect();
    keys.sort_unstable();
    keys.into_iter().map(|key| (key, self.bindings[&key]))
  }

  /// Layer a `[keys]` table over this keymap.
  pub fn apply(&mut self, keys: &HashMap<String, BindingSpec>) -> Result<(), ConfigError> {
    for (key, spec) in keys {
      let mut chars = key.chars();
      let (Some(ch), None) = (chars.next(), chars.next()) else {
        return Err(ConfigError::InvalidKey(key.clone()));
      };
      match spec.resolve()? {
        Some(binding) => {
          self.bind(ch, binding);
        },
        None => {
          self.unbind(ch);
        },
      }
    }
    Ok(())
  }
}
