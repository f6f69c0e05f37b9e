//! Engine configuration.
//!
//! The built-in `default.toml` is always loaded first. A user file, either
//! given explicitly or found at `<config dir>/sexp/config.toml`, is deep
//! merged over it before deserializing, so unknown fields are reported no
//! matter which file they come from.

use std::{
  collections::HashMap,
  path::{
    Path,
    PathBuf,
  },
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};
use serde::Deserialize;
use sexp_core::Delimiters;
use thiserror::Error;
use toml::Value;

use crate::{
  eval::Dialect,
  keymap::{
    BindingSpec,
    Keymap,
  },
};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("invalid config: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("invalid key {0:?}, keys must be a single character")]
  InvalidKey(String),
  #[error("unknown command {0:?}")]
  UnknownCommand(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
  pub delimiters: Delimiters,
  pub no_space:   bool,
  /// Definition kind to the index of the element shown in its label.
  pub tag_arity:  HashMap<String, usize>,
  pub keys:       HashMap<String, BindingSpec>,
  pub dialect:    HashMap<String, DialectConfig>,
}

/// Per-dialect overrides, `[dialect.<name>]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DialectConfig {
  pub prefixes:  Option<Vec<char>>,
  pub comment:   Option<String>,
  pub no_space:  Option<bool>,
  pub tag_arity: HashMap<String, usize>,
  pub keys:      HashMap<String, BindingSpec>,
}

impl Config {
  /// The built-in configuration alone.
  pub fn builtin() -> Result<Self> {
    Ok(builtin_value()?.try_into()?)
  }

  /// The built-in configuration with `user` merged over it.
  pub fn from_toml_str(user: &str) -> Result<Self> {
    let user: Value = toml::from_str(user)?;
    Ok(merge_toml_values(builtin_value()?, user, 3).try_into()?)
  }

  /// Load `path`, or the user config file when there is one, over the
  /// built-in configuration.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(path) => Some(path.to_path_buf()),
      None => config_file().filter(|path| path.exists()),
    };
    let Some(path) = path else {
      tracing::debug!("no user config, using built-in defaults");
      return Self::builtin();
    };
    let text = std::fs::read_to_string(&path).map_err(|source| {
      ConfigError::Io {
        path: path.clone(),
        source,
      }
    })?;
    let config = Self::from_toml_str(&text)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
  }

  /// Settings with the `[dialect.<name>]` overrides applied.
  pub fn for_dialect(&self, dialect: &Dialect) -> Config {
    let mut resolved = self.clone();
    let Some(overrides) = self.dialect.get(dialect.as_str()) else {
      tracing::debug!(%dialect, "no dialect section, using global settings");
      return resolved;
    };
    if let Some(prefixes) = &overrides.prefixes {
      resolved.delimiters.prefixes = prefixes.clone();
    }
    if let Some(comment) = &overrides.comment {
      resolved.delimiters.comment = comment.clone();
    }
    if let Some(no_space) = overrides.no_space {
      resolved.no_space = no_space;
    }
    resolved.tag_arity.extend(overrides.tag_arity.clone());
    resolved.keys.extend(overrides.keys.clone());
    resolved
  }

  /// The default keymap with `[keys]` layered over it.
  pub fn keymap(&self) -> Result<Keymap> {
    let mut keymap = Keymap::default();
    keymap.apply(&self.keys)?;
    Ok(keymap)
  }
}

fn builtin_value() -> Result<Value> {
  Ok(toml::from_str(DEFAULT_CONFIG)?)
}

/// `$SEXP_CONFIG_DIR`, or `sexp` under the platform config directory.
pub fn config_dir() -> Option<PathBuf> {
  if let Ok(dir) = std::env::var("SEXP_CONFIG_DIR") {
    return Some(PathBuf::from(dir));
  }
  let strategy = choose_base_strategy().ok()?;
  let mut path = strategy.config_dir();
  path.push("sexp");
  Some(path)
}

pub fn config_file() -> Option<PathBuf> {
  config_dir().map(|dir| dir.join("config.toml"))
}

/// Merge `right` over `left`, descending `merge_depth` levels into tables.
///
/// Arrays of tables with a `name` key are merged item by item. Any other
/// array is replaced whole, so a user `prefixes` list overrides the default
/// instead of extending it.
pub fn merge_toml_values(left: Value, right: Value, merge_depth: usize) -> Value {
  fn get_name(v: &Value) -> Option<&str> {
    v.get("name").and_then(Value::as_str)
  }

  match (left, right) {
    (Value::Array(mut left_items), Value::Array(right_items)) => {
      if merge_depth > 0 && !right_items.is_empty() && right_items.iter().all(|v| get_name(v).is_some()) {
        left_items.reserve(right_items.len());
        for rvalue in right_items {
          let lvalue = get_name(&rvalue)
            .and_then(|rname| left_items.iter().position(|v| get_name(v) == Some(rname)))
            .map(|lpos| left_items.remove(lpos));
          let mvalue = match lvalue {
            Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
            None => rvalue,
          };
          left_items.push(mvalue);
        }
        Value::Array(left_items)
      } else {
        Value::Array(right_items)
      }
    },
    (Value::Table(mut left_map), Value::Table(right_map)) => {
      if merge_depth > 0 {
        for (rname, rvalue) in right_map {
          match left_map.remove(&rname) {
            Some(lvalue) => {
              let merged_value = merge_toml_values(lvalue, rvalue, merge_depth - 1);
              left_map.insert(rname, merged_value);
            },
            None => {
              left_map.insert(rname, rvalue);
            },
          }
        }
        Value::Table(left_map)
      } else {
        Value::Table(right_map)
      }
    },
    (_, value) => value,
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    command::Command,
    keymap::Binding,
  };

  #[test]
  fn builtin_parses() {
    let config = Config::builtin().unwrap();
    assert_eq!(config.delimiters, Delimiters::default());
    assert!(!config.no_space);
    assert_eq!(config.tag_arity.get("defun"), Some(&2));
    assert!(config.dialect.contains_key("clojure"));
  }

  #[test]
  fn user_values_override_builtin() {
    let config = Config::from_toml_str(
      r#"
        no-space = true

        [delimiters]
        prefixes = ["'"]

        [keys]
        "x" = "split"
      "#,
    )
    .unwrap();
    assert!(config.no_space);
    assert_eq!(config.delimiters.prefixes, vec!['\'']);
    assert_eq!(config.delimiters.comment, ";");
    let keymap = config.keymap().unwrap();
    assert_eq!(keymap.get('x'), Some(Binding::new(Command::Split)));
    assert_eq!(keymap.get('>'), Some(Binding::new(Command::Slurp)));
  }

  #[test]
  fn unknown_fields_are_errors() {
    assert!(matches!(
      Config::from_toml_str("no-spaces = true"),
      Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
      Config::from_toml_str("[keys]\n\"x\" = \"nope\"").unwrap().keymap(),
      Err(ConfigError::UnknownCommand(_))
    ));
  }

  #[test]
  fn dialect_overrides() {
    let config = Config::builtin().unwrap();
    let clojure = config.for_dialect(&Dialect::from("clojure"));
    assert!(clojure.delimiters.is_prefix('~'));
    assert_eq!(clojure.tag_arity.get("defn"), Some(&2));
    assert_eq!(clojure.tag_arity.get("defun"), Some(&2));

    let unknown = config.for_dialect(&Dialect::from("arc"));
    assert_eq!(unknown, config);
  }

  #[test]
  fn missing_explicit_file_is_an_io_error() {
    let err = Config::load(Some(Path::new("/nonexistent/sexp/config.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
  }
}
