//! Delimiter set configuration.
//!
//! The engine only understands lexical structure: which characters open and
//! close lists, which character quotes strings, what escapes the next
//! character, what starts a line comment, and which sigils may prefix a form
//! (`'(a b)`, `` `(a ,b) ``, `#(x)`). Everything else is a symbol constituent.
//!
//! # Default set
//!
//! ```ignore
//! pairs    = [["(", ")"], ["[", "]"], ["{", "}"]]
//! quote    = "\""
//! escape   = "\\"
//! comment  = ";"
//! prefixes = ["'", "`", "#", ",", "@"]
//! ```
//!
//! Prefix sigils are dialect specific (Clojure adds `~` and `^`), so they are
//! plain configuration rather than a fixed list.

use ropey::RopeSlice;
use serde::Deserialize;

use crate::chars::char_is_blank;

pub const DEFAULT_PAIRS: &[(char, char)] = &[('(', ')'), ('[', ']'), ('{', '}')];
pub const DEFAULT_PREFIXES: &[char] = &['\'', '`', '#', ',', '@'];

/// An opening delimiter and the closing delimiter that matches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "(char, char)")]
pub struct Pair {
  pub open:  char,
  pub close: char,
}

impl From<(char, char)> for Pair {
  fn from((open, close): (char, char)) -> Self {
    Self { open, close }
  }
}

impl From<&(char, char)> for Pair {
  fn from(&(open, close): &(char, char)) -> Self {
    Self::from((open, close))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Delimiters {
  pub pairs:    Vec<Pair>,
  pub quote:    char,
  pub escape:   char,
  /// Line comment marker, may be longer than one char (`//`, `--`).
  pub comment:  String,
  pub prefixes: Vec<char>,
}

impl Default for Delimiters {
  fn default() -> Self {
    Self {
      pairs:    DEFAULT_PAIRS.iter().map(Pair::from).collect(),
      quote:    '"',
      escape:   '\\',
      comment:  ";".to_string(),
      prefixes: DEFAULT_PREFIXES.to_vec(),
    }
  }
}

impl Delimiters {
  #[inline]
  pub fn is_open(&self, ch: char) -> bool {
    self.pairs.iter().any(|pair| pair.open == ch)
  }

  #[inline]
  pub fn is_close(&self, ch: char) -> bool {
    self.pairs.iter().any(|pair| pair.close == ch)
  }

  #[inline]
  pub fn is_delimiter(&self, ch: char) -> bool {
    self.is_open(ch) || self.is_close(ch)
  }

  /// Closing delimiter for `open`.
  pub fn close_for(&self, open: char) -> Option<char> {
    self
      .pairs
      .iter()
      .find(|pair| pair.open == open)
      .map(|pair| pair.close)
  }

  /// Opening delimiter for `close`.
  pub fn open_for(&self, close: char) -> Option<char> {
    self
      .pairs
      .iter()
      .find(|pair| pair.close == close)
      .map(|pair| pair.open)
  }

  #[inline]
  pub fn is_prefix(&self, ch: char) -> bool {
    self.prefixes.contains(&ch)
  }

  #[inline]
  pub fn is_quote(&self, ch: char) -> bool {
    ch == self.quote
  }

  #[inline]
  pub fn is_escape(&self, ch: char) -> bool {
    ch == self.escape
  }

  /// Whether `ch` can be part of a symbol. The escape char counts, the
  /// escaped character itself is handled by the lexer.
  pub fn is_symbol_char(&self, ch: char) -> bool {
    !char_is_blank(ch)
      && !self.is_delimiter(ch)
      && !self.is_quote(ch)
      && !self.is_prefix(ch)
      && self.comment.chars().next() != Some(ch)
  }

  /// Whether the comment marker starts at `pos`.
  pub fn comment_at(&self, text: RopeSlice, pos: usize) -> bool {
    if self.comment.is_empty() {
      return false;
    }
    let mut idx = pos;
    for expected in self.comment.chars() {
      if text.get_char(idx) != Some(expected) {
        return false;
      }
      idx += 1;
    }
    true
  }

  /// Length of the comment marker in chars.
  pub fn comment_len(&self) -> usize {
    self.comment.chars().count()
  }
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;

  #[test]
  fn default_pairs_match() {
    let delims = Delimiters::default();
    assert!(delims.is_open('('));
    assert!(delims.is_close(']'));
    assert_eq!(delims.close_for('{'), Some('}'));
    assert_eq!(delims.open_for(')'), Some('('));
    assert_eq!(delims.close_for('<'), None);
  }

  #[test]
  fn symbol_chars_exclude_structure() {
    let delims = Delimiters::default();
    for ch in ['a', '-', '+', '*', '?', '!', '.', '\\', ':'] {
      assert!(delims.is_symbol_char(ch), "{ch:?} should be a symbol char");
    }
    for ch in ['(', ')', '"', '\'', '`', ';', ' ', '\n', '#'] {
      assert!(!delims.is_symbol_char(ch), "{ch:?} should not be a symbol char");
    }
  }

  #[test]
  fn multi_char_comment_marker() {
    let delims = Delimiters {
      comment: "//".to_string(),
      ..Delimiters::default()
    };
    let text = Rope::from("a / b // c");
    assert!(!delims.comment_at(text.slice(..), 2));
    assert!(delims.comment_at(text.slice(..), 6));
    assert!(!delims.comment_at(text.slice(..), 9));
    assert_eq!(delims.comment_len(), 2);
  }

  #[test]
  fn deserialize_from_toml() {
    let delims: Delimiters = toml::from_str(
      r#"
      pairs = [["(", ")"], ["<", ">"]]
      prefixes = ["'", "~"]
      "#,
    )
    .unwrap();
    assert!(delims.is_open('<'));
    assert!(!delims.is_open('['));
    assert!(delims.is_prefix('~'));
    assert_eq!(delims.comment, ";");
  }
}
