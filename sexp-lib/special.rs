//! Special positions.
//!
//! The cursor is *special* when it sits right before an opening delimiter
//! (optionally behind prefix sigils) or right after a closing one. Keys
//! pressed there run structural commands instead of inserting text.
//!
//! ```text
//! |(foo)     BeforeOpen
//! |'(foo)    BeforeOpen
//! (foo)|     AfterClose
//! "(|foo)"   neither, the paren is inside a string
//! ```
//!
//! The classification is transient: it is recomputed from the text every
//! time it is asked for.

use ropey::RopeSlice;
use sexp_core::Delimiters;

use crate::{
  buffer::Buffer,
  lexer::{
    self,
    LexState,
    TokenKind,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Special {
  BeforeOpen,
  AfterClose,
}

/// Position of the opening delimiter reached from `pos` by skipping prefix
/// sigils.
pub fn open_after_prefix(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<usize> {
  let mut idx = pos;
  loop {
    let ch = text.get_char(idx)?;
    if delims.is_open(ch) {
      return Some(idx);
    }
    if !delims.is_prefix(ch) {
      return None;
    }
    idx += 1;
  }
}

/// First position of the prefix run that ends at `open`.
pub fn prefix_start(text: RopeSlice, delims: &Delimiters, open: usize) -> usize {
  let mut start = open;
  while start > 0 && text.get_char(start - 1).is_some_and(|ch| delims.is_prefix(ch)) {
    start -= 1;
  }
  start
}

/// Classify `pos` given an already computed lexer state for it.
pub fn special_in(
  text: RopeSlice,
  delims: &Delimiters,
  pos: usize,
  state: &LexState,
) -> Option<Special> {
  if !state.in_code() || state.inside.is_some() {
    return None;
  }
  if open_after_prefix(text, delims, pos).is_some() {
    return Some(Special::BeforeOpen);
  }
  state
    .prev
    .filter(|token| token.is(TokenKind::Close) && token.span.end == pos)
    .map(|_| Special::AfterClose)
}

pub fn special(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<Special> {
  let state = lexer::lex(text, delims, pos);
  special_in(text, delims, pos, &state)
}

/// Special position of the buffer's cursor.
pub fn special_at<B: Buffer + ?Sized>(buffer: &B, delims: &Delimiters) -> Option<Special> {
  special(buffer.text(), delims, buffer.cursor())
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;

  fn check(text: &str, pos: usize) -> Option<Special> {
    let doc = Rope::from(text);
    special(doc.slice(..), &Delimiters::default(), pos)
  }

  #[test]
  fn before_open_and_after_close() {
    assert_eq!(check("(foo)", 0), Some(Special::BeforeOpen));
    assert_eq!(check("(foo)", 5), Some(Special::AfterClose));
    assert_eq!(check("(foo)", 1), None);
    assert_eq!(check("(foo)", 4), None);
    assert_eq!(check("(a [b])", 3), Some(Special::BeforeOpen));
    assert_eq!(check("(a [b])", 6), Some(Special::AfterClose));
  }

  #[test]
  fn prefixes_belong_to_the_open() {
    assert_eq!(check("'(foo)", 0), Some(Special::BeforeOpen));
    assert_eq!(check("#'(foo)", 1), Some(Special::BeforeOpen));
    assert_eq!(check("' (foo)", 0), None);

    let doc = Rope::from("(a ,@(b))");
    assert_eq!(prefix_start(doc.slice(..), &Delimiters::default(), 5), 3);
    assert_eq!(open_after_prefix(doc.slice(..), &Delimiters::default(), 3), Some(5));
  }

  #[test]
  fn strings_comments_and_escapes_are_not_special() {
    assert_eq!(check("\"(foo)\"", 1), None);
    assert_eq!(check("\"(foo)\"", 6), None);
    assert_eq!(check("; (foo)", 2), None);
    assert_eq!(check(r"a\(b", 2), None);
    assert_eq!(check(r"\)", 2), None);
  }

  #[test]
  fn before_open_wins_between_lists() {
    assert_eq!(check("(a)(b)", 3), Some(Special::BeforeOpen));
  }
}
