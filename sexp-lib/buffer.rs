//! The narrow buffer interface the engine edits through.
//!
//! The host editor owns the text, the cursor, the selection, undo and
//! indentation. The engine only needs a read view of the text plus
//! insert/delete and cursor/selection setters, captured by [`Buffer`].
//!
//! [`RopeBuffer`] is a small reference host backed by [`ropey::Rope`]. It
//! tracks the cursor and selection anchor like markers across edits, keeps
//! whole-text snapshots at undo boundaries, and indents lists naively (one
//! column past the innermost enclosing opening delimiter). It is what the
//! tests and the driver binary run against.
//!
//! # Scoped lookahead
//!
//! Motions that only want to *look* ("would a backward skip followed by a
//! forward skip land here again?") run inside [`with_saved_cursor`], which
//! restores cursor and selection on every exit path, unwinding included.

use std::{
  fmt,
  ops::{
    Deref,
    DerefMut,
  },
};

use ropey::{
  Rope,
  RopeSlice,
};
use sexp_core::{
  Delimiters,
  Span,
  chars::char_is_whitespace,
};

use crate::{
  lexer::{
    self,
    Context,
  },
  selection::Range,
};

pub trait Buffer {
  /// Read view of the whole text.
  fn text(&self) -> RopeSlice<'_>;

  fn len_chars(&self) -> usize {
    self.text().len_chars()
  }

  fn char_at(&self, pos: usize) -> Option<char> {
    self.text().get_char(pos)
  }

  fn substring(&self, span: Span) -> String {
    let span = span.clamp(self.len_chars());
    self.text().slice(span.begin..span.end).to_string()
  }

  fn insert(&mut self, pos: usize, text: &str);

  fn delete(&mut self, span: Span);

  fn cursor(&self) -> usize;

  /// Moves the cursor. With an active selection this moves its head.
  fn set_cursor(&mut self, pos: usize);

  fn selection(&self) -> Option<Range>;

  /// Activates a selection; the cursor lands on `head`.
  fn set_selection(&mut self, anchor: usize, head: usize);

  fn clear_selection(&mut self);

  /// Reindent every line that starts inside `span`.
  fn indent_region(&mut self, span: Span);

  /// Starts a new undoable unit. Nothing is recorded until the text changes.
  fn undo_boundary(&mut self);
}

/// Restores cursor and selection when dropped.
pub struct SavedCursor<'a, B: Buffer + ?Sized> {
  buffer:    &'a mut B,
  cursor:    usize,
  selection: Option<Range>,
}

impl<'a, B: Buffer + ?Sized> SavedCursor<'a, B> {
  pub fn new(buffer: &'a mut B) -> Self {
    let cursor = buffer.cursor();
    let selection = buffer.selection();
    Self {
      buffer,
      cursor,
      selection,
    }
  }
}

impl<B: Buffer + ?Sized> Deref for SavedCursor<'_, B> {
  type Target = B;

  fn deref(&self) -> &B {
    self.buffer
  }
}

impl<B: Buffer + ?Sized> DerefMut for SavedCursor<'_, B> {
  fn deref_mut(&mut self) -> &mut B {
    self.buffer
  }
}

impl<B: Buffer + ?Sized> Drop for SavedCursor<'_, B> {
  fn drop(&mut self) {
    let len = self.buffer.len_chars();
    match self.selection {
      Some(range) => {
        self
          .buffer
          .set_selection(range.anchor.min(len), range.head.min(len))
      },
      None => {
        self.buffer.clear_selection();
        self.buffer.set_cursor(self.cursor.min(len));
      },
    }
  }
}

/// Run `f` and put cursor and selection back afterwards, whatever `f` did.
pub fn with_saved_cursor<B, T>(buffer: &mut B, f: impl FnOnce(&mut B) -> T) -> T
where
  B: Buffer + ?Sized,
{
  let mut guard = SavedCursor::new(buffer);
  f(&mut guard)
}

struct Snapshot {
  rope:   Rope,
  cursor: usize,
  anchor: Option<usize>,
}

/// Reference [`Buffer`] over a rope.
pub struct RopeBuffer {
  rope:    Rope,
  cursor:  usize,
  anchor:  Option<usize>,
  delims:  Delimiters,
  history: Vec<Snapshot>,
  pending: Option<Snapshot>,
}

impl RopeBuffer {
  pub fn new(text: &str) -> Self {
    Self::with_delimiters(text, Delimiters::default())
  }

  pub fn with_delimiters(text: &str, delims: Delimiters) -> Self {
    Self {
      rope: Rope::from_str(text),
      cursor: 0,
      anchor: None,
      delims,
      history: Vec::new(),
      pending: None,
    }
  }

  pub fn rope(&self) -> &Rope {
    &self.rope
  }

  pub fn delimiters(&self) -> &Delimiters {
    &self.delims
  }

  /// Restore the text, cursor and selection saved at the last undo boundary.
  pub fn undo(&mut self) -> bool {
    self.pending = None;
    let Some(snapshot) = self.history.pop() else {
      return false;
    };
    self.rope = snapshot.rope;
    self.cursor = snapshot.cursor;
    self.anchor = snapshot.anchor;
    true
  }

  /// The text with `|` marking the cursor, `[`/`]` marking a selection.
  pub fn render(&self) -> String {
    let mut out = self.rope.to_string();
    match self.selection() {
      Some(range) => {
        let (from, to) = (self.byte_of(range.from()), self.byte_of(range.to()));
        out.insert(to, ']');
        out.insert(from, '[');
      },
      None => out.insert(self.byte_of(self.cursor), '|'),
    }
    out
  }

  fn record_pending(&mut self) {
    if let Some(snapshot) = self.pending.take() {
      self.history.push(snapshot);
    }
  }

  fn byte_of(&self, pos: usize) -> usize {
    self.rope.char_to_byte(pos.min(self.rope.len_chars()))
  }

  fn wanted_indent(&self, line: usize) -> Option<usize> {
    let start = self.rope.line_to_char(line);
    let blank = self
      .rope
      .line(line)
      .chars()
      .all(|ch| ch.is_whitespace());
    if blank {
      return None;
    }

    let state = lexer::lex(self.rope.slice(..), &self.delims, start);
    if state.context != Context::Code {
      return None;
    }
    Some(match state.open.last() {
      Some(&open) => open - self.rope.line_to_char(self.rope.char_to_line(open)) + 1,
      None => 0,
    })
  }
}

impl fmt::Display for RopeBuffer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.rope)
  }
}

impl Buffer for RopeBuffer {
  fn text(&self) -> RopeSlice<'_> {
    self.rope.slice(..)
  }

  fn insert(&mut self, pos: usize, text: &str) {
    if text.is_empty() {
      return;
    }
    self.record_pending();
    let pos = pos.min(self.rope.len_chars());
    let len = text.chars().count();
    self.rope.insert(pos, text);

    let shift = |marker: usize| if pos <= marker { marker + len } else { marker };
    self.cursor = shift(self.cursor);
    self.anchor = self.anchor.map(shift);
  }

  fn delete(&mut self, span: Span) {
    let span = span.clamp(self.rope.len_chars());
    if span.is_empty() {
      return;
    }
    self.record_pending();
    self.rope.remove(span.begin..span.end);

    let shift = |marker: usize| {
      if marker >= span.end {
        marker - span.len()
      } else if marker > span.begin {
        span.begin
      } else {
        marker
      }
    };
    self.cursor = shift(self.cursor);
    self.anchor = self.anchor.map(shift);
  }

  fn cursor(&self) -> usize {
    self.cursor
  }

  fn set_cursor(&mut self, pos: usize) {
    self.cursor = pos.min(self.rope.len_chars());
  }

  fn selection(&self) -> Option<Range> {
    self.anchor.map(|anchor| Range::new(anchor, self.cursor))
  }

  fn set_selection(&mut self, anchor: usize, head: usize) {
    let len = self.rope.len_chars();
    self.anchor = Some(anchor.min(len));
    self.cursor = head.min(len);
  }

  fn clear_selection(&mut self) {
    self.anchor = None;
  }

  fn indent_region(&mut self, span: Span) {
    let span = span.clamp(self.rope.len_chars());
    let first = self.rope.char_to_line(span.begin);
    let mut last = self.rope.char_to_line(span.end);
    if last > first && self.rope.line_to_char(last) == span.end {
      last -= 1;
    }

    for line in first + 1..=last {
      let Some(wanted) = self.wanted_indent(line) else {
        continue;
      };
      let start = self.rope.line_to_char(line);
      let current = self
        .rope
        .line(line)
        .chars()
        .take_while(|&ch| char_is_whitespace(ch))
        .count();
      if current == wanted
        && self
          .rope
          .line(line)
          .chars()
          .take(current)
          .all(|ch| ch == ' ')
      {
        continue;
      }
      self.delete(Span::new(start, start + current));
      self.insert(start, &" ".repeat(wanted));
    }
  }

  fn undo_boundary(&mut self) {
    self.pending = Some(Snapshot {
      rope:   self.rope.clone(),
      cursor: self.cursor,
      anchor: self.anchor,
    });
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn markers_follow_edits() {
    let mut buffer = RopeBuffer::new("(a b)");
    buffer.set_cursor(3);
    buffer.insert(1, "xx ");
    assert_eq!(buffer.cursor(), 6);
    buffer.delete(Span::new(0, 2));
    assert_eq!(buffer.cursor(), 4);
    buffer.delete(Span::new(3, 5));
    assert_eq!(buffer.cursor(), 3);
    assert_eq!(buffer.to_string(), " a)");
  }

  #[test]
  fn insert_at_cursor_pushes_it_forward() {
    let mut buffer = RopeBuffer::new("ab");
    buffer.set_cursor(1);
    buffer.insert(1, "x");
    assert_eq!(buffer.cursor(), 2);
    assert_eq!(buffer.render(), "ax|b");
  }

  #[test]
  fn saved_cursor_restores_on_every_path() {
    let mut buffer = RopeBuffer::new("(a b c)");
    buffer.set_cursor(2);
    let seen = with_saved_cursor(&mut buffer, |buffer| {
      buffer.set_cursor(5);
      buffer.set_selection(1, 3);
      buffer.cursor()
    });
    assert_eq!(seen, 3);
    assert_eq!(buffer.cursor(), 2);
    assert_eq!(buffer.selection(), None);

    buffer.set_selection(1, 4);
    let result: Result<(), &str> = with_saved_cursor(&mut buffer, |buffer| {
      buffer.clear_selection();
      buffer.set_cursor(0);
      Err("lookahead failed")
    });
    assert!(result.is_err());
    assert_eq!(buffer.selection(), Some(Range::new(1, 4)));
  }

  #[test]
  fn undo_restores_snapshot() {
    let mut buffer = RopeBuffer::new("(a)");
    buffer.set_cursor(3);
    buffer.undo_boundary();
    buffer.insert(3, " b");
    assert_eq!(buffer.to_string(), "(a) b");
    assert!(buffer.undo());
    assert_eq!(buffer.render(), "(a)|");
    assert!(!buffer.undo());
  }

  #[test]
  fn boundaries_without_edits_leave_no_history() {
    let mut buffer = RopeBuffer::new("(a)");
    buffer.undo_boundary();
    buffer.set_cursor(3);
    buffer.undo_boundary();
    assert!(!buffer.undo());

    buffer.undo_boundary();
    buffer.insert(3, " b");
    buffer.insert(5, " c");
    buffer.undo_boundary();
    assert!(buffer.undo());
    assert_eq!(buffer.to_string(), "(a)");
  }

  #[test]
  fn indents_lines_after_the_first() {
    let mut buffer = RopeBuffer::new("(a\nb\n    (c\nd))");
    buffer.indent_region(Span::new(0, buffer.len_chars()));
    assert_eq!(buffer.to_string(), "(a\n b\n (c\n  d))");
  }

  #[test]
  fn indent_leaves_strings_alone() {
    let mut buffer = RopeBuffer::new("(a \"x\ny\")");
    buffer.indent_region(Span::new(0, buffer.len_chars()));
    assert_eq!(buffer.to_string(), "(a \"x\ny\")");
  }

  #[test]
  fn render_marks_selection() {
    let mut buffer = RopeBuffer::new("(a b)");
    buffer.set_selection(4, 1);
    assert_eq!(buffer.render(), "([a b])");
  }
}
