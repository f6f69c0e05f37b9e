//! Finding the thing at point.
//!
//! [`bounds_dwim`] answers "what would a command act on right now?":
//!
//! 1. the active selection,
//! 2. the list just closed before the cursor,
//! 3. the list or string just after the cursor (prefix sigils included),
//! 4. the string just closed before the cursor,
//! 5. the comment the cursor is in,
//! 6. the string the cursor is in,
//! 7. the symbol at the cursor, or failing that the surrounding sentence.
//!
//! [`List`] is the engine's handle on a list: its prefix start, its opening
//! and its closing delimiter.

use ropey::RopeSlice;
use sexp_core::{
  Delimiters,
  Span,
};

use crate::{
  buffer::Buffer,
  lexer::{
    self,
    Context,
    TokenKind,
  },
  special::{
    Special,
    open_after_prefix,
    prefix_start,
    special_in,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct List {
  /// First prefix sigil, or `open` when there is none.
  pub begin: usize,
  pub open:  usize,
  pub close: usize,
}

impl List {
  pub fn from_open(text: RopeSlice, delims: &Delimiters, open: usize) -> Option<Self> {
    let close = lexer::match_close(text, delims, open)?;
    Some(Self {
      begin: prefix_start(text, delims, open),
      open,
      close,
    })
  }

  pub fn from_close(text: RopeSlice, delims: &Delimiters, close: usize) -> Option<Self> {
    let open = lexer::match_open(text, delims, close)?;
    Some(Self {
      begin: prefix_start(text, delims, open),
      open,
      close,
    })
  }

  /// Innermost list around `pos`.
  pub fn enclosing(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<Self> {
    let span = lexer::list_bounds(text, delims, pos)?;
    Some(Self {
      begin: prefix_start(text, delims, span.begin),
      open:  span.begin,
      close: span.end - 1,
    })
  }

  /// The list this one is a child of.
  pub fn parent(&self, text: RopeSlice, delims: &Delimiters) -> Option<Self> {
    Self::enclosing(text, delims, self.begin)
  }

  /// Whole form, prefix included.
  #[inline]
  pub fn span(&self) -> Span {
    Span::new(self.begin, self.close + 1)
  }

  /// Between the delimiters.
  #[inline]
  pub fn inner(&self) -> Span {
    Span::new(self.open + 1, self.close)
  }

  #[inline]
  pub fn end(&self) -> usize {
    self.close + 1
  }

  /// Spans of the direct children, in order.
  pub fn children(&self, text: RopeSlice, delims: &Delimiters) -> Vec<Span> {
    let mut children = Vec::new();
    let mut pos = self.open + 1;
    while let Some(child) = lexer::forward_sexp(text, delims, pos) {
      if child.end > self.close {
        break;
      }
      children.push(child);
      pos = child.end;
    }
    children
  }

  pub fn is_empty(&self, text: RopeSlice, delims: &Delimiters) -> bool {
    lexer::forward_sexp(text, delims, self.open + 1).is_none_or(|child| child.end > self.close)
  }
}

/// The list the cursor is special against, and which side it is on.
pub fn form_at(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<(Special, List)> {
  let state = lexer::lex(text, delims, pos);
  match special_in(text, delims, pos, &state)? {
    Special::BeforeOpen => {
      let open = open_after_prefix(text, delims, pos)?;
      Some((Special::BeforeOpen, List::from_open(text, delims, open)?))
    },
    Special::AfterClose => {
      Some((
        Special::AfterClose,
        List::from_close(text, delims, pos.checked_sub(1)?)?,
      ))
    },
  }
}

/// Span a command should act on, see the module docs for the order.
pub fn bounds_dwim<B: Buffer + ?Sized>(buffer: &B, delims: &Delimiters) -> Option<Span> {
  if let Some(range) = buffer.selection()
    && !range.is_empty()
  {
    return Some(range.span());
  }

  let text = buffer.text();
  let pos = buffer.cursor();
  let state = lexer::lex(text, delims, pos);

  if special_in(text, delims, pos, &state) == Some(Special::AfterClose) {
    return List::from_close(text, delims, pos - 1).map(|list| list.span());
  }

  if state.in_code() && state.inside.is_none() {
    let opens_form = text
      .get_char(pos)
      .is_some_and(|ch| delims.is_prefix(ch) || delims.is_open(ch) || delims.is_quote(ch));
    if opens_form && let Some(span) = lexer::forward_sexp(text, delims, pos) {
      return Some(span);
    }
    if let Some(prev) = state.prev
      && prev.is(TokenKind::String)
      && prev.span.end == pos
    {
      return Some(prev.span);
    }
  }

  match state.context {
    Context::InComment => return lexer::comment_bounds(text, delims, pos),
    Context::InString => {
      if let Some(span) = lexer::string_bounds(text, delims, pos) {
        return Some(span);
      }
    },
    Context::Code => {
      if delims.comment_at(text, pos) {
        return lexer::comment_bounds(text, delims, pos);
      }
    },
  }

  lexer::symbol_bounds(text, delims, pos).or_else(|| lexer::sentence_bounds(text, delims, pos))
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::buffer::RopeBuffer;

  fn dwim(text: &str, pos: usize) -> Option<String> {
    let mut buffer = RopeBuffer::new(text);
    buffer.set_cursor(pos);
    bounds_dwim(&buffer, &Delimiters::default()).map(|span| buffer.substring(span))
  }

  #[test]
  fn dwim_priorities() {
    assert_eq!(dwim("(a (b c) d)", 8).as_deref(), Some("(b c)"));
    assert_eq!(dwim("(a '(b c) d)", 3).as_deref(), Some("'(b c)"));
    assert_eq!(dwim("(a \"s t\" d)", 3).as_deref(), Some("\"s t\""));
    assert_eq!(dwim("(a \"s t\" d)", 8).as_deref(), Some("\"s t\""));
    assert_eq!(dwim("(a \"s t\" d)", 5).as_deref(), Some("\"s t\""));
    assert_eq!(dwim("(a ; note\n b)", 6).as_deref(), Some("; note"));
    assert_eq!(dwim("(alpha beta)", 3).as_deref(), Some("alpha"));
    assert_eq!(dwim("(alpha  )", 7).as_deref(), Some("alpha"));
  }

  #[test]
  fn selection_comes_first() {
    let mut buffer = RopeBuffer::new("(a (b c) d)");
    buffer.set_selection(1, 6);
    assert_eq!(
      bounds_dwim(&buffer, &Delimiters::default()),
      Some(Span::new(1, 6))
    );
  }

  #[test]
  fn form_at_both_sides() {
    let doc = ropey::Rope::from("(a '(b c) d)");
    let text = doc.slice(..);
    let delims = Delimiters::default();
    let list = List {
      begin: 3,
      open:  4,
      close: 8,
    };
    assert_eq!(form_at(text, &delims, 3), Some((Special::BeforeOpen, list)));
    assert_eq!(form_at(text, &delims, 4), Some((Special::BeforeOpen, list)));
    assert_eq!(form_at(text, &delims, 9), Some((Special::AfterClose, list)));
    assert_eq!(form_at(text, &delims, 6), None);
    assert_eq!(list.parent(text, &delims).map(|p| p.span()), Some(Span::new(0, 12)));
  }

  #[test]
  fn children_of_a_list() {
    let doc = ropey::Rope::from("(a 'b ; c\n (d) \"e\")");
    let text = doc.slice(..);
    let delims = Delimiters::default();
    let list = List::from_open(text, &delims, 0).unwrap();
    let children: Vec<_> = list
      .children(text, &delims)
      .into_iter()
      .map(|span| doc.slice(span.begin..span.end).to_string())
      .collect();
    assert_eq!(children, vec!["a", "'b", "(d)", "\"e\""]);
    assert!(!list.is_empty(text, &delims));

    let doc = ropey::Rope::from("( ; only\n )");
    let list = List::from_open(doc.slice(..), &delims, 0).unwrap();
    assert!(list.is_empty(doc.slice(..), &delims));
  }
}
