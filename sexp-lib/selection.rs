//! The active selection.
//!
//! A [`Range`] has two positions: `anchor` and `head`. The `head` is where the
//! cursor is, the `anchor` is the other end. Structural commands care about
//! which end is the head: growing a selection by a sexp extends the head side,
//! relocating a selection keeps the head on the same side.
//!
//! ```text
//! anchor=2, head=7: "(a[b c d]e)"  (forward selection)
//! anchor=7, head=2: "(a]b c d[e)"  (backward selection)
//! ```

use sexp_core::Span;

use crate::movement::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
  pub anchor: usize,
  pub head:   usize,
}

impl Range {
  pub fn new(anchor: usize, head: usize) -> Self {
    Self { anchor, head }
  }

  #[inline]
  pub fn point(head: usize) -> Self {
    Self::new(head, head)
  }

  /// Select `span` with the head on the `direction` side.
  pub fn from_span(span: Span, direction: Direction) -> Self {
    match direction {
      Direction::Forward => Self::new(span.begin, span.end),
      Direction::Backward => Self::new(span.end, span.begin),
    }
  }

  /// Start of the range
  #[inline]
  #[must_use]
  pub fn from(&self) -> usize {
    std::cmp::min(self.anchor, self.head)
  }

  /// End of the range
  #[inline]
  #[must_use]
  pub fn to(&self) -> usize {
    std::cmp::max(self.anchor, self.head)
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.to() - self.from()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.anchor == self.head
  }

  #[inline]
  #[must_use]
  pub fn span(&self) -> Span {
    Span::new(self.from(), self.to())
  }

  #[inline]
  pub fn contains(&self, pos: usize) -> bool {
    self.from() <= pos && pos < self.to()
  }

  #[inline]
  #[must_use]
  pub fn direction(&self) -> Direction {
    if self.head < self.anchor {
      Direction::Backward
    } else {
      Direction::Forward
    }
  }

  #[inline]
  #[must_use]
  pub fn flip(&self) -> Self {
    Self {
      anchor: self.head,
      head:   self.anchor,
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn direction_follows_head() {
    let forward = Range::new(2, 7);
    assert_eq!(forward.direction(), Direction::Forward);
    assert_eq!(forward.span(), Span::new(2, 7));

    let backward = forward.flip();
    assert_eq!(backward.direction(), Direction::Backward);
    assert_eq!(backward.from(), 2);
    assert_eq!(backward.to(), 7);
    assert_eq!(backward.flip(), forward);
  }

  #[test]
  fn from_span_places_head() {
    let span = Span::new(3, 9);
    assert_eq!(Range::from_span(span, Direction::Forward).head, 9);
    assert_eq!(Range::from_span(span, Direction::Backward).head, 3);
    assert!(Range::point(4).is_empty());
  }
}
