//! Half-open character ranges.
//!
//! A [`Span`] never owns text. It is a view into a buffer that is only valid
//! until the next mutation, after which it has to be recomputed (or mapped
//! through the change that was applied).

use std::{
  fmt,
  ops,
};

/// `[begin, end)` in char offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
  pub begin: usize,
  pub end:   usize,
}

impl Span {
  #[inline]
  #[must_use]
  pub fn new(begin: usize, end: usize) -> Self {
    debug_assert!(begin <= end, "span begins after it ends: {begin}..{end}");
    Self { begin, end }
  }

  /// Empty span at `pos`.
  #[inline]
  #[must_use]
  pub fn point(pos: usize) -> Self {
    Self::new(pos, pos)
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.end - self.begin
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.begin == self.end
  }

  /// `begin <= pos < end`
  #[inline]
  pub fn contains(&self, pos: usize) -> bool {
    self.begin <= pos && pos < self.end
  }

  /// Smallest span covering both.
  #[inline]
  #[must_use]
  pub fn union(self, other: Self) -> Self {
    Self::new(self.begin.min(other.begin), self.end.max(other.end))
  }

  /// Clamp both edges to `len`.
  #[inline]
  #[must_use]
  pub fn clamp(self, len: usize) -> Self {
    Self::new(self.begin.min(len), self.end.min(len))
  }
}

impl From<Span> for ops::Range<usize> {
  fn from(span: Span) -> Self {
    span.begin..span.end
  }
}

impl From<ops::Range<usize>> for Span {
  fn from(range: ops::Range<usize>) -> Self {
    Self::new(range.start, range.end)
  }
}

impl fmt::Display for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.begin, self.end)
  }
}
