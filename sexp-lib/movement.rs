//! Movement direction for navigation and relocation.
//!
//! ```ignore
//! use sexp_lib::movement::Direction;
//!
//! assert_eq!(Direction::Forward.reverse(), Direction::Backward);
//! ```

/// The direction of cursor movement or of a relocated form.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
  /// Toward the end of the buffer (increasing positions).
  Forward,
  /// Toward the start of the buffer (decreasing positions).
  Backward,
}

impl Direction {
  #[must_use]
  pub fn reverse(self) -> Self {
    match self {
      Self::Forward => Self::Backward,
      Self::Backward => Self::Forward,
    }
  }
}
