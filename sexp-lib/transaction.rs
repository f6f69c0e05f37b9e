//! Batched text replacements.
//!
//! Every tree transform computes its whole edit against the current text
//! first, as a sorted list of `(from, to, replacement)` changes, and only
//! then touches the buffer. Building the batch validates it (in bounds,
//! ordered, non-overlapping), so a bad computation fails before any text is
//! lost.
//!
//! ```ignore
//! use ropey::Rope;
//! use sexp_lib::transaction::{Assoc, Transaction};
//!
//! let doc = Rope::from("(a b) c");
//! let tx = Transaction::change(doc.slice(..), [(4, 7, Some(" c)".into()))]).unwrap();
//! assert_eq!(tx.apply_to(&doc).unwrap().to_string(), "(a b c)");
//! assert_eq!(tx.map_pos(7, Assoc::After).unwrap(), 7);
//! ```
//!
//! Changes are applied back to front so earlier offsets stay valid while
//! later ones are rewritten.

use ropey::{
  Rope,
  RopeSlice,
};
use thiserror::Error;

use crate::{
  Tendril,
  buffer::Buffer,
};

pub type Result<T> = std::result::Result<T, TransactionError>;

/// (from, to) replacement.
pub type Change = (usize, usize, Option<Tendril>);
pub type Deletion = (usize, usize);

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransactionError {
  #[error("transaction length mismatch: expected {expected}, got {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("invalid change range: start {from} is after end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("change range {from}..{to} is out of bounds for document length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error("change range {from}..{to} overlaps previous end {prev_end}")]
  OverlappingRange {
    prev_end: usize,
    from:     usize,
    to:       usize,
  },
  #[error("position {pos} is out of bounds for document length {len}")]
  PositionOutOfBounds { pos: usize, len: usize },
}

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
  Before,
  After,
}

fn validate_change_bounds(from: usize, to: usize, len: usize) -> Result<()> {
  if from > to {
    return Err(TransactionError::InvalidRange { from, to });
  }
  if to > len {
    return Err(TransactionError::RangeOutOfBounds { from, to, len });
  }
  Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
  changes: Vec<Change>,
  /// Length of the text the changes were computed against.
  len:     usize,
}

impl Transaction {
  /// Build a transaction from changes sorted by position.
  pub fn change<I>(doc: RopeSlice, changes: I) -> Result<Self>
  where
    I: IntoIterator<Item = Change>,
  {
    let len = doc.len_chars();
    let mut last = 0;
    let mut collected = Vec::new();
    for (from, to, tendril) in changes {
      validate_change_bounds(from, to, len)?;
      if from < last {
        return Err(TransactionError::OverlappingRange {
          prev_end: last,
          from,
          to,
        });
      }
      last = to;
      // no-op entries only make apply slower
      if from == to && tendril.as_ref().is_none_or(|text| text.is_empty()) {
        continue;
      }
      collected.push((from, to, tendril));
    }
    Ok(Self {
      changes: collected,
      len,
    })
  }

  /// Build a transaction from possibly overlapping deletions, merging them.
  pub fn delete<I>(doc: RopeSlice, deletions: I) -> Result<Self>
  where
    I: IntoIterator<Item = Deletion>,
  {
    let len = doc.len_chars();

    let mut deletions: Vec<_> = deletions.into_iter().collect();
    deletions.sort_by_key(|(from, to)| (*from, *to));

    let mut merged: Vec<Deletion> = Vec::with_capacity(deletions.len());
    for (from, to) in deletions {
      validate_change_bounds(from, to, len)?;
      match merged.last_mut() {
        Some((_, last_end)) if from <= *last_end => {
          *last_end = (*last_end).max(to);
        },
        _ => merged.push((from, to)),
      }
    }

    Self::change(doc, merged.into_iter().map(|(from, to)| (from, to, None)))
  }

  /// Single insertion.
  pub fn insert(doc: RopeSlice, pos: usize, text: &str) -> Result<Self> {
    Self::change(doc, [(pos, pos, Some(Tendril::from(text)))])
  }

  pub fn changes(&self) -> &[Change] {
    &self.changes
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.changes.is_empty()
  }

  /// Length of the text after applying.
  pub fn len_after(&self) -> usize {
    self.changes.iter().fold(self.len, |len, (from, to, text)| {
      len - (to - from) + text.as_ref().map_or(0, |text| text.chars().count())
    })
  }

  /// Map a position in the old text to the new text.
  ///
  /// A position inside a replaced range collapses to the start of the
  /// replacement (`Before`) or to its end (`After`).
  pub fn map_pos(&self, pos: usize, assoc: Assoc) -> Result<usize> {
    if pos > self.len {
      return Err(TransactionError::PositionOutOfBounds { pos, len: self.len });
    }

    let mut inserted = 0;
    let mut removed = 0;
    for (from, to, text) in &self.changes {
      let (from, to) = (*from, *to);
      let len = text.as_ref().map_or(0, |text| text.chars().count());
      if pos < from || (pos == from && assoc == Assoc::Before) {
        break;
      }
      if pos < to {
        let base = from + inserted - removed;
        return Ok(match assoc {
          Assoc::Before => base,
          Assoc::After => base + len,
        });
      }
      inserted += len;
      removed += to - from;
    }
    Ok(pos + inserted - removed)
  }

  /// Apply to a buffer. Cursor and selection are left to the buffer's own
  /// marker tracking; callers place them explicitly afterwards.
  pub fn apply<B: Buffer + ?Sized>(&self, buffer: &mut B) -> Result<()> {
    let actual = buffer.len_chars();
    if actual != self.len {
      return Err(TransactionError::LengthMismatch {
        expected: self.len,
        actual,
      });
    }

    for (from, to, text) in self.changes.iter().rev() {
      if from < to {
        buffer.delete((*from..*to).into());
      }
      if let Some(text) = text {
        buffer.insert(*from, text);
      }
    }
    tracing::trace!(changes = self.changes.len(), len = self.len, "applied transaction");
    Ok(())
  }

  /// Apply to a copy of `doc`.
  pub fn apply_to(&self, doc: &Rope) -> Result<Rope> {
    if doc.len_chars() != self.len {
      return Err(TransactionError::LengthMismatch {
        expected: self.len,
        actual:   doc.len_chars(),
      });
    }

    let mut out = doc.clone();
    for (from, to, text) in self.changes.iter().rev() {
      out.remove(*from..*to);
      if let Some(text) = text {
        out.insert(*from, text);
      }
    }
    Ok(out)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::buffer::RopeBuffer;

  #[test]
  fn rejects_overlap_and_bounds() {
    let doc = Rope::from("(a b c)");
    let text = doc.slice(..);

    assert_eq!(
      Transaction::change(text, [(3, 5, None), (4, 6, None)]),
      Err(TransactionError::OverlappingRange {
        prev_end: 5,
        from:     4,
        to:       6,
      })
    );
    assert_eq!(
      Transaction::change(text, [(5, 3, None)]),
      Err(TransactionError::InvalidRange { from: 5, to: 3 })
    );
    assert_eq!(
      Transaction::change(text, [(5, 9, None)]),
      Err(TransactionError::RangeOutOfBounds {
        from: 5,
        to:   9,
        len:  7,
      })
    );
  }

  #[test]
  fn delete_merges_overlaps() {
    let doc = Rope::from("abcdefgh");
    let tx = Transaction::delete(doc.slice(..), [(4, 6), (1, 3), (2, 5)]).unwrap();
    assert_eq!(tx.changes(), &[(1, 6, None)]);
    assert_eq!(tx.apply_to(&doc).unwrap().to_string(), "agh");
  }

  #[test]
  fn applies_back_to_front() {
    let doc = Rope::from("(a (b c) d)");
    let tx = Transaction::change(doc.slice(..), [
      (7, 8, None),
      (10, 10, Some(")".into())),
    ])
    .unwrap();
    assert_eq!(tx.apply_to(&doc).unwrap().to_string(), "(a (b c d))");
    assert_eq!(tx.len_after(), 11);

    let mut buffer = RopeBuffer::new("(a (b c) d)");
    tx.apply(&mut buffer).unwrap();
    assert_eq!(buffer.to_string(), "(a (b c d))");
  }

  #[test]
  fn apply_checks_length() {
    let doc = Rope::from("(a)");
    let tx = Transaction::insert(doc.slice(..), 3, " b").unwrap();
    let mut buffer = RopeBuffer::new("(a) ");
    assert_eq!(
      tx.apply(&mut buffer),
      Err(TransactionError::LengthMismatch {
        expected: 3,
        actual:   4,
      })
    );
  }

  #[test]
  fn map_pos_through_insert() {
    let doc = Rope::from("hello world");
    let tx = Transaction::insert(doc.slice(..), 5, "!!").unwrap();
    assert_eq!(tx.map_pos(5, Assoc::Before).unwrap(), 5);
    assert_eq!(tx.map_pos(5, Assoc::After).unwrap(), 7);
    assert_eq!(tx.map_pos(8, Assoc::Before).unwrap(), 10);
    assert_eq!(tx.map_pos(2, Assoc::After).unwrap(), 2);
  }

  #[test]
  fn map_pos_through_replacement() {
    let doc = Rope::from("(a   b)");
    let tx = Transaction::change(doc.slice(..), [(2, 5, Some(" ".into()))]).unwrap();
    assert_eq!(tx.map_pos(3, Assoc::Before).unwrap(), 2);
    assert_eq!(tx.map_pos(3, Assoc::After).unwrap(), 3);
    assert_eq!(tx.map_pos(5, Assoc::Before).unwrap(), 3);
    assert_eq!(tx.map_pos(7, Assoc::Before).unwrap(), 5);
    assert!(tx.map_pos(8, Assoc::Before).is_err());
  }

  #[test]
  fn drops_no_op_changes() {
    let doc = Rope::from("abc");
    let tx = Transaction::change(doc.slice(..), [(1, 1, None), (2, 2, Some("".into()))]).unwrap();
    assert!(tx.is_empty());
  }
}
