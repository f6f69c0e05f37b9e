//! Moving and copying whole forms.
//!
//! ```text
//! clone       (a |(b))        ->  (a |(b)
//!                                  (b))
//! move-up     (a |(b) c)      ->  (|(b) a c)
//! move-down   (a |(b) c)      ->  (a c |(b))
//! teleport    (a |(b) (c d))  ->  (a (|(b) c d))
//! ```
//!
//! All of these reuse the transform plumbing: one transaction, a landing
//! for the cursor, then gap removal and reindentation.

use ropey::RopeSlice;
use sexp_core::{
  Delimiters,
  Span,
  chars::{
    char_is_blank,
    char_is_whitespace,
  },
};

use crate::{
  bounds::List,
  buffer::Buffer,
  lexer::{
    self,
    TokenKind,
  },
  movement::Direction,
  selection::Range,
  selector::{
    self,
    Selector,
  },
  special::Special,
  transform::{
    Landing,
    Result,
    TransformError,
    balanced_selection,
    blanks_before,
    commit,
    current_form,
    precondition,
    raised_span,
    shift_landing,
    siblings_after,
    siblings_before,
    slice,
    tendril,
  },
};

/// Insert `n` copies of the form (or selection) at point on their own
/// lines. Copies go before the form when the cursor is before it, after it
/// otherwise.
pub fn clone<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> Result<()> {
  let (span, landing) = raised_span(buffer, delims)?;
  let text = buffer.text();
  let source = slice(text, span.begin, span.end);
  let copies = n.max(1);
  let before = matches!(landing, Landing::Cursor(pos) if pos < span.end);

  let (at, inserted) = if before {
    (span.begin, format!("{source}\n").repeat(copies))
  } else {
    (span.end, format!("\n{source}").repeat(copies))
  };
  let inserted_len = inserted.chars().count();
  let landing = match landing {
    Landing::Cursor(_) if !before => Landing::Cursor(span.end + inserted_len),
    other => other,
  };
  commit(
    buffer,
    delims,
    "clone",
    vec![(at, at, tendril(&inserted))],
    Span::new(span.begin, span.end + inserted_len),
    landing,
  )
}

/// Swap the form (or selection) at point with its neighbour in `direction`.
fn swap<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, direction: Direction) -> Result<()> {
  let (span, landing) = raised_span(buffer, delims)?;
  let text = buffer.text();
  let moved = slice(text, span.begin, span.end);

  let (change, new_begin) = match direction {
    Direction::Backward => {
      let Some(other) = lexer::backward_sexp(text, delims, span.begin) else {
        return precondition("nothing to move up past");
      };
      let between = slice(text, other.end, span.begin);
      let passed = slice(text, other.begin, other.end);
      let replacement = format!("{moved}{between}{passed}");
      ((other.begin, span.end, tendril(&replacement)), other.begin)
    },
    Direction::Forward => {
      let Some(other) = lexer::forward_sexp(text, delims, span.end) else {
        return precondition("nothing to move down past");
      };
      let between = slice(text, span.end, other.begin);
      let passed = slice(text, other.begin, other.end);
      let replacement = format!("{passed}{between}{moved}");
      ((span.begin, other.end, tendril(&replacement)), other.end - span.len())
    },
  };
  let region = Span::new(change.0, change.1);
  commit(
    buffer,
    delims,
    match direction {
      Direction::Backward => "move-up",
      Direction::Forward => "move-down",
    },
    vec![change],
    region,
    shift_landing(landing, span.begin, new_begin),
  )
}

pub fn move_up<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters) -> Result<()> {
  swap(buffer, delims, Direction::Backward)
}

pub fn move_down<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters) -> Result<()> {
  swap(buffer, delims, Direction::Forward)
}

/// The selection, or the form at point plus `n - 1` siblings on the open
/// side.
fn teleported_span<B: Buffer + ?Sized>(
  buffer: &B,
  delims: &Delimiters,
  n: usize,
) -> Result<(Span, Landing)> {
  if let Some(range) = balanced_selection(buffer, delims)? {
    return Ok((range.span(), Landing::Selection(range)));
  }
  let (side, list) = current_form(buffer, delims)?;
  let text = buffer.text();
  let landing = Landing::Cursor(buffer.cursor());
  if n <= 1 {
    return Ok((list.span(), landing));
  }
  let span = match side {
    Special::BeforeOpen => {
      let end = siblings_after(text, delims, list.end(), n - 1)
        .last()
        .map_or(list.end(), |span| span.end);
      Span::new(list.begin, end)
    },
    Special::AfterClose => {
      let begin = siblings_before(text, delims, list.begin, n - 1)
        .last()
        .map_or(list.begin, |span| span.begin);
      Span::new(begin, list.end())
    },
  };
  Ok((span, landing))
}

/// Every list start in code.
fn list_starts(text: RopeSlice, delims: &Delimiters) -> Vec<usize> {
  lexer::tokens(text, delims, 0)
    .filter(|token| token.is(TokenKind::Open))
    .map(|token| token.span.begin)
    .collect()
}

/// Move the form at point (with `n - 1` siblings, or the selection) to the
/// front of a list picked by `selector`.
///
/// Returns `Ok(false)` when the selector cancels.
pub fn teleport<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  n: usize,
  selector: &mut dyn Selector,
) -> Result<bool> {
  let (source, landing) = teleported_span(buffer, delims, n)?;
  let text = buffer.text();
  let Some(target) = selector::choose(selector, &list_starts(text, delims)) else {
    tracing::debug!("teleport cancelled");
    return Ok(false);
  };
  if source.contains(target) {
    return Err(TransformError::InvalidTeleportTarget { target });
  }
  let Some(list) = List::from_open(text, delims, target) else {
    return precondition("target list is not closed");
  };

  let moved = slice(text, source.begin, source.end);
  let inserted = if list.is_empty(text, delims) {
    moved
  } else {
    format!("{moved} ")
  };
  let trailing = text
    .chars_at(source.end)
    .take_while(|&ch| char_is_whitespace(ch))
    .count();
  let deleted = Span::new(source.begin, source.end + trailing);
  let at = target + 1;

  let insertion = (at, at, tendril(&inserted));
  let deletion = (deleted.begin, deleted.end, None);
  let inserted_len = inserted.chars().count();
  let (changes, new_begin, hole) = if at <= source.begin {
    (vec![insertion, deletion], at, source.begin + inserted_len)
  } else {
    (vec![deletion, insertion], at - deleted.len(), source.begin)
  };
  let new_end = new_begin + source.len();
  commit(
    buffer,
    delims,
    "teleport",
    changes,
    Span::new(new_begin.min(hole), new_end.max(hole)),
    shift_landing(landing, source.begin, new_begin),
  )?;
  Ok(true)
}

/// Move the selected text out of its list, `n` levels, keeping it selected.
/// Forward puts it right after the list, backward right before.
///
/// Returns whether anything moved.
pub fn move_selection_out<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  n: usize,
  direction: Direction,
) -> Result<bool> {
  let mut moved = false;
  for _ in 0..n.max(1) {
    let Some(range) = balanced_selection(buffer, delims)? else {
      break;
    };
    let text = buffer.text();
    let span = range.span();
    let Some(list) = List::enclosing(text, delims, span.begin).filter(|list| list.close >= span.end)
    else {
      break;
    };

    let selected = slice(text, span.begin, span.end);
    let (changes, begin) = match direction {
      Direction::Forward => {
        let from = blanks_before(text, delims, span.begin, list.open + 1);
        let insert = (list.end(), list.end(), tendril(format!(" {selected}")));
        (vec![(from, span.end, None), insert], list.end() - (span.end - from) + 1)
      },
      Direction::Backward => {
        let blanks = text
          .slice(span.end..list.close)
          .chars()
          .take_while(|&ch| char_is_blank(ch))
          .count();
        let insert = (list.begin, list.begin, tendril(format!("{selected} ")));
        (vec![insert, (span.begin, span.end + blanks, None)], list.begin)
      },
    };
    let target = Span::new(begin, begin + span.len());
    commit(
      buffer,
      delims,
      "move-selection-out",
      changes,
      target,
      Landing::Selection(Range::from_span(target, range.direction())),
    )?;
    moved = true;
  }
  Ok(moved)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    buffer::RopeBuffer,
    selector::NthSelector,
  };

  fn buffer_at(text: &str, pos: usize) -> RopeBuffer {
    let mut buffer = RopeBuffer::new(text);
    buffer.set_cursor(pos);
    buffer
  }

  #[test]
  fn clone_before_and_after() {
    let delims = Delimiters::default();
    let mut buffer = buffer_at("(a (b))", 3);
    clone(&mut buffer, &delims, 1).unwrap();
    assert_eq!(buffer.render(), "(a |(b)\n (b))");

    let mut buffer = buffer_at("(a (b))", 6);
    clone(&mut buffer, &delims, 1).unwrap();
    assert_eq!(buffer.render(), "(a (b)\n (b)|)");

    let mut buffer = buffer_at("(x)", 3);
    clone(&mut buffer, &delims, 2).unwrap();
    assert_eq!(buffer.render(), "(x)\n(x)\n(x)|");
  }

  #[test]
  fn move_up_and_down() {
    let delims = Delimiters::default();
    let mut buffer = buffer_at("(a (b) c)", 3);
    move_up(&mut buffer, &delims).unwrap();
    assert_eq!(buffer.render(), "(|(b) a c)");

    let mut buffer = buffer_at("(a (b) c)", 3);
    move_down(&mut buffer, &delims).unwrap();
    assert_eq!(buffer.render(), "(a c |(b))");

    let mut buffer = buffer_at("(a (b) c)", 6);
    move_down(&mut buffer, &delims).unwrap();
    assert_eq!(buffer.render(), "(a c (b)|)");

    let mut buffer = buffer_at("((b) c)", 1);
    assert!(matches!(
      move_up(&mut buffer, &delims),
      Err(TransformError::Precondition(_))
    ));
    assert_eq!(buffer.render(), "(|(b) c)");
  }

  #[test]
  fn teleport_into_later_and_earlier_lists() {
    let delims = Delimiters::default();
    let mut buffer = buffer_at("(a (b) (c d))", 3);
    assert!(teleport(&mut buffer, &delims, 1, &mut NthSelector(2)).unwrap());
    assert_eq!(buffer.render(), "(a (|(b) c d))");

    let mut buffer = buffer_at("(a (b) ())", 3);
    assert!(teleport(&mut buffer, &delims, 1, &mut NthSelector(2)).unwrap());
    assert_eq!(buffer.render(), "(a (|(b)))");

    let mut buffer = buffer_at("((x) a (b))", 7);
    assert!(teleport(&mut buffer, &delims, 1, &mut NthSelector(1)).unwrap());
    assert_eq!(buffer.render(), "((|(b) x) a)");
  }

  #[test]
  fn teleport_refusals() {
    let delims = Delimiters::default();
    let mut buffer = buffer_at("(a (b (c)))", 3);
    assert_eq!(
      teleport(&mut buffer, &delims, 1, &mut NthSelector(2)),
      Err(TransformError::InvalidTeleportTarget { target: 6 })
    );
    assert_eq!(buffer.render(), "(a |(b (c)))");

    assert_eq!(teleport(&mut buffer, &delims, 1, &mut NthSelector(9)), Ok(false));
    assert_eq!(buffer.render(), "(a |(b (c)))");
  }

  #[test]
  fn selection_moves_out_of_lists() {
    let delims = Delimiters::default();
    let mut buffer = RopeBuffer::new("(a (b c) d)");
    buffer.set_selection(6, 7);
    assert!(move_selection_out(&mut buffer, &delims, 1, Direction::Forward).unwrap());
    assert_eq!(buffer.render(), "(a (b) [c] d)");

    let mut buffer = RopeBuffer::new("(a (b c) d)");
    buffer.set_selection(4, 5);
    assert!(move_selection_out(&mut buffer, &delims, 1, Direction::Backward).unwrap());
    assert_eq!(buffer.render(), "(a [b] (c) d)");

    let mut buffer = RopeBuffer::new("(x (a (b c)))");
    buffer.set_selection(9, 10);
    assert!(move_selection_out(&mut buffer, &delims, 2, Direction::Forward).unwrap());
    assert_eq!(buffer.render(), "(x (a (b)) [c])");

    let mut buffer = RopeBuffer::new("a b");
    buffer.set_selection(0, 1);
    assert!(!move_selection_out(&mut buffer, &delims, 1, Direction::Forward).unwrap());
  }

  #[test]
  fn selection_after_a_comment_leaves_its_newline() {
    let delims = Delimiters::default();
    let mut buffer = RopeBuffer::new("(p (a ; c\n b) q)");
    buffer.set_selection(11, 12);
    assert!(move_selection_out(&mut buffer, &delims, 1, Direction::Forward).unwrap());
    assert_eq!(buffer.render(), "(p (a ; c\n    ) [b] q)");
    assert!(lexer::is_balanced(buffer.text(), &delims));
  }

  #[test]
  fn selections_splitting_a_list_are_not_moved() {
    fn refused<T>() -> Result<T> {
      Err(TransformError::Precondition("selection does not cover whole forms".into()))
    }
    let delims = Delimiters::default();
    let mut buffer = RopeBuffer::new("(a (b c) d)");
    buffer.set_selection(3, 6);
    assert_eq!(move_selection_out(&mut buffer, &delims, 1, Direction::Forward), refused());
    assert_eq!(teleport(&mut buffer, &delims, 1, &mut NthSelector(0)), refused());
    assert_eq!(clone(&mut buffer, &delims, 1), refused());
    assert_eq!(move_down(&mut buffer, &delims), refused());
    assert_eq!(buffer.to_string(), "(a (b c) d)");
  }
}
