//! Moving between lists.
//!
//! Navigation never edits text, with one exception: [`outward`] tidies the
//! list it leaves, and moves an active selection out with it. Exhausting a
//! motion is not an error. Motions report whether they moved, and a failed
//! list skip degrades to climbing one level out.
//!
//! ```text
//! |(a) (b) c (d)    forward_list(1)   (a)| (b) c (d)
//! (a)| (b) c (d)    forward_list(0)   (a) (b) c (d)|
//! (x |(a) y)        out_forward(1)    (x (a) y)|
//! |(a) (b)          flow(1)           (a) |(b)
//! ```

use sexp_core::{
  Delimiters,
  Span,
  chars::char_is_line_ending,
};

use crate::{
  bounds::{
    List,
    form_at,
  },
  buffer::{
    Buffer,
    with_saved_cursor,
  },
  gaps,
  lexer::{
    self,
    Context,
    TokenKind,
  },
  movement::Direction,
  relocate,
  special::{
    Special,
    open_after_prefix,
    prefix_start,
  },
  transform::Result,
};

fn is_list(text: ropey::RopeSlice, delims: &Delimiters, span: Span) -> bool {
  open_after_prefix(text, delims, span.begin).is_some_and(|open| open < span.end)
}

/// End of the next list at this level, skipping atoms.
fn next_list_end(text: ropey::RopeSlice, delims: &Delimiters, pos: usize) -> Option<usize> {
  let mut pos = pos;
  loop {
    let span = lexer::forward_sexp(text, delims, pos)?;
    if is_list(text, delims, span) {
      return Some(span.end);
    }
    pos = span.end;
  }
}

/// Start of the previous list at this level, skipping atoms.
fn prev_list_start(text: ropey::RopeSlice, delims: &Delimiters, pos: usize) -> Option<usize> {
  let mut pos = pos;
  loop {
    let span = lexer::backward_sexp(text, delims, pos)?;
    if is_list(text, delims, span) {
      return Some(span.begin);
    }
    pos = span.begin;
  }
}

/// Leave a string (to its start) or a comment (past its end, or to its start
/// when moving backward).
fn exit_string_or_comment<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  direction: Direction,
) {
  let text = buffer.text();
  let pos = buffer.cursor();
  let state = lexer::lex(text, delims, pos);
  let target = match state.context {
    Context::Code => None,
    Context::InString => state.inside.map(|token| token.span.begin),
    Context::InComment => {
      lexer::comment_bounds(text, delims, pos).map(|span| match direction {
        Direction::Forward => (span.end + 1).min(text.len_chars()),
        Direction::Backward => span.begin,
      })
    },
  };
  if let Some(target) = target {
    buffer.set_cursor(target);
  }
}

fn skip_lists<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  n: usize,
  direction: Direction,
) -> usize {
  let limit = if n == 0 { usize::MAX } else { n };
  let mut done = 0;
  while done < limit {
    let text = buffer.text();
    let pos = buffer.cursor();
    let next = match direction {
      Direction::Forward => next_list_end(text, delims, pos),
      Direction::Backward => prev_list_start(text, delims, pos),
    };
    match next {
      Some(next) if next != pos => buffer.set_cursor(next),
      _ => break,
    }
    done += 1;
  }
  done
}

fn list_skip<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  n: usize,
  direction: Direction,
) -> bool {
  exit_string_or_comment(buffer, delims, direction);
  let start = buffer.cursor();
  let done = skip_lists(buffer, delims, n, direction);
  let landed = buffer.cursor();

  // skipping back over what we just crossed must land here again
  let consistent = done > 0
    && with_saved_cursor(buffer, |scratch| {
      skip_lists(scratch, delims, 1, direction.reverse()) == 1
        && skip_lists(scratch, delims, 1, direction) == 1
        && scratch.cursor() == landed
    });

  if done == 0 || landed == start || !consistent {
    tracing::debug!(?direction, start, "list skip exhausted, moving out");
    buffer.set_cursor(start);
    ascend(buffer, delims, 1, direction);
    return false;
  }
  true
}

/// Skip over `n` lists forward (`0`: as many as possible).
pub fn forward_list<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> bool {
  list_skip(buffer, delims, n, Direction::Forward)
}

/// Skip over `n` lists backward (`0`: as many as possible).
pub fn backward_list<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> bool {
  list_skip(buffer, delims, n, Direction::Backward)
}

/// Climb `n` levels without touching the text. At top level a cursor before
/// a list crosses to its other side instead (forward only from
/// `BeforeOpen`, backward only from `AfterClose`).
pub fn ascend<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  n: usize,
  direction: Direction,
) -> bool {
  let origin = buffer.cursor();
  {
    let text = buffer.text();
    if let Some(token) = lexer::lex(text, delims, origin).inside
      && token.is(TokenKind::String)
    {
      buffer.set_cursor(token.span.begin);
    }
  }

  for _ in 0..n.max(1) {
    let text = buffer.text();
    let pos = buffer.cursor();
    match List::enclosing(text, delims, pos) {
      Some(list) => {
        buffer.set_cursor(match direction {
          Direction::Forward => list.end(),
          Direction::Backward => list.begin,
        })
      },
      None => {
        match (form_at(text, delims, pos), direction) {
          (Some((Special::BeforeOpen, list)), Direction::Forward) => buffer.set_cursor(list.end()),
          (Some((Special::AfterClose, list)), Direction::Backward) => buffer.set_cursor(list.begin),
          _ => {},
        }
        break;
      },
    }
  }
  buffer.cursor() != origin
}

pub fn out_forward<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> bool {
  ascend(buffer, delims, n, Direction::Forward)
}

pub fn out_backward<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> bool {
  ascend(buffer, delims, n, Direction::Backward)
}

/// Climb `n` levels and tidy the list left behind. An active selection is
/// carried out of its lists instead.
pub fn outward<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  n: usize,
  direction: Direction,
) -> Result<bool> {
  if buffer.selection().is_some_and(|range| !range.is_empty()) {
    return relocate::move_selection_out(buffer, delims, n, direction);
  }

  if !ascend(buffer, delims, n, direction) {
    return Ok(false);
  }
  let form = form_at(buffer.text(), delims, buffer.cursor());
  if let Some((_, list)) = form {
    gaps::tidy(buffer, delims, list.span())?;
  }
  Ok(true)
}

/// From `BeforeOpen`, to the `n`-th next list start in code. From
/// `AfterClose`, to the `n`-th previous list end. Strings and comments are
/// never entered.
pub fn flow<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> bool {
  let text = buffer.text();
  let pos = buffer.cursor();
  let n = n.max(1);
  let target = match form_at(text, delims, pos) {
    Some((Special::BeforeOpen, list)) => {
      lexer::tokens(text, delims, list.open + 1)
        .filter(|token| token.is(TokenKind::Open))
        .take(n)
        .last()
        .map(|token| prefix_start(text, delims, token.span.begin))
    },
    Some((Special::AfterClose, list)) => {
      let closes: Vec<usize> = lexer::tokens(text, delims, 0)
        .take_while(|token| token.span.begin < list.close)
        .filter(|token| token.is(TokenKind::Close))
        .map(|token| token.span.end)
        .collect();
      closes.iter().rev().take(n).last().copied()
    },
    None => None,
  };
  match target {
    Some(target) if target != pos => {
      buffer.set_cursor(target);
      true
    },
    _ => false,
  }
}

/// Cross to the other side of the current list, or swap the ends of the
/// selection.
pub fn different<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters) -> bool {
  if let Some(range) = buffer.selection() {
    buffer.set_selection(range.head, range.anchor);
    return !range.is_empty();
  }
  let form = form_at(buffer.text(), delims, buffer.cursor());
  match form {
    Some((Special::BeforeOpen, list)) => buffer.set_cursor(list.end()),
    Some((Special::AfterClose, list)) => buffer.set_cursor(list.begin),
    None => return false,
  }
  true
}

/// `BeforeOpen`: forward two lists and back one, i.e. onto the next
/// sibling list, falling back to the end of this one. Mirrored from
/// `AfterClose`.
pub fn counterclockwise<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters) -> bool {
  let start = buffer.cursor();
  let form = form_at(buffer.text(), delims, start);
  match form {
    Some((Special::BeforeOpen, _)) => {
      forward_list(buffer, delims, 2);
      backward_list(buffer, delims, 1);
      if buffer.cursor() == start {
        forward_list(buffer, delims, 1);
      }
    },
    Some((Special::AfterClose, _)) => {
      backward_list(buffer, delims, 2);
      forward_list(buffer, delims, 1);
      if buffer.cursor() == start {
        backward_list(buffer, delims, 1);
      }
    },
    None => return false,
  }
  buffer.cursor() != start
}

/// `BeforeOpen`: to the end of this list and on past the next one.
/// `AfterClose`: to the start of this list and back past the previous one.
/// When there is nothing to go to, stay put.
pub fn clockwise<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters) -> bool {
  let start = buffer.cursor();
  let direction = match form_at(buffer.text(), delims, start) {
    Some((Special::BeforeOpen, _)) => Direction::Forward,
    Some((Special::AfterClose, _)) => Direction::Backward,
    None => return false,
  };

  different(buffer, delims);
  let target = with_saved_cursor(buffer, |scratch| {
    let moved = match direction {
      Direction::Forward => forward_list(scratch, delims, 1),
      Direction::Backward => backward_list(scratch, delims, 1),
    };
    moved.then(|| scratch.cursor())
  });
  match target {
    Some(target) => buffer.set_cursor(target),
    None => {
      different(buffer, delims);
    },
  }
  buffer.cursor() != start
}

fn line_end(text: ropey::RopeSlice, pos: usize) -> usize {
  let len = text.len_chars();
  let mut end = pos.min(len);
  while end < len && !char_is_line_ending(text.char(end)) {
    end += 1;
  }
  end
}

/// Go to the end of the line, leaving a string first. At the end of a line,
/// return to where the previous call started from.
pub fn move_end_of_line<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  last_eol: &mut Option<usize>,
) -> bool {
  let text = buffer.text();
  let pos = buffer.cursor();
  if pos == line_end(text, pos) {
    return match last_eol.take() {
      Some(saved) if saved != pos => {
        buffer.set_cursor(saved);
        true
      },
      _ => false,
    };
  }

  *last_eol = Some(pos);
  let from = lexer::string_bounds(text, delims, pos).map_or(pos, |span| span.end);
  let target = line_end(text, from);
  buffer.set_cursor(target);
  true
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::buffer::RopeBuffer;

  fn at(text: &str, pos: usize) -> RopeBuffer {
    let mut buffer = RopeBuffer::new(text);
    buffer.set_cursor(pos);
    buffer
  }

  fn delims() -> Delimiters {
    Delimiters::default()
  }

  #[test]
  fn forward_skips_atoms() {
    let mut buffer = at("(a) b (c) d", 0);
    assert!(forward_list(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 3);
    assert!(forward_list(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 9);
    assert!(!forward_list(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 9);
  }

  #[test]
  fn zero_means_as_many_as_possible() {
    let mut buffer = at("(x (a) (b) (c))", 3);
    assert!(forward_list(&mut buffer, &delims(), 0));
    assert_eq!(buffer.cursor(), 14);
    assert!(backward_list(&mut buffer, &delims(), 0));
    assert_eq!(buffer.cursor(), 3);
  }

  #[test]
  fn exhausted_skip_moves_out() {
    let mut buffer = at("(x (a) y)", 6);
    assert!(!forward_list(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 9);

    let mut buffer = at("(x (a) y)", 3);
    assert!(!backward_list(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 0);
  }

  #[test]
  fn forward_then_backward_returns() {
    let mut buffer = at("(a (b c) (d))", 3);
    assert!(forward_list(&mut buffer, &delims(), 1));
    assert!(backward_list(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 3);
  }

  #[test]
  fn leaves_strings_and_comments_first() {
    let mut buffer = at("(a \"s\" (b))", 4);
    assert!(forward_list(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 10);

    let mut buffer = at(";; (x)\n(y)", 3);
    assert!(forward_list(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 10);
  }

  #[test]
  fn ascend_and_top_level() {
    let mut buffer = at("(a (b c))", 6);
    assert!(out_forward(&mut buffer, &delims(), 2));
    assert_eq!(buffer.cursor(), 9);
    assert!(!out_forward(&mut buffer, &delims(), 1));

    let mut buffer = at("(a)", 0);
    assert!(out_forward(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 3);
    assert!(out_backward(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 0);
  }

  #[test]
  fn outward_tidies() {
    let mut buffer = at("(a (b c ) d)", 5);
    assert!(outward(&mut buffer, &delims(), 1, Direction::Forward).unwrap());
    assert_eq!(buffer.render(), "(a (b c)| d)");
  }

  #[test]
  fn flow_follows_lists_in_code() {
    let mut buffer = at("(a \"(s)\" ;; (c)\n (b (d)))", 0);
    assert!(flow(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 17);
    assert!(flow(&mut buffer, &delims(), 1));
    assert_eq!(buffer.cursor(), 20);
    assert!(!flow(&mut buffer, &delims(), 1));

    let mut buffer = at("(a) (b) (c)", 11);
    assert!(flow(&mut buffer, &delims(), 2));
    assert_eq!(buffer.cursor(), 3);
  }

  #[test]
  fn different_switches_sides() {
    let mut buffer = at("'(a b)", 0);
    assert!(different(&mut buffer, &delims()));
    assert_eq!(buffer.cursor(), 6);
    assert!(different(&mut buffer, &delims()));
    assert_eq!(buffer.cursor(), 0);

    buffer.set_selection(1, 4);
    assert!(different(&mut buffer, &delims()));
    assert_eq!(buffer.selection().map(|r| (r.anchor, r.head)), Some((4, 1)));
  }

  #[test]
  fn rotations() {
    let mut buffer = at("(x (a) (b))", 3);
    assert!(counterclockwise(&mut buffer, &delims()));
    assert_eq!(buffer.cursor(), 7);

    let mut buffer = at("(x (a) (b))", 3);
    assert!(clockwise(&mut buffer, &delims()));
    assert_eq!(buffer.cursor(), 10);

    let mut buffer = at("(x (a) (b))", 7);
    assert!(!clockwise(&mut buffer, &delims()));
    assert_eq!(buffer.cursor(), 7);
  }

  #[test]
  fn end_of_line_toggles() {
    let mut last = None;
    let mut buffer = at("(a \"b\nc\" d)\n(e)", 1);
    assert!(move_end_of_line(&mut buffer, &delims(), &mut last));
    assert_eq!(buffer.cursor(), 5);
    assert!(move_end_of_line(&mut buffer, &delims(), &mut last));
    assert_eq!(buffer.cursor(), 1);

    let mut buffer = at("(a \"b\nc\" d)\n(e)", 4);
    assert!(move_end_of_line(&mut buffer, &delims(), &mut last));
    assert_eq!(buffer.cursor(), 11);
  }
}
