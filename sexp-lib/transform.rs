//! Tree rewrites on the list at point.
//!
//! Every operation follows the same shape: find the list the cursor is
//! special against (or the selection), compute the full edit as one
//! [`Transaction`] against the current text, apply it, place the cursor,
//! then remove the gaps the edit left and reindent the top-level form.
//!
//! ```text
//! slurp-forward   (a |(b c) d)    ->  (a |(b c d))
//! barf-backward   (foo bar)|      ->  (foo)| bar
//! splice          (a |(b c) d)    ->  |(a b c d)
//! raise           (* |(+ 1 2) 3)  ->  |(+ 1 2)
//! join            (a |(b) (c))    ->  (a |(b c))
//! split           (a b| c)        ->  (a b) |(c)
//! convolute       (f (g |(x)))    ->  (g (f |(x)))
//! ```
//!
//! When a precondition does not hold the buffer is left untouched and a
//! [`TransformError::Precondition`] says why.

use ropey::RopeSlice;
use sexp_core::{
  Delimiters,
  Span,
  chars::char_is_blank,
};
use thiserror::Error;

use crate::{
  Tendril,
  bounds::{
    self,
    List,
    form_at,
  },
  buffer::Buffer,
  gaps,
  lexer::{
    self,
    Context,
    TokenKind,
  },
  movement::Direction,
  selection::Range,
  special::{
    Special,
    open_after_prefix,
  },
  transaction::{
    Change,
    Transaction,
    TransactionError,
  },
};

pub type Result<T> = std::result::Result<T, TransformError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
  #[error("{0}")]
  Precondition(String),
  #[error("cannot move text into position {target}, it lies inside the moved text")]
  InvalidTeleportTarget { target: usize },
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

pub(crate) fn precondition<T>(message: impl Into<String>) -> Result<T> {
  Err(TransformError::Precondition(message.into()))
}

/// Where the cursor goes after an edit, in post-edit offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Landing {
  Cursor(usize),
  Selection(Range),
}

/// Apply `changes`, place the cursor, tidy around `region` (post-edit
/// offsets).
pub(crate) fn commit<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  op: &'static str,
  changes: Vec<Change>,
  region: Span,
  landing: Landing,
) -> Result<()> {
  let tx = Transaction::change(buffer.text(), changes)?;
  tx.apply(buffer)?;
  match landing {
    Landing::Cursor(pos) => {
      buffer.clear_selection();
      buffer.set_cursor(pos);
    },
    Landing::Selection(range) => buffer.set_selection(range.anchor, range.head),
  }
  gaps::tidy(buffer, delims, region.clamp(buffer.len_chars()))?;
  tracing::debug!(op, changes = tx.changes().len(), cursor = buffer.cursor(), "transform committed");
  Ok(())
}

pub(crate) fn slice(text: RopeSlice, from: usize, to: usize) -> String {
  text.slice(from..to).to_string()
}

pub(crate) fn tendril(text: impl AsRef<str>) -> Option<Tendril> {
  Some(Tendril::from(text.as_ref()))
}

pub(crate) fn current_form<B: Buffer + ?Sized>(
  buffer: &B,
  delims: &Delimiters,
) -> Result<(Special, List)> {
  match form_at(buffer.text(), delims, buffer.cursor()) {
    Some(form) => Ok(form),
    None => precondition("cursor is not before or after a list"),
  }
}

/// The active selection, when it covers whole forms: both edges in code
/// between tokens, every delimiter and string inside it closed.
pub(crate) fn balanced_selection<B: Buffer + ?Sized>(
  buffer: &B,
  delims: &Delimiters,
) -> Result<Option<Range>> {
  let Some(range) = buffer.selection().filter(|range| !range.is_empty()) else {
    return Ok(None);
  };
  let text = buffer.text();
  let span = range.span();
  let between_tokens = |pos: usize| {
    let state = lexer::lex(text, delims, pos);
    state.in_code() && state.inside.is_none()
  };
  let whole = between_tokens(span.begin)
    && between_tokens(span.end)
    && lexer::is_balanced(text.slice(span.begin..span.end), delims);
  if !whole {
    return precondition("selection does not cover whole forms");
  }
  Ok(Some(range))
}

/// Up to `n` sexps after `pos` at the same level (`0`: all of them).
pub(crate) fn siblings_after(text: RopeSlice, delims: &Delimiters, pos: usize, n: usize) -> Vec<Span> {
  let limit = if n == 0 { usize::MAX } else { n };
  let mut found = Vec::new();
  let mut pos = pos;
  while found.len() < limit {
    let Some(span) = lexer::forward_sexp(text, delims, pos) else {
      break;
    };
    found.push(span);
    pos = span.end;
  }
  found
}

/// Up to `n` sexps before `pos` at the same level, nearest first.
pub(crate) fn siblings_before(
  text: RopeSlice,
  delims: &Delimiters,
  pos: usize,
  n: usize,
) -> Vec<Span> {
  let limit = if n == 0 { usize::MAX } else { n };
  let mut found = Vec::new();
  let mut pos = pos;
  while found.len() < limit {
    let Some(span) = lexer::backward_sexp(text, delims, pos) else {
      break;
    };
    found.push(span);
    pos = span.begin;
  }
  found
}

/// Keep a gap that carries a newline or a comment, otherwise one space.
fn separator(gap: &str) -> &str {
  if gap.chars().any(|ch| ch != ' ' && ch != '\t') {
    gap
  } else {
    " "
  }
}

/// Start of the blank run ending at `pos`, going no further back than
/// `limit`. The newline that ends a line comment is not part of the run.
pub(crate) fn blanks_before(text: RopeSlice, delims: &Delimiters, pos: usize, limit: usize) -> usize {
  let mut from = pos;
  while from > limit
    && text.get_char(from - 1).is_some_and(char_is_blank)
    && lexer::classify(text, delims, from - 1) == Context::Code
  {
    from -= 1;
  }
  from
}

fn starts_blank(text: &str) -> bool {
  text.chars().next().is_some_and(char_is_blank)
}

fn ends_blank(text: &str) -> bool {
  text.chars().next_back().is_some_and(char_is_blank)
}

/// Pull the next `n` siblings (`0`: all) into the list at point.
pub fn slurp_forward<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> Result<()> {
  let (side, list) = current_form(buffer, delims)?;
  let text = buffer.text();
  let siblings = siblings_after(text, delims, list.end(), n);
  let Some(last) = siblings.last() else {
    return precondition("nothing to slurp");
  };

  let moved = slice(text, list.end(), last.end);
  let space = if !starts_blank(&moved) && !list.is_empty(text, delims) { " " } else { "" };
  let close = text.char(list.close);
  let replacement = format!("{space}{moved}{close}");
  let new_end = list.close + replacement.chars().count();

  let landing = match side {
    Special::BeforeOpen => buffer.cursor(),
    Special::AfterClose => new_end,
  };
  commit(
    buffer,
    delims,
    "slurp-forward",
    vec![(list.close, last.end, tendril(&replacement))],
    Span::new(list.begin, new_end),
    Landing::Cursor(landing),
  )
}

/// Pull the previous `n` siblings (`0`: all) into the list at point.
pub fn slurp_backward<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> Result<()> {
  let (side, list) = current_form(buffer, delims)?;
  let text = buffer.text();
  let siblings = siblings_before(text, delims, list.begin, n);
  let Some(first) = siblings.last() else {
    return precondition("nothing to slurp");
  };

  let moved = slice(text, first.begin, list.begin);
  let space = if !ends_blank(&moved) && !list.is_empty(text, delims) { " " } else { "" };
  let opener = slice(text, list.begin, list.open + 1);
  let replacement = format!("{opener}{moved}{space}");
  let new_end = list.end() + space.len();

  let landing = match side {
    Special::BeforeOpen => first.begin,
    Special::AfterClose => new_end,
  };
  commit(
    buffer,
    delims,
    "slurp-backward",
    vec![(first.begin, list.open + 1, tendril(&replacement))],
    Span::new(first.begin, new_end),
    Landing::Cursor(landing),
  )
}

/// Grow the selection by `n` sexps on its head side.
fn grow_selection<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  range: Range,
  n: usize,
) -> Result<()> {
  let text = buffer.text();
  let head = match range.direction() {
    Direction::Forward => siblings_after(text, delims, range.head, n).last().map(|span| span.end),
    Direction::Backward => {
      siblings_before(text, delims, range.head, n)
        .last()
        .map(|span| span.begin)
    },
  };
  match head {
    Some(head) => {
      buffer.set_selection(range.anchor, head);
      Ok(())
    },
    None => precondition("nothing to slurp"),
  }
}

/// Shrink the selection by `n` sexps on its head side.
fn shrink_selection<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  range: Range,
  n: usize,
) -> Result<()> {
  let text = buffer.text();
  let mut head = range.head;
  for _ in 0..n.max(1) {
    let next = match range.direction() {
      Direction::Forward => {
        lexer::backward_sexp(text, delims, head)
          .and_then(|last| lexer::backward_sexp(text, delims, last.begin))
          .filter(|prev| prev.begin >= range.anchor)
          .map(|prev| prev.end)
      },
      Direction::Backward => {
        lexer::forward_sexp(text, delims, head)
          .and_then(|first| lexer::forward_sexp(text, delims, first.end))
          .filter(|next| next.end <= range.anchor)
          .map(|next| next.begin)
      },
    };
    match next {
      Some(next) => head = next,
      None => return precondition("selection cannot shrink any further"),
    }
  }
  buffer.set_selection(range.anchor, head);
  Ok(())
}

/// `AfterClose`: slurp forward. `BeforeOpen`: slurp backward. With a
/// selection, grow it.
pub fn slurp<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> Result<()> {
  if let Some(range) = buffer.selection() {
    return grow_selection(buffer, delims, range, n);
  }
  match current_form(buffer, delims)?.0 {
    Special::AfterClose => slurp_forward(buffer, delims, n),
    Special::BeforeOpen => slurp_backward(buffer, delims, n),
  }
}

fn nonempty_children(text: RopeSlice, delims: &Delimiters, list: &List) -> Result<Vec<Span>> {
  let children = list.children(text, delims);
  if children.is_empty() {
    return precondition("list is empty, nothing to barf");
  }
  Ok(children)
}

/// Move the closing delimiter left past the last `n` children.
pub fn barf_backward<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> Result<()> {
  let (side, list) = current_form(buffer, delims)?;
  let text = buffer.text();
  let children = nonempty_children(text, delims, &list)?;
  let keep = children.len() - n.max(1).min(children.len());
  let first_out = children[keep];
  let prev_end = if keep == 0 { list.open + 1 } else { children[keep - 1].end };

  let gap = slice(text, prev_end, first_out.begin);
  let ejected = slice(text, first_out.begin, list.close);
  // a trailing line comment keeps the newline that ends it
  let ends_in_comment = lexer::tokens(text, delims, first_out.begin)
    .take_while(|token| token.span.begin < list.close)
    .last()
    .is_some_and(|token| token.is(TokenKind::Comment));
  let eol = if ends_in_comment { "\n" } else { "" };
  let ejected = ejected.trim_end();
  let close = text.char(list.close);
  let replacement = format!("{close}{}{ejected}{eol}", separator(&gap));

  let landing = match side {
    Special::AfterClose => prev_end + 1,
    Special::BeforeOpen => list.begin,
  };
  let region_end = prev_end + replacement.chars().count();
  commit(
    buffer,
    delims,
    "barf-backward",
    vec![(prev_end, list.end(), tendril(&replacement))],
    Span::new(list.begin, region_end),
    Landing::Cursor(landing),
  )
}

/// Move the opening delimiter (and its prefix) right past the first `n`
/// children.
pub fn barf_forward<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> Result<()> {
  let (side, list) = current_form(buffer, delims)?;
  let text = buffer.text();
  let children = nonempty_children(text, delims, &list)?;
  let count = n.max(1).min(children.len());
  let last_out = children[count - 1];
  let next_begin = children.get(count).map_or(list.close, |child| child.begin);

  // comments between the opener and the first child go out with it
  let head = slice(text, list.open + 1, children[0].begin);
  let head = head.trim_start();
  let ejected = slice(text, children[0].begin, last_out.end);
  let gap = slice(text, last_out.end, next_begin);
  let opener = slice(text, list.begin, list.open + 1);
  let lead = format!("{head}{ejected}{}", separator(&gap));
  let replacement = format!("{lead}{opener}");

  let new_begin = list.begin + lead.chars().count();
  let landing = match side {
    Special::BeforeOpen => new_begin,
    Special::AfterClose => buffer.cursor(),
  };
  commit(
    buffer,
    delims,
    "barf-forward",
    vec![(list.begin, next_begin, tendril(&replacement))],
    Span::new(list.begin, list.end()),
    Landing::Cursor(landing),
  )
}

/// `AfterClose`: eject the last child. `BeforeOpen`: eject the first. With
/// a selection, shrink it.
pub fn barf<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> Result<()> {
  if let Some(range) = buffer.selection() {
    return shrink_selection(buffer, delims, range, n);
  }
  match current_form(buffer, delims)?.0 {
    Special::AfterClose => barf_backward(buffer, delims, n),
    Special::BeforeOpen => barf_forward(buffer, delims, n),
  }
}

/// Remove the delimiters of the list at point. The cursor flows to the
/// nearest list in the parent: forward from `BeforeOpen`, backward from
/// `AfterClose`, or to the parent's edge when there is none.
pub fn splice<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters) -> Result<()> {
  let (side, list) = current_form(buffer, delims)?;
  let opener_len = list.open + 1 - list.begin;
  let start = match side {
    Special::BeforeOpen => list.begin,
    Special::AfterClose => list.close - opener_len,
  };
  commit(
    buffer,
    delims,
    "splice",
    vec![(list.begin, list.open + 1, None), (list.close, list.end(), None)],
    Span::new(list.begin, list.close - opener_len),
    Landing::Cursor(start),
  )?;

  let text = buffer.text();
  let pos = buffer.cursor();
  let is_list =
    |span: &Span| open_after_prefix(text, delims, span.begin).is_some_and(|open| open < span.end);
  let target = match side {
    Special::BeforeOpen => {
      siblings_after(text, delims, pos, 0)
        .into_iter()
        .find(|span| is_list(span))
        .map(|span| span.begin)
        .or_else(|| List::enclosing(text, delims, pos).map(|parent| parent.begin))
    },
    Special::AfterClose => {
      siblings_before(text, delims, pos, 0)
        .into_iter()
        .find(|span| is_list(span))
        .map(|span| span.end)
        .or_else(|| List::enclosing(text, delims, pos).map(|parent| parent.end()))
    },
  };
  if let Some(target) = target {
    buffer.set_cursor(target);
  }
  Ok(())
}

/// The form or selection the raise family acts on.
pub(crate) fn raised_span<B: Buffer + ?Sized>(buffer: &B, delims: &Delimiters) -> Result<(Span, Landing)> {
  if let Some(range) = balanced_selection(buffer, delims)? {
    return Ok((range.span(), Landing::Selection(range)));
  }
  let (_, list) = current_form(buffer, delims)?;
  Ok((list.span(), Landing::Cursor(buffer.cursor())))
}

/// Translate a landing inside `from` to the same relative place at `to`.
pub(crate) fn shift_landing(landing: Landing, from: usize, to: usize) -> Landing {
  let shift = |pos: usize| pos - from + to;
  match landing {
    Landing::Cursor(pos) => Landing::Cursor(shift(pos)),
    Landing::Selection(range) => Landing::Selection(Range::new(shift(range.anchor), shift(range.head))),
  }
}

/// Replace the `n`-th enclosing list with the form (or selection) at point.
pub fn raise<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, n: usize) -> Result<()> {
  let (span, landing) = raised_span(buffer, delims)?;
  let text = buffer.text();
  let mut parent = None;
  let mut pos = span.begin;
  for _ in 0..n.max(1) {
    match List::enclosing(text, delims, pos) {
      Some(list) => {
        pos = list.begin;
        parent = Some(list);
      },
      None => break,
    }
  }
  let Some(parent) = parent else {
    return precondition("no enclosing list to raise out of");
  };

  let raised = slice(text, span.begin, span.end);
  let new_end = parent.open + raised.chars().count();
  commit(
    buffer,
    delims,
    "raise",
    vec![(parent.open, parent.end(), tendril(&raised))],
    Span::new(parent.begin, new_end),
    shift_landing(landing, span.begin, parent.open),
  )
}

/// Raise the run of siblings from the form to the last child
/// (`BeforeOpen`), or from the first child to the form (`AfterClose`).
pub fn raise_some<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters) -> Result<()> {
  let (side, list) = current_form(buffer, delims)?;
  let text = buffer.text();
  let Some(parent) = list.parent(text, delims) else {
    return precondition("no enclosing list to raise out of");
  };
  let children = parent.children(text, delims);
  let (Some(first), Some(last)) = (children.first(), children.last()) else {
    return precondition("no enclosing list to raise out of");
  };
  let run = match side {
    Special::BeforeOpen => Span::new(list.begin, last.end),
    Special::AfterClose => Span::new(first.begin, list.end()),
  };

  let raised = slice(text, run.begin, run.end);
  let cursor = buffer.cursor();
  commit(
    buffer,
    delims,
    "raise-some",
    vec![(parent.open, parent.end(), tendril(&raised))],
    Span::new(parent.begin, parent.open + raised.chars().count()),
    Landing::Cursor(cursor - run.begin + parent.open),
  )
}

/// Swap the heads of the parent and the grandparent of the form at point.
///
/// ```text
/// (when (pred)            (let ((x 1))
///   (let ((x 1))    ->      (when (pred)
///     |(foo x)))              |(foo x)))
/// ```
pub fn convolute<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters) -> Result<()> {
  let (span, landing) = raised_span(buffer, delims)?;
  let text = buffer.text();
  let Some(parent) = List::enclosing(text, delims, span.begin) else {
    return precondition("not enough depth to convolute");
  };
  let Some(grand) = parent.parent(text, delims) else {
    return precondition("not enough depth to convolute");
  };

  let grand_head = slice(text, grand.open + 1, parent.begin);
  let parent_opener = slice(text, parent.begin, parent.open + 1);
  let parent_head = slice(text, parent.open + 1, span.begin);
  let replacement = format!("{parent_head}{parent_opener}{grand_head}");
  commit(
    buffer,
    delims,
    "convolute",
    vec![(grand.open + 1, span.begin, tendril(&replacement))],
    grand.span(),
    landing,
  )
}

/// Merge the list at point with the next sibling list, or the string at
/// point with the next string.
pub fn join<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters) -> Result<()> {
  let text = buffer.text();
  let pos = buffer.cursor();
  if let Some(string) = lexer::string_bounds(text, delims, pos) {
    return join_strings(buffer, delims, string);
  }

  let (side, list) = current_form(buffer, delims)?;
  let next = lexer::forward_sexp(text, delims, list.end())
    .and_then(|span| open_after_prefix(text, delims, span.begin))
    .and_then(|open| List::from_open(text, delims, open));
  let Some(next) = next else {
    return precondition("nothing to join with");
  };
  if next.begin != next.open {
    return precondition("cannot join a prefixed list");
  }

  let between = slice(text, list.end(), next.begin);
  let joint = if between.is_empty() && !list.is_empty(text, delims) && !next.is_empty(text, delims) {
    " ".to_string()
  } else {
    between
  };
  let mut changes = vec![(list.close, next.open + 1, tendril(&joint))];
  let close = text.char(list.close);
  if text.char(next.close) != close {
    changes.push((next.close, next.end(), tendril(close.to_string())));
  }

  let removed = next.open + 1 - list.close - joint.chars().count();
  let new_end = next.end() - removed;
  let landing = match side {
    Special::BeforeOpen => pos,
    Special::AfterClose => new_end,
  };
  commit(
    buffer,
    delims,
    "join",
    changes,
    Span::new(list.begin, new_end),
    Landing::Cursor(landing),
  )
}

fn join_strings<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, string: Span) -> Result<()> {
  let text = buffer.text();
  let next = lexer::forward_sexp(text, delims, string.end)
    .filter(|span| text.get_char(span.begin).is_some_and(|ch| delims.is_quote(ch)));
  let Some(next) = next else {
    return precondition("nothing to join with");
  };
  let cursor = buffer.cursor();
  commit(
    buffer,
    delims,
    "join",
    vec![(string.end - 1, next.begin + 1, None)],
    Span::new(string.begin, next.end - (next.begin + 2 - string.end)),
    Landing::Cursor(cursor),
  )
}

/// Split the string or list around the cursor into two siblings.
pub fn split<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters) -> Result<()> {
  let text = buffer.text();
  let pos = buffer.cursor();
  let state = lexer::lex(text, delims, pos);
  match state.context {
    Context::InComment => return precondition("cannot split inside a comment"),
    Context::InString => {
      let quote = delims.quote;
      return commit(
        buffer,
        delims,
        "split",
        vec![(pos, pos, tendril(format!("{quote} {quote}")))],
        Span::new(pos, pos + 3),
        Landing::Cursor(pos + 2),
      );
    },
    Context::Code => {},
  }

  let Some(list) = List::enclosing(text, delims, pos) else {
    return precondition("nothing to split");
  };
  let from = blanks_before(text, delims, pos, list.open + 1);
  let mut to = pos;
  while to < list.close && text.get_char(to).is_some_and(char_is_blank) {
    to += 1;
  }

  let open = text.char(list.open);
  let close = text.char(list.close);
  commit(
    buffer,
    delims,
    "split",
    vec![(from, to, tendril(format!("{close} {open}")))],
    Span::new(list.begin, list.end() + 2),
    Landing::Cursor(from + 2),
  )
}

/// Wrap the form at point (or the selection, or the thing at point) in a
/// new pair opened by `open`.
pub fn wrap<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, open: char) -> Result<()> {
  let Some(close) = delims.close_for(open) else {
    return precondition(format!("{open:?} does not open a list"));
  };
  balanced_selection(buffer, delims)?;
  let Some(span) = bounds::bounds_dwim(buffer, delims) else {
    return precondition("nothing to wrap");
  };
  commit(
    buffer,
    delims,
    "wrap",
    vec![
      (span.begin, span.begin, tendril(open.to_string())),
      (span.end, span.end, tendril(close.to_string())),
    ],
    Span::new(span.begin, span.end + 2),
    Landing::Cursor(span.begin),
  )
}

/// Insert a delimiter pair at the cursor with the cursor between them.
///
/// Spaces are added to keep the new list apart from adjacent symbols unless
/// `no_space` is set. Inside strings and comments only `open` itself is
/// inserted, and an active selection is wrapped instead.
pub fn insert_pair<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  open: char,
  no_space: bool,
) -> Result<()> {
  let Some(close) = delims.close_for(open) else {
    return precondition(format!("{open:?} does not open a list"));
  };
  if buffer.selection().is_some_and(|range| !range.is_empty()) {
    return wrap(buffer, delims, open);
  }

  let text = buffer.text();
  let pos = buffer.cursor();
  if lexer::in_string_or_comment(text, delims, pos) {
    let tx = Transaction::insert(text, pos, &open.to_string())?;
    tx.apply(buffer)?;
    buffer.set_cursor(pos + 1);
    return Ok(());
  }

  let before = pos.checked_sub(1).and_then(|idx| text.get_char(idx));
  let after = text.get_char(pos);
  let space_before = !no_space
    && before.is_some_and(|ch| !char_is_blank(ch) && !delims.is_open(ch) && !delims.is_prefix(ch));
  let space_after = !no_space && after.is_some_and(|ch| !char_is_blank(ch) && !delims.is_close(ch));

  let lead = if space_before { " " } else { "" };
  let trail = if space_after { " " } else { "" };
  let inserted = format!("{lead}{open}{close}{trail}");
  let tx = Transaction::insert(text, pos, &inserted)?;
  tx.apply(buffer)?;
  buffer.clear_selection();
  buffer.set_cursor(pos + lead.len() + 1);
  tracing::trace!(?open, pos, "inserted pair");
  Ok(())
}
