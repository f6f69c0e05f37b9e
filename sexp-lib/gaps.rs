//! Whitespace cleanup after structural edits.
//!
//! Moving forms around leaves gaps like `(a b )` or `( a b)`. After every
//! transform the affected top-level form is scanned with two regexes built
//! from the delimiter set:
//!
//! - whitespace (newlines included) right before a closing delimiter,
//! - spaces and tabs right after an opening delimiter.
//!
//! A regex knows nothing about strings or comments, so each match is checked
//! with the lexer before it is deleted. Whitespace that starts inside a
//! comment is the newline ending it and must stay, and whitespace after an
//! escape char is a literal.

use regex::Regex;
use sexp_core::{
  Delimiters,
  Span,
};

use crate::{
  buffer::Buffer,
  lexer::{
    self,
    Context,
  },
  transaction::{
    Assoc,
    Result,
    Transaction,
  },
};

fn char_class(chars: impl Iterator<Item = char>) -> String {
  let escaped: String = chars.map(|ch| regex::escape(&ch.to_string())).collect();
  format!("[{escaped}]")
}

/// Regexes for the two kinds of gap. Built once per delimiter set.
pub struct GapPatterns {
  before_close: Regex,
  after_open:   Regex,
}

impl GapPatterns {
  pub fn new(delims: &Delimiters) -> Option<Self> {
    if delims.pairs.is_empty() {
      return None;
    }
    let closes = char_class(delims.pairs.iter().map(|pair| pair.close));
    let opens = char_class(delims.pairs.iter().map(|pair| pair.open));
    Some(Self {
      before_close: Regex::new(&format!(r"(\s+){closes}")).ok()?,
      after_open:   Regex::new(&format!(r"{opens}([ \t]+)")).ok()?,
    })
  }
}

/// Top-level form containing `span`, or `span` itself outside any list.
pub fn affected_region<B: Buffer + ?Sized>(buffer: &B, delims: &Delimiters, span: Span) -> Span {
  let text = buffer.text();
  let lists = lexer::enclosing_lists(text, delims, span.begin);
  match lists.last() {
    Some(outer) => outer.union(span),
    None => span,
  }
  .clamp(text.len_chars())
}

/// Spans of the gaps inside `region`, checked against the lexer.
pub fn find_gaps<B: Buffer + ?Sized>(
  buffer: &B,
  delims: &Delimiters,
  patterns: &GapPatterns,
  region: Span,
) -> Vec<(usize, usize)> {
  let text = buffer.text();
  let region = region.clamp(text.len_chars());
  let slice = text.slice(region.begin..region.end);
  let haystack = slice.to_string();
  let to_char = |byte: usize| region.begin + slice.byte_to_char(byte);

  let mut gaps = Vec::new();
  for caps in patterns.before_close.captures_iter(&haystack) {
    let Some(run) = caps.get(1) else { continue };
    let (from, to) = (to_char(run.start()), to_char(run.end()));
    let after_escape = from > 0 && text.get_char(from - 1).is_some_and(|ch| delims.is_escape(ch));
    if after_escape || lexer::classify(text, delims, from) != Context::Code {
      continue;
    }
    // the close itself must be a real delimiter
    if lexer::classify(text, delims, to) != Context::Code {
      continue;
    }
    gaps.push((from, to));
  }
  for caps in patterns.after_open.captures_iter(&haystack) {
    let Some(run) = caps.get(1) else { continue };
    let (from, to) = (to_char(run.start()), to_char(run.end()));
    let open = from - 1;
    let state = lexer::lex(text, delims, open);
    if !state.in_code() || state.inside.is_some() {
      continue;
    }
    if open > 0 && text.get_char(open - 1).is_some_and(|ch| delims.is_escape(ch)) {
      continue;
    }
    gaps.push((from, to));
  }
  gaps
}

/// Delete the gaps in `region`. Cursor and selection are mapped through the
/// deletion. Returns the transaction that was applied.
pub fn remove_gaps<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  region: Span,
) -> Result<Transaction> {
  let text = buffer.text();
  let Some(patterns) = GapPatterns::new(delims) else {
    return Transaction::change(text, []);
  };
  let gaps = find_gaps(buffer, delims, &patterns, region);
  let tx = Transaction::delete(buffer.text(), gaps)?;
  if tx.is_empty() {
    return Ok(tx);
  }

  let selection = buffer.selection();
  let cursor = buffer.cursor();
  tx.apply(buffer)?;
  match selection {
    Some(range) => {
      buffer.set_selection(
        tx.map_pos(range.anchor, Assoc::Before)?,
        tx.map_pos(range.head, Assoc::Before)?,
      )
    },
    None => buffer.set_cursor(tx.map_pos(cursor, Assoc::Before)?),
  }
  tracing::trace!(removed = tx.changes().len(), "removed gaps");
  Ok(tx)
}

/// Gap removal followed by reindentation of the top-level form around
/// `span`. Every transform finishes with this.
pub fn tidy<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, span: Span) -> Result<()> {
  let region = affected_region(buffer, delims, span);
  let tx = remove_gaps(buffer, delims, region)?;
  let region = Span::new(
    tx.map_pos(region.begin, Assoc::Before)?,
    tx.map_pos(region.end, Assoc::After)?,
  );
  buffer.indent_region(region);
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::buffer::RopeBuffer;

  fn cleaned(text: &str) -> String {
    let mut buffer = RopeBuffer::new(text);
    let len = buffer.len_chars();
    remove_gaps(&mut buffer, &Delimiters::default(), Span::new(0, len)).unwrap();
    buffer.to_string()
  }

  #[test]
  fn collapses_gaps_next_to_delimiters() {
    assert_eq!(cleaned("( a b )"), "(a b)");
    assert_eq!(cleaned("(a\n  (b c)\n  )"), "(a\n  (b c))");
    assert_eq!(cleaned("[ x ]{ y\t}"), "[x]{y}");
  }

  #[test]
  fn leaves_strings_and_comments() {
    assert_eq!(cleaned("(a \"( b )\" )"), "(a \"( b )\")");
    assert_eq!(cleaned("(a ; c\n )"), "(a ; c\n )");
    assert_eq!(cleaned(r"(a ?\ )"), r"(a ?\ )");
  }

  #[test]
  fn cursor_and_selection_are_mapped() {
    let mut buffer = RopeBuffer::new("( a  b )");
    buffer.set_cursor(4);
    remove_gaps(&mut buffer, &Delimiters::default(), Span::new(0, 8)).unwrap();
    assert_eq!(buffer.render(), "(a | b)");

    let mut buffer = RopeBuffer::new("( a  b )");
    buffer.set_selection(0, 8);
    remove_gaps(&mut buffer, &Delimiters::default(), Span::new(0, 8)).unwrap();
    assert_eq!(buffer.render(), "[(a  b)]");
  }

  #[test]
  fn tidy_reindents_the_form() {
    let mut buffer = RopeBuffer::new("(a\n(b )\n)");
    buffer.set_cursor(0);
    tidy(&mut buffer, &Delimiters::default(), Span::new(3, 7)).unwrap();
    assert_eq!(buffer.to_string(), "(a\n (b))");
  }
}
