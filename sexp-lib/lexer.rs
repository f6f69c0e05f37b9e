//! Lexical view of the buffer.
//!
//! There is no parse tree. Every question ("is this position inside a
//! string?", "where does the list around it end?") is answered by tokenizing
//! from an anchor up to the position of interest. The anchor is the start
//! of the enclosing top-level form: the last column-0 opening delimiter
//! before the position that the lexer sees at depth 0 in code.
//!
//! Tokens are coarse:
//!
//! ```text
//! '(foo "a\"b" ; note
//! ^^   ^      ^------ Comment (to the end of the line)
//! ||   '------------- String (escape-aware)
//! |'----------------- Open
//! '------------------ Prefix
//! ```
//!
//! Anything that is not whitespace, a delimiter, a quote, a prefix sigil or
//! a comment marker is part of a symbol. An escape char makes the next char
//! a symbol constituent, so `\(` never opens a list.
//!
//! None of the functions here fail. Unbalanced or unterminated input simply
//! yields `None` from the bounds helpers, and an unmatched close is ignored
//! when tracking depth.

use ropey::RopeSlice;
use sexp_core::{
  Delimiters,
  Span,
  chars::{
    CharCategory,
    categorize_char,
    char_is_blank,
    char_is_line_ending,
    char_is_whitespace,
  },
};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Open,
  Close,
  Prefix,
  String,
  Comment,
  Symbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
  pub kind:       TokenKind,
  pub span:       Span,
  /// False for a string that runs to the end of the text.
  pub terminated: bool,
}

impl Token {
  #[inline]
  pub fn is(&self, kind: TokenKind) -> bool {
    self.kind == kind
  }
}

/// Iterator over the tokens of `text` starting at a given position.
pub struct Tokens<'a> {
  text:   RopeSlice<'a>,
  delims: &'a Delimiters,
  pos:    usize,
}

/// Tokenize from `from`. `from` should be a token boundary (an anchor, or a
/// position the caller knows is in code between tokens).
pub fn tokens<'a>(text: RopeSlice<'a>, delims: &'a Delimiters, from: usize) -> Tokens<'a> {
  Tokens {
    text,
    delims,
    pos: from.min(text.len_chars()),
  }
}

impl Iterator for Tokens<'_> {
  type Item = Token;

  fn next(&mut self) -> Option<Token> {
    let text = self.text;
    let delims = self.delims;
    let len = text.len_chars();

    while self.pos < len && char_is_blank(text.char(self.pos)) {
      self.pos += 1;
    }
    if self.pos >= len {
      return None;
    }

    let start = self.pos;
    let mut terminated = true;
    let (kind, end) = if delims.comment_at(text, start) {
      let mut end = start + delims.comment_len();
      while end < len && !char_is_line_ending(text.char(end)) {
        end += 1;
      }
      (TokenKind::Comment, end.min(len))
    } else {
      match categorize_char(text.char(start), delims) {
        CharCategory::Open => (TokenKind::Open, start + 1),
        CharCategory::Close => (TokenKind::Close, start + 1),
        CharCategory::Quote => {
          match find_string_end(text, delims, start + 1) {
            Some(end) => (TokenKind::String, end),
            None => {
              terminated = false;
              (TokenKind::String, len)
            },
          }
        },
        CharCategory::Prefix => (TokenKind::Prefix, start + 1),
        _ => (TokenKind::Symbol, symbol_end(text, delims, start)),
      }
    };

    self.pos = end;
    Some(Token {
      kind,
      span: Span::new(start, end),
      terminated,
    })
  }
}

fn symbol_end(text: RopeSlice, delims: &Delimiters, start: usize) -> usize {
  let len = text.len_chars();
  let mut end = start;
  while end < len {
    let ch = text.char(end);
    if delims.is_escape(ch) {
      end = (end + 2).min(len);
      continue;
    }
    if delims.comment_at(text, end) || !delims.is_symbol_char(ch) {
      break;
    }
    end += 1;
  }
  // a lone char that starts nothing (first char of a longer comment marker)
  end.max(start + 1)
}

/// Position just past the closing quote of a string whose body starts at
/// `from`, or `None` when the string is unterminated.
pub fn find_string_end(text: RopeSlice, delims: &Delimiters, from: usize) -> Option<usize> {
  let len = text.len_chars();
  let mut pos = from;
  while pos < len {
    let ch = text.char(pos);
    if delims.is_escape(ch) {
      pos += 2;
    } else if delims.is_quote(ch) {
      return Some(pos + 1);
    } else {
      pos += 1;
    }
  }
  None
}

/// Start of the top-level form around `pos`: the last opening delimiter
/// before `pos` that sits in column 0 at depth 0 in code, or the start of
/// the text. A column-0 paren inside a string or a list is not an anchor.
pub fn defun_start(text: RopeSlice, delims: &Delimiters, pos: usize) -> usize {
  let pos = pos.min(text.len_chars());
  let mut anchor = 0;
  let mut depth = 0usize;
  for token in tokens(text, delims, 0) {
    if token.span.begin >= pos {
      break;
    }
    match token.kind {
      TokenKind::Open => {
        let begin = token.span.begin;
        if depth == 0 && text.line_to_char(text.char_to_line(begin)) == begin {
          anchor = begin;
        }
        depth += 1;
      },
      TokenKind::Close => depth = depth.saturating_sub(1),
      _ => {},
    }
  }
  anchor
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
  Code,
  InString,
  InComment,
}

/// What the lexer knows about a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexState {
  pub context: Context,
  pub anchor:  usize,
  /// Opening delimiters enclosing the position, outermost first.
  pub open:    SmallVec<[usize; 8]>,
  /// Last token ending at or before the position.
  pub prev:    Option<Token>,
  /// Token the position falls strictly inside of, if any.
  pub inside:  Option<Token>,
}

impl LexState {
  #[inline]
  pub fn depth(&self) -> usize {
    self.open.len()
  }

  #[inline]
  pub fn in_code(&self) -> bool {
    self.context == Context::Code
  }
}

pub fn lex(text: RopeSlice, delims: &Delimiters, pos: usize) -> LexState {
  let pos = pos.min(text.len_chars());
  let anchor = defun_start(text, delims, pos);
  let mut state = LexState {
    context: Context::Code,
    anchor,
    open: SmallVec::new(),
    prev: None,
    inside: None,
  };

  for token in tokens(text, delims, anchor) {
    if token.span.begin >= pos {
      break;
    }
    let spans_pos = match token.kind {
      TokenKind::Comment => pos <= token.span.end,
      TokenKind::String => pos < token.span.end || !token.terminated,
      _ => pos < token.span.end,
    };
    if spans_pos {
      state.context = match token.kind {
        TokenKind::Comment => Context::InComment,
        TokenKind::String => Context::InString,
        _ => Context::Code,
      };
      state.inside = Some(token);
      break;
    }
    match token.kind {
      TokenKind::Open => state.open.push(token.span.begin),
      TokenKind::Close => {
        state.open.pop();
      },
      _ => {},
    }
    state.prev = Some(token);
  }
  state
}

/// Whether `pos` is in code, a string, or a comment. Never fails: text the
/// lexer cannot make sense of is code.
pub fn classify(text: RopeSlice, delims: &Delimiters, pos: usize) -> Context {
  lex(text, delims, pos).context
}

#[inline]
pub fn in_string_or_comment(text: RopeSlice, delims: &Delimiters, pos: usize) -> bool {
  classify(text, delims, pos) != Context::Code
}

/// Bounds of the terminated string `pos` is inside of, quotes included.
pub fn string_bounds(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<Span> {
  lex(text, delims, pos)
    .inside
    .filter(|token| token.is(TokenKind::String) && token.terminated)
    .map(|token| token.span)
}

/// Marker position of a line whose first non-blank text is a comment.
fn comment_only_line(text: RopeSlice, delims: &Delimiters, line: usize) -> Option<usize> {
  let mut pos = text.line_to_char(line);
  let len = text.len_chars();
  while pos < len && char_is_whitespace(text.char(pos)) {
    pos += 1;
  }
  delims.comment_at(text, pos).then_some(pos)
}

fn comment_line_end(text: RopeSlice, pos: usize) -> usize {
  let len = text.len_chars();
  let mut end = pos;
  while end < len && !char_is_line_ending(text.char(end)) {
    end += 1;
  }
  end
}

/// Bounds of the comment at `pos`, from the marker to the end of the line.
///
/// A comment that owns its lines absorbs the comment-only lines directly
/// above and below it. A blank line ends the run, and a comment trailing
/// code stands alone.
pub fn comment_bounds(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<Span> {
  let state = lex(text, delims, pos);
  let token = match state.inside {
    Some(token) if token.is(TokenKind::Comment) => token,
    Some(_) => return None,
    None if delims.comment_at(text, pos) => tokens(text, delims, pos).next()?,
    None => return None,
  };

  let line = text.char_to_line(token.span.begin);
  if comment_only_line(text, delims, line) != Some(token.span.begin) {
    return Some(token.span);
  }

  let mut begin = token.span.begin;
  let mut first = line;
  while first > 0 {
    match comment_only_line(text, delims, first - 1) {
      Some(marker) if classify(text, delims, marker) == Context::Code => {
        begin = marker;
        first -= 1;
      },
      _ => break,
    }
  }

  let mut end = token.span.end;
  let mut last = line;
  while last + 1 < text.len_lines() {
    match comment_only_line(text, delims, last + 1) {
      Some(marker) => {
        end = comment_line_end(text, marker);
        last += 1;
      },
      None => break,
    }
  }

  Some(Span::new(begin, end))
}

/// Position of the delimiter closing the list opened at `open`.
pub fn match_close(text: RopeSlice, delims: &Delimiters, open: usize) -> Option<usize> {
  if !text.get_char(open).is_some_and(|ch| delims.is_open(ch)) {
    return None;
  }
  let mut depth = 0usize;
  for token in tokens(text, delims, open) {
    match token.kind {
      TokenKind::Open => depth += 1,
      TokenKind::Close => {
        depth = depth.checked_sub(1)?;
        if depth == 0 {
          return Some(token.span.begin);
        }
      },
      _ => {},
    }
  }
  None
}

/// Position of the delimiter opening the list closed at `close`.
pub fn match_open(text: RopeSlice, delims: &Delimiters, close: usize) -> Option<usize> {
  if !text.get_char(close).is_some_and(|ch| delims.is_close(ch)) {
    return None;
  }
  let state = lex(text, delims, close);
  if !state.in_code() {
    return None;
  }
  state.open.last().copied()
}

/// Innermost list around `pos`, delimiters included.
pub fn list_bounds(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<Span> {
  let state = lex(text, delims, pos);
  let open = *state.open.last()?;
  let close = match_close(text, delims, open)?;
  Some(Span::new(open, close + 1))
}

/// Every list around `pos`, innermost first. Stops at the first one that
/// does not close.
pub fn enclosing_lists(text: RopeSlice, delims: &Delimiters, pos: usize) -> SmallVec<[Span; 4]> {
  let state = lex(text, delims, pos);
  let mut lists = SmallVec::new();
  for &open in state.open.iter().rev() {
    match match_close(text, delims, open) {
      Some(close) => lists.push(Span::new(open, close + 1)),
      None => break,
    }
  }
  lists
}

/// Tokens from the anchor of `pos` that start before `pos`. A symbol
/// straddling `pos` is cut at `pos`.
pub fn tokens_before(text: RopeSlice, delims: &Delimiters, pos: usize) -> Vec<Token> {
  let pos = pos.min(text.len_chars());
  let anchor = defun_start(text, delims, pos);
  tokens(text, delims, anchor)
    .take_while(|token| token.span.begin < pos)
    .map(|mut token| {
      if token.is(TokenKind::Symbol) && token.span.end > pos {
        token.span.end = pos;
      }
      token
    })
    .collect()
}

/// Span of the sexp after `pos`, adjacent prefix sigils included. Comments
/// are skipped. `None` at the end of a list or of the text.
pub fn forward_sexp(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<Span> {
  let mut iter = tokens(text, delims, pos);
  let mut begin: Option<usize> = None;
  let mut last_prefix_end = 0;

  while let Some(token) = iter.next() {
    if begin.is_some() && token.span.begin != last_prefix_end {
      // sigil separated from what follows it is not part of that form
      begin = None;
    }
    match token.kind {
      TokenKind::Comment => {},
      TokenKind::Prefix => {
        begin.get_or_insert(token.span.begin);
        last_prefix_end = token.span.end;
      },
      TokenKind::Close => return None,
      TokenKind::String | TokenKind::Symbol => {
        if !token.terminated {
          return None;
        }
        return Some(Span::new(begin.unwrap_or(token.span.begin), token.span.end));
      },
      TokenKind::Open => {
        let mut depth = 1usize;
        for inner in iter.by_ref() {
          match inner.kind {
            TokenKind::Open => depth += 1,
            TokenKind::Close => {
              depth -= 1;
              if depth == 0 {
                return Some(Span::new(begin.unwrap_or(token.span.begin), inner.span.end));
              }
            },
            _ => {},
          }
        }
        return None;
      },
    }
  }
  None
}

/// Span of the sexp before `pos`, adjacent prefix sigils included. Comments
/// are skipped. `None` at the start of a list or of the text.
pub fn backward_sexp(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<Span> {
  let toks = tokens_before(text, delims, pos);
  let mut idx = toks.len();
  let last = loop {
    idx = idx.checked_sub(1)?;
    if !matches!(toks[idx].kind, TokenKind::Comment | TokenKind::Prefix) {
      break toks[idx];
    }
  };

  let end = last.span.end;
  let mut first = match last.kind {
    TokenKind::Open => return None,
    TokenKind::Close => {
      let mut depth = 0usize;
      let mut found = None;
      for back in (0..=idx).rev() {
        match toks[back].kind {
          TokenKind::Close => depth += 1,
          TokenKind::Open => {
            depth -= 1;
            if depth == 0 {
              found = Some(back);
              break;
            }
          },
          _ => {},
        }
      }
      found?
    },
    _ => idx,
  };

  while first > 0
    && toks[first - 1].is(TokenKind::Prefix)
    && toks[first - 1].span.end == toks[first].span.begin
  {
    first -= 1;
  }
  Some(Span::new(toks[first].span.begin, end))
}

/// Symbol at `pos`: the one `pos` is inside, else the one starting at `pos`,
/// else the one ending at `pos`.
pub fn symbol_bounds(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<Span> {
  let state = lex(text, delims, pos);
  if !state.in_code() {
    return None;
  }
  if let Some(token) = state.inside {
    return token.is(TokenKind::Symbol).then_some(token.span);
  }
  if let Some(next) = tokens(text, delims, pos).next()
    && next.span.begin == pos
    && next.is(TokenKind::Symbol)
  {
    return Some(next.span);
  }
  state
    .prev
    .filter(|token| token.is(TokenKind::Symbol) && token.span.end == pos)
    .map(|token| token.span)
}

fn trim(text: RopeSlice, span: Span) -> Option<Span> {
  let mut begin = span.begin;
  let mut end = span.end;
  while begin < end && char_is_blank(text.char(begin)) {
    begin += 1;
  }
  while end > begin && char_is_blank(text.char(end - 1)) {
    end -= 1;
  }
  (begin < end).then(|| Span::new(begin, end))
}

/// The run of text around `pos` that has no structure of its own: the
/// contents of the innermost list, or the current line at top level, with
/// surrounding blanks trimmed.
pub fn sentence_bounds(text: RopeSlice, delims: &Delimiters, pos: usize) -> Option<Span> {
  match list_bounds(text, delims, pos) {
    Some(list) => trim(text, Span::new(list.begin + 1, list.end - 1)),
    None => {
      let line = text.char_to_line(pos.min(text.len_chars()));
      let start = text.line_to_char(line);
      trim(text, Span::new(start, comment_line_end(text, start)))
    },
  }
}

/// Whether every list closes with its own delimiter and every string ends.
pub fn is_balanced(text: RopeSlice, delims: &Delimiters) -> bool {
  let mut stack: SmallVec<[char; 16]> = SmallVec::new();
  for token in tokens(text, delims, 0) {
    match token.kind {
      TokenKind::Open => stack.push(text.char(token.span.begin)),
      TokenKind::Close => {
        let close = text.char(token.span.begin);
        match stack.pop() {
          Some(open) if delims.close_for(open) == Some(close) => {},
          _ => return false,
        }
      },
      TokenKind::String if !token.terminated => return false,
      _ => {},
    }
  }
  stack.is_empty()
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;

  fn delims() -> Delimiters {
    Delimiters::default()
  }

  #[test]
  fn escaped_quote_stays_in_string() {
    let doc = Rope::from(r#""a\"b""#);
    let text = doc.slice(..);
    assert_eq!(classify(text, &delims(), 3), Context::InString);
    assert_eq!(classify(text, &delims(), 0), Context::Code);
    assert_eq!(classify(text, &delims(), 6), Context::Code);
    assert_eq!(string_bounds(text, &delims(), 3), Some(Span::new(0, 6)));
  }

  #[test]
  fn escaped_delimiters_are_symbols() {
    let doc = Rope::from(r"(a \( b)");
    let text = doc.slice(..);
    let kinds: Vec<_> = tokens(text, &delims(), 0).map(|t| t.kind).collect();
    assert_eq!(kinds, vec![
      TokenKind::Open,
      TokenKind::Symbol,
      TokenKind::Symbol,
      TokenKind::Symbol,
      TokenKind::Close,
    ]);
    assert_eq!(match_close(text, &delims(), 0), Some(7));
  }

  #[test]
  fn unterminated_string_runs_to_end() {
    let doc = Rope::from("(a \"bc");
    let text = doc.slice(..);
    assert_eq!(classify(text, &delims(), 6), Context::InString);
    assert_eq!(string_bounds(text, &delims(), 5), None);
    assert!(!is_balanced(text, &delims()));
  }

  #[test]
  fn comment_context() {
    let doc = Rope::from("(a ; b)\n c)");
    let text = doc.slice(..);
    assert_eq!(classify(text, &delims(), 3), Context::Code);
    assert_eq!(classify(text, &delims(), 4), Context::InComment);
    assert_eq!(classify(text, &delims(), 7), Context::InComment);
    assert_eq!(classify(text, &delims(), 8), Context::Code);
    assert_eq!(match_close(text, &delims(), 0), Some(10));
  }

  #[test]
  fn comment_only_lines_merge() {
    let doc = Rope::from("(a)\n;; one\n  ;; two\n\n;; three\n(b) ; tail\n;; four");
    let text = doc.slice(..);
    // "one" and "two" are adjacent comment-only lines
    assert_eq!(comment_bounds(text, &delims(), 6), Some(Span::new(4, 19)));
    assert_eq!(comment_bounds(text, &delims(), 17), Some(Span::new(4, 19)));
    // the blank line separates "three"
    assert_eq!(comment_bounds(text, &delims(), 21), Some(Span::new(21, 29)));
    // a comment trailing code never merges
    assert_eq!(comment_bounds(text, &delims(), 35), Some(Span::new(34, 40)));
    assert_eq!(comment_bounds(text, &delims(), 1), None);
  }

  #[test]
  fn sexp_skips_take_prefixes() {
    let doc = Rope::from("(a '(b c) ;; x\n `d \"e\")");
    let text = doc.slice(..);
    assert_eq!(forward_sexp(text, &delims(), 2), Some(Span::new(3, 9)));
    assert_eq!(forward_sexp(text, &delims(), 9), Some(Span::new(16, 18)));
    assert_eq!(forward_sexp(text, &delims(), 22), None);
    assert_eq!(backward_sexp(text, &delims(), 22), Some(Span::new(19, 22)));
    assert_eq!(backward_sexp(text, &delims(), 16), Some(Span::new(3, 9)));
    assert_eq!(backward_sexp(text, &delims(), 1), None);
    assert_eq!(forward_sexp(text, &delims(), 0), Some(Span::new(0, 23)));
  }

  #[test]
  fn matching_delimiters() {
    let doc = Rope::from("(a [b {c}] \")\")");
    let text = doc.slice(..);
    assert_eq!(match_close(text, &delims(), 0), Some(14));
    assert_eq!(match_close(text, &delims(), 3), Some(9));
    assert_eq!(match_open(text, &delims(), 9), Some(3));
    assert_eq!(match_open(text, &delims(), 14), Some(0));
    // the paren inside the string is not a delimiter
    assert_eq!(match_open(text, &delims(), 12), None);
    assert!(is_balanced(text, &delims()));
  }

  #[test]
  fn lists_around_a_position() {
    let doc = Rope::from("(a (b c) d)");
    let text = doc.slice(..);
    assert_eq!(list_bounds(text, &delims(), 5), Some(Span::new(3, 8)));
    assert_eq!(list_bounds(text, &delims(), 9), Some(Span::new(0, 11)));
    assert_eq!(list_bounds(text, &delims(), 11), None);
    assert_eq!(enclosing_lists(text, &delims(), 6).as_slice(), &[
      Span::new(3, 8),
      Span::new(0, 11)
    ]);
    assert_eq!(lex(text, &delims(), 6).depth(), 2);
  }

  #[test]
  fn symbols_and_sentences() {
    let doc = Rope::from("(foo bar-baz)\n  top level  ");
    let text = doc.slice(..);
    assert_eq!(symbol_bounds(text, &delims(), 7), Some(Span::new(5, 12)));
    assert_eq!(symbol_bounds(text, &delims(), 5), Some(Span::new(5, 12)));
    assert_eq!(symbol_bounds(text, &delims(), 4), Some(Span::new(1, 4)));
    assert_eq!(symbol_bounds(text, &delims(), 0), None);
    assert_eq!(sentence_bounds(text, &delims(), 5), Some(Span::new(1, 12)));
    assert_eq!(sentence_bounds(text, &delims(), 17), Some(Span::new(16, 25)));
  }

  #[test]
  fn anchor_is_a_column_zero_open() {
    let doc = Rope::from("(a)\n\n(b\n c)");
    let text = doc.slice(..);
    assert_eq!(defun_start(text, &delims(), 10), 5);
    assert_eq!(defun_start(text, &delims(), 5), 0);
    assert_eq!(defun_start(text, &delims(), 2), 0);
  }

  #[test]
  fn column_zero_parens_in_strings_and_lists_are_not_anchors() {
    let doc = Rope::from("(defun f ()\n  \"Doc\n(x) here\" y)");
    let text = doc.slice(..);
    assert_eq!(defun_start(text, &delims(), 29), 0);
    assert_eq!(classify(text, &delims(), 29), Context::Code);
    assert_eq!(classify(text, &delims(), 20), Context::InString);

    let doc = Rope::from("(a\n(b)\n c)");
    let text = doc.slice(..);
    assert_eq!(defun_start(text, &delims(), 10), 0);
    assert_eq!(match_open(text, &delims(), 9), Some(0));
    assert_eq!(lex(text, &delims(), 6).depth(), 1);
  }

  #[test]
  fn mismatched_pairs_are_unbalanced() {
    let doc = Rope::from("(a]");
    assert!(!is_balanced(doc.slice(..), &delims()));
    let doc = Rope::from("(a))");
    assert!(!is_balanced(doc.slice(..), &delims()));
  }
}
