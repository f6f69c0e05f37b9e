//! Choosing a position among candidates.
//!
//! Jump and teleport commands do not decide where to go themselves. They
//! collect candidate positions and hand them to a [`Selector`], which in an
//! editor would be an overlay with hint letters. Returning `None` cancels
//! the command without touching the buffer.

use sexp_core::{
  Delimiters,
  Span,
};

use crate::{
  bounds::List,
  buffer::Buffer,
  lexer::{
    self,
    TokenKind,
  },
};

pub trait Selector {
  /// Pick one of `candidates` (sorted buffer positions), or `None` to cancel.
  fn choose_target(&mut self, candidates: &[usize]) -> Option<usize>;
}

/// Always picks the candidate at a fixed index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NthSelector(pub usize);

impl Selector for NthSelector {
  fn choose_target(&mut self, candidates: &[usize]) -> Option<usize> {
    candidates.get(self.0).copied()
  }
}

/// Adapts a closure.
pub struct FnSelector<F>(pub F);

impl<F> Selector for FnSelector<F>
where
  F: FnMut(&[usize]) -> Option<usize>,
{
  fn choose_target(&mut self, candidates: &[usize]) -> Option<usize> {
    (self.0)(candidates)
  }
}

/// Ask `selector`, treating a pick outside `candidates` as a cancel.
pub fn choose(selector: &mut dyn Selector, candidates: &[usize]) -> Option<usize> {
  if candidates.is_empty() {
    return None;
  }
  let chosen = selector.choose_target(candidates)?;
  if candidates.binary_search(&chosen).is_err() {
    tracing::debug!(chosen, "selector picked a non-candidate, cancelling");
    return None;
  }
  Some(chosen)
}

/// Where jumps look: the list around the cursor, or the whole text at top
/// level.
fn jump_region<B: Buffer + ?Sized>(buffer: &B, delims: &Delimiters) -> Span {
  let text = buffer.text();
  List::enclosing(text, delims, buffer.cursor())
    .map_or(Span::new(0, text.len_chars()), |list| list.inner())
}

fn tokens_in<B: Buffer + ?Sized>(
  buffer: &B,
  delims: &Delimiters,
  kind: TokenKind,
) -> Vec<lexer::Token> {
  let text = buffer.text();
  let region = jump_region(buffer, delims);
  lexer::tokens(text, delims, region.begin)
    .take_while(|token| token.span.end <= region.end)
    .filter(|token| token.is(kind))
    .collect()
}

/// Jump to a list start inside the current list.
pub fn jump_paren<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  selector: &mut dyn Selector,
) -> bool {
  let candidates: Vec<usize> = tokens_in(buffer, delims, TokenKind::Open)
    .iter()
    .map(|token| token.span.begin)
    .collect();
  match choose(selector, &candidates) {
    Some(target) => {
      buffer.clear_selection();
      buffer.set_cursor(target);
      true
    },
    None => false,
  }
}

/// Select a symbol inside the current list.
pub fn jump_symbol<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  selector: &mut dyn Selector,
) -> bool {
  let symbols = tokens_in(buffer, delims, TokenKind::Symbol);
  let candidates: Vec<usize> = symbols.iter().map(|token| token.span.begin).collect();
  let Some(target) = choose(selector, &candidates) else {
    return false;
  };
  match symbols.iter().find(|token| token.span.begin == target) {
    Some(token) => {
      buffer.set_selection(token.span.begin, token.span.end);
      true
    },
    None => false,
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::buffer::RopeBuffer;

  #[test]
  fn non_candidates_cancel() {
    let mut odd = FnSelector(|_: &[usize]| Some(7));
    assert_eq!(choose(&mut odd, &[1, 4, 9]), None);
    assert_eq!(choose(&mut NthSelector(1), &[1, 4, 9]), Some(4));
    assert_eq!(choose(&mut NthSelector(5), &[1, 4, 9]), None);
    assert_eq!(choose(&mut NthSelector(0), &[]), None);
  }

  #[test]
  fn jumps_stay_in_the_current_list() {
    let delims = Delimiters::default();
    let mut buffer = RopeBuffer::new("(a (b \"(s)\" (c)) d) (e)");
    buffer.set_cursor(1);
    assert!(jump_paren(&mut buffer, &delims, &mut NthSelector(1)));
    assert_eq!(buffer.cursor(), 12);
    assert!(!jump_paren(&mut buffer, &delims, &mut NthSelector(9)));

    buffer.set_cursor(1);
    assert!(jump_symbol(&mut buffer, &delims, &mut NthSelector(3)));
    assert_eq!(buffer.render(), "(a (b \"(s)\" (c)) [d]) (e)");
  }
}
