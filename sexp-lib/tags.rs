//! Definitions for goto and follow.
//!
//! Where definitions come from is up to the host (a tags file, a language
//! server). [`TopLevelDefinitions`] is the lexical fallback: every top-level
//! list whose head starts with `def`.

use std::collections::HashMap;

use ropey::RopeSlice;
use sexp_core::{
  Delimiters,
  Span,
  chars::char_is_line_ending,
};

use crate::{
  bounds::List,
  buffer::Buffer,
  lexer::{
    self,
    TokenKind,
  },
  selector::{
    self,
    Selector,
  },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
  pub name:     String,
  /// Head of the defining form, `defun`, `defmacro`, ...
  pub kind:     String,
  /// Opening delimiter of the defining form.
  pub location: usize,
}

pub trait TagSource {
  fn list_definitions(&mut self, text: RopeSlice) -> Vec<Tag>;
}

/// Top-level `(def... name ...)` forms.
#[derive(Debug, Clone, Default)]
pub struct TopLevelDefinitions {
  pub delimiters: Delimiters,
}

impl TopLevelDefinitions {
  pub fn new(delimiters: Delimiters) -> Self {
    Self { delimiters }
  }

  fn definition(&self, text: RopeSlice, list: &List) -> Option<Tag> {
    let children = list.children(text, &self.delimiters);
    let head = children.first()?;
    let kind = text.slice(head.begin..head.end).to_string();
    if !kind.starts_with("def") {
      return None;
    }
    // `(define (name args) ...)` names the function by the inner head
    let name = children.get(1).and_then(|span| {
      match List::from_open(text, &self.delimiters, span.begin) {
        Some(inner) => inner.children(text, &self.delimiters).first().copied(),
        None => Some(*span),
      }
    })?;
    Some(Tag {
      name: text.slice(name.begin..name.end).to_string(),
      kind,
      location: list.open,
    })
  }
}

impl TagSource for TopLevelDefinitions {
  fn list_definitions(&mut self, text: RopeSlice) -> Vec<Tag> {
    let mut depth = 0usize;
    let mut tags = Vec::new();
    for token in lexer::tokens(text, &self.delimiters, 0) {
      match token.kind {
        TokenKind::Open => {
          if depth == 0
            && let Some(list) = List::from_open(text, &self.delimiters, token.span.begin)
            && let Some(tag) = self.definition(text, &list)
          {
            tags.push(tag);
          }
          depth += 1;
        },
        TokenKind::Close => depth = depth.saturating_sub(1),
        _ => {},
      }
    }
    tags
  }
}

/// First line of the `nth` element of the form at `location`, if there is
/// one.
fn element_line(text: RopeSlice, delims: &Delimiters, location: usize, nth: usize) -> Option<String> {
  let list = List::from_open(text, delims, location)?;
  let element: Span = *list.children(text, delims).get(nth)?;
  let first_line: String = text
    .slice(element.begin..element.end)
    .chars()
    .take_while(|&ch| !char_is_line_ending(ch))
    .collect();
  Some(first_line)
}

/// `"{kind} {name}"`, followed by the element the arity table names for
/// this kind (usually the argument list).
pub fn format_label(tag: &Tag, text: RopeSlice, delims: &Delimiters, arity: &HashMap<String, usize>) -> String {
  let mut label = format!("{} {}", tag.kind, tag.name);
  if let Some(&nth) = arity.get(&tag.kind)
    && let Some(element) = element_line(text, delims, tag.location, nth)
  {
    label.push(' ');
    label.push_str(&element);
  }
  label
}

pub fn labels(tags: &[Tag], text: RopeSlice, delims: &Delimiters, arity: &HashMap<String, usize>) -> Vec<String> {
  tags
    .iter()
    .map(|tag| format_label(tag, text, delims, arity))
    .collect()
}

/// Let `selector` pick a definition and move there.
pub fn goto_definition<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  source: &mut dyn TagSource,
  selector: &mut dyn Selector,
  arity: &HashMap<String, usize>,
) -> bool {
  let text = buffer.text();
  let mut tags = source.list_definitions(text);
  tags.sort_by_key(|tag| tag.location);
  for label in labels(&tags, text, delims, arity) {
    tracing::trace!(%label, "definition");
  }
  let candidates: Vec<usize> = tags.iter().map(|tag| tag.location).collect();
  match selector::choose(selector, &candidates) {
    Some(location) => {
      buffer.clear_selection();
      buffer.set_cursor(location);
      true
    },
    None => false,
  }
}

/// Jump to the definition of the symbol at point.
pub fn follow<B: Buffer + ?Sized>(buffer: &mut B, delims: &Delimiters, source: &mut dyn TagSource) -> bool {
  let text = buffer.text();
  let Some(symbol) = lexer::symbol_bounds(text, delims, buffer.cursor()) else {
    return false;
  };
  let name = text.slice(symbol.begin..symbol.end).to_string();
  let found = source
    .list_definitions(text)
    .into_iter()
    .find(|tag| tag.name == name);
  match found {
    Some(tag) => {
      tracing::debug!(name, location = tag.location, "following definition");
      buffer.clear_selection();
      buffer.set_cursor(tag.location);
      true
    },
    None => false,
  }
}
