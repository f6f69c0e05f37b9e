//! Insert-or-command key handling.
//!
//! Structural commands live on plain printable keys. The same key types
//! itself everywhere except where a structural command makes sense:
//!
//! - with an active selection,
//! - right before a list (`|(a b)`),
//! - right after a list (`(a b)|`).
//!
//! Inside strings and comments, and at the start of a line comment, the key
//! is always inserted.

use sexp_core::Delimiters;

use crate::{
  buffer::Buffer,
  command::{
    CommandError,
    Outcome,
  },
  keymap::Binding,
  lexer,
  navigate,
  session::{
    Collaborators,
    Session,
  },
  special::{
    Special,
    special_at,
    special_in,
  },
};

/// What a key press should do at the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  Execute,
  /// Step to the list start, execute, then step back.
  ExecuteFromStart,
  SelfInsert,
}

pub fn route<B: Buffer + ?Sized>(buffer: &B, delims: &Delimiters, binding: Binding) -> Route {
  if buffer.selection().is_some_and(|range| !range.is_empty()) {
    return Route::Execute;
  }
  let text = buffer.text();
  let pos = buffer.cursor();
  let state = lexer::lex(text, delims, pos);
  if !state.in_code() || delims.comment_at(text, pos) {
    return Route::SelfInsert;
  }
  match special_in(text, delims, pos, &state) {
    Some(Special::BeforeOpen) => Route::Execute,
    Some(Special::AfterClose) if binding.from_start => Route::ExecuteFromStart,
    Some(Special::AfterClose) => Route::Execute,
    None => Route::SelfInsert,
  }
}

fn self_insert<B: Buffer + ?Sized>(buffer: &mut B, key: char) -> Outcome {
  let pos = buffer.cursor();
  let mut utf8 = [0; 4];
  buffer.insert(pos, key.encode_utf8(&mut utf8));
  buffer.set_cursor(pos + 1);
  Outcome::SelfInserted(key)
}

/// Handle `key` pressed `count` times.
pub fn dispatch<B: Buffer + ?Sized>(
  session: &mut Session,
  buffer: &mut B,
  key: char,
  count: usize,
  collaborators: &mut Collaborators,
) -> Result<Outcome, CommandError> {
  let Some(binding) = session.keymap.get(key) else {
    return Ok(self_insert(buffer, key));
  };
  let route = route(buffer, session.delimiters(), binding);
  tracing::trace!(?key, command = %binding.command, ?route, "key pressed");
  match route {
    Route::SelfInsert => Ok(self_insert(buffer, key)),
    Route::Execute => session.execute(buffer, binding.command, count, collaborators),
    Route::ExecuteFromStart => {
      navigate::different(buffer, session.delimiters());
      let outcome = session.execute(buffer, binding.command, count, collaborators)?;
      let delims = session.delimiters();
      if special_at(buffer, delims) == Some(Special::BeforeOpen) {
        navigate::different(buffer, delims);
      }
      Ok(outcome)
    },
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    buffer::RopeBuffer,
    command::Command,
    config::Config,
  };

  fn press(text: &str, pos: usize, key: char) -> (Outcome, String) {
    let mut session = Session::new(&Config::builtin().unwrap(), "elisp").unwrap();
    let mut buffer = RopeBuffer::new(text);
    buffer.set_cursor(pos);
    let outcome = session
      .press(&mut buffer, key, 1, &mut Collaborators::none())
      .unwrap();
    (outcome, buffer.render())
  }

  #[test]
  fn structural_positions_run_commands() {
    assert_eq!(
      press("(a (b c) d)", 3, '>'),
      (Outcome::Edited, "(a |(b c d))".to_string())
    );
    assert_eq!(
      press("(foo bar)", 9, '<'),
      (Outcome::Edited, "(foo)| bar".to_string())
    );
  }

  #[test]
  fn other_positions_insert_the_key() {
    assert_eq!(
      press("(a b)", 2, '>'),
      (Outcome::SelfInserted('>'), "(a>| b)".to_string())
    );
    assert_eq!(
      press("(a \"(b)\")", 4, 'r'),
      (Outcome::SelfInserted('r'), "(a \"r|(b)\")".to_string())
    );
    assert_eq!(
      press("(a ; (b)\n)", 5, 'r'),
      (Outcome::SelfInserted('r'), "(a ; r|(b)\n)".to_string())
    );
    assert_eq!(
      press("(a) ;; x", 4, 'r'),
      (Outcome::SelfInserted('r'), "(a) r|;; x".to_string())
    );
    assert_eq!(
      press("(a)", 3, 'z'),
      (Outcome::SelfInserted('z'), "(a)z|".to_string())
    );
  }

  #[test]
  fn selection_always_runs_commands() {
    let mut session = Session::new(&Config::builtin().unwrap(), "elisp").unwrap();
    let mut buffer = RopeBuffer::new("(a b c)");
    buffer.set_selection(3, 4);
    let outcome = session
      .press(&mut buffer, 'l', 1, &mut Collaborators::none())
      .unwrap();
    assert_eq!(outcome, Outcome::Moved(true));
    assert_eq!(buffer.render(), "(a c) [b]");
  }

  #[test]
  fn from_start_runs_on_the_open_side() {
    let mut session = Session::new(&Config::builtin().unwrap(), "elisp").unwrap();
    session
      .keymap
      .bind('m', Binding::new(Command::RaiseSome).from_start());
    let mut buffer = RopeBuffer::new("(x (a) (b) (c))");
    buffer.set_cursor(10);
    let outcome = session
      .press(&mut buffer, 'm', 1, &mut Collaborators::none())
      .unwrap();
    assert_eq!(outcome, Outcome::Edited);
    assert_eq!(buffer.render(), "(b)| (c)");
  }
}
