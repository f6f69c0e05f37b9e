//! Per-buffer editing state.
//!
//! A [`Session`] binds a resolved [`Config`] to one dialect and carries the
//! little state commands need between invocations. Commands are run through
//! [`Session::execute`] (by name) or [`Session::press`] (by key, through the
//! dispatch shim).

use sexp_core::Delimiters;

use crate::{
  buffer::Buffer,
  command::{
    Command,
    CommandError,
    Outcome,
  },
  config::{
    self,
    Config,
  },
  dispatch,
  eval::{
    self,
    Dialect,
    EvaluatorRegistry,
  },
  keymap::Keymap,
  movement::Direction,
  navigate,
  relocate,
  selector::{
    self,
    Selector,
  },
  tags::{
    self,
    TagSource,
  },
  transform,
};

/// Host services some commands need. Commands that need a missing one fail
/// with [`CommandError::MissingCollaborator`].
#[derive(Default)]
pub struct Collaborators<'a> {
  pub selector: Option<&'a mut dyn Selector>,
  pub tags:     Option<&'a mut dyn TagSource>,
}

impl<'a> Collaborators<'a> {
  pub fn none() -> Self {
    Self::default()
  }

  pub fn with_selector(mut self, selector: &'a mut dyn Selector) -> Self {
    self.selector = Some(selector);
    self
  }

  pub fn with_tags(mut self, tags: &'a mut dyn TagSource) -> Self {
    self.tags = Some(tags);
    self
  }

  fn selector(&mut self, command: Command) -> Result<&mut dyn Selector, CommandError> {
    match self.selector.as_deref_mut() {
      Some(selector) => Ok(selector),
      None => {
        Err(CommandError::MissingCollaborator {
          command,
          collaborator: "selector",
        })
      },
    }
  }

  fn tags(&mut self, command: Command) -> Result<&mut dyn TagSource, CommandError> {
    match self.tags.as_deref_mut() {
      Some(tags) => Ok(tags),
      None => {
        Err(CommandError::MissingCollaborator {
          command,
          collaborator: "tag source",
        })
      },
    }
  }
}

#[derive(Debug)]
pub struct Session {
  /// Settings with the dialect overrides already applied.
  pub config:     Config,
  pub dialect:    Dialect,
  pub keymap:     Keymap,
  pub evaluators: EvaluatorRegistry,
  /// Where `end-of-line` started from, so the next one can go back.
  last_eol:       Option<usize>,
}

impl Session {
  pub fn new(config: &Config, dialect: impl Into<Dialect>) -> config::Result<Self> {
    let dialect = dialect.into();
    let config = config.for_dialect(&dialect);
    let keymap = config.keymap()?;
    tracing::debug!(%dialect, keys = keymap.iter().count(), "session started");
    Ok(Self {
      config,
      dialect,
      keymap,
      evaluators: EvaluatorRegistry::new(),
      last_eol: None,
    })
  }

  pub fn delimiters(&self) -> &Delimiters {
    &self.config.delimiters
  }

  /// Run `command` `count` times where that makes sense. Edits start a new
  /// undo step.
  pub fn execute<B: Buffer + ?Sized>(
    &mut self,
    buffer: &mut B,
    command: Command,
    count: usize,
    collaborators: &mut Collaborators,
  ) -> Result<Outcome, CommandError> {
    tracing::trace!(%command, count, cursor = buffer.cursor(), "executing");
    if command.is_edit() {
      buffer.undo_boundary();
    }
    if command != Command::EndOfLine {
      self.last_eol = None;
    }

    let delims = &self.config.delimiters;
    let n = count;
    let edited = |result: transform::Result<()>| result.map(|()| Outcome::Edited);
    let outcome = match command {
      Command::Forward => Outcome::Moved(navigate::forward_list(buffer, delims, n)),
      Command::Backward => Outcome::Moved(navigate::backward_list(buffer, delims, n)),
      Command::OutForward => Outcome::Moved(navigate::outward(buffer, delims, n, Direction::Forward)?),
      Command::OutBackward => {
        Outcome::Moved(navigate::outward(buffer, delims, n, Direction::Backward)?)
      },
      Command::Flow => Outcome::Moved(navigate::flow(buffer, delims, n)),
      Command::Different => Outcome::Moved(navigate::different(buffer, delims)),
      Command::Clockwise => Outcome::Moved(navigate::clockwise(buffer, delims)),
      Command::Counterclockwise => Outcome::Moved(navigate::counterclockwise(buffer, delims)),
      Command::EndOfLine => {
        Outcome::Moved(navigate::move_end_of_line(buffer, delims, &mut self.last_eol))
      },
      Command::JumpParen => {
        let selector = collaborators.selector(command)?;
        moved_or_cancelled(selector::jump_paren(buffer, delims, selector))
      },
      Command::JumpSymbol => {
        let selector = collaborators.selector(command)?;
        moved_or_cancelled(selector::jump_symbol(buffer, delims, selector))
      },
      Command::Goto => {
        let Collaborators { selector, tags } = collaborators;
        let (Some(selector), Some(tags)) = (selector.as_deref_mut(), tags.as_deref_mut()) else {
          return Err(CommandError::MissingCollaborator {
            command,
            collaborator: "selector and tag source",
          });
        };
        moved_or_cancelled(tags::goto_definition(
          buffer,
          delims,
          tags,
          selector,
          &self.config.tag_arity,
        ))
      },
      Command::Follow => {
        let tags = collaborators.tags(command)?;
        Outcome::Moved(tags::follow(buffer, delims, tags))
      },

      Command::Slurp => edited(transform::slurp(buffer, delims, n))?,
      Command::SlurpForward => edited(transform::slurp_forward(buffer, delims, n))?,
      Command::SlurpBackward => edited(transform::slurp_backward(buffer, delims, n))?,
      Command::Barf => edited(transform::barf(buffer, delims, n))?,
      Command::BarfForward => edited(transform::barf_forward(buffer, delims, n))?,
      Command::BarfBackward => edited(transform::barf_backward(buffer, delims, n))?,
      Command::Splice => edited(transform::splice(buffer, delims))?,
      Command::Raise => edited(transform::raise(buffer, delims, n))?,
      Command::RaiseSome => edited(transform::raise_some(buffer, delims))?,
      Command::Convolute => edited(transform::convolute(buffer, delims))?,
      Command::Join => edited(transform::join(buffer, delims))?,
      Command::Split => edited(transform::split(buffer, delims))?,
      Command::Wrap => edited(transform::wrap(buffer, delims, '('))?,
      Command::Parens => edited(transform::insert_pair(buffer, delims, '(', self.config.no_space))?,
      Command::Brackets => edited(transform::insert_pair(buffer, delims, '[', self.config.no_space))?,
      Command::Braces => edited(transform::insert_pair(buffer, delims, '{', self.config.no_space))?,

      Command::Clone => edited(relocate::clone(buffer, delims, n))?,
      Command::MoveUp => edited(relocate::move_up(buffer, delims))?,
      Command::MoveDown => edited(relocate::move_down(buffer, delims))?,
      Command::Teleport => {
        let selector = collaborators.selector(command)?;
        if relocate::teleport(buffer, delims, n, selector)? {
          Outcome::Edited
        } else {
          Outcome::Cancelled
        }
      },

      Command::Eval => {
        Outcome::Evaluated(eval::eval(
          buffer,
          delims,
          &mut self.evaluators,
          &self.dialect,
        )?)
      },
      Command::EvalAndReplace => {
        Outcome::Evaluated(eval::eval_and_replace(
          buffer,
          delims,
          &mut self.evaluators,
          &self.dialect,
        )?)
      },
    };
    tracing::debug!(%command, ?outcome, cursor = buffer.cursor(), "executed");
    Ok(outcome)
  }

  /// Handle a printable key: run its command when the cursor is in a
  /// structural position, insert it otherwise.
  pub fn press<B: Buffer + ?Sized>(
    &mut self,
    buffer: &mut B,
    key: char,
    count: usize,
    collaborators: &mut Collaborators,
  ) -> Result<Outcome, CommandError> {
    dispatch::dispatch(self, buffer, key, count, collaborators)
  }
}

fn moved_or_cancelled(moved: bool) -> Outcome {
  if moved { Outcome::Moved(true) } else { Outcome::Cancelled }
}
