//! Evaluating the form at point.
//!
//! The engine has no interpreter of its own. Hosts register an
//! [`Evaluator`] per [`Dialect`]; the session picks the one matching its
//! dialect and hands it the text [`bounds_dwim`] resolves to.

use std::{
  collections::HashMap,
  fmt,
};

use sexp_core::Delimiters;
use thiserror::Error;

use crate::{
  bounds::bounds_dwim,
  buffer::Buffer,
  transaction::{
    Transaction,
    TransactionError,
  },
};

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
  #[error("no evaluator registered for {dialect}")]
  UnsupportedDialect { dialect: Dialect },
  #[error("nothing to evaluate at point")]
  NothingToEvaluate,
  #[error("evaluation failed: {0}")]
  Failed(String),
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

/// Name of a lisp flavour, `elisp`, `clojure`, ...
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dialect(pub String);

impl Dialect {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for Dialect {
  fn from(name: &str) -> Self {
    Self(name.to_string())
  }
}

impl fmt::Display for Dialect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

pub trait Evaluator {
  fn evaluate(&mut self, source: &str) -> Result<String>;
}

/// Adapts a closure.
pub struct FnEvaluator<F>(pub F);

impl<F> Evaluator for FnEvaluator<F>
where
  F: FnMut(&str) -> Result<String>,
{
  fn evaluate(&mut self, source: &str) -> Result<String> {
    (self.0)(source)
  }
}

#[derive(Default)]
pub struct EvaluatorRegistry {
  evaluators: HashMap<Dialect, Box<dyn Evaluator>>,
}

impl fmt::Debug for EvaluatorRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut dialects: Vec<_> = self.evaluators.keys().collect();
    dialects.sort();
    f.debug_struct("EvaluatorRegistry")
      .field("dialects", &dialects)
      .finish()
  }
}

impl EvaluatorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `evaluator` for `dialect`, returning the one it replaces.
  pub fn register(
    &mut self,
    dialect: impl Into<Dialect>,
    evaluator: Box<dyn Evaluator>,
  ) -> Option<Box<dyn Evaluator>> {
    self.evaluators.insert(dialect.into(), evaluator)
  }

  pub fn contains(&self, dialect: &Dialect) -> bool {
    self.evaluators.contains_key(dialect)
  }

  pub fn get_mut(&mut self, dialect: &Dialect) -> Result<&mut dyn Evaluator> {
    match self.evaluators.get_mut(dialect) {
      Some(evaluator) => Ok(evaluator.as_mut()),
      None => {
        Err(EvalError::UnsupportedDialect {
          dialect: dialect.clone(),
        })
      },
    }
  }
}

/// Evaluate the form at point and return the result.
pub fn eval<B: Buffer + ?Sized>(
  buffer: &B,
  delims: &Delimiters,
  registry: &mut EvaluatorRegistry,
  dialect: &Dialect,
) -> Result<String> {
  let evaluator = registry.get_mut(dialect)?;
  let span = bounds_dwim(buffer, delims).ok_or(EvalError::NothingToEvaluate)?;
  let source = buffer.substring(span);
  tracing::debug!(%dialect, %span, "evaluating");
  evaluator.evaluate(&source)
}

/// Replace the form at point with its value. The cursor ends up after the
/// value.
pub fn eval_and_replace<B: Buffer + ?Sized>(
  buffer: &mut B,
  delims: &Delimiters,
  registry: &mut EvaluatorRegistry,
  dialect: &Dialect,
) -> Result<String> {
  let evaluator = registry.get_mut(dialect)?;
  let span = bounds_dwim(buffer, delims).ok_or(EvalError::NothingToEvaluate)?;
  let value = evaluator.evaluate(&buffer.substring(span))?;

  let tx = Transaction::change(
    buffer.text(),
    [(span.begin, span.end, Some(value.as_str().into()))],
  )?;
  tx.apply(buffer)?;
  buffer.clear_selection();
  buffer.set_cursor(span.begin + value.chars().count());
  Ok(value)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::buffer::RopeBuffer;

  fn registry() -> EvaluatorRegistry {
    let mut registry = EvaluatorRegistry::new();
    registry.register(
      "calc",
      Box::new(FnEvaluator(|source: &str| {
        let sum: i64 = source
          .trim_matches(|ch| ch == '(' || ch == ')')
          .split_whitespace()
          .skip(1)
          .map(|arg| arg.parse::<i64>().map_err(|err| EvalError::Failed(err.to_string())))
          .sum::<Result<i64>>()?;
        Ok(sum.to_string())
      })),
    );
    registry
  }

  #[test]
  fn evaluates_the_form_at_point() {
    let delims = Delimiters::default();
    let mut registry = registry();
    let calc = Dialect::from("calc");

    let mut buffer = RopeBuffer::new("(list (+ 1 2) 4)");
    buffer.set_cursor(6);
    assert_eq!(eval(&buffer, &delims, &mut registry, &calc).unwrap(), "3");

    assert_eq!(
      eval_and_replace(&mut buffer, &delims, &mut registry, &calc).unwrap(),
      "3"
    );
    assert_eq!(buffer.render(), "(list 3| 4)");
  }

  #[test]
  fn failures_are_surfaced() {
    let delims = Delimiters::default();
    let mut registry = registry();
    let mut buffer = RopeBuffer::new("(+ 1 x)");
    buffer.set_cursor(0);

    let elisp = Dialect::from("elisp");
    assert!(matches!(
      eval(&buffer, &delims, &mut registry, &elisp),
      Err(EvalError::UnsupportedDialect { dialect }) if dialect == elisp
    ));
    assert!(matches!(
      eval_and_replace(&mut buffer, &delims, &mut registry, &Dialect::from("calc")),
      Err(EvalError::Failed(_))
    ));
    assert_eq!(buffer.render(), "|(+ 1 x)");
  }
}
