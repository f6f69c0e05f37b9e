//! Structural editing of parenthesized text.
//!
//! The engine reads a [`buffer::Buffer`] lexically (no full parse, the
//! buffer may be unbalanced while the user types), finds the form at the
//! cursor and rewrites the tree around it: slurp, barf, splice, raise,
//! convolute, join, split, clone, move and teleport. Cursor placement and
//! whitespace cleanup after each edit are part of the operation.
//!
//! Layering, bottom up:
//!
//! - [`lexer`] classifies positions (code, string, comment) and skips forms.
//! - [`special`] decides whether the cursor sits in a command position.
//! - [`bounds`] finds the thing at point.
//! - [`navigate`] moves between lists without editing.
//! - [`transform`] and [`relocate`] edit, via [`transaction::Transaction`].
//! - [`dispatch`] and [`session`] route keys to commands.

pub mod bounds;
pub mod buffer;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod eval;
pub mod gaps;
pub mod keymap;
pub mod lexer;
pub mod movement;
pub mod navigate;
pub mod relocate;
pub mod selection;
pub mod selector;
pub mod session;
pub mod special;
pub mod tags;
pub mod transaction;
pub mod transform;

use smartstring::{
  LazyCompact,
  SmartString,
};

pub type Tendril = SmartString<LazyCompact>;
