//! Character model shared by the structural editing crates.
//!
//! - [`delimiters`] describes which characters open and close lists, quote
//!   strings, start comments and prefix forms.
//! - [`span`] is the half-open character range every other crate talks in.
//! - [`chars`] categorizes single characters against a delimiter set.

pub mod chars;
pub mod delimiters;
pub mod span;

pub use delimiters::{
  Delimiters,
  Pair,
};
pub use span::Span;
