use crate::delimiters::Delimiters;

#[derive(Debug, Eq, PartialEq)]
pub enum CharCategory {
  Whitespace,
  Eol,
  Open,
  Close,
  Quote,
  Escape,
  Prefix,
  Symbol,
}

/// Categorize `ch` against a delimiter set. Comment markers are not a
/// category of their own since they may span several characters.
pub fn categorize_char(ch: char, delims: &Delimiters) -> CharCategory {
  match ch {
    c if char_is_line_ending(c) => CharCategory::Eol,
    c if char_is_whitespace(c) => CharCategory::Whitespace,
    c if delims.is_open(c) => CharCategory::Open,
    c if delims.is_close(c) => CharCategory::Close,
    c if delims.is_quote(c) => CharCategory::Quote,
    c if delims.is_escape(c) => CharCategory::Escape,
    c if delims.is_prefix(c) => CharCategory::Prefix,
    _ => CharCategory::Symbol,
  }
}

#[inline]
pub fn char_is_line_ending(ch: char) -> bool {
  matches!(
    ch,
    '\u{000A}' | '\u{000B}' | '\u{000C}' | '\u{000D}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
  )
}

/// Whitespace that does not end a line.
#[inline]
pub fn char_is_whitespace(ch: char) -> bool {
  ch.is_whitespace() && !char_is_line_ending(ch)
}

/// Any whitespace, line endings included.
#[inline]
pub fn char_is_blank(ch: char) -> bool {
  ch.is_whitespace()
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn categories() {
    let delims = Delimiters::default();
    assert_eq!(categorize_char('\n', &delims), CharCategory::Eol);
    assert_eq!(categorize_char('\t', &delims), CharCategory::Whitespace);
    assert_eq!(categorize_char('[', &delims), CharCategory::Open);
    assert_eq!(categorize_char('}', &delims), CharCategory::Close);
    assert_eq!(categorize_char('"', &delims), CharCategory::Quote);
    assert_eq!(categorize_char('\\', &delims), CharCategory::Escape);
    assert_eq!(categorize_char('`', &delims), CharCategory::Prefix);
    assert_eq!(categorize_char('x', &delims), CharCategory::Symbol);
  }

  #[test]
  fn whitespace_excludes_line_endings() {
    assert!(char_is_whitespace(' '));
    assert!(!char_is_whitespace('\n'));
    assert!(char_is_blank('\n'));
    assert!(!char_is_blank('a'));
  }
}
