//! G-code word splitting.
//!
//! Accepts both `X10` and `X 10`; a word starting with `#` ends the line.

use crate::error::ParseError;

/// Comment marker.
pub const COMMENT: char = '#';

/// One command letter with its numeric argument, still as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word<'a> {
    /// Uppercased command letter.
    pub letter: char,
    pub argument: &'a str,
}

/// Split `line` into words.
///
/// # Errors
///
/// A lone letter with no argument before the end of line (or a comment) is a
/// `ParseError` naming that letter.
pub fn words(line: &str) -> Result<Vec<Word<'_>>, ParseError> {
    let mut out = Vec::new();
    let mut pending: Option<char> = None;

    for token in line.split_whitespace() {
        if token.starts_with(COMMENT) {
            break;
        }
        if let Some(letter) = pending.take() {
            out.push(Word {
                letter,
                argument: token,
            });
            continue;
        }
        let mut chars = token.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        let letter = first.to_ascii_uppercase();
        let rest = chars.as_str();
        if rest.is_empty() {
            pending = Some(letter);
        } else {
            out.push(Word {
                letter,
                argument: rest,
            });
        }
    }

    if let Some(letter) = pending {
        return Err(ParseError::new(letter, "missing argument"));
    }
    Ok(out)
}

/// `true` for lines that hold no words at all.
pub fn is_blank(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_none_or(|first| first.starts_with(COMMENT))
}
