//! Line tokenizer for DD documents.
//!
//! A line is cut at the first `#`, then split on whitespace. A token may be
//! wrapped in double quotes to carry embedded whitespace; the closing quote
//! must be followed by whitespace or the end of the line, and quotes may not
//! appear inside an unquoted token.

use crate::trim::{trim_end_counted, trim_start_counted};
use crate::TokenError;

pub const COMMENT: char = '#';
pub const QUOTE: char = '"';

/// Split one line into tokens. Blank and comment-only lines yield an empty
/// vector.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenError> {
    let code = match line.find(COMMENT) {
        Some(idx) => &line[..idx],
        None => line,
    };
    let (mut rest, _) = trim_end_counted(code);
    // chars of the original line already consumed ahead of `rest`
    let mut consumed = 0usize;
    let mut tokens = Vec::new();

    loop {
        let (trimmed, leading) = trim_start_counted(rest);
        consumed += leading;
        rest = trimmed;
        if rest.is_empty() {
            return Ok(tokens);
        }

        if let Some(body) = rest.strip_prefix(QUOTE) {
            let close = body.find(QUOTE).ok_or(TokenError::UnclosedQuote {
                column: consumed + 1,
            })?;
            let token = &body[..close];
            let width = token.chars().count();
            let after = &body[close + QUOTE.len_utf8()..];
            if after.starts_with(|c: char| !c.is_whitespace()) {
                return Err(TokenError::IllegalQuotePlacement {
                    column: consumed + width + 2,
                });
            }
            tokens.push(token.to_string());
            consumed += width + 2;
            rest = after;
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let word = &rest[..end];
            if let Some(q) = word.find(QUOTE) {
                return Err(TokenError::IllegalQuotePlacement {
                    column: consumed + word[..q].chars().count() + 1,
                });
            }
            tokens.push(word.to_string());
            consumed += word.chars().count();
            rest = &rest[end..];
        }
    }
}

/// Render tokens back into a line that tokenizes to the same sequence.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| {
            let t = t.as_ref();
            if t.is_empty() || t.contains(char::is_whitespace) || t.contains(COMMENT) {
                format!("{QUOTE}{t}{QUOTE}")
            } else {
                t.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
