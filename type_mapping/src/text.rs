//! PostgreSQL text-format tokenizers
//!
//! The server returns arrays as `{a,"b c",NULL}` and composite rows as
//! `(a,"b ""c""",)`. These functions split such text into its top-level
//! elements; interpreting each element is left to the field that owns it,
//! which lets nested arrays and rows decode recursively.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum TextFormatError {
    /// Input is not wrapped in the expected delimiters
    MissingDelimiters { expected: &'static str, text: String },
    /// A quoted element or nested value never closes
    Unterminated(String),
    /// Unexpected character after an element
    UnexpectedChar { found: char, text: String },
}

impl fmt::Display for TextFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextFormatError::MissingDelimiters { expected, text } => {
                write!(f, "Expected {} around '{}'", expected, text)
            }
            TextFormatError::Unterminated(text) => {
                write!(f, "Unterminated element in '{}'", text)
            }
            TextFormatError::UnexpectedChar { found, text } => {
                write!(f, "Unexpected character '{}' in '{}'", found, text)
            }
        }
    }
}

impl std::error::Error for TextFormatError {}

/// Split an array literal such as `{King,"Dain Ironfoot",NULL}`.
///
/// Unquoted `NULL` becomes `None`. Nested arrays are returned as raw text
/// (braces included) so the element field can parse them again.
pub fn split_array_text(text: &str) -> Result<Vec<Option<String>>, TextFormatError> {
    let trimmed = text.trim();
    // arrays with non-default bounds are prefixed with e.g. "[0:2]="
    let body = match (trimmed.starts_with('['), trimmed.find('=')) {
        (true, Some(idx)) => &trimmed[idx + 1..],
        _ => trimmed,
    };
    let inner = body
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .ok_or_else(|| TextFormatError::MissingDelimiters {
            expected: "braces",
            text: text.to_string(),
        })?;

    let mut items = Vec::new();
    if inner.trim().is_empty() {
        return Ok(items);
    }

    let mut chars = inner.chars().peekable();
    loop {
        skip_whitespace(&mut chars);
        match chars.peek() {
            Some('"') => {
                chars.next();
                items.push(Some(read_array_quoted(&mut chars, text)?));
            }
            Some('{') => items.push(Some(read_nested_braces(&mut chars, text)?)),
            _ => {
                let mut buf = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    chars.next();
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            buf.push(escaped);
                        }
                        continue;
                    }
                    buf.push(c);
                }
                let element = buf.trim();
                if element.eq_ignore_ascii_case("NULL") {
                    items.push(None);
                } else {
                    items.push(Some(element.to_string()));
                }
            }
        }

        skip_whitespace(&mut chars);
        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(found) => {
                return Err(TextFormatError::UnexpectedChar {
                    found,
                    text: text.to_string(),
                })
            }
        }
    }

    Ok(items)
}

/// Split a composite row literal such as `(King,"H'Elf ""the"" Wise",)`.
///
/// An empty position is NULL; `""` inside quotes is one literal quote.
pub fn split_record_text(text: &str) -> Result<Vec<Option<String>>, TextFormatError> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| TextFormatError::MissingDelimiters {
            expected: "parentheses",
            text: text.to_string(),
        })?;

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        let mut buf = String::new();
        let mut quoted = false;
        while let Some(&c) = chars.peek() {
            match c {
                ',' => break,
                '"' => {
                    chars.next();
                    quoted = true;
                    loop {
                        match chars.next() {
                            Some('"') => {
                                if chars.peek() == Some(&'"') {
                                    chars.next();
                                    buf.push('"');
                                } else {
                                    break;
                                }
                            }
                            Some('\\') => match chars.next() {
                                Some(escaped) => buf.push(escaped),
                                None => return Err(TextFormatError::Unterminated(text.to_string())),
                            },
                            Some(other) => buf.push(other),
                            None => return Err(TextFormatError::Unterminated(text.to_string())),
                        }
                    }
                }
                '\\' => {
                    chars.next();
                    match chars.next() {
                        Some(escaped) => buf.push(escaped),
                        None => return Err(TextFormatError::Unterminated(text.to_string())),
                    }
                }
                other => {
                    chars.next();
                    buf.push(other);
                }
            }
        }

        if buf.is_empty() && !quoted {
            items.push(None);
        } else {
            items.push(Some(buf));
        }

        // the element loop only stops at a comma or at the end
        if chars.next().is_none() {
            break;
        }
    }

    Ok(items)
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn read_array_quoted(chars: &mut Peekable<Chars<'_>>, text: &str) -> Result<String, TextFormatError> {
    let mut buf = String::new();
    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some(escaped) => buf.push(escaped),
                None => return Err(TextFormatError::Unterminated(text.to_string())),
            },
            Some('"') => return Ok(buf),
            Some(c) => buf.push(c),
            None => return Err(TextFormatError::Unterminated(text.to_string())),
        }
    }
}

fn read_nested_braces(chars: &mut Peekable<Chars<'_>>, text: &str) -> Result<String, TextFormatError> {
    let mut buf = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        buf.push(c);
        match c {
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    buf.push(escaped);
                }
            }
            '"' => in_quotes = !in_quotes,
            '{' if !in_quotes => depth += 1,
            '}' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    return Ok(buf);
                }
            }
            _ => {}
        }
    }
    Err(TextFormatError::Unterminated(text.to_string()))
}
