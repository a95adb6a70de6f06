//! Selector matching
//!
//! The locator only needs a small slice of the selector language: compound
//! selectors built from a tag name, `.class` parts, and `[class*='...']`
//! attribute-substring parts. Anything else is a parse error, which the
//! locator treats as a non-match rather than a fault.

use thiserror::Error;

/// Selector parse errors
#[derive(Error, Debug, PartialEq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("unterminated attribute selector")]
    UnterminatedAttribute,

    #[error("unsupported attribute selector: {0}")]
    UnsupportedAttribute(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    /// Element tag name, compared case-insensitively
    Tag(String),
    /// Exact class-list membership
    Class(String),
    /// Substring match against the space-joined class attribute
    ClassContains(String),
}

/// A parsed compound selector. All parts must match one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    parts: Vec<Part>,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SelectorError::Empty);
        }

        let chars: Vec<char> = input.chars().collect();
        let mut parts = Vec::new();
        let mut pos = 0;

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    let (name, next) = read_name(&chars, pos + 1);
                    if name.is_empty() {
                        return Err(SelectorError::UnexpectedChar('.', pos));
                    }
                    parts.push(Part::Class(name));
                    pos = next;
                }
                '[' => {
                    let close = chars[pos..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|i| pos + i)
                        .ok_or(SelectorError::UnterminatedAttribute)?;
                    let body: String = chars[pos + 1..close].iter().collect();
                    parts.push(parse_attribute(&body)?);
                    pos = close + 1;
                }
                c if c.is_ascii_alphabetic() => {
                    if !parts.is_empty() {
                        // A tag may only lead a compound selector
                        return Err(SelectorError::UnexpectedChar(c, pos));
                    }
                    let (name, next) = read_name(&chars, pos);
                    parts.push(Part::Tag(name));
                    pos = next;
                }
                c => return Err(SelectorError::UnexpectedChar(c, pos)),
            }
        }

        Ok(Self { parts })
    }

    /// Whether a node with the given tag and class list matches
    pub fn matches(&self, tag: &str, classes: &[String]) -> bool {
        self.parts.iter().all(|part| match part {
            Part::Tag(t) => tag.eq_ignore_ascii_case(t),
            Part::Class(c) => classes.iter().any(|cl| cl == c),
            Part::ClassContains(s) => classes.join(" ").contains(s.as_str()),
        })
    }
}

fn read_name(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() {
        let c = chars[end];
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            end += 1;
        } else {
            break;
        }
    }
    (chars[start..end].iter().collect(), end)
}

/// Parse the inside of `[...]`. Only `class*='value'` is supported.
fn parse_attribute(body: &str) -> Result<Part, SelectorError> {
    let rest = body
        .strip_prefix("class*=")
        .ok_or_else(|| SelectorError::UnsupportedAttribute(body.to_string()))?;
    let value = rest
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| rest.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .ok_or_else(|| SelectorError::UnsupportedAttribute(body.to_string()))?;
    if value.is_empty() {
        return Err(SelectorError::UnsupportedAttribute(body.to_string()));
    }
    Ok(Part::ClassContains(value.to_string()))
}
