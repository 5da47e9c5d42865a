//! Canonical text for tokens and filter values

use std::borrow::Cow;
use std::fmt::{self, Display, Write};

use itertools::Itertools;

use crate::parser::{FilterToken, Token, TokenKind};

impl Display for FilterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_char('!')?;
        }
        write!(f, "{}:{}{}", self.key, self.operator, self.value)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Filter(filter) => write!(f, "{}", filter),
            TokenKind::LogicGroup { inner } => {
                f.write_char('(')?;
                for token in inner {
                    write!(f, "{}", token)?;
                }
                f.write_char(')')
            }
            // leaves and values render as they were typed
            _ => f.write_str(&self.text),
        }
    }
}

/// Re-serialize a single token
pub fn stringify_token(token: &Token) -> String {
    token.to_string()
}

pub fn stringify_tokens(tokens: &[Token]) -> String {
    tokens.iter().join("")
}

/// Serialize a multi-value filter value: duplicates and empty strings are
/// dropped, then zero values give `""`, one value gives the bare value and
/// more give `[a,b]`.
pub fn format_multi_value<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let owned: Vec<S> = values.into_iter().collect();
    let values: Vec<&str> = owned
        .iter()
        .map(|v| v.as_ref())
        .filter(|v| !v.is_empty())
        .unique()
        .collect();

    match values.as_slice() {
        [] => String::new(),
        [single] => single.to_string(),
        many => format!("[{}]", many.join(",")),
    }
}

/// Quote a filter value when it would not survive as a bare value or list item
pub fn escape_filter_value(value: &str) -> Cow<'_, str> {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | ',' | '[' | ']' | '"'));

    if !needs_quotes {
        return Cow::Borrowed(value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}
