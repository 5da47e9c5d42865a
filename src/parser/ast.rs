#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

/// Half-open byte range into the query string a token was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slice `query` by this span, `None` if out of bounds or off a char boundary
    pub fn slice<'q>(&self, query: &'q str) -> Option<&'q str> {
        if self.start > self.end {
            return None;
        }
        query.get(self.start..self.end)
    }
}

impl From<pest::Span<'_>> for Span {
    fn from(span: pest::Span<'_>) -> Self {
        Span::new(span.start(), span.end())
    }
}

/// Comparison operator attached to a filter, rendered between `:` and the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum TermOperator {
    #[default]
    Default, // key:value
    GreaterThanEqual, // >=
    LessThanEqual,    // <=
    GreaterThan,      // >
    LessThan,         // <
    Equal,            // =
    NotEqual,         // !=
}

impl TermOperator {
    pub const ALL: [TermOperator; 7] = [
        TermOperator::Default,
        TermOperator::GreaterThanEqual,
        TermOperator::LessThanEqual,
        TermOperator::GreaterThan,
        TermOperator::LessThan,
        TermOperator::Equal,
        TermOperator::NotEqual,
    ];

    /// The glyph written between the key's `:` and the value
    pub fn as_str(&self) -> &'static str {
        match self {
            TermOperator::Default => "",
            TermOperator::GreaterThanEqual => ">=",
            TermOperator::LessThanEqual => "<=",
            TermOperator::GreaterThan => ">",
            TermOperator::LessThan => "<",
            TermOperator::Equal => "=",
            TermOperator::NotEqual => "!=",
        }
    }

    pub fn from_glyph(glyph: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == glyph)
    }
}

impl std::fmt::Display for TermOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum BooleanOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(tag = "type", rename_all = "snake_case"))]
pub enum TokenKind {
    Spaces,
    FreeText { quoted: bool },
    LogicBoolean { operator: BooleanOperator },
    LogicGroup { inner: Vec<Token> },
    Filter(Box<FilterToken>),
    KeySimple,
    ValueText { quoted: bool },
    ValueNumber,
    ValueTextList { items: Vec<Token> },
    ValueNumberList { items: Vec<Token> },
}

/// A parsed syntactic unit of a query: its kind, its span and the exact source
/// text it covers. Offsets are only meaningful against the string that was
/// parsed; any edit to that string leaves them stale.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// `!key:>=value`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct FilterToken {
    pub negated: bool,
    pub key: Token,
    pub operator: TermOperator,
    pub value: Token,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, text: impl Into<String>) -> Self {
        Token {
            kind,
            span,
            text: text.into(),
        }
    }

    pub fn as_filter(&self) -> Option<&FilterToken> {
        match &self.kind {
            TokenKind::Filter(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn is_filter(&self) -> bool {
        self.as_filter().is_some()
    }

    pub fn is_free_text_or_spaces(&self) -> bool {
        matches!(self.kind, TokenKind::FreeText { .. } | TokenKind::Spaces)
    }

    /// Items of a text or number list value
    pub fn list_items(&self) -> Option<&[Token]> {
        match &self.kind {
            TokenKind::ValueTextList { items } | TokenKind::ValueNumberList { items } => {
                Some(items)
            }
            _ => None,
        }
    }

    /// Short name of the token kind, used by the CLI listing and in log lines
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TokenKind::Spaces => "spaces",
            TokenKind::FreeText { .. } => "free_text",
            TokenKind::LogicBoolean { .. } => "logic_boolean",
            TokenKind::LogicGroup { .. } => "logic_group",
            TokenKind::Filter(_) => "filter",
            TokenKind::KeySimple => "key_simple",
            TokenKind::ValueText { .. } => "value_text",
            TokenKind::ValueNumber => "value_number",
            TokenKind::ValueTextList { .. } => "value_text_list",
            TokenKind::ValueNumberList { .. } => "value_number_list",
        }
    }

    /// Depth-first walk over this token and everything nested in it
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Token)) {
        f(self);
        match &self.kind {
            TokenKind::LogicGroup { inner } => inner.iter().for_each(|t| t.walk(f)),
            TokenKind::Filter(filter) => {
                filter.key.walk(f);
                filter.value.walk(f);
            }
            TokenKind::ValueTextList { items } | TokenKind::ValueNumberList { items } => {
                items.iter().for_each(|t| t.walk(f))
            }
            _ => {}
        }
    }
}

impl FilterToken {
    pub fn key_name(&self) -> &str {
        &self.key.text
    }

    /// Display texts of the value: every item of a list, or the single scalar text
    pub fn value_texts(&self) -> Vec<&str> {
        match self.value.list_items() {
            Some(items) => items.iter().map(|item| item.text.as_str()).collect(),
            None => vec![self.value.text.as_str()],
        }
    }

    /// Copy of this filter with new operator fields. `NotEqual` is folded into
    /// the negation flag.
    pub fn with_operator(&self, operator: TermOperator) -> FilterToken {
        let negated = operator == TermOperator::NotEqual;
        FilterToken {
            negated,
            operator: if negated {
                TermOperator::Default
            } else {
                operator
            },
            ..self.clone()
        }
    }
}

/// Loose numeric literal check: `12`, `-3.5`, `10k`
pub fn is_numeric_literal(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    let s = s
        .strip_suffix(|c: char| matches!(c, 'k' | 'K' | 'm' | 'M' | 'b' | 'B'))
        .unwrap_or(s);
    let mut parts = s.splitn(2, '.');
    let int = parts.next().unwrap_or_default();
    let frac = parts.next();
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.map_or(true, |f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}
