use pest::{iterators::Pair, Parser};
use pest_derive::Parser;

use super::{
    ast::{is_numeric_literal, BooleanOperator, FilterToken, Span, TermOperator, Token, TokenKind},
    error::QueryError,
};

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
pub struct QueryParser;

/// Deepest `(` nesting the recursive group rule is allowed to attempt
pub const MAX_NESTING_DEPTH: usize = 128;

/// Byte offset of the first `(` past `max_depth` open parentheses, if any.
///
/// Counts every parenthesis, quoted or not, so it over-approximates what the
/// grammar would actually recurse into.
fn nesting_overflow(input: &str, max_depth: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in input.bytes().enumerate() {
        match byte {
            b'(' => {
                depth += 1;
                if depth > max_depth {
                    return Some(offset);
                }
            }
            b')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

impl QueryParser {
    /// Parse a query string into its top-level tokens.
    ///
    /// Every byte of the input belongs to exactly one top-level token, so
    /// concatenating their `text` gives back `input`.
    pub fn parse_tokens(input: &str) -> Result<Vec<Token>, QueryError> {
        if let Some(offset) = nesting_overflow(input, MAX_NESTING_DEPTH) {
            return Err(QueryError::NestingTooDeep {
                src: input.to_string(),
                span: (offset, 1).into(),
                max_depth: MAX_NESTING_DEPTH,
            });
        }

        let mut pairs = Self::parse(Rule::query, input)
            .map_err(|e| QueryError::from_pest(Box::new(e), input.to_string()))?;

        let query_pair = pairs
            .next()
            .ok_or_else(|| QueryError::internal("Grammar guarantees query exists"))?;

        query_pair
            .into_inner()
            .filter(|pair| pair.as_rule() != Rule::EOI)
            .map(Self::parse_term)
            .collect()
    }

    fn parse_term(pair: Pair<'_, Rule>) -> Result<Token, QueryError> {
        let span = Span::from(pair.as_span());
        let text = pair.as_str();

        match pair.as_rule() {
            Rule::spaces => Ok(Token::new(TokenKind::Spaces, span, text)),
            Rule::free_text => Ok(Token::new(
                TokenKind::FreeText {
                    quoted: is_quoted_literal(text),
                },
                span,
                text,
            )),
            Rule::boolean_op => {
                let operator = if text.eq_ignore_ascii_case("and") {
                    BooleanOperator::And
                } else {
                    BooleanOperator::Or
                };
                Ok(Token::new(TokenKind::LogicBoolean { operator }, span, text))
            }
            Rule::paren_group => {
                let inner = pair
                    .into_inner()
                    .map(Self::parse_term)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Token::new(TokenKind::LogicGroup { inner }, span, text))
            }
            Rule::filter => Self::parse_filter(pair),
            rule => Err(QueryError::internal(format!(
                "Unexpected term rule: {:?}",
                rule
            ))),
        }
    }

    fn parse_filter(pair: Pair<'_, Rule>) -> Result<Token, QueryError> {
        let span = Span::from(pair.as_span());
        let text = pair.as_str().to_string();
        let mut inner = pair.into_inner().peekable();

        let negated = inner
            .next_if(|p| p.as_rule() == Rule::negation)
            .is_some();

        let key_pair = inner
            .next()
            .ok_or_else(|| QueryError::internal("Grammar guarantees filter has key"))?;
        let key = Token::new(
            TokenKind::KeySimple,
            Span::from(key_pair.as_span()),
            key_pair.as_str(),
        );

        let operator = match inner.next_if(|p| p.as_rule() == Rule::operator) {
            Some(op_pair) => TermOperator::from_glyph(op_pair.as_str()).ok_or_else(|| {
                QueryError::internal(format!("Unknown operator glyph: {}", op_pair.as_str()))
            })?,
            None => TermOperator::Default,
        };

        let value_pair = inner
            .next()
            .ok_or_else(|| QueryError::internal("Grammar guarantees filter has value"))?;
        let value = Self::parse_value(value_pair)?;

        Ok(Token::new(
            TokenKind::Filter(Box::new(FilterToken {
                negated,
                key,
                operator,
                value,
            })),
            span,
            text,
        ))
    }

    fn parse_value(pair: Pair<'_, Rule>) -> Result<Token, QueryError> {
        let span = Span::from(pair.as_span());
        let text = pair.as_str();

        match pair.as_rule() {
            Rule::quoted_value => Ok(Token::new(TokenKind::ValueText { quoted: true }, span, text)),
            Rule::text_value | Rule::list_text => {
                let kind = if is_numeric_literal(text) {
                    TokenKind::ValueNumber
                } else {
                    TokenKind::ValueText { quoted: false }
                };
                Ok(Token::new(kind, span, text))
            }
            Rule::list_value => {
                let items = pair
                    .into_inner()
                    .map(Self::parse_list_item)
                    .collect::<Result<Vec<_>, _>>()?;

                let numeric = items
                    .iter()
                    .filter(|item| !item.text.is_empty())
                    .all(|item| matches!(item.kind, TokenKind::ValueNumber));
                let has_values = items.iter().any(|item| !item.text.is_empty());

                let kind = if numeric && has_values {
                    TokenKind::ValueNumberList { items }
                } else {
                    TokenKind::ValueTextList { items }
                };
                Ok(Token::new(kind, span, text))
            }
            rule => Err(QueryError::internal(format!(
                "Unexpected value rule: {:?}",
                rule
            ))),
        }
    }

    fn parse_list_item(pair: Pair<'_, Rule>) -> Result<Token, QueryError> {
        let item_span = pair.as_span();
        match pair.into_inner().next() {
            Some(value_pair) => Self::parse_value(value_pair),
            // `[a,,b]`: an empty item sits at the start of its slot
            None => Ok(Token::new(
                TokenKind::ValueText { quoted: false },
                Span::new(item_span.start(), item_span.start()),
                "",
            )),
        }
    }
}

/// `"..."` with every inner quote escaped
fn is_quoted_literal(s: &str) -> bool {
    let Some(body) = s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return false;
    };
    let mut escaped = false;
    for c in body.chars() {
        match (escaped, c) {
            (true, _) => escaped = false,
            (false, '\\') => escaped = true,
            (false, '"') => return false,
            _ => {}
        }
    }
    !escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_overflow_offset() {
        assert_eq!(nesting_overflow("((a))", 2), None);
        assert_eq!(nesting_overflow("((a)) ((b))", 2), None);
        assert_eq!(nesting_overflow("(((a)))", 2), Some(2));
        // stray closers do not buy extra depth
        assert_eq!(nesting_overflow(")))(((", 2), Some(5));
    }

    #[test]
    fn test_quoted_literal_detection() {
        assert!(is_quoted_literal(r#""hello world""#));
        assert!(is_quoted_literal(r#""""#));
        assert!(is_quoted_literal(r#""say \"hi\"""#));
        assert!(!is_quoted_literal(r#""a\""#));
        assert!(!is_quoted_literal(r#"""#));
        assert!(!is_quoted_literal("plain"));
    }
}
