//! Token mutations: pure functions from the current query string to the next one
//!
//! Every function takes the query string a token was parsed from and returns a
//! new string; tokens are never modified. A token whose span does not fit the
//! query (out of bounds, or not on a char boundary) leaves the query unchanged.

use itertools::Itertools;
use log::{debug, warn};

use crate::parser::{FilterToken, Span, TermOperator, Token};
use crate::stringify::format_multi_value;

/// Split `query` around `span`, `None` if the span does not fit
fn split_at_span(query: &str, span: Span) -> Option<(&str, &str)> {
    span.slice(query)?;
    Some((&query[..span.start], &query[span.end..]))
}

fn stale_span(query: &str, token: &Token) -> String {
    warn!(
        "ignoring edit: span {}..{} of {} token does not fit query of {} bytes",
        token.span.start,
        token.span.end,
        token.kind_name(),
        query.len()
    );
    query.to_string()
}

/// Delete exactly the token's text. Whitespace around it is left alone.
pub fn remove_query_token(query: &str, token: &Token) -> String {
    match split_at_span(query, token.span) {
        Some((start, end)) => [start, end].concat(),
        None => stale_span(query, token),
    }
}

/// Delete several tokens from the same parse in one edit.
///
/// Spans are applied right to left so earlier offsets stay valid; overlapping
/// spans are merged first.
pub fn remove_query_tokens(query: &str, tokens: &[Token]) -> String {
    let mut spans: Vec<Span> = Vec::with_capacity(tokens.len());
    for token in tokens.iter().sorted_by_key(|t| (t.span.start, t.span.end)) {
        if token.span.slice(query).is_none() {
            return stale_span(query, token);
        }
        match spans.last_mut() {
            Some(last) if token.span.start <= last.end => last.end = last.end.max(token.span.end),
            _ => spans.push(token.span),
        }
    }

    let mut result = query.to_string();
    for span in spans.iter().rev() {
        result.replace_range(span.start..span.end, "");
    }
    result
}

/// Substitute `value` for the token's text verbatim
pub fn replace_query_token(query: &str, token: &Token, value: &str) -> String {
    match split_at_span(query, token.span) {
        Some((start, end)) => [start, value, end].concat(),
        None => stale_span(query, token),
    }
}

/// Substitute `value` for the token's text, normalizing the whitespace at both
/// join points to a single space and trimming the ends of the result.
pub fn replace_query_token_with_padding(query: &str, token: &Token, value: &str) -> String {
    match split_at_span(query, token.span) {
        Some((start, end)) => [start.trim_end(), value.trim(), end.trim_start()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .join(" ")
            .trim()
            .to_string(),
        None => stale_span(query, token),
    }
}

/// Rewrite a filter token with a new operator. `NotEqual` becomes `!key:value`.
///
/// Any other kind of token leaves the query unchanged.
pub fn modify_filter_operator(query: &str, token: &Token, operator: TermOperator) -> String {
    match token.as_filter() {
        Some(filter) => {
            let updated = filter.with_operator(operator);
            replace_query_token(query, token, &updated.to_string())
        }
        None => {
            debug!("operator change ignored for {} token", token.kind_name());
            query.to_string()
        }
    }
}

fn update_filter_values<S: AsRef<str>>(query: &str, filter: &FilterToken, values: &[S]) -> String {
    replace_query_token(query, &filter.value, &format_multi_value(values))
}

/// Add `value` to a filter's values, or remove it if already present.
///
/// A scalar equal to `value` clears the filter value; any other scalar turns
/// into the list `[scalar,value]`.
pub fn toggle_filter_value(query: &str, filter: &FilterToken, value: &str) -> String {
    match filter.value.list_items() {
        Some(items) => {
            let values: Vec<&str> = items.iter().map(|item| item.text.as_str()).collect();
            let new_values: Vec<&str> = if values.contains(&value) {
                values.into_iter().filter(|v| *v != value).collect()
            } else {
                values.into_iter().chain(std::iter::once(value)).collect()
            };
            update_filter_values(query, filter, &new_values)
        }
        None if filter.value.text == value => update_filter_values::<&str>(query, filter, &[]),
        None => update_filter_values(query, filter, &[filter.value.text.as_str(), value]),
    }
}

/// Drop the last value of a multi-value filter; a scalar value is cleared.
pub fn delete_last_filter_value(query: &str, filter: &FilterToken) -> String {
    match filter.value.list_items() {
        Some(items) => {
            let kept: Vec<&str> = items
                .iter()
                .take(items.len().saturating_sub(1))
                .map(|item| item.text.as_str())
                .collect();
            update_filter_values(query, filter, &kept)
        }
        None => update_filter_values::<&str>(query, filter, &[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_query, TokenKind};

    fn token_at(query: &str, text: &str) -> Token {
        let start = query.find(text).unwrap();
        Token::new(TokenKind::Spaces, Span::new(start, start + text.len()), text)
    }

    fn first_filter(query: &str) -> (Token, FilterToken) {
        let token = parse_query(query)
            .unwrap()
            .into_iter()
            .find(Token::is_filter)
            .unwrap();
        let filter = token.as_filter().unwrap().clone();
        (token, filter)
    }

    #[test]
    fn test_remove_is_exact() {
        let q = "is:unresolved  assigned:me";
        assert_eq!(remove_query_token(q, &token_at(q, "  ")), "is:unresolvedassigned:me");
        assert_eq!(remove_query_token(q, &token_at(q, "is:unresolved")), "  assigned:me");
    }

    #[test]
    fn test_padded_replace_collapses_whitespace() {
        let q = "a   b";
        assert_eq!(replace_query_token_with_padding(q, &token_at(q, "   "), "  "), "a b");
        assert_eq!(replace_query_token_with_padding(q, &token_at(q, "   "), "x"), "a x b");

        let q = "is:unresolved  assigned:me";
        assert_eq!(
            replace_query_token_with_padding(q, &token_at(q, "  "), ""),
            "is:unresolved assigned:me"
        );
    }

    #[test]
    fn test_padded_replace_at_boundaries() {
        let q = "foo bar";
        assert_eq!(replace_query_token_with_padding(q, &token_at(q, "foo"), "baz"), "baz bar");
        assert_eq!(replace_query_token_with_padding(q, &token_at(q, "bar"), ""), "foo");
        assert_eq!(replace_query_token_with_padding("", &token_at("", ""), ""), "");

        let q = "  a  b  ";
        assert_eq!(replace_query_token_with_padding(q, &token_at(q, "b"), "c"), "a c");
        assert_eq!(replace_query_token_with_padding(q, &token_at(q, "a"), ""), "b");
    }

    #[test]
    fn test_replace_verbatim() {
        let q = "is:unresolved";
        assert_eq!(replace_query_token(q, &token_at(q, "unresolved"), " resolved "), "is: resolved ");
    }

    #[test]
    fn test_out_of_bounds_span_is_noop() {
        let q = "short";
        let token = Token::new(TokenKind::Spaces, Span::new(3, 40), "stale");
        assert_eq!(remove_query_token(q, &token), q);
        assert_eq!(replace_query_token(q, &token, "x"), q);
        assert_eq!(replace_query_token_with_padding(q, &token, "x"), q);
        assert_eq!(remove_query_tokens(q, &[token]), q);
    }

    #[test]
    fn test_remove_many_tokens() {
        let q = "a b c d";
        let tokens = parse_query(q).unwrap();
        // "a", " ", "b", " ", "c", " ", "d"
        let picked = vec![tokens[4].clone(), tokens[0].clone(), tokens[1].clone()];
        assert_eq!(remove_query_tokens(q, &picked), "b  d");
        assert_eq!(remove_query_tokens(q, &[]), q);
    }

    #[test]
    fn test_modify_operator_round_trip() {
        let q = "is:unresolved browser:chrome";
        let (token, filter) = first_filter(q);

        let negated = modify_filter_operator(q, &token, TermOperator::NotEqual);
        assert_eq!(negated, "!is:unresolved browser:chrome");

        let (token, filter) = first_filter(&negated);
        assert!(filter.negated);
        let restored = modify_filter_operator(&negated, &token, TermOperator::Default);
        assert_eq!(restored, q);
    }

    #[test]
    fn test_modify_operator_comparisons() {
        let q = "times_seen:10";
        let (token, filter) = first_filter(q);
        assert_eq!(
            modify_filter_operator(q, &token, TermOperator::GreaterThanEqual),
            "times_seen:>=10"
        );
        // the parsed token keeps its operator
        assert_eq!(filter.operator, TermOperator::Default);
    }

    #[test]
    fn test_modify_operator_ignores_non_filters() {
        let q = "hello is:unresolved";
        let tokens = parse_query(q).unwrap();
        assert_eq!(modify_filter_operator(q, &tokens[0], TermOperator::NotEqual), q);
    }

    #[test]
    fn test_toggle_list_values() {
        let q = "assigned:[me,team] is:unresolved";
        let (_, filter) = first_filter(q);
        let q = toggle_filter_value(q, &filter, "me");
        assert_eq!(q, "assigned:team is:unresolved");

        let (_, filter) = first_filter(&q);
        let q = toggle_filter_value(&q, &filter, "team");
        assert_eq!(q, "assigned: is:unresolved");
    }

    #[test]
    fn test_toggle_adds_to_list_and_scalar() {
        let q = "assigned:[me,team]";
        let (_, filter) = first_filter(q);
        assert_eq!(toggle_filter_value(q, &filter, "other"), "assigned:[me,team,other]");

        let q = "browser:chrome";
        let (_, filter) = first_filter(q);
        assert_eq!(toggle_filter_value(q, &filter, "firefox"), "browser:[chrome,firefox]");
        assert_eq!(toggle_filter_value(q, &filter, "chrome"), "browser:");

        let q = "browser:";
        let (_, filter) = first_filter(q);
        assert_eq!(toggle_filter_value(q, &filter, "chrome"), "browser:chrome");
    }

    #[test]
    fn test_toggle_twice_restores() {
        let q = "assigned:[me,team]";
        let (_, filter) = first_filter(q);
        let added = toggle_filter_value(q, &filter, "other");
        let (_, filter) = first_filter(&added);
        assert_eq!(toggle_filter_value(&added, &filter, "other"), q);
    }

    #[test]
    fn test_delete_last_value() {
        let q = "assigned:[me,team,other]";
        let (_, filter) = first_filter(q);
        let q = delete_last_filter_value(q, &filter);
        assert_eq!(q, "assigned:[me,team]");

        let (_, filter) = first_filter(&q);
        let q = delete_last_filter_value(&q, &filter);
        assert_eq!(q, "assigned:me");

        let (_, filter) = first_filter(&q);
        let q = delete_last_filter_value(&q, &filter);
        assert_eq!(q, "assigned:");

        let (_, filter) = first_filter(&q);
        assert_eq!(delete_last_filter_value(&q, &filter), "assigned:");
    }

    #[test]
    fn test_list_cleanup_on_edit() {
        let q = "assigned:[me,,me,team]";
        let (_, filter) = first_filter(q);
        assert_eq!(delete_last_filter_value(q, &filter), "assigned:me");
    }
}
