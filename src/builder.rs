//! Query text store and the action reducer that drives it
//!
//! The store holds the query string and nothing else. Every structural action
//! carries tokens from a parse of the current string; after any change those
//! tokens are stale and the caller parses again before the next action.
//! [`QueryBuilder::dispatch_parsed`] enforces that with a generation counter.

use log::debug;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::mutate;
use crate::parser::{parse_query, FilterToken, QueryError, TermOperator, Token};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct QueryBuilderState {
    pub query: String,
}

/// Edit intents understood by [`reduce`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "json",
    serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum Action {
    /// Remove the token's exact text
    DeleteToken { token: Token },
    /// Remove several tokens from one parse
    DeleteTokens { tokens: Vec<Token> },
    /// Replace a free text (or spaces) token, normalizing surrounding whitespace
    UpdateFreeText { token: Token, text: String },
    /// Change a filter's operator
    UpdateFilterOp { token: Token, op: TermOperator },
    /// Replace a token's text verbatim
    UpdateTokenValue { token: Token, value: String },
    /// Add or remove one value of a multi-select filter
    ToggleFilterValue { token: Token, value: String },
    DeleteLastMultiSelectFilterValue { token: Token },
    /// Replace the whole query
    UpdateQuery { query: String },
    Clear,
    /// Any action type this version does not know about
    #[cfg_attr(feature = "json", serde(other))]
    Unrecognized,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::DeleteToken { .. } => "DELETE_TOKEN",
            Action::DeleteTokens { .. } => "DELETE_TOKENS",
            Action::UpdateFreeText { .. } => "UPDATE_FREE_TEXT",
            Action::UpdateFilterOp { .. } => "UPDATE_FILTER_OP",
            Action::UpdateTokenValue { .. } => "UPDATE_TOKEN_VALUE",
            Action::ToggleFilterValue { .. } => "TOGGLE_FILTER_VALUE",
            Action::DeleteLastMultiSelectFilterValue { .. } => {
                "DELETE_LAST_MULTI_SELECT_FILTER_VALUE"
            }
            Action::UpdateQuery { .. } => "UPDATE_QUERY",
            Action::Clear => "CLEAR",
            Action::Unrecognized => "UNRECOGNIZED",
        }
    }

    /// Whether applying this action reads token offsets
    pub fn uses_tokens(&self) -> bool {
        !matches!(
            self,
            Action::UpdateQuery { .. } | Action::Clear | Action::Unrecognized
        )
    }

    /// Tokens whose offsets this action reads
    pub fn tokens(&self) -> Vec<&Token> {
        match self {
            Action::DeleteToken { token }
            | Action::UpdateFreeText { token, .. }
            | Action::UpdateFilterOp { token, .. }
            | Action::UpdateTokenValue { token, .. }
            | Action::ToggleFilterValue { token, .. }
            | Action::DeleteLastMultiSelectFilterValue { token } => vec![token],
            Action::DeleteTokens { tokens } => tokens.iter().collect(),
            Action::UpdateQuery { .. } | Action::Clear | Action::Unrecognized => Vec::new(),
        }
    }
}

fn with_filter(
    state: &QueryBuilderState,
    action: &'static str,
    token: &Token,
    f: impl FnOnce(&FilterToken) -> String,
) -> QueryBuilderState {
    match token.as_filter() {
        Some(filter) => QueryBuilderState { query: f(filter) },
        None => {
            debug!("{} ignored for {} token", action, token.kind_name());
            state.clone()
        }
    }
}

/// Apply one action to the state. Never fails: actions that do not apply
/// (unknown types, filter actions on other tokens) return the state unchanged.
pub fn reduce(state: &QueryBuilderState, action: Action) -> QueryBuilderState {
    let query = state.query.as_str();
    let name = action.name();

    let next = match action {
        Action::DeleteToken { token } => QueryBuilderState {
            query: mutate::remove_query_token(query, &token),
        },
        Action::DeleteTokens { tokens } => QueryBuilderState {
            query: mutate::remove_query_tokens(query, &tokens),
        },
        Action::UpdateFreeText { token, text } => {
            if !token.is_free_text_or_spaces() {
                debug!("{} applied to {} token", name, token.kind_name());
            }
            QueryBuilderState {
                query: mutate::replace_query_token_with_padding(query, &token, &text),
            }
        }
        Action::UpdateFilterOp { token, op } => QueryBuilderState {
            query: mutate::modify_filter_operator(query, &token, op),
        },
        Action::UpdateTokenValue { token, value } => QueryBuilderState {
            query: mutate::replace_query_token(query, &token, &value),
        },
        Action::ToggleFilterValue { token, value } => with_filter(state, name, &token, |filter| {
            mutate::toggle_filter_value(query, filter, &value)
        }),
        Action::DeleteLastMultiSelectFilterValue { token } => {
            with_filter(state, name, &token, |filter| {
                mutate::delete_last_filter_value(query, filter)
            })
        }
        Action::UpdateQuery { query } => QueryBuilderState { query },
        Action::Clear => QueryBuilderState::default(),
        Action::Unrecognized => {
            debug!("ignoring unrecognized action");
            state.clone()
        }
    };

    debug!("{}: {:?} -> {:?}", name, state.query, next.query);
    next
}

/// One parse of a query, tied to the store generation it was taken from
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct ParsedQuery {
    pub source: String,
    pub generation: u64,
    pub tokens: Vec<Token>,
}

impl ParsedQuery {
    pub fn token(&self, index: usize) -> Result<&Token, QueryError> {
        self.tokens.get(index).ok_or(QueryError::TokenIndex {
            index,
            len: self.tokens.len(),
        })
    }

    /// Whether `token`'s span covers its own text in this parse's source.
    /// Tokens deserialized from elsewhere or kept from an older parse fail this.
    pub fn covers(&self, token: &Token) -> bool {
        token.span.slice(&self.source) == Some(token.text.as_str())
    }
}

/// The query text store
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    state: QueryBuilderState,
    generation: u64,
}

impl QueryBuilder {
    pub fn new(initial_query: impl Into<String>) -> Self {
        QueryBuilder {
            state: QueryBuilderState {
                query: initial_query.into(),
            },
            generation: 0,
        }
    }

    pub fn state(&self) -> &QueryBuilderState {
        &self.state
    }

    pub fn query(&self) -> &str {
        &self.state.query
    }

    /// Number of times the query text has changed
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Parse the current query, stamping the result with the current generation
    pub fn parse(&self) -> Result<ParsedQuery, QueryError> {
        Ok(ParsedQuery {
            source: self.state.query.clone(),
            generation: self.generation,
            tokens: parse_query(&self.state.query)?,
        })
    }

    /// Apply an action. The caller guarantees its tokens come from a parse of
    /// the current query.
    pub fn dispatch(&mut self, action: Action) -> &QueryBuilderState {
        let next = reduce(&self.state, action);
        if next.query != self.state.query {
            self.generation += 1;
            self.state = next;
        }
        &self.state
    }

    /// Apply an action whose tokens came from `parsed`, rejecting it if the
    /// query has changed since that parse or if a token does not belong to it
    pub fn dispatch_parsed(
        &mut self,
        parsed: &ParsedQuery,
        action: Action,
    ) -> Result<&QueryBuilderState, QueryError> {
        if !action.uses_tokens() {
            return Ok(self.dispatch(action));
        }
        if parsed.generation != self.generation || parsed.source != self.state.query {
            return Err(QueryError::StaleTokens {
                parsed_generation: parsed.generation,
                current_generation: self.generation,
            });
        }
        if let Some(token) = action.tokens().into_iter().find(|t| !parsed.covers(t)) {
            return Err(QueryError::TokenMismatch {
                start: token.span.start,
                end: token.span.end,
                text: token.text.clone(),
            });
        }
        Ok(self.dispatch(action))
    }
}
