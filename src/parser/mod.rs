pub mod ast;
pub mod error;
pub mod raw;

// Re-exports for clean API
pub use ast::{
    is_numeric_literal, BooleanOperator, FilterToken, Span, TermOperator, Token, TokenKind,
};
pub use error::QueryError;
pub use raw::{QueryParser, MAX_NESTING_DEPTH};

/// Parse `query` into its top-level tokens
///
/// # Errors
/// Returns `QueryError::Syntax` when the query does not match the grammar
/// (a stray `)` at the top level is the usual cause).
pub fn parse_query(query: &str) -> Result<Vec<Token>, QueryError> {
    QueryParser::parse_tokens(query).map_err(|e| e.with_source(query.to_string()))
}
