//! Structural editing of issue search queries.
//!
//! A query such as `is:unresolved assigned:[me,team] "connection reset"` is
//! parsed into tokens that record their byte spans. Edits (delete a token,
//! rewrite free text, flip a filter's operator, toggle one value of a
//! multi-select filter) are computed as substring replacements against those
//! spans and produce a new query string.
//!
//! ```
//! use qedit::{Action, QueryBuilder};
//!
//! let mut builder = QueryBuilder::new("assigned:[me,team]");
//! let parsed = builder.parse().unwrap();
//! let token = parsed.tokens[0].clone();
//! builder
//!     .dispatch_parsed(&parsed, Action::ToggleFilterValue { token, value: "me".into() })
//!     .unwrap();
//! assert_eq!(builder.query(), "assigned:team");
//! ```

pub mod builder;
pub mod mutate;
pub mod parser;
pub mod stringify;

pub use builder::{reduce, Action, ParsedQuery, QueryBuilder, QueryBuilderState};
pub use parser::{parse_query, FilterToken, QueryError, Span, TermOperator, Token, TokenKind};
