use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use super::raw::Rule;

/// Error type for parsing queries and for checked dispatch, using miette for diagnostics
#[allow(dead_code)] // Fields are used by miette's derive macros
#[derive(Debug, Clone, Diagnostic, Error)]
pub enum QueryError {
    // Syntax errors from pest
    #[error("Syntax error at line {line}, column {col}")]
    #[diagnostic(code(qedit::syntax))]
    Syntax {
        #[source_code]
        src: String,
        #[label("{expected_msg}")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
        expected_msg: String,
        line: usize,
        col: usize,
    },

    #[error("Parentheses nested more than {max_depth} levels deep")]
    #[diagnostic(
        code(qedit::nesting_too_deep),
        help("Remove redundant parentheses or split the query")
    )]
    NestingTooDeep {
        #[source_code]
        src: String,
        #[label("nesting limit exceeded here")]
        span: SourceSpan,
        max_depth: usize,
    },

    #[error("Tokens were parsed from generation {parsed_generation}, query is at generation {current_generation}")]
    #[diagnostic(
        code(qedit::stale_tokens),
        help("Re-parse the current query before dispatching another structural edit")
    )]
    StaleTokens {
        parsed_generation: u64,
        current_generation: u64,
    },

    #[error("Token {text:?} at {start}..{end} is not part of the parsed query")]
    #[diagnostic(
        code(qedit::token_mismatch),
        help("Take tokens from a parse of the current query, or refer to them by index")
    )]
    TokenMismatch {
        start: usize,
        end: usize,
        text: String,
    },

    #[error("Token index {index} out of range ({len} top-level tokens)")]
    #[diagnostic(code(qedit::token_index))]
    TokenIndex { index: usize, len: usize },

    #[error("Token {index} is a {found}, expected a filter")]
    #[diagnostic(code(qedit::not_a_filter))]
    NotAFilter { index: usize, found: &'static str },

    #[error("Unknown operator: {operator}")]
    #[diagnostic(
        code(qedit::unknown_operator),
        help("Valid operators: : (default), >=, <=, >, <, =, !=")
    )]
    UnknownOperator { operator: String },

    // Internal errors
    #[error("Internal parser error: {message}")]
    #[diagnostic(code(qedit::internal))]
    Internal {
        message: String,
        #[source_code]
        src: String,
    },
}

/// Convert pest Rule enum to user-friendly names
fn rule_to_friendly_name(rule: &Rule) -> &'static str {
    match rule {
        Rule::query => "query",
        Rule::spaces => "whitespace",
        Rule::paren_group => "parenthesized group",
        Rule::boolean_op => "AND/OR",
        Rule::filter => "filter (key:value)",
        Rule::negation => "!",
        Rule::key => "filter key",
        Rule::operator => "operator",
        Rule::text_value => "value",
        Rule::list_value => "list [a,b]",
        Rule::list_item | Rule::list_text => "list item",
        Rule::quoted_value => "quoted string",
        Rule::free_text => "free text",
        Rule::EOI => "end of input",
        // silent helper rules
        #[allow(unreachable_patterns)]
        _ => "search term",
    }
}

/// Byte offset of the last `"` in `prefix` that is never closed
fn unclosed_quote(prefix: &str) -> Option<usize> {
    let mut open = None;
    let mut escaped = false;
    for (offset, c) in prefix.char_indices() {
        match (escaped, c, open) {
            (true, _, _) => escaped = false,
            (false, '\\', Some(_)) => escaped = true,
            (false, '"', None) => open = Some(offset),
            (false, '"', Some(_)) => open = None,
            _ => {}
        }
    }
    open
}

/// Byte offset of a `[` in `prefix` with no `]` after it
fn unclosed_bracket(prefix: &str) -> Option<usize> {
    let open = prefix.rfind('[')?;
    (!prefix[open..].contains(']')).then_some(open)
}

fn column_of(src: &str, offset: usize) -> usize {
    src[..offset].chars().count() + 1
}

/// Generate contextual help text based on error patterns
fn generate_help_text(src: &str, pos: usize, positives: &[Rule]) -> Option<String> {
    let prefix = src.get(..pos).unwrap_or(src);

    if src.get(pos..).is_some_and(|rest| rest.starts_with(')')) {
        // a `)` the author meant to be inside a quote or list
        if let Some(open) = unclosed_quote(prefix) {
            return Some(format!(
                "The '\"' at column {} is never closed, so this ')' is read as a \
                 closing parenthesis. Close the quote.",
                column_of(src, open)
            ));
        }
        if let Some(open) = unclosed_bracket(prefix) {
            return Some(format!(
                "The list opened with '[' at column {} has no ']'. Close the list \
                 or quote the value.",
                column_of(src, open)
            ));
        }
        return Some("Unbalanced ')'. Remove it or add a matching '('.".to_string());
    }

    if positives.contains(&Rule::EOI) {
        return Some("Unexpected input. Check for unbalanced parentheses or quotes.".to_string());
    }

    None
}

impl QueryError {
    /// Create a syntax error from pest error with diagnostic information
    pub fn from_pest(pest_err: Box<pest::error::Error<Rule>>, src: String) -> Self {
        use pest::error::{ErrorVariant, InputLocation};

        // Non-zero width so miette has something to point at; an error at the
        // end of input points at the last character instead
        let (span, pos): (SourceSpan, usize) = match pest_err.location {
            InputLocation::Pos(pos) => {
                if pos >= src.len() && pos > 0 {
                    ((pos - 1, 1).into(), pos)
                } else if pos < src.len() {
                    ((pos, 1).into(), pos)
                } else {
                    ((0, 0).into(), pos)
                }
            }
            InputLocation::Span((start, end)) => {
                let width = end.saturating_sub(start).max(1);
                ((start, width).into(), start)
            }
        };

        // pest reports 1-based line and column
        let (line, col) = match pest_err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => (line, col),
            pest::error::LineColLocation::Span((line, col), _) => (line, col),
        };

        let (expected_msg, help) = match &pest_err.variant {
            ErrorVariant::ParsingError {
                positives,
                negatives: _,
            } => {
                let expected_msg = if positives.is_empty() {
                    "Unexpected input".to_string()
                } else if positives.len() == 1 {
                    format!("Expected {}", rule_to_friendly_name(&positives[0]))
                } else {
                    // several rules share a friendly name
                    let mut names: Vec<&str> =
                        positives.iter().map(rule_to_friendly_name).collect();
                    names.dedup();
                    if names.len() <= 3 {
                        format!("Expected one of: {}", names.join(", "))
                    } else {
                        format!("Expected one of: {}, ...", names[..3].join(", "))
                    }
                };

                (expected_msg, generate_help_text(&src, pos, positives))
            }
            ErrorVariant::CustomError { message } => (message.clone(), None),
        };

        QueryError::Syntax {
            src,
            span,
            help,
            expected_msg,
            line,
            col,
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        QueryError::Internal {
            message: msg.into(),
            src: String::new(),
        }
    }

    /// Attach the query text to errors that render source
    pub fn with_source(mut self, src: String) -> Self {
        match &mut self {
            QueryError::Syntax { src: s, .. }
            | QueryError::NestingTooDeep { src: s, .. }
            | QueryError::Internal { src: s, .. } => {
                *s = src;
            }
            QueryError::StaleTokens { .. }
            | QueryError::TokenMismatch { .. }
            | QueryError::TokenIndex { .. }
            | QueryError::NotAFilter { .. }
            | QueryError::UnknownOperator { .. } => {}
        }
        self
    }
}
