use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use qedit::{
    parser::TokenKind, stringify::escape_filter_value, Action, ParsedQuery, QueryBuilder,
    QueryError, TermOperator, Token,
};
use serde_json::Value;

/// Edit an issue search query structurally
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// the query to edit
    query: String,

    /// print JSON instead of plain text
    #[clap(long)]
    json: bool,

    /// log every dispatched action (same as RUST_LOG=debug)
    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the top-level tokens with their indices and spans
    Tokens,
    /// Delete a token's exact text
    Delete { index: usize },
    /// Replace a free text token, normalizing the whitespace around it
    ReplaceText { index: usize, text: String },
    /// Change a filter's operator (`:` for the default, `!=`, `>=`, ...)
    SetOp { index: usize, op: String },
    /// Replace a token's text verbatim
    SetValue { index: usize, value: String },
    /// Add or remove one value of a filter
    Toggle {
        index: usize,
        value: String,
        /// quote the value if it contains whitespace or list syntax
        #[clap(long)]
        escape: bool,
    },
    /// Drop the last value of a multi-value filter
    PopValue { index: usize },
    /// Apply a JSON array of actions in order; a numeric `token` (or entry of
    /// `tokens`) is a top-level token index into the query as it stands before
    /// that action. Inline token objects must match that query.
    Apply { actions: String },
}

fn parse_operator(op: &str) -> Result<TermOperator, QueryError> {
    match op {
        ":" => Ok(TermOperator::Default),
        glyph => TermOperator::from_glyph(glyph).ok_or_else(|| QueryError::UnknownOperator {
            operator: glyph.to_string(),
        }),
    }
}

fn filter_at(parsed: &ParsedQuery, index: usize) -> Result<Token, QueryError> {
    let token = parsed.token(index)?;
    if !token.is_filter() {
        return Err(QueryError::NotAFilter {
            index,
            found: token.kind_name(),
        });
    }
    Ok(token.clone())
}

fn action_for(command: Command, parsed: &ParsedQuery) -> Result<Action, QueryError> {
    let action = match command {
        Command::Delete { index } => Action::DeleteToken {
            token: parsed.token(index)?.clone(),
        },
        Command::ReplaceText { index, text } => Action::UpdateFreeText {
            token: parsed.token(index)?.clone(),
            text,
        },
        Command::SetOp { index, op } => Action::UpdateFilterOp {
            token: filter_at(parsed, index)?,
            op: parse_operator(&op)?,
        },
        Command::SetValue { index, value } => Action::UpdateTokenValue {
            token: parsed.token(index)?.clone(),
            value,
        },
        Command::Toggle {
            index,
            value,
            escape,
        } => Action::ToggleFilterValue {
            token: filter_at(parsed, index)?,
            value: if escape {
                escape_filter_value(&value).into_owned()
            } else {
                value
            },
        },
        Command::PopValue { index } => Action::DeleteLastMultiSelectFilterValue {
            token: filter_at(parsed, index)?,
        },
        Command::Tokens | Command::Apply { .. } => Action::Unrecognized,
    };
    Ok(action)
}

/// A numeric token reference becomes the token at that index; anything else
/// is left for serde
fn resolve_token(value: &mut Value, parsed: &ParsedQuery) -> anyhow::Result<()> {
    if let Some(index) = value.as_u64() {
        *value = serde_json::to_value(parsed.token(index as usize)?)?;
    }
    Ok(())
}

/// Resolve numeric `token` and `tokens` entries against the current parse,
/// then decode
fn decode_action(mut raw: Value, parsed: &ParsedQuery) -> anyhow::Result<Action> {
    if let Some(token) = raw.get_mut("token") {
        resolve_token(token, parsed)?;
    }
    if let Some(Value::Array(tokens)) = raw.get_mut("tokens") {
        for token in tokens {
            resolve_token(token, parsed)?;
        }
    }
    serde_json::from_value(raw).context("invalid action")
}

fn print_tokens(tokens: &[Token], depth: usize) {
    for (index, token) in tokens.iter().enumerate() {
        let indent = "  ".repeat(depth);
        println!(
            "{}{:>3} {:<17} {:>3}..{:<3} {:?}",
            indent,
            index,
            token.kind_name(),
            token.span.start,
            token.span.end,
            token.text
        );
        match &token.kind {
            TokenKind::LogicGroup { inner } => print_tokens(inner, depth + 1),
            TokenKind::Filter(filter) => {
                println!(
                    "{}      negated={} key={:?} op={:?} value={} {:?}",
                    indent,
                    filter.negated,
                    filter.key.text,
                    filter.operator.as_str(),
                    filter.value.kind_name(),
                    filter.value_texts()
                );
            }
            _ => {}
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut builder = QueryBuilder::new(args.query);
    let parsed = builder.parse()?;

    match args.command {
        Command::Tokens => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                print_tokens(&parsed.tokens, 0);
            }
            return Ok(());
        }
        Command::Apply { actions } => {
            let actions: Vec<Value> =
                serde_json::from_str(&actions).context("actions must be a JSON array")?;
            for raw in actions {
                let parsed = builder.parse()?;
                let action = decode_action(raw, &parsed)?;
                log::info!("applying {}", action.name());
                builder.dispatch_parsed(&parsed, action)?;
            }
        }
        command => {
            let action = action_for(command, &parsed)?;
            builder.dispatch_parsed(&parsed, action)?;
        }
    }

    if args.json {
        println!("{}", serde_json::to_string(builder.state())?);
    } else {
        println!("{}", builder.query());
    }
    Ok(())
}

pub fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast::<QueryError>() {
                Ok(query_err) => eprintln!("{:?}", miette::Report::new(query_err)),
                Err(err) => eprintln!("error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
