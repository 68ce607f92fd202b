//! Line → [`Command`] translation.
//!
//! The grammar (§6): one command per line, `//` begins a trailing comment,
//! a line beginning `===` halts further parsing, and every token is a
//! maximal run matching `[A-Za-z0-9_]+`. There is no punctuation in the
//! token stream itself — `begin(T1)`, `R(T1, x3)`, and `W(T1,x3,99)` all
//! reduce to the same flat list of identifier/number tokens, so the
//! parentheses, commas, and whitespace the grammar shows for readability
//! are not significant to tokenization.

use repcrec_coordinator::Command;
use repcrec_core::{Error, Result, SiteId, TxId, VarId};

/// The result of reading one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A command to hand to the Coordinator.
    Command(Command),
    /// A blank or comment-only line: nothing to do.
    Blank,
    /// The REPL/pipe-mode exit sentinel.
    Quit,
    /// A `===`-prefixed line: stop reading further input (but this line
    /// itself is not an error).
    Terminator,
}

/// Strip a trailing `//` comment from a line, if any.
fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Split a line into maximal runs of `[A-Za-z0-9_]`.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in line.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_var(token: &str) -> Result<VarId> {
    token
        .parse()
        .map_err(|_| Error::InvalidCommand(format!("not a variable: {}", token)))
}

fn parse_site(token: &str) -> Result<SiteId> {
    let index: u8 = token
        .parse()
        .map_err(|_| Error::InvalidCommand(format!("not a site id: {}", token)))?;
    SiteId::new(index)
}

fn parse_value(token: &str) -> Result<i64> {
    token
        .parse()
        .map_err(|_| Error::InvalidCommand(format!("not an integer value: {}", token)))
}

/// Parse one raw input line into a [`Line`].
pub fn parse_line(raw: &str) -> Result<Line> {
    let trimmed = raw.trim();
    if trimmed.starts_with("===") {
        return Ok(Line::Terminator);
    }
    if trimmed == "QUIT" {
        return Ok(Line::Quit);
    }

    let stripped = strip_comment(raw);
    let tokens = tokenize(stripped);
    if tokens.is_empty() {
        return Ok(Line::Blank);
    }

    let verb = tokens[0].as_str();
    let args = &tokens[1..];
    let command = match verb {
        "begin" => {
            expect_arity(verb, args, 1)?;
            Command::Begin(TxId::new(args[0].clone()))
        }
        "beginRO" => {
            expect_arity(verb, args, 1)?;
            Command::BeginReadOnly(TxId::new(args[0].clone()))
        }
        "R" => {
            expect_arity(verb, args, 2)?;
            Command::Read(TxId::new(args[0].clone()), parse_var(&args[1])?)
        }
        "W" => {
            expect_arity(verb, args, 3)?;
            Command::Write(
                TxId::new(args[0].clone()),
                parse_var(&args[1])?,
                parse_value(&args[2])?,
            )
        }
        "end" => {
            expect_arity(verb, args, 1)?;
            Command::End(TxId::new(args[0].clone()))
        }
        "dump" => {
            expect_arity(verb, args, 0)?;
            Command::Dump
        }
        "fail" => {
            expect_arity(verb, args, 1)?;
            Command::Fail(parse_site(&args[0])?)
        }
        "recover" => {
            expect_arity(verb, args, 1)?;
            Command::Recover(parse_site(&args[0])?)
        }
        other => {
            return Err(Error::InvalidCommand(format!("unknown command: {}", other)));
        }
    };
    Ok(Line::Command(command))
}

fn expect_arity(verb: &str, args: &[String], want: usize) -> Result<()> {
    if args.len() != want {
        return Err(Error::InvalidCommand(format!(
            "{} expects {} argument(s), got {}",
            verb,
            want,
            args.len()
        )));
    }
    Ok(())
}
