//! # Parsing problems
//!
//! Most of the parsing for problems comes from deriving TOML parsing on the
//! data structures. However, for some things (in particular, productions and
//! constraint templates), we have a custom parser. We also expose some nice
//! functions in this module to abstract away from the fact that we are parsing
//! using TOML.

use crate::grammar::*;
use crate::logic::*;
use crate::problem::*;
use crate::search;

use chumsky::prelude::*;

// Shorthand

trait P<T>: Parser<char, T, Error = Simple<char>> {}
impl<S, T> P<T> for S where S: Parser<char, T, Error = Simple<char>> {}

// Errors

fn error(title: &str, code: i32, src: &str, err: &Simple<char>) -> String {
    use ariadne::*;

    let err_span = err.span();
    let err_expected = err
        .expected()
        .filter_map(|mtok| mtok.map(|tok| format!("`{}`", tok)))
        .collect::<Vec<_>>();

    let error_color = Color::Red;

    let mut report =
        Report::build(ReportKind::Error, "input", err_span.start)
            .with_code(code)
            .with_message(title)
            .with_label(
                Label::new(("input", err_span))
                    .with_message(format!(
                        "{}",
                        match err.reason() {
                            chumsky::error::SimpleReason::Custom(msg) => {
                                msg.clone()
                            }
                            _ => "Unexpected token".to_owned(),
                        }
                        .fg(error_color),
                    ))
                    .with_color(error_color),
            );

    if !err_expected.is_empty() {
        report = report.with_note(format!(
            "{}{}",
            if err_expected.len() == 1 {
                format!("Expected {}", err_expected[0])
            } else {
                format!("Expected one of {}", err_expected.join(", "))
            },
            match err.found() {
                Some(tok) => format!(", but found `{}`", tok),
                None => "".to_owned(),
            }
        ));
    }

    let mut buf: Vec<u8> = vec![];
    match report
        .finish()
        .write(sources(vec![("input", src)]), &mut buf)
    {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{} in {:?}", title, src),
    }
}

// Helpers

fn integer() -> impl P<i64> {
    just('-').or_not().then(text::int(10)).try_map(
        |(neg, digits): (Option<char>, String), span| {
            digits
                .parse::<i64>()
                .map(|n| if neg.is_some() { -n } else { n })
                .map_err(|e| Simple::custom(span, e.to_string()))
        },
    )
}

fn word() -> impl P<String> {
    filter(|c: &char| !c.is_whitespace() && *c != '"')
        .repeated()
        .at_least(1)
        .collect()
}

// Constraint templates

fn symbol() -> impl P<Symbol> {
    filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
                .repeated()
                .collect::<String>(),
        )
        .map(|(first, rest)| Symbol(format!("{}{}", first, rest)))
}

fn atom() -> impl P<Term> {
    choice((integer().map(Term::Const), symbol().map(Term::Var))).padded()
}

fn term() -> impl P<Term> {
    #[derive(Clone)]
    enum Op {
        Add,
        Sub,
    }

    atom()
        .then(
            choice((just('+').to(Op::Add), just('-').to(Op::Sub)))
                .padded()
                .then(atom())
                .repeated(),
        )
        .foldl(|lhs, (op, rhs)| match op {
            Op::Add => Term::Add(Box::new(lhs), Box::new(rhs)),
            Op::Sub => Term::Sub(Box::new(lhs), Box::new(rhs)),
        })
}

fn comparison() -> impl P<Formula> {
    #[derive(Clone)]
    enum Cmp {
        Eq,
        Ne,
        Lt,
        Le,
        Gt,
        Ge,
    }

    term()
        .then(
            choice((
                just("<=").to(Cmp::Le),
                just(">=").to(Cmp::Ge),
                just("!=").to(Cmp::Ne),
                just('<').to(Cmp::Lt),
                just('>').to(Cmp::Gt),
                just('=').to(Cmp::Eq),
            ))
            .padded(),
        )
        .then(term())
        .then_ignore(end())
        .map(|((left, cmp), right)| match cmp {
            Cmp::Eq => Formula::Eq(left, right),
            Cmp::Ne => Formula::not(Formula::Eq(left, right)),
            Cmp::Lt => Formula::Lt(left, right),
            Cmp::Le => Formula::Le(left, right),
            Cmp::Gt => Formula::Lt(right, left),
            Cmp::Ge => Formula::Le(right, left),
        })
}

/// Parse a constraint template such as `o.len = x1.len + x2.len`.
pub fn template(src: &str) -> Result<Formula, String> {
    comparison()
        .parse(src)
        .map_err(|errs| error("Template parse error", 1, src, &errs[0]))
}

// Productions

fn production() -> impl P<Production> {
    let string_literal = none_of("\"")
        .repeated()
        .collect::<String>()
        .delimited_by(just('"'), just('"'))
        .map(|s| format!("\"{}\"", s));

    choice((string_literal, word()))
        .then(word().padded().repeated())
        .padded()
        .then_ignore(end())
        .map(|(label, args)| Production {
            label,
            args: args.into_iter().map(Nonterminal).collect(),
        })
}

// Special case: convert Production from String

impl TryFrom<String> for Production {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        production()
            .parse(s.as_str())
            .map_err(|errs| error("Production parse error", 0, &s, &errs[0]))
    }
}

// Top-level functions

/// Parse a problem
pub fn problem(src: &str) -> Result<Problem, String> {
    toml::from_str(src).map_err(|e| e.to_string())
}

/// Parse a search configuration
pub fn config(src: &str) -> Result<search::Config, String> {
    toml::from_str(src).map_err(|e| e.to_string())
}
