//! Source text tokenizer.

use crate::errors::{AstError, AstResult};
use crate::Loc;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until};
use nom::character::complete::{alpha1, alphanumeric1, digit1, multispace1, not_line_ending};
use nom::combinator::{map, recognize, value};
use nom::multi::many0_count;
use nom::sequence::{pair, tuple};
use nom::IResult;
use std::fmt;

const KEYWORDS: &[&str] = &[
    "boolean", "break", "class", "continue", "else", "extends", "false", "if", "int", "new",
    "public", "return", "static", "this", "true", "void", "while", "String",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Int(String),
    Keyword(&'static str),
    Punct(&'static str),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier `{name}`"),
            Self::Int(lit) => write!(f, "integer `{lit}`"),
            Self::Keyword(kw) => write!(f, "keyword `{kw}`"),
            Self::Punct(p) => write!(f, "`{p}`"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Loc,
}

// Whitespaces, line comments and block comments.
fn trivia(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0_count(alt((
            multispace1,
            recognize(pair(tag("//"), not_line_ending)),
            recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
        ))),
    )(input)
}

fn word(input: &str) -> IResult<&str, TokenKind> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
        |w: &str| match KEYWORDS.iter().find(|kw| **kw == w) {
            Some(kw) => TokenKind::Keyword(*kw),
            None => TokenKind::Ident(w.to_string()),
        },
    )(input)
}

fn number(input: &str) -> IResult<&str, TokenKind> {
    map(digit1, |d: &str| TokenKind::Int(d.to_string()))(input)
}

fn punct(input: &str) -> IResult<&str, TokenKind> {
    // two-chars operators must be tried first
    map(
        alt((
            alt((
                value("&&", tag("&&")),
                value("||", tag("||")),
                value("<=", tag("<=")),
                value(">=", tag(">=")),
                value("==", tag("==")),
                value("!=", tag("!=")),
            )),
            alt((
                value("{", tag("{")),
                value("}", tag("}")),
                value("(", tag("(")),
                value(")", tag(")")),
                value("[", tag("[")),
                value("]", tag("]")),
                value(";", tag(";")),
                value(",", tag(",")),
                value(".", tag(".")),
                value("=", tag("=")),
                value("<", tag("<")),
                value(">", tag(">")),
                value("+", tag("+")),
                value("-", tag("-")),
                value("*", tag("*")),
                value("/", tag("/")),
                value("%", tag("%")),
                value("!", tag("!")),
            )),
        )),
        TokenKind::Punct,
    )(input)
}

fn token(input: &str) -> IResult<&str, TokenKind> {
    alt((number, word, punct))(input)
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    loc: Loc,
}

impl Cursor {
    fn advance(&mut self, consumed: &str) {
        for c in consumed.chars() {
            if c == '\n' {
                self.loc.line += 1;
                self.loc.col = 1;
            } else {
                self.loc.col += 1;
            }
        }
    }
}

/// Splits source text into tokens. The returned vector always ends
/// with a [`TokenKind::Eof`] token.
///
/// # Errors
///
/// Returns [`AstError::Lexing`] on the first character that cannot
/// start a token.
pub fn tokenize(src: &str) -> AstResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut cursor = Cursor { loc: Loc::start() };
    let mut rest = src;

    loop {
        // trivia parser only fails on incomplete input, which cannot
        // happen with complete combinators
        if let Ok((next, ())) = trivia(rest) {
            cursor.advance(&rest[..rest.len() - next.len()]);
            rest = next;
        }
        if rest.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                loc: cursor.loc,
            });
            return Ok(tokens);
        }
        match token(rest) {
            Ok((next, kind)) => {
                tokens.push(Token {
                    kind,
                    loc: cursor.loc,
                });
                cursor.advance(&rest[..rest.len() - next.len()]);
                rest = next;
            }
            Err(_) => {
                return Err(AstError::Lexing {
                    loc: cursor.loc,
                    found: rest.chars().next().unwrap_or_default(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_idents() {
        assert_eq!(
            kinds("while whiley _x1"),
            vec![
                TokenKind::Keyword("while"),
                TokenKind::Ident("whiley".to_string()),
                TokenKind::Ident("_x1".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn two_chars_operators() {
        assert_eq!(
            kinds("a<=b&&c"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Punct("<="),
                TokenKind::Ident("b".to_string()),
                TokenKind::Punct("&&"),
                TokenKind::Ident("c".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("// line\nx /* block\n comment */ 42"),
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::Int("42".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn locations() {
        let tokens = tokenize("x =\n  1;").unwrap();
        assert_eq!(tokens[0].loc, Loc { line: 1, col: 1 });
        assert_eq!(tokens[1].loc, Loc { line: 1, col: 3 });
        assert_eq!(tokens[2].loc, Loc { line: 2, col: 3 });
        assert_eq!(tokens[3].loc, Loc { line: 2, col: 4 });
    }

    #[test]
    fn bad_character() {
        match tokenize("x = #") {
            Err(AstError::Lexing { loc, found }) => {
                assert_eq!(loc, Loc { line: 1, col: 5 });
                assert_eq!(found, '#');
            }
            res => panic!("unexpected result: {res:?}"),
        }
    }
}
