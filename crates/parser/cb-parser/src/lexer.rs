//! Tokenizer for C headers
//!
//! Built from nom combinators over a located input so every token keeps
//! its byte offset. Comments and preprocessor directives are dropped.

use cb_span::Span;
use cb_syntax::{Keyword, Punct, Token, TokenKind};
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, tag_no_case, take_until, take_while};
use nom::character::complete::{
    alpha1, alphanumeric1, anychar, char, digit1, hex_digit1, multispace1,
};
use nom::combinator::{map, map_opt, recognize, value};
use nom::multi::{many0, many0_count};
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;
use nom_locate::LocatedSpan;

/// Located lexer input
pub type Input<'a> = LocatedSpan<&'a str>;

/// Problems found while tokenizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// `/*` without a matching `*/`
    UnterminatedComment(Span),
}

/// Tokenize a whole header. The returned tokens always end with `Eof`.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut input = Input::new(source);

    loop {
        if let Ok((rest, ())) = ignored(input) {
            input = rest;
        }

        let start = input.location_offset() as u32;
        if input.fragment().is_empty() {
            tokens.push(Token::new(TokenKind::Eof, Span::new(start, start)));
            break;
        }

        if input.fragment().starts_with("/*") {
            let end = source.len() as u32;
            errors.push(LexError::UnterminatedComment(Span::new(start, start + 2)));
            tokens.push(Token::new(TokenKind::Eof, Span::new(end, end)));
            break;
        }

        match token(input) {
            Ok((rest, kind)) => {
                let end = rest.location_offset() as u32;
                tokens.push(Token::new(kind, Span::new(start, end)));
                input = rest;
            }
            Err(_) => match anychar::<Input<'_>, nom::error::Error<Input<'_>>>(input) {
                Ok((rest, other)) => {
                    let end = rest.location_offset() as u32;
                    tokens.push(Token::new(TokenKind::Other(other), Span::new(start, end)));
                    input = rest;
                }
                Err(_) => break,
            },
        }
    }

    (tokens, errors)
}

fn token(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    alt((word, number, string_literal, punct))(input)
}

/// Identifiers and keywords
fn word(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
        |text: Input<'_>| match Keyword::from_ident(text.fragment()) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident((*text.fragment()).to_string()),
        },
    )(input)
}

/// Integer literals with optional `u`/`l` suffixes
fn number(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    map_opt(
        pair(
            alt((recognize(pair(tag_no_case("0x"), hex_digit1)), digit1)),
            take_while(|c: char| matches!(c, 'u' | 'U' | 'l' | 'L')),
        ),
        |(digits, _suffix): (Input<'_>, Input<'_>)| {
            parse_integer(digits.fragment()).map(TokenKind::Number)
        },
    )(input)
}

fn parse_integer(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if text.len() > 1 && text.starts_with('0') {
        u64::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse().ok()
    }
}

fn string_literal(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    map(
        delimited(
            char('"'),
            recognize(many0_count(alt((
                is_not("\"\\\n"),
                recognize(pair(char('\\'), anychar)),
            )))),
            char('"'),
        ),
        |text: Input<'_>| TokenKind::Str((*text.fragment()).to_string()),
    )(input)
}

fn punct(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    map(
        alt((
            value(Punct::Ellipsis, tag("...")),
            value(Punct::Semi, char(';')),
            value(Punct::Comma, char(',')),
            value(Punct::Star, char('*')),
            value(Punct::LParen, char('(')),
            value(Punct::RParen, char(')')),
            value(Punct::LBracket, char('[')),
            value(Punct::RBracket, char(']')),
            value(Punct::LBrace, char('{')),
            value(Punct::RBrace, char('}')),
            value(Punct::Eq, char('=')),
        )),
        TokenKind::Punct,
    )(input)
}

/// Parser for single-line comments (// ...)
fn line_comment(input: Input<'_>) -> IResult<Input<'_>, ()> {
    value((), pair(tag("//"), take_while(|c| c != '\n')))(input)
}

/// Parser for multi-line comments (/* ... */)
fn block_comment(input: Input<'_>) -> IResult<Input<'_>, ()> {
    value((), tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

/// Preprocessor directive, including backslash-continued lines
fn directive(input: Input<'_>) -> IResult<Input<'_>, ()> {
    value(
        (),
        preceded(
            char('#'),
            many0_count(alt((
                tag("\\\r\n"),
                tag("\\\n"),
                is_not("\\\n"),
                tag("\\"),
            ))),
        ),
    )(input)
}

/// Parser that consumes any amount of whitespace, comments and directives
fn ignored(input: Input<'_>) -> IResult<Input<'_>, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            line_comment,
            block_comment,
            directive,
        ))),
    )(input)
}
