//! Lexer for the Prolog subset, using Logos
//!
//! Tokenizes source text into a stream of tokens with byte spans.
//! `%` starts a comment that runs to the end of the line.

use logos::Logos;
use std::fmt;

/// Token types for the Prolog subset
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"%[^\n]*")]
pub enum Token {
    #[token(":-")]
    Neck,
    #[token("?-")]
    QueryNeck,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("|")]
    Bar,

    // Relational operators. "is" must be a token so it outranks the atom
    // regex on an exact match.
    #[token("=<")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("\\=")]
    NotUnify,
    #[token("=")]
    Unify,
    #[token("is")]
    Is,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,

    #[regex("[a-z][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Atom(String),
    #[regex("[A-Z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Variable(String),
    #[regex("[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    Numeral(u64),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Neck => write!(f, "`:-`"),
            Token::QueryNeck => write!(f, "`?-`"),
            Token::Dot => write!(f, "`.`"),
            Token::Comma => write!(f, "`,`"),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::LBracket => write!(f, "`[`"),
            Token::RBracket => write!(f, "`]`"),
            Token::Bar => write!(f, "`|`"),
            Token::LessEq => write!(f, "`=<`"),
            Token::GreaterEq => write!(f, "`>=`"),
            Token::Less => write!(f, "`<`"),
            Token::Greater => write!(f, "`>`"),
            Token::NotUnify => write!(f, "`\\=`"),
            Token::Unify => write!(f, "`=`"),
            Token::Is => write!(f, "`is`"),
            Token::Plus => write!(f, "`+`"),
            Token::Minus => write!(f, "`-`"),
            Token::Star => write!(f, "`*`"),
            Token::Atom(name) => write!(f, "atom `{}`", name),
            Token::Variable(name) => write!(f, "variable `{}`", name),
            Token::Numeral(n) => write!(f, "numeral `{}`", n),
        }
    }
}

/// A token together with its byte range in the source
pub type SpannedToken = (Token, std::ops::Range<usize>);

/// Tokenize a whole source file. On failure returns the byte range of the
/// first unrecognized character.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, std::ops::Range<usize>> {
    let mut tokens = Vec::new();
    for (result, range) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, range)),
            Err(()) => return Err(range),
        }
    }
    Ok(tokens)
}
