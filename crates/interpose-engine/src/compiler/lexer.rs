//! Lexer for proxy descriptors.
//!
//! Uses logos for tokenization; spans carry 1-based line/column positions
//! for diagnostics.

use logos::Logos;

use crate::compiler::error::CompileError;

/// Descriptor token
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Whitespace (skip)
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Whitespace,

    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    // Keywords (must come before paths)
    #[token("use")]
    Use,

    #[token("class")]
    Class,

    #[token("extends")]
    Extends,

    #[token("slot")]
    Slot,

    #[token("init")]
    Init,

    #[token("none")]
    Nothing,

    #[token("super")]
    Super,

    #[token("with")]
    With,

    #[token("passthrough")]
    Passthrough,

    #[token("override")]
    Override,

    #[token("throws")]
    Throws,

    #[token("from")]
    From,

    #[token("null")]
    Null,

    #[token("true")]
    True,

    #[token("false")]
    False,

    // Identifiers and dotted paths (`$` allowed for nested and generated names)
    #[regex(r"[A-Za-z_][A-Za-z0-9_$]*(\.[A-Za-z_][A-Za-z0-9_$]*)*", |lex| lex.slice().to_string())]
    Path(String),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // Punctuation
    #[token("->")]
    Arrow,

    #[token("...")]
    Ellipsis,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("#")]
    Hash,

    #[token("=")]
    Equals,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,
}

impl Token {
    /// Short description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Token::Path(p) => format!("`{}`", p),
            Token::Int(i) => format!("integer {}", i),
            Token::Float(f) => format!("float {}", f),
            other => format!("{:?}", other).to_lowercase(),
        }
    }
}

/// Source location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset past the last character
    pub end: usize,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

impl Span {
    fn locate(source: &str, start: usize, end: usize) -> Self {
        let before = &source[..start];
        let line = before.matches('\n').count() as u32 + 1;
        let column = match before.rfind('\n') {
            Some(nl) => before[nl + 1..].chars().count(),
            None => before.chars().count(),
        } as u32
            + 1;
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// Tokenize `source`, stopping at the first unrecognized input
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>, CompileError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::locate(source, range.start, range.end);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(CompileError::Lex {
                    line: span.line,
                    column: span.column,
                    message: format!("unexpected input {:?}", lexer.slice()),
                })
            }
        }
    }
    Ok(tokens)
}
