//! Lexer for OPENQASM 2.0.

use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Tokens for OPENQASM 2.0.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // Keywords
    #[token("OPENQASM")]
    OpenQasm,

    #[token("include")]
    Include,

    #[token("qreg")]
    Qreg,

    #[token("creg")]
    Creg,

    #[token("gate")]
    Gate,

    #[token("opaque")]
    Opaque,

    #[token("measure")]
    Measure,

    #[token("reset")]
    Reset,

    #[token("barrier")]
    Barrier,

    #[token("if")]
    If,

    // Built-in gates (higher priority than identifier)
    #[token("U", priority = 3)]
    GateU,

    #[token("CX", priority = 3)]
    GateCX,

    // Constants and unary functions
    #[token("pi")]
    Pi,

    #[token("sin")]
    Sin,

    #[token("cos")]
    Cos,

    #[token("tan")]
    Tan,

    #[token("exp")]
    Exp,

    #[token("ln")]
    Ln,

    #[token("sqrt")]
    Sqrt,

    // Literals
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    RealLiteral(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLiteral(i64),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len()-1].to_string())
    })]
    StringLiteral(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Operators and punctuation
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("^")]
    Caret,

    #[token("==")]
    EqEq,

    #[token("->")]
    Arrow,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::OpenQasm => write!(f, "OPENQASM"),
            Token::Include => write!(f, "include"),
            Token::Qreg => write!(f, "qreg"),
            Token::Creg => write!(f, "creg"),
            Token::Gate => write!(f, "gate"),
            Token::Opaque => write!(f, "opaque"),
            Token::Measure => write!(f, "measure"),
            Token::Reset => write!(f, "reset"),
            Token::Barrier => write!(f, "barrier"),
            Token::If => write!(f, "if"),
            Token::GateU => write!(f, "U"),
            Token::GateCX => write!(f, "CX"),
            Token::Pi => write!(f, "pi"),
            Token::Sin => write!(f, "sin"),
            Token::Cos => write!(f, "cos"),
            Token::Tan => write!(f, "tan"),
            Token::Exp => write!(f, "exp"),
            Token::Ln => write!(f, "ln"),
            Token::Sqrt => write!(f, "sqrt"),
            Token::RealLiteral(v) => write!(f, "{v}"),
            Token::IntLiteral(v) => write!(f, "{v}"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Identifier(s) => write!(f, "{s}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::EqEq => write!(f, "=="),
            Token::Arrow => write!(f, "->"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A token together with its byte span in the source.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Range<usize>,
}

/// Tokenize a source string. Invalid input yields an error entry carrying
/// the offending span.
pub fn tokenize(source: &str) -> Vec<Result<SpannedToken, (Range<usize>, String)>> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok(SpannedToken { token, span }),
            Err(()) => Err((span, "invalid token".to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .into_iter()
            .map(|r| r.unwrap().token)
            .collect()
    }

    #[test]
    fn test_lex_reg_decl() {
        assert_eq!(
            tokens("qreg q[5];"),
            vec![
                Token::Qreg,
                Token::Identifier("q".into()),
                Token::LBracket,
                Token::IntLiteral(5),
                Token::RBracket,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_lex_builtins_vs_identifiers() {
        assert_eq!(
            tokens("CX cx U u"),
            vec![
                Token::GateCX,
                Token::Identifier("cx".into()),
                Token::GateU,
                Token::Identifier("u".into()),
            ]
        );
    }

    #[test]
    fn test_lex_real_and_int() {
        assert_eq!(
            tokens("2.0 3 0.5"),
            vec![
                Token::RealLiteral(2.0),
                Token::IntLiteral(3),
                Token::RealLiteral(0.5),
            ]
        );
    }

    #[test]
    fn test_lex_comments_skipped() {
        assert_eq!(
            tokens("reset q; // trailing comment\nbarrier q;"),
            vec![
                Token::Reset,
                Token::Identifier("q".into()),
                Token::Semicolon,
                Token::Barrier,
                Token::Identifier("q".into()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_lex_measure_arrow() {
        assert_eq!(
            tokens("measure q[0] -> c[0];"),
            vec![
                Token::Measure,
                Token::Identifier("q".into()),
                Token::LBracket,
                Token::IntLiteral(0),
                Token::RBracket,
                Token::Arrow,
                Token::Identifier("c".into()),
                Token::LBracket,
                Token::IntLiteral(0),
                Token::RBracket,
                Token::Semicolon,
            ]
        );
    }
}
