//! Recursive-descent parser for OPENQASM 2.0.

use sleipnir_ast::{Ast, BinOpKind, NodeId, UnaryOpKind};

use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse an OPENQASM 2.0 source string into an AST arena plus the root
/// `QasmVersion` node.
pub fn parse(source: &str) -> ParseResult<(Ast, NodeId)> {
    let mut parser = Parser::new(source)?;
    let root = parser.parse_program()?;
    Ok((parser.ast, root))
}

/// Parser state.
struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    line_starts: Vec<usize>,
    ast: Ast,
}

impl Parser {
    fn new(source: &str) -> ParseResult<Self> {
        let mut tokens = Vec::new();
        for result in tokenize(source) {
            match result {
                Ok(t) => tokens.push(t),
                Err((span, message)) => {
                    return Err(ParseError::LexerError {
                        position: span.start,
                        message,
                    });
                }
            }
        }

        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );

        Ok(Self {
            tokens,
            pos: 0,
            line_starts,
            ast: Ast::new(),
        })
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<Token> {
        if self.is_eof() {
            return None;
        }
        let token = self.tokens[self.pos].token.clone();
        self.pos += 1;
        Some(token)
    }

    /// Source line of the current token (1-based).
    fn line(&self) -> usize {
        let offset = self
            .tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or(0, |t| t.span.start);
        self.line_starts.partition_point(|&s| s <= offset)
    }

    fn unexpected(&self, expected: impl Into<String>, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.line(),
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Expect a specific token (compared by discriminant).
    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        let line = self.line();
        let found = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof(format!("expected {expected}")))?;

        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(ParseError::UnexpectedToken {
                line,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        let line = self.line();
        match self.advance() {
            Some(Token::Identifier(name)) => Ok(name),
            Some(found) => Err(ParseError::UnexpectedToken {
                line,
                expected: "identifier".into(),
                found: found.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("expected identifier".into())),
        }
    }

    fn expect_int(&mut self) -> ParseResult<i64> {
        let line = self.line();
        match self.advance() {
            Some(Token::IntLiteral(v)) => Ok(v),
            Some(found) => Err(ParseError::UnexpectedToken {
                line,
                expected: "integer literal".into(),
                found: found.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("expected integer literal".into())),
        }
    }

    // ---- Grammar ---------------------------------------------------------

    fn parse_program(&mut self) -> ParseResult<NodeId> {
        self.expect(Token::OpenQasm)?;
        let version = match self.advance() {
            Some(Token::RealLiteral(v)) => v,
            Some(found) => return Err(ParseError::InvalidVersion(found.to_string())),
            None => return Err(ParseError::UnexpectedEof("expected version".into())),
        };
        self.expect(Token::Semicolon)?;

        let stmts = self.ast.stmt_list();
        while !self.is_eof() {
            let stmt = self.parse_statement()?;
            self.ast.list_push(stmts, stmt)?;
        }

        let version = self.ast.lit_real(version);
        Ok(self.ast.qasm_version(version, stmts))
    }

    fn parse_statement(&mut self) -> ParseResult<NodeId> {
        match self.peek() {
            Some(Token::Include) => self.parse_include(),
            Some(Token::Qreg) => self.parse_reg_decl(true),
            Some(Token::Creg) => self.parse_reg_decl(false),
            Some(Token::Gate) => self.parse_gate_decl(),
            Some(Token::Opaque) => self.parse_opaque_decl(),
            Some(Token::If) => self.parse_if_stmt(),
            Some(Token::Barrier) => self.parse_barrier(),
            Some(_) => self.parse_qop(),
            None => Err(ParseError::UnexpectedEof("expected statement".into())),
        }
    }

    /// Includes are recorded, not resolved: the inner statement list stays
    /// empty until a driver substitutes the referenced file.
    fn parse_include(&mut self) -> ParseResult<NodeId> {
        self.expect(Token::Include)?;
        let line = self.line();
        let filename = match self.advance() {
            Some(Token::StringLiteral(s)) => s,
            Some(found) => {
                return Err(ParseError::UnexpectedToken {
                    line,
                    expected: "string literal".into(),
                    found: found.to_string(),
                });
            }
            None => return Err(ParseError::UnexpectedEof("expected filename".into())),
        };
        self.expect(Token::Semicolon)?;

        let filename = self.ast.lit_id(filename);
        let inner = self.ast.stmt_list();
        Ok(self.ast.include(filename, inner))
    }

    fn parse_reg_decl(&mut self, quantum: bool) -> ParseResult<NodeId> {
        self.advance();
        let name = self.expect_identifier()?;
        self.expect(Token::LBracket)?;
        let size = self.expect_int()?;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;

        let name = self.ast.lit_id(name);
        let size = self.ast.lit_int(size);
        Ok(self.ast.reg_decl(quantum, name, size))
    }

    /// Comma-separated identifier list (gate formals).
    fn parse_id_list(&mut self) -> ParseResult<NodeId> {
        let list = self.ast.list();
        loop {
            let name = self.expect_identifier()?;
            let id = self.ast.lit_id(name);
            self.ast.list_push(list, id)?;
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        Ok(list)
    }

    /// Optional parenthesized classical formal list.
    fn parse_opt_formals(&mut self) -> ParseResult<NodeId> {
        if self.consume(&Token::LParen) {
            if self.consume(&Token::RParen) {
                Ok(self.ast.list())
            } else {
                let list = self.parse_id_list()?;
                self.expect(Token::RParen)?;
                Ok(list)
            }
        } else {
            Ok(self.ast.list())
        }
    }

    fn parse_gate_decl(&mut self) -> ParseResult<NodeId> {
        self.expect(Token::Gate)?;
        let name = self.expect_identifier()?;
        let args = self.parse_opt_formals()?;
        let qargs = self.parse_id_list()?;
        self.expect(Token::LBrace)?;

        let body = self.ast.gop_list();
        while !self.check(&Token::RBrace) {
            if self.is_eof() {
                return Err(ParseError::UnexpectedEof("unterminated gate body".into()));
            }
            let op = if self.check(&Token::Barrier) {
                self.parse_barrier()?
            } else {
                self.parse_qop()?
            };
            self.ast.list_push(body, op)?;
        }
        self.expect(Token::RBrace)?;

        let name = self.ast.lit_id(name);
        Ok(self.ast.gate_decl(name, args, qargs, body))
    }

    fn parse_opaque_decl(&mut self) -> ParseResult<NodeId> {
        self.expect(Token::Opaque)?;
        let name = self.expect_identifier()?;
        let args = self.parse_opt_formals()?;
        let qargs = self.parse_id_list()?;
        self.expect(Token::Semicolon)?;

        let name = self.ast.lit_id(name);
        Ok(self.ast.gate_sign(name, args, qargs))
    }

    fn parse_if_stmt(&mut self) -> ParseResult<NodeId> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let cond = self.expect_identifier()?;
        self.expect(Token::EqEq)?;
        let value = self.expect_int()?;
        self.expect(Token::RParen)?;
        let qop = self.parse_qop()?;

        let cond = self.ast.lit_id(cond);
        let value = self.ast.lit_int(value);
        Ok(self.ast.if_stmt(cond, value, qop))
    }

    fn parse_barrier(&mut self) -> ParseResult<NodeId> {
        self.expect(Token::Barrier)?;
        let qargs = self.parse_arg_list()?;
        self.expect(Token::Semicolon)?;
        Ok(self.ast.barrier(qargs))
    }

    fn parse_qop(&mut self) -> ParseResult<NodeId> {
        match self.peek() {
            Some(Token::Measure) => {
                self.advance();
                let qbit = self.parse_arg()?;
                self.expect(Token::Arrow)?;
                let cbit = self.parse_arg()?;
                self.expect(Token::Semicolon)?;
                Ok(self.ast.measure(qbit, cbit))
            }

            Some(Token::Reset) => {
                self.advance();
                let qarg = self.parse_arg()?;
                self.expect(Token::Semicolon)?;
                Ok(self.ast.reset(qarg))
            }

            Some(Token::GateU) => {
                self.advance();
                self.expect(Token::LParen)?;
                let args = self.parse_exp_list()?;
                self.expect(Token::RParen)?;
                let qarg = self.parse_arg()?;
                self.expect(Token::Semicolon)?;
                Ok(self.ast.u(args, qarg))
            }

            Some(Token::GateCX) => {
                self.advance();
                let lhs = self.parse_arg()?;
                self.expect(Token::Comma)?;
                let rhs = self.parse_arg()?;
                self.expect(Token::Semicolon)?;
                Ok(self.ast.cx(lhs, rhs))
            }

            Some(Token::Identifier(_)) => {
                let name = self.expect_identifier()?;
                let args = if self.consume(&Token::LParen) {
                    if self.consume(&Token::RParen) {
                        self.ast.list()
                    } else {
                        let list = self.parse_exp_list()?;
                        self.expect(Token::RParen)?;
                        list
                    }
                } else {
                    self.ast.list()
                };
                let qargs = self.parse_arg_list()?;
                self.expect(Token::Semicolon)?;

                let name = self.ast.lit_id(name);
                Ok(self.ast.call(name, args, qargs))
            }

            Some(found) => Err(self.unexpected("quantum operation", &found.clone())),
            None => Err(ParseError::UnexpectedEof("expected quantum operation".into())),
        }
    }

    /// Comma-separated qubit arguments: `q`, `q[i]`.
    fn parse_arg_list(&mut self) -> ParseResult<NodeId> {
        let list = self.ast.list();
        loop {
            let arg = self.parse_arg()?;
            self.ast.list_push(list, arg)?;
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        Ok(list)
    }

    fn parse_arg(&mut self) -> ParseResult<NodeId> {
        let name = self.expect_identifier()?;
        if self.consume(&Token::LBracket) {
            let index = self.expect_int()?;
            self.expect(Token::RBracket)?;
            let name = self.ast.lit_id(name);
            let index = self.ast.lit_int(index);
            Ok(self.ast.id_ref(name, index))
        } else {
            Ok(self.ast.lit_id(name))
        }
    }

    fn parse_exp_list(&mut self) -> ParseResult<NodeId> {
        let list = self.ast.list();
        loop {
            let exp = self.parse_exp()?;
            self.ast.list_push(list, exp)?;
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        Ok(list)
    }

    // Precedence climbing: additive < multiplicative < power < unary.

    fn parse_exp(&mut self) -> ParseResult<NodeId> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOpKind::Add,
                Some(Token::Minus) => BinOpKind::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = self.ast.bin_op(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<NodeId> {
        let mut lhs = self.parse_power()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOpKind::Mul,
                Some(Token::Slash) => BinOpKind::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_power()?;
            lhs = self.ast.bin_op(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_power(&mut self) -> ParseResult<NodeId> {
        let lhs = self.parse_unary()?;
        if self.consume(&Token::Caret) {
            // Right-associative.
            let rhs = self.parse_power()?;
            Ok(self.ast.bin_op(BinOpKind::Pow, lhs, rhs))
        } else {
            Ok(lhs)
        }
    }

    fn parse_unary(&mut self) -> ParseResult<NodeId> {
        let op = match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let operand = self.parse_unary()?;
                return Ok(self.ast.unary_op(UnaryOpKind::Neg, operand));
            }
            Some(Token::Sin) => Some(UnaryOpKind::Sin),
            Some(Token::Cos) => Some(UnaryOpKind::Cos),
            Some(Token::Tan) => Some(UnaryOpKind::Tan),
            Some(Token::Exp) => Some(UnaryOpKind::Exp),
            Some(Token::Ln) => Some(UnaryOpKind::Ln),
            Some(Token::Sqrt) => Some(UnaryOpKind::Sqrt),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            self.expect(Token::LParen)?;
            let operand = self.parse_exp()?;
            self.expect(Token::RParen)?;
            Ok(self.ast.unary_op(op, operand))
        } else {
            self.parse_atom()
        }
    }

    fn parse_atom(&mut self) -> ParseResult<NodeId> {
        let line = self.line();
        match self.advance() {
            Some(Token::RealLiteral(v)) => Ok(self.ast.lit_real(v)),
            Some(Token::IntLiteral(v)) => Ok(self.ast.lit_int(v)),
            Some(Token::Pi) => Ok(self.ast.lit_id("pi")),
            Some(Token::Identifier(name)) => Ok(self.ast.lit_id(name)),
            Some(Token::LParen) => {
                // Parentheses are transparent; grouping is re-derived from
                // the tree on emission.
                let exp = self.parse_exp()?;
                self.expect(Token::RParen)?;
                Ok(exp)
            }
            Some(found) => Err(ParseError::UnexpectedToken {
                line,
                expected: "expression".into(),
                found: found.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("expected expression".into())),
        }
    }
}
