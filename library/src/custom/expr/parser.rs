//! Recursive-descent parser producing the statement list a program executes.

use super::lexer::{SpannedToken, Token};
use super::CompileError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Expr {
    Number(f64),
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// One `target = expression` statement. A bare expression has no target
/// and is assigned to the first declared output by the caller.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Statement {
    pub target: Option<String>,
    pub expr: Expr,
}

pub(super) fn parse(tokens: Vec<SpannedToken>) -> Result<Vec<Statement>, CompileError> {
    Parser { tokens, pos: 0 }.run()
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn run(mut self) -> Result<Vec<Statement>, CompileError> {
        let mut statements = Vec::new();
        self.skip_separators();

        while !self.at_end() {
            statements.push(self.statement()?);
            if !self.at_end() && !self.check(&Token::Separator) {
                return Err(self.error_here("Expected ';' or newline"));
            }
            self.skip_separators();
        }

        if statements.is_empty() {
            return Err(CompileError::new("Empty program", 1, 1));
        }
        Ok(statements)
    }

    fn statement(&mut self) -> Result<Statement, CompileError> {
        if let Some(Token::Identifier(name)) = self.peek() {
            if matches!(self.peek_next(), Some(Token::Assign)) {
                let target = name.clone();
                self.pos += 2;
                let expr = self.expression()?;
                return Ok(Statement {
                    target: Some(target),
                    expr,
                });
            }
        }
        let expr = self.expression()?;
        Ok(Statement { target: None, expr })
    }

    fn expression(&mut self) -> Result<Expr, CompileError> {
        self.ternary()
    }

    fn ternary(&mut self) -> Result<Expr, CompileError> {
        let condition = self.logical_or()?;
        if self.matches(&Token::Question) {
            let then_branch = self.expression()?;
            self.expect(&Token::Colon, "Expected ':' in conditional")?;
            let else_branch = self.ternary()?;
            return Ok(Expr::Ternary(
                Box::new(condition),
                Box::new(then_branch),
                Box::new(else_branch),
            ));
        }
        Ok(condition)
    }

    fn logical_or(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.logical_and()?;
        while self.matches(&Token::Or) {
            let right = self.logical_and()?;
            expr = Expr::Binary(BinaryOp::Or, Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.equality()?;
        while self.matches(&Token::And) {
            let right = self.equality()?;
            expr = Expr::Binary(BinaryOp::And, Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.comparison()?;
        loop {
            let op = if self.matches(&Token::Equal) {
                BinaryOp::Equal
            } else if self.matches(&Token::NotEqual) {
                BinaryOp::NotEqual
            } else {
                return Ok(expr);
            };
            let right = self.comparison()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(right));
        }
    }

    fn comparison(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.additive()?;
        loop {
            let op = if self.matches(&Token::Less) {
                BinaryOp::Less
            } else if self.matches(&Token::LessEqual) {
                BinaryOp::LessEqual
            } else if self.matches(&Token::Greater) {
                BinaryOp::Greater
            } else if self.matches(&Token::GreaterEqual) {
                BinaryOp::GreaterEqual
            } else {
                return Ok(expr);
            };
            let right = self.additive()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(right));
        }
    }

    fn additive(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.multiplicative()?;
        loop {
            let op = if self.matches(&Token::Plus) {
                BinaryOp::Add
            } else if self.matches(&Token::Minus) {
                BinaryOp::Subtract
            } else {
                return Ok(expr);
            };
            let right = self.multiplicative()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.unary()?;
        loop {
            let op = if self.matches(&Token::Star) {
                BinaryOp::Multiply
            } else if self.matches(&Token::Slash) {
                BinaryOp::Divide
            } else if self.matches(&Token::Percent) {
                BinaryOp::Modulo
            } else {
                return Ok(expr);
            };
            let right = self.unary()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        if self.matches(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Negate, Box::new(operand)));
        }
        if self.matches(&Token::Bang) {
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        match self.peek().cloned() {
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(Expr::Number(value))
            }
            Some(Token::Identifier(name)) => {
                self.pos += 1;
                if self.matches(&Token::LeftParen) {
                    let mut args = Vec::new();
                    if !self.check(&Token::RightParen) {
                        loop {
                            args.push(self.expression()?);
                            if !self.matches(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RightParen, "Expected ')' after arguments")?;
                    return Ok(Expr::Call(name, args));
                }
                Ok(Expr::Variable(name))
            }
            Some(Token::LeftParen) => {
                self.pos += 1;
                let expr = self.expression()?;
                self.expect(&Token::RightParen, "Expected ')'")?;
                Ok(expr)
            }
            _ => Err(self.error_here("Expected an expression")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|t| &t.token)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn matches(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, message: &str) -> Result<(), CompileError> {
        if self.matches(token) {
            Ok(())
        } else {
            Err(self.error_here(message))
        }
    }

    fn skip_separators(&mut self) {
        while self.check(&Token::Separator) {
            self.pos += 1;
        }
    }

    fn error_here(&self, message: &str) -> CompileError {
        // Point at the current token, or just past the last one at end of input.
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(spanned) => CompileError::new(message, spanned.line, spanned.column),
            None => CompileError::new(message, 1, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom::expr::lexer::tokenize;

    fn parse_source(source: &str) -> Result<Vec<Statement>, CompileError> {
        parse(tokenize(source).expect("tokenize"))
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let statements = parse_source("1 + 2 * 3").expect("parse");
        assert_eq!(
            statements[0].expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    BinaryOp::Multiply,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0)),
                )),
            )
        );
    }

    #[test]
    fn test_assignment_and_bare_statements() {
        let statements = parse_source("out = a\na + 1").expect("parse");
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].target.as_deref(), Some("out"));
        assert_eq!(statements[1].target, None);
    }

    #[test]
    fn test_call_with_arguments() {
        let statements = parse_source("clamp(x, 0, 1)").expect("parse");
        assert_eq!(
            statements[0].expr,
            Expr::Call(
                "clamp".to_string(),
                vec![
                    Expr::Variable("x".to_string()),
                    Expr::Number(0.0),
                    Expr::Number(1.0),
                ],
            )
        );
    }

    #[test]
    fn test_dangling_operator_is_an_error() {
        let err = parse_source("1 +").unwrap_err();
        assert!(err.message.contains("Expected an expression"));
    }

    #[test]
    fn test_missing_separator_is_an_error() {
        let err = parse_source("a = 1 b = 2").unwrap_err();
        assert!(err.message.contains("Expected ';' or newline"));
    }

    #[test]
    fn test_empty_source_is_an_error() {
        let err = parse_source("// nothing here\n").unwrap_err();
        assert!(err.message.contains("Empty program"));
    }
}
