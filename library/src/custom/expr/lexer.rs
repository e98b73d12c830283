//! Tokenizer for the custom node body language.

use super::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Question,
    Colon,
    Comma,
    LeftParen,
    RightParen,
    /// Statement separator: `;` or a newline outside parentheses.
    Separator,
}

#[derive(Debug, Clone)]
pub(super) struct SpannedToken {
    pub token: Token,
    pub line: u32,
    pub column: u32,
}

pub(super) fn tokenize(source: &str) -> Result<Vec<SpannedToken>, CompileError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    paren_depth: u32,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            paren_depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn run(mut self) -> Result<Vec<SpannedToken>, CompileError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let line = self.line;
            let column = self.column;

            let token = match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                    continue;
                }
                '\n' => {
                    self.advance();
                    // Newlines separate statements unless a parenthesized
                    // expression is still open.
                    if self.paren_depth == 0 {
                        Token::Separator
                    } else {
                        continue;
                    }
                }
                '/' if self.peek_next() == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                    continue;
                }
                ';' => {
                    self.advance();
                    Token::Separator
                }
                '+' => {
                    self.advance();
                    Token::Plus
                }
                '-' => {
                    self.advance();
                    Token::Minus
                }
                '*' => {
                    self.advance();
                    Token::Star
                }
                '/' => {
                    self.advance();
                    Token::Slash
                }
                '%' => {
                    self.advance();
                    Token::Percent
                }
                '?' => {
                    self.advance();
                    Token::Question
                }
                ':' => {
                    self.advance();
                    Token::Colon
                }
                ',' => {
                    self.advance();
                    Token::Comma
                }
                '(' => {
                    self.advance();
                    self.paren_depth += 1;
                    Token::LeftParen
                }
                ')' => {
                    self.advance();
                    self.paren_depth = self.paren_depth.saturating_sub(1);
                    Token::RightParen
                }
                '=' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::Equal
                    } else {
                        Token::Assign
                    }
                }
                '!' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::NotEqual
                    } else {
                        Token::Bang
                    }
                }
                '<' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::LessEqual
                    } else {
                        Token::Less
                    }
                }
                '>' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::GreaterEqual
                    } else {
                        Token::Greater
                    }
                }
                '&' => {
                    self.advance();
                    if self.peek() == Some('&') {
                        self.advance();
                        Token::And
                    } else {
                        return Err(CompileError::new("Unexpected character '&'", line, column));
                    }
                }
                '|' => {
                    self.advance();
                    if self.peek() == Some('|') {
                        self.advance();
                        Token::Or
                    } else {
                        return Err(CompileError::new("Unexpected character '|'", line, column));
                    }
                }
                c if c.is_ascii_digit() => self.number(line, column)?,
                c if c.is_alphabetic() || c == '_' => self.identifier(),
                c => {
                    return Err(CompileError::new(
                        format!("Unexpected character '{}'", c),
                        line,
                        column,
                    ));
                }
            };

            tokens.push(SpannedToken {
                token,
                line,
                column,
            });
        }

        Ok(tokens)
    }

    fn number(&mut self, line: u32, column: u32) -> Result<Token, CompileError> {
        let mut text = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            if let Some(c) = self.advance() {
                text.push(c);
            }
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            if let Some(c) = self.advance() {
                text.push(c);
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                if let Some(c) = self.advance() {
                    text.push(c);
                }
            }
        }
        if self.peek() == Some('e') || self.peek() == Some('E') {
            let mut lookahead = self.pos + 1;
            if self.chars.get(lookahead) == Some(&'+') || self.chars.get(lookahead) == Some(&'-') {
                lookahead += 1;
            }
            if self.chars.get(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                while self.pos < lookahead {
                    if let Some(c) = self.advance() {
                        text.push(c);
                    }
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    if let Some(c) = self.advance() {
                        text.push(c);
                    }
                }
            }
        }

        match text.parse::<f64>() {
            Ok(value) => Ok(Token::Number(value)),
            Err(_) => Err(CompileError::new(
                format!("Malformed number '{}'", text),
                line,
                column,
            )),
        }
    }

    fn identifier(&mut self) -> Token {
        let mut text = String::new();
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            if let Some(c) = self.advance() {
                text.push(c);
            }
        }
        Token::Identifier(text)
    }
}
