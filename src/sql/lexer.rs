//! SQL lexer/tokenizer.
//!
//! The [`Lexer`] converts a SQL string into a stream of [`Token`]s with
//! 1-based line/column positions. It handles:
//! - Keywords (case-insensitive)
//! - Identifiers (unquoted and double-quoted, `""` escape)
//! - Numeric literals (digits with at most one `.`)
//! - String literals (single-quoted with `''` escape)
//! - Operators and punctuation, including `!=`, `<=`, `<>`, `>=`
//! - Comments (`--` line comments and `/* */` block comments)
//! - `?` positional placeholders
//!
//! Input no production matches is emitted as an [`TokenKind::Illegal`]
//! token; the caller decides whether that is a hard error.

use super::token::{Keyword, Position, Token, TokenKind};

/// SQL lexer over UTF-8 input.
pub struct Lexer<'a> {
    input: &'a str,
    /// Byte offset of the current rune.
    pos: usize,
    /// Byte offset one past the current rune.
    read_pos: usize,
    ch: Option<char>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Self {
            input,
            pos: 0,
            read_pos: 0,
            ch: None,
            line: 1,
            column: 0,
        };
        lexer.read_rune();
        lexer
    }

    /// Tokenizes the entire input.
    ///
    /// The returned vector always ends with an EOF token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Returns the next token from the input.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let pos = Position::new(self.line, self.column);

        let Some(ch) = self.ch else {
            return Token::new(TokenKind::Eof, pos);
        };

        // Productions that manage their own advancement.
        if ch == '\'' {
            return self.scan_string(pos);
        }
        if ch == '"' {
            return self.scan_quoted_identifier(pos);
        }
        if is_ident_start(ch) {
            return self.scan_identifier_or_keyword(pos);
        }
        if ch.is_ascii_digit() {
            return self.scan_number(pos);
        }

        // Single- and two-character operators and punctuation.
        let kind = match ch {
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '.' => TokenKind::Dot,
            '*' => TokenKind::Star,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '=' => TokenKind::Eq,
            '?' => TokenKind::Placeholder,
            '!' => {
                if self.peek_rune() == Some('=') {
                    self.read_rune();
                    TokenKind::Neq
                } else {
                    TokenKind::Illegal(ch.to_string())
                }
            }
            '<' => match self.peek_rune() {
                Some('=') => {
                    self.read_rune();
                    TokenKind::LtEq
                }
                Some('>') => {
                    self.read_rune();
                    TokenKind::Neq
                }
                _ => TokenKind::Lt,
            },
            '>' => {
                if self.peek_rune() == Some('=') {
                    self.read_rune();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            other => TokenKind::Illegal(other.to_string()),
        };

        self.read_rune();
        Token::new(kind, pos)
    }

    fn read_rune(&mut self) {
        if self.read_pos >= self.input.len() {
            self.ch = None;
            self.pos = self.read_pos;
            return;
        }
        let Some(ch) = self.input[self.read_pos..].chars().next() else {
            self.ch = None;
            self.pos = self.read_pos;
            return;
        };
        self.pos = self.read_pos;
        self.read_pos += ch.len_utf8();
        self.ch = Some(ch);
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    fn peek_rune(&self) -> Option<char> {
        self.input[self.read_pos..].chars().next()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.skip_whitespace();
            if !self.skip_comment() {
                break;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.ch.is_some_and(char::is_whitespace) {
            self.read_rune();
        }
    }

    fn skip_comment(&mut self) -> bool {
        // Line comment: -- to and including end of line.
        if self.ch == Some('-') && self.peek_rune() == Some('-') {
            while let Some(ch) = self.ch {
                self.read_rune();
                if ch == '\n' {
                    break;
                }
            }
            return true;
        }

        // Block comment: /* to */, no nesting; unterminated runs to EOF.
        if self.ch == Some('/') && self.peek_rune() == Some('*') {
            self.read_rune();
            self.read_rune();
            loop {
                match self.ch {
                    None => break,
                    Some('*') if self.peek_rune() == Some('/') => {
                        self.read_rune();
                        self.read_rune();
                        break;
                    }
                    Some(_) => self.read_rune(),
                }
            }
            return true;
        }

        false
    }

    fn scan_string(&mut self, pos: Position) -> Token {
        let mut value = String::new();
        loop {
            self.read_rune();
            match self.ch {
                None => break,
                Some('\'') => {
                    if self.peek_rune() == Some('\'') {
                        value.push('\'');
                        self.read_rune();
                    } else {
                        self.read_rune();
                        break;
                    }
                }
                Some(ch) => value.push(ch),
            }
        }
        Token::new(TokenKind::Str(value), pos)
    }

    fn scan_quoted_identifier(&mut self, pos: Position) -> Token {
        let mut value = String::new();
        loop {
            self.read_rune();
            match self.ch {
                None => break,
                Some('"') => {
                    if self.peek_rune() == Some('"') {
                        value.push('"');
                        self.read_rune();
                    } else {
                        self.read_rune();
                        break;
                    }
                }
                Some(ch) => value.push(ch),
            }
        }
        Token::new(TokenKind::Ident(value), pos)
    }

    fn scan_identifier_or_keyword(&mut self, pos: Position) -> Token {
        let start = self.pos;
        while self.ch.is_some_and(is_ident_part) {
            self.read_rune();
        }
        let ident = &self.input[start..self.pos];
        match Keyword::lookup(&ident.to_uppercase()) {
            Some(keyword) => Token::new(TokenKind::Keyword(keyword), pos),
            None => Token::new(TokenKind::Ident(ident.to_string()), pos),
        }
    }

    fn scan_number(&mut self, pos: Position) -> Token {
        let start = self.pos;
        let mut has_dot = false;
        while let Some(ch) = self.ch {
            if ch.is_ascii_digit() {
                self.read_rune();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.read_rune();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Number(self.input[start..self.pos].to_string()), pos)
    }
}

/// Returns true if the character can start an identifier.
fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

/// Returns true if the character can continue an identifier.
fn is_ident_part(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic() || ch.is_numeric()
}
