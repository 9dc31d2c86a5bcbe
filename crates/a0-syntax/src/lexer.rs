//! The A0 lexer.
//!
//! A straightforward single-pass character scanner: no indentation
//! sensitivity (the grammar is brace-delimited), no embedded-language
//! composition. Longest-match identifiers are looked up against the
//! reserved-word table after the full identifier has been scanned, so
//! `forEach` never gets confused with the `for` keyword.

use crate::tokens::{Token, TokenKind};
use a0_core::SourceSpan;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LexError {
    #[error("{file}:{line}:{col}: unterminated string literal")]
    UnterminatedString { file: Arc<str>, line: u32, col: u32 },
    #[error("{file}:{line}:{col}: invalid escape sequence '\\{ch}'")]
    InvalidEscape {
        file: Arc<str>,
        line: u32,
        col: u32,
        ch: char,
    },
    #[error("{file}:{line}:{col}: invalid number literal")]
    InvalidNumber { file: Arc<str>, line: u32, col: u32 },
    #[error("{file}:{line}:{col}: unexpected character '{ch}'")]
    UnexpectedChar {
        file: Arc<str>,
        line: u32,
        col: u32,
        ch: char,
    },
}

impl LexError {
    pub fn span(&self) -> SourceSpan {
        match self {
            LexError::UnterminatedString { file, line, col }
            | LexError::InvalidNumber { file, line, col }
            | LexError::InvalidEscape { file, line, col, .. }
            | LexError::UnexpectedChar { file, line, col, .. } => {
                SourceSpan::point(file.clone(), *line, *col)
            }
        }
    }
}

pub struct Lexer {
    file: Arc<str>,
    source: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
}

impl Lexer {
    pub fn new(file: impl Into<Arc<str>>, source: &str) -> Self {
        Lexer {
            file: file.into(),
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn here(&self) -> (u32, u32) {
        (self.line, self.col)
    }

    fn span_from(&self, start: (u32, u32)) -> SourceSpan {
        SourceSpan::new(self.file.clone(), start.0, start.1, self.line, self.col)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.current() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();
        let start = self.here();
        let Some(c) = self.current() else {
            return Ok(Token::new(TokenKind::Eof, self.span_from(start)));
        };

        if c.is_ascii_digit() {
            return self.lex_number(start);
        }
        if c == '"' {
            return self.lex_string(start);
        }
        if c.is_alphabetic() || c == '_' {
            return self.lex_ident_or_keyword(start);
        }

        self.advance();
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '+' => TokenKind::Plus,
            '-' => {
                if self.current() == Some('>') {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '.' => {
                if self.current() == Some('.') && self.peek_at(1) == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::DotDotDot
                } else {
                    TokenKind::Dot
                }
            }
            '=' => {
                if self.current() == Some('=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.current() == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    return Err(LexError::UnexpectedChar {
                        file: self.file.clone(),
                        line: start.0,
                        col: start.1,
                        ch: c,
                    });
                }
            }
            '<' => {
                if self.current() == Some('=') {
                    self.advance();
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.current() == Some('=') {
                    self.advance();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            other => {
                return Err(LexError::UnexpectedChar {
                    file: self.file.clone(),
                    line: start.0,
                    col: start.1,
                    ch: other,
                })
            }
        };
        Ok(Token::new(kind, self.span_from(start)))
    }

    fn lex_number(&mut self, start: (u32, u32)) -> Result<Token, LexError> {
        let mut text = String::new();
        while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }
        if self.current() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit())
        {
            text.push(self.advance().unwrap());
            while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }
        if matches!(self.current(), Some('e' | 'E')) {
            text.push(self.advance().unwrap());
            if matches!(self.current(), Some('+' | '-')) {
                text.push(self.advance().unwrap());
            }
            while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }
        let value: f64 = text.parse().map_err(|_| LexError::InvalidNumber {
            file: self.file.clone(),
            line: start.0,
            col: start.1,
        })?;
        Ok(Token::new(TokenKind::Number(value), self.span_from(start)))
    }

    fn lex_string(&mut self, start: (u32, u32)) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.current() {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedString {
                        file: self.file.clone(),
                        line: start.0,
                        col: start.1,
                    })
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let esc_start = self.here();
                    self.advance();
                    match self.current() {
                        Some('n') => {
                            text.push('\n');
                            self.advance();
                        }
                        Some('t') => {
                            text.push('\t');
                            self.advance();
                        }
                        Some('r') => {
                            text.push('\r');
                            self.advance();
                        }
                        Some('"') => {
                            text.push('"');
                            self.advance();
                        }
                        Some('\\') => {
                            text.push('\\');
                            self.advance();
                        }
                        Some('/') => {
                            text.push('/');
                            self.advance();
                        }
                        Some('b') => {
                            text.push('\u{8}');
                            self.advance();
                        }
                        Some('f') => {
                            text.push('\u{c}');
                            self.advance();
                        }
                        Some('u') => {
                            self.advance();
                            let mut hex = String::new();
                            for _ in 0..4 {
                                match self.current() {
                                    Some(c) if c.is_ascii_hexdigit() => {
                                        hex.push(c);
                                        self.advance();
                                    }
                                    _ => {
                                        return Err(LexError::InvalidEscape {
                                            file: self.file.clone(),
                                            line: esc_start.0,
                                            col: esc_start.1,
                                            ch: 'u',
                                        })
                                    }
                                }
                            }
                            let code = u32::from_str_radix(&hex, 16).unwrap_or(0);
                            if let Some(ch) = char::from_u32(code) {
                                text.push(ch);
                            }
                        }
                        Some(other) => {
                            return Err(LexError::InvalidEscape {
                                file: self.file.clone(),
                                line: esc_start.0,
                                col: esc_start.1,
                                ch: other,
                            })
                        }
                        None => {
                            return Err(LexError::UnterminatedString {
                                file: self.file.clone(),
                                line: start.0,
                                col: start.1,
                            })
                        }
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::StringLit(text), self.span_from(start)))
    }

    fn lex_ident_or_keyword(&mut self, start: (u32, u32)) -> Result<Token, LexError> {
        let mut text = String::new();
        while matches!(self.current(), Some(c) if c.is_alphanumeric() || c == '_') {
            text.push(self.advance().unwrap());
        }

        if text == "call" && self.current() == Some('?') {
            self.advance();
            return Ok(Token::new(TokenKind::CallQuestion, self.span_from(start)));
        }

        let kind = match text.as_str() {
            "let" => TokenKind::Let,
            "fn" => TokenKind::Fn,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "filter" => TokenKind::Filter,
            "loop" => TokenKind::Loop,
            "match" => TokenKind::Match,
            "ok" => TokenKind::Ok,
            "err" => TokenKind::Err,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "assert" => TokenKind::Assert,
            "check" => TokenKind::Check,
            "call" => TokenKind::Call,
            "do" => TokenKind::Do,
            "cap" => TokenKind::Cap,
            "budget" => TokenKind::Budget,
            "import" => TokenKind::Import,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(text),
        };
        Ok(Token::new(kind, self.span_from(start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new("main.a0", src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        assert_eq!(
            kinds("let forEach = for"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("forEach".into()),
                TokenKind::Eq,
                TokenKind::For,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_call_question_as_one_token() {
        assert_eq!(
            kinds("call?"),
            vec![TokenKind::CallQuestion, TokenKind::Eof]
        );
        assert_eq!(
            kinds("call ?"),
            vec![TokenKind::Call, TokenKind::Question, TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(
            kinds("1 2.5 3e2"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.5),
                TokenKind::Number(300.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_string_with_escapes() {
        assert_eq!(
            kinds(r#""hi\n\"there\"""#),
            vec![
                TokenKind::StringLit("hi\n\"there\"".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_json_style_escapes() {
        assert_eq!(
            kinds(r#""a\/b\b\f""#),
            vec![
                TokenKind::StringLit("a/b\u{8}\u{c}".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("# a comment\nlet x = 1"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("x".into()),
                TokenKind::Eq,
                TokenKind::Number(1.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::new("main.a0", "\"abc").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn spread_dots_vs_dot() {
        assert_eq!(
            kinds("a.b ...c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Dot,
                TokenKind::Ident("b".into()),
                TokenKind::DotDotDot,
                TokenKind::Ident("c".into()),
                TokenKind::Eof,
            ]
        );
    }
}
