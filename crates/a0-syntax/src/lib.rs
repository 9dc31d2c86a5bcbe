//! Lexer, parser, and AST for A0.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod tokens;

pub use ast::{BinaryOp, Expr, Header, MatchArm, PathSegment, Program, RecordEntry, Stmt, ToolCallMode, UnaryOp};
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser};
pub use tokens::{Token, TokenKind};

/// Lex and parse a complete source file into a [`Program`].
pub fn parse_source(file: &str, source: &str) -> Result<Program, SyntaxError> {
    let tokens = Lexer::new(file, source).tokenize()?;
    let program = Parser::new(tokens).parse_program()?;
    Ok(program)
}

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SyntaxError {
    pub fn span(&self) -> a0_core::SourceSpan {
        match self {
            SyntaxError::Lex(e) => e.span(),
            SyntaxError::Parse(e) => e.span(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_small_program_end_to_end() {
        let src = "cap { fs.read: true }\nlet x = 1 + 2\nreturn x";
        let program = parse_source("main.a0", src).unwrap();
        assert_eq!(program.headers.len(), 1);
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn surfaces_lex_errors_through_syntax_error() {
        let err = parse_source("main.a0", "let x = \"unterminated").unwrap_err();
        assert!(matches!(err, SyntaxError::Lex(_)));
    }
}
