use thiserror::Error;

use crate::SourceLocation;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lex error at line {line}, column {column}: unexpected character {found:?}")]
pub struct LexError {
    pub line: usize,
    pub column: usize,
    pub found: char,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}, column {column}: expected {expected}, found {found}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub expected: String,
    pub found: String,
}

impl ParseError {
    pub fn at(loc: SourceLocation, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            line: loc.line,
            column: loc.column,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl CompileError {
    pub fn line(&self) -> usize {
        match self {
            CompileError::Lex(err) => err.line,
            CompileError::Parse(err) => err.line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            CompileError::Lex(err) => err.column,
            CompileError::Parse(err) => err.column,
        }
    }

    /// Render the error with the offending source line and a caret under the
    /// reported column.
    pub fn render(&self, source: &str) -> String {
        let line = self.line();
        let text = source.lines().nth(line.saturating_sub(1)).unwrap_or("");
        let gutter = format!("{line} | ");
        let width = self.column().saturating_sub(1);
        // tabs in the prefix stay tabs; a column past the line end pads with spaces
        let mut pad = " ".repeat(gutter.len());
        pad.extend(
            text.chars()
                .chain(std::iter::repeat(' '))
                .take(width)
                .map(|c| if c == '\t' { '\t' } else { ' ' }),
        );
        format!("error: {self}\n{gutter}{text}\n{pad}^")
    }
}
