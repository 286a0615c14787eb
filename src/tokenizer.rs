use crate::LexError;
#[cfg(test)]
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg_attr(test, derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Else,
    If,
    Main,
    While,
}

#[cfg_attr(test, derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Bool,
    Char,
    Float,
    Int,
}

#[cfg_attr(test, derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    AndAnd,
    Bang,
    Comma,
    Eq,
    EqEq,
    Gt,
    Gte,
    LeftBrace,
    LeftBracket,
    LeftParen,
    Lt,
    Lte,
    Minus,
    Ne,
    OrOr,
    Plus,
    RightBrace,
    RightBracket,
    RightParen,
    Semicolon,
    Slash,
    Star,
}

impl Punct {
    pub fn as_str(self) -> &'static str {
        match self {
            Punct::AndAnd => "&&",
            Punct::Bang => "!",
            Punct::Comma => ",",
            Punct::Eq => "=",
            Punct::EqEq => "==",
            Punct::Gt => ">",
            Punct::Gte => ">=",
            Punct::LeftBrace => "{",
            Punct::LeftBracket => "[",
            Punct::LeftParen => "(",
            Punct::Lt => "<",
            Punct::Lte => "<=",
            Punct::Minus => "-",
            Punct::Ne => "!=",
            Punct::OrOr => "||",
            Punct::Plus => "+",
            Punct::RightBrace => "}",
            Punct::RightBracket => "]",
            Punct::RightParen => ")",
            Punct::Semicolon => ";",
            Punct::Slash => "/",
            Punct::Star => "*",
        }
    }
}

#[cfg_attr(test, derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Type(TokenType),
    Punct(Punct),
    Number,
    Ident,
    Eof,
}

#[cfg_attr(test, derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

#[cfg_attr(test, derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tokenizer {
    pub source: Vec<char>,
    pub index: usize,
    pub line: usize,
    pub column: usize,
    // earliest offset with no "*/" anywhere after it
    pub unclosed_from: Option<usize>,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            unclosed_from: None,
        }
    }

    /// Split the source into tokens, terminated by an `Eof` token located at
    /// the end of the input.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = vec![];
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => tokens.push(self.number()),
                '_' | 'a'..='z' | 'A'..='Z' => tokens.push(self.ident()),
                '\n' => self.newline(),
                c if c.is_whitespace() => self.advance(),
                c => {
                    if c == '/' && self.peek_next() == Some('/') {
                        self.handle_comment();
                        continue;
                    }
                    if c == '/' && self.peek_next() == Some('*') && self.comment_closes() {
                        self.handle_multiline_comment();
                        continue;
                    }
                    match self.punct() {
                        Some(token) => tokens.push(token),
                        None => {
                            return Err(LexError {
                                line: self.line,
                                column: self.column,
                                found: c,
                            })
                        }
                    }
                }
            }
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            loc: self.location(),
        });

        debug!(tokens = tokens.len(), "tokenized source");
        Ok(tokens)
    }

    // an unterminated "/*" is not a comment, it lexes as "/" then "*"
    fn comment_closes(&mut self) -> bool {
        let start = self.index + 2;
        if self.unclosed_from.is_some_and(|from| start >= from) {
            return false;
        }
        let closes = self.source[start..]
            .windows(2)
            .any(|pair| pair == ['*', '/']);
        if !closes {
            self.unclosed_from = Some(start);
        }
        closes
    }

    fn handle_multiline_comment(&mut self) {
        self.advance_n(2);
        while let Some(c) = self.peek() {
            if c == '*' && self.peek_next() == Some('/') {
                self.advance_n(2);
                break;
            }
            if c == '\n' {
                self.newline();
            } else {
                self.advance();
            }
        }
    }

    // handle comments
    fn handle_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn ident(&mut self) -> Token {
        let loc = self.location();
        // keywords only count on a word boundary, so the "int" in "1int" is a name
        let bounded = self.index == 0 || !is_word(self.source[self.index - 1]);

        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if is_word(c) {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match ident.as_str() {
            "int" if bounded => TokenKind::Type(TokenType::Int),
            "float" if bounded => TokenKind::Type(TokenType::Float),
            "bool" if bounded => TokenKind::Type(TokenType::Bool),
            "char" if bounded => TokenKind::Type(TokenType::Char),
            "if" if bounded => TokenKind::Keyword(Keyword::If),
            "else" if bounded => TokenKind::Keyword(Keyword::Else),
            "while" if bounded => TokenKind::Keyword(Keyword::While),
            "main" if bounded => TokenKind::Keyword(Keyword::Main),
            _ => TokenKind::Ident,
        };

        Token {
            kind,
            text: ident,
            loc,
        }
    }

    fn punct(&mut self) -> Option<Token> {
        let loc = self.location();
        let c = self.peek()?;
        let next_c = self.peek_next();
        let (punct, length) = match (c, next_c) {
            ('|', Some('|')) => (Punct::OrOr, 2),
            ('&', Some('&')) => (Punct::AndAnd, 2),
            ('=', Some('=')) => (Punct::EqEq, 2),
            ('!', Some('=')) => (Punct::Ne, 2),
            ('<', Some('=')) => (Punct::Lte, 2),
            ('>', Some('=')) => (Punct::Gte, 2),
            ('(', _) => (Punct::LeftParen, 1),
            (')', _) => (Punct::RightParen, 1),
            ('{', _) => (Punct::LeftBrace, 1),
            ('}', _) => (Punct::RightBrace, 1),
            ('[', _) => (Punct::LeftBracket, 1),
            (']', _) => (Punct::RightBracket, 1),
            (';', _) => (Punct::Semicolon, 1),
            (',', _) => (Punct::Comma, 1),
            ('<', _) => (Punct::Lt, 1),
            ('>', _) => (Punct::Gt, 1),
            ('=', _) => (Punct::Eq, 1),
            ('+', _) => (Punct::Plus, 1),
            ('-', _) => (Punct::Minus, 1),
            ('*', _) => (Punct::Star, 1),
            ('/', _) => (Punct::Slash, 1),
            ('!', _) => (Punct::Bang, 1),
            _ => return None,
        };
        self.advance_n(length);

        Some(Token {
            kind: TokenKind::Punct(punct),
            text: punct.as_str().to_string(),
            loc,
        })
    }

    fn number(&mut self) -> Token {
        let loc = self.location();
        let mut digits = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }

        Token {
            kind: TokenKind::Number,
            text: digits,
            loc,
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            offset: self.index,
            line: self.line,
            column: self.column,
        }
    }

    fn advance(&mut self) {
        self.index += 1;
        self.column += 1;
    }

    fn advance_n(&mut self, steps: usize) {
        for _ in 0..steps {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.index + 1).copied()
    }

    fn newline(&mut self) {
        self.index += 1;
        self.line += 1;
        self.column = 1;
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Tokenizer::new(source).tokenize()
}
