use tracing::debug;

use crate::{
    BinaryOperator, Block, Declaration, Expression, Keyword, ParseError, Program, Punct,
    SourceLocation, Statement, Token, TokenKind, TokenType, UnaryOperator, VarType, P,
};

#[derive(Debug)]
pub struct Parser {
    pub tokens: Vec<Token>,
    pub index: usize,
}

type ParseResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|tok| tok.kind) != Some(TokenKind::Eof) {
            let loc = tokens.last().map_or(
                SourceLocation {
                    offset: 0,
                    line: 1,
                    column: 1,
                },
                |tok| {
                    let len = tok.text.chars().count();
                    SourceLocation {
                        offset: tok.loc.offset + len,
                        line: tok.loc.line,
                        column: tok.loc.column + len,
                    }
                },
            );
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                loc,
            });
        }
        Self { tokens, index: 0 }
    }

    pub fn parse(&mut self) -> ParseResult<Program> {
        let program = self.program()?;
        self.ensure_done()?;
        debug!(
            declarations = program.declarations.len(),
            statements = program.statements.len(),
            "parsed program"
        );
        Ok(program)
    }

    // program = "int" "main" "(" ")" "{" declaration* stmt* "}"
    //         | declaration* stmt*
    fn program(&mut self) -> ParseResult<Program> {
        let wrapped = self.peek().kind == TokenKind::Type(TokenType::Int)
            && self.peek_nth(1).kind == TokenKind::Keyword(Keyword::Main);

        if wrapped {
            self.advance();
            self.advance();
            self.skip(Punct::LeftParen)?;
            self.skip(Punct::RightParen)?;
            self.skip(Punct::LeftBrace)?;
            let (declarations, statements) = self.body(Some(Punct::RightBrace))?;
            self.skip(Punct::RightBrace)?;
            return Ok(Program {
                declarations,
                statements,
            });
        }

        let (declarations, statements) = self.body(None)?;
        Ok(Program {
            declarations,
            statements,
        })
    }

    // block = "{" declaration* stmt* "}"
    fn block(&mut self) -> ParseResult<Block> {
        self.skip(Punct::LeftBrace)?;
        let (declarations, statements) = self.body(Some(Punct::RightBrace))?;
        self.skip(Punct::RightBrace)?;
        Ok(Block {
            declarations,
            statements,
        })
    }

    // declarations come first; statements run until `close` or the end of input
    fn body(&mut self, close: Option<Punct>) -> ParseResult<(Vec<Declaration>, Vec<Statement>)> {
        let mut declarations = vec![];
        while let TokenKind::Type(_) = self.peek().kind {
            declarations.push(self.declaration()?);
        }

        let mut statements = vec![];
        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Punct(punct) if Some(punct) == close => break,
                _ => statements.push(self.stmt()?),
            }
        }
        Ok((declarations, statements))
    }

    // declaration = declspec ident ("[" num "]")? ";"
    fn declaration(&mut self) -> ParseResult<Declaration> {
        let ty = self.declspec()?;
        let name = self.ident()?;

        let mut array_size = None;
        if self.r#match(Punct::LeftBracket) {
            self.advance();
            let tok = self.peek().clone();
            if tok.kind != TokenKind::Number {
                return Err(self.error("array size"));
            }
            // metadata only, so an oversized length saturates
            let size = tok.text.bytes().fold(0usize, |acc, d| {
                acc.saturating_mul(10).saturating_add(usize::from(d - b'0'))
            });
            self.advance();
            self.skip(Punct::RightBracket)?;
            array_size = Some(size);
        }

        self.skip(Punct::Semicolon)?;
        Ok(Declaration {
            ty,
            name,
            array_size,
        })
    }

    // declspec = "int" | "float" | "bool" | "char"
    fn declspec(&mut self) -> ParseResult<VarType> {
        let ty = match self.peek().kind {
            TokenKind::Type(TokenType::Int) => VarType::Int,
            TokenKind::Type(TokenType::Float) => VarType::Float,
            TokenKind::Type(TokenType::Bool) => VarType::Bool,
            TokenKind::Type(TokenType::Char) => VarType::Char,
            _ => return Err(self.error("type")),
        };
        self.advance();
        Ok(ty)
    }

    // stmt = ident ("[" expr "]")? "=" expr ";"
    //      | "if" "(" expr ")" block ("else" block)?
    //      | "while" "(" expr ")" block
    //      | block
    fn stmt(&mut self) -> ParseResult<Statement> {
        match self.peek().kind {
            TokenKind::Ident => self.assignment(),
            TokenKind::Keyword(Keyword::If) => {
                self.advance();
                self.skip(Punct::LeftParen)?;
                let condition = self.expr()?;
                self.skip(Punct::RightParen)?;
                let then_block = self.block()?;
                let mut else_block = None;
                if let TokenKind::Keyword(Keyword::Else) = self.peek().kind {
                    self.advance();
                    else_block = Some(self.block()?);
                }
                Ok(Statement::If {
                    condition,
                    then_block,
                    else_block,
                })
            }
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                self.skip(Punct::LeftParen)?;
                let condition = self.expr()?;
                self.skip(Punct::RightParen)?;
                let body = self.block()?;
                Ok(Statement::While { condition, body })
            }
            TokenKind::Punct(Punct::LeftBrace) => Ok(Statement::Block(self.block()?)),
            _ => Err(self.error("statement")),
        }
    }

    fn assignment(&mut self) -> ParseResult<Statement> {
        let name = self.ident()?;
        let index = self.subscript()?.map(|index| *index);
        self.skip(Punct::Eq)?;
        let value = self.expr()?;
        self.skip(Punct::Semicolon)?;
        Ok(Statement::Assignment { name, index, value })
    }

    // expr = or
    fn expr(&mut self) -> ParseResult<Expression> {
        self.or()
    }

    // or = and ("||" and)*
    fn or(&mut self) -> ParseResult<Expression> {
        let mut node = self.and()?;
        while self.r#match(Punct::OrOr) {
            self.advance();
            node = Expression::binary(BinaryOperator::Or, node, self.and()?);
        }
        Ok(node)
    }

    // and = equality ("&&" equality)*
    fn and(&mut self) -> ParseResult<Expression> {
        let mut node = self.equality()?;
        while self.r#match(Punct::AndAnd) {
            self.advance();
            node = Expression::binary(BinaryOperator::And, node, self.equality()?);
        }
        Ok(node)
    }

    // equality = relational ("==" relational | "!=" relational)*
    fn equality(&mut self) -> ParseResult<Expression> {
        let mut node = self.relational()?;

        while let TokenKind::Punct(punct @ (Punct::EqEq | Punct::Ne)) = self.peek().kind {
            self.advance();
            let op = if punct == Punct::EqEq {
                BinaryOperator::Eq
            } else {
                BinaryOperator::Ne
            };
            node = Expression::binary(op, node, self.relational()?);
        }

        Ok(node)
    }

    // relational = add ("<" add | "<=" add | ">" add | ">=" add)*
    fn relational(&mut self) -> ParseResult<Expression> {
        let mut node = self.add()?;

        while let TokenKind::Punct(punct @ (Punct::Lt | Punct::Gt | Punct::Lte | Punct::Gte)) =
            self.peek().kind
        {
            self.advance();
            let op = match punct {
                Punct::Lt => BinaryOperator::Lt,
                Punct::Gt => BinaryOperator::Gt,
                Punct::Lte => BinaryOperator::Lte,
                _ => BinaryOperator::Gte,
            };
            node = Expression::binary(op, node, self.add()?);
        }

        Ok(node)
    }

    // add = mul ("+" mul | "-" mul)*
    fn add(&mut self) -> ParseResult<Expression> {
        let mut node = self.mul()?;

        while let TokenKind::Punct(punct @ (Punct::Plus | Punct::Minus)) = self.peek().kind {
            self.advance();
            let op = if punct == Punct::Plus {
                BinaryOperator::Add
            } else {
                BinaryOperator::Sub
            };
            node = Expression::binary(op, node, self.mul()?);
        }

        Ok(node)
    }

    // mul = unary ("*" unary | "/" unary)*
    fn mul(&mut self) -> ParseResult<Expression> {
        let mut node = self.unary()?;

        while let TokenKind::Punct(punct @ (Punct::Star | Punct::Slash)) = self.peek().kind {
            self.advance();
            let op = if punct == Punct::Star {
                BinaryOperator::Mul
            } else {
                BinaryOperator::Div
            };
            node = Expression::binary(op, node, self.unary()?);
        }

        Ok(node)
    }

    // unary = ("-" | "!") unary
    //       | primary
    fn unary(&mut self) -> ParseResult<Expression> {
        if let TokenKind::Punct(punct @ (Punct::Minus | Punct::Bang)) = self.peek().kind {
            self.advance();
            let op = if punct == Punct::Minus {
                UnaryOperator::Neg
            } else {
                UnaryOperator::Not
            };
            return Ok(Expression::unary(op, self.unary()?));
        }

        self.primary()
    }

    // primary = ident ("[" expr "]")? | num | "(" expr ")"
    fn primary(&mut self) -> ParseResult<Expression> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Ident => {
                self.advance();
                let index = self.subscript()?;
                Ok(Expression::Identifier {
                    name: tok.text,
                    index,
                })
            }
            TokenKind::Number => {
                // wrapping keeps the value exact modulo 2^64, so the low byte survives
                let value = tok.text.bytes().fold(0u64, |acc, d| {
                    acc.wrapping_mul(10).wrapping_add(u64::from(d - b'0'))
                });
                self.advance();
                Ok(Expression::Literal(value))
            }
            TokenKind::Punct(Punct::LeftParen) => {
                self.advance();
                let inner = self.expr()?;
                self.skip(Punct::RightParen)?;
                Ok(Expression::Parenthesized(P::new(inner)))
            }
            _ => Err(self.error("expression")),
        }
    }

    // subscript = ("[" expr "]")?
    fn subscript(&mut self) -> ParseResult<Option<P<Expression>>> {
        if !self.r#match(Punct::LeftBracket) {
            return Ok(None);
        }
        self.advance();
        let index = self.expr()?;
        self.skip(Punct::RightBracket)?;
        Ok(Some(P::new(index)))
    }

    fn ident(&mut self) -> ParseResult<String> {
        if self.peek().kind != TokenKind::Ident {
            return Err(self.error("identifier"));
        }
        let name = self.peek().text.clone();
        self.advance();
        Ok(name)
    }

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    // past the end this keeps answering the trailing Eof
    fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.index + n).min(last)]
    }

    fn advance(&mut self) {
        if self.peek().kind != TokenKind::Eof {
            self.index += 1;
        }
    }

    fn r#match(&self, punct: Punct) -> bool {
        self.peek().kind == TokenKind::Punct(punct)
    }

    fn skip(&mut self, punct: Punct) -> ParseResult<()> {
        if !self.r#match(punct) {
            return Err(self.error(format!("'{}'", punct.as_str())));
        }
        self.advance();
        Ok(())
    }

    fn ensure_done(&self) -> ParseResult<()> {
        match self.peek().kind {
            TokenKind::Eof => Ok(()),
            _ => Err(self.error("end of input")),
        }
    }

    fn error(&self, expected: impl Into<String>) -> ParseError {
        let tok = self.peek();
        let found = match tok.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", tok.text),
        };
        ParseError::at(tok.loc, expected, found)
    }
}

pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse()
}
