use crate::{
    foundation::error::{SplashError, SplashResult},
    script::{
        lexer::{Token, TokenKind, lex},
        value::{CommandToken, Value},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `name = <arg>`
    Assign {
        line: usize,
        name: String,
        value: CommandToken,
    },
    /// `command <arg>*`
    Invoke {
        line: usize,
        command: String,
        args: Vec<CommandToken>,
    },
}

/// Parse a whole script. Nothing is executed, so a syntax error anywhere rejects the script.
pub fn parse_script(input: &str) -> SplashResult<Vec<Statement>> {
    let tokens = lex(input)?;
    let mut p = Parser { tokens, pos: 0 };
    let mut out = Vec::new();

    loop {
        if p.peek().kind == TokenKind::Eof {
            break;
        }
        if p.peek().kind == TokenKind::Newline {
            p.bump();
            continue;
        }
        out.push(p.parse_statement()?);
    }
    Ok(out)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let t = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn parse_statement(&mut self) -> SplashResult<Statement> {
        let head = self.bump();
        let TokenKind::Ident(name) = head.kind else {
            return Err(SplashError::syntax(
                head.line,
                "expected a command or variable name at start of line",
            ));
        };

        if self.peek().kind == TokenKind::Assign {
            self.bump();
            if self.at_line_end() {
                return Err(SplashError::syntax(
                    head.line,
                    format!("missing value in assignment to '{name}'"),
                ));
            }
            let value = self.parse_arg()?;
            if !self.at_line_end() {
                return Err(SplashError::syntax(
                    head.line,
                    "unexpected tokens after assigned value",
                ));
            }
            return Ok(Statement::Assign {
                line: head.line,
                name,
                value,
            });
        }

        let mut args = Vec::new();
        while !self.at_line_end() {
            args.push(self.parse_arg()?);
        }
        Ok(Statement::Invoke {
            line: head.line,
            command: name,
            args,
        })
    }

    fn parse_arg(&mut self) -> SplashResult<CommandToken> {
        let t = self.bump();
        match t.kind {
            TokenKind::Int(v) => Ok(CommandToken::Literal(Value::Int(v))),
            TokenKind::Str(s) => Ok(CommandToken::Literal(Value::Str(s))),
            TokenKind::Ident(name) => Ok(CommandToken::Variable(name)),
            TokenKind::Assign => Err(SplashError::syntax(t.line, "unexpected '='")),
            TokenKind::Newline | TokenKind::Eof => {
                Err(SplashError::syntax(t.line, "unexpected end of line"))
            }
        }
    }
}
