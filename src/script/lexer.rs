use crate::foundation::error::{SplashError, SplashResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    /// 1-based source line.
    pub(crate) line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident(String),
    Int(i64),
    Str(String),
    Assign,
    Newline,
    Eof,
}

pub(crate) fn lex(input: &str) -> SplashResult<Vec<Token>> {
    let mut out = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0usize;
    let mut line = 1usize;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            out.push(Token {
                kind: TokenKind::Newline,
                line,
            });
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Comment runs to end of line.
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        // Int: -?[0-9]+
        if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit))
        {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if chars.get(i).is_some_and(|ch| ch.is_alphanumeric() || *ch == '_') {
                return Err(SplashError::syntax(line, "malformed integer literal"));
            }
            let s: String = chars[start..i].iter().collect();
            let v: i64 = s
                .parse()
                .map_err(|_| SplashError::syntax(line, format!("integer '{s}' out of range")))?;
            out.push(Token {
                kind: TokenKind::Int(v),
                line,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            out.push(Token {
                kind: TokenKind::Ident(chars[start..i].iter().collect()),
                line,
            });
            continue;
        }

        if c == '"' {
            i += 1;
            let mut s = String::new();
            loop {
                match chars.get(i) {
                    None | Some('\n') => {
                        return Err(SplashError::syntax(line, "unterminated string literal"));
                    }
                    Some('"') => {
                        i += 1;
                        break;
                    }
                    Some('\\') => {
                        let esc = match chars.get(i + 1) {
                            Some('"') => '"',
                            Some('\\') => '\\',
                            Some('n') => '\n',
                            Some('t') => '\t',
                            Some(other) => {
                                return Err(SplashError::syntax(
                                    line,
                                    format!("unknown escape '\\{other}'"),
                                ));
                            }
                            None => {
                                return Err(SplashError::syntax(
                                    line,
                                    "unterminated string literal",
                                ));
                            }
                        };
                        s.push(esc);
                        i += 2;
                    }
                    Some(&ch) => {
                        s.push(ch);
                        i += 1;
                    }
                }
            }
            out.push(Token {
                kind: TokenKind::Str(s),
                line,
            });
            continue;
        }

        if c == '=' {
            out.push(Token {
                kind: TokenKind::Assign,
                line,
            });
            i += 1;
            continue;
        }

        return Err(SplashError::syntax(
            line,
            format!("unexpected character '{c}'"),
        ));
    }

    out.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(out)
}
