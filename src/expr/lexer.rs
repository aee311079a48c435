//! Tokenizer for score expressions

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Double(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Colon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Int(i) => i.to_string(),
            Token::Double(d) => d.to_string(),
            Token::Str(s) => format!("{s:?}"),
            Token::Ident(name) => name.clone(),
            other => format!("{other:?}"),
        }
    }
}

/// A token and the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        let start = pos;

        let token = match c {
            b'0'..=b'9' => {
                let (token, end) = lex_number(source, pos)?;
                pos = end;
                token
            }
            b'"' | b'\'' => {
                let (value, end) = lex_string(source, pos)?;
                pos = end;
                Token::Str(value)
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                    pos += 1;
                }
                match &source[start..pos] {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "in" => Token::In,
                    word => Token::Ident(word.to_string()),
                }
            }
            _ => {
                let next = bytes.get(pos + 1).copied();
                let (token, width) = match (c, next) {
                    (b'=', Some(b'=')) => (Token::EqEq, 2),
                    (b'!', Some(b'=')) => (Token::NotEq, 2),
                    (b'<', Some(b'=')) => (Token::Le, 2),
                    (b'>', Some(b'=')) => (Token::Ge, 2),
                    (b'&', Some(b'&')) => (Token::AndAnd, 2),
                    (b'|', Some(b'|')) => (Token::OrOr, 2),
                    (b'<', _) => (Token::Lt, 1),
                    (b'>', _) => (Token::Gt, 1),
                    (b'!', _) => (Token::Bang, 1),
                    (b'(', _) => (Token::LParen, 1),
                    (b')', _) => (Token::RParen, 1),
                    (b'[', _) => (Token::LBracket, 1),
                    (b']', _) => (Token::RBracket, 1),
                    (b'{', _) => (Token::LBrace, 1),
                    (b'}', _) => (Token::RBrace, 1),
                    (b'.', _) => (Token::Dot, 1),
                    (b',', _) => (Token::Comma, 1),
                    (b':', _) => (Token::Colon, 1),
                    (b'?', _) => (Token::Question, 1),
                    (b'+', _) => (Token::Plus, 1),
                    (b'-', _) => (Token::Minus, 1),
                    (b'*', _) => (Token::Star, 1),
                    (b'/', _) => (Token::Slash, 1),
                    (b'%', _) => (Token::Percent, 1),
                    _ => {
                        let ch = source[pos..].chars().next().unwrap_or('?');
                        return Err(ExprError::syntax(pos, format!("unexpected character {ch:?}")));
                    }
                };
                pos += width;
                token
            }
        };
        tokens.push(Spanned { token, offset: start });
    }

    Ok(tokens)
}

fn lex_number(source: &str, start: usize) -> Result<(Token, usize), ExprError> {
    let bytes = source.as_bytes();
    let mut pos = start;
    let digits = |pos: &mut usize| {
        while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
            *pos += 1;
        }
    };

    digits(&mut pos);
    let mut is_double = false;
    if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
        is_double = true;
        pos += 1;
        digits(&mut pos);
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            is_double = true;
            pos = exp;
            digits(&mut pos);
        }
    }

    let text = &source[start..pos];
    let token = if is_double {
        text.parse::<f64>()
            .map(Token::Double)
            .map_err(|e| ExprError::syntax(start, format!("invalid number {text}: {e}")))?
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|e| ExprError::syntax(start, format!("invalid integer {text}: {e}")))?
    };
    Ok((token, pos))
}

fn lex_string(source: &str, start: usize) -> Result<(String, usize), ExprError> {
    let mut chars = source[start..].char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(ExprError::syntax(start, "expected string"));
    };
    let mut value = String::new();

    while let Some((i, ch)) = chars.next() {
        match ch {
            c if c == quote => return Ok((value, start + i + c.len_utf8())),
            '\\' => {
                let Some((j, escaped)) = chars.next() else {
                    break;
                };
                let resolved = match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    other => {
                        return Err(ExprError::syntax(
                            start + j,
                            format!("unsupported escape sequence \\{other}"),
                        ))
                    }
                };
                value.push(resolved);
            }
            c => value.push(c),
        }
    }

    Err(ExprError::syntax(start, "unterminated string literal"))
}
