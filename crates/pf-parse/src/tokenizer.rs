//! Lexer for the formula grammar: numbers, references, function
//! identifiers, operators `+ - * / ^`, parens and commas (§4.4.1).

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    /// Canonical (uppercased) reference text, e.g. `"V1.3"`.
    Ref(String),
    /// Function identifier, always followed by `(` in valid input.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerError {
    pub message: String,
    pub pos: usize,
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tokenizer error at {}: {}", self.pos, self.message)
    }
}

impl std::error::Error for TokenizerError {}

const REF_PREFIXES: &str = "VCSFIRM";

pub fn tokenize(src: &str) -> Result<Vec<Token>, TokenizerError> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0usize;
    let mut out = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '+' => {
                out.push(Token::Plus);
                i += 1;
            }
            '-' => {
                out.push(Token::Minus);
                i += 1;
            }
            '*' => {
                out.push(Token::Star);
                i += 1;
            }
            '/' => {
                out.push(Token::Slash);
                i += 1;
            }
            '^' => {
                out.push(Token::Caret);
                i += 1;
            }
            '(' => {
                out.push(Token::LParen);
                i += 1;
            }
            ')' => {
                out.push(Token::RParen);
                i += 1;
            }
            ',' => {
                out.push(Token::Comma);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n: f64 = text.parse().map_err(|_| TokenizerError {
                    message: format!("invalid number literal {text:?}"),
                    pos: start,
                })?;
                out.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let upper = text.to_ascii_uppercase();
                let looks_like_ref = upper
                    .chars()
                    .next()
                    .map(|c0| REF_PREFIXES.contains(c0))
                    .unwrap_or(false)
                    && upper.chars().nth(1).map(|c1| c1.is_ascii_digit()).unwrap_or(false);
                if looks_like_ref {
                    out.push(Token::Ref(upper));
                } else {
                    out.push(Token::Ident(upper));
                }
            }
            other => {
                return Err(TokenizerError {
                    message: format!("unexpected character {other:?}"),
                    pos: i,
                });
            }
        }
    }

    Ok(out)
}
