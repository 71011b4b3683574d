//! Tokenizer for where and order-by clauses.

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Bare or `[bracketed]` identifier; keywords are matched by the parser
    Ident { text: String, bracketed: bool },
    /// `'single quoted'` text with `''` as an escaped quote
    Text(String),
    /// Numeric literal, kept as written
    Number(String),
    Op(CompareOp),
    LParen,
    RParen,
    Comma,
}

impl Token {
    /// Whether this token is the given keyword (case-insensitive, unbracketed).
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident { text, bracketed: false } if text.eq_ignore_ascii_case(keyword))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op(CompareOp::Eq));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::Ne));
                i += 2;
            }
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::Op(CompareOp::Le));
                    i += 2;
                }
                Some('>') => {
                    tokens.push(Token::Op(CompareOp::Ne));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Op(CompareOp::Lt));
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CompareOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CompareOp::Gt));
                    i += 1;
                }
            }
            '\'' => {
                let (text, next) = read_quoted(&chars, i)?;
                tokens.push(Token::Text(text));
                i = next;
            }
            '[' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .ok_or_else(|| {
                        StoreError::Query(format!("Unterminated '[' at position {}", i))
                    })?;
                let text: String = chars[i + 1..i + 1 + end].iter().collect();
                if text.trim().is_empty() {
                    return Err(StoreError::Query("Empty [] column name".to_string()));
                }
                tokens.push(Token::Ident {
                    text,
                    bracketed: true,
                });
                i += end + 2;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
                || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident {
                    text: chars[start..i].iter().collect(),
                    bracketed: false,
                });
            }
            other => {
                return Err(StoreError::Query(format!(
                    "Unexpected character '{}' at position {}",
                    other, i
                )))
            }
        }
    }

    Ok(tokens)
}

fn read_quoted(chars: &[char], start: usize) -> Result<(String, usize)> {
    let mut text = String::new();
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => {
                return Err(StoreError::Query(format!(
                    "Unterminated string literal starting at position {}",
                    start
                )))
            }
            Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                text.push('\'');
                i += 2;
            }
            Some('\'') => return Ok((text, i + 1)),
            Some(&c) => {
                text.push(c);
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(text: &str) -> Token {
        Token::Ident {
            text: text.to_string(),
            bracketed: false,
        }
    }

    #[test]
    fn test_tokenize_comparison() {
        let tokens = tokenize("ID='g1'").unwrap();
        assert_eq!(
            tokens,
            vec![ident("ID"), Token::Op(CompareOp::Eq), Token::Text("g1".into())]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("a <> 1 AND b != -2.5 OR c >= 3 AND d <= 4").unwrap();
        let ops: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Op(op) => Some(*op),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![CompareOp::Ne, CompareOp::Ne, CompareOp::Ge, CompareOp::Le]
        );
        assert!(tokens.contains(&Token::Number("-2.5".into())));
    }

    #[test]
    fn test_tokenize_escaped_quote_and_brackets() {
        let tokens = tokenize("[First Name] = 'O''Brien'").unwrap();
        assert_eq!(
            tokens[0],
            Token::Ident {
                text: "First Name".into(),
                bracketed: true
            }
        );
        assert_eq!(tokens[2], Token::Text("O'Brien".into()));
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(tokenize("Name = 'open").is_err());
        assert!(tokenize("[Name = 'x'").is_err());
        assert!(tokenize("Name ~ 'x'").is_err());
    }
}
