//! Tokenizer for `$filter` expressions.
//!
//! Word operators (`and`, `eq`, `not`, ...) are plain identifiers at this
//! level; the parser decides keyword-ness from position. Typed literal
//! prefixes (`guid'...'`, `datetime'...'`, `binary'...'`, `X'...'`) are
//! recognized here so the parser only ever sees finished [`Value`]s.

use odata_core::{ODataError, ODataResult, Value};

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Identifier(String),
    Literal(Value),
    Null,
    OpenParen,
    CloseParen,
    Comma,
    Slash,
    Minus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    /// Byte offset into the `$filter` text, for diagnostics.
    pub pos: usize,
}

pub fn tokenize(input: &str) -> ODataResult<Vec<SpannedToken>> {
    Lexer {
        input,
        bytes: input.as_bytes(),
        pos: 0,
    }
    .run()
}

struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Lexer<'_> {
    fn run(mut self) -> ODataResult<Vec<SpannedToken>> {
        let mut tokens = Vec::new();
        while let Some(&b) = self.bytes.get(self.pos) {
            let start = self.pos;
            match b {
                b' ' | b'\t' => {
                    self.pos += 1;
                    continue;
                }
                b'(' => self.single(&mut tokens, Token::OpenParen),
                b')' => self.single(&mut tokens, Token::CloseParen),
                b',' => self.single(&mut tokens, Token::Comma),
                b'/' => self.single(&mut tokens, Token::Slash),
                b'-' => {
                    // A sign glued to a digit is part of the number.
                    if self.bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit) {
                        let token = self.number(start)?;
                        tokens.push(SpannedToken { token, pos: start });
                    } else {
                        self.single(&mut tokens, Token::Minus);
                    }
                }
                b'\'' => {
                    let token = self.quoted_literal(start)?;
                    tokens.push(SpannedToken { token, pos: start });
                }
                b'0'..=b'9' => {
                    let token = self.number(start)?;
                    tokens.push(SpannedToken { token, pos: start });
                }
                b'_' | b'A'..=b'Z' | b'a'..=b'z' => {
                    let token = self.word(start)?;
                    tokens.push(SpannedToken { token, pos: start });
                }
                _ => {
                    return Err(ODataError::syntax(format!(
                        "Syntax error at position {start} in '{}'",
                        self.input
                    )))
                }
            }
        }
        Ok(tokens)
    }

    fn single(&mut self, tokens: &mut Vec<SpannedToken>, token: Token) {
        tokens.push(SpannedToken { token, pos: self.pos });
        self.pos += 1;
    }

    /// Scan a quoted run starting at the opening quote; returns the byte
    /// offset just past the closing quote. Doubled quotes are escapes.
    fn quoted_end(&self, start: usize) -> ODataResult<usize> {
        let mut i = start + 1;
        while i < self.bytes.len() {
            if self.bytes[i] == b'\'' {
                if self.bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                return Ok(i + 1);
            }
            i += 1;
        }
        Err(ODataError::syntax(format!(
            "There is an unterminated string literal at position {start} in '{}'",
            self.input
        )))
    }

    fn quoted_literal(&mut self, start: usize) -> ODataResult<Token> {
        let end = self.quoted_end(start)?;
        let value = Value::lex(&self.input[start..end])?;
        self.pos = end;
        Ok(Token::Literal(value))
    }

    fn number(&mut self, start: usize) -> ODataResult<Token> {
        let mut i = start;
        if self.bytes[i] == b'-' {
            i += 1;
        }
        while i < self.bytes.len() && self.bytes[i].is_ascii_digit() {
            i += 1;
        }
        if self.bytes.get(i) == Some(&b'.') {
            i += 1;
            while i < self.bytes.len() && self.bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        if matches!(self.bytes.get(i), Some(b'e' | b'E')) {
            i += 1;
            if matches!(self.bytes.get(i), Some(b'+' | b'-')) {
                i += 1;
            }
            while i < self.bytes.len() && self.bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        if matches!(
            self.bytes.get(i),
            Some(b'L' | b'l' | b'M' | b'm' | b'F' | b'f' | b'D' | b'd')
        ) {
            i += 1;
        }
        if self
            .bytes
            .get(i)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.')
        {
            return Err(ODataError::syntax(format!(
                "Syntax error at position {i} in '{}'",
                self.input
            )));
        }
        let value = Value::lex(&self.input[start..i])?;
        self.pos = i;
        Ok(Token::Literal(value))
    }

    fn word(&mut self, start: usize) -> ODataResult<Token> {
        let mut i = start;
        while self
            .bytes
            .get(i)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            i += 1;
        }
        let word = &self.input[start..i];

        // Typed-literal prefix followed immediately by a quoted run.
        if matches!(word, "guid" | "datetime" | "binary" | "X") && self.bytes.get(i) == Some(&b'\'')
        {
            let end = self.quoted_end(i)?;
            let value = Value::lex(&self.input[start..end])?;
            self.pos = end;
            return Ok(Token::Literal(value));
        }

        self.pos = i;
        Ok(match word {
            "true" => Token::Literal(Value::Boolean(true)),
            "false" => Token::Literal(Value::Boolean(false)),
            "null" => Token::Null,
            _ => Token::Identifier(word.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn words_and_operators() {
        let tokens = kinds("Name eq 'it''s' and Age gt 30");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("Name".into()),
                Token::Identifier("eq".into()),
                Token::Literal(Value::String("it's".into())),
                Token::Identifier("and".into()),
                Token::Identifier("Age".into()),
                Token::Identifier("gt".into()),
                Token::Literal(Value::Int32(30)),
            ]
        );
    }

    #[test]
    fn typed_and_suffixed_literals() {
        assert_eq!(
            kinds("datetime'2008-10-13T00:00:00'"),
            vec![Token::Literal(Value::parse_literal(
                odata_core::PrimitiveKind::DateTime,
                "datetime'2008-10-13T00:00:00'"
            )
            .unwrap())]
        );
        assert_eq!(kinds("42L"), vec![Token::Literal(Value::Int64(42))]);
        assert!(matches!(
            kinds("1.5").as_slice(),
            [Token::Literal(Value::Double(_))]
        ));
    }

    #[test]
    fn negative_number_glues_to_digit() {
        assert_eq!(kinds("-5"), vec![Token::Literal(Value::Int32(-5))]);
        let tokens = kinds("-Price");
        assert_eq!(tokens[0], Token::Minus);
        assert_eq!(tokens[1], Token::Identifier("Price".into()));
    }

    #[test]
    fn null_and_punctuation() {
        assert_eq!(
            kinds("f(a, b)/c eq null"),
            vec![
                Token::Identifier("f".into()),
                Token::OpenParen,
                Token::Identifier("a".into()),
                Token::Comma,
                Token::Identifier("b".into()),
                Token::CloseParen,
                Token::Slash,
                Token::Identifier("c".into()),
                Token::Identifier("eq".into()),
                Token::Null,
            ]
        );
    }

    #[test]
    fn rejects_garbage_and_open_strings() {
        assert!(tokenize("Name eq #").is_err());
        assert!(tokenize("'unterminated").is_err());
        assert!(tokenize("12abc").is_err());
    }

    #[test]
    fn positions_are_byte_offsets() {
        let tokens = tokenize("a eq 1").expect("tokenize");
        assert_eq!(tokens[0].pos, 0);
        assert_eq!(tokens[1].pos, 2);
        assert_eq!(tokens[2].pos, 5);
    }
}
