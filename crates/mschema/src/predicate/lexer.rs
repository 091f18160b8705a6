//! Lexer for assertion expressions.
//!
//! Keywords (`lambda`, `and`, `or`, `not`, `in`, `true`, ...) are emitted
//! as identifiers and recognized by the parser.

use super::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Float(f64),
    Str(String),
    Ident(String),
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Arrow,
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,
    Bang,
    Eof,
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub offset: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    /// Tokenize the whole input; the last lexeme is always [`Token::Eof`].
    pub fn tokenize(&mut self) -> Result<Vec<Lexeme>, ExpressionError> {
        let mut lexemes = Vec::new();
        loop {
            let lexeme = self.next_lexeme()?;
            let done = lexeme.token == Token::Eof;
            lexemes.push(lexeme);
            if done {
                return Ok(lexemes);
            }
        }
    }

    fn next_lexeme(&mut self) -> Result<Lexeme, ExpressionError> {
        self.skip_whitespace();
        let offset = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(Lexeme {
                token: Token::Eof,
                offset,
            });
        };

        let token = match ch {
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            ':' => self.single(Token::Colon),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.single(Token::Star),
            '%' => self.single(Token::Percent),
            '/' if self.peek() == Some('/') => self.double(Token::DoubleSlash),
            '/' => self.single(Token::Slash),
            '=' if self.peek() == Some('=') => self.double(Token::Equal),
            '=' if self.peek() == Some('>') => self.double(Token::Arrow),
            '!' if self.peek() == Some('=') => self.double(Token::NotEqual),
            '!' => self.single(Token::Bang),
            '<' if self.peek() == Some('=') => self.double(Token::LessEqual),
            '<' => self.single(Token::Less),
            '>' if self.peek() == Some('=') => self.double(Token::GreaterEqual),
            '>' => self.single(Token::Greater),
            '&' if self.peek() == Some('&') => self.double(Token::AndAnd),
            '|' if self.peek() == Some('|') => self.double(Token::OrOr),
            '"' | '\'' => self.read_string(ch)?,
            c if c.is_ascii_digit() => self.read_number()?,
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            other => {
                return Err(ExpressionError::Syntax {
                    offset,
                    message: format!("unexpected character '{other}'"),
                })
            }
        };

        Ok(Lexeme { token, offset })
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek(&self) -> Option<char> {
        let mut chars = self.input[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.advance();
        self.advance();
        token
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token, ExpressionError> {
        let start = self.position;
        self.advance();
        let mut text = String::new();

        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == quote {
                return Ok(Token::Str(text));
            }
            if ch != '\\' {
                text.push(ch);
                continue;
            }
            let escaped = self.current_char().ok_or_else(|| ExpressionError::Syntax {
                offset: start,
                message: "unterminated string literal".to_string(),
            })?;
            self.advance();
            text.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                other => other,
            });
        }

        Err(ExpressionError::Syntax {
            offset: start,
            message: "unterminated string literal".to_string(),
        })
    }

    fn read_number(&mut self) -> Result<Token, ExpressionError> {
        let start = self.position;
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            match ch {
                '0'..='9' | '_' => self.advance(),
                '.' if !is_float => {
                    is_float = true;
                    self.advance();
                }
                'e' | 'E' => {
                    is_float = true;
                    self.advance();
                    if matches!(self.current_char(), Some('+' | '-')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }

        let literal: String = self.input[start..self.position]
            .chars()
            .filter(|c| *c != '_')
            .collect();

        if !is_float {
            if let Ok(i) = literal.parse::<i64>() {
                return Ok(Token::Integer(i));
            }
        }
        literal
            .parse::<f64>()
            .map(Token::Float)
            .map_err(|_| ExpressionError::Syntax {
                offset: start,
                message: format!("invalid number '{literal}'"),
            })
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        while self
            .current_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Ident(self.input[start..self.position].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|l| l.token)
            .collect()
    }

    #[test]
    fn lambda_header_and_chain() {
        assert_eq!(
            tokens("lambda x: 10 < x <= 30"),
            vec![
                Token::Ident("lambda".into()),
                Token::Ident("x".into()),
                Token::Colon,
                Token::Integer(10),
                Token::Less,
                Token::Ident("x".into()),
                Token::LessEqual,
                Token::Integer(30),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            tokens("== != >= // => && ||"),
            vec![
                Token::Equal,
                Token::NotEqual,
                Token::GreaterEqual,
                Token::DoubleSlash,
                Token::Arrow,
                Token::AndAnd,
                Token::OrOr,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn numbers_and_strings() {
        assert_eq!(
            tokens(r#"1_000 2.5 1e3 'a\'b' "c\n""#),
            vec![
                Token::Integer(1000),
                Token::Float(2.5),
                Token::Float(1000.0),
                Token::Str("a'b".into()),
                Token::Str("c\n".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn offsets_point_at_token_start() {
        let lexemes = Lexer::new("x  >= 3").tokenize().unwrap();
        let offsets: Vec<usize> = lexemes.iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![0, 3, 6, 7]);
    }

    #[test]
    fn rejects_unknown_characters_and_open_strings() {
        assert!(matches!(
            Lexer::new("x ^ 2").tokenize(),
            Err(ExpressionError::Syntax { offset: 2, .. })
        ));
        assert!(matches!(
            Lexer::new("'abc").tokenize(),
            Err(ExpressionError::Syntax { offset: 0, .. })
        ));
    }
}
