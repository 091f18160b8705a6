//! Recursive descent parser for assertion expressions.
//!
//! Precedence, loosest first:
//!
//! | Level | Operators |
//! |---|---|
//! | or | `or`, `\|\|` |
//! | and | `and`, `&&` |
//! | not | `not`, `!` |
//! | comparison | `<` `<=` `>` `>=` `==` `!=` `in` `not in` (chainable) |
//! | additive | `+` `-` |
//! | multiplicative | `*` `/` `//` `%` |
//! | unary | `-` |
//! | postfix | `e[i]`, calls |

use regex::Regex;
use serde_json::Value;

use super::ast::{BinaryOp, Builtin, CompareOp, Expr, Function, LogicalOp, MATCHES};
use super::lexer::{Lexeme, Lexer, Token};
use super::{ExpressionError, PredicateRegistry};

/// Maximum depth of the expression tree.
///
/// Every operator node counts, including each link of a left-associative
/// chain such as `x + 1 + 1`, so evaluation and drop recursion stay within
/// this bound.
pub const MAX_DEPTH: usize = 64;

/// Parameter name used when the assertion has no `lambda`/`=>` header.
pub const IMPLICIT_PARAM: &str = "x";

const KEYWORDS: &[&str] = &[
    "lambda", "and", "or", "not", "in", "true", "false", "True", "False", "null", "None",
];

/// Whether `name` is reserved by the expression language.
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Parse an assertion into an expression over [`Expr::Param`].
pub fn parse_assertion(source: &str, registry: &PredicateRegistry) -> Result<Expr, ExpressionError> {
    let lexemes = Lexer::new(source).tokenize()?;
    Parser::new(lexemes, registry).parse_assertion()
}

struct Parser<'r> {
    lexemes: Vec<Lexeme>,
    position: usize,
    depth: usize,
    param: String,
    registry: &'r PredicateRegistry,
}

impl<'r> Parser<'r> {
    fn new(lexemes: Vec<Lexeme>, registry: &'r PredicateRegistry) -> Self {
        Self {
            lexemes,
            position: 0,
            depth: 0,
            param: IMPLICIT_PARAM.to_string(),
            registry,
        }
    }

    fn parse_assertion(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_header()?;

        if let Some(expr) = self.parse_bare_function()? {
            return Ok(expr);
        }

        let expr = self.parse_expression()?;
        if self.current() != &Token::Eof {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    /// `lambda p:` or `p =>`; otherwise the parameter stays implicit.
    fn parse_header(&mut self) -> Result<(), ExpressionError> {
        if self.is_ident("lambda") {
            self.advance();
            let param = match self.current() {
                Token::Ident(name) if !is_keyword(name) => name.clone(),
                _ => return Err(self.unexpected("parameter name after 'lambda'")),
            };
            self.advance();
            self.expect(&Token::Colon, "':' after lambda parameter")?;
            self.param = param;
            return Ok(());
        }

        if let (Token::Ident(name), Token::Arrow) = (self.current(), self.peek()) {
            if !is_keyword(name) {
                self.param = name.clone();
                self.advance();
                self.advance();
            }
        }
        Ok(())
    }

    /// A lone function name applies that function to the parameter.
    fn parse_bare_function(&mut self) -> Result<Option<Expr>, ExpressionError> {
        let name = match (self.current(), self.peek()) {
            (Token::Ident(name), Token::Eof) if *name != self.param && !is_keyword(name) => {
                name.clone()
            }
            _ => return Ok(None),
        };

        let function = if let Some(predicate) = self.registry.get(&name) {
            Function::Registered {
                name,
                predicate: predicate.clone(),
            }
        } else {
            match Builtin::lookup(&name) {
                Some(builtin) if builtin.is_unary() => Function::Builtin(builtin),
                _ => return Ok(None),
            }
        };
        self.advance();

        Ok(Some(Expr::Call {
            function,
            args: vec![Expr::Param],
        }))
    }

    fn parse_expression(&mut self) -> Result<Expr, ExpressionError> {
        self.nested(Self::parse_or)
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expr, ExpressionError>,
    ) -> Result<Expr, ExpressionError> {
        self.deepen()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn deepen(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_and()?;
        while self.is_ident("or") || self.current() == &Token::OrOr {
            self.advance();
            self.deepen()?;
            let right = self.parse_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_not()?;
        while self.is_ident("and") || self.current() == &Token::AndAnd {
            self.advance();
            self.deepen()?;
            let right = self.parse_not()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExpressionError> {
        if self.is_ident("not") || self.current() == &Token::Bang {
            self.advance();
            let operand = self.nested(Self::parse_not)?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let first = self.parse_additive()?;
        let mut rest = Vec::new();

        loop {
            let (op, width) = match self.current() {
                Token::Less => (CompareOp::Less, 1),
                Token::LessEqual => (CompareOp::LessEqual, 1),
                Token::Greater => (CompareOp::Greater, 1),
                Token::GreaterEqual => (CompareOp::GreaterEqual, 1),
                Token::Equal => (CompareOp::Equal, 1),
                Token::NotEqual => (CompareOp::NotEqual, 1),
                Token::Ident(name) if name == "in" => (CompareOp::In, 1),
                Token::Ident(name) if name == "not" && self.peek_is_ident("in") => {
                    (CompareOp::NotIn, 2)
                }
                _ => break,
            };
            for _ in 0..width {
                self.advance();
            }
            self.deepen()?;
            rest.push((op, self.parse_additive()?));
        }

        self.depth = base;
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                Token::DoubleSlash => BinaryOp::FloorDivide,
                Token::Percent => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        match self.current() {
            Token::Minus => {
                self.advance();
                let operand = self.nested(Self::parse_unary)?;
                Ok(Expr::Negate(Box::new(operand)))
            }
            Token::Plus => {
                self.advance();
                self.nested(Self::parse_unary)
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut expr = self.parse_primary()?;
        while self.current() == &Token::LeftBracket {
            self.advance();
            self.deepen()?;
            let index = self.parse_expression()?;
            self.expect(&Token::RightBracket, "']'")?;
            expr = Expr::Index {
                object: Box::new(expr),
                index: Box::new(index),
            };
        }
        self.depth = base;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self.current().clone();
        match token {
            Token::Integer(i) => {
                self.advance();
                Ok(Expr::Literal(Value::from(i)))
            }
            Token::Float(f) => {
                self.advance();
                let number = serde_json::Number::from_f64(f).ok_or_else(|| self.unexpected("finite number"))?;
                Ok(Expr::Literal(Value::Number(number)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen, "')'")?;
                Ok(expr)
            }
            Token::LeftBracket => {
                self.advance();
                let items = self.parse_sequence(&Token::RightBracket)?;
                Ok(Expr::List(items))
            }
            Token::Ident(name) => self.parse_name(name),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn parse_name(&mut self, name: String) -> Result<Expr, ExpressionError> {
        let literal = match name.as_str() {
            "true" | "True" => Some(Value::Bool(true)),
            "false" | "False" => Some(Value::Bool(false)),
            "null" | "None" => Some(Value::Null),
            _ => None,
        };
        if let Some(value) = literal {
            self.advance();
            return Ok(Expr::Literal(value));
        }
        if is_keyword(&name) {
            return Err(self.unexpected("a value"));
        }

        self.advance();
        if self.current() == &Token::LeftParen {
            self.advance();
            let args = self.parse_sequence(&Token::RightParen)?;
            return self.resolve_call(name, args);
        }

        if name == self.param {
            Ok(Expr::Param)
        } else {
            Err(ExpressionError::UnknownName(name))
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_sequence(&mut self, close: &Token) -> Result<Vec<Expr>, ExpressionError> {
        let mut items = Vec::new();
        while self.current() != close {
            items.push(self.parse_expression()?);
            if self.current() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(close, "closing delimiter")?;
        Ok(items)
    }

    fn resolve_call(&self, name: String, mut args: Vec<Expr>) -> Result<Expr, ExpressionError> {
        if name == MATCHES {
            if args.len() != 2 {
                return Err(ExpressionError::Arity {
                    name,
                    expected: "2",
                    found: args.len(),
                });
            }
            let pattern = match args.pop() {
                Some(Expr::Literal(Value::String(pattern))) => pattern,
                _ => {
                    return Err(ExpressionError::Pattern(
                        "the pattern of matches() must be a string literal".to_string(),
                    ))
                }
            };
            let pattern =
                Regex::new(&pattern).map_err(|e| ExpressionError::Pattern(e.to_string()))?;
            let subject = args.pop().map(Box::new).ok_or(ExpressionError::Arity {
                name: MATCHES.to_string(),
                expected: "2",
                found: 1,
            })?;
            return Ok(Expr::Matches { subject, pattern });
        }

        if let Some(predicate) = self.registry.get(&name) {
            if args.len() != 1 {
                return Err(ExpressionError::Arity {
                    name,
                    expected: "1",
                    found: args.len(),
                });
            }
            return Ok(Expr::Call {
                function: Function::Registered {
                    name,
                    predicate: predicate.clone(),
                },
                args,
            });
        }

        let builtin = Builtin::lookup(&name).ok_or_else(|| ExpressionError::UnknownFunction(name.clone()))?;
        if let Some(expected) = builtin.arity_mismatch(args.len()) {
            return Err(ExpressionError::Arity {
                name,
                expected,
                found: args.len(),
            });
        }
        Ok(Expr::Call {
            function: Function::Builtin(builtin),
            args,
        })
    }

    fn current(&self) -> &Token {
        self.lexemes
            .get(self.position)
            .map(|l| &l.token)
            .unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.lexemes
            .get(self.position + 1)
            .map(|l| &l.token)
            .unwrap_or(&Token::Eof)
    }

    fn offset(&self) -> usize {
        self.lexemes
            .get(self.position)
            .or_else(|| self.lexemes.last())
            .map(|l| l.offset)
            .unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.position < self.lexemes.len() {
            self.position += 1;
        }
    }

    fn is_ident(&self, keyword: &str) -> bool {
        matches!(self.current(), Token::Ident(name) if name == keyword)
    }

    fn peek_is_ident(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name == keyword)
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ExpressionError> {
        if self.current() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &str) -> ExpressionError {
        let found = match self.current() {
            Token::Eof => "end of input".to_string(),
            Token::Ident(name) => format!("'{name}'"),
            other => format!("{other:?}"),
        };
        ExpressionError::Syntax {
            offset: self.offset(),
            message: format!("expected {expected}, found {found}"),
        }
    }
}
