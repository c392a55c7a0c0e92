//! Expression Evaluator (§4.3): boolean `test` expressions and property
//! navigation over the current parameter context.
//!
//! Grounded on `usql-lexer`'s char-at-a-time scanning style
//! (`next_while`/`next_if_is`) and a conventional recursive-descent parser
//! over the resulting token stream, mirroring the shape of
//! `usql-parser::Parser` without depending on that crate (this evaluator's
//! grammar is a small boolean/arithmetic language, not SQL).

use std::fmt;

use crate::error::{Error, Result};
use crate::value::{as_number, is_truthy, navigate, Value};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Null,
    True,
    False,
    Number(f64),
    Str(String),
    Path(String),
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
                tokens.push(Token::Eq);
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '&' => {
                chars.next();
                chars.next_if(|&c| c == '&');
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                chars.next_if(|&c| c == '|');
                tokens.push(Token::Or);
            }
            '\'' | '"' => {
                let quote = ch;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => s.push(c),
                        None => {
                            return Err(Error::build(format!(
                                "unterminated string literal in test expression `{}`",
                                src
                            )))
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = s
                    .parse::<f64>()
                    .map_err(|_| Error::build(format!("invalid number literal `{}`", s)))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // property path continuation: `.ident` or `[index]`
                loop {
                    if chars.peek() == Some(&'.') {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        if lookahead.peek().map(|c| c.is_alphabetic() || *c == '_') == Some(true) {
                            s.push('.');
                            chars.next();
                            while let Some(&c) = chars.peek() {
                                if c.is_alphanumeric() || c == '_' {
                                    s.push(c);
                                    chars.next();
                                } else {
                                    break;
                                }
                            }
                            continue;
                        }
                    }
                    if chars.peek() == Some(&'[') {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        if lookahead.peek().map(|c| c.is_ascii_digit()) == Some(true) {
                            s.push('[');
                            chars.next();
                            while let Some(&c) = chars.peek() {
                                s.push(c);
                                chars.next();
                                if c == ']' {
                                    break;
                                }
                            }
                            continue;
                        }
                    }
                    break;
                }
                tokens.push(match s.as_str() {
                    "null" => Token::Null,
                    "true" => Token::True,
                    "false" => Token::False,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Path(s),
                });
            }
            other => {
                return Err(Error::build(format!(
                    "unexpected character `{}` in test expression `{}`",
                    other, src
                )))
            }
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone)]
enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Path(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    source: &'t str,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Bin(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_equality()?;
            lhs = Expr::Bin(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinOp::Eq,
                Some(Token::Ne) => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance().cloned() {
            Some(Token::Null) => Ok(Expr::Null),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Path(p)) => Ok(Expr::Path(p)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                if !self.eat(&Token::RParen) {
                    return Err(Error::build(format!(
                        "expected `)` in test expression `{}`",
                        self.source
                    )));
                }
                Ok(inner)
            }
            other => Err(Error::build(format!(
                "unexpected token {:?} in test expression `{}`",
                other, self.source
            ))),
        }
    }
}

/// A parsed, reusable test/navigation expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Expression {
    /// Parses a test/navigation expression. Failures surface as build errors
    /// (§4.3: "Failures are surfaced as configuration/build errors at first
    /// evaluation", which in this implementation is parse time, checked
    /// eagerly when the owning dynamic-SQL node is built).
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            source,
        };
        let ast = parser.parse_expr()?;
        if parser.pos != tokens.len() {
            return Err(Error::build(format!(
                "trailing tokens in test expression `{}`",
                source
            )));
        }
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    /// The original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression against a parameter context, returning the
    /// resulting [`Value`] (not yet coerced to boolean — use
    /// [`Expression::test`] for the `if`/`when` truthiness check).
    pub fn eval(&self, ctx: &Value) -> Result<Value> {
        eval_expr(&self.ast, ctx)
    }

    /// Evaluates the expression and applies the truthiness rule (§4.3).
    pub fn test(&self, ctx: &Value) -> Result<bool> {
        Ok(is_truthy(&self.eval(ctx)?))
    }
}

fn eval_expr(expr: &Expr, ctx: &Value) -> Result<Value> {
    Ok(match expr {
        Expr::Null => Value::Null,
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Number(n) => serde_json::json!(n),
        Expr::Str(s) => Value::String(s.clone()),
        Expr::Path(p) => navigate(ctx, p).cloned().unwrap_or(Value::Null),
        Expr::Not(inner) => Value::Bool(!is_truthy(&eval_expr(inner, ctx)?)),
        Expr::Neg(inner) => {
            let n = as_number(&eval_expr(inner, ctx)?)
                .ok_or_else(|| Error::type_conversion("cannot negate a non-numeric value"))?;
            serde_json::json!(-n)
        }
        Expr::Bin(op, lhs, rhs) => eval_bin(*op, lhs, rhs, ctx)?,
    })
}

fn eval_bin(op: BinOp, lhs: &Expr, rhs: &Expr, ctx: &Value) -> Result<Value> {
    match op {
        BinOp::And => {
            let l = eval_expr(lhs, ctx)?;
            if !is_truthy(&l) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(is_truthy(&eval_expr(rhs, ctx)?)))
        }
        BinOp::Or => {
            let l = eval_expr(lhs, ctx)?;
            if is_truthy(&l) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(is_truthy(&eval_expr(rhs, ctx)?)))
        }
        BinOp::Eq | BinOp::Ne => {
            let l = eval_expr(lhs, ctx)?;
            let r = eval_expr(rhs, ctx)?;
            let equal = values_equal(&l, &r);
            Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }))
        }
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let l = eval_expr(lhs, ctx)?;
            let r = eval_expr(rhs, ctx)?;
            let ln = as_number(&l)
                .ok_or_else(|| Error::type_conversion("relational operator on non-numeric value"))?;
            let rn = as_number(&r)
                .ok_or_else(|| Error::type_conversion("relational operator on non-numeric value"))?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ln < rn,
                BinOp::Le => ln <= rn,
                BinOp::Gt => ln > rn,
                BinOp::Ge => ln >= rn,
                _ => unreachable!(),
            }))
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
            let l = eval_expr(lhs, ctx)?;
            let r = eval_expr(rhs, ctx)?;
            let ln = as_number(&l)
                .ok_or_else(|| Error::type_conversion("arithmetic operator on non-numeric value"))?;
            let rn = as_number(&r)
                .ok_or_else(|| Error::type_conversion("arithmetic operator on non-numeric value"))?;
            let result = match op {
                BinOp::Add => ln + rn,
                BinOp::Sub => ln - rn,
                BinOp::Mul => ln * rn,
                BinOp::Div => ln / rn,
                _ => unreachable!(),
            };
            Ok(serde_json::json!(result))
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(an), Some(bn)) = (as_number(a), as_number(b)) {
        if !matches!(a, Value::String(_)) || !matches!(b, Value::String(_)) {
            return an == bn;
        }
    }
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_safe_path_read() {
        let ctx = json!({"a": 1});
        let expr = Expression::parse("b != null").unwrap();
        assert!(!expr.test(&ctx).unwrap());
    }

    #[test]
    fn basic_comparison() {
        let ctx = json!({"a": 1, "b": null});
        assert!(Expression::parse("a != null").unwrap().test(&ctx).unwrap());
        assert!(!Expression::parse("b != null").unwrap().test(&ctx).unwrap());
        assert!(Expression::parse("a == 1").unwrap().test(&ctx).unwrap());
        assert!(Expression::parse("a > 0 and a < 10")
            .unwrap()
            .test(&ctx)
            .unwrap());
    }

    #[test]
    fn string_truthiness_convention() {
        let ctx = json!({"flag": "false", "flag2": "yes"});
        assert!(!Expression::parse("flag").unwrap().test(&ctx).unwrap());
        assert!(Expression::parse("flag2").unwrap().test(&ctx).unwrap());
    }

    #[test]
    fn nested_path_and_index() {
        let ctx = json!({"items": [{"id": 7}, {"id": 8}]});
        assert!(Expression::parse("items[0].id == 7")
            .unwrap()
            .test(&ctx)
            .unwrap());
    }

    #[test]
    fn arithmetic_with_numeric_promotion() {
        let ctx = json!({"a": "3", "b": 4});
        let expr = Expression::parse("a + b").unwrap();
        assert_eq!(expr.eval(&ctx).unwrap(), json!(7.0));
    }
}
