//! Precedence-climbing parser producing [`Expr`] trees.

use std::fmt;

use super::lexer::{Token, tokenize};
use crate::error::ExprError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    fn comparison(op: &str) -> Option<Self> {
        match op {
            "==" => Some(BinaryOp::Eq),
            "!=" => Some(BinaryOp::Ne),
            "<" => Some(BinaryOp::Lt),
            "<=" | "=<" => Some(BinaryOp::Le),
            ">" => Some(BinaryOp::Gt),
            ">=" | "=>" => Some(BinaryOp::Ge),
            _ => None,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }
}

/// Expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    Name(String),
    Neg(Box<Node>),
    Binary { op: BinaryOp, lhs: Box<Node>, rhs: Box<Node> },
}

/// A parsed template expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    source: String,
    root: Node,
}

impl Expr {
    /// Parse `source` into an expression.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { source, tokens: &tokens, pos: 0 };
        let root = parser.comparison()?;
        if let Some(extra) = parser.peek() {
            return Err(ExprError::UnexpectedToken { expr: source.to_string(), found: extra.describe() });
        }
        Ok(Expr { source: source.trim().to_string(), root })
    }

    /// An expression that is just the literal `value`.
    pub fn number(value: f64) -> Self {
        Expr { source: value.to_string(), root: Node::Number(value) }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<&'a Token, ExprError> {
        let token =
            self.tokens.get(self.pos).ok_or_else(|| ExprError::UnexpectedEnd { expr: self.source.to_string() })?;
        self.pos += 1;
        Ok(token)
    }

    fn peek_op(&self) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn unexpected(&self, token: &Token) -> ExprError {
        ExprError::UnexpectedToken { expr: self.source.to_string(), found: token.describe() }
    }

    // Comparisons do not chain: `a < b < c` is rejected as trailing input.
    fn comparison(&mut self) -> Result<Node, ExprError> {
        let lhs = self.additive()?;
        match self.peek_op().and_then(BinaryOp::comparison) {
            Some(op) => {
                self.pos += 1;
                let rhs = self.additive()?;
                Ok(Node::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
            }
            None => Ok(lhs),
        }
    }

    fn additive(&mut self) -> Result<Node, ExprError> {
        let mut node = self.term()?;
        while let Some(op) = self.peek_op() {
            let op = match op {
                "+" => BinaryOp::Add,
                "-" => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            node = Node::Binary { op, lhs: Box::new(node), rhs: Box::new(rhs) };
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<Node, ExprError> {
        let mut node = self.unary()?;
        while let Some(op) = self.peek_op() {
            let op = match op {
                "*" => BinaryOp::Mul,
                "/" => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            node = Node::Binary { op, lhs: Box::new(node), rhs: Box::new(rhs) };
        }
        Ok(node)
    }

    fn unary(&mut self) -> Result<Node, ExprError> {
        match self.peek_op() {
            Some("-") => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some("+") => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Node, ExprError> {
        let base = self.primary()?;
        if self.peek_op() == Some("^") {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Node::Binary { op: BinaryOp::Pow, lhs: Box::new(base), rhs: Box::new(exponent) });
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, ExprError> {
        let token = self.next()?;
        match token {
            Token::Number(value) => Ok(Node::Number(*value)),
            Token::Ident(name) => Ok(Node::Name(name.clone())),
            Token::LParen => {
                let inner = self.comparison()?;
                match self.next()? {
                    Token::RParen => Ok(inner),
                    other => Err(self.unexpected(other)),
                }
            }
            other => Err(self.unexpected(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Box<Node> {
        Box::new(Node::Name(n.to_string()))
    }

    fn num(v: f64) -> Box<Node> {
        Box::new(Node::Number(v))
    }

    #[test]
    fn respects_precedence() {
        let expr = Expr::parse("v * 40 - 20").unwrap();
        assert_eq!(
            expr.root(),
            &Node::Binary {
                op: BinaryOp::Sub,
                lhs: Box::new(Node::Binary { op: BinaryOp::Mul, lhs: name("v"), rhs: num(40.0) }),
                rhs: num(20.0),
            }
        );
    }

    #[test]
    fn arrow_parses_as_greater_or_equal() {
        let expr = Expr::parse("c => 1").unwrap();
        assert_eq!(expr.root(), &Node::Binary { op: BinaryOp::Ge, lhs: name("c"), rhs: num(1.0) });
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_negation() {
        let expr = Expr::parse("-2^3^2").unwrap();
        let expected = Node::Neg(Box::new(Node::Binary {
            op: BinaryOp::Pow,
            lhs: num(2.0),
            rhs: Box::new(Node::Binary { op: BinaryOp::Pow, lhs: num(3.0), rhs: num(2.0) }),
        }));
        assert_eq!(expr.root(), &expected);
    }

    #[test]
    fn keeps_trimmed_source() {
        let expr = Expr::parse("  c+9 ").unwrap();
        assert_eq!(expr.to_string(), "c+9");
    }

    #[test]
    fn reports_trailing_and_missing_input() {
        assert!(matches!(Expr::parse("c 9"), Err(ExprError::UnexpectedToken { .. })));
        assert!(matches!(Expr::parse("c +"), Err(ExprError::UnexpectedEnd { .. })));
        assert!(matches!(Expr::parse("(c + 1"), Err(ExprError::UnexpectedEnd { .. })));
        assert!(matches!(Expr::parse(""), Err(ExprError::UnexpectedEnd { .. })));
        assert!(matches!(Expr::parse("a < b < c"), Err(ExprError::UnexpectedToken { .. })));
    }
}
