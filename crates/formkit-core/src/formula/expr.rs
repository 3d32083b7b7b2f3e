//! Restricted arithmetic expressions
//!
//! Grammar, after all whitespace is removed:
//!
//! ```text
//! expr   := term   (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := number | '(' expr ')'
//! number := '-'? [0-9.]+
//! ```
//!
//! A `-` directly in front of a literal is its sign, so substituted negative
//! values parse (`4*-2`, `1--3`). A sign before anything else (`--3`, `-(3)`)
//! is rejected. Division by zero evaluates to 0. There are no exponents or
//! function calls; a formula never reaches anything beyond these four
//! operators.

use crate::error::FormulaError;

/// Parenthesis nesting limit
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div if rhs == 0.0 => 0.0,
            BinaryOp::Div => lhs / rhs,
        }
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let chars: Vec<char> = source.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.is_empty() {
            return Err(FormulaError::EmptyExpression);
        }
        let mut parser = Parser { chars, pos: 0, depth: 0 };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(c) => Err(FormulaError::UnexpectedToken { position: parser.pos, found: c }),
        }
    }

    pub fn eval(&self) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::Binary { op, lhs, rhs } => op.apply(lhs.eval(), rhs.eval()),
        }
    }
}

/// Parse and evaluate in one step
pub fn evaluate_arithmetic(source: &str) -> Result<f64, FormulaError> {
    Expr::parse(source).map(|e| e.eval())
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek().and_then(additive) {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.factor()?;
        while let Some(op) = self.peek().and_then(multiplicative) {
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some('(') => {
                self.depth += 1;
                if self.depth > MAX_DEPTH {
                    return Err(FormulaError::NestingTooDeep(MAX_DEPTH));
                }
                self.pos += 1;
                let inner = self.expr()?;
                match self.peek() {
                    Some(')') => self.pos += 1,
                    Some(c) => return Err(FormulaError::UnexpectedToken { position: self.pos, found: c }),
                    None => return Err(FormulaError::UnexpectedEnd),
                }
                self.depth -= 1;
                Ok(inner)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(1.0),
            Some('-') if self.chars.get(self.pos + 1).is_some_and(|c| c.is_ascii_digit() || *c == '.') => {
                self.pos += 1;
                self.number(-1.0)
            }
            Some(c) => Err(FormulaError::UnexpectedToken { position: self.pos, found: c }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn number(&mut self, sign: f64) -> Result<Expr, FormulaError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse::<f64>()
            .map(|n| Expr::Number(sign * n))
            .map_err(|_| FormulaError::InvalidNumber(literal))
    }
}

fn additive(c: char) -> Option<BinaryOp> {
    match c {
        '+' => Some(BinaryOp::Add),
        '-' => Some(BinaryOp::Sub),
        _ => None,
    }
}

fn multiplicative(c: char) -> Option<BinaryOp> {
    match c {
        '*' => Some(BinaryOp::Mul),
        '/' => Some(BinaryOp::Div),
        _ => None,
    }
}
