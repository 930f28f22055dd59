//! Nonlinear expression trees.
//!
//! Trees are built either by the document reader or by the instruction tape
//! decoder, and rendered back out as algebraic text. Operators with a fixed
//! child count use plain constructors; the n-ary operators validate their
//! child count at construction so a malformed tree can never be built.

use crate::error::{OslinkError, OslinkResult};
use serde::{Deserialize, Serialize};

/// Spelling of the power operator in rendered text.
///
/// Algebraic targets disagree on this one operator. GAMS model text writes
/// `**`, so that is the default; `^` is kept for dialects that want it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerSpelling {
    #[default]
    DoubleStar,
    Caret,
}

impl PowerSpelling {
    fn op(self) -> &'static str {
        match self {
            PowerSpelling::DoubleStar => " ** ",
            PowerSpelling::Caret => " ^ ",
        }
    }
}

/// A node in a nonlinear expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// A numeric constant.
    Number(f64),
    /// The constant pi.
    Pi,
    /// A variable reference scaled by a coefficient.
    Variable { idx: usize, coef: f64 },
    Plus(Box<Expr>, Box<Expr>),
    Minus(Box<Expr>, Box<Expr>),
    Times(Box<Expr>, Box<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Power(Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    /// Sum of two or more children.
    Sum(Vec<Expr>),
    /// Product of two or more children.
    Product(Vec<Expr>),
    /// Minimum of two or more children.
    Min(Vec<Expr>),
    /// Maximum of two or more children.
    Max(Vec<Expr>),
    Abs(Box<Expr>),
    Square(Box<Expr>),
    Sqrt(Box<Expr>),
    Ln(Box<Expr>),
    Exp(Box<Expr>),
    Sin(Box<Expr>),
    Cos(Box<Expr>),
}

impl Expr {
    /// A variable reference with coefficient one.
    pub fn var(idx: usize) -> Expr {
        Expr::Variable { idx, coef: 1.0 }
    }

    pub fn plus(left: Expr, right: Expr) -> Expr {
        Expr::Plus(Box::new(left), Box::new(right))
    }

    pub fn minus(left: Expr, right: Expr) -> Expr {
        Expr::Minus(Box::new(left), Box::new(right))
    }

    pub fn times(left: Expr, right: Expr) -> Expr {
        Expr::Times(Box::new(left), Box::new(right))
    }

    pub fn divide(left: Expr, right: Expr) -> Expr {
        Expr::Divide(Box::new(left), Box::new(right))
    }

    pub fn power(base: Expr, exponent: Expr) -> Expr {
        Expr::Power(Box::new(base), Box::new(exponent))
    }

    pub fn negate(inner: Expr) -> Expr {
        Expr::Negate(Box::new(inner))
    }

    /// Sum of `children`, which must be at least two.
    pub fn sum(children: Vec<Expr>) -> OslinkResult<Expr> {
        nary("sum", children).map(Expr::Sum)
    }

    /// Product of `children`, which must be at least two.
    pub fn product(children: Vec<Expr>) -> OslinkResult<Expr> {
        nary("product", children).map(Expr::Product)
    }

    /// Minimum of `children`, which must be at least two.
    pub fn min(children: Vec<Expr>) -> OslinkResult<Expr> {
        nary("min", children).map(Expr::Min)
    }

    /// Maximum of `children`, which must be at least two.
    pub fn max(children: Vec<Expr>) -> OslinkResult<Expr> {
        nary("max", children).map(Expr::Max)
    }

    /// Renders the tree as algebraic model text with the default power
    /// spelling.
    ///
    /// Every operator is parenthesized so no precedence rules are needed on
    /// the far side. Natural log prints as `log`, its name in the target
    /// language.
    pub fn render(&self) -> String {
        self.render_with(PowerSpelling::default())
    }

    /// Renders the tree with an explicit power spelling.
    pub fn render_with(&self, power: PowerSpelling) -> String {
        let mut out = String::new();
        self.render_into(&mut out, power);
        out
    }

    fn render_into(&self, out: &mut String, power: PowerSpelling) {
        match self {
            Expr::Number(v) => {
                if *v < 0.0 {
                    out.push_str(&format!("({v})"));
                } else {
                    out.push_str(&format!("{v}"));
                }
            }
            Expr::Pi => out.push_str("pi"),
            Expr::Variable { idx, coef } => {
                if *coef == 0.0 {
                    out.push('0');
                } else if *coef == 1.0 {
                    out.push_str(&format!("x{idx}"));
                } else {
                    out.push_str(&format!("({coef} * x{idx})"));
                }
            }
            Expr::Plus(a, b) => binary_into(out, a, " + ", b, power),
            Expr::Minus(a, b) => binary_into(out, a, " - ", b, power),
            Expr::Times(a, b) => binary_into(out, a, " * ", b, power),
            Expr::Divide(a, b) => binary_into(out, a, " / ", b, power),
            Expr::Power(a, b) => binary_into(out, a, power.op(), b, power),
            Expr::Negate(a) => {
                out.push_str("(-");
                a.render_into(out, power);
                out.push(')');
            }
            Expr::Sum(children) => joined_into(out, children, " + ", power),
            Expr::Product(children) => joined_into(out, children, " * ", power),
            Expr::Min(children) => call_into(out, "min", children, power),
            Expr::Max(children) => call_into(out, "max", children, power),
            Expr::Abs(a) => unary_into(out, "abs", a, power),
            Expr::Square(a) => unary_into(out, "sqr", a, power),
            Expr::Sqrt(a) => unary_into(out, "sqrt", a, power),
            Expr::Ln(a) => unary_into(out, "log", a, power),
            Expr::Exp(a) => unary_into(out, "exp", a, power),
            Expr::Sin(a) => unary_into(out, "sin", a, power),
            Expr::Cos(a) => unary_into(out, "cos", a, power),
        }
    }
}

fn nary(op: &'static str, children: Vec<Expr>) -> OslinkResult<Vec<Expr>> {
    if children.len() < 2 {
        return Err(OslinkError::TooFewChildren {
            op,
            min: 2,
            got: children.len(),
        });
    }
    Ok(children)
}

fn binary_into(out: &mut String, a: &Expr, op: &str, b: &Expr, power: PowerSpelling) {
    out.push('(');
    a.render_into(out, power);
    out.push_str(op);
    b.render_into(out, power);
    out.push(')');
}

fn unary_into(out: &mut String, name: &str, a: &Expr, power: PowerSpelling) {
    out.push_str(name);
    out.push('(');
    a.render_into(out, power);
    out.push(')');
}

fn joined_into(out: &mut String, children: &[Expr], op: &str, power: PowerSpelling) {
    out.push('(');
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            out.push_str(op);
        }
        child.render_into(out, power);
    }
    out.push(')');
}

fn call_into(out: &mut String, name: &str, children: &[Expr], power: PowerSpelling) {
    out.push_str(name);
    out.push('(');
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        child.render_into(out, power);
    }
    out.push(')');
}
