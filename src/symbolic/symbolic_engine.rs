//! # Symbolic Engine Module
//!
//! Core expression tree of the calculator. Everything the engine does (parsing, simplification,
//! differentiation, integration, solving, sampling) produces or consumes an [`Expr`].
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Leaves**: `Var(String)` named symbols, `Const(f64)` numeric literals and the named constants
//!   `Pi`, `E`, `Infinity`, `NegInfinity`
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow`
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, `tg`, `ctg`, `arcsin`, `arccos`, `arctg`, `arcctg`
//!
//! ### Key Methods
//! - `free_symbols()` - set of symbol names occurring in the expression
//! - `has_variable(name)` - membership test over the free symbols
//! - `substitute_variable(var, expr)` / `set_variable(var, value)` - substitution
//! - `Display` - plain text rendering (`x**2 + 2*x`, `sqrt(x)`, `log(x)`), stable and re-parsable
//!
//! Expressions are immutable values: every transform returns a new tree and structural equality
//! is `PartialEq`. Mathematical equivalence is only what `simplify()` normalizes.

#![allow(non_camel_case_types)]

use std::collections::{BTreeSet, HashMap};
use std::f64;
use std::fmt;

/// Expression tree. Recursive structure through `Box<Expr>`.
///
/// # Examples
/// ```rust, ignore
/// use RustedCalc::symbolic::symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let expr = Expr::Add(Box::new(x), Box::new(Expr::Const(2.0)));
/// assert_eq!(expr.to_string(), "x + 2");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "y", "theta")
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// The circle constant π
    Pi,
    /// Euler's number e
    E,
    /// Positive infinity (`oo`)
    Infinity,
    /// Negative infinity (`-oo`)
    NegInfinity,
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    /// Sine function: sin(x)
    sin(Box<Expr>),
    /// Cosine function: cos(x)
    cos(Box<Expr>),
    /// Tangent function: tan(x)
    tg(Box<Expr>),
    /// Cotangent function: cot(x)
    ctg(Box<Expr>),
    /// Arcsine function: asin(x)
    arcsin(Box<Expr>),
    /// Arccosine function: acos(x)
    arccos(Box<Expr>),
    /// Arctangent function: atan(x)
    arctg(Box<Expr>),
    /// Arccotangent function: acot(x)
    arcctg(Box<Expr>),
}

/// binding strength used by both text and LaTeX printers
pub(crate) const PREC_ADD: u8 = 1;
pub(crate) const PREC_MUL: u8 = 2;
pub(crate) const PREC_POW: u8 = 3;
pub(crate) const PREC_ATOM: u8 = 4;

/// Formats a float the way the calculator shows numbers: integers without a fractional part,
/// no negative zero, infinities as `oo`.
pub fn format_number(val: f64) -> String {
    if val.is_nan() {
        "nan".to_string()
    } else if val == f64::INFINITY {
        "oo".to_string()
    } else if val == f64::NEG_INFINITY {
        "-oo".to_string()
    } else if val == 0.0 {
        "0".to_string()
    } else if val.fract() == 0.0 && val.abs() < 1e15 {
        format!("{}", val as i64)
    } else {
        format!("{}", val)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => write!(f, "{}", format_number(*val)),
            Expr::Pi => write!(f, "pi"),
            Expr::E => write!(f, "E"),
            Expr::Infinity => write!(f, "oo"),
            Expr::NegInfinity => write!(f, "-oo"),
            Expr::Add(lhs, rhs) => {
                let right = rhs.to_string();
                // a + (-b) prints as a - b
                match right.strip_prefix('-') {
                    Some(stripped) if rhs.precedence() >= PREC_MUL => {
                        write!(f, "{} - {}", lhs, stripped)
                    }
                    _ => write!(f, "{} + {}", lhs, right),
                }
            }
            Expr::Sub(lhs, rhs) => {
                let right = rhs.wrap_text(rhs.precedence() <= PREC_ADD);
                match right.strip_prefix('-') {
                    Some(stripped) => write!(f, "{} + {}", lhs, stripped),
                    None => write!(f, "{} - {}", lhs, right),
                }
            }
            Expr::Mul(lhs, rhs) if lhs.is_minus_one() => {
                write!(f, "-{}", rhs.wrap_text(rhs.precedence() < PREC_MUL))
            }
            Expr::Mul(lhs, rhs) => {
                let left = lhs.wrap_text(lhs.precedence() < PREC_MUL);
                let right = rhs.to_string();
                let right = if rhs.precedence() < PREC_MUL || right.starts_with('-') {
                    format!("({})", right)
                } else {
                    right
                };
                write!(f, "{}*{}", left, right)
            }
            Expr::Div(lhs, rhs) => {
                let left = lhs.wrap_text(lhs.precedence() < PREC_MUL);
                let right = rhs.to_string();
                let right = if rhs.precedence() <= PREC_MUL || right.starts_with('-') {
                    format!("({})", right)
                } else {
                    right
                };
                write!(f, "{}/{}", left, right)
            }
            Expr::Pow(base, exp) if exp.is_half() => write!(f, "sqrt({})", base),
            Expr::Pow(base, exp) => {
                let left = base.to_string();
                let left = if base.precedence() <= PREC_POW || left.starts_with('-') {
                    format!("({})", left)
                } else {
                    left
                };
                let right = exp.to_string();
                let right = if exp.precedence() < PREC_POW || right.starts_with('-') {
                    format!("({})", right)
                } else {
                    right
                };
                write!(f, "{}**{}", left, right)
            }
            Expr::Exp(expr) => write!(f, "exp({})", expr),
            Expr::Ln(expr) => write!(f, "log({})", expr),
            Expr::sin(expr) => write!(f, "sin({})", expr),
            Expr::cos(expr) => write!(f, "cos({})", expr),
            Expr::tg(expr) => write!(f, "tan({})", expr),
            Expr::ctg(expr) => write!(f, "cot({})", expr),
            Expr::arcsin(expr) => write!(f, "asin({})", expr),
            Expr::arccos(expr) => write!(f, "acos({})", expr),
            Expr::arctg(expr) => write!(f, "atan({})", expr),
            Expr::arcctg(expr) => write!(f, "acot({})", expr),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            Expr::Const(val) => Expr::Const(-val),
            Expr::Infinity => Expr::NegInfinity,
            Expr::NegInfinity => Expr::Infinity,
            other => Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(other)),
        }
    }
}

impl Expr {
    /// BASIC FEATURES

    /// Shorthand for `Expr::Var(name.to_string())`
    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    pub fn sqrt(self) -> Expr {
        Expr::Pow(self.boxed(), Box::new(Expr::Const(0.5)))
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 1.0)
    }

    pub(crate) fn is_minus_one(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == -1.0)
    }

    pub(crate) fn is_half(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 0.5)
    }

    /// `Some(value)` for numeric literals
    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(val) => Some(*val),
            _ => None,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Expr::Infinity | Expr::NegInfinity)
    }

    /// Direct children of the node, in left-to-right order.
    pub fn args(&self) -> Vec<&Expr> {
        match self {
            Expr::Var(_)
            | Expr::Const(_)
            | Expr::Pi
            | Expr::E
            | Expr::Infinity
            | Expr::NegInfinity => Vec::new(),
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => vec![lhs, rhs],
            Expr::Exp(expr)
            | Expr::Ln(expr)
            | Expr::sin(expr)
            | Expr::cos(expr)
            | Expr::tg(expr)
            | Expr::ctg(expr)
            | Expr::arcsin(expr)
            | Expr::arccos(expr)
            | Expr::arctg(expr)
            | Expr::arcctg(expr) => vec![expr],
        }
    }

    /// Rebuilds the node with every child replaced by `f(child)`. Leaves are cloned.
    pub fn map_args<F>(&self, f: F) -> Expr
    where
        F: Fn(&Expr) -> Expr,
    {
        match self {
            Expr::Add(lhs, rhs) => Expr::Add(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Sub(lhs, rhs) => Expr::Sub(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Mul(lhs, rhs) => Expr::Mul(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Div(lhs, rhs) => Expr::Div(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Pow(base, exp) => Expr::Pow(f(base).boxed(), f(exp).boxed()),
            Expr::Exp(expr) => Expr::Exp(f(expr).boxed()),
            Expr::Ln(expr) => Expr::Ln(f(expr).boxed()),
            Expr::sin(expr) => Expr::sin(f(expr).boxed()),
            Expr::cos(expr) => Expr::cos(f(expr).boxed()),
            Expr::tg(expr) => Expr::tg(f(expr).boxed()),
            Expr::ctg(expr) => Expr::ctg(f(expr).boxed()),
            Expr::arcsin(expr) => Expr::arcsin(f(expr).boxed()),
            Expr::arccos(expr) => Expr::arccos(f(expr).boxed()),
            Expr::arctg(expr) => Expr::arctg(f(expr).boxed()),
            Expr::arcctg(expr) => Expr::arcctg(f(expr).boxed()),
            leaf => leaf.clone(),
        }
    }

    /// VARIABLES

    /// Set of all symbol names occurring in the expression. Named constants are not symbols.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let expr = parse("x^2 + y*z + x").unwrap();
    /// let names: Vec<String> = expr.free_symbols().into_iter().collect();
    /// assert_eq!(names, vec!["x", "y", "z"]);
    /// ```
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            other => {
                for arg in other.args() {
                    arg.collect_symbols(out);
                }
            }
        }
    }

    /// `true` when `name` is one of the free symbols.
    pub fn has_variable(&self, name: &str) -> bool {
        self.contains_variable(name)
    }

    /// Recursive search without building the symbol set.
    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            other => other.args().iter().any(|arg| arg.contains_variable(var_name)),
        }
    }

    /// `true` when the expression is built from numbers and named constants only
    pub fn is_number(&self) -> bool {
        match self {
            Expr::Var(_) => false,
            other => other.args().iter().all(|arg| arg.is_number()),
        }
    }

    /// Substitutes a variable with a constant value throughout the expression.
    pub fn set_variable(&self, var: &str, value: f64) -> Expr {
        self.substitute_variable(var, &Expr::Const(value))
    }

    /// Substitutes multiple variables with constant values.
    pub fn set_variable_from_map(&self, var_map: &HashMap<String, f64>) -> Expr {
        match self {
            Expr::Var(name) => match var_map.get(name) {
                Some(value) => Expr::Const(*value),
                None => self.clone(),
            },
            other => other.map_args(|arg| arg.set_variable_from_map(var_map)),
        }
    }

    /// Replaces every occurrence of `var` with a copy of `expr`.
    pub fn substitute_variable(&self, var: &str, expr: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => expr.clone(),
            other => other.map_args(|arg| arg.substitute_variable(var, expr)),
        }
    }

    /// Renames a variable throughout the expression.
    pub fn rename_variable(&self, old_var: &str, new_var: &str) -> Expr {
        self.substitute_variable(old_var, &Expr::var(new_var))
    }

    /// PRINTING HELPERS

    /// Binding strength of the printed form of the node.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expr::Add(_, _) | Expr::Sub(_, _) => PREC_ADD,
            Expr::Mul(_, _) | Expr::Div(_, _) | Expr::NegInfinity => PREC_MUL,
            Expr::Const(val) if *val < 0.0 => PREC_MUL,
            Expr::Pow(_, exp) if exp.is_half() => PREC_ATOM,
            Expr::Pow(_, _) => PREC_POW,
            _ => PREC_ATOM,
        }
    }

    fn wrap_text(&self, parens: bool) -> String {
        if parens {
            format!("({})", self)
        } else {
            self.to_string()
        }
    }
}
