//! LaTeX rendering of expressions, in the notation of common computer algebra systems:
//! `\frac{x^{2}}{2}`, `\sqrt{x}`, `\sin{\left(x \right)}`, `e^{x}`, `\infty`.
use crate::symbolic::parse_expr::GREEK;
use crate::symbolic::symbolic_engine::{Expr, PREC_ADD, PREC_MUL, PREC_POW, format_number};

fn parens(text: String) -> String {
    format!("\\left({}\\right)", text)
}

fn latex_number(val: f64) -> String {
    if val.is_infinite() {
        if val > 0.0 { "\\infty".to_string() } else { "-\\infty".to_string() }
    } else if val.is_nan() {
        "\\text{NaN}".to_string()
    } else {
        format_number(val)
    }
}

fn latex_symbol(name: &str) -> String {
    if GREEK.contains(&name) {
        return format!("\\{}", name);
    }
    // x1 -> x_{1}, x_max -> x_{max}
    match name.split_once('_') {
        Some((head, tail)) if !head.is_empty() && !tail.is_empty() => {
            format!("{}_{{{}}}", latex_symbol(head), tail)
        }
        _ => {
            let digits = name.trim_start_matches(|c: char| c.is_ascii_alphabetic());
            let head = &name[..name.len() - digits.len()];
            if !head.is_empty() && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                format!("{}_{{{}}}", latex_symbol(head), digits)
            } else {
                name.to_string()
            }
        }
    }
}

/// LaTeX operator name of a one-argument function
fn function_name(expr: &Expr) -> Option<&'static str> {
    Some(match expr {
        Expr::sin(_) => "\\sin",
        Expr::cos(_) => "\\cos",
        Expr::tg(_) => "\\tan",
        Expr::ctg(_) => "\\cot",
        Expr::arcsin(_) => "\\operatorname{asin}",
        Expr::arccos(_) => "\\operatorname{acos}",
        Expr::arctg(_) => "\\operatorname{atan}",
        Expr::arcctg(_) => "\\operatorname{acot}",
        Expr::Ln(_) => "\\log",
        _ => return None,
    })
}

impl Expr {
    /// LaTeX source for the expression.
    ///
    /// # Examples
    /// ```rust, ignore
    /// assert_eq!(parse("x^2/2")?.simplify().to_latex(), "\\frac{x^{2}}{2}");
    /// ```
    pub fn to_latex(&self) -> String {
        match self {
            Expr::Var(name) => latex_symbol(name),
            Expr::Const(val) => latex_number(*val),
            Expr::Pi => "\\pi".to_string(),
            Expr::E => "e".to_string(),
            Expr::Infinity => "\\infty".to_string(),
            Expr::NegInfinity => "-\\infty".to_string(),
            Expr::Add(lhs, rhs) => {
                let right = rhs.to_latex();
                match right.strip_prefix('-') {
                    Some(stripped) if rhs.precedence() >= PREC_MUL => {
                        format!("{} - {}", lhs.to_latex(), stripped.trim_start())
                    }
                    _ => format!("{} + {}", lhs.to_latex(), right),
                }
            }
            Expr::Sub(lhs, rhs) => {
                let right = rhs.to_latex();
                if rhs.precedence() <= PREC_ADD {
                    format!("{} - {}", lhs.to_latex(), parens(right))
                } else {
                    match right.strip_prefix('-') {
                        Some(stripped) => format!("{} + {}", lhs.to_latex(), stripped.trim_start()),
                        None => format!("{} - {}", lhs.to_latex(), right),
                    }
                }
            }
            Expr::Mul(lhs, rhs) if lhs.is_minus_one() => {
                format!("- {}", rhs.latex_factor())
            }
            Expr::Mul(lhs, rhs) => {
                let left = lhs.latex_factor();
                let right = rhs.latex_factor();
                // two numbers side by side need an explicit operator
                let numeric_pair = lhs.as_const().is_some() && rhs.as_const().is_some();
                if numeric_pair || right.starts_with('-') {
                    format!("{} \\cdot {}", left, right)
                } else {
                    format!("{} {}", left, right)
                }
            }
            Expr::Div(lhs, rhs) => {
                let numerator = lhs.to_latex();
                match numerator.strip_prefix('-') {
                    Some(stripped) if lhs.precedence() >= PREC_MUL => {
                        format!("- \\frac{{{}}}{{{}}}", stripped.trim_start(), rhs.to_latex())
                    }
                    _ => format!("\\frac{{{}}}{{{}}}", numerator, rhs.to_latex()),
                }
            }
            Expr::Pow(base, exp) if exp.is_half() => format!("\\sqrt{{{}}}", base.to_latex()),
            Expr::Pow(base, exp) => {
                let exponent = exp.to_latex();
                // sin^{2}{\left(x \right)}
                if let (Some(name), [arg]) = (function_name(base), base.args().as_slice()) {
                    return format!("{}^{{{}}}{{\\left({} \\right)}}", name, exponent, arg.to_latex());
                }
                let left = base.to_latex();
                let left = if base.precedence() <= PREC_POW || left.starts_with('-') {
                    parens(left)
                } else {
                    left
                };
                format!("{}^{{{}}}", left, exponent)
            }
            Expr::Exp(arg) => format!("e^{{{}}}", arg.to_latex()),
            other => {
                let name = function_name(other).unwrap_or("\\operatorname{f}");
                let arg = other.args().first().map(|a| a.to_latex()).unwrap_or_default();
                format!("{}{{\\left({} \\right)}}", name, arg)
            }
        }
    }

    /// LaTeX of a factor inside a product, parenthesized when it binds looser than `*`
    fn latex_factor(&self) -> String {
        let text = self.to_latex();
        if self.precedence() < PREC_MUL {
            parens(text)
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::symbolic::parse_expr::parse;

    fn latex(input: &str) -> String {
        parse(input).unwrap().simplify().to_latex()
    }

    #[test]
    fn test_polynomial_latex() {
        assert_eq!(latex("x^2 + 2*x + 1"), "x^{2} + 2 x + 1");
        assert_eq!(latex("x^3/3"), "\\frac{x^{3}}{3}");
        assert_eq!(latex("-x/2"), "- \\frac{x}{2}");
        assert_eq!(latex("2 - x^3"), "- x^{3} + 2");
    }

    #[test]
    fn test_function_latex() {
        assert_eq!(latex("sin(x)"), "\\sin{\\left(x \\right)}");
        assert_eq!(latex("exp(2*x)"), "e^{2 x}");
        assert_eq!(latex("log(x)"), "\\log{\\left(x \\right)}");
        assert_eq!(latex("atan(x)"), "\\operatorname{atan}{\\left(x \\right)}");
        assert_eq!(latex("sin(x)^2"), "\\sin^{2}{\\left(x \\right)}");
        assert_eq!(latex("sqrt(x + 1)"), "\\sqrt{x + 1}");
    }

    #[test]
    fn test_constants_and_symbols() {
        assert_eq!(latex("pi"), "\\pi");
        assert_eq!(latex("oo"), "\\infty");
        assert_eq!(latex("-oo"), "-\\infty");
        assert_eq!(latex("E"), "e");
        assert_eq!(latex("theta"), "\\theta");
        assert_eq!(latex("x1"), "x_{1}");
    }

    #[test]
    fn test_parenthesized_sums() {
        assert_eq!(latex("x*(x + 1)"), "x \\left(x + 1\\right)");
        assert_eq!(latex("(x + 1)^2"), "\\left(x + 1\\right)^{2}");
    }
}
