use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_integration::exact_ratio;

impl Expr {
    /// SYMBOLIC DIFFERENTIATION

    /// Computes the (partial) derivative with respect to `var`.
    ///
    /// The raw result follows the textbook rules (sum, product, quotient, chain) node by node
    /// and is not simplified; callers run `simplify()` on it.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = Expr::var("x").pow(Expr::Const(2.0)); // x^2
    /// assert_eq!(f.diff("x").simplify().to_string(), "2*x");
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) | Expr::Pi | Expr::E | Expr::Infinity | Expr::NegInfinity => {
                Expr::Const(0.0)
            }
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Mul(lhs, rhs) => Expr::Add(
                Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                Box::new(Expr::Mul(lhs.clone(), Box::new(rhs.diff(var)))),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(Expr::Sub(
                    Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                    Box::new(Expr::Mul(Box::new(rhs.diff(var)), lhs.clone())),
                )),
                Box::new(Expr::Pow(rhs.clone(), Box::new(Expr::Const(2.0)))),
            ),
            Expr::Pow(base, exp) => {
                if !exp.contains_variable(var) {
                    // d(f^n) = n f^(n-1) f'
                    Expr::Mul(
                        Box::new(Expr::Mul(
                            Box::new(exact_ratio((**exp).clone())),
                            Box::new(Expr::Pow(
                                base.clone(),
                                Box::new(Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0)))),
                            )),
                        )),
                        Box::new(base.diff(var)),
                    )
                } else if !base.contains_variable(var) {
                    // d(a^g) = a^g ln(a) g'
                    Expr::Mul(
                        Box::new(Expr::Mul(Box::new(self.clone()), Box::new(Expr::Ln(base.clone())))),
                        Box::new(exp.diff(var)),
                    )
                } else {
                    // d(f^g) = f^g (g' ln(f) + g f'/f)
                    Expr::Mul(
                        Box::new(self.clone()),
                        Box::new(Expr::Add(
                            Box::new(Expr::Mul(
                                Box::new(exp.diff(var)),
                                Box::new(Expr::Ln(base.clone())),
                            )),
                            Box::new(Expr::Div(
                                Box::new(Expr::Mul(exp.clone(), Box::new(base.diff(var)))),
                                base.clone(),
                            )),
                        )),
                    )
                }
            }
            Expr::Exp(expr) => {
                Expr::Mul(Box::new(Expr::Exp(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::Ln(expr) => Expr::Div(Box::new(expr.diff(var)), expr.clone()),
            Expr::sin(expr) => {
                Expr::Mul(Box::new(Expr::cos(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::cos(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(Expr::sin(expr.clone())),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::tg(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Pow(
                    Box::new(Expr::cos(expr.clone())),
                    Box::new(Expr::Const(2.0)),
                )),
            ),
            Expr::ctg(expr) => Expr::Div(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)),
                )),
                Box::new(Expr::Pow(
                    Box::new(Expr::sin(expr.clone())),
                    Box::new(Expr::Const(2.0)),
                )),
            ),
            Expr::arcsin(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Pow(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                    )),
                    Box::new(Expr::Const(0.5)),
                )),
            ),
            Expr::arccos(expr) => Expr::Div(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)),
                )),
                Box::new(Expr::Pow(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                    )),
                    Box::new(Expr::Const(0.5)),
                )),
            ),
            Expr::arctg(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Add(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                )),
            ),
            Expr::arcctg(expr) => Expr::Div(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)),
                )),
                Box::new(Expr::Add(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                )),
            ),
        }
    } // end of diff

    /// `n`-th derivative with respect to `var`, simplified after every step
    pub fn n_th_derivative(&self, var: &str, n: usize) -> Expr {
        let mut derivative = self.simplify();
        for _ in 0..n {
            derivative = derivative.diff(var).simplify();
        }
        derivative
    }
}

#[cfg(test)]
mod tests {
    use crate::symbolic::parse_expr::parse;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn derivative(input: &str, var: &str) -> String {
        parse(input).unwrap().diff(var).simplify().to_string()
    }

    #[test]
    fn test_polynomial_derivative() {
        assert_eq!(derivative("x**3 + 3*x**2 + 3*x + 1", "x"), "3*x**2 + 6*x + 3");
        assert_eq!(derivative("x + x + 2", "x"), "2");
        assert_eq!(derivative("5", "x"), "0");
    }

    #[test]
    fn test_partial_derivatives() {
        assert_eq!(derivative("x^2*y + y^3", "y"), "x**2 + 3*y**2");
        assert_eq!(derivative("x^2*y + y^3", "x"), "2*x*y");
    }

    #[test]
    fn test_chain_rule() {
        assert_eq!(derivative("sin(2*x)", "x"), "2*cos(2*x)");
        assert_eq!(derivative("exp(x^2)", "x"), "2*x*exp(x**2)");
        assert_eq!(derivative("log(x)", "x"), "1/x");
    }

    #[test]
    fn test_fractional_power_rule() {
        assert_eq!(derivative("sqrt(x)", "x"), "1/(2*sqrt(x))");
        assert_eq!(derivative("x^(3/2)", "x"), "3*sqrt(x)/2");
    }

    #[test]
    fn test_exponent_containing_variable() {
        // d/dx 2^x = 2^x ln 2
        let d = parse("2^x").unwrap().diff("x").simplify();
        let mut env = HashMap::new();
        env.insert("x".to_string(), 3.0);
        assert_relative_eq!(
            d.eval_expression(&env).unwrap(),
            8.0 * 2f64.ln(),
            epsilon = 1e-12
        );
        // d/dx x^x = x^x (ln x + 1)
        let d = parse("x^x").unwrap().diff("x").simplify();
        env.insert("x".to_string(), 2.0);
        assert_relative_eq!(
            d.eval_expression(&env).unwrap(),
            4.0 * (2f64.ln() + 1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_inverse_trig_derivatives_numerically() {
        let mut env = HashMap::new();
        env.insert("x".to_string(), 0.3);
        let cases = [
            ("asin(x)", 1.0 / (1.0 - 0.09f64).sqrt()),
            ("acos(x)", -1.0 / (1.0 - 0.09f64).sqrt()),
            ("atan(x)", 1.0 / 1.09),
            ("acot(x)", -1.0 / 1.09),
            ("tan(x)", 1.0 / 0.3f64.cos().powi(2)),
            ("cot(x)", -1.0 / 0.3f64.sin().powi(2)),
        ];
        for (input, expected) in cases {
            let d = parse(input).unwrap().diff("x").simplify();
            assert_relative_eq!(d.eval_expression(&env).unwrap(), expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_n_th_derivative() {
        let expr = parse("x^4").unwrap();
        assert_eq!(expr.n_th_derivative("x", 2).to_string(), "12*x**2");
        assert_eq!(expr.n_th_derivative("x", 5).to_string(), "0");
    }
}
