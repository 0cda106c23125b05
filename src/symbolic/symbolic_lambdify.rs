use crate::symbolic::symbolic_engine::Expr;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::collections::HashMap;
use std::f64::consts::{E, PI};
use std::fmt;

/// Failure to turn an expression into a number.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// a symbol with no value in the environment / argument list
    UnboundVariable(String),
    /// the expression evaluated, but not to a usable real number
    NonNumeric(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EvalError::UnboundVariable(name) => write!(f, "no value bound to symbol '{}'", name),
            EvalError::NonNumeric(expr) => write!(f, "'{}' does not evaluate to a real number", expr),
        }
    }
}

impl std::error::Error for EvalError {}

/// Shared type of compiled expressions: thread safe, arguments in the order given at compile time.
pub type CompiledFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

impl Expr {
    /// LAMBDIFICATION - Converting Symbolic Expressions to Executable Functions

    /// Evaluates the expression with the symbols taken from `env`.
    ///
    /// Floating point semantics are kept: `1/0 = inf`, `log(-1) = NaN`; the only error is a
    /// symbol missing from `env`.
    pub fn eval_expression(&self, env: &HashMap<String, f64>) -> Result<f64, EvalError> {
        let value = match self {
            Expr::Var(name) => match env.get(name) {
                Some(val) => *val,
                None => return Err(EvalError::UnboundVariable(name.clone())),
            },
            Expr::Const(val) => *val,
            Expr::Pi => PI,
            Expr::E => E,
            Expr::Infinity => f64::INFINITY,
            Expr::NegInfinity => f64::NEG_INFINITY,
            Expr::Add(lhs, rhs) => lhs.eval_expression(env)? + rhs.eval_expression(env)?,
            Expr::Sub(lhs, rhs) => lhs.eval_expression(env)? - rhs.eval_expression(env)?,
            Expr::Mul(lhs, rhs) => lhs.eval_expression(env)? * rhs.eval_expression(env)?,
            Expr::Div(lhs, rhs) => lhs.eval_expression(env)? / rhs.eval_expression(env)?,
            Expr::Pow(base, exp) => base.eval_expression(env)?.powf(exp.eval_expression(env)?),
            Expr::Exp(expr) => expr.eval_expression(env)?.exp(),
            Expr::Ln(expr) => expr.eval_expression(env)?.ln(),
            Expr::sin(expr) => expr.eval_expression(env)?.sin(),
            Expr::cos(expr) => expr.eval_expression(env)?.cos(),
            Expr::tg(expr) => expr.eval_expression(env)?.tan(),
            Expr::ctg(expr) => 1.0 / expr.eval_expression(env)?.tan(),
            Expr::arcsin(expr) => expr.eval_expression(env)?.asin(),
            Expr::arccos(expr) => expr.eval_expression(env)?.acos(),
            Expr::arctg(expr) => expr.eval_expression(env)?.atan(),
            Expr::arcctg(expr) => (1.0 / expr.eval_expression(env)?).atan(),
        };
        Ok(value)
    }

    /// Numeric value of a symbol-free expression.
    pub fn eval_constant(&self) -> Result<f64, EvalError> {
        self.eval_expression(&HashMap::new())
    }

    /// Numeric value of a symbol-free expression, `None` when it has symbols or is NaN.
    pub fn to_f64(&self) -> Option<f64> {
        self.eval_constant().ok().filter(|val| !val.is_nan())
    }

    /// Converts the expression into a closure over the arguments `vars` (in that order).
    ///
    /// Every free symbol must appear in `vars`, otherwise `EvalError::UnboundVariable` is
    /// returned before anything is compiled.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = parse("x^2 + y")?.lambdify(&["x", "y"])?;
    /// assert_eq!(f(&[3.0, 1.0]), 10.0);
    /// ```
    pub fn lambdify(&self, vars: &[&str]) -> Result<CompiledFn, EvalError> {
        if let Some(unbound) = self.free_symbols().into_iter().find(|s| !vars.contains(&s.as_str())) {
            return Err(EvalError::UnboundVariable(unbound));
        }
        Ok(self.lambdify_checked(vars))
    }

    fn lambdify_checked(&self, vars: &[&str]) -> CompiledFn {
        match self {
            Expr::Var(name) => {
                let index = vars.iter().position(|&x| x == name).unwrap_or(0);
                Box::new(move |args| args[index])
            }
            Expr::Const(_) | Expr::Pi | Expr::E | Expr::Infinity | Expr::NegInfinity => {
                let val = self.eval_constant().unwrap_or(f64::NAN);
                Box::new(move |_| val)
            }
            Expr::Add(lhs, rhs) => {
                let lf = lhs.lambdify_checked(vars);
                let rf = rhs.lambdify_checked(vars);
                Box::new(move |args| lf(args) + rf(args))
            }
            Expr::Sub(lhs, rhs) => {
                let lf = lhs.lambdify_checked(vars);
                let rf = rhs.lambdify_checked(vars);
                Box::new(move |args| lf(args) - rf(args))
            }
            Expr::Mul(lhs, rhs) => {
                let lf = lhs.lambdify_checked(vars);
                let rf = rhs.lambdify_checked(vars);
                Box::new(move |args| lf(args) * rf(args))
            }
            Expr::Div(lhs, rhs) => {
                let lf = lhs.lambdify_checked(vars);
                let rf = rhs.lambdify_checked(vars);
                Box::new(move |args| lf(args) / rf(args))
            }
            Expr::Pow(b, e) => {
                let bf = b.lambdify_checked(vars);
                match e.as_const() {
                    // integer powers keep the sign of negative bases
                    Some(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => {
                        let n = n as i32;
                        Box::new(move |args| bf(args).powi(n))
                    }
                    _ => {
                        let ef = e.lambdify_checked(vars);
                        Box::new(move |args| bf(args).powf(ef(args)))
                    }
                }
            }
            Expr::Exp(e) => {
                let f = e.lambdify_checked(vars);
                Box::new(move |args| f(args).exp())
            }
            Expr::Ln(e) => {
                let f = e.lambdify_checked(vars);
                Box::new(move |args| f(args).ln())
            }
            Expr::sin(e) => {
                let f = e.lambdify_checked(vars);
                Box::new(move |args| f(args).sin())
            }
            Expr::cos(e) => {
                let f = e.lambdify_checked(vars);
                Box::new(move |args| f(args).cos())
            }
            Expr::tg(e) => {
                let f = e.lambdify_checked(vars);
                Box::new(move |args| f(args).tan())
            }
            Expr::ctg(e) => {
                let f = e.lambdify_checked(vars);
                Box::new(move |args| 1.0 / f(args).tan())
            }
            Expr::arcsin(e) => {
                let f = e.lambdify_checked(vars);
                Box::new(move |args| f(args).asin())
            }
            Expr::arccos(e) => {
                let f = e.lambdify_checked(vars);
                Box::new(move |args| f(args).acos())
            }
            Expr::arctg(e) => {
                let f = e.lambdify_checked(vars);
                Box::new(move |args| f(args).atan())
            }
            Expr::arcctg(e) => {
                let f = e.lambdify_checked(vars);
                Box::new(move |args| (1.0 / f(args)).atan())
            }
        }
    } // end of lambdify

    /// Single-argument closure for expressions in at most the one symbol `var`.
    pub fn lambdify1D(&self, var: &str) -> Result<Box<dyn Fn(f64) -> f64 + Send + Sync>, EvalError> {
        let compiled = self.lambdify(&[var])?;
        Ok(Box::new(move |x| compiled(&[x])))
    }

    /// Evaluates the expression element-wise over `values` of `var`.
    pub fn eval_on_array(&self, var: &str, values: &Array1<f64>) -> Result<Array1<f64>, EvalError> {
        let f = self.lambdify1D(var)?;
        Ok(values.mapv(|x| f(x)))
    }

    /// Evaluates over the mesh `xs` x `ys`; row `i` holds `f(xs[j], ys[i])`.
    pub fn eval_on_mesh(
        &self,
        vars: (&str, &str),
        xs: &Array1<f64>,
        ys: &Array1<f64>,
    ) -> Result<Array2<f64>, EvalError> {
        let f = self.lambdify(&[vars.0, vars.1])?;
        // rows are independent, evaluate them in parallel
        let values: Vec<f64> = ys
            .to_vec()
            .par_iter()
            .flat_map_iter(|&y| xs.iter().map(|&x| f(&[x, y])).collect::<Vec<f64>>())
            .collect();
        Array2::from_shape_vec((ys.len(), xs.len()), values)
            .map_err(|e| EvalError::NonNumeric(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse;
    use approx::assert_relative_eq;

    #[test]
    fn test_eval_expression() {
        let expr = parse("x^2 + y*sin(pi/2)").unwrap();
        let env = HashMap::from([("x".to_string(), 3.0), ("y".to_string(), 2.0)]);
        assert_relative_eq!(expr.eval_expression(&env).unwrap(), 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_eval_unbound_variable() {
        let expr = parse("x + a").unwrap();
        let env = HashMap::from([("x".to_string(), 1.0)]);
        assert_eq!(
            expr.eval_expression(&env),
            Err(EvalError::UnboundVariable("a".to_string()))
        );
    }

    #[test]
    fn test_float_semantics_are_kept() {
        assert_eq!(parse("1/0").unwrap().eval_constant().unwrap(), f64::INFINITY);
        assert!(parse("log(-1)").unwrap().eval_constant().unwrap().is_nan());
        assert_eq!(parse("log(-1)").unwrap().to_f64(), None);
        assert_eq!(parse("1/oo").unwrap().to_f64(), Some(0.0));
    }

    #[test]
    fn test_lambdify_multiple_variables() {
        let f = parse("x^2 + y").unwrap().lambdify(&["x", "y"]).unwrap();
        assert_relative_eq!(f(&[3.0, 1.0]), 10.0);
        assert_relative_eq!(f(&[-2.0, 0.5]), 4.5);
    }

    #[test]
    fn test_lambdify_rejects_unbound() {
        let result = parse("x + z").unwrap().lambdify(&["x"]);
        assert!(matches!(result, Err(EvalError::UnboundVariable(name)) if name == "z"));
    }

    #[test]
    fn test_negative_base_integer_power() {
        let f = parse("x^3").unwrap().lambdify1D("x").unwrap();
        assert_relative_eq!(f(-2.0), -8.0);
    }

    #[test]
    fn test_acot_branch() {
        let f = parse("acot(x)").unwrap().lambdify1D("x").unwrap();
        assert_relative_eq!(f(1.0), PI / 4.0, epsilon = 1e-12);
        assert_relative_eq!(f(-1.0), -PI / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_eval_on_array_and_mesh() {
        let xs = Array1::linspace(0.0, 2.0, 3);
        let values = parse("2*x").unwrap().eval_on_array("x", &xs).unwrap();
        assert_eq!(values.to_vec(), vec![0.0, 2.0, 4.0]);

        let ys = Array1::linspace(0.0, 1.0, 2);
        let mesh = parse("x + 10*y").unwrap().eval_on_mesh(("x", "y"), &xs, &ys).unwrap();
        assert_eq!(mesh.dim(), (2, 3));
        assert_relative_eq!(mesh[[1, 2]], 12.0);
    }
}
