//! Equation solving: `expr = 0` for one variable.
//!
//! Polynomials of degree 1 and 2 (symbolic coefficients allowed) are solved in closed form.
//! Higher degree polynomials with numeric coefficients are solved with the Durand-Kerner
//! iteration, exact integer roots are deflated and a quadratic remainder is solved in closed
//! form. A single occurrence of `exp`, `log`, `sqrt`, `sin`, `cos`, `tan` or `a^u` around the
//! variable is isolated by the inverse function. Everything else falls back to a sign-change
//! scan with bisection over a bounded window.
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::{linspace, round_near_integer};
use log::{debug, info};
use num_complex::Complex64;
use std::cmp::Ordering;
use std::fmt;

/// Error types of the equation solver
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// the equation holds for every value of the variable
    Identity,
    /// neither a closed form nor a numeric scan applies
    NoMethod(String),
    /// the bracket passed to bisection has no sign change
    InvalidInterval,
    MaxIterationsReached,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SolveError::Identity => write!(f, "Equation holds for every value of the variable"),
            SolveError::NoMethod(msg) => write!(f, "No solution method applies: {}", msg),
            SolveError::InvalidInterval => write!(f, "Invalid interval for bisection method"),
            SolveError::MaxIterationsReached => write!(f, "Maximum iterations reached"),
        }
    }
}

impl std::error::Error for SolveError {}

/// Configuration of the numeric parts of the solver
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// window scanned for sign changes when no closed form applies
    pub window: (f64, f64),
    pub scan_points: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            window: (-100.0, 100.0),
            scan_points: 2000,
            tolerance: 1e-12,
            max_iterations: 200,
        }
    }
}

const MAX_POLY_DEGREE: f64 = 64.0;
const ROOT_SNAP: f64 = 1e-9;

/// Coefficient lists, index `i` holds the coefficient of `var^i`.
fn poly_add(a: &[Expr], b: &[Expr]) -> Vec<Expr> {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) => x.clone() + y.clone(),
            (Some(x), None) => x.clone(),
            (None, Some(y)) => y.clone(),
            (None, None) => Expr::Const(0.0),
        })
        .collect()
}

fn poly_neg(a: &[Expr]) -> Vec<Expr> {
    a.iter().map(|c| -c.clone()).collect()
}

fn poly_mul(a: &[Expr], b: &[Expr]) -> Vec<Expr> {
    let mut out = vec![Expr::Const(0.0); a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] = (out[i + j].clone() + x.clone() * y.clone()).simplify();
        }
    }
    out
}

fn poly_coeffs(expr: &Expr, var: &str) -> Option<Vec<Expr>> {
    if !expr.contains_variable(var) {
        return Some(vec![expr.clone()]);
    }
    match expr {
        Expr::Var(_) => Some(vec![Expr::Const(0.0), Expr::Const(1.0)]),
        Expr::Add(lhs, rhs) => Some(poly_add(&poly_coeffs(lhs, var)?, &poly_coeffs(rhs, var)?)),
        Expr::Sub(lhs, rhs) => Some(poly_add(
            &poly_coeffs(lhs, var)?,
            &poly_neg(&poly_coeffs(rhs, var)?),
        )),
        Expr::Mul(lhs, rhs) => Some(poly_mul(&poly_coeffs(lhs, var)?, &poly_coeffs(rhs, var)?)),
        Expr::Div(lhs, rhs) if !rhs.contains_variable(var) => Some(
            poly_coeffs(lhs, var)?
                .into_iter()
                .map(|c| c / (**rhs).clone())
                .collect(),
        ),
        Expr::Pow(base, exp) => {
            let n = exp.as_const()?;
            if n.fract() != 0.0 || n < 0.0 || n > MAX_POLY_DEGREE {
                return None;
            }
            let base = poly_coeffs(base, var)?;
            let mut out = vec![Expr::Const(1.0)];
            for _ in 0..(n as usize) {
                out = poly_mul(&out, &base);
            }
            Some(out)
        }
        _ => None,
    }
}

/// `Some(x)` when the expression is a real number
fn numeric(expr: &Expr) -> Option<f64> {
    expr.to_f64().filter(|val| val.is_finite())
}

fn sort_and_dedup(mut roots: Vec<Expr>) -> Vec<Expr> {
    roots.sort_by(|a, b| match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    let mut unique: Vec<Expr> = Vec::new();
    for root in roots {
        let duplicate = unique.iter().any(|seen| {
            *seen == root
                || match (numeric(seen), numeric(&root)) {
                    (Some(x), Some(y)) => (x - y).abs() <= 1e-9 * (1.0 + x.abs()),
                    _ => false,
                }
        });
        if !duplicate {
            unique.push(root);
        }
    }
    unique
}

/// Evaluates a real polynomial, Horner scheme, coefficients in ascending order
fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// All complex roots of a polynomial with real coefficients (ascending order, nonzero leading)
pub fn durand_kerner(coeffs: &[f64], tolerance: f64, max_iterations: usize) -> Vec<Complex64> {
    let degree = coeffs.len() - 1;
    let lead = coeffs[degree];
    let monic: Vec<f64> = coeffs.iter().map(|c| c / lead).collect();
    let eval = |z: Complex64| {
        monic
            .iter()
            .rev()
            .fold(Complex64::new(0.0, 0.0), |acc, c| acc * z + *c)
    };
    let seed = Complex64::new(0.4, 0.9);
    let mut roots: Vec<Complex64> = (0..degree).map(|k| seed.powu(k as u32)).collect();
    for _ in 0..max_iterations {
        let mut max_change: f64 = 0.0;
        for i in 0..degree {
            let mut denominator = Complex64::new(1.0, 0.0);
            for j in 0..degree {
                if i != j {
                    denominator *= roots[i] - roots[j];
                }
            }
            if denominator.norm() == 0.0 {
                continue;
            }
            let delta = eval(roots[i]) / denominator;
            roots[i] -= delta;
            max_change = max_change.max(delta.norm());
        }
        if max_change < tolerance {
            break;
        }
    }
    roots
}

/// Real roots of a numeric polynomial. Integer roots are exact; a remaining quadratic is
/// solved in closed form; other roots are numeric.
fn real_polynomial_roots(coeffs: &[f64], config: &SolverConfig) -> Vec<Expr> {
    let mut remaining = coeffs.to_vec();
    let mut roots = Vec::new();
    // x = 0 roots
    while remaining.len() > 1 && remaining[0] == 0.0 {
        remaining.remove(0);
        roots.push(Expr::Const(0.0));
    }
    if remaining.len() > 3 {
        let candidates = durand_kerner(&remaining, 1e-14, config.max_iterations.max(500));
        for candidate in candidates {
            let r = round_near_integer(candidate.re, 1e-6);
            if r.fract() != 0.0 || candidate.im.abs() > 1e-6 || remaining.len() <= 3 {
                continue;
            }
            let scale: f64 = remaining.iter().map(|c| c.abs()).sum();
            if horner(&remaining, r).abs() > 1e-9 * scale.max(1.0) {
                continue;
            }
            // synthetic division by (x - r)
            let degree = remaining.len() - 1;
            let mut quotient = vec![0.0; degree];
            let mut carry = 0.0;
            for i in (0..=degree).rev() {
                let value = remaining[i] + carry * r;
                if i > 0 {
                    quotient[i - 1] = value;
                }
                carry = value;
            }
            remaining = quotient;
            roots.push(Expr::Const(r));
        }
    }
    match remaining.len() {
        0 | 1 => {}
        2 | 3 => {
            let exprs: Vec<Expr> = remaining.iter().map(|c| Expr::Const(*c)).collect();
            roots.extend(closed_form_roots(&exprs));
        }
        _ => {
            let candidates = durand_kerner(&remaining, 1e-14, config.max_iterations.max(500));
            for candidate in candidates {
                if candidate.im.abs() > 1e-7 * (1.0 + candidate.re.abs()) {
                    continue;
                }
                roots.push(Expr::Const(round_near_integer(
                    newton_polish(&remaining, candidate.re),
                    ROOT_SNAP,
                )));
            }
        }
    }
    roots
}

fn newton_polish(coeffs: &[f64], mut x: f64) -> f64 {
    let derivative: Vec<f64> = coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, c)| c * i as f64)
        .collect();
    for _ in 0..20 {
        let slope = horner(&derivative, x);
        if slope == 0.0 {
            break;
        }
        let step = horner(coeffs, x) / slope;
        x -= step;
        if step.abs() < 1e-15 * (1.0 + x.abs()) {
            break;
        }
    }
    x
}

/// Roots of `c0 + c1 x` or `c0 + c1 x + c2 x^2`; complex pairs are dropped.
fn closed_form_roots(coeffs: &[Expr]) -> Vec<Expr> {
    match coeffs {
        [c0, c1] => vec![(-(c0.clone()) / c1.clone()).simplify()],
        [c, b, a] => {
            let discriminant =
                (b.clone().pow(Expr::Const(2.0)) - Expr::Const(4.0) * a.clone() * c.clone())
                    .simplify();
            let two_a = Expr::Const(2.0) * a.clone();
            match numeric(&discriminant) {
                Some(d) if d < 0.0 => Vec::new(),
                Some(d) if d == 0.0 => vec![(-(b.clone()) / two_a).simplify()],
                _ => {
                    let root = discriminant.sqrt().simplify();
                    vec![
                        ((-(b.clone()) - root.clone()) / two_a.clone()).simplify(),
                        ((-(b.clone()) + root) / two_a).simplify(),
                    ]
                }
            }
        }
        _ => Vec::new(),
    }
}

/// Additive terms of a sum, signs pushed into the terms
fn additive_terms(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Add(lhs, rhs) => {
            let mut terms = additive_terms(lhs);
            terms.extend(additive_terms(rhs));
            terms
        }
        Expr::Sub(lhs, rhs) => {
            let mut terms = additive_terms(lhs);
            terms.extend(additive_terms(rhs).into_iter().map(|t| -t));
            terms
        }
        other => vec![other.clone()],
    }
}

impl Expr {
    /// Coefficients of the expression as a polynomial in `var`, lowest power first, or `None`
    /// when it is not a polynomial in `var`. Coefficients may contain other symbols.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let coeffs = parse("3*x^2 + a*x - 1")?.polynomial_coefficients("x").unwrap();
    /// // [-1, a, 3]
    /// ```
    pub fn polynomial_coefficients(&self, var: &str) -> Option<Vec<Expr>> {
        let mut coeffs: Vec<Expr> = poly_coeffs(self, var)?
            .into_iter()
            .map(|c| c.simplify())
            .collect();
        while coeffs.len() > 1 && coeffs.last().is_some_and(|c| c.is_zero()) {
            coeffs.pop();
        }
        Some(coeffs)
    }

    /// Real solutions of `self = 0` for `var`, ascending, without duplicates.
    pub fn solve(&self, var: &str, config: &SolverConfig) -> Result<Vec<Expr>, SolveError> {
        let expr = self.simplify();
        if expr.is_zero() {
            return Err(SolveError::Identity);
        }
        if !expr.contains_variable(var) {
            return Ok(Vec::new());
        }
        // only the numerator matters, roots of the denominator are excluded below
        let (numerator, denominator) = match &expr {
            Expr::Div(num, den) => ((**num).clone(), Some((**den).clone())),
            _ => (expr.clone(), None),
        };
        let roots = match numerator.solve_numerator(var, config) {
            Ok(roots) => roots,
            Err(SolveError::NoMethod(msg)) if denominator.is_some() => {
                debug!("numerator not solvable in closed form: {}", msg);
                expr.solve_numerically(var, config)?
            }
            Err(e) => return Err(e),
        };
        let roots = match denominator {
            Some(den) => roots
                .into_iter()
                .filter(|root| {
                    let value = den.substitute_variable(var, root).simplify();
                    !value.is_zero()
                })
                .collect(),
            None => roots,
        };
        Ok(sort_and_dedup(roots))
    }

    fn solve_numerator(&self, var: &str, config: &SolverConfig) -> Result<Vec<Expr>, SolveError> {
        if let Some(coeffs) = self.polynomial_coefficients(var) {
            let degree = coeffs.len() - 1;
            debug!("solving polynomial of degree {} in {}", degree, var);
            return match degree {
                0 if coeffs[0].is_zero() => Err(SolveError::Identity),
                0 => Ok(Vec::new()),
                1 | 2 => Ok(closed_form_roots(&coeffs)),
                _ => {
                    let numeric_coeffs: Option<Vec<f64>> = coeffs.iter().map(numeric).collect();
                    match numeric_coeffs {
                        Some(values) => Ok(real_polynomial_roots(&values, config)),
                        None => Err(SolveError::NoMethod(format!(
                            "polynomial of degree {} with symbolic coefficients",
                            degree
                        ))),
                    }
                }
            };
        }
        if let Some(roots) = self.isolate(var, config) {
            return Ok(roots);
        }
        self.solve_numerically(var, config)
    }

    /// Solves `g(u) + k = 0` where exactly one term depends on `var` and `g` is invertible.
    fn isolate(&self, var: &str, config: &SolverConfig) -> Option<Vec<Expr>> {
        let terms = additive_terms(self);
        let (dependent, constant): (Vec<Expr>, Vec<Expr>) =
            terms.into_iter().partition(|t| t.contains_variable(var));
        let [term] = dependent.as_slice() else {
            return None;
        };
        let rest = constant
            .into_iter()
            .reduce(|acc, t| acc + t)
            .unwrap_or(Expr::Const(0.0));
        let (coeff, core) = split_coefficient(term, var);
        let target = (-rest / coeff).simplify();
        let inner_values: Vec<(Expr, Expr)> = match &core {
            Expr::Exp(u) => match numeric(&target) {
                Some(t) if t <= 0.0 => Vec::new(),
                _ => vec![((**u).clone(), target.ln())],
            },
            Expr::Ln(u) => vec![((**u).clone(), target.exp())],
            Expr::Pow(u, exp) if exp.is_half() => match numeric(&target) {
                Some(t) if t < 0.0 => Vec::new(),
                _ => vec![((**u).clone(), target.pow(Expr::Const(2.0)))],
            },
            Expr::Pow(base, u) if !base.contains_variable(var) => {
                vec![((**u).clone(), target.ln() / (**base).clone().ln())]
            }
            Expr::sin(u) => match numeric(&target) {
                Some(t) if t.abs() > 1.0 => Vec::new(),
                _ => {
                    let principal = Expr::arcsin(Box::new(target.clone()));
                    vec![
                        ((**u).clone(), principal.clone()),
                        ((**u).clone(), Expr::Pi - principal),
                    ]
                }
            },
            Expr::cos(u) => match numeric(&target) {
                Some(t) if t.abs() > 1.0 => Vec::new(),
                _ => {
                    let principal = Expr::arccos(Box::new(target.clone()));
                    vec![
                        ((**u).clone(), principal.clone()),
                        ((**u).clone(), Expr::Const(2.0) * Expr::Pi - principal),
                    ]
                }
            },
            Expr::tg(u) => vec![((**u).clone(), Expr::arctg(Box::new(target)))],
            _ => return None,
        };
        let mut roots = Vec::new();
        for (inner, value) in inner_values {
            let equation = (inner - value.simplify()).simplify();
            match equation.solve_numerator(var, config) {
                Ok(found) => roots.extend(found),
                Err(_) => return None,
            }
        }
        Some(roots)
    }

    /// Sign-change scan over the configured window, each bracket refined by bisection.
    /// Brackets around poles are rejected by checking the residual.
    fn solve_numerically(&self, var: &str, config: &SolverConfig) -> Result<Vec<Expr>, SolveError> {
        let others: Vec<String> = self
            .free_symbols()
            .into_iter()
            .filter(|s| s != var)
            .collect();
        if !others.is_empty() {
            return Err(SolveError::NoMethod(format!(
                "{} contains the parameters {:?}",
                self, others
            )));
        }
        info!(
            "no closed form for {} = 0, scanning [{}, {}]",
            self, config.window.0, config.window.1
        );
        let f = self
            .lambdify1D(var)
            .map_err(|e| SolveError::NoMethod(e.to_string()))?;
        let grid = linspace(config.window.0, config.window.1, config.scan_points.max(2));
        let values: Vec<f64> = grid.iter().map(|x| f(*x)).collect();
        let mut roots = Vec::new();
        for i in 0..grid.len() {
            if values[i] == 0.0 {
                roots.push(grid[i]);
                continue;
            }
            if i + 1 == grid.len() || !values[i].is_finite() || !values[i + 1].is_finite() {
                continue;
            }
            if values[i] * values[i + 1] < 0.0 {
                let root = bisection(&f, grid[i], grid[i + 1], config)?;
                let residual = f(root).abs();
                if residual <= 1e-6 * (1.0 + values[i].abs().min(values[i + 1].abs())) {
                    roots.push(root);
                }
            }
        }
        if roots.is_empty() {
            debug!("no sign change of {} found", self);
        }
        Ok(roots
            .into_iter()
            .map(|r| Expr::Const(round_near_integer(r, ROOT_SNAP)))
            .collect())
    }
}

/// `c * core` with `c` free of `var`
fn split_coefficient(term: &Expr, var: &str) -> (Expr, Expr) {
    match term {
        Expr::Mul(lhs, rhs) if !lhs.contains_variable(var) => {
            let (c, core) = split_coefficient(rhs, var);
            ((**lhs).clone() * c, core)
        }
        Expr::Mul(lhs, rhs) if !rhs.contains_variable(var) => {
            let (c, core) = split_coefficient(lhs, var);
            (c * (**rhs).clone(), core)
        }
        Expr::Div(lhs, rhs) if !rhs.contains_variable(var) => {
            let (c, core) = split_coefficient(lhs, var);
            (c / (**rhs).clone(), core)
        }
        other => (Expr::Const(1.0), other.clone()),
    }
}

/// Bisection on a bracket with a sign change.
pub fn bisection<F>(function: &F, mut a: f64, mut b: f64, config: &SolverConfig) -> Result<f64, SolveError>
where
    F: Fn(f64) -> f64 + ?Sized,
{
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }
    let mut fa = function(a);
    let fb = function(b);
    if fa * fb > 0.0 {
        return Err(SolveError::InvalidInterval);
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    for _ in 0..config.max_iterations {
        let c = 0.5 * (a + b);
        let fc = function(c);
        if fc == 0.0 || (b - a) * 0.5 < config.tolerance * (1.0 + c.abs()) {
            return Ok(c);
        }
        if fa * fc < 0.0 {
            b = c;
        } else {
            a = c;
            fa = fc;
        }
    }
    Err(SolveError::MaxIterationsReached)
}
