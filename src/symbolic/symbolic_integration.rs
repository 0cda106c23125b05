use crate::symbolic::symbolic_engine::{Expr, format_number};
use crate::symbolic::utils::simple_fraction;
use gauss_quad::GaussLegendre;
use log::{debug, info};
use std::cell::RefCell;
use std::collections::HashMap;

/// recursion guard for by-parts and substitution chains
const MAX_INTEGRATION_DEPTH: usize = 12;
/// placeholder symbol for substitutions, never produced by the parser
const SUBSTITUTION_VAR: &str = "__u";
/// interior samples used to look for singularities of a definite integrand
const SINGULARITY_SAMPLES: usize = 1000;

/// `Some(a)` when `expr = a*var + b` with `a` free of `var` and nonzero
fn linear_slope(expr: &Expr, var: &str) -> Option<Expr> {
    let slope = expr.diff(var).simplify();
    if slope.contains_variable(var) || slope.is_zero() {
        None
    } else {
        Some(slope)
    }
}

/// divides by the slope of a linear substitution, skipping the trivial case
fn over_slope(antiderivative: Expr, slope: &Expr) -> Expr {
    if slope.is_one() {
        antiderivative
    } else {
        antiderivative / slope.clone()
    }
}

/// Flattens products and quotients: `2*x/(x+1)` -> `[2, x, (x+1)^-1]`
fn split_factors(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Mul(lhs, rhs) => {
            let mut factors = split_factors(lhs);
            factors.extend(split_factors(rhs));
            factors
        }
        Expr::Div(lhs, rhs) => {
            let mut factors = split_factors(lhs);
            factors.extend(split_factors(rhs).into_iter().map(reciprocal));
            factors
        }
        other => vec![other.clone()],
    }
}

fn reciprocal(factor: Expr) -> Expr {
    match factor {
        Expr::Pow(base, exp) => match exp.as_const() {
            Some(n) => Expr::Pow(base, Box::new(Expr::Const(-n))),
            None => Expr::Pow(base, Box::new(-(*exp))),
        },
        other => Expr::Pow(Box::new(other), Box::new(Expr::Const(-1.0))),
    }
}

fn product(factors: &[Expr]) -> Expr {
    factors
        .iter()
        .cloned()
        .reduce(|acc, f| acc * f)
        .unwrap_or(Expr::Const(1.0))
}

/// LIATE order used to pick `u` in integration by parts; `None` for factors it cannot handle
fn parts_rank(factor: &Expr, var: &str) -> Option<u8> {
    match factor {
        Expr::Ln(u) | Expr::arcsin(u) | Expr::arccos(u) | Expr::arctg(u) | Expr::arcctg(u)
            if linear_slope(u, var).is_some() =>
        {
            Some(0)
        }
        Expr::Var(name) if name == var => Some(1),
        Expr::Pow(base, exp) if matches!(base.as_ref(), Expr::Var(name) if name == var) => {
            match exp.as_const() {
                Some(n) if n.fract() == 0.0 && n > 0.0 => Some(1),
                _ => None,
            }
        }
        Expr::Exp(u) | Expr::sin(u) | Expr::cos(u) if linear_slope(u, var).is_some() => Some(2),
        Expr::Pow(base, u) if !base.contains_variable(var) && linear_slope(u, var).is_some() => {
            Some(2)
        }
        _ => None,
    }
}

/// Ways of reading a factor as `outer(u)`: the placeholder form of `outer` and `u`.
fn substitution_candidates(factor: &Expr, var: &str) -> Vec<(Expr, Expr)> {
    let t = Expr::var(SUBSTITUTION_VAR);
    let mut candidates = Vec::new();
    match factor {
        Expr::Pow(base, exp) if !exp.contains_variable(var) => {
            candidates.push((t.clone().pow((**exp).clone()), (**base).clone()));
        }
        Expr::Pow(base, exp) if !base.contains_variable(var) => {
            candidates.push(((**base).clone().pow(t.clone()), (**exp).clone()));
        }
        Expr::Var(_) => {}
        function => {
            let args = function.args();
            if let [arg] = args.as_slice() {
                let outer = function.map_args(|_| t.clone());
                candidates.push((outer, (*arg).clone()));
            }
        }
    }
    // the factor itself as u, integrand u^1
    if !matches!(factor, Expr::Var(_)) {
        candidates.push((t, factor.clone()));
    }
    candidates
}

impl Expr {
    /// SYMBOLIC INTEGRATION

    /// Indefinite integral with respect to `var`, without constant of integration.
    ///
    /// The integrand is simplified first; the antiderivative is simplified before it is
    /// returned. Expressions free of `var` integrate to `expr*var`.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = parse("3*x^2")?;
    /// assert_eq!(f.integrate("x")?.to_string(), "x**3");
    /// ```
    pub fn integrate(&self, var: &str) -> Result<Expr, String> {
        let integrand = self.simplify();
        let antiderivative = integrand.integrate_with_depth(var, 0)?;
        let result = antiderivative.simplify();
        debug!("integral of {} d{} = {}", integrand, var, result);
        Ok(result)
    }

    fn integrate_with_depth(&self, var: &str, depth: usize) -> Result<Expr, String> {
        if depth > MAX_INTEGRATION_DEPTH {
            return Err(format!("Integration of {} is too deeply nested", self));
        }
        if !self.contains_variable(var) {
            // ∫ c dx = c*x
            return Ok(self.clone() * Expr::var(var));
        }
        match self {
            // ∫ x dx = x²/2
            Expr::Var(_) => Ok(Expr::var(var).pow(Expr::Const(2.0)) / Expr::Const(2.0)),
            // ∫ (f ± g) dx = ∫ f dx ± ∫ g dx
            Expr::Add(lhs, rhs) => Ok(lhs.integrate_with_depth(var, depth + 1)?
                + rhs.integrate_with_depth(var, depth + 1)?),
            Expr::Sub(lhs, rhs) => Ok(lhs.integrate_with_depth(var, depth + 1)?
                - rhs.integrate_with_depth(var, depth + 1)?),
            _ => self.integrate_product(var, depth),
        }
    }

    /// Integrates a product of factors: the constant part is pulled out, then the table,
    /// rational functions, substitution, integration by parts and expansion are tried in turn.
    fn integrate_product(&self, var: &str, depth: usize) -> Result<Expr, String> {
        let (constant, dependent): (Vec<Expr>, Vec<Expr>) = split_factors(self)
            .into_iter()
            .partition(|f| !f.contains_variable(var));
        let coefficient = product(&constant);
        let scale = |result: Expr| {
            if coefficient.is_one() {
                result
            } else {
                coefficient.clone() * result
            }
        };

        if let [single] = dependent.as_slice() {
            if let Ok(result) = single.integrate_factor(var, depth) {
                return Ok(scale(result));
            }
        }
        if let Some(result) = integrate_rational(&dependent, var) {
            return Ok(scale(result));
        }
        if let Some(result) = integrate_by_substitution(&dependent, var, depth) {
            return Ok(scale(result));
        }
        if let Some(result) = integrate_by_parts(&dependent, var, depth) {
            return Ok(scale(result));
        }
        let body = product(&dependent);
        let expanded = body.expand();
        if matches!(expanded, Expr::Add(_, _) | Expr::Sub(_, _)) {
            return Ok(scale(expanded.integrate_with_depth(var, depth + 1)?));
        }
        Err(format!("Cannot integrate {} with respect to {}", self, var))
    }

    /// Table integrals of a single factor, with linear substitution `u = a*x + b`.
    fn integrate_factor(&self, var: &str, depth: usize) -> Result<Expr, String> {
        let fail = || Err(format!("Cannot integrate {} with respect to {}", self, var));
        match self {
            Expr::Var(_) | Expr::Add(_, _) | Expr::Sub(_, _) => {
                self.integrate_with_depth(var, depth + 1)
            }
            Expr::Pow(base, exp) => self.integrate_power(base, exp, var),
            Expr::Exp(u)
            | Expr::Ln(u)
            | Expr::sin(u)
            | Expr::cos(u)
            | Expr::tg(u)
            | Expr::ctg(u)
            | Expr::arcsin(u)
            | Expr::arccos(u)
            | Expr::arctg(u)
            | Expr::arcctg(u) => {
                let Some(slope) = linear_slope(u, var) else {
                    return fail();
                };
                let u = (**u).clone();
                let one = Expr::Const(1.0);
                let one_minus_u2 = one.clone() - u.clone().pow(Expr::Const(2.0));
                let one_plus_u2 = one + u.clone().pow(Expr::Const(2.0));
                let antiderivative = match self {
                    // ∫ e^u du = e^u
                    Expr::Exp(_) => self.clone(),
                    // ∫ ln(u) du = u ln(u) - u
                    Expr::Ln(_) => u.clone() * self.clone() - u,
                    // ∫ sin(u) du = -cos(u)
                    Expr::sin(_) => -Expr::cos(u.boxed()),
                    Expr::cos(_) => Expr::sin(u.boxed()),
                    // ∫ tan(u) du = -ln(cos(u))
                    Expr::tg(_) => -Expr::cos(u.boxed()).ln(),
                    Expr::ctg(_) => Expr::sin(u.boxed()).ln(),
                    // ∫ asin(u) du = u asin(u) + sqrt(1 - u²)
                    Expr::arcsin(_) => u * self.clone() + one_minus_u2.sqrt(),
                    Expr::arccos(_) => u * self.clone() - one_minus_u2.sqrt(),
                    // ∫ atan(u) du = u atan(u) - ln(1 + u²)/2
                    Expr::arctg(_) => u * self.clone() - one_plus_u2.ln() / Expr::Const(2.0),
                    Expr::arcctg(_) => u * self.clone() + one_plus_u2.ln() / Expr::Const(2.0),
                    _ => return fail(),
                };
                Ok(over_slope(antiderivative, &slope))
            }
            _ => fail(),
        }
    }

    fn integrate_power(&self, base: &Expr, exp: &Expr, var: &str) -> Result<Expr, String> {
        if !exp.contains_variable(var) {
            if let Some(slope) = linear_slope(base, var) {
                // ∫ u^(-1) du = ln(u)
                if exp.is_minus_one() {
                    return Ok(over_slope(base.clone().ln(), &slope));
                }
                // ∫ u^n du = u^(n+1)/(n+1)
                let raised = exact_ratio((exp.clone() + Expr::Const(1.0)).simplify());
                return Ok(over_slope(
                    base.clone().pow(raised.clone()) / raised,
                    &slope,
                ));
            }
        }
        if !base.contains_variable(var) {
            if let Some(slope) = linear_slope(exp, var) {
                // ∫ a^u du = a^u/ln(a)
                let antiderivative = if *base == Expr::E {
                    Expr::Exp(Box::new(exp.clone()))
                } else {
                    self.clone() / base.clone().ln()
                };
                return Ok(over_slope(antiderivative, &slope));
            }
        }
        Err(format!("Cannot integrate power: ({})^({})", base, exp))
    }

    /// Definite integral `F(upper) - F(lower)`, simplified.
    ///
    /// Infinite bounds are substituted symbolically; an indeterminate form such as `oo*0`
    /// is resolved by evaluating the antiderivative at growing arguments. A bound where the
    /// antiderivative is undefined (`x*log(x)` at 0) gets a one-sided limit from inside the
    /// interval. Integrands singular inside a numeric interval and values that stay undefined
    /// (`sin(x)` up to `oo`, `log` of a negative number) are errors.
    pub fn definite_integrate(&self, var: &str, lower: &Expr, upper: &Expr) -> Result<Expr, String> {
        let antiderivative = self.integrate(var)?;
        let numeric_bounds = (lower.to_f64(), upper.to_f64());
        if let (Some(a), Some(b)) = numeric_bounds {
            if let Some(point) = self.singular_point_of(Some(&antiderivative), var, a, b) {
                return Err(format!(
                    "{} is not integrable on [{}, {}]: singular near {} = {}",
                    self,
                    lower,
                    upper,
                    var,
                    format_number(point)
                ));
            }
        }
        // direction from the lower bound into the interval
        let inward = match numeric_bounds {
            (Some(a), Some(b)) if b < a => -1.0,
            _ => 1.0,
        };
        let upper_val = antiderivative.value_at_bound(var, upper, -inward);
        let lower_val = antiderivative.value_at_bound(var, lower, inward);
        let value = (upper_val - lower_val).simplify();
        if value.is_undefined() {
            return Err(format!(
                "Integral of {} from {} to {} does not converge",
                self, lower, upper
            ));
        }
        match value.eval_constant() {
            Ok(v) if v == f64::INFINITY => Ok(Expr::Infinity),
            Ok(v) if v == f64::NEG_INFINITY => Ok(Expr::NegInfinity),
            _ => Ok(value),
        }
    }

    /// `true` for values with no real meaning: a numeric NaN or the logarithm of a negative
    /// number anywhere in the tree.
    pub fn is_undefined(&self) -> bool {
        matches!(self.eval_constant(), Ok(v) if v.is_nan()) || self.has_log_of_negative()
    }

    fn has_log_of_negative(&self) -> bool {
        match self {
            Expr::Ln(arg) if arg.to_f64().is_some_and(|v| v < 0.0) => true,
            other => other.args().iter().any(|arg| arg.has_log_of_negative()),
        }
    }

    /// Value of an antiderivative at a bound. Where the plain substitution is undefined, a
    /// numeric limit is taken: at growing arguments for an infinite bound, one-sided from
    /// the `inward` direction (`+1` or `-1`) for a finite one.
    fn value_at_bound(&self, var: &str, bound: &Expr, inward: f64) -> Expr {
        let value = self.substitute_variable(var, bound).simplify();
        if !value.is_undefined() {
            return value;
        }
        let limit = match bound {
            Expr::Infinity => self.limit_at_infinity(var, 1.0),
            Expr::NegInfinity => self.limit_at_infinity(var, -1.0),
            finite => finite
                .to_f64()
                .filter(|b| b.is_finite())
                .and_then(|b| self.limit_at_point(var, b, inward)),
        };
        limit.unwrap_or(value)
    }

    /// One-sided limit at `point`, estimated from samples at distances `10^-4 .. 10^-12`.
    fn limit_at_point(&self, var: &str, point: f64, inward: f64) -> Option<Expr> {
        let f = self.lambdify1D(var).ok()?;
        let scale = 1.0 + point.abs();
        let samples: Vec<f64> = [1e-4, 1e-6, 1e-8, 1e-10, 1e-12]
            .iter()
            .map(|h| f(point + inward * h * scale))
            .collect();
        let (before, last) = (samples[3], samples[4]);
        if last.is_finite() && before.is_finite() && (last - before).abs() <= 1e-6 * (1.0 + last.abs()) {
            debug!("one-sided limit of {} at {} = {}", self, point, last);
            return Some(Expr::Const(last).fold_near_integer());
        }
        None
    }

    /// Limit of a one-variable expression as `var -> sign*oo`, estimated from samples at
    /// `10^2 .. 10^8`. `None` when the samples neither settle nor diverge.
    fn limit_at_infinity(&self, var: &str, sign: f64) -> Option<Expr> {
        let f = self.lambdify1D(var).ok()?;
        let samples: Vec<f64> = [1e2, 1e4, 1e6, 1e8].iter().map(|t| f(sign * t)).collect();
        let last = samples[3];
        let before = samples[2];
        if last.is_finite() && before.is_finite() {
            if (last - before).abs() <= 1e-6 * (1.0 + last.abs()) {
                return Some(Expr::Const(last).fold_near_integer());
            }
            let growing = samples.windows(2).all(|w| w[1].abs() > w[0].abs());
            if growing && last.abs() > 1e6 {
                return Some(if last > 0.0 { Expr::Infinity } else { Expr::NegInfinity });
            }
            return None;
        }
        match last {
            v if v == f64::INFINITY => Some(Expr::Infinity),
            v if v == f64::NEG_INFINITY => Some(Expr::NegInfinity),
            _ => None,
        }
    }

    /// Interior point of the interval between `a` and `b` where the one-variable integrand
    /// cannot be integrated through: a non-finite integrand value, an antiderivative that
    /// leaves its domain part way, or an antiderivative jumping against the sign of the
    /// integrand across a pole. `None` when no such point is sampled or the integrand has
    /// other free symbols.
    pub fn singular_point(&self, var: &str, a: f64, b: f64) -> Option<f64> {
        let antiderivative = self.integrate(var).ok();
        self.singular_point_of(antiderivative.as_ref(), var, a, b)
    }

    fn singular_point_of(&self, antiderivative: Option<&Expr>, var: &str, a: f64, b: f64) -> Option<f64> {
        if !(a.is_finite() && b.is_finite()) || a == b {
            return None;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let f = self.lambdify1D(var).ok()?;
        let h = (hi - lo) / SINGULARITY_SAMPLES as f64;
        // midpoints only: endpoint singularities are handled by the one-sided limits
        let xs: Vec<f64> = (0..SINGULARITY_SAMPLES).map(|i| lo + (i as f64 + 0.5) * h).collect();
        let fs: Vec<f64> = xs.iter().map(|&x| f(x)).collect();
        if let Some(i) = fs.iter().position(|v| !v.is_finite()) {
            return Some(xs[i]);
        }
        let big_f = antiderivative?.lambdify1D(var).ok()?;
        let values: Vec<f64> = xs.iter().map(|&x| big_f(x)).collect();
        let finite = values.iter().filter(|v| v.is_finite()).count();
        if finite == 0 {
            // another branch of the antiderivative, not a singularity
            return None;
        }
        (1..xs.len()).find_map(|i| {
            let (f0, f1) = (fs[i - 1], fs[i]);
            let (v0, v1) = (values[i - 1], values[i]);
            let broken = v0.is_finite() != v1.is_finite();
            let jump = v1 - v0;
            let against = v0.is_finite()
                && v1.is_finite()
                && f0 * f1 > 0.0
                && jump * f0 < 0.0
                && jump.abs() > 1e-9 * (1.0 + v1.abs());
            (broken || against).then(|| 0.5 * (xs[i - 1] + xs[i]))
        })
    }

    fn fold_near_integer(self) -> Expr {
        match self {
            Expr::Const(c) => Expr::Const(crate::symbolic::utils::round_near_integer(c, 1e-9)),
            other => other,
        }
    }

    /// Numerical integration over `[lower, upper]` with Gauss-Legendre quadrature of the
    /// given degree. All free symbols other than `var` must be bound in `env`.
    pub fn quad(
        &self,
        var: &str,
        lower: f64,
        upper: f64,
        degree: usize,
        env: &HashMap<String, f64>,
    ) -> Result<f64, String> {
        if !(lower.is_finite() && upper.is_finite()) {
            return Err("Gauss-Legendre quadrature needs finite bounds".to_string());
        }
        let quad = GaussLegendre::new(degree)
            .map_err(|e| format!("Failed to create Gauss-Legendre quadrature: {:?}", e))?;
        let mut names: Vec<&str> = env.keys().map(|k| k.as_str()).collect();
        names.push(var);
        let f = self.lambdify(&names).map_err(|e| e.to_string())?;
        let mut args: Vec<f64> = names[..names.len() - 1].iter().map(|n| env[*n]).collect();
        args.push(0.0);
        let last = args.len() - 1;
        let result = quad.integrate(lower, upper, |t| {
            let mut point = args.clone();
            point[last] = t;
            f(&point)
        });
        Ok(result)
    }

    /// Iterated quadrature: `axes` are ordered inner to outer, each `(variable, lower, upper)`.
    /// Inner bounds may depend on outer variables.
    pub fn quad_nested(&self, axes: &[(String, Expr, Expr)], degree: usize) -> Result<f64, String> {
        info!(
            "numerical integration of {} over {} axes with Gauss-Legendre degree {}",
            self,
            axes.len(),
            degree
        );
        let quad = GaussLegendre::new(degree)
            .map_err(|e| format!("Failed to create Gauss-Legendre quadrature: {:?}", e))?;
        nested_quadrature(self, axes, &HashMap::new(), &quad)
    }
}

fn nested_quadrature(
    integrand: &Expr,
    axes: &[(String, Expr, Expr)],
    env: &HashMap<String, f64>,
    quad: &GaussLegendre,
) -> Result<f64, String> {
    let Some(((var, lower, upper), inner)) = axes.split_last() else {
        return integrand.eval_expression(env).map_err(|e| e.to_string());
    };
    let lower = lower.eval_expression(env).map_err(|e| e.to_string())?;
    let upper = upper.eval_expression(env).map_err(|e| e.to_string())?;
    if !(lower.is_finite() && upper.is_finite()) {
        return Err(format!("bounds of {} are not finite numbers", var));
    }
    let failure: RefCell<Option<String>> = RefCell::new(None);
    let value = quad.integrate(lower, upper, |t| {
        let mut point = env.clone();
        point.insert(var.clone(), t);
        match nested_quadrature(integrand, inner, &point, quad) {
            Ok(v) => v,
            Err(e) => {
                failure.borrow_mut().get_or_insert(e);
                f64::NAN
            }
        }
    });
    match failure.into_inner() {
        Some(e) => Err(e),
        None => Ok(value),
    }
}

/// `outer(u) * c * u'`: integrates `outer` over the placeholder and substitutes `u` back.
fn integrate_by_substitution(factors: &[Expr], var: &str, depth: usize) -> Option<Expr> {
    for (i, factor) in factors.iter().enumerate() {
        let rest: Vec<Expr> = factors
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, f)| f.clone())
            .collect();
        let rest = product(&rest);
        for (outer, u) in substitution_candidates(factor, var) {
            if rest.is_one() && linear_slope(&u, var).is_some() {
                continue;
            }
            let du = u.diff(var).simplify();
            if du.is_zero() {
                continue;
            }
            let ratio = (rest.clone() / du).simplify();
            if ratio.contains_variable(var) {
                continue;
            }
            let Ok(antiderivative) = outer.integrate_with_depth(SUBSTITUTION_VAR, depth + 1) else {
                continue;
            };
            debug!("substitution u = {} in {}", u, product(factors));
            let back = antiderivative.substitute_variable(SUBSTITUTION_VAR, &u);
            return Some(if ratio.is_one() { back } else { ratio * back });
        }
    }
    None
}

/// `∫ u dv = u v - ∫ v du` for two factors, `u` chosen by LIATE.
fn integrate_by_parts(factors: &[Expr], var: &str, depth: usize) -> Option<Expr> {
    let [a, b] = factors else {
        return None;
    };
    let (rank_a, rank_b) = (parts_rank(a, var)?, parts_rank(b, var)?);
    if rank_a == rank_b {
        return None;
    }
    let (u, dv) = if rank_a < rank_b { (a, b) } else { (b, a) };
    let v = dv.integrate_factor(var, depth + 1).ok()?.simplify();
    let du = u.diff(var).simplify();
    let remaining = (v.clone() * du).simplify();
    let remaining_integral = remaining.integrate_with_depth(var, depth + 1).ok()?;
    Some(u.clone() * v - remaining_integral)
}

/// `N(x)/D(x)` with numeric polynomial coefficients and `D` of degree 1 or 2: polynomial
/// division, then logarithm and arctangent terms for the proper remainder.
fn integrate_rational(factors: &[Expr], var: &str) -> Option<Expr> {
    let (den_factors, num_factors): (Vec<Expr>, Vec<Expr>) = factors
        .iter()
        .cloned()
        .partition(|f| matches!(f, Expr::Pow(_, exp) if exp.as_const().is_some_and(|n| n < 0.0)));
    if den_factors.is_empty() {
        return None;
    }
    let denominator = product(&den_factors.into_iter().map(reciprocal).collect::<Vec<_>>()).simplify();
    let numerator = product(&num_factors).simplify();
    let den = numeric_coefficients(&denominator, var)?;
    let num = numeric_coefficients(&numerator, var)?;
    if den.len() < 2 || den.len() > 3 {
        return None;
    }
    let (quotient, remainder) = poly_divide(&num, &den);
    let x = Expr::var(var);
    let mut result = Expr::Const(0.0);
    for (i, q) in quotient.iter().enumerate() {
        if q.is_zero() {
            continue;
        }
        let power = Expr::Const((i + 1) as f64);
        result = result + q.clone() * x.clone().pow(power.clone()) / power;
    }
    let r0 = remainder.first().cloned().unwrap_or(Expr::Const(0.0));
    let r1 = remainder.get(1).cloned().unwrap_or(Expr::Const(0.0));
    let den_expr = rebuild_polynomial(&den, var);
    match den.as_slice() {
        // r0/(a1 x + a0)
        [_, a1] => {
            if !r0.is_zero() {
                result = result + r0 / a1.clone() * den_expr.ln();
            }
        }
        // (r1 x + r0)/(a x² + b x + c)
        [c, b, a] => {
            if !r1.is_zero() {
                result = result + r1.clone() / (Expr::Const(2.0) * a.clone()) * den_expr.clone().ln();
            }
            let shifted = (r0 - r1 * b.clone() / (Expr::Const(2.0) * a.clone())).simplify();
            if !shifted.is_zero() {
                let d = (Expr::Const(4.0) * a.clone() * c.clone() - b.clone().pow(Expr::Const(2.0)))
                    .simplify();
                let linear = Expr::Const(2.0) * a.clone() * x.clone() + b.clone();
                let d_val = d.to_f64()?;
                let term = if d_val > 0.0 {
                    let s = d.sqrt().simplify();
                    Expr::Const(2.0) * shifted / s.clone() * Expr::arctg(Box::new(linear / s))
                } else if d_val < 0.0 {
                    let s = (-d).sqrt().simplify();
                    shifted / s.clone() * ((linear.clone() - s.clone()) / (linear + s)).ln()
                } else {
                    // a (x + b/2a)² in the denominator
                    -(Expr::Const(2.0) * shifted) / linear
                };
                result = result + term;
            }
        }
        _ => return None,
    }
    Some(result)
}

/// `1.5` -> `3/2`, so the power rule keeps rational coefficients
pub(crate) fn exact_ratio(expr: Expr) -> Expr {
    match expr.as_const().and_then(|n| simple_fraction(n, 100)) {
        Some((num, den)) if den > 1 => Expr::Div(Box::new(Expr::Const(num as f64)), Box::new(Expr::Const(den as f64))),
        _ => expr,
    }
}

pub(crate) fn numeric_coefficients(expr: &Expr, var: &str) -> Option<Vec<Expr>> {
    let coeffs = expr.polynomial_coefficients(var)?;
    if coeffs.iter().all(|c| c.to_f64().is_some_and(|v| v.is_finite())) {
        Some(coeffs)
    } else {
        None
    }
}

pub(crate) fn rebuild_polynomial(coeffs: &[Expr], var: &str) -> Expr {
    coeffs
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, c)| !c.is_zero())
        .map(|(i, c)| match i {
            0 => c.clone(),
            1 => c.clone() * Expr::var(var),
            _ => c.clone() * Expr::var(var).pow(Expr::Const(i as f64)),
        })
        .reduce(|acc, t| acc + t)
        .unwrap_or(Expr::Const(0.0))
        .simplify()
}

/// Long division of coefficient lists (ascending powers): `(quotient, remainder)`
pub(crate) fn poly_divide(num: &[Expr], den: &[Expr]) -> (Vec<Expr>, Vec<Expr>) {
    let mut remainder: Vec<Expr> = num.to_vec();
    let den_degree = den.len() - 1;
    let lead = &den[den_degree];
    if remainder.len() < den.len() {
        return (Vec::new(), remainder);
    }
    let mut quotient = vec![Expr::Const(0.0); remainder.len() - den_degree];
    for k in (0..quotient.len()).rev() {
        let factor = (remainder[k + den_degree].clone() / lead.clone()).simplify();
        for (j, d) in den.iter().enumerate() {
            remainder[k + j] = (remainder[k + j].clone() - factor.clone() * d.clone()).simplify();
        }
        quotient[k] = factor;
    }
    remainder.truncate(den_degree);
    (quotient, remainder)
}
