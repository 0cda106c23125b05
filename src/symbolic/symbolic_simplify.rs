//! # Symbolic Expression Simplification Module
//!
//! Normal-form simplification of expressions. The result is what the calculator prints, so the
//! normal form is also a presentation contract: like terms collected, terms ordered by degree
//! (highest first, constants last), numeric coefficients in front, exact rational arithmetic.
//!
//! ## Simplification Strategy
//!
//! 1. **Children first**: arguments are simplified before their parent node
//! 2. **Function identities**: `exp(log(a)) = a`, `log(1) = 0`, `sin(pi) = 0`, `atan(oo) = pi/2`, ...
//! 3. **Sum of products**: every `Add/Sub/Mul/Div/Pow` tree is flattened into terms, each term
//!    into a rational coefficient times factors `base^exponent`. Equal bases add their
//!    exponents, equal factor sets add their coefficients.
//! 4. **Number times sum**: `2*(x + 1)` is distributed into `2*x + 2`
//! 5. **Fixed point**: single passes are repeated until nothing changes, which makes
//!    `simplify(simplify(e)) == simplify(e)`
//!
//! `fold_constants` is the lightweight variant applied by the parser: pure numeric
//! sub-expressions are folded only when the result is exact.

use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_integration::{numeric_coefficients, poly_divide, rebuild_polynomial};
use crate::symbolic::utils::{gcd, largest_square_factor, simple_fraction};
use std::cmp::Ordering;
use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::collections::HashMap;

const MAX_SIMPLIFY_PASSES: usize = 10;
/// integer powers of products are expanded only up to this exponent
const MAX_EXPANDED_POWER: f64 = 64.0;
/// fractional exponents with denominators up to this print as `p/q`
const MAX_EXPONENT_DENOMINATOR: i64 = 100;

/// Numeric coefficient of a term: exact rational while it fits into `i64`, float otherwise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Coeff {
    Rational(i64, i64),
    Float(f64),
}

impl Coeff {
    pub(crate) fn from_f64(val: f64) -> Coeff {
        if val.is_finite() && val.fract() == 0.0 && val.abs() < 1e15 {
            Coeff::Rational(val as i64, 1)
        } else {
            Coeff::Float(val)
        }
    }

    fn rational(num: i64, den: i64) -> Coeff {
        if den == 0 {
            return Coeff::Float(num as f64 / 0.0);
        }
        let divisor = gcd(num, den).max(1);
        let (mut num, mut den) = (num / divisor, den / divisor);
        if den < 0 {
            num = -num;
            den = -den;
        }
        Coeff::Rational(num, den)
    }

    pub(crate) fn to_f64(self) -> f64 {
        match self {
            Coeff::Rational(num, den) => num as f64 / den as f64,
            Coeff::Float(val) => val,
        }
    }

    fn add(self, other: Coeff) -> Coeff {
        if let (Coeff::Rational(a, b), Coeff::Rational(c, d)) = (self, other) {
            let sum = a
                .checked_mul(d)
                .zip(c.checked_mul(b))
                .and_then(|(ad, cb)| ad.checked_add(cb))
                .zip(b.checked_mul(d));
            if let Some((num, den)) = sum {
                return Coeff::rational(num, den);
            }
        }
        Coeff::from_f64(self.to_f64() + other.to_f64())
    }

    fn mul(self, other: Coeff) -> Coeff {
        if let (Coeff::Rational(a, b), Coeff::Rational(c, d)) = (self, other) {
            if let Some((num, den)) = a.checked_mul(c).zip(b.checked_mul(d)) {
                return Coeff::rational(num, den);
            }
        }
        Coeff::from_f64(self.to_f64() * other.to_f64())
    }

    fn neg(self) -> Coeff {
        match self {
            Coeff::Rational(num, den) => Coeff::Rational(-num, den),
            Coeff::Float(val) => Coeff::Float(-val),
        }
    }

    fn recip(self) -> Coeff {
        match self {
            Coeff::Rational(num, den) => Coeff::rational(den, num),
            Coeff::Float(val) => Coeff::from_f64(1.0 / val),
        }
    }

    fn powi(self, n: i64) -> Coeff {
        let mut result = Coeff::Rational(1, 1);
        for _ in 0..n.unsigned_abs() {
            result = result.mul(self);
        }
        if n < 0 { result.recip() } else { result }
    }

    pub(crate) fn is_zero(self) -> bool {
        self.to_f64() == 0.0
    }

    pub(crate) fn is_one(self) -> bool {
        matches!(self, Coeff::Rational(1, 1))
    }
}

/// One product `coeff * base_1^exp_1 * ... * base_n^exp_n`.
#[derive(Clone, Debug)]
struct Term {
    coeff: Coeff,
    factors: Vec<(Expr, Expr)>,
}

impl Term {
    fn number(coeff: Coeff) -> Term {
        Term {
            coeff,
            factors: Vec::new(),
        }
    }

    fn factor(base: Expr, exp: Expr) -> Term {
        Term {
            coeff: Coeff::Rational(1, 1),
            factors: vec![(base, exp)],
        }
    }

    fn times(mut self, other: Term) -> Term {
        self.coeff = self.coeff.mul(other.coeff);
        self.factors.extend(other.factors);
        self
    }

    fn negated(mut self) -> Term {
        self.coeff = self.coeff.neg();
        self
    }

    fn reciprocal(self) -> Term {
        Term {
            coeff: self.coeff.recip(),
            factors: self
                .factors
                .into_iter()
                .map(|(base, exp)| (base, scale_exponent(&exp, -1.0)))
                .collect(),
        }
    }

    fn powi(self, n: f64) -> Term {
        Term {
            coeff: self.coeff.powi(n as i64),
            factors: self
                .factors
                .into_iter()
                .map(|(base, exp)| (base, scale_exponent(&exp, n)))
                .collect(),
        }
    }

    fn is_constant(&self) -> bool {
        self.factors.is_empty()
    }

    /// `Some(sum)` when the term is a number other than 1 times a single sum
    fn distributable_sum(&self) -> Option<Expr> {
        match self.factors.as_slice() {
            [(base @ (Expr::Add(_, _) | Expr::Sub(_, _)), exp)]
                if exp.is_one() && !self.coeff.is_one() =>
            {
                Some(base.clone())
            }
            _ => None,
        }
    }

    /// polynomial degree in the symbols of the term; non-polynomial factors count as 0
    fn degree(&self) -> f64 {
        self.factors
            .iter()
            .map(|(base, exp)| match (base, numeric_exponent(exp)) {
                (Expr::Var(_), Some(n)) => n,
                _ => 0.0,
            })
            .sum()
    }

    /// Merges equal bases, folds numeric bases into the coefficient and orders the factors.
    fn normalize(self) -> Term {
        let mut coeff = self.coeff;
        let mut merged: Vec<(String, Expr, Expr)> = Vec::new();
        for (base, exp) in self.factors {
            let key = base.to_string();
            match merged.iter_mut().find(|(k, _, _)| *k == key) {
                Some((_, _, existing)) => *existing = add_exponents(existing, &exp),
                None => merged.push((key, base, exp)),
            }
        }
        let mut factors = Vec::new();
        for (_, base, exp) in merged {
            let exp = canonical_exponent(exp);
            if exp.is_zero() {
                continue;
            }
            if let (Expr::Const(c), Some(n)) = (&base, numeric_exponent(&exp)) {
                let c = *c;
                if c == 1.0 {
                    continue;
                }
                if c == 0.0 && n > 0.0 {
                    coeff = Coeff::Rational(0, 1);
                    continue;
                }
                if n.fract() == 0.0 && n.abs() <= MAX_EXPANDED_POWER {
                    coeff = coeff.mul(Coeff::from_f64(c).powi(n as i64));
                    continue;
                }
                if (n == 0.5 || n == -0.5) && c > 0.0 && c.fract() == 0.0 && c < 1e12 {
                    let (outer, inner) = largest_square_factor(c as i64);
                    let outer = Coeff::from_f64(outer as f64);
                    coeff = coeff.mul(if n > 0.0 { outer } else { outer.recip() });
                    if inner != 1 {
                        factors.push((Expr::Const(inner as f64), exp));
                    }
                    continue;
                }
                let val = c.powf(n);
                if c > 0.0 && val.is_finite() && val.fract() == 0.0 {
                    coeff = coeff.mul(Coeff::from_f64(val));
                    continue;
                }
            }
            factors.push((base, exp));
        }
        factors.sort_by(|(a, _), (b, _)| compare_factors(a, b));
        Term { coeff, factors }
    }

    /// The term with coefficient 1, rebuilt and printed. Terms with equal keys are like terms.
    fn key(&self) -> String {
        Term {
            coeff: Coeff::Rational(1, 1),
            factors: self.factors.clone(),
        }
        .to_expr()
        .to_string()
    }

    /// Rebuilds `coeff * numerator / denominator`; factors with negative numeric exponents go
    /// to the denominator.
    fn to_expr(&self) -> Expr {
        let mut numerator: Vec<Expr> = Vec::new();
        let mut denominator: Vec<Expr> = Vec::new();
        for (base, exp) in &self.factors {
            match numeric_exponent(exp) {
                Some(n) if n < 0.0 => denominator.push(power(base, &canonical_exponent(Expr::Const(-n)))),
                _ => numerator.push(power(base, exp)),
            }
        }
        let (num_coeff, den_coeff) = match self.coeff {
            Coeff::Rational(num, den) => (num as f64, den as f64),
            Coeff::Float(val) => (val, 1.0),
        };
        let numerator = match numerator.into_iter().reduce(|acc, f| acc * f) {
            None => Expr::Const(num_coeff),
            Some(product) if num_coeff == 1.0 => product,
            Some(product) if num_coeff == -1.0 => {
                Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(product))
            }
            Some(product) => prepend_coefficient(num_coeff, product),
        };
        let mut den_factors = Vec::new();
        if den_coeff != 1.0 {
            den_factors.push(Expr::Const(den_coeff));
        }
        den_factors.extend(denominator);
        match den_factors.into_iter().reduce(|acc, f| acc * f) {
            None => numerator,
            Some(den) => Expr::Div(Box::new(numerator), Box::new(den)),
        }
    }
}

/// `c*a*b` as the left-deep chain `((c*a)*b)` so the coefficient prints first
fn prepend_coefficient(coeff: f64, product: Expr) -> Expr {
    match product {
        Expr::Mul(lhs, rhs) => Expr::Mul(Box::new(prepend_coefficient(coeff, *lhs)), rhs),
        other => Expr::Mul(Box::new(Expr::Const(coeff)), Box::new(other)),
    }
}

fn power(base: &Expr, exp: &Expr) -> Expr {
    if exp.is_one() {
        base.clone()
    } else {
        Expr::Pow(Box::new(base.clone()), Box::new(exp.clone()))
    }
}

/// value of a numeric exponent, `3/2` included
fn numeric_exponent(exp: &Expr) -> Option<f64> {
    match exp {
        Expr::Const(n) => Some(*n),
        Expr::Div(num, den) => Some(num.as_const()? / den.as_const()?),
        _ => None,
    }
}

/// Integers and `1/2` stay numbers, other simple fractions become `p/q`: `x**(3/2)`, `sqrt(x)`.
fn canonical_exponent(exp: Expr) -> Expr {
    let Some(n) = numeric_exponent(&exp) else {
        return exp;
    };
    if n.fract() == 0.0 || n.abs() == 0.5 {
        return Expr::Const(n);
    }
    match simple_fraction(n, MAX_EXPONENT_DENOMINATOR) {
        Some((num, den)) => Expr::Div(Box::new(Expr::Const(num as f64)), Box::new(Expr::Const(den as f64))),
        None => Expr::Const(n),
    }
}

fn scale_exponent(exp: &Expr, factor: f64) -> Expr {
    match numeric_exponent(exp) {
        Some(n) => Expr::Const(n * factor),
        None => Expr::Mul(Box::new(Expr::Const(factor)), Box::new(exp.clone())).simplify(),
    }
}

fn add_exponents(a: &Expr, b: &Expr) -> Expr {
    match (numeric_exponent(a), numeric_exponent(b)) {
        (Some(m), Some(n)) => Expr::Const(m + n),
        _ => Expr::Add(Box::new(a.clone()), Box::new(b.clone())).simplify(),
    }
}

/// named constants, then symbols, then functions, then sums; ties broken by text
fn factor_rank(base: &Expr) -> u8 {
    match base {
        Expr::Const(_) | Expr::Pi | Expr::E => 0,
        Expr::Var(_) => 1,
        Expr::Add(_, _) | Expr::Sub(_, _) => 3,
        _ => 2,
    }
}

fn compare_factors(a: &Expr, b: &Expr) -> Ordering {
    factor_rank(a)
        .cmp(&factor_rank(b))
        .then_with(|| a.to_string().cmp(&b.to_string()))
}

/// highest degree first, constants after other terms of the same degree, then by text
fn compare_terms(a: &(String, Term), b: &(String, Term)) -> Ordering {
    b.1.degree()
        .partial_cmp(&a.1.degree())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.is_constant().cmp(&b.1.is_constant()))
        .then_with(|| a.0.cmp(&b.0))
}

/// Flattens a sum into its terms: `a - (b + c)` -> `[a, -b, -c]`
fn to_terms(expr: &Expr) -> Vec<Term> {
    match expr {
        Expr::Add(lhs, rhs) => {
            let mut terms = to_terms(lhs);
            terms.extend(to_terms(rhs));
            terms
        }
        Expr::Sub(lhs, rhs) => {
            let mut terms = to_terms(lhs);
            terms.extend(to_terms(rhs).into_iter().map(Term::negated));
            terms
        }
        other => vec![to_term(other)],
    }
}

/// Flattens a product (or a single atom) into one term.
fn to_term(expr: &Expr) -> Term {
    match expr {
        Expr::Const(val) => Term::number(Coeff::from_f64(*val)),
        Expr::Mul(lhs, rhs) => to_term(lhs).times(to_term(rhs)),
        Expr::Div(lhs, rhs) => to_term(lhs).times(to_term(rhs).reciprocal()),
        Expr::Pow(base, exp) => power_term(base, exp),
        other => Term::factor(other.clone(), Expr::Const(1.0)),
    }
}

fn power_term(base: &Expr, exp: &Expr) -> Term {
    if let Some(n) = exp.as_const() {
        if n.fract() == 0.0 && n.abs() <= MAX_EXPANDED_POWER {
            match base {
                // (2*x*y)^2 = 4*x^2*y^2
                Expr::Mul(_, _) | Expr::Div(_, _) | Expr::Const(_) => {
                    return to_term(base).powi(n);
                }
                // (x^a)^n = x^(a*n) for integer n
                Expr::Pow(inner_base, inner_exp) => {
                    return Term::factor((**inner_base).clone(), scale_exponent(inner_exp, n));
                }
                _ => {}
            }
        }
    }
    Term::factor(base.clone(), exp.clone())
}

/// Finds `c*r*sin(u)^2` and `c*r*cos(u)^2` with equal coefficients, removes both and returns
/// their sum `c*r`.
fn merge_pythagorean_pair(collected: &mut Vec<(String, Term)>) -> Option<Term> {
    let squared = |(base, exp): &(Expr, Expr)| matches!(base, Expr::sin(_)) && exp.as_const() == Some(2.0);
    for i in 0..collected.len() {
        let term = &collected[i].1;
        let Some(pos) = term.factors.iter().position(squared) else {
            continue;
        };
        let Expr::sin(arg) = &term.factors[pos].0 else {
            continue;
        };
        let mut rest = term.factors.clone();
        rest.remove(pos);
        let mut partner = rest.clone();
        partner.push((Expr::cos(arg.clone()), Expr::Const(2.0)));
        let partner_key = Term {
            coeff: Coeff::Rational(1, 1),
            factors: partner,
        }
        .normalize()
        .key();
        let coeff = term.coeff;
        let Some(j) = collected
            .iter()
            .position(|(k, t)| *k == partner_key && t.coeff == coeff)
        else {
            continue;
        };
        let (first, second) = if i > j { (i, j) } else { (j, i) };
        collected.remove(first);
        collected.remove(second);
        return Some(Term { coeff, factors: rest }.normalize());
    }
    None
}

/// Exact quotient of two polynomials in the same single symbol with numeric coefficients:
/// `(x^2 - 1)/(x - 1)` -> `x + 1`. `None` when there is a remainder.
fn cancel_polynomial_quotient(num: &Expr, den: &Expr) -> Option<Expr> {
    let symbols = den.free_symbols();
    let var = match symbols.iter().collect::<Vec<_>>().as_slice() {
        [var] => var.to_string(),
        _ => return None,
    };
    if num.free_symbols().iter().any(|s| *s != var) {
        return None;
    }
    let den_coeffs = numeric_coefficients(den, &var)?;
    let num_coeffs = numeric_coefficients(num, &var)?;
    // a single power of the symbol is merged by the term rules
    let monomial = den_coeffs.iter().filter(|c| !c.is_zero()).count() == 1;
    if den_coeffs.len() < 2 || monomial || num_coeffs.len() < den_coeffs.len() {
        return None;
    }
    let (quotient, remainder) = poly_divide(&num_coeffs, &den_coeffs);
    if remainder.iter().all(|r| r.is_zero()) {
        Some(rebuild_polynomial(&quotient, &var))
    } else {
        None
    }
}

/// Collects like terms and rebuilds the ordered sum.
fn sum_of_terms(terms: Vec<Term>) -> Expr {
    let mut collected: Vec<(String, Term)> = Vec::new();
    for term in terms {
        let term = term.normalize();
        // a number times a sum is distributed over the sum
        let distributed = match term.distributable_sum() {
            Some(sum) => {
                let coeff = term.coeff;
                to_terms(&sum)
                    .into_iter()
                    .map(|t| {
                        let mut t = t.normalize();
                        t.coeff = t.coeff.mul(coeff);
                        t
                    })
                    .collect()
            }
            None => vec![term],
        };
        for term in distributed {
            let key = term.key();
            match collected.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) => existing.coeff = existing.coeff.add(term.coeff),
                None => collected.push((key, term)),
            }
        }
    }
    collected.retain(|(_, term)| !term.coeff.is_zero());
    while let Some(merged) = merge_pythagorean_pair(&mut collected) {
        let key = merged.key();
        match collected.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.coeff = existing.coeff.add(merged.coeff),
            None => collected.push((key, merged)),
        }
        collected.retain(|(_, term)| !term.coeff.is_zero());
    }
    collected.sort_by(compare_terms);
    collected
        .into_iter()
        .map(|(_, term)| term.to_expr())
        .reduce(|acc, term| acc + term)
        .unwrap_or(Expr::Const(0.0))
}

fn contains_infinity(expr: &Expr) -> bool {
    expr.is_infinite() || expr.args().iter().any(|arg| contains_infinity(arg))
}

/// Numeric expressions involving `oo` are evaluated in floating point: `1/oo = 0`,
/// `exp(-oo) = 0`, `2*oo = oo`, `oo - oo = nan`.
fn fold_infinite(expr: &Expr) -> Option<Expr> {
    if !(expr.is_number() && contains_infinity(expr)) {
        return None;
    }
    let val = expr.eval_expression(&HashMap::new()).ok()?;
    Some(if val == f64::INFINITY {
        Expr::Infinity
    } else if val == f64::NEG_INFINITY {
        Expr::NegInfinity
    } else {
        Expr::Const(val)
    })
}

fn half_pi() -> Expr {
    Expr::Div(Box::new(Expr::Pi), Box::new(Expr::Const(2.0)))
}

fn is_const(expr: &Expr, val: f64) -> bool {
    matches!(expr, Expr::Const(c) if *c == val)
}

/// Known values and inverse pairs of the elementary functions.
fn mentions_pi(expr: &Expr) -> bool {
    matches!(expr, Expr::Pi) || expr.args().iter().any(|arg| mentions_pi(arg))
}

fn sqrt_over_two(n: f64) -> Expr {
    Expr::Div(
        Box::new(Expr::Pow(Box::new(Expr::Const(n)), Box::new(Expr::Const(0.5)))),
        Box::new(Expr::Const(2.0)),
    )
}

/// `sin`/`cos` of a multiple of `pi/4` or `pi/6`: `sin(pi/6) = 1/2`, `cos(pi/4) = sqrt(2)/2`
fn exact_trig_value(arg: &Expr, f: fn(f64) -> f64) -> Option<Expr> {
    if !mentions_pi(arg) {
        return None;
    }
    let angle = arg.to_f64()?;
    simple_fraction(angle / PI, 12)?;
    let value = f(angle);
    let magnitude = value.abs();
    let exact = [
        (0.0, Expr::Const(0.0)),
        (0.5, Expr::Div(Box::new(Expr::Const(1.0)), Box::new(Expr::Const(2.0)))),
        (FRAC_1_SQRT_2, sqrt_over_two(2.0)),
        (3f64.sqrt() / 2.0, sqrt_over_two(3.0)),
        (1.0, Expr::Const(1.0)),
    ]
    .into_iter()
    .find(|(v, _)| (magnitude - v).abs() < 1e-12)
    .map(|(_, e)| e)?;
    Some(if value < 0.0 && magnitude >= 1e-12 { -exact } else { exact })
}

/// Inverse trigonometric value at a point where it is a multiple of `pi/4` or `pi/6`:
/// `asin(1/2) = pi/6`, `acos(-1/2) = 2*pi/3`
fn exact_angle(arg: &Expr, f: fn(f64) -> f64) -> Option<Expr> {
    let angle = f(arg.to_f64()?);
    if !angle.is_finite() {
        return None;
    }
    let (num, den) = simple_fraction(angle / PI, 6).filter(|(_, den)| *den != 5)?;
    Some(Expr::Const(num as f64) * Expr::Pi / Expr::Const(den as f64))
}

fn function_identity(expr: &Expr) -> Expr {
    match expr {
        Expr::Exp(arg) => match arg.as_ref() {
            Expr::Ln(inner) => (**inner).clone(),
            a if a.is_zero() => Expr::Const(1.0),
            a if a.is_one() => Expr::E,
            Expr::Infinity => Expr::Infinity,
            Expr::NegInfinity => Expr::Const(0.0),
            _ => expr.clone(),
        },
        Expr::Ln(arg) => match arg.as_ref() {
            Expr::Exp(inner) => (**inner).clone(),
            Expr::E => Expr::Const(1.0),
            a if a.is_one() => Expr::Const(0.0),
            a if a.is_zero() => Expr::NegInfinity,
            Expr::Infinity => Expr::Infinity,
            _ => expr.clone(),
        },
        Expr::sin(arg) => match arg.as_ref() {
            a if a.is_zero() => Expr::Const(0.0),
            Expr::Pi => Expr::Const(0.0),
            a => exact_trig_value(a, f64::sin).unwrap_or_else(|| expr.clone()),
        },
        Expr::cos(arg) => match arg.as_ref() {
            a if a.is_zero() => Expr::Const(1.0),
            Expr::Pi => Expr::Const(-1.0),
            a => exact_trig_value(a, f64::cos).unwrap_or_else(|| expr.clone()),
        },
        Expr::tg(arg) if arg.is_zero() => Expr::Const(0.0),
        Expr::arcsin(arg) => match arg.as_ref() {
            a if a.is_zero() => Expr::Const(0.0),
            a if a.is_one() => half_pi(),
            a if is_const(a, -1.0) => -half_pi(),
            a => exact_angle(a, f64::asin).unwrap_or_else(|| expr.clone()),
        },
        Expr::arccos(arg) => match arg.as_ref() {
            a if a.is_one() => Expr::Const(0.0),
            a if a.is_zero() => half_pi(),
            a => exact_angle(a, f64::acos).unwrap_or_else(|| expr.clone()),
        },
        Expr::arctg(arg) => match arg.as_ref() {
            a if a.is_zero() => Expr::Const(0.0),
            a if a.is_one() => Expr::Div(Box::new(Expr::Pi), Box::new(Expr::Const(4.0))),
            Expr::Infinity => half_pi(),
            Expr::NegInfinity => -half_pi(),
            a => exact_angle(a, f64::atan).unwrap_or_else(|| expr.clone()),
        },
        Expr::arcctg(arg) => match arg.as_ref() {
            a if a.is_zero() => half_pi(),
            Expr::Infinity | Expr::NegInfinity => Expr::Const(0.0),
            a => exact_angle(a, |v| (1.0 / v).atan()).unwrap_or_else(|| expr.clone()),
        },
        _ => fold_infinite(expr).unwrap_or_else(|| expr.clone()),
    }
}

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// Normal-form simplification.
    ///
    /// Repeats single simplification passes until a fixed point is reached, so the result is
    /// idempotent: `e.simplify().simplify() == e.simplify()`.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let expr = parse("x + x + 2")?;
    /// assert_eq!(expr.simplify().to_string(), "2*x + 2");
    /// ```
    pub fn simplify(&self) -> Expr {
        let mut current = self.clone();
        for _ in 0..MAX_SIMPLIFY_PASSES {
            let next = current.simplify_pass();
            if next == current {
                return next;
            }
            current = next;
        }
        current
    }

    /// One bottom-up rewriting pass.
    pub(crate) fn simplify_pass(&self) -> Expr {
        match self {
            Expr::Var(_)
            | Expr::Const(_)
            | Expr::Pi
            | Expr::E
            | Expr::Infinity
            | Expr::NegInfinity => self.clone(),
            Expr::Add(_, _) | Expr::Sub(_, _) | Expr::Mul(_, _) | Expr::Div(_, _) | Expr::Pow(_, _) => {
                let expr = self.map_args(|arg| arg.simplify_pass());
                if let Some(folded) = fold_infinite(&expr) {
                    return folded;
                }
                if let Expr::Div(num, den) = &expr {
                    if let Some(quotient) = cancel_polynomial_quotient(num, den) {
                        return quotient;
                    }
                }
                // E^a prints as exp(a)
                if let Expr::Pow(base, exp) = &expr {
                    if **base == Expr::E {
                        return function_identity(&Expr::Exp(exp.clone()));
                    }
                }
                sum_of_terms(to_terms(&expr))
            }
            _ => function_identity(&self.map_args(|arg| arg.simplify_pass())),
        }
    }

    /// Folds purely numeric sub-expressions whose value is exact: `2+2 -> 4`, `6/3 -> 2`,
    /// `2^10 -> 1024`. Inexact results such as `1/3` or `2^0.5` keep their structure.
    pub fn fold_constants(&self) -> Expr {
        let expr = self.map_args(|arg| arg.fold_constants());
        let folded = match &expr {
            Expr::Add(lhs, rhs) => lhs.as_const().zip(rhs.as_const()).map(|(a, b)| a + b),
            Expr::Sub(lhs, rhs) => lhs.as_const().zip(rhs.as_const()).map(|(a, b)| a - b),
            Expr::Mul(lhs, rhs) => lhs.as_const().zip(rhs.as_const()).map(|(a, b)| a * b),
            Expr::Div(lhs, rhs) => match (lhs.as_const(), rhs.as_const()) {
                (Some(a), Some(b)) if b != 0.0 => {
                    let integers = a.fract() == 0.0 && b.fract() == 0.0;
                    if !integers || (a % b) == 0.0 {
                        Some(a / b)
                    } else {
                        None
                    }
                }
                _ => None,
            },
            Expr::Pow(base, exp) => match (base.as_const(), exp.as_const()) {
                (Some(a), Some(n)) => {
                    let val = a.powf(n);
                    let integer_exp = n.fract() == 0.0;
                    let exact = (integer_exp && (n >= 0.0 || a.fract() != 0.0))
                        || (!integer_exp && a >= 0.0 && val.fract() == 0.0);
                    if exact && val.is_finite() { Some(val) } else { None }
                }
                _ => None,
            },
            _ => None,
        };
        match folded {
            Some(val) => Expr::Const(val),
            None => expr,
        }
    }

    /// Multiplies out products of sums and small integer powers of sums, then simplifies:
    /// `x*(x + 1)` -> `x**2 + x`, `(x + 1)^2` -> `x**2 + 2*x + 1`.
    pub fn expand(&self) -> Expr {
        expand_node(self).simplify()
    }
}

const MAX_EXPANSION_POWER: f64 = 10.0;

fn is_sum(expr: &Expr) -> bool {
    matches!(expr, Expr::Add(_, _) | Expr::Sub(_, _))
}

fn expand_node(expr: &Expr) -> Expr {
    match expr {
        Expr::Add(_, _) | Expr::Sub(_, _) => expr.map_args(expand_node),
        Expr::Mul(lhs, rhs) => distribute(&expand_node(lhs), &expand_node(rhs)),
        // (a + b)/c = a/c + b/c
        Expr::Div(lhs, rhs) => {
            let numerator = expand_node(lhs);
            let denominator = expand_node(rhs);
            distribute(
                &numerator,
                &Expr::Pow(Box::new(denominator), Box::new(Expr::Const(-1.0))),
            )
        }
        Expr::Pow(base, exp) => {
            let base = expand_node(base);
            match exp.as_const() {
                Some(n) if is_sum(&base) && n.fract() == 0.0 && (2.0..=MAX_EXPANSION_POWER).contains(&n) => {
                    let mut product = base.clone();
                    for _ in 1..(n as usize) {
                        product = distribute(&product, &base).simplify();
                    }
                    product
                }
                _ => Expr::Pow(Box::new(base), exp.clone()),
            }
        }
        other => other.clone(),
    }
}

fn distribute(lhs: &Expr, rhs: &Expr) -> Expr {
    match (lhs, rhs) {
        (Expr::Add(a, b), _) => distribute(a, rhs) + distribute(b, rhs),
        (Expr::Sub(a, b), _) => distribute(a, rhs) - distribute(b, rhs),
        (_, Expr::Add(a, b)) => distribute(lhs, a) + distribute(lhs, b),
        (_, Expr::Sub(a, b)) => distribute(lhs, a) - distribute(lhs, b),
        _ => lhs.clone() * rhs.clone(),
    }
}

#[cfg(test)]
mod tests {
    use crate::symbolic::parse_expr::parse;
    use crate::symbolic::symbolic_engine::Expr;

    fn simplified(input: &str) -> String {
        parse(input).unwrap().simplify().to_string()
    }

    #[test]
    fn test_collect_like_terms() {
        assert_eq!(simplified("x + x + 2"), "2*x + 2");
        assert_eq!(simplified("3*x - x"), "2*x");
        assert_eq!(simplified("x - x"), "0");
        assert_eq!(simplified("x*y + y*x"), "2*x*y");
    }

    #[test]
    fn test_term_order_by_degree() {
        assert_eq!(simplified("1 + 3*x + x^2"), "x**2 + 3*x + 1");
        assert_eq!(simplified("2 - x^3"), "-x**3 + 2");
        assert_eq!(simplified("y^2 + x^2 + x*y"), "x**2 + x*y + y**2");
    }

    #[test]
    fn test_powers_merge() {
        assert_eq!(simplified("x*x"), "x**2");
        assert_eq!(simplified("x^2*x^3"), "x**5");
        assert_eq!(simplified("x^2/x"), "x");
        assert_eq!(simplified("x/x"), "1");
        assert_eq!(simplified("sqrt(x)*sqrt(x)"), "x");
        assert_eq!(simplified("(x^2)^3"), "x**6");
        assert_eq!(simplified("(2*x)^2"), "4*x**2");
    }

    #[test]
    fn test_rational_coefficients() {
        assert_eq!(simplified("x/2 + x/2"), "x");
        assert_eq!(simplified("x/3"), "x/3");
        assert_eq!(simplified("2*x/4"), "x/2");
        assert_eq!(simplified("-x/2"), "-x/2");
        assert_eq!(simplified("1/x"), "1/x");
        assert_eq!(simplified("3/(2*x)"), "3/(2*x)");
    }

    #[test]
    fn test_number_times_sum_is_distributed() {
        assert_eq!(simplified("2*(x + 1)"), "2*x + 2");
        assert_eq!(simplified("-(x - 3)"), "-x + 3");
        // a symbolic factor is kept
        assert_eq!(simplified("x*(x + 1)"), "x*(x + 1)");
    }

    #[test]
    fn test_sqrt_of_integers() {
        assert_eq!(simplified("sqrt(4)"), "2");
        assert_eq!(simplified("sqrt(8)"), "2*sqrt(2)");
        assert_eq!(simplified("sqrt(2)"), "sqrt(2)");
    }

    #[test]
    fn test_function_identities() {
        assert_eq!(simplified("exp(log(x))"), "x");
        assert_eq!(simplified("log(exp(x))"), "x");
        assert_eq!(simplified("log(1)"), "0");
        assert_eq!(simplified("sin(0) + cos(0)"), "1");
        assert_eq!(simplified("cos(pi)"), "-1");
        assert_eq!(simplified("E^x"), "exp(x)");
        assert_eq!(simplified("atan(oo)"), "pi/2");
    }

    #[test]
    fn test_pythagorean_identity() {
        assert_eq!(simplified("sin(x)^2 + cos(x)^2"), "1");
        assert_eq!(simplified("cos(2*x)^2 + sin(2*x)^2"), "1");
        assert_eq!(simplified("3*sin(x)^2 + 3*cos(x)^2 + x"), "x + 3");
        assert_eq!(simplified("y*sin(x)^2 + y*cos(x)^2"), "y");
        // unequal coefficients and different arguments are left alone
        assert_eq!(simplified("2*sin(x)^2 + cos(x)^2"), "cos(x)**2 + 2*sin(x)**2");
        assert_eq!(simplified("sin(x)^2 + cos(y)^2"), "cos(y)**2 + sin(x)**2");
    }

    #[test]
    fn test_polynomial_quotient_cancels() {
        assert_eq!(simplified("(x^2 - 1)/(x - 1)"), "x + 1");
        assert_eq!(simplified("(x^3 - 8)/(x - 2)"), "x**2 + 2*x + 4");
        assert_eq!(simplified("(2*x^2 + 4*x)/(x + 2)"), "2*x");
        // a remainder keeps the quotient
        assert_eq!(simplified("(x^2 + 1)/(x - 1)"), "(x**2 + 1)/(x - 1)");
    }

    #[test]
    fn test_zero_base_and_rational_exponents() {
        assert_eq!(simplified("sqrt(0)"), "0");
        assert_eq!(simplified("2*sqrt(0) + 1"), "1");
        assert_eq!(simplified("x^1.5"), "x**(3/2)");
        assert_eq!(simplified("x^(3/2)*sqrt(x)"), "x**2");
        assert_eq!(simplified("1/x^(3/2)"), "1/x**(3/2)");
    }

    #[test]
    fn test_exact_trigonometric_values() {
        assert_eq!(simplified("asin(1/2)"), "pi/6");
        assert_eq!(simplified("asin(-1/2)"), "-pi/6");
        assert_eq!(simplified("acos(1/2)"), "pi/3");
        assert_eq!(simplified("acos(-1/2)"), "2*pi/3");
        assert_eq!(simplified("atan(sqrt(3))"), "pi/3");
        assert_eq!(simplified("sin(pi/6)"), "1/2");
        assert_eq!(simplified("cos(pi/4)"), "sqrt(2)/2");
        assert_eq!(simplified("sin(pi/2)"), "1");
        assert_eq!(simplified("cos(pi/2)"), "0");
        // no exact form
        assert_eq!(simplified("asin(1/3)"), "asin(1/3)");
        assert_eq!(simplified("sin(1)"), "sin(1)");
    }

    #[test]
    fn test_infinity_arithmetic() {
        assert_eq!(parse("2*oo").unwrap().simplify(), Expr::Infinity);
        assert_eq!(parse("-oo").unwrap().simplify(), Expr::NegInfinity);
        assert_eq!(simplified("1/oo"), "0");
        assert_eq!(simplified("exp(-oo)"), "0");
    }

    #[test]
    fn test_simplify_is_idempotent() {
        for input in [
            "x + x + 2",
            "x^3 + 3*x^2 + 3*x + 1",
            "sin(x)^2 + 2*sin(x) + x/3",
            "(x + 1)*(x - 1)/x",
            "exp(2*x)*x - log(x)/y",
            "2*pi*x + E",
        ] {
            let once = parse(input).unwrap().simplify();
            let twice = once.simplify();
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_expand() {
        assert_eq!(parse("x*(x + 1)").unwrap().expand().to_string(), "x**2 + x");
        assert_eq!(parse("(x + 1)^2").unwrap().expand().to_string(), "x**2 + 2*x + 1");
        assert_eq!(parse("(x + 1)*(x - 1)").unwrap().expand().to_string(), "x**2 - 1");
        assert_eq!(parse("sin(x)").unwrap().expand().to_string(), "sin(x)");
    }

    #[test]
    fn test_fold_constants_is_exact_only() {
        assert_eq!(parse("2^10").unwrap(), Expr::Const(1024.0));
        assert_eq!(parse("1/3").unwrap().to_string(), "1/3");
        assert_eq!(parse("2^0.5").unwrap().to_string(), "sqrt(2)");
        assert_eq!(parse("4^0.5").unwrap(), Expr::Const(2.0));
        assert_eq!(parse("2^-1").unwrap().to_string(), "2**(-1)");
        assert_eq!(parse("0.5/4").unwrap(), Expr::Const(0.125));
    }
}
