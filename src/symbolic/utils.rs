/// evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, num_values: usize) -> Vec<f64> {
    if num_values == 1 {
        return vec![start];
    }
    let mut values = Vec::with_capacity(num_values);
    let step = (end - start) / (num_values as f64 - 1.0);

    for i in 0..num_values {
        let value = start + (i as f64 * step);
        values.push(value);
    }

    values
}

/// central difference derivative of a scalar function
pub fn numerical_derivative<F>(f: F, x: f64, h: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    (f(x + h) - f(x - h)) / (2.0 * h)
}

/// greatest common divisor, always non-negative
pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a as i64
}

/// Splits `n > 0` as `outer^2 * inner` with `outer` as large as possible: 8 -> (2, 2), 18 -> (3, 2).
pub fn largest_square_factor(n: i64) -> (i64, i64) {
    let mut outer = 1;
    let mut inner = n;
    let mut k = 2;
    while k * k <= inner {
        while inner % (k * k) == 0 {
            inner /= k * k;
            outer *= k;
        }
        k += 1;
    }
    (outer, inner)
}

/// Values within `tol` of an integer are snapped to it; `-0.0` becomes `0.0`.
pub fn round_near_integer(val: f64, tol: f64) -> f64 {
    let rounded = val.round();
    if (val - rounded).abs() < tol {
        rounded + 0.0
    } else {
        val
    }
}

/// `val` as `(num, den)` with `0 < den <= max_den` in lowest terms, when it is that fraction
/// up to rounding: 1.5 -> (3, 2), -0.25 -> (-1, 4).
pub fn simple_fraction(val: f64, max_den: i64) -> Option<(i64, i64)> {
    if !val.is_finite() || val.abs() > 1e12 {
        return None;
    }
    (1..=max_den).find_map(|den| {
        let num = (val * den as f64).round();
        ((num / den as f64 - val).abs() < 1e-12).then_some((num as i64, den))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints() {
        let values = linspace(-1.0, 1.0, 5);
        assert_eq!(values.len(), 5);
        assert_relative_eq!(values[0], -1.0);
        assert_relative_eq!(values[2], 0.0);
        assert_relative_eq!(values[4], 1.0);
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(-4, 6), 2);
        assert_eq!(gcd(0, 5), 5);
    }

    #[test]
    fn test_largest_square_factor() {
        assert_eq!(largest_square_factor(8), (2, 2));
        assert_eq!(largest_square_factor(18), (3, 2));
        assert_eq!(largest_square_factor(36), (6, 1));
        assert_eq!(largest_square_factor(7), (1, 7));
    }

    #[test]
    fn test_round_near_integer() {
        assert_eq!(round_near_integer(1.9999999999, 1e-9), 2.0);
        assert_eq!(round_near_integer(1.5, 1e-9), 1.5);
        assert!(round_near_integer(-1e-12, 1e-9).is_sign_positive());
    }

    #[test]
    fn test_simple_fraction() {
        assert_eq!(simple_fraction(1.5, 100), Some((3, 2)));
        assert_eq!(simple_fraction(-0.25, 100), Some((-1, 4)));
        assert_eq!(simple_fraction(4.0, 100), Some((4, 1)));
        assert_eq!(simple_fraction(2.0 / 3.0, 100), Some((2, 3)));
        assert_eq!(simple_fraction(std::f64::consts::PI, 100), None);
        assert_eq!(simple_fraction(f64::NAN, 100), None);
    }

    #[test]
    fn test_numerical_derivative() {
        let d = numerical_derivative(|x| x * x, 3.0, 1e-5);
        assert_relative_eq!(d, 6.0, epsilon = 1e-6);
    }
}
