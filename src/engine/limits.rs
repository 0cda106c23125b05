//! Resolution of integration bounds given as numbers or text.
use crate::engine::errors::LimitError;
use crate::engine::operations::LimitInput;
use crate::symbolic::parse_expr::{NamedConstant, ParseLimits, parse_with};
use crate::symbolic::symbolic_engine::Expr;
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// Spellings accepted for constants inside a bound expression (`2*pi`, `-oo`, `e^2`).
pub const LIMIT_CONSTANTS: &[(&str, NamedConstant)] = &[
    ("pi", NamedConstant::Pi),
    ("e", NamedConstant::E),
    ("E", NamedConstant::E),
    ("oo", NamedConstant::Infinity),
    ("OO", NamedConstant::Infinity),
    ("inf", NamedConstant::Infinity),
    ("INF", NamedConstant::Infinity),
    ("infinity", NamedConstant::Infinity),
    ("Infinity", NamedConstant::Infinity),
];

static LIMIT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?)\s*(pi|e|E|oo|OO|inf|INF|infinity|Infinity)\s*$")
        .expect("limit token pattern is valid")
});

fn lookup_token(token: &str) -> Option<NamedConstant> {
    LIMIT_CONSTANTS
        .iter()
        .find(|(spelling, _)| *spelling == token)
        .map(|(_, constant)| *constant)
}

fn from_number(value: f64) -> Result<Expr, LimitError> {
    if value.is_nan() {
        return Err(LimitError::InvalidLimit {
            text: value.to_string(),
            cause: "not a number".to_string(),
        });
    }
    Ok(if value.is_infinite() {
        if value > 0.0 { Expr::Infinity } else { Expr::NegInfinity }
    } else {
        Expr::Const(value)
    })
}

fn from_text(text: &str) -> Result<Expr, LimitError> {
    if text.trim().is_empty() {
        return Err(LimitError::EmptyLimit);
    }
    if let Some(captures) = LIMIT_TOKEN.captures(text) {
        let negative = &captures[1] == "-";
        if let Some(constant) = lookup_token(&captures[2]) {
            let value = constant.to_expr();
            return Ok(if negative { -value } else { value });
        }
    }
    let resolved = parse_with(text, LIMIT_CONSTANTS, &ParseLimits::default()).map_err(|e| {
        LimitError::InvalidLimit {
            text: text.to_string(),
            cause: e.cause,
        }
    })?;
    debug!("limit '{}' resolved to {}", text, resolved);
    Ok(resolved)
}

/// Turns a bound into an expression: numbers pass through, known tokens map to `pi`, `E`
/// and `±oo`, anything else is parsed with those tokens available as constants.
pub fn resolve_limit(limit: Option<&LimitInput>) -> Result<Expr, LimitError> {
    match limit {
        None => Err(LimitError::EmptyLimit),
        Some(LimitInput::Number(value)) => from_number(*value),
        Some(LimitInput::Text(text)) => from_text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn text(input: &str) -> Result<Expr, LimitError> {
        resolve_limit(Some(&LimitInput::Text(input.to_string())))
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(resolve_limit(Some(&LimitInput::Number(2.5))).unwrap(), Expr::Const(2.5));
        assert_eq!(
            resolve_limit(Some(&LimitInput::Number(f64::NEG_INFINITY))).unwrap(),
            Expr::NegInfinity
        );
        assert!(matches!(
            resolve_limit(Some(&LimitInput::Number(f64::NAN))),
            Err(LimitError::InvalidLimit { .. })
        ));
    }

    #[test]
    fn test_infinity_spellings() {
        for spelling in ["oo", "OO", "inf", "INF", "infinity", "Infinity", " +oo "] {
            assert_eq!(text(spelling).unwrap(), Expr::Infinity, "{}", spelling);
        }
        for spelling in ["-oo", "-inf", "- infinity", "-INF"] {
            assert_eq!(text(spelling).unwrap(), Expr::NegInfinity, "{}", spelling);
        }
        assert_eq!(text("oo").unwrap(), text("infinity").unwrap());
    }

    #[test]
    fn test_constant_tokens() {
        assert_eq!(text("pi").unwrap(), Expr::Pi);
        assert_eq!(text("e").unwrap(), Expr::E);
        assert_eq!(text("E").unwrap(), Expr::E);
        assert_eq!(text("-pi").unwrap().to_f64(), Some(-std::f64::consts::PI));
    }

    #[test]
    fn test_general_expressions() {
        assert_eq!(text("3").unwrap(), Expr::Const(3.0));
        assert_eq!(text("2*pi").unwrap().to_f64(), Some(2.0 * std::f64::consts::PI));
        assert_relative_eq!(text("e^2").unwrap().to_f64().unwrap(), std::f64::consts::E.powi(2));
        // bounds of inner integrals may depend on outer variables
        assert!(text("1 - x").unwrap().has_variable("x"));
    }

    #[test]
    fn test_empty_and_invalid() {
        assert_eq!(text(""), Err(LimitError::EmptyLimit));
        assert_eq!(text("   "), Err(LimitError::EmptyLimit));
        assert_eq!(resolve_limit(None), Err(LimitError::EmptyLimit));
        match text("2 +* 3") {
            Err(LimitError::InvalidLimit { text, .. }) => assert_eq!(text, "2 +* 3"),
            other => panic!("expected InvalidLimit, got {:?}", other),
        }
    }
}
