//___________________________________TESTS____________________________________

#[cfg(test)]
mod tests {
    use crate::symbolic::symbolic_engine::Expr;
    use std::f64::consts::{E, PI};
    use crate::symbolic::parse_expr::parse;
    use crate::symbolic::symbolic_solve::SolverConfig;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_operators_build_trees() {
        let x = Expr::var("x");
        let expr = (x.clone() + Expr::Const(2.0)) * Expr::Const(3.0) - Expr::Const(1.0);
        let expected = Expr::Sub(
            Box::new(Expr::Mul(
                Box::new(Expr::Add(
                    Box::new(Expr::Var("x".to_string())),
                    Box::new(Expr::Const(2.0)),
                )),
                Box::new(Expr::Const(3.0)),
            )),
            Box::new(Expr::Const(1.0)),
        );
        assert_eq!(expr, expected);
        assert_eq!(expr.simplify().to_string(), "3*x + 5");
    }

    #[test]
    fn test_neg() {
        let neg_expr = -Expr::var("x");
        let expected = Expr::Mul(
            Box::new(Expr::Const(-1.0)),
            Box::new(Expr::Var("x".to_string())),
        );
        assert_eq!(neg_expr, expected);
        assert_eq!(-Expr::Const(2.0), Expr::Const(-2.0));
        assert_eq!(-Expr::Infinity, Expr::NegInfinity);
    }

    #[test]
    fn test_free_symbols_then_derivative() {
        let expr = parse("x + x + 2").unwrap();
        let symbols: Vec<String> = expr.free_symbols().into_iter().collect();
        assert_eq!(symbols, vec!["x"]);
        assert_eq!(expr.diff("x").simplify(), Expr::Const(2.0));
    }

    #[test]
    fn test_simplify_is_idempotent() {
        let inputs = [
            "x + x + 2",
            "x^2 + 2*x + 1 - x^2",
            "(x + 1)*(x - 1)",
            "x/2 + x/3",
            "sin(x)^2 + 3*sin(x)^2",
            "exp(x)*exp(x)",
            "2*pi + pi",
            "sqrt(8)",
            "x*y*x/y",
            "1/(x^2 + 1) + 1/(x^2 + 1)",
        ];
        for input in inputs {
            let once = parse(input).unwrap().simplify();
            let twice = once.simplify();
            assert_eq!(once, twice, "simplify not idempotent on '{}'", input);
        }
    }

    #[test]
    fn test_simplify_preserves_value() {
        let point = env(&[("x", 0.7), ("y", 1.9)]);
        for input in ["(x + y)^2 - x*y", "x/2 + x/3", "exp(x)*exp(y)", "sin(x)^2 + cos(x)^2", "x^3/x"] {
            let expr = parse(input).unwrap();
            let before = expr.eval_expression(&point).unwrap();
            let after = expr.simplify().eval_expression(&point).unwrap();
            assert_relative_eq!(before, after, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_display_is_reparsable() {
        let point = env(&[("x", 1.3), ("y", -0.4)]);
        for input in ["-x^2 + 2*x*y", "x^(-2)", "(x - y)/(x + y)", "sqrt(x) - log(x)", "atan(x)/y"] {
            let expr = parse(input).unwrap().simplify();
            let reparsed = parse(&expr.to_string()).unwrap();
            assert_relative_eq!(
                expr.eval_expression(&point).unwrap(),
                reparsed.eval_expression(&point).unwrap(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_partial_derivatives_commute() {
        let expr = parse("x^3*y^2 + sin(x*y)").unwrap();
        let xy = expr.diff("x").diff("y");
        let yx = expr.diff("y").diff("x");
        let point = env(&[("x", 0.3), ("y", 1.7)]);
        assert_relative_eq!(
            xy.eval_expression(&point).unwrap(),
            yx.eval_expression(&point).unwrap(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_integral_of_derivative() {
        // d/dx then integrate returns the original up to a constant
        let expr = parse("x^4 - 3*x^2 + x").unwrap();
        let roundtrip = expr.diff("x").integrate("x").unwrap();
        assert_eq!(roundtrip, expr.simplify());
    }

    #[test]
    fn test_solutions_satisfy_equation() {
        let config = SolverConfig::default();
        for input in ["x^2 - 5*x + 6", "x^3 - 6*x^2 + 11*x - 6", "exp(x) - 3", "x^2 - 2"] {
            let expr = parse(input).unwrap();
            let roots = expr.solve("x", &config).unwrap();
            assert!(!roots.is_empty());
            for root in roots {
                let value = root.to_f64().unwrap();
                let residual = expr.eval_expression(&env(&[("x", value)])).unwrap();
                assert_relative_eq!(residual, 0.0, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_lambdify_matches_eval_expression() {
        let expr = parse("x^2*y - exp(y)/x + 3").unwrap();
        let f = expr.lambdify(&["x", "y"]).unwrap();
        for (x, y) in [(1.0, 2.0), (-0.5, 0.25), (3.0, -1.0)] {
            let expected = expr.eval_expression(&env(&[("x", x), ("y", y)])).unwrap();
            assert_relative_eq!(f(&[x, y]), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_latex_of_antiderivative() {
        let antiderivative = parse("x^2").unwrap().integrate("x").unwrap();
        assert_eq!(antiderivative.to_latex(), "\\frac{x^{3}}{3}");
    }

    #[test]
    fn test_constant_evaluation() {
        assert_relative_eq!(parse("2*pi").unwrap().to_f64().unwrap(), 2.0 * PI);
        assert_relative_eq!(parse("E^2").unwrap().to_f64().unwrap(), E.powi(2));
        assert_eq!(parse("x + 1").unwrap().to_f64(), None);
    }
}
