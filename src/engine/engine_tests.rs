#[cfg(test)]
mod tests {
    use crate::engine::calc_engine::CalcEngine;
    use crate::engine::errors::{LimitError, OperationError, SampleError};
    use crate::engine::limits::resolve_limit;
    use crate::engine::operations::{Bounds, LimitInput, Operation, OperationRequest};
    use crate::engine::results::{PlotGrid, PlotRequest, ResultKind};
    use crate::symbolic::parse_expr::parse;
    use crate::symbolic::symbolic_engine::Expr;
    use approx::assert_relative_eq;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn engine() -> CalcEngine {
        CalcEngine::default()
    }

    #[test]
    fn test_hostile_input_is_rejected() {
        for text in ["import os; os.system('rm -rf /')", "__import__('os')", "x; y", "lambda: 1"] {
            let error = engine().evaluate_text(text, "simplify", "x", None).unwrap_err();
            assert!(matches!(error, OperationError::Parse(_)), "{} gave {:?}", text, error);
        }
    }

    #[test]
    fn test_uppercase_alias() {
        let upper = engine().evaluate_text("X**2", "simplify", "x", None).unwrap();
        let lower = engine().evaluate_text("x**2", "simplify", "x", None).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_free_symbols_and_derivative() {
        let expr = parse("x + x + 2").unwrap();
        assert_eq!(expr.free_symbols(), BTreeSet::from(["x".to_string()]));
        let result = engine().evaluate_text("x + x + 2", "diff", "x", None).unwrap();
        assert_eq!(result.result, "2");
    }

    #[test]
    fn test_integral_and_solve() {
        let result = engine().evaluate_text("3*x**2", "integrate", "x", None).unwrap();
        assert!(result.result.contains("x**3"));
        let result = engine().evaluate_text("x**2 - 4", "solve", "x", None).unwrap();
        let roots: BTreeSet<&str> = result.solutions.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(roots, BTreeSet::from(["-2", "2"]));
        let result = engine().evaluate_text("x + 5 = 10", "solve", "x", None).unwrap();
        assert_eq!(result.result, "5");
        let result = engine().evaluate_text("2*3", "solve", "x", None).unwrap();
        assert_eq!(result.kind, ResultKind::Constant);
        assert_eq!(result.result, "The value of the expression is: 6");
    }

    #[test]
    fn test_integrals_from_json_bounds() {
        let bounds: Bounds = serde_json::from_value(json!({"lower": "-oo", "upper": "infinity"})).unwrap();
        let result = engine()
            .evaluate_text("1/(x^2 + 1)", "definite_int", "x", Some(bounds))
            .unwrap();
        assert_eq!(result.result, "pi");
        assert_relative_eq!(result.numeric.unwrap(), std::f64::consts::PI, epsilon = 1e-12);

        let bounds: Bounds = serde_json::from_value(json!({
            "x_lower": 0, "x_upper": 1, "y_lower": 0, "y_upper": 1, "z_lower": 0, "z_upper": 2
        }))
        .unwrap();
        let result = engine().evaluate_text("x*y*z", "triple_int", "x", Some(bounds)).unwrap();
        assert_relative_eq!(result.numeric.unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_limit_spellings() {
        let oo = resolve_limit(Some(&LimitInput::from("oo"))).unwrap();
        for spelling in ["infinity", "Infinity", "inf", "INF", "+oo", " OO "] {
            assert_eq!(resolve_limit(Some(&LimitInput::from(spelling))).unwrap(), oo);
        }
        assert_eq!(oo, Expr::Infinity);
        assert_eq!(resolve_limit(Some(&LimitInput::from(""))), Err(LimitError::EmptyLimit));
        assert_eq!(resolve_limit(None), Err(LimitError::EmptyLimit));
    }

    #[test]
    fn test_sampling_properties() {
        let grid = engine().sample_text("x**2", &PlotRequest::line(-5.0, 5.0, 100)).unwrap();
        assert_eq!(grid.shape(), (1, 100));
        let grid = engine()
            .sample_text("x*y", &PlotRequest::surface((0.0, 1.0), 5, (0.0, 1.0), 50))
            .unwrap();
        // x points clamp up to 10
        assert_eq!(grid.shape(), (50, 10));
        match engine().sample_text("x + y + z", &PlotRequest::default()) {
            Err(SampleError::TooManyVariables { count, .. }) => assert_eq!(count, 3),
            other => panic!("expected TooManyVariables, got {:?}", other),
        }
    }

    #[test]
    fn test_plot_json_shape() {
        let grid = engine().sample_text("1/x", &PlotRequest::line(-1.0, 1.0, 11)).unwrap();
        let value = serde_json::to_value(&grid).unwrap();
        assert_eq!(value["plot_type"], "2d");
        assert_eq!(value["variable"], "x");
        assert_eq!(value["y_values"][5], serde_json::Value::Null);
        assert!(matches!(grid, PlotGrid::Line { .. }));
    }

    #[test]
    fn test_result_json_shape() {
        let result = engine().evaluate_text("x^2", "diff", "x", None).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["type"], "expression");
        assert_eq!(value["result"], "2*x");
        assert_eq!(value["steps"][0]["title"], "Differentiation with respect to x");
        assert!(value.get("numeric").is_none());
    }

    #[test]
    fn test_simplify_is_idempotent_through_the_engine() {
        for text in ["x + x + 2", "x^2 + 2*x + 1 - x^2", "x/2 + x/3", "2*pi + pi"] {
            let once = engine().evaluate_text(text, "simplify", "x", None).unwrap();
            let twice = engine().evaluate_text(&once.result, "simplify", "x", None).unwrap();
            assert_eq!(once.result, twice.result);
        }
    }

    #[test]
    fn test_every_operation_is_dispatched() {
        use strum::IntoEnumIterator;
        for operation in Operation::iter() {
            let bounds = match operation {
                Operation::DefiniteInt => Some(Bounds::interval(0.0, 1.0)),
                _ => None,
            };
            let text = match operation {
                Operation::Solve => "x^2 - 1",
                _ => "x*y*z + x",
            };
            let request = OperationRequest::new(text, operation, "x", bounds).unwrap();
            let result = engine().evaluate(&request);
            assert!(result.is_ok(), "{} failed: {:?}", operation, result);
        }
    }
}
