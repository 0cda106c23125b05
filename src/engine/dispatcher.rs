//! Applies one [`Operation`] to an expression and records the steps taken.
//!
//! Every backend failure comes back as an [`OperationError`]; nothing here panics on user input.
use crate::engine::config::EngineConfig;
use crate::engine::errors::OperationError;
use crate::engine::limits::resolve_limit;
use crate::engine::operations::{Bounds, Operation, OperationRequest};
use crate::engine::results::{OperationResult, Rendered, Step};
use crate::symbolic::parse_expr::{DEFAULT_CONSTANTS, parse_with};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_solve::SolveError;
use log::{debug, info, warn};
use std::collections::HashMap;

fn parse_text(text: &str, config: &EngineConfig) -> Result<Expr, OperationError> {
    Ok(parse_with(text, DEFAULT_CONSTANTS, &config.parser)?)
}

fn require_variable(expr: &Expr, text: &str, var: &str) -> Result<(), OperationError> {
    if expr.has_variable(var) {
        Ok(())
    } else {
        Err(OperationError::MissingVariable {
            variable: var.to_string(),
            expr: text.trim().to_string(),
        })
    }
}

/// `F + C` in both renderings
fn with_constant(antiderivative: &Expr) -> (String, String) {
    (
        format!("{} + C", antiderivative),
        format!("{} + C", antiderivative.to_latex()),
    )
}

fn simplify(expr: &Expr) -> OperationResult {
    let simplified = expr.simplify();
    let steps = vec![Step::of_expr("Simplified Expression", &simplified)];
    OperationResult::expression(simplified.to_string(), simplified.to_latex(), steps)
}

fn differentiate(expr: &Expr, var: &str, title: &str) -> OperationResult {
    let derivative = expr.diff(var).simplify();
    let steps = vec![Step::of_expr(format!("{} with respect to {}", title, var), &derivative)];
    OperationResult::expression(derivative.to_string(), derivative.to_latex(), steps)
}

fn indefinite(expr: &Expr, var: &str) -> Result<OperationResult, OperationError> {
    let antiderivative = expr.integrate(var).map_err(OperationError::Evaluation)?;
    let (text, latex) = with_constant(&antiderivative);
    let steps = vec![Step::new(
        format!("Indefinite Integration with respect to {}", var),
        text.clone(),
        latex.clone(),
    )];
    Ok(OperationResult::expression(text, latex, steps))
}

fn apply_limits_step(antiderivative: &Expr, lower: &Expr, upper: &Expr) -> Step {
    Step::new(
        "Apply limits",
        format!("[{}] from {} to {}", antiderivative, lower, upper),
        format!(
            "\\left. {} \\right|_{{{}}}^{{{}}}",
            antiderivative.to_latex(),
            lower.to_latex(),
            upper.to_latex()
        ),
    )
}

/// Numeric value of the integral when the symbolic route failed. Only finite bounds with no
/// singularity between them qualify, otherwise `cause` is returned.
fn quadrature_fallback(
    expr: &Expr,
    var: &str,
    (lower, upper): (&Expr, &Expr),
    cause: String,
    config: &EngineConfig,
) -> Result<Expr, OperationError> {
    let (Some(a), Some(b)) = (lower.to_f64(), upper.to_f64()) else {
        return Err(OperationError::Evaluation(cause));
    };
    if !a.is_finite() || !b.is_finite() {
        return Err(OperationError::Evaluation(cause));
    }
    if let Some(point) = expr.singular_point(var, a, b) {
        debug!("{} is singular near {} = {}", expr, var, point);
        return Err(OperationError::Evaluation(cause));
    }
    warn!("{}; falling back to Gauss-Legendre quadrature", cause);
    let value = expr
        .quad(var, a, b, config.quadrature_degree, &HashMap::new())
        .map_err(OperationError::Evaluation)?;
    Ok(Expr::Const(value))
}

fn definite(
    expr: &Expr,
    var: &str,
    bounds: Option<&Bounds>,
    config: &EngineConfig,
) -> Result<OperationResult, OperationError> {
    let axis = bounds
        .and_then(|b| b.for_axis(var))
        .ok_or_else(|| OperationError::MissingLimits(Operation::DefiniteInt.to_string()))?;
    let lower = resolve_limit(axis.lower.as_ref())?;
    let upper = resolve_limit(axis.upper.as_ref())?;
    let mut steps = vec![Step::of_expr("Integrand", expr)];
    let symbolic = expr
        .integrate(var)
        .and_then(|antiderivative| Ok((expr.definite_integrate(var, &lower, &upper)?, antiderivative)));
    let value = match symbolic {
        Ok((value, antiderivative)) => {
            steps.push(apply_limits_step(&antiderivative, &lower, &upper));
            value
        }
        Err(cause) => {
            let value = quadrature_fallback(expr, var, (&lower, &upper), cause, config)?;
            steps.push(Step::new(
                "Apply limits",
                format!("numerical quadrature of {} over [{}, {}]", expr, lower, upper),
                format!("\\int_{{{}}}^{{{}}} {} \\, d{}", lower.to_latex(), upper.to_latex(), expr.to_latex(), var),
            ));
            value
        }
    };
    steps.push(Step::of_expr("Evaluated value", &value));
    Ok(OperationResult::expression(value.to_string(), value.to_latex(), steps).with_numeric(value.to_f64()))
}

fn multiple(
    expr: &Expr,
    operation: Operation,
    bounds: Option<&Bounds>,
    config: &EngineConfig,
) -> Result<OperationResult, OperationError> {
    let axes = operation.canonical_axes();
    let Some(bounds) = bounds else {
        // nested antiderivative, innermost axis first
        let mut current = expr.clone();
        let mut steps = Vec::with_capacity(axes.len());
        for axis in axes {
            current = current.integrate(axis).map_err(OperationError::Evaluation)?;
            steps.push(Step::of_expr(
                format!("Indefinite Integration with respect to {}", axis),
                &current,
            ));
        }
        let (text, latex) = with_constant(&current);
        return Ok(OperationResult::expression(text, latex, steps));
    };
    let mut resolved: Vec<(String, Expr, Expr)> = Vec::with_capacity(axes.len());
    for axis in axes {
        let axis_bounds = bounds
            .for_axis(axis)
            .ok_or_else(|| OperationError::MissingLimits(operation.to_string()))?;
        let lower = resolve_limit(axis_bounds.lower.as_ref())?;
        let upper = resolve_limit(axis_bounds.upper.as_ref())?;
        resolved.push((axis.to_string(), lower, upper));
    }
    let mut current = expr.clone();
    let mut steps = Vec::with_capacity(axes.len());
    for (axis, lower, upper) in &resolved {
        match current.definite_integrate(axis, lower, upper) {
            Ok(next) => {
                current = next;
                steps.push(Step::of_expr(
                    format!("Integrate with respect to {} from {} to {}", axis, lower, upper),
                    &current,
                ));
            }
            Err(cause) => {
                warn!("{}; falling back to nested Gauss-Legendre quadrature", cause);
                return multiple_numeric(expr, &resolved, config);
            }
        }
    }
    Ok(OperationResult::expression(current.to_string(), current.to_latex(), steps)
        .with_numeric(current.to_f64()))
}

fn multiple_numeric(
    expr: &Expr,
    resolved: &[(String, Expr, Expr)],
    config: &EngineConfig,
) -> Result<OperationResult, OperationError> {
    // quad_nested expects the outermost axis last
    let value = expr
        .quad_nested(resolved, config.quadrature_degree)
        .map_err(OperationError::Evaluation)?;
    let value = Expr::Const(value);
    let mut steps: Vec<Step> = resolved
        .iter()
        .map(|(axis, lower, upper)| {
            Step::new(
                format!("Integrate numerically with respect to {} from {} to {}", axis, lower, upper),
                "Gauss-Legendre quadrature",
                format!("\\int_{{{}}}^{{{}}} \\, d{}", lower.to_latex(), upper.to_latex(), axis),
            )
        })
        .collect();
    if let Some(last) = steps.last_mut() {
        last.text = value.to_string();
        last.latex = value.to_latex();
    }
    Ok(OperationResult::expression(value.to_string(), value.to_latex(), steps).with_numeric(value.to_f64()))
}

/// `lhs = rhs` is split on the first `=` and both sides are parsed on their own.
fn equation(text: &str, config: &EngineConfig) -> Result<Expr, OperationError> {
    match text.split_once('=') {
        Some((lhs, rhs)) => {
            let lhs = parse_text(lhs, config)?;
            let rhs = parse_text(rhs, config)?;
            Ok(lhs - rhs)
        }
        None => parse_text(text, config),
    }
}

fn solve(text: &str, var: &str, config: &EngineConfig) -> Result<OperationResult, OperationError> {
    let expr = equation(text, config)?;
    if !expr.has_variable(var) {
        let value = expr.simplify();
        debug!("{} does not contain {}, evaluating it", expr, var);
        return Ok(OperationResult::constant(&value));
    }
    let roots = match expr.solve(var, &config.solver) {
        Ok(roots) => roots,
        Err(SolveError::Identity) => {
            let step = Step::new(
                "Solutions",
                format!("every value of {} satisfies the equation", var),
                format!("{} \\in \\mathbb{{R}}", var),
            );
            return Ok(OperationResult::solutions(Vec::new(), vec![step]));
        }
        Err(e) => return Err(OperationError::Evaluation(e.to_string())),
    };
    let rendered: Vec<Rendered> = roots.iter().map(Rendered::from).collect();
    let step = Step::new(
        "Solutions",
        rendered.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(", "),
        rendered.iter().map(|r| r.latex.as_str()).collect::<Vec<_>>().join(", "),
    );
    Ok(OperationResult::solutions(rendered, vec![step]))
}

/// Runs `request` to completion on the calling thread.
pub fn dispatch(request: &OperationRequest, config: &EngineConfig) -> Result<OperationResult, OperationError> {
    let var = request.variable.as_str();
    let text = request.text.as_str();
    info!("{} of '{}' with respect to {}", request.operation, text, var);
    let result = match request.operation {
        Operation::Simplify => simplify(&parse_text(text, config)?),
        Operation::Differentiate => {
            let expr = parse_text(text, config)?;
            require_variable(&expr, text, var)?;
            differentiate(&expr, var, "Differentiation")
        }
        Operation::PartialDiff => {
            let expr = parse_text(text, config)?;
            require_variable(&expr, text, var)?;
            differentiate(&expr, var, "Partial differentiation")
        }
        Operation::Integrate => {
            let expr = parse_text(text, config)?;
            require_variable(&expr, text, var)?;
            indefinite(&expr, var)?
        }
        Operation::IndefiniteInt => indefinite(&parse_text(text, config)?, var)?,
        Operation::DefiniteInt => definite(&parse_text(text, config)?, var, request.bounds.as_ref(), config)?,
        Operation::DoubleInt | Operation::TripleInt => multiple(
            &parse_text(text, config)?,
            request.operation,
            request.bounds.as_ref(),
            config,
        )?,
        Operation::Solve => solve(text, var, config)?,
    };
    debug!("{} -> {}", request.operation, result.result);
    Ok(result)
}
