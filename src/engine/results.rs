//! Result objects returned to callers. All of them serialize to the JSON shapes an HTTP
//! layer hands to a browser front end.
use crate::symbolic::symbolic_engine::{Expr, format_number};
use serde::{Deserialize, Serialize};

/// One titled entry of an operation's explanation trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub title: String,
    pub text: String,
    pub latex: String,
}

impl Step {
    pub fn new(title: impl Into<String>, text: impl Into<String>, latex: impl Into<String>) -> Self {
        Step {
            title: title.into(),
            text: text.into(),
            latex: latex.into(),
        }
    }

    /// Step showing `expr` in both renderings.
    pub fn of_expr(title: impl Into<String>, expr: &Expr) -> Self {
        Step::new(title, expr.to_string(), expr.to_latex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    #[default]
    Expression,
    Solutions,
    /// `solve` on an expression without the variable: the value of the expression
    Constant,
}

/// A value rendered as plain text and as LaTeX.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub text: String,
    pub latex: String,
}

impl From<&Expr> for Rendered {
    fn from(expr: &Expr) -> Self {
        Rendered {
            text: expr.to_string(),
            latex: expr.to_latex(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub ok: bool,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub solutions: Vec<Rendered>,
    pub steps: Vec<Step>,
}

impl OperationResult {
    pub fn expression(result: String, latex: String, steps: Vec<Step>) -> Self {
        OperationResult {
            ok: true,
            kind: ResultKind::Expression,
            result,
            latex: Some(latex),
            numeric: None,
            solutions: Vec::new(),
            steps,
        }
    }

    pub fn with_numeric(mut self, numeric: Option<f64>) -> Self {
        self.numeric = numeric.filter(|v| v.is_finite());
        self
    }

    pub fn solutions(solutions: Vec<Rendered>, steps: Vec<Step>) -> Self {
        let result = solutions
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<&str>>()
            .join(", ");
        let latex = solutions
            .iter()
            .map(|s| s.latex.as_str())
            .collect::<Vec<&str>>()
            .join(", ");
        OperationResult {
            ok: true,
            kind: ResultKind::Solutions,
            result,
            latex: Some(latex),
            numeric: None,
            solutions,
            steps,
        }
    }

    /// Value of an expression without the solve variable. Other symbols stay symbolic.
    pub fn constant(value: &Expr) -> Self {
        let numeric = value.to_f64();
        let shown = match numeric {
            Some(v) => format_number(v),
            None => value.to_string(),
        };
        OperationResult {
            ok: true,
            kind: ResultKind::Constant,
            result: format!("The value of the expression is: {}", shown),
            latex: Some(value.to_latex()),
            numeric: numeric.filter(|v| v.is_finite()),
            solutions: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// titles of the steps, in order
    pub fn step_titles(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.title.as_str()).collect()
    }
}

/// Sampled data ready for a 2D line plot or a 3D surface plot. `None` marks a point where
/// the expression is undefined, non-finite or larger than the magnitude guard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "plot_type")]
pub enum PlotGrid {
    #[serde(rename = "2d")]
    Line {
        variable: String,
        x_values: Vec<f64>,
        y_values: Vec<Option<f64>>,
    },
    /// `z_values[i][j]` is the value at `(x_values[j], y_values[i])`
    #[serde(rename = "3d")]
    Surface {
        variables: Vec<String>,
        x_values: Vec<f64>,
        y_values: Vec<f64>,
        z_values: Vec<Vec<Option<f64>>>,
    },
}

impl PlotGrid {
    /// (rows, columns) of the value grid; a line is a single row
    pub fn shape(&self) -> (usize, usize) {
        match self {
            PlotGrid::Line { y_values, .. } => (1, y_values.len()),
            PlotGrid::Surface { z_values, x_values, .. } => (z_values.len(), x_values.len()),
        }
    }

    /// number of points marked missing
    pub fn missing_count(&self) -> usize {
        match self {
            PlotGrid::Line { y_values, .. } => y_values.iter().filter(|v| v.is_none()).count(),
            PlotGrid::Surface { z_values, .. } => z_values
                .iter()
                .map(|row| row.iter().filter(|v| v.is_none()).count())
                .sum(),
        }
    }
}

fn default_range() -> (f64, f64) {
    (-10.0, 10.0)
}

fn default_points() -> usize {
    500
}

/// Sampling request. Missing fields take the defaults of the plotting endpoint:
/// `[-10, 10]` with 500 points; a missing y axis reuses the x axis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRequest {
    #[serde(default = "default_range")]
    pub x_range: (f64, f64),
    #[serde(default = "default_points")]
    pub x_points: usize,
    #[serde(default)]
    pub y_range: Option<(f64, f64)>,
    #[serde(default)]
    pub y_points: Option<usize>,
}

impl Default for PlotRequest {
    fn default() -> Self {
        PlotRequest {
            x_range: default_range(),
            x_points: default_points(),
            y_range: None,
            y_points: None,
        }
    }
}

impl PlotRequest {
    pub fn line(min: f64, max: f64, points: usize) -> Self {
        PlotRequest {
            x_range: (min, max),
            x_points: points,
            ..PlotRequest::default()
        }
    }

    pub fn surface(x_range: (f64, f64), x_points: usize, y_range: (f64, f64), y_points: usize) -> Self {
        PlotRequest {
            x_range,
            x_points,
            y_range: Some(y_range),
            y_points: Some(y_points),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plot_grid_json() {
        let grid = PlotGrid::Line {
            variable: "x".to_string(),
            x_values: vec![0.0, 1.0],
            y_values: vec![None, Some(2.0)],
        };
        assert_eq!(
            serde_json::to_value(&grid).unwrap(),
            json!({"plot_type": "2d", "variable": "x", "x_values": [0.0, 1.0], "y_values": [null, 2.0]})
        );
        assert_eq!(grid.shape(), (1, 2));
        assert_eq!(grid.missing_count(), 1);
    }

    #[test]
    fn test_result_json() {
        let result = OperationResult::constant(&Expr::Const(4.0));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["type"], "constant");
        assert_eq!(value["result"], "The value of the expression is: 4");
        assert_eq!(value["steps"], json!([]));
        assert!(value.get("solutions").is_none());
    }

    #[test]
    fn test_solutions_result() {
        let roots = [Expr::Const(-2.0), Expr::Const(2.0)];
        let rendered: Vec<Rendered> = roots.iter().map(Rendered::from).collect();
        let result = OperationResult::solutions(rendered, vec![]);
        assert_eq!(result.result, "-2, 2");
        assert_eq!(result.kind, ResultKind::Solutions);
    }

    #[test]
    fn test_plot_request_defaults() {
        let request: PlotRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, PlotRequest::default());
        let request: PlotRequest =
            serde_json::from_str(r#"{"x_range": [0, 5], "x_points": 100}"#).unwrap();
        assert_eq!(request, PlotRequest::line(0.0, 5.0, 100));
    }
}
