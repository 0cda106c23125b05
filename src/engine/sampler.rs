//! Numeric sampling of expressions over 1D and 2D grids for plotting.
use crate::engine::errors::SampleError;
use crate::engine::results::{PlotGrid, PlotRequest};
use crate::symbolic::parse_expr::{ParseLimits, DEFAULT_CONSTANTS, parse_with};
use crate::symbolic::symbolic_engine::Expr;
use log::{debug, info};
use ndarray::Array1;

/// Limits applied by the sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// symbols that may become plot axes
    pub allowed_axes: Vec<String>,
    pub points_1d: (usize, usize),
    /// per axis
    pub points_2d: (usize, usize),
    /// values with a larger magnitude are reported as missing
    pub magnitude_guard: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            allowed_axes: ["x", "y", "z", "t"].iter().map(|s| s.to_string()).collect(),
            points_1d: (10, 2000),
            points_2d: (10, 200),
            magnitude_guard: 1e10,
        }
    }
}

fn sanitize(value: f64, guard: f64) -> Option<f64> {
    if value.is_finite() && value.abs() <= guard {
        Some(value)
    } else {
        None
    }
}

/// Checks the range is finite and puts it in increasing order.
fn ordered_range(range: (f64, f64)) -> Result<(f64, f64), SampleError> {
    let (min, max) = range;
    if !min.is_finite() || !max.is_finite() {
        return Err(SampleError::InvalidRange { min, max });
    }
    Ok(if min > max { (max, min) } else { (min, max) })
}

/// Axis variables of `expr`: free symbols from the allow-list, sorted. A constant expression
/// gets the single axis `x`.
pub fn axis_variables(expr: &Expr, config: &SamplerConfig) -> Result<Vec<String>, SampleError> {
    let axes: Vec<String> = expr
        .free_symbols()
        .into_iter()
        .filter(|name| config.allowed_axes.contains(name))
        .collect();
    match axes.len() {
        0 => Ok(vec!["x".to_string()]),
        1 | 2 => Ok(axes),
        count => Err(SampleError::TooManyVariables { count, names: axes }),
    }
}

/// Samples `expr` over the ranges of `request`: a line for one axis variable, a surface for two.
pub fn sample(expr: &Expr, request: &PlotRequest, config: &SamplerConfig) -> Result<PlotGrid, SampleError> {
    let axes = axis_variables(expr, config)?;
    let guard = config.magnitude_guard;
    match axes.as_slice() {
        [variable] => {
            let (min, max) = ordered_range(request.x_range)?;
            let (lo, hi) = config.points_1d;
            let n = request.x_points.clamp(lo, hi);
            let xs = Array1::linspace(min, max, n);
            let values = expr.eval_on_array(variable, &xs)?;
            let grid = PlotGrid::Line {
                variable: variable.clone(),
                x_values: xs.to_vec(),
                y_values: values.iter().map(|&v| sanitize(v, guard)).collect(),
            };
            debug!("sampled {} on {} points over [{}, {}]", expr, n, min, max);
            Ok(grid)
        }
        [first, second] => {
            let (lo, hi) = config.points_2d;
            let (x_min, x_max) = ordered_range(request.x_range)?;
            let (y_min, y_max) = ordered_range(request.y_range.unwrap_or(request.x_range))?;
            let nx = request.x_points.clamp(lo, hi);
            let ny = request.y_points.unwrap_or(request.x_points).clamp(lo, hi);
            let xs = Array1::linspace(x_min, x_max, nx);
            let ys = Array1::linspace(y_min, y_max, ny);
            let mesh = expr.eval_on_mesh((first.as_str(), second.as_str()), &xs, &ys)?;
            let z_values: Vec<Vec<Option<f64>>> = mesh
                .rows()
                .into_iter()
                .map(|row| row.iter().map(|&v| sanitize(v, guard)).collect())
                .collect();
            debug!("sampled {} on a {}x{} mesh", expr, ny, nx);
            Ok(PlotGrid::Surface {
                variables: axes.clone(),
                x_values: xs.to_vec(),
                y_values: ys.to_vec(),
                z_values,
            })
        }
        _ => Err(SampleError::TooManyVariables {
            count: axes.len(),
            names: axes.clone(),
        }),
    }
}

/// Parses `text` and samples it.
pub fn sample_text(
    text: &str,
    request: &PlotRequest,
    config: &SamplerConfig,
    limits: &ParseLimits,
) -> Result<PlotGrid, SampleError> {
    let expr = parse_with(text, DEFAULT_CONSTANTS, limits)?;
    let grid = sample(&expr, request, config)?;
    let (rows, cols) = grid.shape();
    info!(
        "plot data for '{}': {}x{} values, {} missing",
        text,
        rows,
        cols,
        grid.missing_count()
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse;
    use approx::assert_relative_eq;

    fn grid(text: &str, request: &PlotRequest) -> Result<PlotGrid, SampleError> {
        sample_text(text, request, &SamplerConfig::default(), &ParseLimits::default())
    }

    #[test]
    fn test_line_alignment() {
        let result = grid("x**2", &PlotRequest::line(-5.0, 5.0, 100)).unwrap();
        match result {
            PlotGrid::Line { variable, x_values, y_values } => {
                assert_eq!(variable, "x");
                assert_eq!(x_values.len(), 100);
                assert_eq!(y_values.len(), 100);
                assert_relative_eq!(x_values[0], -5.0);
                assert_relative_eq!(x_values[99], 5.0);
                assert_relative_eq!(y_values[0].unwrap(), 25.0);
            }
            other => panic!("expected a line, got {:?}", other),
        }
    }

    #[test]
    fn test_point_count_is_clamped() {
        assert_eq!(grid("x", &PlotRequest::line(0.0, 1.0, 3)).unwrap().shape(), (1, 10));
        assert_eq!(grid("x", &PlotRequest::line(0.0, 1.0, 100_000)).unwrap().shape(), (1, 2000));
    }

    #[test]
    fn test_non_finite_values_are_missing() {
        // 1/x at 0, log of negatives and the magnitude guard
        let result = grid("1/x", &PlotRequest::line(-1.0, 1.0, 11)).unwrap();
        if let PlotGrid::Line { y_values, .. } = &result {
            assert_eq!(y_values.len(), 11);
            assert_eq!(y_values[5], None);
            assert_eq!(y_values[0], Some(-1.0));
        }
        assert_eq!(grid("log(x)", &PlotRequest::line(-2.0, -1.0, 10)).unwrap().missing_count(), 10);
        // exp(24) > 1e10 > exp(23)
        assert_eq!(grid("exp(x)", &PlotRequest::line(20.0, 29.0, 10)).unwrap().missing_count(), 6);
    }

    #[test]
    fn test_reversed_range_is_swapped() {
        let result = grid("x", &PlotRequest::line(5.0, -5.0, 10)).unwrap();
        if let PlotGrid::Line { x_values, .. } = result {
            assert_relative_eq!(x_values[0], -5.0);
            assert_relative_eq!(x_values[9], 5.0);
        }
        assert!(matches!(
            grid("x", &PlotRequest::line(f64::NAN, 1.0, 10)),
            Err(SampleError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_constant_expression_plots_flat() {
        let result = grid("3", &PlotRequest::line(0.0, 1.0, 10)).unwrap();
        match result {
            PlotGrid::Line { variable, y_values, .. } => {
                assert_eq!(variable, "x");
                assert!(y_values.iter().all(|v| *v == Some(3.0)));
            }
            other => panic!("expected a line, got {:?}", other),
        }
    }

    #[test]
    fn test_surface_dimensions() {
        let request = PlotRequest::surface((-1.0, 1.0), 15, (0.0, 2.0), 1000);
        let result = grid("x*y", &request).unwrap();
        assert_eq!(result.shape(), (200, 15));
        if let PlotGrid::Surface { variables, x_values, y_values, z_values } = result {
            assert_eq!(variables, vec!["x", "y"]);
            // z[i][j] = f(x_j, y_i)
            let value = z_values[199][0].unwrap();
            assert_relative_eq!(value, x_values[0] * y_values[199]);
        }
    }

    #[test]
    fn test_surface_defaults_to_x_axis_settings() {
        let result = grid("sin(x)*cos(t)", &PlotRequest::line(0.0, 1.0, 20)).unwrap();
        assert_eq!(result.shape(), (20, 20));
        if let PlotGrid::Surface { variables, .. } = result {
            assert_eq!(variables, vec!["t", "x"]);
        }
    }

    #[test]
    fn test_too_many_variables() {
        match grid("x*y*z", &PlotRequest::default()) {
            Err(SampleError::TooManyVariables { count, names }) => {
                assert_eq!(count, 3);
                assert_eq!(names, vec!["x", "y", "z"]);
            }
            other => panic!("expected TooManyVariables, got {:?}", other),
        }
    }

    #[test]
    fn test_unbound_symbol_is_an_evaluation_error() {
        let expr = parse("a*x").unwrap();
        assert!(matches!(
            sample(&expr, &PlotRequest::default(), &SamplerConfig::default()),
            Err(SampleError::Evaluation(_))
        ));
        assert!(matches!(grid("x +", &PlotRequest::default()), Err(SampleError::Parse(_))));
    }
}
