//! Error types of the engine layer.
use crate::symbolic::parse_expr::ParseError;
use crate::symbolic::symbolic_lambdify::EvalError;
use std::fmt;
use std::time::Duration;

/// Failure to resolve an integration bound.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitError {
    /// missing, `null` or blank bound
    EmptyLimit,
    InvalidLimit { text: String, cause: String },
}

impl fmt::Display for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LimitError::EmptyLimit => write!(f, "Integration limit is empty"),
            LimitError::InvalidLimit { text, cause } => {
                write!(f, "Invalid integration limit '{}': {}", text, cause)
            }
        }
    }
}

impl std::error::Error for LimitError {}

/// Error types of [`crate::engine::dispatcher`]
#[derive(Debug, Clone, PartialEq)]
pub enum OperationError {
    Parse(ParseError),
    /// the target variable does not occur in the expression
    MissingVariable { variable: String, expr: String },
    /// an operation that needs bounds was called without them
    MissingLimits(String),
    Limit(LimitError),
    InvalidVariable(String),
    UnsupportedOperation(String),
    /// the algebra or numeric backend could not complete the operation
    Evaluation(String),
    Timeout(Duration),
}

impl OperationError {
    /// HTTP-style status for an embedding service: 400 for bad input, 408 for an exhausted
    /// time budget and 422 when the backend could not process a well-formed request.
    pub fn status_hint(&self) -> u16 {
        match self {
            OperationError::Parse(_)
            | OperationError::MissingVariable { .. }
            | OperationError::MissingLimits(_)
            | OperationError::Limit(_)
            | OperationError::InvalidVariable(_)
            | OperationError::UnsupportedOperation(_) => 400,
            OperationError::Timeout(_) => 408,
            OperationError::Evaluation(_) => 422,
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OperationError::Parse(e) => write!(f, "{}", e),
            OperationError::MissingVariable { variable, expr } => write!(
                f,
                "Expression '{}' does not contain variable {}",
                expr, variable
            ),
            OperationError::MissingLimits(op) => {
                write!(f, "Operation {} requires both lower and upper limits", op)
            }
            OperationError::Limit(e) => write!(f, "{}", e),
            OperationError::InvalidVariable(name) => write!(f, "'{}' is not a valid variable name", name),
            OperationError::UnsupportedOperation(op) => write!(f, "Unsupported operation '{}'", op),
            OperationError::Evaluation(cause) => write!(f, "Error processing expression: {}", cause),
            OperationError::Timeout(budget) => {
                write!(f, "Operation did not finish within {} ms", budget.as_millis())
            }
        }
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OperationError::Parse(e) => Some(e),
            OperationError::Limit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for OperationError {
    fn from(e: ParseError) -> Self {
        OperationError::Parse(e)
    }
}

impl From<LimitError> for OperationError {
    fn from(e: LimitError) -> Self {
        OperationError::Limit(e)
    }
}

impl From<EvalError> for OperationError {
    fn from(e: EvalError) -> Self {
        OperationError::Evaluation(e.to_string())
    }
}

/// Error types of [`crate::engine::sampler`]
#[derive(Debug, Clone, PartialEq)]
pub enum SampleError {
    Parse(ParseError),
    TooManyVariables { count: usize, names: Vec<String> },
    /// compiling or evaluating the expression failed as a whole
    Evaluation(String),
    InvalidRange { min: f64, max: f64 },
}

impl SampleError {
    pub fn status_hint(&self) -> u16 {
        match self {
            SampleError::Evaluation(_) => 422,
            _ => 400,
        }
    }
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SampleError::Parse(e) => write!(f, "{}", e),
            SampleError::TooManyVariables { count, names } => write!(
                f,
                "Plotting supports at most 2 variables, found {}: {}",
                count,
                names.join(", ")
            ),
            SampleError::Evaluation(cause) => write!(f, "Error preparing plot data: {}", cause),
            SampleError::InvalidRange { min, max } => {
                write!(f, "Invalid plot range [{}, {}]", min, max)
            }
        }
    }
}

impl std::error::Error for SampleError {}

impl From<ParseError> for SampleError {
    fn from(e: ParseError) -> Self {
        SampleError::Parse(e)
    }
}

impl From<EvalError> for SampleError {
    fn from(e: EvalError) -> Self {
        SampleError::Evaluation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse;

    #[test]
    fn test_status_hints() {
        let parse_error = parse("(x + 1").unwrap_err();
        assert_eq!(OperationError::from(parse_error.clone()).status_hint(), 400);
        assert_eq!(OperationError::Limit(LimitError::EmptyLimit).status_hint(), 400);
        assert_eq!(OperationError::Evaluation("x".into()).status_hint(), 422);
        assert_eq!(OperationError::Timeout(Duration::from_millis(5)).status_hint(), 408);
        assert_eq!(SampleError::from(parse_error).status_hint(), 400);
        assert_eq!(SampleError::Evaluation("x".into()).status_hint(), 422);
    }

    #[test]
    fn test_messages() {
        let e = SampleError::TooManyVariables {
            count: 3,
            names: vec!["x".into(), "y".into(), "z".into()],
        };
        assert_eq!(e.to_string(), "Plotting supports at most 2 variables, found 3: x, y, z");
        let e = OperationError::MissingVariable {
            variable: "x".into(),
            expr: "y + 1".into(),
        };
        assert_eq!(e.to_string(), "Expression 'y + 1' does not contain variable x");
    }
}
