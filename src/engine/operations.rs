//! Operation kinds and validated operation requests.
use crate::engine::errors::OperationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter, EnumString};

/// Closed set of operations the dispatcher knows. Names are snake_case; `diff` is accepted
/// for `differentiate`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    #[default]
    Simplify,
    #[strum(to_string = "differentiate", serialize = "diff")]
    #[serde(alias = "diff")]
    Differentiate,
    Integrate,
    Solve,
    PartialDiff,
    IndefiniteInt,
    DefiniteInt,
    DoubleInt,
    TripleInt,
}

impl Operation {
    /// integration variables of the multiple integrals, innermost first
    pub fn canonical_axes(&self) -> &'static [&'static str] {
        match self {
            Operation::DoubleInt => &["x", "y"],
            Operation::TripleInt => &["x", "y", "z"],
            _ => &[],
        }
    }
}

/// A bound as it arrives from a caller: a JSON number or a string such as `"pi"` or `"-oo"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LimitInput {
    Number(f64),
    Text(String),
}

impl From<f64> for LimitInput {
    fn from(value: f64) -> Self {
        LimitInput::Number(value)
    }
}

impl From<&str> for LimitInput {
    fn from(text: &str) -> Self {
        LimitInput::Text(text.to_string())
    }
}

/// Lower and upper bound of one integration variable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisBounds {
    pub lower: Option<LimitInput>,
    pub upper: Option<LimitInput>,
}

impl AxisBounds {
    pub fn new(lower: impl Into<LimitInput>, upper: impl Into<LimitInput>) -> Self {
        AxisBounds {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
        }
    }

    fn is_complete(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }
}

/// Integration bounds: `{lower, upper}` for a single integral or per-axis bounds
/// `{x_lower, x_upper, y_lower, y_upper[, z_lower, z_upper]}` for multiple integrals.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Option<LimitInput>>")]
pub enum Bounds {
    Interval(AxisBounds),
    Axes(BTreeMap<String, AxisBounds>),
}

impl Bounds {
    pub fn interval(lower: impl Into<LimitInput>, upper: impl Into<LimitInput>) -> Self {
        Bounds::Interval(AxisBounds::new(lower, upper))
    }

    /// Builds bounds from the flat request shape; keys other than `lower`, `upper` and
    /// `<axis>_lower` / `<axis>_upper` are rejected.
    pub fn from_flat(fields: BTreeMap<String, Option<LimitInput>>) -> Result<Self, String> {
        if fields.keys().all(|k| k == "lower" || k == "upper") {
            let mut fields = fields;
            return Ok(Bounds::Interval(AxisBounds {
                lower: fields.remove("lower").flatten(),
                upper: fields.remove("upper").flatten(),
            }));
        }
        let mut axes: BTreeMap<String, AxisBounds> = BTreeMap::new();
        for (key, value) in fields {
            let (axis, side) = key
                .rsplit_once('_')
                .filter(|(axis, _)| !axis.is_empty())
                .ok_or_else(|| format!("unknown bound field '{}'", key))?;
            let entry = axes.entry(axis.to_string()).or_default();
            match side {
                "lower" => entry.lower = value,
                "upper" => entry.upper = value,
                _ => return Err(format!("unknown bound field '{}'", key)),
            }
        }
        Ok(Bounds::Axes(axes))
    }

    /// Bounds of `axis`; an interval applies to whichever variable is integrated.
    pub fn for_axis(&self, axis: &str) -> Option<&AxisBounds> {
        match self {
            Bounds::Interval(bounds) => Some(bounds),
            Bounds::Axes(axes) => axes.get(axis),
        }
    }
}

impl TryFrom<BTreeMap<String, Option<LimitInput>>> for Bounds {
    type Error = String;

    fn try_from(fields: BTreeMap<String, Option<LimitInput>>) -> Result<Self, Self::Error> {
        Bounds::from_flat(fields)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// A request checked once at construction: the expression text is kept raw (solve needs to
/// see a textual `=`), the variable is a valid identifier and required bounds are present.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub text: String,
    pub operation: Operation,
    pub variable: String,
    pub bounds: Option<Bounds>,
}

impl OperationRequest {
    pub fn new(
        text: &str,
        operation: Operation,
        variable: &str,
        bounds: Option<Bounds>,
    ) -> Result<Self, OperationError> {
        // same alias the parser applies to identifiers
        let variable = variable.trim().replace('X', "x");
        if !is_identifier(&variable) {
            return Err(OperationError::InvalidVariable(variable));
        }
        match operation {
            Operation::DefiniteInt => {
                let complete = bounds
                    .as_ref()
                    .and_then(|b| b.for_axis(&variable))
                    .is_some_and(AxisBounds::is_complete);
                if !complete {
                    return Err(OperationError::MissingLimits(operation.to_string()));
                }
            }
            Operation::DoubleInt | Operation::TripleInt => {
                if let Some(bounds) = &bounds {
                    let complete = match bounds {
                        Bounds::Interval(_) => false,
                        Bounds::Axes(axes) => operation
                            .canonical_axes()
                            .iter()
                            .all(|axis| axes.get(*axis).is_some_and(AxisBounds::is_complete)),
                    };
                    if !complete {
                        return Err(OperationError::MissingLimits(operation.to_string()));
                    }
                }
            }
            _ => {}
        }
        Ok(OperationRequest {
            text: text.to_string(),
            operation,
            variable,
            bounds,
        })
    }

    /// Request with the default variable `x` and no bounds.
    pub fn simple(text: &str, operation: Operation) -> Result<Self, OperationError> {
        Self::new(text, operation, "x", None)
    }
}
