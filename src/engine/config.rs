//! Engine settings and their loading from a settings document.
//!
//! ```text
//! parser
//!     max_length: 1000
//!     max_depth: 64
//! sampler
//!     axes: x, y, z, t
//!     points_1d: 10, 2000
//!     points_2d: 10, 200
//!     magnitude_guard: 1e10
//! solver
//!     window: -100, 100
//!     scan_points: 2000
//!     tolerance: 1e-12
//!     max_iterations: 200
//! integration
//!     quadrature_degree: 64
//! engine
//!     timeout_ms: 5000
//!     loglevel: info
//! ```
//! Every section and key is optional; a missing one keeps its default.
use crate::Utils::task_parser::{SectionMap, Value, parse_document};
use crate::engine::sampler::SamplerConfig;
use crate::symbolic::parse_expr::ParseLimits;
use crate::symbolic::symbolic_solve::SolverConfig;
use std::fmt;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Document(String),
    UnknownSection(String),
    UnknownKey { section: String, key: String },
    InvalidValue { section: String, key: String, expected: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Cannot read settings: {}", msg),
            ConfigError::Document(msg) => write!(f, "Malformed settings document: {}", msg),
            ConfigError::UnknownSection(section) => write!(f, "Unknown settings section '{}'", section),
            ConfigError::UnknownKey { section, key } => {
                write!(f, "Unknown key '{}' in section '{}'", key, section)
            }
            ConfigError::InvalidValue { section, key, expected } => {
                write!(f, "Value of {}.{} must be {}", section, key, expected)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub parser: ParseLimits,
    pub sampler: SamplerConfig,
    pub solver: SolverConfig,
    /// degree of the Gauss-Legendre rule used when no antiderivative is found
    pub quadrature_degree: usize,
    /// wall-clock budget of one operation; `None` waits indefinitely
    pub timeout: Option<Duration>,
    pub loglevel: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            parser: ParseLimits::default(),
            sampler: SamplerConfig::default(),
            solver: SolverConfig::default(),
            quadrature_degree: 64,
            timeout: None,
            loglevel: None,
        }
    }
}

/// Typed access to the values of one section.
struct Section<'a> {
    name: &'a str,
    map: &'a SectionMap,
}

impl<'a> Section<'a> {
    fn invalid(&self, key: &str, expected: &str) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            expected: expected.to_string(),
        }
    }

    fn check_keys(&self, known: &[&str]) -> Result<(), ConfigError> {
        match self.map.keys().find(|key| !known.contains(&key.as_str())) {
            Some(key) => Err(ConfigError::UnknownKey {
                section: self.name.to_string(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }

    fn values(&self, key: &str) -> Option<&'a [Value]> {
        self.map.get(key).map(|v| v.as_slice())
    }

    fn usize(&self, key: &str) -> Result<Option<usize>, ConfigError> {
        match self.values(key) {
            None => Ok(None),
            Some([value]) => value
                .as_integer()
                .and_then(|i| usize::try_from(i).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a non-negative integer")),
            Some(_) => Err(self.invalid(key, "a single non-negative integer")),
        }
    }

    fn float(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        match self.values(key) {
            None => Ok(None),
            Some([value]) => value
                .as_float()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a number")),
            Some(_) => Err(self.invalid(key, "a single number")),
        }
    }

    fn float_pair(&self, key: &str) -> Result<Option<(f64, f64)>, ConfigError> {
        match self.values(key) {
            None => Ok(None),
            Some([a, b]) => match (a.as_float(), b.as_float()) {
                (Some(a), Some(b)) => Ok(Some((a, b))),
                _ => Err(self.invalid(key, "two numbers")),
            },
            Some(_) => Err(self.invalid(key, "two numbers")),
        }
    }

    fn usize_pair(&self, key: &str) -> Result<Option<(usize, usize)>, ConfigError> {
        let expected = "two non-negative integers, smallest first";
        match self.values(key) {
            None => Ok(None),
            Some([a, b]) => {
                let to_usize = |v: &Value| v.as_integer().and_then(|i| usize::try_from(i).ok());
                match (to_usize(a), to_usize(b)) {
                    (Some(a), Some(b)) if a <= b => Ok(Some((a, b))),
                    _ => Err(self.invalid(key, expected)),
                }
            }
            Some(_) => Err(self.invalid(key, expected)),
        }
    }

    fn strings(&self, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
        match self.values(key) {
            None => Ok(None),
            Some(values) => values
                .iter()
                .map(|v| v.as_string().map(str::to_string))
                .collect::<Option<Vec<String>>>()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a list of names")),
        }
    }
}

impl EngineConfig {
    /// Reads settings from a sectioned `key: value` document. Unknown sections and keys are
    /// errors; anything not mentioned keeps its default.
    pub fn from_document(input: &str) -> Result<Self, ConfigError> {
        let document = parse_document(input).map_err(ConfigError::Document)?;
        let mut config = EngineConfig::default();
        for (name, map) in &document {
            let section = Section { name, map };
            match name.as_str() {
                "parser" => {
                    section.check_keys(&["max_length", "max_depth"])?;
                    if let Some(v) = section.usize("max_length")? {
                        config.parser.max_length = v;
                    }
                    if let Some(v) = section.usize("max_depth")? {
                        config.parser.max_depth = v;
                    }
                }
                "sampler" => {
                    section.check_keys(&["axes", "points_1d", "points_2d", "magnitude_guard"])?;
                    if let Some(v) = section.strings("axes")? {
                        config.sampler.allowed_axes = v;
                    }
                    if let Some(v) = section.usize_pair("points_1d")? {
                        config.sampler.points_1d = v;
                    }
                    if let Some(v) = section.usize_pair("points_2d")? {
                        config.sampler.points_2d = v;
                    }
                    if let Some(v) = section.float("magnitude_guard")? {
                        config.sampler.magnitude_guard = v;
                    }
                }
                "solver" => {
                    section.check_keys(&["window", "scan_points", "tolerance", "max_iterations"])?;
                    if let Some(v) = section.float_pair("window")? {
                        config.solver.window = v;
                    }
                    if let Some(v) = section.usize("scan_points")? {
                        config.solver.scan_points = v;
                    }
                    if let Some(v) = section.float("tolerance")? {
                        config.solver.tolerance = v;
                    }
                    if let Some(v) = section.usize("max_iterations")? {
                        config.solver.max_iterations = v;
                    }
                }
                "integration" => {
                    section.check_keys(&["quadrature_degree"])?;
                    if let Some(v) = section.usize("quadrature_degree")? {
                        config.quadrature_degree = v;
                    }
                }
                "engine" => {
                    section.check_keys(&["timeout_ms", "loglevel"])?;
                    if let Some(v) = section.usize("timeout_ms")? {
                        config.timeout = Some(Duration::from_millis(v as u64));
                    }
                    if let Some(v) = section.strings("loglevel")? {
                        config.loglevel = v.into_iter().next();
                    }
                }
                other => return Err(ConfigError::UnknownSection(other.to_string())),
            }
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_document(&text)
    }
}
