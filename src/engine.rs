//! Calculator engine built on [`crate::symbolic`]: validated operation requests, a dispatcher
//! producing results with explanation steps, integration bound resolution and numeric
//! sampling for plots.
//!
//! # Examples
//! ```rust
//! use RustedCalc::engine::calc_engine::CalcEngine;
//! use RustedCalc::engine::operations::Bounds;
//! use RustedCalc::engine::results::PlotRequest;
//! let engine = CalcEngine::default();
//! let result = engine
//!     .evaluate_text("x^2", "definite_int", "x", Some(Bounds::interval(0.0, 3.0)))
//!     .unwrap();
//! assert_eq!(result.numeric, Some(9.0));
//! let grid = engine.sample_text("sin(x)", &PlotRequest::line(0.0, 1.0, 50)).unwrap();
//! assert_eq!(grid.shape(), (1, 50));
//! ```
/// the [`calc_engine::CalcEngine`] facade: timeouts and batches
pub mod calc_engine;
/// settings of the engine and their loading from a document
pub mod config;
pub mod dispatcher;
pub mod errors;
/// integration bounds given as numbers or text
pub mod limits;
pub mod operations;
pub mod results;
/// 1D and 2D grids of expression values
pub mod sampler;
mod engine_tests;
