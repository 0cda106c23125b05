use crate::engine::config::EngineConfig;
use crate::engine::dispatcher::dispatch;
use crate::engine::errors::{OperationError, SampleError};
use crate::engine::operations::{Bounds, Operation, OperationRequest};
use crate::engine::results::{OperationResult, PlotGrid, PlotRequest};
use crate::engine::sampler;
use log::{error, info};
use rayon::prelude::*;
use std::str::FromStr;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

/// Entry point of the calculator: operations, plot sampling and batches of both, under one
/// [`EngineConfig`].
///
/// # Examples
/// ```rust, ignore
/// let engine = CalcEngine::default();
/// let result = engine.evaluate_text("x^2", "diff", "x", None)?;
/// assert_eq!(result.result, "2*x");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CalcEngine {
    pub config: Arc<EngineConfig>,
}

impl CalcEngine {
    pub fn new(config: EngineConfig) -> Self {
        CalcEngine { config: Arc::new(config) }
    }

    /// Runs `request`, bounded by the configured timeout if there is one.
    pub fn evaluate(&self, request: &OperationRequest) -> Result<OperationResult, OperationError> {
        match self.config.timeout {
            Some(limit) => self.evaluate_with_timeout(request, limit),
            None => dispatch(request, &self.config),
        }
    }

    /// Runs `request` on a worker thread and gives up after `limit`. The worker is detached on
    /// timeout and its result discarded.
    pub fn evaluate_with_timeout(
        &self,
        request: &OperationRequest,
        limit: Duration,
    ) -> Result<OperationResult, OperationError> {
        let (sender, receiver) = mpsc::channel();
        let config = Arc::clone(&self.config);
        let job = request.clone();
        let begin = Instant::now();
        thread::spawn(move || {
            // the receiver is gone once the caller timed out
            let _ = sender.send(dispatch(&job, &config));
        });
        match receiver.recv_timeout(limit) {
            Ok(result) => {
                info!("{} finished in {:?}", request.operation, begin.elapsed());
                result
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                error!("{} of '{}' exceeded {:?}", request.operation, request.text, limit);
                Err(OperationError::Timeout(limit))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(OperationError::Evaluation(
                "evaluation worker stopped without a result".to_string(),
            )),
        }
    }

    /// String-keyed entry point. An empty `operation` means `simplify`.
    pub fn evaluate_text(
        &self,
        expr: &str,
        operation: &str,
        variable: &str,
        bounds: Option<Bounds>,
    ) -> Result<OperationResult, OperationError> {
        let operation = match operation.trim() {
            "" => Operation::Simplify,
            name => Operation::from_str(name)
                .map_err(|_| OperationError::UnsupportedOperation(name.to_string()))?,
        };
        let variable = if variable.trim().is_empty() { "x" } else { variable };
        let request = OperationRequest::new(expr, operation, variable, bounds)?;
        self.evaluate(&request)
    }

    /// Evaluates independent requests in parallel; results keep the order of `requests`.
    pub fn evaluate_batch(&self, requests: &[OperationRequest]) -> Vec<Result<OperationResult, OperationError>> {
        requests.par_iter().map(|request| self.evaluate(request)).collect()
    }

    pub fn sample_text(&self, text: &str, request: &PlotRequest) -> Result<PlotGrid, SampleError> {
        sampler::sample_text(text, request, &self.config.sampler, &self.config.parser)
    }
}
