//! Utilities for training models by gradient descent.

use ndarray::{Array1, ArrayView1};
use std::time::{Duration, Instant};
use tracing::info;

/// A problem an iterative optimizer can minimize.
pub trait Optimizable {
    /// The parameters the search starts from.
    fn initial_parameters(&self) -> Array1<f64>;

    /// Evaluates the cost at `parameters` and its gradient, laid out like
    /// the parameters.
    ///
    /// Takes `&mut self` since implementations may advance internal state,
    /// such as a mini-batch cursor, between calls.
    fn cost_function(&mut self, parameters: ArrayView1<f64>) -> (f64, Array1<f64>);
}

/// The result of an optimization run.
#[derive(Clone, Debug)]
pub struct Trajectory {
    /// The cost returned by every evaluation, in order.
    pub costs: Vec<f64>,
    /// The parameters after the final step.
    pub parameters: Array1<f64>,
}

/// Fixed-step gradient descent.
#[derive(Debug)]
pub struct GradientDescent {
    learning_rate: f64,
    logging: Logging,
    stop_condition: StopCondition,
}

impl Default for GradientDescent {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientDescent {
    /// Starts from a step size of 0.1 and 1000 steps, logging only the final
    /// cost. Adjust with the builder methods below.
    pub fn new() -> Self {
        GradientDescent {
            learning_rate: 0.1,
            logging: Logging::Completion,
            stop_condition: StopCondition::Iterations(1000),
        }
    }

    /// Sets the step size applied to every gradient.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Chooses which progress events are emitted.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Accepts a `StopCondition` or a bare `Duration`.
    pub fn stop_condition<C>(mut self, condition: C) -> Self
    where
        C: Into<StopCondition>,
    {
        self.stop_condition = condition.into();
        self
    }

    /// Minimizes `problem`, stepping against the gradient after every cost
    /// evaluation until the stop condition holds.
    pub fn optimize<O>(&self, problem: &mut O) -> Trajectory
    where
        O: Optimizable + ?Sized,
    {
        let start_time = Instant::now();
        let mut parameters = problem.initial_parameters();
        let mut costs = Vec::new();
        let mut iteration = 0;
        loop {
            let (cost, gradient) = problem.cost_function(parameters.view());
            parameters.scaled_add(-self.learning_rate, &gradient);
            costs.push(cost);
            iteration += 1;

            self.logging.iteration(iteration, cost);
            if self.stop_condition.should_stop(iteration, cost, start_time) {
                break;
            }
        }
        self.logging.completion(iteration, &costs, start_time);
        Trajectory { costs, parameters }
    }
}

/// Which `info` events `GradientDescent` emits.
#[derive(Copy, Clone, Debug)]
pub enum Logging {
    Silent,
    /// One event with the final cost and elapsed time
    Completion,
    /// An event with the current cost on every `n`th step, plus the final one
    Iterations(usize),
}

impl Logging {
    /// Called after each step.
    fn iteration(&self, iteration: usize, cost: f64) {
        if let Logging::Iterations(freq) = *self {
            if freq > 0 && iteration % freq == 0 {
                info!(iteration, cost, "gradient descent step");
            }
        }
    }

    fn completion(&self, iterations: usize, costs: &[f64], start_time: Instant) {
        if let Logging::Silent = *self {
            return;
        }
        info!(
            iterations,
            final_cost = costs.last().copied().unwrap_or(f64::NAN),
            elapsed = ?start_time.elapsed(),
            "gradient descent finished"
        );
    }
}

/// Ends a `GradientDescent` run, checked after every step.
#[derive(Copy, Clone, Debug)]
pub enum StopCondition {
    /// A fixed step count
    Iterations(usize),
    /// The last evaluated cost is below this value
    ErrorThreshold(f64),
    /// Wall-clock time since `optimize` started exceeds this
    Duration(Duration),
}

impl From<Duration> for StopCondition {
    fn from(duration: Duration) -> StopCondition {
        StopCondition::Duration(duration)
    }
}

impl StopCondition {
    fn should_stop(&self, iteration: usize, cost: f64, start_time: Instant) -> bool {
        match *self {
            StopCondition::Iterations(iterations) => iteration >= iterations,
            StopCondition::ErrorThreshold(threshold) => cost < threshold,
            StopCondition::Duration(duration) => start_time.elapsed() > duration,
        }
    }
}
