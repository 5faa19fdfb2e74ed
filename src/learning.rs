//! Utilities for driving iterative learning methods.

use crate::error::Result;

use std::time::{Duration, Instant};

/// An algorithm that improves a model one iteration at a time.
pub trait LearningMethod {
    /// Runs the body of one iteration.
    fn perform_iteration(&mut self) -> Result<()>;

    /// The error of the most recently completed iteration.
    fn error(&self) -> f64;

    /// The number of patterns consumed by each iteration.
    fn training_size(&self) -> usize {
        0
    }

    /// Runs before every iteration, after the strategies' own hooks.
    fn before_iteration(&mut self) {}

    /// Runs after every iteration, before the strategies' own hooks.
    fn after_iteration(&mut self) {}

    /// Runs one full iteration with the method's own hooks, returning its
    /// error.
    fn iteration(&mut self) -> Result<f64> {
        self.before_iteration();
        self.perform_iteration()?;
        self.after_iteration();
        Ok(self.error())
    }
}

/// Adjusts a learning method between iterations.
pub trait Strategy<M> {
    /// Called once, when the strategy is registered.
    fn init(&mut self, _method: &mut M) {}

    fn before_iteration(&mut self, _method: &mut M) {}

    fn after_iteration(&mut self, _method: &mut M) {}
}

/// Drives a `LearningMethod` with registered strategies until a stop
/// condition is met.
pub struct Trainer<M> {
    method: M,
    strategies: Vec<Box<dyn Strategy<M>>>,
    iterations: usize,
    logging: Logging,
    stop_condition: StopCondition,
}

impl<M: LearningMethod> Trainer<M> {
    /// Creates a new Trainer instance.
    ///
    /// The trainer is initialized with some default values. These defaults are:
    ///
    /// * No strategies.
    /// * Stops after 1000 training iterations.
    /// * Logs on training completion.
    pub fn new(method: M) -> Self {
        Trainer {
            method,
            strategies: Vec::new(),
            iterations: 0,
            logging: Logging::Completion,
            stop_condition: StopCondition::Iterations(1000),
        }
    }

    /// Registers a strategy. Strategies run in registration order.
    pub fn strategy<S>(mut self, mut strategy: S) -> Self
    where
        S: Strategy<M> + 'static,
    {
        strategy.init(&mut self.method);
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Sets the condition to finish training.
    pub fn stop_condition<C>(mut self, condition: C) -> Self
    where
        C: Into<StopCondition>,
    {
        self.stop_condition = condition.into();
        self
    }

    pub fn method(&self) -> &M {
        &self.method
    }

    pub fn method_mut(&mut self) -> &mut M {
        &mut self.method
    }

    pub fn into_method(self) -> M {
        self.method
    }

    /// The number of iterations run so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Runs a single iteration with every hook, returning its error.
    pub fn iteration(&mut self) -> Result<f64> {
        for strategy in self.strategies.iter_mut() {
            strategy.before_iteration(&mut self.method);
        }
        self.method.iteration()?;
        for strategy in self.strategies.iter_mut() {
            strategy.after_iteration(&mut self.method);
        }
        self.iterations += 1;
        Ok(self.method.error())
    }

    /// Iterates until the stop condition holds, returning the trained method.
    pub fn train(mut self) -> Result<M> {
        let start_time = Instant::now();
        let mut training_error;
        loop {
            training_error = self.iteration()?;
            self.logging.iteration(self.iterations, training_error);
            if self
                .stop_condition
                .should_stop(self.iterations, training_error, start_time)
            {
                break;
            }
        }
        self.logging
            .completion(self.iterations, training_error, start_time);
        Ok(self.method)
    }
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Logging {
    /// No logs will be emitted
    Silent,
    /// A summary will be logged at completion
    Completion,
    /// A summary will be logged after every `n` training iterations
    Iterations(usize),
}

impl Logging {
    /// Performs logging at the current `iteration` of training.
    fn iteration(&self, iteration: usize, training_error: f64) {
        if let Logging::Iterations(freq) = *self {
            if freq > 0 && iteration % freq == 0 {
                log::info!("iteration {}: error={}", iteration, training_error);
            }
        }
    }

    /// Performs logging at the end of training.
    fn completion(&self, iterations: usize, training_error: f64, start_time: Instant) {
        if let Logging::Silent = *self {
            return;
        }
        log::info!(
            "ran {} iterations in {:.3} seconds, final error={}",
            iterations,
            start_time.elapsed().as_secs_f64(),
            training_error
        );
    }
}

/// When to stop training
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StopCondition {
    /// Stops after the provided number of training iterations
    Iterations(usize),
    /// Stops when the training error drops below the provided threshold
    ErrorThreshold(f64),
    /// Stops after the provided duration
    Duration(Duration),
    /// Stops at whichever of a threshold or an iteration cap comes first
    ErrorOrIterations(f64, usize),
}

impl From<Duration> for StopCondition {
    fn from(duration: Duration) -> StopCondition {
        StopCondition::Duration(duration)
    }
}

impl StopCondition {
    /// Returns true of training is complete.
    fn should_stop(&self, iteration: usize, training_error: f64, start_time: Instant) -> bool {
        match *self {
            StopCondition::Iterations(iterations) => iteration >= iterations,
            StopCondition::ErrorThreshold(threshold) => training_error < threshold,
            StopCondition::Duration(duration) => start_time.elapsed() > duration,
            StopCondition::ErrorOrIterations(threshold, iterations) => {
                training_error < threshold || iteration >= iterations
            }
        }
    }
}
