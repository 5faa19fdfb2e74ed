//! Strategies that tune hyperparameters between iterations.

use crate::backprop::LearningRate;
use crate::learning::{LearningMethod, Strategy};

/// Factor applied to the learning rate whenever the error gets worse.
pub const LEARNING_DECAY: f64 = 0.99;

/// Starts the learning rate at `1 / training size` and shrinks it by
/// `LEARNING_DECAY` after every iteration whose error is worse than the one
/// before. The rate is never increased.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SmartLearningRate {
    last_error: Option<f64>,
    learning_rate: f64,
}

impl SmartLearningRate {
    pub fn new() -> Self {
        SmartLearningRate::default()
    }

    /// The rate this strategy last set.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

impl<M> Strategy<M> for SmartLearningRate
where
    M: LearningMethod + LearningRate,
{
    fn init(&mut self, method: &mut M) {
        let size = method.training_size();
        if size > 0 {
            method.set_learning_rate(1.0 / size as f64);
        } else {
            log::warn!("no training patterns, keeping the initial learning rate");
        }
        self.learning_rate = method.learning_rate();
        self.last_error = None;
    }

    fn after_iteration(&mut self, method: &mut M) {
        let error = method.error();
        if let Some(last_error) = self.last_error {
            if error > last_error {
                self.learning_rate *= LEARNING_DECAY;
                method.set_learning_rate(self.learning_rate);
                log::debug!(
                    "error rose from {} to {}, learning rate now {}",
                    last_error,
                    error,
                    self.learning_rate
                );
            }
        }
        self.last_error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::learning::Trainer;

    /// Reports a scripted error sequence and exposes its learning rate.
    struct Scripted {
        errors: Vec<f64>,
        next: usize,
        rate: f64,
    }

    impl LearningMethod for Scripted {
        fn perform_iteration(&mut self) -> Result<()> {
            self.next += 1;
            Ok(())
        }

        fn error(&self) -> f64 {
            self.errors[self.next - 1]
        }

        fn training_size(&self) -> usize {
            20
        }
    }

    impl LearningRate for Scripted {
        fn learning_rate(&self) -> f64 {
            self.rate
        }

        fn set_learning_rate(&mut self, rate: f64) {
            self.rate = rate;
        }
    }

    fn trainer(errors: Vec<f64>) -> Trainer<Scripted> {
        Trainer::new(Scripted {
            errors,
            next: 0,
            rate: 0.7,
        })
        .strategy(SmartLearningRate::new())
    }

    #[test]
    fn starts_at_inverse_training_size() {
        let trainer = trainer(vec![]);
        assert_eq!(trainer.method().learning_rate(), 1.0 / 20.0);
    }

    #[test]
    fn decays_while_error_never_improves() {
        let errors: Vec<f64> = (0..10).map(|i| 1.0 + i as f64).collect();
        let mut trainer = trainer(errors);

        trainer.iteration().unwrap();
        let mut previous = trainer.method().learning_rate();
        assert_eq!(previous, 1.0 / 20.0);

        for _ in 1..10 {
            trainer.iteration().unwrap();
            let rate = trainer.method().learning_rate();
            assert!(rate < previous, "{} should be below {}", rate, previous);
            assert!((rate - previous * LEARNING_DECAY).abs() < 1e-15);
            previous = rate;
        }
    }

    #[test]
    fn never_increases() {
        let mut trainer = trainer(vec![1.0, 2.0, 0.5, 0.25, 3.0, 3.0]);
        let mut rates = Vec::new();
        for _ in 0..6 {
            trainer.iteration().unwrap();
            rates.push(trainer.method().learning_rate());
        }
        let base = 1.0 / 20.0;
        assert_eq!(
            rates,
            vec![
                base,
                base * LEARNING_DECAY,
                base * LEARNING_DECAY,
                base * LEARNING_DECAY,
                base * LEARNING_DECAY * LEARNING_DECAY,
                base * LEARNING_DECAY * LEARNING_DECAY,
            ]
        );
    }
}
