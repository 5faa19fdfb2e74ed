//! Training patterns and the sources that supply them.
//!
//! A `PatternSource` is an ordered, fixed-size collection. It can split itself
//! into contiguous sub-sources with `batches`, which is how batch training
//! hands work to parallel gradient tasks.

use crate::error::{Error, Result};

use std::iter::FromIterator;

/// A single training example.
pub trait Pattern: Sync {
    /// The values fed to the input layer.
    fn inputs(&self) -> &[f64];

    /// The error vector to backpropagate for the given network `outputs`.
    ///
    /// Supervised patterns return `target - outputs`; other kinds of pattern
    /// may return any vector of the output layer's width.
    fn errors(&self, outputs: &[f64]) -> Result<Vec<f64>>;

    fn label(&self) -> Option<&str> {
        None
    }
}

/// An input vector with an optional target and label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupervisedPattern {
    inputs: Vec<f64>,
    target: Option<Vec<f64>>,
    label: Option<String>,
}

impl SupervisedPattern {
    pub fn new<I, O>(inputs: I, target: O) -> Self
    where
        I: Into<Vec<f64>>,
        O: Into<Vec<f64>>,
    {
        SupervisedPattern {
            inputs: inputs.into(),
            target: Some(target.into()),
            label: None,
        }
    }

    /// A pattern with no target, usable for recall but not for training.
    pub fn unlabelled<I: Into<Vec<f64>>>(inputs: I) -> Self {
        SupervisedPattern {
            inputs: inputs.into(),
            target: None,
            label: None,
        }
    }

    pub fn with_label<L: Into<String>>(mut self, label: L) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn target(&self) -> Option<&[f64]> {
        self.target.as_deref()
    }
}

impl Pattern for SupervisedPattern {
    fn inputs(&self) -> &[f64] {
        &self.inputs
    }

    fn errors(&self, outputs: &[f64]) -> Result<Vec<f64>> {
        let target = self.target.as_ref().ok_or(Error::MissingTarget)?;
        if target.len() != outputs.len() {
            return Err(Error::ErrorSize {
                expected: outputs.len(),
                got: target.len(),
            });
        }
        Ok(target.iter().zip(outputs).map(|(t, o)| t - o).collect())
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// An ordered, indexable, fixed-size collection of patterns.
pub trait PatternSource: Sync {
    type Item: Pattern;

    fn len(&self) -> usize;

    /// Returns the pattern at `index`, which must be below `len()`.
    fn pattern(&self, index: usize) -> &Self::Item;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self) -> Patterns<'_, Self>
    where
        Self: Sized,
    {
        Patterns {
            source: self,
            index: 0,
        }
    }

    /// Splits the source into `count` contiguous, non-overlapping
    /// sub-sources.
    ///
    /// Every batch holds `len / count` patterns except the last, which also
    /// takes the remainder. Concatenating the batches in order gives back
    /// every pattern exactly once. A `count` of zero is treated as one.
    fn batches(&self, count: usize) -> Vec<Batch<'_, Self>>
    where
        Self: Sized,
    {
        let count = count.max(1);
        let size = self.len() / count;
        (0..count)
            .map(|i| Batch {
                source: self,
                start: i * size,
                end: if i + 1 == count {
                    self.len()
                } else {
                    (i + 1) * size
                },
            })
            .collect()
    }
}

/// Iterator over the patterns of a source, in order.
#[derive(Debug)]
pub struct Patterns<'a, S> {
    source: &'a S,
    index: usize,
}

impl<'a, S: PatternSource> Iterator for Patterns<'a, S> {
    type Item = &'a S::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.source.len() {
            return None;
        }
        self.index += 1;
        Some(self.source.pattern(self.index - 1))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.source.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

/// A contiguous window onto another source.
#[derive(Debug)]
pub struct Batch<'a, S> {
    source: &'a S,
    start: usize,
    end: usize,
}

impl<'a, S> Clone for Batch<'a, S> {
    fn clone(&self) -> Self {
        Batch {
            source: self.source,
            start: self.start,
            end: self.end,
        }
    }
}

impl<'a, S> Batch<'a, S> {
    /// Index of the first pattern of this batch in the parent source.
    pub fn start(&self) -> usize {
        self.start
    }
}

impl<'a, S: PatternSource> PatternSource for Batch<'a, S> {
    type Item = S::Item;

    fn len(&self) -> usize {
        self.end - self.start
    }

    fn pattern(&self, index: usize) -> &S::Item {
        assert!(index < self.len(), "pattern {} out of batch bounds", index);
        self.source.pattern(self.start + index)
    }
}

/// An in-memory pattern source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSet<P = SupervisedPattern> {
    patterns: Vec<P>,
}

impl<P> PatternSet<P> {
    pub fn new(patterns: Vec<P>) -> Self {
        PatternSet { patterns }
    }

    pub fn as_slice(&self) -> &[P] {
        &self.patterns
    }
}

impl PatternSet<SupervisedPattern> {
    /// Builds a supervised set from `(input, target)` pairs.
    pub fn from_pairs<I, O>(examples: &[(I, O)]) -> Self
    where
        I: AsRef<[f64]>,
        O: AsRef<[f64]>,
    {
        examples
            .iter()
            .map(|(input, target)| SupervisedPattern::new(input.as_ref(), target.as_ref()))
            .collect()
    }
}

impl<P> FromIterator<P> for PatternSet<P> {
    fn from_iter<T: IntoIterator<Item = P>>(iter: T) -> Self {
        PatternSet::new(iter.into_iter().collect())
    }
}

impl<P: Pattern> PatternSource for PatternSet<P> {
    type Item = P;

    fn len(&self) -> usize {
        self.patterns.len()
    }

    fn pattern(&self, index: usize) -> &P {
        &self.patterns[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> PatternSet {
        (0..n)
            .map(|i| SupervisedPattern::new(vec![i as f64], vec![0.0]))
            .collect()
    }

    #[test]
    fn supervised_errors() {
        let pattern = SupervisedPattern::new(vec![1.0], vec![1.0, -1.0]);
        assert_eq!(pattern.errors(&[0.25, 0.5]).unwrap(), vec![0.75, -1.5]);
        assert_eq!(
            pattern.errors(&[0.0]),
            Err(Error::ErrorSize {
                expected: 1,
                got: 2
            })
        );
    }

    #[test]
    fn missing_target() {
        let pattern = SupervisedPattern::unlabelled(vec![1.0]).with_label("probe");
        assert_eq!(pattern.label(), Some("probe"));
        assert_eq!(pattern.errors(&[0.0]), Err(Error::MissingTarget));
    }

    #[test]
    fn partition_reconstructs_source() {
        for &batches in &[1usize, 2, 3, 7] {
            for &n in &[0, 1, batches - 1, batches, batches + 1, 10 * batches] {
                let source = numbered(n);
                let parts = source.batches(batches);
                assert_eq!(parts.len(), batches);

                let joined: Vec<f64> = parts
                    .iter()
                    .flat_map(|batch| batch.iter().map(|p| p.inputs()[0]))
                    .collect();
                let expected: Vec<f64> = (0..n).map(|i| i as f64).collect();
                assert_eq!(joined, expected, "n = {}, batches = {}", n, batches);
            }
        }
    }

    #[test]
    fn last_batch_takes_remainder() {
        let source = numbered(11);
        let sizes: Vec<usize> = source.batches(3).iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 5]);
        assert_eq!(source.batches(3)[2].start(), 6);
    }

    #[test]
    fn zero_batches_means_one() {
        let source = numbered(4);
        let parts = source.batches(0);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].len(), 4);
    }

    #[test]
    fn batches_nest() {
        let source = numbered(10);
        let outer = source.batches(2);
        let inner = outer[1].batches(2);
        assert_eq!(inner[1].pattern(0).inputs(), &[7.0]);
    }

    #[test]
    fn from_pairs() {
        let set = PatternSet::from_pairs(&[([0.0, 1.0], [1.0]), ([1.0, 1.0], [0.0])]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.pattern(1).target(), Some(&[0.0][..]));
    }
}
