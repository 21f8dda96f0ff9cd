//! Ratio metrics derived from raw columns

use serde::{Deserialize, Serialize};

use crate::core::sample::Sample;

/// `output = 100 * numerator / denominator`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedMetric {
    pub output: String,
    pub numerator: String,
    pub denominator: String,
}

impl DerivedMetric {
    pub fn new(output: &str, numerator: &str, denominator: &str) -> Self {
        Self {
            output: output.to_string(),
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
        }
    }

    /// Compute the percentage for one sample.
    ///
    /// Missing or null operands and a zero denominator all yield `None`.
    pub fn compute(&self, sample: &Sample) -> Option<f64> {
        let numerator = sample.get(&self.numerator)?;
        let denominator = sample.get(&self.denominator)?;
        if denominator == 0.0 {
            return None;
        }
        Some(100.0 * numerator / denominator).filter(|v| v.is_finite())
    }

    /// Whether some sample carries both operand columns
    fn has_source(&self, samples: &[Sample]) -> bool {
        samples
            .iter()
            .any(|s| s.has_column(&self.numerator) && s.has_column(&self.denominator))
    }
}

/// Return a copy of `samples` with every derived column populated.
///
/// When neither operand pair exists anywhere in the set the output column is
/// left absent, so downstream code can tell "never captured" from "all null".
pub fn apply_derived(samples: &[Sample], derived: &[DerivedMetric]) -> Vec<Sample> {
    let active: Vec<&DerivedMetric> = derived.iter().filter(|d| d.has_source(samples)).collect();

    samples
        .iter()
        .map(|sample| {
            let mut out = sample.clone();
            for metric in &active {
                out.set(&metric.output, metric.compute(sample));
            }
            out
        })
        .collect()
}
