use super::types::Dtype;

/// Replaceable numeric-vs-string classification strategy. Implementations
/// must never fail; ambiguous input gets a best-effort answer plus a
/// low-confidence flag.
pub trait TypeInference {
    /// Classify a column from sampled cell values. Returns the dtype and
    /// whether the call had to guess without evidence.
    fn infer(&self, samples: &[Option<&str>]) -> (Dtype, bool);
}

/// Default strategy: a column is numeric when more than `threshold` of its
/// non-missing sampled values parse as f64. No non-missing samples at all
/// means string with the low-confidence flag set.
pub struct SampledNumericShare {
    pub threshold: f64,
}

impl Default for SampledNumericShare {
    fn default() -> Self {
        SampledNumericShare { threshold: 0.9 }
    }
}

impl TypeInference for SampledNumericShare {
    fn infer(&self, samples: &[Option<&str>]) -> (Dtype, bool) {
        let mut present = 0usize;
        let mut numeric = 0usize;
        for v in samples.iter().flatten() {
            present += 1;
            if v.parse::<f64>().is_ok() {
                numeric += 1;
            }
        }
        if present == 0 {
            return (Dtype::String, true);
        }
        let share = numeric as f64 / present as f64;
        if share > self.threshold {
            (Dtype::Numeric, false)
        } else {
            (Dtype::String, false)
        }
    }
}
