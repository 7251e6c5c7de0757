//! Classification of weight vectors into match / non-match / possible-match.
//!
//! This is an extension point: the engine only requires the [`Classifier`]
//! trait. [`Unclassified`] leaves every pair unlabeled; [`ThresholdClassifier`]
//! is one substitutable decision rule.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::model::{MatchClass, WeightVectors};

pub trait Classifier: Send + Sync {
    /// Short name reported in the run metadata.
    fn name(&self) -> &str;

    /// Label one weight vector, or `None` to leave it unclassified.
    fn classify(&self, weights: &[f64]) -> Option<MatchClass>;
}

/// Pass-through: no pair gets a label.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unclassified;

impl Classifier for Unclassified {
    fn name(&self) -> &str {
        "unclassified"
    }

    fn classify(&self, _weights: &[f64]) -> Option<MatchClass> {
        None
    }
}

/// Weighted sum of scores against an upper and a lower threshold.
///
/// `sum >= upper` is a match, `sum < lower` a non-match, anything in
/// between a possible match. Missing weights count as 1.0.
#[derive(Debug, Clone)]
pub struct ThresholdClassifier {
    pub upper: f64,
    pub lower: f64,
    pub weights: Option<Vec<f64>>,
}

impl ThresholdClassifier {
    pub fn new(upper: f64, lower: f64, weights: Option<Vec<f64>>) -> Self {
        Self {
            upper,
            lower,
            weights,
        }
    }

    pub fn score(&self, weights: &[f64]) -> f64 {
        match self.weights {
            Some(ref factors) => weights
                .iter()
                .enumerate()
                .map(|(i, w)| w * factors.get(i).copied().unwrap_or(1.0))
                .sum(),
            None => weights.iter().sum(),
        }
    }
}

impl Classifier for ThresholdClassifier {
    fn name(&self) -> &str {
        "threshold"
    }

    fn classify(&self, weights: &[f64]) -> Option<MatchClass> {
        let score = self.score(weights);
        if score.is_nan() {
            return None;
        }
        Some(if score >= self.upper {
            MatchClass::Match
        } else if score < self.lower {
            MatchClass::NonMatch
        } else {
            MatchClass::PossibleMatch
        })
    }
}

/// Label every pair in place. Returns counts per class name.
pub fn classify_pairs(pairs: &mut WeightVectors, classifier: &dyn Classifier) -> BTreeMap<String, usize> {
    let start = Instant::now();
    let mut counts = BTreeMap::new();
    for pair in pairs.iter_mut() {
        pair.class = classifier.classify(&pair.weights);
        if let Some(class) = pair.class {
            *counts.entry(class.to_string()).or_insert(0) += 1;
        }
    }
    log::info!(
        "classified {} pairs with {} in {:.3}s",
        pairs.len(),
        classifier.name(),
        start.elapsed().as_secs_f64(),
    );
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScoredPair;

    fn pairs(vectors: Vec<Vec<f64>>) -> WeightVectors {
        let mut out = WeightVectors::new();
        for (i, weights) in vectors.into_iter().enumerate() {
            out.push(ScoredPair {
                id_a: format!("a{i}"),
                id_b: format!("b{i}"),
                block_key: "k".into(),
                weights,
                class: None,
            });
        }
        out
    }

    #[test]
    fn threshold_bands() {
        let c = ThresholdClassifier::new(1.5, 0.5, None);
        assert_eq!(c.classify(&[1.0, 1.0]), Some(MatchClass::Match));
        assert_eq!(c.classify(&[0.5, 1.0]), Some(MatchClass::Match));
        assert_eq!(c.classify(&[0.5, 0.5]), Some(MatchClass::PossibleMatch));
        assert_eq!(c.classify(&[0.2, 0.2]), Some(MatchClass::NonMatch));
        assert_eq!(c.classify(&[f64::NAN, 1.0]), None);
    }

    #[test]
    fn weighted_sum() {
        let c = ThresholdClassifier::new(2.0, 1.0, Some(vec![2.0, 0.0]));
        assert_eq!(c.score(&[1.0, 1.0]), 2.0);
        assert_eq!(c.classify(&[0.75, 1.0]), Some(MatchClass::PossibleMatch));
    }

    #[test]
    fn unclassified_leaves_labels_empty() {
        let mut wv = pairs(vec![vec![1.0], vec![0.0]]);
        let counts = classify_pairs(&mut wv, &Unclassified);
        assert!(counts.is_empty());
        assert!(wv.iter().all(|p| p.class.is_none()));
    }

    #[test]
    fn counts_per_class() {
        let mut wv = pairs(vec![
            vec![1.0, 1.0],
            vec![0.95, 0.95],
            vec![0.0, 0.1],
            vec![0.6, 0.4],
        ]);
        let c = ThresholdClassifier::new(1.8, 0.5, None);
        let counts = classify_pairs(&mut wv, &c);
        assert_eq!(counts.get("match"), Some(&2));
        assert_eq!(counts.get("non_match"), Some(&1));
        assert_eq!(counts.get("possible_match"), Some(&1));
    }
}
