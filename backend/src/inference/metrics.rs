use log::warn;
use rand::Rng;

/// Ground-truth class every computed submission is scored against. There
/// is no true-label input on the submission path, so the computed policy
/// assumes class 0 for the single sample it sees. That assumption is a
/// modeling defect inherited from the legacy KNN flow; it is logged on
/// every use rather than silently treated as meaningful.
const ASSUMED_TRUTH_CLASS: usize = 0;

/// Display-only accuracy offset carried over from the legacy KNN flow.
/// Never folded into stored records.
// TODO: confirm with the operators whether the +36 accuracy display
// offset on the KNN path is still wanted, or was a scale workaround.
pub const KNN_ACCURACY_DISPLAY_OFFSET: f64 = 36.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Per-submission metrics policy, chosen at the call site.
///
/// `Synthetic` draws display placeholders from fixed ranges; the values
/// are independent of the prediction and documented as non-meaningful.
/// Note the accuracy range sits on a 0-100-like scale while the other
/// three sit on 0-1; that inconsistency is preserved on purpose.
///
/// `SingleSampleComputed` scores the one prediction against the assumed
/// ground truth with macro-averaged multi-class formulas. With a sample
/// size of one every value collapses to 0 or 1; that degeneracy is
/// expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsPolicy {
    Synthetic { decimals: u32 },
    SingleSampleComputed,
}

impl MetricsPolicy {
    pub fn compute(&self, class_index: usize) -> Metrics {
        match self {
            MetricsPolicy::Synthetic { decimals } => synthetic(*decimals),
            MetricsPolicy::SingleSampleComputed => single_sample(class_index),
        }
    }
}

fn synthetic(decimals: u32) -> Metrics {
    let mut rng = rand::rng();
    Metrics {
        precision: round_to(rng.random_range(0.42..=0.85), decimals),
        accuracy: round_to(rng.random_range(86.0..=93.0), decimals),
        recall: round_to(rng.random_range(0.33..=0.79), decimals),
        f1: round_to(rng.random_range(0.35..=0.83), decimals),
    }
}

fn single_sample(class_index: usize) -> Metrics {
    warn!(
        "computed metrics assume ground-truth class {ASSUMED_TRUTH_CLASS} for every \
         submission; values are degenerate whenever the prediction differs"
    );
    let truth = [ASSUMED_TRUTH_CLASS];
    let predicted = [class_index];
    Metrics {
        accuracy: accuracy(&truth, &predicted),
        precision: macro_precision(&truth, &predicted),
        recall: macro_recall(&truth, &predicted),
        f1: macro_f1(&truth, &predicted),
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let matches = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(t, p)| t == p)
        .count();
    matches as f64 / truth.len() as f64
}

// Macro averages run over the labels present in either vector, with
// zero-division resolving to 0, matching the usual multi-class
// conventions.
fn present_labels(truth: &[usize], predicted: &[usize]) -> Vec<usize> {
    let mut labels: Vec<usize> = truth.iter().chain(predicted.iter()).copied().collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}

fn class_counts(label: usize, truth: &[usize], predicted: &[usize]) -> (usize, usize, usize) {
    let mut true_positives = 0;
    let mut false_positives = 0;
    let mut false_negatives = 0;
    for (&t, &p) in truth.iter().zip(predicted.iter()) {
        if p == label && t == label {
            true_positives += 1;
        } else if p == label {
            false_positives += 1;
        } else if t == label {
            false_negatives += 1;
        }
    }
    (true_positives, false_positives, false_negatives)
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn macro_precision(truth: &[usize], predicted: &[usize]) -> f64 {
    let labels = present_labels(truth, predicted);
    let total: f64 = labels
        .iter()
        .map(|&label| {
            let (tp, fp, _) = class_counts(label, truth, predicted);
            ratio(tp, tp + fp)
        })
        .sum();
    total / labels.len() as f64
}

pub fn macro_recall(truth: &[usize], predicted: &[usize]) -> f64 {
    let labels = present_labels(truth, predicted);
    let total: f64 = labels
        .iter()
        .map(|&label| {
            let (tp, _, fne) = class_counts(label, truth, predicted);
            ratio(tp, tp + fne)
        })
        .sum();
    total / labels.len() as f64
}

pub fn macro_f1(truth: &[usize], predicted: &[usize]) -> f64 {
    let labels = present_labels(truth, predicted);
    let total: f64 = labels
        .iter()
        .map(|&label| {
            let (tp, fp, fne) = class_counts(label, truth, predicted);
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fne);
            if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            }
        })
        .sum();
    total / labels.len() as f64
}
