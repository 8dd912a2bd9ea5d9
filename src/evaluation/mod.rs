//! Classification metrics, confusion matrices, and model ranking

use std::cmp::Ordering;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::training::{Classifier, FittedModel};

/// Predicted-vs-actual counts for a binary target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Self {
        let mut cm = ConfusionMatrix {
            true_negative: 0,
            false_positive: 0,
            false_negative: 0,
            true_positive: 0,
        };
        for (&actual, &predicted) in y_true.iter().zip(y_pred.iter()) {
            match (actual, predicted) {
                (0, 0) => cm.true_negative += 1,
                (0, _) => cm.false_positive += 1,
                (_, 0) => cm.false_negative += 1,
                _ => cm.true_positive += 1,
            }
        }
        cm
    }

    /// Actual-class counts `[negatives, positives]`.
    pub fn row_sums(&self) -> [usize; 2] {
        [
            self.true_negative + self.false_positive,
            self.false_negative + self.true_positive,
        ]
    }

    /// Predicted-class counts `[negatives, positives]`.
    pub fn col_sums(&self) -> [usize; 2] {
        [
            self.true_negative + self.false_negative,
            self.false_positive + self.true_positive,
        ]
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

/// Metrics for one model on one held-out partition. Never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub model_name: String,
    pub accuracy: f64,
    /// Support-weighted across both classes, zero-division treated as 0
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Absent when the model exposes no probabilities
    pub roc_auc: Option<f64>,
    pub confusion: ConfusionMatrix,
    pub predictions: Vec<i64>,
}

pub fn accuracy(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(a, p)| a == p)
        .count();
    correct as f64 / y_true.len() as f64
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Support-weighted precision, recall, and F1 over classes 0 and 1.
pub fn weighted_precision_recall_f1(cm: &ConfusionMatrix) -> (f64, f64, f64) {
    let tn = cm.true_negative as f64;
    let fp = cm.false_positive as f64;
    let fnn = cm.false_negative as f64;
    let tp = cm.true_positive as f64;

    // Class 0 treats "negative" as the positive label
    let precision_0 = safe_ratio(tn, tn + fnn);
    let recall_0 = safe_ratio(tn, tn + fp);
    let f1_0 = safe_ratio(2.0 * precision_0 * recall_0, precision_0 + recall_0);

    let precision_1 = safe_ratio(tp, tp + fp);
    let recall_1 = safe_ratio(tp, tp + fnn);
    let f1_1 = safe_ratio(2.0 * precision_1 * recall_1, precision_1 + recall_1);

    let [support_0, support_1] = cm.row_sums();
    let total = (support_0 + support_1) as f64;
    if total == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let w0 = support_0 as f64 / total;
    let w1 = support_1 as f64 / total;

    (
        precision_0 * w0 + precision_1 * w1,
        recall_0 * w0 + recall_1 * w1,
        f1_0 * w0 + f1_1 * w1,
    )
}

/// Rank-based ROC-AUC from positive-class scores. `None` when only one
/// class is present.
pub fn roc_auc(y_true: &Array1<i64>, scores: &Array1<f64>) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&v| v == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    // Average ranks over tied scores
    let mut ranks = vec![0.0f64; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = ((i + 1) + (j + 1)) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&v, _)| v == 1)
        .map(|(_, &r)| r)
        .sum();

    let auc =
        (rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos as f64 * n_neg as f64);
    Some(auc)
}

/// Computes evaluation records against one held-out partition.
pub struct ModelEvaluator;

impl ModelEvaluator {
    /// Metrics for one fitted model.
    pub fn evaluate_model(
        fitted: &FittedModel,
        x_test: &Array2<f64>,
        y_test: &Array1<i64>,
    ) -> Result<EvaluationRecord> {
        let y_pred = fitted.model.predict(x_test)?;
        let confusion = ConfusionMatrix::from_predictions(y_test, &y_pred);
        let (precision, recall, f1) = weighted_precision_recall_f1(&confusion);

        // ROC-AUC only when the model exposes probabilities
        let roc = match fitted.model.predict_probabilities(x_test)? {
            Some(proba) => roc_auc(y_test, &proba.column(1).to_owned()),
            None => None,
        };

        Ok(EvaluationRecord {
            model_name: fitted.name.clone(),
            accuracy: accuracy(y_test, &y_pred),
            precision,
            recall,
            f1,
            roc_auc: roc,
            confusion,
            predictions: y_pred.to_vec(),
        })
    }

    /// Evaluate every supplied model, skipping individual failures, and
    /// rank the survivors: accuracy descending, then ROC-AUC descending
    /// with absent AUC last, then supplied order (the sort is stable).
    pub fn evaluate_all_models(
        models: &[FittedModel],
        x_test: &Array2<f64>,
        y_test: &Array1<i64>,
    ) -> Vec<EvaluationRecord> {
        let mut records: Vec<EvaluationRecord> = models
            .iter()
            .filter_map(|fitted| match Self::evaluate_model(fitted, x_test, y_test) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(model = %fitted.name, error = %e, "evaluation failed, skipping");
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| {
            b.accuracy
                .partial_cmp(&a.accuracy)
                .unwrap_or(Ordering::Equal)
                .then_with(|| match (a.roc_auc, b.roc_auc) {
                    (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                })
        });

        records
    }
}
