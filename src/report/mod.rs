//! Evaluation report artifacts
//!
//! Formats already-computed metrics into a JSON document and a Markdown
//! summary. Read-only with respect to the pipeline: nothing here feeds back
//! into training or inference.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::evaluation::EvaluationRecord;

pub const REPORT_JSON: &str = "evaluation_report.json";
pub const REPORT_MARKDOWN: &str = "evaluation_report.md";

/// One training run's evaluation summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub n_models: usize,
    /// Top-ranked model, when any model survived evaluation
    pub best_model: Option<String>,
    /// Records in rank order
    pub records: Vec<EvaluationRecord>,
}

impl EvaluationReport {
    /// Build from ranked records (the evaluator's output order).
    pub fn new(records: Vec<EvaluationRecord>) -> Self {
        Self {
            generated_at: Utc::now(),
            n_models: records.len(),
            best_model: records.first().map(|r| r.model_name.clone()),
            records,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        writeln!(out, "# Model Evaluation Report").ok();
        writeln!(out).ok();
        writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")).ok();
        writeln!(out, "Models evaluated: {}", self.n_models).ok();
        if let Some(best) = &self.best_model {
            writeln!(out, "Best model: **{}**", best).ok();
        }
        writeln!(out).ok();

        writeln!(out, "## Ranking").ok();
        writeln!(out).ok();
        writeln!(out, "| Rank | Model | Accuracy | Precision | Recall | F1 | ROC-AUC |").ok();
        writeln!(out, "|------|-------|----------|-----------|--------|----|---------|").ok();

        for (rank, record) in self.records.iter().enumerate() {
            // Models sharing an accuracy are explicitly marked as tied
            let tied = self
                .records
                .iter()
                .enumerate()
                .any(|(i, other)| i != rank && (other.accuracy - record.accuracy).abs() < 1e-12);
            let name = if tied {
                format!("{} (tied)", record.model_name)
            } else {
                record.model_name.clone()
            };
            let auc = record
                .roc_auc
                .map_or("n/a".to_string(), |v| format!("{:.4}", v));
            writeln!(
                out,
                "| {} | {} | {:.4} | {:.4} | {:.4} | {:.4} | {} |",
                rank + 1,
                name,
                record.accuracy,
                record.precision,
                record.recall,
                record.f1,
                auc
            )
            .ok();
        }
        writeln!(out).ok();

        writeln!(out, "## Confusion Matrices").ok();
        writeln!(out).ok();
        for record in &self.records {
            let cm = &record.confusion;
            writeln!(out, "### {}", record.model_name).ok();
            writeln!(out).ok();
            writeln!(out, "| | Predicted Healthy | Predicted Parkinson |").ok();
            writeln!(out, "|---|---|---|").ok();
            writeln!(
                out,
                "| Actual Healthy | {} | {} |",
                cm.true_negative, cm.false_positive
            )
            .ok();
            writeln!(
                out,
                "| Actual Parkinson | {} | {} |",
                cm.false_negative, cm.true_positive
            )
            .ok();
            writeln!(out).ok();
        }

        out
    }

    /// Write both artifacts into `dir`, returning the (json, markdown) paths.
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let json_path = dir.join(REPORT_JSON);
        let md_path = dir.join(REPORT_MARKDOWN);
        fs::write(&json_path, self.to_json()?)?;
        fs::write(&md_path, self.to_markdown())?;

        tracing::info!(dir = %dir.display(), "wrote evaluation report");
        Ok((json_path, md_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::ConfusionMatrix;
    use tempfile::TempDir;

    fn sample_records() -> Vec<EvaluationRecord> {
        let cm = ConfusionMatrix {
            true_negative: 3,
            false_positive: 1,
            false_negative: 0,
            true_positive: 2,
        };
        vec![
            EvaluationRecord {
                model_name: "Random Forest".to_string(),
                accuracy: 0.9,
                precision: 0.88,
                recall: 0.9,
                f1: 0.89,
                roc_auc: Some(0.95),
                confusion: cm,
                predictions: vec![0, 0, 0, 1, 1, 1],
            },
            EvaluationRecord {
                model_name: "SVM".to_string(),
                accuracy: 0.8,
                precision: 0.79,
                recall: 0.8,
                f1: 0.79,
                roc_auc: None,
                confusion: cm,
                predictions: vec![0, 0, 1, 1, 1, 1],
            },
        ]
    }

    #[test]
    fn test_report_best_model() {
        let report = EvaluationReport::new(sample_records());
        assert_eq!(report.n_models, 2);
        assert_eq!(report.best_model.as_deref(), Some("Random Forest"));
    }

    #[test]
    fn test_markdown_contains_table_and_matrices() {
        let report = EvaluationReport::new(sample_records());
        let md = report.to_markdown();

        assert!(md.contains("# Model Evaluation Report"));
        assert!(md.contains("| 1 | Random Forest | 0.9000 |"));
        assert!(md.contains("| 2 | SVM | 0.8000 |"));
        // No probabilities -> no AUC
        assert!(md.contains("n/a"));
        assert!(md.contains("### Random Forest"));
        assert!(md.contains("| Actual Healthy | 3 | 1 |"));
    }

    #[test]
    fn test_markdown_marks_ties() {
        let mut records = sample_records();
        records[1].accuracy = 0.9;
        let report = EvaluationReport::new(records);
        let md = report.to_markdown();
        assert!(md.contains("Random Forest (tied)"));
        assert!(md.contains("SVM (tied)"));
    }

    #[test]
    fn test_write_both_artifacts() {
        let report = EvaluationReport::new(sample_records());
        let dir = TempDir::new().unwrap();
        let (json_path, md_path) = report.write(dir.path()).unwrap();

        assert!(json_path.exists());
        assert!(md_path.exists());

        let reloaded: EvaluationReport =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(reloaded.best_model.as_deref(), Some("Random Forest"));
    }
}
