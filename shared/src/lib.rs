use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, FromRepr};

/// Diagnostic classes in model output order. The classifier emits a
/// probability vector indexed by this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, FromRepr)]
#[repr(usize)]
pub enum Diagnosis {
    #[strum(serialize = "Non Demented")]
    NonDemented = 0,
    #[strum(serialize = "Very Mild Demented")]
    VeryMildDemented = 1,
    #[strum(serialize = "Mild Demented")]
    MildDemented = 2,
    #[strum(serialize = "Moderate Demented")]
    ModerateDemented = 3,
}

impl Diagnosis {
    pub const COUNT: usize = 4;
}

/// How per-submission quality metrics are produced. `Synthetic` draws
/// display placeholders that are not derived from the prediction;
/// `Computed` scores the single prediction against a fixed assumed
/// ground truth and is degenerate by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MetricsStrategy {
    Synthetic,
    Computed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub image_path: String,
    pub saved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// One persisted outcome of a single image submission. Field names and
/// the `YYYY-MM-DD` date format are part of the stored wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub result: String,
    pub f1_score: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub image_path: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn diagnosis_labels_cover_model_output_range() {
        let expected = [
            "Non Demented",
            "Very Mild Demented",
            "Mild Demented",
            "Moderate Demented",
        ];
        for (index, label) in expected.iter().enumerate() {
            let diagnosis = Diagnosis::from_repr(index).unwrap();
            assert_eq!(diagnosis.to_string(), *label);
        }
        assert!(Diagnosis::from_repr(Diagnosis::COUNT).is_none());
    }

    #[test]
    fn metrics_strategy_parses_from_query_values() {
        assert_eq!(
            MetricsStrategy::from_str("synthetic").unwrap(),
            MetricsStrategy::Synthetic
        );
        assert_eq!(
            MetricsStrategy::from_str("computed").unwrap(),
            MetricsStrategy::Computed
        );
        assert!(MetricsStrategy::from_str("exact").is_err());
    }

    #[test]
    fn result_record_serializes_with_stored_field_names() {
        let record = ResultRecord {
            result: "Mild Demented".to_string(),
            f1_score: 0.61,
            accuracy: 88.4,
            precision: 0.7,
            recall: 0.5,
            image_path: "/static/abc.png".to_string(),
            created_at: "2026-08-06".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for key in [
            "result",
            "f1_score",
            "accuracy",
            "precision",
            "recall",
            "image_path",
            "created_at",
        ] {
            assert!(keys.contains(&key), "missing stored field {key}");
        }
        assert_eq!(value["result"], "Mild Demented");
        assert_eq!(value["created_at"], "2026-08-06");
    }
}
