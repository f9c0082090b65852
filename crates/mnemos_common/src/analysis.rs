//! Analysis results and response normalization
//!
//! The inference service has shipped two response shapes without a version
//! flag:
//!
//! ```text
//! { "prediction": "Mild Impairment", "confidence": 0.852,
//!   "all_scores": { "Mild Impairment": 0.852, ... } }
//!
//! { "predicted_class": "Mild Impairment", "confidence": "85.2%",
//!   "interpretation": { "Mild Impairment": "85.2%", ... } }
//! ```
//!
//! Shape detection happens once, at parse time, through [`RawConfidence`].
//! Everything downstream only sees [`AnalysisResult`], whose confidences are
//! always fractions in [0,1].

use crate::error::{GatewayError, Result};
use crate::severity::SeverityTier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-class breakdown field names, in lookup order
const SCORE_FIELDS: &[&str] = &["all_scores", "interpretation"];

/// Confidence as the upstream encoded it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawConfidence {
    /// Already a 0-1 fraction, e.g. `0.852`
    Fraction(f64),
    /// Percentage string, e.g. `"85.2%"`
    Percentage(String),
}

impl RawConfidence {
    /// Convert to a fraction in [0,1]
    pub fn to_fraction(&self) -> Result<f64> {
        let value = match self {
            RawConfidence::Fraction(f) => *f,
            RawConfidence::Percentage(s) => {
                let trimmed = s.trim();
                let number = trimmed.strip_suffix('%').ok_or_else(|| {
                    GatewayError::Format(format!("expected a percentage string, got {:?}", s))
                })?;
                let parsed: f64 = number.trim().parse().map_err(|_| {
                    GatewayError::Format(format!("unparseable percentage {:?}", s))
                })?;
                parsed / 100.0
            }
        };

        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(GatewayError::Format(format!(
                "confidence {} is outside [0, 1]",
                value
            )));
        }

        Ok(value)
    }
}

/// Wire payload as returned by either upstream version
#[derive(Debug, Clone, Deserialize)]
struct RawAnalysisPayload {
    #[serde(default)]
    prediction: Option<String>,
    #[serde(default)]
    predicted_class: Option<String>,
    #[serde(default)]
    confidence: Option<RawConfidence>,
    #[serde(default)]
    mock: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Normalized analysis result, independent of the upstream version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Predicted class label, e.g. "Very Mild Impairment"
    pub predicted_label: String,

    /// Confidence of the predicted label, fraction in [0,1]
    pub confidence: f64,

    /// Per-class confidence, fraction in [0,1]
    #[serde(default)]
    pub class_scores: BTreeMap<String, f64>,

    /// Upstream marked this as a mock prediction
    #[serde(default)]
    pub mock: bool,

    /// Informational message from the upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnalysisResult {
    /// Confidence formatted for display ("85.2%")
    pub fn confidence_percent(&self) -> String {
        format_percent(self.confidence)
    }

    /// Presentation tier for the predicted label
    pub fn severity(&self) -> SeverityTier {
        SeverityTier::classify(&self.predicted_label)
    }

    /// Class scores sorted by confidence, highest first
    pub fn ranked_scores(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .class_scores
            .iter()
            .map(|(label, score)| (label.as_str(), *score))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// Format a fraction as a percentage with one decimal ("85.2%")
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Normalize a raw upstream payload into an [`AnalysisResult`]
pub fn normalize(payload: &Value) -> Result<AnalysisResult> {
    if !payload.is_object() {
        return Err(GatewayError::Format("response is not a JSON object".into()));
    }

    let raw: RawAnalysisPayload = serde_json::from_value(payload.clone())
        .map_err(|e| GatewayError::Format(e.to_string()))?;

    if let Some(err) = raw.error {
        return Err(GatewayError::Format(format!("upstream reported: {}", err)));
    }

    let predicted_label = [raw.prediction, raw.predicted_class]
        .into_iter()
        .flatten()
        .map(|label| label.trim().to_string())
        .find(|label| !label.is_empty())
        .ok_or_else(|| GatewayError::Format("missing prediction".into()))?;

    let class_scores = normalize_scores(payload)?;

    let confidence = match raw.confidence {
        Some(conf) => conf.to_fraction()?,
        None => *class_scores.get(&predicted_label).ok_or_else(|| {
            GatewayError::Format("missing confidence for predicted label".into())
        })?,
    };

    Ok(AnalysisResult {
        predicted_label,
        confidence,
        class_scores,
        mock: raw.mock.unwrap_or(false),
        message: raw.message,
    })
}

/// Build the per-class map from whichever breakdown field is present
fn normalize_scores(payload: &Value) -> Result<BTreeMap<String, f64>> {
    let breakdown = SCORE_FIELDS
        .iter()
        .find_map(|field| payload.get(*field).and_then(Value::as_object).map(|m| (*field, m)));

    let Some((field, entries)) = breakdown else {
        return Ok(BTreeMap::new());
    };
    debug!(field, classes = entries.len(), "normalizing class scores");

    entries
        .iter()
        .map(|(label, value)| {
            let raw: RawConfidence = serde_json::from_value(value.clone()).map_err(|_| {
                GatewayError::Format(format!("score for {:?} is neither number nor string", label))
            })?;
            Ok((label.clone(), raw.to_fraction()?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_percentage_string_divided_by_100() {
        let raw = RawConfidence::Percentage("85.2%".into());
        assert!(close(raw.to_fraction().unwrap(), 0.852));

        let spaced = RawConfidence::Percentage(" 40 % ".into());
        assert!(close(spaced.to_fraction().unwrap(), 0.40));
    }

    #[test]
    fn test_fraction_is_identity() {
        for v in [0.0, 0.25, 0.852, 1.0] {
            assert!(close(RawConfidence::Fraction(v).to_fraction().unwrap(), v));
        }
    }

    #[test]
    fn test_rejects_out_of_range_and_garbage() {
        assert!(RawConfidence::Fraction(1.5).to_fraction().is_err());
        assert!(RawConfidence::Fraction(-0.1).to_fraction().is_err());
        assert!(RawConfidence::Percentage("120%".into()).to_fraction().is_err());
        assert!(RawConfidence::Percentage("high".into()).to_fraction().is_err());
        assert!(RawConfidence::Percentage("0.85".into()).to_fraction().is_err());
    }

    #[test]
    fn test_shape_detected_at_parse_time() {
        let frac: RawConfidence = serde_json::from_value(json!(0.5)).unwrap();
        assert_eq!(frac, RawConfidence::Fraction(0.5));

        let int: RawConfidence = serde_json::from_value(json!(1)).unwrap();
        assert_eq!(int, RawConfidence::Fraction(1.0));

        let pct: RawConfidence = serde_json::from_value(json!("50%")).unwrap();
        assert_eq!(pct, RawConfidence::Percentage("50%".into()));
    }

    #[test]
    fn test_normalize_fraction_shape() {
        let payload = json!({
            "prediction": "Very Mild Impairment",
            "confidence": 0.61,
            "all_scores": {
                "No Impairment": 0.2,
                "Very Mild Impairment": 0.61,
                "Mild Impairment": 0.15,
                "Moderate Impairment": 0.04
            },
            "status": "success"
        });

        let result = normalize(&payload).unwrap();
        assert_eq!(result.predicted_label, "Very Mild Impairment");
        assert!(close(result.confidence, 0.61));
        assert_eq!(result.class_scores.len(), 4);
        assert!(close(result.class_scores["Moderate Impairment"], 0.04));
        assert!(!result.mock);
    }

    #[test]
    fn test_normalize_percentage_shape() {
        let payload = json!({
            "predicted_class": "Mild Impairment",
            "confidence": "85.2%",
            "interpretation": {
                "Mild Impairment": "85.2%",
                "No Impairment": "10%",
                "Moderate Impairment": "4.8%"
            }
        });

        let result = normalize(&payload).unwrap();
        assert_eq!(result.predicted_label, "Mild Impairment");
        assert!(close(result.confidence, 0.852));

        let keys: Vec<&str> = result.class_scores.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Mild Impairment", "Moderate Impairment", "No Impairment"]);
        assert!(close(result.class_scores["No Impairment"], 0.10));
        assert!(close(result.class_scores["Moderate Impairment"], 0.048));
    }

    #[test]
    fn test_all_scores_preferred_over_interpretation() {
        let payload = json!({
            "prediction": "No Impairment",
            "confidence": 0.9,
            "all_scores": { "No Impairment": 0.9, "Mild Impairment": 0.1 },
            "interpretation": "Low likelihood of cognitive decline"
        });

        let result = normalize(&payload).unwrap();
        assert_eq!(result.class_scores.len(), 2);
    }

    #[test]
    fn test_confidence_derived_from_scores_when_missing() {
        let payload = json!({
            "prediction": "Mild Impairment",
            "all_scores": { "Mild Impairment": "70%", "No Impairment": "30%" }
        });

        let result = normalize(&payload).unwrap();
        assert!(close(result.confidence, 0.70));
    }

    #[test]
    fn test_missing_fields_are_format_errors() {
        let no_label = json!({ "confidence": 0.5 });
        assert!(matches!(normalize(&no_label), Err(GatewayError::Format(_))));

        let blank_label = json!({ "prediction": "  ", "confidence": 0.5 });
        assert!(matches!(normalize(&blank_label), Err(GatewayError::Format(_))));

        // mock server reply shape
        let no_confidence = json!({
            "prediction": "Mild Impairment",
            "mock": true,
            "message": "Mock prediction (model not loaded)"
        });
        assert!(matches!(normalize(&no_confidence), Err(GatewayError::Format(_))));

        let not_object = json!(["Mild Impairment", 0.5]);
        assert!(matches!(normalize(&not_object), Err(GatewayError::Format(_))));
    }

    #[test]
    fn test_blank_prediction_falls_back_to_predicted_class() {
        let payload = json!({
            "prediction": "",
            "predicted_class": "Mild Impairment",
            "confidence": "61.0%"
        });
        let result = normalize(&payload).unwrap();
        assert_eq!(result.predicted_label, "Mild Impairment");
        assert!(close(result.confidence, 0.61));
    }

    #[test]
    fn test_null_mock_flag_is_false() {
        let payload = json!({
            "prediction": "No Impairment",
            "confidence": 0.9,
            "mock": null,
            "message": null
        });
        let result = normalize(&payload).unwrap();
        assert!(!result.mock);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_upstream_error_field() {
        let payload = json!({ "error": "Invalid features provided. Expected 7 features." });
        let err = normalize(&payload).unwrap_err();
        assert!(err.to_string().contains("Expected 7 features"));
    }

    #[test]
    fn test_bad_score_entry_fails_whole_result() {
        let payload = json!({
            "prediction": "Mild Impairment",
            "confidence": 0.8,
            "all_scores": { "Mild Impairment": 0.8, "No Impairment": null }
        });
        assert!(normalize(&payload).is_err());
    }

    #[test]
    fn test_mock_flag_and_message_carried() {
        let payload = json!({
            "prediction": "No Impairment",
            "confidence": 1,
            "mock": true,
            "message": "This is a mock response."
        });

        let result = normalize(&payload).unwrap();
        assert!(result.mock);
        assert_eq!(result.message.as_deref(), Some("This is a mock response."));
        assert!(close(result.confidence, 1.0));
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.852), "85.2%");
        assert_eq!(format_percent(1.0), "100.0%");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_percent(0.0449), "4.5%");
    }

    #[test]
    fn test_ranked_scores_descending() {
        let payload = json!({
            "prediction": "Mild Impairment",
            "confidence": 0.5,
            "all_scores": { "A": 0.1, "Mild Impairment": 0.5, "C": 0.4 }
        });
        let result = normalize(&payload).unwrap();
        let ranked: Vec<&str> = result.ranked_scores().into_iter().map(|(l, _)| l).collect();
        assert_eq!(ranked, vec!["Mild Impairment", "C", "A"]);
    }
}
