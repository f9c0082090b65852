//! Biomarker panel - the fixed-order feature vector for tabular analysis
//!
//! The model contract is seven features in this exact order:
//! `[gender, age, educ, ses, mmse, etiv, nwbv]`.
//!
//! Ranges below are form hints only. Out-of-range values produce warnings
//! and are still sent; the model contract owns validation.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};

/// Number of features the biomarker model expects
pub const FEATURE_COUNT: usize = 7;

/// Description of one input field
#[derive(Debug, Clone, Copy)]
pub struct FeatureSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Feature specs in model order
pub const FEATURES: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec { key: "gender", label: "Gender (0 = female, 1 = male)", min: 0.0, max: 1.0 },
    FeatureSpec { key: "age", label: "Age (years)", min: 18.0, max: 120.0 },
    FeatureSpec { key: "educ", label: "Education (years)", min: 0.0, max: 30.0 },
    FeatureSpec { key: "ses", label: "Socioeconomic status (1-5)", min: 1.0, max: 5.0 },
    FeatureSpec { key: "mmse", label: "MMSE score", min: 0.0, max: 30.0 },
    FeatureSpec { key: "etiv", label: "Estimated total intracranial volume", min: 1000.0, max: 2200.0 },
    FeatureSpec { key: "nwbv", label: "Normalized whole brain volume", min: 0.6, max: 0.9 },
];

/// Biomarker inputs for one analysis request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerPanel {
    pub gender: f64,
    pub age: f64,
    pub educ: f64,
    pub ses: f64,
    pub mmse: f64,
    pub etiv: f64,
    pub nwbv: f64,
}

impl BiomarkerPanel {
    /// Build from a vector in model order; the count must match exactly
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let [gender, age, educ, ses, mmse, etiv, nwbv]: [f64; FEATURE_COUNT] =
            values.try_into().map_err(|_| {
                GatewayError::InvalidInput(format!(
                    "expected {} biomarker values, got {}",
                    FEATURE_COUNT,
                    values.len()
                ))
            })?;

        // NaN and infinities serialize as JSON null
        if let Some((spec, value)) = FEATURES
            .iter()
            .zip(values)
            .find(|(_, value)| !value.is_finite())
        {
            return Err(GatewayError::InvalidInput(format!(
                "{} must be a finite number, got {}",
                spec.key, value
            )));
        }

        Ok(Self {
            gender,
            age,
            educ,
            ses,
            mmse,
            etiv,
            nwbv,
        })
    }

    /// Parse a comma-separated list, e.g. "0, 65, 12, 2, 28, 1500, 0.8"
    pub fn parse_csv(input: &str) -> Result<Self> {
        let values = input
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<f64>()
                    .map_err(|_| GatewayError::InvalidInput(format!("not a number: {:?}", part)))
            })
            .collect::<Result<Vec<f64>>>()?;

        Self::from_slice(&values)
    }

    /// Features in model order
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.gender,
            self.age,
            self.educ,
            self.ses,
            self.mmse,
            self.etiv,
            self.nwbv,
        ]
    }

    /// Hints for values outside the form ranges (never a rejection)
    pub fn range_warnings(&self) -> Vec<String> {
        FEATURES
            .iter()
            .zip(self.to_vector())
            .filter(|(spec, value)| !value.is_finite() || *value < spec.min || *value > spec.max)
            .map(|(spec, value)| {
                format!(
                    "{} = {} is outside the usual range {}-{}",
                    spec.label, value, spec.min, spec.max
                )
            })
            .collect()
    }

    /// Text for the user message that accompanies the request
    pub fn describe(&self) -> String {
        let mut text = String::from("Biomarker analysis request:");
        for (spec, value) in FEATURES.iter().zip(self.to_vector()) {
            text.push_str(&format!("\n  {}: {}", spec.label, value));
        }
        text
    }
}
