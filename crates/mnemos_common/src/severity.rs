//! Severity tiers for predicted labels
//!
//! NOTE: this is a presentation heuristic, not a clinical determination.
//! Tiers only pick a color and a recommended phrasing for a chat message.
//! They must never be read as a diagnosis or used to gate anything.

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Tier Colors (RGB tuples for true color terminals)
// ============================================================================

/// Low - green
pub const COLOR_LOW: (u8, u8, u8) = (50, 205, 50);

/// Medium - amber
pub const COLOR_MEDIUM: (u8, u8, u8) = (255, 191, 0);

/// High - red-orange
pub const COLOR_HIGH: (u8, u8, u8) = (255, 69, 0);

// ============================================================================
// Label Patterns (lowercase substrings)
// ============================================================================

const LOW_PATTERNS: &[&str] = &["no impairment", "non demented", "nondemented"];
const HIGH_PATTERNS: &[&str] = &["moderate", "severe"];

/// Presentation tier derived from a predicted label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Low,
    Medium,
    High,
}

impl SeverityTier {
    /// Classify a predicted label (case-insensitive substring match).
    ///
    /// Order matters: "no impairment" is checked before "mild" so that
    /// "Very Mild Impairment" and "No Impairment" never collide. Unknown
    /// labels are `Medium`.
    pub fn classify(label: &str) -> Self {
        let lower = label.to_lowercase();
        let has_any = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

        if has_any(LOW_PATTERNS) {
            SeverityTier::Low
        } else if has_any(HIGH_PATTERNS) {
            SeverityTier::High
        } else {
            // "mild" labels and anything unrecognized
            SeverityTier::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Low => "low",
            SeverityTier::Medium => "medium",
            SeverityTier::High => "high",
        }
    }

    /// Style class for rendering surfaces that theme by name
    pub fn color_class(&self) -> &'static str {
        match self {
            SeverityTier::Low => "severity-low",
            SeverityTier::Medium => "severity-medium",
            SeverityTier::High => "severity-high",
        }
    }

    /// RGB color for terminal output
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            SeverityTier::Low => COLOR_LOW,
            SeverityTier::Medium => COLOR_MEDIUM,
            SeverityTier::High => COLOR_HIGH,
        }
    }

    /// Recommended wording to accompany a result in this tier
    pub fn recommendation(&self) -> &'static str {
        match self {
            SeverityTier::Low => {
                "No significant signs were detected. Keep up regular check-ups."
            }
            SeverityTier::Medium => {
                "Some signs may be present. Consider discussing these results with your doctor."
            }
            SeverityTier::High => {
                "Notable signs were detected. Please consult a healthcare professional soon."
            }
        }
    }

    /// Tier color for terminal output; `text` unchanged when `color` is off
    pub fn colorize(&self, text: &str, color: bool) -> String {
        let (r, g, b) = self.color();
        crate::render::paint(color, text, |t| t.truecolor(r, g, b).bold().to_string())
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
