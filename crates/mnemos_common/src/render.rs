//! Text rendering for chat messages and analysis results

use crate::analysis::{format_percent, AnalysisResult};
use crate::chat::{ChatMessage, Sender};
use crate::error::GatewayError;
use owo_colors::OwoColorize;
use std::io::IsTerminal;

/// Shown under every analysis result
pub const DISCLAIMER: &str =
    "This is an automated estimate, not a diagnosis. Please review it with a healthcare professional.";

const MOCK_NOTICE: &str = "Note: the analysis service returned a mock prediction.";

/// Assistant text for a normalized result
pub fn result_text(result: &AnalysisResult) -> String {
    let tier = result.severity();
    let mut lines = vec![
        format!("Prediction: {}", result.predicted_label),
        format!("Confidence: {}", result.confidence_percent()),
        format!("Severity: {} - {}", tier, tier.recommendation()),
    ];

    let ranked = result.ranked_scores();
    if !ranked.is_empty() {
        lines.push("Class breakdown:".to_string());
        for (label, score) in ranked {
            lines.push(format!("  {}: {}", label, format_percent(score)));
        }
    }

    if result.mock {
        lines.push(MOCK_NOTICE.to_string());
    }
    if let Some(message) = &result.message {
        lines.push(message.clone());
    }

    lines.push(DISCLAIMER.to_string());
    lines.join("\n")
}

/// Assistant text when an analysis could not be completed
pub fn failure_text(err: &GatewayError) -> String {
    format!("{} You can resubmit when ready.", err.user_message())
}

const DEFAULT_WIDTH: usize = 80;

/// Color only when `stream` is a terminal and `NO_COLOR` is unset
pub fn color_enabled(stream: &impl IsTerminal) -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    stream.is_terminal()
}

/// Apply `style` to `text` only when `color` is on
pub fn paint(color: bool, text: &str, style: impl FnOnce(&str) -> String) -> String {
    if color {
        style(text)
    } else {
        text.to_string()
    }
}

/// Terminal width and color settings for rendered messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: usize,
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            color: false,
        }
    }
}

impl RenderOptions {
    /// Width from `COLUMNS`, color from stdout
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|c| c.parse().ok())
            .filter(|w| *w >= 20)
            .unwrap_or(DEFAULT_WIDTH);

        Self {
            width,
            color: color_enabled(&std::io::stdout()),
        }
    }
}

fn human_size(bytes: u64) -> String {
    match bytes {
        b if b >= 1024 * 1024 => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
        b if b >= 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{} B", b),
    }
}

/// Render a message for the terminal
pub fn format_message(message: &ChatMessage, options: RenderOptions) -> String {
    let time = message
        .created_at()
        .with_timezone(&chrono::Local)
        .format("%H:%M");

    let header = match message.sender() {
        Sender::User => paint(options.color, &format!("[you {}]", time), |t| {
            t.bright_cyan().to_string()
        }),
        Sender::Assistant => paint(options.color, &format!("[mnemos {}]", time), |t| {
            t.bright_magenta().to_string()
        }),
    };

    let mut out = vec![header];

    for attachment in message.attachments() {
        let line = format!(
            "  + {} ({})",
            attachment.file_name,
            human_size(attachment.size_bytes)
        );
        out.push(paint(options.color, &line, |t| t.dimmed().to_string()));
    }

    let wrap_width = options.width.saturating_sub(2).max(20);
    for line in message.text().lines() {
        if line.is_empty() {
            out.push(String::new());
            continue;
        }
        for wrapped in textwrap::wrap(line, wrap_width) {
            out.push(format!("  {}", wrapped));
        }
    }

    if let Some(result) = message.analysis() {
        let tier = result.severity();
        let label = format!("{} severity", tier.as_str().to_uppercase());
        out.push(format!("  {}", tier.colorize(&label, options.color)));
    }

    out.join("\n")
}
