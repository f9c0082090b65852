//! Inference gateway - client for the external analysis service
//!
//! Endpoints used:
//! - POST /predictMRI - scan image, multipart field `file`
//! - POST /predictBIO - biomarker vector, JSON `{"features": [...]}`
//! - GET  /health     - liveness, diagnostics only
//!
//! Every successful reply goes through [`crate::analysis::normalize`], so
//! callers never see which upstream version answered.
//! No retries and no caching: one request, one fixed timeout.

use crate::analysis::{normalize, AnalysisResult};
use crate::biomarkers::BiomarkerPanel;
use crate::config::InferenceSettings;
use crate::error::{upstream_reason, GatewayError, Result};
use crate::upload::ImageUpload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const IMAGE_PATH: &str = "/predictMRI";
const FEATURES_PATH: &str = "/predictBIO";
const HEALTH_PATH: &str = "/health";

/// Liveness report for the inference service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamHealth {
    /// Whether the service answered at all
    pub reachable: bool,
    /// Status text reported by the service
    pub status: Option<String>,
    /// Whether the service says its models are loaded
    pub models_loaded: Option<bool>,
    /// Round trip in milliseconds (0 when unreachable)
    pub latency_ms: u64,
    /// Failure description when not reachable or not healthy
    pub error: Option<String>,
}

/// Analysis operations the chat needs from the inference service
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Classify a single scan image
    async fn analyze_image(&self, upload: &ImageUpload) -> Result<AnalysisResult>;

    /// Classify a biomarker vector
    async fn analyze_features(&self, panel: &BiomarkerPanel) -> Result<AnalysisResult>;

    /// Check liveness; never fails, unreachable is reported in the result
    async fn health_check(&self) -> UpstreamHealth;
}

/// Gateway over HTTP
pub struct HttpInferenceGateway {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpInferenceGateway {
    pub fn new(settings: &InferenceSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout_secs: settings.timeout_secs,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check status, then normalize the JSON body
    async fn read_result(&self, response: reqwest::Response) -> Result<AnalysisResult> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_reason(&body);
            warn!(status = status.as_u16(), %message, "inference request rejected");
            return Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::from_transport(e, self.timeout_secs))?;

        normalize(&payload).map_err(|e| {
            warn!(error = %e, "could not normalize inference response");
            e
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> GatewayError {
        let err = GatewayError::from_transport(err, self.timeout_secs);
        warn!(error = %err, base_url = %self.base_url, "inference service unavailable");
        err
    }
}

#[async_trait]
impl InferenceGateway for HttpInferenceGateway {
    async fn analyze_image(&self, upload: &ImageUpload) -> Result<AnalysisResult> {
        debug!(file = %upload.file_name, bytes = upload.bytes.len(), "sending scan");

        let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime)
            .map_err(|e| GatewayError::InvalidInput(format!("bad MIME type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(IMAGE_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.read_result(response).await
    }

    async fn analyze_features(&self, panel: &BiomarkerPanel) -> Result<AnalysisResult> {
        let features = panel.to_vector();
        debug!(?features, "sending biomarker vector");

        let response = self
            .client
            .post(self.url(FEATURES_PATH))
            .json(&serde_json::json!({ "features": features }))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.read_result(response).await
    }

    async fn health_check(&self) -> UpstreamHealth {
        let started = Instant::now();

        let response = match self.client.get(self.url(HEALTH_PATH)).send().await {
            Ok(r) => r,
            Err(e) => {
                return UpstreamHealth {
                    error: Some(GatewayError::from_transport(e, self.timeout_secs).to_string()),
                    ..Default::default()
                }
            }
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        let status_code = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        UpstreamHealth {
            reachable: true,
            status: body.get("status").and_then(Value::as_str).map(String::from),
            models_loaded: body.get("models_loaded").and_then(Value::as_bool),
            latency_ms,
            error: (!status_code.is_success()).then(|| format!("HTTP {}", status_code)),
        }
    }
}

// ============================================================================
// Fake gateway for tests and offline demos
// ============================================================================

/// Scripted reply for [`FakeInferenceGateway`]
#[derive(Debug, Clone)]
pub enum FakeReply {
    /// Raw upstream payload, normalized like a real response
    Payload(Value),
    /// Transport failure
    Unavailable,
    /// Non-2xx status with a reason
    Status(u16, String),
}

/// Request recorded by [`FakeInferenceGateway`]
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
    Image(String),
    Features(Vec<f64>),
    Health,
}

/// Gateway that replays scripted replies.
///
/// Replies are consumed in order; the last one repeats.
pub struct FakeInferenceGateway {
    replies: Mutex<Vec<FakeReply>>,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeInferenceGateway {
    pub fn new(replies: Vec<FakeReply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same payload
    pub fn always(payload: Value) -> Self {
        Self::new(vec![FakeReply::Payload(payload)])
    }

    /// Always fail as if the service were down
    pub fn unavailable() -> Self {
        Self::new(vec![FakeReply::Unavailable])
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    fn record(&self, call: FakeCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn next_reply(&self) -> Result<AnalysisResult> {
        let reply = {
            let mut replies = self
                .replies
                .lock()
                .map_err(|_| GatewayError::Network("fake gateway poisoned".into()))?;
            match replies.len() {
                0 => None,
                1 => replies.first().cloned(),
                _ => Some(replies.remove(0)),
            }
        };

        match reply {
            Some(FakeReply::Payload(payload)) => normalize(&payload),
            Some(FakeReply::Status(status, message)) => {
                Err(GatewayError::UpstreamStatus { status, message })
            }
            Some(FakeReply::Unavailable) | None => {
                Err(GatewayError::Network("connection refused".into()))
            }
        }
    }
}

#[async_trait]
impl InferenceGateway for FakeInferenceGateway {
    async fn analyze_image(&self, upload: &ImageUpload) -> Result<AnalysisResult> {
        self.record(FakeCall::Image(upload.file_name.clone()));
        self.next_reply()
    }

    async fn analyze_features(&self, panel: &BiomarkerPanel) -> Result<AnalysisResult> {
        self.record(FakeCall::Features(panel.to_vector().to_vec()));
        self.next_reply()
    }

    async fn health_check(&self) -> UpstreamHealth {
        self.record(FakeCall::Health);
        UpstreamHealth {
            reachable: true,
            status: Some("fake".into()),
            models_loaded: Some(true),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn panel() -> BiomarkerPanel {
        BiomarkerPanel::from_slice(&[0.0, 65.0, 12.0, 2.0, 28.0, 1500.0, 0.8]).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let settings = InferenceSettings {
            base_url: "http://localhost:5001/".into(),
            timeout_secs: 5,
        };
        let gateway = HttpInferenceGateway::new(&settings).unwrap();
        assert_eq!(gateway.url(FEATURES_PATH), "http://localhost:5001/predictBIO");
    }

    #[tokio::test]
    async fn test_fake_replays_in_order_then_repeats_last() {
        let gateway = FakeInferenceGateway::new(vec![
            FakeReply::Payload(json!({"prediction": "No Impairment", "confidence": 0.9})),
            FakeReply::Status(400, "Expected 7 features".into()),
        ]);

        let first = gateway.analyze_features(&panel()).await.unwrap();
        assert_eq!(first.predicted_label, "No Impairment");

        for _ in 0..2 {
            let err = gateway.analyze_features(&panel()).await.unwrap_err();
            assert!(matches!(err, GatewayError::UpstreamStatus { status: 400, .. }));
        }
        assert_eq!(gateway.call_count(), 3);
    }

    #[tokio::test]
    async fn test_fake_records_calls() {
        let gateway = FakeInferenceGateway::unavailable();
        let upload = ImageUpload::new("scan.png", vec![0]).unwrap();

        assert!(gateway.analyze_image(&upload).await.unwrap_err().is_unavailable());
        let _ = gateway.analyze_features(&panel()).await;
        let health = gateway.health_check().await;

        assert!(health.reachable);
        assert_eq!(
            gateway.calls(),
            vec![
                FakeCall::Image("scan.png".into()),
                FakeCall::Features(vec![0.0, 65.0, 12.0, 2.0, 28.0, 1500.0, 0.8]),
                FakeCall::Health,
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_health_is_not_an_error() {
        let settings = InferenceSettings {
            // Port 9 (discard) on localhost is closed in test environments
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
        };
        let gateway = HttpInferenceGateway::new(&settings).unwrap();
        let health = gateway.health_check().await;
        assert!(!health.reachable);
        assert!(health.error.is_some());
    }
}
