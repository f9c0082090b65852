//! Mnemos Common - inference gateway adapter and chat core for Mnemos
//!
//! Talks to the external analysis service (scan images and biomarker
//! vectors), normalizes its drifting response shapes into one
//! [`AnalysisResult`], and keeps the append-only chat the client renders.
//! Sign-in against the general backend lives in [`api_client`].

pub mod analysis;
pub mod api_client;
pub mod biomarkers;
pub mod chat;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod paths;
pub mod render;
pub mod session;
pub mod severity;
pub mod upload;

pub use analysis::{format_percent, normalize, AnalysisResult, RawConfidence};
pub use biomarkers::BiomarkerPanel;
pub use chat::{ChatMessage, ChatSession, Conversation, SendOutcome, Sender};
pub use config::MnemosConfig;
pub use error::GatewayError;
pub use gateway::{HttpInferenceGateway, InferenceGateway, UpstreamHealth};
pub use session::{Credentials, SessionContext, SessionStore, UserContext};
pub use severity::SeverityTier;
pub use upload::ImageUpload;
