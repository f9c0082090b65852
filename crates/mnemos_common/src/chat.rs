//! Chat conversation and the send/submit flows
//!
//! The conversation is append-only: messages are never edited or removed.
//! The user's message is appended before the network call, and the reply
//! (result or error) is appended when the call finishes. Gateway errors
//! never escape a [`ChatSession`]; they become assistant messages.

use crate::analysis::AnalysisResult;
use crate::biomarkers::BiomarkerPanel;
use crate::gateway::InferenceGateway;
use crate::render;
use crate::upload::{Attachment, ImageUpload, StagedUploads};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// First message of every conversation
pub const GREETING: &str = "Hello! I'm here to help you understand your medical reports. \
You can upload MRI scans, submit biomarker values, or ask me questions about your health data.";

/// Reply to a text-only message
pub const TEXT_ONLY_REPLY: &str = "I understand your question. For a detailed analysis, \
attach an MRI scan or submit your biomarker values and I'll review them.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One chat message. Fields are read-only once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: Uuid,
    sender: Sender,
    text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analysis: Option<AnalysisResult>,
    created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn new(
        sender: Sender,
        text: String,
        attachments: Vec<Attachment>,
        analysis: Option<AnalysisResult>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text,
            attachments,
            analysis,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::new(Sender::User, text.into(), attachments, None)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text.into(), Vec::new(), None)
    }

    /// Assistant message embedding an analysis result
    pub fn analysis_reply(result: AnalysisResult) -> Self {
        let text = render::result_text(&result);
        Self::new(Sender::Assistant, text, Vec::new(), Some(result))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Ordered, append-only list of messages
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// New conversation opened by the greeting
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
        }
    }

    fn append(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Result of [`ChatSession::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty text and nothing staged: nothing appended, nothing sent
    Ignored,
    /// Messages were appended (user message included)
    Sent { appended: usize },
}

/// A chat view's state: conversation, staged files, and the gateway
pub struct ChatSession<G> {
    gateway: G,
    conversation: Conversation,
    staged: StagedUploads,
}

impl<G: InferenceGateway> ChatSession<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            conversation: Conversation::new(),
            staged: StagedUploads::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn staged(&self) -> &StagedUploads {
        &self.staged
    }

    pub fn stage_file(&mut self, upload: ImageUpload) {
        self.staged.stage(upload);
    }

    pub fn unstage(&mut self, index: usize) -> Option<ImageUpload> {
        self.staged.remove(index)
    }

    /// True when there is something to send
    pub fn can_send(&self, text: &str) -> bool {
        !text.trim().is_empty() || !self.staged.is_empty()
    }

    /// Send the typed text together with every staged file.
    ///
    /// Each staged scan is analyzed in staging order, one reply per scan.
    /// Text alone gets a guidance reply without any network call.
    pub async fn send(&mut self, text: &str) -> SendOutcome {
        if !self.can_send(text) {
            return SendOutcome::Ignored;
        }

        let uploads = self.staged.drain();
        let attachments = uploads.iter().map(ImageUpload::attachment).collect();
        let before = self.conversation.len();
        self.conversation
            .append(ChatMessage::user(text.trim(), attachments));

        if uploads.is_empty() {
            self.conversation.append(ChatMessage::assistant(TEXT_ONLY_REPLY));
        }

        for upload in &uploads {
            debug!(file = %upload.file_name, "analyzing staged scan");
            let reply = match self.gateway.analyze_image(upload).await {
                Ok(result) => ChatMessage::analysis_reply(result),
                Err(err) => ChatMessage::assistant(format!(
                    "{}: {}",
                    upload.file_name,
                    render::failure_text(&err)
                )),
            };
            self.conversation.append(reply);
        }

        SendOutcome::Sent {
            appended: self.conversation.len() - before,
        }
    }

    /// Submit biomarker values: one user message, exactly one reply
    pub async fn submit_biomarkers(&mut self, panel: &BiomarkerPanel) -> &ChatMessage {
        self.conversation
            .append(ChatMessage::user(panel.describe(), Vec::new()));

        let reply = match self.gateway.analyze_features(panel).await {
            Ok(result) => ChatMessage::analysis_reply(result),
            Err(err) => ChatMessage::assistant(render::failure_text(&err)),
        };

        self.conversation.append(reply)
    }
}
