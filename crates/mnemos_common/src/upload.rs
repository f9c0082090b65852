//! Scan uploads and the staging area that holds them until a message is sent

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Accepted extensions and their MIME types
const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("dcm", "application/dicom"),
    ("dicom", "application/octet-stream"),
];

/// A scan file ready to be sent to the image endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// What a chat message remembers about an attached file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub size_bytes: u64,
}

impl ImageUpload {
    /// Build an upload from in-memory bytes, checking the file type
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let mime = mime_for(&file_name).ok_or_else(|| {
            GatewayError::InvalidInput(format!(
                "{} is not a supported scan (DICOM, JPEG, PNG or GIF)",
                file_name
            ))
        })?;

        Ok(Self {
            file_name,
            mime: mime.to_string(),
            bytes,
        })
    }

    /// Read a scan from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| GatewayError::InvalidInput(format!("bad file path: {}", path.display())))?
            .to_string();

        // Check the type before reading a possibly large file
        if mime_for(&file_name).is_none() {
            return Self::new(file_name, Vec::new());
        }

        let bytes = std::fs::read(path)?;
        Self::new(file_name, bytes)
    }

    pub fn attachment(&self) -> Attachment {
        Attachment {
            file_name: self.file_name.clone(),
            mime: self.mime.clone(),
            size_bytes: self.bytes.len() as u64,
        }
    }
}

/// MIME type for an accepted file name, `None` if the type is not accepted
pub fn mime_for(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_lowercase();
    ACCEPTED_TYPES
        .iter()
        .find(|(accepted, _)| *accepted == ext)
        .map(|(_, mime)| *mime)
}

/// Files waiting to be sent with the next message
#[derive(Debug, Default)]
pub struct StagedUploads {
    files: Vec<ImageUpload>,
}

impl StagedUploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, upload: ImageUpload) {
        self.files.push(upload);
    }

    /// Remove by position; out-of-range indexes are ignored
    pub fn remove(&mut self, index: usize) -> Option<ImageUpload> {
        if index < self.files.len() {
            Some(self.files.remove(index))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.file_name.as_str()).collect()
    }

    /// Empty the stage, returning files in the order they were staged
    pub fn drain(&mut self) -> Vec<ImageUpload> {
        std::mem::take(&mut self.files)
    }
}
