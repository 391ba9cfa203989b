//! Generation requests.
//!
//! A request is created per invocation and consumed entirely by one
//! pipeline run.

use serde::{Deserialize, Serialize};

use crate::core::GenerationError;

/// A reference picture supplied by the client (logo, sketch, previous medal)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    /// Display name, usually the uploaded file name
    pub name: String,

    /// Raw image bytes
    #[serde(skip)]
    pub data: Vec<u8>,

    /// IANA media type (e.g. "image/png")
    pub mime_type: String,
}

impl ReferenceImage {
    pub fn new(name: impl Into<String>, data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data,
            mime_type: mime_type.into(),
        }
    }
}

/// An extra file attached to the request (brief, notes, mood board)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplementaryFile {
    /// Original file name
    pub name: String,

    /// File content
    #[serde(skip)]
    pub content: Vec<u8>,

    /// IANA media type
    pub media_type: String,
}

impl SupplementaryFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content,
            media_type: media_type.into(),
        }
    }

    /// Whether the file is an image that can be forwarded to the provider
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// Whether the file is plain text that can be folded into the prompt
    pub fn is_text(&self) -> bool {
        self.media_type.starts_with("text/")
    }
}

/// Everything needed for one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Event the medal is designed for (e.g. "Ultra Trail des Volcans 2026")
    pub event_label: String,

    /// Reference pictures, in upload order
    #[serde(default)]
    pub reference_images: Vec<ReferenceImage>,

    /// Supplementary files, in upload order
    #[serde(default)]
    pub supplementary_files: Vec<SupplementaryFile>,

    /// Free-form design brief
    pub description: String,
}

impl GenerationRequest {
    /// Create a request with no attachments
    pub fn new(event_label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            event_label: event_label.into(),
            reference_images: Vec::new(),
            supplementary_files: Vec::new(),
            description: description.into(),
        }
    }

    /// Attach a reference image
    pub fn with_reference(mut self, image: ReferenceImage) -> Self {
        self.reference_images.push(image);
        self
    }

    /// Attach a supplementary file
    pub fn with_file(mut self, file: SupplementaryFile) -> Self {
        self.supplementary_files.push(file);
        self
    }

    /// Check request invariants before any remote call is made
    pub fn validate(&self, max_reference_images: usize) -> Result<(), GenerationError> {
        if self.description.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "description cannot be empty".to_string(),
            ));
        }

        if self.reference_images.len() > max_reference_images {
            return Err(GenerationError::InvalidRequest(format!(
                "too many reference images: {} > {}",
                self.reference_images.len(),
                max_reference_images
            )));
        }

        Ok(())
    }
}
