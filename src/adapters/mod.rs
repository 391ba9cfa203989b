//! Adapter interfaces for external systems.
//!
//! Adapters provide a unified interface for the remote image model. The
//! pipeline only ever talks to [`ImageGenerator`]; authentication, model
//! selection and response modalities are the adapter's concern.

pub mod gemini;

use anyhow::Result;
use async_trait::async_trait;

// Re-export the Gemini adapter
pub use gemini::{GeminiConfig, GeminiGenerator};

/// A binary image, either sent to or returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    /// Raw image bytes
    pub data: Vec<u8>,

    /// IANA media type (e.g. "image/png")
    pub mime_type: String,
}

impl ImagePart {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// File extension matching the media type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

/// Output from a generation call
#[derive(Debug, Clone, Default)]
pub struct GeneratorResponse {
    /// Text commentary returned alongside the images
    pub text_parts: Vec<String>,

    /// Generated images, in provider order
    pub image_parts: Vec<ImagePart>,
}

impl GeneratorResponse {
    /// Check whether the provider returned at least one image
    pub fn has_images(&self) -> bool {
        !self.image_parts.is_empty()
    }
}

/// Trait for remote image generators
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Generate content from a prompt and zero or more input images
    ///
    /// Callers bound this with their own timeout; implementations must be
    /// cancel-safe, as the returned future may be dropped at any await point.
    async fn generate_content(
        &self,
        prompt: &str,
        image_parts: &[ImagePart],
    ) -> Result<GeneratorResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_mime() {
        assert_eq!(ImagePart::new(vec![], "image/jpeg").extension(), "jpg");
        assert_eq!(ImagePart::new(vec![], "image/webp").extension(), "webp");
        assert_eq!(ImagePart::new(vec![], "image/png").extension(), "png");
        assert_eq!(ImagePart::new(vec![], "application/octet-stream").extension(), "png");
    }

    #[test]
    fn test_has_images() {
        let mut response = GeneratorResponse::default();
        assert!(!response.has_images());

        response.image_parts.push(ImagePart::new(vec![1], "image/png"));
        assert!(response.has_images());
    }
}
