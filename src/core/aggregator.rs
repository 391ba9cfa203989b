//! Result aggregation.

use crate::domain::{ArtifactLink, GeneratedArtifact, GenerationResult};

/// Default URL under which job files are served
pub const DEFAULT_ACCESS_URL_TEMPLATE: &str = "/outputs/{output_id}/{file_name}";

/// Summary used when a run produced nothing
pub const NOTHING_GENERATED_MESSAGE: &str =
    "No image could be generated. The image provider may be unavailable, please try again later.";

/// Turns saved artifacts into the caller-facing result
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    url_template: String,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_ACCESS_URL_TEMPLATE)
    }
}

impl ResultAggregator {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
        }
    }

    pub fn access_url(&self, output_id: &str, file_name: &str) -> String {
        self.url_template
            .replace("{output_id}", output_id)
            .replace("{file_name}", file_name)
    }

    /// Flatten artifacts into links; never fails
    ///
    /// The run counts as successful only when at least one file name
    /// survives flattening.
    pub fn aggregate(
        &self,
        artifacts: &[GeneratedArtifact],
        event_label: &str,
        output_id: &str,
    ) -> GenerationResult {
        let links: Vec<ArtifactLink> = artifacts
            .iter()
            .flat_map(|a| a.saved_file_names.iter())
            .map(|file_name| ArtifactLink {
                file_name: file_name.clone(),
                access_url: self.access_url(output_id, file_name),
            })
            .collect();

        let succeeded = !links.is_empty();
        let summary_message = if succeeded {
            format!("Generated {} image(s) for '{}'", links.len(), event_label)
        } else {
            NOTHING_GENERATED_MESSAGE.to_string()
        };

        GenerationResult {
            succeeded,
            output_id: output_id.to_string(),
            artifacts: links,
            summary_message,
        }
    }
}
