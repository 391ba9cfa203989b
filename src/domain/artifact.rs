//! Artifacts produced by generation units, and the final run result.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two renderings produced for every proposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewKind {
    /// Top-down, front-facing product shot
    Flat,

    /// Oblique view showing thickness and relief
    ThreeQuarter,
}

impl ViewKind {
    /// Name used in progress events and file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::ThreeQuarter => "threeQuarter",
        }
    }

}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Files saved for one successful (view, proposition) unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub view_kind: ViewKind,

    /// 1-based proposition number
    pub proposition_index: u32,

    /// File names relative to the job folder, in provider order
    pub saved_file_names: Vec<String>,
}

impl GeneratedArtifact {
    pub fn new(view_kind: ViewKind, proposition_index: u32, saved_file_names: Vec<String>) -> Self {
        Self {
            view_kind,
            proposition_index,
            saved_file_names,
        }
    }
}

/// A downloadable file of the result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLink {
    pub file_name: String,
    pub access_url: String,
}

/// Summary handed back to the caller once the run is over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// True iff at least one artifact was produced
    pub succeeded: bool,

    /// Job folder name under the output root
    pub output_id: String,

    pub artifacts: Vec<ArtifactLink>,

    pub summary_message: String,
}
