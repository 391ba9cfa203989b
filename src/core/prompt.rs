//! Prompt construction.
//!
//! Everything here is pure: the same inputs always produce the same text.

use crate::domain::{GenerationRequest, ViewKind};

/// Composition instructions for the top-down view
pub const FLAT_INSTRUCTIONS: &str = "\
Render the product as a flat, top-down view: camera perpendicular to the front face, \
centred composition, even studio lighting, plain light-grey background, \
no perspective distortion, the whole object visible with a small margin around it.";

/// Composition instructions for the oblique view
pub const THREE_QUARTER_INSTRUCTIONS: &str = "\
Render the product from a three-quarter angle, about 30 degrees above and 45 degrees \
to the side, so that its thickness and engraved relief are clearly visible. \
Use soft directional lighting, a realistic contact shadow under the object \
and a plain light-grey background.";

/// Instruction used to re-render a generated flat view at an oblique angle
pub const THREE_QUARTER_FROM_FLAT: &str = "\
The attached image is the exact design to reproduce. Render this same product \
from a three-quarter angle, about 30 degrees above and 45 degrees to the side. \
Keep every detail identical: outline, text, motifs, colours and materials. \
Show the thickness of the piece, the volume of the engraved relief and a soft, \
realistic shadow on a plain light-grey background.";

/// Creative directions, cycled across propositions: (name, guidance)
pub const CONCEPT_DIRECTIONS: [(&str, &str); 3] = [
    (
        "Classic prestige",
        "timeless elegance, clean lines, noble woods such as walnut or oak, \
         optional gold or silver UV accents",
    ),
    (
        "Bold contemporary",
        "an unexpected silhouette, vivid UV colour fields and a striking graphic layout",
    ),
    (
        "Nature essence",
        "a link to the landscape of the event, pale raw woods such as birch or maple, \
         visible grain and a natural finish",
    ),
];

/// Direction for a 0-based variation index
pub fn concept_direction(variation_index: u32) -> (&'static str, &'static str) {
    CONCEPT_DIRECTIONS[variation_index as usize % CONCEPT_DIRECTIONS.len()]
}

/// Build the final instruction text for one unit.
///
/// The variation marker embeds `variation_index + 1`, so two prompts for the
/// same description and view never collide across propositions, even once
/// the creative directions wrap around.
pub fn build_prompt(base_description: &str, view_kind: ViewKind, variation_index: u32) -> String {
    let instructions = match view_kind {
        ViewKind::Flat => FLAT_INSTRUCTIONS,
        ViewKind::ThreeQuarter => THREE_QUARTER_INSTRUCTIONS,
    };
    let (direction, guidance) = concept_direction(variation_index);

    format!(
        "{base_description}\n\n{instructions}\n\n\
         Variation #{} ({direction}): {guidance}. Make this proposition clearly \
         distinct from the other variations in layout, motifs and ornamentation \
         while respecting the brief.",
        u64::from(variation_index) + 1
    )
}

/// Fixed prompt for the oblique view seeded with the flat result
pub fn three_quarter_from_flat_prompt() -> &'static str {
    THREE_QUARTER_FROM_FLAT
}

/// Base description shared by every unit of a run.
///
/// Combines the event label, the brief and the decoded text of any `text/*`
/// supplementary file.
pub fn enrich_description(request: &GenerationRequest) -> String {
    let mut text = format!(
        "Event: {}\n\n{}",
        request.event_label.trim(),
        request.description.trim()
    );

    let notes: Vec<String> = request
        .supplementary_files
        .iter()
        .filter(|f| f.is_text())
        .map(|f| {
            format!(
                "--- {} ---\n{}",
                f.name,
                String::from_utf8_lossy(&f.content).trim()
            )
        })
        .collect();

    if !notes.is_empty() {
        text.push_str("\n\nNotes:\n");
        text.push_str(&notes.join("\n"));
    }

    text
}
