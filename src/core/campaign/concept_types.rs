//! Concept Type Definitions
//!
//! A concept is one candidate creative direction returned by the concept
//! collaborator: tagline, big idea, recommended channels, and a set of
//! suggested deliverable templates the player can expand into real work.
//!
//! Collaborator payloads are never trusted directly: every enum field goes
//! through the closed-set decode in `deliverable_types`, numbers are
//! clamped, and a concept missing its core fields is dropped rather than
//! crashing the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::deliverable_types::{DeliverableType, Platform};

// ============================================================================
// Types
// ============================================================================

/// Template for one deliverable suggested by a concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedDeliverable {
    pub deliverable_type: DeliverableType,
    pub platform: Platform,
    /// How many of this asset to produce (clamped to 1..=5 on decode).
    pub quantity: u32,
    pub description: String,
}

/// One candidate creative direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    /// Deterministic id: `{campaignId}-c{index}`.
    pub id: String,
    pub name: String,
    pub tagline: String,
    /// The big-idea paragraph.
    pub big_idea: String,
    pub recommended_channels: Vec<String>,
    pub suggested_deliverables: Vec<SuggestedDeliverable>,
    pub tone: String,
    pub rationale: String,
    /// How daring the direction is, 0.0 (safe) to 1.0 (wild). Weighs viral
    /// event probability and backlash risk.
    pub boldness: f64,
}

impl Concept {
    /// Render the concept as prompt context for deliverable generation.
    pub fn prompt_block(&self) -> String {
        format!(
            "Concept: {}\nTagline: {}\nBig idea: {}\nTone: {}",
            self.name, self.tagline, self.big_idea, self.tone
        )
    }
}

// ============================================================================
// Wire Decoding
// ============================================================================

/// Decode one concept from a collaborator JSON object.
///
/// Returns `None` when the object is unusable (missing name or no valid
/// deliverable templates); soft fields fall back to defaults.
pub fn concept_from_wire(value: &Value, id: impl Into<String>) -> Option<Concept> {
    let name = value.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    let suggested_deliverables = value
        .get("suggestedDeliverables")
        .or_else(|| value.get("deliverables"))
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(suggested_deliverable_from_wire)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if suggested_deliverables.is_empty() {
        log::warn!("Concept {name:?} arrived with no usable deliverable templates — dropped");
        return None;
    }

    let recommended_channels = value
        .get("recommendedChannels")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|c| c.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let boldness = value
        .get("boldness")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    Some(Concept {
        id: id.into(),
        name: name.to_string(),
        tagline: str_field(value, "tagline"),
        big_idea: str_field(value, "bigIdea"),
        recommended_channels,
        suggested_deliverables,
        tone: str_field(value, "tone"),
        rationale: str_field(value, "rationale"),
        boldness,
    })
}

fn suggested_deliverable_from_wire(value: &Value) -> Option<SuggestedDeliverable> {
    let type_str = value.get("type")?.as_str()?;
    let platform_str = value
        .get("platform")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let quantity = value
        .get("quantity")
        .and_then(|v| v.as_u64())
        .unwrap_or(1)
        .clamp(1, 5) as u32;

    Some(SuggestedDeliverable {
        deliverable_type: DeliverableType::from_wire(type_str),
        platform: Platform::from_wire(platform_str),
        quantity,
        description: str_field(value, "description"),
    })
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
