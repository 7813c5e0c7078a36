//! Concept Generator
//!
//! Drives the Brief/Concept collaborator: builds a prompt from the brief,
//! team, and strategic direction; decodes the JSON payload into structured
//! concepts. Malformed or empty payloads surface as retryable errors,
//! never a crash and never a partially stored list.

use std::sync::Arc;

use serde_json::Value;

use crate::core::campaign::brief_types::ClientBrief;
use crate::core::campaign::concept_types::{concept_from_wire, Concept};

use super::provider::{GenerationError, GenerationResult, TextGenService};

/// Generator for campaign concepts.
pub struct ConceptGenerator {
    text: Arc<dyn TextGenService>,
}

impl ConceptGenerator {
    pub fn new(text: Arc<dyn TextGenService>) -> Self {
        Self { text }
    }

    /// Generate 1+ concepts for a campaign. All-or-nothing: either a
    /// non-empty list comes back or an error does.
    pub async fn generate(
        &self,
        campaign_id: &str,
        brief: &ClientBrief,
        team: &[String],
        direction: &str,
    ) -> GenerationResult<Vec<Concept>> {
        let prompt = build_prompt(brief, team, direction);
        let raw = self.text.complete(&prompt).await?;
        let concepts = parse_concepts(&raw, campaign_id)?;

        log::info!(
            "Generated {} concept(s) for campaign {campaign_id}",
            concepts.len()
        );
        Ok(concepts)
    }
}

fn build_prompt(brief: &ClientBrief, team: &[String], direction: &str) -> String {
    let mut prompt = format!(
        "You are the creative department of an advertising agency. Produce 3 \
         distinct campaign concepts for the brief below.\n\n{}\n\nTeam on the \
         account: {}.",
        brief.prompt_block(),
        if team.is_empty() {
            "unassigned".to_string()
        } else {
            team.join(", ")
        }
    );
    if !direction.trim().is_empty() {
        prompt.push_str(&format!("\nStrategic direction from the lead: {direction}"));
    }
    prompt.push_str(
        "\n\nRespond with a JSON array. Each concept: {\"name\", \"tagline\", \
         \"bigIdea\", \"recommendedChannels\": [string], \"tone\", \"rationale\", \
         \"boldness\": 0.0-1.0, \"suggestedDeliverables\": [{\"type\", \"platform\", \
         \"quantity\", \"description\"}] with 3-6 entries}.",
    );
    prompt
}

/// Decode the collaborator payload. Concepts that fail the strict per-field
/// decode are dropped; zero surviving concepts is an error.
fn parse_concepts(raw: &str, campaign_id: &str) -> GenerationResult<Vec<Concept>> {
    let stripped = strip_code_fences(raw);
    let value: Value = serde_json::from_str(stripped)
        .map_err(|e| GenerationError::invalid(format!("Unparseable concept payload: {e}")))?;

    // Accept either a bare array or an object wrapping one.
    let items = value
        .as_array()
        .cloned()
        .or_else(|| value.get("concepts").and_then(|c| c.as_array()).cloned())
        .ok_or_else(|| GenerationError::invalid("Concept payload is not an array"))?;

    let concepts: Vec<Concept> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| concept_from_wire(item, format!("{campaign_id}-c{i}")))
        .collect();

    if concepts.is_empty() {
        return Err(GenerationError::empty("No usable concepts in payload"));
    }
    Ok(concepts)
}

/// LLM responses often arrive wrapped in a markdown code fence.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted text service returning queued responses.
    struct ScriptedText {
        responses: Mutex<Vec<GenerationResult<String>>>,
    }

    impl ScriptedText {
        fn new(responses: Vec<GenerationResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
            })
        }
    }

    #[async_trait]
    impl TextGenService for ScriptedText {
        async fn complete(&self, _prompt: &str) -> GenerationResult<String> {
            self.responses
                .lock()
                .unwrap()
                .remove(0)
        }
    }

    fn concept_json() -> String {
        serde_json::json!([
            {
                "name": "Loud Oats",
                "tagline": "Milk, but make it shout",
                "bigIdea": "Turn the aisle into a festival.",
                "boldness": 0.8,
                "suggestedDeliverables": [
                    {"type": "short_video", "platform": "tiktok", "quantity": 1, "description": "Challenge"},
                    {"type": "billboard", "platform": "ooh", "quantity": 1, "description": "Takeover"},
                    {"type": "social_post", "platform": "instagram", "quantity": 2, "description": "Teasers"}
                ]
            }
        ])
        .to_string()
    }

    fn brief() -> ClientBrief {
        ClientBrief::new("Launch oat milk", "Urban 25-40", "Creamy, not preachy")
    }

    #[tokio::test]
    async fn test_generate_decodes_concepts() {
        let svc = ScriptedText::new(vec![Ok(concept_json())]);
        let gen = ConceptGenerator::new(svc);

        let concepts = gen
            .generate("camp-1", &brief(), &["ana".to_string(), "bo".to_string()], "go weird")
            .await
            .unwrap();

        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].id, "camp-1-c0");
        assert_eq!(concepts[0].suggested_deliverables.len(), 3);
    }

    #[tokio::test]
    async fn test_generate_accepts_fenced_payload() {
        let fenced = format!("```json\n{}\n```", concept_json());
        let svc = ScriptedText::new(vec![Ok(fenced)]);
        let gen = ConceptGenerator::new(svc);

        let concepts = gen.generate("camp-1", &brief(), &[], "").await.unwrap();
        assert_eq!(concepts[0].name, "Loud Oats");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_error_not_crash() {
        let svc = ScriptedText::new(vec![Ok("this is not json".to_string())]);
        let gen = ConceptGenerator::new(svc);

        let err = gen.generate("camp-1", &brief(), &[], "").await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_array_is_retryable_error() {
        let svc = ScriptedText::new(vec![Ok("[]".to_string())]);
        let gen = ConceptGenerator::new(svc);

        let err = gen.generate("camp-1", &brief(), &[], "").await.unwrap_err();
        assert!(matches!(err, GenerationError::Empty(_)));
    }

    #[tokio::test]
    async fn test_service_failure_propagates() {
        let svc = ScriptedText::new(vec![Err(GenerationError::Api {
            status: 503,
            message: "down".to_string(),
        })]);
        let gen = ConceptGenerator::new(svc);

        let err = gen.generate("camp-1", &brief(), &[], "").await.unwrap_err();
        assert!(matches!(err, GenerationError::Api { status: 503, .. }));
    }

    #[test]
    fn test_prompt_carries_brief_and_direction() {
        let prompt = build_prompt(&brief(), &["ana".to_string()], "lean into nostalgia");
        assert!(prompt.contains("Launch oat milk"));
        assert!(prompt.contains("ana"));
        assert!(prompt.contains("lean into nostalgia"));
    }
}
