//! Deliverable Generator Client
//!
//! Produces the content for one deliverable: builds a context-rich prompt
//! from brief + concept (+ revision feedback), calls the text service with
//! a bounded retry, and — only when the returned text embeds a visual
//! description marker — asks the image service for a companion image.
//! Image failure is swallowed: the image is optional, the text is not.

use std::sync::Arc;
use std::time::Duration;

use crate::core::campaign::campaign_types::Campaign;
use crate::core::campaign::concept_types::Concept;
use crate::core::campaign::deliverable_types::Deliverable;

use super::provider::{GenerationResult, ImageGenService, TextGenService};

/// Total text attempts per call (one retry).
const MAX_ATTEMPTS: u32 = 2;
/// Fixed backoff between the attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(600);
/// Marker the text service embeds when the asset needs a visual.
const VISUAL_MARKER: &str = "[VISUAL:";

/// A successfully generated asset.
#[derive(Debug, Clone)]
pub struct GeneratedAsset {
    pub content: String,
    pub image_reference: Option<String>,
}

/// Client wrapping the external text + image services for one-deliverable
/// generation.
pub struct DeliverableGenerator {
    text: Arc<dyn TextGenService>,
    image: Arc<dyn ImageGenService>,
}

impl DeliverableGenerator {
    pub fn new(text: Arc<dyn TextGenService>, image: Arc<dyn ImageGenService>) -> Self {
        Self { text, image }
    }

    /// Generate content for one deliverable. Raises only after the bounded
    /// retry is exhausted; the caller records that as `generation_failed`.
    pub async fn generate(
        &self,
        deliverable: &Deliverable,
        campaign: &Campaign,
        concept: &Concept,
        revision_feedback: Option<&str>,
    ) -> GenerationResult<GeneratedAsset> {
        let prompt = build_prompt(deliverable, campaign, concept, revision_feedback);
        let content = self.complete_with_retry(&prompt, &deliverable.id).await?;

        let image_reference = match extract_visual_prompt(&content) {
            Some(visual) => {
                let size = deliverable.deliverable_type.image_size();
                match self.image.render(visual, size).await {
                    Ok(reference) => Some(reference),
                    Err(e) => {
                        log::warn!(
                            "Image generation for deliverable {} failed (text kept): {e}",
                            deliverable.id
                        );
                        None
                    }
                }
            }
            None => None,
        };

        Ok(GeneratedAsset {
            content,
            image_reference,
        })
    }

    /// Bounded retry loop: up to [`MAX_ATTEMPTS`] attempts with a short
    /// fixed backoff between them.
    async fn complete_with_retry(
        &self,
        prompt: &str,
        deliverable_id: &str,
    ) -> GenerationResult<String> {
        let mut attempt = 1;
        loop {
            match self.text.complete(prompt).await {
                Ok(content) => return Ok(content),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    log::warn!(
                        "Generation attempt {attempt}/{MAX_ATTEMPTS} for {deliverable_id} failed: {e} — retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn build_prompt(
    deliverable: &Deliverable,
    campaign: &Campaign,
    concept: &Concept,
    revision_feedback: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are the production team of an advertising agency working on the \
         campaign \"{}\" for {} (deadline {}).\n\n{}\n\n{}\n\nProduce the full \
         copy for one {} running on {}: {}.\nIf the asset needs artwork, embed \
         exactly one visual description as [VISUAL: ...] on its own line.",
        campaign.name,
        campaign.client_name,
        campaign.deadline.date_naive(),
        campaign.brief.prompt_block(),
        concept.prompt_block(),
        deliverable.deliverable_type,
        deliverable.platform,
        deliverable.description,
    );
    if let Some(feedback) = revision_feedback {
        prompt.push_str(&format!(
            "\n\nThis is a revision. Reviewer feedback to address: {feedback}"
        ));
    }
    prompt
}

/// Extract the embedded visual description, if the text carries one.
fn extract_visual_prompt(content: &str) -> Option<&str> {
    let start = content.find(VISUAL_MARKER)? + VISUAL_MARKER.len();
    let rest = &content[start..];
    let end = rest.find(']')?;
    let visual = rest[..end].trim();
    if visual.is_empty() {
        None
    } else {
        Some(visual)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::campaign::brief_types::ClientBrief;
    use crate::core::campaign::concept_types::concept_from_wire;
    use crate::core::campaign::deliverable_types::{DeliverableType, ImageSize, Platform};
    use crate::core::generation::provider::GenerationError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedText {
        responses: Mutex<Vec<GenerationResult<String>>>,
        calls: AtomicU32,
    }

    impl ScriptedText {
        fn new(responses: Vec<GenerationResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl TextGenService for ScriptedText {
        async fn complete(&self, _prompt: &str) -> GenerationResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().unwrap().remove(0)
        }
    }

    struct FixedImage {
        result: GenerationResult<String>,
        last_size: Mutex<Option<ImageSize>>,
    }

    impl FixedImage {
        fn ok(reference: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(reference.to_string()),
                last_size: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                result: Err(GenerationError::Api {
                    status: 500,
                    message: "image service down".to_string(),
                }),
                last_size: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl ImageGenService for FixedImage {
        async fn render(&self, _prompt: &str, size: ImageSize) -> GenerationResult<String> {
            *self.last_size.lock().unwrap() = Some(size);
            match &self.result {
                Ok(s) => Ok(s.clone()),
                Err(_) => Err(GenerationError::Api {
                    status: 500,
                    message: "image service down".to_string(),
                }),
            }
        }
    }

    fn fixtures() -> (Campaign, Concept, Deliverable) {
        let campaign = Campaign::new(
            "Oatly Rival Co",
            "Loud Oats Launch",
            ClientBrief::new("Launch oat milk", "Urban 25-40", "Creamy, not preachy"),
            200_000,
            Utc::now() + chrono::Duration::days(30),
        );
        let concept = concept_from_wire(
            &serde_json::json!({
                "name": "Loud Oats",
                "tagline": "Milk, but make it shout",
                "bigIdea": "Festival energy.",
                "suggestedDeliverables": [
                    {"type": "short_video", "platform": "tiktok", "quantity": 1, "description": "x"}
                ]
            }),
            "camp-c0",
        )
        .unwrap();
        let deliverable = Deliverable::new(
            "camp-d0",
            DeliverableType::ShortVideo,
            Platform::Tiktok,
            "15s teaser",
        );
        (campaign, concept, deliverable)
    }

    #[tokio::test]
    async fn test_success_without_visual_marker() {
        let (campaign, concept, deliverable) = fixtures();
        let text = ScriptedText::new(vec![Ok("Plain copy, no artwork.".to_string())]);
        let image = FixedImage::ok("https://img.example/1.png");
        let gen = DeliverableGenerator::new(text.clone(), image.clone());

        let asset = gen
            .generate(&deliverable, &campaign, &concept, None)
            .await
            .unwrap();

        assert_eq!(asset.content, "Plain copy, no artwork.");
        assert!(asset.image_reference.is_none());
        assert!(image.last_size.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_visual_marker_triggers_image_call_with_type_size() {
        let (campaign, concept, deliverable) = fixtures();
        let text = ScriptedText::new(vec![Ok(
            "Script...\n[VISUAL: neon oat field at night]\nEnd.".to_string()
        )]);
        let image = FixedImage::ok("https://img.example/1.png");
        let gen = DeliverableGenerator::new(text, image.clone());

        let asset = gen
            .generate(&deliverable, &campaign, &concept, None)
            .await
            .unwrap();

        assert_eq!(
            asset.image_reference.as_deref(),
            Some("https://img.example/1.png")
        );
        // ShortVideo requests a portrait image
        assert_eq!(*image.last_size.lock().unwrap(), Some(ImageSize::Portrait));
    }

    #[tokio::test]
    async fn test_image_failure_is_swallowed() {
        let (campaign, concept, deliverable) = fixtures();
        let text = ScriptedText::new(vec![Ok("[VISUAL: something]".to_string())]);
        let gen = DeliverableGenerator::new(text, FixedImage::failing());

        let asset = gen
            .generate(&deliverable, &campaign, &concept, None)
            .await
            .unwrap();

        assert!(asset.image_reference.is_none());
    }

    #[tokio::test]
    async fn test_retries_once_then_succeeds() {
        let (campaign, concept, deliverable) = fixtures();
        let text = ScriptedText::new(vec![
            Err(GenerationError::Api {
                status: 500,
                message: "flaky".to_string(),
            }),
            Ok("Second attempt copy.".to_string()),
        ]);
        let gen = DeliverableGenerator::new(text.clone(), FixedImage::ok("x"));

        let asset = gen
            .generate(&deliverable, &campaign, &concept, None)
            .await
            .unwrap();

        assert_eq!(asset.content, "Second attempt copy.");
        assert_eq!(text.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_ceiling_is_two_attempts() {
        let (campaign, concept, deliverable) = fixtures();
        let text = ScriptedText::new(vec![
            Err(GenerationError::Api {
                status: 500,
                message: "down".to_string(),
            }),
            Err(GenerationError::Api {
                status: 500,
                message: "still down".to_string(),
            }),
        ]);
        let gen = DeliverableGenerator::new(text.clone(), FixedImage::ok("x"));

        let err = gen
            .generate(&deliverable, &campaign, &concept, None)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Api { status: 500, .. }));
        assert_eq!(text.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_extract_visual_prompt() {
        assert_eq!(
            extract_visual_prompt("a [VISUAL: neon oats] b"),
            Some("neon oats")
        );
        assert_eq!(extract_visual_prompt("no marker"), None);
        assert_eq!(extract_visual_prompt("[VISUAL: ]"), None);
        assert_eq!(extract_visual_prompt("[VISUAL: unclosed"), None);
    }

    #[test]
    fn test_prompt_includes_feedback_when_revising() {
        let (campaign, concept, deliverable) = fixtures();
        let prompt = build_prompt(
            &deliverable,
            &campaign,
            &concept,
            Some("Less shouting, more oats"),
        );
        assert!(prompt.contains("This is a revision"));
        assert!(prompt.contains("Less shouting, more oats"));

        let fresh = build_prompt(&deliverable, &campaign, &concept, None);
        assert!(!fresh.contains("This is a revision"));
    }
}
