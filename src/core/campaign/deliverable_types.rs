//! Deliverable Type Definitions
//!
//! Data structures for the concrete creative assets produced within a
//! campaign: the closed type/platform sets, the per-item production status
//! state machine, and the generated-work payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Deliverable Type Enum
// ============================================================================

/// Kind of creative asset. Closed set; unknown wire values decode to
/// [`DeliverableType::SocialPost`] with a warning rather than being trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableType {
    Video,
    ShortVideo,
    #[default]
    SocialPost,
    PrintAd,
    Billboard,
    LandingPage,
    EmailBlast,
    RadioSpot,
}

impl DeliverableType {
    /// Fixed production cost in whole USD, committed when a deliverable of
    /// this type is added to a campaign.
    pub fn production_cost(&self) -> u64 {
        match self {
            Self::Video => 12_000,
            Self::ShortVideo => 6_000,
            Self::SocialPost => 1_500,
            Self::PrintAd => 4_000,
            Self::Billboard => 9_000,
            Self::LandingPage => 5_000,
            Self::EmailBlast => 1_000,
            Self::RadioSpot => 3_500,
        }
    }

    /// Requested size for the optional companion image.
    pub fn image_size(&self) -> ImageSize {
        match self {
            Self::Video | Self::PrintAd | Self::Billboard => ImageSize::Landscape,
            Self::ShortVideo => ImageSize::Portrait,
            _ => ImageSize::Square,
        }
    }

    /// Decode a collaborator-supplied value, substituting the default and
    /// logging on anything outside the closed set.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "video" => Self::Video,
            "short_video" | "vertical_video" | "reel" => Self::ShortVideo,
            "social_post" | "social" => Self::SocialPost,
            "print_ad" | "print" => Self::PrintAd,
            "billboard" | "ooh" => Self::Billboard,
            "landing_page" | "microsite" => Self::LandingPage,
            "email_blast" | "email" => Self::EmailBlast,
            "radio_spot" | "radio" | "audio" => Self::RadioSpot,
            other => {
                log::warn!("Unknown deliverable type {other:?} — defaulting to social_post");
                Self::default()
            }
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Video => "Video",
            Self::ShortVideo => "Short Video",
            Self::SocialPost => "Social Post",
            Self::PrintAd => "Print Ad",
            Self::Billboard => "Billboard",
            Self::LandingPage => "Landing Page",
            Self::EmailBlast => "Email Blast",
            Self::RadioSpot => "Radio Spot",
        }
    }
}

impl std::fmt::Display for DeliverableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Image aspect requested from the image service, derived from the
/// deliverable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Landscape,
    Portrait,
    Square,
}

impl ImageSize {
    /// Wire value understood by the image endpoint.
    pub fn api_value(&self) -> &'static str {
        match self {
            Self::Landscape => "1536x1024",
            Self::Portrait => "1024x1536",
            Self::Square => "1024x1024",
        }
    }
}

// ============================================================================
// Platform Enum
// ============================================================================

/// Where the asset runs. Closed set; unknown wire values decode to
/// [`Platform::Web`] with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Instagram,
    Tiktok,
    Youtube,
    Facebook,
    Linkedin,
    X,
    OutOfHome,
    Print,
    #[default]
    Web,
    Email,
    StreamingAudio,
}

impl Platform {
    /// Decode a collaborator-supplied value against the closed set.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "instagram" | "ig" => Self::Instagram,
            "tiktok" => Self::Tiktok,
            "youtube" | "yt" => Self::Youtube,
            "facebook" | "fb" => Self::Facebook,
            "linkedin" => Self::Linkedin,
            "x" | "twitter" => Self::X,
            "out_of_home" | "ooh" | "outdoor" => Self::OutOfHome,
            "print" => Self::Print,
            "web" | "cross_channel" | "cross-channel" => Self::Web,
            "email" => Self::Email,
            "streaming_audio" | "spotify" | "podcast" => Self::StreamingAudio,
            other => {
                log::warn!("Unknown platform {other:?} — defaulting to web");
                Self::default()
            }
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Instagram => "Instagram",
            Self::Tiktok => "TikTok",
            Self::Youtube => "YouTube",
            Self::Facebook => "Facebook",
            Self::Linkedin => "LinkedIn",
            Self::X => "X",
            Self::OutOfHome => "Out of Home",
            Self::Print => "Print",
            Self::Web => "Web",
            Self::Email => "Email",
            Self::StreamingAudio => "Streaming Audio",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Deliverable Status Enum
// ============================================================================

/// Production status of a single deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableStatus {
    /// Created but generation has not begun
    #[default]
    NotStarted,
    /// Generation call in flight
    InProgress,
    /// Generated, waiting on internal review
    ReadyForReview,
    /// Reviewer sent it back with feedback
    NeedsRevision,
    /// Cleared internal review
    Approved,
    /// Generation failed after exhausted retries; retryable
    GenerationFailed,
}

impl DeliverableStatus {
    /// Check if transition is valid
    pub fn can_transition_to(&self, target: &DeliverableStatus) -> bool {
        use DeliverableStatus::*;
        matches!(
            (self, target),
            (NotStarted, InProgress)
                | (InProgress, ReadyForReview)
                | (InProgress, GenerationFailed)
                | (ReadyForReview, Approved)
                | (ReadyForReview, NeedsRevision)
                | (NeedsRevision, InProgress)
                | (GenerationFailed, InProgress)
        )
    }

    /// A retryable status can re-enter generation via an explicit retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GenerationFailed | Self::NotStarted)
    }

    /// Check if the deliverable has cleared review
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::ReadyForReview => "Ready for Review",
            Self::NeedsRevision => "Needs Revision",
            Self::Approved => "Approved",
            Self::GenerationFailed => "Generation Failed",
        }
    }
}

impl std::fmt::Display for DeliverableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Generated Work
// ============================================================================

/// The produced content for a deliverable, present once generation has
/// succeeded at least once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedWork {
    /// Generated copy/script/body text.
    pub content: String,
    /// Optional image reference (URL or encoded payload).
    pub image_reference: Option<String>,
    /// When the content was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of revision cycles this work has been through.
    pub revision: u32,
    /// Reviewer feedback from the most recent flag, if any.
    pub feedback: Option<String>,
}

// ============================================================================
// Deliverable
// ============================================================================

/// One concrete creative asset within a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
    /// Deterministic id: `{campaignId}-d{seq}`.
    pub id: String,
    /// Kind of asset
    pub deliverable_type: DeliverableType,
    /// Where it runs
    pub platform: Platform,
    /// Free-text description of the asset
    pub description: String,
    /// Assigned sub-team member ids (optional)
    pub team: Vec<String>,
    /// Sub-team cost from the headcount fee function; not part of
    /// production spend.
    pub team_cost: u64,
    /// Fixed production cost committed at creation.
    pub production_cost: u64,
    /// Current production status
    pub status: DeliverableStatus,
    /// Generated work, once produced
    pub work: Option<GeneratedWork>,
    /// Error message from the last failed generation attempt
    pub error: Option<String>,
}

impl Deliverable {
    /// Create a new deliverable in `NotStarted`.
    pub fn new(
        id: impl Into<String>,
        deliverable_type: DeliverableType,
        platform: Platform,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            deliverable_type,
            platform,
            description: description.into(),
            team: Vec::new(),
            team_cost: 0,
            production_cost: deliverable_type.production_cost(),
            status: DeliverableStatus::NotStarted,
            work: None,
            error: None,
        }
    }

    /// Move into `InProgress` for a generation attempt.
    pub fn begin_generation(&mut self) -> bool {
        if !self.status.can_transition_to(&DeliverableStatus::InProgress) {
            return false;
        }
        self.status = DeliverableStatus::InProgress;
        self.error = None;
        true
    }

    /// Record a successful generation and move to `ReadyForReview`.
    ///
    /// A prior revision counter survives regeneration; the feedback that
    /// drove the revision is kept for the reviewer's reference.
    pub fn complete_generation(&mut self, content: String, image_reference: Option<String>) -> bool {
        if self.status != DeliverableStatus::InProgress {
            return false;
        }
        let revision = self.work.as_ref().map(|w| w.revision).unwrap_or(0);
        let feedback = self.work.as_ref().and_then(|w| w.feedback.clone());
        self.work = Some(GeneratedWork {
            content,
            image_reference,
            generated_at: Utc::now(),
            revision,
            feedback,
        });
        self.status = DeliverableStatus::ReadyForReview;
        self.error = None;
        true
    }

    /// Record an exhausted-retries failure. The pipeline continues past it.
    pub fn fail_generation(&mut self, error: impl Into<String>) -> bool {
        if self.status != DeliverableStatus::InProgress {
            return false;
        }
        self.status = DeliverableStatus::GenerationFailed;
        self.error = Some(error.into());
        true
    }

    /// Approve in review.
    pub fn approve(&mut self) -> bool {
        if !self.status.can_transition_to(&DeliverableStatus::Approved) {
            return false;
        }
        self.status = DeliverableStatus::Approved;
        true
    }

    /// Flag for revision with reviewer feedback.
    pub fn flag(&mut self, feedback: impl Into<String>) -> bool {
        if !self
            .status
            .can_transition_to(&DeliverableStatus::NeedsRevision)
        {
            return false;
        }
        self.status = DeliverableStatus::NeedsRevision;
        if let Some(work) = self.work.as_mut() {
            work.feedback = Some(feedback.into());
        }
        true
    }

    /// Bump the revision counter when a revision cycle regenerates this item.
    pub fn bump_revision(&mut self) {
        if let Some(work) = self.work.as_mut() {
            work.revision += 1;
        }
    }

    /// Reviewer feedback stored on the current work, if any.
    pub fn feedback(&self) -> Option<&str> {
        self.work.as_ref().and_then(|w| w.feedback.as_deref())
    }
}

// ============================================================================
// Tests
// ============================================================================
