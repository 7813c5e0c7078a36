//! Client Brief Definitions
//!
//! The brief is the immutable statement of what a client wants from a
//! campaign. It is fixed at campaign creation and feeds both the concept
//! generator prompts and (via the industry tag) milestone bookkeeping.

use serde::{Deserialize, Serialize};

/// The client's creative brief, immutable once the campaign is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientBrief {
    /// The business problem the campaign must solve.
    pub challenge: String,
    /// Target audience description.
    pub audience: String,
    /// The single message the work must land.
    pub key_message: String,
    /// Requested tone of voice.
    pub tone: String,
    /// How the client will judge success.
    pub success_metrics: Vec<String>,
    /// Hard constraints (legal, brand, media).
    pub constraints: Vec<String>,
    /// Industry tag, used for milestone diversity counting.
    pub industry: String,
}

impl ClientBrief {
    /// Create a new brief with the required narrative fields.
    pub fn new(
        challenge: impl Into<String>,
        audience: impl Into<String>,
        key_message: impl Into<String>,
    ) -> Self {
        Self {
            challenge: challenge.into(),
            audience: audience.into(),
            key_message: key_message.into(),
            tone: String::new(),
            success_metrics: Vec::new(),
            constraints: Vec::new(),
            industry: "general".to_string(),
        }
    }

    /// Builder: set tone
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    /// Builder: set success metrics
    pub fn with_success_metrics(mut self, metrics: Vec<String>) -> Self {
        self.success_metrics = metrics;
        self
    }

    /// Builder: set constraints
    pub fn with_constraints(mut self, constraints: Vec<String>) -> Self {
        self.constraints = constraints;
        self
    }

    /// Builder: set industry tag
    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = industry.into();
        self
    }

    /// Render the brief as prompt context for the generators.
    pub fn prompt_block(&self) -> String {
        let mut block = format!(
            "Challenge: {}\nAudience: {}\nKey message: {}\nTone: {}",
            self.challenge, self.audience, self.key_message, self.tone
        );
        if !self.success_metrics.is_empty() {
            block.push_str(&format!(
                "\nSuccess metrics: {}",
                self.success_metrics.join("; ")
            ));
        }
        if !self.constraints.is_empty() {
            block.push_str(&format!("\nConstraints: {}", self.constraints.join("; ")));
        }
        block
    }
}
