//! Campaign Type Definitions
//!
//! The campaign record and its lifecycle phase state machine, plus the
//! headcount fee function shared by the concepting team and per-deliverable
//! sub-teams.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::brief_types::ClientBrief;
use super::concept_types::Concept;
use super::deliverable_types::Deliverable;

// ============================================================================
// Campaign Phase Enum
// ============================================================================

/// Lifecycle phase of a campaign. Monotonic in the common path; the
/// `Reviewing ⇄ Generating` pair is the one legal cycle (revision loop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampaignPhase {
    /// Assembling a team and direction, waiting on concepts
    #[default]
    Concepting,
    /// Concepts generated; player picks one
    Selecting,
    /// Deliverable generation batch in flight
    Generating,
    /// Internal review of generated work
    Reviewing,
    /// Approved work being produced/edited before submission
    Executing,
    /// Handed to the client, awaiting scoring
    Submitted,
    /// Scored and closed; terminal
    Completed,
}

impl CampaignPhase {
    /// Check if this phase is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if transition is valid
    pub fn can_transition_to(&self, target: &CampaignPhase) -> bool {
        use CampaignPhase::*;
        matches!(
            (self, target),
            (Concepting, Selecting)
                | (Selecting, Generating)
                | (Generating, Reviewing)
                // Revision loop
                | (Reviewing, Generating)
                | (Reviewing, Executing)
                | (Executing, Submitted)
                | (Submitted, Completed)
        )
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Concepting => "Concepting",
            Self::Selecting => "Selecting",
            Self::Generating => "Generating",
            Self::Reviewing => "Reviewing",
            Self::Executing => "Executing",
            Self::Submitted => "Submitted",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for CampaignPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Team Fee
// ============================================================================

/// Headcount → fee step function, in whole USD. Shared by the concepting
/// team fee and per-deliverable sub-team costs. Defined only at the
/// documented points; other sizes are rejected by the caller.
pub fn team_fee_for(headcount: usize) -> Option<u64> {
    match headcount {
        0 => Some(0),
        2 => Some(25_000),
        3 => Some(45_000),
        4 => Some(70_000),
        _ => None,
    }
}

// ============================================================================
// Campaign
// ============================================================================

/// One unit of client work moving through the lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    /// Unique identifier
    pub id: String,
    /// Owning client
    pub client_name: String,
    /// Campaign name
    pub name: String,
    /// Originating brief, immutable once created
    pub brief: ClientBrief,

    /// Client budget, fixed at creation (whole USD)
    pub client_budget: u64,
    /// Concepting-team fee from the headcount function
    pub team_fee: u64,
    /// `client_budget - team_fee`
    pub production_budget: u64,

    /// When the campaign started
    pub started_at: DateTime<Utc>,
    /// Client deadline
    pub deadline: DateTime<Utc>,
    /// Set on submission
    pub submitted_at: Option<DateTime<Utc>>,

    /// Current lifecycle phase
    pub phase: CampaignPhase,

    /// Concepting team member ids (empty, or 2-4)
    pub team: Vec<String>,
    /// Free-text strategic direction fed to the concept generator
    pub strategic_direction: String,
    /// Generated concepts (all-or-nothing)
    pub concepts: Vec<Concept>,
    /// Selected concept id, changeable until deliverables exist
    pub selected_concept_id: Option<String>,

    /// Ordered deliverable collection
    pub deliverables: Vec<Deliverable>,
    /// Monotonic counter backing deterministic deliverable ids
    pub deliverable_seq: u64,

    /// Final client score, set only in `Completed`
    pub client_score: Option<u32>,
    /// Final client feedback, set only in `Completed`
    pub client_feedback: Option<String>,

    /// Tool ids used while working this campaign (scoring bonus)
    pub tools_used: BTreeSet<String>,
}

impl Campaign {
    /// Create a new campaign in `Concepting`.
    pub fn new(
        client_name: impl Into<String>,
        name: impl Into<String>,
        brief: ClientBrief,
        client_budget: u64,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            client_name: client_name.into(),
            name: name.into(),
            brief,
            client_budget,
            team_fee: 0,
            production_budget: client_budget,
            started_at: Utc::now(),
            deadline,
            submitted_at: None,
            phase: CampaignPhase::Concepting,
            team: Vec::new(),
            strategic_direction: String::new(),
            concepts: Vec::new(),
            selected_concept_id: None,
            deliverables: Vec::new(),
            deliverable_seq: 0,
            client_score: None,
            client_feedback: None,
            tools_used: BTreeSet::new(),
        }
    }

    /// Committed production spend: always the sum of current deliverables'
    /// production costs.
    pub fn production_spent(&self) -> u64 {
        self.deliverables.iter().map(|d| d.production_cost).sum()
    }

    /// Whether the campaign finished at or under its production budget.
    pub fn was_under_budget(&self) -> bool {
        self.production_spent() <= self.production_budget
    }

    /// Spend as a fraction of the production budget (0.0 when no budget).
    pub fn budget_utilization(&self) -> f64 {
        if self.production_budget == 0 {
            return 0.0;
        }
        self.production_spent() as f64 / self.production_budget as f64
    }

    /// The selected concept, if one is chosen.
    pub fn selected_concept(&self) -> Option<&Concept> {
        let id = self.selected_concept_id.as_deref()?;
        self.concepts.iter().find(|c| c.id == id)
    }

    /// Find a deliverable by id.
    pub fn deliverable(&self, deliverable_id: &str) -> Option<&Deliverable> {
        self.deliverables.iter().find(|d| d.id == deliverable_id)
    }

    /// Find a deliverable by id, mutably.
    pub fn deliverable_mut(&mut self, deliverable_id: &str) -> Option<&mut Deliverable> {
        self.deliverables.iter_mut().find(|d| d.id == deliverable_id)
    }

    /// Whether every deliverable has cleared review (requires at least one).
    pub fn all_deliverables_approved(&self) -> bool {
        !self.deliverables.is_empty()
            && self.deliverables.iter().all(|d| d.status.is_approved())
    }

    /// Next deterministic deliverable id.
    pub fn next_deliverable_id(&mut self) -> String {
        let id = format!("{}-d{}", self.id, self.deliverable_seq);
        self.deliverable_seq += 1;
        id
    }

    /// Total revision cycles across all deliverables.
    pub fn total_revisions(&self) -> u32 {
        self.deliverables
            .iter()
            .filter_map(|d| d.work.as_ref())
            .map(|w| w.revision)
            .sum()
    }
}

// ============================================================================
// Tests
// ============================================================================
