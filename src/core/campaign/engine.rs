//! Campaign Lifecycle Engine
//!
//! `CampaignService` owns the campaign collection and is the only writer to
//! it. Every operation asserts its phase preconditions against the explicit
//! [`CampaignPhase`] enum before mutating anything, and every mutation is
//! followed by an atomic snapshot write to the durable store (persistence
//! failures are logged and never block an operation).
//!
//! The deliverable generation pipeline is deliberately sequential: one item
//! at a time, in template expansion order, with per-item failure isolation
//! and a progress counter readable throughout.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::generation::provider::{GenerationError, ImageGenService, TextGenService};
use crate::core::generation::{ConceptGenerator, DeliverableGenerator};
use crate::core::reputation::scoring::OutcomeFacts;
use crate::core::store::SnapshotStore;

use super::brief_types::ClientBrief;
use super::campaign_types::{team_fee_for, Campaign, CampaignPhase};
use super::concept_types::Concept;
use super::deliverable_types::{Deliverable, DeliverableStatus, DeliverableType, Platform};

/// Fixed storage key for the campaign snapshot.
pub const CAMPAIGN_STORE_KEY: &str = "campaigns";

// ============================================================================
// Errors
// ============================================================================

/// Unified error type for campaign operations.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// Campaign or deliverable id not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation attempted in the wrong lifecycle phase.
    #[error("Invalid phase: expected {expected}, found {actual}")]
    InvalidPhase {
        expected: CampaignPhase,
        actual: CampaignPhase,
    },

    /// Operation precondition violated; nothing was mutated.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Concept generation failed; retryable by re-invoking.
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl CampaignError {
    /// Create a precondition error with the given message.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }
}

/// Result type alias for campaign operations.
pub type CampaignResult<T> = Result<T, CampaignError>;

// ============================================================================
// Persisted State
// ============================================================================

/// The persisted campaign snapshot: every campaign plus the UI's selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CampaignBook {
    campaigns: Vec<Campaign>,
    selected_campaign_id: Option<String>,
}

// ============================================================================
// Batch Progress
// ============================================================================

/// Observable progress of an in-flight generation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Items attempted so far.
    pub current: usize,
    /// Items in the batch.
    pub total: usize,
}

/// Outcome of a finished generation batch. Failed items stay visible on the
/// campaign for manual retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

// ============================================================================
// Campaign Service
// ============================================================================

/// Owned service object for the campaign lifecycle. Constructed once at
/// process start; collaborators hold references, never copies of the state.
pub struct CampaignService {
    state: RwLock<CampaignBook>,
    store: Arc<dyn SnapshotStore>,
    concept_gen: ConceptGenerator,
    deliverable_gen: DeliverableGenerator,
    /// Transient per-campaign batch progress (not persisted).
    progress: Mutex<HashMap<String, BatchProgress>>,
    /// Campaigns with a concept generation call in flight (not persisted).
    concepts_in_flight: Mutex<HashSet<String>>,
}

impl CampaignService {
    /// Create the service, loading any persisted snapshot from the store.
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        text: Arc<dyn TextGenService>,
        image: Arc<dyn ImageGenService>,
    ) -> Self {
        let book = match store.load(CAMPAIGN_STORE_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(book) => book,
                Err(e) => {
                    log::warn!("Corrupt campaign snapshot — starting fresh: {e}");
                    CampaignBook::default()
                }
            },
            Ok(None) => CampaignBook::default(),
            Err(e) => {
                log::warn!("Failed to load campaign snapshot — starting fresh: {e}");
                CampaignBook::default()
            }
        };

        Self {
            state: RwLock::new(book),
            store,
            concept_gen: ConceptGenerator::new(text.clone()),
            deliverable_gen: DeliverableGenerator::new(text, image),
            progress: Mutex::new(HashMap::new()),
            concepts_in_flight: Mutex::new(HashSet::new()),
        }
    }

    // ------------------------------------------------------------------
    // Creation & selection
    // ------------------------------------------------------------------

    /// Create a campaign from an accepted brief.
    pub async fn create_campaign(
        &self,
        client_name: impl Into<String>,
        name: impl Into<String>,
        brief: ClientBrief,
        client_budget: u64,
        deadline: DateTime<Utc>,
    ) -> Campaign {
        let campaign = Campaign::new(client_name, name, brief, client_budget, deadline);
        let mut book = self.state.write().await;
        book.campaigns.push(campaign.clone());
        if book.selected_campaign_id.is_none() {
            book.selected_campaign_id = Some(campaign.id.clone());
        }
        self.persist(&book);
        log::info!("Created campaign {} ({})", campaign.name, campaign.id);
        campaign
    }

    /// List all campaigns.
    pub async fn campaigns(&self) -> Vec<Campaign> {
        self.state.read().await.campaigns.clone()
    }

    /// Fetch one campaign by id.
    pub async fn campaign(&self, campaign_id: &str) -> Option<Campaign> {
        self.state
            .read()
            .await
            .campaigns
            .iter()
            .find(|c| c.id == campaign_id)
            .cloned()
    }

    /// The UI's currently selected campaign id.
    pub async fn selected_campaign_id(&self) -> Option<String> {
        self.state.read().await.selected_campaign_id.clone()
    }

    /// Select a campaign for the UI. Persisted with the collection.
    pub async fn select_campaign(&self, campaign_id: &str) -> CampaignResult<()> {
        let mut book = self.state.write().await;
        Self::find(&book, campaign_id)?;
        book.selected_campaign_id = Some(campaign_id.to_string());
        self.persist(&book);
        Ok(())
    }

    /// Full data reset: the only way a campaign is ever destroyed.
    pub async fn reset(&self) {
        let mut book = self.state.write().await;
        *book = CampaignBook::default();
        self.persist(&book);
        self.progress.lock().unwrap().clear();
        self.concepts_in_flight
            .lock()
            .unwrap()
            .clear();
        log::info!("Campaign state reset");
    }

    // ------------------------------------------------------------------
    // Concepting
    // ------------------------------------------------------------------

    /// Assign (or clear, with an empty list) the concepting team and
    /// recompute the team fee and production budget. Rejected once concepts
    /// have been generated.
    pub async fn set_concepting_team(
        &self,
        campaign_id: &str,
        member_ids: Vec<String>,
    ) -> CampaignResult<Campaign> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;

        Self::require_phase(campaign, CampaignPhase::Concepting)?;
        if !campaign.concepts.is_empty() {
            return Err(CampaignError::precondition(
                "team cannot change after concepts are generated",
            ));
        }
        let fee = team_fee_for(member_ids.len()).ok_or_else(|| {
            CampaignError::precondition("concepting team must have 0 or 2-4 members")
        })?;
        if fee > campaign.client_budget {
            return Err(CampaignError::precondition(
                "team fee exceeds the client budget",
            ));
        }

        campaign.team = member_ids;
        campaign.team_fee = fee;
        campaign.production_budget = campaign.client_budget - fee;

        let updated = campaign.clone();
        self.persist(&book);
        Ok(updated)
    }

    /// Set the free-text strategic direction fed to the concept generator.
    pub async fn set_strategic_direction(
        &self,
        campaign_id: &str,
        direction: impl Into<String>,
    ) -> CampaignResult<()> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        Self::require_phase(campaign, CampaignPhase::Concepting)?;
        campaign.strategic_direction = direction.into();
        self.persist(&book);
        Ok(())
    }

    /// Whether a concept generation call is currently in flight.
    pub fn concept_generation_in_progress(&self, campaign_id: &str) -> bool {
        self.concepts_in_flight
            .lock()
            .unwrap()
            .contains(campaign_id)
    }

    /// Invoke the concept collaborator. On success with 1+ concepts the
    /// campaign advances `Concepting → Selecting`; any failure leaves phase
    /// and concepts untouched and clears the in-flight flag, so the player
    /// can simply re-trigger. Never partially applies.
    pub async fn generate_concepts(&self, campaign_id: &str) -> CampaignResult<Vec<Concept>> {
        let (brief, team, direction) = {
            let book = self.state.read().await;
            let campaign = Self::find(&book, campaign_id)?;
            Self::require_phase(campaign, CampaignPhase::Concepting)?;
            if campaign.team.is_empty() {
                return Err(CampaignError::precondition(
                    "a concepting team must be assigned first",
                ));
            }
            (
                campaign.brief.clone(),
                campaign.team.clone(),
                campaign.strategic_direction.clone(),
            )
        };

        {
            let mut in_flight = self.concepts_in_flight.lock().unwrap();
            if !in_flight.insert(campaign_id.to_string()) {
                return Err(CampaignError::precondition(
                    "concept generation already in progress",
                ));
            }
        }

        let result = self
            .concept_gen
            .generate(campaign_id, &brief, &team, &direction)
            .await;

        // The flag never outlives the call, success or failure.
        self.concepts_in_flight
            .lock()
            .unwrap()
            .remove(campaign_id);

        let concepts = result?;

        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        campaign.concepts = concepts.clone();
        campaign.phase = CampaignPhase::Selecting;
        self.persist(&book);
        Ok(concepts)
    }

    /// Pick a concept. Changeable until deliverables are generated.
    pub async fn select_concept(
        &self,
        campaign_id: &str,
        concept_id: &str,
    ) -> CampaignResult<()> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        Self::require_phase(campaign, CampaignPhase::Selecting)?;
        if !campaign.concepts.iter().any(|c| c.id == concept_id) {
            return Err(CampaignError::NotFound(concept_id.to_string()));
        }
        campaign.selected_concept_id = Some(concept_id.to_string());
        self.persist(&book);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deliverable generation pipeline
    // ------------------------------------------------------------------

    /// Expand the selected concept's templates and run the sequential
    /// generation pipeline. Each item independently ends `ReadyForReview`
    /// or `GenerationFailed`; the batch always runs to completion and the
    /// campaign always lands in `Reviewing`.
    pub async fn generate_campaign_deliverables(
        &self,
        campaign_id: &str,
    ) -> CampaignResult<BatchReport> {
        // Expand templates and enter Generating under one lock.
        let (campaign_ctx, concept, item_ids) = {
            let mut book = self.state.write().await;
            let campaign = Self::find_mut(&mut book, campaign_id)?;
            Self::require_phase(campaign, CampaignPhase::Selecting)?;
            let concept = campaign
                .selected_concept()
                .cloned()
                .ok_or_else(|| CampaignError::precondition("no concept selected"))?;

            let expanded = expand_templates(campaign, &concept);
            let item_ids: Vec<String> = expanded.iter().map(|d| d.id.clone()).collect();
            campaign.deliverables.extend(expanded);
            campaign.phase = CampaignPhase::Generating;

            let ctx = campaign.clone();
            self.persist(&book);
            (ctx, concept, item_ids)
        };

        let report = self
            .run_batch(campaign_id, &campaign_ctx, &concept, &item_ids, false)
            .await;

        // All items attempted: advance to Reviewing unconditionally.
        {
            let mut book = self.state.write().await;
            if let Ok(campaign) = Self::find_mut(&mut book, campaign_id) {
                campaign.phase = CampaignPhase::Reviewing;
                self.persist(&book);
            }
        }
        self.progress.lock().unwrap().remove(campaign_id);

        log::info!(
            "Generation batch for {campaign_id} finished: {}/{} succeeded",
            report.succeeded,
            report.total
        );
        Ok(report)
    }

    /// Observable current/total progress for an in-flight batch.
    pub fn generation_progress(&self, campaign_id: &str) -> Option<BatchProgress> {
        self.progress
            .lock()
            .unwrap()
            .get(campaign_id)
            .copied()
    }

    /// Re-invoke generation for exactly one deliverable. Independent of any
    /// batch-level progress state; never changes phase.
    pub async fn retry_deliverable_generation(
        &self,
        campaign_id: &str,
        deliverable_id: &str,
    ) -> CampaignResult<()> {
        let (campaign_ctx, concept, snapshot) = {
            let mut book = self.state.write().await;
            let campaign = Self::find_mut(&mut book, campaign_id)?;
            let concept = campaign
                .selected_concept()
                .cloned()
                .ok_or_else(|| CampaignError::precondition("no concept selected"))?;

            let deliverable = campaign
                .deliverable_mut(deliverable_id)
                .ok_or_else(|| CampaignError::NotFound(deliverable_id.to_string()))?;
            if !deliverable.status.is_retryable() {
                return Err(CampaignError::precondition(format!(
                    "deliverable is {} — not retryable",
                    deliverable.status
                )));
            }
            deliverable.begin_generation();
            let snapshot = deliverable.clone();

            let ctx = campaign.clone();
            self.persist(&book);
            (ctx, concept, snapshot)
        };

        let feedback = snapshot.feedback().map(|s| s.to_string());
        let result = self
            .deliverable_gen
            .generate(&snapshot, &campaign_ctx, &concept, feedback.as_deref())
            .await;

        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        if let Some(deliverable) = campaign.deliverable_mut(deliverable_id) {
            match result {
                Ok(asset) => {
                    deliverable.complete_generation(asset.content, asset.image_reference);
                }
                Err(e) => {
                    deliverable.fail_generation(e.to_string());
                }
            }
        }
        self.persist(&book);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Review
    // ------------------------------------------------------------------

    /// Approve one deliverable while in review.
    pub async fn approve_in_review(
        &self,
        campaign_id: &str,
        deliverable_id: &str,
    ) -> CampaignResult<()> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        Self::require_phase(campaign, CampaignPhase::Reviewing)?;
        let deliverable = campaign
            .deliverable_mut(deliverable_id)
            .ok_or_else(|| CampaignError::NotFound(deliverable_id.to_string()))?;
        if !deliverable.approve() {
            return Err(CampaignError::precondition(format!(
                "deliverable is {} — cannot approve",
                deliverable.status
            )));
        }
        self.persist(&book);
        Ok(())
    }

    /// Flag one deliverable for revision with reviewer feedback.
    pub async fn flag_in_review(
        &self,
        campaign_id: &str,
        deliverable_id: &str,
        feedback: impl Into<String>,
    ) -> CampaignResult<()> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        Self::require_phase(campaign, CampaignPhase::Reviewing)?;
        let deliverable = campaign
            .deliverable_mut(deliverable_id)
            .ok_or_else(|| CampaignError::NotFound(deliverable_id.to_string()))?;
        if !deliverable.flag(feedback) {
            return Err(CampaignError::precondition(format!(
                "deliverable is {} — cannot flag",
                deliverable.status
            )));
        }
        self.persist(&book);
        Ok(())
    }

    /// Regenerate every flagged deliverable, passing its stored feedback as
    /// extra guidance; bumps each revision counter and returns the campaign
    /// to `Reviewing` when done.
    pub async fn request_revisions(&self, campaign_id: &str) -> CampaignResult<BatchReport> {
        let (campaign_ctx, concept, item_ids) = {
            let mut book = self.state.write().await;
            let campaign = Self::find_mut(&mut book, campaign_id)?;
            Self::require_phase(campaign, CampaignPhase::Reviewing)?;
            let concept = campaign
                .selected_concept()
                .cloned()
                .ok_or_else(|| CampaignError::precondition("no concept selected"))?;

            let item_ids: Vec<String> = campaign
                .deliverables
                .iter()
                .filter(|d| d.status == DeliverableStatus::NeedsRevision)
                .map(|d| d.id.clone())
                .collect();
            if item_ids.is_empty() {
                return Err(CampaignError::precondition(
                    "no deliverables are flagged for revision",
                ));
            }

            campaign.phase = CampaignPhase::Generating;
            let ctx = campaign.clone();
            self.persist(&book);
            (ctx, concept, item_ids)
        };

        let report = self
            .run_batch(campaign_id, &campaign_ctx, &concept, &item_ids, true)
            .await;

        {
            let mut book = self.state.write().await;
            if let Ok(campaign) = Self::find_mut(&mut book, campaign_id) {
                campaign.phase = CampaignPhase::Reviewing;
                self.persist(&book);
            }
        }
        self.progress.lock().unwrap().remove(campaign_id);
        Ok(report)
    }

    /// Every deliverable approved → `Executing`.
    pub async fn finish_review(&self, campaign_id: &str) -> CampaignResult<()> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        Self::require_phase(campaign, CampaignPhase::Reviewing)?;
        if !campaign.all_deliverables_approved() {
            return Err(CampaignError::precondition(
                "every deliverable must be approved",
            ));
        }
        campaign.phase = CampaignPhase::Executing;
        self.persist(&book);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Executing-phase edits
    // ------------------------------------------------------------------

    /// Add a deliverable during execution; commits its production cost.
    pub async fn add_deliverable(
        &self,
        campaign_id: &str,
        deliverable_type: DeliverableType,
        platform: Platform,
        description: impl Into<String>,
    ) -> CampaignResult<String> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        Self::require_phase(campaign, CampaignPhase::Executing)?;

        let id = campaign.next_deliverable_id();
        campaign.deliverables.push(Deliverable::new(
            id.clone(),
            deliverable_type,
            platform,
            description,
        ));
        self.persist(&book);
        Ok(id)
    }

    /// Remove a deliverable during execution; releases its production cost.
    pub async fn remove_deliverable(
        &self,
        campaign_id: &str,
        deliverable_id: &str,
    ) -> CampaignResult<()> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        Self::require_phase(campaign, CampaignPhase::Executing)?;

        let before = campaign.deliverables.len();
        campaign.deliverables.retain(|d| d.id != deliverable_id);
        if campaign.deliverables.len() == before {
            return Err(CampaignError::NotFound(deliverable_id.to_string()));
        }
        self.persist(&book);
        Ok(())
    }

    /// Assign a sub-team to a deliverable; recomputes its team cost with
    /// the same headcount function as concepting.
    pub async fn assign_deliverable_team(
        &self,
        campaign_id: &str,
        deliverable_id: &str,
        member_ids: Vec<String>,
    ) -> CampaignResult<()> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        Self::require_phase(campaign, CampaignPhase::Executing)?;

        let cost = team_fee_for(member_ids.len()).ok_or_else(|| {
            CampaignError::precondition("sub-team must have 0 or 2-4 members")
        })?;
        let deliverable = campaign
            .deliverable_mut(deliverable_id)
            .ok_or_else(|| CampaignError::NotFound(deliverable_id.to_string()))?;
        deliverable.team = member_ids;
        deliverable.team_cost = cost;
        self.persist(&book);
        Ok(())
    }

    /// Record a tool used while working this campaign (scoring bonus).
    pub async fn record_tool_usage(
        &self,
        campaign_id: &str,
        tool_id: impl Into<String>,
    ) -> CampaignResult<()> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        if campaign.phase.is_terminal() {
            return Err(CampaignError::precondition("campaign is completed"));
        }
        campaign.tools_used.insert(tool_id.into());
        self.persist(&book);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Submission & completion
    // ------------------------------------------------------------------

    /// Hand the campaign to the client. Requires every deliverable approved;
    /// a violation is rejected before any mutation, leaving phase unchanged.
    /// Scoring is the caller's responsibility (via the reputation engine).
    pub async fn submit_campaign(&self, campaign_id: &str) -> CampaignResult<Campaign> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        Self::require_phase(campaign, CampaignPhase::Executing)?;
        if !campaign.all_deliverables_approved() {
            return Err(CampaignError::precondition(
                "every deliverable must be approved before submission",
            ));
        }
        campaign.phase = CampaignPhase::Submitted;
        campaign.submitted_at = Some(Utc::now());
        let updated = campaign.clone();
        self.persist(&book);
        log::info!("Campaign {campaign_id} submitted");
        Ok(updated)
    }

    /// Record the client's verdict and close the campaign. Terminal.
    pub async fn complete_campaign(
        &self,
        campaign_id: &str,
        score: u32,
        feedback: impl Into<String>,
    ) -> CampaignResult<()> {
        let mut book = self.state.write().await;
        let campaign = Self::find_mut(&mut book, campaign_id)?;
        Self::require_phase(campaign, CampaignPhase::Submitted)?;
        campaign.phase = CampaignPhase::Completed;
        campaign.client_score = Some(score);
        campaign.client_feedback = Some(feedback.into());
        self.persist(&book);
        Ok(())
    }

    /// Assemble the outcome facts the reputation engine scores from.
    pub async fn outcome_facts(&self, campaign_id: &str) -> CampaignResult<OutcomeFacts> {
        let book = self.state.read().await;
        let campaign = Self::find(&book, campaign_id)?;
        if !matches!(
            campaign.phase,
            CampaignPhase::Submitted | CampaignPhase::Completed
        ) {
            return Err(CampaignError::precondition(
                "outcome facts exist only after submission",
            ));
        }
        let boldness = campaign
            .selected_concept()
            .map(|c| c.boldness)
            .unwrap_or(0.5);
        Ok(OutcomeFacts {
            campaign_id: campaign.id.clone(),
            concept_boldness: boldness,
            deliverable_count: campaign.deliverables.len(),
            revision_count: campaign.total_revisions(),
            was_under_budget: campaign.was_under_budget(),
            budget_utilization: campaign.budget_utilization(),
            tools_used: campaign.tools_used.len(),
            industry: campaign.brief.industry.clone(),
            team_size: campaign.team.len(),
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Sequentially attempt each item: status updates for item *i* are
    /// persisted before item *i+1* begins, so a reload mid-batch resumes as
    /// "some succeeded, rest retryable".
    async fn run_batch(
        &self,
        campaign_id: &str,
        campaign_ctx: &Campaign,
        concept: &Concept,
        item_ids: &[String],
        revision_cycle: bool,
    ) -> BatchReport {
        let total = item_ids.len();
        self.progress
            .lock()
            .unwrap()
            .insert(campaign_id.to_string(), BatchProgress { current: 0, total });

        let mut succeeded = 0;
        let mut failed = 0;

        for (index, deliverable_id) in item_ids.iter().enumerate() {
            let snapshot = {
                let mut book = self.state.write().await;
                let Ok(campaign) = Self::find_mut(&mut book, campaign_id) else {
                    break;
                };
                let Some(deliverable) = campaign.deliverable_mut(deliverable_id) else {
                    continue;
                };
                deliverable.begin_generation();
                let snapshot = deliverable.clone();
                self.persist(&book);
                snapshot
            };

            let feedback = if revision_cycle {
                snapshot.feedback().map(|s| s.to_string())
            } else {
                None
            };
            let result = self
                .deliverable_gen
                .generate(&snapshot, campaign_ctx, concept, feedback.as_deref())
                .await;

            {
                let mut book = self.state.write().await;
                if let Ok(campaign) = Self::find_mut(&mut book, campaign_id) {
                    if let Some(deliverable) = campaign.deliverable_mut(deliverable_id) {
                        match result {
                            Ok(asset) => {
                                deliverable
                                    .complete_generation(asset.content, asset.image_reference);
                                if revision_cycle {
                                    deliverable.bump_revision();
                                }
                                succeeded += 1;
                            }
                            Err(e) => {
                                log::warn!(
                                    "Deliverable {deliverable_id} failed generation: {e}"
                                );
                                deliverable.fail_generation(e.to_string());
                                failed += 1;
                            }
                        }
                    }
                    self.persist(&book);
                }
            }

            self.progress.lock().unwrap().insert(
                campaign_id.to_string(),
                BatchProgress {
                    current: index + 1,
                    total,
                },
            );
        }

        BatchReport {
            total,
            succeeded,
            failed,
        }
    }

    fn require_phase(campaign: &Campaign, expected: CampaignPhase) -> CampaignResult<()> {
        if campaign.phase != expected {
            return Err(CampaignError::InvalidPhase {
                expected,
                actual: campaign.phase,
            });
        }
        Ok(())
    }

    fn find<'a>(book: &'a CampaignBook, campaign_id: &str) -> CampaignResult<&'a Campaign> {
        book.campaigns
            .iter()
            .find(|c| c.id == campaign_id)
            .ok_or_else(|| CampaignError::NotFound(campaign_id.to_string()))
    }

    fn find_mut<'a>(
        book: &'a mut CampaignBook,
        campaign_id: &str,
    ) -> CampaignResult<&'a mut Campaign> {
        book.campaigns
            .iter_mut()
            .find(|c| c.id == campaign_id)
            .ok_or_else(|| CampaignError::NotFound(campaign_id.to_string()))
    }

    /// Persist the snapshot. Failures are logged and swallowed: in-memory
    /// state stays authoritative for the session and no operation blocks.
    fn persist(&self, book: &CampaignBook) {
        match serde_json::to_vec(book) {
            Ok(bytes) => {
                if let Err(e) = self.store.save(CAMPAIGN_STORE_KEY, &bytes) {
                    log::warn!("Failed to persist campaign snapshot: {e}");
                }
            }
            Err(e) => log::warn!("Failed to serialize campaign snapshot: {e}"),
        }
    }
}

/// Expand a concept's suggested-deliverable templates into concrete
/// `NotStarted` records with deterministic ids, in template order.
fn expand_templates(campaign: &mut Campaign, concept: &Concept) -> Vec<Deliverable> {
    let mut expanded = Vec::new();
    for template in &concept.suggested_deliverables {
        for _ in 0..template.quantity {
            let id = campaign.next_deliverable_id();
            expanded.push(Deliverable::new(
                id,
                template.deliverable_type,
                template.platform,
                template.description.clone(),
            ));
        }
    }
    expanded
}

// ============================================================================
// Tests
// ============================================================================
