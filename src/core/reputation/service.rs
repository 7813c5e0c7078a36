//! Reputation & Event Scheduler
//!
//! `ReputationService` owns the agency's aggregate standing: reputation and
//! tier, completed-campaign history, achieved milestones, and the pending/
//! delivered bonus event lists. Submission applies the immediate score gain
//! and milestone bonuses, then probabilistically schedules delayed events,
//! each armed on its own timer.
//!
//! Durability never depends on a live timer: the persisted pending list is
//! the source of truth, and a due-event sweep delivers anything a lost
//! timer would have. Delivery is keyed by event id and strictly one-way,
//! so the timer/sweep race can never double-apply a delta.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};

use crate::core::store::SnapshotStore;

use super::catalog::{backlash_applies, event_catalog, milestone_rules};
use super::event_types::{BonusEvent, CompletedCampaign, ReputationTier};
use super::scoring::{score_campaign, CampaignScore, OutcomeFacts};

/// Fixed storage key for the reputation snapshot.
pub const REPUTATION_STORE_KEY: &str = "reputation";

/// Capacity of the delivered-events channel feeding the Consequence
/// Renderer. Overflow is harmless: the sweep return path covers it.
const DELIVERED_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Persisted State
// ============================================================================

/// The persisted reputation snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ReputationState {
    current_reputation: u32,
    completed_campaigns: Vec<CompletedCampaign>,
    achieved_milestones: BTreeSet<String>,
    pending_bonus_events: Vec<BonusEvent>,
    delivered_bonus_events: Vec<BonusEvent>,
}

// ============================================================================
// Event Rolling
// ============================================================================

/// Roll the catalog for a scored submission and build the events that won
/// their draws. Pure given the injected rng; the caller schedules them.
pub fn roll_events(
    score: &CampaignScore,
    boldness: f64,
    rng: &mut impl Rng,
) -> Vec<BonusEvent> {
    let boldness = boldness.clamp(0.0, 1.0);
    let mut events = Vec::new();

    for entry in event_catalog() {
        if entry.is_penalty {
            continue;
        }
        if score.total < entry.min_score {
            continue;
        }
        let mut probability = entry.probability;
        if entry.boldness_weighted {
            probability *= 0.5 + boldness;
        }
        if rng.gen::<f64>() < probability.min(1.0) {
            let delay = rng.gen_range(entry.delay_secs.0..entry.delay_secs.1);
            events.push(BonusEvent::new(
                entry.kind,
                Some(score.campaign_id.clone()),
                entry.reputation_delta,
                entry.title,
                entry.description,
                delay,
            ));
        }
    }

    // A weak campaign that swung hard risks backlash.
    if backlash_applies(score.total, boldness) {
        if let Some(entry) = event_catalog().into_iter().find(|e| e.is_penalty) {
            if rng.gen::<f64>() < entry.probability {
                let delay = rng.gen_range(entry.delay_secs.0..entry.delay_secs.1);
                events.push(BonusEvent::new(
                    entry.kind,
                    Some(score.campaign_id.clone()),
                    entry.reputation_delta,
                    entry.title,
                    entry.description,
                    delay,
                ));
            }
        }
    }

    events
}

// ============================================================================
// Reputation Service
// ============================================================================

struct ReputationCore {
    state: RwLock<ReputationState>,
    store: Arc<dyn SnapshotStore>,
    rng: Mutex<StdRng>,
    delivered_tx: mpsc::Sender<BonusEvent>,
    /// One-shot upward tier-crossing signal for the UI.
    level_up: Mutex<Option<ReputationTier>>,
}

/// Owned service object for reputation and delayed consequences. Cheap to
/// clone; all clones share the same core.
#[derive(Clone)]
pub struct ReputationService {
    core: Arc<ReputationCore>,
}

impl ReputationService {
    /// Create the service, loading any persisted snapshot. Returns the
    /// delivered-events receiver the Consequence Renderer consumes.
    pub fn new(store: Arc<dyn SnapshotStore>) -> (Self, mpsc::Receiver<BonusEvent>) {
        Self::with_rng(store, StdRng::from_entropy())
    }

    /// Create with an explicit rng for reproducible draws.
    pub fn with_rng(
        store: Arc<dyn SnapshotStore>,
        rng: StdRng,
    ) -> (Self, mpsc::Receiver<BonusEvent>) {
        let state = match store.load(REPUTATION_STORE_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("Corrupt reputation snapshot — starting fresh: {e}");
                    ReputationState::default()
                }
            },
            Ok(None) => ReputationState::default(),
            Err(e) => {
                log::warn!("Failed to load reputation snapshot — starting fresh: {e}");
                ReputationState::default()
            }
        };

        let (delivered_tx, delivered_rx) = mpsc::channel(DELIVERED_CHANNEL_CAPACITY);
        let service = Self {
            core: Arc::new(ReputationCore {
                state: RwLock::new(state),
                store,
                rng: Mutex::new(rng),
                delivered_tx,
                level_up: Mutex::new(None),
            }),
        };
        (service, delivered_rx)
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Score a submitted campaign: apply the immediate tier gain, append
    /// history, grant newly-achieved milestones (each at most once, ever),
    /// and roll/arm delayed bonus events.
    pub async fn submit_campaign(&self, facts: &OutcomeFacts) -> CampaignScore {
        let (score, scheduled) = {
            let mut rng = self.core.rng.lock().unwrap();
            let score = score_campaign(facts, &mut *rng);
            let scheduled = roll_events(&score, facts.concept_boldness, &mut *rng);
            (score, scheduled)
        };

        {
            let mut state = self.core.state.write().await;

            ReputationCore::apply_delta(
                &mut state,
                &self.core.level_up,
                score.reputation_gain as i32,
            );

            state.completed_campaigns.push(CompletedCampaign {
                campaign_id: facts.campaign_id.clone(),
                score: score.total,
                was_under_budget: facts.was_under_budget,
                industry: facts.industry.clone(),
                completed_at: Utc::now(),
            });

            // Milestones fire at most once ever, guarded by the achieved set.
            for rule in milestone_rules() {
                if state.achieved_milestones.contains(rule.id) {
                    continue;
                }
                if (rule.condition)(&state.completed_campaigns) {
                    state.achieved_milestones.insert(rule.id.to_string());
                    ReputationCore::apply_delta(
                        &mut state,
                        &self.core.level_up,
                        rule.reputation_bonus as i32,
                    );
                    log::info!("Milestone achieved: {} ({})", rule.title, rule.id);
                }
            }

            for event in &scheduled {
                log::info!(
                    "Scheduled {} for campaign {} at {}",
                    event.kind,
                    facts.campaign_id,
                    event.scheduled_for
                );
                state.pending_bonus_events.push(event.clone());
            }

            self.core.persist(&state);
        }

        for event in &scheduled {
            self.arm_timer(event);
        }

        score
    }

    // ------------------------------------------------------------------
    // Delivery
    // ------------------------------------------------------------------

    /// Re-arm timers for persisted pending events after a restart. The
    /// sweep remains the correctness backstop either way.
    pub async fn resume_timers(&self) {
        let state = self.core.state.read().await;
        for event in &state.pending_bonus_events {
            self.arm_timer(event);
        }
        if !state.pending_bonus_events.is_empty() {
            log::info!(
                "Re-armed {} pending bonus event timer(s)",
                state.pending_bonus_events.len()
            );
        }
    }

    /// Sweep the pending set for due events, deliver them, and return them
    /// for rendering. Covers timers lost to a restart; idempotent against
    /// timer delivery.
    pub async fn process_pending_events(&self) -> Vec<BonusEvent> {
        let now = Utc::now();
        let due_ids: Vec<String> = {
            let state = self.core.state.read().await;
            state
                .pending_bonus_events
                .iter()
                .filter(|e| e.is_due(now))
                .map(|e| e.id.clone())
                .collect()
        };

        let mut delivered = Vec::new();
        for id in due_ids {
            if let Some(event) = self.core.deliver(&id).await {
                delivered.push(event);
            }
        }
        delivered
    }

    fn arm_timer(&self, event: &BonusEvent) {
        let core = self.core.clone();
        let event_id = event.id.clone();
        let scheduled_for = event.scheduled_for;
        tokio::spawn(async move {
            let delay = (scheduled_for - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(delay).await;
            core.deliver(&event_id).await;
        });
    }

    // ------------------------------------------------------------------
    // Direct adjustments
    // ------------------------------------------------------------------

    /// Apply a positive reputation delta.
    pub async fn add_reputation(&self, amount: u32) {
        let mut state = self.core.state.write().await;
        ReputationCore::apply_delta(&mut state, &self.core.level_up, amount as i32);
        self.core.persist(&state);
    }

    /// Apply a negative reputation delta, floor-clamped at zero.
    pub async fn subtract_reputation(&self, amount: u32) {
        let mut state = self.core.state.write().await;
        ReputationCore::apply_delta(&mut state, &self.core.level_up, -(amount as i32));
        self.core.persist(&state);
    }

    /// Consume the one-shot level-up signal, clearing it.
    pub fn take_level_up(&self) -> Option<ReputationTier> {
        self.core.level_up.lock().unwrap().take()
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub async fn current_reputation(&self) -> u32 {
        self.core.state.read().await.current_reputation
    }

    pub async fn tier(&self) -> ReputationTier {
        ReputationTier::for_reputation(self.current_reputation().await)
    }

    pub async fn completed_campaigns(&self) -> Vec<CompletedCampaign> {
        self.core.state.read().await.completed_campaigns.clone()
    }

    pub async fn achieved_milestones(&self) -> BTreeSet<String> {
        self.core.state.read().await.achieved_milestones.clone()
    }

    pub async fn pending_events(&self) -> Vec<BonusEvent> {
        self.core.state.read().await.pending_bonus_events.clone()
    }

    pub async fn delivered_events(&self) -> Vec<BonusEvent> {
        self.core.state.read().await.delivered_bonus_events.clone()
    }

    /// Full data reset.
    pub async fn reset(&self) {
        let mut state = self.core.state.write().await;
        *state = ReputationState::default();
        self.core.persist(&state);
        *self.core.level_up.lock().unwrap() = None;
        log::info!("Reputation state reset");
    }
}

impl ReputationCore {
    /// Deliver one event by id: remove from pending, apply its delta, move
    /// to the delivered list. Keyed one-way transition — a second attempt
    /// (timer + sweep racing) finds nothing and is a no-op.
    async fn deliver(&self, event_id: &str) -> Option<BonusEvent> {
        let event = {
            let mut state = self.state.write().await;
            let position = state
                .pending_bonus_events
                .iter()
                .position(|e| e.id == event_id && !e.delivered)?;
            let mut event = state.pending_bonus_events.remove(position);
            event.mark_delivered();
            Self::apply_delta(&mut state, &self.level_up, event.reputation_delta);
            state.delivered_bonus_events.push(event.clone());
            self.persist(&state);
            event
        };

        log::info!(
            "Delivered bonus event {} ({:+} reputation)",
            event.title,
            event.reputation_delta
        );
        if self.delivered_tx.try_send(event.clone()).is_err() {
            // Renderer not keeping up or not attached; the delivered list
            // and sweep return path still carry the event.
            log::debug!("Delivered-events channel full or closed");
        }
        Some(event)
    }

    /// Apply a signed delta with a floor of zero; upward tier crossings
    /// raise the one-shot level-up signal.
    fn apply_delta(
        state: &mut ReputationState,
        level_up: &Mutex<Option<ReputationTier>>,
        delta: i32,
    ) {
        let before = ReputationTier::for_reputation(state.current_reputation);
        state.current_reputation =
            (state.current_reputation as i64 + delta as i64).max(0) as u32;
        let after = ReputationTier::for_reputation(state.current_reputation);
        if after > before {
            log::info!("Agency tier up: {before} → {after}");
            *level_up.lock().unwrap() = Some(after);
        }
    }

    /// Persist the snapshot. Failures are logged and swallowed.
    fn persist(&self, state: &ReputationState) {
        match serde_json::to_vec(state) {
            Ok(bytes) => {
                if let Err(e) = self.store.save(REPUTATION_STORE_KEY, &bytes) {
                    log::warn!("Failed to persist reputation snapshot: {e}");
                }
            }
            Err(e) => log::warn!("Failed to serialize reputation snapshot: {e}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
