//! Reputation Event Type Definitions
//!
//! Bonus events, the completed-campaign history record, and the reputation
//! tier threshold table.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::EventKind;

// ============================================================================
// Reputation Tier
// ============================================================================

/// Named reputation bracket from a fixed ascending threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReputationTier {
    /// 0+
    #[default]
    FreshShingle,
    /// 10+
    UpAndComer,
    /// 25+
    RespectedShop,
    /// 50+
    RenownedAgency,
    /// 80+
    IndustryLeader,
    /// 120+
    LegendaryHouse,
}

/// Ascending (threshold, tier) table.
pub const TIER_THRESHOLDS: [(u32, ReputationTier); 6] = [
    (0, ReputationTier::FreshShingle),
    (10, ReputationTier::UpAndComer),
    (25, ReputationTier::RespectedShop),
    (50, ReputationTier::RenownedAgency),
    (80, ReputationTier::IndustryLeader),
    (120, ReputationTier::LegendaryHouse),
];

impl ReputationTier {
    /// The tier a reputation value falls in.
    pub fn for_reputation(reputation: u32) -> Self {
        TIER_THRESHOLDS
            .iter()
            .rev()
            .find(|(threshold, _)| reputation >= *threshold)
            .map(|(_, tier)| *tier)
            .unwrap_or_default()
    }

    /// Minimum reputation for this tier.
    pub fn threshold(&self) -> u32 {
        TIER_THRESHOLDS
            .iter()
            .find(|(_, tier)| tier == self)
            .map(|(threshold, _)| *threshold)
            .unwrap_or(0)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::FreshShingle => "Fresh Shingle",
            Self::UpAndComer => "Up-and-Comer",
            Self::RespectedShop => "Respected Shop",
            Self::RenownedAgency => "Renowned Agency",
            Self::IndustryLeader => "Industry Leader",
            Self::LegendaryHouse => "Legendary House",
        }
    }
}

impl std::fmt::Display for ReputationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Completed Campaign Record
// ============================================================================

/// History entry for one completed campaign; the milestone rules count over
/// these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedCampaign {
    pub campaign_id: String,
    pub score: u32,
    pub was_under_budget: bool,
    /// Industry tag copied verbatim from the brief.
    pub industry: String,
    pub completed_at: DateTime<Utc>,
}

// ============================================================================
// Bonus Event
// ============================================================================

/// A delayed, probabilistically-granted reputation consequence. Created
/// once at submission; the only transition is `pending → delivered` and it
/// is never un-scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusEvent {
    /// Unique identifier
    pub id: String,
    /// Catalog kind this event was rolled from
    pub kind: EventKind,
    /// Campaign that earned (or provoked) it
    pub related_campaign_id: Option<String>,
    /// Signed reputation delta applied on delivery
    pub reputation_delta: i32,
    /// Display title for the Consequence Renderer
    pub title: String,
    /// Display description for the Consequence Renderer
    pub description: String,
    /// When the event becomes due
    pub scheduled_for: DateTime<Utc>,
    /// One-way delivery flag
    pub delivered: bool,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

impl BonusEvent {
    /// Create a pending event due `delay_secs` from now.
    pub fn new(
        kind: EventKind,
        related_campaign_id: Option<String>,
        reputation_delta: i32,
        title: impl Into<String>,
        description: impl Into<String>,
        delay_secs: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            related_campaign_id,
            reputation_delta,
            title: title.into(),
            description: description.into(),
            scheduled_for: now + Duration::seconds(delay_secs as i64),
            delivered: false,
            created_at: now,
        }
    }

    /// Whether the event is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.delivered && now >= self.scheduled_for
    }

    /// One-way `pending → delivered`. Returns false if already delivered,
    /// so a timer/sweep race can never apply an event twice.
    pub fn mark_delivered(&mut self) -> bool {
        if self.delivered {
            return false;
        }
        self.delivered = true;
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
