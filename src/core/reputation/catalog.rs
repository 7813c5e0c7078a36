//! Event & Milestone Catalogs
//!
//! Static tables driving the reputation engine: the bonus/penalty event
//! kinds with their gates, probabilities, deltas, and delay ranges, and the
//! one-time milestone rules evaluated over completed-campaign history.

use serde::{Deserialize, Serialize};

use super::event_types::CompletedCampaign;

/// Scores at or above this count as "high quality" for milestone purposes.
pub const HIGH_QUALITY_SCORE: u32 = 85;

// ============================================================================
// Event Kinds
// ============================================================================

/// Kind of delayed consequence, drawn from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AwardCannes,
    AwardLocal,
    ViralMoment,
    ClientReferral,
    PressFeature,
    Backlash,
}

impl EventKind {
    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::AwardCannes => "Cannes Lion",
            Self::AwardLocal => "Local Award",
            Self::ViralMoment => "Viral Moment",
            Self::ClientReferral => "Client Referral",
            Self::PressFeature => "Press Feature",
            Self::Backlash => "Backlash",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Event Catalog
// ============================================================================

/// One possible consequence of a submitted campaign.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub kind: EventKind,
    /// Minimum campaign score to be eligible.
    pub min_score: u32,
    /// Base firing probability, rolled uniformly per submission.
    pub probability: f64,
    /// Signed reputation delta applied on delivery.
    pub reputation_delta: i32,
    /// Uniform delay range in seconds (inclusive min, exclusive max).
    pub delay_secs: (u64, u64),
    /// Probability is multiplied by `0.5 + boldness` for these kinds.
    pub boldness_weighted: bool,
    /// Penalty entries never enter the positive roll loop; they fire only
    /// through the low-score/high-boldness path.
    pub is_penalty: bool,
    pub title: &'static str,
    pub description: &'static str,
}

/// The full event catalog.
pub fn event_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            kind: EventKind::AwardCannes,
            min_score: 95,
            probability: 0.25,
            reputation_delta: 8,
            delay_secs: (120, 600),
            boldness_weighted: false,
            is_penalty: false,
            title: "Cannes calling",
            description: "The campaign made the international shortlist — and then won.",
        },
        CatalogEntry {
            kind: EventKind::AwardLocal,
            min_score: 85,
            probability: 0.35,
            reputation_delta: 4,
            delay_secs: (90, 360),
            boldness_weighted: false,
            is_penalty: false,
            title: "Hometown hardware",
            description: "A regional ad club handed you a trophy and a mediocre buffet.",
        },
        CatalogEntry {
            kind: EventKind::ViralMoment,
            min_score: 75,
            probability: 0.30,
            reputation_delta: 5,
            delay_secs: (30, 180),
            boldness_weighted: true,
            is_penalty: false,
            title: "It's everywhere",
            description: "The work escaped containment. Stitches, duets, think-pieces.",
        },
        CatalogEntry {
            kind: EventKind::ClientReferral,
            min_score: 80,
            probability: 0.40,
            reputation_delta: 3,
            delay_secs: (60, 240),
            boldness_weighted: false,
            is_penalty: false,
            title: "A friend of a friend",
            description: "The client bragged about you at a dinner party. New brief incoming.",
        },
        CatalogEntry {
            kind: EventKind::PressFeature,
            min_score: 85,
            probability: 0.30,
            reputation_delta: 4,
            delay_secs: (45, 200),
            boldness_weighted: false,
            is_penalty: false,
            title: "Trade press darling",
            description: "An industry columnist called the work 'actually good, for once'.",
        },
        CatalogEntry {
            kind: EventKind::Backlash,
            min_score: 0,
            probability: 0.35,
            reputation_delta: -4,
            delay_secs: (30, 120),
            boldness_weighted: false,
            is_penalty: true,
            title: "The internet has notes",
            description: "Bold swing, rough landing. The quote-posts are not kind.",
        },
    ]
}

/// Penalty gate: a weak campaign that swung hard risks backlash.
pub fn backlash_applies(score_total: u32, boldness: f64) -> bool {
    score_total < 60 && boldness > 0.7
}

// ============================================================================
// Milestone Rules
// ============================================================================

/// A one-time achievement over cumulative campaign history.
#[derive(Debug, Clone)]
pub struct MilestoneRule {
    /// Stable id stored in the achieved set.
    pub id: &'static str,
    /// Reputation bonus applied once, when first achieved.
    pub reputation_bonus: u32,
    pub title: &'static str,
    /// Condition over the full completed-campaign history.
    pub condition: fn(&[CompletedCampaign]) -> bool,
}

/// The full milestone table.
pub fn milestone_rules() -> Vec<MilestoneRule> {
    vec![
        MilestoneRule {
            id: "campaigns_10",
            reputation_bonus: 3,
            title: "Ten in the book",
            condition: |history| history.len() >= 10,
        },
        MilestoneRule {
            id: "campaigns_25",
            reputation_bonus: 5,
            title: "Quarter century",
            condition: |history| history.len() >= 25,
        },
        MilestoneRule {
            id: "high_quality_5",
            reputation_bonus: 4,
            title: "Quality streak",
            condition: |history| {
                history.iter().filter(|c| c.score >= HIGH_QUALITY_SCORE).count() >= 5
            },
        },
        MilestoneRule {
            id: "high_quality_10",
            reputation_bonus: 6,
            title: "The standard",
            condition: |history| {
                history.iter().filter(|c| c.score >= HIGH_QUALITY_SCORE).count() >= 10
            },
        },
        MilestoneRule {
            id: "industries_3",
            reputation_bonus: 2,
            title: "Range",
            condition: |history| distinct_industries(history) >= 3,
        },
        MilestoneRule {
            id: "industries_5",
            reputation_bonus: 4,
            title: "Omnivore",
            condition: |history| distinct_industries(history) >= 5,
        },
        MilestoneRule {
            id: "under_budget_5",
            reputation_bonus: 3,
            title: "Pennywise",
            condition: |history| history.iter().filter(|c| c.was_under_budget).count() >= 5,
        },
    ]
}

fn distinct_industries(history: &[CompletedCampaign]) -> usize {
    let mut industries: Vec<&str> = history.iter().map(|c| c.industry.as_str()).collect();
    industries.sort_unstable();
    industries.dedup();
    industries.len()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(score: u32, under_budget: bool, industry: &str) -> CompletedCampaign {
        CompletedCampaign {
            campaign_id: uuid::Uuid::new_v4().to_string(),
            score,
            was_under_budget: under_budget,
            industry: industry.to_string(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_catalog_shape() {
        let catalog = event_catalog();
        assert_eq!(catalog.len(), 6);

        let cannes = catalog
            .iter()
            .find(|e| e.kind == EventKind::AwardCannes)
            .unwrap();
        assert_eq!(cannes.min_score, 95);
        assert!(cannes.reputation_delta > 0);

        let viral = catalog
            .iter()
            .find(|e| e.kind == EventKind::ViralMoment)
            .unwrap();
        assert!(viral.boldness_weighted);

        let backlash = catalog
            .iter()
            .find(|e| e.kind == EventKind::Backlash)
            .unwrap();
        assert!(backlash.is_penalty);
        assert!(backlash.reputation_delta < 0);

        for entry in &catalog {
            assert!(entry.delay_secs.0 < entry.delay_secs.1);
            assert!((0.0..=1.0).contains(&entry.probability));
        }
    }

    #[test]
    fn test_backlash_gate() {
        assert!(backlash_applies(40, 0.9));
        assert!(!backlash_applies(40, 0.5)); // not bold enough
        assert!(!backlash_applies(75, 0.9)); // score too good
        assert!(!backlash_applies(60, 0.9)); // boundary: 60 is safe
    }

    #[test]
    fn test_campaign_count_milestones() {
        let rules = milestone_rules();
        let ten = rules.iter().find(|r| r.id == "campaigns_10").unwrap();

        let nine: Vec<_> = (0..9).map(|_| record(70, false, "tech")).collect();
        assert!(!(ten.condition)(&nine));

        let mut ten_history = nine;
        ten_history.push(record(70, false, "tech"));
        assert!((ten.condition)(&ten_history));
    }

    #[test]
    fn test_high_quality_counts_85_and_up() {
        let rules = milestone_rules();
        let rule = rules.iter().find(|r| r.id == "high_quality_5").unwrap();

        // 84 does not count as high quality
        let history: Vec<_> = (0..5).map(|_| record(84, false, "tech")).collect();
        assert!(!(rule.condition)(&history));

        let history: Vec<_> = (0..5).map(|_| record(85, false, "tech")).collect();
        assert!((rule.condition)(&history));
    }

    #[test]
    fn test_industry_diversity_counts_distinct() {
        let rules = milestone_rules();
        let rule = rules.iter().find(|r| r.id == "industries_3").unwrap();

        let same = vec![
            record(70, false, "tech"),
            record(70, false, "tech"),
            record(70, false, "tech"),
        ];
        assert!(!(rule.condition)(&same));

        let varied = vec![
            record(70, false, "tech"),
            record(70, false, "fashion"),
            record(70, false, "automotive"),
        ];
        assert!((rule.condition)(&varied));
    }

    #[test]
    fn test_under_budget_milestone() {
        let rules = milestone_rules();
        let rule = rules.iter().find(|r| r.id == "under_budget_5").unwrap();

        let mixed: Vec<_> = (0..10).map(|i| record(70, i % 2 == 0, "tech")).collect();
        assert!((rule.condition)(&mixed)); // 5 under budget

        let spendy: Vec<_> = (0..10).map(|_| record(70, false, "tech")).collect();
        assert!(!(rule.condition)(&spendy));
    }
}
