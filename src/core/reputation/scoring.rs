//! Campaign Scoring Function
//!
//! Pure scoring of a finished campaign: four weighted sub-scores combined
//! into a rounded total, mapped to a tier, a half-step star rating, and a
//! base reputation gain. The random source is injected so every draw is
//! reproducible in tests.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Sub-score weights: strategic fit, execution, budget efficiency,
/// audience resonance.
const WEIGHTS: (f64, f64, f64, f64) = (0.3, 0.3, 0.2, 0.2);

// ============================================================================
// Outcome Facts
// ============================================================================

/// The facts about a submitted campaign that scoring runs on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeFacts {
    pub campaign_id: String,
    /// Boldness of the selected concept, 0.0-1.0.
    pub concept_boldness: f64,
    pub deliverable_count: usize,
    /// Total revision cycles across all deliverables.
    pub revision_count: u32,
    pub was_under_budget: bool,
    /// Production spend over production budget.
    pub budget_utilization: f64,
    /// Distinct tools used while working the campaign.
    pub tools_used: usize,
    pub industry: String,
    pub team_size: usize,
}

// ============================================================================
// Score Tier
// ============================================================================

/// Quality bracket of a campaign total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    /// Total >= 90
    Exceptional,
    /// Total >= 80
    Great,
    /// Total >= 70
    Solid,
    /// Total < 70
    NeedsImprovement,
}

impl ScoreTier {
    /// Map a total score to its tier.
    pub fn from_total(total: u32) -> Self {
        match total {
            90..=u32::MAX => Self::Exceptional,
            80..=89 => Self::Great,
            70..=79 => Self::Solid,
            _ => Self::NeedsImprovement,
        }
    }

    /// Base reputation gain applied immediately on submission.
    pub fn reputation_gain(&self) -> u32 {
        match self {
            Self::Exceptional => 5,
            Self::Great => 3,
            Self::Solid => 1,
            Self::NeedsImprovement => 0,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Exceptional => "Exceptional",
            Self::Great => "Great",
            Self::Solid => "Solid",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }
}

impl std::fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Score Types
// ============================================================================

/// The four weighted sub-scores, each clamped to [0, 100].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub strategic_fit: f64,
    pub execution_quality: f64,
    pub budget_efficiency: f64,
    pub audience_resonance: f64,
}

/// A scored campaign outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignScore {
    pub campaign_id: String,
    /// Weighted, rounded total in [0, 100].
    pub total: u32,
    pub breakdown: ScoreBreakdown,
    pub tier: ScoreTier,
    /// Half-step rating in [1.0, 5.0].
    pub star_rating: f32,
    /// Base gain from the tier (milestone and event deltas come later).
    pub reputation_gain: u32,
}

// ============================================================================
// Scoring
// ============================================================================

/// Score a submitted campaign. Deterministic given the injected rng.
pub fn score_campaign(facts: &OutcomeFacts, rng: &mut impl Rng) -> CampaignScore {
    let boldness = facts.concept_boldness.clamp(0.0, 1.0);
    let tool_bonus = (facts.tools_used.min(5) * 2) as f64;

    let strategic_fit =
        (55.0 + tool_bonus + boldness * 10.0 + rng.gen_range(0.0..15.0)).clamp(0.0, 100.0);

    let execution_quality = (72.0 - 6.0 * facts.revision_count as f64
        + 2.0 * facts.deliverable_count.min(5) as f64
        + rng.gen_range(0.0..12.0))
    .clamp(0.0, 100.0);

    let budget_efficiency = if facts.was_under_budget {
        let headroom = (1.0 - facts.budget_utilization).clamp(0.0, 1.0);
        (78.0 + headroom * 10.0 + rng.gen_range(0.0..12.0)).clamp(0.0, 100.0)
    } else {
        let overrun = (facts.budget_utilization - 1.0).clamp(0.0, 1.0);
        (45.0 - overrun * 25.0 + rng.gen_range(0.0..10.0)).clamp(0.0, 100.0)
    };

    let audience_resonance =
        (48.0 + boldness * 32.0 + rng.gen_range(0.0..20.0)).clamp(0.0, 100.0);

    let weighted = WEIGHTS.0 * strategic_fit
        + WEIGHTS.1 * execution_quality
        + WEIGHTS.2 * budget_efficiency
        + WEIGHTS.3 * audience_resonance;
    let total = (weighted.round() as u32).min(100);

    let tier = ScoreTier::from_total(total);

    CampaignScore {
        campaign_id: facts.campaign_id.clone(),
        total,
        breakdown: ScoreBreakdown {
            strategic_fit,
            execution_quality,
            budget_efficiency,
            audience_resonance,
        },
        tier,
        star_rating: star_rating(total),
        reputation_gain: tier.reputation_gain(),
    }
}

/// Half-step star rating: total / 20 rounded to the nearest 0.5, floored
/// at one star.
fn star_rating(total: u32) -> f32 {
    let raw = total as f32 / 20.0;
    ((raw * 2.0).round() / 2.0).clamp(1.0, 5.0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn facts() -> OutcomeFacts {
        OutcomeFacts {
            campaign_id: "camp-1".to_string(),
            concept_boldness: 0.8,
            deliverable_count: 4,
            revision_count: 1,
            was_under_budget: true,
            budget_utilization: 0.7,
            tools_used: 2,
            industry: "food_and_beverage".to_string(),
            team_size: 3,
        }
    }

    #[test]
    fn test_tier_boundaries_exact() {
        assert_eq!(ScoreTier::from_total(90), ScoreTier::Exceptional);
        assert_eq!(ScoreTier::from_total(89), ScoreTier::Great);
        assert_eq!(ScoreTier::from_total(80), ScoreTier::Great);
        assert_eq!(ScoreTier::from_total(79), ScoreTier::Solid);
        assert_eq!(ScoreTier::from_total(70), ScoreTier::Solid);
        assert_eq!(ScoreTier::from_total(69), ScoreTier::NeedsImprovement);
        assert_eq!(ScoreTier::from_total(0), ScoreTier::NeedsImprovement);
    }

    #[test]
    fn test_reputation_gain_by_tier() {
        assert_eq!(ScoreTier::from_total(90).reputation_gain(), 5);
        assert_eq!(ScoreTier::from_total(89).reputation_gain(), 3);
        assert_eq!(ScoreTier::from_total(75).reputation_gain(), 1);
        assert_eq!(ScoreTier::from_total(42).reputation_gain(), 0);
    }

    #[test]
    fn test_scores_bounded_for_extreme_inputs() {
        let mut rng = StdRng::seed_from_u64(7);
        let extreme = OutcomeFacts {
            campaign_id: "x".to_string(),
            concept_boldness: 99.0, // clamped internally
            deliverable_count: 500,
            revision_count: 200,
            was_under_budget: false,
            budget_utilization: 40.0,
            tools_used: 100,
            industry: "any".to_string(),
            team_size: 4,
        };

        for _ in 0..50 {
            let score = score_campaign(&extreme, &mut rng);
            let b = &score.breakdown;
            for sub in [
                b.strategic_fit,
                b.execution_quality,
                b.budget_efficiency,
                b.audience_resonance,
            ] {
                assert!((0.0..=100.0).contains(&sub), "sub-score out of range: {sub}");
            }
            assert!(score.total <= 100);
            assert!([0, 1, 3, 5].contains(&score.reputation_gain));
        }
    }

    #[test]
    fn test_deterministic_given_seed() {
        let a = score_campaign(&facts(), &mut StdRng::seed_from_u64(42));
        let b = score_campaign(&facts(), &mut StdRng::seed_from_u64(42));
        assert_eq!(a.total, b.total);
        assert_eq!(a.breakdown.strategic_fit, b.breakdown.strategic_fit);
        assert_eq!(a.star_rating, b.star_rating);
    }

    #[test]
    fn test_under_budget_beats_over_budget() {
        // Same seed, identical facts except the budget outcome.
        let mut under_facts = facts();
        under_facts.budget_utilization = 0.9;
        let mut over_facts = facts();
        over_facts.was_under_budget = false;
        over_facts.budget_utilization = 1.4;

        let under = score_campaign(&under_facts, &mut StdRng::seed_from_u64(3));
        let over = score_campaign(&over_facts, &mut StdRng::seed_from_u64(3));
        assert!(under.breakdown.budget_efficiency > over.breakdown.budget_efficiency);
    }

    #[test]
    fn test_star_rating_half_steps() {
        assert_eq!(star_rating(100), 5.0);
        assert_eq!(star_rating(96), 5.0);
        assert_eq!(star_rating(90), 4.5);
        assert_eq!(star_rating(70), 3.5);
        assert_eq!(star_rating(0), 1.0);

        for total in 0..=100 {
            let stars = star_rating(total);
            assert!((1.0..=5.0).contains(&stars));
            // Half-step grid
            assert_eq!((stars * 2.0).fract(), 0.0);
        }
    }

    #[test]
    fn test_serialization() {
        let score = score_campaign(&facts(), &mut StdRng::seed_from_u64(1));
        let json = serde_json::to_string(&score).unwrap();
        assert!(json.contains("campaignId"));
        assert!(json.contains("starRating"));
        assert!(json.contains("reputationGain"));

        let parsed: CampaignScore = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total, score.total);
        assert_eq!(parsed.tier, score.tier);
    }
}
