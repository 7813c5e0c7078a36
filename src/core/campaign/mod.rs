//! Campaign Module
//!
//! The campaign data model (brief, concepts, deliverables, phases) and the
//! lifecycle engine that drives a campaign from concepting to completion.

pub mod brief_types;
pub mod campaign_types;
pub mod concept_types;
pub mod deliverable_types;
pub mod engine;

// Re-exports for convenience
pub use brief_types::ClientBrief;
pub use campaign_types::{team_fee_for, Campaign, CampaignPhase};
pub use concept_types::{concept_from_wire, Concept, SuggestedDeliverable};
pub use deliverable_types::{
    Deliverable, DeliverableStatus, DeliverableType, GeneratedWork, ImageSize, Platform,
};
pub use engine::{
    BatchProgress, BatchReport, CampaignError, CampaignResult, CampaignService,
    CAMPAIGN_STORE_KEY,
};
