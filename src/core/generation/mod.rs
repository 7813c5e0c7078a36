//! Generation Module
//!
//! Clients for the external generative services:
//! - `provider`: text/image service traits + HTTP implementations
//! - `concept_gen`: the Brief/Concept collaborator
//! - `deliverable_gen`: per-deliverable content generation with bounded retry

pub mod concept_gen;
pub mod deliverable_gen;
pub mod provider;

pub use concept_gen::ConceptGenerator;
pub use deliverable_gen::{DeliverableGenerator, GeneratedAsset};
pub use provider::{
    GenerationError, GenerationResult, HttpImageService, HttpTextService, ImageGenService,
    TextGenService,
};
