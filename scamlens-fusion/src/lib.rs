//! # scamlens fusion core
//!
//! Pure signal-fusion library shared by every scamlens scoring call site:
//! - Normalization of provider-specific responses into canonical signals
//! - Availability tracking for partially-failed collaborator sets
//! - Weight resolution with per-request boosts and renormalization
//! - Consensus scoring with conservative disagreement handling
//! - Verdict banding and advice formatting
//! - Brand/domain registry lookups
//!
//! No I/O happens here. Collaborator clients live in scamlens-scan; this
//! crate only ever sees their already-gathered raw responses.

pub mod availability;
pub mod brands;
pub mod consensus;
pub mod engine;
pub mod normalize;
pub mod types;
pub mod verdict;
pub mod weights;

pub use brands::{BrandEntry, BrandRegistry};
pub use consensus::{Consensus, FusionPolicy};
pub use engine::{BrandEvidence, BrandTargets, FusionEngine};
pub use normalize::ProviderFamily;
pub use types::{
    Band, ConsensusLevel, FusionResult, Signal, SourceFailure, SourceId, SourceOutcome,
};
pub use verdict::{BandSet, BandSpec};
pub use weights::WeightTable;
