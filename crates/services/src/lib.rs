#![forbid(unsafe_code)]

pub mod app_services;
pub mod blueprint_store;
pub mod error;
pub mod sessions;

pub use placement_core::Clock;

pub use app_services::PlacementServices;
pub use blueprint_store::BlueprintStore;
pub use error::{BlueprintStoreError, PlacementServicesError, ResultsError, SessionError};
pub use sessions::{
    AggregateScorer, ResultsService, SectionGrader, SectionSubmission, SessionManager,
    StartedAttempt, Viewer,
};
