mod grader;
mod manager;
mod queries;
mod results;
mod scorer;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use grader::{SectionGrader, SectionSubmission};
pub use manager::{SessionManager, StartedAttempt};
pub use results::{ResultsService, Viewer};
pub use scorer::AggregateScorer;
