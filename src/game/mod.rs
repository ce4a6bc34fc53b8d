//! Match simulation: validation, tick loop and conflict rules

pub mod decision;
pub mod events;
pub mod geometry;
pub mod r#match;
pub mod models;
pub mod resolve;
pub mod setup;
pub mod snapshot;

pub use decision::{validate_decisions, Decision, ValidationError};
pub use events::{EliminationCause, MatchEvent, MatchNotifier};
pub use geometry::{Axis, Coordinate, Direction};
pub use models::{MatchConfig, MatchOutcome, MatchResult, MatchSetup, PlayerPosition, PlayerSetup};
pub use r#match::{
    MatchCancel, MatchEngine, MatchError, MatchHandle, MatchPhase, MatchProgress, MatchRegistry,
    MatchSummary,
};
pub use setup::{validate_match_config, FieldViolation, SetupError};
pub use snapshot::{BotRequest, TickSnapshot};
