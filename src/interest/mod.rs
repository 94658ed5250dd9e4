pub mod penalty;

pub use penalty::{PenaltyAccrual, PenaltyConfig, PenaltyEngine, PenaltyOutcome};
