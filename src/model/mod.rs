//! Classification data model
//!
//! Values shared by the live client, the display aggregator and the hosted
//! backend adapter.

mod feed;
mod recommendation;
mod types;

pub use feed::{ActivityFeed, DEFAULT_FEED_CAPACITY};
pub use recommendation::{Clause, Recommendation, Severity, CLAUSE_DELIMITER};
pub use types::{
    Category, CategoryCounts, ClassProbabilities, ClassificationEvent, ImageQuality,
    StatisticsSnapshot,
};
