//! # Freshwatch
//!
//! Live monitoring client for a fruit freshness classification system. It
//! keeps a dashboard current from the classifier backend's WebSocket feed and
//! REST endpoints, and talks to the hosted data service for auth, history,
//! realtime changes and stored images.
//!
//! ## Features
//!
//! - **Live updates**: Single reconnecting WebSocket with keepalive
//! - **Fallback polling**: Statistics refreshed over HTTP while disconnected
//! - **Display model**: Counters, chart, quality bars, probabilities and activity feed as typed render operations
//! - **Hosted data**: Auth, table queries, realtime change feed and image storage
//!
//! ## Modules
//!
//! - [`live`]: Connection state machine and live update controller
//! - [`display`]: Display aggregator and render sinks
//! - [`session`]: Owned dashboard state
//! - [`api`]: Backend statistics and history client
//! - [`supabase`]: Hosted data service adapter
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use freshwatch::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(BackendClient::new(BackendConfig::default())?);
//!     let session = DashboardSession::new(
//!         20,
//!         DisplayAggregator::default(),
//!         Box::new(TerminalSink::stdout()),
//!     );
//!
//!     let handle = LiveClient::new(LiveConfig::default(), source, session).spawn();
//!     tokio::signal::ctrl_c().await?;
//!
//!     let session = handle.shutdown().await?;
//!     println!("{} entries in feed", session.feed().len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod display;
pub mod live;
pub mod model;
pub mod session;
pub mod supabase;

// Re-export top-level types for convenience
pub use model::{
    ActivityFeed, Category, CategoryCounts, ClassProbabilities, ClassificationEvent, ImageQuality,
    Recommendation, Severity, StatisticsSnapshot,
};

pub use api::{BackendClient, BackendConfig, FetchError, FetchResult, StatsSource};

pub use display::{DisplayAggregator, DisplaySink, RenderOp, TerminalSink};

pub use live::{
    ConnectionState, ConnectionStateMachine, LiveClient, LiveConfig, LiveError, LiveHandle,
};

pub use session::{DashboardSession, Reaction};

pub use supabase::{SupabaseClient, SupabaseConfig, SupabaseError, SupabaseResult};

pub use config::{Config, ConfigError, LoggingConfig};
