//! Live Updates
//!
//! Keeps the dashboard current through a single WebSocket connection to the
//! backend, falling back to periodic statistics polling while it is down.
//!
//! ## Architecture
//!
//! - **LiveClient**: Controller event loop; sole owner of the session and state machine
//! - **Connection**: Per-attempt socket task with keepalive
//! - **State**: Explicit `Disconnected -> Connecting -> Connected` machine
//! - **Messages**: Inbound frame formats
//!
//! ## Lifecycle
//!
//! On start the client loads statistics and history, opens the connection and
//! starts the poller. A close schedules one reconnect after a fixed delay; a
//! manual [`LiveHandle::reconnect`] cancels that timer and connects at once.
//!
//! ```text
//! stats frame          -> replace snapshot, refresh counters/chart/metrics
//! classification frame -> quality/probabilities/recommendations, prepend feed,
//!                         refetch statistics
//! other frames         -> ignored
//! ```

mod client;
mod connection;
mod messages;
mod state;

pub use client::{FetchOrigin, LiveClient, LiveConfig, LiveError, LiveHandle};
pub use messages::{InboundMessage, MessageError, KEEPALIVE_TOKEN};
pub use state::{ConnectionState, ConnectionStateMachine, TransitionError};
