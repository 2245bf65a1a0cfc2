//! Stream Monitor module for detecting live status.
//!
//! The Stream Monitor is responsible for:
//! - Tracking the registered channel IDs
//! - Polling the stream query service on an interval or on demand
//! - Backing off while the API rate limit is exhausted
//! - Firing the online/offline callbacks for every checked channel

mod dispatcher;
mod query;
mod rate_limiter;
mod registry;
mod service;

pub use dispatcher::{CallbackDispatcher, CheckSummary, OfflineHandler, OnlineHandler};
pub use query::{QueryError, StreamQuery};
pub use rate_limiter::{RateLimitGovernor, wait_duration};
pub use registry::{ChannelRegistry, Channels};
pub use service::{MonitorState, StreamMonitor};
