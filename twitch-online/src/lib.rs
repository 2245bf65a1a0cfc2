//! Watch Twitch channels and get called back when they go online or offline.
//!
//! ```no_run
//! use std::time::Duration;
//! use twitch_online::{Params, StreamMonitor};
//!
//! # async fn run() -> twitch_online::Result<()> {
//! let monitor = StreamMonitor::new(Some(Params::new("client-id", "oauth-token")))?;
//! monitor.add_channels(["71092938"]).await;
//! monitor.on_online(|stream| println!("{} is online", stream.user_name));
//! monitor.on_offline(|channel_id| println!("{channel_id} is offline"));
//! monitor.set_interval(Duration::from_secs(10))?;
//! monitor.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod monitor;

pub use config::{MonitorConfig, Params};
pub use error::{Error, Result};
pub use monitor::{
    CheckSummary, MonitorState, OfflineHandler, OnlineHandler, QueryError, StreamMonitor,
    StreamQuery,
};

pub use helix_api::{HelixClient, RateLimit, Stream, StreamType, StreamsParams};
