//! Minimal Twitch Helix API client.
//!
//! Covers the single endpoint needed to poll live status,
//! `GET /helix/streams`, and exposes the `Ratelimit-*` headers of the
//! last response so callers can throttle themselves.

pub mod client;
pub mod error;
pub mod models;

pub use client::{DEFAULT_BASE_URL, HelixClient};
pub use error::HelixError;
pub use models::{RateLimit, Stream, StreamType, StreamsParams, StreamsResponse};
