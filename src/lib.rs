//! Channel Insight - Comment Graph Analysis for YouTube Channels
//!
//! A Rust library that harvests the comments of a channel or video and turns
//! them into a ranked influencer list, a sentiment profile, a community
//! partition and a trend forecast.
//!
//! # Features
//!
//! - Resolve channel URLs, handles, usernames and video links
//! - Paginated, retrying comment collection with partial-failure tolerance
//! - Batched star-rating sentiment classification with charts
//! - Six-factor influencer scoring over the reply graph
//! - Louvain community detection with centrality summaries
//! - Per-project result history and heuristic trend forecasts

/// Community detection
pub mod community;
/// Configuration management
pub mod config;
/// Error types and pipeline diagnostics
pub mod error;
/// Result export
pub mod export;
/// Lexical comment features
pub mod features;
/// Trend forecasting
pub mod forecast;
/// Reply graph
pub mod graph;
/// Per-video comment harvesting
pub mod harvest;
/// Influencer scoring
pub mod influence;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Video-platform API seam
pub mod platform;
/// Chart rendering and word frequencies
pub mod render;
/// Retry with backoff
pub mod retry;
/// Sentiment classification
pub mod sentiment;
/// Pipeline orchestration
pub mod service;
/// Reference resolution and collection
pub mod source;
/// Result persistence
pub mod store;
/// Numeric and text helpers
pub mod utils;
/// Input validation and sanitization
pub mod validation;
/// YouTube Data API client
pub mod youtube;

// Re-export key components for easier access
pub use error::{Diagnostics, ErrorKind, InsightError, Result};
pub use harvest::{CancellationFlag, Progress};
pub use models::{AnalysisResult, ChannelId, CommentRecord, InfluencerScore, ReplyEdge, VideoId};
pub use service::AnalysisService;
pub use store::{ResilientStore, ResultStore, SledResultStore};
