//! Video-platform API seam
//!
//! The pipeline needs five read operations from the platform. They are
//! expressed as a trait so the HTTP client can be swapped for an in-memory
//! fake in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ChannelId, VideoId};

/// How to look a channel up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelLookup {
    /// Canonical `UC…` id
    Id(ChannelId),
    /// Legacy username (`/user/<name>`)
    Username(String),
}

/// Channel resource as returned by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelResource {
    /// Channel identifier
    pub channel_id: ChannelId,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Country code, if published
    pub country: Option<String>,
    /// Subscriber count, 0 when hidden
    pub subscriber_count: u64,
    /// Public video count
    pub video_count: u64,
    /// Lifetime views
    pub view_count: u64,
}

/// Video entry from a channel listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSummary {
    /// Video identifier
    pub video_id: VideoId,
    /// Title
    pub title: String,
    /// Publish time
    pub published_at: DateTime<Utc>,
}

/// One page of a channel's video listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoPage {
    /// Videos on this page, newest first
    pub videos: Vec<VideoSummary>,
    /// Token for the next page
    pub next_page_token: Option<String>,
}

/// Video with statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResource {
    /// Video identifier
    pub video_id: VideoId,
    /// Owning channel
    pub channel_id: ChannelId,
    /// Title
    pub title: String,
    /// Publish time
    pub published_at: DateTime<Utc>,
    /// Views
    pub view_count: u64,
    /// Likes
    pub like_count: u64,
    /// Comments
    pub comment_count: u64,
}

/// Single comment as returned by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComment {
    /// Comment identifier
    pub comment_id: String,
    /// Author channel id
    pub author_id: String,
    /// Author display name
    pub author_name: String,
    /// Plain text
    pub text: String,
    /// Publish time
    pub published_at: DateTime<Utc>,
    /// Last edit time
    pub updated_at: DateTime<Utc>,
    /// Likes
    pub like_count: u64,
    /// Parent comment for replies
    pub parent_id: Option<String>,
}

/// A top-level comment with the replies delivered alongside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentThread {
    /// Top-level comment
    pub top_level: RawComment,
    /// Replies in the whole thread, which may exceed `replies.len()`
    pub total_reply_count: u64,
    /// Replies delivered on this page
    pub replies: Vec<RawComment>,
}

/// One page of comment threads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentThreadPage {
    /// Threads on this page
    pub threads: Vec<CommentThread>,
    /// Token for the next page
    pub next_page_token: Option<String>,
}

/// Read operations the pipeline needs from the platform
#[async_trait]
pub trait VideoPlatformApi: Send + Sync {
    /// Find a channel by handle or free-text query
    async fn search_channel(&self, query: &str) -> Result<Option<ChannelId>>;

    /// Look a channel up by id or legacy username
    async fn lookup_channel(&self, lookup: &ChannelLookup) -> Result<Option<ChannelResource>>;

    /// One page of a channel's videos published after `published_after`
    async fn list_videos(
        &self,
        channel_id: &ChannelId,
        published_after: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<VideoPage>;

    /// Statistics for the given videos; unknown ids are omitted
    async fn video_statistics(&self, video_ids: &[VideoId]) -> Result<Vec<VideoResource>>;

    /// One page of comment threads for a video
    async fn comment_threads(
        &self,
        video_id: &VideoId,
        page_token: Option<&str>,
    ) -> Result<CommentThreadPage>;
}
