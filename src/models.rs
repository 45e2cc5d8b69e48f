//! Data models for the analysis pipeline
//!
//! Typed records flowing between stages: platform snapshots, comments and
//! reply edges, derived scores, community and sentiment summaries, and the
//! persisted [`AnalysisResult`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Diagnostics;
use crate::utils::round_to;

/// Canonical platform channel identifier (`UC…`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

/// Platform video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a channel taken once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    /// Channel identifier
    pub channel_id: ChannelId,
    /// Channel title
    pub title: String,
    /// Channel description
    pub description: String,
    /// Subscriber count (0 when hidden)
    pub subscriber_count: u64,
    /// Public video count
    pub video_count: u64,
    /// Lifetime view count
    pub view_count: u64,
    /// Country code, if published
    pub country: Option<String>,
    /// views / subscribers / videos
    pub engagement_rate: f64,
}

impl ChannelMetadata {
    /// Compute the channel engagement rate, 0 when either divisor is 0.
    #[must_use]
    pub fn compute_engagement_rate(views: u64, subscribers: u64, videos: u64) -> f64 {
        if subscribers == 0 || videos == 0 {
            return 0.0;
        }
        round_to(views as f64 / subscribers as f64 / videos as f64, 4)
    }
}

/// One collected video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Video identifier
    pub video_id: VideoId,
    /// Title
    pub title: String,
    /// Publish time
    pub published_at: DateTime<Utc>,
    /// View count
    pub view_count: u64,
    /// Like count
    pub like_count: u64,
    /// Comment count reported by the platform
    pub comment_count: u64,
    /// likes / views, in percent
    pub like_rate: f64,
    /// comments / views, in percent
    pub comment_rate: f64,
}

impl VideoRecord {
    /// Build a record and derive its like/comment rates.
    #[must_use]
    pub fn new(
        video_id: VideoId,
        title: String,
        published_at: DateTime<Utc>,
        view_count: u64,
        like_count: u64,
        comment_count: u64,
    ) -> Self {
        let rate = |n: u64| {
            if view_count == 0 {
                0.0
            } else {
                round_to(n as f64 / view_count as f64 * 100.0, 2)
            }
        };
        Self {
            like_rate: rate(like_count),
            comment_rate: rate(comment_count),
            video_id,
            title,
            published_at,
            view_count,
            like_count,
            comment_count,
        }
    }
}

/// Per-comment lexical features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFeatures {
    /// Length in characters
    pub length: usize,
    /// Whitespace-separated word count
    pub word_count: usize,
    /// Contains `?`
    pub has_question: bool,
    /// Contains `!`
    pub has_exclamation: bool,
    /// Contains a URL
    pub has_link: bool,
    /// Contains an `@mention`
    pub has_mention: bool,
    /// Contains a `#tag`
    pub has_hashtag: bool,
    /// Contains a character from the emoji blocks
    pub has_emoji: bool,
    /// Uppercase letters / all letters
    pub uppercase_ratio: f64,
    /// Lexical polarity in [-1, 1]
    pub polarity: f64,
    /// Lexical subjectivity in [0, 1]
    pub subjectivity: f64,
    /// Detected language code
    pub language: Option<String>,
}

/// Sentiment bucket derived from the star rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    /// 4-5 stars
    Positive,
    /// 3 stars
    Neutral,
    /// 1-2 stars
    Negative,
}

impl SentimentLabel {
    /// Bucket a 1-5 star rating
    #[must_use]
    pub const fn from_stars(stars: u8) -> Self {
        match stars {
            4..=u8::MAX => Self::Positive,
            3 => Self::Neutral,
            _ => Self::Negative,
        }
    }

    /// Display name used in charts and exports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

/// Classifier output attached to a comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentSentiment {
    /// Star rating 1-5
    pub stars: u8,
    /// `stars * 2`, range 2-10
    pub score: f64,
    /// Bucket
    pub label: SentimentLabel,
    /// Model confidence for the winning class
    pub confidence: f64,
}

/// A collected comment or reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Comment identifier
    pub comment_id: String,
    /// Video the comment belongs to
    pub video_id: VideoId,
    /// Author channel id
    pub author_id: String,
    /// Author display name
    pub author_name: String,
    /// Plain text body
    pub text: String,
    /// Publish time
    pub published_at: DateTime<Utc>,
    /// Last edit time
    pub updated_at: DateTime<Utc>,
    /// Like count
    pub like_count: u64,
    /// True for replies
    pub is_reply: bool,
    /// Parent comment id for replies
    pub parent_id: Option<String>,
    /// Author is the channel owner
    pub is_channel_owner: bool,
    /// Thread-level reply total (top-level comments only)
    pub total_reply_count: u64,
    /// Lexical features, once extracted
    pub features: Option<TextFeatures>,
    /// Classifier output, once classified
    pub sentiment: Option<CommentSentiment>,
}

impl CommentRecord {
    /// Create a top-level comment with zero counters.
    #[must_use]
    pub fn new(
        comment_id: impl Into<String>,
        video_id: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            comment_id: comment_id.into(),
            video_id: VideoId(video_id.into()),
            author_id: author_id.into(),
            author_name: author_name.into(),
            text: text.into(),
            published_at: now,
            updated_at: now,
            like_count: 0,
            is_reply: false,
            parent_id: None,
            is_channel_owner: false,
            total_reply_count: 0,
            features: None,
            sentiment: None,
        }
    }

    /// Set the like count
    #[must_use]
    pub const fn with_likes(mut self, likes: u64) -> Self {
        self.like_count = likes;
        self
    }

    /// Set the thread-level reply total
    #[must_use]
    pub const fn with_reply_count(mut self, replies: u64) -> Self {
        self.total_reply_count = replies;
        self
    }

    /// Set publish and update time
    #[must_use]
    pub const fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = at;
        self.updated_at = at;
        self
    }

    /// Mark as a reply to `parent_id`
    #[must_use]
    pub fn reply_to(mut self, parent_id: impl Into<String>) -> Self {
        self.is_reply = true;
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Mark as written by the channel owner
    #[must_use]
    pub const fn from_owner(mut self) -> Self {
        self.is_channel_owner = true;
        self
    }

    /// True when the body has non-whitespace text
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Directed "from replied to to" edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEdge {
    /// Replying author
    pub from_author: String,
    /// Author of the parent comment
    pub to_author: String,
    /// Video the thread belongs to
    pub video_id: VideoId,
    /// Reply publish time
    pub timestamp: DateTime<Utc>,
}

/// Ranked influencer with component scores and raw counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerScore {
    /// Author channel id
    pub author_id: String,
    /// Author display name
    pub author_name: String,
    /// Likes and replies received, 0-10
    pub engagement: f64,
    /// Presence across videos, 0-10
    pub consistency: f64,
    /// Replies received and owner attention, 0-10
    pub network: f64,
    /// Comment length and lexical polarity, 0-10
    pub quality: f64,
    /// Comment volume, 0-10
    pub activity: f64,
    /// Replies given, 0-10
    pub responsiveness: f64,
    /// Weighted composite
    pub total: f64,
    /// Comments and replies written
    pub total_comments: u64,
    /// Likes received across all comments
    pub total_likes: u64,
    /// Thread-level replies received on top-level comments
    pub replies_received: u64,
    /// Distinct videos commented on
    pub unique_videos: u64,
    /// Reply edges pointing at the author
    pub in_degree: u64,
    /// Reply edges leaving the author
    pub out_degree: u64,
    /// Replies the channel owner wrote to this author
    pub owner_replies: u64,
    /// Top-level comments started
    pub thread_starts: u64,
    /// Running mean of lexical polarity
    pub mean_polarity: f64,
    /// Mean comment length in characters
    pub mean_length: f64,
}

/// One detected community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// Community index after sorting by size
    pub id: usize,
    /// Member count
    pub size: usize,
    /// Distinct internal pairs / possible pairs
    pub density: f64,
    /// Comments written by members
    pub total_comments: u64,
    /// Likes received by members
    pub total_likes: u64,
    /// Member with highest comments + likes
    pub top_contributor: Option<String>,
    /// Member with highest PageRank inside the community
    pub top_influencer: Option<String>,
    /// Members with highest global betweenness
    pub bridge_users: Vec<String>,
    /// Average local clustering coefficient
    pub clustering_coefficient: f64,
    /// Member author ids, sorted
    pub members: Vec<String>,
}

/// Partition summary of the undirected reply graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    /// All communities found
    pub total_communities: usize,
    /// Modularity of the chosen partition
    pub modularity: f64,
    /// Resolution that produced the chosen partition
    pub resolution_used: f64,
    /// Authors in the projection
    pub total_authors: usize,
    /// Largest communities, detailed
    pub communities: Vec<Community>,
    /// Communities summarized by count only
    pub other_communities: usize,
}

/// Word and its frequency in the comment corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFrequency {
    /// Lowercased word
    pub word: String,
    /// Occurrences
    pub count: usize,
}

/// Highly liked comment with its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopComment {
    /// Comment identifier
    pub comment_id: String,
    /// Author display name
    pub author_name: String,
    /// Comment text
    pub text: String,
    /// Like count
    pub like_count: u64,
    /// Sentiment bucket, if classified
    pub label: Option<SentimentLabel>,
    /// `stars * 2`, if classified
    pub score: Option<f64>,
}

/// Aggregate sentiment of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    /// Mean of per-comment scores, 0-10
    pub overall_score: f64,
    /// Comments classified
    pub analyzed: usize,
    /// 4-5 star comments
    pub positive: usize,
    /// 3 star comments
    pub neutral: usize,
    /// 1-2 star comments
    pub negative: usize,
    /// Base64 word-frequency chart
    pub word_cloud: Option<String>,
    /// Base64 bucket pie chart
    pub pie_chart: Option<String>,
    /// Most frequent words
    pub top_words: Vec<WordFrequency>,
    /// Five most liked comments
    pub top_like_comments: Vec<TopComment>,
}

/// Full structured output of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Owning user
    pub user_id: String,
    /// Owning project
    pub project_id: String,
    /// Reference the run was started from
    pub reference: String,
    /// Channel snapshot
    pub channel: Option<ChannelMetadata>,
    /// Collected videos
    pub videos: Vec<VideoRecord>,
    /// Comments and replies collected
    pub total_comments: usize,
    /// Replies among them
    pub total_replies: usize,
    /// Distinct comment authors
    pub unique_authors: usize,
    /// Reply edges built
    pub total_edges: usize,
    /// Top ranked influencers
    pub influencers: Vec<InfluencerScore>,
    /// Sentiment summary
    pub sentiment: SentimentSummary,
    /// Community summary
    pub communities: CommunitySummary,
    /// Recoverable conditions observed during the run
    pub diagnostics: Diagnostics,
    /// Run stopped early on cancellation
    pub partial: bool,
    /// Completion time
    pub created_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Built-in default payload served when nothing better is available.
    #[must_use]
    pub fn empty(user_id: &str, project_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            project_id: project_id.to_string(),
            reference: String::new(),
            channel: None,
            videos: Vec::new(),
            total_comments: 0,
            total_replies: 0,
            unique_authors: 0,
            total_edges: 0,
            influencers: Vec::new(),
            sentiment: SentimentSummary::default(),
            communities: CommunitySummary::default(),
            diagnostics: Diagnostics::new(),
            partial: false,
            created_at: Utc::now(),
        }
    }
}
