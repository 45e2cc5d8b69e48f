//! Influencer scoring
//!
//! Each author gets six clamped 0-10 components and a weighted composite.
//! Component values are rounded before weighting so the published total is
//! reproducible from the published components.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::ScoringConfig;
use crate::graph::ReplyGraph;
use crate::models::{CommentRecord, InfluencerScore};
use crate::utils::round2;

/// Composite weights, in component order
pub const WEIGHTS: ScoreWeights = ScoreWeights {
    engagement: 0.25,
    consistency: 0.20,
    network: 0.20,
    quality: 0.15,
    activity: 0.10,
    responsiveness: 0.10,
};

const MAX_COMPONENT: f64 = 10.0;

/// Weight of each component in the composite score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Likes and replies received
    pub engagement: f64,
    /// Presence across videos
    pub consistency: f64,
    /// Replies received and owner attention
    pub network: f64,
    /// Length and lexical polarity
    pub quality: f64,
    /// Volume
    pub activity: f64,
    /// Replies given
    pub responsiveness: f64,
}

/// Running per-author aggregate
#[derive(Debug, Default)]
struct AuthorStats {
    name: String,
    comments: u64,
    likes: u64,
    replies_received: u64,
    videos: HashSet<String>,
    in_degree: u64,
    out_degree: u64,
    owner_replies: u64,
    thread_starts: u64,
    mean_polarity: f64,
    polarity_samples: u64,
    total_length: u64,
}

impl AuthorStats {
    fn add_comment(&mut self, comment: &CommentRecord) {
        self.name.clone_from(&comment.author_name);
        self.comments += 1;
        self.likes += comment.like_count;
        self.total_length += comment.text.chars().count() as u64;
        self.videos.insert(comment.video_id.0.clone());

        if !comment.is_reply {
            self.thread_starts += 1;
            self.replies_received += comment.total_reply_count;
        }

        if let Some(features) = &comment.features {
            self.polarity_samples += 1;
            self.mean_polarity +=
                (features.polarity - self.mean_polarity) / self.polarity_samples as f64;
        }
    }

    fn mean_length(&self) -> f64 {
        if self.comments == 0 {
            0.0
        } else {
            self.total_length as f64 / self.comments as f64
        }
    }
}

/// Ranks comment authors by composite influence
#[derive(Debug, Clone)]
pub struct InfluencerScorer {
    min_comments: u64,
    top: usize,
}

impl InfluencerScorer {
    /// Create a scorer from configuration
    #[must_use]
    pub const fn new(config: &ScoringConfig) -> Self {
        Self {
            min_comments: config.min_comments,
            top: config.top_influencers,
        }
    }

    /// Score every eligible author, best first.
    ///
    /// Reply degrees come from `graph`, so multi-edges between two authors
    /// count once per reply.
    #[must_use]
    pub fn score(&self, comments: &[CommentRecord], graph: &ReplyGraph) -> Vec<InfluencerScore> {
        let mut authors: BTreeMap<&str, AuthorStats> = BTreeMap::new();
        let by_id: HashMap<&str, &CommentRecord> =
            comments.iter().map(|c| (c.comment_id.as_str(), c)).collect();

        for comment in comments {
            authors
                .entry(comment.author_id.as_str())
                .or_default()
                .add_comment(comment);
        }

        // Owner attention is credited to the author being replied to
        for comment in comments.iter().filter(|c| c.is_reply && c.is_channel_owner) {
            let parent_author = comment
                .parent_id
                .as_deref()
                .and_then(|id| by_id.get(id))
                .map(|parent| parent.author_id.as_str());
            match parent_author {
                Some(author) => {
                    if let Some(stats) = authors.get_mut(author) {
                        stats.owner_replies += 1;
                    }
                }
                None => tracing::debug!(
                    comment_id = %comment.comment_id,
                    "Owner reply parent not collected, skipping"
                ),
            }
        }

        for (author, stats) in &mut authors {
            stats.in_degree = graph.in_degree(author) as u64;
            stats.out_degree = graph.out_degree(author) as u64;
        }

        let mut scores: Vec<InfluencerScore> = authors
            .into_iter()
            .filter(|(_, stats)| stats.comments >= self.min_comments)
            .map(|(id, stats)| compute_score(id, &stats))
            .collect();

        scores.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.author_id.cmp(&b.author_id))
        });

        tracing::info!(eligible = scores.len(), "Scored influencers");
        scores
    }

    /// Score and keep the configured number of leaders
    #[must_use]
    pub fn rank(&self, comments: &[CommentRecord], graph: &ReplyGraph) -> Vec<InfluencerScore> {
        let mut scores = self.score(comments, graph);
        scores.truncate(self.top);
        scores
    }
}

fn clamp(value: f64) -> f64 {
    round2(value.clamp(0.0, MAX_COMPONENT))
}

/// Weighted composite of already-rounded components
#[must_use]
pub fn composite(components: [f64; 6]) -> f64 {
    let [engagement, consistency, network, quality, activity, responsiveness] = components;
    round2(
        WEIGHTS.engagement * engagement
            + WEIGHTS.consistency * consistency
            + WEIGHTS.network * network
            + WEIGHTS.quality * quality
            + WEIGHTS.activity * activity
            + WEIGHTS.responsiveness * responsiveness,
    )
}

fn compute_score(author_id: &str, stats: &AuthorStats) -> InfluencerScore {
    let mean_length = stats.mean_length();

    let engagement = clamp((stats.likes as f64 + stats.replies_received as f64 * 2.0) / 100.0);
    let consistency = clamp(stats.videos.len() as f64 * 2.0);
    let network = clamp((stats.in_degree as f64 + stats.owner_replies as f64 * 2.0) / 5.0);
    let quality = clamp(mean_length / 50.0 + stats.mean_polarity.abs() * 5.0);
    let activity = clamp((stats.comments as f64 + stats.thread_starts as f64) / 5.0);
    let responsiveness = clamp(stats.out_degree as f64 / 3.0);

    InfluencerScore {
        author_id: author_id.to_string(),
        author_name: stats.name.clone(),
        engagement,
        consistency,
        network,
        quality,
        activity,
        responsiveness,
        total: composite([engagement, consistency, network, quality, activity, responsiveness]),
        total_comments: stats.comments,
        total_likes: stats.likes,
        replies_received: stats.replies_received,
        unique_videos: stats.videos.len() as u64,
        in_degree: stats.in_degree,
        out_degree: stats.out_degree,
        owner_replies: stats.owner_replies,
        thread_starts: stats.thread_starts,
        mean_polarity: round2(stats.mean_polarity),
        mean_length: round2(mean_length),
    }
}
