//! Source adapter: reference resolution and paginated collection
//!
//! Collection calls never fail the run on an API error. They stop at the
//! failing page and hand back whatever was gathered together with the error,
//! so the caller can record a diagnostic and move on.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use chrono::{Duration, Utc};
use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{InsightError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{ChannelId, ChannelMetadata, CommentRecord, ReplyEdge, VideoId, VideoRecord};
use crate::platform::{ChannelLookup, RawComment, VideoPlatformApi, VideoResource, VideoSummary};
use crate::validation::InputValidator;

/// A parsed but not yet resolved channel or video reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `UC…` channel id
    Channel(ChannelId),
    /// `@handle`
    Handle(String),
    /// `/user/<name>`
    Username(String),
    /// `/c/<name>`
    CustomName(String),
    /// A single video
    Video(VideoId),
}

#[allow(clippy::expect_used)]
fn channel_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^UC[0-9A-Za-z_-]{22}$").expect("valid channel id pattern"))
}

#[allow(clippy::expect_used)]
fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9A-Za-z_-]{11}$").expect("valid video id pattern"))
}

impl Reference {
    /// Recognize a channel or video reference, `None` when no pattern matches
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Some(handle) = input.strip_prefix('@') {
            return (!handle.is_empty() && !handle.contains('/'))
                .then(|| Self::Handle(format!("@{handle}")));
        }

        if channel_id_pattern().is_match(input) {
            return Some(Self::Channel(ChannelId(input.to_string())));
        }

        let with_scheme = if input.contains("://") {
            input.to_string()
        } else {
            format!("https://{input}")
        };
        let url = Url::parse(&with_scheme).ok()?;
        let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        let video = |id: &str| {
            video_id_pattern()
                .is_match(id)
                .then(|| Self::Video(VideoId(id.to_string())))
        };

        match host {
            "youtu.be" => segments.first().and_then(|id| video(id)),
            "youtube.com" | "music.youtube.com" => match segments.as_slice() {
                ["watch", ..] => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .and_then(|(_, v)| video(&v)),
                ["shorts" | "live" | "embed", id, ..] => video(id),
                ["channel", id, ..] if channel_id_pattern().is_match(id) => {
                    Some(Self::Channel(ChannelId((*id).to_string())))
                }
                ["user", name, ..] => Some(Self::Username((*name).to_string())),
                ["c", name, ..] => Some(Self::CustomName((*name).to_string())),
                [first, ..] if first.starts_with('@') && first.len() > 1 => {
                    Some(Self::Handle((*first).to_string()))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

/// A channel, optionally narrowed to one of its videos
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Owning channel
    pub channel_id: ChannelId,
    /// Set when the reference named a single video
    pub video_id: Option<VideoId>,
}

/// Items gathered before a collection call stopped
#[derive(Debug)]
pub struct Partial<T> {
    /// What was collected
    pub items: T,
    /// Error that stopped collection early, if any
    pub failure: Option<InsightError>,
}

impl<T> Partial<T> {
    const fn complete(items: T) -> Self {
        Self {
            items,
            failure: None,
        }
    }
}

/// Comments and reply edges of one video
#[derive(Debug, Default)]
pub struct CommentBatch {
    /// Top-level comments and replies, in thread order
    pub comments: Vec<CommentRecord>,
    /// One edge per reply whose parent author is known
    pub edges: Vec<ReplyEdge>,
}

/// Resolves references and collects videos and comments from the platform
pub struct SourceAdapter {
    api: Arc<dyn VideoPlatformApi>,
    metrics: MetricsCollector,
}

impl SourceAdapter {
    /// Create an adapter over a platform client
    #[must_use]
    pub fn new(api: Arc<dyn VideoPlatformApi>) -> Self {
        Self {
            api,
            metrics: MetricsCollector::default(),
        }
    }

    /// Resolve a reference to its channel id
    pub async fn resolve(&self, reference: &str) -> Result<ChannelId> {
        Ok(self.resolve_target(reference).await?.channel_id)
    }

    /// Resolve a reference to a channel and, for video references, the video
    pub async fn resolve_target(&self, reference: &str) -> Result<ResolvedTarget> {
        let parsed = Reference::parse(reference)
            .ok_or_else(|| InsightError::NotResolvable(reference.to_string()))?;
        debug!(?parsed, "Parsed reference");

        let not_found = || InsightError::NotResolvable(reference.to_string());
        let api_failed =
            |e: InsightError| InsightError::NotResolvable(format!("{reference}: {e}"));

        let target = match parsed {
            Reference::Channel(id) => {
                let channel = self
                    .api
                    .lookup_channel(&ChannelLookup::Id(id))
                    .await
                    .map_err(api_failed)?
                    .ok_or_else(not_found)?;
                ResolvedTarget {
                    channel_id: channel.channel_id,
                    video_id: None,
                }
            }
            Reference::Handle(query) | Reference::CustomName(query) => ResolvedTarget {
                channel_id: self
                    .api
                    .search_channel(&query)
                    .await
                    .map_err(api_failed)?
                    .ok_or_else(not_found)?,
                video_id: None,
            },
            Reference::Username(name) => {
                let by_name = self
                    .api
                    .lookup_channel(&ChannelLookup::Username(name.clone()))
                    .await
                    .map_err(api_failed)?
                    .map(|c| c.channel_id);
                let channel_id = match by_name {
                    Some(id) => id,
                    None => self
                        .api
                        .search_channel(&name)
                        .await
                        .map_err(api_failed)?
                        .ok_or_else(not_found)?,
                };
                ResolvedTarget {
                    channel_id,
                    video_id: None,
                }
            }
            Reference::Video(video_id) => {
                let video = self
                    .api
                    .video_statistics(std::slice::from_ref(&video_id))
                    .await
                    .map_err(api_failed)?
                    .into_iter()
                    .next()
                    .ok_or_else(not_found)?;
                ResolvedTarget {
                    channel_id: video.channel_id,
                    video_id: Some(video_id),
                }
            }
        };

        info!(channel_id = %target.channel_id, video_id = ?target.video_id, "Resolved reference");
        Ok(target)
    }

    /// Channel snapshot, `None` when the channel is missing or the call fails
    pub async fn fetch_metadata(&self, channel_id: &ChannelId) -> Option<ChannelMetadata> {
        match self
            .api
            .lookup_channel(&ChannelLookup::Id(channel_id.clone()))
            .await
        {
            Ok(Some(channel)) => Some(ChannelMetadata {
                engagement_rate: ChannelMetadata::compute_engagement_rate(
                    channel.view_count,
                    channel.subscriber_count,
                    channel.video_count,
                ),
                channel_id: channel.channel_id,
                title: channel.title,
                description: channel.description,
                subscriber_count: channel.subscriber_count,
                video_count: channel.video_count,
                view_count: channel.view_count,
                country: channel.country,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "Failed to fetch channel metadata");
                None
            }
        }
    }

    /// Up to `max_count` videos published within `lookback_days`, newest first
    pub async fn fetch_videos(
        &self,
        channel_id: &ChannelId,
        max_count: usize,
        lookback_days: i64,
    ) -> Partial<Vec<VideoRecord>> {
        let published_after = Utc::now() - Duration::days(lookback_days);
        let mut summaries: Vec<VideoSummary> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut failure = None;

        while summaries.len() < max_count {
            match self
                .api
                .list_videos(channel_id, published_after, page_token.as_deref())
                .await
            {
                Ok(page) => {
                    let remaining = max_count - summaries.len();
                    summaries.extend(page.videos.into_iter().take(remaining));
                    page_token = page.next_page_token;
                    if page_token.is_none() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(channel_id = %channel_id, error = %e, "Video listing stopped early");
                    failure = Some(e);
                    break;
                }
            }
        }

        if summaries.is_empty() {
            return Partial {
                items: Vec::new(),
                failure,
            };
        }

        let ids: Vec<VideoId> = summaries.iter().map(|s| s.video_id.clone()).collect();
        let statistics: HashMap<VideoId, VideoResource> = match self.api.video_statistics(&ids).await {
            Ok(resources) => resources
                .into_iter()
                .map(|r| (r.video_id.clone(), r))
                .collect(),
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "Video statistics unavailable");
                failure.get_or_insert(e);
                HashMap::new()
            }
        };

        let videos: Vec<VideoRecord> = summaries
            .into_iter()
            .map(|summary| match statistics.get(&summary.video_id) {
                Some(stats) => VideoRecord::new(
                    summary.video_id,
                    summary.title,
                    summary.published_at,
                    stats.view_count,
                    stats.like_count,
                    stats.comment_count,
                ),
                None => VideoRecord::new(summary.video_id, summary.title, summary.published_at, 0, 0, 0),
            })
            .collect();

        self.metrics.record_videos(videos.len());
        info!(channel_id = %channel_id, videos = videos.len(), "Collected videos");
        Partial { items: videos, failure }
    }

    /// A single video with statistics
    pub async fn fetch_video(&self, video_id: &VideoId) -> Result<Option<VideoRecord>> {
        let resource = self
            .api
            .video_statistics(std::slice::from_ref(video_id))
            .await?
            .into_iter()
            .next();
        Ok(resource.map(|r| {
            VideoRecord::new(r.video_id, r.title, r.published_at, r.view_count, r.like_count, r.comment_count)
        }))
    }

    /// Comment threads of one video with one reply edge per reply.
    ///
    /// Stops after the page that reaches `max_count` records, or at the first
    /// failing page.
    pub async fn fetch_comments(
        &self,
        video_id: &VideoId,
        owner_id: &ChannelId,
        max_count: usize,
    ) -> Partial<CommentBatch> {
        let mut batch = CommentBatch::default();
        let mut authors: HashMap<String, String> = HashMap::new();
        let mut page_token: Option<String> = None;
        let mut page = 0_usize;

        loop {
            page += 1;
            let threads = match self.api.comment_threads(video_id, page_token.as_deref()).await {
                Ok(threads) => threads,
                Err(e) => {
                    warn!(video_id = %video_id, page, error = %e, "Comment collection aborted for video");
                    return Partial {
                        items: batch,
                        failure: Some(e),
                    };
                }
            };

            let before = batch.comments.len();
            for thread in threads.threads {
                let top_id = thread.top_level.comment_id.clone();
                authors.insert(top_id.clone(), thread.top_level.author_id.clone());
                batch.comments.push(
                    to_record(thread.top_level, video_id, owner_id)
                        .with_reply_count(thread.total_reply_count),
                );

                for reply in thread.replies {
                    let parent_id = reply.parent_id.clone().unwrap_or_else(|| top_id.clone());
                    authors.insert(reply.comment_id.clone(), reply.author_id.clone());

                    match authors.get(&parent_id) {
                        Some(parent_author) => batch.edges.push(ReplyEdge {
                            from_author: reply.author_id.clone(),
                            to_author: parent_author.clone(),
                            video_id: video_id.clone(),
                            timestamp: reply.published_at,
                        }),
                        None => debug!(comment_id = %reply.comment_id, "Reply parent not collected"),
                    }

                    batch
                        .comments
                        .push(to_record(reply, video_id, owner_id).reply_to(parent_id));
                }

                if batch.comments.len() >= max_count {
                    break;
                }
            }

            self.metrics.record_comment_page(batch.comments.len() - before);
            debug!(video_id = %video_id, page, comments = batch.comments.len(), "Fetched comment page");

            page_token = threads.next_page_token;
            if page_token.is_none() || batch.comments.len() >= max_count {
                break;
            }
        }

        Partial::complete(batch)
    }
}

fn to_record(raw: RawComment, video_id: &VideoId, owner_id: &ChannelId) -> CommentRecord {
    let is_owner = raw.author_id == owner_id.0;
    let mut record = CommentRecord::new(
        raw.comment_id,
        video_id.0.clone(),
        raw.author_id,
        raw.author_name,
        InputValidator::sanitize_text(&raw.text),
    )
        .with_likes(raw.like_count)
        .published(raw.published_at);
    record.updated_at = raw.updated_at;
    if is_owner {
        record = record.from_owner();
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNEL: &str = "UCabcdefghijklmnopqrstuv";

    #[test]
    fn test_channel_patterns() {
        let channel = Reference::Channel(ChannelId(CHANNEL.to_string()));
        assert_eq!(Reference::parse(CHANNEL), Some(channel.clone()));
        assert_eq!(
            Reference::parse(&format!("https://www.youtube.com/channel/{CHANNEL}")),
            Some(channel)
        );
        assert_eq!(
            Reference::parse("youtube.com/@rustlang"),
            Some(Reference::Handle("@rustlang".to_string()))
        );
        assert_eq!(
            Reference::parse("@rustlang"),
            Some(Reference::Handle("@rustlang".to_string()))
        );
        assert_eq!(
            Reference::parse("https://youtube.com/user/oldname"),
            Some(Reference::Username("oldname".to_string()))
        );
        assert_eq!(
            Reference::parse("https://m.youtube.com/c/Custom/videos"),
            Some(Reference::CustomName("Custom".to_string()))
        );
    }

    #[test]
    fn test_video_patterns() {
        let video = Some(Reference::Video(VideoId("dQw4w9WgXcQ".to_string())));
        assert_eq!(Reference::parse("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"), video);
        assert_eq!(Reference::parse("https://youtu.be/dQw4w9WgXcQ"), video);
        assert_eq!(Reference::parse("youtube.com/shorts/dQw4w9WgXcQ"), video);
        assert_eq!(Reference::parse("https://www.youtube.com/live/dQw4w9WgXcQ"), video);
    }

    #[test]
    fn test_unknown_patterns() {
        assert_eq!(Reference::parse(""), None);
        assert_eq!(Reference::parse("rustlang"), None);
        assert_eq!(Reference::parse("https://vimeo.com/12345"), None);
        assert_eq!(Reference::parse("https://youtube.com/watch?v=short"), None);
        assert_eq!(Reference::parse("https://youtube.com/"), None);
    }
}
