//! HTTP client for the YouTube Data API v3

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::YouTubeConfig;
use crate::error::{InsightError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{ChannelId, VideoId};
use crate::platform::{
    ChannelLookup, ChannelResource, CommentThread, CommentThreadPage, RawComment, VideoPage,
    VideoPlatformApi, VideoResource, VideoSummary,
};
use crate::retry::RetryPolicy;

/// Maximum ids accepted by `videos.list`
const VIDEO_BATCH: usize = 50;

// Wire types, as the API serializes them

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    id: SearchId,
    snippet: Option<SearchSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    #[serde(default)]
    title: String,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: ChannelSnippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    country: Option<String>,
}

/// Counts arrive as decimal strings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    subscriber_count: Option<String>,
    video_count: Option<String>,
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

fn count(value: Option<&String>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    channel_id: String,
    #[serde(default)]
    title: String,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadItem {
    snippet: ThreadSnippet,
    replies: Option<ThreadReplies>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: CommentItem,
    #[serde(default)]
    total_reply_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadReplies {
    #[serde(default)]
    comments: Vec<CommentItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentItem {
    id: String,
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    author_display_name: String,
    author_channel_id: Option<AuthorChannelId>,
    text_original: Option<String>,
    #[serde(default)]
    text_display: String,
    #[serde(default)]
    like_count: u64,
    published_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorChannelId {
    value: String,
}

impl From<CommentItem> for RawComment {
    fn from(item: CommentItem) -> Self {
        let snippet = item.snippet;
        // Deleted channels have no author id; fall back to the display name
        let author_id = snippet
            .author_channel_id
            .map_or_else(|| snippet.author_display_name.clone(), |a| a.value);
        Self {
            comment_id: item.id,
            author_id,
            author_name: snippet.author_display_name,
            text: snippet.text_original.unwrap_or(snippet.text_display),
            published_at: snippet.published_at,
            updated_at: snippet.updated_at.unwrap_or(snippet.published_at),
            like_count: snippet.like_count,
            parent_id: snippet.parent_id,
        }
    }
}

/// YouTube Data API v3 client with timeout and retry
pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    page_size: u32,
    timeout_secs: u64,
    retry: RetryPolicy,
    metrics: MetricsCollector,
}

impl YouTubeClient {
    /// Build a client from configuration and an API key
    pub fn new(config: &YouTubeConfig, api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(InsightError::InvalidConfig(
                "YouTube API key is required (set YOUTUBE_API_KEY)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            page_size: config.page_size,
            timeout_secs: config.request_timeout_secs,
            retry: RetryPolicy::from_config(config),
            metrics: MetricsCollector::default(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, resource: &str, params: &[(&str, String)]) -> Result<T> {
        self.retry
            .execute(resource, || async move {
                let started = Instant::now();
                let outcome = self.get_once(resource, params).await;
                self.metrics
                    .record_api_request(resource, started.elapsed(), outcome.is_ok());
                outcome
            })
            .await
    }

    async fn get_once<T: DeserializeOwned>(&self, resource: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{resource}", self.base_url);
        debug!(resource, "Requesting platform API");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InsightError::Timeout {
                        seconds: self.timeout_secs,
                    }
                } else {
                    InsightError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // Extract retry-after header if present
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let message = response.text().await.unwrap_or_default();
            return Err(InsightError::Api {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl VideoPlatformApi for YouTubeClient {
    async fn search_channel(&self, query: &str) -> Result<Option<ChannelId>> {
        let response: ListResponse<SearchItem> = self
            .get(
                "search",
                &[
                    ("part", "snippet".to_string()),
                    ("type", "channel".to_string()),
                    ("q", query.to_string()),
                    ("maxResults", "1".to_string()),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .find_map(|item| item.id.channel_id)
            .map(ChannelId))
    }

    async fn lookup_channel(&self, lookup: &ChannelLookup) -> Result<Option<ChannelResource>> {
        let selector = match lookup {
            ChannelLookup::Id(id) => ("id", id.0.clone()),
            ChannelLookup::Username(name) => ("forUsername", name.clone()),
        };
        let response: ListResponse<ChannelItem> = self
            .get("channels", &[("part", "snippet,statistics".to_string()), selector])
            .await?;

        Ok(response.items.into_iter().next().map(|item| ChannelResource {
            channel_id: ChannelId(item.id),
            title: item.snippet.title,
            description: item.snippet.description,
            country: item.snippet.country,
            subscriber_count: count(item.statistics.subscriber_count.as_ref()),
            video_count: count(item.statistics.video_count.as_ref()),
            view_count: count(item.statistics.view_count.as_ref()),
        }))
    }

    async fn list_videos(
        &self,
        channel_id: &ChannelId,
        published_after: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<VideoPage> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("channelId", channel_id.0.clone()),
            ("type", "video".to_string()),
            ("order", "date".to_string()),
            (
                "publishedAfter",
                published_after.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("maxResults", self.page_size.min(50).to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response: ListResponse<SearchItem> = self.get("search", &params).await?;
        let videos = response
            .items
            .into_iter()
            .filter_map(|item| {
                let snippet = item.snippet?;
                Some(VideoSummary {
                    video_id: VideoId(item.id.video_id?),
                    title: snippet.title,
                    published_at: snippet.published_at?,
                })
            })
            .collect();

        Ok(VideoPage {
            videos,
            next_page_token: response.next_page_token,
        })
    }

    async fn video_statistics(&self, video_ids: &[VideoId]) -> Result<Vec<VideoResource>> {
        let mut resources = Vec::with_capacity(video_ids.len());
        for chunk in video_ids.chunks(VIDEO_BATCH) {
            let ids = chunk.iter().map(|v| v.0.as_str()).collect::<Vec<_>>().join(",");
            let response: ListResponse<VideoItem> = self
                .get("videos", &[("part", "snippet,statistics".to_string()), ("id", ids)])
                .await?;
            resources.extend(response.items.into_iter().map(|item| VideoResource {
                video_id: VideoId(item.id),
                channel_id: ChannelId(item.snippet.channel_id),
                title: item.snippet.title,
                published_at: item.snippet.published_at,
                view_count: count(item.statistics.view_count.as_ref()),
                like_count: count(item.statistics.like_count.as_ref()),
                comment_count: count(item.statistics.comment_count.as_ref()),
            }));
        }
        Ok(resources)
    }

    async fn comment_threads(
        &self,
        video_id: &VideoId,
        page_token: Option<&str>,
    ) -> Result<CommentThreadPage> {
        let mut params = vec![
            ("part", "snippet,replies".to_string()),
            ("videoId", video_id.0.clone()),
            ("maxResults", self.page_size.to_string()),
            ("textFormat", "plainText".to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response: ListResponse<ThreadItem> = self.get("commentThreads", &params).await?;
        let threads = response
            .items
            .into_iter()
            .map(|item| CommentThread {
                top_level: item.snippet.top_level_comment.into(),
                total_reply_count: item.snippet.total_reply_count,
                replies: item
                    .replies
                    .map(|r| r.comments.into_iter().map(RawComment::from).collect())
                    .unwrap_or_default(),
            })
            .collect();

        Ok(CommentThreadPage {
            threads,
            next_page_token: response.next_page_token,
        })
    }
}
