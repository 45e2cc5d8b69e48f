//! In-memory video platform shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use channel_insight::error::{InsightError, Result};
use channel_insight::models::{ChannelId, VideoId};
use channel_insight::platform::{
    ChannelLookup, ChannelResource, CommentThread, CommentThreadPage, RawComment, VideoPage,
    VideoPlatformApi, VideoResource, VideoSummary,
};

pub const CHANNEL: &str = "UCabcdefghijklmnopqrstuv";
pub const OWNER_NAME: &str = "Test Channel";

/// Scriptable fake of the five platform reads
#[derive(Default)]
pub struct FakePlatform {
    pub channels: Vec<ChannelResource>,
    pub handles: HashMap<String, ChannelId>,
    pub usernames: HashMap<String, ChannelId>,
    pub videos: Vec<VideoResource>,
    pub comment_pages: HashMap<VideoId, Vec<Vec<CommentThread>>>,
    /// Comment page index that fails for a video
    pub failing_pages: HashMap<VideoId, usize>,
    pub failing_search: bool,
    pub failing_statistics: bool,
    pub video_page_size: usize,
    pub comment_calls: AtomicUsize,
    pub requested_videos: Mutex<Vec<VideoId>>,
    pub requested_statistics: Mutex<HashSet<VideoId>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        let mut platform = Self {
            video_page_size: 2,
            ..Self::default()
        };
        platform.channels.push(ChannelResource {
            channel_id: channel(),
            title: OWNER_NAME.to_string(),
            description: "Videos about testing".to_string(),
            country: Some("CA".to_string()),
            subscriber_count: 1000,
            video_count: 10,
            view_count: 50_000,
        });
        platform.handles.insert("@tester".to_string(), channel());
        platform
    }

    pub fn with_video(mut self, id: &str, days_ago: i64, pages: Vec<Vec<CommentThread>>) -> Self {
        let video_id = VideoId(id.to_string());
        self.videos.push(VideoResource {
            video_id: video_id.clone(),
            channel_id: channel(),
            title: format!("Video {id}"),
            published_at: Utc::now() - Duration::days(days_ago),
            view_count: 1000,
            like_count: 50,
            comment_count: 10,
        });
        self.comment_pages.insert(video_id, pages);
        self
    }

    pub fn failing_page(mut self, id: &str, page: usize) -> Self {
        self.failing_pages.insert(VideoId(id.to_string()), page);
        self
    }
}

pub fn channel() -> ChannelId {
    ChannelId(CHANNEL.to_string())
}

pub fn raw(id: &str, author: &str, text: &str, likes: u64, parent: Option<&str>) -> RawComment {
    let at: DateTime<Utc> = Utc::now() - Duration::hours(1);
    RawComment {
        comment_id: id.to_string(),
        author_id: author.to_string(),
        author_name: author.to_uppercase(),
        text: text.to_string(),
        published_at: at,
        updated_at: at,
        like_count: likes,
        parent_id: parent.map(str::to_string),
    }
}

pub fn thread(top: RawComment, total_reply_count: u64, replies: Vec<RawComment>) -> CommentThread {
    CommentThread {
        top_level: top,
        total_reply_count,
        replies,
    }
}

fn api_error(status: u16, message: &str) -> InsightError {
    InsightError::Api {
        status,
        message: message.to_string(),
        retry_after: None,
    }
}

#[async_trait]
impl VideoPlatformApi for FakePlatform {
    async fn search_channel(&self, query: &str) -> Result<Option<ChannelId>> {
        if self.failing_search {
            return Err(api_error(503, "backendError"));
        }
        Ok(self.handles.get(query).cloned())
    }

    async fn lookup_channel(&self, lookup: &ChannelLookup) -> Result<Option<ChannelResource>> {
        let id = match lookup {
            ChannelLookup::Id(id) => Some(id.clone()),
            ChannelLookup::Username(name) => self.usernames.get(name).cloned(),
        };
        Ok(id.and_then(|id| self.channels.iter().find(|c| c.channel_id == id).cloned()))
    }

    async fn list_videos(
        &self,
        channel_id: &ChannelId,
        published_after: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<VideoPage> {
        let matching: Vec<VideoSummary> = self
            .videos
            .iter()
            .filter(|v| &v.channel_id == channel_id && v.published_at > published_after)
            .map(|v| VideoSummary {
                video_id: v.video_id.clone(),
                title: v.title.clone(),
                published_at: v.published_at,
            })
            .collect();

        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + self.video_page_size).min(matching.len());
        Ok(VideoPage {
            videos: matching[start.min(end)..end].to_vec(),
            next_page_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn video_statistics(&self, video_ids: &[VideoId]) -> Result<Vec<VideoResource>> {
        if self.failing_statistics {
            return Err(api_error(500, "backendError"));
        }
        if let Ok(mut requested) = self.requested_statistics.lock() {
            requested.extend(video_ids.iter().cloned());
        }
        Ok(self
            .videos
            .iter()
            .filter(|v| video_ids.contains(&v.video_id))
            .cloned()
            .collect())
    }

    async fn comment_threads(
        &self,
        video_id: &VideoId,
        page_token: Option<&str>,
    ) -> Result<CommentThreadPage> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requested) = self.requested_videos.lock() {
            if page_token.is_none() {
                requested.push(video_id.clone());
            }
        }

        let index: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        if self.failing_pages.get(video_id) == Some(&index) {
            return Err(api_error(403, "commentsDisabled"));
        }

        let pages = self.comment_pages.get(video_id).cloned().unwrap_or_default();
        let threads = pages.get(index).cloned().unwrap_or_default();
        Ok(CommentThreadPage {
            threads,
            next_page_token: (index + 1 < pages.len()).then(|| (index + 1).to_string()),
        })
    }
}
