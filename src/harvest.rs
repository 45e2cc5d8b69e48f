//! Per-video comment harvesting as a lazy stream
//!
//! Videos are fetched with bounded concurrency but yielded in input order,
//! so merging the per-video batches is deterministic regardless of which
//! request finishes first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, info};

use crate::error::InsightError;
use crate::models::{ChannelId, VideoId, VideoRecord};
use crate::source::{CommentBatch, SourceAdapter};

/// Progress callback: percentage in 0..=100 and a short message
pub type ProgressFn = Arc<dyn Fn(u8, &str) + Send + Sync>;

/// Cooperative cancellation signal shared with the caller
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// A flag that has not been raised
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop before the next video
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Forwards progress to an optional callback
#[derive(Clone, Default)]
pub struct Progress {
    callback: Option<ProgressFn>,
}

impl Progress {
    /// Wrap a callback
    #[must_use]
    pub fn new(callback: Option<ProgressFn>) -> Self {
        Self { callback }
    }

    /// Report `percent` (capped at 100) with `message`
    pub fn report(&self, percent: u8, message: &str) {
        debug!(percent, message, "Progress");
        if let Some(callback) = &self.callback {
            callback(percent.min(100), message);
        }
    }
}

/// Outcome of one video's comment collection
#[derive(Debug)]
pub struct VideoHarvest {
    /// Video the batch belongs to
    pub video_id: VideoId,
    /// Comments and edges gathered, possibly incomplete
    pub batch: CommentBatch,
    /// Error that cut this video short
    pub failure: Option<InsightError>,
}

/// Merged output of a full harvest
#[derive(Debug, Default)]
pub struct HarvestOutcome {
    /// All comments and edges, in video order
    pub batch: CommentBatch,
    /// Videos whose collection stopped early
    pub failures: Vec<(VideoId, InsightError)>,
    /// Videos actually started
    pub videos_harvested: usize,
    /// Cancellation stopped the harvest before every video was started
    pub cancelled: bool,
}

/// Collects comments for a list of videos
pub struct CommentHarvester {
    source: Arc<SourceAdapter>,
    max_comments_per_video: usize,
    concurrency: usize,
}

impl CommentHarvester {
    /// Create a harvester; `concurrency` is clamped to at least 1
    #[must_use]
    pub fn new(source: Arc<SourceAdapter>, max_comments_per_video: usize, concurrency: usize) -> Self {
        Self {
            source,
            max_comments_per_video,
            concurrency: concurrency.max(1),
        }
    }

    /// Lazy stream of per-video results.
    ///
    /// The cancellation flag is checked before each video starts; once it is
    /// raised the stream ends after the videos already in flight.
    pub fn stream<'a>(
        &'a self,
        videos: &'a [VideoRecord],
        owner_id: &'a ChannelId,
        cancel: &'a CancellationFlag,
    ) -> impl Stream<Item = VideoHarvest> + 'a {
        stream::iter(videos)
            .map(move |video| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                let partial = self
                    .source
                    .fetch_comments(&video.video_id, owner_id, self.max_comments_per_video)
                    .await;
                Some(VideoHarvest {
                    video_id: video.video_id.clone(),
                    batch: partial.items,
                    failure: partial.failure,
                })
            })
            .buffered(self.concurrency)
            .take_while(|harvest| futures::future::ready(harvest.is_some()))
            .filter_map(futures::future::ready)
    }

    /// Drain the stream into one batch, reporting progress between `from`
    /// and `to` percent
    pub async fn collect(
        &self,
        videos: &[VideoRecord],
        owner_id: &ChannelId,
        progress: &Progress,
        cancel: &CancellationFlag,
        (from, to): (u8, u8),
    ) -> HarvestOutcome {
        let mut outcome = HarvestOutcome::default();
        let total = videos.len().max(1);
        let span = usize::from(to.saturating_sub(from));

        let mut harvests = Box::pin(self.stream(videos, owner_id, cancel));
        while let Some(harvest) = harvests.next().await {
            outcome.videos_harvested += 1;
            let percent = usize::from(from) + span * outcome.videos_harvested / total;
            progress.report(
                u8::try_from(percent).unwrap_or(to),
                &format!(
                    "Collected comments for video {}/{}",
                    outcome.videos_harvested,
                    videos.len()
                ),
            );

            outcome.batch.comments.extend(harvest.batch.comments);
            outcome.batch.edges.extend(harvest.batch.edges);
            if let Some(failure) = harvest.failure {
                outcome.failures.push((harvest.video_id, failure));
            }
        }

        outcome.cancelled = outcome.videos_harvested < videos.len() && cancel.is_cancelled();
        info!(
            videos = outcome.videos_harvested,
            comments = outcome.batch.comments.len(),
            edges = outcome.batch.edges.len(),
            failures = outcome.failures.len(),
            cancelled = outcome.cancelled,
            "Harvest finished"
        );
        outcome
    }
}
