use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{AppConfig, CollectionConfig};
use crate::error::{Diagnostics, ErrorKind, InsightError, Result};
use crate::features::TextFeatureExtractor;
use crate::forecast::{forecast, PredictionSet};
use crate::graph::ReplyGraph;
use crate::harvest::{CancellationFlag, CommentHarvester, Progress};
use crate::community::CommunityDetector;
use crate::influence::InfluencerScorer;
use crate::logging::OperationTimer;
use crate::metrics::{MetricsCollector, MetricsTimer};
use crate::models::{AnalysisResult, VideoRecord};
use crate::platform::VideoPlatformApi;
use crate::render::PngChartRenderer;
use crate::sentiment::{HttpInferenceBackend, SentimentClassifier};
use crate::source::{ResolvedTarget, SourceAdapter};
use crate::store::{ResilientStore, ResultStore, SledResultStore};
use crate::validation::InputValidator;
use crate::youtube::YouTubeClient;

/// Runs the full pipeline and serves stored results
pub struct AnalysisService {
    source: Arc<SourceAdapter>,
    classifier: Arc<SentimentClassifier>,
    store: Arc<dyn ResultStore>,
    features: TextFeatureExtractor,
    scorer: InfluencerScorer,
    detector: CommunityDetector,
    collection: CollectionConfig,
    metrics: MetricsCollector,
}

impl AnalysisService {
    /// Assemble a service from injected collaborators
    pub fn new(
        config: &AppConfig,
        api: Arc<dyn VideoPlatformApi>,
        classifier: Arc<SentimentClassifier>,
        store: Arc<dyn ResultStore>,
    ) -> Result<Self> {
        Ok(Self {
            source: Arc::new(SourceAdapter::new(api)),
            classifier,
            store,
            features: TextFeatureExtractor::new()?,
            scorer: InfluencerScorer::new(&config.scoring),
            detector: CommunityDetector::new(&config.community),
            collection: config.collection.clone(),
            metrics: MetricsCollector::default(),
        })
    }

    /// Production wiring: HTTP platform client, hosted classifier, PNG charts
    /// and a sled store wrapped for graceful degradation
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api = Arc::new(YouTubeClient::new(&config.youtube, config.get_api_key())?);
        let backend = Arc::new(HttpInferenceBackend::new(
            &config.sentiment,
            config.get_inference_token(),
        )?);
        let classifier = Arc::new(SentimentClassifier::new(
            &config.sentiment,
            backend,
            Arc::new(PngChartRenderer),
        )?);
        Self::new(config, api, classifier, Self::open_store(&config.store.path)?)
    }

    /// Open the sled store at `path` behind the resilient wrapper
    pub fn open_store(path: impl AsRef<Path>) -> Result<Arc<dyn ResultStore>> {
        let sled = Arc::new(SledResultStore::open(path)?);
        Ok(Arc::new(ResilientStore::new(sled)))
    }

    /// Analyze `reference` and store the result under (user, project).
    ///
    /// Only unresolvable references and channels without videos fail the
    /// run. Everything else is recorded on the result's diagnostics. A
    /// cancelled run comes back with `partial` set and is not stored.
    pub async fn run(
        &self,
        user_id: &str,
        project_id: &str,
        reference: &str,
        progress: &Progress,
        cancel: &CancellationFlag,
    ) -> Result<AnalysisResult> {
        InputValidator::validate_identifier("user", user_id)
            .map_err(|e| InsightError::InvalidInput(e.to_string()))?;
        InputValidator::validate_identifier("project", project_id)
            .map_err(|e| InsightError::InvalidInput(e.to_string()))?;
        InputValidator::validate_reference(reference)
            .map_err(|e| InsightError::NotResolvable(format!("{reference}: {e}")))?;

        let timer = OperationTimer::new("analysis");
        let mut diagnostics = Diagnostics::new();
        let mut result = AnalysisResult::empty(user_id, project_id);
        result.reference = reference.trim().to_string();

        progress.report(2, "Resolving channel");
        let stage = MetricsTimer::new(self.metrics.clone(), "resolve");
        let target = self.source.resolve_target(reference).await?;
        stage.finish();

        progress.report(6, "Fetching channel metadata");
        result.channel = self.source.fetch_metadata(&target.channel_id).await;

        progress.report(10, "Fetching videos");
        let stage = MetricsTimer::new(self.metrics.clone(), "videos");
        result.videos = self.collect_videos(&target, &mut diagnostics).await;
        stage.finish();
        if result.videos.is_empty() {
            return Err(InsightError::NoVideosFound {
                channel_id: target.channel_id.0,
            });
        }

        let stage = MetricsTimer::new(self.metrics.clone(), "comments");
        let harvester = CommentHarvester::new(
            Arc::clone(&self.source),
            self.collection.max_comments_per_video,
            self.collection.concurrency,
        );
        let harvest = harvester
            .collect(&result.videos, &target.channel_id, progress, cancel, (15, 60))
            .await;
        stage.finish();
        for (video_id, failure) in &harvest.failures {
            diagnostics.record(
                ErrorKind::PartialCollectionFailure,
                "comments",
                format!("video {video_id}: {failure}"),
            );
        }
        if harvest.cancelled {
            warn!(
                videos = harvest.videos_harvested,
                total = result.videos.len(),
                "Run cancelled, continuing with collected comments"
            );
            result.partial = true;
        }
        let mut comments = harvest.batch.comments;
        let edges = harvest.batch.edges;

        progress.report(62, "Extracting text features");
        self.features.annotate(&mut comments);

        progress.report(66, "Building reply graph");
        let graph = ReplyGraph::build(&edges);

        progress.report(70, "Classifying sentiment");
        let stage = MetricsTimer::new(self.metrics.clone(), "sentiment");
        result.sentiment = self.classifier.classify(&mut comments, &mut diagnostics).await;
        stage.finish();

        progress.report(85, "Scoring influencers");
        let stage = MetricsTimer::new(self.metrics.clone(), "influencers");
        result.influencers = self.scorer.rank(&comments, &graph);
        stage.finish();

        progress.report(90, "Detecting communities");
        let stage = MetricsTimer::new(self.metrics.clone(), "communities");
        result.communities = self.detector.detect(&graph, &comments);
        stage.finish();
        self.metrics
            .record_analysis(result.influencers.len(), result.communities.total_communities);

        result.total_comments = comments.len();
        result.total_replies = comments.iter().filter(|c| c.is_reply).count();
        result.unique_authors = comments
            .iter()
            .map(|c| c.author_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        result.total_edges = edges.len();
        result.created_at = chrono::Utc::now();
        result.diagnostics = diagnostics;

        // Cancelled runs are returned but never stored
        if result.partial {
            info!(user_id, project_id, "Skipping save of cancelled run");
        } else {
            progress.report(95, "Saving results");
            if let Err(e) = self.store.save(user_id, project_id, &result).await {
                self.metrics.record_degradation("store_unavailable");
                result
                    .diagnostics
                    .record(ErrorKind::StoreUnavailable, "store", e.to_string());
            }
        }

        progress.report(100, "Analysis complete");
        info!(
            user_id,
            project_id,
            channel_id = %target.channel_id,
            videos = result.videos.len(),
            comments = result.total_comments,
            influencers = result.influencers.len(),
            communities = result.communities.total_communities,
            diagnostics = result.diagnostics.entries().len(),
            graph_authors = graph.author_count(),
            duration_ms = timer.finish(),
            "Analysis finished"
        );
        Ok(result)
    }

    async fn collect_videos(&self, target: &ResolvedTarget, diagnostics: &mut Diagnostics) -> Vec<VideoRecord> {
        if let Some(video_id) = &target.video_id {
            return match self.source.fetch_video(video_id).await {
                Ok(video) => video.into_iter().collect(),
                Err(e) => {
                    diagnostics.record(
                        ErrorKind::PartialCollectionFailure,
                        "videos",
                        format!("video {video_id}: {e}"),
                    );
                    Vec::new()
                }
            };
        }

        let partial = self
            .source
            .fetch_videos(
                &target.channel_id,
                self.collection.max_videos,
                self.collection.lookback_days,
            )
            .await;
        if let Some(failure) = partial.failure {
            diagnostics.record(
                ErrorKind::PartialCollectionFailure,
                "videos",
                format!("channel {}: {failure}", target.channel_id),
            );
        }
        partial.items
    }

    /// Current result for (user, project)
    pub async fn current(&self, user_id: &str, project_id: &str) -> Result<Option<AnalysisResult>> {
        self.store.load(user_id, project_id).await
    }

    /// Stored results for (user, project), oldest first
    pub async fn history(&self, user_id: &str, project_id: &str) -> Result<Vec<AnalysisResult>> {
        self.store.history(user_id, project_id).await
    }

    /// Invalidate the current result for (user, project)
    pub async fn clear(&self, user_id: &str, project_id: &str) -> Result<()> {
        info!(user_id, project_id, "Clearing stored result");
        self.store.clear(user_id, project_id).await
    }

    /// Trend forecast over the stored history of (user, project)
    pub async fn predict(&self, user_id: &str, project_id: &str) -> Result<PredictionSet> {
        let history = self.store.history(user_id, project_id).await?;
        Ok(forecast(&history))
    }
}
