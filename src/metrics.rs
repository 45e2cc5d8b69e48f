use anyhow::Result;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Metrics collection and management
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    // Collection metrics
    pub api_requests_total: &'static str,
    pub api_errors_total: &'static str,
    pub api_request_duration: &'static str,
    pub comment_pages_total: &'static str,
    pub comments_collected_total: &'static str,
    pub videos_collected_total: &'static str,

    // Sentiment metrics
    pub classification_batches_total: &'static str,
    pub classification_duration: &'static str,
    pub sentiment_scores: &'static str,

    // Analysis metrics
    pub influencers_scored: &'static str,
    pub communities_found: &'static str,
    pub stage_duration: &'static str,

    // Store metrics
    pub store_operations_total: &'static str,

    // Error metrics
    pub degradations_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            api_requests_total: "channel_insight_api_requests_total",
            api_errors_total: "channel_insight_api_errors_total",
            api_request_duration: "channel_insight_api_request_duration_seconds",
            comment_pages_total: "channel_insight_comment_pages_total",
            comments_collected_total: "channel_insight_comments_collected_total",
            videos_collected_total: "channel_insight_videos_collected_total",

            classification_batches_total: "channel_insight_classification_batches_total",
            classification_duration: "channel_insight_classification_duration_seconds",
            sentiment_scores: "channel_insight_sentiment_scores",

            influencers_scored: "channel_insight_influencers_scored",
            communities_found: "channel_insight_communities_found",
            stage_duration: "channel_insight_stage_duration_seconds",

            store_operations_total: "channel_insight_store_operations_total",

            degradations_total: "channel_insight_degradations_total",
        }
    }
}

impl MetricsCollector {
    /// Initialize metrics collection
    pub fn init() -> Result<()> {
        // Initialize the metrics recorder
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|_| anyhow::anyhow!("Failed to initialize metrics recorder: already installed"))?;

        Ok(())
    }

    /// Record a platform API call
    pub fn record_api_request(&self, operation: &str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        counter!(self.api_requests_total, "operation" => operation.to_string(), "status" => status)
            .increment(1);
        histogram!(self.api_request_duration, "operation" => operation.to_string())
            .record(duration.as_secs_f64());

        if !success {
            counter!(self.api_errors_total, "operation" => operation.to_string()).increment(1);
        }
    }

    /// Record one fetched comment page
    pub fn record_comment_page(&self, comments: usize) {
        counter!(self.comment_pages_total).increment(1);
        counter!(self.comments_collected_total).increment(comments as u64);
    }

    /// Record collected videos
    pub fn record_videos(&self, count: usize) {
        counter!(self.videos_collected_total).increment(count as u64);
    }

    /// Record a classification batch
    pub fn record_classification_batch(&self, batch_size: usize, duration: Duration) {
        counter!(self.classification_batches_total).increment(1);
        histogram!(self.classification_duration, "batch_size" => batch_size.to_string())
            .record(duration.as_secs_f64());
    }

    /// Record the overall sentiment score of a run
    pub fn record_sentiment_score(&self, score: f64) {
        histogram!(self.sentiment_scores).record(score);
    }

    /// Record influencer and community counts
    pub fn record_analysis(&self, influencers: usize, communities: usize) {
        gauge!(self.influencers_scored).set(influencers as f64);
        gauge!(self.communities_found).set(communities as f64);
    }

    /// Record a pipeline stage duration
    pub fn record_stage(&self, stage: &str, duration: Duration) {
        histogram!(self.stage_duration, "stage" => stage.to_string()).record(duration.as_secs_f64());
    }

    /// Record a store operation
    pub fn record_store_operation(&self, operation: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        counter!(self.store_operations_total, "operation" => operation.to_string(), "status" => status)
            .increment(1);
    }

    /// Record a recoverable degradation
    pub fn record_degradation(&self, kind: &str) {
        counter!(self.degradations_total, "kind" => kind.to_string()).increment(1);
    }
}

/// Performance timing wrapper for stage metrics
pub struct MetricsTimer {
    collector: MetricsCollector,
    stage: String,
    start: std::time::Instant,
}

impl MetricsTimer {
    pub fn new(collector: MetricsCollector, stage: &str) -> Self {
        Self {
            collector,
            stage: stage.to_string(),
            start: std::time::Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        self.collector.record_stage(&self.stage, duration);
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::default();
        assert_eq!(collector.api_requests_total, "channel_insight_api_requests_total");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let collector = MetricsCollector::default();
        collector.record_api_request("commentThreads.list", Duration::from_millis(20), false);
        collector.record_comment_page(42);
        collector.record_stage("score", Duration::from_millis(3));
    }
}
