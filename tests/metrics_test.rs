//! Comprehensive unit tests for metrics.rs module

use std::time::Duration;
use channel_insight::metrics::{MetricsCollector, MetricsTimer};

#[test]
fn test_metrics_collector_default() {
    let collector = MetricsCollector::default();
    assert_eq!(collector.api_requests_total, "channel_insight_api_requests_total");
    assert_eq!(collector.comments_collected_total, "channel_insight_comments_collected_total");
    assert_eq!(collector.store_operations_total, "channel_insight_store_operations_total");
    assert_eq!(collector.degradations_total, "channel_insight_degradations_total");
}

#[test]
fn test_metric_names_are_prefixed() {
    let collector = MetricsCollector::default();
    for name in [
        collector.api_errors_total,
        collector.api_request_duration,
        collector.comment_pages_total,
        collector.videos_collected_total,
        collector.classification_batches_total,
        collector.classification_duration,
        collector.sentiment_scores,
        collector.influencers_scored,
        collector.communities_found,
        collector.stage_duration,
    ] {
        assert!(name.starts_with("channel_insight_"), "{name}");
    }
}

#[test]
fn test_record_api_requests() {
    let collector = MetricsCollector::default();
    collector.record_api_request("search.list", Duration::from_millis(120), true);
    collector.record_api_request("commentThreads.list", Duration::from_millis(80), false);
}

#[test]
fn test_record_collection() {
    let collector = MetricsCollector::default();
    collector.record_comment_page(100);
    collector.record_comment_page(0);
    collector.record_videos(30);
}

#[test]
fn test_record_sentiment() {
    let collector = MetricsCollector::default();
    collector.record_classification_batch(16, Duration::from_millis(450));
    collector.record_sentiment_score(7.25);
}

#[test]
fn test_record_analysis_and_store() {
    let collector = MetricsCollector::default();
    collector.record_analysis(20, 4);
    collector.record_store_operation("save", true);
    collector.record_store_operation("load", false);
    collector.record_degradation("store_unavailable");
}

#[test]
fn test_metrics_timer_finish() {
    let collector = MetricsCollector::default();
    let timer = MetricsTimer::new(collector, "communities");
    std::thread::sleep(Duration::from_millis(5));
    let elapsed = timer.finish();
    assert!(elapsed >= Duration::from_millis(5));
}

#[test]
fn test_metrics_concurrent_recording() {
    let collector = MetricsCollector::default();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let collector = collector.clone();
            std::thread::spawn(move || {
                collector.record_comment_page(i * 10);
                collector.record_stage("score", Duration::from_millis(i as u64));
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("recording thread");
    }
}
