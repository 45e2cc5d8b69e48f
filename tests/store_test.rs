//! Result store tests

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;

use channel_insight::error::{ErrorKind, InsightError, Result};
use channel_insight::forecast::{forecast, TrendDirection};
use channel_insight::models::{AnalysisResult, Community, WordFrequency};
use channel_insight::store::{ResilientStore, ResultStore, SledResultStore};

fn sample(comments: usize, days_ago: i64) -> AnalysisResult {
    let mut result = AnalysisResult::empty("user-1", "project-1");
    result.reference = "@tester".to_string();
    result.total_comments = comments;
    result.created_at = Utc::now() - Duration::days(days_ago);
    result.sentiment.overall_score = 7.5;
    result.sentiment.word_cloud = Some("PHN2Zz48L3N2Zz4=".to_string());
    result.sentiment.pie_chart = Some("PHN2Zz4=".to_string());
    result.sentiment.top_words = vec![WordFrequency {
        word: "tutorial".to_string(),
        count: 4,
    }];
    result.communities.communities.push(Community {
        id: 0,
        size: 2,
        density: 1.0,
        total_comments: 5,
        total_likes: 9,
        top_contributor: Some("alice".to_string()),
        top_influencer: None,
        bridge_users: Vec::new(),
        clustering_coefficient: 0.0,
        members: vec!["alice".to_string(), "bob".to_string()],
    });
    result
        .diagnostics
        .record(ErrorKind::RenderingFailure, "sentiment", "pie chart: no data");
    result
}

fn open() -> (TempDir, SledResultStore) {
    let dir = TempDir::new().expect("temp dir");
    let store = SledResultStore::open(dir.path().join("results")).expect("open store");
    (dir, store)
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let (_dir, store) = open();
    let result = sample(42, 0);

    store.save("user-1", "project-1", &result).await.expect("save");
    let loaded = store
        .load("user-1", "project-1")
        .await
        .expect("load")
        .expect("stored result");

    assert_eq!(loaded, result);
    assert_eq!(loaded.sentiment.word_cloud.as_deref(), Some("PHN2Zz48L3N2Zz4="));
    assert_eq!(loaded.diagnostics.count(ErrorKind::RenderingFailure), 1);
}

#[tokio::test]
async fn test_keys_are_isolated() {
    let (_dir, store) = open();
    store
        .save("user-1", "project-1", &sample(1, 0))
        .await
        .expect("save");

    assert!(store.load("user-1", "project-2").await.expect("load").is_none());
    assert!(store.load("user-2", "project-1").await.expect("load").is_none());
    assert!(store.history("user-1", "project-2").await.expect("history").is_empty());
}

#[tokio::test]
async fn test_history_is_chronological() {
    let (_dir, store) = open();
    // Saved out of order on purpose
    for (comments, days_ago) in [(30, 1), (10, 3), (20, 2)] {
        store
            .save("user-1", "project-1", &sample(comments, days_ago))
            .await
            .expect("save");
    }

    let history = store.history("user-1", "project-1").await.expect("history");
    let counts: Vec<usize> = history.iter().map(|r| r.total_comments).collect();
    assert_eq!(counts, vec![10, 20, 30]);

    // Current is the last saved, not the newest timestamp
    let current = store.load("user-1", "project-1").await.expect("load");
    assert_eq!(current.map(|r| r.total_comments), Some(20));
}

#[tokio::test]
async fn test_same_timestamp_keeps_both_entries() {
    let (_dir, store) = open();
    let result = sample(5, 0);
    store.save("user-1", "project-1", &result).await.expect("save");
    store.save("user-1", "project-1", &result).await.expect("save");
    assert_eq!(store.history("user-1", "project-1").await.expect("history").len(), 2);
}

#[tokio::test]
async fn test_clear_keeps_history() {
    let (_dir, store) = open();
    store
        .save("user-1", "project-1", &sample(5, 1))
        .await
        .expect("save");
    store.clear("user-1", "project-1").await.expect("clear");

    assert!(store.load("user-1", "project-1").await.expect("load").is_none());
    assert_eq!(store.history("user-1", "project-1").await.expect("history").len(), 1);
}

#[tokio::test]
async fn test_store_survives_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("results");
    {
        let store = SledResultStore::open(&path).expect("open");
        store
            .save("user-1", "project-1", &sample(9, 0))
            .await
            .expect("save");
    }
    let store = SledResultStore::open(&path).expect("reopen");
    let loaded = store.load("user-1", "project-1").await.expect("load");
    assert_eq!(loaded.map(|r| r.total_comments), Some(9));
}

#[tokio::test]
async fn test_forecast_from_stored_history() {
    let (_dir, store) = open();
    for (comments, days_ago) in [(100, 30), (150, 20), (250, 10)] {
        store
            .save("user-1", "project-1", &sample(comments, days_ago))
            .await
            .expect("save");
    }
    let history = store.history("user-1", "project-1").await.expect("history");
    let set = forecast(&history);
    assert_eq!(set.history_points, 3);
    assert_eq!(set.engagement_forecast.direction, TrendDirection::Increasing);
}

/// Store whose every operation fails
struct UnavailableStore;

#[async_trait]
impl ResultStore for UnavailableStore {
    async fn save(&self, _: &str, _: &str, _: &AnalysisResult) -> Result<()> {
        Err(InsightError::Store("disk full".to_string()))
    }

    async fn load(&self, _: &str, _: &str) -> Result<Option<AnalysisResult>> {
        Err(InsightError::Store("unreachable".to_string()))
    }

    async fn clear(&self, _: &str, _: &str) -> Result<()> {
        Err(InsightError::Store("unreachable".to_string()))
    }

    async fn history(&self, _: &str, _: &str) -> Result<Vec<AnalysisResult>> {
        Err(InsightError::Store("unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_resilient_load_serves_default_when_nothing_cached() {
    let store = ResilientStore::new(Arc::new(UnavailableStore));
    let loaded = store
        .load("user-1", "project-1")
        .await
        .expect("load never fails")
        .expect("default payload");
    assert_eq!(loaded, AnalysisResult {
        created_at: loaded.created_at,
        ..AnalysisResult::empty("user-1", "project-1")
    });
    assert!(store.history("user-1", "project-1").await.expect("history").is_empty());
}

#[tokio::test]
async fn test_resilient_save_reports_error_but_caches() {
    let store = ResilientStore::new(Arc::new(UnavailableStore));
    let result = sample(12, 0);

    let saved = store.save("user-1", "project-1", &result).await;
    assert!(matches!(saved, Err(InsightError::Store(_))));

    let loaded = store.load("user-1", "project-1").await.expect("load");
    assert_eq!(loaded, Some(result.clone()));
    let history = store.history("user-1", "project-1").await.expect("history");
    assert_eq!(history, vec![result]);
}

#[tokio::test]
async fn test_resilient_store_passes_through_when_healthy() {
    let (_dir, sled) = open();
    let store = ResilientStore::new(Arc::new(sled));
    let result = sample(3, 0);
    store.save("user-1", "project-1", &result).await.expect("save");
    assert_eq!(store.load("user-1", "project-1").await.expect("load"), Some(result));

    store.clear("user-1", "project-1").await.expect("clear");
    assert!(store.load("user-1", "project-1").await.expect("load").is_none());
}
