//! End-to-end runs of the analysis service against in-memory collaborators

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tempfile::TempDir;

use channel_insight::config::AppConfig;
use channel_insight::error::{ErrorKind, InsightError, Result};
use channel_insight::harvest::{CancellationFlag, Progress, ProgressFn};
use channel_insight::render::PngChartRenderer;
use channel_insight::sentiment::{ClassLabel, ClassifierBackend, SentimentClassifier};
use channel_insight::AnalysisService;
use common::{raw, thread, FakePlatform, CHANNEL};

/// Labels every text as four stars
#[derive(Default)]
struct FourStarBackend {
    warm_ups: AtomicUsize,
}

#[async_trait]
impl ClassifierBackend for FourStarBackend {
    async fn warm_up(&self) -> Result<()> {
        self.warm_ups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn classify_batch(&self, texts: &[String], _truncation: bool) -> Result<Vec<ClassLabel>> {
        Ok(texts
            .iter()
            .map(|_| ClassLabel {
                label: "4 stars".to_string(),
                score: 0.71,
            })
            .collect())
    }
}

fn populated_platform() -> FakePlatform {
    let first = vec![vec![
        thread(
            raw("c1", "alice", "Great tutorial, learned a lot about lifetimes", 10, None),
            2,
            vec![
                raw("c2", "bob", "Same here, the borrow checker part helped", 2, Some("c1")),
                raw("c3", CHANNEL, "Thanks for watching!", 1, Some("c1")),
            ],
        ),
        thread(
            raw("c4", "bob", "Could you cover async next?", 3, None),
            1,
            vec![raw("c5", "alice", "Seconding async please", 0, Some("c4"))],
        ),
    ]];
    let second = vec![vec![
        thread(
            raw("c6", "carol", "Nice editing on this one", 1, None),
            1,
            vec![raw("c7", "alice", "Agreed, very clean", 0, Some("c6"))],
        ),
        thread(raw("c8", "bob", "Watched it twice", 0, None), 0, Vec::new()),
    ]];

    FakePlatform::new()
        .with_video("vid00000001", 1, first)
        .with_video("vid00000002", 2, second)
        .with_video("vid00000003", 3, vec![Vec::new()])
        .failing_page("vid00000003", 0)
}

fn service(platform: FakePlatform, dir: &TempDir) -> AnalysisService {
    let config = AppConfig::default();
    let classifier = SentimentClassifier::new(
        &config.sentiment,
        Arc::new(FourStarBackend::default()),
        Arc::new(PngChartRenderer),
    )
    .expect("classifier");
    let store = AnalysisService::open_store(dir.path().join("results")).expect("store");
    AnalysisService::new(&config, Arc::new(platform), Arc::new(classifier), store).expect("service")
}

#[tokio::test]
async fn test_full_run_is_stored_and_consistent() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(populated_platform(), &dir);

    let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressFn = Arc::new(move |percent: u8, _message: &str| {
        if let Ok(mut seen) = sink.lock() {
            seen.push(percent);
        }
    });

    let result = service
        .run(
            "user-1",
            "project-1",
            "https://www.youtube.com/@tester",
            &Progress::new(Some(callback)),
            &CancellationFlag::new(),
        )
        .await
        .expect("run succeeds");

    assert!(!result.partial);
    assert_eq!(result.reference, "https://www.youtube.com/@tester");
    assert_eq!(result.channel.as_ref().map(|c| c.title.as_str()), Some(common::OWNER_NAME));
    assert_eq!(result.videos.len(), 3);
    assert_eq!(result.total_comments, 8);
    assert_eq!(result.total_replies, 4);
    assert_eq!(result.unique_authors, 4);
    assert_eq!(result.total_edges, 4);

    // Only the failing comment page is reported
    assert_eq!(result.diagnostics.count(ErrorKind::PartialCollectionFailure), 1);
    assert_eq!(result.diagnostics.entries().len(), 1);

    assert_eq!(result.sentiment.analyzed, 8);
    assert_eq!(result.sentiment.positive, 8);
    assert_eq!(result.sentiment.overall_score, 8.0);
    for chart in [&result.sentiment.word_cloud, &result.sentiment.pie_chart] {
        let png = STANDARD
            .decode(chart.as_deref().expect("chart rendered"))
            .expect("base64");
        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
    }
    assert_eq!(result.sentiment.top_like_comments[0].comment_id, "c1");

    let authors: Vec<&str> = result.influencers.iter().map(|i| i.author_id.as_str()).collect();
    assert_eq!(authors.len(), 2);
    assert!(authors.contains(&"alice") && authors.contains(&"bob"));

    assert_eq!(result.communities.total_authors, 4);
    let members: usize = result.communities.communities.iter().map(|c| c.size).sum();
    assert_eq!(members, 4);

    let stored = service
        .current("user-1", "project-1")
        .await
        .expect("load")
        .expect("stored");
    assert_eq!(stored, result);

    let progress = seen.lock().expect("progress").clone();
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_video_reference_analyzes_single_video() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(populated_platform(), &dir);

    let result = service
        .run(
            "user-1",
            "project-1",
            "https://youtu.be/vid00000002",
            &Progress::default(),
            &CancellationFlag::new(),
        )
        .await
        .expect("run succeeds");

    assert_eq!(result.videos.len(), 1);
    assert_eq!(result.total_comments, 3);
    assert!(result.diagnostics.is_empty());
}

#[tokio::test]
async fn test_unresolvable_reference_fails() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(populated_platform(), &dir);

    let err = service
        .run("user-1", "project-1", "@nobody", &Progress::default(), &CancellationFlag::new())
        .await
        .expect_err("unknown handle");
    assert!(matches!(err, InsightError::NotResolvable(_)));
    assert!(service.current("user-1", "project-1").await.expect("load").is_none());
}

#[tokio::test]
async fn test_invalid_identifiers_are_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(populated_platform(), &dir);

    let err = service
        .run("user:1", "project-1", "@tester", &Progress::default(), &CancellationFlag::new())
        .await
        .expect_err("separator in user id");
    assert!(matches!(err, InsightError::InvalidInput(_)));
}

#[tokio::test]
async fn test_channel_without_videos_fails() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(FakePlatform::new(), &dir);

    let err = service
        .run("user-1", "project-1", "@tester", &Progress::default(), &CancellationFlag::new())
        .await
        .expect_err("no videos");
    assert!(matches!(err, InsightError::NoVideosFound { .. }));
}

#[tokio::test]
async fn test_cancelled_run_returns_partial_result() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(populated_platform(), &dir);
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let result = service
        .run("user-1", "project-1", "@tester", &Progress::default(), &cancel)
        .await
        .expect("cancelled runs still produce a result");

    assert!(result.partial);
    assert_eq!(result.videos.len(), 3);
    assert_eq!(result.total_comments, 0);
    assert_eq!(result.sentiment.analyzed, 0);
    assert!(result.influencers.is_empty());

    assert!(service.current("user-1", "project-1").await.expect("load").is_none());
    assert!(service.history("user-1", "project-1").await.expect("history").is_empty());
}

#[tokio::test]
async fn test_cancelled_run_leaves_history_and_forecast_untouched() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(populated_platform(), &dir);

    for _ in 0..2 {
        service
            .run("user-1", "project-1", "@tester", &Progress::default(), &CancellationFlag::new())
            .await
            .expect("run");
    }
    let before = service.predict("user-1", "project-1").await.expect("predict");

    let cancel = CancellationFlag::new();
    cancel.cancel();
    let cancelled = service
        .run("user-1", "project-1", "@tester", &Progress::default(), &cancel)
        .await
        .expect("cancelled run");
    assert!(cancelled.partial);

    let history = service.history("user-1", "project-1").await.expect("history");
    let counts: Vec<usize> = history.iter().map(|r| r.total_comments).collect();
    assert_eq!(counts, vec![8, 8]);

    let current = service
        .current("user-1", "project-1")
        .await
        .expect("load")
        .expect("stored");
    assert!(!current.partial);
    assert_eq!(current.total_comments, 8);

    let after = service.predict("user-1", "project-1").await.expect("predict");
    assert_eq!(after.history_points, 2);
    assert_eq!(
        after.engagement_forecast.direction,
        before.engagement_forecast.direction
    );
    assert_eq!(
        after.engagement_forecast.change_percent,
        before.engagement_forecast.change_percent
    );
}

#[tokio::test]
async fn test_history_and_predict() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(populated_platform(), &dir);

    let empty = service.predict("user-1", "project-1").await.expect("predict");
    assert!(!empty.has_data);

    for _ in 0..3 {
        service
            .run("user-1", "project-1", "@tester", &Progress::default(), &CancellationFlag::new())
            .await
            .expect("run");
    }

    let history = service.history("user-1", "project-1").await.expect("history");
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    let prediction = service.predict("user-1", "project-1").await.expect("predict");
    assert!(prediction.has_data);
    assert_eq!(prediction.history_points, 3);
    assert_eq!(prediction.predictions.len(), 3);

    service.clear("user-1", "project-1").await.expect("clear");
    assert!(service.current("user-1", "project-1").await.expect("load").is_none());
    assert_eq!(service.history("user-1", "project-1").await.expect("history").len(), 3);
}
