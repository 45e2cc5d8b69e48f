use std::fs;

use tempfile::tempdir;

use channel_insight::config::ScoringConfig;
use channel_insight::export::{export_to_timestamped_dir, ExportFormat};
use channel_insight::graph::ReplyGraph;
use channel_insight::influence::InfluencerScorer;
use channel_insight::models::{AnalysisResult, CommentRecord, Community};

fn populated_result() -> AnalysisResult {
    let comments: Vec<CommentRecord> = ["alice", "bob"]
        .iter()
        .flat_map(|author| {
            (0..3).map(move |i| {
                CommentRecord::new(format!("{author}{i}"), "vid00000001", *author, author.to_uppercase(), "Loved it, thanks")
                    .with_likes(if *author == "alice" { 40 } else { 2 })
            })
        })
        .collect();
    let scorer = InfluencerScorer::new(&ScoringConfig {
        min_comments: 3,
        top_influencers: 10,
    });

    let mut result = AnalysisResult::empty("user-1", "project-1");
    result.reference = "@tester".to_string();
    result.influencers = scorer.rank(&comments, &ReplyGraph::default());
    result.total_comments = comments.len();
    result.communities.total_communities = 1;
    result.communities.communities.push(Community {
        id: 0,
        size: 2,
        density: 1.0,
        total_comments: 6,
        total_likes: 126,
        top_contributor: Some("alice".to_string()),
        top_influencer: Some("alice".to_string()),
        bridge_users: vec!["alice".to_string()],
        clustering_coefficient: 0.0,
        members: vec!["alice".to_string(), "bob".to_string()],
    });
    result
}

#[test]
fn test_export_json_round_trips() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let result = populated_result();

    let files = export_to_timestamped_dir(&result, ExportFormat::Json, temp_dir.path(), "2025-01-20_12-00-00")
        .expect("Failed to export");

    assert_eq!(files.len(), 1);
    assert_eq!(files[0], temp_dir.path().join("2025-01-20_12-00-00").join("analysis.json"));

    let content = fs::read_to_string(&files[0]).expect("Failed to read export");
    let parsed: AnalysisResult = serde_json::from_str(&content).expect("Export is valid JSON");
    assert_eq!(parsed.user_id, "user-1");
    assert_eq!(parsed.reference, "@tester");
    assert_eq!(parsed.created_at, result.created_at);
    assert_eq!(parsed.influencers.len(), 2);
    assert_eq!(parsed.influencers[0].author_id, "alice");
    assert_eq!(parsed.communities.communities[0].members, vec!["alice", "bob"]);
}

#[test]
fn test_export_csv_writes_both_tables() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let result = populated_result();

    let files = export_to_timestamped_dir(&result, ExportFormat::Csv, temp_dir.path(), "run")
        .expect("Failed to export");
    assert_eq!(files.len(), 2);

    let influencers = fs::read_to_string(&files[0]).expect("influencers.csv");
    let lines: Vec<&str> = influencers.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Rank,Author ID,Author,Total"));
    assert!(lines[1].starts_with("1,alice,ALICE,"));
    assert!(lines[2].starts_with("2,bob,BOB,"));

    let communities = fs::read_to_string(&files[1]).expect("communities.csv");
    let lines: Vec<&str> = communities.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].ends_with("alice,alice;bob"));
}

#[test]
fn test_export_empty_result_still_writes_headers() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let result = AnalysisResult::empty("user-1", "project-1");

    let files = export_to_timestamped_dir(&result, ExportFormat::Csv, temp_dir.path(), "empty")
        .expect("Failed to export");
    for file in files {
        let content = fs::read_to_string(&file).expect("Failed to read export");
        assert_eq!(content.lines().count(), 1);
    }
}
