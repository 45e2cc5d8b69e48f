//! Reply graph and community detection tests

use std::collections::HashSet;

use chrono::Utc;
use proptest::prelude::*;

use channel_insight::community::CommunityDetector;
use channel_insight::config::CommunityConfig;
use channel_insight::graph::ReplyGraph;
use channel_insight::models::{ReplyEdge, VideoId};

fn edge(from: &str, to: &str) -> ReplyEdge {
    ReplyEdge {
        from_author: from.to_string(),
        to_author: to.to_string(),
        video_id: VideoId("vid00000001".to_string()),
        timestamp: Utc::now(),
    }
}

fn detector(top_communities: usize) -> CommunityDetector {
    CommunityDetector::new(&CommunityConfig {
        resolutions: vec![0.5, 1.0, 1.5, 2.0],
        top_communities,
        bridge_users: 3,
    })
}

#[test]
fn test_graph_counts_multi_edges_and_self_loops() {
    let edges = vec![edge("a", "b"), edge("a", "b"), edge("b", "a"), edge("c", "c")];
    let graph = ReplyGraph::build(&edges);

    assert_eq!(graph.author_count(), 3);
    assert_eq!(graph.edge_count(), 4);
    assert_eq!(graph.out_degree("a"), 2);
    assert_eq!(graph.in_degree("b"), 2);
    assert_eq!(graph.in_degree("c"), 1);
    assert_eq!(graph.out_degree("missing"), 0);

    let projection = graph.undirected_projection();
    assert_eq!(projection.node_count(), 3);
    assert_eq!(projection.edge_count(), 1);
    assert_eq!(projection.edge_weights().copied().collect::<Vec<_>>(), vec![3.0]);
}

#[test]
fn test_self_reply_author_is_own_community() {
    let edges = vec![edge("a", "b"), edge("b", "a"), edge("loner", "loner")];
    let summary = detector(10).detect(&ReplyGraph::build(&edges), &[]);

    assert_eq!(summary.total_authors, 3);
    assert_eq!(summary.total_communities, 2);
    let loner = summary
        .communities
        .iter()
        .find(|c| c.members == vec!["loner".to_string()])
        .expect("singleton community");
    assert_eq!(loner.size, 1);
    assert_eq!(loner.density, 0.0);
    assert!(loner.bridge_users.is_empty());
}

#[test]
fn test_communities_sorted_largest_first() {
    let mut edges = vec![edge("s1", "s2")];
    for (a, b) in [("k1", "k2"), ("k2", "k3"), ("k3", "k4"), ("k4", "k1"), ("k1", "k3")] {
        edges.push(edge(a, b));
    }
    let summary = detector(10).detect(&ReplyGraph::build(&edges), &[]);
    let sizes: Vec<usize> = summary.communities.iter().map(|c| c.size).collect();
    assert_eq!(sizes, vec![4, 2]);
    assert_eq!(summary.communities[0].id, 0);
    assert_eq!(summary.communities[1].id, 1);
}

fn arbitrary_edges() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..20, 0u8..20), 0..60)
}

proptest! {
    #[test]
    fn prop_partition_covers_every_author_once(pairs in arbitrary_edges()) {
        let edges: Vec<ReplyEdge> = pairs
            .iter()
            .map(|(a, b)| edge(&format!("u{a}"), &format!("u{b}")))
            .collect();
        let graph = ReplyGraph::build(&edges);
        let summary = detector(usize::MAX).detect(&graph, &[]);

        prop_assert_eq!(summary.total_authors, graph.author_count());
        prop_assert_eq!(summary.communities.len(), summary.total_communities);
        prop_assert_eq!(summary.other_communities, 0);

        let sizes: usize = summary.communities.iter().map(|c| c.size).sum();
        prop_assert_eq!(sizes, summary.total_authors);

        let mut seen = HashSet::new();
        for community in &summary.communities {
            prop_assert_eq!(community.members.len(), community.size);
            prop_assert!((0.0..=1.0).contains(&community.density));
            prop_assert!(community.bridge_users.len() <= 3);
            for member in &community.members {
                prop_assert!(seen.insert(member.clone()), "duplicate member {}", member);
            }
        }
    }

    #[test]
    fn prop_detection_is_deterministic(pairs in arbitrary_edges()) {
        let edges: Vec<ReplyEdge> = pairs
            .iter()
            .map(|(a, b)| edge(&format!("u{a}"), &format!("u{b}")))
            .collect();
        let graph = ReplyGraph::build(&edges);
        let first = detector(5).detect(&graph, &[]);
        let second = detector(5).detect(&graph, &[]);
        prop_assert_eq!(first, second);
    }
}
