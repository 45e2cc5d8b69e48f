//! Community detection over the undirected reply projection
//!
//! Partitions are found with a deterministic Louvain pass per configured
//! resolution. Candidates are compared by standard modularity, so a high
//! resolution cannot win just by scoring itself on its own scale.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::config::CommunityConfig;
use crate::graph::ReplyGraph;
use crate::models::{CommentRecord, Community, CommunitySummary};
use crate::utils::round_to;

const PAGERANK_DAMPING: f64 = 0.85;
const PAGERANK_ITERATIONS: usize = 100;
const PAGERANK_TOLERANCE: f64 = 1e-9;
const MAX_LOCAL_PASSES: usize = 100;
const GAIN_EPSILON: f64 = 1e-12;

/// Weighted undirected graph in adjacency form, as Louvain aggregates it
#[derive(Debug, Clone)]
struct WeightedGraph {
    /// Neighbours of each node, self excluded
    adjacency: Vec<Vec<(usize, f64)>>,
    /// Weight of edges internal to each node
    loops: Vec<f64>,
}

impl WeightedGraph {
    fn from_projection(projection: &UnGraph<String, f64>) -> Self {
        let n = projection.node_count();
        let mut adjacency = vec![Vec::new(); n];
        for edge in projection.edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            adjacency[a].push((b, *edge.weight()));
            adjacency[b].push((a, *edge.weight()));
        }
        for neighbours in &mut adjacency {
            neighbours.sort_by_key(|(node, _)| *node);
        }
        Self {
            adjacency,
            loops: vec![0.0; n],
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    fn degree(&self, node: usize) -> f64 {
        2.0 * self.loops[node] + self.adjacency[node].iter().map(|(_, w)| w).sum::<f64>()
    }

    fn total_weight(&self) -> f64 {
        (0..self.len()).map(|n| self.degree(n)).sum::<f64>() / 2.0
    }

    /// Collapse each community into one node
    fn aggregate(&self, community: &[usize], count: usize) -> Self {
        let mut loops = vec![0.0; count];
        let mut between: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];

        for node in 0..self.len() {
            let c = community[node];
            loops[c] += self.loops[node];
            for &(neighbour, weight) in &self.adjacency[node] {
                let d = community[neighbour];
                if c == d {
                    // Each internal edge is seen from both ends
                    loops[c] += weight / 2.0;
                } else {
                    *between[c].entry(d).or_insert(0.0) += weight;
                }
            }
        }

        Self {
            adjacency: between.into_iter().map(|m| m.into_iter().collect()).collect(),
            loops,
        }
    }

    /// Standard modularity of a partition, scaled by `resolution`
    fn modularity(&self, community: &[usize], resolution: f64) -> f64 {
        let m = self.total_weight();
        if m == 0.0 {
            return 0.0;
        }

        let mut internal: BTreeMap<usize, f64> = BTreeMap::new();
        let mut totals: BTreeMap<usize, f64> = BTreeMap::new();
        for node in 0..self.len() {
            let c = community[node];
            *totals.entry(c).or_insert(0.0) += self.degree(node);
            *internal.entry(c).or_insert(0.0) += self.loops[node];
            for &(neighbour, weight) in &self.adjacency[node] {
                if community[neighbour] == c {
                    *internal.entry(c).or_insert(0.0) += weight / 2.0;
                }
            }
        }

        totals
            .iter()
            .map(|(c, total)| {
                internal.get(c).copied().unwrap_or(0.0) / m
                    - resolution * (total / (2.0 * m)).powi(2)
            })
            .sum()
    }
}

/// Relabel communities densely in order of first appearance
fn renumber(community: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping = HashMap::new();
    let relabelled = community
        .iter()
        .map(|c| {
            let next = mapping.len();
            *mapping.entry(*c).or_insert(next)
        })
        .collect();
    (relabelled, mapping.len())
}

/// One Louvain level: move nodes greedily until no move improves modularity
fn local_moves(graph: &WeightedGraph, resolution: f64) -> (Vec<usize>, bool) {
    let n = graph.len();
    let m = graph.total_weight();
    let mut community: Vec<usize> = (0..n).collect();
    if m == 0.0 {
        return (community, false);
    }

    let degrees: Vec<f64> = (0..n).map(|node| graph.degree(node)).collect();
    let mut totals = degrees.clone();
    let mut improved = false;

    for _ in 0..MAX_LOCAL_PASSES {
        let mut moved = false;

        for node in 0..n {
            let current = community[node];
            let k = degrees[node];

            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            for &(neighbour, weight) in &graph.adjacency[node] {
                *links.entry(community[neighbour]).or_insert(0.0) += weight;
            }

            totals[current] -= k;
            let gain = |c: usize, w: f64| w - resolution * totals[c] * k / (2.0 * m);

            let mut best = current;
            let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
            for (&c, &w) in &links {
                let candidate = gain(c, w);
                if candidate > best_gain + GAIN_EPSILON {
                    best = c;
                    best_gain = candidate;
                }
            }

            totals[best] += k;
            if best != current {
                community[node] = best;
                moved = true;
                improved = true;
            }
        }

        if !moved {
            break;
        }
    }

    (community, improved)
}

/// Full Louvain: alternate local moves and aggregation until stable
fn louvain(graph: &WeightedGraph, resolution: f64) -> Vec<usize> {
    let mut membership: Vec<usize> = (0..graph.len()).collect();
    let mut current = graph.clone();

    loop {
        let (local, improved) = local_moves(&current, resolution);
        if !improved {
            break;
        }
        let (local, count) = renumber(&local);
        membership = membership.iter().map(|&c| local[c]).collect();
        if count == current.len() {
            break;
        }
        current = current.aggregate(&local, count);
    }

    renumber(&membership).0
}

/// Detects and describes communities of authors
#[derive(Debug, Clone)]
pub struct CommunityDetector {
    resolutions: Vec<f64>,
    top_communities: usize,
    bridge_users: usize,
}

impl CommunityDetector {
    /// Create a detector from configuration
    #[must_use]
    pub fn new(config: &CommunityConfig) -> Self {
        Self {
            resolutions: config.resolutions.clone(),
            top_communities: config.top_communities,
            bridge_users: config.bridge_users,
        }
    }

    /// Partition the reply graph and summarize the largest communities
    #[must_use]
    pub fn detect(&self, graph: &ReplyGraph, comments: &[CommentRecord]) -> CommunitySummary {
        let projection = graph.undirected_projection();
        let n = projection.node_count();
        if n == 0 {
            return CommunitySummary::default();
        }

        let weighted = WeightedGraph::from_projection(&projection);

        let mut best: Option<(Vec<usize>, f64, f64)> = None;
        for &resolution in &self.resolutions {
            let partition = louvain(&weighted, resolution);
            let modularity = weighted.modularity(&partition, 1.0);
            tracing::debug!(resolution, modularity, "Evaluated community resolution");
            if best.as_ref().map_or(true, |(_, q, _)| modularity > *q + GAIN_EPSILON) {
                best = Some((partition, modularity, resolution));
            }
        }
        let (partition, modularity, resolution_used) =
            best.unwrap_or_else(|| ((0..n).collect(), 0.0, 1.0));

        let mut groups: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
        for (node, &c) in partition.iter().enumerate() {
            groups.entry(c).or_default().push(NodeIndex::new(node));
        }
        let mut groups: Vec<Vec<NodeIndex>> = groups.into_values().collect();
        // Largest first; equal sizes keep the order of their first member
        groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));

        let activity = author_activity(comments);
        let betweenness = betweenness_centrality(&projection);

        let communities: Vec<Community> = groups
            .iter()
            .take(self.top_communities)
            .enumerate()
            .map(|(id, members)| self.describe(id, members, &projection, &activity, &betweenness))
            .collect();

        tracing::info!(
            communities = groups.len(),
            modularity,
            resolution_used,
            "Detected communities"
        );

        CommunitySummary {
            total_communities: groups.len(),
            modularity: round_to(modularity, 4),
            resolution_used,
            total_authors: n,
            other_communities: groups.len() - communities.len(),
            communities,
        }
    }

    fn describe(
        &self,
        id: usize,
        members: &[NodeIndex],
        projection: &UnGraph<String, f64>,
        activity: &HashMap<&str, (u64, u64)>,
        betweenness: &[f64],
    ) -> Community {
        let member_set: HashSet<NodeIndex> = members.iter().copied().collect();
        let size = members.len();

        let internal_pairs = projection
            .edge_references()
            .filter(|e| member_set.contains(&e.source()) && member_set.contains(&e.target()))
            .count();
        let possible_pairs = size * size.saturating_sub(1) / 2;
        let density = if possible_pairs == 0 {
            0.0
        } else {
            round_to((internal_pairs as f64 / possible_pairs as f64).min(1.0), 4)
        };

        let stats = |node: NodeIndex| {
            activity
                .get(projection[node].as_str())
                .copied()
                .unwrap_or((0, 0))
        };
        let total_comments = members.iter().map(|&m| stats(m).0).sum();
        let total_likes = members.iter().map(|&m| stats(m).1).sum();

        // Members are in ascending author order, so the first maximum wins ties
        let top_contributor = members
            .iter()
            .fold(None::<(NodeIndex, u64)>, |best, &m| {
                let (comments, likes) = stats(m);
                let volume = comments + likes;
                match best {
                    Some((_, v)) if v >= volume => best,
                    _ => Some((m, volume)),
                }
            })
            .map(|(m, _)| projection[m].clone());

        let ranks = pagerank(members, &member_set, projection);
        let top_influencer = members
            .iter()
            .zip(&ranks)
            .fold(None::<(NodeIndex, f64)>, |best, (&m, &rank)| match best {
                Some((_, r)) if r >= rank - GAIN_EPSILON => best,
                _ => Some((m, rank)),
            })
            .map(|(m, _)| projection[m].clone());

        let mut bridges: Vec<(NodeIndex, f64)> = members
            .iter()
            .map(|&m| (m, betweenness[m.index()]))
            .filter(|(_, b)| *b > 0.0)
            .collect();
        bridges.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let bridge_users = bridges
            .into_iter()
            .take(self.bridge_users)
            .map(|(m, _)| projection[m].clone())
            .collect();

        let mut member_ids: Vec<String> = members.iter().map(|&m| projection[m].clone()).collect();
        member_ids.sort();

        Community {
            id,
            size,
            density,
            total_comments,
            total_likes,
            top_contributor,
            top_influencer,
            bridge_users,
            clustering_coefficient: average_clustering(members, &member_set, projection),
            members: member_ids,
        }
    }
}

/// Comments written and likes received per author
fn author_activity(comments: &[CommentRecord]) -> HashMap<&str, (u64, u64)> {
    let mut activity: HashMap<&str, (u64, u64)> = HashMap::new();
    for comment in comments {
        let entry = activity.entry(comment.author_id.as_str()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += comment.like_count;
    }
    activity
}

/// Weighted PageRank on the subgraph induced by `members`
fn pagerank(
    members: &[NodeIndex],
    member_set: &HashSet<NodeIndex>,
    projection: &UnGraph<String, f64>,
) -> Vec<f64> {
    let n = members.len();
    if n == 0 {
        return Vec::new();
    }

    let position: HashMap<NodeIndex, usize> =
        members.iter().enumerate().map(|(i, &m)| (m, i)).collect();
    let links: Vec<Vec<(usize, f64)>> = members
        .iter()
        .map(|&m| {
            projection
                .edges(m)
                .filter(|e| member_set.contains(&e.target()))
                .filter_map(|e| position.get(&e.target()).map(|&p| (p, *e.weight())))
                .collect()
        })
        .collect();
    let strength: Vec<f64> = links
        .iter()
        .map(|l| l.iter().map(|(_, w)| w).sum())
        .collect();

    let mut scores = vec![1.0 / n as f64; n];
    for _ in 0..PAGERANK_ITERATIONS {
        // Rank held by isolated members is spread evenly
        let dangling: f64 = (0..n).filter(|&i| strength[i] == 0.0).map(|i| scores[i]).sum();
        let base = (1.0 - PAGERANK_DAMPING) / n as f64 + PAGERANK_DAMPING * dangling / n as f64;

        let mut next = vec![base; n];
        for (i, neighbours) in links.iter().enumerate() {
            if strength[i] == 0.0 {
                continue;
            }
            for &(j, weight) in neighbours {
                next[j] += PAGERANK_DAMPING * scores[i] * weight / strength[i];
            }
        }

        let delta: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if delta < PAGERANK_TOLERANCE {
            break;
        }
    }
    scores
}

/// Brandes betweenness over the unweighted projection, normalized to [0, 1]
fn betweenness_centrality(projection: &UnGraph<String, f64>) -> Vec<f64> {
    let n = projection.node_count();
    let mut centrality = vec![0.0; n];

    for source in projection.node_indices() {
        let s = source.index();
        let mut stack = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut paths = vec![0.0_f64; n];
        let mut distance = vec![-1_i64; n];
        paths[s] = 1.0;
        distance[s] = 0;

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            stack.push(v.index());
            for w in projection.neighbors(v) {
                let (vi, wi) = (v.index(), w.index());
                if distance[wi] < 0 {
                    distance[wi] = distance[vi] + 1;
                    queue.push_back(w);
                }
                if distance[wi] == distance[vi] + 1 {
                    paths[wi] += paths[vi];
                    predecessors[wi].push(vi);
                }
            }
        }

        let mut dependency = vec![0.0; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                dependency[v] += paths[v] / paths[w] * (1.0 + dependency[w]);
            }
            if w != s {
                centrality[w] += dependency[w];
            }
        }
    }

    // Undirected: every path was counted from both ends
    let scale = if n > 2 {
        1.0 / ((n - 1) * (n - 2)) as f64
    } else {
        0.0
    };
    centrality.iter().map(|c| c * scale).collect()
}

/// Mean local clustering coefficient inside the community subgraph
fn average_clustering(
    members: &[NodeIndex],
    member_set: &HashSet<NodeIndex>,
    projection: &UnGraph<String, f64>,
) -> f64 {
    if members.is_empty() {
        return 0.0;
    }

    let neighbours: HashMap<NodeIndex, HashSet<NodeIndex>> = members
        .iter()
        .map(|&m| {
            let inside = projection
                .neighbors(m)
                .filter(|n| *n != m && member_set.contains(n))
                .collect();
            (m, inside)
        })
        .collect();

    let total: f64 = members
        .iter()
        .map(|m| {
            let own = &neighbours[m];
            let degree = own.len();
            if degree < 2 {
                return 0.0;
            }
            let links = own
                .iter()
                .flat_map(|a| own.iter().map(move |b| (a, b)))
                .filter(|(a, b)| a < b && neighbours[a].contains(b))
                .count();
            2.0 * links as f64 / (degree * (degree - 1)) as f64
        })
        .sum();

    round_to(total / members.len() as f64, 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReplyEdge, VideoId};
    use chrono::Utc;

    fn edge(from: &str, to: &str) -> ReplyEdge {
        ReplyEdge {
            from_author: from.to_string(),
            to_author: to.to_string(),
            video_id: VideoId("v1".to_string()),
            timestamp: Utc::now(),
        }
    }

    fn triangle(prefix: &str) -> Vec<ReplyEdge> {
        let a = format!("{prefix}1");
        let b = format!("{prefix}2");
        let c = format!("{prefix}3");
        vec![edge(&a, &b), edge(&b, &c), edge(&c, &a)]
    }

    fn detector() -> CommunityDetector {
        CommunityDetector::new(&CommunityConfig {
            resolutions: vec![0.5, 1.0, 1.5, 2.0],
            top_communities: 10,
            bridge_users: 3,
        })
    }

    #[test]
    fn test_two_triangles_with_bridge() {
        let mut edges = triangle("a");
        edges.extend(triangle("b"));
        edges.push(edge("a1", "b1"));
        let graph = ReplyGraph::build(&edges);

        let summary = detector().detect(&graph, &[]);
        assert_eq!(summary.total_communities, 2);
        assert_eq!(summary.total_authors, 6);
        assert!(summary.modularity > 0.3);

        let sizes: usize = summary.communities.iter().map(|c| c.size).sum();
        assert_eq!(sizes, 6);

        let first = &summary.communities[0];
        assert_eq!(first.density, 1.0);
        assert_eq!(first.clustering_coefficient, 1.0);
        assert!(first.bridge_users.iter().any(|u| u == "a1" || u == "b1"));
    }

    #[test]
    fn test_empty_graph_yields_default_summary() {
        let summary = detector().detect(&ReplyGraph::build(&[]), &[]);
        assert_eq!(summary.total_communities, 0);
        assert!(summary.communities.is_empty());
    }

    #[test]
    fn test_top_contributor_uses_comment_and_like_volume() {
        let graph = ReplyGraph::build(&[edge("x", "y")]);
        let comments = vec![
            CommentRecord::new("c1", "v1", "x", "X", "hi"),
            CommentRecord::new("c2", "v1", "y", "Y", "hello").with_likes(10),
        ];
        let summary = detector().detect(&graph, &comments);
        let community = &summary.communities[0];
        assert_eq!(community.top_contributor.as_deref(), Some("y"));
        assert_eq!(community.total_comments, 2);
        assert_eq!(community.total_likes, 10);
    }

    #[test]
    fn test_star_center_is_top_influencer() {
        let edges = vec![edge("l1", "hub"), edge("l2", "hub"), edge("l3", "hub"), edge("l4", "hub")];
        let summary = detector().detect(&ReplyGraph::build(&edges), &[]);
        assert_eq!(summary.total_communities, 1);
        assert_eq!(summary.communities[0].top_influencer.as_deref(), Some("hub"));
        assert_eq!(summary.communities[0].bridge_users, vec!["hub".to_string()]);
    }

    #[test]
    fn test_only_top_communities_are_detailed() {
        let mut edges = Vec::new();
        for i in 0..4 {
            edges.push(edge(&format!("p{i}a"), &format!("p{i}b")));
        }
        let detector = CommunityDetector::new(&CommunityConfig {
            resolutions: vec![1.0],
            top_communities: 2,
            bridge_users: 3,
        });
        let summary = detector.detect(&ReplyGraph::build(&edges), &[]);
        assert_eq!(summary.total_communities, 4);
        assert_eq!(summary.communities.len(), 2);
        assert_eq!(summary.other_communities, 2);
    }

    #[test]
    fn test_modularity_of_single_block_is_zero() {
        let graph = ReplyGraph::build(&triangle("t"));
        let weighted = WeightedGraph::from_projection(&graph.undirected_projection());
        assert!(weighted.modularity(&[0, 0, 0], 1.0).abs() < 1e-9);
    }
}
