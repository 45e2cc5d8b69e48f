//! Export of stored analysis results.
//!
//! JSON carries the full result; CSV flattens the influencer ranking and the
//! detailed communities into one table each.

use std::fmt;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::Writer;

use crate::error::{InsightError, Result};
use crate::models::{AnalysisResult, Community, InfluencerScore};

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON of the whole result
    Json,
    /// Influencer and community tables
    Csv,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(InsightError::InvalidInput(format!(
                "Unknown export format: {other} (expected json or csv)"
            ))),
        }
    }
}

/// Write a result under `output_dir/timestamp/`.
///
/// # Returns
///
/// Paths of the files created
pub fn export_to_timestamped_dir(
    result: &AnalysisResult,
    format: ExportFormat,
    output_dir: &Path,
    timestamp: &str,
) -> Result<Vec<PathBuf>> {
    let date_dir = output_dir.join(timestamp);
    create_dir_all(&date_dir)?;

    let files = match format {
        ExportFormat::Json => {
            let path = date_dir.join("analysis.json");
            write_result_json(result, &path)?;
            vec![path]
        }
        ExportFormat::Csv => {
            let influencers = date_dir.join("influencers.csv");
            write_influencers_csv(&result.influencers, &influencers)?;
            let communities = date_dir.join("communities.csv");
            write_communities_csv(&result.communities.communities, &communities)?;
            vec![influencers, communities]
        }
    };

    Ok(files)
}

/// Write the full result as pretty JSON
pub fn write_result_json(result: &AnalysisResult, file_path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(file_path)?);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write the influencer ranking as CSV.
///
/// Includes header row: `Rank, Author ID, Author, Total, ...`
pub fn write_influencers_csv(influencers: &[InfluencerScore], file_path: &Path) -> Result<()> {
    let mut writer = Writer::from_writer(BufWriter::new(File::create(file_path)?));

    writer.write_record([
        "Rank",
        "Author ID",
        "Author",
        "Total",
        "Engagement",
        "Consistency",
        "Network",
        "Quality",
        "Activity",
        "Responsiveness",
        "Comments",
        "Likes",
        "Replies Received",
        "Videos",
    ])?;

    for (i, score) in influencers.iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            score.author_id.clone(),
            score.author_name.clone(),
            score.total.to_string(),
            score.engagement.to_string(),
            score.consistency.to_string(),
            score.network.to_string(),
            score.quality.to_string(),
            score.activity.to_string(),
            score.responsiveness.to_string(),
            score.total_comments.to_string(),
            score.total_likes.to_string(),
            score.replies_received.to_string(),
            score.unique_videos.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the detailed communities as CSV; members are `;`-joined
pub fn write_communities_csv(communities: &[Community], file_path: &Path) -> Result<()> {
    let mut writer = Writer::from_writer(BufWriter::new(File::create(file_path)?));

    writer.write_record([
        "ID",
        "Size",
        "Density",
        "Clustering",
        "Comments",
        "Likes",
        "Top Contributor",
        "Top Influencer",
        "Bridge Users",
        "Members",
    ])?;

    for community in communities {
        writer.write_record([
            community.id.to_string(),
            community.size.to_string(),
            community.density.to_string(),
            community.clustering_coefficient.to_string(),
            community.total_comments.to_string(),
            community.total_likes.to_string(),
            community.top_contributor.clone().unwrap_or_default(),
            community.top_influencer.clone().unwrap_or_default(),
            community.bridge_users.join(";"),
            community.members.join(";"),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
