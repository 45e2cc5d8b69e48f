//! Trend forecasting over stored analysis history
//!
//! These are heuristics: confidence grows with the number of stored runs
//! and is capped per trend. Nothing here is a fitted model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AnalysisResult;
use crate::utils::{mean, round2};

const ENGAGEMENT_THRESHOLD: f64 = 10.0;
const SENTIMENT_THRESHOLD: f64 = 0.05;
const GROWTH_THRESHOLD: f64 = 5.0;
const INSUFFICIENT_CONFIDENCE: f64 = 50.0;

/// Direction of a trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    /// Above the positive threshold
    Increasing,
    /// Below the negative threshold
    Decreasing,
    /// Within the thresholds
    Stable,
}

impl TrendDirection {
    fn classify(change: f64, threshold: f64) -> Self {
        if change > threshold {
            Self::Increasing
        } else if change < -threshold {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

/// One trend line with heuristic confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendForecast {
    /// Trend direction
    pub direction: TrendDirection,
    /// Change between the compared windows (percent, or points for sentiment)
    pub change_percent: f64,
    /// Projected next value
    pub forecast_value: f64,
    /// Heuristic confidence, 0-100
    pub confidence: f64,
    /// Human readable summary
    pub description: String,
}

impl TrendForecast {
    fn no_data() -> Self {
        Self {
            direction: TrendDirection::Stable,
            change_percent: 0.0,
            forecast_value: 0.0,
            confidence: 0.0,
            description: "no data".to_string(),
        }
    }

    fn insufficient(value: f64) -> Self {
        Self {
            direction: TrendDirection::Stable,
            change_percent: 0.0,
            forecast_value: round2(value),
            confidence: INSUFFICIENT_CONFIDENCE,
            description: "insufficient data".to_string(),
        }
    }
}

/// Short-horizon projection of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Metric name
    pub metric: String,
    /// Projection horizon
    pub horizon_days: u32,
    /// Expected direction
    pub direction: TrendDirection,
    /// Projected value
    pub value: f64,
    /// Heuristic confidence, 0-100
    pub confidence: f64,
}

/// Forecast derived from a project's analysis history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSet {
    /// False when no history exists
    pub has_data: bool,
    /// Guidance for the caller
    pub message: String,
    /// Comment volume trend
    pub engagement_forecast: TrendForecast,
    /// Overall sentiment trend
    pub sentiment_trend: TrendForecast,
    /// 30-day growth projection
    pub growth_prediction: TrendForecast,
    /// Per-metric projections
    pub predictions: Vec<Prediction>,
    /// Runs the forecast was computed from
    pub history_points: usize,
    /// When the forecast was computed
    pub generated_at: DateTime<Utc>,
}

/// Compute trends from a time-ascending history
#[must_use]
pub fn forecast(history: &[AnalysisResult]) -> PredictionSet {
    let mut points: Vec<(DateTime<Utc>, f64, f64)> = history
        .iter()
        .map(|r| (r.created_at, r.total_comments as f64, r.sentiment.overall_score))
        .collect();
    points.sort_by_key(|(at, _, _)| *at);

    let comments: Vec<f64> = points.iter().map(|p| p.1).collect();
    let sentiment: Vec<f64> = points.iter().map(|p| p.2).collect();
    let n = points.len();

    match n {
        0 => PredictionSet {
            has_data: false,
            message: "No analysis history yet. Run an analysis for this project to enable forecasts."
                .to_string(),
            engagement_forecast: TrendForecast::no_data(),
            sentiment_trend: TrendForecast::no_data(),
            growth_prediction: TrendForecast::no_data(),
            predictions: Vec::new(),
            history_points: 0,
            generated_at: Utc::now(),
        },
        1 => PredictionSet {
            has_data: true,
            message: "Only one analysis stored. Run more analyses to improve forecasts.".to_string(),
            engagement_forecast: TrendForecast::insufficient(comments[0]),
            sentiment_trend: TrendForecast::insufficient(sentiment[0]),
            growth_prediction: TrendForecast::insufficient(0.0),
            predictions: Vec::new(),
            history_points: 1,
            generated_at: Utc::now(),
        },
        _ => {
            let engagement = engagement_trend(&comments);
            let sentiment_trend = sentiment_trend(&sentiment);
            let growth = growth_prediction(&comments);
            let predictions = short_horizon(&comments, &sentiment, &engagement, &sentiment_trend, &growth);

            tracing::debug!(
                history = n,
                engagement = engagement.direction.as_str(),
                sentiment = sentiment_trend.direction.as_str(),
                "Computed forecast"
            );

            PredictionSet {
                has_data: true,
                message: format!("Forecast based on {n} analyses"),
                engagement_forecast: engagement,
                sentiment_trend,
                growth_prediction: growth,
                predictions,
                history_points: n,
                generated_at: Utc::now(),
            }
        }
    }
}

fn confidence(n: usize, base: f64, step: f64, cap: f64) -> f64 {
    (base + step * n as f64).min(cap)
}

fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        if to > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (to - from) / from * 100.0
    }
}

/// First third against last third of comment counts
fn engagement_trend(comments: &[f64]) -> TrendForecast {
    let n = comments.len();
    let third = (n / 3).max(1);
    let first = mean(&comments[..third]).unwrap_or(0.0);
    let last = mean(&comments[n - third..]).unwrap_or(0.0);
    let change = percent_change(first, last);
    let direction = TrendDirection::classify(change, ENGAGEMENT_THRESHOLD);

    TrendForecast {
        direction,
        change_percent: round2(change),
        forecast_value: round2((last * (1.0 + change / 100.0)).max(0.0)),
        confidence: confidence(n, 60.0, 5.0, 95.0),
        description: format!(
            "Comment volume is {} ({:+.1}% from earliest to latest runs)",
            direction.as_str(),
            change
        ),
    }
}

/// First half against second half of overall scores
fn sentiment_trend(scores: &[f64]) -> TrendForecast {
    let n = scores.len();
    let half = n / 2;
    let first = mean(&scores[..half]).unwrap_or(0.0);
    let second = mean(&scores[half..]).unwrap_or(0.0);
    let delta = second - first;
    let direction = TrendDirection::classify(delta, SENTIMENT_THRESHOLD);

    TrendForecast {
        direction,
        change_percent: round2(percent_change(first, second)),
        forecast_value: round2((second + delta).clamp(0.0, 10.0)),
        confidence: confidence(n, 55.0, 5.0, 92.0),
        description: format!("Sentiment is {} ({:+.2} points)", direction.as_str(), delta),
    }
}

/// Mean period-over-period change, doubled as a 30-day projection
fn growth_prediction(comments: &[f64]) -> TrendForecast {
    let changes: Vec<f64> = comments
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| percent_change(w[0], w[1]))
        .collect();
    let projected = mean(&changes).unwrap_or(0.0) * 2.0;
    let direction = TrendDirection::classify(projected, GROWTH_THRESHOLD);
    let last = comments.last().copied().unwrap_or(0.0);

    TrendForecast {
        direction,
        change_percent: round2(projected),
        forecast_value: round2((last * (1.0 + projected / 100.0)).max(0.0)),
        confidence: confidence(comments.len(), 50.0, 4.0, 88.0),
        description: format!("Projected 30-day growth of {projected:+.1}%"),
    }
}

fn short_horizon(
    comments: &[f64],
    sentiment: &[f64],
    engagement: &TrendForecast,
    sentiment_trend: &TrendForecast,
    growth: &TrendForecast,
) -> Vec<Prediction> {
    let last_comments = comments.last().copied().unwrap_or(0.0);
    let last_sentiment = sentiment.last().copied().unwrap_or(0.0);

    vec![
        Prediction {
            metric: "comments_next_run".to_string(),
            horizon_days: 7,
            direction: engagement.direction,
            value: round2((last_comments * (1.0 + engagement.change_percent / 300.0)).max(0.0)),
            confidence: round2(engagement.confidence * 0.9),
        },
        Prediction {
            metric: "sentiment_next_run".to_string(),
            horizon_days: 7,
            direction: sentiment_trend.direction,
            value: round2(
                (last_sentiment + (sentiment_trend.forecast_value - last_sentiment) / 2.0)
                    .clamp(0.0, 10.0),
            ),
            confidence: round2(sentiment_trend.confidence * 0.9),
        },
        Prediction {
            metric: "comments_30d".to_string(),
            horizon_days: 30,
            direction: growth.direction,
            value: growth.forecast_value,
            confidence: growth.confidence,
        },
    ]
}
