//! Sentiment classification of comment text
//!
//! Comments go through a 5-class star-rating model in fixed-size batches.
//! The model backend is warmed once per classifier; concurrent first calls
//! wait on the same initialization instead of loading twice.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::config::SentimentConfig;
use crate::error::{Diagnostics, ErrorKind, InsightError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{CommentRecord, CommentSentiment, SentimentLabel, SentimentSummary, TopComment};
use crate::render::{ChartRenderer, WordCounter};
use crate::utils::{batches, mean, round2, truncate_chars};

const TOP_LIKED: usize = 5;

/// One model prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLabel {
    /// Class name, e.g. `4 stars`
    pub label: String,
    /// Class probability
    pub score: f64,
}

impl ClassLabel {
    /// Star rating encoded in the label (`"3 stars"`, `"LABEL_2"`)
    #[must_use]
    pub fn stars(&self) -> Option<u8> {
        let label = self.label.trim();
        if let Some(index) = label.strip_prefix("LABEL_") {
            return index.parse::<u8>().ok().filter(|i| *i < 5).map(|i| i + 1);
        }
        label
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .and_then(|d| u8::try_from(d).ok())
            .filter(|d| (1..=5).contains(d))
    }
}

/// Batch text classifier behind the sentiment stage
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Load or wake the model
    async fn warm_up(&self) -> Result<()>;

    /// Classify texts, one label per input in input order
    async fn classify_batch(&self, texts: &[String], truncation: bool) -> Result<Vec<ClassLabel>>;
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a [String],
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceParameters {
    truncation: bool,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    /// Every class per input, as the raw model endpoint answers
    Ranked(Vec<Vec<ClassLabel>>),
    /// Top class per input
    Flat(Vec<ClassLabel>),
}

/// Hosted inference endpoint speaking the JSON text-classification protocol
pub struct HttpInferenceBackend {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    timeout_secs: u64,
}

impl HttpInferenceBackend {
    /// Build a backend for `config.model_id`
    pub fn new(config: &SentimentConfig, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/{}", config.endpoint.trim_end_matches('/'), config.model_id),
            token,
            timeout_secs: config.request_timeout_secs,
        })
    }

    async fn infer(&self, texts: &[String], truncation: bool) -> Result<InferenceResponse> {
        let request = InferenceRequest {
            inputs: texts,
            parameters: InferenceParameters { truncation },
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                InsightError::Timeout {
                    seconds: self.timeout_secs,
                }
            } else {
                InsightError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::Classification(format!(
                "inference endpoint returned {status}: {body}"
            )));
        }

        Ok(response.json::<InferenceResponse>().await?)
    }
}

#[async_trait]
impl ClassifierBackend for HttpInferenceBackend {
    async fn warm_up(&self) -> Result<()> {
        tracing::info!(url = %self.url, "Warming up sentiment model");
        self.infer(&["warm up".to_string()], true).await.map(|_| ())
    }

    async fn classify_batch(&self, texts: &[String], truncation: bool) -> Result<Vec<ClassLabel>> {
        let labels = match self.infer(texts, truncation).await? {
            InferenceResponse::Ranked(ranked) => ranked
                .into_iter()
                .map(|classes| {
                    classes
                        .into_iter()
                        .max_by(|a, b| a.score.total_cmp(&b.score))
                        .ok_or_else(|| InsightError::Classification("empty class list".to_string()))
                })
                .collect::<Result<Vec<_>>>()?,
            InferenceResponse::Flat(flat) => flat,
        };
        Ok(labels)
    }
}

/// Classifies comments and builds the sentiment summary
pub struct SentimentClassifier {
    backend: Arc<dyn ClassifierBackend>,
    renderer: Arc<dyn ChartRenderer>,
    words: WordCounter,
    ready: OnceCell<()>,
    batch_size: usize,
    truncation: bool,
    max_text_length: usize,
    word_cloud_max_words: usize,
    metrics: MetricsCollector,
}

impl SentimentClassifier {
    /// Create a classifier over an injected backend and renderer
    pub fn new(
        config: &SentimentConfig,
        backend: Arc<dyn ClassifierBackend>,
        renderer: Arc<dyn ChartRenderer>,
    ) -> Result<Self> {
        Ok(Self {
            backend,
            renderer,
            words: WordCounter::new()?,
            ready: OnceCell::new(),
            batch_size: config.batch_size,
            truncation: config.truncation,
            max_text_length: config.max_text_length,
            word_cloud_max_words: config.word_cloud_max_words,
            metrics: MetricsCollector::default(),
        })
    }

    /// Warm the backend once; failed attempts may be retried by later calls
    pub async fn ensure_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async { self.backend.warm_up().await })
            .await
            .map(|_| ())
    }

    /// Classify every comment with text and summarize.
    ///
    /// Backend failures degrade to an empty summary and chart failures to a
    /// missing chart; both are recorded in `diagnostics`.
    pub async fn classify(
        &self,
        comments: &mut [CommentRecord],
        diagnostics: &mut Diagnostics,
    ) -> SentimentSummary {
        let indices: Vec<usize> = comments
            .iter()
            .enumerate()
            .filter(|(_, c)| c.has_text())
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            return SentimentSummary {
                top_like_comments: top_liked(comments),
                ..SentimentSummary::default()
            };
        }

        let sentiments = match self.run_model(comments, &indices).await {
            Ok(sentiments) => sentiments,
            Err(e) => {
                self.metrics.record_degradation("classification_unavailable");
                diagnostics.record(ErrorKind::ClassificationUnavailable, "sentiment", e.to_string());
                return SentimentSummary::default();
            }
        };

        for (&i, sentiment) in indices.iter().zip(sentiments) {
            comments[i].sentiment = Some(sentiment);
        }
        let classified: Vec<&CommentRecord> = indices.iter().map(|&i| &comments[i]).collect();

        let mut summary = summarize(&classified);
        summary.top_like_comments = top_liked(comments);
        self.metrics.record_sentiment_score(summary.overall_score);

        summary.top_words = self
            .words
            .top_words(classified.iter().map(|c| c.text.as_str()), self.word_cloud_max_words);

        summary.word_cloud = self.encode(
            self.renderer.word_cloud(&summary.top_words),
            "word cloud",
            diagnostics,
        );
        let slices = [
            (SentimentLabel::Positive.as_str().to_string(), summary.positive),
            (SentimentLabel::Neutral.as_str().to_string(), summary.neutral),
            (SentimentLabel::Negative.as_str().to_string(), summary.negative),
        ];
        summary.pie_chart = self.encode(self.renderer.pie_chart(&slices), "pie chart", diagnostics);

        tracing::info!(
            analyzed = summary.analyzed,
            overall_score = summary.overall_score,
            "Classified comment sentiment"
        );
        summary
    }

    async fn run_model(
        &self,
        comments: &[CommentRecord],
        indices: &[usize],
    ) -> Result<Vec<CommentSentiment>> {
        self.ensure_ready().await?;

        let texts: Vec<String> = indices
            .iter()
            .map(|&i| truncate_chars(&comments[i].text, self.max_text_length).to_string())
            .collect();

        let mut sentiments = Vec::with_capacity(texts.len());
        for batch in batches(&texts, self.batch_size) {
            let started = Instant::now();
            let labels = self.backend.classify_batch(&batch, self.truncation).await?;
            self.metrics
                .record_classification_batch(batch.len(), started.elapsed());

            if labels.len() != batch.len() {
                return Err(InsightError::Classification(format!(
                    "expected {} labels, got {}",
                    batch.len(),
                    labels.len()
                )));
            }

            for label in labels {
                let stars = label.stars().ok_or_else(|| {
                    InsightError::Classification(format!("unrecognized label {}", label.label))
                })?;
                sentiments.push(CommentSentiment {
                    stars,
                    score: f64::from(stars) * 2.0,
                    label: SentimentLabel::from_stars(stars),
                    confidence: round2(label.score),
                });
            }
        }
        Ok(sentiments)
    }

    fn encode(&self, rendered: Result<Vec<u8>>, chart: &str, diagnostics: &mut Diagnostics) -> Option<String> {
        match rendered {
            Ok(bytes) => Some(STANDARD.encode(bytes)),
            Err(e) => {
                self.metrics.record_degradation("rendering_failure");
                diagnostics.record(ErrorKind::RenderingFailure, "sentiment", format!("{chart}: {e}"));
                None
            }
        }
    }
}

/// Bucket counts and overall score of classified comments
fn summarize(classified: &[&CommentRecord]) -> SentimentSummary {
    let mut summary = SentimentSummary {
        analyzed: classified.len(),
        ..SentimentSummary::default()
    };

    let scores: Vec<f64> = classified
        .iter()
        .filter_map(|c| c.sentiment.as_ref())
        .map(|s| {
            match s.label {
                SentimentLabel::Positive => summary.positive += 1,
                SentimentLabel::Neutral => summary.neutral += 1,
                SentimentLabel::Negative => summary.negative += 1,
            }
            s.score
        })
        .collect();
    summary.overall_score = round2(mean(&scores).unwrap_or(0.0));
    summary
}

/// Most liked comments across the whole run.
///
/// Text-less comments are ranked too; they carry no label or score.
fn top_liked(comments: &[CommentRecord]) -> Vec<TopComment> {
    // Stable sort keeps original order among equal like counts
    let mut liked: Vec<&CommentRecord> = comments.iter().collect();
    liked.sort_by(|a, b| b.like_count.cmp(&a.like_count));
    liked
        .into_iter()
        .take(TOP_LIKED)
        .map(|c| TopComment {
            comment_id: c.comment_id.clone(),
            author_name: c.author_name.clone(),
            text: c.text.clone(),
            like_count: c.like_count,
            label: c.sentiment.as_ref().map(|s| s.label),
            score: c.sentiment.as_ref().map(|s| s.score),
        })
        .collect()
}
