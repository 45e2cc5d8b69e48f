use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::validation::InputValidator;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub youtube: YouTubeConfig,
    pub collection: CollectionConfig,
    pub sentiment: SentimentConfig,
    pub scoring: ScoringConfig,
    pub community: CommunityConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub max_videos: usize,
    pub lookback_days: i64,
    pub max_comments_per_video: usize,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    pub endpoint: String,
    pub model_id: String,
    pub api_token: Option<String>,
    pub batch_size: usize,
    pub truncation: bool,
    pub max_text_length: usize,
    pub request_timeout_secs: u64,
    pub word_cloud_max_words: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub min_comments: u64,
    pub top_influencers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityConfig {
    pub resolutions: Vec<f64>,
    pub top_communities: usize,
    pub bridge_users: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            youtube: YouTubeConfig {
                api_key: String::new(),
                base_url: "https://www.googleapis.com/youtube/v3".to_string(),
                request_timeout_secs: 30,
                max_retries: 3,
                retry_base_delay_ms: 1000,
                page_size: 100,
            },
            collection: CollectionConfig {
                max_videos: 30,
                lookback_days: 180,
                max_comments_per_video: 500,
                concurrency: 1,
            },
            sentiment: SentimentConfig {
                endpoint: "https://api-inference.huggingface.co/models".to_string(),
                model_id: "nlptown/bert-base-multilingual-uncased-sentiment".to_string(),
                api_token: None,
                batch_size: 16,
                truncation: true,
                max_text_length: 2000,
                request_timeout_secs: 120,
                word_cloud_max_words: 100,
            },
            scoring: ScoringConfig {
                min_comments: 3,
                top_influencers: 20,
            },
            community: CommunityConfig {
                resolutions: vec![0.5, 1.0, 1.5, 2.0],
                top_communities: 10,
                bridge_users: 3,
            },
            store: StoreConfig {
                path: "data/results".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .map_err(|e| anyhow::anyhow!("Failed to build default configuration: {}", e))?;

        let config = Config::builder()
            // Start with default values
            .add_source(defaults)
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("channel-insight").required(false))
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix("CHANNEL_INSIGHT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate platform config
        if self.youtube.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("youtube.base_url must not be empty"));
        }
        if self.youtube.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request_timeout_secs must be greater than 0"));
        }
        if self.youtube.page_size == 0 || self.youtube.page_size > 100 {
            return Err(anyhow::anyhow!("page_size must be between 1 and 100"));
        }

        // Validate collection config
        if self.collection.max_videos == 0 {
            return Err(anyhow::anyhow!("max_videos must be greater than 0"));
        }
        if self.collection.lookback_days <= 0 {
            return Err(anyhow::anyhow!("lookback_days must be greater than 0"));
        }
        if self.collection.max_comments_per_video == 0 {
            return Err(anyhow::anyhow!("max_comments_per_video must be greater than 0"));
        }
        if self.collection.concurrency == 0 {
            return Err(anyhow::anyhow!("concurrency must be greater than 0"));
        }

        // Validate sentiment config
        InputValidator::validate_batch_size(self.sentiment.batch_size)?;
        if self.sentiment.max_text_length == 0 {
            return Err(anyhow::anyhow!("max_text_length must be greater than 0"));
        }

        // Validate scoring config
        if self.scoring.top_influencers == 0 {
            return Err(anyhow::anyhow!("top_influencers must be greater than 0"));
        }

        // Validate community config
        if self.community.resolutions.is_empty() {
            return Err(anyhow::anyhow!("at least one community resolution is required"));
        }
        if self.community.resolutions.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(anyhow::anyhow!("community resolutions must be positive"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        Ok(())
    }

    /// Get the platform API key from environment or config
    pub fn get_api_key(&self) -> String {
        std::env::var("YOUTUBE_API_KEY").unwrap_or_else(|_| self.youtube.api_key.clone())
    }

    /// Get the inference token from environment or config
    pub fn get_inference_token(&self) -> Option<String> {
        std::env::var("HF_API_TOKEN")
            .ok()
            .or_else(|| self.sentiment.api_token.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Render the configuration as YAML, suitable for a starter config file
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| anyhow::anyhow!("Failed to render configuration: {}", e))
    }
}
