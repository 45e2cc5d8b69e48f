use anyhow::{anyhow, Result};

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a channel or video reference before resolution
    pub fn validate_reference(reference: &str) -> Result<()> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Reference cannot be empty"));
        }

        if trimmed.len() > 2048 {
            return Err(anyhow!("Reference too long (max 2048 characters)"));
        }

        if trimmed.chars().any(char::is_control) {
            return Err(anyhow!("Reference contains invalid characters"));
        }

        Ok(())
    }

    /// Validate a user or project identifier used as a store key part
    pub fn validate_identifier(kind: &str, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(anyhow!("{kind} id cannot be empty"));
        }

        if id.len() > 128 {
            return Err(anyhow!("{kind} id too long (max 128 characters)"));
        }

        // Key parts are joined with ':' in the store
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(anyhow!("{kind} id contains invalid characters"));
        }

        Ok(())
    }

    /// Validate the collection window
    pub fn validate_lookback_days(days: i64) -> Result<()> {
        if days <= 0 {
            return Err(anyhow!("Lookback window must be positive"));
        }

        if days > 365 * 5 {
            tracing::warn!(
                "Large lookback window ({} days) will consume significant API quota",
                days
            );
        }

        if days > 365 * 20 {
            return Err(anyhow!("Lookback window too large (max 20 years)"));
        }

        Ok(())
    }

    /// Validate the number of videos to collect
    pub fn validate_max_videos(max_videos: usize) -> Result<()> {
        if max_videos == 0 {
            return Err(anyhow!("Max videos must be greater than 0"));
        }

        if max_videos > 500 {
            return Err(anyhow!("Max videos too large (max 500)"));
        }

        Ok(())
    }

    /// Validate batch size for classification
    pub fn validate_batch_size(batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(anyhow!("Batch size must be greater than 0"));
        }

        if batch_size > 1024 {
            return Err(anyhow!("Batch size too large (max 1,024)"));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
