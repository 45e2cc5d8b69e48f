//! Comprehensive unit tests for validation.rs module

use channel_insight::validation::InputValidator;

#[test]
fn test_validate_reference_valid() {
    assert!(InputValidator::validate_reference("https://www.youtube.com/@somecreator").is_ok());
    assert!(InputValidator::validate_reference("@somecreator").is_ok());
}

#[test]
fn test_validate_reference_empty() {
    assert!(InputValidator::validate_reference("").is_err());
}

#[test]
fn test_validate_reference_whitespace_only() {
    assert!(InputValidator::validate_reference("   ").is_err());
}

#[test]
fn test_validate_reference_too_long() {
    let long = format!("https://youtube.com/{}", "a".repeat(2048));
    assert!(InputValidator::validate_reference(&long).is_err());
}

#[test]
fn test_validate_reference_with_control_chars() {
    assert!(InputValidator::validate_reference("@creator\0").is_err());
    assert!(InputValidator::validate_reference("@cre\nator").is_err());
}

#[test]
fn test_validate_identifier_valid() {
    assert!(InputValidator::validate_identifier("user", "user-42").is_ok());
    assert!(InputValidator::validate_identifier("project", "launch_2024.q3").is_ok());
}

#[test]
fn test_validate_identifier_empty() {
    assert!(InputValidator::validate_identifier("user", "").is_err());
}

#[test]
fn test_validate_identifier_with_separator() {
    assert!(InputValidator::validate_identifier("user", "alice:admin").is_err());
}

#[test]
fn test_validate_identifier_too_long() {
    let id = "a".repeat(129);
    assert!(InputValidator::validate_identifier("project", &id).is_err());
}

#[test]
fn test_validate_identifier_exactly_128_chars() {
    let id = "a".repeat(128);
    assert!(InputValidator::validate_identifier("project", &id).is_ok());
}

#[test]
fn test_validate_identifier_unicode_rejected() {
    assert!(InputValidator::validate_identifier("user", "josé").is_err());
}

#[test]
fn test_validate_lookback_days_valid() {
    assert!(InputValidator::validate_lookback_days(180).is_ok());
}

#[test]
fn test_validate_lookback_days_zero() {
    assert!(InputValidator::validate_lookback_days(0).is_err());
}

#[test]
fn test_validate_lookback_days_negative() {
    assert!(InputValidator::validate_lookback_days(-30).is_err());
}

#[test]
fn test_validate_lookback_days_large_warns_but_passes() {
    assert!(InputValidator::validate_lookback_days(365 * 10).is_ok());
}

#[test]
fn test_validate_lookback_days_too_large() {
    assert!(InputValidator::validate_lookback_days(365 * 21).is_err());
}

#[test]
fn test_validate_max_videos_valid() {
    assert!(InputValidator::validate_max_videos(30).is_ok());
}

#[test]
fn test_validate_max_videos_zero() {
    assert!(InputValidator::validate_max_videos(0).is_err());
}

#[test]
fn test_validate_max_videos_bounds() {
    assert!(InputValidator::validate_max_videos(500).is_ok());
    assert!(InputValidator::validate_max_videos(501).is_err());
}

#[test]
fn test_validate_batch_size_valid() {
    assert!(InputValidator::validate_batch_size(16).is_ok());
}

#[test]
fn test_validate_batch_size_zero() {
    assert!(InputValidator::validate_batch_size(0).is_err());
}

#[test]
fn test_validate_batch_size_too_large() {
    assert!(InputValidator::validate_batch_size(1025).is_err());
}

#[test]
fn test_validate_batch_size_exactly_max() {
    assert!(InputValidator::validate_batch_size(1024).is_ok());
}

#[test]
fn test_sanitize_text_clean() {
    let text = "Great video, thanks!";
    assert_eq!(InputValidator::sanitize_text(text), text);
}

#[test]
fn test_sanitize_text_with_control_chars() {
    let text = "Hello\x00World\x07!";
    assert_eq!(InputValidator::sanitize_text(text), "HelloWorld!");
}

#[test]
fn test_sanitize_text_preserves_newlines() {
    let text = "first line\nsecond line";
    assert_eq!(InputValidator::sanitize_text(text), text);
}

#[test]
fn test_sanitize_text_trims_whitespace() {
    assert_eq!(InputValidator::sanitize_text("  spaced out  "), "spaced out");
}

#[test]
fn test_sanitize_text_empty() {
    assert_eq!(InputValidator::sanitize_text(""), "");
}
