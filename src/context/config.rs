//! Configuration for automatic context compression.

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Thresholds and limits that drive compression.
///
/// Compression is considered when either the message count reaches
/// `msg_threshold` or the estimated tokens reach
/// `floor(max_token * token_ratio)`.
///
/// Partial documents deserialize over the defaults.
///
/// # Example
///
/// ```
/// use auto_context::context::AutoContextConfig;
///
/// let config = AutoContextConfig::default()
///     .with_max_token(64_000)
///     .with_msg_threshold(40)
///     .with_last_keep(10);
/// assert_eq!(config.token_threshold(), 48_000);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoContextConfig {
    /// Flattened text length above which a single message is offloaded.
    /// Default: 5 KiB
    pub large_payload_threshold: usize,

    /// Hard token ceiling of the target model context.
    /// Default: 128K
    pub max_token: usize,

    /// Fraction of `max_token` at which compression starts.
    /// Default: 0.75
    pub token_ratio: f64,

    /// Message count at which compression starts.
    /// Default: 100
    pub msg_threshold: usize,

    /// Number of most recent messages shielded from payload offloading.
    /// Default: 50
    pub last_keep: usize,

    /// Characters of an offloaded message kept inline as a preview.
    /// Default: 200
    pub offload_single_preview: usize,

    /// A run of tool messages must be longer than this to be summarized.
    /// Default: 6
    pub min_consecutive_tool_messages: usize,
}

impl Default for AutoContextConfig {
    fn default() -> Self {
        Self {
            large_payload_threshold: 5 * 1024,
            max_token: 128 * 1024,
            token_ratio: 0.75,
            msg_threshold: 100,
            last_keep: 50,
            offload_single_preview: 200,
            min_consecutive_tool_messages: 6,
        }
    }
}

impl AutoContextConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_large_payload_threshold(mut self, threshold: usize) -> Self {
        self.large_payload_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_max_token(mut self, max_token: usize) -> Self {
        self.max_token = max_token;
        self
    }

    #[must_use]
    pub const fn with_token_ratio(mut self, ratio: f64) -> Self {
        self.token_ratio = ratio;
        self
    }

    #[must_use]
    pub const fn with_msg_threshold(mut self, threshold: usize) -> Self {
        self.msg_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_last_keep(mut self, count: usize) -> Self {
        self.last_keep = count;
        self
    }

    #[must_use]
    pub const fn with_offload_single_preview(mut self, chars: usize) -> Self {
        self.offload_single_preview = chars;
        self
    }

    #[must_use]
    pub const fn with_min_consecutive_tool_messages(mut self, count: usize) -> Self {
        self.min_consecutive_tool_messages = count;
        self
    }

    /// Token count at which compression starts: `floor(max_token * token_ratio)`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn token_threshold(&self) -> usize {
        (self.max_token as f64 * self.token_ratio).floor() as usize
    }

    /// Check that the thresholds describe a usable configuration.
    ///
    /// # Errors
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_token > 0, "max_token must be greater than zero");
        ensure!(
            self.token_ratio > 0.0 && self.token_ratio <= 1.0,
            "token_ratio must be in (0, 1], got {}",
            self.token_ratio
        );
        ensure!(
            self.msg_threshold > 0,
            "msg_threshold must be greater than zero"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AutoContextConfig::default();
        assert_eq!(config.large_payload_threshold, 5120);
        assert_eq!(config.max_token, 131_072);
        assert_eq!(config.msg_threshold, 100);
        assert_eq!(config.last_keep, 50);
        assert_eq!(config.offload_single_preview, 200);
        assert_eq!(config.min_consecutive_tool_messages, 6);
        assert_eq!(config.token_threshold(), 98_304);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = AutoContextConfig::new()
            .with_large_payload_threshold(1000)
            .with_max_token(1001)
            .with_token_ratio(0.5)
            .with_msg_threshold(10)
            .with_last_keep(3)
            .with_offload_single_preview(20)
            .with_min_consecutive_tool_messages(2);

        assert_eq!(config.large_payload_threshold, 1000);
        assert_eq!(config.token_threshold(), 500);
        assert_eq!(config.msg_threshold, 10);
        assert_eq!(config.last_keep, 3);
        assert_eq!(config.offload_single_preview, 20);
        assert_eq!(config.min_consecutive_tool_messages, 2);
    }

    #[test]
    fn test_partial_json_uses_defaults() -> anyhow::Result<()> {
        let config: AutoContextConfig =
            serde_json::from_str(r#"{"msg_threshold": 30, "token_ratio": 0.9}"#)?;

        assert_eq!(config.msg_threshold, 30);
        assert!((config.token_ratio - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.last_keep, 50);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_ratio() {
        assert!(
            AutoContextConfig::default()
                .with_token_ratio(0.0)
                .validate()
                .is_err()
        );
        assert!(
            AutoContextConfig::default()
                .with_token_ratio(1.5)
                .validate()
                .is_err()
        );
        assert!(
            AutoContextConfig::default()
                .with_msg_threshold(0)
                .validate()
                .is_err()
        );
    }
}
