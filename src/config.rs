//! Configuration for the validation stage.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the funding validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Alchemy network slug, e.g. "arb-mainnet", "eth-mainnet", "base-mainnet"
    pub network: String,
    /// Alchemy API key
    pub api_key: String,
    /// Number of concurrent probe workers
    pub concurrency: usize,
    /// Global ceiling on requests per second across all workers
    pub rate_limit_per_second: u32,
    /// Retry attempts per address after the first try
    pub retry_attempts: usize,
    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Emit a progress line every this many completions
    pub progress_interval: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            network: "arb-mainnet".to_string(),
            api_key: String::new(),
            concurrency: 20,
            rate_limit_per_second: 25,
            retry_attempts: 3,
            request_timeout_seconds: 10,
            progress_interval: 100,
        }
    }
}

impl ValidatorConfig {
    /// Validate the configuration before any probing begins.
    ///
    /// A missing credential or a zeroed limit is a fatal configuration error;
    /// failing here is cheap, failing mid-run is not.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow!(
                "missing API key: set ALCHEMY_API_KEY or pass --api-key"
            ));
        }
        if self.network.trim().is_empty() {
            return Err(anyhow!("network must not be empty"));
        }
        if self.concurrency == 0 {
            return Err(anyhow!("concurrency must be at least 1"));
        }
        if self.rate_limit_per_second == 0 {
            return Err(anyhow!("rate limit must be at least 1 request/second"));
        }
        Ok(())
    }

    /// Full JSON-RPC endpoint URL for the configured network.
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.g.alchemy.com/v2/{}", self.network, self.api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_arbitrum() {
        let config = ValidatorConfig::default();

        assert_eq!(config.network, "arb-mainnet");
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.rate_limit_per_second, 25);
        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn validate_rejects_missing_api_key() {
        let config = ValidatorConfig::default();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = ValidatorConfig {
            api_key: "test-key".to_string(),
            concurrency: 0,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_complete_config() {
        let config = ValidatorConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn endpoint_url_embeds_network_and_key() {
        let config = ValidatorConfig {
            api_key: "abc123".to_string(),
            ..Default::default()
        };

        assert_eq!(
            config.endpoint_url(),
            "https://arb-mainnet.g.alchemy.com/v2/abc123"
        );
    }
}
