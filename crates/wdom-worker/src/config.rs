//! Worker configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use wdom_dom::RuntimeOptions;

use crate::{WorkerError, WorkerResult};

/// Settings for one worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// `location.href` seen by scripts
    pub location: String,
    /// `navigator.userAgent`
    pub user_agent: String,
    /// Initial viewport, replaced by every resize message
    pub inner_width: u32,
    pub inner_height: u32,
    /// How long a bounding rect request waits for the main thread
    pub bounding_rect_timeout_ms: u64,
    /// Initial `localStorage` contents
    pub local_storage: Vec<(String, String)>,
    /// Strip host globals outside the whitelist
    pub sanitize_globals: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            location: "about:blank".to_string(),
            user_agent: format!("wdom/{}", env!("CARGO_PKG_VERSION")),
            inner_width: 0,
            inner_height: 0,
            bounding_rect_timeout_ms: 500,
            local_storage: Vec::new(),
            sanitize_globals: true,
        }
    }
}

impl WorkerConfig {
    /// Reject settings the worker cannot run with
    pub fn validate(&self) -> WorkerResult<()> {
        if self.bounding_rect_timeout_ms == 0 {
            return Err(WorkerError::Config(
                "bounding_rect_timeout_ms must be positive".to_string(),
            ));
        }
        self.location_url()?;
        Ok(())
    }

    pub fn location_url(&self) -> WorkerResult<Url> {
        Ok(Url::parse(&self.location)?)
    }

    /// Document-level subset of the configuration
    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            bounding_rect_timeout: Duration::from_millis(self.bounding_rect_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.location, "about:blank");
        assert!(config.sanitize_globals);
        assert!(config.validate().is_ok());
        assert_eq!(config.runtime_options().bounding_rect_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"location":"https://example.com/app?q=1","inner_width":320}"#;
        let config: WorkerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.inner_width, 320);
        assert_eq!(config.bounding_rect_timeout_ms, 500);
        assert_eq!(config.location_url().unwrap().path(), "/app");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = WorkerConfig {
            bounding_rect_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(WorkerError::Config(_))));

        let config = WorkerConfig {
            location: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(WorkerError::Location(_))));
    }
}
