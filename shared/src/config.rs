//! Runtime configuration delivered by the shell through `Event::Configure`.
//!
//! Every section has defaults matching the shipped app, so an empty JSON
//! object is a valid configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::capabilities::CameraFacing;
use crate::evidence::DEFAULT_FORMAT_CANDIDATES;

pub const MIN_ADVICE_TIMEOUT_MS: u64 = 1_000;
pub const MAX_ADVICE_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_ADVICE_TIMEOUT_MS: u64 = 6_000;
pub const MIN_TIMESLICE_MS: u64 = 100;
pub const MAX_TIMESLICE_MS: u64 = 10_000;
pub const MIN_PROMPT_TIMEOUT_MS: u64 = 5_000;
pub const MAX_PROMPT_TIMEOUT_MS: u64 = 120_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Parse(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceEndpoint {
    SafetyAdvice,
    Hotspots,
    Distress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdviceConfig {
    /// Must end with `/` for the endpoint paths to join under it.
    pub base_url: String,
    pub safety_advice_path: String,
    pub hotspots_path: String,
    pub distress_path: String,
    pub timeout_ms: u64,
    pub default_location: String,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9002/api/".to_string(),
            safety_advice_path: "safety-advice".to_string(),
            hotspots_path: "crime-hotspots".to_string(),
            distress_path: "detect-distress".to_string(),
            timeout_ms: DEFAULT_ADVICE_TIMEOUT_MS,
            default_location: "Mumbai, India".to_string(),
        }
    }
}

impl AdviceConfig {
    pub fn endpoint(&self, which: AdviceEndpoint) -> Result<Url, ConfigError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid("advice.baseUrl", e.to_string()))?;
        let path = match which {
            AdviceEndpoint::SafetyAdvice => &self.safety_advice_path,
            AdviceEndpoint::Hotspots => &self.hotspots_path,
            AdviceEndpoint::Distress => &self.distress_path,
        };
        base.join(path)
            .map_err(|e| ConfigError::invalid("advice.path", e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("advice.baseUrl", "must not be empty"));
        }
        Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid("advice.baseUrl", e.to_string()))?;
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid("advice.timeoutMs", "must be > 0"));
        }
        if self.default_location.trim().is_empty() {
            return Err(ConfigError::invalid(
                "advice.defaultLocation",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConfig {
    pub facing: CameraFacing,
    pub audio: bool,
    /// `None` lets the recorder emit a single chunk at stop.
    pub timeslice_ms: Option<u64>,
    /// Ordered preference list; the first supported entry wins.
    pub format_candidates: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            facing: CameraFacing::Environment,
            audio: true,
            timeslice_ms: None,
            format_candidates: DEFAULT_FORMAT_CANDIDATES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.format_candidates.is_empty() {
            return Err(ConfigError::invalid(
                "capture.formatCandidates",
                "must list at least one format",
            ));
        }
        if self.format_candidates.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "capture.formatCandidates",
                "entries must not be blank",
            ));
        }
        if self.timeslice_ms == Some(0) {
            return Err(ConfigError::invalid("capture.timesliceMs", "must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallConfig {
    pub caller_name: String,
    pub caller_subtext: String,
    pub avatar_url: Option<String>,
    pub auto_answer: bool,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            caller_name: "Mom".to_string(),
            caller_subtext: "Samsung Galaxy S25+ 5G".to_string(),
            avatar_url: Some("/contacts/mom.png".to_string()),
            auto_answer: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SafetyConfig {
    /// How long the "Are you safe?" prompt waits before escalating.
    pub prompt_timeout_ms: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            prompt_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub advice: AdviceConfig,
    pub capture: CaptureConfig,
    pub call: CallConfig,
    pub safety: SafetyConfig,
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config.validated())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.advice.validate()?;
        self.capture.validate()?;
        if self.call.caller_name.trim().is_empty() {
            return Err(ConfigError::invalid("call.callerName", "must not be empty"));
        }
        if self.safety.prompt_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "safety.promptTimeoutMs",
                "must be > 0",
            ));
        }
        Ok(())
    }

    /// Clamps numeric settings into supported bounds.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.advice.timeout_ms = self
            .advice
            .timeout_ms
            .clamp(MIN_ADVICE_TIMEOUT_MS, MAX_ADVICE_TIMEOUT_MS);
        self.capture.timeslice_ms = self
            .capture
            .timeslice_ms
            .map(|ms| ms.clamp(MIN_TIMESLICE_MS, MAX_TIMESLICE_MS));
        self.safety.prompt_timeout_ms = self
            .safety
            .prompt_timeout_ms
            .clamp(MIN_PROMPT_TIMEOUT_MS, MAX_PROMPT_TIMEOUT_MS);
        self
    }
}
