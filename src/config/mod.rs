use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use crate::services::bulk_import::BulkImportConfig;
use crate::services::call_test::{CallStatusClassifier, CallTestConfig};
use crate::services::validation::MAX_UPLOAD_BYTES;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub base_url: String,
    pub api_key: String,
    pub agent_id: String,
    pub agent_phone_number_id: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            api_key: String::new(),
            agent_id: String::new(),
            agent_phone_number_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Campaign backend base URL.
    pub api_base_url: String,
    /// Hosted record store endpoint and service key.
    pub store_url: String,
    pub store_api_key: String,
    pub voice: VoiceConfig,
    pub organization_id: Option<Uuid>,

    pub bulk_poll_interval_secs: u64,
    pub call_poll_interval_secs: u64,
    pub stuck_call_after_secs: u64,
    pub max_upload_bytes: u64,

    /// Overrides for the provider status allow-lists; defaults apply when
    /// empty.
    pub call_completion_statuses: Vec<String>,
    pub call_failure_statuses: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            store_url: "http://localhost:54321".to_string(),
            store_api_key: String::new(),
            voice: VoiceConfig::default(),
            organization_id: None,
            bulk_poll_interval_secs: 2,
            call_poll_interval_secs: 3,
            stuck_call_after_secs: 40,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            call_completion_statuses: Vec::new(),
            call_failure_statuses: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file when present, then apply environment
    /// overrides. A missing file is not an error; defaults apply.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("could not read config file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("could not parse config file {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        let mut set = |key: &str, target: &mut String| {
            if let Ok(value) = std::env::var(key) {
                *target = value;
            }
        };
        set("CANVASS_API_URL", &mut self.api_base_url);
        set("CANVASS_STORE_URL", &mut self.store_url);
        set("CANVASS_STORE_KEY", &mut self.store_api_key);
        set("CANVASS_VOICE_API_KEY", &mut self.voice.api_key);
        set("CANVASS_VOICE_AGENT_ID", &mut self.voice.agent_id);
        set("CANVASS_VOICE_PHONE_ID", &mut self.voice.agent_phone_number_id);
    }

    pub fn bulk_import(&self) -> BulkImportConfig {
        BulkImportConfig {
            poll_interval: Duration::from_secs(self.bulk_poll_interval_secs),
            max_file_bytes: self.max_upload_bytes,
        }
    }

    pub fn call_test(&self) -> CallTestConfig {
        let classifier = if self.call_completion_statuses.is_empty()
            && self.call_failure_statuses.is_empty()
        {
            CallStatusClassifier::default()
        } else {
            CallStatusClassifier::new(
                self.call_completion_statuses.iter().cloned(),
                self.call_failure_statuses.iter().cloned(),
            )
        };
        CallTestConfig {
            poll_interval: Duration::from_secs(self.call_poll_interval_secs),
            stuck_after: Duration::from_secs(self.stuck_call_after_secs),
            classifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mirror_spec_constants() {
        let config = AppConfig::default();
        assert_eq!(config.bulk_poll_interval_secs, 2);
        assert_eq!(config.call_poll_interval_secs, 3);
        assert_eq!(config.stuck_call_after_secs, 40);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            api_base_url = "https://campaign.example/api"
            stuck_call_after_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "https://campaign.example/api");
        assert_eq!(config.stuck_call_after_secs, 60);
        assert_eq!(config.bulk_poll_interval_secs, 2);
    }
}
