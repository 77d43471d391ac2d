use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::collector::CollectorConfig;
use crate::transport::{ClientConfig, Role};

/// Everything needed to start a [`super::CaptureSession`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub role: Role,

    /// Scene shared by every client of the same space.
    pub scene: String,

    pub collector: CollectorConfig,

    pub client: ClientConfig,
}

impl SessionConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid session config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid session config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scene.is_empty() {
            bail!("scene must not be empty");
        }
        self.collector.validate()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: Role::Host,
            scene: "default".to_string(),
            collector: CollectorConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::collector::RotationMetric;

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "role": "visitor",
                "scene": "lab",
                "collector": {{ "model_name": "slam3r", "window_size": 5, "rotation_metric": "forward_vector" }},
                "client": {{ "server_url": "ws://10.0.0.2:9000" }}
            }}"#
        )
        .unwrap();

        let config = SessionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.role, Role::Visitor);
        assert_eq!(config.scene, "lab");
        assert_eq!(config.collector.window_size, 5);
        assert_eq!(config.collector.rotation_metric, RotationMetric::ForwardVector);
        assert_eq!(config.collector.frame_stride, 1);
        assert_eq!(config.client.server_url, "ws://10.0.0.2:9000");
        assert_eq!(config.client.send_backoff_ms, 100);
    }

    #[test]
    fn test_values_that_would_crash_are_rejected() {
        for collector in [r#"{ "window_size": 0 }"#, r#"{ "min_interval_s": 1e30 }"#] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(file, r#"{{ "collector": {} }}"#, collector).unwrap();

            let err = SessionConfig::from_json_file(file.path()).unwrap_err();
            assert!(format!("{:#}", err).contains("collector"), "{:#}", err);
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionConfig::from_json_file(dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
